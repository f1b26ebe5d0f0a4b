use serde::{Deserialize, Serialize};

/// Where to resolve the SAP user's password/credential from.
///
/// Mirrors the precedence used by `adt-cli`'s credential resolver
/// (SPEC_FULL §4.11): plaintext `password` (warns) → OS keychain
/// (`service`+`account`) → `env` var → keychain headless fallback env var
/// → error.
#[derive(Debug, Clone, Serialize, Deserialize, Default, PartialEq, Eq)]
pub struct CredentialConfig {
    /// Plaintext password. Discouraged — logs a warning when used.
    #[serde(default)]
    pub password: Option<String>,
    /// Environment variable holding the password.
    #[serde(default)]
    pub env: Option<String>,
    /// OS keychain service name.
    #[serde(default)]
    pub service: Option<String>,
    /// OS keychain account name.
    #[serde(default)]
    pub account: Option<String>,
    /// Pre-established SAP session cookie (e.g. `SAP_SESSIONID_XYZ=...`),
    /// used instead of Basic auth when present.
    #[serde(default)]
    pub session_cookie: Option<String>,
}
