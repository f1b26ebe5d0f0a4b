//! Top-level `Config`, aggregating every ambient sub-config plus the core
//! connection fields from spec.md §3.

mod auth;
mod daemon;
mod logging;
mod timeouts;

pub use auth::CredentialConfig;
pub use daemon::DaemonConfig;
pub use logging::LoggingConfig;
pub use timeouts::TimeoutConfig;

use crate::safety::SafetyPolicy;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::fmt;

/// Severity of a single [`Config::validate`] finding.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Severity {
    Warning,
    Error,
}

/// A single configuration problem surfaced by [`Config::validate`].
///
/// `adt-cli`'s `config validate` subcommand renders these; an `Error`
/// severity also fails `doctor` and startup.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ConfigIssue {
    pub severity: Severity,
    pub field: &'static str,
    pub message: String,
}

impl fmt::Display for ConfigIssue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let tag = match self.severity {
            Severity::Error => "ERROR",
            Severity::Warning => "WARN",
        };
        write!(f, "[{tag}] {}: {}", self.field, self.message)
    }
}

/// Full connection + behavior configuration for an ADT client.
///
/// Loaded by `adt-cli` from a TOML file (path given by `ADT_CONFIG`) and
/// layered with environment overrides; see SPEC_FULL §4.11.
#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct Config {
    /// Base URL of the ABAP system's ICF node, e.g.
    /// `https://my-system.example.com:443`.
    pub base_url: String,
    /// SAP user name.
    pub user: String,
    /// SAP client (mandant), e.g. `"100"`.
    #[serde(default = "d_client")]
    pub client: String,
    /// ISO-639-1 logon language code.
    #[serde(default = "d_language")]
    pub language: String,
    /// Verify the server's TLS certificate. Disabling this is only ever
    /// appropriate against a sandboxed system with a self-signed cert.
    #[serde(default = "d_tls_verify")]
    pub tls_verify: bool,
    /// Extra cookies to send on every request, keyed by cookie name.
    /// Primarily used to carry a pre-established `SAP_SESSIONID_*` cookie
    /// alongside [`CredentialConfig::session_cookie`].
    #[serde(default)]
    pub cookie_overrides: HashMap<String, String>,

    #[serde(default)]
    pub credential: CredentialConfig,
    #[serde(default)]
    pub timeouts: TimeoutConfig,
    #[serde(default)]
    pub logging: LoggingConfig,
    #[serde(default)]
    pub daemon: DaemonConfig,
    #[serde(default)]
    pub safety: SafetyPolicy,
}

impl Config {
    /// Structural checks that don't require network access: required
    /// fields present, credential resolvable from *some* source, URL looks
    /// well-formed. Does not attempt to contact the ABAP system — that is
    /// `doctor`'s job.
    pub fn validate(&self) -> Vec<ConfigIssue> {
        let mut issues = Vec::new();

        if self.base_url.trim().is_empty() {
            issues.push(ConfigIssue {
                severity: Severity::Error,
                field: "base_url",
                message: "base_url must not be empty".into(),
            });
        } else if !(self.base_url.starts_with("http://") || self.base_url.starts_with("https://"))
        {
            issues.push(ConfigIssue {
                severity: Severity::Error,
                field: "base_url",
                message: format!("base_url {:?} must start with http:// or https://", self.base_url),
            });
        }
        if self.base_url.starts_with("http://") {
            issues.push(ConfigIssue {
                severity: Severity::Warning,
                field: "base_url",
                message: "base_url uses plain http; credentials will be sent unencrypted".into(),
            });
        }

        if self.user.trim().is_empty() {
            issues.push(ConfigIssue {
                severity: Severity::Error,
                field: "user",
                message: "user must not be empty".into(),
            });
        }

        if !self.tls_verify {
            issues.push(ConfigIssue {
                severity: Severity::Warning,
                field: "tls_verify",
                message: "TLS certificate verification is disabled".into(),
            });
        }

        let cred = &self.credential;
        let has_any_credential = cred.password.is_some()
            || cred.env.is_some()
            || (cred.service.is_some() && cred.account.is_some())
            || cred.session_cookie.is_some();
        if !has_any_credential {
            issues.push(ConfigIssue {
                severity: Severity::Error,
                field: "credential",
                message: "no credential source configured (password, env, keychain service+account, \
                           or session_cookie)"
                    .into(),
            });
        }
        if cred.password.is_some() {
            issues.push(ConfigIssue {
                severity: Severity::Warning,
                field: "credential.password",
                message: "plaintext password in config; prefer env or keychain".into(),
            });
        }
        if cred.service.is_some() != cred.account.is_some() {
            issues.push(ConfigIssue {
                severity: Severity::Error,
                field: "credential",
                message: "keychain lookup requires both service and account".into(),
            });
        }

        issues
    }

    /// True if [`Config::validate`] produced no `Error`-severity issues.
    pub fn is_usable(&self) -> bool {
        !self
            .validate()
            .iter()
            .any(|i| i.severity == Severity::Error)
    }
}

fn d_client() -> String {
    "100".into()
}
fn d_language() -> String {
    "EN".into()
}
fn d_tls_verify() -> bool {
    true
}

#[cfg(test)]
mod tests {
    use super::*;

    fn base() -> Config {
        Config {
            base_url: "https://example.com".into(),
            user: "DEVELOPER".into(),
            client: d_client(),
            language: d_language(),
            tls_verify: true,
            cookie_overrides: HashMap::new(),
            credential: CredentialConfig {
                env: Some("ADT_PASSWORD".into()),
                ..Default::default()
            },
            timeouts: TimeoutConfig::default(),
            logging: LoggingConfig::default(),
            daemon: DaemonConfig::default(),
            safety: SafetyPolicy::default(),
        }
    }

    #[test]
    fn well_formed_config_has_no_errors() {
        let cfg = base();
        assert!(cfg.is_usable());
        assert!(cfg.validate().is_empty());
    }

    #[test]
    fn missing_base_url_is_an_error() {
        let mut cfg = base();
        cfg.base_url = String::new();
        assert!(!cfg.is_usable());
    }

    #[test]
    fn missing_credential_is_an_error() {
        let mut cfg = base();
        cfg.credential = CredentialConfig::default();
        assert!(!cfg.is_usable());
    }

    #[test]
    fn plaintext_password_warns_but_is_usable() {
        let mut cfg = base();
        cfg.credential = CredentialConfig {
            password: Some("hunter2".into()),
            ..Default::default()
        };
        assert!(cfg.is_usable());
        let issues = cfg.validate();
        assert!(issues
            .iter()
            .any(|i| i.field == "credential.password" && i.severity == Severity::Warning));
    }

    #[test]
    fn http_scheme_warns() {
        let mut cfg = base();
        cfg.base_url = "http://example.com".into();
        let issues = cfg.validate();
        assert!(issues
            .iter()
            .any(|i| i.field == "base_url" && i.severity == Severity::Warning));
    }

    #[test]
    fn config_issue_display_format() {
        let err = ConfigIssue {
            severity: Severity::Error,
            field: "base_url",
            message: "base_url must not be empty".into(),
        };
        assert_eq!(format!("{err}"), "[ERROR] base_url: base_url must not be empty");

        let warn = ConfigIssue {
            severity: Severity::Warning,
            field: "tls_verify",
            message: "TLS certificate verification is disabled".into(),
        };
        assert_eq!(
            format!("{warn}"),
            "[WARN] tls_verify: TLS certificate verification is disabled"
        );
    }

    #[test]
    fn default_config_is_not_usable() {
        // `Config::default()` is a placeholder used only when no config
        // file is present; `doctor`/`config validate` must catch it.
        let cfg = Config::default();
        assert!(!cfg.is_usable());
    }

    #[test]
    fn partial_keychain_config_is_an_error() {
        let mut cfg = base();
        cfg.credential = CredentialConfig {
            service: Some("adt".into()),
            account: None,
            ..Default::default()
        };
        assert!(!cfg.is_usable());
    }
}
