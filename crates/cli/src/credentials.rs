//! Resolves the SAP password `Transport` needs from a [`CredentialConfig`].
//!
//! Precedence mirrors SPEC_FULL §4.11: plaintext `password` (warns) → OS
//! keychain (`service`+`account`) → `env` var → keychain headless
//! fallback env var `{SERVICE}_{ACCOUNT}` → error. A `session_cookie` is
//! handled by the caller before this is ever invoked, since it replaces
//! Basic auth entirely rather than supplying a password.

use adt_domain::config::CredentialConfig;
use adt_domain::{Error, Result};

pub fn resolve_password(cred: &CredentialConfig) -> Result<String> {
    if let Some(ref password) = cred.password {
        tracing::warn!(
            "password loaded from plaintext config field 'password' — \
             prefer 'env' or keychain 'service'+'account' instead"
        );
        return Ok(password.clone());
    }

    if let (Some(service), Some(account)) = (&cred.service, &cred.account) {
        match resolve_from_keychain(service, account) {
            Ok(secret) => return Ok(secret),
            Err(e) => {
                tracing::warn!(
                    service = %service,
                    account = %account,
                    error = %e,
                    "keychain lookup failed, falling through to env"
                );
            }
        }
    }

    if let Some(ref env_var) = cred.env {
        return std::env::var(env_var).map_err(|_| {
            Error::Auth(format!(
                "environment variable '{env_var}' not set or not valid UTF-8"
            ))
        });
    }

    if let (Some(service), Some(account)) = (&cred.service, &cred.account) {
        let fallback_var = keychain_fallback_env_name(service, account);
        if let Ok(val) = std::env::var(&fallback_var) {
            tracing::info!(
                env_var = %fallback_var,
                "password resolved from keychain headless fallback env var"
            );
            return Ok(val);
        }
    }

    Err(Error::Auth(
        "no credential configured: set 'password', 'env', or keychain \
         'service'+'account' in CredentialConfig"
            .into(),
    ))
}

pub fn resolve_from_keychain(service: &str, account: &str) -> Result<String> {
    let entry = keyring::Entry::new(service, account)
        .map_err(|e| Error::Auth(format!("keyring entry creation failed: {e}")))?;
    entry
        .get_password()
        .map_err(|e| Error::Auth(format!("keyring get_password failed: {e}")))
}

/// `("adt-dev", "developer-pass")` -> `"ADT_DEV_DEVELOPER_PASS"`.
pub fn keychain_fallback_env_name(service: &str, account: &str) -> String {
    format!(
        "{}_{}",
        service.to_uppercase().replace('-', "_"),
        account.to_uppercase().replace('-', "_"),
    )
}
