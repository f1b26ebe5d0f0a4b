//! [`SafetyPolicy`] — a stateless classifier mapping an
//! (operation-class, target-identifier) pair to allow/deny.
//!
//! Consulted by every mutating path before it reaches `adt-transport`; see
//! spec.md §8 property 3 ("SafetyPolicy denial never reaches Transport").

use serde::{Deserialize, Serialize};
use std::collections::HashSet;

/// The class of operation being attempted. Drives the read-only/dev-only
/// gate in [`SafetyPolicy::check_operation`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum OperationClass {
    Read,
    Write,
    Create,
    Delete,
    Execute,
    Lock,
    Debug,
    Transport,
}

/// The policy's overall permissiveness level.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "snake_case")]
pub enum SafetyMode {
    /// Only `Read` operations are permitted.
    ReadOnly,
    /// Everything except `Transport` (release/assignment to a transport
    /// request) is permitted.
    DevOnly,
    #[default]
    Full,
}

/// Reason a [`SafetyPolicy`] check failed, carried back to the caller so
/// `adt-dispatcher` can surface a stable `PermissionDenied` error.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Denied {
    pub rule: &'static str,
    pub message: String,
}

impl std::fmt::Display for Denied {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}: {}", self.rule, self.message)
    }
}

/// A stateless classifier mapping an (operation-class, target-identifier)
/// pair to allow/deny.
#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct SafetyPolicy {
    #[serde(default)]
    pub mode: SafetyMode,
    #[serde(default)]
    pub allowed_packages: HashSet<String>,
    #[serde(default)]
    pub blocked_packages: HashSet<String>,
}

impl SafetyPolicy {
    pub fn new(mode: SafetyMode) -> Self {
        Self {
            mode,
            allowed_packages: HashSet::new(),
            blocked_packages: HashSet::new(),
        }
    }

    /// Rule 1–2: gate purely on operation class and mode.
    ///
    /// Does not consult package allow/block lists — callers that also have
    /// a target name should call [`SafetyPolicy::check_package`] as well
    /// (or use [`SafetyPolicy::check`] which runs both).
    pub fn check_operation(&self, class: OperationClass) -> Result<(), Denied> {
        if self.mode == SafetyMode::ReadOnly && class != OperationClass::Read {
            return Err(Denied {
                rule: "read-only mode",
                message: format!("{class:?} denied: policy is read-only"),
            });
        }
        if self.mode == SafetyMode::DevOnly && class == OperationClass::Transport {
            return Err(Denied {
                rule: "dev-only mode",
                message: "Transport denied: policy is dev-only".into(),
            });
        }
        Ok(())
    }

    /// Rules 3–6: package/name-based allow/block, evaluated in order with
    /// first-match-wins semantics. Comparisons are case-insensitive and
    /// tolerate a leading `/`.
    ///
    /// Rule 3 only applies to mutating classes (`Write`/`Create`/`Delete`):
    /// SAP-standard objects (not `Z`/`Y`-prefixed, not namespaced) are
    /// denied for those classes unless `mode == Full`.
    pub fn check_package(&self, class: OperationClass, name: &str) -> Result<(), Denied> {
        let norm = normalize(name);

        if matches!(
            class,
            OperationClass::Write | OperationClass::Create | OperationClass::Delete
        ) && !is_development_domain(&norm, name)
            && self.mode != SafetyMode::Full
        {
            return Err(Denied {
                rule: "sap-standard object",
                message: format!(
                    "{name} is not in the customer development namespace (Z/Y/namespaced); \
                     denied for {class:?} unless mode is full"
                ),
            });
        }

        if self.blocked_packages.iter().any(|b| normalize(b) == norm) {
            return Err(Denied {
                rule: "blocked package",
                message: format!("{name} is in BlockedPackages"),
            });
        }

        if !self.allowed_packages.is_empty()
            && !self.allowed_packages.iter().any(|a| normalize(a) == norm)
        {
            return Err(Denied {
                rule: "not in allowed packages",
                message: format!("{name} is not in AllowedPackages"),
            });
        }

        Ok(())
    }

    /// Run both [`SafetyPolicy::check_operation`] and
    /// [`SafetyPolicy::check_package`].
    pub fn check(&self, class: OperationClass, name: &str) -> Result<(), Denied> {
        self.check_operation(class)?;
        self.check_package(class, name)
    }
}

/// Case-insensitive, leading-slash-tolerant normalization for package/name
/// comparisons.
fn normalize(s: &str) -> String {
    s.trim_start_matches('/').to_uppercase()
}

/// A name is in the "development domain" if it is customer-prefixed
/// (`Z`/`Y`) or namespaced (`/NS/...`). `normalize` strips the leading
/// `/` before comparisons, so namespacing has to be read off the
/// original, un-normalized name.
fn is_development_domain(normalized_name: &str, original_name: &str) -> bool {
    normalized_name.starts_with('Z') || normalized_name.starts_with('Y') || original_name.starts_with('/')
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn read_only_denies_write() {
        let policy = SafetyPolicy::new(SafetyMode::ReadOnly);
        assert!(policy.check_operation(OperationClass::Read).is_ok());
        assert!(policy.check_operation(OperationClass::Write).is_err());
    }

    #[test]
    fn dev_only_denies_transport_only() {
        let policy = SafetyPolicy::new(SafetyMode::DevOnly);
        assert!(policy.check_operation(OperationClass::Write).is_ok());
        assert!(policy.check_operation(OperationClass::Transport).is_err());
    }

    #[test]
    fn full_mode_allows_everything_operation_wise() {
        let policy = SafetyPolicy::new(SafetyMode::Full);
        for class in [
            OperationClass::Read,
            OperationClass::Write,
            OperationClass::Create,
            OperationClass::Delete,
            OperationClass::Execute,
            OperationClass::Lock,
            OperationClass::Debug,
            OperationClass::Transport,
        ] {
            assert!(policy.check_operation(class).is_ok());
        }
    }

    #[test]
    fn sap_standard_object_denied_for_write_unless_full() {
        let policy = SafetyPolicy::new(SafetyMode::DevOnly);
        assert!(policy.check_package(OperationClass::Write, "SAPLSOMETHING").is_err());
        assert!(policy.check_package(OperationClass::Read, "SAPLSOMETHING").is_ok());

        let full = SafetyPolicy::new(SafetyMode::Full);
        assert!(full.check_package(OperationClass::Write, "SAPLSOMETHING").is_ok());
    }

    #[test]
    fn customer_prefixed_allowed_for_write() {
        let policy = SafetyPolicy::new(SafetyMode::DevOnly);
        assert!(policy.check_package(OperationClass::Write, "ZTEST").is_ok());
        assert!(policy.check_package(OperationClass::Write, "ycustom").is_ok());
    }

    #[test]
    fn namespaced_name_allowed_for_write() {
        let policy = SafetyPolicy::new(SafetyMode::DevOnly);
        assert!(policy
            .check_package(OperationClass::Write, "/DMO/CL_X")
            .is_ok());
    }

    #[test]
    fn blocked_packages_deny_case_insensitively() {
        let mut policy = SafetyPolicy::new(SafetyMode::Full);
        policy.blocked_packages.insert("ZBLOCKED".into());
        assert!(policy.check_package(OperationClass::Read, "zblocked").is_err());
        assert!(policy.check_package(OperationClass::Read, "zother").is_ok());
    }

    #[test]
    fn allowed_packages_restricts_when_nonempty() {
        let mut policy = SafetyPolicy::new(SafetyMode::Full);
        policy.allowed_packages.insert("ZGOOD".into());
        assert!(policy.check_package(OperationClass::Read, "ZGOOD").is_ok());
        assert!(policy.check_package(OperationClass::Read, "ZOTHER").is_err());
    }

    #[test]
    fn allowed_packages_tolerates_leading_slash() {
        let mut policy = SafetyPolicy::new(SafetyMode::Full);
        policy.allowed_packages.insert("/DMO/GOOD".into());
        assert!(policy
            .check_package(OperationClass::Read, "/dmo/good")
            .is_ok());
    }

    #[test]
    fn blocked_takes_priority_over_allowed() {
        let mut policy = SafetyPolicy::new(SafetyMode::Full);
        policy.allowed_packages.insert("ZDUAL".into());
        policy.blocked_packages.insert("ZDUAL".into());
        assert!(policy.check_package(OperationClass::Read, "ZDUAL").is_err());
    }

    #[test]
    fn check_runs_operation_then_package() {
        let policy = SafetyPolicy::new(SafetyMode::ReadOnly);
        let err = policy.check(OperationClass::Write, "ZTEST").unwrap_err();
        assert_eq!(err.rule, "read-only mode");
    }
}
