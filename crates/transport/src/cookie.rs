//! Per-[`crate::Transport`] cookie jar.
//!
//! Guarded by [`parking_lot::RwLock`]: attaching the current cookie set to
//! an outgoing request is the hot path and takes a read lock; updating the
//! jar from a `Set-Cookie` response is rare and takes a write lock.

use parking_lot::RwLock;
use std::collections::HashMap;

#[derive(Debug, Default)]
pub struct CookieJar {
    inner: RwLock<HashMap<String, String>>,
}

impl CookieJar {
    pub fn new() -> Self {
        Self::default()
    }

    /// Seed the jar with caller-supplied overrides (spec.md §3 `Config`
    /// `cookie overrides`).
    pub fn with_overrides(overrides: &HashMap<String, String>) -> Self {
        let jar = Self::new();
        jar.inner.write().extend(overrides.clone());
        jar
    }

    /// Render the current jar as a `Cookie:` header value.
    pub fn header_value(&self) -> Option<String> {
        let guard = self.inner.read();
        if guard.is_empty() {
            return None;
        }
        Some(
            guard
                .iter()
                .map(|(k, v)| format!("{k}={v}"))
                .collect::<Vec<_>>()
                .join("; "),
        )
    }

    /// Parse and absorb every `Set-Cookie` header value from a response.
    pub fn absorb_set_cookie(&self, values: impl IntoIterator<Item = impl AsRef<str>>) {
        let mut guard = self.inner.write();
        for v in values {
            if let Some((name, value)) = parse_set_cookie(v.as_ref()) {
                guard.insert(name, value);
            }
        }
    }

    /// True if the jar holds a `SAP_SESSIONID_*` cookie, meaning the
    /// session is already authenticated and Basic auth can be skipped.
    pub fn has_sap_session(&self) -> bool {
        self.inner
            .read()
            .keys()
            .any(|k| k.starts_with("SAP_SESSIONID_"))
    }
}

/// Extract `name=value` from a `Set-Cookie` header, ignoring attributes
/// (`Path`, `Secure`, `HttpOnly`, …) that follow the first `;`.
fn parse_set_cookie(raw: &str) -> Option<(String, String)> {
    let first = raw.split(';').next()?.trim();
    let (name, value) = first.split_once('=')?;
    let name = name.trim();
    if name.is_empty() {
        return None;
    }
    Some((name.to_string(), value.trim().to_string()))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn empty_jar_has_no_header() {
        let jar = CookieJar::new();
        assert_eq!(jar.header_value(), None);
    }

    #[test]
    fn absorbs_set_cookie_and_renders_header() {
        let jar = CookieJar::new();
        jar.absorb_set_cookie(["SAP_SESSIONID_ABC=xyz123; Path=/; Secure; HttpOnly"]);
        assert_eq!(jar.header_value(), Some("SAP_SESSIONID_ABC=xyz123".into()));
        assert!(jar.has_sap_session());
    }

    #[test]
    fn later_set_cookie_overwrites_same_name() {
        let jar = CookieJar::new();
        jar.absorb_set_cookie(["foo=1"]);
        jar.absorb_set_cookie(["foo=2"]);
        assert_eq!(jar.header_value(), Some("foo=2".into()));
    }

    #[test]
    fn with_overrides_seeds_initial_cookies() {
        let mut overrides = HashMap::new();
        overrides.insert("SAP_SESSIONID_XYZ".to_string(), "preset".to_string());
        let jar = CookieJar::with_overrides(&overrides);
        assert!(jar.has_sap_session());
    }

    #[test]
    fn ignores_malformed_set_cookie() {
        let jar = CookieJar::new();
        jar.absorb_set_cookie(["not-a-cookie-pair"]);
        assert_eq!(jar.header_value(), None);
    }
}
