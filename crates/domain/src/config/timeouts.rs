use serde::{Deserialize, Serialize};

/// Request timeout configuration.
///
/// The CSRF retry-once behavior (spec.md §4.2) is a protocol invariant,
/// not configurable; only the wall-clock budgets are.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
pub struct TimeoutConfig {
    /// Default timeout for ordinary Transport requests, in seconds.
    #[serde(default = "d_request_secs")]
    pub request_secs: u64,
    /// Ceiling for the debug listener's long-poll request, in seconds.
    /// Spec.md §4.7/§5 caps this at 5 minutes.
    #[serde(default = "d_debug_listener_secs")]
    pub debug_listener_secs: u64,
}

impl Default for TimeoutConfig {
    fn default() -> Self {
        Self {
            request_secs: d_request_secs(),
            debug_listener_secs: d_debug_listener_secs(),
        }
    }
}

impl TimeoutConfig {
    /// Clamp `debug_listener_secs` to the spec-mandated 5-minute ceiling.
    pub fn clamped(mut self) -> Self {
        self.debug_listener_secs = self.debug_listener_secs.min(300);
        self
    }
}

fn d_request_secs() -> u64 {
    30
}
fn d_debug_listener_secs() -> u64 {
    60
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn clamp_caps_listener_timeout_at_five_minutes() {
        let t = TimeoutConfig {
            request_secs: 30,
            debug_listener_secs: 900,
        }
        .clamped();
        assert_eq!(t.debug_listener_secs, 300);
    }

    #[test]
    fn clamp_leaves_small_values_untouched() {
        let t = TimeoutConfig {
            request_secs: 30,
            debug_listener_secs: 45,
        }
        .clamped();
        assert_eq!(t.debug_listener_secs, 45);
    }
}
