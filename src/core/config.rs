//! # Per-instance messenger configuration.
//!
//! Provides [`MessengerConfig`] centralized settings for one messenger
//! instance, fixed at construction.
//!
//! Config is used in two ways:
//! 1. **Instance creation**: `Messenger::with_config(config)`
//! 2. **Shorthand constructors**: `Messenger::strong()` / `Messenger::weak()`
//!    pick a [`Retention`] and keep everything else at defaults.

/// How a messenger instance holds its recipients.
///
/// One policy per instance, fixed at construction; the strong and weak
/// messengers are two configurations of the same machinery, not separate
/// implementations.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Retention {
    /// Registrations own their recipient; it lives until explicitly
    /// unregistered (or the instance is reset).
    Strong,
    /// Registrations never keep their recipient alive; entries die with
    /// the last external `Arc` and are pruned lazily.
    Weak,
}

/// What dispatch does when a handler panics mid-broadcast.
///
/// Broadcast messages carry no acknowledgment channel for partial failure,
/// so neither policy hides a faulty subscriber: both surface the captured
/// panics to the sender.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Default)]
pub enum ErrorPolicy {
    /// Abort the remaining handlers in the snapshot on the first panic.
    #[default]
    FailFast,
    /// Keep invoking the remaining handlers and aggregate every panic.
    ContinueOnError,
}

impl ErrorPolicy {
    /// True when a handler panic should abort the rest of the snapshot.
    #[inline]
    pub fn fail_fast(&self) -> bool {
        matches!(self, ErrorPolicy::FailFast)
    }
}

/// Configuration for one messenger instance.
///
/// ## Field semantics
/// - `retention`: strong vs weak recipient lifecycle (see [`Retention`])
/// - `errors`: fail-fast vs continue-on-error dispatch (see [`ErrorPolicy`])
#[derive(Clone, Copy, Debug)]
pub struct MessengerConfig {
    /// Recipient lifecycle policy for every registration in the instance.
    pub retention: Retention,
    /// Handler-panic policy for every send in the instance.
    pub errors: ErrorPolicy,
}

impl Default for MessengerConfig {
    /// Default configuration:
    ///
    /// - `retention = Strong` (nothing disappears without an explicit
    ///   unregister)
    /// - `errors = FailFast` (deterministic abort on the first panic)
    fn default() -> Self {
        Self {
            retention: Retention::Strong,
            errors: ErrorPolicy::FailFast,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_is_strong_and_fail_fast() {
        let config = MessengerConfig::default();
        assert_eq!(config.retention, Retention::Strong);
        assert_eq!(config.errors, ErrorPolicy::FailFast);
        assert!(config.errors.fail_fast());
    }

    #[test]
    fn test_continue_policy_is_not_fail_fast() {
        assert!(!ErrorPolicy::ContinueOnError.fail_fast());
    }
}
