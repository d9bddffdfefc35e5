//! Core admission limiter implementation.

use std::collections::HashMap;
use std::sync::Arc;

use parking_lot::Mutex;
use serde::Serialize;
use tracing::{debug, trace};

use super::clock::Clock;
use super::key::WindowKey;
use super::policy::Policy;

/// Minimum interval between expired-entry sweeps, in milliseconds.
const DEFAULT_SWEEP_INTERVAL_MS: i64 = 60_000;

/// Outcome of a `check` or `peek` call.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Decision {
    /// Whether the request may proceed
    pub allowed: bool,
    /// The policy's configured maximum
    pub limit: u32,
    /// Requests left in the current window after this decision
    pub remaining: u32,
    /// Epoch milliseconds at which the window expires
    pub reset_at_ms: i64,
    /// Whole seconds to wait before retrying, present on rejection only.
    /// Always the ceiling of the remaining window time.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub retry_after_secs: Option<u64>,
}

/// Per-key window state.
#[derive(Debug, Clone)]
struct WindowEntry {
    /// Requests admitted so far in the current window
    count: u32,
    /// Epoch milliseconds at which the window expires
    reset_at_ms: i64,
}

struct Store {
    entries: HashMap<WindowKey, WindowEntry>,
    last_sweep_ms: i64,
}

/// The core admission limiter: a per-identifier fixed-window counter.
///
/// This struct is thread-safe and can be shared across multiple tasks. All
/// window state is owned here and is process-local: in a horizontally
/// scaled deployment each instance enforces its own bound.
pub struct AdmissionLimiter {
    /// Window entries indexed by (policy parameters, identifier)
    store: Mutex<Store>,
    /// Minimum interval between expired-entry sweeps
    sweep_interval_ms: i64,
    /// Time source, injected for deterministic tests
    clock: Arc<dyn Clock>,
}

impl AdmissionLimiter {
    /// Create a limiter with the default sweep interval.
    pub fn new(clock: Arc<dyn Clock>) -> Self {
        Self::with_sweep_interval(clock, DEFAULT_SWEEP_INTERVAL_MS)
    }

    /// Create a limiter with a custom sweep interval in milliseconds.
    pub fn with_sweep_interval(clock: Arc<dyn Clock>, sweep_interval_ms: i64) -> Self {
        let last_sweep_ms = clock.now_ms();
        Self {
            store: Mutex::new(Store {
                entries: HashMap::new(),
                last_sweep_ms,
            }),
            sweep_interval_ms,
            clock,
        }
    }

    /// Decide whether a request for `identifier` may proceed under `policy`.
    ///
    /// Admission consumes quota: the entry's count is incremented (or a
    /// fresh window started) before the decision is returned. The store
    /// mutex is held for the whole read-modify-write, so the count never
    /// exceeds the policy maximum under concurrent calls.
    pub fn check(&self, policy: &Policy, identifier: &str) -> Decision {
        let key = WindowKey::new(policy, identifier);
        let mut store = self.store.lock();
        let now = self.clock.now_ms();

        Self::maybe_sweep(&mut store, now, self.sweep_interval_ms);

        trace!(key = %key, "Checking admission");

        match store.entries.get_mut(&key) {
            // Window boundaries are right-open: a request landing exactly
            // at reset_at starts a new window.
            Some(entry) if now < entry.reset_at_ms => {
                if entry.count >= policy.max_requests {
                    let retry_after = Self::retry_after_secs(entry.reset_at_ms, now);
                    debug!(
                        key = %key,
                        retry_after_secs = retry_after,
                        "Admission rejected"
                    );
                    Decision {
                        allowed: false,
                        limit: policy.max_requests,
                        remaining: 0,
                        reset_at_ms: entry.reset_at_ms,
                        retry_after_secs: Some(retry_after),
                    }
                } else {
                    entry.count += 1;
                    Decision {
                        allowed: true,
                        limit: policy.max_requests,
                        remaining: policy.max_requests - entry.count,
                        reset_at_ms: entry.reset_at_ms,
                        retry_after_secs: None,
                    }
                }
            }
            _ => {
                let reset_at_ms = now + policy.window_ms as i64;
                store.entries.insert(
                    key,
                    WindowEntry {
                        count: 1,
                        reset_at_ms,
                    },
                );
                Decision {
                    allowed: true,
                    limit: policy.max_requests,
                    remaining: policy.max_requests - 1,
                    reset_at_ms,
                    retry_after_secs: None,
                }
            }
        }
    }

    /// Report the state for `identifier` under `policy` without mutating it.
    ///
    /// No entry is created and no count is incremented. A missing or
    /// expired entry reports the full quota a fresh window would offer.
    pub fn peek(&self, policy: &Policy, identifier: &str) -> Decision {
        let key = WindowKey::new(policy, identifier);
        let store = self.store.lock();
        let now = self.clock.now_ms();

        match store.entries.get(&key) {
            Some(entry) if now < entry.reset_at_ms => {
                let allowed = entry.count < policy.max_requests;
                Decision {
                    allowed,
                    limit: policy.max_requests,
                    remaining: policy.max_requests.saturating_sub(entry.count),
                    reset_at_ms: entry.reset_at_ms,
                    retry_after_secs: if allowed {
                        None
                    } else {
                        Some(Self::retry_after_secs(entry.reset_at_ms, now))
                    },
                }
            }
            _ => Decision {
                allowed: true,
                limit: policy.max_requests,
                remaining: policy.max_requests,
                reset_at_ms: now + policy.window_ms as i64,
                retry_after_secs: None,
            },
        }
    }

    /// Unconditionally delete the entry for `identifier` under `policy`.
    ///
    /// Administrative override: the next `check` always starts a fresh
    /// window.
    pub fn reset(&self, policy: &Policy, identifier: &str) {
        let key = WindowKey::new(policy, identifier);
        let mut store = self.store.lock();
        if store.entries.remove(&key).is_some() {
            debug!(key = %key, "Admission window reset");
        }
    }

    /// Get the number of live window entries.
    pub fn entry_count(&self) -> usize {
        self.store.lock().entries.len()
    }

    /// Clear all window entries.
    ///
    /// This is primarily useful for testing.
    pub fn clear(&self) {
        self.store.lock().entries.clear();
    }

    /// Drop expired entries, at most once per sweep interval.
    ///
    /// Best-effort hygiene to bound memory growth; correctness never
    /// depends on it because `check` and `peek` treat expired entries as
    /// absent.
    fn maybe_sweep(store: &mut Store, now_ms: i64, sweep_interval_ms: i64) {
        if now_ms - store.last_sweep_ms < sweep_interval_ms {
            return;
        }

        let before = store.entries.len();
        store.entries.retain(|_, entry| entry.reset_at_ms > now_ms);
        store.last_sweep_ms = now_ms;

        let removed = before - store.entries.len();
        if removed > 0 {
            debug!(removed, "Swept expired admission windows");
        }
    }

    /// Seconds until the window resets, rounded up so callers never
    /// under-wait.
    fn retry_after_secs(reset_at_ms: i64, now_ms: i64) -> u64 {
        ((reset_at_ms - now_ms).max(0) as u64).div_ceil(1000)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use super::super::clock::test::ManualClock;

    fn limiter_at(start_ms: i64) -> (AdmissionLimiter, Arc<ManualClock>) {
        let clock = Arc::new(ManualClock::new(start_ms));
        (AdmissionLimiter::new(clock.clone()), clock)
    }

    fn policy(max_requests: u32, window_ms: u64) -> Policy {
        Policy::new(max_requests, window_ms).unwrap()
    }

    #[test]
    fn test_admits_up_to_limit_then_rejects() {
        let (limiter, clock) = limiter_at(0);
        let policy = policy(3, 1_000);

        let first = limiter.check(&policy, "u1");
        assert!(first.allowed);
        assert_eq!(first.remaining, 2);
        assert_eq!(first.reset_at_ms, 1_000);

        clock.set(100);
        let second = limiter.check(&policy, "u1");
        assert!(second.allowed);
        assert_eq!(second.remaining, 1);

        clock.set(200);
        let third = limiter.check(&policy, "u1");
        assert!(third.allowed);
        assert_eq!(third.remaining, 0);

        clock.set(300);
        let fourth = limiter.check(&policy, "u1");
        assert!(!fourth.allowed);
        assert_eq!(fourth.remaining, 0);
        assert_eq!(fourth.reset_at_ms, 1_000);
        // 700ms left, rounded up to a whole second
        assert_eq!(fourth.retry_after_secs, Some(1));
    }

    #[test]
    fn test_expired_window_starts_fresh() {
        let (limiter, clock) = limiter_at(0);
        let policy = policy(3, 1_000);

        for _ in 0..3 {
            assert!(limiter.check(&policy, "u1").allowed);
        }
        assert!(!limiter.check(&policy, "u1").allowed);

        clock.set(1_001);
        let decision = limiter.check(&policy, "u1");
        assert!(decision.allowed);
        assert_eq!(decision.remaining, 2);
        assert_eq!(decision.reset_at_ms, 2_001);
    }

    #[test]
    fn test_window_boundary_is_right_open() {
        let (limiter, clock) = limiter_at(0);
        let policy = policy(1, 1_000);

        assert!(limiter.check(&policy, "u1").allowed);
        assert!(!limiter.check(&policy, "u1").allowed);

        // A request landing exactly at reset_at starts a new window.
        clock.set(1_000);
        let decision = limiter.check(&policy, "u1");
        assert!(decision.allowed);
        assert_eq!(decision.reset_at_ms, 2_000);
    }

    #[test]
    fn test_retry_after_rounds_up() {
        let (limiter, clock) = limiter_at(0);
        let policy = policy(1, 2_500);

        assert!(limiter.check(&policy, "u1").allowed);

        clock.set(100);
        let decision = limiter.check(&policy, "u1");
        // 2400ms left -> 3 seconds
        assert_eq!(decision.retry_after_secs, Some(3));

        clock.set(2_499);
        let decision = limiter.check(&policy, "u1");
        // 1ms left still rounds up to a whole second
        assert_eq!(decision.retry_after_secs, Some(1));
    }

    #[test]
    fn test_peek_is_side_effect_free() {
        let (limiter, _clock) = limiter_at(0);
        let policy = policy(3, 1_000);

        let fresh = limiter.peek(&policy, "u1");
        assert!(fresh.allowed);
        assert_eq!(fresh.remaining, 3);
        assert_eq!(limiter.entry_count(), 0);

        for _ in 0..5 {
            limiter.peek(&policy, "u1");
        }

        // All three admissions still available after peeking
        for expected_remaining in [2, 1, 0] {
            let decision = limiter.check(&policy, "u1");
            assert!(decision.allowed);
            assert_eq!(decision.remaining, expected_remaining);
        }
        assert!(!limiter.check(&policy, "u1").allowed);
    }

    #[test]
    fn test_peek_reports_exhausted_window() {
        let (limiter, _clock) = limiter_at(0);
        let policy = policy(2, 1_000);

        limiter.check(&policy, "u1");
        limiter.check(&policy, "u1");

        let decision = limiter.peek(&policy, "u1");
        assert!(!decision.allowed);
        assert_eq!(decision.remaining, 0);
        assert_eq!(decision.retry_after_secs, Some(1));
    }

    #[test]
    fn test_reset_clears_window() {
        let (limiter, _clock) = limiter_at(0);
        let policy = policy(2, 1_000);

        limiter.check(&policy, "u1");
        limiter.check(&policy, "u1");
        assert!(!limiter.check(&policy, "u1").allowed);

        limiter.reset(&policy, "u1");

        let decision = limiter.check(&policy, "u1");
        assert!(decision.allowed);
        assert_eq!(decision.remaining, 1);
    }

    #[test]
    fn test_identifiers_are_independent() {
        let (limiter, _clock) = limiter_at(0);
        let policy = policy(2, 1_000);

        limiter.check(&policy, "u1");
        limiter.check(&policy, "u1");
        assert!(!limiter.check(&policy, "u1").allowed);

        let decision = limiter.check(&policy, "u2");
        assert!(decision.allowed);
        assert_eq!(decision.remaining, 1);
    }

    #[test]
    fn test_policies_are_independent() {
        let (limiter, _clock) = limiter_at(0);
        let auth = policy(1, 1_000);
        let general = policy(5, 1_000);

        assert!(limiter.check(&auth, "u1").allowed);
        assert!(!limiter.check(&auth, "u1").allowed);

        let decision = limiter.check(&general, "u1");
        assert!(decision.allowed);
        assert_eq!(decision.remaining, 4);
    }

    #[test]
    fn test_sweep_removes_expired_entries() {
        let clock = Arc::new(ManualClock::new(0));
        let limiter = AdmissionLimiter::with_sweep_interval(clock.clone(), 60_000);
        let policy = policy(3, 1_000);

        limiter.check(&policy, "u1");
        limiter.check(&policy, "u2");
        assert_eq!(limiter.entry_count(), 2);

        clock.set(61_000);
        limiter.check(&policy, "u3");
        assert_eq!(limiter.entry_count(), 1);
    }

    #[test]
    fn test_sweep_is_time_gated() {
        let clock = Arc::new(ManualClock::new(0));
        let limiter = AdmissionLimiter::with_sweep_interval(clock.clone(), 60_000);
        let policy = policy(3, 1_000);

        limiter.check(&policy, "u1");

        // u1's window has expired but the sweep is not yet due, so the
        // stale entry stays in the map.
        clock.set(2_000);
        limiter.check(&policy, "u2");
        assert_eq!(limiter.entry_count(), 2);
    }

    #[test]
    fn test_clear_entries() {
        let (limiter, _clock) = limiter_at(0);
        let policy = policy(3, 1_000);

        limiter.check(&policy, "u1");
        assert_eq!(limiter.entry_count(), 1);

        limiter.clear();
        assert_eq!(limiter.entry_count(), 0);
    }
}
