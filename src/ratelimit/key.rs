//! Window key generation and handling.

use super::policy::Policy;

/// A key that uniquely identifies one counting window.
///
/// The policy parameters are part of the key, so distinct policies never
/// collide even when applied to the same identifier.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct WindowKey {
    /// Maximum requests of the policy this window belongs to
    pub max_requests: u32,
    /// Window duration of the policy this window belongs to
    pub window_ms: u64,
    /// Opaque requester identifier (user id, IP address, session id)
    pub identifier: String,
}

impl WindowKey {
    /// Create a window key for a policy and identifier.
    pub fn new(policy: &Policy, identifier: &str) -> Self {
        Self {
            max_requests: policy.max_requests,
            window_ms: policy.window_ms,
            identifier: identifier.to_string(),
        }
    }
}

impl std::fmt::Display for WindowKey {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(
            f,
            "{}/{}ms:{}",
            self.max_requests, self.window_ms, self.identifier
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_window_key_creation() {
        let policy = Policy::new(10, 60_000).unwrap();
        let key = WindowKey::new(&policy, "user:42");

        assert_eq!(key.max_requests, 10);
        assert_eq!(key.window_ms, 60_000);
        assert_eq!(key.identifier, "user:42");
    }

    #[test]
    fn test_window_key_equality() {
        let policy = Policy::new(10, 60_000).unwrap();

        let key1 = WindowKey::new(&policy, "user:42");
        let key2 = WindowKey::new(&policy, "user:42");
        assert_eq!(key1, key2);
    }

    #[test]
    fn test_distinct_policies_produce_distinct_keys() {
        let auth = Policy::new(5, 60_000).unwrap();
        let general = Policy::new(100, 60_000).unwrap();

        let key1 = WindowKey::new(&auth, "user:42");
        let key2 = WindowKey::new(&general, "user:42");
        assert_ne!(key1, key2);
    }

    #[test]
    fn test_window_key_display() {
        let policy = Policy::new(10, 60_000).unwrap();
        let key = WindowKey::new(&policy, "ip:10.0.0.1");
        assert_eq!(key.to_string(), "10/60000ms:ip:10.0.0.1");
    }
}
