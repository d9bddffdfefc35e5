//! Admission backend trait for abstracting counter stores.

use async_trait::async_trait;

use super::limiter::{AdmissionLimiter, Decision};
use super::policy::Policy;

/// Trait over admission counter stores.
///
/// The in-memory [`AdmissionLimiter`] gives a best-effort, per-instance
/// bound. A shared external counter store can implement the same interface
/// to make the bound global without changing call sites.
#[async_trait]
pub trait AdmissionBackend: Send + Sync {
    /// Decide whether a request may proceed, consuming quota on admission.
    async fn check(&self, policy: &Policy, identifier: &str) -> Decision;

    /// Report the current state without consuming quota.
    async fn peek(&self, policy: &Policy, identifier: &str) -> Decision;

    /// Delete the window entry, letting the identifier start fresh.
    async fn reset(&self, policy: &Policy, identifier: &str);
}

#[async_trait]
impl AdmissionBackend for AdmissionLimiter {
    async fn check(&self, policy: &Policy, identifier: &str) -> Decision {
        AdmissionLimiter::check(self, policy, identifier)
    }

    async fn peek(&self, policy: &Policy, identifier: &str) -> Decision {
        AdmissionLimiter::peek(self, policy, identifier)
    }

    async fn reset(&self, policy: &Policy, identifier: &str) {
        AdmissionLimiter::reset(self, policy, identifier)
    }
}
