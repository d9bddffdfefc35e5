//! Admission limiting logic and state management.

mod backend;
mod clock;
mod key;
mod limiter;
mod policy;

pub use backend::AdmissionBackend;
pub use clock::{Clock, SystemClock};
pub use key::WindowKey;
pub use limiter::{AdmissionLimiter, Decision};
pub use policy::{Policy, PolicyKind, PolicySet};

#[cfg(test)]
pub use clock::test::ManualClock;
