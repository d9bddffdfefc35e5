//! Admission policy definitions.

use serde::{Deserialize, Serialize};

use crate::error::{Result, TollgateError};

/// A fixed-window admission policy: at most `max_requests` admitted
/// requests per `window_ms` milliseconds.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Policy {
    /// Maximum requests admitted per window
    pub max_requests: u32,
    /// Window duration in milliseconds
    pub window_ms: u64,
}

impl Policy {
    /// Create a policy, rejecting non-positive parameters.
    pub fn new(max_requests: u32, window_ms: u64) -> Result<Self> {
        let policy = Self {
            max_requests,
            window_ms,
        };
        policy.validate()?;
        Ok(policy)
    }

    /// Reject non-positive parameters.
    ///
    /// Policies that arrive through deserialization bypass [`Policy::new`]
    /// and must be validated before use.
    pub fn validate(&self) -> Result<()> {
        if self.max_requests == 0 {
            return Err(TollgateError::Config(
                "max_requests must be positive".to_string(),
            ));
        }
        if self.window_ms == 0 {
            return Err(TollgateError::Config(
                "window_ms must be positive".to_string(),
            ));
        }
        Ok(())
    }
}

/// Endpoint categories, each gated by its own admission policy.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PolicyKind {
    /// Authentication endpoints (login, signup)
    Auth,
    /// AI-backed endpoints (contract generation)
    Ai,
    /// General traffic
    General,
    /// Payment endpoints
    Payment,
}

impl PolicyKind {
    /// Parse a policy name as used by the admission API.
    pub fn parse(name: &str) -> Result<Self> {
        match name {
            "auth" => Ok(PolicyKind::Auth),
            "ai" => Ok(PolicyKind::Ai),
            "general" => Ok(PolicyKind::General),
            "payment" => Ok(PolicyKind::Payment),
            other => Err(TollgateError::UnknownPolicy(other.to_string())),
        }
    }

    /// The name used by the admission API and in logs.
    pub fn as_str(&self) -> &'static str {
        match self {
            PolicyKind::Auth => "auth",
            PolicyKind::Ai => "ai",
            PolicyKind::General => "general",
            PolicyKind::Payment => "payment",
        }
    }
}

impl std::fmt::Display for PolicyKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// Resolved policies for every endpoint category.
#[derive(Debug, Clone, Copy)]
pub struct PolicySet {
    pub auth: Policy,
    pub ai: Policy,
    pub general: Policy,
    pub payment: Policy,
}

impl PolicySet {
    /// Get the policy for an endpoint category.
    pub fn get(&self, kind: PolicyKind) -> Policy {
        match kind {
            PolicyKind::Auth => self.auth,
            PolicyKind::Ai => self.ai,
            PolicyKind::General => self.general,
            PolicyKind::Payment => self.payment,
        }
    }
}
