//! Configuration management for Tollgate.

use serde::{Deserialize, Serialize};
use std::net::SocketAddr;

use crate::error::Result;
use crate::ratelimit::{Policy, PolicySet};

/// Main configuration for the Tollgate service.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct TollgateConfig {
    /// Server configuration
    #[serde(default)]
    pub server: ServerConfig,

    /// Named admission policies
    #[serde(default)]
    pub policies: PoliciesConfig,

    /// Limiter tuning
    #[serde(default)]
    pub limiter: LimiterSettings,
}

/// Server configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ServerConfig {
    /// HTTP server address
    #[serde(default = "default_http_addr")]
    pub http_addr: SocketAddr,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            http_addr: default_http_addr(),
        }
    }
}

fn default_http_addr() -> SocketAddr {
    "127.0.0.1:8080".parse().unwrap()
}

/// Admission policies per endpoint category.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PoliciesConfig {
    /// Authentication endpoints (login, signup)
    #[serde(default = "default_auth_policy")]
    pub auth: Policy,

    /// AI-backed endpoints (contract generation)
    #[serde(default = "default_ai_policy")]
    pub ai: Policy,

    /// General traffic
    #[serde(default = "default_general_policy")]
    pub general: Policy,

    /// Payment endpoints
    #[serde(default = "default_payment_policy")]
    pub payment: Policy,
}

impl Default for PoliciesConfig {
    fn default() -> Self {
        Self {
            auth: default_auth_policy(),
            ai: default_ai_policy(),
            general: default_general_policy(),
            payment: default_payment_policy(),
        }
    }
}

fn default_auth_policy() -> Policy {
    Policy {
        max_requests: 5,
        window_ms: 900_000,
    }
}

fn default_ai_policy() -> Policy {
    Policy {
        max_requests: 10,
        window_ms: 3_600_000,
    }
}

fn default_general_policy() -> Policy {
    Policy {
        max_requests: 60,
        window_ms: 60_000,
    }
}

fn default_payment_policy() -> Policy {
    Policy {
        max_requests: 10,
        window_ms: 60_000,
    }
}

impl PoliciesConfig {
    /// Validate all policies and resolve them into a [`PolicySet`].
    ///
    /// Deserialization does not enforce positive parameters, so this is
    /// where misconfiguration is refused.
    pub fn to_policy_set(&self) -> Result<PolicySet> {
        for policy in [&self.auth, &self.ai, &self.general, &self.payment] {
            policy.validate()?;
        }

        Ok(PolicySet {
            auth: self.auth,
            ai: self.ai,
            general: self.general,
            payment: self.payment,
        })
    }
}

/// Limiter tuning.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LimiterSettings {
    /// Minimum interval between expired-entry sweeps, in seconds
    #[serde(default = "default_cleanup_interval")]
    pub cleanup_interval_secs: u64,
}

impl Default for LimiterSettings {
    fn default() -> Self {
        Self {
            cleanup_interval_secs: default_cleanup_interval(),
        }
    }
}

fn default_cleanup_interval() -> u64 {
    60
}

impl TollgateConfig {
    /// Load configuration from a file path.
    pub fn from_file(path: &str) -> Result<Self> {
        let contents = std::fs::read_to_string(path)?;
        let config: TollgateConfig = serde_yaml::from_str(&contents)
            .map_err(|e| crate::error::TollgateError::Config(e.to_string()))?;
        Ok(config)
    }
}
