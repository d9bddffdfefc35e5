//! Tollgate - Request Admission Service
//!
//! This crate implements a request admission service built around a
//! per-identifier, fixed-window rate limiter. Request handlers consult it
//! before performing expensive downstream work (AI calls, authentication
//! attempts, payment actions). State is process-local: each service
//! instance enforces its own best-effort bound.

pub mod config;
pub mod error;
pub mod http;
pub mod ratelimit;
