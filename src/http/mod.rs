//! HTTP server module for the admission API.

mod server;
mod service;

pub use server::HttpServer;
pub use service::{admission_router, AdmissionRequest, AppState};
