//! HTTP server implementation.

use std::net::SocketAddr;
use std::sync::Arc;

use tokio::net::TcpListener;
use tracing::{error, info};

use super::service::{admission_router, AppState};
use crate::error::{Result, TollgateError};
use crate::ratelimit::{AdmissionBackend, AdmissionLimiter, PolicySet};

/// HTTP server for the admission API.
pub struct HttpServer<B: AdmissionBackend + 'static> {
    /// Address to bind to
    addr: SocketAddr,
    /// The admission backend instance
    backend: Arc<B>,
    /// Resolved policies per endpoint category
    policies: PolicySet,
}

impl HttpServer<AdmissionLimiter> {
    /// Create a new HTTP server backed by the in-memory limiter.
    pub fn new(addr: SocketAddr, limiter: Arc<AdmissionLimiter>, policies: PolicySet) -> Self {
        Self {
            addr,
            backend: limiter,
            policies,
        }
    }
}

impl<B: AdmissionBackend + 'static> HttpServer<B> {
    /// Create a new HTTP server with a custom admission backend.
    pub fn with_backend(addr: SocketAddr, backend: Arc<B>, policies: PolicySet) -> Self {
        Self {
            addr,
            backend,
            policies,
        }
    }

    /// Start the HTTP server.
    ///
    /// This method will block until the server is shut down.
    pub async fn serve(self) -> Result<()> {
        let router = admission_router(AppState {
            backend: self.backend,
            policies: self.policies,
        });

        info!(addr = %self.addr, "Starting HTTP server for admission API");

        let listener = TcpListener::bind(self.addr).await?;
        axum::serve(listener, router).await.map_err(|e| {
            error!(error = %e, "HTTP server failed");
            TollgateError::Io(e)
        })
    }

    /// Start the HTTP server with graceful shutdown.
    ///
    /// The server will shut down when the provided signal resolves.
    pub async fn serve_with_shutdown<F>(self, signal: F) -> Result<()>
    where
        F: std::future::Future<Output = ()> + Send + 'static,
    {
        let router = admission_router(AppState {
            backend: self.backend,
            policies: self.policies,
        });

        info!(
            addr = %self.addr,
            "Starting HTTP server for admission API with graceful shutdown"
        );

        let listener = TcpListener::bind(self.addr).await?;
        axum::serve(listener, router)
            .with_graceful_shutdown(signal)
            .await
            .map_err(|e| {
                error!(error = %e, "HTTP server failed");
                TollgateError::Io(e)
            })
    }
}
