//! Gateway bootstrap: middleware assembly and the serve loop.

use std::net::SocketAddr;
use std::sync::Arc;

use axum::Router;
use thiserror::Error;
use tokio::net::TcpListener;
use tower::ServiceBuilder;
use tower_http::{timeout::TimeoutLayer, trace::TraceLayer};
use tracing::{error, info};

use crate::config::BackendConfig;
use crate::middleware::BasicAuthLayer;
use crate::ports::CredentialVerifier;
use crate::router::{build_router, AppState};

/// Errors raised while bringing the gateway up.
#[derive(Debug, Error)]
pub enum GatewayError {
    #[error("invalid configuration: {0}")]
    Config(String),
    #[error("i/o error: {0}")]
    Io(#[from] std::io::Error),
}

/// The HTTP gateway service.
pub struct GatewayService {
    config: BackendConfig,
    state: AppState,
    verifier: Arc<dyn CredentialVerifier>,
}

impl GatewayService {
    pub fn new(
        config: BackendConfig,
        state: AppState,
        verifier: Arc<dyn CredentialVerifier>,
    ) -> Result<Self, GatewayError> {
        config
            .validate()
            .map_err(|e| GatewayError::Config(e.to_string()))?;
        Ok(Self {
            config,
            state,
            verifier,
        })
    }

    /// Assemble the protocol router with the middleware stack: tracing
    /// outermost, then the request timeout, then authentication, then the
    /// body size limit in front of the handlers.
    pub fn router(&self) -> Router {
        build_router(self.state.clone())
            .layer(axum::extract::DefaultBodyLimit::max(
                self.config.http_server.max_body_bytes,
            ))
            .layer(
                ServiceBuilder::new()
                    .layer(TraceLayer::new_for_http())
                    .layer(TimeoutLayer::new(self.config.http_server.request_timeout()))
                    .layer(BasicAuthLayer::new(Arc::clone(&self.verifier))),
            )
    }

    /// Bind and serve until interrupted.
    pub async fn serve(&self) -> Result<(), GatewayError> {
        let addr = self.config.http_server.addr();
        let listener = TcpListener::bind(addr).await?;
        info!(addr = %addr, "HTTP server listening");

        let app = self
            .router()
            .into_make_service_with_connect_info::<SocketAddr>();
        axum::serve(listener, app)
            .with_graceful_shutdown(shutdown_signal())
            .await?;

        info!("HTTP server stopped");
        Ok(())
    }
}

async fn shutdown_signal() {
    if let Err(err) = tokio::signal::ctrl_c().await {
        error!(error = %err, "failed to listen for shutdown signal");
    }
}
