//! Config-driven validation server.
//!
//! # Responsibilities
//! - Build one validator per configured route
//! - Wire the validation stage as a route layer
//! - Apply the request deadline and HTTP tracing around the whole stack
//! - Serve until a shutdown signal arrives
//!
//! Every route answers with the validated sections it received, which makes
//! the server usable as a schema sandbox or a validating front for tests.

use std::future::Future;
use std::time::Duration;

use axum::{
    middleware,
    routing::{any, on},
    Json, Router,
};
use tokio::net::TcpListener;
use tower_http::{timeout::TimeoutLayer, trace::TraceLayer};

use crate::config::validation::{method_filter, validate_config, ConfigIssue};
use crate::config::AppConfig;
use crate::http::extract::ValidatedRequest;
use crate::http::middleware::{validate_request, ValidateRequest};

#[derive(Debug, thiserror::Error)]
pub enum ServerError {
    #[error("invalid configuration: {}", join(.0))]
    InvalidConfig(Vec<ConfigIssue>),
}

fn join(issues: &[ConfigIssue]) -> String {
    issues.iter().map(ToString::to_string).collect::<Vec<_>>().join(", ")
}

/// HTTP server exposing the configured validated routes.
pub struct ValidationServer {
    router: Router,
    config: AppConfig,
}

impl ValidationServer {
    /// Validate the configuration and build the router.
    pub fn new(config: AppConfig) -> Result<Self, ServerError> {
        validate_config(&config).map_err(ServerError::InvalidConfig)?;
        let router = Self::build_router(&config)?;
        Ok(Self { router, config })
    }

    #[allow(deprecated)]
    fn build_router(config: &AppConfig) -> Result<Router, ServerError> {
        let mut router = Router::new();

        for route in &config.routes {
            let validator = route.validator(&config.options).map_err(|source| {
                ServerError::InvalidConfig(vec![ConfigIssue::Section {
                    path: route.path.clone(),
                    source,
                }])
            })?;
            let stage = ValidateRequest::new(validator).with_body_limit(config.limits.max_body_bytes);

            let handler = match route.method.as_deref() {
                Some(method) => {
                    let filter = method_filter(method).ok_or_else(|| {
                        ServerError::InvalidConfig(vec![ConfigIssue::Method {
                            path: route.path.clone(),
                            method: method.to_string(),
                        }])
                    })?;
                    on(filter, echo)
                }
                None => any(echo),
            };

            tracing::debug!(
                path = %route.path,
                method = route.method.as_deref().unwrap_or("*"),
                sections = ?route.sections.keys().collect::<Vec<_>>(),
                "Route registered"
            );
            router = router.route(
                &route.path,
                handler.route_layer(middleware::from_fn_with_state(stage, validate_request)),
            );
        }

        Ok(router
            .layer(TimeoutLayer::new(Duration::from_secs(config.limits.request_timeout_secs)))
            .layer(TraceLayer::new_for_http()))
    }

    /// The assembled router, e.g. for in-process testing.
    pub fn router(&self) -> Router {
        self.router.clone()
    }

    pub fn config(&self) -> &AppConfig {
        &self.config
    }

    /// Serve until Ctrl+C.
    pub async fn run(self, listener: TcpListener) -> Result<(), std::io::Error> {
        self.run_until(listener, shutdown_signal()).await
    }

    /// Serve until `signal` resolves.
    pub async fn run_until<F>(self, listener: TcpListener, signal: F) -> Result<(), std::io::Error>
    where
        F: Future<Output = ()> + Send + 'static,
    {
        let addr = listener.local_addr()?;
        tracing::info!(
            address = %addr,
            routes = self.config.routes.len(),
            "HTTP server starting"
        );

        axum::serve(listener, self.router)
            .with_graceful_shutdown(signal)
            .await?;

        tracing::info!("HTTP server stopped");
        Ok(())
    }
}

async fn echo(validated: ValidatedRequest) -> Json<ValidatedRequest> {
    Json(validated)
}

/// Wait for shutdown signal (Ctrl+C).
async fn shutdown_signal() {
    if let Err(e) = tokio::signal::ctrl_c().await {
        tracing::error!(error = %e, "Failed to install Ctrl+C handler");
        std::future::pending::<()>().await;
    }
    tracing::info!("Shutdown signal received");
}
