//! WebApp Controller
//!
//! Turns a `WebApp` resource into a running, TLS-terminated web application.
//!
//! For every WebApp the controller applies a cert-manager Certificate, a
//! Deployment and a Service, and once the Certificate is ready, an Ingress
//! routing the WebApp's host to the Service. The observed host, replica count
//! and certificate message are written back to the WebApp's status.

mod backoff;
mod config;
mod controller;
mod error;
mod metrics;
mod reconciler;
mod server;
#[cfg(test)]
mod test_utils;
mod watcher;

use crate::config::ControllerConfig;
use crate::error::ControllerError;
use controller::Controller;
use tracing::{info, warn};

#[tokio::main]
async fn main() -> Result<(), ControllerError> {
    // Must happen before the first TLS connection to the API server
    let provider = rustls::crypto::ring::default_provider().install_default();

    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info")),
        )
        .init();

    if provider.is_err() {
        warn!("rustls crypto provider was already installed");
    }

    info!("Starting WebApp Controller");

    let config = ControllerConfig::from_env()?;

    info!("Configuration:");
    info!("  Namespace: {}", config.namespace.as_deref().unwrap_or("all namespaces"));
    info!("  Field manager: {}", config.field_manager);
    info!("  Probe port: {}", config.probe_port);
    info!("  Reconcile timeout: {:?}", config.reconcile_timeout);
    info!("  Max concurrent reconciles: {}", config.max_concurrent_reconciles);

    let controller = Controller::new(config).await?;
    controller.run().await?;

    Ok(())
}
