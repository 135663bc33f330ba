//! Main controller implementation.
//!
//! This module contains the `Controller` struct that wires the reconciler to
//! the cluster and runs the WebApp watcher next to the probe server.

use crate::config::ControllerConfig;
use crate::error::ControllerError;
use crate::metrics;
use crate::reconciler::Reconciler;
use crate::server::{self, ServerState};
use crate::watcher::{self, Context};
use kube::Client;
use resource_store::KubeResourceStore;
use std::sync::Arc;
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;
use tracing::info;

/// Main controller for WebApp resources.
pub struct Controller {
    web_app_watcher: JoinHandle<Result<(), ControllerError>>,
    probe_server: JoinHandle<Result<(), anyhow::Error>>,
    shutdown: CancellationToken,
}

impl Controller {
    /// Creates a new controller instance.
    pub async fn new(config: ControllerConfig) -> Result<Self, ControllerError> {
        info!("Initializing WebApp Controller");

        let client = Client::try_default().await?;
        metrics::register_metrics()?;

        let shutdown = CancellationToken::new();
        let store = KubeResourceStore::new(client.clone());
        let reconciler = Reconciler::new(Box::new(store), config.field_manager.clone());
        let ctx = Arc::new(Context::new(reconciler, &config, shutdown.clone()));
        let state = Arc::new(ServerState::default());

        let probe_server = {
            let state = state.clone();
            let shutdown = shutdown.clone();
            let port = config.probe_port;
            tokio::spawn(async move { server::start_server(port, state, shutdown).await })
        };

        // The watcher drains in-flight passes on SIGINT/SIGTERM and then
        // returns, which is what cancels `shutdown`
        let web_app_watcher = tokio::spawn(watcher::watch_web_apps(client, config, ctx, state));

        Ok(Self {
            web_app_watcher,
            probe_server,
            shutdown,
        })
    }

    /// Runs the controller until shutdown.
    pub async fn run(mut self) -> Result<(), ControllerError> {
        info!("WebApp Controller running");

        // The watcher exits on shutdown; the server must not exit on its own
        let result = tokio::select! {
            result = &mut self.web_app_watcher => {
                result.map_err(|e| ControllerError::Watch(format!("WebApp watcher panicked: {}", e)))
                    .and_then(|r| r)
            }
            result = &mut self.probe_server => {
                match result {
                    Ok(Ok(())) => Err(ControllerError::Server("probe server stopped".to_string())),
                    Ok(Err(e)) => Err(ControllerError::Server(e.to_string())),
                    Err(e) => Err(ControllerError::Server(format!("probe server panicked: {}", e))),
                }
            }
        };

        self.shutdown.cancel();
        if !self.probe_server.is_finished() {
            let _ = self.probe_server.await;
        }
        self.web_app_watcher.abort();

        info!("WebApp Controller stopped");
        result
    }
}
