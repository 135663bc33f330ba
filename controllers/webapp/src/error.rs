//! Controller-specific error types.
//!
//! `BuildError` and `ReconcileError` describe a failed reconciliation pass;
//! `ControllerError` covers start-up and the watch loop.

use resource_store::StoreError;
use std::fmt;
use thiserror::Error;

/// A target resource could not be constructed from a WebApp
#[derive(Debug, Error, PartialEq, Eq)]
pub enum BuildError {
    /// The WebApp is missing identity needed for the target's metadata
    #[error("cannot build {kind}: WebApp has no {field}")]
    MissingField { kind: &'static str, field: &'static str },

    /// The owner reference back to the WebApp could not be created
    #[error("cannot link {kind} to its WebApp: owner has no name or uid")]
    OwnerReference { kind: &'static str },
}

/// Steps of a reconciliation pass, in execution order
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ReconcileStep {
    FetchWebApp,
    ApplyCertificate,
    ApplyDeployment,
    ApplyService,
    ApplyIngress,
    UpdateStatus,
}

impl ReconcileStep {
    /// Stable snake_case name, used in logs and metric labels
    pub fn as_str(self) -> &'static str {
        match self {
            ReconcileStep::FetchWebApp => "fetch_webapp",
            ReconcileStep::ApplyCertificate => "apply_certificate",
            ReconcileStep::ApplyDeployment => "apply_deployment",
            ReconcileStep::ApplyService => "apply_service",
            ReconcileStep::ApplyIngress => "apply_ingress",
            ReconcileStep::UpdateStatus => "update_status",
        }
    }
}

impl fmt::Display for ReconcileStep {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A reconciliation pass stopped early
///
/// Every variant names the step that failed. Steps after it did not run and
/// steps before it are not rolled back.
#[derive(Debug, Error)]
pub enum ReconcileError {
    #[error("{step}: {source}")]
    Build {
        step: ReconcileStep,
        #[source]
        source: BuildError,
    },

    #[error("{step}: {source}")]
    Store {
        step: ReconcileStep,
        #[source]
        source: StoreError,
    },

    #[error("{step}: reconciliation cancelled")]
    Cancelled { step: ReconcileStep },
}

impl ReconcileError {
    pub fn step(&self) -> ReconcileStep {
        match self {
            ReconcileError::Build { step, .. }
            | ReconcileError::Store { step, .. }
            | ReconcileError::Cancelled { step } => *step,
        }
    }
}

/// Errors that can occur in the WebApp Controller.
#[derive(Debug, Error)]
pub enum ControllerError {
    /// Kubernetes API error
    #[error("Kubernetes error: {0}")]
    Kube(#[from] kube::Error),

    /// Reconciliation pass failed
    #[error("Reconciliation failed: {0}")]
    Reconcile(#[from] ReconcileError),

    /// Object handed to the reconciler has no name or namespace
    #[error("Invalid object: {0}")]
    InvalidObject(String),

    /// Invalid configuration
    #[error("Invalid configuration: {0}")]
    InvalidConfig(String),

    /// Metrics registry error
    #[error("Metrics error: {0}")]
    Metrics(#[from] prometheus::Error),

    /// Probe/metrics server failed
    #[error("HTTP server failed: {0}")]
    Server(String),

    /// Resource watch failed
    #[error("Resource watch failed: {0}")]
    Watch(String),
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_names_failing_step() {
        let err = ReconcileError::Store {
            step: ReconcileStep::ApplyService,
            source: StoreError::Unavailable("connection refused".to_string()),
        };
        assert_eq!(err.step(), ReconcileStep::ApplyService);
        assert_eq!(
            err.to_string(),
            "apply_service: Store unavailable: connection refused"
        );

        let err = ReconcileError::Build {
            step: ReconcileStep::ApplyIngress,
            source: BuildError::OwnerReference { kind: "Ingress" },
        };
        assert_eq!(err.step(), ReconcileStep::ApplyIngress);
        assert!(err.to_string().starts_with("apply_ingress: cannot link Ingress"));
    }
}
