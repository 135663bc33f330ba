//! Reconciliation logic for WebApp resources.
//!
//! - `resources`: target shapes of the Certificate, Deployment, Service and Ingress
//! - `status`: projection of observed state onto the WebApp status
//!
//! A pass runs its steps strictly in order and stops at the first failure.
//! Nothing is cached between passes; every pass starts from the store.

pub mod resources;
pub mod status;

use crate::error::{BuildError, ReconcileError, ReconcileStep};
use resource_store::{ApplyParams, ObjectKey, ResourceStore, StoreError};
use status::CertificateReadiness;
use std::future::Future;
use std::time::Duration;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info};

/// Delay before re-checking a Certificate that is not ready yet
pub const CERTIFICATE_WAIT: Duration = Duration::from_secs(5);

/// Default field manager for every apply
pub const FIELD_MANAGER: &str = "webapp-controller";

/// What the caller should do after a successful pass
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ReconcileOutcome {
    /// Everything applied; wait for the next change
    Converged,
    /// The Certificate is not ready; run again after the delay
    RequeueAfter(Duration),
}

/// Reconciles WebApp resources.
///
/// Not reentrant per object: the caller must not run two passes for the same
/// key at the same time.
pub struct Reconciler {
    store: Box<dyn ResourceStore>,
    apply_params: ApplyParams,
}

/// Race a store call against cancellation
async fn guarded<T, F>(step: ReconcileStep, cancel: &CancellationToken, call: F) -> Result<T, ReconcileError>
where
    F: Future<Output = Result<T, StoreError>>,
{
    tokio::select! {
        biased;
        _ = cancel.cancelled() => Err(ReconcileError::Cancelled { step }),
        result = call => result.map_err(|source| ReconcileError::Store { step, source }),
    }
}

fn built<T>(step: ReconcileStep, result: Result<T, BuildError>) -> Result<T, ReconcileError> {
    result.map_err(|source| ReconcileError::Build { step, source })
}

impl Reconciler {
    pub fn new(store: Box<dyn ResourceStore>, field_manager: impl Into<String>) -> Self {
        Self {
            store,
            apply_params: ApplyParams::controller(field_manager),
        }
    }

    /// Run one reconciliation pass for the WebApp at `key`
    ///
    /// A missing WebApp counts as already deleted and converges. Steps that
    /// completed before a failure or cancellation stay applied.
    pub async fn reconcile(
        &self,
        key: &ObjectKey,
        cancel: &CancellationToken,
    ) -> Result<ReconcileOutcome, ReconcileError> {
        let store = self.store.as_ref();
        let params = &self.apply_params;

        let step = ReconcileStep::FetchWebApp;
        let Some(web_app) = guarded(step, cancel, store.get_web_app(key)).await? else {
            debug!(webapp = %key, "WebApp not found, assuming it was deleted");
            return Ok(ReconcileOutcome::Converged);
        };

        let step = ReconcileStep::ApplyCertificate;
        let certificate = built(step, resources::certificate(&web_app))?;
        let certificate = guarded(step, cancel, store.apply_certificate(&certificate, params)).await?;
        let readiness = CertificateReadiness::of(&certificate);
        debug!(webapp = %key, ready = readiness.ready, "Applied Certificate");

        let step = ReconcileStep::ApplyDeployment;
        let deployment = built(step, resources::deployment(&web_app))?;
        let deployment = guarded(step, cancel, store.apply_deployment(&deployment, params)).await?;
        debug!(webapp = %key, "Applied Deployment");

        let step = ReconcileStep::ApplyService;
        let service = built(step, resources::service(&web_app))?;
        guarded(step, cancel, store.apply_service(&service, params)).await?;
        debug!(webapp = %key, "Applied Service");

        // An Ingress from an earlier pass is left alone while not ready
        let ingress = if readiness.ready {
            let step = ReconcileStep::ApplyIngress;
            let ingress = built(step, resources::ingress(&web_app))?;
            let ingress = guarded(step, cancel, store.apply_ingress(&ingress, params)).await?;
            debug!(webapp = %key, "Applied Ingress");
            Some(ingress)
        } else {
            None
        };

        let step = ReconcileStep::UpdateStatus;
        let status = status::project(&readiness, ingress.as_ref(), &deployment);
        guarded(step, cancel, store.update_web_app_status(key, &status)).await?;

        if readiness.ready {
            info!(webapp = %key, host = %status.host, "WebApp converged");
            Ok(ReconcileOutcome::Converged)
        } else {
            info!(
                webapp = %key,
                message = %readiness.message,
                "Certificate not ready, checking again in {:?}",
                CERTIFICATE_WAIT
            );
            Ok(ReconcileOutcome::RequeueAfter(CERTIFICATE_WAIT))
        }
    }
}
