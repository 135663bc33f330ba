//! ResourceStore trait for mocking
//!
//! This trait abstracts the cluster API to enable mocking in unit tests.
//! `KubeResourceStore` implements it against a real API server and tests can
//! use `MockResourceStore`.

use crate::error::StoreError;
use crate::key::{ApplyParams, ObjectKey};
use crds::{Certificate, WebApp, WebAppStatus};
use k8s_openapi::api::apps::v1::Deployment;
use k8s_openapi::api::core::v1::Service;
use k8s_openapi::api::networking::v1::Ingress;

/// Operations the WebApp reconciler needs from the cluster
///
/// Every apply returns the object as the server stored it, including any
/// status other controllers have written, so callers can read back observed
/// state from the same round trip.
/// All async methods must be `Send` to work with Tokio's work-stealing runtime.
#[async_trait::async_trait]
pub trait ResourceStore: Send + Sync {
    /// Fetch a WebApp; `Ok(None)` when it does not exist
    async fn get_web_app(&self, key: &ObjectKey) -> Result<Option<WebApp>, StoreError>;

    async fn apply_certificate(&self, certificate: &Certificate, params: &ApplyParams) -> Result<Certificate, StoreError>;
    async fn apply_deployment(&self, deployment: &Deployment, params: &ApplyParams) -> Result<Deployment, StoreError>;
    async fn apply_service(&self, service: &Service, params: &ApplyParams) -> Result<Service, StoreError>;
    async fn apply_ingress(&self, ingress: &Ingress, params: &ApplyParams) -> Result<Ingress, StoreError>;

    /// Replace the status subresource of a WebApp, leaving its spec alone
    async fn update_web_app_status(&self, key: &ObjectKey, status: &WebAppStatus) -> Result<(), StoreError>;
}
