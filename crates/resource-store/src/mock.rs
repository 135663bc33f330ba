//! Mock ResourceStore for unit testing
//!
//! This module provides an in-memory implementation of `ResourceStore` that
//! can be used in unit tests without a running API server.
//!
//! Applies behave like server-side apply from the controller's point of view:
//! metadata and spec are replaced, status written by other controllers
//! (cert-manager, the Deployment controller) is kept and returned.

use crate::error::StoreError;
use crate::key::{ApplyParams, ObjectKey};
use crate::store_trait::ResourceStore;
use crds::{Certificate, CertificateCondition, CertificateStatus, WebApp, WebAppStatus};
use k8s_openapi::api::apps::v1::{Deployment, DeploymentStatus};
use k8s_openapi::api::core::v1::Service;
use k8s_openapi::api::networking::v1::Ingress;
use kube::Resource;
use serde::Serialize;
use std::collections::{HashMap, HashSet};
use std::sync::{Arc, Mutex, MutexGuard};

/// Store operations, used for call logs and failure injection
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum StoreOperation {
    GetWebApp,
    ApplyCertificate,
    ApplyDeployment,
    ApplyService,
    ApplyIngress,
    UpdateWebAppStatus,
}

/// Mock ResourceStore for testing
///
/// Stores objects in memory and can be configured to fail or hang on
/// specific operations.
#[derive(Clone, Default)]
pub struct MockResourceStore {
    pub(crate) web_apps: Arc<Mutex<HashMap<ObjectKey, WebApp>>>,
    pub(crate) certificates: Arc<Mutex<HashMap<ObjectKey, Certificate>>>,
    pub(crate) deployments: Arc<Mutex<HashMap<ObjectKey, Deployment>>>,
    pub(crate) services: Arc<Mutex<HashMap<ObjectKey, Service>>>,
    pub(crate) ingresses: Arc<Mutex<HashMap<ObjectKey, Ingress>>>,
    // Behaviour controls
    failures: Arc<Mutex<HashMap<StoreOperation, StoreError>>>,
    hanging: Arc<Mutex<HashSet<StoreOperation>>>,
    // Observations
    calls: Arc<Mutex<Vec<(StoreOperation, ObjectKey)>>>,
    apply_params: Arc<Mutex<Vec<ApplyParams>>>,
    mutations: Arc<Mutex<u64>>,
}

impl std::fmt::Debug for MockResourceStore {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("MockResourceStore")
            .field("mutations", &self.mutation_count())
            .finish_non_exhaustive()
    }
}

fn lock<T>(mutex: &Mutex<T>) -> MutexGuard<'_, T> {
    mutex.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
}

fn same<T: Serialize>(a: &T, b: &T) -> bool {
    match (serde_json::to_value(a), serde_json::to_value(b)) {
        (Ok(a), Ok(b)) => a == b,
        _ => false,
    }
}

impl MockResourceStore {
    /// Create an empty mock store
    pub fn new() -> Self {
        Self::default()
    }

    /// Add a WebApp to the mock store (for test setup)
    pub fn insert_web_app(&self, web_app: WebApp) {
        if let Some(key) = ObjectKey::from_resource(&web_app) {
            lock(&self.web_apps).insert(key, web_app);
        }
    }

    /// Remove a WebApp, as if a user deleted it
    pub fn remove_web_app(&self, key: &ObjectKey) -> Option<WebApp> {
        lock(&self.web_apps).remove(key)
    }

    /// Simulate cert-manager writing conditions on an existing Certificate
    ///
    /// Returns false if no Certificate has been applied under `key` yet.
    pub fn set_certificate_conditions(&self, key: &ObjectKey, conditions: Vec<CertificateCondition>) -> bool {
        match lock(&self.certificates).get_mut(key) {
            Some(certificate) => {
                certificate.status = Some(CertificateStatus { conditions });
                true
            }
            None => false,
        }
    }

    /// Simulate the Deployment controller reporting observed replicas
    ///
    /// Returns false if no Deployment has been applied under `key` yet.
    pub fn set_deployment_observed_replicas(&self, key: &ObjectKey, replicas: i32) -> bool {
        match lock(&self.deployments).get_mut(key) {
            Some(deployment) => {
                deployment.status = Some(DeploymentStatus {
                    replicas: Some(replicas),
                    ..Default::default()
                });
                true
            }
            None => false,
        }
    }

    /// Make the next call to `operation` fail with `error`
    pub fn fail_next(&self, operation: StoreOperation, error: StoreError) {
        lock(&self.failures).insert(operation, error);
    }

    /// Make every call to `operation` block forever (for cancellation tests)
    pub fn hang_on(&self, operation: StoreOperation) {
        lock(&self.hanging).insert(operation);
    }

    pub fn web_app(&self, key: &ObjectKey) -> Option<WebApp> {
        lock(&self.web_apps).get(key).cloned()
    }

    pub fn certificate(&self, key: &ObjectKey) -> Option<Certificate> {
        lock(&self.certificates).get(key).cloned()
    }

    pub fn deployment(&self, key: &ObjectKey) -> Option<Deployment> {
        lock(&self.deployments).get(key).cloned()
    }

    pub fn service(&self, key: &ObjectKey) -> Option<Service> {
        lock(&self.services).get(key).cloned()
    }

    pub fn ingress(&self, key: &ObjectKey) -> Option<Ingress> {
        lock(&self.ingresses).get(key).cloned()
    }

    /// Number of writes that changed stored state
    pub fn mutation_count(&self) -> u64 {
        *lock(&self.mutations)
    }

    /// Every operation issued against the store, in order
    pub fn calls(&self) -> Vec<(StoreOperation, ObjectKey)> {
        lock(&self.calls).clone()
    }

    /// Apply options of every apply, in order
    pub fn apply_params(&self) -> Vec<ApplyParams> {
        lock(&self.apply_params).clone()
    }

    /// Record the call, then honour any configured hang or failure
    async fn enter(&self, operation: StoreOperation, key: &ObjectKey) -> Result<(), StoreError> {
        lock(&self.calls).push((operation, key.clone()));

        let hangs = lock(&self.hanging).contains(&operation);
        if hangs {
            std::future::pending::<()>().await;
        }

        match lock(&self.failures).remove(&operation) {
            Some(error) => Err(error),
            None => Ok(()),
        }
    }

    fn record_mutation(&self) {
        *lock(&self.mutations) += 1;
    }

    /// Store `object`, keeping the stored status, and return what was stored
    async fn apply<K, F>(
        &self,
        operation: StoreOperation,
        objects: &Mutex<HashMap<ObjectKey, K>>,
        object: &K,
        params: &ApplyParams,
        keep_status: F,
    ) -> Result<K, StoreError>
    where
        K: Resource + Clone + Serialize,
        F: FnOnce(&mut K, &K),
    {
        let key = ObjectKey::from_resource(object)
            .ok_or_else(|| StoreError::Invalid("object is missing name or namespace".to_string()))?;
        self.enter(operation, &key).await?;
        lock(&self.apply_params).push(params.clone());

        let mut objects = lock(objects);
        let mut applied = object.clone();
        if let Some(existing) = objects.get(&key) {
            keep_status(&mut applied, existing);
        }

        let changed = objects.get(&key).is_none_or(|existing| !same(existing, &applied));
        if changed {
            objects.insert(key, applied.clone());
            drop(objects);
            self.record_mutation();
        }
        Ok(applied)
    }
}

#[async_trait::async_trait]
impl ResourceStore for MockResourceStore {
    async fn get_web_app(&self, key: &ObjectKey) -> Result<Option<WebApp>, StoreError> {
        self.enter(StoreOperation::GetWebApp, key).await?;
        Ok(self.web_app(key))
    }

    async fn apply_certificate(&self, certificate: &Certificate, params: &ApplyParams) -> Result<Certificate, StoreError> {
        self.apply(StoreOperation::ApplyCertificate, &self.certificates, certificate, params, |applied, existing| {
            applied.status = existing.status.clone();
        })
        .await
    }

    async fn apply_deployment(&self, deployment: &Deployment, params: &ApplyParams) -> Result<Deployment, StoreError> {
        self.apply(StoreOperation::ApplyDeployment, &self.deployments, deployment, params, |applied, existing| {
            applied.status = existing.status.clone();
        })
        .await
    }

    async fn apply_service(&self, service: &Service, params: &ApplyParams) -> Result<Service, StoreError> {
        self.apply(StoreOperation::ApplyService, &self.services, service, params, |applied, existing| {
            applied.status = existing.status.clone();
        })
        .await
    }

    async fn apply_ingress(&self, ingress: &Ingress, params: &ApplyParams) -> Result<Ingress, StoreError> {
        self.apply(StoreOperation::ApplyIngress, &self.ingresses, ingress, params, |applied, existing| {
            applied.status = existing.status.clone();
        })
        .await
    }

    async fn update_web_app_status(&self, key: &ObjectKey, status: &WebAppStatus) -> Result<(), StoreError> {
        self.enter(StoreOperation::UpdateWebAppStatus, key).await?;

        let mut web_apps = lock(&self.web_apps);
        let web_app = web_apps
            .get_mut(key)
            .ok_or_else(|| StoreError::NotFound(format!("WebApp {}", key)))?;

        if web_app.status.as_ref() != Some(status) {
            web_app.status = Some(status.clone());
            drop(web_apps);
            self.record_mutation();
        }
        Ok(())
    }
}
