//! Kubernetes-backed resource store

use crate::error::StoreError;
use crate::key::{ApplyParams, ObjectKey};
use crate::store_trait::ResourceStore;
use crds::{Certificate, WebApp, WebAppStatus};
use k8s_openapi::NamespaceResourceScope;
use k8s_openapi::api::apps::v1::Deployment;
use k8s_openapi::api::core::v1::Service;
use k8s_openapi::api::networking::v1::Ingress;
use kube::api::{Api, Patch, PatchParams};
use kube::{Client, Resource, ResourceExt};
use serde::Serialize;
use serde::de::DeserializeOwned;
use std::fmt::Debug;
use tracing::debug;

/// Resource store talking to the Kubernetes API server
#[derive(Clone)]
pub struct KubeResourceStore {
    client: Client,
}

impl std::fmt::Debug for KubeResourceStore {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("KubeResourceStore").finish_non_exhaustive()
    }
}

impl KubeResourceStore {
    pub fn new(client: Client) -> Self {
        Self { client }
    }

    /// Server-side apply of a namespaced object
    ///
    /// The object must carry `apiVersion`, `kind`, name and namespace; the
    /// server merges it with what is stored and returns the result.
    async fn apply<K>(&self, object: &K, params: &ApplyParams) -> Result<K, StoreError>
    where
        K: Resource<Scope = NamespaceResourceScope, DynamicType = ()>
            + Clone
            + Debug
            + Serialize
            + DeserializeOwned,
    {
        let key = ObjectKey::from_resource(object).ok_or_else(|| {
            StoreError::Invalid(format!("{} is missing name or namespace", K::kind(&())))
        })?;

        debug!("Applying {} {} as {}", K::kind(&()), key, params.field_manager);

        let api: Api<K> = Api::namespaced(self.client.clone(), &key.namespace);
        let applied = api
            .patch(&key.name, &params.to_patch_params(), &Patch::Apply(object))
            .await?;

        debug!(
            "Applied {} {} (resourceVersion {:?})",
            K::kind(&()),
            key,
            applied.resource_version()
        );
        Ok(applied)
    }
}

#[async_trait::async_trait]
impl ResourceStore for KubeResourceStore {
    async fn get_web_app(&self, key: &ObjectKey) -> Result<Option<WebApp>, StoreError> {
        let api: Api<WebApp> = Api::namespaced(self.client.clone(), &key.namespace);
        let web_app = api.get_opt(&key.name).await?;
        if web_app.is_none() {
            debug!("WebApp {} not found", key);
        }
        Ok(web_app)
    }

    async fn apply_certificate(&self, certificate: &Certificate, params: &ApplyParams) -> Result<Certificate, StoreError> {
        self.apply(certificate, params).await
    }

    async fn apply_deployment(&self, deployment: &Deployment, params: &ApplyParams) -> Result<Deployment, StoreError> {
        self.apply(deployment, params).await
    }

    async fn apply_service(&self, service: &Service, params: &ApplyParams) -> Result<Service, StoreError> {
        self.apply(service, params).await
    }

    async fn apply_ingress(&self, ingress: &Ingress, params: &ApplyParams) -> Result<Ingress, StoreError> {
        self.apply(ingress, params).await
    }

    async fn update_web_app_status(&self, key: &ObjectKey, status: &WebAppStatus) -> Result<(), StoreError> {
        let api: Api<WebApp> = Api::namespaced(self.client.clone(), &key.namespace);

        // Merge patch on the status subresource, spec is never sent
        let status_patch = serde_json::json!({
            "status": status
        });

        api.patch_status(&key.name, &PatchParams::default(), &Patch::Merge(&status_patch))
            .await?;

        debug!("Updated WebApp {} status", key);
        Ok(())
    }
}
