//! Object identity and apply options

use kube::{Resource, ResourceExt};
use std::fmt;

/// Namespaced identity of a Kubernetes object
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct ObjectKey {
    pub namespace: String,
    pub name: String,
}

impl ObjectKey {
    pub fn new(namespace: impl Into<String>, name: impl Into<String>) -> Self {
        Self {
            namespace: namespace.into(),
            name: name.into(),
        }
    }

    /// Identity of a namespaced object, `None` if name or namespace is unset
    pub fn from_resource<K: Resource>(resource: &K) -> Option<Self> {
        let name = resource.meta().name.clone()?;
        let namespace = resource.namespace()?;
        Some(Self { namespace, name })
    }
}

impl fmt::Display for ObjectKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}/{}", self.namespace, self.name)
    }
}

/// Options for a server-side apply
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ApplyParams {
    /// Field manager recorded on every field the apply sets
    pub field_manager: String,
    /// Take ownership of fields held by other managers instead of failing
    pub force: bool,
}

impl ApplyParams {
    /// Forced apply under the given field manager
    pub fn controller(field_manager: impl Into<String>) -> Self {
        Self {
            field_manager: field_manager.into(),
            force: true,
        }
    }

    pub(crate) fn to_patch_params(&self) -> kube::api::PatchParams {
        let params = kube::api::PatchParams::apply(&self.field_manager);
        if self.force { params.force() } else { params }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crds::{WebApp, WebAppSpec};

    fn spec() -> WebAppSpec {
        WebAppSpec {
            replicas: Some(2),
            host: "blog.example.com".to_string(),
            image: "reg/blog:1".to_string(),
            issuer: "letsencrypt".to_string(),
            container_port: 80,
            resources: Default::default(),
        }
    }

    #[test]
    fn test_display() {
        assert_eq!(ObjectKey::new("prod", "blog").to_string(), "prod/blog");
    }

    #[test]
    fn test_from_resource_requires_namespace() {
        let web_app = WebApp::new("blog", spec());
        assert_eq!(ObjectKey::from_resource(&web_app), None);

        let mut web_app = web_app;
        web_app.metadata.namespace = Some("prod".to_string());
        assert_eq!(
            ObjectKey::from_resource(&web_app),
            Some(ObjectKey::new("prod", "blog"))
        );
    }

    #[test]
    fn test_controller_params_force_ownership() {
        let params = ApplyParams::controller("webapp-controller");
        let patch_params = params.to_patch_params();
        assert!(patch_params.force);
        assert_eq!(patch_params.field_manager.as_deref(), Some("webapp-controller"));
    }
}
