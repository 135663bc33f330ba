//! Test utilities for unit testing the reconciler
//!
//! This module provides helpers for creating test data and setting up test scenarios.

use crate::reconciler::{FIELD_MANAGER, Reconciler};
use crds::{CertificateCondition, WebApp, WebAppSpec};
use k8s_openapi::apimachinery::pkg::apis::meta::v1::ObjectMeta;
use resource_store::{MockResourceStore, ObjectKey};

/// Helper to create a test WebApp as the API server would return it
///
/// The uid is set so owner references can be built.
pub fn create_test_web_app(name: &str, namespace: &str, host: &str, replicas: Option<i32>) -> WebApp {
    WebApp {
        metadata: ObjectMeta {
            name: Some(name.to_string()),
            namespace: Some(namespace.to_string()),
            uid: Some(format!("uid-{namespace}-{name}")),
            ..Default::default()
        },
        spec: WebAppSpec {
            replicas,
            host: host.to_string(),
            image: "reg/blog:1".to_string(),
            issuer: "letsencrypt".to_string(),
            container_port: 80,
            resources: Default::default(),
        },
        status: None,
    }
}

/// The "blog" WebApp in "prod" used by most scenarios
pub fn create_test_blog() -> WebApp {
    create_test_web_app("blog", "prod", "blog.example.com", Some(2))
}

pub fn blog_key() -> ObjectKey {
    ObjectKey::new("prod", "blog")
}

/// Helper to create a cert-manager Ready condition
pub fn ready_condition(status: &str, message: &str) -> CertificateCondition {
    CertificateCondition {
        type_: "Ready".to_string(),
        status: status.to_string(),
        message: Some(message.to_string()),
        ..Default::default()
    }
}

/// Reconciler backed by a clone of `store`, so the test keeps a handle
pub fn create_test_reconciler(store: &MockResourceStore) -> Reconciler {
    Reconciler::new(Box::new(store.clone()), FIELD_MANAGER)
}
