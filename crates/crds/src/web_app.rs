//! WebApp CRD
//!
//! Declares a web application: hostname, container image, replica count,
//! TLS issuer and resource limits. The controller converges this intent into
//! a Certificate, a Deployment, a Service and an Ingress.

use k8s_openapi::api::core::v1::ResourceRequirements;
use kube::CustomResource;
use schemars::JsonSchema;
use serde::{Deserialize, Serialize};

/// Container port used when a WebApp leaves `containerPort` unset
pub const DEFAULT_CONTAINER_PORT: i32 = 80;

fn default_container_port() -> i32 {
    DEFAULT_CONTAINER_PORT
}

/// `ResourceRequirements` is passed through to the pod template untouched,
/// so the CRD schema only needs to accept an object and keep its fields.
fn resource_requirements_schema(_: &mut schemars::SchemaGenerator) -> schemars::Schema {
    schemars::json_schema!({
        "type": "object",
        "x-kubernetes-preserve-unknown-fields": true
    })
}

#[derive(CustomResource, Debug, Clone, Serialize, Deserialize, JsonSchema, PartialEq)]
#[kube(
    group = "webservice.my.domain",
    version = "v1",
    kind = "WebApp",
    namespaced,
    status = "WebAppStatus",
    printcolumn = r#"{"name": "Hostname", "type": "string", "jsonPath": ".status.host"}"#,
    printcolumn = r#"{"name": "Certificate Status", "type": "string", "jsonPath": ".status.certificateStatus"}"#,
    printcolumn = r#"{"name": "Replicas", "type": "integer", "jsonPath": ".status.replicas"}"#
)]
#[serde(rename_all = "camelCase")]
pub struct WebAppSpec {
    /// Desired number of pods.
    ///
    /// Absent means "leave the Deployment's replica count alone", which is
    /// not the same as zero. The API server still requires the field.
    #[serde(skip_serializing_if = "Option::is_none")]
    #[schemars(required, range(min = 0))]
    pub replicas: Option<i32>,

    /// Public hostname served by the Ingress and certified by the Certificate
    #[schemars(length(min = 1))]
    pub host: String,

    /// Container image reference
    #[schemars(length(min = 1))]
    pub image: String,

    /// cert-manager Issuer name
    #[schemars(length(min = 1))]
    pub issuer: String,

    /// Port the container listens on
    #[serde(default = "default_container_port")]
    #[schemars(range(min = 0))]
    pub container_port: i32,

    /// CPU/memory requests and limits for the container
    #[serde(default)]
    #[schemars(schema_with = "resource_requirements_schema")]
    pub resources: ResourceRequirements,
}

/// Observed state of a WebApp, written by the controller after every pass
#[derive(Debug, Clone, Serialize, Deserialize, JsonSchema, Default, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct WebAppStatus {
    /// Hostname currently exposed through the Ingress (empty until TLS is ready)
    #[serde(default)]
    pub host: String,

    /// Replica count observed on the Deployment
    #[serde(default)]
    pub replicas: i32,

    /// Message of the Certificate's first condition
    #[serde(default)]
    pub certificate_status: String,
}
