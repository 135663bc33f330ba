//! Target shapes of the resources a WebApp owns.
//!
//! Every builder is a pure function of the WebApp: same input, same output.
//! All targets share the WebApp's name and namespace and carry a controller
//! owner reference back to it, so deleting the WebApp lets the garbage
//! collector remove them.
//!
//! Pods are selected by the single label `webapp=<name>`. Two WebApps with
//! the same name in one namespace cannot exist, so this is unique per
//! namespace; nothing else may use the `webapp` label key there.

use crate::error::BuildError;
use crds::{Certificate, CertificateSpec, IssuerRef, WebApp};
use k8s_openapi::api::apps::v1::{Deployment, DeploymentSpec};
use k8s_openapi::api::core::v1::{
    Container, ContainerPort, PodSpec, PodTemplateSpec, Service, ServicePort, ServiceSpec,
};
use k8s_openapi::api::networking::v1::{
    HTTPIngressPath, HTTPIngressRuleValue, Ingress, IngressBackend, IngressRule,
    IngressServiceBackend, IngressSpec, IngressTLS, ServiceBackendPort,
};
use k8s_openapi::apimachinery::pkg::apis::meta::v1::{LabelSelector, ObjectMeta};
use kube::Resource;
use std::collections::BTreeMap;

/// Label key selecting a WebApp's pods
pub const APP_LABEL: &str = "webapp";
/// Name of the single container in the pod template
pub const CONTAINER_NAME: &str = "webapp";
/// Port the Service listens on and the Ingress routes to.
/// Not derived from the WebApp's container port.
pub const SERVICE_PORT: i32 = 80;
pub const PROTOCOL: &str = "TCP";
pub const ROOT_PATH: &str = "/";
pub const PATH_TYPE_PREFIX: &str = "Prefix";
pub const ISSUER_ANNOTATION: &str = "cert-manager.io/issuer";

fn app_labels(name: &str) -> BTreeMap<String, String> {
    BTreeMap::from([(APP_LABEL.to_string(), name.to_string())])
}

fn name_of(web_app: &WebApp, kind: &'static str) -> Result<String, BuildError> {
    web_app
        .metadata
        .name
        .clone()
        .ok_or(BuildError::MissingField { kind, field: "metadata.name" })
}

/// Name, namespace and owner reference shared by every target
fn owned_metadata(web_app: &WebApp, kind: &'static str) -> Result<ObjectMeta, BuildError> {
    let name = name_of(web_app, kind)?;
    let namespace = web_app
        .metadata
        .namespace
        .clone()
        .ok_or(BuildError::MissingField { kind, field: "metadata.namespace" })?;
    let owner = web_app
        .controller_owner_ref(&())
        .ok_or(BuildError::OwnerReference { kind })?;

    Ok(ObjectMeta {
        name: Some(name),
        namespace: Some(namespace),
        owner_references: Some(vec![owner]),
        ..Default::default()
    })
}

/// cert-manager Certificate for the WebApp's host, stored in a Secret named
/// after the WebApp
pub fn certificate(web_app: &WebApp) -> Result<Certificate, BuildError> {
    let metadata = owned_metadata(web_app, "Certificate")?;
    let name = name_of(web_app, "Certificate")?;
    let spec = &web_app.spec;

    let mut certificate = Certificate::new(
        &name,
        CertificateSpec {
            secret_name: name.clone(),
            issuer_ref: IssuerRef {
                name: spec.issuer.clone(),
                ..Default::default()
            },
            common_name: Some(spec.host.clone()),
            dns_names: vec![spec.host.clone()],
        },
    );
    certificate.metadata = metadata;
    Ok(certificate)
}

/// Deployment running the WebApp's image
///
/// An absent replica count is left out of the target so the apply does not
/// claim the field.
pub fn deployment(web_app: &WebApp) -> Result<Deployment, BuildError> {
    let metadata = owned_metadata(web_app, "Deployment")?;
    let name = name_of(web_app, "Deployment")?;
    let spec = &web_app.spec;

    Ok(Deployment {
        metadata,
        spec: Some(DeploymentSpec {
            replicas: spec.replicas,
            selector: LabelSelector {
                match_labels: Some(app_labels(&name)),
                ..Default::default()
            },
            template: PodTemplateSpec {
                metadata: Some(ObjectMeta {
                    labels: Some(app_labels(&name)),
                    ..Default::default()
                }),
                spec: Some(PodSpec {
                    containers: vec![Container {
                        name: CONTAINER_NAME.to_string(),
                        image: Some(spec.image.clone()),
                        ports: Some(vec![ContainerPort {
                            container_port: spec.container_port,
                            protocol: Some(PROTOCOL.to_string()),
                            ..Default::default()
                        }]),
                        resources: Some(spec.resources.clone()),
                        ..Default::default()
                    }],
                    ..Default::default()
                }),
            },
            ..Default::default()
        }),
        ..Default::default()
    })
}

/// Service exposing the WebApp's pods on port 80
pub fn service(web_app: &WebApp) -> Result<Service, BuildError> {
    let metadata = owned_metadata(web_app, "Service")?;
    let name = name_of(web_app, "Service")?;

    Ok(Service {
        metadata,
        spec: Some(ServiceSpec {
            ports: Some(vec![ServicePort {
                port: SERVICE_PORT,
                protocol: Some(PROTOCOL.to_string()),
                ..Default::default()
            }]),
            selector: Some(app_labels(&name)),
            ..Default::default()
        }),
        ..Default::default()
    })
}

/// Ingress routing the WebApp's host to its Service over TLS
pub fn ingress(web_app: &WebApp) -> Result<Ingress, BuildError> {
    let mut metadata = owned_metadata(web_app, "Ingress")?;
    let name = name_of(web_app, "Ingress")?;
    let spec = &web_app.spec;

    // Informational only, issuance is driven by the Certificate resource
    metadata.annotations = Some(BTreeMap::from([(
        ISSUER_ANNOTATION.to_string(),
        spec.issuer.clone(),
    )]));

    Ok(Ingress {
        metadata,
        spec: Some(IngressSpec {
            rules: Some(vec![IngressRule {
                host: Some(spec.host.clone()),
                http: Some(HTTPIngressRuleValue {
                    paths: vec![HTTPIngressPath {
                        path: Some(ROOT_PATH.to_string()),
                        path_type: PATH_TYPE_PREFIX.to_string(),
                        backend: IngressBackend {
                            service: Some(IngressServiceBackend {
                                name: name.clone(),
                                port: Some(ServiceBackendPort {
                                    number: Some(SERVICE_PORT),
                                    ..Default::default()
                                }),
                            }),
                            ..Default::default()
                        },
                    }],
                }),
            }]),
            tls: Some(vec![IngressTLS {
                hosts: Some(vec![spec.host.clone()]),
                secret_name: Some(name),
            }]),
            ..Default::default()
        }),
        ..Default::default()
    })
}
