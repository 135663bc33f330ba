//! Projection of observed state onto `WebAppStatus`
//!
//! This is where "ready" gets its external meaning: the WebApp only reports a
//! hostname once its Certificate is ready and the Ingress has been applied.

use crds::{Certificate, WebAppStatus};
use k8s_openapi::api::apps::v1::Deployment;
use k8s_openapi::api::networking::v1::Ingress;

/// Readiness of an applied Certificate, read from its first condition
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct CertificateReadiness {
    pub ready: bool,
    pub message: String,
}

impl CertificateReadiness {
    /// No condition yet means not ready with an empty message
    pub fn of(certificate: &Certificate) -> Self {
        match certificate.first_condition() {
            Some(condition) => Self {
                ready: condition.is_true(),
                message: condition.message.clone().unwrap_or_default(),
            },
            None => Self::default(),
        }
    }
}

/// Host declared by the Ingress' first rule
fn declared_host(ingress: &Ingress) -> Option<&str> {
    ingress
        .spec
        .as_ref()?
        .rules
        .as_ref()?
        .first()?
        .host
        .as_deref()
}

/// Compute the status a pass writes back to the WebApp
///
/// `ingress` is the Ingress applied during this pass, if any. The replica
/// count is what the Deployment controller observed, not the desired count.
pub fn project(
    readiness: &CertificateReadiness,
    ingress: Option<&Ingress>,
    deployment: &Deployment,
) -> WebAppStatus {
    let host = match ingress {
        Some(ingress) if readiness.ready => declared_host(ingress).unwrap_or_default().to_string(),
        _ => String::new(),
    };

    let replicas = deployment
        .status
        .as_ref()
        .and_then(|status| status.replicas)
        .unwrap_or(0);

    WebAppStatus {
        host,
        replicas,
        certificate_status: readiness.message.clone(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crds::{CertificateCondition, CertificateSpec, CertificateStatus};
    use k8s_openapi::api::apps::v1::DeploymentStatus;
    use k8s_openapi::api::networking::v1::{IngressRule, IngressSpec};

    fn certificate_with(conditions: Vec<CertificateCondition>) -> Certificate {
        let mut certificate = Certificate::new("blog", CertificateSpec::default());
        certificate.status = Some(CertificateStatus { conditions });
        certificate
    }

    fn condition(status: &str, message: &str) -> CertificateCondition {
        CertificateCondition {
            type_: "Ready".to_string(),
            status: status.to_string(),
            message: Some(message.to_string()),
            ..Default::default()
        }
    }

    fn ingress_for(host: &str) -> Ingress {
        Ingress {
            spec: Some(IngressSpec {
                rules: Some(vec![IngressRule {
                    host: Some(host.to_string()),
                    http: None,
                }]),
                ..Default::default()
            }),
            ..Default::default()
        }
    }

    fn deployment_observing(replicas: Option<i32>) -> Deployment {
        Deployment {
            status: replicas.map(|replicas| DeploymentStatus {
                replicas: Some(replicas),
                ..Default::default()
            }),
            ..Default::default()
        }
    }

    #[test]
    fn test_readiness_without_conditions() {
        let mut certificate = Certificate::new("blog", CertificateSpec::default());
        assert_eq!(CertificateReadiness::of(&certificate), CertificateReadiness::default());

        certificate.status = Some(CertificateStatus::default());
        assert_eq!(CertificateReadiness::of(&certificate), CertificateReadiness::default());
    }

    #[test]
    fn test_readiness_reads_first_condition_only() {
        let certificate = certificate_with(vec![
            condition("False", "issuing"),
            condition("True", "cert issued"),
        ]);
        let readiness = CertificateReadiness::of(&certificate);
        assert!(!readiness.ready);
        assert_eq!(readiness.message, "issuing");
    }

    #[test]
    fn test_readiness_is_case_sensitive() {
        let readiness = CertificateReadiness::of(&certificate_with(vec![condition("true", "")]));
        assert!(!readiness.ready);

        let readiness = CertificateReadiness::of(&certificate_with(vec![condition("True", "cert issued")]));
        assert!(readiness.ready);
        assert_eq!(readiness.message, "cert issued");
    }

    #[test]
    fn test_project_not_ready_hides_host() {
        let readiness = CertificateReadiness {
            ready: false,
            message: "pending".to_string(),
        };
        let ingress = ingress_for("blog.example.com");

        let status = project(&readiness, Some(&ingress), &deployment_observing(Some(1)));
        assert_eq!(status.host, "");
        assert_eq!(status.replicas, 1);
        assert_eq!(status.certificate_status, "pending");
    }

    #[test]
    fn test_project_ready_uses_ingress_host() {
        let readiness = CertificateReadiness {
            ready: true,
            message: "cert issued".to_string(),
        };
        let ingress = ingress_for("blog.example.com");

        let status = project(&readiness, Some(&ingress), &deployment_observing(None));
        assert_eq!(
            status,
            WebAppStatus {
                host: "blog.example.com".to_string(),
                replicas: 0,
                certificate_status: "cert issued".to_string(),
            }
        );
    }
}
