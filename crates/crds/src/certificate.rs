//! cert-manager Certificate
//!
//! Only the fields the WebApp controller sets or reads are modelled here.
//! Issuance itself is cert-manager's job; the controller requests a
//! certificate and watches its conditions.

use kube::CustomResource;
use schemars::JsonSchema;
use serde::{Deserialize, Serialize};

/// Condition status literal cert-manager uses for a satisfied condition
pub const CONDITION_TRUE: &str = "True";

#[derive(CustomResource, Debug, Clone, Serialize, Deserialize, JsonSchema, PartialEq, Default)]
#[kube(
    group = "cert-manager.io",
    version = "v1",
    kind = "Certificate",
    namespaced,
    status = "CertificateStatus"
)]
#[serde(rename_all = "camelCase")]
pub struct CertificateSpec {
    /// Secret the signed key pair is stored in
    pub secret_name: String,

    /// Issuer that signs the certificate
    pub issuer_ref: IssuerRef,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub common_name: Option<String>,

    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub dns_names: Vec<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize, JsonSchema, PartialEq, Eq, Default)]
#[serde(rename_all = "camelCase")]
pub struct IssuerRef {
    pub name: String,

    /// `Issuer` or `ClusterIssuer`; cert-manager assumes `Issuer` when unset
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub kind: Option<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub group: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize, JsonSchema, PartialEq, Eq, Default)]
#[serde(rename_all = "camelCase")]
pub struct CertificateStatus {
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub conditions: Vec<CertificateCondition>,
}

#[derive(Debug, Clone, Serialize, Deserialize, JsonSchema, PartialEq, Eq, Default)]
#[serde(rename_all = "camelCase")]
pub struct CertificateCondition {
    /// Condition type, e.g. `Ready` or `Issuing`
    #[serde(rename = "type")]
    pub type_: String,

    /// `True`, `False` or `Unknown`
    pub status: String,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub reason: Option<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub message: Option<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub last_transition_time: Option<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub observed_generation: Option<i64>,
}

impl CertificateCondition {
    pub fn is_true(&self) -> bool {
        self.status == CONDITION_TRUE
    }
}

impl Certificate {
    /// First reported condition, if cert-manager has written any yet
    pub fn first_condition(&self) -> Option<&CertificateCondition> {
        self.status.as_ref().and_then(|s| s.conditions.first())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_first_condition_absent_without_status() {
        let cert = Certificate::new("blog", CertificateSpec::default());
        assert!(cert.first_condition().is_none());
    }

    #[test]
    fn test_first_condition_reads_cert_manager_status() {
        let cert: Certificate = serde_json::from_value(json!({
            "apiVersion": "cert-manager.io/v1",
            "kind": "Certificate",
            "metadata": { "name": "blog", "namespace": "prod" },
            "spec": {
                "secretName": "blog",
                "issuerRef": { "name": "letsencrypt" },
                "commonName": "blog.example.com",
                "dnsNames": ["blog.example.com"]
            },
            "status": {
                "conditions": [
                    { "type": "Ready", "status": "True", "message": "cert issued" },
                    { "type": "Issuing", "status": "False" }
                ]
            }
        }))
        .unwrap();

        let condition = cert.first_condition().unwrap();
        assert_eq!(condition.type_, "Ready");
        assert!(condition.is_true());
        assert_eq!(condition.message.as_deref(), Some("cert issued"));
    }

    #[test]
    fn test_condition_status_is_case_sensitive() {
        let condition = CertificateCondition {
            type_: "Ready".to_string(),
            status: "true".to_string(),
            ..Default::default()
        };
        assert!(!condition.is_true());
    }
}
