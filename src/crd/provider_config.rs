//! ProviderConfig Custom Resource Definition
//!
//! Tells managed resources which GCP project to act in and where the
//! credentials for it live.

use super::{Condition, SecretKeySelector};
use kube::CustomResource;
use schemars::JsonSchema;
use serde::{Deserialize, Serialize};

/// ProviderConfig configures how managed resources connect to GCP
#[derive(CustomResource, Debug, Clone, Serialize, Deserialize, JsonSchema)]
#[kube(
    group = "gcp.crossplane.io",
    version = "v1beta1",
    kind = "ProviderConfig",
    status = "ProviderConfigStatus",
    printcolumn = r#"{"name":"Project","type":"string","jsonPath":".spec.projectID"}"#,
    printcolumn = r#"{"name":"Source","type":"string","jsonPath":".spec.credentials.source"}"#,
    printcolumn = r#"{"name":"Age","type":"date","jsonPath":".metadata.creationTimestamp"}"#
)]
#[serde(rename_all = "camelCase")]
pub struct ProviderConfigSpec {
    /// ID of the GCP project resources are managed in
    #[serde(rename = "projectID")]
    pub project_id: String,

    /// Credentials used to authenticate against GCP
    pub credentials: ProviderCredentials,
}

/// Where provider credentials come from
#[derive(Debug, Clone, Serialize, Deserialize, JsonSchema, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct ProviderCredentials {
    pub source: CredentialsSource,

    /// Secret key holding a service account JSON key; required for `Secret`
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub secret_ref: Option<SecretKeySelector>,
}

/// Credential source
#[derive(Debug, Clone, Copy, Serialize, Deserialize, JsonSchema, PartialEq, Eq)]
pub enum CredentialsSource {
    /// A service account key stored in a Kubernetes Secret
    Secret,
    /// The workload identity of the pod, via the GCE metadata server
    InjectedIdentity,
}

/// Status of the ProviderConfig
#[derive(Debug, Clone, Serialize, Deserialize, JsonSchema, Default)]
#[serde(rename_all = "camelCase")]
pub struct ProviderConfigStatus {
    #[serde(default)]
    pub conditions: Vec<Condition>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_provider_config_spec_parses() {
        let json = r#"{
            "projectID": "my-project",
            "credentials": {
                "source": "Secret",
                "secretRef": {"namespace": "crossplane-system", "name": "gcp-creds", "key": "creds"}
            }
        }"#;
        let spec: ProviderConfigSpec = serde_json::from_str(json).unwrap();
        assert_eq!(spec.project_id, "my-project");
        assert_eq!(spec.credentials.source, CredentialsSource::Secret);
        assert_eq!(spec.credentials.secret_ref.unwrap().key, "creds");
    }

    #[test]
    fn test_injected_identity_needs_no_secret() {
        let json = r#"{"projectID": "p", "credentials": {"source": "InjectedIdentity"}}"#;
        let spec: ProviderConfigSpec = serde_json::from_str(json).unwrap();
        assert!(spec.credentials.secret_ref.is_none());
    }
}
