//! Cloud KMS managed resources

use super::common::managed_resource;
use super::{Condition, Reference, ResourceSpec, Selector};
use crate::error::{OperatorError, Result};
use crate::reference::{ResolutionRequest, ResolveReferences, Resolver};
use kube::CustomResource;
use schemars::JsonSchema;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// A KMS key ring. Key rings cannot be deleted in GCP.
#[derive(CustomResource, Debug, Clone, Serialize, Deserialize, JsonSchema)]
#[kube(
    group = "kms.gcp.crossplane.io",
    version = "v1alpha1",
    kind = "KeyRing",
    status = "KeyRingStatus",
    category = "crossplane",
    category = "managed",
    category = "gcp",
    printcolumn = r#"{"name":"Ready","type":"string","jsonPath":".status.conditions[?(@.type=='Ready')].status"}"#,
    printcolumn = r#"{"name":"Synced","type":"string","jsonPath":".status.conditions[?(@.type=='Synced')].status"}"#,
    printcolumn = r#"{"name":"Location","type":"string","jsonPath":".spec.forProvider.location"}"#,
    printcolumn = r#"{"name":"Age","type":"date","jsonPath":".metadata.creationTimestamp"}"#
)]
#[serde(rename_all = "camelCase")]
pub struct KeyRingSpec {
    #[serde(flatten)]
    pub resource_spec: ResourceSpec,
    pub for_provider: KeyRingParameters,
}

#[derive(Debug, Clone, Serialize, Deserialize, JsonSchema, PartialEq, Default)]
#[serde(rename_all = "camelCase")]
pub struct KeyRingParameters {
    /// e.g. global or us-east1. Immutable.
    pub location: String,
}

#[derive(Debug, Clone, Serialize, Deserialize, JsonSchema, PartialEq, Default)]
#[serde(rename_all = "camelCase")]
pub struct KeyRingObservation {
    /// projects/{project}/locations/{location}/keyRings/{name}
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub create_time: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize, JsonSchema, Default)]
#[serde(rename_all = "camelCase")]
pub struct KeyRingStatus {
    #[serde(default)]
    pub conditions: Vec<Condition>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub at_provider: Option<KeyRingObservation>,
}

managed_resource!(KeyRing);

impl ResolveReferences for KeyRing {}

/// Fully qualified resource name of a KeyRing.
pub fn key_ring_name(kr: &KeyRing) -> Option<String> {
    kr.status
        .as_ref()
        .and_then(|s| s.at_provider.as_ref())
        .and_then(|o| o.name.clone())
}

/// A KMS crypto key. Crypto keys cannot be deleted in GCP.
#[derive(CustomResource, Debug, Clone, Serialize, Deserialize, JsonSchema)]
#[kube(
    group = "kms.gcp.crossplane.io",
    version = "v1alpha1",
    kind = "CryptoKey",
    status = "CryptoKeyStatus",
    category = "crossplane",
    category = "managed",
    category = "gcp",
    printcolumn = r#"{"name":"Ready","type":"string","jsonPath":".status.conditions[?(@.type=='Ready')].status"}"#,
    printcolumn = r#"{"name":"Synced","type":"string","jsonPath":".status.conditions[?(@.type=='Synced')].status"}"#,
    printcolumn = r#"{"name":"Purpose","type":"string","jsonPath":".spec.forProvider.purpose"}"#,
    printcolumn = r#"{"name":"Age","type":"date","jsonPath":".metadata.creationTimestamp"}"#
)]
#[serde(rename_all = "camelCase")]
pub struct CryptoKeySpec {
    #[serde(flatten)]
    pub resource_spec: ResourceSpec,
    pub for_provider: CryptoKeyParameters,
}

/// Desired state of a CryptoKey
#[derive(Debug, Clone, Serialize, Deserialize, JsonSchema, PartialEq, Default)]
#[serde(rename_all = "camelCase")]
pub struct CryptoKeyParameters {
    /// projects/{project}/locations/{location}/keyRings/{name}. Immutable.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub key_ring: Option<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub key_ring_ref: Option<Reference>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub key_ring_selector: Option<Selector>,

    /// ENCRYPT_DECRYPT, ASYMMETRIC_SIGN, ASYMMETRIC_DECRYPT or MAC. Immutable.
    pub purpose: String,

    /// Duration string such as "7776000s"
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub rotation_period: Option<String>,

    /// RFC 3339 timestamp of the next rotation
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub next_rotation_time: Option<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub version_template: Option<CryptoKeyVersionTemplate>,

    #[serde(default, skip_serializing_if = "BTreeMap::is_empty")]
    pub labels: BTreeMap<String, String>,
}

#[derive(Debug, Clone, Serialize, Deserialize, JsonSchema, PartialEq, Default)]
#[serde(rename_all = "camelCase")]
pub struct CryptoKeyVersionTemplate {
    /// e.g. GOOGLE_SYMMETRIC_ENCRYPTION
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub algorithm: Option<String>,
    /// SOFTWARE, HSM or EXTERNAL
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub protection_level: Option<String>,
}

/// Observed state of a CryptoKey
#[derive(Debug, Clone, Serialize, Deserialize, JsonSchema, PartialEq, Default)]
#[serde(rename_all = "camelCase")]
pub struct CryptoKeyObservation {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub create_time: Option<String>,
    /// Name of the version used for encryption
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub primary: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize, JsonSchema, Default)]
#[serde(rename_all = "camelCase")]
pub struct CryptoKeyStatus {
    #[serde(default)]
    pub conditions: Vec<Condition>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub at_provider: Option<CryptoKeyObservation>,
}

managed_resource!(CryptoKey);

#[async_trait::async_trait]
impl ResolveReferences for CryptoKey {
    async fn resolve_references(&mut self, resolver: &Resolver) -> Result<()> {
        let p = &self.spec.for_provider;
        let rsp = resolver
            .resolve(
                &*self,
                ResolutionRequest {
                    current_value: p.key_ring.as_deref(),
                    reference: p.key_ring_ref.as_ref(),
                    selector: p.key_ring_selector.as_ref(),
                },
                key_ring_name,
            )
            .await
            .map_err(OperatorError::during("resolve spec.forProvider.keyRing"))?;
        let p = &mut self.spec.for_provider;
        p.key_ring = rsp.resolved_value;
        p.key_ring_ref = rsp.resolved_reference;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_crypto_key_spec_parses() {
        let json = r#"{
            "forProvider": {
                "keyRingRef": {"name": "ring"},
                "purpose": "ENCRYPT_DECRYPT",
                "rotationPeriod": "7776000s",
                "versionTemplate": {"protectionLevel": "HSM"}
            }
        }"#;
        let spec: CryptoKeySpec = serde_json::from_str(json).unwrap();
        assert_eq!(spec.for_provider.purpose, "ENCRYPT_DECRYPT");
        assert_eq!(
            spec.for_provider
                .version_template
                .unwrap()
                .protection_level
                .as_deref(),
            Some("HSM")
        );
    }
}
