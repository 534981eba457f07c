//! Types shared by every managed resource kind.

use crate::conditions;
use crate::error::Result;
use kube::core::ClusterResourceScope;
use kube::{Resource, ResourceExt};
use schemars::JsonSchema;
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::collections::BTreeMap;
use std::fmt::Debug;

/// Annotation holding the identifier of the external resource.
pub const ANNOTATION_EXTERNAL_NAME: &str = "crossplane.io/external-name";

/// Fields common to the spec of every managed resource.
#[derive(Debug, Clone, Serialize, Deserialize, JsonSchema, PartialEq, Default)]
#[serde(rename_all = "camelCase")]
pub struct ResourceSpec {
    /// ProviderConfig used to connect to GCP
    #[serde(default)]
    pub provider_config_ref: ProviderConfigReference,

    /// Secret the connection details of this resource are written to
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub write_connection_secret_to_ref: Option<SecretReference>,

    /// What happens to the external resource when this object is deleted
    #[serde(default)]
    pub deletion_policy: DeletionPolicy,
}

/// Reference to a cluster-scoped ProviderConfig
#[derive(Debug, Clone, Serialize, Deserialize, JsonSchema, PartialEq)]
pub struct ProviderConfigReference {
    pub name: String,
}

impl Default for ProviderConfigReference {
    fn default() -> Self {
        Self {
            name: "default".to_string(),
        }
    }
}

/// Reference to a namespaced Secret
#[derive(Debug, Clone, Serialize, Deserialize, JsonSchema, PartialEq)]
pub struct SecretReference {
    pub name: String,
    pub namespace: String,
}

/// Reference to a key within a namespaced Secret
#[derive(Debug, Clone, Serialize, Deserialize, JsonSchema, PartialEq)]
pub struct SecretKeySelector {
    pub name: String,
    pub namespace: String,
    pub key: String,
}

/// Policy applied to the external resource on deletion
#[derive(Debug, Clone, Copy, Serialize, Deserialize, JsonSchema, Default, PartialEq, Eq)]
pub enum DeletionPolicy {
    /// Delete the external resource
    #[default]
    Delete,
    /// Leave the external resource in place
    Orphan,
}

/// Reference to another managed resource by name
#[derive(Debug, Clone, Serialize, Deserialize, JsonSchema, PartialEq, Eq)]
pub struct Reference {
    pub name: String,
}

/// Selects a managed resource to reference by labels
#[derive(Debug, Clone, Serialize, Deserialize, JsonSchema, PartialEq, Eq, Default)]
#[serde(rename_all = "camelCase")]
pub struct Selector {
    /// Labels the referenced resource must carry
    #[serde(default, skip_serializing_if = "BTreeMap::is_empty")]
    pub match_labels: BTreeMap<String, String>,

    /// Only select resources sharing this resource's controller
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub match_controller_ref: Option<bool>,
}

/// Condition of a managed resource
#[derive(Debug, Clone, Serialize, Deserialize, JsonSchema, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct Condition {
    /// Type of condition
    pub r#type: String,
    /// Status of the condition (True, False, Unknown)
    pub status: String,
    /// Last time the condition transitioned
    #[serde(default)]
    pub last_transition_time: Option<String>,
    /// Reason for the condition
    #[serde(default)]
    pub reason: Option<String>,
    /// Human-readable message
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub message: Option<String>,
}

/// Accessors the managed reconciler needs from every kind.
pub trait Managed:
    Resource<DynamicType = (), Scope = ClusterResourceScope>
    + Clone
    + Debug
    + Serialize
    + DeserializeOwned
    + Send
    + Sync
    + 'static
{
    /// Whether the external name defaults to `metadata.name`. Kinds whose
    /// identifier is assigned by GCP on creation set this to false.
    const NAME_AS_EXTERNAL_NAME: bool = true;

    fn resource_spec(&self) -> &ResourceSpec;

    fn conditions(&self) -> &[Condition];

    fn conditions_mut(&mut self) -> &mut Vec<Condition>;

    fn set_condition(&mut self, condition: Condition) {
        conditions::set_condition(self.conditions_mut(), condition);
    }

    /// The `spec` of this object as JSON, used for merge patches.
    fn spec_json(&self) -> Result<Value> {
        field_json(self, "spec")
    }

    /// The `status` of this object as JSON, used for status merge patches.
    fn status_json(&self) -> Result<Value> {
        field_json(self, "status")
    }
}

fn field_json<T: Serialize>(obj: &T, field: &str) -> Result<Value> {
    let mut value = serde_json::to_value(obj)?;
    Ok(value
        .get_mut(field)
        .map(Value::take)
        .unwrap_or(Value::Null))
}

/// External name annotation, if set and non-empty.
pub fn external_name<K: Resource>(obj: &K) -> Option<&str> {
    obj.meta()
        .annotations
        .as_ref()
        .and_then(|a| a.get(ANNOTATION_EXTERNAL_NAME))
        .map(String::as_str)
        .filter(|n| !n.is_empty())
}

/// External name, falling back to `metadata.name`.
pub fn external_name_or_name<K: Resource>(obj: &K) -> String {
    external_name(obj)
        .map(str::to_string)
        .unwrap_or_else(|| obj.name_any())
}

pub fn set_external_name<K: Resource>(obj: &mut K, name: &str) {
    obj.meta_mut()
        .annotations
        .get_or_insert_with(BTreeMap::new)
        .insert(ANNOTATION_EXTERNAL_NAME.to_string(), name.to_string());
}

/// Implements [`Managed`] for a kind whose spec flattens [`ResourceSpec`]
/// and whose status carries `conditions`.
macro_rules! managed_resource {
    ($kind:ty) => {
        managed_resource!(@impl $kind, true);
    };
    ($kind:ty, assigned_external_name) => {
        managed_resource!(@impl $kind, false);
    };
    (@impl $kind:ty, $name_as_external:expr) => {
        impl $crate::crd::Managed for $kind {
            const NAME_AS_EXTERNAL_NAME: bool = $name_as_external;

            fn resource_spec(&self) -> &$crate::crd::ResourceSpec {
                &self.spec.resource_spec
            }

            fn conditions(&self) -> &[$crate::crd::Condition] {
                self.status
                    .as_ref()
                    .map(|s| s.conditions.as_slice())
                    .unwrap_or_default()
            }

            fn conditions_mut(&mut self) -> &mut Vec<$crate::crd::Condition> {
                &mut self.status.get_or_insert_with(Default::default).conditions
            }
        }
    };
}

pub(crate) use managed_resource;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_resource_spec_defaults() {
        let spec: ResourceSpec = serde_json::from_str("{}").unwrap();
        assert_eq!(spec.provider_config_ref.name, "default");
        assert_eq!(spec.deletion_policy, DeletionPolicy::Delete);
        assert!(spec.write_connection_secret_to_ref.is_none());
    }

    #[test]
    fn test_deletion_policy_parses() {
        let spec: ResourceSpec = serde_json::from_str(r#"{"deletionPolicy": "Orphan"}"#).unwrap();
        assert_eq!(spec.deletion_policy, DeletionPolicy::Orphan);
    }

    #[test]
    fn test_selector_camel_case() {
        let sel: Selector =
            serde_json::from_str(r#"{"matchLabels": {"app": "db"}, "matchControllerRef": true}"#)
                .unwrap();
        assert_eq!(sel.match_labels.get("app").map(String::as_str), Some("db"));
        assert_eq!(sel.match_controller_ref, Some(true));
    }
}
