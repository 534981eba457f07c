//! IAM managed resources: service accounts, their keys and their IAM
//! policies.

use super::common::managed_resource;
use super::{Condition, Reference, ResourceSpec, Selector};
use crate::error::{OperatorError, Result};
use crate::reference::{MultiResolutionRequest, ResolutionRequest, ResolveReferences, Resolver};
use kube::CustomResource;
use schemars::JsonSchema;
use serde::{Deserialize, Serialize};

// ---------------------------------------------------------------------------
// ServiceAccount
// ---------------------------------------------------------------------------

/// A GCP service account
#[derive(CustomResource, Debug, Clone, Serialize, Deserialize, JsonSchema)]
#[kube(
    group = "iam.gcp.crossplane.io",
    version = "v1alpha1",
    kind = "ServiceAccount",
    status = "ServiceAccountStatus",
    category = "crossplane",
    category = "managed",
    category = "gcp",
    printcolumn = r#"{"name":"Ready","type":"string","jsonPath":".status.conditions[?(@.type=='Ready')].status"}"#,
    printcolumn = r#"{"name":"Synced","type":"string","jsonPath":".status.conditions[?(@.type=='Synced')].status"}"#,
    printcolumn = r#"{"name":"Email","type":"string","jsonPath":".status.atProvider.email"}"#,
    printcolumn = r#"{"name":"Age","type":"date","jsonPath":".metadata.creationTimestamp"}"#
)]
#[serde(rename_all = "camelCase")]
pub struct ServiceAccountSpec {
    #[serde(flatten)]
    pub resource_spec: ResourceSpec,
    #[serde(default)]
    pub for_provider: ServiceAccountParameters,
}

/// Desired state of a ServiceAccount. The account ID is the external name.
#[derive(Debug, Clone, Serialize, Deserialize, JsonSchema, PartialEq, Default)]
#[serde(rename_all = "camelCase")]
pub struct ServiceAccountParameters {
    /// Up to 100 characters
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub display_name: Option<String>,

    /// Up to 256 characters
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
}

/// Observed state of a ServiceAccount
#[derive(Debug, Clone, Serialize, Deserialize, JsonSchema, PartialEq, Default)]
#[serde(rename_all = "camelCase")]
pub struct ServiceAccountObservation {
    /// projects/{project}/serviceAccounts/{email}
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub email: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub project_id: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub unique_id: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub oauth2_client_id: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub disabled: Option<bool>,
}

#[derive(Debug, Clone, Serialize, Deserialize, JsonSchema, Default)]
#[serde(rename_all = "camelCase")]
pub struct ServiceAccountStatus {
    #[serde(default)]
    pub conditions: Vec<Condition>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub at_provider: Option<ServiceAccountObservation>,
}

managed_resource!(ServiceAccount);

impl ResolveReferences for ServiceAccount {}

/// Fully qualified resource name of a ServiceAccount.
pub fn service_account_name(sa: &ServiceAccount) -> Option<String> {
    sa.status
        .as_ref()
        .and_then(|s| s.at_provider.as_ref())
        .and_then(|o| o.name.clone())
}

/// `serviceAccount:{email}` member string of a ServiceAccount.
pub fn service_account_member(sa: &ServiceAccount) -> Option<String> {
    sa.status
        .as_ref()
        .and_then(|s| s.at_provider.as_ref())
        .and_then(|o| o.email.as_ref())
        .map(|email| format!("serviceAccount:{}", email))
}

// ---------------------------------------------------------------------------
// ServiceAccountKey
// ---------------------------------------------------------------------------

/// A key of a GCP service account. The external name is the key ID that
/// GCP assigns on creation.
#[derive(CustomResource, Debug, Clone, Serialize, Deserialize, JsonSchema)]
#[kube(
    group = "iam.gcp.crossplane.io",
    version = "v1alpha1",
    kind = "ServiceAccountKey",
    status = "ServiceAccountKeyStatus",
    category = "crossplane",
    category = "managed",
    category = "gcp",
    printcolumn = r#"{"name":"Ready","type":"string","jsonPath":".status.conditions[?(@.type=='Ready')].status"}"#,
    printcolumn = r#"{"name":"Synced","type":"string","jsonPath":".status.conditions[?(@.type=='Synced')].status"}"#,
    printcolumn = r#"{"name":"Key-ID","type":"string","jsonPath":".status.atProvider.keyId"}"#,
    printcolumn = r#"{"name":"Age","type":"date","jsonPath":".metadata.creationTimestamp"}"#
)]
#[serde(rename_all = "camelCase")]
pub struct ServiceAccountKeySpec {
    #[serde(flatten)]
    pub resource_spec: ResourceSpec,
    pub for_provider: ServiceAccountKeyParameters,
}

/// Desired state of a ServiceAccountKey. Every field is immutable.
#[derive(Debug, Clone, Serialize, Deserialize, JsonSchema, PartialEq, Default)]
#[serde(rename_all = "camelCase")]
pub struct ServiceAccountKeyParameters {
    /// projects/{project}/serviceAccounts/{email}
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub service_account: Option<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub service_account_ref: Option<Reference>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub service_account_selector: Option<Selector>,

    /// KEY_ALG_RSA_1024 or KEY_ALG_RSA_2048
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub key_algorithm: Option<String>,

    /// TYPE_GOOGLE_CREDENTIALS_FILE or TYPE_PKCS12_FILE
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub private_key_type: Option<String>,

    /// TYPE_X509_PEM_FILE or TYPE_RAW_PUBLIC_KEY
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub public_key_type: Option<String>,
}

/// Observed state of a ServiceAccountKey
#[derive(Debug, Clone, Serialize, Deserialize, JsonSchema, PartialEq, Default)]
#[serde(rename_all = "camelCase")]
pub struct ServiceAccountKeyObservation {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub key_id: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub private_key_type: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub key_algorithm: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub valid_after_time: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub valid_before_time: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub key_origin: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub key_type: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize, JsonSchema, Default)]
#[serde(rename_all = "camelCase")]
pub struct ServiceAccountKeyStatus {
    #[serde(default)]
    pub conditions: Vec<Condition>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub at_provider: Option<ServiceAccountKeyObservation>,
}

managed_resource!(ServiceAccountKey, assigned_external_name);

#[async_trait::async_trait]
impl ResolveReferences for ServiceAccountKey {
    async fn resolve_references(&mut self, resolver: &Resolver) -> Result<()> {
        let p = &self.spec.for_provider;
        let rsp = resolver
            .resolve(
                &*self,
                ResolutionRequest {
                    current_value: p.service_account.as_deref(),
                    reference: p.service_account_ref.as_ref(),
                    selector: p.service_account_selector.as_ref(),
                },
                service_account_name,
            )
            .await
            .map_err(OperatorError::during("resolve spec.forProvider.serviceAccount"))?;
        let p = &mut self.spec.for_provider;
        p.service_account = rsp.resolved_value;
        p.service_account_ref = rsp.resolved_reference;
        Ok(())
    }
}

// ---------------------------------------------------------------------------
// ServiceAccountPolicy
// ---------------------------------------------------------------------------

/// The IAM policy attached to a service account
#[derive(CustomResource, Debug, Clone, Serialize, Deserialize, JsonSchema)]
#[kube(
    group = "iam.gcp.crossplane.io",
    version = "v1alpha1",
    kind = "ServiceAccountPolicy",
    status = "ServiceAccountPolicyStatus",
    category = "crossplane",
    category = "managed",
    category = "gcp",
    printcolumn = r#"{"name":"Ready","type":"string","jsonPath":".status.conditions[?(@.type=='Ready')].status"}"#,
    printcolumn = r#"{"name":"Synced","type":"string","jsonPath":".status.conditions[?(@.type=='Synced')].status"}"#,
    printcolumn = r#"{"name":"Age","type":"date","jsonPath":".metadata.creationTimestamp"}"#
)]
#[serde(rename_all = "camelCase")]
pub struct ServiceAccountPolicySpec {
    #[serde(flatten)]
    pub resource_spec: ResourceSpec,
    pub for_provider: ServiceAccountPolicyParameters,
}

/// Desired state of a ServiceAccountPolicy
#[derive(Debug, Clone, Serialize, Deserialize, JsonSchema, PartialEq, Default)]
#[serde(rename_all = "camelCase")]
pub struct ServiceAccountPolicyParameters {
    /// projects/{project}/serviceAccounts/{email}
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub service_account: Option<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub service_account_ref: Option<Reference>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub service_account_selector: Option<Selector>,

    pub policy: Policy,
}

/// An IAM policy: a list of role bindings
#[derive(Debug, Clone, Serialize, Deserialize, JsonSchema, PartialEq, Default)]
pub struct Policy {
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub bindings: Vec<Binding>,
}

/// Grants a role to a set of members
#[derive(Debug, Clone, Serialize, Deserialize, JsonSchema, PartialEq, Default)]
#[serde(rename_all = "camelCase")]
pub struct Binding {
    /// e.g. roles/iam.serviceAccountUser
    pub role: String,

    /// e.g. user:alice@example.com, serviceAccount:x@p.iam.gserviceaccount.com
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub members: Vec<String>,

    /// ServiceAccounts whose members replace `members`
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub service_account_member_refs: Vec<Reference>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub service_account_member_selector: Option<Selector>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub condition: Option<Expr>,
}

/// CEL condition restricting a binding
#[derive(Debug, Clone, Serialize, Deserialize, JsonSchema, PartialEq, Default)]
pub struct Expr {
    pub expression: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub title: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub location: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize, JsonSchema, Default)]
#[serde(rename_all = "camelCase")]
pub struct ServiceAccountPolicyStatus {
    #[serde(default)]
    pub conditions: Vec<Condition>,
}

managed_resource!(ServiceAccountPolicy);

#[async_trait::async_trait]
impl ResolveReferences for ServiceAccountPolicy {
    async fn resolve_references(&mut self, resolver: &Resolver) -> Result<()> {
        let p = &self.spec.for_provider;
        let rsp = resolver
            .resolve(
                &*self,
                ResolutionRequest {
                    current_value: p.service_account.as_deref(),
                    reference: p.service_account_ref.as_ref(),
                    selector: p.service_account_selector.as_ref(),
                },
                service_account_name,
            )
            .await
            .map_err(OperatorError::during("resolve spec.forProvider.serviceAccount"))?;

        // Resolved members replace the binding's members list.
        let mut resolved = Vec::with_capacity(p.policy.bindings.len());
        for binding in &p.policy.bindings {
            let members = resolver
                .resolve_multiple(
                    &*self,
                    MultiResolutionRequest {
                        current_values: &binding.members,
                        references: &binding.service_account_member_refs,
                        selector: binding.service_account_member_selector.as_ref(),
                    },
                    service_account_member,
                )
                .await
                .map_err(OperatorError::during("resolve spec.forProvider.policy.bindings.members"))?;
            resolved.push(members);
        }

        let p = &mut self.spec.for_provider;
        p.service_account = rsp.resolved_value;
        p.service_account_ref = rsp.resolved_reference;
        for (binding, members) in p.policy.bindings.iter_mut().zip(resolved) {
            binding.members = members.resolved_values;
            binding.service_account_member_refs = members.resolved_references;
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testing;

    #[test]
    fn test_policy_spec_parses() {
        let json = r#"{
            "forProvider": {
                "serviceAccountRef": {"name": "deployer"},
                "policy": {
                    "bindings": [
                        {"role": "roles/iam.serviceAccountUser", "members": ["user:a@example.com"]}
                    ]
                }
            }
        }"#;
        let spec: ServiceAccountPolicySpec = serde_json::from_str(json).unwrap();
        let binding = &spec.for_provider.policy.bindings[0];
        assert_eq!(binding.role, "roles/iam.serviceAccountUser");
        assert_eq!(binding.members, vec!["user:a@example.com"]);
        assert!(binding.service_account_member_refs.is_empty());
    }

    #[test]
    fn test_service_account_member() {
        let mut sa = ServiceAccount::new(
            "deployer",
            ServiceAccountSpec {
                resource_spec: ResourceSpec::default(),
                for_provider: ServiceAccountParameters::default(),
            },
        );
        assert_eq!(service_account_member(&sa), None);

        sa.status = Some(ServiceAccountStatus {
            conditions: vec![],
            at_provider: Some(ServiceAccountObservation {
                email: Some("deployer@p.iam.gserviceaccount.com".to_string()),
                ..Default::default()
            }),
        });
        assert_eq!(
            service_account_member(&sa).as_deref(),
            Some("serviceAccount:deployer@p.iam.gserviceaccount.com")
        );
    }

    fn deployer() -> ServiceAccount {
        let mut sa = ServiceAccount::new(
            "deployer",
            ServiceAccountSpec {
                resource_spec: ResourceSpec::default(),
                for_provider: ServiceAccountParameters::default(),
            },
        );
        sa.status = Some(ServiceAccountStatus {
            conditions: vec![],
            at_provider: Some(ServiceAccountObservation {
                email: Some("deployer@p.iam.gserviceaccount.com".to_string()),
                ..Default::default()
            }),
        });
        sa
    }

    #[tokio::test]
    async fn test_member_refs_replace_members() {
        let sa = serde_json::to_value(deployer()).unwrap();
        let (client, requests) = testing::mock_client(move |method, path, _| {
            if method == "GET" && path == "/apis/iam.gcp.crossplane.io/v1alpha1/serviceaccounts/deployer" {
                (http::StatusCode::OK, sa.clone())
            } else {
                testing::not_found()
            }
        });

        let mut policy = ServiceAccountPolicy::new(
            "deployer-policy",
            ServiceAccountPolicySpec {
                resource_spec: ResourceSpec::default(),
                for_provider: ServiceAccountPolicyParameters {
                    service_account: Some("projects/p/serviceAccounts/x@p.iam.gserviceaccount.com".to_string()),
                    policy: Policy {
                        bindings: vec![
                            Binding {
                                role: "roles/iam.serviceAccountUser".to_string(),
                                members: vec!["serviceAccount:removed@p.iam.gserviceaccount.com".to_string()],
                                service_account_member_refs: vec![Reference {
                                    name: "deployer".to_string(),
                                }],
                                ..Default::default()
                            },
                            Binding {
                                role: "roles/viewer".to_string(),
                                members: vec!["user:a@example.com".to_string()],
                                ..Default::default()
                            },
                        ],
                    },
                    ..Default::default()
                },
            },
        );
        policy
            .resolve_references(&Resolver::new(client))
            .await
            .unwrap();

        let bindings = &policy.spec.for_provider.policy.bindings;
        assert_eq!(
            bindings[0].members,
            vec!["serviceAccount:deployer@p.iam.gserviceaccount.com"]
        );
        assert_eq!(bindings[0].service_account_member_refs[0].name, "deployer");
        assert_eq!(bindings[1].members, vec!["user:a@example.com"]);
        assert_eq!(requests.lock().unwrap().len(), 1);
    }
}
