//! IAM v1 wire types: service accounts, keys and policies

use serde::{Deserialize, Serialize};

const BASE: &str = "https://iam.googleapis.com/v1";

pub fn service_accounts_url(project: &str) -> String {
    format!("{}/projects/{}/serviceAccounts", BASE, project)
}

/// URL of a service account given its `projects/{p}/serviceAccounts/{email}`
/// resource name.
pub fn resource_url(name: &str) -> String {
    format!("{}/{}", BASE, name)
}

/// Resource name of a service account from its account ID.
pub fn service_account_name(project: &str, account_id: &str) -> String {
    format!(
        "projects/{}/serviceAccounts/{}@{}.iam.gserviceaccount.com",
        project, account_id, project
    )
}

pub fn keys_url(service_account: &str) -> String {
    format!("{}/keys", resource_url(service_account))
}

pub fn key_url(service_account: &str, key_id: &str) -> String {
    format!("{}/{}", keys_url(service_account), key_id)
}

pub fn get_iam_policy_url(service_account: &str) -> String {
    format!("{}:getIamPolicy", resource_url(service_account))
}

pub fn set_iam_policy_url(service_account: &str) -> String {
    format!("{}:setIamPolicy", resource_url(service_account))
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Default)]
#[serde(rename_all = "camelCase")]
pub struct ServiceAccount {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub display_name: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
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
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub etag: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Default)]
#[serde(rename_all = "camelCase")]
pub struct CreateServiceAccountRequest {
    pub account_id: String,
    pub service_account: ServiceAccount,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Default)]
#[serde(rename_all = "camelCase")]
pub struct PatchServiceAccountRequest {
    pub service_account: ServiceAccount,
    pub update_mask: String,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Default)]
#[serde(rename_all = "camelCase")]
pub struct ServiceAccountKey {
    /// projects/{p}/serviceAccounts/{email}/keys/{key}
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub private_key_type: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub key_algorithm: Option<String>,
    /// Base64, only returned on creation
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub private_key_data: Option<String>,
    /// Base64
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub public_key_data: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub valid_after_time: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub valid_before_time: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub key_origin: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub key_type: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Default)]
#[serde(rename_all = "camelCase")]
pub struct CreateServiceAccountKeyRequest {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub key_algorithm: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub private_key_type: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Default)]
pub struct Policy {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub version: Option<i64>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub bindings: Vec<Binding>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub etag: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Default)]
pub struct Binding {
    #[serde(default)]
    pub role: String,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub members: Vec<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub condition: Option<Expr>,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Default)]
pub struct Expr {
    #[serde(default)]
    pub expression: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub title: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub location: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Default)]
#[serde(rename_all = "camelCase")]
pub struct GetIamPolicyRequest {
    pub options: GetPolicyOptions,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Default)]
#[serde(rename_all = "camelCase")]
pub struct GetPolicyOptions {
    pub requested_policy_version: i64,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Default)]
pub struct SetIamPolicyRequest {
    pub policy: Policy,
}
