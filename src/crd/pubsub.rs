//! Pub/Sub managed resources

use super::common::managed_resource;
use super::{Condition, Reference, ResourceSpec, Selector};
use crate::error::{OperatorError, Result};
use crate::reference::{external_name_of, ResolutionRequest, ResolveReferences, Resolver};
use kube::CustomResource;
use schemars::JsonSchema;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// A Pub/Sub topic
#[derive(CustomResource, Debug, Clone, Serialize, Deserialize, JsonSchema)]
#[kube(
    group = "pubsub.gcp.crossplane.io",
    version = "v1alpha1",
    kind = "Topic",
    status = "TopicStatus",
    category = "crossplane",
    category = "managed",
    category = "gcp",
    printcolumn = r#"{"name":"Ready","type":"string","jsonPath":".status.conditions[?(@.type=='Ready')].status"}"#,
    printcolumn = r#"{"name":"Synced","type":"string","jsonPath":".status.conditions[?(@.type=='Synced')].status"}"#,
    printcolumn = r#"{"name":"Age","type":"date","jsonPath":".metadata.creationTimestamp"}"#
)]
#[serde(rename_all = "camelCase")]
pub struct TopicSpec {
    #[serde(flatten)]
    pub resource_spec: ResourceSpec,
    #[serde(default)]
    pub for_provider: TopicParameters,
}

/// Desired state of a Topic
#[derive(Debug, Clone, Serialize, Deserialize, JsonSchema, PartialEq, Default)]
#[serde(rename_all = "camelCase")]
pub struct TopicParameters {
    #[serde(default, skip_serializing_if = "BTreeMap::is_empty")]
    pub labels: BTreeMap<String, String>,

    /// Regions messages may be stored in
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub message_storage_policy: Option<MessageStoragePolicy>,

    /// Cloud KMS key protecting messages. Immutable.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub kms_key_name: Option<String>,

    /// Duration string such as "86400s"
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub message_retention_duration: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize, JsonSchema, PartialEq, Default)]
#[serde(rename_all = "camelCase")]
pub struct MessageStoragePolicy {
    #[serde(default)]
    pub allowed_persistence_regions: Vec<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize, JsonSchema, Default)]
#[serde(rename_all = "camelCase")]
pub struct TopicStatus {
    #[serde(default)]
    pub conditions: Vec<Condition>,
}

managed_resource!(Topic);

impl ResolveReferences for Topic {}

/// A Pub/Sub subscription
#[derive(CustomResource, Debug, Clone, Serialize, Deserialize, JsonSchema)]
#[kube(
    group = "pubsub.gcp.crossplane.io",
    version = "v1alpha1",
    kind = "Subscription",
    status = "SubscriptionStatus",
    category = "crossplane",
    category = "managed",
    category = "gcp",
    printcolumn = r#"{"name":"Ready","type":"string","jsonPath":".status.conditions[?(@.type=='Ready')].status"}"#,
    printcolumn = r#"{"name":"Synced","type":"string","jsonPath":".status.conditions[?(@.type=='Synced')].status"}"#,
    printcolumn = r#"{"name":"Topic","type":"string","jsonPath":".spec.forProvider.topic"}"#,
    printcolumn = r#"{"name":"Age","type":"date","jsonPath":".metadata.creationTimestamp"}"#
)]
#[serde(rename_all = "camelCase")]
pub struct SubscriptionSpec {
    #[serde(flatten)]
    pub resource_spec: ResourceSpec,
    pub for_provider: SubscriptionParameters,
}

/// Desired state of a Subscription
#[derive(Debug, Clone, Serialize, Deserialize, JsonSchema, PartialEq, Default)]
#[serde(rename_all = "camelCase")]
pub struct SubscriptionParameters {
    /// Name of the topic in the same project. Immutable.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub topic: Option<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub topic_ref: Option<Reference>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub topic_selector: Option<Selector>,

    /// Seconds a subscriber has to acknowledge a message
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub ack_deadline_seconds: Option<i64>,

    #[serde(default, skip_serializing_if = "BTreeMap::is_empty")]
    pub labels: BTreeMap<String, String>,

    /// Duration string such as "604800s"
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub message_retention_duration: Option<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub retain_acked_messages: Option<bool>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub push_config: Option<PushConfig>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub expiration_policy: Option<ExpirationPolicy>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub dead_letter_policy: Option<DeadLetterPolicy>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub retry_policy: Option<RetryPolicy>,

    /// Immutable.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub filter: Option<String>,

    /// Immutable.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub enable_message_ordering: Option<bool>,
}

#[derive(Debug, Clone, Serialize, Deserialize, JsonSchema, PartialEq, Default)]
#[serde(rename_all = "camelCase")]
pub struct PushConfig {
    pub push_endpoint: String,
    #[serde(default, skip_serializing_if = "BTreeMap::is_empty")]
    pub attributes: BTreeMap<String, String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub oidc_token: Option<OidcToken>,
}

#[derive(Debug, Clone, Serialize, Deserialize, JsonSchema, PartialEq, Default)]
#[serde(rename_all = "camelCase")]
pub struct OidcToken {
    pub service_account_email: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub audience: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize, JsonSchema, PartialEq, Default)]
pub struct ExpirationPolicy {
    /// Duration string; an empty value means never expire
    pub ttl: String,
}

#[derive(Debug, Clone, Serialize, Deserialize, JsonSchema, PartialEq, Default)]
#[serde(rename_all = "camelCase")]
pub struct DeadLetterPolicy {
    /// projects/{project}/topics/{topic}
    pub dead_letter_topic: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub max_delivery_attempts: Option<i64>,
}

#[derive(Debug, Clone, Serialize, Deserialize, JsonSchema, PartialEq, Default)]
#[serde(rename_all = "camelCase")]
pub struct RetryPolicy {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub minimum_backoff: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub maximum_backoff: Option<String>,
}

/// Observed state of a Subscription
#[derive(Debug, Clone, Serialize, Deserialize, JsonSchema, PartialEq, Default)]
pub struct SubscriptionObservation {
    /// ACTIVE or RESOURCE_ERROR
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub state: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize, JsonSchema, Default)]
#[serde(rename_all = "camelCase")]
pub struct SubscriptionStatus {
    #[serde(default)]
    pub conditions: Vec<Condition>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub at_provider: Option<SubscriptionObservation>,
}

managed_resource!(Subscription);

#[async_trait::async_trait]
impl ResolveReferences for Subscription {
    async fn resolve_references(&mut self, resolver: &Resolver) -> Result<()> {
        let p = &self.spec.for_provider;
        let rsp = resolver
            .resolve(
                &*self,
                ResolutionRequest {
                    current_value: p.topic.as_deref(),
                    reference: p.topic_ref.as_ref(),
                    selector: p.topic_selector.as_ref(),
                },
                external_name_of::<Topic>,
            )
            .await
            .map_err(OperatorError::during("resolve spec.forProvider.topic"))?;
        let p = &mut self.spec.for_provider;
        p.topic = rsp.resolved_value;
        p.topic_ref = rsp.resolved_reference;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_topic_spec_defaults() {
        let spec: TopicSpec = serde_json::from_str("{}").unwrap();
        assert!(spec.for_provider.labels.is_empty());
        assert!(spec.for_provider.message_storage_policy.is_none());
    }

    #[test]
    fn test_subscription_spec_parses() {
        let json = r#"{
            "forProvider": {
                "topicRef": {"name": "events"},
                "ackDeadlineSeconds": 20,
                "pushConfig": {"pushEndpoint": "https://example.com/push"}
            }
        }"#;
        let spec: SubscriptionSpec = serde_json::from_str(json).unwrap();
        assert_eq!(spec.for_provider.ack_deadline_seconds, Some(20));
        assert_eq!(
            spec.for_provider.push_config.unwrap().push_endpoint,
            "https://example.com/push"
        );
    }
}
