//! Topic and Subscription conversion
//!
//! Pub/Sub updates send the whole object together with an updateMask, so
//! the up-to-date checks here return the mask of differing fields instead
//! of a boolean.

use super::{late_init, set_if_some, set_map_if_not_empty};
use crate::crd::{
    DeadLetterPolicy, ExpirationPolicy, MessageStoragePolicy, OidcToken, PushConfig, RetryPolicy,
    SubscriptionObservation, SubscriptionParameters, TopicParameters,
};
use crate::gcp::pubsub;

// ---------------------------------------------------------------------------
// Topic
// ---------------------------------------------------------------------------

pub fn generate_topic(project: &str, name: &str, params: &TopicParameters, target: &mut pubsub::Topic) {
    target.name = pubsub::topic_name(project, name);
    set_map_if_not_empty(&mut target.labels, &params.labels);
    if let Some(msp) = &params.message_storage_policy {
        target.message_storage_policy = Some(pubsub::MessageStoragePolicy {
            allowed_persistence_regions: msp.allowed_persistence_regions.clone(),
        });
    }
    set_if_some(&mut target.kms_key_name, &params.kms_key_name);
    set_if_some(
        &mut target.message_retention_duration,
        &params.message_retention_duration,
    );
}

pub fn late_initialize_topic(params: &mut TopicParameters, observed: &pubsub::Topic) {
    if params.message_storage_policy.is_none() {
        params.message_storage_policy = observed
            .message_storage_policy
            .as_ref()
            .map(|m| MessageStoragePolicy {
                allowed_persistence_regions: m.allowed_persistence_regions.clone(),
            });
    }
    late_init(&mut params.kms_key_name, &observed.kms_key_name);
    late_init(
        &mut params.message_retention_duration,
        &observed.message_retention_duration,
    );
}

/// Mutable topic fields that differ from the spec.
pub fn topic_update_mask(project: &str, name: &str, params: &TopicParameters, observed: &pubsub::Topic) -> Vec<&'static str> {
    let mut desired = observed.clone();
    generate_topic(project, name, params, &mut desired);
    let mut mask = Vec::new();
    if desired.labels != observed.labels {
        mask.push("labels");
    }
    if desired.message_storage_policy != observed.message_storage_policy {
        mask.push("messageStoragePolicy");
    }
    if desired.message_retention_duration != observed.message_retention_duration {
        mask.push("messageRetentionDuration");
    }
    mask
}

// ---------------------------------------------------------------------------
// Subscription
// ---------------------------------------------------------------------------

pub fn generate_subscription(
    project: &str,
    name: &str,
    params: &SubscriptionParameters,
    target: &mut pubsub::Subscription,
) {
    target.name = pubsub::subscription_name(project, name);
    if let Some(topic) = &params.topic {
        target.topic = pubsub::qualified_topic_name(project, topic);
    }
    set_if_some(&mut target.ack_deadline_seconds, &params.ack_deadline_seconds);
    set_map_if_not_empty(&mut target.labels, &params.labels);
    set_if_some(
        &mut target.message_retention_duration,
        &params.message_retention_duration,
    );
    set_if_some(&mut target.retain_acked_messages, &params.retain_acked_messages);
    if let Some(pc) = &params.push_config {
        target.push_config = Some(pubsub::PushConfig {
            push_endpoint: pc.push_endpoint.clone(),
            attributes: pc.attributes.clone(),
            oidc_token: pc.oidc_token.as_ref().map(|t| pubsub::OidcToken {
                service_account_email: t.service_account_email.clone(),
                audience: t.audience.clone(),
            }),
        });
    }
    if let Some(ep) = &params.expiration_policy {
        target.expiration_policy = Some(pubsub::ExpirationPolicy { ttl: ep.ttl.clone() });
    }
    if let Some(dl) = &params.dead_letter_policy {
        target.dead_letter_policy = Some(pubsub::DeadLetterPolicy {
            dead_letter_topic: dl.dead_letter_topic.clone(),
            max_delivery_attempts: dl.max_delivery_attempts,
        });
    }
    if let Some(rp) = &params.retry_policy {
        target.retry_policy = Some(pubsub::RetryPolicy {
            minimum_backoff: rp.minimum_backoff.clone(),
            maximum_backoff: rp.maximum_backoff.clone(),
        });
    }
    set_if_some(&mut target.filter, &params.filter);
    set_if_some(&mut target.enable_message_ordering, &params.enable_message_ordering);
}

pub fn generate_subscription_observation(observed: &pubsub::Subscription) -> SubscriptionObservation {
    SubscriptionObservation {
        state: observed.state.clone(),
    }
}

pub fn late_initialize_subscription(params: &mut SubscriptionParameters, observed: &pubsub::Subscription) {
    if params.topic.is_none() && !observed.topic.is_empty() {
        params.topic = Some(observed.topic.clone());
    }
    late_init(&mut params.ack_deadline_seconds, &observed.ack_deadline_seconds);
    late_init(
        &mut params.message_retention_duration,
        &observed.message_retention_duration,
    );
    late_init(&mut params.retain_acked_messages, &observed.retain_acked_messages);
    late_init(&mut params.filter, &observed.filter);
    late_init(&mut params.enable_message_ordering, &observed.enable_message_ordering);
    if params.push_config.is_none() {
        params.push_config = observed.push_config.as_ref().map(|pc| PushConfig {
            push_endpoint: pc.push_endpoint.clone(),
            attributes: pc.attributes.clone(),
            oidc_token: pc.oidc_token.as_ref().map(|t| OidcToken {
                service_account_email: t.service_account_email.clone(),
                audience: t.audience.clone(),
            }),
        });
    }
    if params.expiration_policy.is_none() {
        params.expiration_policy = observed
            .expiration_policy
            .as_ref()
            .map(|ep| ExpirationPolicy { ttl: ep.ttl.clone() });
    }
    if params.dead_letter_policy.is_none() {
        params.dead_letter_policy = observed.dead_letter_policy.as_ref().map(|dl| DeadLetterPolicy {
            dead_letter_topic: dl.dead_letter_topic.clone(),
            max_delivery_attempts: dl.max_delivery_attempts,
        });
    }
    if params.retry_policy.is_none() {
        params.retry_policy = observed.retry_policy.as_ref().map(|rp| RetryPolicy {
            minimum_backoff: rp.minimum_backoff.clone(),
            maximum_backoff: rp.maximum_backoff.clone(),
        });
    }
}

/// Mutable subscription fields that differ from the spec.
pub fn subscription_update_mask(
    project: &str,
    name: &str,
    params: &SubscriptionParameters,
    observed: &pubsub::Subscription,
) -> Vec<&'static str> {
    let mut desired = observed.clone();
    generate_subscription(project, name, params, &mut desired);
    let mut mask = Vec::new();
    if desired.ack_deadline_seconds != observed.ack_deadline_seconds {
        mask.push("ackDeadlineSeconds");
    }
    if desired.labels != observed.labels {
        mask.push("labels");
    }
    if desired.message_retention_duration != observed.message_retention_duration {
        mask.push("messageRetentionDuration");
    }
    if desired.retain_acked_messages != observed.retain_acked_messages {
        mask.push("retainAckedMessages");
    }
    if desired.push_config != observed.push_config {
        mask.push("pushConfig");
    }
    if desired.expiration_policy != observed.expiration_policy {
        mask.push("expirationPolicy");
    }
    if desired.dead_letter_policy != observed.dead_letter_policy {
        mask.push("deadLetterPolicy");
    }
    if desired.retry_policy != observed.retry_policy {
        mask.push("retryPolicy");
    }
    mask
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;
    use std::collections::BTreeMap;

    #[test]
    fn test_generate_topic() {
        let params = TopicParameters {
            labels: BTreeMap::from([("env".to_string(), "prod".to_string())]),
            message_storage_policy: Some(MessageStoragePolicy {
                allowed_persistence_regions: vec!["europe-west1".to_string()],
            }),
            ..Default::default()
        };
        let mut topic = pubsub::Topic::default();
        generate_topic("p", "events", &params, &mut topic);
        assert_eq!(topic.name, "projects/p/topics/events");
        assert_eq!(topic.labels["env"], "prod");
        assert_eq!(
            topic.message_storage_policy.unwrap().allowed_persistence_regions,
            vec!["europe-west1"]
        );
    }

    #[test]
    fn test_topic_update_mask() {
        let observed = pubsub::Topic {
            name: "projects/p/topics/events".to_string(),
            labels: BTreeMap::from([("env".to_string(), "dev".to_string())]),
            message_retention_duration: Some("600s".to_string()),
            ..Default::default()
        };
        let params = TopicParameters {
            labels: BTreeMap::from([("env".to_string(), "prod".to_string())]),
            ..Default::default()
        };
        assert_eq!(topic_update_mask("p", "events", &params, &observed), vec!["labels"]);

        let mut same = TopicParameters {
            labels: observed.labels.clone(),
            ..Default::default()
        };
        late_initialize_topic(&mut same, &observed);
        assert_eq!(same.message_retention_duration.as_deref(), Some("600s"));
        assert!(topic_update_mask("p", "events", &same, &observed).is_empty());
    }

    #[test]
    fn test_subscription_topic_is_qualified() {
        let params = SubscriptionParameters {
            topic: Some("events".to_string()),
            ..Default::default()
        };
        let mut sub = pubsub::Subscription::default();
        generate_subscription("p", "worker", &params, &mut sub);
        assert_eq!(sub.name, "projects/p/subscriptions/worker");
        assert_eq!(sub.topic, "projects/p/topics/events");
    }

    #[test]
    fn test_subscription_update_mask() {
        let observed = pubsub::Subscription {
            name: "projects/p/subscriptions/worker".to_string(),
            topic: "projects/p/topics/events".to_string(),
            ack_deadline_seconds: Some(10),
            message_retention_duration: Some("604800s".to_string()),
            expiration_policy: Some(pubsub::ExpirationPolicy {
                ttl: "2678400s".to_string(),
            }),
            state: Some("ACTIVE".to_string()),
            ..Default::default()
        };
        let mut params = SubscriptionParameters {
            topic: Some("events".to_string()),
            ack_deadline_seconds: Some(30),
            retry_policy: Some(RetryPolicy {
                minimum_backoff: Some("10s".to_string()),
                maximum_backoff: None,
            }),
            ..Default::default()
        };
        late_initialize_subscription(&mut params, &observed);
        assert_eq!(params.expiration_policy.as_ref().unwrap().ttl, "2678400s");
        assert_eq!(
            subscription_update_mask("p", "worker", &params, &observed),
            vec!["ackDeadlineSeconds", "retryPolicy"]
        );
        assert_eq!(
            generate_subscription_observation(&observed).state.as_deref(),
            Some("ACTIVE")
        );
    }
}
