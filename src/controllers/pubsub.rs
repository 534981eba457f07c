//! External clients for Topic and Subscription

use super::required;
use crate::clients::pubsub::{
    generate_subscription, generate_subscription_observation, generate_topic,
    late_initialize_subscription, late_initialize_topic, subscription_update_mask,
    topic_update_mask,
};
use crate::clients::update_mask;
use crate::conditions;
use crate::crd::{external_name_or_name, Managed, Subscription, Topic};
use crate::error::{ignore_not_found, not_found_as_none, Result};
use crate::gcp::pubsub;
use crate::managed::{
    ExternalClient, ExternalCreation, ExternalObservation, ExternalUpdate, GcpSession,
};
use async_trait::async_trait;

// ---------------------------------------------------------------------------
// Topic
// ---------------------------------------------------------------------------

pub struct TopicExternal {
    session: GcpSession,
}

impl TopicExternal {
    pub fn boxed(session: GcpSession) -> Box<dyn ExternalClient<Topic>> {
        Box::new(Self { session })
    }

    fn url(&self, cr: &Topic) -> String {
        pubsub::resource_url(&pubsub::topic_name(
            &self.session.project_id,
            &external_name_or_name(cr),
        ))
    }
}

#[async_trait]
impl ExternalClient<Topic> for TopicExternal {
    async fn observe(&self, cr: &mut Topic) -> Result<ExternalObservation> {
        let name = external_name_or_name(cr);
        let Some(observed) =
            not_found_as_none(self.session.client.get::<pubsub::Topic>(&self.url(cr)).await)?
        else {
            return Ok(ExternalObservation::absent());
        };

        let before = cr.spec.for_provider.clone();
        late_initialize_topic(&mut cr.spec.for_provider, &observed);
        cr.set_condition(conditions::available());

        Ok(ExternalObservation {
            resource_exists: true,
            resource_up_to_date: topic_update_mask(
                &self.session.project_id,
                &name,
                &cr.spec.for_provider,
                &observed,
            )
            .is_empty(),
            resource_late_initialized: before != cr.spec.for_provider,
            ..Default::default()
        })
    }

    async fn create(&self, cr: &mut Topic) -> Result<ExternalCreation> {
        let mut topic = pubsub::Topic::default();
        generate_topic(
            &self.session.project_id,
            &external_name_or_name(cr),
            &cr.spec.for_provider,
            &mut topic,
        );
        let _: pubsub::Topic = self.session.client.put(&self.url(cr), &topic).await?;
        Ok(ExternalCreation::default())
    }

    async fn update(&self, cr: &mut Topic) -> Result<ExternalUpdate> {
        let name = external_name_or_name(cr);
        let project = &self.session.project_id;
        let observed: pubsub::Topic = self.session.client.get(&self.url(cr)).await?;
        let mask = topic_update_mask(project, &name, &cr.spec.for_provider, &observed);
        if mask.is_empty() {
            return Ok(ExternalUpdate::default());
        }

        let mut topic = pubsub::Topic::default();
        generate_topic(project, &name, &cr.spec.for_provider, &mut topic);
        let request = pubsub::UpdateTopicRequest {
            topic,
            update_mask: update_mask(&mask),
        };
        let _: pubsub::Topic = self.session.client.patch(&self.url(cr), &request).await?;
        Ok(ExternalUpdate::default())
    }

    async fn delete(&self, cr: &mut Topic) -> Result<()> {
        ignore_not_found(self.session.client.delete(&self.url(cr)).await)
    }
}

// ---------------------------------------------------------------------------
// Subscription
// ---------------------------------------------------------------------------

pub struct SubscriptionExternal {
    session: GcpSession,
}

impl SubscriptionExternal {
    pub fn boxed(session: GcpSession) -> Box<dyn ExternalClient<Subscription>> {
        Box::new(Self { session })
    }

    fn url(&self, cr: &Subscription) -> String {
        pubsub::resource_url(&pubsub::subscription_name(
            &self.session.project_id,
            &external_name_or_name(cr),
        ))
    }
}

#[async_trait]
impl ExternalClient<Subscription> for SubscriptionExternal {
    async fn observe(&self, cr: &mut Subscription) -> Result<ExternalObservation> {
        let name = external_name_or_name(cr);
        let Some(observed) =
            not_found_as_none(self.session.client.get::<pubsub::Subscription>(&self.url(cr)).await)?
        else {
            return Ok(ExternalObservation::absent());
        };

        let before = cr.spec.for_provider.clone();
        late_initialize_subscription(&mut cr.spec.for_provider, &observed);
        cr.status.get_or_insert_with(Default::default).at_provider =
            Some(generate_subscription_observation(&observed));
        cr.set_condition(conditions::available());

        Ok(ExternalObservation {
            resource_exists: true,
            resource_up_to_date: subscription_update_mask(
                &self.session.project_id,
                &name,
                &cr.spec.for_provider,
                &observed,
            )
            .is_empty(),
            resource_late_initialized: before != cr.spec.for_provider,
            ..Default::default()
        })
    }

    async fn create(&self, cr: &mut Subscription) -> Result<ExternalCreation> {
        required(&cr.spec.for_provider.topic, "topic")?;
        let mut subscription = pubsub::Subscription::default();
        generate_subscription(
            &self.session.project_id,
            &external_name_or_name(cr),
            &cr.spec.for_provider,
            &mut subscription,
        );
        let _: pubsub::Subscription = self
            .session
            .client
            .put(&self.url(cr), &subscription)
            .await?;
        Ok(ExternalCreation::default())
    }

    async fn update(&self, cr: &mut Subscription) -> Result<ExternalUpdate> {
        let name = external_name_or_name(cr);
        let project = &self.session.project_id;
        let observed: pubsub::Subscription = self.session.client.get(&self.url(cr)).await?;
        let mask = subscription_update_mask(project, &name, &cr.spec.for_provider, &observed);
        if mask.is_empty() {
            return Ok(ExternalUpdate::default());
        }

        let mut subscription = pubsub::Subscription::default();
        generate_subscription(project, &name, &cr.spec.for_provider, &mut subscription);
        let request = pubsub::UpdateSubscriptionRequest {
            subscription,
            update_mask: update_mask(&mask),
        };
        let _: pubsub::Subscription = self.session.client.patch(&self.url(cr), &request).await?;
        Ok(ExternalUpdate::default())
    }

    async fn delete(&self, cr: &mut Subscription) -> Result<()> {
        ignore_not_found(self.session.client.delete(&self.url(cr)).await)
    }
}
