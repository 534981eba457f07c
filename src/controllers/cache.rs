//! External client for CloudMemorystoreInstance

use crate::clients::cache::{
    generate_redis_instance, generate_redis_observation, late_initialize_redis,
    redis_connection_details, redis_ready_condition, redis_update_mask,
};
use crate::clients::update_mask;
use crate::crd::{external_name_or_name, CloudMemorystoreInstance, Managed};
use crate::error::{ignore_not_found, not_found_as_none, Result};
use crate::gcp::redis;
use crate::managed::{
    ExternalClient, ExternalCreation, ExternalObservation, ExternalUpdate, GcpSession,
};
use async_trait::async_trait;
use tracing::debug;

pub struct CloudMemorystoreInstanceExternal {
    session: GcpSession,
}

impl CloudMemorystoreInstanceExternal {
    pub fn boxed(session: GcpSession) -> Box<dyn ExternalClient<CloudMemorystoreInstance>> {
        Box::new(Self { session })
    }

    fn name(&self, cr: &CloudMemorystoreInstance) -> String {
        redis::instance_name(
            &self.session.project_id,
            &cr.spec.for_provider.region,
            &external_name_or_name(cr),
        )
    }
}

#[async_trait]
impl ExternalClient<CloudMemorystoreInstance> for CloudMemorystoreInstanceExternal {
    async fn observe(&self, cr: &mut CloudMemorystoreInstance) -> Result<ExternalObservation> {
        let url = redis::resource_url(&self.name(cr));
        let Some(observed) = not_found_as_none(self.session.client.get::<redis::Instance>(&url).await)?
        else {
            return Ok(ExternalObservation::absent());
        };

        let before = cr.spec.for_provider.clone();
        late_initialize_redis(&mut cr.spec.for_provider, &observed);
        cr.status.get_or_insert_with(Default::default).at_provider =
            Some(generate_redis_observation(&observed));
        cr.set_condition(redis_ready_condition(observed.state.as_deref()));

        Ok(ExternalObservation {
            resource_exists: true,
            resource_up_to_date: redis_update_mask(&cr.spec.for_provider, &observed).is_empty(),
            resource_late_initialized: before != cr.spec.for_provider,
            connection_details: redis_connection_details(&observed),
        })
    }

    async fn create(&self, cr: &mut CloudMemorystoreInstance) -> Result<ExternalCreation> {
        let mut instance = redis::Instance::default();
        generate_redis_instance(&cr.spec.for_provider, &mut instance);
        let url = redis::create_url(
            &self.session.project_id,
            &cr.spec.for_provider.region,
            &external_name_or_name(cr),
        );
        let _: serde_json::Value = self.session.client.post(&url, &instance).await?;
        Ok(ExternalCreation::default())
    }

    async fn update(&self, cr: &mut CloudMemorystoreInstance) -> Result<ExternalUpdate> {
        let name = self.name(cr);
        let observed: redis::Instance = self.session.client.get(&redis::resource_url(&name)).await?;
        if observed.state.as_deref() != Some(redis::STATE_READY) {
            debug!(instance = %name, state = ?observed.state, "Instance is not ready; skipping update");
            return Ok(ExternalUpdate::default());
        }
        let mask = redis_update_mask(&cr.spec.for_provider, &observed);
        if mask.is_empty() {
            return Ok(ExternalUpdate::default());
        }

        let mut desired = redis::Instance::default();
        generate_redis_instance(&cr.spec.for_provider, &mut desired);
        let _: serde_json::Value = self
            .session
            .client
            .patch(&redis::patch_url(&name, &update_mask(&mask)), &desired)
            .await?;
        Ok(ExternalUpdate::default())
    }

    async fn delete(&self, cr: &mut CloudMemorystoreInstance) -> Result<()> {
        let state = cr
            .status
            .as_ref()
            .and_then(|s| s.at_provider.as_ref())
            .and_then(|o| o.state.as_deref());
        if state == Some(redis::STATE_DELETING) {
            return Ok(());
        }
        let url = redis::resource_url(&self.name(cr));
        ignore_not_found(self.session.client.delete(&url).await)
    }
}
