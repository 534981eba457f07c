//! External client for Bucket

use crate::clients::storage::{
    generate_bucket, generate_bucket_observation, is_bucket_up_to_date, late_initialize_bucket,
};
use crate::conditions;
use crate::crd::{external_name_or_name, Bucket, Managed};
use crate::error::{ignore_not_found, not_found_as_none, Result};
use crate::gcp::storage;
use crate::managed::{
    ExternalClient, ExternalCreation, ExternalObservation, ExternalUpdate, GcpSession,
};
use async_trait::async_trait;

pub struct BucketExternal {
    session: GcpSession,
}

impl BucketExternal {
    pub fn boxed(session: GcpSession) -> Box<dyn ExternalClient<Bucket>> {
        Box::new(Self { session })
    }
}

#[async_trait]
impl ExternalClient<Bucket> for BucketExternal {
    async fn observe(&self, cr: &mut Bucket) -> Result<ExternalObservation> {
        let name = external_name_or_name(cr);
        let url = storage::bucket_url(&name);
        let Some(observed) = not_found_as_none(self.session.client.get::<storage::Bucket>(&url).await)?
        else {
            return Ok(ExternalObservation::absent());
        };

        let before = cr.spec.for_provider.clone();
        late_initialize_bucket(&mut cr.spec.for_provider, &observed);
        cr.status.get_or_insert_with(Default::default).at_provider =
            Some(generate_bucket_observation(&observed));
        cr.set_condition(conditions::available());

        Ok(ExternalObservation {
            resource_exists: true,
            resource_up_to_date: is_bucket_up_to_date(&name, &cr.spec.for_provider, &observed),
            resource_late_initialized: before != cr.spec.for_provider,
            ..Default::default()
        })
    }

    async fn create(&self, cr: &mut Bucket) -> Result<ExternalCreation> {
        let mut bucket = storage::Bucket::default();
        generate_bucket(&external_name_or_name(cr), &cr.spec.for_provider, &mut bucket);
        let _: storage::Bucket = self
            .session
            .client
            .post(&storage::buckets_url(&self.session.project_id), &bucket)
            .await?;
        Ok(ExternalCreation::default())
    }

    async fn update(&self, cr: &mut Bucket) -> Result<ExternalUpdate> {
        let name = external_name_or_name(cr);
        let mut desired = storage::Bucket::default();
        generate_bucket(&name, &cr.spec.for_provider, &mut desired);
        // Immutable; an empty location is left out of the patch body.
        desired.location.clear();
        let _: storage::Bucket = self
            .session
            .client
            .patch(&storage::bucket_url(&name), &desired)
            .await?;
        Ok(ExternalUpdate::default())
    }

    async fn delete(&self, cr: &mut Bucket) -> Result<()> {
        let url = storage::bucket_url(&external_name_or_name(cr));
        ignore_not_found(self.session.client.delete(&url).await)
    }
}
