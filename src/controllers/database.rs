//! External client for CloudSQLInstance

use crate::clients::database::{
    cloudsql_connection_details, cloudsql_ready_condition, default_username,
    generate_cloudsql_observation, generate_database_instance, generate_password,
    is_cloudsql_up_to_date, late_initialize_cloudsql, CONNECTION_PASSWORD, CONNECTION_USERNAME,
};
use crate::crd::{external_name_or_name, CloudSQLInstance, Managed};
use crate::error::{ignore_not_found, not_found_as_none, Result};
use crate::gcp::sqladmin;
use crate::managed::{
    ConnectionDetails, ExternalClient, ExternalCreation, ExternalObservation, ExternalUpdate,
    GcpSession,
};
use async_trait::async_trait;
use tracing::{debug, info};

pub struct CloudSQLInstanceExternal {
    session: GcpSession,
}

impl CloudSQLInstanceExternal {
    pub fn boxed(session: GcpSession) -> Box<dyn ExternalClient<CloudSQLInstance>> {
        Box::new(Self { session })
    }

    fn url(&self, cr: &CloudSQLInstance) -> String {
        sqladmin::instance_url(&self.session.project_id, &external_name_or_name(cr))
    }
}

#[async_trait]
impl ExternalClient<CloudSQLInstance> for CloudSQLInstanceExternal {
    async fn observe(&self, cr: &mut CloudSQLInstance) -> Result<ExternalObservation> {
        let name = external_name_or_name(cr);
        let Some(observed) = not_found_as_none(
            self.session
                .client
                .get::<sqladmin::DatabaseInstance>(&self.url(cr))
                .await,
        )?
        else {
            return Ok(ExternalObservation::absent());
        };

        let before = cr.spec.for_provider.clone();
        late_initialize_cloudsql(&mut cr.spec.for_provider, &observed);
        cr.status.get_or_insert_with(Default::default).at_provider =
            Some(generate_cloudsql_observation(&observed));
        cr.set_condition(cloudsql_ready_condition(observed.state.as_deref()));

        let mut connection_details = cloudsql_connection_details(&observed);
        connection_details.insert(
            CONNECTION_USERNAME.to_string(),
            default_username(cr.spec.for_provider.database_version.as_deref())
                .as_bytes()
                .to_vec(),
        );

        Ok(ExternalObservation {
            resource_exists: true,
            resource_up_to_date: is_cloudsql_up_to_date(&name, &cr.spec.for_provider, &observed),
            resource_late_initialized: before != cr.spec.for_provider,
            connection_details,
        })
    }

    async fn create(&self, cr: &mut CloudSQLInstance) -> Result<ExternalCreation> {
        let name = external_name_or_name(cr);
        let password = generate_password();
        let mut instance = sqladmin::DatabaseInstance {
            root_password: Some(password.clone()),
            ..Default::default()
        };
        generate_database_instance(&name, &cr.spec.for_provider, &mut instance);

        let _: serde_json::Value = self
            .session
            .client
            .post(&sqladmin::instances_url(&self.session.project_id), &instance)
            .await?;
        info!(instance = %name, "Requested CloudSQL instance");

        let mut connection_details = ConnectionDetails::new();
        connection_details.insert(CONNECTION_PASSWORD.to_string(), password.into_bytes());
        connection_details.insert(
            CONNECTION_USERNAME.to_string(),
            default_username(cr.spec.for_provider.database_version.as_deref())
                .as_bytes()
                .to_vec(),
        );
        Ok(ExternalCreation {
            external_name_assigned: None,
            connection_details,
        })
    }

    async fn update(&self, cr: &mut CloudSQLInstance) -> Result<ExternalUpdate> {
        let name = external_name_or_name(cr);
        let observed: sqladmin::DatabaseInstance = self.session.client.get(&self.url(cr)).await?;
        if observed.state.as_deref() == Some(sqladmin::STATE_PENDING_CREATE) {
            debug!(instance = %name, "Instance is still being created; skipping update");
            return Ok(ExternalUpdate::default());
        }

        let mut desired = sqladmin::DatabaseInstance::default();
        generate_database_instance(&name, &cr.spec.for_provider, &mut desired);
        // Settings updates are rejected unless they carry the current version.
        if let Some(settings) = desired.settings.as_mut() {
            settings.settings_version = observed
                .settings
                .as_ref()
                .and_then(|s| s.settings_version.clone());
        }
        let _: serde_json::Value = self.session.client.patch(&self.url(cr), &desired).await?;
        Ok(ExternalUpdate::default())
    }

    async fn delete(&self, cr: &mut CloudSQLInstance) -> Result<()> {
        ignore_not_found(self.session.client.delete(&self.url(cr)).await)
    }
}
