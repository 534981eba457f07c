//! Connection secret publishing

use super::ConnectionDetails;
use crate::crd::{Managed, SecretReference};
use crate::error::{OperatorError, Result};
use k8s_openapi::api::core::v1::Secret;
use k8s_openapi::apimachinery::pkg::apis::meta::v1::{ObjectMeta, OwnerReference};
use k8s_openapi::ByteString;
use kube::api::{Api, DeleteParams, Patch, PatchParams, PostParams};
use kube::{Client, Resource, ResourceExt};
use std::collections::BTreeMap;
use tracing::{debug, info};

const MANAGED_BY: &str = "provider-gcp";
const SECRET_TYPE: &str = "connection.crossplane.io/v1alpha1";

/// Writes connection details to the Secret named by a resource's
/// `writeConnectionSecretToRef`. The Secret is controlled by the managed
/// resource, so Kubernetes garbage collects it with its owner.
#[derive(Clone)]
pub struct ConnectionPublisher {
    client: Client,
}

impl ConnectionPublisher {
    pub fn new(client: Client) -> Self {
        Self { client }
    }

    /// Create the Secret, or merge `details` into an existing one. Keys
    /// already present and absent from `details` are kept, so values only
    /// known at creation time survive later observations.
    pub async fn publish<K: Managed>(&self, cr: &K, details: &ConnectionDetails) -> Result<()> {
        let Some(target) = cr.resource_spec().write_connection_secret_to_ref.as_ref() else {
            return Ok(());
        };
        let secrets: Api<Secret> = Api::namespaced(self.client.clone(), &target.namespace);

        match secrets.get_opt(&target.name).await? {
            None => {
                let secret = connection_secret(cr, target, details);
                secrets.create(&PostParams::default(), &secret).await?;
                info!(
                    secret = %target.name,
                    namespace = %target.namespace,
                    resource = %cr.name_any(),
                    "Created connection secret"
                );
            }
            Some(existing) => {
                let uid = cr.uid().unwrap_or_default();
                if !is_controllable_by(&existing, &uid) {
                    return Err(OperatorError::InvalidState(format!(
                        "connection secret {}/{} is controlled by another resource",
                        target.namespace, target.name
                    )));
                }
                let Some(patch) = update_patch(cr, &existing, details) else {
                    return Ok(());
                };
                secrets
                    .patch(&target.name, &PatchParams::default(), &Patch::Merge(&patch))
                    .await?;
                debug!(secret = %target.name, keys = details.len(), "Updated connection secret");
            }
        }
        Ok(())
    }

    /// Delete the connection Secret if this resource controls it.
    pub async fn unpublish<K: Managed>(&self, cr: &K) -> Result<()> {
        let Some(target) = cr.resource_spec().write_connection_secret_to_ref.as_ref() else {
            return Ok(());
        };
        let secrets: Api<Secret> = Api::namespaced(self.client.clone(), &target.namespace);
        let Some(existing) = secrets.get_opt(&target.name).await? else {
            return Ok(());
        };
        if !is_controllable_by(&existing, &cr.uid().unwrap_or_default()) {
            return Ok(());
        }
        match secrets.delete(&target.name, &DeleteParams::default()).await {
            Ok(_) => {
                info!(secret = %target.name, namespace = %target.namespace, "Deleted connection secret");
                Ok(())
            }
            Err(kube::Error::Api(e)) if e.code == 404 => Ok(()),
            Err(e) => Err(e.into()),
        }
    }
}

fn controller_ref<K: Managed>(cr: &K) -> OwnerReference {
    OwnerReference {
        api_version: K::api_version(&()).to_string(),
        kind: K::kind(&()).to_string(),
        name: cr.name_any(),
        uid: cr.uid().unwrap_or_default(),
        controller: Some(true),
        block_owner_deletion: Some(true),
    }
}

/// Merge patch writing `details` into an existing Secret. A Secret without
/// a controller is adopted by adding `cr` as its controller. `None` when
/// there is nothing to change.
pub(crate) fn update_patch<K: Managed>(
    cr: &K,
    existing: &Secret,
    details: &ConnectionDetails,
) -> Option<serde_json::Value> {
    let owners = existing.metadata.owner_references.as_deref().unwrap_or_default();
    let adopt = !owners.iter().any(|o| o.controller == Some(true));
    if details.is_empty() && !adopt {
        return None;
    }

    let mut patch = serde_json::json!({});
    if !details.is_empty() {
        let data: BTreeMap<&String, ByteString> = details
            .iter()
            .map(|(k, v)| (k, ByteString(v.clone())))
            .collect();
        patch["data"] = serde_json::json!(data);
    }
    if adopt {
        // Merge patches replace lists, so the existing owners are carried over.
        let mut refs = owners.to_vec();
        refs.push(controller_ref(cr));
        patch["metadata"] = serde_json::json!({ "ownerReferences": refs });
    }
    Some(patch)
}

/// Secret holding `details`, controlled by `cr`.
pub(crate) fn connection_secret<K: Managed>(
    cr: &K,
    target: &SecretReference,
    details: &ConnectionDetails,
) -> Secret {
    let owner_ref = controller_ref(cr);

    let mut labels = BTreeMap::new();
    labels.insert(
        "app.kubernetes.io/managed-by".to_string(),
        MANAGED_BY.to_string(),
    );

    Secret {
        metadata: ObjectMeta {
            name: Some(target.name.clone()),
            namespace: Some(target.namespace.clone()),
            owner_references: Some(vec![owner_ref]),
            labels: Some(labels),
            ..Default::default()
        },
        type_: Some(SECRET_TYPE.to_string()),
        data: Some(
            details
                .iter()
                .map(|(k, v)| (k.clone(), ByteString(v.clone())))
                .collect(),
        ),
        ..Default::default()
    }
}

/// A Secret without a controller may be adopted; one with a controller
/// only by that controller.
pub(crate) fn is_controllable_by(secret: &Secret, uid: &str) -> bool {
    match secret
        .metadata
        .owner_references
        .as_deref()
        .unwrap_or_default()
        .iter()
        .find(|o| o.controller == Some(true))
    {
        Some(owner) => owner.uid == uid,
        None => true,
    }
}
