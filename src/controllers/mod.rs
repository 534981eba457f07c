//! Controllers for the GCP managed resource kinds
//!
//! Each kind gets an [`ExternalClient`] talking to its GCP API; the generic
//! [`Reconciler`] does the rest. [`spawn_all`] starts one controller per kind.

mod cache;
mod compute;
mod database;
mod iam;
mod kms;
mod pubsub;
mod storage;

pub use cache::CloudMemorystoreInstanceExternal;
pub use compute::{FirewallExternal, GlobalAddressExternal, NetworkExternal, SubnetworkExternal};
pub use database::CloudSQLInstanceExternal;
pub use iam::{
    ServiceAccountExternal, ServiceAccountKeyExternal, ServiceAccountPolicyExternal,
    CONNECTION_PRIVATE_KEY, CONNECTION_PUBLIC_KEY,
};
pub use kms::{CryptoKeyExternal, KeyRingExternal};
pub use pubsub::{SubscriptionExternal, TopicExternal};
pub use storage::BucketExternal;

use crate::crd::{
    Bucket, CloudMemorystoreInstance, CloudSQLInstance, CryptoKey, Firewall, GlobalAddress,
    KeyRing, Network, ServiceAccount, ServiceAccountKey, ServiceAccountPolicy, Subnetwork,
    Subscription, Topic,
};
use crate::error::{OperatorError, Result};
use crate::managed::{
    ExternalClient, GcpConnector, GcpSession, Reconciler, ReconcilerOptions, SessionFactory,
};
use crate::reference::ResolveReferences;
use kube::Client;
use std::sync::Arc;
use tokio::task::JoinHandle;
use tracing::error;

/// A running controller and the kind it reconciles.
pub struct ControllerHandle {
    pub kind: String,
    pub handle: JoinHandle<()>,
}

/// Start a controller for every managed kind.
pub fn spawn_all(client: Client, http: reqwest::Client, options: ReconcilerOptions) -> Vec<ControllerHandle> {
    let sessions = Arc::new(SessionFactory::new(client.clone(), http));
    vec![
        spawn::<Network>(&client, &sessions, options, NetworkExternal::boxed),
        spawn::<Subnetwork>(&client, &sessions, options, SubnetworkExternal::boxed),
        spawn::<Firewall>(&client, &sessions, options, FirewallExternal::boxed),
        spawn::<GlobalAddress>(&client, &sessions, options, GlobalAddressExternal::boxed),
        spawn::<Bucket>(&client, &sessions, options, BucketExternal::boxed),
        spawn::<ServiceAccount>(&client, &sessions, options, ServiceAccountExternal::boxed),
        spawn::<ServiceAccountKey>(&client, &sessions, options, ServiceAccountKeyExternal::boxed),
        spawn::<ServiceAccountPolicy>(&client, &sessions, options, ServiceAccountPolicyExternal::boxed),
        spawn::<CloudSQLInstance>(&client, &sessions, options, CloudSQLInstanceExternal::boxed),
        spawn::<Topic>(&client, &sessions, options, TopicExternal::boxed),
        spawn::<Subscription>(&client, &sessions, options, SubscriptionExternal::boxed),
        spawn::<KeyRing>(&client, &sessions, options, KeyRingExternal::boxed),
        spawn::<CryptoKey>(&client, &sessions, options, CryptoKeyExternal::boxed),
        spawn::<CloudMemorystoreInstance>(
            &client,
            &sessions,
            options,
            CloudMemorystoreInstanceExternal::boxed,
        ),
    ]
}

fn spawn<K: ResolveReferences>(
    client: &Client,
    sessions: &Arc<SessionFactory>,
    options: ReconcilerOptions,
    build: fn(GcpSession) -> Box<dyn ExternalClient<K>>,
) -> ControllerHandle {
    let kind = K::kind(&()).to_string();
    let connector = GcpConnector::<K>::new(Arc::clone(sessions), build);
    let reconciler = Arc::new(Reconciler::new(client.clone(), Box::new(connector), options));

    let task_kind = kind.clone();
    let handle = tokio::spawn(async move {
        if let Err(e) = reconciler.run().await {
            error!(kind = %task_kind, "Controller error: {}", e);
        }
    });
    ControllerHandle { kind, handle }
}

/// A spec field that must be set, usually by reference resolution, before
/// the external resource can be addressed.
pub(crate) fn required<'a>(value: &'a Option<String>, field: &str) -> Result<&'a str> {
    value
        .as_deref()
        .filter(|v| !v.is_empty())
        .ok_or_else(|| OperatorError::InvalidState(format!("spec.forProvider.{} is not set", field)))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_required() {
        let set = Some("projects/p/locations/global/keyRings/r".to_string());
        assert_eq!(required(&set, "keyRing").unwrap(), "projects/p/locations/global/keyRings/r");

        let err = required(&None, "keyRing").unwrap_err();
        assert_eq!(err.to_string(), "Invalid state: spec.forProvider.keyRing is not set");
        assert!(required(&Some(String::new()), "topic").is_err());
    }
}
