//! Custom Resource Definitions for the GCP provider
//!
//! Every managed resource kind is cluster-scoped and shares the same
//! outline: `spec.forProvider` holds the desired GCP parameters next to the
//! common [`ResourceSpec`] fields, `status.atProvider` holds what was last
//! observed, and `status.conditions` carries `Ready` and `Synced`.

mod cache;
mod common;
mod compute;
mod database;
mod iam;
mod kms;
mod provider_config;
mod pubsub;
mod storage;

use k8s_openapi::apiextensions_apiserver::pkg::apis::apiextensions::v1::CustomResourceDefinition;
use kube::CustomResourceExt;

pub use cache::{
    CloudMemorystoreInstance, CloudMemorystoreInstanceObservation,
    CloudMemorystoreInstanceParameters, CloudMemorystoreInstanceSpec,
    CloudMemorystoreInstanceStatus,
};
pub use common::{
    external_name, external_name_or_name, set_external_name, Condition, DeletionPolicy, Managed,
    ProviderConfigReference, Reference, ResourceSpec, SecretKeySelector, SecretReference,
    Selector, ANNOTATION_EXTERNAL_NAME,
};
pub use compute::{
    network_self_link, Firewall, FirewallLogConfig, FirewallObservation, FirewallParameters,
    FirewallRuleProtocol, FirewallSpec, FirewallStatus, GlobalAddress, GlobalAddressObservation,
    GlobalAddressParameters, GlobalAddressSpec, GlobalAddressStatus, Network, NetworkObservation,
    NetworkParameters, NetworkPeering, NetworkRoutingConfig, NetworkSpec, NetworkStatus,
    Subnetwork, SubnetworkObservation, SubnetworkParameters, SubnetworkSecondaryRange,
    SubnetworkSpec, SubnetworkStatus,
};
pub use database::{
    AclEntry, BackupConfiguration, CloudSQLInstance, CloudSQLInstanceObservation,
    CloudSQLInstanceParameters, CloudSQLInstanceSpec, CloudSQLInstanceStatus, CloudSQLSettings,
    DatabaseFlag, IpConfiguration, IpMapping, LocationPreference, MaintenanceWindow,
};
pub use iam::{
    service_account_member, service_account_name, Binding, Expr, Policy, ServiceAccount,
    ServiceAccountKey, ServiceAccountKeyObservation, ServiceAccountKeyParameters,
    ServiceAccountKeySpec, ServiceAccountKeyStatus, ServiceAccountObservation,
    ServiceAccountParameters, ServiceAccountPolicy, ServiceAccountPolicyParameters,
    ServiceAccountPolicySpec, ServiceAccountPolicyStatus, ServiceAccountSpec,
    ServiceAccountStatus,
};
pub use kms::{
    key_ring_name, CryptoKey, CryptoKeyObservation, CryptoKeyParameters, CryptoKeySpec,
    CryptoKeyStatus, CryptoKeyVersionTemplate, KeyRing, KeyRingObservation, KeyRingParameters,
    KeyRingSpec, KeyRingStatus,
};
pub use provider_config::{
    CredentialsSource, ProviderConfig, ProviderConfigSpec, ProviderConfigStatus,
    ProviderCredentials,
};
pub use pubsub::{
    DeadLetterPolicy, ExpirationPolicy, MessageStoragePolicy, OidcToken, PushConfig, RetryPolicy,
    Subscription, SubscriptionObservation, SubscriptionParameters, SubscriptionSpec,
    SubscriptionStatus, Topic, TopicParameters, TopicSpec, TopicStatus,
};
pub use storage::{
    Bucket, BucketCors, BucketLifecycleAction, BucketLifecycleCondition, BucketLifecycleRule,
    BucketLogging, BucketObservation, BucketParameters, BucketRetentionPolicy, BucketSpec,
    BucketStatus, BucketVersioning, BucketWebsite,
};

/// Every CRD this provider serves, ProviderConfig first.
pub fn all_crds() -> Vec<CustomResourceDefinition> {
    vec![
        ProviderConfig::crd(),
        Network::crd(),
        Subnetwork::crd(),
        Firewall::crd(),
        GlobalAddress::crd(),
        Bucket::crd(),
        ServiceAccount::crd(),
        ServiceAccountKey::crd(),
        ServiceAccountPolicy::crd(),
        CloudSQLInstance::crd(),
        Topic::crd(),
        Subscription::crd(),
        KeyRing::crd(),
        CryptoKey::crd(),
        CloudMemorystoreInstance::crd(),
    ]
}
