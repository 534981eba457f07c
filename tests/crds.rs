use pretty_assertions::assert_eq;
use provider_gcp::all_crds;

#[test]
fn test_every_kind_is_served() {
    let names: Vec<String> = all_crds()
        .into_iter()
        .filter_map(|crd| crd.metadata.name)
        .collect();
    assert_eq!(
        names,
        vec![
            "providerconfigs.gcp.crossplane.io",
            "networks.compute.gcp.crossplane.io",
            "subnetworks.compute.gcp.crossplane.io",
            "firewalls.compute.gcp.crossplane.io",
            "globaladdresses.compute.gcp.crossplane.io",
            "buckets.storage.gcp.crossplane.io",
            "serviceaccounts.iam.gcp.crossplane.io",
            "serviceaccountkeys.iam.gcp.crossplane.io",
            "serviceaccountpolicies.iam.gcp.crossplane.io",
            "cloudsqlinstances.database.gcp.crossplane.io",
            "topics.pubsub.gcp.crossplane.io",
            "subscriptions.pubsub.gcp.crossplane.io",
            "keyrings.kms.gcp.crossplane.io",
            "cryptokeys.kms.gcp.crossplane.io",
            "cloudmemorystoreinstances.cache.gcp.crossplane.io",
        ]
    );
}

#[test]
fn test_crds_are_cluster_scoped() {
    for crd in all_crds() {
        assert_eq!(crd.spec.scope, "Cluster", "{:?}", crd.metadata.name);
        assert_eq!(crd.spec.versions.len(), 1);
        assert!(crd.spec.versions[0].served);
        assert!(crd.spec.versions[0].storage);
    }
}

#[test]
fn test_versions_per_group() {
    let versions: Vec<(String, String)> = all_crds()
        .into_iter()
        .map(|crd| (crd.spec.names.kind, crd.spec.versions[0].name.clone()))
        .filter(|(kind, _)| ["Network", "Bucket", "Topic", "KeyRing"].contains(&kind.as_str()))
        .collect();
    assert_eq!(
        versions,
        vec![
            ("Network".to_string(), "v1beta1".to_string()),
            ("Bucket".to_string(), "v1alpha3".to_string()),
            ("Topic".to_string(), "v1alpha1".to_string()),
            ("KeyRing".to_string(), "v1alpha1".to_string()),
        ]
    );
}

#[test]
fn test_status_subresource_enabled() {
    for crd in all_crds() {
        let subresources = crd.spec.versions[0].subresources.as_ref();
        assert!(
            subresources.and_then(|s| s.status.as_ref()).is_some(),
            "{:?} has no status subresource",
            crd.metadata.name
        );
    }
}
