//! Cross-resource reference resolution
//!
//! A managed resource may point at another one instead of spelling out a
//! value, e.g. a Subnetwork naming a Network through `networkRef` rather
//! than carrying the network's self-link. Resolution looks the referenced
//! resource up and copies the wanted value from its status into the spec.

use crate::crd::{external_name, Managed, Reference, Selector};
use crate::error::{OperatorError, Result};
use kube::api::{Api, ListParams};
use kube::{Client, Resource, ResourceExt};
use std::collections::BTreeMap;
use tracing::debug;

/// Implemented by every managed kind. Kinds without reference fields keep
/// the default no-op.
#[async_trait::async_trait]
pub trait ResolveReferences: Managed {
    async fn resolve_references(&mut self, _resolver: &Resolver) -> Result<()> {
        Ok(())
    }
}

/// One field to resolve: its current value and how to find the referenced
/// resource.
#[derive(Debug, Clone, Copy, Default)]
pub struct ResolutionRequest<'a> {
    pub current_value: Option<&'a str>,
    pub reference: Option<&'a Reference>,
    pub selector: Option<&'a Selector>,
}

/// How a request is answered.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Lookup<'a> {
    /// Keep the current value and reference.
    Unchanged,
    /// Follow an explicit reference.
    Get(&'a Reference),
    /// Pick a resource by labels.
    Select(&'a Selector),
}

impl<'a> ResolutionRequest<'a> {
    /// An explicit reference is always followed. Otherwise a set value wins,
    /// and without a selector there is nothing to resolve.
    pub fn is_noop(&self) -> bool {
        self.lookup() == Lookup::Unchanged
    }

    /// A reference wins over a selector.
    pub fn lookup(&self) -> Lookup<'a> {
        if let Some(reference) = self.reference {
            return Lookup::Get(reference);
        }
        if self.current_value.is_some_and(|v| !v.is_empty()) {
            return Lookup::Unchanged;
        }
        match self.selector {
            Some(selector) => Lookup::Select(selector),
            None => Lookup::Unchanged,
        }
    }
}

/// Result of resolving a single field
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct ResolutionResponse {
    pub resolved_value: Option<String>,
    pub resolved_reference: Option<Reference>,
}

impl ResolutionResponse {
    fn unchanged(req: &ResolutionRequest<'_>) -> Self {
        Self {
            resolved_value: req.current_value.map(str::to_string),
            resolved_reference: req.reference.cloned(),
        }
    }
}

/// A list field to resolve, e.g. IAM members named through references.
#[derive(Debug, Clone, Copy, Default)]
pub struct MultiResolutionRequest<'a> {
    pub current_values: &'a [String],
    pub references: &'a [Reference],
    pub selector: Option<&'a Selector>,
}

/// How a list request is answered.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MultiLookup<'a> {
    Unchanged,
    GetAll(&'a [Reference]),
    /// Every matching resource contributes a value.
    Select(&'a Selector),
}

impl<'a> MultiResolutionRequest<'a> {
    /// References win over a selector. A selector only fills an empty list.
    pub fn lookup(&self) -> MultiLookup<'a> {
        if !self.references.is_empty() {
            return MultiLookup::GetAll(self.references);
        }
        match self.selector {
            Some(selector) if self.current_values.is_empty() => MultiLookup::Select(selector),
            _ => MultiLookup::Unchanged,
        }
    }
}

/// Resolved values replace the current ones; references are rewritten to
/// name every resource the values came from.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct MultiResolutionResponse {
    pub resolved_values: Vec<String>,
    pub resolved_references: Vec<Reference>,
}

impl MultiResolutionResponse {
    fn unchanged(req: &MultiResolutionRequest<'_>) -> Self {
        Self {
            resolved_values: req.current_values.to_vec(),
            resolved_references: req.references.to_vec(),
        }
    }
}

/// Looks up referenced managed resources through the Kubernetes API.
#[derive(Clone)]
pub struct Resolver {
    client: Client,
}

impl Resolver {
    pub fn new(client: Client) -> Self {
        Self { client }
    }

    /// Resolve one field of `from` against managed resources of kind `T`.
    pub async fn resolve<M, T>(
        &self,
        from: &M,
        req: ResolutionRequest<'_>,
        extract: fn(&T) -> Option<String>,
    ) -> Result<ResolutionResponse>
    where
        M: Resource + Sync,
        T: Managed,
    {
        let api: Api<T> = Api::all(self.client.clone());
        match req.lookup() {
            Lookup::Unchanged => Ok(ResolutionResponse::unchanged(&req)),
            Lookup::Get(reference) => {
                let target = api.get(&reference.name).await?;
                resolved_from(&target, extract)
            }
            Lookup::Select(selector) => {
                let candidates = self.candidates(&api, selector).await?;
                let controller = controller_uid(from);
                let target = select_candidate(&candidates, selector, controller.as_deref())
                    .ok_or_else(|| {
                        OperatorError::Reference(format!(
                            "no {} matched the selector",
                            T::kind(&())
                        ))
                    })?;
                debug!(
                    kind = %T::kind(&()),
                    selected = %target.name_any(),
                    "Selected reference target"
                );
                resolved_from(target, extract)
            }
        }
    }

    /// Resolve a list field. The resolved values replace the current ones.
    pub async fn resolve_multiple<M, T>(
        &self,
        from: &M,
        req: MultiResolutionRequest<'_>,
        extract: fn(&T) -> Option<String>,
    ) -> Result<MultiResolutionResponse>
    where
        M: Resource + Sync,
        T: Managed,
    {
        let api: Api<T> = Api::all(self.client.clone());
        match req.lookup() {
            MultiLookup::Unchanged => Ok(MultiResolutionResponse::unchanged(&req)),
            MultiLookup::GetAll(references) => {
                let mut targets = Vec::with_capacity(references.len());
                for reference in references {
                    targets.push(api.get(&reference.name).await?);
                }
                resolved_from_all(&targets.iter().collect::<Vec<_>>(), extract)
            }
            MultiLookup::Select(selector) => {
                let candidates = self.candidates(&api, selector).await?;
                let controller = controller_uid(from);
                let targets = select_candidates(&candidates, selector, controller.as_deref());
                if targets.is_empty() {
                    return Err(OperatorError::Reference(format!(
                        "no {} matched the selector",
                        T::kind(&())
                    )));
                }
                resolved_from_all(&targets, extract)
            }
        }
    }

    async fn candidates<T: Managed>(&self, api: &Api<T>, selector: &Selector) -> Result<Vec<T>> {
        let mut params = ListParams::default();
        if !selector.match_labels.is_empty() {
            params = params.labels(&label_selector(&selector.match_labels));
        }
        Ok(api.list(&params).await?.items)
    }
}

/// Value extracted from `target`, with `target` written back as the
/// reference. An empty value is an error.
pub fn resolved_from<T: Managed>(target: &T, extract: fn(&T) -> Option<String>) -> Result<ResolutionResponse> {
    let value = extract(target).filter(|v| !v.is_empty()).ok_or_else(|| {
        OperatorError::Reference(format!(
            "referenced field was empty (referenced {} {} may not yet be ready)",
            T::kind(&()),
            target.name_any()
        ))
    })?;
    Ok(ResolutionResponse {
        resolved_value: Some(value),
        resolved_reference: Some(Reference {
            name: target.name_any(),
        }),
    })
}

fn resolved_from_all<T: Managed>(targets: &[&T], extract: fn(&T) -> Option<String>) -> Result<MultiResolutionResponse> {
    let mut rsp = MultiResolutionResponse::default();
    for target in targets {
        let one = resolved_from(*target, extract)?;
        rsp.resolved_values.extend(one.resolved_value);
        rsp.resolved_references.extend(one.resolved_reference);
    }
    Ok(rsp)
}

/// Render match labels as a Kubernetes label selector string.
pub fn label_selector(labels: &BTreeMap<String, String>) -> String {
    labels
        .iter()
        .map(|(k, v)| format!("{}={}", k, v))
        .collect::<Vec<_>>()
        .join(",")
}

/// UID of the controlling owner of a resource, if any.
pub fn controller_uid<M: Resource>(obj: &M) -> Option<String> {
    obj.meta()
        .owner_references
        .as_ref()?
        .iter()
        .find(|o| o.controller == Some(true))
        .map(|o| o.uid.clone())
}

/// First candidate satisfying the selector.
pub fn select_candidate<'a, T: Resource>(
    candidates: &'a [T],
    selector: &Selector,
    controller: Option<&str>,
) -> Option<&'a T> {
    candidates.iter().find(|c| selects(selector, *c, controller))
}

/// Every candidate satisfying the selector.
pub fn select_candidates<'a, T: Resource>(
    candidates: &'a [T],
    selector: &Selector,
    controller: Option<&str>,
) -> Vec<&'a T> {
    candidates
        .iter()
        .filter(|c| selects(selector, *c, controller))
        .collect()
}

fn selects<T: Resource>(selector: &Selector, candidate: &T, controller: Option<&str>) -> bool {
    let labels = candidate.meta().labels.as_ref();
    let labels_match = selector
        .match_labels
        .iter()
        .all(|(k, v)| labels.and_then(|l| l.get(k)) == Some(v));
    let controller_match = match selector.match_controller_ref {
        Some(true) => controller.is_some() && controller_uid(candidate).as_deref() == controller,
        _ => true,
    };
    labels_match && controller_match
}

/// Extractor yielding a managed resource's external name.
pub fn external_name_of<T: Managed>(obj: &T) -> Option<String> {
    external_name(obj).map(str::to_string)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::crd::{
        network_self_link, Network, NetworkObservation, NetworkParameters, NetworkSpec,
        NetworkStatus, ResourceSpec,
    };
    use crate::testing;
    use k8s_openapi::apimachinery::pkg::apis::meta::v1::OwnerReference;
    use serde_json::json;

    fn network(name: &str, labels: &[(&str, &str)], controller: Option<&str>) -> Network {
        let mut n = Network::new(
            name,
            NetworkSpec {
                resource_spec: ResourceSpec::default(),
                for_provider: NetworkParameters::default(),
            },
        );
        n.metadata.labels = Some(
            labels
                .iter()
                .map(|(k, v)| (k.to_string(), v.to_string()))
                .collect(),
        );
        if let Some(uid) = controller {
            n.metadata.owner_references = Some(vec![OwnerReference {
                api_version: "example.org/v1".to_string(),
                kind: "Composite".to_string(),
                name: "parent".to_string(),
                uid: uid.to_string(),
                controller: Some(true),
                block_owner_deletion: None,
            }]);
        }
        n
    }

    fn ready(mut n: Network, self_link: &str) -> Network {
        n.status = Some(NetworkStatus {
            conditions: vec![],
            at_provider: Some(NetworkObservation {
                self_link: Some(self_link.to_string()),
                ..Default::default()
            }),
        });
        n
    }

    #[test]
    fn test_noop_when_value_set_without_reference() {
        let selector = Selector::default();
        let req = ResolutionRequest {
            current_value: Some("https://self-link"),
            reference: None,
            selector: Some(&selector),
        };
        assert!(req.is_noop());
    }

    #[test]
    fn test_noop_when_nothing_to_resolve() {
        assert!(ResolutionRequest::default().is_noop());
        let empty = ResolutionRequest {
            current_value: Some(""),
            ..Default::default()
        };
        assert!(empty.is_noop());
    }

    #[test]
    fn test_reference_always_resolves() {
        let reference = Reference {
            name: "net".to_string(),
        };
        let req = ResolutionRequest {
            current_value: Some("stale"),
            reference: Some(&reference),
            selector: None,
        };
        assert!(!req.is_noop());
    }

    #[test]
    fn test_selector_resolves_when_value_empty() {
        let selector = Selector::default();
        let req = ResolutionRequest {
            current_value: None,
            reference: None,
            selector: Some(&selector),
        };
        assert!(!req.is_noop());
    }

    #[test]
    fn test_label_selector_rendering() {
        let mut labels = BTreeMap::new();
        labels.insert("env".to_string(), "prod".to_string());
        labels.insert("app".to_string(), "db".to_string());
        assert_eq!(label_selector(&labels), "app=db,env=prod");
    }

    #[test]
    fn test_select_candidate_by_labels() {
        let candidates = vec![
            network("a", &[("env", "dev")], None),
            network("b", &[("env", "prod")], None),
        ];
        let selector = Selector {
            match_labels: [("env".to_string(), "prod".to_string())].into(),
            match_controller_ref: None,
        };
        let chosen = select_candidate(&candidates, &selector, None).unwrap();
        assert_eq!(chosen.name_any(), "b");
    }

    #[test]
    fn test_select_candidate_requires_same_controller() {
        let candidates = vec![
            network("a", &[], Some("other")),
            network("b", &[], Some("mine")),
        ];
        let selector = Selector {
            match_labels: BTreeMap::new(),
            match_controller_ref: Some(true),
        };
        let chosen = select_candidate(&candidates, &selector, Some("mine")).unwrap();
        assert_eq!(chosen.name_any(), "b");
        assert!(select_candidate(&candidates, &selector, None).is_none());
    }

    #[test]
    fn test_controller_uid() {
        let n = network("a", &[], Some("uid-1"));
        assert_eq!(controller_uid(&n).as_deref(), Some("uid-1"));
        assert_eq!(controller_uid(&network("b", &[], None)), None);
    }

    #[test]
    fn test_reference_wins_over_selector() {
        let reference = Reference {
            name: "net".to_string(),
        };
        let selector = Selector::default();
        let req = ResolutionRequest {
            current_value: None,
            reference: Some(&reference),
            selector: Some(&selector),
        };
        assert_eq!(req.lookup(), Lookup::Get(&reference));

        let refs = vec![reference.clone()];
        let multi = MultiResolutionRequest {
            current_values: &[],
            references: &refs,
            selector: Some(&selector),
        };
        assert_eq!(multi.lookup(), MultiLookup::GetAll(&refs));
    }

    #[test]
    fn test_multi_selector_only_fills_empty_list() {
        let selector = Selector::default();
        let set = vec!["serviceAccount:a@p.iam.gserviceaccount.com".to_string()];
        let req = MultiResolutionRequest {
            current_values: &set,
            references: &[],
            selector: Some(&selector),
        };
        assert_eq!(req.lookup(), MultiLookup::Unchanged);
        let empty = MultiResolutionRequest {
            current_values: &[],
            ..req
        };
        assert_eq!(empty.lookup(), MultiLookup::Select(&selector));
        assert_eq!(MultiResolutionRequest::default().lookup(), MultiLookup::Unchanged);
    }

    #[test]
    fn test_empty_referenced_field_is_an_error() {
        let err = resolved_from(&network("net", &[], None), network_self_link).unwrap_err();
        assert!(
            err.to_string().contains("referenced field was empty"),
            "unexpected error: {}",
            err
        );
        assert!(err.to_string().contains("Network net"));
    }

    #[test]
    fn test_resolved_from_writes_back_reference() {
        let target = ready(network("net-b", &[], None), "https://compute/net-b");
        let rsp = resolved_from(&target, network_self_link).unwrap();
        assert_eq!(rsp.resolved_value.as_deref(), Some("https://compute/net-b"));
        assert_eq!(
            rsp.resolved_reference,
            Some(Reference {
                name: "net-b".to_string()
            })
        );
    }

    #[test]
    fn test_select_candidates_returns_every_match() {
        let candidates = vec![
            network("a", &[("team", "data")], None),
            network("b", &[("team", "web")], None),
            network("c", &[("team", "data")], None),
        ];
        let selector = Selector {
            match_labels: [("team".to_string(), "data".to_string())].into(),
            match_controller_ref: None,
        };
        let names: Vec<String> = select_candidates(&candidates, &selector, None)
            .iter()
            .map(|n| n.name_any())
            .collect();
        assert_eq!(names, vec!["a", "c"]);
    }

    #[tokio::test]
    async fn test_selector_resolution_writes_back_chosen_name() {
        let list = json!({
            "apiVersion": "compute.gcp.crossplane.io/v1beta1",
            "kind": "NetworkList",
            "metadata": {},
            "items": [
                serde_json::to_value(ready(network("net-a", &[("env", "dev")], None), "https://compute/net-a")).unwrap(),
                serde_json::to_value(ready(network("net-b", &[("env", "prod")], None), "https://compute/net-b")).unwrap(),
            ]
        });
        let (client, requests) = testing::mock_client(move |method, path, _| {
            if method == "GET" && path == "/apis/compute.gcp.crossplane.io/v1beta1/networks" {
                (http::StatusCode::OK, list.clone())
            } else {
                testing::not_found()
            }
        });

        let from = network("subnet-owner", &[], None);
        let selector = Selector {
            match_labels: [("env".to_string(), "prod".to_string())].into(),
            match_controller_ref: None,
        };
        let rsp = Resolver::new(client)
            .resolve(
                &from,
                ResolutionRequest {
                    current_value: None,
                    reference: None,
                    selector: Some(&selector),
                },
                network_self_link,
            )
            .await
            .unwrap();

        assert_eq!(rsp.resolved_value.as_deref(), Some("https://compute/net-b"));
        assert_eq!(rsp.resolved_reference.unwrap().name, "net-b");
        assert_eq!(testing::matching(&requests, "GET", "/networks").len(), 1);
    }
}
