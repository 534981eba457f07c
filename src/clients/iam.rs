//! ServiceAccount, ServiceAccountKey and ServiceAccountPolicy conversion

use super::{late_init, set_if_some};
use crate::crd::{
    Policy, ServiceAccountKeyObservation, ServiceAccountKeyParameters, ServiceAccountObservation,
    ServiceAccountParameters,
};
use crate::gcp::iam;

/// Policy version required when any binding carries a condition.
const CONDITIONAL_POLICY_VERSION: i64 = 3;

// ---------------------------------------------------------------------------
// ServiceAccount
// ---------------------------------------------------------------------------

pub fn generate_service_account(params: &ServiceAccountParameters, target: &mut iam::ServiceAccount) {
    set_if_some(&mut target.display_name, &params.display_name);
    set_if_some(&mut target.description, &params.description);
}

pub fn generate_service_account_observation(observed: &iam::ServiceAccount) -> ServiceAccountObservation {
    ServiceAccountObservation {
        name: observed.name.clone(),
        email: observed.email.clone(),
        project_id: observed.project_id.clone(),
        unique_id: observed.unique_id.clone(),
        oauth2_client_id: observed.oauth2_client_id.clone(),
        disabled: observed.disabled,
    }
}

pub fn late_initialize_service_account(params: &mut ServiceAccountParameters, observed: &iam::ServiceAccount) {
    late_init(&mut params.display_name, &observed.display_name);
    late_init(&mut params.description, &observed.description);
}

/// Fields of the observed account that differ from the spec, as an
/// updateMask. Empty when up to date.
pub fn service_account_update_mask(params: &ServiceAccountParameters, observed: &iam::ServiceAccount) -> Vec<&'static str> {
    let mut desired = observed.clone();
    generate_service_account(params, &mut desired);
    let mut mask = Vec::new();
    if desired.display_name != observed.display_name {
        mask.push("displayName");
    }
    if desired.description != observed.description {
        mask.push("description");
    }
    mask
}

// ---------------------------------------------------------------------------
// ServiceAccountKey
// ---------------------------------------------------------------------------

pub fn generate_create_key_request(params: &ServiceAccountKeyParameters) -> iam::CreateServiceAccountKeyRequest {
    iam::CreateServiceAccountKeyRequest {
        key_algorithm: params.key_algorithm.clone(),
        private_key_type: params.private_key_type.clone(),
    }
}

pub fn generate_service_account_key_observation(observed: &iam::ServiceAccountKey) -> ServiceAccountKeyObservation {
    ServiceAccountKeyObservation {
        key_id: observed
            .name
            .as_deref()
            .map(|n| crate::gcp::last_segment(n).to_string()),
        name: observed.name.clone(),
        private_key_type: observed.private_key_type.clone(),
        key_algorithm: observed.key_algorithm.clone(),
        valid_after_time: observed.valid_after_time.clone(),
        valid_before_time: observed.valid_before_time.clone(),
        key_origin: observed.key_origin.clone(),
        key_type: observed.key_type.clone(),
    }
}

pub fn late_initialize_service_account_key(params: &mut ServiceAccountKeyParameters, observed: &iam::ServiceAccountKey) {
    late_init(&mut params.key_algorithm, &observed.key_algorithm);
    late_init(&mut params.private_key_type, &observed.private_key_type);
}

// ---------------------------------------------------------------------------
// ServiceAccountPolicy
// ---------------------------------------------------------------------------

/// Convert the spec policy into the IAM wire policy.
pub fn generate_policy(policy: &Policy) -> iam::Policy {
    let bindings: Vec<iam::Binding> = policy
        .bindings
        .iter()
        .map(|b| iam::Binding {
            role: b.role.clone(),
            members: b.members.clone(),
            condition: b.condition.as_ref().map(|c| iam::Expr {
                expression: c.expression.clone(),
                title: c.title.clone(),
                description: c.description.clone(),
                location: c.location.clone(),
            }),
        })
        .collect();
    let version = bindings
        .iter()
        .any(|b| b.condition.is_some())
        .then_some(CONDITIONAL_POLICY_VERSION);
    iam::Policy {
        version,
        bindings,
        etag: None,
    }
}

/// Bindings in a canonical order with sorted, deduplicated members.
fn canonical_bindings(policy: &iam::Policy) -> Vec<iam::Binding> {
    let mut bindings: Vec<iam::Binding> = policy
        .bindings
        .iter()
        .filter(|b| !b.members.is_empty())
        .cloned()
        .map(|mut b| {
            b.members.sort();
            b.members.dedup();
            b
        })
        .collect();
    bindings.sort_by(|a, b| {
        let key = |x: &iam::Binding| {
            (
                x.role.clone(),
                x.condition.as_ref().map(|c| c.expression.clone()),
                x.members.clone(),
            )
        };
        key(a).cmp(&key(b))
    });
    bindings
}

/// Compare policies ignoring the order of bindings and of members.
pub fn is_policy_up_to_date(desired: &Policy, observed: &iam::Policy) -> bool {
    canonical_bindings(&generate_policy(desired)) == canonical_bindings(observed)
}

/// A policy without bindings is what GCP returns for "no policy".
pub fn policy_exists(observed: &iam::Policy) -> bool {
    !observed.bindings.is_empty()
}

/// Desired policy carrying the observed etag so concurrent edits conflict.
pub fn generate_set_policy_request(desired: &Policy, observed_etag: Option<&str>) -> iam::SetIamPolicyRequest {
    let mut policy = generate_policy(desired);
    policy.etag = observed_etag.map(str::to_string);
    iam::SetIamPolicyRequest { policy }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::crd::{Binding, Expr};
    use pretty_assertions::assert_eq;

    fn binding(role: &str, members: &[&str]) -> Binding {
        Binding {
            role: role.to_string(),
            members: members.iter().map(|m| m.to_string()).collect(),
            ..Default::default()
        }
    }

    fn wire_binding(role: &str, members: &[&str]) -> iam::Binding {
        iam::Binding {
            role: role.to_string(),
            members: members.iter().map(|m| m.to_string()).collect(),
            condition: None,
        }
    }

    #[test]
    fn test_policy_order_is_ignored() {
        let desired = Policy {
            bindings: vec![
                binding("roles/a", &["user:x@example.com", "user:y@example.com"]),
                binding("roles/b", &["group:g@example.com"]),
            ],
        };
        let observed = iam::Policy {
            version: Some(1),
            bindings: vec![
                wire_binding("roles/b", &["group:g@example.com"]),
                wire_binding("roles/a", &["user:y@example.com", "user:x@example.com"]),
            ],
            etag: Some("BwX=".to_string()),
        };
        assert!(is_policy_up_to_date(&desired, &observed));
    }

    #[test]
    fn test_policy_member_difference() {
        let desired = Policy {
            bindings: vec![binding("roles/a", &["user:x@example.com"])],
        };
        let observed = iam::Policy {
            bindings: vec![wire_binding("roles/a", &["user:z@example.com"])],
            ..Default::default()
        };
        assert!(!is_policy_up_to_date(&desired, &observed));
    }

    #[test]
    fn test_empty_policy_does_not_exist() {
        assert!(!policy_exists(&iam::Policy::default()));
        assert!(policy_exists(&iam::Policy {
            bindings: vec![wire_binding("roles/a", &["user:x@example.com"])],
            ..Default::default()
        }));
    }

    #[test]
    fn test_conditional_binding_sets_version() {
        let mut b = binding("roles/a", &["user:x@example.com"]);
        b.condition = Some(Expr {
            expression: "request.time < timestamp('2030-01-01T00:00:00Z')".to_string(),
            title: Some("expires".to_string()),
            ..Default::default()
        });
        let policy = generate_policy(&Policy { bindings: vec![b] });
        assert_eq!(policy.version, Some(3));

        let plain = generate_policy(&Policy {
            bindings: vec![binding("roles/a", &["user:x@example.com"])],
        });
        assert_eq!(plain.version, None);
    }

    #[test]
    fn test_set_policy_request_carries_etag() {
        let req = generate_set_policy_request(&Policy::default(), Some("BwX="));
        assert_eq!(req.policy.etag.as_deref(), Some("BwX="));
        assert!(req.policy.bindings.is_empty());
    }

    #[test]
    fn test_service_account_update_mask() {
        let observed = iam::ServiceAccount {
            display_name: Some("old".to_string()),
            description: Some("same".to_string()),
            ..Default::default()
        };
        let params = ServiceAccountParameters {
            display_name: Some("new".to_string()),
            description: Some("same".to_string()),
        };
        assert_eq!(service_account_update_mask(&params, &observed), vec!["displayName"]);

        let mut unset = ServiceAccountParameters::default();
        late_initialize_service_account(&mut unset, &observed);
        assert!(service_account_update_mask(&unset, &observed).is_empty());
    }

    #[test]
    fn test_key_observation_extracts_key_id() {
        let observed = iam::ServiceAccountKey {
            name: Some("projects/p/serviceAccounts/a@p.iam.gserviceaccount.com/keys/f00d".to_string()),
            key_algorithm: Some("KEY_ALG_RSA_2048".to_string()),
            ..Default::default()
        };
        let obs = generate_service_account_key_observation(&observed);
        assert_eq!(obs.key_id.as_deref(), Some("f00d"));
        assert_eq!(obs.key_algorithm.as_deref(), Some("KEY_ALG_RSA_2048"));
    }
}
