//! CloudMemorystoreInstance conversion, readiness and connection details

use super::{late_init, set_if_some, set_map_if_not_empty};
use crate::conditions;
use crate::crd::{CloudMemorystoreInstanceObservation, CloudMemorystoreInstanceParameters, Condition};
use crate::gcp::redis;
use std::collections::BTreeMap;

pub const CONNECTION_ENDPOINT: &str = "endpoint";
pub const CONNECTION_PORT: &str = "port";

pub fn generate_redis_instance(params: &CloudMemorystoreInstanceParameters, target: &mut redis::Instance) {
    target.tier = params.tier.clone();
    target.memory_size_gb = params.memory_size_gb;
    set_if_some(&mut target.display_name, &params.display_name);
    set_map_if_not_empty(&mut target.labels, &params.labels);
    set_if_some(&mut target.location_id, &params.location_id);
    set_if_some(&mut target.alternative_location_id, &params.alternative_location_id);
    set_if_some(&mut target.redis_version, &params.redis_version);
    set_if_some(&mut target.reserved_ip_range, &params.reserved_ip_range);
    set_map_if_not_empty(&mut target.redis_configs, &params.redis_configs);
    set_if_some(&mut target.authorized_network, &params.authorized_network);
    set_if_some(&mut target.connect_mode, &params.connect_mode);
}

pub fn generate_redis_observation(observed: &redis::Instance) -> CloudMemorystoreInstanceObservation {
    CloudMemorystoreInstanceObservation {
        name: observed.name.clone(),
        host: observed.host.clone(),
        port: observed.port,
        current_location_id: observed.current_location_id.clone(),
        create_time: observed.create_time.clone(),
        state: observed.state.clone(),
        status_message: observed.status_message.clone(),
        persistence_iam_identity: observed.persistence_iam_identity.clone(),
    }
}

pub fn late_initialize_redis(params: &mut CloudMemorystoreInstanceParameters, observed: &redis::Instance) {
    late_init(&mut params.display_name, &observed.display_name);
    late_init(&mut params.location_id, &observed.location_id);
    late_init(&mut params.alternative_location_id, &observed.alternative_location_id);
    late_init(&mut params.redis_version, &observed.redis_version);
    late_init(&mut params.reserved_ip_range, &observed.reserved_ip_range);
    late_init(&mut params.authorized_network, &observed.authorized_network);
    late_init(&mut params.connect_mode, &observed.connect_mode);
}

/// Mutable instance fields that differ from the spec.
pub fn redis_update_mask(params: &CloudMemorystoreInstanceParameters, observed: &redis::Instance) -> Vec<&'static str> {
    let mut desired = observed.clone();
    generate_redis_instance(params, &mut desired);
    let mut mask = Vec::new();
    if desired.display_name != observed.display_name {
        mask.push("displayName");
    }
    if desired.labels != observed.labels {
        mask.push("labels");
    }
    if desired.memory_size_gb != observed.memory_size_gb {
        mask.push("memorySizeGb");
    }
    if desired.redis_configs != observed.redis_configs {
        mask.push("redisConfigs");
    }
    mask
}

pub fn redis_ready_condition(state: Option<&str>) -> Condition {
    match state {
        Some(redis::STATE_READY) => conditions::available(),
        Some(redis::STATE_CREATING) => conditions::creating(),
        Some(redis::STATE_DELETING) => conditions::deleting(),
        _ => conditions::unavailable(),
    }
}

pub fn redis_connection_details(observed: &redis::Instance) -> BTreeMap<String, Vec<u8>> {
    let mut details = BTreeMap::new();
    if let Some(host) = &observed.host {
        details.insert(CONNECTION_ENDPOINT.to_string(), host.as_bytes().to_vec());
    }
    if let Some(port) = observed.port {
        details.insert(CONNECTION_PORT.to_string(), port.to_string().into_bytes());
    }
    details
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::conditions::{REASON_AVAILABLE, REASON_CREATING, REASON_DELETING, REASON_UNAVAILABLE};
    use pretty_assertions::assert_eq;

    fn params() -> CloudMemorystoreInstanceParameters {
        CloudMemorystoreInstanceParameters {
            region: "us-east1".to_string(),
            tier: "BASIC".to_string(),
            memory_size_gb: 1,
            ..Default::default()
        }
    }

    fn observed() -> redis::Instance {
        redis::Instance {
            name: Some("projects/p/locations/us-east1/instances/cache".to_string()),
            tier: "BASIC".to_string(),
            memory_size_gb: 1,
            location_id: Some("us-east1-b".to_string()),
            redis_version: Some("REDIS_7_0".to_string()),
            host: Some("10.0.0.3".to_string()),
            port: Some(6379),
            state: Some("READY".to_string()),
            ..Default::default()
        }
    }

    #[test]
    fn test_redis_up_to_date_after_late_init() {
        let mut p = params();
        late_initialize_redis(&mut p, &observed());
        assert_eq!(p.location_id.as_deref(), Some("us-east1-b"));
        assert_eq!(p.redis_version.as_deref(), Some("REDIS_7_0"));
        assert!(redis_update_mask(&p, &observed()).is_empty());
    }

    #[test]
    fn test_redis_update_mask() {
        let p = CloudMemorystoreInstanceParameters {
            memory_size_gb: 4,
            display_name: Some("cache".to_string()),
            ..params()
        };
        assert_eq!(
            redis_update_mask(&p, &observed()),
            vec!["displayName", "memorySizeGb"]
        );
    }

    #[test]
    fn test_redis_ready_condition() {
        let reason = |s| redis_ready_condition(s).reason.unwrap();
        assert_eq!(reason(Some("READY")), REASON_AVAILABLE);
        assert_eq!(reason(Some("CREATING")), REASON_CREATING);
        assert_eq!(reason(Some("DELETING")), REASON_DELETING);
        assert_eq!(reason(Some("MAINTENANCE")), REASON_UNAVAILABLE);
    }

    #[test]
    fn test_redis_connection_details() {
        let details = redis_connection_details(&observed());
        assert_eq!(details[CONNECTION_ENDPOINT], b"10.0.0.3".to_vec());
        assert_eq!(details[CONNECTION_PORT], b"6379".to_vec());
    }
}
