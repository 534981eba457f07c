//! KeyRing and CryptoKey conversion

use super::{late_init, set_if_some, set_map_if_not_empty};
use crate::crd::{
    CryptoKeyObservation, CryptoKeyParameters, CryptoKeyVersionTemplate, KeyRingObservation,
};
use crate::gcp::kms;

pub fn generate_key_ring_observation(observed: &kms::KeyRing) -> KeyRingObservation {
    KeyRingObservation {
        name: observed.name.clone(),
        create_time: observed.create_time.clone(),
    }
}

/// Key rings have no mutable fields.
pub fn is_key_ring_up_to_date() -> bool {
    true
}

pub fn generate_crypto_key(params: &CryptoKeyParameters, target: &mut kms::CryptoKey) {
    target.purpose = params.purpose.clone();
    set_if_some(&mut target.rotation_period, &params.rotation_period);
    set_if_some(&mut target.next_rotation_time, &params.next_rotation_time);
    if let Some(vt) = &params.version_template {
        let t = target.version_template.get_or_insert_with(Default::default);
        set_if_some(&mut t.algorithm, &vt.algorithm);
        set_if_some(&mut t.protection_level, &vt.protection_level);
    }
    set_map_if_not_empty(&mut target.labels, &params.labels);
}

pub fn generate_crypto_key_observation(observed: &kms::CryptoKey) -> CryptoKeyObservation {
    CryptoKeyObservation {
        name: observed.name.clone(),
        create_time: observed.create_time.clone(),
        primary: observed.primary.as_ref().and_then(|v| v.name.clone()),
    }
}

pub fn late_initialize_crypto_key(params: &mut CryptoKeyParameters, observed: &kms::CryptoKey) {
    late_init(&mut params.rotation_period, &observed.rotation_period);
    late_init(&mut params.next_rotation_time, &observed.next_rotation_time);
    if let Some(vt) = &observed.version_template {
        let t = params
            .version_template
            .get_or_insert_with(CryptoKeyVersionTemplate::default);
        late_init(&mut t.algorithm, &vt.algorithm);
        late_init(&mut t.protection_level, &vt.protection_level);
    }
}

/// Mutable crypto key fields that differ from the spec. `nextRotationTime`
/// moves forward on every rotation, so it only counts when the rotation
/// period itself changes.
pub fn crypto_key_update_mask(params: &CryptoKeyParameters, observed: &kms::CryptoKey) -> Vec<&'static str> {
    let mut desired = observed.clone();
    generate_crypto_key(params, &mut desired);
    let mut mask = Vec::new();
    if desired.labels != observed.labels {
        mask.push("labels");
    }
    if desired.rotation_period != observed.rotation_period {
        mask.push("rotationPeriod");
        if desired.next_rotation_time.is_some() {
            mask.push("nextRotationTime");
        }
    }
    if desired.version_template != observed.version_template {
        mask.push("versionTemplate");
    }
    mask
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;
    use std::collections::BTreeMap;

    fn observed() -> kms::CryptoKey {
        kms::CryptoKey {
            name: Some("projects/p/locations/global/keyRings/r/cryptoKeys/k".to_string()),
            purpose: "ENCRYPT_DECRYPT".to_string(),
            rotation_period: Some("7776000s".to_string()),
            next_rotation_time: Some("2030-01-01T00:00:00Z".to_string()),
            version_template: Some(kms::CryptoKeyVersionTemplate {
                algorithm: Some("GOOGLE_SYMMETRIC_ENCRYPTION".to_string()),
                protection_level: Some("SOFTWARE".to_string()),
            }),
            primary: Some(kms::CryptoKeyVersion {
                name: Some("projects/p/locations/global/keyRings/r/cryptoKeys/k/cryptoKeyVersions/1".to_string()),
                state: Some("ENABLED".to_string()),
            }),
            ..Default::default()
        }
    }

    #[test]
    fn test_crypto_key_up_to_date_after_late_init() {
        let mut params = CryptoKeyParameters {
            purpose: "ENCRYPT_DECRYPT".to_string(),
            ..Default::default()
        };
        late_initialize_crypto_key(&mut params, &observed());
        assert_eq!(params.rotation_period.as_deref(), Some("7776000s"));
        assert!(crypto_key_update_mask(&params, &observed()).is_empty());
    }

    #[test]
    fn test_crypto_key_update_mask() {
        let params = CryptoKeyParameters {
            purpose: "ENCRYPT_DECRYPT".to_string(),
            rotation_period: Some("86400s".to_string()),
            labels: BTreeMap::from([("team".to_string(), "sec".to_string())]),
            ..Default::default()
        };
        assert_eq!(
            crypto_key_update_mask(&params, &observed()),
            vec!["labels", "rotationPeriod", "nextRotationTime"]
        );
    }

    #[test]
    fn test_crypto_key_observation() {
        let obs = generate_crypto_key_observation(&observed());
        assert!(obs.primary.unwrap().ends_with("cryptoKeyVersions/1"));
    }
}
