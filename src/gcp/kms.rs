//! Cloud KMS v1 wire types

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

const BASE: &str = "https://cloudkms.googleapis.com/v1";

/// `projects/{project}/locations/{location}`
pub fn location_name(project: &str, location: &str) -> String {
    format!("projects/{}/locations/{}", project, location)
}

pub fn key_ring_name(project: &str, location: &str, name: &str) -> String {
    format!("{}/keyRings/{}", location_name(project, location), name)
}

pub fn create_key_ring_url(project: &str, location: &str, name: &str) -> String {
    format!(
        "{}/{}/keyRings?keyRingId={}",
        BASE,
        location_name(project, location),
        name
    )
}

pub fn crypto_key_name(key_ring: &str, name: &str) -> String {
    format!("{}/cryptoKeys/{}", key_ring, name)
}

pub fn create_crypto_key_url(key_ring: &str, name: &str) -> String {
    format!("{}/{}/cryptoKeys?cryptoKeyId={}", BASE, key_ring, name)
}

pub fn resource_url(name: &str) -> String {
    format!("{}/{}", BASE, name)
}

pub fn patch_url(name: &str, update_mask: &str) -> String {
    format!("{}?updateMask={}", resource_url(name), update_mask)
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Default)]
#[serde(rename_all = "camelCase")]
pub struct KeyRing {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub create_time: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Default)]
#[serde(rename_all = "camelCase")]
pub struct CryptoKey {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub purpose: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub rotation_period: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub next_rotation_time: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub version_template: Option<CryptoKeyVersionTemplate>,
    #[serde(default, skip_serializing_if = "BTreeMap::is_empty")]
    pub labels: BTreeMap<String, String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub create_time: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub primary: Option<CryptoKeyVersion>,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Default)]
#[serde(rename_all = "camelCase")]
pub struct CryptoKeyVersionTemplate {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub algorithm: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub protection_level: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Default)]
#[serde(rename_all = "camelCase")]
pub struct CryptoKeyVersion {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub state: Option<String>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_urls() {
        assert_eq!(
            create_key_ring_url("p", "global", "ring"),
            "https://cloudkms.googleapis.com/v1/projects/p/locations/global/keyRings?keyRingId=ring"
        );
        let ring = key_ring_name("p", "global", "ring");
        assert_eq!(
            create_crypto_key_url(&ring, "key"),
            "https://cloudkms.googleapis.com/v1/projects/p/locations/global/keyRings/ring/cryptoKeys?cryptoKeyId=key"
        );
        assert_eq!(
            patch_url(&crypto_key_name(&ring, "key"), "labels,rotationPeriod"),
            "https://cloudkms.googleapis.com/v1/projects/p/locations/global/keyRings/ring/cryptoKeys/key?updateMask=labels,rotationPeriod"
        );
    }
}
