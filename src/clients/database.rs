//! CloudSQLInstance conversion, readiness and connection details

use super::{late_init, set_if_some, set_map_if_not_empty};
use crate::conditions;
use crate::crd::{
    AclEntry, BackupConfiguration, CloudSQLInstanceObservation, CloudSQLInstanceParameters,
    CloudSQLSettings, Condition, IpConfiguration, IpMapping, LocationPreference,
    MaintenanceWindow,
};
use crate::gcp::sqladmin;
use rand::distributions::Alphanumeric;
use rand::Rng;
use std::collections::BTreeMap;

pub const CONNECTION_USERNAME: &str = "username";
pub const CONNECTION_PASSWORD: &str = "password";
pub const CONNECTION_ENDPOINT: &str = "endpoint";
pub const CONNECTION_PUBLIC_IP: &str = "publicIP";
pub const CONNECTION_PRIVATE_IP: &str = "privateIP";
pub const CONNECTION_SERVER_CA_CERTIFICATE: &str = "serverCACertificateCert";

const PASSWORD_LENGTH: usize = 27;

pub fn generate_database_instance(
    name: &str,
    params: &CloudSQLInstanceParameters,
    target: &mut sqladmin::DatabaseInstance,
) {
    target.name = name.to_string();
    target.region = Some(params.region.clone());
    set_if_some(&mut target.database_version, &params.database_version);
    set_if_some(&mut target.master_instance_name, &params.master_instance_name);
    let settings = target.settings.get_or_insert_with(Default::default);
    generate_settings(&params.settings, settings);
}

fn generate_settings(p: &CloudSQLSettings, s: &mut sqladmin::Settings) {
    s.tier = p.tier.clone();
    set_if_some(&mut s.activation_policy, &p.activation_policy);
    set_if_some(&mut s.availability_type, &p.availability_type);
    if let Some(size) = p.data_disk_size_gb {
        s.data_disk_size_gb = Some(size.to_string());
    }
    set_if_some(&mut s.data_disk_type, &p.data_disk_type);
    set_if_some(&mut s.storage_auto_resize, &p.storage_auto_resize);
    if let Some(limit) = p.storage_auto_resize_limit {
        s.storage_auto_resize_limit = Some(limit.to_string());
    }
    set_if_some(&mut s.pricing_plan, &p.pricing_plan);
    set_if_some(&mut s.deletion_protection_enabled, &p.deletion_protection_enabled);
    set_map_if_not_empty(&mut s.user_labels, &p.user_labels);
    if !p.database_flags.is_empty() {
        s.database_flags = p
            .database_flags
            .iter()
            .map(|f| sqladmin::DatabaseFlags {
                name: f.name.clone(),
                value: f.value.clone(),
            })
            .collect();
    }
    if let Some(ip) = &p.ip_configuration {
        let t = s.ip_configuration.get_or_insert_with(Default::default);
        set_if_some(&mut t.ipv4_enabled, &ip.ipv4_enabled);
        set_if_some(&mut t.private_network, &ip.private_network);
        set_if_some(&mut t.require_ssl, &ip.require_ssl);
        if !ip.authorized_networks.is_empty() {
            t.authorized_networks = ip
                .authorized_networks
                .iter()
                .map(|a| sqladmin::AclEntry {
                    name: a.name.clone(),
                    value: a.value.clone(),
                    expiration_time: a.expiration_time.clone(),
                })
                .collect();
        }
    }
    if let Some(b) = &p.backup_configuration {
        let t = s.backup_configuration.get_or_insert_with(Default::default);
        set_if_some(&mut t.enabled, &b.enabled);
        set_if_some(&mut t.start_time, &b.start_time);
        set_if_some(&mut t.binary_log_enabled, &b.binary_log_enabled);
        set_if_some(
            &mut t.point_in_time_recovery_enabled,
            &b.point_in_time_recovery_enabled,
        );
        set_if_some(&mut t.location, &b.location);
    }
    if let Some(l) = &p.location_preference {
        let t = s.location_preference.get_or_insert_with(Default::default);
        set_if_some(&mut t.zone, &l.zone);
    }
    if let Some(m) = &p.maintenance_window {
        let t = s.maintenance_window.get_or_insert_with(Default::default);
        set_if_some(&mut t.day, &m.day);
        set_if_some(&mut t.hour, &m.hour);
        set_if_some(&mut t.update_track, &m.update_track);
    }
}

pub fn generate_cloudsql_observation(observed: &sqladmin::DatabaseInstance) -> CloudSQLInstanceObservation {
    CloudSQLInstanceObservation {
        state: observed.state.clone(),
        connection_name: observed.connection_name.clone(),
        backend_type: observed.backend_type.clone(),
        gce_zone: observed.gce_zone.clone(),
        ip_addresses: observed
            .ip_addresses
            .iter()
            .map(|ip| IpMapping {
                ip_address: ip.ip_address.clone(),
                r#type: ip.r#type.clone(),
                time_to_retire: ip.time_to_retire.clone(),
            })
            .collect(),
        self_link: observed.self_link.clone(),
        service_account_email_address: observed.service_account_email_address.clone(),
        settings_version: observed
            .settings
            .as_ref()
            .and_then(|s| s.settings_version.as_deref())
            .and_then(|v| v.parse().ok()),
        project: observed.project.clone(),
    }
}

pub fn late_initialize_cloudsql(params: &mut CloudSQLInstanceParameters, observed: &sqladmin::DatabaseInstance) {
    late_init(&mut params.database_version, &observed.database_version);
    late_init(&mut params.master_instance_name, &observed.master_instance_name);
    let Some(s) = &observed.settings else {
        return;
    };
    let p = &mut params.settings;
    if p.tier.is_empty() {
        p.tier = s.tier.clone();
    }
    late_init(&mut p.activation_policy, &s.activation_policy);
    late_init(&mut p.availability_type, &s.availability_type);
    if p.data_disk_size_gb.is_none() {
        p.data_disk_size_gb = s.data_disk_size_gb.as_deref().and_then(|v| v.parse().ok());
    }
    late_init(&mut p.data_disk_type, &s.data_disk_type);
    late_init(&mut p.storage_auto_resize, &s.storage_auto_resize);
    if p.storage_auto_resize_limit.is_none() {
        p.storage_auto_resize_limit = s
            .storage_auto_resize_limit
            .as_deref()
            .and_then(|v| v.parse().ok());
    }
    late_init(&mut p.pricing_plan, &s.pricing_plan);
    late_init(&mut p.deletion_protection_enabled, &s.deletion_protection_enabled);
    if let Some(ip) = &s.ip_configuration {
        let t = p.ip_configuration.get_or_insert_with(IpConfiguration::default);
        late_init(&mut t.ipv4_enabled, &ip.ipv4_enabled);
        late_init(&mut t.private_network, &ip.private_network);
        late_init(&mut t.require_ssl, &ip.require_ssl);
        if t.authorized_networks.is_empty() {
            t.authorized_networks = ip
                .authorized_networks
                .iter()
                .map(|a| AclEntry {
                    name: a.name.clone(),
                    value: a.value.clone(),
                    expiration_time: a.expiration_time.clone(),
                })
                .collect();
        }
    }
    if let Some(b) = &s.backup_configuration {
        let t = p
            .backup_configuration
            .get_or_insert_with(BackupConfiguration::default);
        late_init(&mut t.enabled, &b.enabled);
        late_init(&mut t.start_time, &b.start_time);
        late_init(&mut t.binary_log_enabled, &b.binary_log_enabled);
        late_init(
            &mut t.point_in_time_recovery_enabled,
            &b.point_in_time_recovery_enabled,
        );
        late_init(&mut t.location, &b.location);
    }
    if let Some(l) = &s.location_preference {
        let t = p
            .location_preference
            .get_or_insert_with(LocationPreference::default);
        late_init(&mut t.zone, &l.zone);
    }
    if let Some(m) = &s.maintenance_window {
        let t = p
            .maintenance_window
            .get_or_insert_with(MaintenanceWindow::default);
        late_init(&mut t.day, &m.day);
        late_init(&mut t.hour, &m.hour);
        late_init(&mut t.update_track, &m.update_track);
    }
}

pub fn is_cloudsql_up_to_date(
    name: &str,
    params: &CloudSQLInstanceParameters,
    observed: &sqladmin::DatabaseInstance,
) -> bool {
    let mut desired = observed.clone();
    generate_database_instance(name, params, &mut desired);
    desired == *observed
}

/// Ready condition derived from the instance state.
pub fn cloudsql_ready_condition(state: Option<&str>) -> Condition {
    match state {
        Some(sqladmin::STATE_RUNNABLE) => conditions::available(),
        Some(sqladmin::STATE_PENDING_CREATE) => conditions::creating(),
        _ => conditions::unavailable(),
    }
}

/// Administrative user created with the instance for each engine.
pub fn default_username(database_version: Option<&str>) -> &'static str {
    match database_version {
        Some(v) if v.starts_with("POSTGRES") => "postgres",
        Some(v) if v.starts_with("SQLSERVER") => "sqlserver",
        _ => "root",
    }
}

/// Random root password set on creation.
pub fn generate_password() -> String {
    rand::thread_rng()
        .sample_iter(&Alphanumeric)
        .take(PASSWORD_LENGTH)
        .map(char::from)
        .collect()
}

fn ip_of_type<'a>(observed: &'a sqladmin::DatabaseInstance, ip_type: &str) -> Option<&'a str> {
    observed
        .ip_addresses
        .iter()
        .find(|ip| ip.r#type.as_deref() == Some(ip_type))
        .map(|ip| ip.ip_address.as_str())
}

/// Connection details published for an observed instance. The endpoint is
/// the public address when there is one, the private address otherwise.
pub fn cloudsql_connection_details(observed: &sqladmin::DatabaseInstance) -> BTreeMap<String, Vec<u8>> {
    let mut details = BTreeMap::new();
    let public = ip_of_type(observed, sqladmin::IP_TYPE_PRIMARY);
    let private = ip_of_type(observed, sqladmin::IP_TYPE_PRIVATE);
    if let Some(endpoint) = public.or(private) {
        details.insert(CONNECTION_ENDPOINT.to_string(), endpoint.as_bytes().to_vec());
    }
    if let Some(ip) = public {
        details.insert(CONNECTION_PUBLIC_IP.to_string(), ip.as_bytes().to_vec());
    }
    if let Some(ip) = private {
        details.insert(CONNECTION_PRIVATE_IP.to_string(), ip.as_bytes().to_vec());
    }
    if let Some(cert) = observed.server_ca_cert.as_ref().and_then(|c| c.cert.as_ref()) {
        details.insert(
            CONNECTION_SERVER_CA_CERTIFICATE.to_string(),
            cert.as_bytes().to_vec(),
        );
    }
    details
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::conditions::{REASON_AVAILABLE, REASON_CREATING, REASON_UNAVAILABLE};
    use pretty_assertions::assert_eq;

    fn params() -> CloudSQLInstanceParameters {
        CloudSQLInstanceParameters {
            region: "us-central1".to_string(),
            database_version: Some("POSTGRES_15".to_string()),
            master_instance_name: None,
            settings: CloudSQLSettings {
                tier: "db-custom-1-3840".to_string(),
                data_disk_size_gb: Some(20),
                ..Default::default()
            },
        }
    }

    #[test]
    fn test_generate_instance_encodes_int64_as_string() {
        let mut instance = sqladmin::DatabaseInstance::default();
        generate_database_instance("db", &params(), &mut instance);
        let settings = instance.settings.unwrap();
        assert_eq!(settings.tier, "db-custom-1-3840");
        assert_eq!(settings.data_disk_size_gb.as_deref(), Some("20"));
        assert_eq!(instance.region.as_deref(), Some("us-central1"));
    }

    #[test]
    fn test_cloudsql_up_to_date_after_late_init() {
        let observed = sqladmin::DatabaseInstance {
            name: "db".to_string(),
            region: Some("us-central1".to_string()),
            database_version: Some("POSTGRES_15".to_string()),
            state: Some("RUNNABLE".to_string()),
            settings: Some(sqladmin::Settings {
                tier: "db-custom-1-3840".to_string(),
                data_disk_size_gb: Some("20".to_string()),
                activation_policy: Some("ALWAYS".to_string()),
                settings_version: Some("7".to_string()),
                ip_configuration: Some(sqladmin::IpConfiguration {
                    ipv4_enabled: Some(true),
                    ..Default::default()
                }),
                ..Default::default()
            }),
            ..Default::default()
        };
        let mut p = params();
        late_initialize_cloudsql(&mut p, &observed);
        assert_eq!(p.settings.activation_policy.as_deref(), Some("ALWAYS"));
        assert_eq!(p.settings.ip_configuration.as_ref().unwrap().ipv4_enabled, Some(true));
        assert!(is_cloudsql_up_to_date("db", &p, &observed));

        p.settings.tier = "db-custom-2-7680".to_string();
        assert!(!is_cloudsql_up_to_date("db", &p, &observed));
    }

    #[test]
    fn test_ready_condition_follows_state() {
        let reason = |s| cloudsql_ready_condition(s).reason.unwrap();
        assert_eq!(reason(Some("RUNNABLE")), REASON_AVAILABLE);
        assert_eq!(reason(Some("PENDING_CREATE")), REASON_CREATING);
        assert_eq!(reason(Some("MAINTENANCE")), REASON_UNAVAILABLE);
        assert_eq!(reason(None), REASON_UNAVAILABLE);
    }

    #[test]
    fn test_connection_details() {
        let observed = sqladmin::DatabaseInstance {
            ip_addresses: vec![
                sqladmin::IpMapping {
                    ip_address: "10.1.2.3".to_string(),
                    r#type: Some("PRIVATE".to_string()),
                    time_to_retire: None,
                },
                sqladmin::IpMapping {
                    ip_address: "34.1.2.3".to_string(),
                    r#type: Some("PRIMARY".to_string()),
                    time_to_retire: None,
                },
            ],
            server_ca_cert: Some(sqladmin::SslCert {
                cert: Some("CERT".to_string()),
                ..Default::default()
            }),
            ..Default::default()
        };
        let details = cloudsql_connection_details(&observed);
        assert_eq!(details[CONNECTION_ENDPOINT], b"34.1.2.3".to_vec());
        assert_eq!(details[CONNECTION_PUBLIC_IP], b"34.1.2.3".to_vec());
        assert_eq!(details[CONNECTION_PRIVATE_IP], b"10.1.2.3".to_vec());
        assert_eq!(details[CONNECTION_SERVER_CA_CERTIFICATE], b"CERT".to_vec());
    }

    #[test]
    fn test_private_only_endpoint() {
        let observed = sqladmin::DatabaseInstance {
            ip_addresses: vec![sqladmin::IpMapping {
                ip_address: "10.1.2.3".to_string(),
                r#type: Some("PRIVATE".to_string()),
                time_to_retire: None,
            }],
            ..Default::default()
        };
        let details = cloudsql_connection_details(&observed);
        assert_eq!(details[CONNECTION_ENDPOINT], b"10.1.2.3".to_vec());
        assert!(!details.contains_key(CONNECTION_PUBLIC_IP));
    }

    #[test]
    fn test_username_and_password() {
        assert_eq!(default_username(Some("POSTGRES_15")), "postgres");
        assert_eq!(default_username(Some("MYSQL_8_0")), "root");
        assert_eq!(default_username(Some("SQLSERVER_2019_STANDARD")), "sqlserver");
        let password = generate_password();
        assert_eq!(password.len(), 27);
        assert!(password.chars().all(|c| c.is_ascii_alphanumeric()));
    }
}
