use super::Object;
use crate::types::Kind;
use serde::{Deserialize, Serialize};

reconcile::shape! {
    /// DHCP server settings of a network.
    ///
    /// Flattened into the network on the wire as `dhcpd_*` keys.
    #[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
    #[serde(default)]
    pub struct DhcpServer => DhcpServerIntent {
        #[serde(rename = "dhcpd_enabled")]
        field enabled: bool,
        #[serde(rename = "dhcpd_start")]
        field start: String,
        #[serde(rename = "dhcpd_stop")]
        field stop: String,
        #[serde(rename = "dhcpd_leasetime")]
        field lease_time: u32,
        #[serde(rename = "dhcpd_dns")]
        field dns_servers: Vec<String>,
    }
}

reconcile::shape! {
    /// A LAN or VLAN network (`networkconf`).
    #[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
    #[serde(default)]
    pub struct Network => NetworkIntent {
        #[serde(rename = "_id", skip_serializing_if = "String::is_empty")]
        protected id: String,
        #[serde(skip_serializing_if = "String::is_empty")]
        protected site_id: String,
        #[serde(skip_serializing_if = "super::is_false")]
        protected attr_no_delete: bool,
        #[serde(skip_serializing_if = "String::is_empty")]
        protected attr_hidden_id: String,
        field name: String,
        field purpose: String,
        field enabled: bool,
        field vlan_enabled: bool,
        field vlan: u16,
        field ip_subnet: String,
        field domain_name: String,
        field igmp_snooping: bool,
        #[serde(flatten)]
        field dhcp: DhcpServer,
        #[serde(flatten)]
        protected extra: super::Unmodeled,
    }
}

impl Object for Network {
    const KIND: Kind = Kind::Network;

    fn id(&self) -> &str {
        &self.id
    }

    fn label(&self) -> &str {
        &self.name
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;
    use reconcile::{Presence, Shape};

    const WIRE: &str = r#"{
        "_id": "5f1a",
        "site_id": "s1",
        "attr_no_delete": true,
        "attr_hidden_id": "LAN",
        "name": "Default",
        "purpose": "corporate",
        "enabled": true,
        "vlan_enabled": false,
        "ip_subnet": "192.168.1.1/24",
        "dhcpd_enabled": true,
        "dhcpd_start": "192.168.1.6",
        "dhcpd_stop": "192.168.1.254",
        "dhcpd_leasetime": 86400,
        "setting_preference": "auto"
    }"#;

    #[test]
    fn test_decode_flattens_dhcp() {
        let network: Network = serde_json::from_str(WIRE).unwrap();
        assert_eq!(network.id, "5f1a");
        assert!(network.attr_no_delete);
        assert_eq!(network.dhcp.start, "192.168.1.6");
        assert_eq!(network.dhcp.lease_time, 86400);
        assert!(network.dhcp.dns_servers.is_empty());
        assert_eq!(network.label(), "Default");
    }

    #[test]
    fn test_encode_skips_unassigned_ids() {
        let network = Network {
            name: "iot".into(),
            vlan: 30,
            ..Default::default()
        };
        let value = serde_json::to_value(&network).unwrap();
        assert!(value.get("_id").is_none());
        assert!(value.get("attr_no_delete").is_none());
        assert_eq!(value["dhcpd_enabled"], serde_json::json!(false));
        assert_eq!(value["vlan"], serde_json::json!(30));
    }

    #[test]
    fn test_protected_fields() {
        let protected: Vec<_> = Network::protected_fields().collect();
        assert_eq!(
            protected,
            vec!["id", "site_id", "attr_no_delete", "attr_hidden_id", "extra"]
        );
    }

    #[test]
    fn test_nested_dhcp_merge_keeps_unset_siblings() {
        let existing: Network = serde_json::from_str(WIRE).unwrap();
        let declared: NetworkIntent = toml::from_str(
            r#"
            name = "Default"
            [dhcp]
            stop = "192.168.1.200"
            "#,
        )
        .unwrap();
        let merged = reconcile::reconcile(Some(&existing), Some(&declared)).unwrap();
        assert_eq!(merged.dhcp.stop, "192.168.1.200");
        assert_eq!(merged.dhcp.start, "192.168.1.6");
        assert!(merged.dhcp.enabled);
        assert_eq!(merged.attr_hidden_id, "LAN");
        assert_eq!(declared.vlan, Presence::Unset);
    }
}
