use super::Object;
use crate::types::Kind;
use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;

reconcile::shape! {
    /// MAC address filtering of an SSID.
    #[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
    #[serde(default)]
    pub struct MacFilter => MacFilterIntent {
        #[serde(rename = "mac_filter_enabled")]
        field enabled: bool,
        #[serde(rename = "mac_filter_policy")]
        field policy: String,
        #[serde(rename = "mac_filter_list")]
        field addresses: BTreeSet<String>,
    }
}

reconcile::shape! {
    /// A wireless network (`wlanconf`).
    #[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
    #[serde(default)]
    pub struct Wlan => WlanIntent {
        #[serde(rename = "_id", skip_serializing_if = "String::is_empty")]
        protected id: String,
        #[serde(skip_serializing_if = "String::is_empty")]
        protected site_id: String,
        field name: String,
        field enabled: bool,
        field security: String,
        field wpa_mode: String,
        field x_passphrase: String,
        field networkconf_id: String,
        field usergroup_id: String,
        field hide_ssid: bool,
        field is_guest: bool,
        field wlan_bands: Vec<String>,
        #[serde(flatten)]
        field mac_filter: MacFilter,
        #[serde(flatten)]
        protected extra: super::Unmodeled,
    }
}

impl Object for Wlan {
    const KIND: Kind = Kind::Wlan;

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
    use reconcile::{MergePolicy, Mergeable, Presence, Reconciler};

    fn home() -> Wlan {
        Wlan {
            id: "w1".into(),
            site_id: "s1".into(),
            name: "home".into(),
            enabled: true,
            security: "wpapsk".into(),
            wpa_mode: "wpa2".into(),
            x_passphrase: "hunter22".into(),
            networkconf_id: "n1".into(),
            usergroup_id: "g1".into(),
            wlan_bands: vec!["2g".into(), "5g".into()],
            mac_filter: MacFilter {
                enabled: true,
                policy: "allow".into(),
                addresses: ["aa:bb:cc:dd:ee:ff".to_string()].into(),
            },
            ..Default::default()
        }
    }

    #[test]
    fn test_decode_flattens_mac_filter() {
        let wlan: Wlan = serde_json::from_str(
            r#"{"_id":"w1","name":"guest","mac_filter_enabled":true,"mac_filter_list":["aa:bb:cc:dd:ee:ff"]}"#,
        )
        .unwrap();
        assert!(wlan.mac_filter.enabled);
        assert_eq!(wlan.mac_filter.addresses.len(), 1);
        assert!(wlan.wlan_bands.is_empty());
    }

    #[test]
    fn test_unresolved_network_reference_blocks_strict_merge() {
        let declared = WlanIntent {
            networkconf_id: Presence::Unresolved,
            ..Default::default()
        };
        let err = Reconciler::default()
            .merge(Some(&home()), Some(&declared))
            .unwrap_err();
        assert_eq!(err.to_string(), "Wlan has unresolved fields: networkconf_id");
    }

    #[test]
    fn test_observe_omits_empty_collections() {
        let mut wlan = home();
        wlan.wlan_bands.clear();
        let observed = wlan.observe().into_known().unwrap();
        assert!(observed.wlan_bands.is_unset());
        let mac = observed.mac_filter.known().unwrap();
        assert!(mac.addresses.is_known());
    }

    #[test]
    fn test_empty_address_list_clears_under_literal_policy() {
        let declared = WlanIntent {
            mac_filter: Presence::Known(MacFilterIntent {
                addresses: Presence::Known(BTreeSet::new()),
                ..Default::default()
            }),
            ..Default::default()
        };
        let kept = Reconciler::default()
            .merge(Some(&home()), Some(&declared))
            .unwrap();
        assert_eq!(kept.mac_filter.addresses.len(), 1);

        let cleared = Reconciler::new(MergePolicy::literal())
            .merge(Some(&home()), Some(&declared))
            .unwrap();
        assert!(cleared.mac_filter.addresses.is_empty());
        assert!(cleared.mac_filter.enabled);
    }
}
