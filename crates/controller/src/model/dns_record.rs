use super::Object;
use crate::types::Kind;
use serde::{Deserialize, Serialize};

reconcile::shape! {
    /// A static DNS record (v2 `static-dns`).
    ///
    /// `ttl = 0` means "controller default" and is a real value.
    #[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
    #[serde(default)]
    pub struct DnsRecord => DnsRecordIntent {
        #[serde(rename = "_id", skip_serializing_if = "String::is_empty")]
        protected id: String,
        field key: String,
        field record_type: String,
        field value: String,
        explicit ttl: u32,
        field enabled: bool,
        field port: u16,
        field priority: u16,
        field weight: u16,
        #[serde(flatten)]
        protected extra: super::Unmodeled,
    }
}

impl Object for DnsRecord {
    const KIND: Kind = Kind::DnsRecord;

    fn id(&self) -> &str {
        &self.id
    }

    fn label(&self) -> &str {
        &self.key
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use reconcile::{FieldRule, Presence, Shape};

    #[test]
    fn test_zero_ttl_is_written() {
        let existing = DnsRecord {
            id: "d1".into(),
            key: "nas.lan".into(),
            record_type: "A".into(),
            value: "10.0.0.5".into(),
            ttl: 3600,
            enabled: true,
            ..Default::default()
        };
        let declared = DnsRecordIntent {
            ttl: Presence::Known(0),
            port: Presence::Known(0),
            ..Default::default()
        };
        let merged = reconcile::reconcile(Some(&existing), Some(&declared)).unwrap();
        assert_eq!(merged.ttl, 0);
        assert_eq!(merged.value, "10.0.0.5");
        assert_eq!(DnsRecord::field("ttl").unwrap().rule, FieldRule::Explicit);
    }

    #[test]
    fn test_label_is_hostname() {
        let record = DnsRecord {
            key: "printer.lan".into(),
            ..Default::default()
        };
        assert_eq!(record.label(), "printer.lan");
        assert_eq!(record.id(), "");
    }
}
