use super::Object;
use crate::types::Kind;
use serde::{Deserialize, Serialize};

reconcile::shape! {
    /// A client user group with bandwidth limits (`usergroup`).
    ///
    /// Rates are in kbps; `-1` means unlimited.
    #[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
    #[serde(default)]
    pub struct UserGroup => UserGroupIntent {
        #[serde(rename = "_id", skip_serializing_if = "String::is_empty")]
        protected id: String,
        #[serde(skip_serializing_if = "String::is_empty")]
        protected site_id: String,
        #[serde(skip_serializing_if = "super::is_false")]
        protected attr_no_delete: bool,
        #[serde(skip_serializing_if = "String::is_empty")]
        protected attr_hidden_id: String,
        field name: String,
        field qos_rate_max_down: i32,
        field qos_rate_max_up: i32,
        #[serde(flatten)]
        protected extra: super::Unmodeled,
    }
}

impl Object for UserGroup {
    const KIND: Kind = Kind::UserGroup;

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
    use reconcile::Presence;

    #[test]
    fn test_default_group_keeps_system_attributes() {
        let existing: UserGroup = serde_json::from_str(
            r#"{"_id":"g0","site_id":"s1","attr_no_delete":true,"attr_hidden_id":"Default","name":"Default","qos_rate_max_down":-1,"qos_rate_max_up":-1}"#,
        )
        .unwrap();
        let declared = UserGroupIntent {
            attr_no_delete: Presence::Known(false),
            qos_rate_max_down: Presence::Known(50_000),
            ..Default::default()
        };
        let merged = reconcile::reconcile(Some(&existing), Some(&declared)).unwrap();
        assert!(merged.attr_no_delete);
        assert_eq!(merged.qos_rate_max_down, 50_000);
        assert_eq!(merged.qos_rate_max_up, -1);
    }
}
