//! Shapes: remote object types with a generated intent type
//!
//! A shape is declared once with [`shape!`](crate::shape). The macro emits
//! the remote struct, its intent struct (same field names, every field
//! wrapped in [`Presence`](crate::Presence)), the [`Mergeable`] and
//! [`Shape`] impls, and the static field-policy table. Because both structs
//! come from the same field list, the remote and declared shapes cannot
//! drift apart.

use crate::merge::Mergeable;
use crate::policy::{FieldRule, FieldSpec};

/// A top-level or nested object with a field-policy table
pub trait Shape: Mergeable {
    /// Type name, used in errors and logs
    const NAME: &'static str;

    /// Field-policy table, in declaration order
    const FIELDS: &'static [FieldSpec];

    /// Dotted paths of every unresolved, non-protected field
    fn unresolved_fields(declared: &Self::Intent) -> Vec<String> {
        let mut out = Vec::new();
        Self::collect_unresolved(declared, "", &mut out);
        out
    }

    /// Names of the fields always taken from the remote object
    fn protected_fields() -> impl Iterator<Item = &'static str> {
        Self::FIELDS
            .iter()
            .filter(|spec| spec.rule == FieldRule::Protected)
            .map(|spec| spec.name)
    }

    /// Look up a field's policy by name
    fn field(name: &str) -> Option<&'static FieldSpec> {
        Self::FIELDS.iter().find(|spec| spec.name == name)
    }
}

#[doc(hidden)]
#[macro_export]
macro_rules! __field_rule {
    (protected) => {
        $crate::FieldRule::Protected
    };
    (field) => {
        $crate::FieldRule::Default
    };
    (explicit) => {
        $crate::FieldRule::Explicit
    };
}

/// Declare a remote object shape and its intent counterpart
///
/// Each field is prefixed with its rule:
/// - `protected`: identity/system field, always copied from the remote object
/// - `field`: regular field, zero/empty handling follows the merge policy
/// - `explicit`: zero and empty are meaningful and always written
///
/// Attributes on a field apply to the remote struct only (typically serde
/// renames for the wire format). The calling crate must depend on `serde`
/// and on this crate under the name `reconcile`.
///
/// # Example
///
/// ```
/// use serde::{Deserialize, Serialize};
///
/// reconcile::shape! {
///     #[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
///     pub struct Portal => PortalIntent {
///         #[serde(rename = "_id")]
///         protected id: String,
///         field title: String,
///         field enabled: bool,
///         explicit timeout: u32,
///     }
/// }
///
/// let existing = Portal { id: "p1".into(), title: "Guest".into(), enabled: true, timeout: 60 };
/// let declared = PortalIntent { enabled: reconcile::Presence::Known(false), ..Default::default() };
/// let merged = reconcile::reconcile(Some(&existing), Some(&declared)).unwrap();
/// assert_eq!(merged.title, "Guest");
/// assert!(!merged.enabled);
/// ```
#[macro_export]
macro_rules! shape {
    (
        $(#[$meta:meta])*
        $vis:vis struct $name:ident => $intent:ident {
            $(
                $(#[$fmeta:meta])*
                $rule:ident $field:ident : $ty:ty
            ),* $(,)?
        }
    ) => {
        $(#[$meta])*
        $vis struct $name {
            $(
                $(#[$fmeta])*
                pub $field: $ty,
            )*
        }

        #[doc = concat!("Declared intent for [`", stringify!($name), "`].")]
        #[derive(Debug, Clone, Default, PartialEq, ::serde::Serialize, ::serde::Deserialize)]
        #[serde(deny_unknown_fields)]
        $vis struct $intent {
            $(
                #[serde(default, skip_serializing_if = "::reconcile::Presence::is_unset")]
                pub $field: $crate::Presence<<$ty as $crate::Mergeable>::Intent>,
            )*
        }

        impl $crate::Mergeable for $name {
            type Intent = $intent;
            const FIELD_KIND: $crate::FieldKind = $crate::FieldKind::Composite;

            fn merge_known(
                existing: &Self,
                declared: &$intent,
                policy: &$crate::MergePolicy,
            ) -> Self {
                Self {
                    $(
                        $field: $crate::merge_field(
                            stringify!($field),
                            &existing.$field,
                            &declared.$field,
                            $crate::__field_rule!($rule),
                            policy,
                        ),
                    )*
                }
            }

            fn coerce(declared: &$intent) -> Self {
                Self {
                    $(
                        $field: $crate::coerce_field::<$ty>(
                            &declared.$field,
                            $crate::__field_rule!($rule),
                        ),
                    )*
                }
            }

            fn to_intent(&self) -> $intent {
                $intent {
                    $(
                        $field: $crate::Presence::Known(
                            <$ty as $crate::Mergeable>::to_intent(&self.$field),
                        ),
                    )*
                }
            }

            fn observe(&self) -> $crate::Presence<$intent> {
                $crate::Presence::Known($intent {
                    $(
                        $field: <$ty as $crate::Mergeable>::observe(&self.$field),
                    )*
                })
            }

            fn collect_unresolved(declared: &$intent, path: &str, out: &mut Vec<String>) {
                $(
                    $crate::collect_field::<$ty>(
                        stringify!($field),
                        &declared.$field,
                        $crate::__field_rule!($rule),
                        path,
                        out,
                    );
                )*
            }
        }

        impl $crate::Shape for $name {
            const NAME: &'static str = stringify!($name);
            const FIELDS: &'static [$crate::FieldSpec] = &[
                $(
                    $crate::FieldSpec {
                        name: stringify!($field),
                        kind: <$ty as $crate::Mergeable>::FIELD_KIND,
                        rule: $crate::__field_rule!($rule),
                    },
                )*
            ];
        }
    };
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::policy::FieldKind;
    use crate::presence::Presence;
    use pretty_assertions::assert_eq;
    use serde::{Deserialize, Serialize};

    crate::shape! {
        #[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
        pub struct Relay => RelayIntent {
            field enabled: bool,
            field servers: Vec<String>,
        }
    }

    crate::shape! {
        #[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
        pub struct Segment => SegmentIntent {
            #[serde(rename = "_id")]
            protected id: String,
            protected site_id: String,
            field name: String,
            field vlan: u16,
            field relay: Relay,
            explicit lease_time: u32,
        }
    }

    #[test]
    fn test_field_table() {
        let names: Vec<_> = Segment::FIELDS.iter().map(|f| f.name).collect();
        assert_eq!(names, vec!["id", "site_id", "name", "vlan", "relay", "lease_time"]);
        assert_eq!(Segment::field("relay").unwrap().kind, FieldKind::Composite);
        assert_eq!(Segment::field("vlan").unwrap().kind, FieldKind::Scalar);
        assert_eq!(Relay::field("servers").unwrap().kind, FieldKind::Collection);
        assert_eq!(Segment::field("lease_time").unwrap().rule, FieldRule::Explicit);
        assert!(Segment::field("missing").is_none());
    }

    #[test]
    fn test_protected_fields() {
        let protected: Vec<_> = Segment::protected_fields().collect();
        assert_eq!(protected, vec!["id", "site_id"]);
        assert_eq!(Segment::NAME, "Segment");
    }

    #[test]
    fn test_unresolved_paths_recurse() {
        let declared = SegmentIntent {
            id: Presence::Unresolved,
            vlan: Presence::Unresolved,
            relay: Presence::Known(RelayIntent {
                servers: Presence::Unresolved,
                ..Default::default()
            }),
            ..Default::default()
        };
        assert_eq!(
            Segment::unresolved_fields(&declared),
            vec!["vlan".to_string(), "relay.servers".to_string()]
        );
    }

    #[test]
    fn test_observe_normalizes_empty_collections() {
        let remote = Segment {
            id: "1".into(),
            name: "lan".into(),
            ..Default::default()
        };
        let observed = remote.observe().into_known().unwrap();
        assert_eq!(observed.name, Presence::Known("lan".to_string()));
        let relay = observed.relay.into_known().unwrap();
        assert!(relay.servers.is_unset());
        assert_eq!(relay.enabled, Presence::Known(false));
    }

    #[test]
    fn test_intent_uses_rust_field_names() {
        let declared: SegmentIntent = toml::from_str(
            r#"
            name = "iot"
            [relay]
            servers = ["10.0.0.2"]
            "#,
        )
        .unwrap();
        assert_eq!(declared.name, Presence::Known("iot".to_string()));
        assert!(declared.vlan.is_unset());
        let relay = declared.relay.known().unwrap();
        assert_eq!(relay.servers, Presence::Known(vec!["10.0.0.2".to_string()]));
    }

    #[test]
    fn test_intent_rejects_unknown_fields() {
        let result: Result<SegmentIntent, _> = toml::from_str("vlna = 10");
        assert!(result.is_err());
    }

    #[test]
    fn test_remote_uses_wire_names() {
        let remote: Segment =
            serde_json::from_str(r#"{"_id":"a1","site_id":"s","name":"lan","vlan":1,"relay":{"enabled":true,"servers":[]},"lease_time":0}"#)
                .unwrap();
        assert_eq!(remote.id, "a1");
        assert!(remote.relay.enabled);
    }
}
