//! Presence model for declared intent
//!
//! Every field of a declared-intent object is in exactly one of three
//! states: the user said nothing about it, the user gave a value, or the
//! value depends on something that is not known yet.

use serde::de::{self, Deserialize, Deserializer, IgnoredAny, MapAccess, Visitor};
use serde::ser::{Serialize, SerializeMap, Serializer};
use std::fmt;

/// Key of the marker table that stands for an unresolved value
///
/// Manifests and plans carry `{ "@unresolved" = <anything> }` wherever a
/// value cannot be computed yet (for example a reference to an object that
/// has not been created).
pub const UNRESOLVED_KEY: &str = "@unresolved";

/// Presence state of a single declared field
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum PresenceState {
    /// Not specified; the remote value is preserved
    Unset,
    /// Specified with an explicit value (including zero or empty)
    Known,
    /// Not computable yet; must not be merged in strict contexts
    Unresolved,
}

impl fmt::Display for PresenceState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Unset => write!(f, "unset"),
            Self::Known => write!(f, "known"),
            Self::Unresolved => write!(f, "unresolved"),
        }
    }
}

/// A declared value together with its presence
#[derive(Debug, Clone, PartialEq, Eq, Hash, Default)]
pub enum Presence<T> {
    /// The user has no opinion about this field
    #[default]
    Unset,
    /// The user declared this value
    Known(T),
    /// The value is not known until another object exists
    Unresolved,
}

impl<T> Presence<T> {
    /// Classify this field
    pub fn state(&self) -> PresenceState {
        match self {
            Self::Unset => PresenceState::Unset,
            Self::Known(_) => PresenceState::Known,
            Self::Unresolved => PresenceState::Unresolved,
        }
    }

    pub fn is_unset(&self) -> bool {
        matches!(self, Self::Unset)
    }

    pub fn is_known(&self) -> bool {
        matches!(self, Self::Known(_))
    }

    pub fn is_unresolved(&self) -> bool {
        matches!(self, Self::Unresolved)
    }

    /// Borrow the declared value, if any
    pub fn known(&self) -> Option<&T> {
        match self {
            Self::Known(value) => Some(value),
            _ => None,
        }
    }

    /// Take the declared value, if any
    pub fn into_known(self) -> Option<T> {
        match self {
            Self::Known(value) => Some(value),
            _ => None,
        }
    }

    /// Map the declared value, keeping unset/unresolved as they are
    pub fn map<U>(self, f: impl FnOnce(T) -> U) -> Presence<U> {
        match self {
            Self::Unset => Presence::Unset,
            Self::Known(value) => Presence::Known(f(value)),
            Self::Unresolved => Presence::Unresolved,
        }
    }

    pub fn as_ref(&self) -> Presence<&T> {
        match self {
            Self::Unset => Presence::Unset,
            Self::Known(value) => Presence::Known(value),
            Self::Unresolved => Presence::Unresolved,
        }
    }
}

impl<T> From<Option<T>> for Presence<T> {
    fn from(value: Option<T>) -> Self {
        value.map_or(Self::Unset, Self::Known)
    }
}

impl<T: Serialize> Serialize for Presence<T> {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        match self {
            Self::Known(value) => value.serialize(serializer),
            Self::Unset => serializer.serialize_none(),
            Self::Unresolved => {
                let mut map = serializer.serialize_map(Some(1))?;
                map.serialize_entry(UNRESOLVED_KEY, &true)?;
                map.end()
            }
        }
    }
}

/// The `{ "@unresolved" = ... }` table and nothing else
///
/// Only a map with exactly that one key matches. Sequences and other maps
/// fall through to the declared value.
struct UnresolvedMarker;

impl<'de> Deserialize<'de> for UnresolvedMarker {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        struct MarkerVisitor;

        impl<'de> Visitor<'de> for MarkerVisitor {
            type Value = UnresolvedMarker;

            fn expecting(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                write!(f, "a table with the single key `{UNRESOLVED_KEY}`")
            }

            fn visit_map<A: MapAccess<'de>>(self, mut map: A) -> Result<Self::Value, A::Error> {
                let Some(key) = map.next_key::<String>()? else {
                    return Err(de::Error::invalid_length(0, &self));
                };
                if key != UNRESOLVED_KEY {
                    return Err(de::Error::unknown_field(&key, &[UNRESOLVED_KEY]));
                }
                map.next_value::<IgnoredAny>()?;
                if map.next_key::<IgnoredAny>()?.is_some() {
                    return Err(de::Error::invalid_length(2, &self));
                }
                Ok(UnresolvedMarker)
            }
        }

        deserializer.deserialize_map(MarkerVisitor)
    }
}

#[derive(serde::Deserialize)]
#[serde(untagged)]
enum Repr<T> {
    Marker(UnresolvedMarker),
    Value(T),
    Null(()),
}

impl<'de, T: Deserialize<'de>> Deserialize<'de> for Presence<T> {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        Ok(match Repr::<T>::deserialize(deserializer)? {
            Repr::Marker(_) => Self::Unresolved,
            Repr::Value(value) => Self::Known(value),
            Repr::Null(()) => Self::Unset,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[derive(Debug, Default, serde::Deserialize, serde::Serialize)]
    struct Declared {
        #[serde(default, skip_serializing_if = "Presence::is_unset")]
        vlan: Presence<u16>,
        #[serde(default, skip_serializing_if = "Presence::is_unset")]
        name: Presence<String>,
    }

    #[test]
    fn test_classify() {
        assert_eq!(Presence::<u8>::Unset.state(), PresenceState::Unset);
        assert_eq!(Presence::Known(0u8).state(), PresenceState::Known);
        assert_eq!(Presence::<u8>::Unresolved.state(), PresenceState::Unresolved);
    }

    #[test]
    fn test_known_zero_is_still_known() {
        let p = Presence::Known(0u16);
        assert!(p.is_known());
        assert_eq!(p.known(), Some(&0));
    }

    #[test]
    fn test_from_option() {
        assert!(Presence::<String>::from(None).is_unset());
        assert_eq!(Presence::from(Some(3)), Presence::Known(3));
    }

    #[test]
    fn test_map_keeps_unresolved() {
        let p: Presence<u8> = Presence::Unresolved;
        assert!(p.map(|v| v + 1).is_unresolved());
        assert_eq!(Presence::Known(1u8).map(|v| v + 1), Presence::Known(2));
    }

    #[test]
    fn test_deserialize_missing_is_unset() {
        let declared: Declared = toml::from_str("name = \"lan\"").unwrap();
        assert!(declared.vlan.is_unset());
        assert_eq!(declared.name, Presence::Known("lan".to_string()));
    }

    #[test]
    fn test_deserialize_marker_is_unresolved() {
        let declared: Declared = toml::from_str("vlan = { \"@unresolved\" = \"network.lan.id\" }").unwrap();
        assert!(declared.vlan.is_unresolved());
    }

    #[test]
    fn test_deserialize_json_null_is_unset() {
        let declared: Declared = serde_json::from_str(r#"{"vlan": null, "name": ""}"#).unwrap();
        assert!(declared.vlan.is_unset());
        assert_eq!(declared.name, Presence::Known(String::new()));
    }

    #[test]
    fn test_serialize_skips_unset_and_marks_unresolved() {
        let declared = Declared {
            vlan: Presence::Unresolved,
            name: Presence::Unset,
        };
        let json = serde_json::to_value(&declared).unwrap();
        assert_eq!(json, serde_json::json!({ "vlan": { "@unresolved": true } }));
    }

    #[derive(Debug, Default, PartialEq, serde::Deserialize, serde::Serialize)]
    struct Lists {
        #[serde(default, skip_serializing_if = "Presence::is_unset")]
        bands: Presence<Vec<String>>,
        #[serde(default, skip_serializing_if = "Presence::is_unset")]
        limits: Presence<std::collections::BTreeMap<String, u32>>,
    }

    #[test]
    fn test_one_element_list_is_known() {
        let lists: Lists = toml::from_str("bands = [\"5g\"]").unwrap();
        assert_eq!(lists.bands, Presence::Known(vec!["5g".to_string()]));

        let lists: Lists = serde_json::from_str(r#"{"bands": ["2g"]}"#).unwrap();
        assert_eq!(lists.bands, Presence::Known(vec!["2g".to_string()]));
    }

    #[test]
    fn test_marker_shaped_values_stay_known() {
        let lists: Lists = toml::from_str("limits = { down = 10 }").unwrap();
        assert_eq!(lists.limits, Presence::Known([("down".to_string(), 10)].into()));

        let lists: Lists = toml::from_str("limits = {}").unwrap();
        assert_eq!(lists.limits, Presence::Known(Default::default()));
    }

    #[test]
    fn test_marker_with_extra_keys_is_rejected() {
        let result: Result<Declared, _> =
            toml::from_str("vlan = { \"@unresolved\" = \"network.lan.id\", other = 1 }");
        assert!(result.is_err());
    }
}
