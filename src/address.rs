//! Resource addresses (`<kind>.<name>`)

use anyhow::{Context, Result, bail};
use controller::Kind;
use regex::Regex;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;
use std::sync::LazyLock;

static NAME_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"^[A-Za-z0-9][A-Za-z0-9_-]*$").unwrap_or_else(|e| panic!("invalid name regex: {e}"))
});

/// Identifies one managed object, e.g. `network.lan`.
///
/// Ordering follows apply order: kind first, then name.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct Address {
    pub kind: Kind,
    pub name: String,
}

impl Address {
    pub fn new(kind: Kind, name: impl Into<String>) -> Result<Self> {
        let name = name.into();
        if !NAME_RE.is_match(&name) {
            bail!(
                "invalid {kind} name '{name}': use letters, digits, '_' and '-', starting with a letter or digit"
            );
        }
        Ok(Self { kind, name })
    }
}

impl fmt::Display for Address {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}.{}", self.kind, self.name)
    }
}

impl FromStr for Address {
    type Err = anyhow::Error;

    fn from_str(s: &str) -> Result<Self> {
        let (kind, name) = s
            .split_once('.')
            .with_context(|| format!("invalid address '{s}': expected <kind>.<name>"))?;
        let kind = kind.parse::<Kind>().map_err(anyhow::Error::msg)?;
        Self::new(kind, name)
    }
}

impl TryFrom<String> for Address {
    type Error = anyhow::Error;

    fn try_from(value: String) -> Result<Self> {
        value.parse()
    }
}

impl From<Address> for String {
    fn from(address: Address) -> Self {
        address.to_string()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_address() {
        let address: Address = "network.lan".parse().unwrap();
        assert_eq!(address.kind, Kind::Network);
        assert_eq!(address.name, "lan");
        assert_eq!(address.to_string(), "network.lan");
    }

    #[test]
    fn test_parse_rejects_bad_addresses() {
        assert!("lan".parse::<Address>().is_err());
        assert!("router.lan".parse::<Address>().is_err());
        assert!("network.".parse::<Address>().is_err());
        assert!("network.a.b".parse::<Address>().is_err());
    }

    #[test]
    fn test_ordering_follows_kind_order() {
        let mut addresses: Vec<Address> = ["wlan.home", "network.lan", "user_group.kids", "network.iot"]
            .iter()
            .map(|s| s.parse().unwrap())
            .collect();
        addresses.sort();
        let names: Vec<_> = addresses.iter().map(ToString::to_string).collect();
        assert_eq!(
            names,
            vec!["user_group.kids", "network.iot", "network.lan", "wlan.home"]
        );
    }
}
