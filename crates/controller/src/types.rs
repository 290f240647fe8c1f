//! Core types for controller access.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;
use std::time::Duration;

/// Which REST dialect an object kind is served from.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ApiFlavor {
    /// `/api/s/{site}/rest/<segment>`, responses wrapped in `{meta, data}`
    Legacy,
    /// `/v2/api/site/{site}/<segment>`, bare JSON responses
    V2,
}

/// Kind of object managed on the controller.
///
/// Variants are listed in apply order: a kind may only reference kinds
/// that come before it.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Kind {
    /// User group (bandwidth limits)
    UserGroup,
    /// LAN / VLAN network
    Network,
    /// Wireless SSID
    Wlan,
    /// Static DNS record
    DnsRecord,
}

impl Kind {
    /// All kinds, in apply order.
    pub fn all() -> &'static [Self] {
        &[Self::UserGroup, Self::Network, Self::Wlan, Self::DnsRecord]
    }

    /// Manifest and state name (`network`, `user_group`, ...).
    pub fn name(&self) -> &'static str {
        match self {
            Self::UserGroup => "user_group",
            Self::Network => "network",
            Self::Wlan => "wlan",
            Self::DnsRecord => "dns_record",
        }
    }

    /// Path segment of the REST collection.
    pub fn segment(&self) -> &'static str {
        match self {
            Self::UserGroup => "usergroup",
            Self::Network => "networkconf",
            Self::Wlan => "wlanconf",
            Self::DnsRecord => "static-dns",
        }
    }

    pub fn flavor(&self) -> ApiFlavor {
        match self {
            Self::DnsRecord => ApiFlavor::V2,
            _ => ApiFlavor::Legacy,
        }
    }

    /// Kinds that objects of this kind may reference.
    pub fn may_reference(&self, other: Self) -> bool {
        other < *self
    }
}

impl fmt::Display for Kind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.name())
    }
}

impl FromStr for Kind {
    type Err = String;

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        Self::all()
            .iter()
            .copied()
            .find(|kind| kind.name() == s)
            .ok_or_else(|| {
                let known: Vec<_> = Self::all().iter().map(Kind::name).collect();
                format!("unknown kind '{s}' (expected one of: {})", known.join(", "))
            })
    }
}

/// Configuration for retry behavior.
#[derive(Debug, Clone, PartialEq)]
pub struct RetryConfig {
    /// Maximum number of attempts, including the first
    pub max_attempts: u32,
    /// Base delay between retries
    pub base_delay: Duration,
    /// Multiplier for exponential backoff
    pub backoff_factor: f64,
    /// Maximum delay between retries
    pub max_delay: Duration,
}

impl Default for RetryConfig {
    fn default() -> Self {
        Self {
            max_attempts: 3,
            base_delay: Duration::from_millis(500),
            backoff_factor: 2.0,
            max_delay: Duration::from_secs(10),
        }
    }
}

impl RetryConfig {
    /// Calculate the delay for a given attempt number (0-indexed).
    pub fn delay_for_attempt(&self, attempt: u32) -> Duration {
        let delay = self.base_delay.as_secs_f64() * self.backoff_factor.powi(attempt as i32);
        let capped = delay.min(self.max_delay.as_secs_f64());
        Duration::from_secs_f64(capped)
    }

    /// Create a config that never retries.
    pub fn no_retry() -> Self {
        Self {
            max_attempts: 1,
            ..Default::default()
        }
    }
}

/// Where and how to reach the controller.
#[derive(Debug, Clone, PartialEq)]
pub struct Connection {
    /// Controller base URL, e.g. `https://192.168.1.1`
    pub url: String,
    /// Site name (`default` on single-site controllers)
    pub site: String,
    /// API key sent as `X-API-KEY`
    pub api_key: String,
    /// Accept self-signed certificates
    pub insecure: bool,
    /// Per-request timeout
    pub timeout: Duration,
    /// Path prefix in front of the API (`/proxy/network` on UniFi OS consoles)
    pub api_prefix: String,
}

impl Connection {
    pub fn new(url: impl Into<String>, api_key: impl Into<String>) -> Self {
        Self {
            url: url.into(),
            site: "default".to_string(),
            api_key: api_key.into(),
            insecure: false,
            timeout: Duration::from_secs(30),
            api_prefix: "/proxy/network".to_string(),
        }
    }

    /// Base URL including the API prefix, without a trailing slash.
    pub fn base(&self) -> String {
        format!(
            "{}{}",
            self.url.trim_end_matches('/'),
            self.api_prefix.trim_end_matches('/')
        )
    }

    /// URL of a kind's collection.
    pub fn collection_url(&self, kind: Kind) -> String {
        match kind.flavor() {
            ApiFlavor::Legacy => {
                format!("{}/api/s/{}/rest/{}", self.base(), self.site, kind.segment())
            }
            ApiFlavor::V2 => {
                format!("{}/v2/api/site/{}/{}", self.base(), self.site, kind.segment())
            }
        }
    }

    /// URL of a single object.
    pub fn object_url(&self, kind: Kind, id: &str) -> String {
        format!("{}/{}", self.collection_url(kind), id)
    }
}
