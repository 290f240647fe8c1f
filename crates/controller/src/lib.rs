//! # controller
//!
//! Typed access to the object collections of a network controller.
//!
//! This crate provides:
//! - Object models ([`Network`], [`Wlan`], [`UserGroup`], [`DnsRecord`])
//!   with generated declared-intent types for reconciliation
//! - A [`Backend`](backend::Backend) abstraction over the REST API, with an
//!   HTTP implementation and an in-memory [`MockBackend`]
//! - Retry with exponential backoff for transient failures
//!
//! ## Example
//!
//! ```
//! use controller::{Client, MockBackend, Network};
//!
//! let client = Client::with_backend(Box::new(MockBackend::new()));
//!
//! let created = client
//!     .create(&Network { name: "iot".into(), vlan: 30, ..Default::default() })
//!     .unwrap();
//!
//! let fetched: Network = client.fetch(&created.id).unwrap();
//! assert_eq!(fetched.vlan, 30);
//! ```
//!
//! Updates replace the whole object. There is no revision check between a
//! fetch and the following replace, so a concurrent writer's changes made in
//! between are overwritten.

pub mod backend;
pub mod error;
pub mod model;
pub mod retry;
pub mod types;

pub use backend::MockBackend;
pub use error::{Error, ErrorCategory, Result};
pub use model::{
    DhcpServer, DhcpServerIntent, DnsRecord, DnsRecordIntent, KindVisitor, MacFilter,
    MacFilterIntent, Network, NetworkIntent, Object, Unmodeled, UserGroup, UserGroupIntent, Wlan,
    WlanIntent,
};
pub use retry::{LogCallback, RetryCallback};
pub use types::{ApiFlavor, Connection, Kind, RetryConfig};

use backend::Backend;
use backend::http::HttpBackend;
use serde_json::Value;

/// High-level typed client.
///
/// Every call goes through the retry policy; only retryable errors
/// (connectivity, 5xx, 429) are retried. Creates are not idempotent and are
/// retried only when the request never reached the controller.
pub struct Client {
    backend: Box<dyn Backend>,
    retry: RetryConfig,
    callback: Option<Box<dyn RetryCallback>>,
}

impl Client {
    /// Create a client that talks HTTP to the controller.
    pub fn connect(connection: Connection) -> Self {
        Self::with_backend(Box::new(HttpBackend::new(connection)))
    }

    /// Create a client with a custom backend (useful for testing).
    pub fn with_backend(backend: Box<dyn Backend>) -> Self {
        Self {
            backend,
            retry: RetryConfig::default(),
            callback: Some(Box::new(LogCallback)),
        }
    }

    /// Set the retry policy.
    pub fn retry(mut self, retry: RetryConfig) -> Self {
        self.retry = retry;
        self
    }

    /// Set the callback notified before each retry.
    pub fn on_retry(mut self, callback: Box<dyn RetryCallback>) -> Self {
        self.callback = Some(callback);
        self
    }

    pub fn site(&self) -> &str {
        self.backend.site()
    }

    fn call<R>(&self, op: impl FnMut() -> Result<R>) -> Result<R> {
        retry::with_retry(&self.retry, self.callback.as_deref(), op)
    }

    // =========================================================================
    // Typed operations
    // =========================================================================

    /// Fetch one object by id.
    ///
    /// # Errors
    ///
    /// Returns `Error::NotFound` if the object no longer exists.
    pub fn fetch<T: Object>(&self, id: &str) -> Result<T> {
        let value = self.call(|| self.backend.fetch(T::KIND, id))?;
        decode(value)
    }

    /// Fetch one object, mapping `NotFound` to `None`.
    pub fn try_fetch<T: Object>(&self, id: &str) -> Result<Option<T>> {
        match self.fetch(id) {
            Ok(object) => Ok(Some(object)),
            Err(e) if e.is_not_found() => Ok(None),
            Err(e) => Err(e),
        }
    }

    /// List every object of a kind.
    pub fn list<T: Object>(&self) -> Result<Vec<T>> {
        let values = self.call(|| self.backend.list(T::KIND))?;
        values.into_iter().map(decode).collect()
    }

    /// Create an object; the returned copy carries the assigned id.
    ///
    /// A timeout or server error after the request was sent is returned as
    /// is: the controller may already have stored the object.
    pub fn create<T: Object>(&self, object: &T) -> Result<T> {
        let body = encode(object)?;
        log::info!("creating {} '{}'", T::KIND, object.label());
        let value = retry::with_retry_when(
            &self.retry,
            self.callback.as_deref(),
            Error::is_unsent,
            || self.backend.create(T::KIND, &body),
        )?;
        decode(value)
    }

    /// Replace an existing object with `object` as a whole.
    pub fn replace<T: Object>(&self, object: &T) -> Result<T> {
        let id = object.id();
        if id.is_empty() {
            return Err(Error::Other(format!(
                "cannot replace {} '{}' without an id",
                T::KIND,
                object.label()
            )));
        }
        let body = encode(object)?;
        log::info!("replacing {} '{}' ({id})", T::KIND, object.label());
        let value = self.call(|| self.backend.replace(T::KIND, id, &body))?;
        decode(value)
    }

    /// Delete an object by kind and id.
    pub fn delete(&self, kind: Kind, id: &str) -> Result<()> {
        log::info!("deleting {kind} {id}");
        self.call(|| self.backend.delete(kind, id))
    }
}

fn encode<T: Object>(object: &T) -> Result<Value> {
    serde_json::to_value(object).map_err(|e| Error::decode(T::KIND, e))
}

fn decode<T: Object>(value: Value) -> Result<T> {
    serde_json::from_value(value).map_err(|e| Error::decode(T::KIND, e))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::backend::Call;
    use pretty_assertions::assert_eq;
    use serde_json::json;
    use std::time::Duration;

    fn client(mock: &MockBackend) -> Client {
        Client::with_backend(Box::new(mock.clone())).retry(RetryConfig {
            max_attempts: 3,
            base_delay: Duration::from_millis(1),
            backoff_factor: 1.0,
            max_delay: Duration::from_millis(2),
        })
    }

    #[test]
    fn test_create_then_fetch() {
        let mock = MockBackend::new();
        let client = client(&mock);
        let created = client
            .create(&UserGroup {
                name: "kids".into(),
                qos_rate_max_down: 2000,
                ..Default::default()
            })
            .unwrap();
        assert!(!created.id.is_empty());

        let fetched: UserGroup = client.fetch(&created.id).unwrap();
        assert_eq!(fetched, created);
    }

    #[test]
    fn test_create_sends_no_empty_id() {
        let mock = MockBackend::new();
        client(&mock)
            .create(&DnsRecord {
                key: "nas.lan".into(),
                ..Default::default()
            })
            .unwrap();
        let stored = mock.list(Kind::DnsRecord).unwrap();
        assert_eq!(stored[0]["key"], json!("nas.lan"));
        assert_ne!(stored[0]["_id"], json!(""));
    }

    #[test]
    fn test_try_fetch_missing_is_none() {
        let mock = MockBackend::new();
        let found: Option<Network> = client(&mock).try_fetch("gone").unwrap();
        assert!(found.is_none());
    }

    #[test]
    fn test_replace_requires_id() {
        let mock = MockBackend::new();
        let err = client(&mock).replace(&Wlan::default()).unwrap_err();
        assert!(err.to_string().contains("without an id"));
        assert!(mock.calls().is_empty());
    }

    #[test]
    fn test_transient_failures_are_retried() {
        let mock = MockBackend::new();
        mock.insert(Kind::Network, "n1", json!({ "name": "lan" }));
        mock.fail_next(2);
        let network: Network = client(&mock).fetch("n1").unwrap();
        assert_eq!(network.name, "lan");
        assert_eq!(mock.calls().len(), 3);
    }

    #[test]
    fn test_create_is_not_repeated_after_a_lost_response() {
        let mock = MockBackend::new();
        mock.lose_next_response(1);
        let err = client(&mock)
            .create(&Network {
                name: "iot".into(),
                ..Default::default()
            })
            .unwrap_err();
        assert!(err.is_retryable());
        assert_eq!(mock.count(Kind::Network), 1);
        assert_eq!(mock.calls(), vec![Call::Create(Kind::Network)]);
    }

    #[test]
    fn test_create_retries_refused_connections() {
        let mock = MockBackend::new();
        mock.fail_next(2);
        let created = client(&mock)
            .create(&Network {
                name: "iot".into(),
                ..Default::default()
            })
            .unwrap();
        assert!(!created.id.is_empty());
        assert_eq!(mock.count(Kind::Network), 1);
        assert_eq!(mock.calls().len(), 3);
    }

    #[test]
    fn test_not_found_is_not_retried() {
        let mock = MockBackend::new();
        let err = client(&mock).delete(Kind::Wlan, "w9").unwrap_err();
        assert!(err.is_not_found());
        assert_eq!(mock.calls(), vec![Call::Delete(Kind::Wlan, "w9".into())]);
    }

    #[test]
    fn test_list_decodes_every_object() {
        let mock = MockBackend::new();
        mock.insert(Kind::UserGroup, "g1", json!({ "name": "Default", "attr_no_delete": true }));
        mock.insert(Kind::UserGroup, "g2", json!({ "name": "kids" }));
        let groups: Vec<UserGroup> = client(&mock).list().unwrap();
        assert_eq!(groups.len(), 2);
        assert!(groups.iter().any(|g| g.attr_no_delete));
    }

    #[test]
    fn test_decode_error_names_kind() {
        let mock = MockBackend::new();
        mock.insert(Kind::Network, "n1", json!({ "vlan": "ten" }));
        let err = client(&mock).fetch::<Network>("n1").unwrap_err();
        assert_eq!(err.category(), ErrorCategory::Format);
    }
}
