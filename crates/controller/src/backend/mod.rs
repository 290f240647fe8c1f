//! Backend trait and implementations for controller collections.
//!
//! Backends move raw JSON objects; typing happens in [`Client`](crate::Client).
//! [`http::HttpBackend`] talks to a real controller.
//!
//! # Testing
//!
//! Use [`MockBackend`] for testing without network access:
//!
//! ```
//! use controller::backend::{Backend, MockBackend};
//! use controller::Kind;
//! use serde_json::json;
//!
//! let mock = MockBackend::new();
//! let created = mock.create(Kind::Network, &json!({ "name": "lan" })).unwrap();
//! let id = created["_id"].as_str().unwrap();
//!
//! assert_eq!(mock.fetch(Kind::Network, id).unwrap()["name"], "lan");
//! ```

pub mod http;

use crate::error::{Error, Result};
use crate::types::Kind;
use serde_json::Value;
use std::collections::{BTreeMap, HashMap};
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

/// Backend trait for controller collections.
///
/// Updates are full replacements: `replace` overwrites the stored object
/// with `body` as a whole.
pub trait Backend: Send + Sync {
    /// List every object of a kind.
    fn list(&self, kind: Kind) -> Result<Vec<Value>>;

    /// Fetch one object.
    ///
    /// # Errors
    ///
    /// Returns `Error::NotFound` if no object has this id.
    fn fetch(&self, kind: Kind, id: &str) -> Result<Value>;

    /// Create an object and return it as stored, with its assigned id.
    fn create(&self, kind: Kind, body: &Value) -> Result<Value>;

    /// Replace an existing object and return it as stored.
    fn replace(&self, kind: Kind, id: &str, body: &Value) -> Result<Value>;

    /// Delete an object.
    fn delete(&self, kind: Kind, id: &str) -> Result<()>;

    /// Site the backend operates on.
    fn site(&self) -> &str;
}

/// A request recorded by [`MockBackend`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Call {
    List(Kind),
    Fetch(Kind, String),
    Create(Kind),
    Replace(Kind, String),
    Delete(Kind, String),
}

#[derive(Debug, Default)]
struct MockState {
    objects: HashMap<Kind, BTreeMap<String, Value>>,
    calls: Vec<Call>,
    next_id: u64,
    failures: u32,
    lost_responses: u32,
}

impl MockState {
    /// Hand back a write result, unless its response is to be lost
    fn respond(&mut self, value: Value) -> Result<Value> {
        if self.lost_responses > 0 {
            self.lost_responses -= 1;
            return Err(Error::http("mock: response lost after write", None));
        }
        Ok(value)
    }
}

/// In-memory backend for testing without network access.
///
/// Assigns ids on create, records every call, and can be told to fail the
/// next few requests before they arrive, or to apply the next writes and
/// then lose their responses.
#[derive(Debug, Clone, Default)]
pub struct MockBackend {
    state: Arc<Mutex<MockState>>,
}

impl MockBackend {
    /// Create a new empty mock backend.
    pub fn new() -> Self {
        Self::default()
    }

    fn state(&self) -> MutexGuard<'_, MockState> {
        self.state.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Store an object as if it already existed on the controller.
    pub fn insert(&self, kind: Kind, id: impl Into<String>, mut object: Value) {
        let id = id.into();
        object["_id"] = Value::String(id.clone());
        self.state().objects.entry(kind).or_default().insert(id, object);
    }

    /// Remove an object behind the client's back.
    pub fn remove(&self, kind: Kind, id: &str) -> Option<Value> {
        self.state().objects.get_mut(&kind)?.remove(id)
    }

    /// Get a stored object without recording a call.
    pub fn get(&self, kind: Kind, id: &str) -> Option<Value> {
        self.state().objects.get(&kind)?.get(id).cloned()
    }

    /// Number of stored objects of a kind.
    pub fn count(&self, kind: Kind) -> usize {
        self.state().objects.get(&kind).map_or(0, BTreeMap::len)
    }

    /// Calls made so far, oldest first.
    pub fn calls(&self) -> Vec<Call> {
        self.state().calls.clone()
    }

    /// Refuse the next `times` requests as if the connection failed.
    pub fn fail_next(&self, times: u32) {
        self.state().failures = times;
    }

    /// Apply the next `times` creates or replaces, then fail with a
    /// transport error as if the response never arrived.
    pub fn lose_next_response(&self, times: u32) {
        self.state().lost_responses = times;
    }

    fn begin(&self, call: Call) -> Result<MutexGuard<'_, MockState>> {
        let mut state = self.state();
        state.calls.push(call);
        if state.failures > 0 {
            state.failures -= 1;
            return Err(Error::Connect("mock: connection refused".to_string()));
        }
        Ok(state)
    }
}

impl Backend for MockBackend {
    fn list(&self, kind: Kind) -> Result<Vec<Value>> {
        let state = self.begin(Call::List(kind))?;
        Ok(state
            .objects
            .get(&kind)
            .map(|objects| objects.values().cloned().collect())
            .unwrap_or_default())
    }

    fn fetch(&self, kind: Kind, id: &str) -> Result<Value> {
        let state = self.begin(Call::Fetch(kind, id.to_string()))?;
        state
            .objects
            .get(&kind)
            .and_then(|objects| objects.get(id))
            .cloned()
            .ok_or_else(|| Error::not_found(kind, id))
    }

    fn create(&self, kind: Kind, body: &Value) -> Result<Value> {
        let mut state = self.begin(Call::Create(kind))?;
        if !body.is_object() {
            return Err(Error::Rejected {
                kind,
                message: "body must be a JSON object".to_string(),
            });
        }
        state.next_id += 1;
        let id = format!("{:024x}", state.next_id);
        let mut stored = body.clone();
        stored["_id"] = Value::String(id.clone());
        state
            .objects
            .entry(kind)
            .or_default()
            .insert(id, stored.clone());
        state.respond(stored)
    }

    fn replace(&self, kind: Kind, id: &str, body: &Value) -> Result<Value> {
        let mut state = self.begin(Call::Replace(kind, id.to_string()))?;
        let slot = state
            .objects
            .get_mut(&kind)
            .and_then(|objects| objects.get_mut(id))
            .ok_or_else(|| Error::not_found(kind, id))?;
        let mut stored = body.clone();
        stored["_id"] = Value::String(id.to_string());
        *slot = stored.clone();
        state.respond(stored)
    }

    fn delete(&self, kind: Kind, id: &str) -> Result<()> {
        let mut state = self.begin(Call::Delete(kind, id.to_string()))?;
        state
            .objects
            .get_mut(&kind)
            .and_then(|objects| objects.remove(id))
            .map(|_| ())
            .ok_or_else(|| Error::not_found(kind, id))
    }

    fn site(&self) -> &str {
        "default"
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_mock_backend_new_is_empty() {
        let mock = MockBackend::new();
        assert!(mock.list(Kind::Wlan).unwrap().is_empty());
        assert_eq!(mock.calls(), vec![Call::List(Kind::Wlan)]);
    }

    #[test]
    fn test_create_assigns_distinct_ids() {
        let mock = MockBackend::new();
        let a = mock.create(Kind::Network, &json!({ "name": "a" })).unwrap();
        let b = mock.create(Kind::Network, &json!({ "name": "b" })).unwrap();
        assert_ne!(a["_id"], b["_id"]);
        assert_eq!(mock.count(Kind::Network), 2);
    }

    #[test]
    fn test_replace_overwrites_whole_object() {
        let mock = MockBackend::new();
        mock.insert(Kind::Network, "n1", json!({ "name": "lan", "vlan": 10 }));
        mock.replace(Kind::Network, "n1", &json!({ "name": "lan2" }))
            .unwrap();
        let stored = mock.get(Kind::Network, "n1").unwrap();
        assert_eq!(stored, json!({ "_id": "n1", "name": "lan2" }));
    }

    #[test]
    fn test_missing_objects_are_not_found() {
        let mock = MockBackend::new();
        assert!(mock.fetch(Kind::Wlan, "x").unwrap_err().is_not_found());
        assert!(mock.replace(Kind::Wlan, "x", &json!({})).unwrap_err().is_not_found());
        assert!(mock.delete(Kind::Wlan, "x").unwrap_err().is_not_found());
    }

    #[test]
    fn test_fail_next_injects_retryable_errors() {
        let mock = MockBackend::new();
        mock.fail_next(1);
        let err = mock.list(Kind::Network).unwrap_err();
        assert!(err.is_retryable());
        assert!(err.is_unsent());
        assert!(mock.list(Kind::Network).is_ok());
    }

    #[test]
    fn test_lost_response_still_stores_the_write() {
        let mock = MockBackend::new();
        mock.lose_next_response(1);
        let err = mock.create(Kind::Network, &json!({ "name": "lan" })).unwrap_err();
        assert!(!err.is_unsent());
        assert_eq!(mock.count(Kind::Network), 1);
    }

    #[test]
    fn test_create_rejects_non_objects() {
        let mock = MockBackend::new();
        let err = mock.create(Kind::DnsRecord, &json!([1, 2])).unwrap_err();
        assert!(matches!(err, Error::Rejected { .. }));
    }
}
