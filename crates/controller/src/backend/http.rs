//! HTTP backend for a live controller.
//!
//! Requests authenticate with an API key in the `X-API-KEY` header. Legacy
//! endpoints wrap every response in `{"meta": {"rc": ...}, "data": [...]}`;
//! v2 endpoints return bare JSON.

use crate::backend::Backend;
use crate::error::{Error, Result};
use crate::types::{ApiFlavor, Connection, Kind};
use serde::Deserialize;
use serde_json::Value;
use ureq::http::Response;
use ureq::Body;

#[derive(Debug, Deserialize)]
struct Envelope {
    meta: Meta,
    #[serde(default)]
    data: Vec<Value>,
}

#[derive(Debug, Deserialize)]
struct Meta {
    rc: String,
    #[serde(default)]
    msg: Option<String>,
}

/// Backend that talks to a controller over HTTPS.
///
/// # Example
///
/// ```no_run
/// use controller::backend::http::HttpBackend;
/// use controller::backend::Backend;
/// use controller::{Connection, Kind};
///
/// let backend = HttpBackend::new(Connection::new("https://192.168.1.1", "secret"));
/// let networks = backend.list(Kind::Network).unwrap();
/// println!("Found {} networks", networks.len());
/// ```
pub struct HttpBackend {
    agent: ureq::Agent,
    connection: Connection,
}

impl HttpBackend {
    /// Create a backend for the given connection settings.
    pub fn new(connection: Connection) -> Self {
        let tls = ureq::tls::TlsConfig::builder()
            .disable_verification(connection.insecure)
            .build();
        let config = ureq::Agent::config_builder()
            .timeout_global(Some(connection.timeout))
            .http_status_as_error(false)
            .tls_config(tls)
            .build();
        Self {
            agent: ureq::Agent::new_with_config(config),
            connection,
        }
    }

    pub fn connection(&self) -> &Connection {
        &self.connection
    }

    /// Turn a response into JSON, mapping error statuses to typed errors.
    fn handle(&self, kind: Kind, id: Option<&str>, mut response: Response<Body>) -> Result<Value> {
        let status = response.status().as_u16();
        log::debug!("{kind}: HTTP {status}");

        let text = response.body_mut().read_to_string()?;
        let body: Value = if text.trim().is_empty() {
            Value::Null
        } else {
            serde_json::from_str(&text).map_err(|e| Error::decode(kind, e))?
        };

        match status {
            200..=299 => {}
            401 | 403 => return Err(Error::Auth { status }),
            404 => return Err(Error::not_found(kind, id.unwrap_or_default())),
            400 | 409 | 422 => {
                return Err(Error::Rejected {
                    kind,
                    message: error_message(&body).unwrap_or_else(|| format!("HTTP {status}")),
                });
            }
            _ => return Err(Error::http(format!("HTTP {status}"), Some(status))),
        }

        match kind.flavor() {
            ApiFlavor::V2 => Ok(body),
            ApiFlavor::Legacy => {
                let envelope: Envelope =
                    serde_json::from_value(body).map_err(|e| Error::decode(kind, e))?;
                if envelope.meta.rc != "ok" {
                    let message = envelope.meta.msg.unwrap_or(envelope.meta.rc);
                    if message.contains("IdInvalid") || message.contains("NotFound") {
                        return Err(Error::not_found(kind, id.unwrap_or_default()));
                    }
                    return Err(Error::Rejected { kind, message });
                }
                Ok(Value::Array(envelope.data))
            }
        }
    }

    /// First object of a legacy `data` array, or the bare v2 object.
    fn single(&self, kind: Kind, id: &str, value: Value) -> Result<Value> {
        match value {
            Value::Array(items) => items
                .into_iter()
                .next()
                .ok_or_else(|| Error::not_found(kind, id)),
            Value::Object(_) => Ok(value),
            other => Err(Error::decode(kind, format!("expected an object, got {other}"))),
        }
    }

    fn get(&self, kind: Kind, url: &str, id: Option<&str>) -> Result<Value> {
        log::debug!("GET {url}");
        let response = self
            .agent
            .get(url)
            .header("X-API-KEY", &self.connection.api_key)
            .header("Accept", "application/json")
            .call()?;
        self.handle(kind, id, response)
    }

    fn send(&self, method: &str, kind: Kind, url: &str, id: Option<&str>, body: &Value) -> Result<Value> {
        log::debug!("{method} {url}");
        let request = match method {
            "POST" => self.agent.post(url),
            _ => self.agent.put(url),
        };
        let response = request
            .header("X-API-KEY", &self.connection.api_key)
            .header("Accept", "application/json")
            .send_json(body)?;
        self.handle(kind, id, response)
    }
}

impl Backend for HttpBackend {
    fn list(&self, kind: Kind) -> Result<Vec<Value>> {
        match self.get(kind, &self.connection.collection_url(kind), None)? {
            Value::Array(items) => Ok(items),
            Value::Null => Ok(Vec::new()),
            other => Err(Error::decode(kind, format!("expected a list, got {other}"))),
        }
    }

    fn fetch(&self, kind: Kind, id: &str) -> Result<Value> {
        match kind.flavor() {
            ApiFlavor::Legacy => {
                let value = self.get(kind, &self.connection.object_url(kind, id), Some(id))?;
                self.single(kind, id, value)
            }
            // v2 collections have no single-object GET
            ApiFlavor::V2 => self
                .list(kind)?
                .into_iter()
                .find(|item| item.get("_id").and_then(Value::as_str) == Some(id))
                .ok_or_else(|| Error::not_found(kind, id)),
        }
    }

    fn create(&self, kind: Kind, body: &Value) -> Result<Value> {
        let value = self.send("POST", kind, &self.connection.collection_url(kind), None, body)?;
        self.single(kind, "", value)
    }

    fn replace(&self, kind: Kind, id: &str, body: &Value) -> Result<Value> {
        let url = self.connection.object_url(kind, id);
        let value = self.send("PUT", kind, &url, Some(id), body)?;
        self.single(kind, id, value)
    }

    fn delete(&self, kind: Kind, id: &str) -> Result<()> {
        let url = self.connection.object_url(kind, id);
        log::debug!("DELETE {url}");
        let response = self
            .agent
            .delete(&url)
            .header("X-API-KEY", &self.connection.api_key)
            .header("Accept", "application/json")
            .call()?;
        self.handle(kind, Some(id), response).map(|_| ())
    }

    fn site(&self) -> &str {
        &self.connection.site
    }
}

/// Pull a human-readable message out of an error body.
fn error_message(body: &Value) -> Option<String> {
    body.pointer("/meta/msg")
        .or_else(|| body.get("message"))
        .or_else(|| body.get("error"))
        .and_then(Value::as_str)
        .map(str::to_string)
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_error_message_sources() {
        assert_eq!(
            error_message(&json!({ "meta": { "rc": "error", "msg": "api.err.VlanUsed" } })),
            Some("api.err.VlanUsed".to_string())
        );
        assert_eq!(
            error_message(&json!({ "message": "invalid record" })),
            Some("invalid record".to_string())
        );
        assert_eq!(error_message(&json!({ "code": 1 })), None);
    }

    #[test]
    fn test_envelope_decodes_without_data() {
        let envelope: Envelope = serde_json::from_value(json!({ "meta": { "rc": "ok" } })).unwrap();
        assert_eq!(envelope.meta.rc, "ok");
        assert!(envelope.data.is_empty());
    }

    #[test]
    fn test_backend_reports_site() {
        let mut connection = Connection::new("https://10.0.0.1", "k");
        connection.site = "branch".into();
        let backend = HttpBackend::new(connection);
        assert_eq!(backend.site(), "branch");
        assert_eq!(backend.connection().api_key, "k");
    }
}
