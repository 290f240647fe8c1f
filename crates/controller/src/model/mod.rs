//! Controller object models.
//!
//! Every model is declared with [`reconcile::shape!`], which also generates
//! its declared-intent counterpart (`NetworkIntent`, `WlanIntent`, ...).
//! Remote structs carry the wire names; intents use the Rust field names.
//! Keys a model does not name are kept in its [`Unmodeled`] `extra` field.

mod dns_record;
mod network;
mod user_group;
mod wlan;

pub use dns_record::{DnsRecord, DnsRecordIntent};
pub use network::{DhcpServer, DhcpServerIntent, Network, NetworkIntent};
pub use user_group::{UserGroup, UserGroupIntent};
pub use wlan::{MacFilter, MacFilterIntent, Wlan, WlanIntent};

use crate::types::Kind;
use reconcile::{FieldKind, MergePolicy, Mergeable, Presence, Shape};
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::collections::BTreeMap;
use std::fmt;

/// A top-level object stored in a controller collection.
pub trait Object:
    Shape<Intent: Serialize + DeserializeOwned + Send + Sync>
    + Serialize
    + DeserializeOwned
    + fmt::Debug
    + PartialEq
    + Send
    + Sync
    + 'static
{
    /// Collection this object lives in
    const KIND: Kind;

    /// Server-assigned id; empty before creation
    fn id(&self) -> &str;

    /// Human-readable name shown in plans and logs
    fn label(&self) -> &str;
}

/// Operation that is generic over the object type of a [`Kind`].
///
/// Lets callers holding a runtime `Kind` run code monomorphized for the
/// matching model.
pub trait KindVisitor {
    type Output;

    fn visit<T: Object>(self) -> Self::Output;
}

impl Kind {
    /// Run `visitor` with the model type of this kind.
    pub fn visit<V: KindVisitor>(self, visitor: V) -> V::Output {
        match self {
            Kind::UserGroup => visitor.visit::<UserGroup>(),
            Kind::Network => visitor.visit::<Network>(),
            Kind::Wlan => visitor.visit::<Wlan>(),
            Kind::DnsRecord => visitor.visit::<DnsRecord>(),
        }
    }
}

/// Wire keys a model does not name.
///
/// Every model ends with a protected, flattened `extra` field of this type,
/// so a replace sends back everything the controller returned.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Unmodeled(pub BTreeMap<String, Value>);

impl Mergeable for Unmodeled {
    type Intent = Self;
    const FIELD_KIND: FieldKind = FieldKind::Collection;

    fn merge_known(existing: &Self, _declared: &Self, _policy: &MergePolicy) -> Self {
        existing.clone()
    }

    fn coerce(_declared: &Self) -> Self {
        Self::default()
    }

    fn to_intent(&self) -> Self {
        self.clone()
    }

    fn observe(&self) -> Presence<Self> {
        Presence::Unset
    }
}

pub(crate) fn is_false(value: &bool) -> bool {
    !*value
}
