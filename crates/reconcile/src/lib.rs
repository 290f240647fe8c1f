//! # Reconcile
//!
//! Merge a user's partial declared intent into the full current state of a
//! remote object.
//!
//! Many controller APIs only accept complete object replacement on update.
//! A declarative tool therefore has to fetch the current object, overlay
//! whatever the user declared, and submit the result. This crate is that
//! overlay step, and nothing else: it performs no I/O.
//!
//! ## Core Concepts
//!
//! - **Presence**: every declared field is [`Presence::Unset`] (no opinion),
//!   [`Presence::Known`] (explicit value) or [`Presence::Unresolved`] (not
//!   computable yet)
//! - **Shape**: a remote object type declared with [`shape!`], which also
//!   generates its intent type and field-policy table
//! - **Field rules**: `protected` fields always come from the remote object;
//!   `explicit` fields treat zero/empty as real values
//! - **MergePolicy**: how known-but-zero scalars and known-but-empty
//!   collections are treated for all other fields
//!
//! ## Example
//!
//! ```
//! use reconcile::{Presence, Reconciler, MergePolicy};
//! use serde::{Deserialize, Serialize};
//!
//! reconcile::shape! {
//!     #[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
//!     pub struct Network => NetworkIntent {
//!         protected id: String,
//!         field name: String,
//!         field vlan: u16,
//!         field dhcp_enabled: bool,
//!     }
//! }
//!
//! let existing = Network { id: "n1".into(), name: "net1".into(), vlan: 10, dhcp_enabled: true };
//! let declared = NetworkIntent {
//!     name: Presence::Known("net1-renamed".into()),
//!     dhcp_enabled: Presence::Known(false),
//!     ..Default::default()
//! };
//!
//! let merged = Reconciler::new(MergePolicy::default())
//!     .merge(Some(&existing), Some(&declared))
//!     .unwrap();
//! assert_eq!(merged.name, "net1-renamed");
//! assert_eq!(merged.vlan, 10);
//! assert!(!merged.dhcp_enabled);
//! ```

// Lets `shape!` refer to `::reconcile` from inside this crate too.
extern crate self as reconcile;

pub mod error;
pub mod merge;
pub mod policy;
pub mod presence;
pub mod reconciler;
pub mod shape;

// Re-export main types at crate root
pub use error::{Error, Result};
pub use merge::{Mergeable, coerce_field, collect_field, merge_field};
pub use policy::{EmptyCollections, FieldKind, FieldRule, FieldSpec, MergePolicy, ZeroScalars};
pub use presence::{Presence, PresenceState, UNRESOLVED_KEY};
pub use reconciler::{Reconciler, reconcile, reconcile_with};
pub use shape::Shape;
