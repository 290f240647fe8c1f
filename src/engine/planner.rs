//! Plan computation
//!
//! Compares the manifest and state against the controller and decides, per
//! address, what `apply` would do. Remote reads run on a bounded thread
//! pool; nothing is written.

use anyhow::{Context, Result};
use controller::{Client, KindVisitor, Object};
use rayon::prelude::*;
use reconcile::{Reconciler, Shape, UNRESOLVED_KEY};
use serde_json::{Map, Value};
use std::collections::{BTreeMap, BTreeSet};
use std::fmt;

use crate::address::Address;
use crate::manifest::Manifest;
use crate::state::State;

use super::lifecycle;

/// What apply will do with one address
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Action {
    Create,
    Update,
    NoChange,
    Delete,
    /// Tracked, but deleted on the controller out of band
    Recreate,
}

impl Action {
    pub fn is_change(self) -> bool {
        self != Self::NoChange
    }
}

impl fmt::Display for Action {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            Self::Create => "create",
            Self::Update => "update",
            Self::NoChange => "no change",
            Self::Delete => "delete",
            Self::Recreate => "recreate",
        };
        f.write_str(s)
    }
}

/// One top-level field that will change
#[derive(Debug, Clone, PartialEq)]
pub struct FieldChange {
    pub field: String,
    pub before: Option<Value>,
    /// `None` when the value is only known after earlier steps apply
    pub after: Option<Value>,
    /// Objects an unresolved value is waiting for
    pub waiting_on: Vec<Address>,
}

impl FieldChange {
    pub fn is_unresolved(&self) -> bool {
        self.after.is_none()
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct PlannedChange {
    pub address: Address,
    pub action: Action,
    /// Controller id, when the object is tracked
    pub id: Option<String>,
    pub changes: Vec<FieldChange>,
}

/// Ordered set of planned changes
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Plan {
    pub entries: Vec<PlannedChange>,
}

impl Plan {
    pub fn has_changes(&self) -> bool {
        self.entries.iter().any(|e| e.action.is_change())
    }

    pub fn count(&self, action: Action) -> usize {
        self.entries.iter().filter(|e| e.action == action).count()
    }

    /// Entries that change something
    pub fn changes(&self) -> impl Iterator<Item = &PlannedChange> {
        self.entries.iter().filter(|e| e.action.is_change())
    }

    pub fn get(&self, address: &Address) -> Option<&PlannedChange> {
        self.entries.iter().find(|e| &e.address == address)
    }

    /// Plan deleting tracked objects, all of them or just `target`
    pub fn destroy(state: &State, target: Option<&Address>) -> Result<Self> {
        if let Some(target) = target
            && state.get(target).is_none()
        {
            anyhow::bail!("{target} is not tracked in state");
        }
        let entries = state
            .resources
            .iter()
            .filter(|(address, _)| target.is_none_or(|t| t == *address))
            .map(|(address, tracked)| PlannedChange {
                address: address.clone(),
                action: Action::Delete,
                id: Some(tracked.id.clone()),
                changes: Vec::new(),
            })
            .collect();
        Ok(Self { entries })
    }
}

/// Inputs shared by every planning task
pub struct Planner<'a> {
    pub client: &'a Client,
    pub manifest: &'a Manifest,
    pub state: &'a State,
    /// Lenient: unresolved references are expected while planning
    pub reconciler: Reconciler,
    pub jobs: usize,
}

impl Planner<'_> {
    /// Compute the full plan
    pub fn plan(&self) -> Result<Plan> {
        let declared: Vec<&Address> = self.manifest.addresses().collect();
        log::info!(
            "Planning {} declared resources with {} jobs",
            declared.len(),
            self.jobs
        );

        let pool = rayon::ThreadPoolBuilder::new()
            .num_threads(self.jobs.max(1))
            .build()
            .context("Failed to create planning thread pool")?;

        let mut entries: Vec<PlannedChange> = pool.install(|| {
            declared
                .par_iter()
                .map(|&address| {
                    address.kind.visit(PlanEntry {
                        planner: self,
                        address,
                    })
                })
                .collect::<Result<Vec<_>>>()
        })?;

        for (address, tracked) in &self.state.resources {
            if !self.manifest.contains(address) {
                entries.push(PlannedChange {
                    address: address.clone(),
                    action: Action::Delete,
                    id: Some(tracked.id.clone()),
                    changes: Vec::new(),
                });
            }
        }

        entries.sort_by(|a, b| a.address.cmp(&b.address));
        Ok(Plan { entries })
    }
}

struct PlanEntry<'a> {
    planner: &'a Planner<'a>,
    address: &'a Address,
}

impl KindVisitor for PlanEntry<'_> {
    type Output = Result<PlannedChange>;

    fn visit<T: Object>(self) -> Self::Output {
        let Planner {
            client,
            manifest,
            state,
            reconciler,
            ..
        } = self.planner;
        let address = self.address;
        let declared = manifest.bind::<T>(address, state)?;
        let pending = manifest.pending(address, state)?;

        let Some(id) = state.id_of(address) else {
            return Ok(PlannedChange {
                address: address.clone(),
                action: Action::Create,
                id: None,
                changes: declared_fields::<T>(&declared, &pending)?,
            });
        };

        let Some(existing) = lifecycle::read::<T>(client, id)? else {
            log::warn!("{address} ({id}) no longer exists on the controller");
            return Ok(PlannedChange {
                address: address.clone(),
                action: Action::Recreate,
                id: Some(id.to_string()),
                changes: declared_fields::<T>(&declared, &pending)?,
            });
        };

        let merged = reconciler.merge(Some(&existing), Some(&declared))?;
        let changes = changed_fields::<T>(&existing, &merged, &declared, &pending)?;
        let action = if changes.is_empty() {
            Action::NoChange
        } else {
            Action::Update
        };
        Ok(PlannedChange {
            address: address.clone(),
            action,
            id: Some(id.to_string()),
            changes,
        })
    }
}

// ============================================================================
// Field diffs
// ============================================================================

fn intent_fields<I: serde::Serialize>(intent: &I) -> Result<Map<String, Value>> {
    match serde_json::to_value(intent).context("Failed to encode intent")? {
        Value::Object(map) => Ok(map),
        _ => Ok(Map::new()),
    }
}

fn is_marker(value: &Value) -> bool {
    matches!(value, Value::Object(map) if map.contains_key(UNRESOLVED_KEY))
}

/// Top-level field names holding an unresolved value somewhere below
fn unresolved_roots<T: Object>(declared: &T::Intent) -> BTreeSet<String> {
    T::unresolved_fields(declared)
        .into_iter()
        .map(|path| {
            path.split(['.', '['])
                .next()
                .unwrap_or_default()
                .to_string()
        })
        .collect()
}

type Pending = BTreeMap<String, Vec<Address>>;

fn pending_targets(pending: &Pending, field: &str) -> Vec<Address> {
    pending.get(field).cloned().unwrap_or_default()
}

/// Fields a create would set: everything declared
fn declared_fields<T: Object>(declared: &T::Intent, pending: &Pending) -> Result<Vec<FieldChange>> {
    let unresolved = unresolved_roots::<T>(declared);
    let fields = intent_fields(declared)?;
    Ok(fields
        .into_iter()
        .filter(|(field, _)| T::field(field).is_none_or(|spec| !spec.is_protected()))
        .map(|(field, value)| {
            let after = if unresolved.contains(&field) || is_marker(&value) {
                None
            } else {
                Some(value)
            };
            let waiting_on = if after.is_none() {
                pending_targets(pending, &field)
            } else {
                Vec::new()
            };
            FieldChange {
                field,
                before: None,
                after,
                waiting_on,
            }
        })
        .collect())
}

/// Fields that differ between the remote object and the merge result
fn changed_fields<T: Object>(
    existing: &T,
    merged: &T,
    declared: &T::Intent,
    pending: &Pending,
) -> Result<Vec<FieldChange>> {
    let before = intent_fields(&existing.to_intent())?;
    let after = intent_fields(&merged.to_intent())?;
    let unresolved = unresolved_roots::<T>(declared);

    let mut changes = Vec::new();
    for spec in T::FIELDS.iter().filter(|spec| !spec.is_protected()) {
        let old = before.get(spec.name).cloned();
        let new = after.get(spec.name).cloned();
        if unresolved.contains(spec.name) {
            changes.push(FieldChange {
                field: spec.name.to_string(),
                before: old,
                after: None,
                waiting_on: pending_targets(pending, spec.name),
            });
        } else if old != new {
            changes.push(FieldChange {
                field: spec.name.to_string(),
                before: old,
                after: new,
                waiting_on: Vec::new(),
            });
        }
    }
    Ok(changes)
}
