//! Per-object lifecycle operations
//!
//! Each operation is generic over the model type so the same code path
//! serves every kind. Callers holding a runtime [`Kind`](controller::Kind)
//! reach these through a [`KindVisitor`](controller::KindVisitor).

use anyhow::{Context, Result, bail};
use controller::{Client, Kind, Object};
use reconcile::Reconciler;

use crate::address::Address;
use crate::manifest;
use crate::state::State;

/// Result of [`update`]
#[derive(Debug, Clone, PartialEq)]
pub enum UpdateOutcome<T> {
    /// Merged object differed and was written
    Replaced(T),
    /// Merged object equals the remote one; nothing was sent
    Unchanged(T),
    /// Remote object no longer exists
    Missing,
}

/// Fetch the remote object, `None` if it was deleted out of band
pub fn read<T: Object>(client: &Client, id: &str) -> Result<Option<T>> {
    client
        .try_fetch::<T>(id)
        .with_context(|| format!("Failed to read {} {id}", T::KIND))
}

/// Create an object from declared intent alone
pub fn create<T: Object>(client: &Client, reconciler: &Reconciler, declared: &T::Intent) -> Result<T> {
    reconciler.check::<T>(declared)?;
    let object = reconciler.merge::<T>(None, Some(declared))?;
    let created = client
        .create(&object)
        .with_context(|| format!("Failed to create {} '{}'", T::KIND, object.label()))?;
    if created.id().is_empty() {
        bail!("Controller returned {} '{}' without an id", T::KIND, created.label());
    }
    Ok(created)
}

/// Fetch, merge declared intent, and replace when the result differs
pub fn update<T: Object>(
    client: &Client,
    reconciler: &Reconciler,
    id: &str,
    declared: &T::Intent,
) -> Result<UpdateOutcome<T>> {
    reconciler.check::<T>(declared)?;
    let Some(existing) = read::<T>(client, id)? else {
        return Ok(UpdateOutcome::Missing);
    };

    let (merged, changed) = reconciler.merge_changed(&existing, declared)?;
    if !changed {
        log::debug!("{} {id} already matches declared intent", T::KIND);
        return Ok(UpdateOutcome::Unchanged(existing));
    }

    let replaced = client
        .replace(&merged)
        .with_context(|| format!("Failed to update {} '{}'", T::KIND, merged.label()))?;
    Ok(UpdateOutcome::Replaced(replaced))
}

/// Delete an object; returns `false` if it was already gone
pub fn delete(client: &Client, kind: Kind, id: &str) -> Result<bool> {
    match client.delete(kind, id) {
        Ok(()) => Ok(true),
        Err(e) if e.is_not_found() => {
            log::info!("{kind} {id} was already deleted");
            Ok(false)
        }
        Err(e) => Err(e).with_context(|| format!("Failed to delete {kind} {id}")),
    }
}

/// Adopt an existing object under `address` and render its manifest entry
pub fn import<T: Object>(
    client: &Client,
    state: &mut State,
    address: &Address,
    id: &str,
) -> Result<String> {
    if let Some(owner) = state.address_of(T::KIND, id)
        && owner != address
    {
        bail!("{} {id} is already managed as {owner}", T::KIND);
    }
    if let Some(tracked) = state.get(address)
        && tracked.id != id
    {
        bail!(
            "{address} already tracks {} {}; remove it from state first",
            T::KIND,
            tracked.id
        );
    }

    let Some(object) = read::<T>(client, id)? else {
        bail!("{} {id} does not exist on the controller", T::KIND);
    };
    state.track(address, object.id(), client.site());
    manifest::render(address, &object)
}
