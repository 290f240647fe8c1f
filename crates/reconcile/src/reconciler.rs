//! Reconciliation entry points
//!
//! These functions are pure: they never mutate their inputs and always
//! return a fresh value. The surrounding fetch → reconcile → replace
//! sequence is not transactional; nothing here detects a concurrent change
//! to the remote object between the fetch and the replace.

use crate::error::{Error, Result};
use crate::policy::MergePolicy;
use crate::shape::Shape;

/// Merge declared intent into an existing object with the default policy
///
/// - both present: field-by-field merge
/// - only `declared`: declared intent coerced to a full object
/// - only `existing`: a copy of `existing`
/// - neither: `None`
pub fn reconcile<T: Shape>(existing: Option<&T>, declared: Option<&T::Intent>) -> Option<T> {
    reconcile_with(&MergePolicy::default(), existing, declared)
}

/// Merge declared intent into an existing object under `policy`
pub fn reconcile_with<T: Shape>(
    policy: &MergePolicy,
    existing: Option<&T>,
    declared: Option<&T::Intent>,
) -> Option<T> {
    match (existing, declared) {
        (Some(existing), Some(declared)) => Some(T::merge_known(existing, declared, policy)),
        (Some(existing), None) => Some(existing.clone()),
        (None, Some(declared)) => Some(T::coerce(declared)),
        (None, None) => None,
    }
}

/// Configured reconciler
///
/// In strict mode (the default) any unresolved field is an error instead of
/// being treated as unset. Use non-strict mode only for previews where
/// unresolved values are expected.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Reconciler {
    policy: MergePolicy,
    strict: bool,
}

impl Default for Reconciler {
    fn default() -> Self {
        Self::new(MergePolicy::default())
    }
}

impl Reconciler {
    /// Create a strict reconciler with the given policy
    pub fn new(policy: MergePolicy) -> Self {
        Self {
            policy,
            strict: true,
        }
    }

    /// Create a reconciler that treats unresolved fields as unset
    pub fn lenient(policy: MergePolicy) -> Self {
        Self {
            policy,
            strict: false,
        }
    }

    pub fn policy(&self) -> &MergePolicy {
        &self.policy
    }

    pub fn is_strict(&self) -> bool {
        self.strict
    }

    /// Fail if strict and `declared` still has unresolved fields
    pub fn check<T: Shape>(&self, declared: &T::Intent) -> Result<()> {
        if !self.strict {
            return Ok(());
        }
        let fields = T::unresolved_fields(declared);
        if fields.is_empty() {
            Ok(())
        } else {
            Err(Error::Unresolved {
                shape: T::NAME,
                fields,
            })
        }
    }

    /// Merge `declared` into `existing`
    pub fn merge<T: Shape>(&self, existing: Option<&T>, declared: Option<&T::Intent>) -> Result<T> {
        if let Some(declared) = declared {
            self.check::<T>(declared)?;
        }
        reconcile_with(&self.policy, existing, declared)
            .ok_or(Error::NothingToReconcile { shape: T::NAME })
    }

    /// Merge `declared` into `existing` and report whether anything changed
    pub fn merge_changed<T>(&self, existing: &T, declared: &T::Intent) -> Result<(T, bool)>
    where
        T: Shape + PartialEq,
    {
        let merged = self.merge(Some(existing), Some(declared))?;
        let changed = merged != *existing;
        Ok((merged, changed))
    }
}
