//! Type-directed merge of declared values into remote values
//!
//! [`Mergeable`] is implemented for scalars and collections here and for
//! composite objects by the [`shape!`](crate::shape) macro. The per-field
//! decision (protected, unset, vacant, known) lives in [`merge_field`] so
//! every kind goes through the same policy.

use crate::policy::{FieldKind, FieldRule, MergePolicy};
use crate::presence::Presence;
use std::collections::{BTreeMap, BTreeSet};
use std::fmt;

/// A remote value that declared intent can be merged into
pub trait Mergeable: Clone + Default {
    /// Declared-shape counterpart of this value
    type Intent: Clone + fmt::Debug + PartialEq;

    /// Structural kind, used by the field-policy table
    const FIELD_KIND: FieldKind;

    /// Merge a known declared value into an existing remote value
    ///
    /// Called only after [`merge_field`] has ruled out protected, unset,
    /// unresolved and suppressed values.
    fn merge_known(existing: &Self, declared: &Self::Intent, policy: &MergePolicy) -> Self;

    /// Build a full remote value from declared intent alone
    fn coerce(declared: &Self::Intent) -> Self;

    /// Whether a declared value is the zero/empty value of its kind
    fn is_vacant(_declared: &Self::Intent) -> bool {
        false
    }

    /// Convert a remote value into declared shape, every field known
    fn to_intent(&self) -> Self::Intent;

    /// Convert a remote value into declared shape the way a user would
    /// have written it; empty collections become unset
    fn observe(&self) -> Presence<Self::Intent> {
        Presence::Known(self.to_intent())
    }

    /// Append the dotted paths of unresolved fields below `path`
    fn collect_unresolved(_declared: &Self::Intent, _path: &str, _out: &mut Vec<String>) {}
}

/// Merge one field of declared intent into the matching remote field
pub fn merge_field<T: Mergeable>(
    name: &str,
    existing: &T,
    declared: &Presence<T::Intent>,
    rule: FieldRule,
    policy: &MergePolicy,
) -> T {
    if rule == FieldRule::Protected {
        return existing.clone();
    }
    match declared {
        Presence::Unset | Presence::Unresolved => existing.clone(),
        Presence::Known(value) => {
            if T::is_vacant(value) && policy.suppresses(T::FIELD_KIND, rule) {
                log::trace!("{name}: declared {} is empty, keeping remote value", T::FIELD_KIND);
                existing.clone()
            } else {
                T::merge_known(existing, value, policy)
            }
        }
    }
}

/// Coerce one declared field when there is no remote object
///
/// Protected fields are server-assigned, so they start from their default.
pub fn coerce_field<T: Mergeable>(declared: &Presence<T::Intent>, rule: FieldRule) -> T {
    match (rule, declared) {
        (FieldRule::Protected, _) => T::default(),
        (_, Presence::Known(value)) => T::coerce(value),
        (_, Presence::Unset | Presence::Unresolved) => T::default(),
    }
}

/// Collect unresolved paths for one declared field
pub fn collect_field<T: Mergeable>(
    name: &str,
    declared: &Presence<T::Intent>,
    rule: FieldRule,
    path: &str,
    out: &mut Vec<String>,
) {
    if rule == FieldRule::Protected {
        return;
    }
    let here = if path.is_empty() {
        name.to_string()
    } else {
        format!("{path}.{name}")
    };
    match declared {
        Presence::Unresolved => out.push(here),
        Presence::Known(value) => T::collect_unresolved(value, &here, out),
        Presence::Unset => {}
    }
}

// ============================================================================
// Scalars
// ============================================================================

macro_rules! numeric_scalar {
    ($($ty:ty),* $(,)?) => {$(
        impl Mergeable for $ty {
            type Intent = Self;
            const FIELD_KIND: FieldKind = FieldKind::Scalar;

            fn merge_known(_existing: &Self, declared: &Self, _policy: &MergePolicy) -> Self {
                *declared
            }

            fn coerce(declared: &Self) -> Self {
                *declared
            }

            fn is_vacant(declared: &Self) -> bool {
                *declared == 0
            }

            fn to_intent(&self) -> Self {
                *self
            }
        }
    )*};
}

numeric_scalar!(u8, u16, u32, u64, i32, i64);

impl Mergeable for String {
    type Intent = Self;
    const FIELD_KIND: FieldKind = FieldKind::Scalar;

    fn merge_known(_existing: &Self, declared: &Self, _policy: &MergePolicy) -> Self {
        declared.clone()
    }

    fn coerce(declared: &Self) -> Self {
        declared.clone()
    }

    fn is_vacant(declared: &Self) -> bool {
        declared.is_empty()
    }

    fn to_intent(&self) -> Self {
        self.clone()
    }
}

// `false` is a real setting, not an empty placeholder.
impl Mergeable for bool {
    type Intent = Self;
    const FIELD_KIND: FieldKind = FieldKind::Scalar;

    fn merge_known(_existing: &Self, declared: &Self, _policy: &MergePolicy) -> Self {
        *declared
    }

    fn coerce(declared: &Self) -> Self {
        *declared
    }

    fn to_intent(&self) -> Self {
        *self
    }
}

// ============================================================================
// Collections
// ============================================================================

impl<T: Mergeable> Mergeable for Vec<T> {
    type Intent = Vec<T::Intent>;
    const FIELD_KIND: FieldKind = FieldKind::Collection;

    fn merge_known(_existing: &Self, declared: &Self::Intent, _policy: &MergePolicy) -> Self {
        Self::coerce(declared)
    }

    fn coerce(declared: &Self::Intent) -> Self {
        declared.iter().map(T::coerce).collect()
    }

    fn is_vacant(declared: &Self::Intent) -> bool {
        declared.is_empty()
    }

    fn to_intent(&self) -> Self::Intent {
        self.iter().map(T::to_intent).collect()
    }

    fn observe(&self) -> Presence<Self::Intent> {
        if self.is_empty() {
            Presence::Unset
        } else {
            Presence::Known(self.to_intent())
        }
    }

    fn collect_unresolved(declared: &Self::Intent, path: &str, out: &mut Vec<String>) {
        for (index, item) in declared.iter().enumerate() {
            T::collect_unresolved(item, &format!("{path}[{index}]"), out);
        }
    }
}

impl<T> Mergeable for BTreeSet<T>
where
    T: Mergeable<Intent = T> + Ord + fmt::Debug,
{
    type Intent = Self;
    const FIELD_KIND: FieldKind = FieldKind::Collection;

    fn merge_known(_existing: &Self, declared: &Self, _policy: &MergePolicy) -> Self {
        declared.clone()
    }

    fn coerce(declared: &Self) -> Self {
        declared.clone()
    }

    fn is_vacant(declared: &Self) -> bool {
        declared.is_empty()
    }

    fn to_intent(&self) -> Self {
        self.clone()
    }

    fn observe(&self) -> Presence<Self> {
        if self.is_empty() {
            Presence::Unset
        } else {
            Presence::Known(self.clone())
        }
    }
}

impl<T: Mergeable> Mergeable for BTreeMap<String, T> {
    type Intent = BTreeMap<String, T::Intent>;
    const FIELD_KIND: FieldKind = FieldKind::Collection;

    fn merge_known(_existing: &Self, declared: &Self::Intent, _policy: &MergePolicy) -> Self {
        Self::coerce(declared)
    }

    fn coerce(declared: &Self::Intent) -> Self {
        declared
            .iter()
            .map(|(key, value)| (key.clone(), T::coerce(value)))
            .collect()
    }

    fn is_vacant(declared: &Self::Intent) -> bool {
        declared.is_empty()
    }

    fn to_intent(&self) -> Self::Intent {
        self.iter()
            .map(|(key, value)| (key.clone(), value.to_intent()))
            .collect()
    }

    fn observe(&self) -> Presence<Self::Intent> {
        if self.is_empty() {
            Presence::Unset
        } else {
            Presence::Known(self.to_intent())
        }
    }

    fn collect_unresolved(declared: &Self::Intent, path: &str, out: &mut Vec<String>) {
        for (key, value) in declared {
            T::collect_unresolved(value, &format!("{path}.{key}"), out);
        }
    }
}
