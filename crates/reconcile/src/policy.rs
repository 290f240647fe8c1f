//! Field policies and merge configuration

use serde::{Deserialize, Serialize};
use std::fmt;

/// Structural kind of a field, derived from its Rust type
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FieldKind {
    /// Strings, integers, booleans
    Scalar,
    /// Lists, sets and maps; replaced wholesale, never unioned
    Collection,
    /// Nested objects; merged recursively
    Composite,
}

impl fmt::Display for FieldKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Scalar => write!(f, "scalar"),
            Self::Collection => write!(f, "collection"),
            Self::Composite => write!(f, "composite"),
        }
    }
}

/// Per-field rule declared alongside the shape
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FieldRule {
    /// Identity or system-managed; always taken from the remote object
    Protected,
    /// Regular field; zero/empty handling follows [`MergePolicy`]
    Default,
    /// Zero and empty are legitimate values and are always written
    Explicit,
}

impl fmt::Display for FieldRule {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Protected => write!(f, "protected"),
            Self::Default => write!(f, "default"),
            Self::Explicit => write!(f, "explicit"),
        }
    }
}

/// One row of a shape's field-policy table
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FieldSpec {
    pub name: &'static str,
    pub kind: FieldKind,
    pub rule: FieldRule,
}

impl FieldSpec {
    pub fn is_protected(&self) -> bool {
        self.rule == FieldRule::Protected
    }
}

/// What a known-but-zero scalar (`""`, `0`) means
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ZeroScalars {
    /// Treat as if the field were unset and keep the remote value
    #[default]
    Suppress,
    /// Write the zero value
    Overwrite,
}

/// What a known-but-empty collection means
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum EmptyCollections {
    /// Treat as if the field were unset and keep the remote collection
    #[default]
    Preserve,
    /// Clear the remote collection
    Clear,
}

/// Global zero/empty handling for fields without an `explicit` rule
///
/// By default a declared `0` or `""` never overwrites a remote value, and
/// neither does an empty list. Both conflate "explicitly cleared" with "not
/// mentioned"; switch them off here, or per field with the `explicit` rule.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct MergePolicy {
    pub zero_scalars: ZeroScalars,
    pub empty_collections: EmptyCollections,
}

impl MergePolicy {
    /// Policy under which every known value is written as declared
    pub fn literal() -> Self {
        Self {
            zero_scalars: ZeroScalars::Overwrite,
            empty_collections: EmptyCollections::Clear,
        }
    }

    /// Whether a vacant (zero or empty) known value of this kind falls back
    /// to the remote value
    pub fn suppresses(&self, kind: FieldKind, rule: FieldRule) -> bool {
        if rule == FieldRule::Explicit {
            return false;
        }
        match kind {
            FieldKind::Scalar => self.zero_scalars == ZeroScalars::Suppress,
            FieldKind::Collection => self.empty_collections == EmptyCollections::Preserve,
            FieldKind::Composite => false,
        }
    }
}
