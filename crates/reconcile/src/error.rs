//! Error types for reconciliation

use thiserror::Error;

/// Errors surfaced by the [`Reconciler`](crate::Reconciler)
///
/// Shape mismatches have no variant: they are compile errors.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum Error {
    /// Declared intent still contains values that cannot be computed yet
    #[error("{shape} has unresolved fields: {}", fields.join(", "))]
    Unresolved {
        /// Shape being reconciled
        shape: &'static str,
        /// Dotted paths of the unresolved fields
        fields: Vec<String>,
    },

    /// Neither an existing object nor declared intent was supplied
    #[error("nothing to reconcile for {shape}: no existing object and no declared intent")]
    NothingToReconcile {
        /// Shape being reconciled
        shape: &'static str,
    },
}

/// Result type for reconciliation
pub type Result<T> = std::result::Result<T, Error>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_unresolved_display_lists_fields() {
        let err = Error::Unresolved {
            shape: "Wlan",
            fields: vec!["networkconf_id".into(), "usergroup_id".into()],
        };
        assert_eq!(
            err.to_string(),
            "Wlan has unresolved fields: networkconf_id, usergroup_id"
        );
    }

    #[test]
    fn test_nothing_to_reconcile_display() {
        let err = Error::NothingToReconcile { shape: "Network" };
        assert!(err.to_string().contains("Network"));
    }
}
