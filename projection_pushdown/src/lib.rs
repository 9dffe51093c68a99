//! Projection pushdown into table-source scans.
//!
//! Given a scan and the scalar expressions of the projection above it, this
//! crate rewrites the pair so the source reads and materializes only the
//! data those expressions actually touch:
//!
//! 1. [`extract`] walks the expressions and collects every field-access path
//!    and metadata-column reference.
//! 2. The paths are merged into a [`PathTrie`] (minimal prefix cover).
//! 3. [`negotiate`] reconciles the trie with the source's declared
//!    capabilities: top-level vs. nested pushdown, selective vs.
//!    all-or-nothing metadata, and mandatory key retention for
//!    changelog/upsert sources.
//! 4. [`reduce`] turns the negotiated plan into the scan's new output row
//!    plus a path-to-new-position mapping.
//! 5. [`rewrite`] rebuilds every expression against the new layout.
//! 6. [`rule`] decides whether any of that changed the plan, applies the
//!    pushdown to the source (copy-on-apply), and emits the new fragment.
//!
//! The whole pipeline is a pure, synchronous function of its inputs; the
//! only collaborator is the source's read-only capability declaration.
//!
//! [`PathTrie`]: row_schema::PathTrie

use snafu::Snafu;

pub mod extract;
pub mod negotiate;
pub mod reduce;
pub mod rewrite;
pub mod rule;

#[cfg(test)]
mod test_util;

pub use extract::{ScanReads, extract_reads};
pub use negotiate::{FieldMode, PushdownPlan, negotiate};
pub use reduce::{ReducedSchema, reduce_schema};
pub use rewrite::rewrite_exprs;
pub use rule::{ProjectionPushdown, RuleOutcome, push_project_into_scan};

/// Errors of the pushdown pipeline.
///
/// The first three variants are internal defects: the rewrite must fail
/// rather than emit a plan that silently drops data. The metadata variants
/// are capability-contract problems with the source; the rule reacts to
/// those by not firing and keeping the original plan.
#[derive(Debug, Snafu)]
pub enum Error {
    #[snafu(display(
        "Internal error: path '{path}' has no entry in the reduced-schema mapping"
    ))]
    UnresolvedPath { path: String },

    #[snafu(display(
        "Internal error: column reference ${index} out of range for scan output width {width}"
    ))]
    ColumnOutOfRange { index: usize, width: usize },

    #[snafu(display("Internal error: path '{path}' does not resolve against the scan schema"))]
    PathResolution {
        path: String,
        source: row_schema::Error,
    },

    #[snafu(display("Referenced metadata key '{key}' is not declared by the source"))]
    UndeclaredMetadataKey { key: String },

    #[snafu(display(
        "Capability contract violation: source applied metadata key '{key}' outside its declared set"
    ))]
    MetadataContract { key: String },
}

impl Error {
    /// Whether the optimizer driver should react by keeping the original
    /// plan (rule does not fire) instead of failing the optimization.
    pub fn keeps_original_plan(&self) -> bool {
        matches!(
            self,
            Self::UndeclaredMetadataKey { .. } | Self::MetadataContract { .. }
        )
    }
}

pub type Result<T, E = Error> = std::result::Result<T, E>;
