//! Negotiation of the pushdown mode against source capabilities.

use plan_types::{MetaColumn, SourceCapabilities};
use row_schema::PathTrie;
use snafu::OptionExt;
use tracing::debug;

use crate::{Result, UndeclaredMetadataKeySnafu, extract::ScanReads};

/// How far field pruning can go for this source.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FieldMode {
    /// No projection pushdown: the base row stays exactly as-is, only
    /// metadata handling may still change the scan.
    Retain,
    /// Whole top-level columns can be pruned; nested requirements widen to
    /// the containing top-level field.
    TopLevel,
    /// The full trie, down to its true leaves, defines the reduced schema.
    Nested,
}

/// The negotiated reduction: effective mode, effective trie, and the
/// metadata columns the scan must produce.
#[derive(Debug)]
pub struct PushdownPlan {
    pub mode: FieldMode,
    pub trie: PathTrie,
    pub metadata: Vec<MetaColumn>,
}

/// Reconcile what the expressions read with what the source can do.
///
/// Mandatory-retain paths (e.g. the primary key of a changelog/upsert
/// source) are merged into the trie *after* all expression-derived paths,
/// so unreferenced key columns land behind the referenced data in the
/// reduced layout. Metadata follows the grant model of the source:
/// selective pushdown requests exactly the referenced keys in reference
/// order; everything else falls back to the full declared set in
/// declaration order, including the case where nothing is referenced at
/// all.
pub fn negotiate(caps: &SourceCapabilities, reads: &ScanReads) -> Result<PushdownPlan> {
    let mut trie = PathTrie::from_paths(&reads.paths);
    for path in &caps.mandatory_retain {
        trie.insert(path);
    }

    let mode = if !caps.projection_pushdown {
        FieldMode::Retain
    } else if caps.nested_projection_pushdown {
        FieldMode::Nested
    } else {
        trie.collapse_to_top_level();
        FieldMode::TopLevel
    };

    let metadata = if caps.metadata_pushdown && caps.selective_metadata_pushdown {
        reads
            .metadata_keys
            .iter()
            .map(|key| {
                caps.declared_metadata_key(key)
                    .cloned()
                    .context(UndeclaredMetadataKeySnafu { key })
            })
            .collect::<Result<Vec<_>>>()?
    } else {
        // all-or-nothing grant: every declared key materializes, whether
        // referenced or not
        caps.declared_metadata.clone()
    };

    debug!(
        mode = ?mode,
        requested_paths = reads.paths.len(),
        metadata_keys = metadata.len(),
        "negotiated pushdown plan"
    );

    Ok(PushdownPlan { mode, trie, metadata })
}
