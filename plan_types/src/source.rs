//! The capability contract a table source declares to the optimizer.

use std::{fmt::Debug, sync::Arc};

use row_schema::{FieldPath, RowSchema};

use crate::scan::MetaColumn;

/// Declared abilities of a table source, queried (never mutated) by rewrite
/// rules.
///
/// Sources are copy-on-apply: [`ScanSource::apply_pushdown`] hands back a
/// *new* instance bound to the reduced schema and metadata-key subset, and
/// the original instance is left untouched. The applied state is observable
/// only through the new instance ([`ScanSource::applied_metadata_keys`]),
/// which is also how the rule validates the source honored its declared key
/// set.
pub trait ScanSource: Debug + Send + Sync {
    /// Return a reference to self as [`Any`], for downcasting to concrete
    /// source implementations.
    ///
    /// [`Any`]: std::any::Any
    fn as_any(&self) -> &dyn std::any::Any;

    /// Whether whole top-level columns can be projected away at the source.
    fn supports_projection_pushdown(&self) -> bool;

    /// Whether sub-fields of row-typed columns can be projected at the
    /// source. Only meaningful when top-level pushdown is supported.
    fn supports_nested_projection_pushdown(&self) -> bool;

    /// Whether the source can materialize metadata columns on request.
    fn supports_metadata_pushdown(&self) -> bool;

    /// Whether a strict subset of the declared metadata keys can be
    /// requested. When `false`, applying metadata is all-or-nothing: the
    /// full declared set is materialized regardless of what is referenced.
    fn supports_selective_metadata_pushdown(&self) -> bool;

    /// Metadata keys this source can produce, in declaration order.
    fn declared_metadata(&self) -> &[MetaColumn];

    /// Paths that must remain addressable in the scan output even when no
    /// expression reads them, e.g. the primary-key columns of a
    /// changelog/upsert source.
    fn mandatory_retain(&self) -> &[FieldPath];

    /// One-shot pushdown application; returns a new source instance bound
    /// to the given base row and metadata columns.
    ///
    /// `mandatory_retain` carries this source's retain paths re-anchored to
    /// the positions of the new schema. The new instance must declare
    /// *these* paths, not the originals: a retain path is meaningful only
    /// in the coordinates of the output it accompanies, and re-running the
    /// pushdown against the new instance resolves them there.
    fn apply_pushdown(
        &self,
        schema: &RowSchema,
        metadata: &[MetaColumn],
        mandatory_retain: &[FieldPath],
    ) -> Arc<dyn ScanSource>;

    /// Metadata keys applied via [`Self::apply_pushdown`], or `None` on an
    /// instance no pushdown was applied to.
    fn applied_metadata_keys(&self) -> Option<Vec<String>>;
}

/// Plain snapshot of a source's declared capabilities.
///
/// Taken once per rule invocation so negotiation is a pure function over a
/// value, rather than repeated virtual dispatch against the source.
#[derive(Debug, Clone)]
pub struct SourceCapabilities {
    pub projection_pushdown: bool,
    pub nested_projection_pushdown: bool,
    pub metadata_pushdown: bool,
    pub selective_metadata_pushdown: bool,
    pub declared_metadata: Vec<MetaColumn>,
    pub mandatory_retain: Vec<FieldPath>,
}

impl SourceCapabilities {
    pub fn of(source: &dyn ScanSource) -> Self {
        Self {
            projection_pushdown: source.supports_projection_pushdown(),
            nested_projection_pushdown: source.supports_nested_projection_pushdown(),
            metadata_pushdown: source.supports_metadata_pushdown(),
            selective_metadata_pushdown: source.supports_selective_metadata_pushdown(),
            declared_metadata: source.declared_metadata().to_vec(),
            mandatory_retain: source.mandatory_retain().to_vec(),
        }
    }

    /// Look up a declared metadata column by key.
    pub fn declared_metadata_key(&self, key: &str) -> Option<&MetaColumn> {
        self.declared_metadata.iter().find(|column| column.key == key)
    }
}
