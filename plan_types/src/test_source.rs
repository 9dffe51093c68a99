//! A configurable [`ScanSource`] for tests.
//!
//! Compiled unconditionally (like other planner test fixtures) so dependent
//! crates can use it from their own test suites.

use std::sync::Arc;

use row_schema::{FieldPath, RowSchema};

use crate::{
    scan::MetaColumn,
    source::ScanSource,
};

/// Test double with builder-style capability flags.
///
/// `apply_pushdown` clones the source and records the applied base schema
/// and metadata keys on the clone, leaving the original untouched; the
/// clone takes over the re-anchored mandatory-retain paths it was handed.
/// `with_rogue_metadata_key` makes the clone claim an extra applied key that
/// was never declared, to exercise the capability-contract check.
#[derive(Debug, Clone, Default)]
pub struct TestSource {
    projection: bool,
    nested: bool,
    metadata: bool,
    selective_metadata: bool,
    declared_metadata: Vec<MetaColumn>,
    mandatory_retain: Vec<FieldPath>,
    rogue_metadata_key: Option<String>,
    applied: Option<AppliedPushdown>,
}

#[derive(Debug, Clone)]
struct AppliedPushdown {
    schema: RowSchema,
    metadata_keys: Vec<String>,
}

impl TestSource {
    /// A source with every capability disabled.
    pub fn new() -> Self {
        Self::default()
    }

    /// A source with top-level and nested projection pushdown enabled.
    pub fn nested() -> Self {
        Self::new().with_projection_pushdown().with_nested_pushdown()
    }

    pub fn with_projection_pushdown(mut self) -> Self {
        self.projection = true;
        self
    }

    pub fn with_nested_pushdown(mut self) -> Self {
        self.nested = true;
        self
    }

    pub fn with_metadata_pushdown(mut self) -> Self {
        self.metadata = true;
        self
    }

    pub fn with_selective_metadata_pushdown(mut self) -> Self {
        self.metadata = true;
        self.selective_metadata = true;
        self
    }

    pub fn with_declared_metadata(
        mut self,
        columns: impl IntoIterator<Item = MetaColumn>,
    ) -> Self {
        self.declared_metadata = columns.into_iter().collect();
        self
    }

    pub fn with_mandatory_retain(
        mut self,
        paths: impl IntoIterator<Item = FieldPath>,
    ) -> Self {
        self.mandatory_retain = paths.into_iter().collect();
        self
    }

    /// Misbehave on apply: report `key` as applied without declaring it.
    pub fn with_rogue_metadata_key(mut self, key: impl Into<String>) -> Self {
        self.rogue_metadata_key = Some(key.into());
        self
    }

    /// The base schema this instance was bound to by `apply_pushdown`.
    pub fn applied_schema(&self) -> Option<&RowSchema> {
        self.applied.as_ref().map(|applied| &applied.schema)
    }
}

impl ScanSource for TestSource {
    fn as_any(&self) -> &dyn std::any::Any {
        self
    }

    fn supports_projection_pushdown(&self) -> bool {
        self.projection
    }

    fn supports_nested_projection_pushdown(&self) -> bool {
        self.nested
    }

    fn supports_metadata_pushdown(&self) -> bool {
        self.metadata
    }

    fn supports_selective_metadata_pushdown(&self) -> bool {
        self.selective_metadata
    }

    fn declared_metadata(&self) -> &[MetaColumn] {
        &self.declared_metadata
    }

    fn mandatory_retain(&self) -> &[FieldPath] {
        &self.mandatory_retain
    }

    fn apply_pushdown(
        &self,
        schema: &RowSchema,
        metadata: &[MetaColumn],
        mandatory_retain: &[FieldPath],
    ) -> Arc<dyn ScanSource> {
        let mut metadata_keys: Vec<_> =
            metadata.iter().map(|column| column.key.clone()).collect();
        if let Some(rogue) = &self.rogue_metadata_key {
            metadata_keys.push(rogue.clone());
        }
        Arc::new(Self {
            mandatory_retain: mandatory_retain.to_vec(),
            applied: Some(AppliedPushdown {
                schema: schema.clone(),
                metadata_keys,
            }),
            ..self.clone()
        })
    }

    fn applied_metadata_keys(&self) -> Option<Vec<String>> {
        self.applied
            .as_ref()
            .map(|applied| applied.metadata_keys.clone())
    }
}
