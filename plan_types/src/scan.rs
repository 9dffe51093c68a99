//! The table-source scan leaf node.

use std::{fmt, sync::Arc};

use arrow::datatypes::DataType;
use row_schema::{RowSchema, display_type};

use crate::source::ScanSource;

/// A synthetic metadata column produced by a source on request.
///
/// Metadata columns are not part of the base row; the scan materializes them
/// after the base-row fields, in the order they were applied.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct MetaColumn {
    pub key: String,
    pub data_type: DataType,
}

impl MetaColumn {
    pub fn new(key: impl Into<String>, data_type: DataType) -> Self {
        Self {
            key: key.into(),
            data_type,
        }
    }
}

impl fmt::Display for MetaColumn {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}: {}", self.key, display_type(&self.data_type))
    }
}

/// Scan over a table source.
///
/// The scan's output row is the base row followed by its metadata columns;
/// expressions above the scan address that concatenation by position.
/// `schema` and `metadata` always describe the *current* (possibly already
/// pushed-down) output, which is what makes re-running the pushdown rule on
/// its own output a no-op.
#[derive(Debug, Clone)]
pub struct TableScan {
    table: String,
    source: Arc<dyn ScanSource>,
    schema: RowSchema,
    metadata: Vec<MetaColumn>,
}

impl TableScan {
    pub fn new(
        table: impl Into<String>,
        source: Arc<dyn ScanSource>,
        schema: RowSchema,
        metadata: Vec<MetaColumn>,
    ) -> Self {
        Self {
            table: table.into(),
            source,
            schema,
            metadata,
        }
    }

    pub fn table(&self) -> &str {
        &self.table
    }

    pub fn source(&self) -> &Arc<dyn ScanSource> {
        &self.source
    }

    /// The base row produced by the source, before metadata columns.
    pub fn schema(&self) -> &RowSchema {
        &self.schema
    }

    /// Metadata columns currently produced, after the base row.
    pub fn metadata(&self) -> &[MetaColumn] {
        &self.metadata
    }

    /// Number of base-row columns; metadata positions start here.
    pub fn base_len(&self) -> usize {
        self.schema.len()
    }

    /// Total output width, base row plus metadata.
    pub fn output_len(&self) -> usize {
        self.schema.len() + self.metadata.len()
    }

    /// The metadata column at an output position, if the position falls in
    /// the metadata region.
    pub fn meta_at(&self, output_position: usize) -> Option<&MetaColumn> {
        output_position
            .checked_sub(self.schema.len())
            .and_then(|i| self.metadata.get(i))
    }
}

impl fmt::Display for TableScan {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "TableScan: {} [{}]", self.table, self.schema)?;
        if !self.metadata.is_empty() {
            write!(f, " metadata=[")?;
            for (i, column) in self.metadata.iter().enumerate() {
                if i > 0 {
                    write!(f, ", ")?;
                }
                write!(f, "{}", column.key)?;
            }
            write!(f, "]")?;
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use arrow::datatypes::DataType;
    use row_schema::RowSchemaBuilder;

    use crate::test_source::TestSource;

    use super::*;

    #[test]
    fn output_positions() {
        let schema = RowSchemaBuilder::new()
            .field("a", DataType::Int64)
            .field("b", DataType::Utf8)
            .build()
            .unwrap();
        let scan = TableScan::new(
            "t",
            Arc::new(TestSource::new()),
            schema,
            vec![
                MetaColumn::new("m1", DataType::Utf8),
                MetaColumn::new("m2", DataType::Int64),
            ],
        );

        assert_eq!(scan.base_len(), 2);
        assert_eq!(scan.output_len(), 4);
        assert!(scan.meta_at(1).is_none());
        assert_eq!(scan.meta_at(2).unwrap().key, "m1");
        assert_eq!(scan.meta_at(3).unwrap().key, "m2");
        assert!(scan.meta_at(4).is_none());

        assert_eq!(
            scan.to_string(),
            "TableScan: t [a: Int64, b: Utf8] metadata=[m1, m2]"
        );
    }
}
