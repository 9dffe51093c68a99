//! Builder for [`RowSchema`]

use arrow::datatypes::{DataType, Field};
use hashbrown::HashSet;

use crate::{DuplicateFieldNameSnafu, Result, RowSchema};

/// Builds [`RowSchema`]s with a fluent API, validating top-level field names
/// along the way.
///
/// ```
/// use arrow::datatypes::{DataType, Field};
/// use row_schema::{RowSchemaBuilder, row_of};
///
/// let schema = RowSchemaBuilder::new()
///     .field("id", DataType::Int32)
///     .field(
///         "nested",
///         row_of([
///             Field::new("name", DataType::Utf8, true),
///             Field::new("value", DataType::Int64, true),
///         ]),
///     )
///     .build()
///     .unwrap();
///
/// assert_eq!(schema.len(), 2);
/// ```
#[derive(Debug, Default)]
pub struct RowSchemaBuilder {
    fields: Vec<Field>,
}

impl RowSchemaBuilder {
    pub fn new() -> Self {
        Self::default()
    }

    /// Append a nullable field. Nested structure is expressed through the
    /// data type itself, see [`row_of`], [`array_of`], [`map_of`].
    ///
    /// [`row_of`]: crate::row_of
    /// [`array_of`]: crate::array_of
    /// [`map_of`]: crate::map_of
    pub fn field(mut self, name: impl Into<String>, data_type: DataType) -> Self {
        self.fields.push(Field::new(name, data_type, true));
        self
    }

    /// Append a non-nullable field.
    pub fn non_null_field(mut self, name: impl Into<String>, data_type: DataType) -> Self {
        self.fields.push(Field::new(name, data_type, false));
        self
    }

    /// Validate and build the schema.
    pub fn build(self) -> Result<RowSchema> {
        // owned names so the set does not borrow the fields we move below
        let mut seen: HashSet<String> = HashSet::with_capacity(self.fields.len());
        for field in &self.fields {
            if !seen.insert(field.name().clone()) {
                return DuplicateFieldNameSnafu { name: field.name() }.fail();
            }
        }
        Ok(RowSchema::from_fields(self.fields))
    }
}

#[cfg(test)]
mod tests {
    use assert_matches::assert_matches;

    use crate::Error;

    use super::*;

    #[test]
    fn build_keeps_declaration_order() {
        let schema = RowSchemaBuilder::new()
            .field("b", DataType::Int64)
            .field("a", DataType::Utf8)
            .build()
            .unwrap();
        assert_eq!(schema.field(0).name(), "b");
        assert_eq!(schema.field(1).name(), "a");
    }

    #[test]
    fn duplicate_name_rejected() {
        let err = RowSchemaBuilder::new()
            .field("a", DataType::Int64)
            .field("a", DataType::Utf8)
            .build()
            .unwrap_err();
        assert_matches!(err, Error::DuplicateFieldName { name } if name == "a");
    }
}
