//! Row-type schema definitions for the table planner.
//!
//! A [`RowSchema`] is the output row type of a table-source scan. It wraps an
//! Arrow [`SchemaRef`] so that nested structure (rows, arrays, maps) is
//! expressed with the ordinary Arrow [`DataType`] vocabulary:
//!
//! - a nested row is a [`DataType::Struct`],
//! - an array is a [`DataType::List`],
//! - a map is a [`DataType::Map`] (string keys).
//!
//! On top of the schema itself this crate provides the addressing machinery
//! used by projection pushdown: [`FieldPath`] describes one field access
//! chain from the root row, and [`PathTrie`] merges many such paths into a
//! minimal prefix tree that drives schema reduction.
//!
//! [`SchemaRef`]: arrow::datatypes::SchemaRef

use std::{fmt, sync::Arc};

use arrow::datatypes::{
    DataType, Field, Fields, Schema as ArrowSchema, SchemaRef as ArrowSchemaRef,
};
use snafu::Snafu;

pub mod builder;
mod path;
mod trie;

pub use builder::RowSchemaBuilder;
pub use path::{FieldPath, PathStep};
pub use trie::{PathTrie, TrieNode};

/// Schema construction / path resolution errors.
#[derive(Debug, Snafu)]
pub enum Error {
    #[snafu(display("Duplicate field name in row schema: '{name}'"))]
    DuplicateFieldName { name: String },

    #[snafu(display("Field index {index} out of bounds for row type with {width} fields"))]
    FieldOutOfBounds { index: usize, width: usize },

    #[snafu(display("Path step {step} applied to non-row type {data_type}"))]
    NotARow { step: String, data_type: String },

    #[snafu(display("Path step {step} applied to non-container type {data_type}"))]
    NotAContainer { step: String, data_type: String },

    #[snafu(display("Cannot extend path '{path}': a dynamic index/key step ends specialization"))]
    StepAfterDynamic { path: String },
}

pub type Result<T, E = Error> = std::result::Result<T, E>;

/// The output row type of a scan.
///
/// Cheap to clone; all data lives behind the reference-counted Arrow schema.
/// Field order is significant: downstream expressions address fields by
/// position, and projection pushdown reorders positions deliberately.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct RowSchema {
    inner: ArrowSchemaRef,
}

impl RowSchema {
    /// Row type with no fields (e.g. `SELECT 1 FROM t` after pushdown).
    pub fn empty() -> Self {
        Self {
            inner: Arc::new(ArrowSchema::empty()),
        }
    }

    /// Build a schema directly from fields, without duplicate checking.
    ///
    /// Used by schema reduction, where field names are taken from an
    /// already-validated schema. User-facing construction goes through
    /// [`RowSchemaBuilder`].
    pub fn from_fields(fields: impl Into<Fields>) -> Self {
        Self {
            inner: Arc::new(ArrowSchema::new(fields.into())),
        }
    }

    pub fn as_arrow(&self) -> &ArrowSchemaRef {
        &self.inner
    }

    pub fn fields(&self) -> &Fields {
        self.inner.fields()
    }

    pub fn field(&self, index: usize) -> &Field {
        self.inner.field(index)
    }

    pub fn len(&self) -> usize {
        self.inner.fields().len()
    }

    pub fn is_empty(&self) -> bool {
        self.inner.fields().is_empty()
    }

    /// Find a top-level field by name.
    pub fn find(&self, name: &str) -> Option<(usize, &Field)> {
        self.inner
            .fields()
            .iter()
            .enumerate()
            .find(|(_, f)| f.name() == name)
            .map(|(i, f)| (i, f.as_ref()))
    }

    /// Resolve the data type a path points at.
    ///
    /// Array steps (constant or dynamic) resolve to the element type, map
    /// steps to the value type. Fails if a step does not match the type it
    /// is applied to; callers treat that as an internal defect since plans
    /// are type-checked before pushdown runs.
    pub fn data_type_at(&self, path: &FieldPath) -> Result<DataType> {
        let mut steps = path.steps().iter();
        let first = steps.next().expect("paths are never empty");
        let PathStep::Field(root) = first else {
            return NotARowSnafu {
                step: first.to_string(),
                data_type: "row".to_string(),
            }
            .fail();
        };
        let width = self.len();
        let mut current = self
            .fields()
            .get(*root)
            .ok_or(Error::FieldOutOfBounds {
                index: *root,
                width,
            })?
            .data_type()
            .clone();
        for step in steps {
            current = step_into(&current, step)?;
        }
        Ok(current)
    }
}

impl From<RowSchema> for ArrowSchemaRef {
    fn from(schema: RowSchema) -> Self {
        schema.inner
    }
}

impl From<ArrowSchemaRef> for RowSchema {
    fn from(inner: ArrowSchemaRef) -> Self {
        Self { inner }
    }
}

impl fmt::Display for RowSchema {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let mut first = true;
        for field in self.fields() {
            if !first {
                write!(f, ", ")?;
            }
            first = false;
            write!(f, "{}: {}", field.name(), display_type(field.data_type()))?;
        }
        Ok(())
    }
}

/// Apply a single non-root path step to a data type.
fn step_into(data_type: &DataType, step: &PathStep) -> Result<DataType> {
    match (data_type, step) {
        (DataType::Struct(fields), PathStep::Field(index)) => Ok(fields
            .get(*index)
            .ok_or(Error::FieldOutOfBounds {
                index: *index,
                width: fields.len(),
            })?
            .data_type()
            .clone()),
        (_, PathStep::Field(_)) => NotARowSnafu {
            step: step.to_string(),
            data_type: display_type(data_type).to_string(),
        }
        .fail(),
        (
            DataType::List(element) | DataType::LargeList(element),
            PathStep::ArrayIndex(_) | PathStep::ArrayAny,
        ) => Ok(element.data_type().clone()),
        (DataType::Map(entries, _), PathStep::MapKey(_) | PathStep::MapAny) => {
            // Map entries are a two-field struct; the value is the second.
            let DataType::Struct(kv) = entries.data_type() else {
                return NotAContainerSnafu {
                    step: step.to_string(),
                    data_type: display_type(data_type).to_string(),
                }
                .fail();
            };
            Ok(kv
                .get(1)
                .ok_or(Error::FieldOutOfBounds { index: 1, width: kv.len() })?
                .data_type()
                .clone())
        }
        _ => NotAContainerSnafu {
            step: step.to_string(),
            data_type: display_type(data_type).to_string(),
        }
        .fail(),
    }
}

/// A nested row type, i.e. an Arrow struct of the given fields.
pub fn row_of(fields: impl IntoIterator<Item = Field>) -> DataType {
    DataType::Struct(fields.into_iter().collect())
}

/// An array type with nullable elements.
pub fn array_of(element: DataType) -> DataType {
    DataType::new_list(element, true)
}

/// A string-keyed map type with nullable values.
pub fn map_of(value: DataType) -> DataType {
    let key = Field::new("key", DataType::Utf8, false);
    let value = Field::new("value", value, true);
    let entries = Field::new(
        "entries",
        DataType::Struct(Fields::from(vec![key, value])),
        false,
    );
    DataType::Map(Arc::new(entries), false)
}

/// Compact human-readable rendering of a data type.
///
/// Struct, list, and map types render as `row<..>`, `array<..>`, and
/// `map<..>`; everything else falls back to the Arrow debug form. Used in
/// plan display output and test assertions.
pub fn display_type(data_type: &DataType) -> TypeDisplay<'_> {
    TypeDisplay(data_type)
}

#[derive(Debug, Clone, Copy)]
pub struct TypeDisplay<'a>(&'a DataType);

impl fmt::Display for TypeDisplay<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.0 {
            DataType::Struct(fields) => {
                write!(f, "row<")?;
                for (i, field) in fields.iter().enumerate() {
                    if i > 0 {
                        write!(f, ", ")?;
                    }
                    write!(f, "{}: {}", field.name(), TypeDisplay(field.data_type()))?;
                }
                write!(f, ">")
            }
            DataType::List(element) | DataType::LargeList(element) => {
                write!(f, "array<{}>", TypeDisplay(element.data_type()))
            }
            DataType::Map(entries, _) => match entries.data_type() {
                DataType::Struct(kv) if kv.len() == 2 => write!(
                    f,
                    "map<{}, {}>",
                    TypeDisplay(kv[0].data_type()),
                    TypeDisplay(kv[1].data_type())
                ),
                other => write!(f, "map<{}>", TypeDisplay(other)),
            },
            other => write!(f, "{other:?}"),
        }
    }
}
