//! Shared fixtures for the pushdown tests.

use std::sync::Arc;

use arrow::datatypes::{DataType, Field};
use plan_types::test_source::TestSource;
use plan_types::{ExprArena, MetaColumn, TableScan};
use row_schema::{FieldPath, RowSchema, RowSchemaBuilder, array_of, map_of, row_of};

use crate::extract::ScanReads;

/// `id: Int32, a: row<b: Int64, c: Utf8, d: Boolean>`
pub(crate) fn deep_nested_schema() -> RowSchema {
    RowSchemaBuilder::new()
        .field("id", DataType::Int32)
        .field(
            "a",
            row_of([
                Field::new("b", DataType::Int64, true),
                Field::new("c", DataType::Utf8, true),
                Field::new("d", DataType::Boolean, true),
            ]),
        )
        .build()
        .unwrap()
}

/// Row type of a two-field nested struct, `name`/`value`.
pub(crate) fn name_value_row() -> DataType {
    row_of([
        Field::new("name", DataType::Utf8, true),
        Field::new("value", DataType::Int64, true),
    ])
}

/// Schema shaped like the classic nested-table fixture:
/// `id, deepNested: row<nested1: row<name, value>, nested2: row<num, flag>>,
/// name, testMap`.
pub(crate) fn nested_table_schema() -> RowSchema {
    RowSchemaBuilder::new()
        .field("id", DataType::Int32)
        .field(
            "deepNested",
            row_of([
                Field::new("nested1", name_value_row(), true),
                Field::new(
                    "nested2",
                    row_of([
                        Field::new("num", DataType::Int64, true),
                        Field::new("flag", DataType::Boolean, true),
                    ]),
                    true,
                ),
            ]),
        )
        .field("name", DataType::Utf8)
        .field("testMap", map_of(DataType::Utf8))
        .build()
        .unwrap()
}

/// Scan over [`nested_table_schema`] on a source with nested pushdown.
pub(crate) fn nested_table() -> (TableScan, ExprArena) {
    let scan = TableScan::new(
        "NestedTable",
        Arc::new(TestSource::nested()),
        nested_table_schema(),
        vec![],
    );
    (scan, ExprArena::new())
}

/// Schema with container-typed columns:
/// `id, ts, result: row<data_arr: array<row<value>>, data_map: map<_,
/// row<value>>>, outer_array, outer_map`.
pub(crate) fn item_table_schema() -> RowSchema {
    let value_row = row_of([Field::new("value", DataType::Int64, true)]);
    RowSchemaBuilder::new()
        .field("id", DataType::Int32)
        .field("ts", DataType::Int64)
        .field(
            "result",
            row_of([
                Field::new("data_arr", array_of(value_row.clone()), true),
                Field::new("data_map", map_of(value_row), true),
            ]),
        )
        .field("outer_array", array_of(DataType::Int64))
        .field("outer_map", map_of(DataType::Utf8))
        .build()
        .unwrap()
}

/// Scan over [`item_table_schema`] on a source with nested pushdown.
pub(crate) fn item_table() -> (TableScan, ExprArena) {
    let scan = TableScan::new(
        "ItemTable",
        Arc::new(TestSource::nested()),
        item_table_schema(),
        vec![],
    );
    (scan, ExprArena::new())
}

/// Declared metadata of the metadata-table fixture: one more readable key
/// (`metadata_3`) than the scan produces.
pub(crate) fn declared_metadata() -> Vec<MetaColumn> {
    vec![
        MetaColumn::new("metadata_1", DataType::Int64),
        MetaColumn::new("metadata_2", DataType::Utf8),
        MetaColumn::new("metadata_3", DataType::Int64),
    ]
}

/// Scan producing `id, deepNested` plus metadata columns `metadata_1`,
/// `metadata_2`, over a source that also declares `metadata_3` readable.
pub(crate) fn metadata_table() -> (TableScan, ExprArena) {
    metadata_table_with(
        TestSource::nested()
            .with_selective_metadata_pushdown()
            .with_declared_metadata(declared_metadata()),
    )
}

pub(crate) fn metadata_table_with(source: TestSource) -> (TableScan, ExprArena) {
    let schema = RowSchemaBuilder::new()
        .field("id", DataType::Int32)
        .field(
            "deepNested",
            row_of([
                Field::new("nested1", name_value_row(), true),
                Field::new(
                    "nested2",
                    row_of([
                        Field::new("num", DataType::Int64, true),
                        Field::new("flag", DataType::Boolean, true),
                    ]),
                    true,
                ),
            ]),
        )
        .build()
        .unwrap();
    let scan = TableScan::new(
        "MetadataTable",
        Arc::new(source),
        schema,
        vec![
            MetaColumn::new("metadata_1", DataType::Int64),
            MetaColumn::new("metadata_2", DataType::Utf8),
        ],
    );
    (scan, ExprArena::new())
}

/// Reads with only field paths, no metadata references.
pub(crate) fn reads_for_paths(paths: Vec<FieldPath>) -> ScanReads {
    ScanReads {
        paths,
        metadata_keys: Default::default(),
    }
}

/// Downcast a scan's source to the test double.
pub(crate) fn test_source(scan: &TableScan) -> &TestSource {
    scan.source()
        .as_any()
        .downcast_ref::<TestSource>()
        .expect("scan source is a TestSource")
}
