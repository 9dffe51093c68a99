//! Construction of the reduced scan output and the position mapping.

use arrow::datatypes::{DataType, Field};
use hashbrown::HashMap;
use plan_types::MetaColumn;
use row_schema::{RowSchema, TrieNode};

use crate::negotiate::{FieldMode, PushdownPlan};

/// The scan's new output layout plus the mapping the expression rewriter
/// consumes.
///
/// `field_map` has one entry per retained leaf: the original field-position
/// path of the leaf mapped to its position path in the reduced base row.
/// Leaves are prefix-free (trie invariant), so any extracted access chain
/// matches exactly one entry via longest-prefix lookup. Metadata columns map
/// by key to their output position behind the base row.
#[derive(Debug)]
pub struct ReducedSchema {
    schema: RowSchema,
    metadata: Vec<MetaColumn>,
    field_map: HashMap<Vec<usize>, Vec<usize>>,
    meta_map: HashMap<String, usize>,
}

impl ReducedSchema {
    /// The reduced base row.
    pub fn schema(&self) -> &RowSchema {
        &self.schema
    }

    /// Metadata columns the scan will produce, behind the base row.
    pub fn metadata(&self) -> &[MetaColumn] {
        &self.metadata
    }

    /// New position path for an original leaf path, if that exact prefix
    /// was retained.
    pub fn field_position(&self, original: &[usize]) -> Option<&[usize]> {
        self.field_map.get(original).map(Vec::as_slice)
    }

    /// Output position of a metadata column.
    pub fn meta_position(&self, key: &str) -> Option<usize> {
        self.meta_map.get(key).copied()
    }

    pub fn base_len(&self) -> usize {
        self.schema.len()
    }

    /// Total output width, base row plus metadata.
    pub fn output_len(&self) -> usize {
        self.schema.len() + self.metadata.len()
    }
}

/// Build the reduced output for a negotiated plan.
///
/// Deterministic: top-level trie entries are laid out in insertion order,
/// nested retained fields in trie child order, metadata columns behind the
/// base row in the order the plan requests them.
pub fn reduce_schema(scan_schema: &RowSchema, plan: &PushdownPlan) -> ReducedSchema {
    let mut field_map = HashMap::new();
    let mut fields = Vec::new();

    match plan.mode {
        FieldMode::Retain => {
            // base row untouched; identity mapping for every column
            fields.extend(scan_schema.fields().iter().map(|field| field.as_ref().clone()));
            for index in 0..scan_schema.len() {
                field_map.insert(vec![index], vec![index]);
            }
        }
        FieldMode::TopLevel | FieldMode::Nested => {
            for (new_index, (orig_index, node)) in plan.trie.top_level().enumerate() {
                let field = scan_schema.field(orig_index);
                let reduced = reduce_field(
                    field,
                    node,
                    &mut vec![orig_index],
                    &mut vec![new_index],
                    &mut field_map,
                );
                fields.push(reduced);
            }
        }
    }

    let schema = RowSchema::from_fields(fields);
    let base_len = schema.len();
    let meta_map = plan
        .metadata
        .iter()
        .enumerate()
        .map(|(i, column)| (column.key.clone(), base_len + i))
        .collect();

    ReducedSchema {
        schema,
        metadata: plan.metadata.clone(),
        field_map,
        meta_map,
    }
}

/// Reduce one field according to its trie node, recording leaf mappings.
///
/// A leaf keeps the field's full original type. An inner node narrows a
/// row-typed field to the retained sub-fields in trie order. An inner node
/// over a non-row type cannot be narrowed and degrades to the whole field,
/// which is always safe.
fn reduce_field(
    field: &Field,
    node: &TrieNode,
    orig_prefix: &mut Vec<usize>,
    new_prefix: &mut Vec<usize>,
    field_map: &mut HashMap<Vec<usize>, Vec<usize>>,
) -> Field {
    if node.is_leaf() {
        field_map.insert(orig_prefix.clone(), new_prefix.clone());
        return field.clone();
    }

    let DataType::Struct(children) = field.data_type() else {
        field_map.insert(orig_prefix.clone(), new_prefix.clone());
        return field.clone();
    };

    let mut reduced_children = Vec::new();
    for (new_index, (orig_index, child_node)) in node.children().enumerate() {
        let child = children[orig_index].as_ref();
        orig_prefix.push(orig_index);
        new_prefix.push(new_index);
        reduced_children.push(reduce_field(
            child,
            child_node,
            orig_prefix,
            new_prefix,
            field_map,
        ));
        orig_prefix.pop();
        new_prefix.pop();
    }

    Field::new(
        field.name(),
        DataType::Struct(reduced_children.into()),
        field.is_nullable(),
    )
}
