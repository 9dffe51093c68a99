//! Rewriting expressions against the reduced scan output.

use plan_types::{Expr, ExprArena, ExprId, IndexKey, TableScan};
use snafu::OptionExt;

use crate::{ColumnOutOfRangeSnafu, Result, UnresolvedPathSnafu, reduce::ReducedSchema};

/// Rebuild `exprs` so every reference resolves against the reduced layout.
///
/// Access chains are remapped by longest retained prefix: the prefix that
/// matches a leaf of the reduced schema collapses into a direct reference
/// chain at the new position, and whatever the original expression did past
/// that point (deeper field access, subscripts) is re-applied unchanged on
/// top. Metadata references are re-pointed by key. Expressions are rebuilt
/// into new arena nodes; nothing is mutated in place.
///
/// Rewriting is total: an access chain with no mapping entry means the
/// extractor and the reducer disagreed, which is a defect, not a
/// recoverable condition.
pub fn rewrite_exprs(
    arena: &mut ExprArena,
    exprs: &[ExprId],
    scan: &TableScan,
    reduced: &ReducedSchema,
) -> Result<Vec<ExprId>> {
    exprs
        .iter()
        .map(|expr| rewrite(arena, *expr, scan, reduced))
        .collect()
}

fn rewrite(
    arena: &mut ExprArena,
    id: ExprId,
    scan: &TableScan,
    reduced: &ReducedSchema,
) -> Result<ExprId> {
    if let Some(rewritten) = rewrite_chain(arena, id, scan, reduced)? {
        return Ok(rewritten);
    }
    let rebuilt = match arena.expr(id).clone() {
        expr @ (Expr::Literal(_) | Expr::Column(_)) => expr,
        Expr::GetField { base, index } => Expr::GetField {
            base: rewrite(arena, base, scan, reduced)?,
            index,
        },
        Expr::Index { base, key } => Expr::Index {
            base: rewrite(arena, base, scan, reduced)?,
            key: rewrite_key(arena, key, scan, reduced)?,
        },
        Expr::Binary { op, left, right } => Expr::Binary {
            op,
            left: rewrite(arena, left, scan, reduced)?,
            right: rewrite(arena, right, scan, reduced)?,
        },
        Expr::Call { name, args } => Expr::Call {
            name,
            args: args
                .into_iter()
                .map(|arg| rewrite(arena, arg, scan, reduced))
                .collect::<Result<Vec<_>>>()?,
        },
    };
    Ok(arena.alloc(rebuilt))
}

fn rewrite_key(
    arena: &mut ExprArena,
    key: IndexKey,
    scan: &TableScan,
    reduced: &ReducedSchema,
) -> Result<IndexKey> {
    Ok(match key {
        IndexKey::Dynamic(expr) => IndexKey::Dynamic(rewrite(arena, expr, scan, reduced)?),
        constant => constant,
    })
}

/// One deferred operation of an access chain, in root-to-tip order once the
/// collection below is reversed.
#[derive(Debug, Clone)]
enum ChainOp {
    Get(usize),
    Subscript(IndexKey),
}

/// Rewrite `id` if it is an access chain rooted at a scan column.
///
/// Returns `Ok(None)` when the tree bottoms out in a non-chain node, which
/// sends the caller down the structural path instead.
fn rewrite_chain(
    arena: &mut ExprArena,
    id: ExprId,
    scan: &TableScan,
    reduced: &ReducedSchema,
) -> Result<Option<ExprId>> {
    // walk down to the chain root, collecting deferred operations
    let mut ops = Vec::new();
    let mut current = id;
    let root = loop {
        match arena.expr(current) {
            Expr::Column(index) => break *index,
            Expr::GetField { base, index } => {
                ops.push(ChainOp::Get(*index));
                current = *base;
            }
            Expr::Index { base, key } => {
                ops.push(ChainOp::Subscript(key.clone()));
                current = *base;
            }
            _ => return Ok(None),
        }
    };
    ops.reverse();

    // metadata reference: re-point by key, keep all operations
    if let Some(meta) = scan.meta_at(root) {
        let new_position = reduced.meta_position(&meta.key).context(UnresolvedPathSnafu {
            path: format!("@{}", meta.key),
        })?;
        let base = arena.column(new_position);
        return apply_ops(arena, base, &ops, scan, reduced).map(Some);
    }
    if root >= scan.base_len() {
        return ColumnOutOfRangeSnafu {
            index: root,
            width: scan.output_len(),
        }
        .fail();
    }

    // base-row reference: find the retained leaf covering this chain.
    // Leaves are prefix-free, so the first matching prefix is the only one.
    let mut prefix = vec![root];
    let mut consumed = 0;
    let new_path = loop {
        if let Some(new_path) = reduced.field_position(&prefix) {
            break new_path.to_vec();
        }
        match ops.get(consumed) {
            Some(ChainOp::Get(index)) => {
                prefix.push(*index);
                consumed += 1;
            }
            // a subscript never extends the retained prefix, and running
            // out of operations means no leaf covers this chain
            Some(ChainOp::Subscript(_)) | None => {
                return UnresolvedPathSnafu {
                    path: prefix
                        .iter()
                        .map(ToString::to_string)
                        .collect::<Vec<_>>()
                        .join("."),
                }
                .fail();
            }
        }
    };

    // direct reference chain to the new position
    let mut base = arena.column(new_path[0]);
    for index in &new_path[1..] {
        base = arena.get_field(base, *index);
    }
    apply_ops(arena, base, &ops[consumed..], scan, reduced).map(Some)
}

/// Re-apply deferred chain operations on top of a rewritten base.
fn apply_ops(
    arena: &mut ExprArena,
    base: ExprId,
    ops: &[ChainOp],
    scan: &TableScan,
    reduced: &ReducedSchema,
) -> Result<ExprId> {
    let mut out = base;
    for op in ops {
        out = match op {
            ChainOp::Get(index) => arena.get_field(out, *index),
            ChainOp::Subscript(key) => {
                let key = rewrite_key(arena, key.clone(), scan, reduced)?;
                arena.alloc(Expr::Index { base: out, key })
            }
        };
    }
    Ok(out)
}
