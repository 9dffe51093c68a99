//! Extraction of field paths and metadata references from expressions.

use arrow::datatypes::DataType;
use hashbrown::HashSet;
use indexmap::IndexSet;
use plan_types::{Expr, ExprArena, ExprId, IndexKey, TableScan};
use row_schema::{FieldPath, PathStep};
use snafu::ResultExt;

use crate::{ColumnOutOfRangeSnafu, PathResolutionSnafu, Result};

/// Everything a set of expressions reads from a scan's output.
#[derive(Debug, Default)]
pub struct ScanReads {
    /// Field-access paths into the base row, in first-seen order,
    /// duplicate-free.
    pub paths: Vec<FieldPath>,
    /// Referenced metadata keys, in first-reference order.
    pub metadata_keys: IndexSet<String>,
}

/// Collect the field paths and metadata requirements of `exprs`.
///
/// Pure function of the expressions and the scan's current output layout.
/// Pure literal/constant subtrees contribute nothing. A subscript whose
/// index is not constant seals the path at the container: the whole
/// array/map is recorded as needed and any further access past the dynamic
/// step is not tracked (it cannot narrow the request), while the subscript
/// expression itself is still walked for its own column reads.
pub fn extract_reads(
    arena: &ExprArena,
    exprs: &[ExprId],
    scan: &TableScan,
) -> Result<ScanReads> {
    let mut extractor = Extractor {
        arena,
        scan,
        reads: ScanReads::default(),
        seen_paths: HashSet::new(),
    };
    for expr in exprs {
        extractor.visit(*expr)?;
    }
    Ok(extractor.reads)
}

/// A resolved access chain: either a path into the base row or a metadata
/// column reference.
enum Read {
    Path(FieldPath),
    Meta(String),
}

struct Extractor<'a> {
    arena: &'a ExprArena,
    scan: &'a TableScan,
    reads: ScanReads,
    seen_paths: HashSet<FieldPath>,
}

impl Extractor<'_> {
    fn visit(&mut self, id: ExprId) -> Result<()> {
        if let Some(read) = self.chain(id)? {
            self.record(read);
            return Ok(());
        }
        match self.arena.expr(id) {
            Expr::Literal(_) | Expr::Column(_) => {}
            Expr::GetField { base, .. } => self.visit(*base)?,
            Expr::Index { base, key } => {
                self.visit(*base)?;
                if let IndexKey::Dynamic(key) = key {
                    self.visit(*key)?;
                }
            }
            Expr::Binary { left, right, .. } => {
                self.visit(*left)?;
                self.visit(*right)?;
            }
            Expr::Call { args, .. } => {
                for arg in args {
                    self.visit(*arg)?;
                }
            }
        }
        Ok(())
    }

    /// Resolve `id` as a column/field/subscript chain rooted at a scan
    /// column. Returns `None` when the chain bottoms out in something else
    /// (a function call, arithmetic, ...), in which case the caller recurses
    /// structurally instead.
    fn chain(&mut self, id: ExprId) -> Result<Option<Read>> {
        match self.arena.expr(id) {
            Expr::Column(index) => {
                let base_len = self.scan.base_len();
                if *index < base_len {
                    return Ok(Some(Read::Path(FieldPath::root(*index))));
                }
                let Some(meta) = self.scan.meta_at(*index) else {
                    return ColumnOutOfRangeSnafu {
                        index: *index,
                        width: self.scan.output_len(),
                    }
                    .fail();
                };
                Ok(Some(Read::Meta(meta.key.clone())))
            }
            Expr::GetField { base, index } => {
                let Some(read) = self.chain(*base)? else {
                    return Ok(None);
                };
                match read {
                    // Metadata columns are materialized whole; nested access
                    // into one adds nothing to the request.
                    Read::Meta(key) => Ok(Some(Read::Meta(key))),
                    Read::Path(path) if path.is_sealed() => Ok(Some(Read::Path(path))),
                    Read::Path(mut path) => {
                        path.push(PathStep::Field(*index))
                            .expect("path not sealed");
                        Ok(Some(Read::Path(path)))
                    }
                }
            }
            Expr::Index { base, key } => {
                let Some(read) = self.chain(*base)? else {
                    return Ok(None);
                };
                if let IndexKey::Dynamic(key) = key {
                    // the subscript reads columns of its own
                    self.visit(*key)?;
                }
                match read {
                    Read::Meta(meta_key) => Ok(Some(Read::Meta(meta_key))),
                    Read::Path(path) if path.is_sealed() => Ok(Some(Read::Path(path))),
                    Read::Path(mut path) => {
                        let step = self.container_step(&path, key)?;
                        path.push(step).expect("path not sealed");
                        Ok(Some(Read::Path(path)))
                    }
                }
            }
            _ => Ok(None),
        }
    }

    /// Pick the path step for a subscript, based on whether the container
    /// at `path` is an array or a map.
    fn container_step(&self, path: &FieldPath, key: &IndexKey) -> Result<PathStep> {
        let data_type = self
            .scan
            .schema()
            .data_type_at(path)
            .context(PathResolutionSnafu {
                path: path.to_string(),
            })?;
        let step = match (&data_type, key) {
            (DataType::Map(..), IndexKey::Dynamic(_)) => PathStep::MapAny,
            (DataType::Map(..), IndexKey::MapConst(map_key)) => {
                PathStep::MapKey(map_key.clone())
            }
            // constant integer subscript on a map is legal in principle;
            // record it by its display form, the trie pins the whole
            // container either way
            (DataType::Map(..), IndexKey::ArrayConst(index)) => {
                PathStep::MapKey(index.to_string())
            }
            (_, IndexKey::Dynamic(_)) => PathStep::ArrayAny,
            (_, IndexKey::ArrayConst(index)) => PathStep::ArrayIndex(*index),
            (_, IndexKey::MapConst(map_key)) => PathStep::MapKey(map_key.clone()),
        };
        Ok(step)
    }

    fn record(&mut self, read: Read) {
        match read {
            Read::Path(path) => {
                if self.seen_paths.insert(path.clone()) {
                    self.reads.paths.push(path);
                }
            }
            Read::Meta(key) => {
                self.reads.metadata_keys.insert(key);
            }
        }
    }
}
