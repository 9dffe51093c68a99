//! The rewrite rule: project-into-scan, end to end.

use plan_types::{Expr, ExprArena, ExprId, SourceCapabilities, TableScan};
use row_schema::FieldPath;
use tracing::{debug, warn};

use crate::{
    MetadataContractSnafu, Result, UnresolvedPathSnafu,
    extract::extract_reads,
    negotiate::negotiate,
    reduce::{ReducedSchema, reduce_schema},
    rewrite::rewrite_exprs,
};

/// What the rule produced for one (projection, scan) pair.
#[derive(Debug)]
pub enum RuleOutcome {
    /// The scan already produces exactly what the expressions need; the
    /// original plan fragment stands.
    Unchanged,
    /// The scan was narrowed and the expressions rebuilt against it.
    Rewritten {
        scan: TableScan,
        exprs: Vec<ExprId>,
        /// Whether a projection node is still needed above the new scan.
        /// `false` when the rewritten expressions are exactly the scan's
        /// output columns in order, so the projection can be dropped.
        projection_required: bool,
    },
}

/// Run the full pushdown pipeline for one projection over one scan.
///
/// The no-op check happens *before* the source is touched: when the reduced
/// output equals the scan's current output (schema and metadata both), the
/// rule reports [`RuleOutcome::Unchanged`] without calling
/// `apply_pushdown`. Since a rewritten scan always carries its reduced
/// output as its current output, running the rule a second time on its own
/// result hits this check, which is what makes the rule idempotent.
///
/// After applying, the source's reported applied metadata keys are checked
/// against its declared set; a key outside that set is a capability-contract
/// violation and surfaces as an error rather than a silently wrong plan.
pub fn push_project_into_scan(
    arena: &mut ExprArena,
    scan: &TableScan,
    exprs: &[ExprId],
) -> Result<RuleOutcome> {
    let caps = SourceCapabilities::of(scan.source().as_ref());
    let reads = extract_reads(arena, exprs, scan)?;
    let plan = negotiate(&caps, &reads)?;
    let reduced = reduce_schema(scan.schema(), &plan);

    if reduced.schema() == scan.schema() && reduced.metadata() == scan.metadata() {
        debug!(table = scan.table(), "scan output already minimal");
        return Ok(RuleOutcome::Unchanged);
    }

    let exprs = rewrite_exprs(arena, exprs, scan, &reduced)?;
    let retained = remap_mandatory_retain(&caps.mandatory_retain, &reduced)?;
    let source = scan
        .source()
        .apply_pushdown(reduced.schema(), reduced.metadata(), &retained);

    if let Some(applied) = source.applied_metadata_keys() {
        for key in applied {
            if caps.declared_metadata_key(&key).is_none() {
                return MetadataContractSnafu { key }.fail();
            }
        }
    }

    let scan = TableScan::new(
        scan.table(),
        source,
        reduced.schema().clone(),
        reduced.metadata().to_vec(),
    );
    let projection_required = !is_identity(arena, &exprs, scan.output_len());

    debug!(
        table = scan.table(),
        output_width = scan.output_len(),
        projection_required,
        "pushed projection into scan"
    );

    Ok(RuleOutcome::Rewritten {
        scan,
        exprs,
        projection_required,
    })
}

/// Re-anchor the source's mandatory-retain paths to the reduced layout.
///
/// Retain paths are declared against the schema the source currently
/// produces; the applied source must declare them against the schema it
/// *will* produce, or resolving them on a later pass reads the wrong
/// columns. Negotiation inserted every retain path into the trie, so each
/// one has a covering leaf in the mapping: the covered prefix moves to the
/// leaf's new position, and any remainder below the leaf keeps its
/// positions (the leaf was retained with its full original type).
fn remap_mandatory_retain(
    paths: &[FieldPath],
    reduced: &ReducedSchema,
) -> Result<Vec<FieldPath>> {
    paths
        .iter()
        .map(|path| {
            let original: Vec<usize> = path.field_prefix().collect();
            for split in 1..=original.len() {
                if let Some(mapped) = reduced.field_position(&original[..split]) {
                    let steps = mapped
                        .iter()
                        .chain(&original[split..])
                        .copied();
                    return Ok(FieldPath::fields(steps));
                }
            }
            UnresolvedPathSnafu {
                path: path.to_string(),
            }
            .fail()
        })
        .collect()
}

/// Whether `exprs` is exactly `$0, $1, .., $n-1` over an `n`-wide scan.
fn is_identity(arena: &ExprArena, exprs: &[ExprId], output_len: usize) -> bool {
    exprs.len() == output_len
        && exprs
            .iter()
            .enumerate()
            .all(|(position, id)| matches!(arena.expr(*id), Expr::Column(index) if *index == position))
}

/// The rule as an optimizer-driver entry point.
///
/// Errors that mean "this source cannot take the pushdown" demote to
/// [`RuleOutcome::Unchanged`] with a warning; internal errors propagate so
/// the driver fails the optimization instead of producing a plan that drops
/// data.
#[derive(Debug, Default, Clone, Copy)]
pub struct ProjectionPushdown;

impl ProjectionPushdown {
    pub fn name(&self) -> &'static str {
        "projection_pushdown"
    }

    pub fn try_apply(
        &self,
        arena: &mut ExprArena,
        scan: &TableScan,
        exprs: &[ExprId],
    ) -> Result<RuleOutcome> {
        match push_project_into_scan(arena, scan, exprs) {
            Ok(outcome) => Ok(outcome),
            Err(e) if e.keeps_original_plan() => {
                warn!(table = scan.table(), %e, "projection pushdown not applied");
                Ok(RuleOutcome::Unchanged)
            }
            Err(e) => Err(e),
        }
    }
}
