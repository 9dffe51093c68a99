//! Plan fragment IR shared by the planner's rewrite rules.
//!
//! Three pieces live here:
//!
//! - [`expr`]: scalar expressions as an immutable, arena-allocated tree.
//!   Rewrites build new nodes and hand back new [`ExprId`]s; shared
//!   substructure is never mutated in place.
//! - [`scan`]: the [`TableScan`] leaf node, producing a base row (a
//!   [`RowSchema`]) followed by zero or more synthetic metadata columns.
//! - [`source`]: the [`ScanSource`] collaborator contract a table source
//!   declares to the optimizer, and the plain [`SourceCapabilities`]
//!   snapshot rules operate on.
//!
//! [`RowSchema`]: row_schema::RowSchema

pub mod expr;
pub mod scan;
pub mod source;
pub mod test_source;

pub use expr::{BinaryOp, Expr, ExprArena, ExprId, IndexKey, Literal};
pub use scan::{MetaColumn, TableScan};
pub use source::{ScanSource, SourceCapabilities};
