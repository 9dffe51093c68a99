//! Scalar expressions over a scan's output row.

use std::fmt;

use ordered_float::OrderedFloat;

/// Index of an expression inside an [`ExprArena`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct ExprId(u32);

/// Constant scalar value.
///
/// Floats are wrapped in [`OrderedFloat`] so literals are `Eq`/`Hash` and
/// expression trees can be compared structurally.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum Literal {
    Null,
    Bool(bool),
    Int64(i64),
    Float64(OrderedFloat<f64>),
    Utf8(String),
}

impl fmt::Display for Literal {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Null => write!(f, "NULL"),
            Self::Bool(v) => write!(f, "{v}"),
            Self::Int64(v) => write!(f, "{v}"),
            Self::Float64(v) => write!(f, "{v}"),
            Self::Utf8(v) => write!(f, "'{v}'"),
        }
    }
}

/// Binary scalar operators.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum BinaryOp {
    Add,
    Sub,
    Mul,
    Div,
    Eq,
    NotEq,
    Lt,
    LtEq,
    Gt,
    GtEq,
    And,
    Or,
}

impl BinaryOp {
    fn symbol(&self) -> &'static str {
        match self {
            Self::Add => "+",
            Self::Sub => "-",
            Self::Mul => "*",
            Self::Div => "/",
            Self::Eq => "=",
            Self::NotEq => "<>",
            Self::Lt => "<",
            Self::LtEq => "<=",
            Self::Gt => ">",
            Self::GtEq => ">=",
            Self::And => "AND",
            Self::Or => "OR",
        }
    }
}

/// Array/map subscript key of an [`Expr::Index`] operator.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum IndexKey {
    /// Constant array index, known at optimization time.
    ArrayConst(i64),
    /// Constant map key, known at optimization time.
    MapConst(String),
    /// Index/key only known at runtime; the subscript expression may itself
    /// read scan columns.
    Dynamic(ExprId),
}

/// One node of an expression tree.
///
/// Column references address the scan's *current* output by position, with
/// metadata columns following the base-row fields. Nested access is spelled
/// out as [`Expr::GetField`] / [`Expr::Index`] chains; the projection
/// pushdown rewriter re-points those chains after schema reduction.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum Expr {
    Literal(Literal),
    /// Reference to an output column of the scan below.
    Column(usize),
    /// Access a field of a row-typed operand, by position.
    GetField { base: ExprId, index: usize },
    /// Subscript an array- or map-typed operand.
    Index { base: ExprId, key: IndexKey },
    Binary {
        op: BinaryOp,
        left: ExprId,
        right: ExprId,
    },
    /// Opaque scalar function call.
    Call { name: String, args: Vec<ExprId> },
}

/// Append-only arena holding expression trees.
///
/// All expressions of one rewrite invocation live in a single arena; nodes
/// are immutable once allocated and rewrites allocate new nodes.
#[derive(Debug, Default)]
pub struct ExprArena {
    exprs: Vec<Expr>,
}

impl ExprArena {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn alloc(&mut self, expr: Expr) -> ExprId {
        let id = ExprId(u32::try_from(self.exprs.len()).expect("arena overflow"));
        self.exprs.push(expr);
        id
    }

    pub fn expr(&self, id: ExprId) -> &Expr {
        &self.exprs[id.0 as usize]
    }

    pub fn len(&self) -> usize {
        self.exprs.len()
    }

    pub fn is_empty(&self) -> bool {
        self.exprs.is_empty()
    }

    // ---- convenience constructors -------------------------------------

    pub fn column(&mut self, index: usize) -> ExprId {
        self.alloc(Expr::Column(index))
    }

    pub fn lit_i64(&mut self, value: i64) -> ExprId {
        self.alloc(Expr::Literal(Literal::Int64(value)))
    }

    pub fn lit_str(&mut self, value: impl Into<String>) -> ExprId {
        self.alloc(Expr::Literal(Literal::Utf8(value.into())))
    }

    pub fn get_field(&mut self, base: ExprId, index: usize) -> ExprId {
        self.alloc(Expr::GetField { base, index })
    }

    pub fn index_array(&mut self, base: ExprId, index: i64) -> ExprId {
        self.alloc(Expr::Index {
            base,
            key: IndexKey::ArrayConst(index),
        })
    }

    pub fn index_map(&mut self, base: ExprId, key: impl Into<String>) -> ExprId {
        self.alloc(Expr::Index {
            base,
            key: IndexKey::MapConst(key.into()),
        })
    }

    pub fn index_dyn(&mut self, base: ExprId, key: ExprId) -> ExprId {
        self.alloc(Expr::Index {
            base,
            key: IndexKey::Dynamic(key),
        })
    }

    pub fn binary(&mut self, op: BinaryOp, left: ExprId, right: ExprId) -> ExprId {
        self.alloc(Expr::Binary { op, left, right })
    }

    pub fn call(&mut self, name: impl Into<String>, args: Vec<ExprId>) -> ExprId {
        self.alloc(Expr::Call {
            name: name.into(),
            args,
        })
    }

    /// Render an expression for logs and test assertions. Column references
    /// print as `$<position>`.
    pub fn display(&self, id: ExprId) -> ExprDisplay<'_> {
        ExprDisplay { arena: self, id }
    }
}

#[derive(Debug, Clone, Copy)]
pub struct ExprDisplay<'a> {
    arena: &'a ExprArena,
    id: ExprId,
}

impl fmt::Display for ExprDisplay<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let sub = |id| ExprDisplay {
            arena: self.arena,
            id,
        };
        match self.arena.expr(self.id) {
            Expr::Literal(literal) => write!(f, "{literal}"),
            Expr::Column(index) => write!(f, "${index}"),
            Expr::GetField { base, index } => write!(f, "{}.{index}", sub(*base)),
            Expr::Index { base, key } => match key {
                IndexKey::ArrayConst(index) => write!(f, "{}[{index}]", sub(*base)),
                IndexKey::MapConst(map_key) => write!(f, "{}['{map_key}']", sub(*base)),
                IndexKey::Dynamic(key) => write!(f, "{}[{}]", sub(*base), sub(*key)),
            },
            Expr::Binary { op, left, right } => {
                write!(f, "({} {} {})", sub(*left), op.symbol(), sub(*right))
            }
            Expr::Call { name, args } => {
                write!(f, "{name}(")?;
                for (i, arg) in args.iter().enumerate() {
                    if i > 0 {
                        write!(f, ", ")?;
                    }
                    write!(f, "{}", sub(*arg))?;
                }
                write!(f, ")")
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn display_chains_and_operators() {
        let mut arena = ExprArena::new();
        let col = arena.column(1);
        let nested = arena.get_field(col, 0);
        let item = arena.index_map(nested, "item");
        let value = arena.get_field(item, 1);
        assert_eq!(arena.display(value).to_string(), "$1.0['item'].1");

        let id_col = arena.column(0);
        let dynamic = arena.index_dyn(nested, id_col);
        assert_eq!(arena.display(dynamic).to_string(), "$1.0[$0]");

        let lit = arena.lit_i64(2);
        let sum = arena.binary(BinaryOp::Add, value, lit);
        assert_eq!(arena.display(sum).to_string(), "($1.0['item'].1 + 2)");

        let call = arena.call("upper", vec![col]);
        assert_eq!(arena.display(call).to_string(), "upper($1)");
    }

    #[test]
    fn arena_nodes_are_structurally_comparable() {
        let mut arena = ExprArena::new();
        let a = arena.column(3);
        let b = arena.column(3);
        assert_ne!(a, b);
        assert_eq!(arena.expr(a), arena.expr(b));
    }
}
