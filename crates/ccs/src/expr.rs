//! The integer expression sublanguage: constants, identifiers, and unary/binary
//! operators, with capture-free substitution, optional constant folding, and
//! evaluation.

use std::cmp::Ordering;
use std::fmt;
use std::rc::Rc;

use crate::error::ExprError;

/// Unary operators, in declaration order (used by the structural order).
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub enum UnaryOp {
    Plus,
    Minus,
    Not,
}

impl fmt::Display for UnaryOp {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Self::Plus => "+",
            Self::Minus => "-",
            Self::Not => "!",
        })
    }
}

/// Binary operators, in declaration order (used by the structural order).
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub enum BinaryOp {
    Add,
    Sub,
    Mul,
    Div,
    Mod,
    And,
    Or,
    Eq,
    Neq,
    Lt,
    Leq,
    Gt,
    Geq,
}

impl fmt::Display for BinaryOp {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Self::Add => "+",
            Self::Sub => "-",
            Self::Mul => "*",
            Self::Div => "/",
            Self::Mod => "%",
            Self::And => "&&",
            Self::Or => "||",
            Self::Eq => "==",
            Self::Neq => "!=",
            Self::Lt => "<",
            Self::Leq => "<=",
            Self::Gt => ">",
            Self::Geq => ">=",
        })
    }
}

/// An immutable integer expression tree.
///
/// Built once, never mutated: `subst` and folding return new trees, sharing
/// unchanged subtrees via `Rc`.
#[derive(Debug, Clone)]
pub enum Expression {
    Const(i64),
    Id(String),
    Unary(UnaryOp, Rc<Expression>),
    Binary(BinaryOp, Rc<Expression>, Rc<Expression>),
}

impl Expression {
    pub fn const_(v: i64) -> Rc<Self> {
        Rc::new(Self::Const(v))
    }

    pub fn id(name: impl Into<String>) -> Rc<Self> {
        Rc::new(Self::Id(name.into()))
    }

    pub fn unary(op: UnaryOp, e: Rc<Self>) -> Rc<Self> {
        Rc::new(Self::Unary(op, e))
    }

    pub fn binary(op: BinaryOp, l: Rc<Self>, r: Rc<Self>) -> Rc<Self> {
        Rc::new(Self::Binary(op, l, r))
    }

    /// Structural total order: tag first, then fields in declaration order.
    pub fn compare(&self, other: &Self) -> Ordering {
        fn tag(e: &Expression) -> u8 {
            match e {
                Expression::Const(_) => 0,
                Expression::Id(_) => 1,
                Expression::Unary(..) => 2,
                Expression::Binary(..) => 3,
            }
        }
        match (self, other) {
            (Self::Const(a), Self::Const(b)) => a.cmp(b),
            (Self::Id(a), Self::Id(b)) => a.cmp(b),
            (Self::Unary(op1, e1), Self::Unary(op2, e2)) => op1.cmp(op2).then_with(|| e1.compare(e2)),
            (Self::Binary(op1, l1, r1), Self::Binary(op2, l2, r2)) => {
                op1.cmp(op2).then_with(|| l1.compare(l2)).then_with(|| r1.compare(r2))
            }
            _ => tag(self).cmp(&tag(other)),
        }
    }

    /// Substitutes `Const(v)` for every free occurrence of `id`. When `fold`
    /// is set and every operand of a node becomes `Const`, the node itself
    /// folds to a `Const`. Subtrees with no matching identifier and nothing
    /// to fold are returned unchanged (`Rc::clone`, no new allocation).
    pub fn subst(self: &Rc<Self>, id: &str, v: i64, fold: bool) -> Rc<Self> {
        match self.as_ref() {
            Self::Const(_) => Rc::clone(self),
            Self::Id(name) => {
                if name == id {
                    Self::const_(v)
                } else {
                    Rc::clone(self)
                }
            }
            Self::Unary(op, e) => {
                let e2 = e.subst(id, v, fold);
                if fold {
                    if let Self::Const(n) = e2.as_ref() {
                        return Self::const_(apply_unary(*op, *n));
                    }
                }
                if Rc::ptr_eq(&e2, e) { Rc::clone(self) } else { Self::unary(*op, e2) }
            }
            Self::Binary(op, l, r) => {
                let l2 = l.subst(id, v, fold);
                let r2 = r.subst(id, v, fold);
                if fold {
                    if let (Self::Const(a), Self::Const(b)) = (l2.as_ref(), r2.as_ref()) {
                        return match apply_binary(*op, *a, *b) {
                            Ok(n) => Self::const_(n),
                            Err(_) => Self::binary(*op, l2, r2),
                        };
                    }
                }
                if Rc::ptr_eq(&l2, l) && Rc::ptr_eq(&r2, r) {
                    Rc::clone(self)
                } else {
                    Self::binary(*op, l2, r2)
                }
            }
        }
    }

    /// Evaluates to an integer. `Id("true")`/`Id("false")` evaluate to `1`/`0`;
    /// any other free identifier is `Unbound`. Both operands of `&&`/`||` are
    /// always evaluated (no short-circuit), matching the reference semantics.
    pub fn eval(self: &Rc<Self>) -> Result<i64, ExprError> {
        match self.as_ref() {
            Self::Const(v) => Ok(*v),
            Self::Id(name) => match name.as_str() {
                "true" => Ok(1),
                "false" => Ok(0),
                _ => Err(ExprError::Unbound { id: name.clone(), at: Rc::clone(self) }),
            },
            Self::Unary(op, e) => {
                let v = e.eval().map_err(|err| repoint(err, self))?;
                Ok(apply_unary(*op, v))
            }
            Self::Binary(op, l, r) => {
                let a = l.eval().map_err(|err| repoint(err, self))?;
                let b = r.eval().map_err(|err| repoint(err, self))?;
                apply_binary(*op, a, b).map_err(|err| repoint(err, self))
            }
        }
    }
}

/// Repoints an error raised in a subexpression to the enclosing node, so the
/// diagnostic shows the outermost context rather than the innermost leaf.
fn repoint(err: ExprError, at: &Rc<Expression>) -> ExprError {
    match err {
        ExprError::Unbound { id, .. } => ExprError::Unbound { id, at: Rc::clone(at) },
        ExprError::Undefined { .. } => ExprError::Undefined { at: Rc::clone(at) },
    }
}

fn apply_unary(op: UnaryOp, v: i64) -> i64 {
    match op {
        UnaryOp::Plus => v,
        UnaryOp::Minus => -v,
        UnaryOp::Not => i64::from(v == 0),
    }
}

fn apply_binary(op: BinaryOp, a: i64, b: i64) -> Result<i64, ExprError> {
    let bool_of = |b: bool| i64::from(b);
    Ok(match op {
        BinaryOp::Add => a + b,
        BinaryOp::Sub => a - b,
        BinaryOp::Mul => a * b,
        BinaryOp::Div => {
            if b == 0 {
                return Err(ExprError::Undefined { at: Expression::const_(0) });
            }
            a / b
        }
        BinaryOp::Mod => {
            if b == 0 {
                return Err(ExprError::Undefined { at: Expression::const_(0) });
            }
            a % b
        }
        BinaryOp::And => bool_of(a != 0 && b != 0),
        BinaryOp::Or => bool_of(a != 0 || b != 0),
        BinaryOp::Eq => bool_of(a == b),
        BinaryOp::Neq => bool_of(a != b),
        BinaryOp::Lt => bool_of(a < b),
        BinaryOp::Leq => bool_of(a <= b),
        BinaryOp::Gt => bool_of(a > b),
        BinaryOp::Geq => bool_of(a >= b),
    })
}

impl fmt::Display for Expression {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Const(v) => write!(f, "{v}"),
            Self::Id(name) => write!(f, "{name}"),
            Self::Unary(op, e) => write!(f, "({op}{e})"),
            Self::Binary(op, l, r) => write!(f, "({l} {op} {r})"),
        }
    }
}

impl PartialEq for Expression {
    fn eq(&self, other: &Self) -> bool {
        self.compare(other) == Ordering::Equal
    }
}
impl Eq for Expression {}

impl PartialOrd for Expression {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.compare(other))
    }
}
impl Ord for Expression {
    fn cmp(&self, other: &Self) -> Ordering {
        self.compare(other)
    }
}
