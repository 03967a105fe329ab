//! Error types, split by pipeline stage: lexing/parsing, then evaluation.
//!
//! Keeping parse and engine failures as distinct types lets callers
//! (the CLI, the exploration driver) decide per-stage whether to warn
//! and continue or abort, without string matching.

use std::fmt;
use std::rc::Rc;

use crate::expr::Expression;

/// A position in source text: one-based line and column, plus an
/// optional source name (the input file path, or "stdin").
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CodeLoc {
    pub line: u32,
    pub column: u32,
}

impl CodeLoc {
    pub const fn new(line: u32, column: u32) -> Self {
        Self { line, column }
    }
}

impl fmt::Display for CodeLoc {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}:{}", self.line, self.column)
    }
}

/// A source range used to annotate parse errors.
#[derive(Debug, Clone, Eq, PartialEq)]
pub struct CodeRange {
    pub source: Rc<str>,
    pub start: CodeLoc,
}

impl CodeRange {
    pub fn new(source: Rc<str>, start: CodeLoc) -> Self {
        Self { source, start }
    }
}

impl fmt::Display for CodeRange {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}:{}", self.source, self.start)
    }
}

/// Failures from evaluating or substituting into an [`Expression`].
#[derive(Debug, Clone)]
pub enum ExprError {
    /// A free identifier other than `true`/`false` had no binding.
    Unbound { id: String, at: Rc<Expression> },
    /// Division or modulo by zero.
    Undefined { at: Rc<Expression> },
}

impl fmt::Display for ExprError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Unbound { id, at } => write!(f, "unbound identifier '{id}' in {at}"),
            Self::Undefined { at } => write!(f, "undefined expression (division or modulo by zero) in {at}"),
        }
    }
}

impl std::error::Error for ExprError {}

/// Failures raised while computing the one-step transitions of a process term.
#[derive(Debug, Clone)]
pub enum EngineError {
    /// Propagated from evaluating an expression embedded in a process term.
    Expr(ExprError),
    /// A named process reached itself without an intervening action.
    UnguardedRecursion { name: String },
    /// A surviving transition still carries an unresolved RECV input variable.
    UnresolvedInput { name: String },
}

impl fmt::Display for EngineError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Expr(error) => write!(f, "{error}"),
            Self::UnguardedRecursion { name } => write!(f, "unguarded recursion through '{name}'"),
            Self::UnresolvedInput { name } => {
                write!(f, "receive on '{name}' was never matched by a sender")
            }
        }
    }
}

impl std::error::Error for EngineError {}

impl From<ExprError> for EngineError {
    fn from(error: ExprError) -> Self {
        Self::Expr(error)
    }
}

/// A syntax error raised by the lexer or parser.
#[derive(Debug, Clone)]
pub struct ParseError {
    pub message: String,
    pub at: CodeRange,
}

impl ParseError {
    pub fn new(message: impl Into<String>, at: CodeRange) -> Self {
        Self { message: message.into(), at }
    }
}

impl fmt::Display for ParseError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}: {}", self.at, self.message)
    }
}

impl std::error::Error for ParseError {}

/// The top-level error type returned by the public parse-then-explore API.
#[derive(Debug, Clone)]
pub enum CcsError {
    Parse(ParseError),
    Engine(EngineError),
}

impl fmt::Display for CcsError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Parse(error) => write!(f, "parse error: {error}"),
            Self::Engine(error) => write!(f, "error: {error}"),
        }
    }
}

impl std::error::Error for CcsError {}

impl From<ParseError> for CcsError {
    fn from(error: ParseError) -> Self {
        Self::Parse(error)
    }
}

impl From<EngineError> for CcsError {
    fn from(error: EngineError) -> Self {
        Self::Engine(error)
    }
}
