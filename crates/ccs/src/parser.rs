//! Two independent precedence-climbing parsers (expressions, processes) over
//! a flat token stream, plus the program-level binding/main-expression
//! disambiguation.
//!
//! Both precedence tables are uniformly right-associative: every operator's
//! left and right binding power are equal, so `a - b - c` parses as
//! `a - (b - c)` and `p ; q ; r` parses as `p ; (q ; r)`. This mirrors the
//! reference parser's precedence-table construction exactly; it reads as an
//! accidental consequence there, but nothing in this spec calls for changing
//! it, so the behavior is kept rather than "fixed".

use std::collections::BTreeSet;
use std::rc::Rc;

use crate::action::Action;
use crate::error::{CodeLoc, CodeRange, ParseError};
use crate::expr::{BinaryOp, Expression, UnaryOp};
use crate::lexer::{Token, TokenKind, tokenize};
use crate::process::Process;
use crate::program::{Binding, Program};
use std::collections::BTreeMap;

/// Binding power above every process binary operator: used as the minimum
/// precedence when parsing the body of `when cond <body>` and
/// `action.<body>`, so prefix/guard forms bind tighter than `;`, `|`, `+`.
const PREFIX_PROC_PREC: u8 = 4;
/// Binding power above every expression binary operator: used when parsing
/// the operand of a unary `+`/`-`/`!`.
const UNARY_EXPR_PREC: u8 = 7;

struct Parser {
    tokens: Vec<Token>,
    pos: usize,
    source_name: Rc<str>,
}

/// Parses a complete program: zero or more bindings, a main process, then
/// end of input.
pub fn parse(source: &str, source_name: impl Into<Rc<str>>) -> Result<Program, ParseError> {
    let source_name = source_name.into();
    let tokens = tokenize(source, &source_name)?;
    let mut parser = Parser { tokens, pos: 0, source_name };
    parser.parse_program()
}

impl Parser {
    fn peek(&self) -> &Token {
        &self.tokens[self.pos]
    }

    fn peek_at(&self, i: usize) -> &Token {
        let idx = (self.pos + i).min(self.tokens.len() - 1);
        &self.tokens[idx]
    }

    fn advance(&mut self) -> Token {
        let t = self.tokens[self.pos].clone();
        if self.pos + 1 < self.tokens.len() {
            self.pos += 1;
        }
        t
    }

    fn error_at(&self, at: CodeLoc, message: String) -> ParseError {
        ParseError::new(message, CodeRange::new(Rc::clone(&self.source_name), at))
    }

    fn expect(&mut self, pred: impl Fn(&TokenKind) -> bool, what: &str) -> Result<Token, ParseError> {
        let t = self.peek().clone();
        if t.kind == TokenKind::Eof {
            return Err(self.error_at(t.at, format!("unexpected end of file, expected {what}")));
        }
        if !pred(&t.kind) {
            return Err(self.error_at(t.at, format!("unexpected `{}`, expected {what}", t.text)));
        }
        Ok(self.advance())
    }

    fn parse_program(&mut self) -> Result<Program, ParseError> {
        let mut bindings: BTreeMap<String, Binding> = BTreeMap::new();
        let mut main: Option<Rc<Process>> = None;

        loop {
            let t0 = self.peek().clone();
            let t1 = self.peek_at(1).clone();
            let is_binding_head = matches!(t0.kind, TokenKind::Ident(_))
                && matches!(t1.kind, TokenKind::LBracket | TokenKind::ColonEq);
            if !is_binding_head {
                break;
            }
            let TokenKind::Ident(name) = t0.kind.clone() else { unreachable!() };
            let primary = self.parse_primary_process()?;
            let Process::Name { args, .. } = primary.as_ref() else {
                unreachable!("parse_primary_process on an identifier head always yields Name")
            };

            let mut params = Vec::with_capacity(args.len());
            let mut all_names = true;
            for a in args {
                if let Expression::Id(id) = a.as_ref() {
                    params.push(id.clone());
                } else {
                    all_names = false;
                    break;
                }
            }

            if all_names && matches!(self.peek().kind, TokenKind::ColonEq) {
                self.advance();
                let body = self.parse_process(0, None)?;
                bindings.insert(name.clone(), Binding::new(name, params, body));
            } else {
                main = Some(self.parse_process(0, Some(primary))?);
                break;
            }
        }

        let main = match main {
            Some(m) => m,
            None => self.parse_process(0, None)?,
        };

        let t = self.peek().clone();
        if t.kind != TokenKind::Eof {
            return Err(self.error_at(t.at, format!("unexpected `{}`, expected end of file", t.text)));
        }

        Ok(Program::new(bindings, main))
    }

    // ---- expressions ----

    fn parse_expr(&mut self, min_prec: u8) -> Result<Rc<Expression>, ParseError> {
        let mut lhs = self.parse_unary_or_primary_expr()?;
        loop {
            let Some((prec, op)) = binary_expr_prec(&self.peek().kind) else { break };
            if prec < min_prec {
                break;
            }
            self.advance();
            let rhs = self.parse_expr(prec)?;
            lhs = Expression::binary(op, lhs, rhs);
        }
        Ok(lhs)
    }

    fn parse_unary_or_primary_expr(&mut self) -> Result<Rc<Expression>, ParseError> {
        match self.peek().kind {
            TokenKind::Plus => {
                self.advance();
                Ok(Expression::unary(UnaryOp::Plus, self.parse_expr(UNARY_EXPR_PREC)?))
            }
            TokenKind::Minus => {
                self.advance();
                Ok(Expression::unary(UnaryOp::Minus, self.parse_expr(UNARY_EXPR_PREC)?))
            }
            TokenKind::Bang => {
                self.advance();
                Ok(Expression::unary(UnaryOp::Not, self.parse_expr(UNARY_EXPR_PREC)?))
            }
            _ => self.parse_primary_expr(),
        }
    }

    fn parse_primary_expr(&mut self) -> Result<Rc<Expression>, ParseError> {
        let t = self.peek().clone();
        match &t.kind {
            TokenKind::Ident(name) => {
                self.advance();
                Ok(Expression::id(name.clone()))
            }
            TokenKind::Number(s) => {
                self.advance();
                let v: i64 = s.parse().map_err(|_| self.error_at(t.at, format!("invalid number `{s}`")))?;
                Ok(Expression::const_(v))
            }
            TokenKind::LParen => {
                self.advance();
                let res = self.parse_expr(0)?;
                self.expect(|k| *k == TokenKind::RParen, "`)`")?;
                Ok(res)
            }
            TokenKind::Eof => {
                Err(self.error_at(t.at, "unexpected end of file, expected `(`, identifier or constant".to_string()))
            }
            _ => Err(self.error_at(t.at, format!("unexpected `{}`, expected `(`, identifier or constant", t.text))),
        }
    }

    fn starts_expr(&self) -> bool {
        matches!(
            self.peek().kind,
            TokenKind::Ident(_) | TokenKind::Number(_) | TokenKind::LParen | TokenKind::Plus | TokenKind::Minus | TokenKind::Bang
        )
    }

    // ---- processes ----

    fn parse_process(&mut self, min_prec: u8, seed: Option<Rc<Process>>) -> Result<Rc<Process>, ParseError> {
        let mut res = match seed {
            Some(r) => r,
            None => {
                let t0 = self.peek().clone();
                if matches!(t0.kind, TokenKind::When) {
                    self.advance();
                    let cond = self.parse_expr(0)?;
                    let body = self.parse_process(PREFIX_PROC_PREC, None)?;
                    Process::when(cond, body)
                } else if matches!(t0.kind, TokenKind::Ident(_))
                    && matches!(self.peek_at(1).kind, TokenKind::Dot | TokenKind::Question | TokenKind::Bang)
                {
                    let action = self.parse_action()?;
                    self.expect(|k| *k == TokenKind::Dot, "`.`")?;
                    let body = self.parse_process(PREFIX_PROC_PREC, None)?;
                    Process::prefix(action, body)
                } else {
                    self.parse_primary_process()?
                }
            }
        };

        while matches!(self.peek().kind, TokenKind::Backslash) {
            self.advance();
            self.expect(|k| *k == TokenKind::LBrace, "`{`")?;
            let mut complement = false;
            let mut set = BTreeSet::new();
            if matches!(self.peek().kind, TokenKind::Star) {
                complement = true;
                self.advance();
            } else if !matches!(self.peek().kind, TokenKind::RBrace) {
                set.insert(self.parse_action()?);
            }
            while matches!(self.peek().kind, TokenKind::Comma) {
                self.advance();
                set.insert(self.parse_action()?);
            }
            self.expect(|k| *k == TokenKind::RBrace, "`}`")?;
            res = Process::restrict(res, set, complement);
        }

        loop {
            let prec = match self.peek().kind {
                TokenKind::Semi => 1u8,
                TokenKind::Pipe => 2u8,
                TokenKind::Plus => 3u8,
                _ => break,
            };
            if prec < min_prec {
                break;
            }
            let op = self.advance().kind;
            let rhs = self.parse_process(prec, None)?;
            res = match op {
                TokenKind::Semi => Process::sequential(res, rhs),
                TokenKind::Pipe => Process::parallel(res, rhs),
                _ => Process::choice(res, rhs),
            };
        }

        Ok(res)
    }

    fn parse_primary_process(&mut self) -> Result<Rc<Process>, ParseError> {
        let t = self.peek().clone();
        match &t.kind {
            TokenKind::Number(s) if s == "0" => {
                self.advance();
                Ok(Process::null())
            }
            TokenKind::Number(s) if s == "1" => {
                self.advance();
                Ok(Process::term())
            }
            TokenKind::Ident(name) => {
                let name = name.clone();
                self.advance();
                let mut args = Vec::new();
                if matches!(self.peek().kind, TokenKind::LBracket) {
                    self.advance();
                    args.push(self.parse_expr(0)?);
                    while matches!(self.peek().kind, TokenKind::Comma) {
                        self.advance();
                        args.push(self.parse_expr(0)?);
                    }
                    self.expect(|k| *k == TokenKind::RBracket, "`]`")?;
                }
                Ok(Process::name(name, args))
            }
            TokenKind::LParen => {
                self.advance();
                let res = self.parse_process(0, None)?;
                self.expect(|k| *k == TokenKind::RParen, "`)`")?;
                Ok(res)
            }
            TokenKind::Eof => {
                Err(self.error_at(t.at, "unexpected end of file, expected `0`, `1`, identifier or `(`".to_string()))
            }
            _ => Err(self.error_at(t.at, format!("unexpected `{}`, expected `0`, `1`, identifier or `(`", t.text))),
        }
    }

    /// Parses `i`, `e`, or `name ['(' expr ')'] ('!' expr? | '?' (ident | expr)?)`.
    ///
    /// The RECV-with-input-variable branch consumes exactly the identifier
    /// token — consuming a second token here was a reference-implementation
    /// over-read that this parser does not reproduce.
    fn parse_action(&mut self) -> Result<Action, ParseError> {
        let t = self.peek().clone();
        let TokenKind::Ident(name) = t.kind.clone() else {
            return if t.kind == TokenKind::Eof {
                Err(self.error_at(t.at, "unexpected end of file, expected identifier".to_string()))
            } else {
                Err(self.error_at(t.at, format!("unexpected `{}`, expected identifier", t.text)))
            };
        };
        self.advance();

        if name == "i" {
            return Ok(Action::tau());
        }
        if name == "e" {
            return Ok(Action::delta());
        }

        let param = if matches!(self.peek().kind, TokenKind::LParen) {
            self.advance();
            let e = self.parse_expr(0)?;
            self.expect(|k| *k == TokenKind::RParen, "`)`")?;
            Some(e)
        } else {
            None
        };

        match self.peek().kind.clone() {
            TokenKind::Bang => {
                self.advance();
                let exp = if self.starts_expr() { Some(self.parse_expr(0)?) } else { None };
                Ok(Action::send(name, param, exp))
            }
            TokenKind::Question => {
                self.advance();
                if let TokenKind::Ident(input) = self.peek().kind.clone() {
                    self.advance();
                    Ok(Action::recv(name, param, input, None))
                } else if self.starts_expr() {
                    let exp = self.parse_expr(0)?;
                    Ok(Action::recv(name, param, "", Some(exp)))
                } else {
                    Ok(Action::recv(name, param, "", None))
                }
            }
            _ => Ok(Action::none(name)),
        }
    }
}

fn binary_expr_prec(kind: &TokenKind) -> Option<(u8, BinaryOp)> {
    Some(match kind {
        TokenKind::OrOr => (1, BinaryOp::Or),
        TokenKind::AndAnd => (2, BinaryOp::And),
        TokenKind::EqEq => (3, BinaryOp::Eq),
        TokenKind::Neq => (3, BinaryOp::Neq),
        TokenKind::Lt => (4, BinaryOp::Lt),
        TokenKind::Leq => (4, BinaryOp::Leq),
        TokenKind::Gt => (4, BinaryOp::Gt),
        TokenKind::Geq => (4, BinaryOp::Geq),
        TokenKind::Plus => (5, BinaryOp::Add),
        TokenKind::Minus => (5, BinaryOp::Sub),
        TokenKind::Star => (6, BinaryOp::Mul),
        TokenKind::Slash => (6, BinaryOp::Div),
        TokenKind::Percent => (6, BinaryOp::Mod),
        _ => return None,
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_handshake_program() {
        let program = parse("(a!.0 | a?.0)", "test").unwrap();
        assert_eq!(program.main.to_string(), "(a!.0 | a?.0)");
    }

    #[test]
    fn parses_binding_with_params() {
        let program = parse("P[x] := when (x > 0) a.0\nP[1]", "test").unwrap();
        assert!(program.bindings.contains_key("P"));
        assert_eq!(program.main.to_string(), "P[1]");
    }

    #[test]
    fn right_associative_subtraction() {
        let program = parse("a[1 - 2 - 3]", "test").unwrap();
        assert_eq!(program.main.to_string(), "a[(1 - (2 - 3))]");
    }

    #[test]
    fn right_associative_sequential() {
        let program = parse("(a.0; b.0; c.0)", "test").unwrap();
        assert_eq!(program.main.to_string(), "(a.0; (b.0; c.0))");
    }

    #[test]
    fn prefix_binds_tighter_than_choice() {
        let program = parse("a.b.0 + c.0", "test").unwrap();
        assert_eq!(program.main.to_string(), "(a.b.0 + c.0)");
    }

    #[test]
    fn restriction_postfix_with_complement() {
        // Restriction binds to the prefix *body*, not the whole prefix: the
        // `\{...}` loop runs inside the recursive call that parses `0`, so
        // this is `Prefix(a, Restrict(Null, ...))`, printing `a.(0)\{...}`.
        let program = parse("a.0 \\{*, a}", "test").unwrap();
        assert_eq!(program.main.to_string(), "a.(0)\\{*, a}");
    }

    #[test]
    fn ambiguous_lhs_falls_back_to_main_expression() {
        // P[1, 2] is not all-identifier args, so this is a main expression, not a binding.
        let program = parse("P[1, 2]", "test").unwrap();
        assert!(program.bindings.is_empty());
        assert_eq!(program.main.to_string(), "P[1, 2]");
    }

    #[test]
    fn recv_with_input_variable_consumes_one_token() {
        let program = parse("a?x.0", "test").unwrap();
        // If the input-variable branch over-consumed, the following `.` would
        // have been eaten and this parse would fail.
        assert_eq!(program.main.to_string(), "a?x.0");
    }

    #[test]
    fn action_with_channel_parameter_and_value() {
        // The prefix form only triggers when an identifier is immediately
        // followed by `.`/`?`/`!`; `a(1)!...` is not reachable as a prefix
        // since `a` is followed by `(`. A channel-parameter action is only
        // reachable inside a restriction set.
        let program = parse("0 \\{a(1)!}", "test").unwrap();
        assert_eq!(program.main.to_string(), "(0)\\{a(1)!}");
    }

    #[test]
    fn rejects_trailing_garbage() {
        assert!(parse("0 0", "test").is_err());
    }
}
