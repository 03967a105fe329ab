//! Hand-written character lexer with line/column tracking.

use std::rc::Rc;

use crate::error::{CodeLoc, CodeRange, ParseError};

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TokenKind {
    Ident(String),
    Number(String),
    When,
    LParen,
    RParen,
    LBracket,
    RBracket,
    LBrace,
    RBrace,
    Comma,
    ColonEq,
    Backslash,
    Dot,
    Bang,
    Question,
    Star,
    Semi,
    Pipe,
    Plus,
    Minus,
    Slash,
    Percent,
    AndAnd,
    OrOr,
    EqEq,
    Neq,
    Lt,
    Leq,
    Gt,
    Geq,
    Eof,
}

#[derive(Debug, Clone)]
pub struct Token {
    pub kind: TokenKind,
    pub text: String,
    pub at: CodeLoc,
}

/// Scans `source` into a flat token list, tracking line/column the way the
/// reference lexer does: a bare `\n` (or `\r` not preceded by `\r`) advances
/// the line and resets the column; every other character advances the column.
pub fn tokenize(source: &str, source_name: &Rc<str>) -> Result<Vec<Token>, ParseError> {
    let chars: Vec<char> = source.chars().collect();
    let mut pos = 0usize;
    let mut line: u32 = 1;
    let mut col: u32 = 0;
    let mut tokens = Vec::new();

    let err = |msg: String, line: u32, col: u32, source_name: &Rc<str>| -> ParseError {
        ParseError::new(msg, CodeRange::new(Rc::clone(source_name), CodeLoc::new(line, col)))
    };

    macro_rules! advance {
        () => {{
            if pos < chars.len() {
                let c = chars[pos];
                pos += 1;
                if c == '\n' || c == '\r' {
                    if !(c == '\n' && pos >= 2 && chars[pos - 2] == '\r') {
                        line += 1;
                        col = 0;
                    }
                } else {
                    col += 1;
                }
            }
        }};
    }
    macro_rules! peek_char {
        () => {
            chars.get(pos).copied()
        };
    }

    loop {
        while let Some(c) = peek_char!() {
            if c.is_whitespace() {
                advance!();
            } else {
                break;
            }
        }
        let Some(c) = peek_char!() else {
            tokens.push(Token { kind: TokenKind::Eof, text: String::new(), at: CodeLoc::new(line, col) });
            break;
        };
        let (start_line, start_col) = (line, col);
        macro_rules! single {
            ($kind:expr, $text:expr) => {{
                advance!();
                tokens.push(Token { kind: $kind, text: $text.to_string(), at: CodeLoc::new(start_line, start_col) });
            }};
        }
        match c {
            '(' => single!(TokenKind::LParen, "("),
            ')' => single!(TokenKind::RParen, ")"),
            '[' => single!(TokenKind::LBracket, "["),
            ']' => single!(TokenKind::RBracket, "]"),
            '{' => single!(TokenKind::LBrace, "{"),
            '}' => single!(TokenKind::RBrace, "}"),
            ',' => single!(TokenKind::Comma, ","),
            '.' => single!(TokenKind::Dot, "."),
            ';' => single!(TokenKind::Semi, ";"),
            '\\' => single!(TokenKind::Backslash, "\\"),
            '+' => single!(TokenKind::Plus, "+"),
            '-' => single!(TokenKind::Minus, "-"),
            '*' => single!(TokenKind::Star, "*"),
            '/' => single!(TokenKind::Slash, "/"),
            '%' => single!(TokenKind::Percent, "%"),
            '&' => {
                advance!();
                match peek_char!() {
                    Some('&') => single!(TokenKind::AndAnd, "&&"),
                    Some(other) => return Err(err(format!("unexpected character: `{other}`"), line, col, source_name)),
                    None => return Err(err("unexpected end of file".to_string(), line, col, source_name)),
                }
            }
            '|' => {
                advance!();
                if peek_char!() == Some('|') {
                    single!(TokenKind::OrOr, "||");
                } else {
                    tokens.push(Token { kind: TokenKind::Pipe, text: "|".to_string(), at: CodeLoc::new(start_line, start_col) });
                }
            }
            '=' => {
                advance!();
                match peek_char!() {
                    Some('=') => single!(TokenKind::EqEq, "=="),
                    Some(other) => return Err(err(format!("unexpected character: `{other}`"), line, col, source_name)),
                    None => return Err(err("unexpected end of file".to_string(), line, col, source_name)),
                }
            }
            '!' => {
                advance!();
                if peek_char!() == Some('=') {
                    single!(TokenKind::Neq, "!=");
                } else {
                    tokens.push(Token { kind: TokenKind::Bang, text: "!".to_string(), at: CodeLoc::new(start_line, start_col) });
                }
            }
            '<' => {
                advance!();
                if peek_char!() == Some('=') {
                    single!(TokenKind::Leq, "<=");
                } else {
                    tokens.push(Token { kind: TokenKind::Lt, text: "<".to_string(), at: CodeLoc::new(start_line, start_col) });
                }
            }
            '>' => {
                advance!();
                if peek_char!() == Some('=') {
                    single!(TokenKind::Geq, ">=");
                } else {
                    tokens.push(Token { kind: TokenKind::Gt, text: ">".to_string(), at: CodeLoc::new(start_line, start_col) });
                }
            }
            ':' => {
                advance!();
                match peek_char!() {
                    Some('=') => single!(TokenKind::ColonEq, ":="),
                    Some(other) => return Err(err(format!("unexpected character: `{other}`"), line, col, source_name)),
                    None => return Err(err("unexpected end of file".to_string(), line, col, source_name)),
                }
            }
            '?' => single!(TokenKind::Question, "?"),
            c if c.is_alphabetic() || c == '_' => {
                let mut s = String::new();
                while let Some(c) = peek_char!() {
                    if c.is_alphanumeric() || c == '_' {
                        s.push(c);
                        advance!();
                    } else {
                        break;
                    }
                }
                let kind = if s == "when" { TokenKind::When } else { TokenKind::Ident(s.clone()) };
                tokens.push(Token { kind, text: s, at: CodeLoc::new(start_line, start_col) });
            }
            c if c.is_ascii_digit() => {
                let mut s = String::new();
                while let Some(c) = peek_char!() {
                    if c.is_ascii_digit() {
                        s.push(c);
                        advance!();
                    } else {
                        break;
                    }
                }
                tokens.push(Token { kind: TokenKind::Number(s.clone()), text: s, at: CodeLoc::new(start_line, start_col) });
            }
            other => return Err(err(format!("unexpected character: `{other}`"), line, col, source_name)),
        }
    }

    Ok(tokens)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn kinds(src: &str) -> Vec<TokenKind> {
        tokenize(src, &Rc::from("test")).unwrap().into_iter().map(|t| t.kind).collect()
    }

    #[test]
    fn lexes_operators_and_punctuation() {
        assert_eq!(
            kinds("a!1.b?x.(c + d)\\{e}"),
            vec![
                TokenKind::Ident("a".into()),
                TokenKind::Bang,
                TokenKind::Number("1".into()),
                TokenKind::Dot,
                TokenKind::Ident("b".into()),
                TokenKind::Question,
                TokenKind::Ident("x".into()),
                TokenKind::Dot,
                TokenKind::LParen,
                TokenKind::Ident("c".into()),
                TokenKind::Plus,
                TokenKind::Ident("d".into()),
                TokenKind::RParen,
                TokenKind::Backslash,
                TokenKind::LBrace,
                TokenKind::Ident("e".into()),
                TokenKind::RBrace,
                TokenKind::Eof,
            ]
        );
    }

    #[test]
    fn recognises_when_keyword() {
        assert_eq!(kinds("when"), vec![TokenKind::When, TokenKind::Eof]);
    }

    #[test]
    fn two_char_operators() {
        assert_eq!(kinds("&& || == != <= >= :="), vec![
            TokenKind::AndAnd,
            TokenKind::OrOr,
            TokenKind::EqEq,
            TokenKind::Neq,
            TokenKind::Leq,
            TokenKind::Geq,
            TokenKind::ColonEq,
            TokenKind::Eof,
        ]);
    }

    #[test]
    fn rejects_unexpected_character() {
        assert!(tokenize("a @ b", &Rc::from("test")).is_err());
    }
}
