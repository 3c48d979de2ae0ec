//! Expression fragments: the small expression grammar completion evaluates.
//!
//! A fragment is whatever sits in front of a completion operator: `foo`,
//! `a.b().c`, `ns::Cls::`, `list[0]`, `"text"`. Both dialects share one
//! grammar; C++ additionally accepts `->` and `::`.
//!
//! ```text
//! expr    := "new" postfix | postfix
//! postfix := primary ( "." ident | "->" ident | "::" ident | "(" ... ")" | "[" ... "]" )*
//! primary := ident | "::" ident | "this" | literal | "(" expr ")"
//! ```
//!
//! Call arguments and subscripts are skipped by bracket balancing; only
//! their presence matters to the evaluator.

use serde::{Deserialize, Serialize};
use thiserror::Error;

// ============================================================================
// AST
// ============================================================================

/// Grammar flavour of the owning document.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Dialect {
    /// C++: `::`, `->`, `this`, `new`.
    Cpp,
    /// QML/JavaScript: `.`, `this`, `new`, `$` in identifiers.
    QmlJs,
}

/// Literal kinds; the value itself is irrelevant to typing.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum LiteralKind {
    String,
    Number,
    Char,
    Boolean,
    Null,
}

/// A parsed expression fragment.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "expr", rename_all = "snake_case")]
pub enum Expr {
    /// Unqualified identifier.
    Ident { name: String },
    /// `base::name`, or `::name` when `base` is `None`.
    Qualified {
        base: Option<Box<Expr>>,
        name: String,
    },
    /// `base.name` or `base->name`.
    Member {
        base: Box<Expr>,
        name: String,
        arrow: bool,
    },
    /// `callee(...)`.
    Call { callee: Box<Expr>, arg_count: usize },
    /// `base[...]`.
    Subscript { base: Box<Expr> },
    /// `(inner)`.
    Paren { inner: Box<Expr> },
    /// `new inner`.
    New { inner: Box<Expr> },
    /// `this`.
    This,
    /// A literal.
    Literal { kind: LiteralKind },
}

impl Expr {
    /// Shorthand for an identifier expression.
    pub fn ident(name: impl Into<String>) -> Self {
        Expr::Ident { name: name.into() }
    }

    /// Whether the expression is a bare literal.
    pub fn is_literal(&self) -> bool {
        matches!(self, Expr::Literal { .. })
    }

    /// Whether the leftmost identifier starts with a lowercase letter.
    pub fn starts_with_lowercase(&self) -> bool {
        match self {
            Expr::Ident { name } => name.chars().next().is_some_and(char::is_lowercase),
            Expr::Member { base, .. }
            | Expr::Call { callee: base, .. }
            | Expr::Subscript { base } => base.starts_with_lowercase(),
            Expr::Qualified { base: Some(base), .. } => base.starts_with_lowercase(),
            _ => false,
        }
    }
}

// ============================================================================
// Errors
// ============================================================================

/// Why a fragment failed to parse.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ParseError {
    /// Nothing but whitespace.
    #[error("empty expression")]
    Empty,

    /// Input ended where a term or name was expected.
    #[error("unexpected end of expression")]
    UnexpectedEnd,

    /// A character outside the fragment grammar.
    #[error("unexpected character '{ch}' at offset {offset}")]
    UnexpectedChar { ch: char, offset: usize },

    /// A token in the wrong place.
    #[error("unexpected token '{found}' at offset {offset}")]
    UnexpectedToken { found: String, offset: usize },

    /// String or char literal without closing quote.
    #[error("unterminated literal starting at offset {offset}")]
    UnterminatedLiteral { offset: usize },

    /// `(` or `[` without its closing bracket.
    #[error("unbalanced bracket at offset {offset}")]
    Unbalanced { offset: usize },

    /// More nested parentheses and postfix links than [`MAX_NESTING`].
    #[error("expression nests too deeply at offset {offset}")]
    TooDeep { offset: usize },
}

// ============================================================================
// Lexer
// ============================================================================

#[derive(Debug, Clone, PartialEq)]
enum Tok {
    Ident(String),
    Literal(LiteralKind),
    Dot,
    Arrow,
    ColonColon,
    LParen,
    RParen,
    LBracket,
    RBracket,
    Comma,
    /// Any other operator; only legal inside skipped brackets.
    Op(char),
}

impl Tok {
    fn spelling(&self) -> String {
        match self {
            Tok::Ident(name) => name.clone(),
            Tok::Literal(_) => "literal".to_string(),
            Tok::Dot => ".".to_string(),
            Tok::Arrow => "->".to_string(),
            Tok::ColonColon => "::".to_string(),
            Tok::LParen => "(".to_string(),
            Tok::RParen => ")".to_string(),
            Tok::LBracket => "[".to_string(),
            Tok::RBracket => "]".to_string(),
            Tok::Comma => ",".to_string(),
            Tok::Op(ch) => ch.to_string(),
        }
    }
}

fn lex(text: &str, dialect: Dialect) -> Result<Vec<(usize, Tok)>, ParseError> {
    let chars: Vec<(usize, char)> = text.char_indices().collect();
    let mut tokens = Vec::new();
    let mut i = 0;

    while i < chars.len() {
        let (offset, ch) = chars[i];
        let next = chars.get(i + 1).map(|&(_, c)| c);

        if ch.is_whitespace() {
            i += 1;
            continue;
        }

        if ch == '_' || ch.is_alphabetic() || (ch == '$' && dialect == Dialect::QmlJs) {
            let start = i;
            while i < chars.len() && {
                let c = chars[i].1;
                c == '_' || c.is_alphanumeric() || (c == '$' && dialect == Dialect::QmlJs)
            } {
                i += 1;
            }
            let end = chars.get(i).map(|&(o, _)| o).unwrap_or(text.len());
            let word = &text[chars[start].0..end];
            let tok = match word {
                "true" | "false" => Tok::Literal(LiteralKind::Boolean),
                "null" | "nullptr" | "NULL" => Tok::Literal(LiteralKind::Null),
                _ => Tok::Ident(word.to_string()),
            };
            tokens.push((offset, tok));
            continue;
        }

        if ch.is_ascii_digit() || (ch == '.' && next.is_some_and(|c| c.is_ascii_digit())) {
            let hex = text[offset..].starts_with("0x") || text[offset..].starts_with("0X");
            while i < chars.len() {
                let c = chars[i].1;
                let exponent_sign = (c == '+' || c == '-')
                    && !hex
                    && matches!(chars.get(i.wrapping_sub(1)), Some(&(_, 'e' | 'E')));
                if c.is_ascii_alphanumeric() || c == '.' || c == '\'' || exponent_sign {
                    i += 1;
                } else {
                    break;
                }
            }
            tokens.push((offset, Tok::Literal(LiteralKind::Number)));
            continue;
        }

        if ch == '"' || ch == '\'' || (ch == '`' && dialect == Dialect::QmlJs) {
            let quote = ch;
            i += 1;
            let mut closed = false;
            while i < chars.len() {
                match chars[i].1 {
                    '\\' => i += 2,
                    c if c == quote => {
                        i += 1;
                        closed = true;
                        break;
                    }
                    _ => i += 1,
                }
            }
            if !closed {
                return Err(ParseError::UnterminatedLiteral { offset });
            }
            let kind = if quote == '\'' && dialect == Dialect::Cpp {
                LiteralKind::Char
            } else {
                LiteralKind::String
            };
            tokens.push((offset, Tok::Literal(kind)));
            continue;
        }

        let (tok, width) = match (ch, next) {
            ('-', Some('>')) if dialect == Dialect::Cpp => (Tok::Arrow, 2),
            (':', Some(':')) if dialect == Dialect::Cpp => (Tok::ColonColon, 2),
            ('.', _) => (Tok::Dot, 1),
            ('(', _) => (Tok::LParen, 1),
            (')', _) => (Tok::RParen, 1),
            ('[', _) => (Tok::LBracket, 1),
            (']', _) => (Tok::RBracket, 1),
            (',', _) => (Tok::Comma, 1),
            (
                '+' | '-' | '*' | '/' | '%' | '&' | '|' | '^' | '!' | '~' | '<' | '>' | '=' | '?'
                | ':',
                _,
            ) => (Tok::Op(ch), 1),
            _ => return Err(ParseError::UnexpectedChar { ch, offset }),
        };
        tokens.push((offset, tok));
        i += width;
    }

    Ok(tokens)
}

// ============================================================================
// Parser
// ============================================================================

/// Upper bound on parenthesised groups plus member, call and subscript links
/// in one fragment.
pub const MAX_NESTING: usize = 256;

/// Parse a fragment in the given dialect.
pub fn parse_expression(text: &str, dialect: Dialect) -> Result<Expr, ParseError> {
    let tokens = lex(text, dialect)?;
    if tokens.is_empty() {
        return Err(ParseError::Empty);
    }
    let mut parser = Parser {
        tokens,
        pos: 0,
        end: text.len(),
        nesting: 0,
    };
    let expr = parser.expression()?;
    if let Some((offset, tok)) = parser.tokens.get(parser.pos) {
        return Err(ParseError::UnexpectedToken {
            found: tok.spelling(),
            offset: *offset,
        });
    }
    Ok(expr)
}

struct Parser {
    tokens: Vec<(usize, Tok)>,
    pos: usize,
    end: usize,
    nesting: usize,
}

impl Parser {
    fn peek(&self) -> Option<&Tok> {
        self.tokens.get(self.pos).map(|(_, tok)| tok)
    }

    fn offset(&self) -> usize {
        self.tokens
            .get(self.pos)
            .map(|(offset, _)| *offset)
            .unwrap_or(self.end)
    }

    fn bump(&mut self) -> Option<Tok> {
        let tok = self.tokens.get(self.pos).map(|(_, tok)| tok.clone());
        self.pos += 1;
        tok
    }

    fn nest(&mut self) -> Result<(), ParseError> {
        self.nesting += 1;
        if self.nesting > MAX_NESTING {
            return Err(ParseError::TooDeep {
                offset: self.offset(),
            });
        }
        Ok(())
    }

    fn unexpected(&self) -> ParseError {
        match self.tokens.get(self.pos) {
            Some((offset, tok)) => ParseError::UnexpectedToken {
                found: tok.spelling(),
                offset: *offset,
            },
            None => ParseError::UnexpectedEnd,
        }
    }

    fn expression(&mut self) -> Result<Expr, ParseError> {
        if matches!(self.peek(), Some(Tok::Ident(word)) if word == "new") {
            self.bump();
            let inner = self.postfix()?;
            return Ok(Expr::New {
                inner: Box::new(inner),
            });
        }
        self.postfix()
    }

    fn name(&mut self) -> Result<String, ParseError> {
        match self.peek() {
            Some(Tok::Ident(name)) if name != "this" && name != "new" => {
                let name = name.clone();
                self.pos += 1;
                Ok(name)
            }
            _ => Err(self.unexpected()),
        }
    }

    fn primary(&mut self) -> Result<Expr, ParseError> {
        match self.peek() {
            Some(Tok::Ident(word)) if word == "this" => {
                self.bump();
                Ok(Expr::This)
            }
            Some(Tok::Ident(_)) => Ok(Expr::Ident { name: self.name()? }),
            Some(Tok::ColonColon) => {
                self.bump();
                Ok(Expr::Qualified {
                    base: None,
                    name: self.name()?,
                })
            }
            Some(Tok::Literal(kind)) => {
                let kind = *kind;
                self.bump();
                Ok(Expr::Literal { kind })
            }
            Some(Tok::LParen) => {
                self.nest()?;
                self.bump();
                let inner = self.expression()?;
                match self.bump() {
                    Some(Tok::RParen) => Ok(Expr::Paren {
                        inner: Box::new(inner),
                    }),
                    Some(_) => {
                        self.pos -= 1;
                        Err(self.unexpected())
                    }
                    None => Err(ParseError::UnexpectedEnd),
                }
            }
            _ => Err(self.unexpected()),
        }
    }

    fn postfix(&mut self) -> Result<Expr, ParseError> {
        let mut expr = self.primary()?;
        loop {
            if matches!(
                self.peek(),
                Some(Tok::Dot | Tok::Arrow | Tok::ColonColon | Tok::LParen | Tok::LBracket)
            ) {
                self.nest()?;
            }
            match self.peek() {
                Some(Tok::Dot) | Some(Tok::Arrow) => {
                    let arrow = matches!(self.bump(), Some(Tok::Arrow));
                    let name = self.name()?;
                    expr = Expr::Member {
                        base: Box::new(expr),
                        name,
                        arrow,
                    };
                }
                Some(Tok::ColonColon) => {
                    self.bump();
                    let name = self.name()?;
                    expr = Expr::Qualified {
                        base: Some(Box::new(expr)),
                        name,
                    };
                }
                Some(Tok::LParen) => {
                    let arg_count = self.skip_group(Tok::LParen, Tok::RParen)?;
                    expr = Expr::Call {
                        callee: Box::new(expr),
                        arg_count,
                    };
                }
                Some(Tok::LBracket) => {
                    self.skip_group(Tok::LBracket, Tok::RBracket)?;
                    expr = Expr::Subscript {
                        base: Box::new(expr),
                    };
                }
                _ => return Ok(expr),
            }
        }
    }

    /// Skip a balanced bracket group and return its top-level argument count.
    fn skip_group(&mut self, open: Tok, close: Tok) -> Result<usize, ParseError> {
        let start = self.offset();
        self.bump();
        let mut depth = 1usize;
        let mut commas = 0usize;
        let mut saw_token = false;
        while let Some(tok) = self.bump() {
            if tok == open || tok == Tok::LParen || tok == Tok::LBracket {
                depth += 1;
            } else if tok == close || tok == Tok::RParen || tok == Tok::RBracket {
                depth -= 1;
                if depth == 0 {
                    return Ok(if saw_token { commas + 1 } else { 0 });
                }
            } else if tok == Tok::Comma && depth == 1 {
                commas += 1;
            }
            saw_token = true;
        }
        Err(ParseError::Unbalanced { offset: start })
    }
}

// ============================================================================
// Tests
// ============================================================================
