//! Lexer for where-expressions, built on logos

use crate::error::{Error, Result};
use logos::Logos;

/// Token types of the where-expression language
#[derive(Logos, Debug, Clone, PartialEq)]
#[logos(skip r"[ \t\r\n]+")]
pub enum Token {
    // Logical operators
    #[token("and", ignore(ascii_case))]
    #[token("&&")]
    And,
    #[token("or", ignore(ascii_case))]
    #[token("||")]
    Or,
    #[token("not", ignore(ascii_case))]
    #[token("!")]
    Not,

    // Keyword operators
    #[token("is", ignore(ascii_case))]
    Is,
    #[token("in", ignore(ascii_case))]
    In,
    #[token("like", ignore(ascii_case))]
    Like,

    // Literals
    #[token("null", ignore(ascii_case))]
    Null,
    #[token("true", ignore(ascii_case))]
    True,
    #[token("false", ignore(ascii_case))]
    False,

    // Comparison operators
    #[token("=")]
    #[token("==")]
    Eq,
    #[token("!=")]
    #[token("<>")]
    Ne,
    #[token("<=")]
    Le,
    #[token(">=")]
    Ge,
    #[token("<")]
    Lt,
    #[token(">")]
    Gt,

    // Punctuation
    #[token("(")]
    LParen,
    #[token(")")]
    RParen,
    #[token(",")]
    Comma,

    // Attribute name
    #[regex(r"[a-zA-Z_][a-zA-Z0-9_]*", |lex| lex.slice().to_string())]
    Ident(String),

    // String literal (double-quoted)
    #[regex(r#""([^"\\]|\\.)*""#, |lex| unquote(lex.slice()))]
    // String literal (single-quoted)
    #[regex(r#"'([^'\\]|\\.)*'"#, |lex| unquote(lex.slice()))]
    String(String),

    // Integer literal
    #[regex(r"-?[0-9]+", |lex| lex.slice().parse::<i64>().ok())]
    Int(i64),

    // Float literal
    #[regex(r"-?[0-9]+\.[0-9]+", |lex| lex.slice().parse::<f64>().ok())]
    Float(f64),
}

/// Strip the quotes of a string literal and resolve escapes
fn unquote(s: &str) -> String {
    let inner = &s[1..s.len() - 1];
    let mut result = String::with_capacity(inner.len());
    let mut chars = inner.chars();

    while let Some(c) = chars.next() {
        if c != '\\' {
            result.push(c);
            continue;
        }
        match chars.next() {
            Some('n') => result.push('\n'),
            Some('t') => result.push('\t'),
            Some(other) => result.push(other),
            None => result.push('\\'),
        }
    }

    result
}

/// A token with the byte offset where it starts
#[derive(Debug, Clone, PartialEq)]
pub struct SpannedToken {
    pub token: Token,
    pub offset: usize,
}

/// Tokenize an expression, failing on the first unrecognized input
pub fn tokenize(source: &str) -> Result<Vec<SpannedToken>> {
    let mut tokens = Vec::new();
    for (token, span) in Token::lexer(source).spanned() {
        match token {
            Ok(token) => tokens.push(SpannedToken {
                token,
                offset: span.start,
            }),
            Err(()) => {
                return Err(Error::expression(
                    format!("Unexpected input '{}'", &source[span.clone()]),
                    span.start,
                ))
            }
        }
    }
    Ok(tokens)
}
