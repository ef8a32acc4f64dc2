// File: src/lexer.rs
//
// Regex-driven tokenizer. One compiled regex with named alternatives is
// scanned left-to-right against the remaining source slice; whichever
// alternative matches at the front wins (the group order below is the
// match priority, longest operators before their single-character
// prefixes).

use crate::errors::{HopeError, SourceLocation};
use crate::token::{Token, TokenKind};
use once_cell::sync::Lazy;
use regex::Regex;

static TOKEN_RE: Lazy<Regex> = Lazy::new(|| {
    Regex::new(
        r#"(?x)
        ^(?P<ws>[ \t]+)
        |^(?P<newline>\r?\n)
        |^(?P<comment>//[^\n]*)
        |^(?P<string>"(?:\\"|\\\\|\\n|[^"\\])*")
        |^(?P<int>[0-9]+)
        |^(?P<ident>[A-Za-z_][A-Za-z0-9_]*)
        |^(?P<op>:=|->|==|!=|<=|>=|&&|\|\||[+\-*/%<>=!?])
        |^(?P<punct>[(){}\[\],:])
        "#,
    )
    .expect("static token regex is valid")
});

pub fn tokenize(source: &str) -> Result<Vec<Token>, HopeError> {
    let mut tokens = Vec::new();
    let mut pos = 0usize;
    let mut line = 1usize;
    let mut column = 1usize;
    let bytes = source.as_bytes();

    while pos < bytes.len() {
        let rest = &source[pos..];
        let caps = match TOKEN_RE.captures(rest) {
            Some(c) => c,
            None => {
                let bad = rest.chars().next().unwrap_or('\u{0}');
                return Err(HopeError::lexical(
                    format!("unrecognised character '{bad}'"),
                    SourceLocation::new(line, column),
                ));
            }
        };

        if let Some(m) = caps.name("ws") {
            advance(&mut pos, &mut line, &mut column, m.as_str());
            continue;
        }
        if let Some(m) = caps.name("newline") {
            tokens.push(Token::new(TokenKind::Eol, line, column));
            advance(&mut pos, &mut line, &mut column, m.as_str());
            continue;
        }
        if let Some(m) = caps.name("comment") {
            advance(&mut pos, &mut line, &mut column, m.as_str());
            continue;
        }
        if let Some(m) = caps.name("string") {
            let raw = m.as_str();
            let inner = &raw[1..raw.len() - 1];
            let value = unescape(inner);
            tokens.push(Token::new(TokenKind::String(value), line, column));
            advance(&mut pos, &mut line, &mut column, raw);
            continue;
        }
        if let Some(m) = caps.name("int") {
            let value: i64 = m.as_str().parse().map_err(|_| {
                HopeError::lexical(
                    format!("integer literal out of range: {}", m.as_str()),
                    SourceLocation::new(line, column),
                )
            })?;
            tokens.push(Token::new(TokenKind::Integer(value), line, column));
            advance(&mut pos, &mut line, &mut column, m.as_str());
            continue;
        }
        if let Some(m) = caps.name("ident") {
            let text = m.as_str();
            let kind = match text {
                "true" => TokenKind::Boolean(true),
                "false" => TokenKind::Boolean(false),
                _ if crate::token::RESERVED_WORDS.contains(&text) => {
                    TokenKind::Reserved(text.to_string())
                }
                _ => TokenKind::Identifier(text.to_string()),
            };
            tokens.push(Token::new(kind, line, column));
            advance(&mut pos, &mut line, &mut column, text);
            continue;
        }
        if let Some(m) = caps.name("op") {
            tokens.push(Token::new(TokenKind::Operator(m.as_str().to_string()), line, column));
            advance(&mut pos, &mut line, &mut column, m.as_str());
            continue;
        }
        if let Some(m) = caps.name("punct") {
            let c = m.as_str().chars().next().unwrap();
            tokens.push(Token::new(TokenKind::Punct(c), line, column));
            advance(&mut pos, &mut line, &mut column, m.as_str());
            continue;
        }
        unreachable!("token regex matched but no named group was set");
    }

    tokens.push(Token::new(TokenKind::Eof, line, column));
    Ok(tokens)
}

fn advance(pos: &mut usize, line: &mut usize, column: &mut usize, matched: &str) {
    *pos += matched.len();
    if matched.contains('\n') {
        *line += 1;
        *column = 1;
    } else {
        *column += matched.chars().count();
    }
}

fn unescape(s: &str) -> String {
    let mut out = String::with_capacity(s.len());
    let mut chars = s.chars().peekable();
    while let Some(c) = chars.next() {
        if c == '\\' {
            match chars.next() {
                Some('n') => out.push('\n'),
                Some('\\') => out.push('\\'),
                Some('"') => out.push('"'),
                Some(other) => out.push(other),
                None => {}
            }
        } else {
            out.push(c);
        }
    }
    out
}
