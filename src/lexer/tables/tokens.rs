// src/lexer/tables/tokens.rs
use anyhow::{Result, bail};
use hashbrown::HashSet;
use serde::{Deserialize, Serialize};

/// Token id as assigned by registration order. 0 is reserved for end-of-input.
pub type TokenId = u32;

pub const EOF_TOKEN: TokenId = 0;
pub const EOF_NAME: &str = "END_OF_FILE";

// "no token" marker in accept tables and on disk
pub const INVALID_TOKEN: TokenId = u32::MAX;

/// One line of a `.lex` file: a token name and the regex that recognizes it.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TokenDef {
    pub name: String,
    pub pattern: String,
}

impl TokenDef {
    pub fn new(name: impl Into<String>, pattern: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            pattern: pattern.into(),
        }
    }
}

fn is_comment(line: &str) -> bool {
    line.starts_with("//") || line == "#" || line.starts_with("# ")
}

fn is_identifier(name: &str) -> bool {
    let mut chars = name.chars();
    match chars.next() {
        Some(c) if c.is_ascii_alphabetic() || c == '_' => {}
        _ => return false,
    }
    chars.all(|c| c.is_ascii_alphanumeric() || c == '_')
}

// Trailing whitespace goes, except one character escaped by a backslash.
fn trim_pattern(pattern: &str) -> &str {
    let pattern = pattern.trim_start();
    let trimmed = pattern.trim_end();
    let backslashes = trimmed.bytes().rev().take_while(|&b| b == b'\\').count();
    match pattern[trimmed.len()..].chars().next() {
        Some(escaped) if backslashes % 2 == 1 => &pattern[..trimmed.len() + escaped.len_utf8()],
        _ => trimmed,
    }
}

/// Parses a token definition file.
///
/// Format, one definition per line:
/// ```text
/// // comment
/// IF         = if
/// IDENTIFIER = [a-zA-Z_][a-zA-Z0-9_]*
/// ```
/// The pattern is everything after the first `=`, trimmed, except that an
/// escaped trailing space (`SPACE = \ `) is kept. Order matters: earlier
/// definitions win when two patterns match the same text.
pub fn parse_lex_file(src: &str) -> Result<Vec<TokenDef>> {
    let mut defs = Vec::new();
    let mut seen: HashSet<String> = HashSet::new();

    for (line_number, raw_line) in src.lines().enumerate() {
        let line = raw_line.trim_start();
        if line.trim_end().is_empty() || is_comment(line) {
            continue;
        }
        let Some((name, pattern)) = line.split_once('=') else {
            bail!("line {}: expected `NAME = pattern`", line_number + 1);
        };
        let name = name.trim();
        let pattern = trim_pattern(pattern);

        if !is_identifier(name) {
            bail!("line {}: invalid token name {name:?}", line_number + 1);
        }
        if name == EOF_NAME {
            bail!("line {}: {EOF_NAME} is reserved", line_number + 1);
        }
        if pattern.is_empty() {
            bail!("line {}: token {name} has an empty pattern", line_number + 1);
        }
        if !seen.insert(name.to_string()) {
            bail!("line {}: duplicate token name {name}", line_number + 1);
        }
        defs.push(TokenDef::new(name, pattern));
    }
    Ok(defs)
}

/// Token names indexed by id, with `END_OF_FILE` in slot 0.
pub fn token_names(defs: &[TokenDef]) -> Vec<String> {
    std::iter::once(EOF_NAME.to_string())
        .chain(defs.iter().map(|d| d.name.clone()))
        .collect()
}
