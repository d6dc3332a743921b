// src/lexer/tables/regex.rs
//! Recursive-descent parser for the token pattern language.
//!
//! Supported syntax: literals, `\` escapes (`\n`, `\r`, `\t`, `\s`, and any
//! escaped metacharacter), `.`, `[...]` / `[^...]` sets with ranges, `(...)`
//! grouping, `|` alternation and the `*`, `+`, `?` quantifiers.
//!
//! Completed sub-trees live on an explicit operand stack; binary nodes pop
//! their two operands and push the combined node.

use std::fmt;

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RegexNode {
    Char(u8),
    /// Children are `Char`, `Range`, or (for `\s`) a nested non-inverted `Charset`.
    Charset {
        inverted: bool,
        items: Vec<RegexNode>,
    },
    Concat(Box<RegexNode>, Box<RegexNode>),
    Dot,
    Or(Box<RegexNode>, Box<RegexNode>),
    Plus(Box<RegexNode>),
    /// Inclusive bounds. Only meaningful inside a `Charset`.
    Range(u8, u8),
    Question(Box<RegexNode>),
    Star(Box<RegexNode>),
}

impl RegexNode {
    pub fn concat(left: RegexNode, right: RegexNode) -> Self {
        RegexNode::Concat(Box::new(left), Box::new(right))
    }

    pub fn or(left: RegexNode, right: RegexNode) -> Self {
        RegexNode::Or(Box::new(left), Box::new(right))
    }

    /// `\s`
    pub fn whitespace() -> Self {
        RegexNode::Charset {
            inverted: false,
            items: b" \t\n\r".iter().map(|&c| RegexNode::Char(c)).collect(),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RegexErrorKind {
    UnexpectedChar(u8),
    UnexpectedEnd,
    UnterminatedSet,
    UnmatchedParen,
    DanglingEscape,
    InvalidRange(u8, u8),
    EmptySet,
    /// A quantifier with nothing to repeat.
    MissingOperand(u8),
}

/// Syntax error in a pattern, with the byte offset where it was detected.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RegexError {
    pub position: usize,
    pub kind: RegexErrorKind,
}

impl fmt::Display for RegexError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "regex error at byte {}: ", self.position)?;
        match self.kind {
            RegexErrorKind::UnexpectedChar(c) => write!(f, "unexpected character {:?}", c as char),
            RegexErrorKind::UnexpectedEnd => write!(f, "unexpected end of pattern"),
            RegexErrorKind::UnterminatedSet => write!(f, "unterminated character set"),
            RegexErrorKind::UnmatchedParen => write!(f, "mismatched parenthesis"),
            RegexErrorKind::DanglingEscape => write!(f, "trailing '\\' with nothing to escape"),
            RegexErrorKind::InvalidRange(lo, hi) => {
                write!(f, "invalid range {:?}-{:?}", lo as char, hi as char)
            }
            RegexErrorKind::EmptySet => write!(f, "empty character set"),
            RegexErrorKind::MissingOperand(q) => {
                write!(f, "quantifier {:?} has nothing to repeat", q as char)
            }
        }
    }
}

impl std::error::Error for RegexError {}

type ParseResult<T = ()> = Result<T, RegexError>;

pub struct RegexParser<'a> {
    source: &'a [u8],
    pos: usize,
    stack: Vec<RegexNode>,
}

impl<'a> RegexParser<'a> {
    /// Parses `source` in full. Unconsumed input is an error.
    pub fn parse(source: &'a str) -> Result<RegexNode, RegexError> {
        let mut parser = RegexParser {
            source: source.as_bytes(),
            pos: 0,
            stack: Vec::new(),
        };
        parser.regex()?;
        if let Some(c) = parser.peek() {
            let kind = if c == b')' {
                RegexErrorKind::UnmatchedParen
            } else {
                RegexErrorKind::UnexpectedChar(c)
            };
            return Err(parser.error(kind));
        }
        let root = parser.pop()?;
        debug_assert!(parser.stack.is_empty(), "operand stack not drained");
        Ok(root)
    }

    fn peek(&self) -> Option<u8> {
        self.source.get(self.pos).copied()
    }

    fn advance(&mut self) -> Option<u8> {
        let c = self.peek()?;
        self.pos += 1;
        Some(c)
    }

    fn error(&self, kind: RegexErrorKind) -> RegexError {
        RegexError {
            position: self.pos,
            kind,
        }
    }

    fn push(&mut self, node: RegexNode) {
        self.stack.push(node);
    }

    fn pop(&mut self) -> ParseResult<RegexNode> {
        self.stack
            .pop()
            .ok_or_else(|| self.error(RegexErrorKind::UnexpectedEnd))
    }

    fn pop_pair(&mut self) -> ParseResult<(RegexNode, RegexNode)> {
        let right = self.pop()?;
        let left = self.pop()?;
        Ok((left, right))
    }

    // regex := sequence ('|' regex)?
    fn regex(&mut self) -> ParseResult {
        self.sequence()?;
        if self.peek() == Some(b'|') {
            self.advance();
            self.regex()?;
            let (left, right) = self.pop_pair()?;
            self.push(RegexNode::or(left, right));
        }
        Ok(())
    }

    // sequence := quantifiedTerm+
    fn sequence(&mut self) -> ParseResult {
        self.quantified_term()?;
        loop {
            match self.peek() {
                None | Some(b'|') | Some(b')') => return Ok(()),
                Some(_) => {
                    self.quantified_term()?;
                    let (left, right) = self.pop_pair()?;
                    self.push(RegexNode::concat(left, right));
                }
            }
        }
    }

    // quantifiedTerm := term ('*' | '+' | '?')?
    fn quantified_term(&mut self) -> ParseResult {
        self.term()?;
        let wrap: fn(Box<RegexNode>) -> RegexNode = match self.peek() {
            Some(b'*') => RegexNode::Star,
            Some(b'+') => RegexNode::Plus,
            Some(b'?') => RegexNode::Question,
            _ => return Ok(()),
        };
        self.advance();
        let operand = self.pop()?;
        self.push(wrap(Box::new(operand)));
        Ok(())
    }

    // term := '(' regex ')' | '[' set ']' | '.' | literal
    fn term(&mut self) -> ParseResult {
        match self.peek() {
            None => Err(self.error(RegexErrorKind::UnexpectedEnd)),
            Some(b'(') => {
                self.advance();
                self.regex()?;
                if self.peek() != Some(b')') {
                    return Err(self.error(RegexErrorKind::UnmatchedParen));
                }
                self.advance();
                Ok(())
            }
            Some(b'[') => {
                self.advance();
                self.set()?;
                if self.peek() != Some(b']') {
                    return Err(self.error(RegexErrorKind::UnterminatedSet));
                }
                self.advance();
                Ok(())
            }
            Some(b'.') => {
                self.advance();
                self.push(RegexNode::Dot);
                Ok(())
            }
            Some(q @ (b'*' | b'+' | b'?')) => Err(self.error(RegexErrorKind::MissingOperand(q))),
            Some(b'|') => Err(self.error(RegexErrorKind::UnexpectedChar(b'|'))),
            Some(b')') => Err(self.error(RegexErrorKind::UnmatchedParen)),
            Some(_) => self.literal(),
        }
    }

    // literal := '\' escape | any-other-char
    fn literal(&mut self) -> ParseResult {
        match self.advance() {
            None => Err(self.error(RegexErrorKind::UnexpectedEnd)),
            Some(b'\\') => self.escape(),
            Some(c) => {
                self.push(RegexNode::Char(c));
                Ok(())
            }
        }
    }

    fn escape(&mut self) -> ParseResult {
        let node = match self.advance() {
            None => return Err(self.error(RegexErrorKind::DanglingEscape)),
            Some(b'n') => RegexNode::Char(b'\n'),
            Some(b'r') => RegexNode::Char(b'\r'),
            Some(b't') => RegexNode::Char(b'\t'),
            Some(b's') => RegexNode::whitespace(),
            Some(c) => RegexNode::Char(c),
        };
        self.push(node);
        Ok(())
    }

    // set := '^'? setItem+
    fn set(&mut self) -> ParseResult {
        let base = self.stack.len();
        let inverted = self.peek() == Some(b'^');
        if inverted {
            self.advance();
        }
        loop {
            match self.peek() {
                None => return Err(self.error(RegexErrorKind::UnterminatedSet)),
                Some(b']') => break,
                Some(_) => self.set_item()?,
            }
        }
        if self.stack.len() == base {
            return Err(self.error(RegexErrorKind::EmptySet));
        }
        let items = self.stack.split_off(base);
        self.push(RegexNode::Charset { inverted, items });
        Ok(())
    }

    // setItem := literal ('-' literal)?
    fn set_item(&mut self) -> ParseResult {
        self.literal()?;
        if self.peek() != Some(b'-') {
            return Ok(());
        }
        self.advance();
        if self.peek() == Some(b']') {
            // trailing '-' is a literal
            self.push(RegexNode::Char(b'-'));
            return Ok(());
        }
        let start_pos = self.pos;
        self.literal()?;
        let (start, end) = self.pop_pair()?;
        match (start, end) {
            (RegexNode::Char(lo), RegexNode::Char(hi)) if lo <= hi => {
                self.push(RegexNode::Range(lo, hi));
                Ok(())
            }
            (RegexNode::Char(lo), RegexNode::Char(hi)) => Err(RegexError {
                position: start_pos,
                kind: RegexErrorKind::InvalidRange(lo, hi),
            }),
            _ => Err(RegexError {
                position: start_pos,
                kind: RegexErrorKind::UnexpectedChar(b'-'),
            }),
        }
    }
}
