// src/lexer/cpu.rs
// Longest-match lexer driven by the compacted tables. Every byte of the input
// must belong to some token; the stream ends with an END_OF_FILE token.

use crate::lexer::tables::{EOF_TOKEN, INITIAL_STATE, LexerTables, REJECT_STATE, TokenId};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CpuToken {
    pub kind: TokenId,
    pub start: usize,
    pub len: usize,
}

impl CpuToken {
    pub fn text<'a>(&self, src: &'a str) -> &'a str {
        &src[self.start..self.start + self.len]
    }
}

fn slice_dbg(src: &[u8], i: usize) -> (usize, String) {
    let lo = i.saturating_sub(16);
    let hi = (i + 16).min(src.len());
    let mut s = String::new();
    for &b in &src[lo..hi] {
        s.push(
            if b.is_ascii_graphic() || b == b' ' || b == b'\n' || b == b'\t' || b == b'\r' {
                b as char
            } else {
                '·'
            },
        );
    }
    (lo, s)
}

/// Longest accepted prefix of `bytes[start..]` as `(token, len)`.
fn longest_match(t: &LexerTables, bytes: &[u8], start: usize) -> Option<(TokenId, usize)> {
    let mut state = INITIAL_STATE;
    let mut best = None;
    for (i, &b) in bytes[start..].iter().enumerate() {
        state = t.next_state(b, state);
        if state == REJECT_STATE {
            break;
        }
        if let Some(tok) = t.accept(state) {
            best = Some((tok, i + 1));
        }
    }
    best
}

/// Splits `input` into tokens. Fails at the first offset where no token of at
/// least one byte matches.
pub fn lex_on_cpu(t: &LexerTables, input: &str) -> Result<Vec<CpuToken>, String> {
    let bytes = input.as_bytes();
    let n = bytes.len();
    let mut out: Vec<CpuToken> = Vec::new();

    let mut pos = 0;
    while pos < n {
        let Some((kind, len)) = longest_match(t, bytes, pos) else {
            let b = bytes[pos];
            let (ctx_lo, ctx) = slice_dbg(bytes, pos);
            return Err(format!(
                "no token matches at byte {pos} (char {:?}, 0x{:02X}); context [{}..{}):\n{}",
                b as char,
                b,
                ctx_lo,
                ctx_lo + ctx.len(),
                ctx
            ));
        };
        out.push(CpuToken {
            kind,
            start: pos,
            len,
        });
        pos += len;
    }

    out.push(CpuToken {
        kind: EOF_TOKEN,
        start: n,
        len: 0,
    });
    Ok(out)
}

/// Drops tokens whose names are in `skip` (e.g. whitespace and comments).
pub fn filter_kinds(t: &LexerTables, tokens: &[CpuToken], skip: &[&str]) -> Vec<CpuToken> {
    let skip_ids: Vec<TokenId> = skip.iter().filter_map(|n| t.token_id(n)).collect();
    tokens
        .iter()
        .copied()
        .filter(|tok| !skip_ids.contains(&tok.kind))
        .collect()
}
