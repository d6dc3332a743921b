// src/lexer/tables/codegen.rs
//! Rust source emission for a built `LexerTables`.
//!
//! The output is self-contained: a `TokenKind` enum, the compacted tables as
//! statics, `get_transition` / `next_state`, and a longest-match `Lexer`.
//! Output depends only on the tables, so identical inputs give identical
//! text.

use std::fmt::Write;

use anyhow::{Result, bail};
use hashbrown::HashSet;

use super::{
    END_CHAR, INVALID_TOKEN, LexerTables, START_CHAR,
    compact::{COMPACT_VALUES, CODES_PER_BYTE, EntryKind},
};

const NUMBERS_PER_LINE: usize = 16;

/// `FLOAT_LITERAL` -> `FloatLiteral`; names that are not all caps keep their case.
pub fn variant_name(token: &str) -> String {
    let mut out = String::with_capacity(token.len());
    for part in token.split('_').filter(|p| !p.is_empty()) {
        let shout = part.chars().all(|c| !c.is_ascii_lowercase());
        let mut chars = part.chars();
        if let Some(first) = chars.next() {
            out.push(first.to_ascii_uppercase());
            if shout {
                out.extend(chars.map(|c| c.to_ascii_lowercase()));
            } else {
                out.extend(chars);
            }
        }
    }
    if out.is_empty() || out.starts_with(|c: char| c.is_ascii_digit()) {
        out.insert(0, 'T');
    }
    if out == "Self" {
        out.push('_');
    }
    out
}

/// Bits needed to hold `max`.
fn bit_width(max: u16) -> u32 {
    u16::BITS - max.leading_zeros()
}

fn write_numbers<I>(buf: &mut String, indent: &str, items: I) -> std::fmt::Result
where
    I: IntoIterator,
    I::Item: std::fmt::Display,
{
    for (i, v) in items.into_iter().enumerate() {
        if i % NUMBERS_PER_LINE == 0 {
            if i > 0 {
                buf.push('\n');
            }
            buf.push_str(indent);
        } else {
            buf.push(' ');
        }
        write!(buf, "{v},")?;
    }
    buf.push('\n');
    Ok(())
}

fn write_token_enum(buf: &mut String, names: &[String]) -> Result<()> {
    let mut variants = Vec::with_capacity(names.len());
    let mut seen = HashSet::new();
    for name in names {
        let v = variant_name(name);
        if !seen.insert(v.clone()) {
            bail!("token {name} maps to the enum variant {v}, which is already taken");
        }
        variants.push(v);
    }

    buf.push_str("#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]\n");
    buf.push_str("#[repr(u16)]\n");
    buf.push_str("pub enum TokenKind {\n");
    for (id, v) in variants.iter().enumerate() {
        writeln!(buf, "    {v} = {id},")?;
    }
    buf.push_str("}\n\n");

    buf.push_str("impl TokenKind {\n");
    buf.push_str("    pub const fn from_id(id: u16) -> Option<Self> {\n");
    buf.push_str("        Some(match id {\n");
    for (id, v) in variants.iter().enumerate() {
        writeln!(buf, "            {id} => TokenKind::{v},")?;
    }
    buf.push_str("            _ => return None,\n");
    buf.push_str("        })\n");
    buf.push_str("    }\n");
    buf.push_str("}\n\n");
    Ok(())
}

// Per-slot bit widths for the packed compact values.
struct ValueLayout {
    widths: [u32; COMPACT_VALUES],
    packed_ty: &'static str,
}

impl ValueLayout {
    fn new(t: &LexerTables) -> Self {
        let mut widths = [0u32; COMPACT_VALUES];
        for entry in &t.table.compact {
            for (w, &v) in widths.iter_mut().zip(&entry.values) {
                *w = (*w).max(bit_width(v));
            }
        }
        let packed_ty = if widths.iter().sum::<u32>() <= 32 {
            "u32"
        } else {
            "u64"
        };
        Self { widths, packed_ty }
    }

    fn shift(&self, slot: usize) -> u32 {
        self.widths[..slot].iter().sum()
    }

    fn pack(&self, values: &[u16; COMPACT_VALUES]) -> u64 {
        values
            .iter()
            .enumerate()
            .map(|(slot, &v)| (v as u64) << self.shift(slot))
            .fold(0, |acc, v| acc | v)
    }
}

fn write_get_transition(buf: &mut String, layout: &ValueLayout) -> Result<()> {
    buf.push_str("pub fn get_transition(transition: usize, state: usize) -> State {\n");
    buf.push_str("    let index = INDICES[state];\n");
    buf.push_str("    let pos = (index >> 2) as usize;\n");
    buf.push_str("    match index & 3 {\n");
    writeln!(buf, "        {} => FULL[pos].data[transition],", EntryKind::Full as u8)?;
    writeln!(buf, "        {} => {{", EntryKind::Compact as u8)?;
    buf.push_str("            let entry = &COMPACT[pos];\n");
    writeln!(
        buf,
        "            let code = (entry.data[transition / {CODES_PER_BYTE}] >> ((transition % {CODES_PER_BYTE}) * 2)) & 3;"
    )?;
    buf.push_str("            match code {\n");
    for slot in 0..COMPACT_VALUES {
        let width = layout.widths[slot];
        if width == 0 {
            continue;
        }
        let mask = (1u64 << width) - 1;
        writeln!(
            buf,
            "                {} => ((entry.values >> {}) & {mask:#x}) as State,",
            slot + 1,
            layout.shift(slot)
        )?;
    }
    buf.push_str("                _ => 0,\n");
    buf.push_str("            }\n");
    buf.push_str("        }\n");
    buf.push_str("        _ => 0,\n");
    buf.push_str("    }\n");
    buf.push_str("}\n\n");
    Ok(())
}

const LEXER_SRC: &str = r#"#[inline]
pub fn next_state(byte: u8, state: State) -> State {
    if byte < START_CHAR || byte > END_CHAR {
        return 0;
    }
    get_transition(MAPPINGS[(byte - START_CHAR) as usize] as usize, state as usize)
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Token {
    pub kind: TokenKind,
    pub offset: usize,
    pub len: usize,
}

/// Longest-match lexer over the tables above.
pub struct Lexer<'a> {
    text: &'a [u8],
    offset: usize,
}

impl<'a> Lexer<'a> {
    pub fn new(text: &'a str) -> Self {
        Self {
            text: text.as_bytes(),
            offset: 0,
        }
    }

    /// Returns `EndOfFile` once the input is exhausted, or `Err(offset)` when
    /// no token matches at `offset`.
    pub fn next_token(&mut self) -> Result<Token, usize> {
        let start = self.offset;
        if start >= self.text.len() {
            return Ok(Token {
                kind: TokenKind::EndOfFile,
                offset: start,
                len: 0,
            });
        }
        let mut state = INITIAL_STATE;
        let mut best: Option<(u16, usize)> = None;
        for (i, &byte) in self.text[start..].iter().enumerate() {
            state = next_state(byte, state);
            if state == 0 {
                break;
            }
            let accept = ACCEPTS[state as usize];
            if accept != NO_TOKEN {
                best = Some((accept, i + 1));
            }
        }
        let (id, len) = best.ok_or(start)?;
        let kind = TokenKind::from_id(id).ok_or(start)?;
        self.offset = start + len;
        Ok(Token {
            kind,
            offset: start,
            len,
        })
    }
}
"#;

/// Emits the lexer module for `tables`. `source_name` only appears in the
/// header comment.
pub fn generate_rust(tables: &LexerTables, source_name: &str) -> Result<String> {
    let table = &tables.table;
    let state_ty = if tables.state_count() <= 256 { "u8" } else { "u16" };
    let mapping_ty = if table.num_transitions <= 256 { "u8" } else { "u16" };
    let packed_len = table.num_transitions.div_ceil(CODES_PER_BYTE);
    let layout = ValueLayout::new(tables);

    let mut buf = String::with_capacity(4096 + tables.state_count() * table.num_transitions);

    writeln!(
        buf,
        "// @generated by gen_lex_tables from {source_name}. Do not edit by hand.\n"
    )?;
    write_token_enum(&mut buf, &tables.token_names)?;

    writeln!(buf, "pub type State = {state_ty};\n")?;
    writeln!(buf, "pub const START_CHAR: u8 = {START_CHAR};")?;
    writeln!(buf, "pub const END_CHAR: u8 = {END_CHAR};")?;
    writeln!(buf, "pub const INITIAL_STATE: State = {};", super::INITIAL_STATE)?;
    writeln!(buf, "pub const NO_TOKEN: u16 = u16::MAX;")?;
    writeln!(buf, "pub const NUM_STATES: usize = {};", tables.state_count())?;
    writeln!(buf, "const NUM_TRANSITIONS: usize = {};\n", table.num_transitions)?;

    buf.push_str("struct FullEntry {\n    data: [State; NUM_TRANSITIONS],\n}\n\n");
    writeln!(
        buf,
        "struct CompactEntry {{\n    values: {},\n    data: [u8; {packed_len}],\n}}\n",
        layout.packed_ty
    )?;

    writeln!(buf, "static MAPPINGS: [{mapping_ty}; {}] = [", tables.char_mappings.len())?;
    write_numbers(&mut buf, "    ", tables.char_mappings.iter())?;
    buf.push_str("];\n\n");

    writeln!(buf, "static FULL: [FullEntry; {}] = [", table.full.len())?;
    for entry in &table.full {
        buf.push_str("    FullEntry {\n        data: [\n");
        write_numbers(&mut buf, "            ", entry.data.iter())?;
        buf.push_str("        ],\n    },\n");
    }
    buf.push_str("];\n\n");

    writeln!(buf, "static COMPACT: [CompactEntry; {}] = [", table.compact.len())?;
    for entry in &table.compact {
        writeln!(
            buf,
            "    CompactEntry {{\n        values: {:#x},\n        data: [",
            layout.pack(&entry.values)
        )?;
        write_numbers(&mut buf, "            ", entry.data.iter())?;
        buf.push_str("        ],\n    },\n");
    }
    buf.push_str("];\n\n");

    buf.push_str("// low 2 bits: 0 = all reject, 1 = FULL, 2 = COMPACT; high 14 bits: position\n");
    writeln!(buf, "static INDICES: [u16; {}] = [", table.indices.len())?;
    write_numbers(&mut buf, "    ", table.indices.iter().map(|e| e.pack()))?;
    buf.push_str("];\n\n");

    writeln!(buf, "pub static ACCEPTS: [u16; {}] = [", tables.accepts.len())?;
    let mut accepts = Vec::with_capacity(tables.accepts.len());
    for &a in &tables.accepts {
        if a == INVALID_TOKEN {
            accepts.push("NO_TOKEN".to_string());
        } else if a < u16::MAX as u32 {
            accepts.push(a.to_string());
        } else {
            bail!("token id {a} does not fit the generated u16 accept table");
        }
    }
    write_numbers(&mut buf, "    ", accepts)?;
    buf.push_str("];\n\n");

    write_get_transition(&mut buf, &layout)?;
    buf.push_str(LEXER_SRC);
    Ok(buf)
}
