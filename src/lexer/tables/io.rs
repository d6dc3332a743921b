// src/lexer/tables/io.rs
use std::{
    io::{BufWriter, Write},
    time::Instant,
};

use serde::{Deserialize, Serialize};
use serde_with::serde_as;

use super::{
    INVALID_TOKEN, LexerTables, NUM_CHARS,
    compact::{
        CODES_PER_BYTE, COMPACT_VALUES, CompactEntry, FullEntry, IndexEntry, TransitionTable,
    },
};

// -------------------- JSON (de)serialization --------------------

#[serde_as]
#[derive(Serialize, Deserialize)]
struct TablesDisk {
    token_names: Vec<String>,
    #[serde_as(as = "[_; NUM_CHARS]")]
    char_mappings: [u16; NUM_CHARS],
    accepts: Vec<u32>,
    table: TransitionTable,
}
impl From<&LexerTables> for TablesDisk {
    fn from(t: &LexerTables) -> Self {
        Self {
            token_names: t.token_names.clone(),
            char_mappings: t.char_mappings,
            accepts: t.accepts.clone(),
            table: t.table.clone(),
        }
    }
}
impl TablesDisk {
    fn into_tables(self) -> Result<LexerTables, String> {
        let tables = LexerTables {
            token_names: self.token_names,
            char_mappings: self.char_mappings,
            accepts: self.accepts,
            table: self.table,
        };
        tables.validate()?;
        Ok(tables)
    }
}

pub fn save_tables_json(path: &std::path::Path, t: &LexerTables) -> std::io::Result<()> {
    let f = std::fs::File::create(path)?;
    let mut w = BufWriter::new(f);
    serde_json::to_writer(&mut w, &TablesDisk::from(t))?;
    w.flush()
}

pub fn load_tables_json_bytes(data: &[u8]) -> Result<LexerTables, String> {
    serde_json::from_slice::<TablesDisk>(data)
        .map_err(|e| format!("Failed to parse tables JSON: {e}"))?
        .into_tables()
}

// -------------------- Compact binary --------------------
//   magic: 8 bytes = "LXCMP001"
//   u32 x5: n_states, num_transitions, n_full, n_compact, n_tokens
//   u16:   char_mappings[NUM_CHARS]
//   u16:   indices[n_states]                 (pos<<2 | kind)
//   u16:   full[n_full * num_transitions]
//   per compact entry: u16 values[3], u8 data[ceil(num_transitions / 4)]
//   u16:   accepts[n_states]                 (INVALID=0xFFFF)
//   per token: u32 len, utf-8 bytes

const BIN_MAGIC: &[u8; 8] = b"LXCMP001";
const INVALID_TOKEN_U16: u16 = 0xFFFF;

fn invalid_data(msg: impl Into<String>) -> std::io::Error {
    std::io::Error::new(std::io::ErrorKind::InvalidData, msg.into())
}

fn encode_bin(t: &LexerTables) -> std::io::Result<Vec<u8>> {
    let table = &t.table;
    let mut out = Vec::new();
    out.extend_from_slice(BIN_MAGIC);
    for n in [
        t.state_count(),
        table.num_transitions,
        table.full.len(),
        table.compact.len(),
        t.token_names.len(),
    ] {
        let n = u32::try_from(n).map_err(|_| invalid_data("count exceeds u32::MAX"))?;
        out.extend_from_slice(&n.to_le_bytes());
    }
    for &m in &t.char_mappings {
        out.extend_from_slice(&m.to_le_bytes());
    }
    for e in &table.indices {
        out.extend_from_slice(&e.pack().to_le_bytes());
    }
    for e in &table.full {
        for &v in &e.data {
            out.extend_from_slice(&v.to_le_bytes());
        }
    }
    for e in &table.compact {
        for &v in &e.values {
            out.extend_from_slice(&v.to_le_bytes());
        }
        out.extend_from_slice(&e.data);
    }
    for &tk in &t.accepts {
        let v = if tk == INVALID_TOKEN {
            INVALID_TOKEN_U16
        } else {
            u16::try_from(tk).map_err(|_| invalid_data("token id > u16::MAX"))?
        };
        out.extend_from_slice(&v.to_le_bytes());
    }
    for name in &t.token_names {
        out.extend_from_slice(&(name.len() as u32).to_le_bytes());
        out.extend_from_slice(name.as_bytes());
    }
    Ok(out)
}

pub fn save_tables_bin(path: &std::path::Path, t: &LexerTables) -> std::io::Result<()> {
    let instant = Instant::now();
    let bytes = encode_bin(t)?;
    let f = std::fs::File::create(path)?;
    let mut w = BufWriter::new(f);
    w.write_all(&bytes)?;
    let flush = w.flush();
    log::debug!(
        "Saved {} bytes of tables to {} in {} ms",
        bytes.len(),
        path.display(),
        instant.elapsed().as_millis()
    );
    flush
}

#[inline]
fn take<'a>(buf: &mut &'a [u8], n: usize, what: &str) -> Result<&'a [u8], String> {
    if buf.len() < n {
        return Err(format!("truncated {what}"));
    }
    let (head, rest) = buf.split_at(n);
    *buf = rest;
    Ok(head)
}

// Rejects a section size the remaining input cannot possibly hold, so header
// counts never drive an allocation on their own.
fn check_section(buf: &[u8], count: usize, elem_bytes: usize, what: &str) -> Result<(), String> {
    match count.checked_mul(elem_bytes) {
        Some(n) if n <= buf.len() => Ok(()),
        _ => Err(format!(
            "{what}: {count} entries do not fit in the remaining {} bytes",
            buf.len()
        )),
    }
}

#[inline]
fn take_u32(buf: &mut &[u8]) -> Result<u32, String> {
    let mut le = [0u8; 4];
    le.copy_from_slice(take(buf, 4, "u32")?);
    Ok(u32::from_le_bytes(le))
}

#[inline]
fn take_u16(buf: &mut &[u8]) -> Result<u16, String> {
    let mut le = [0u8; 2];
    le.copy_from_slice(take(buf, 2, "u16")?);
    Ok(u16::from_le_bytes(le))
}

pub fn load_tables_bin_bytes(mut data: &[u8]) -> Result<LexerTables, String> {
    if data.len() < 8 + 5 * 4 {
        return Err("bin too short".into());
    }
    if take(&mut data, 8, "magic")? != BIN_MAGIC {
        return Err("bad magic in tables .bin".into());
    }

    let n_states = take_u32(&mut data)? as usize;
    let num_transitions = take_u32(&mut data)? as usize;
    let n_full = take_u32(&mut data)? as usize;
    let n_compact = take_u32(&mut data)? as usize;
    let n_tokens = take_u32(&mut data)? as usize;
    if num_transitions == 0 || num_transitions > NUM_CHARS {
        return Err(format!("num_transitions {num_transitions} outside 1..={NUM_CHARS}"));
    }

    let mut char_mappings = [0u16; NUM_CHARS];
    for slot in char_mappings.iter_mut() {
        *slot = take_u16(&mut data)?;
        if *slot as usize >= num_transitions {
            return Err(format!("char mapping {} out of range", *slot));
        }
    }

    check_section(data, n_states, 2, "indices")?;
    let mut indices = Vec::with_capacity(n_states);
    for _ in 0..n_states {
        let entry = IndexEntry::unpack(take_u16(&mut data)?)?;
        indices.push(entry);
    }

    check_section(data, n_full, num_transitions * 2, "full entries")?;
    let mut full = Vec::with_capacity(n_full);
    for _ in 0..n_full {
        let mut row = Vec::with_capacity(num_transitions);
        for _ in 0..num_transitions {
            row.push(take_u16(&mut data)?);
        }
        full.push(FullEntry { data: row });
    }

    let packed_len = num_transitions.div_ceil(CODES_PER_BYTE);
    check_section(data, n_compact, COMPACT_VALUES * 2 + packed_len, "compact entries")?;
    let mut compact = Vec::with_capacity(n_compact);
    for _ in 0..n_compact {
        let mut values = [0u16; COMPACT_VALUES];
        for v in values.iter_mut() {
            *v = take_u16(&mut data)?;
        }
        let packed = take(&mut data, packed_len, "compact entry")?.to_vec();
        compact.push(CompactEntry {
            values,
            data: packed,
        });
    }

    check_section(data, n_states, 2, "accepts")?;
    let mut accepts = Vec::with_capacity(n_states);
    for _ in 0..n_states {
        let v = take_u16(&mut data)?;
        accepts.push(if v == INVALID_TOKEN_U16 {
            INVALID_TOKEN
        } else {
            v as u32
        });
    }

    check_section(data, n_tokens, 4, "token names")?;
    let mut token_names = Vec::with_capacity(n_tokens);
    for _ in 0..n_tokens {
        let len = take_u32(&mut data)? as usize;
        let bytes = take(&mut data, len, "token name")?;
        let name = std::str::from_utf8(bytes).map_err(|e| format!("token name: {e}"))?;
        token_names.push(name.to_string());
    }

    if !data.is_empty() {
        return Err(format!("{} trailing bytes after tables", data.len()));
    }

    let tables = LexerTables {
        token_names,
        char_mappings,
        accepts,
        table: TransitionTable {
            num_transitions,
            indices,
            full,
            compact,
        },
    };
    tables.validate()?;
    Ok(tables)
}
