// src/lexer/tables/compact.rs
// Compacted transition table. Each DFA state's row is stored as one of:
//   Zero    every transition rejects; no storage
//   Compact <= 3 distinct nonzero targets; 2-bit codes, 4 per byte, low bits first
//   Full    the raw row
// Identical Full/Compact entries are stored once.

use anyhow::{Result, bail};
use hashbrown::HashMap;
use rayon::prelude::*;
use serde::{Deserialize, Serialize};

use super::dfa::Dfa;

/// Bits per packed code in a compact entry.
pub const BITS_PER_CODE: usize = 2;
pub const CODES_PER_BYTE: usize = 8 / BITS_PER_CODE;
/// Code 0 means "reject", so a compact entry holds up to 3 targets.
pub const COMPACT_VALUES: usize = (1 << BITS_PER_CODE) - 1;
const CODE_MASK: u8 = (1 << BITS_PER_CODE) - 1;

/// Index positions are stored in 14 bits next to the 2-bit kind.
pub const MAX_ENTRY_POS: usize = (1 << 14) - 1;

pub type State = u16;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[repr(u8)]
pub enum EntryKind {
    Zero = 0,
    Full = 1,
    Compact = 2,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct IndexEntry {
    pub kind: EntryKind,
    pub pos: u16,
}

impl IndexEntry {
    pub const ZERO: IndexEntry = IndexEntry {
        kind: EntryKind::Zero,
        pos: 0,
    };

    /// `pos << 2 | kind`
    pub fn pack(self) -> u16 {
        (self.pos << 2) | self.kind as u16
    }

    pub fn unpack(word: u16) -> Result<Self, String> {
        let kind = match word & 3 {
            0 => EntryKind::Zero,
            1 => EntryKind::Full,
            2 => EntryKind::Compact,
            k => return Err(format!("bad index entry kind {k}")),
        };
        Ok(Self {
            kind,
            pos: word >> 2,
        })
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct FullEntry {
    pub data: Vec<State>,
}

#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct CompactEntry {
    /// Distinct nonzero targets in ascending order; unused slots are 0.
    pub values: [State; COMPACT_VALUES],
    pub data: Vec<u8>,
}

impl CompactEntry {
    #[inline]
    pub fn code(&self, transition: usize) -> u8 {
        let shift = BITS_PER_CODE * (transition % CODES_PER_BYTE);
        (self.data[transition / CODES_PER_BYTE] >> shift) & CODE_MASK
    }

    pub fn get(&self, transition: usize) -> State {
        match self.code(transition) {
            0 => 0,
            code => self.values[code as usize - 1],
        }
    }
}

// Shape of a single state's row before interning.
enum RowShape {
    Zero,
    Compact(CompactEntry),
    Full(FullEntry),
}

fn classify_row(row: Vec<State>) -> RowShape {
    let mut distinct: Vec<State> = row.iter().copied().filter(|&v| v != 0).collect();
    distinct.sort_unstable();
    distinct.dedup();

    if distinct.is_empty() {
        return RowShape::Zero;
    }
    if distinct.len() > COMPACT_VALUES {
        return RowShape::Full(FullEntry { data: row });
    }

    let mut values = [0 as State; COMPACT_VALUES];
    values[..distinct.len()].copy_from_slice(&distinct);

    let mut data = vec![0u8; row.len().div_ceil(CODES_PER_BYTE)];
    for (t, &v) in row.iter().enumerate() {
        let code = match v {
            0 => 0,
            v => distinct.iter().position(|&d| d == v).map_or(0, |p| p as u8 + 1),
        };
        data[t / CODES_PER_BYTE] |= code << (BITS_PER_CODE * (t % CODES_PER_BYTE));
    }
    RowShape::Compact(CompactEntry { values, data })
}

fn intern<T: Clone + Eq + std::hash::Hash>(
    entry: T,
    list: &mut Vec<T>,
    seen: &mut HashMap<T, usize>,
) -> usize {
    *seen.entry(entry).or_insert_with_key(|e| {
        list.push(e.clone());
        list.len() - 1
    })
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TransitionTable {
    /// Length of every row, i.e. the number of distinct transition columns.
    pub num_transitions: usize,
    pub indices: Vec<IndexEntry>,
    pub full: Vec<FullEntry>,
    pub compact: Vec<CompactEntry>,
}

impl TransitionTable {
    pub fn encode(dfa: &Dfa) -> Result<Self> {
        let state_count = dfa.state_count();
        let num_transitions = dfa.num_transitions();
        if state_count > State::MAX as usize + 1 {
            bail!("internal: {state_count} DFA states do not fit in a u16 state");
        }

        // Per-state rows are independent; collect() keeps state order.
        let shapes: Vec<RowShape> = (0..state_count)
            .into_par_iter()
            .map(|s| {
                let row = (0..num_transitions)
                    .map(|t| dfa.transitions[t][s] as State)
                    .collect();
                classify_row(row)
            })
            .collect();

        let mut table = TransitionTable {
            num_transitions,
            indices: Vec::with_capacity(state_count),
            full: Vec::new(),
            compact: Vec::new(),
        };
        let mut seen_full: HashMap<FullEntry, usize> = HashMap::new();
        let mut seen_compact: HashMap<CompactEntry, usize> = HashMap::new();

        for (state, shape) in shapes.into_iter().enumerate() {
            let (kind, pos) = match shape {
                RowShape::Zero => (EntryKind::Zero, 0),
                RowShape::Full(e) => (
                    EntryKind::Full,
                    intern(e, &mut table.full, &mut seen_full),
                ),
                RowShape::Compact(e) => (
                    EntryKind::Compact,
                    intern(e, &mut table.compact, &mut seen_compact),
                ),
            };
            if pos > MAX_ENTRY_POS {
                bail!("internal: state {state} needs entry position {pos}, beyond 14 bits");
            }
            table.indices.push(IndexEntry {
                kind,
                pos: pos as u16,
            });
        }

        log::debug!(
            "[tables] encoded {} states: zero={} full={} compact={} (~{} bytes)",
            state_count,
            table.indices.iter().filter(|e| e.kind == EntryKind::Zero).count(),
            table.full.len(),
            table.compact.len(),
            table.size_in_bytes()
        );
        Ok(table)
    }

    pub fn state_count(&self) -> usize {
        self.indices.len()
    }

    #[inline]
    pub fn get_transition(&self, transition: usize, state: usize) -> usize {
        let entry = self.indices[state];
        match entry.kind {
            EntryKind::Zero => 0,
            EntryKind::Full => self.full[entry.pos as usize].data[transition] as usize,
            EntryKind::Compact => self.compact[entry.pos as usize].get(transition) as usize,
        }
    }

    /// Checks every (transition, state) pair against the matrix it came from.
    pub fn verify(&self, dfa: &Dfa) -> Result<()> {
        if self.state_count() != dfa.state_count() || self.num_transitions != dfa.num_transitions() {
            bail!(
                "internal: table shape {}x{} differs from DFA {}x{}",
                self.num_transitions,
                self.state_count(),
                dfa.num_transitions(),
                dfa.state_count()
            );
        }
        for (t, row) in dfa.transitions.iter().enumerate() {
            for (s, &expected) in row.iter().enumerate() {
                let got = self.get_transition(t, s);
                if got != expected {
                    bail!("internal: get_transition({t}, {s}) = {got}, DFA says {expected}");
                }
            }
        }
        Ok(())
    }

    /// Approximate footprint with `State = u16`.
    pub fn size_in_bytes(&self) -> usize {
        let state = std::mem::size_of::<State>();
        let index = self.indices.len() * 2;
        let full = self.full.len() * self.num_transitions * state;
        let compact = self.compact.len()
            * (COMPACT_VALUES * state + self.num_transitions.div_ceil(CODES_PER_BYTE));
        index + full + compact
    }
}
