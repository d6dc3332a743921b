// src/lexer/tables/mod.rs
pub mod build;
pub mod codegen;
pub mod compact;
pub mod dfa;
pub mod io;
pub mod nfa;
pub mod regex;
pub mod tokens;

pub use build::{build_dfa, build_nfa, build_tables, build_tables_from_source};
pub use compact::TransitionTable;
pub use dfa::{Dfa, INITIAL_STATE, REJECT_STATE};
pub use io::{load_tables_bin_bytes, load_tables_json_bytes, save_tables_bin, save_tables_json};
pub use nfa::Nfa;
pub use regex::{RegexError, RegexNode, RegexParser};
pub use tokens::{EOF_TOKEN, INVALID_TOKEN, TokenDef, TokenId, parse_lex_file};

use compact::{CODES_PER_BYTE, EntryKind};

/// Lowest character code the automata consider (tab).
pub const START_CHAR: u8 = 9;
/// Highest character code the automata consider (`~`).
pub const END_CHAR: u8 = 126;
pub const NUM_CHARS: usize = (END_CHAR - START_CHAR) as usize + 1;

/// Everything a table-driven lexer needs.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LexerTables {
    /// Indexed by token id; slot 0 is `END_OF_FILE`.
    pub token_names: Vec<String>,
    /// `c - START_CHAR` -> transition column
    pub char_mappings: [u16; NUM_CHARS],
    /// state -> token id, or `INVALID_TOKEN`
    pub accepts: Vec<u32>,
    pub table: TransitionTable,
}

impl LexerTables {
    pub fn state_count(&self) -> usize {
        self.accepts.len()
    }

    #[inline]
    pub fn next_state(&self, c: u8, state: usize) -> usize {
        if !(START_CHAR..=END_CHAR).contains(&c) {
            return REJECT_STATE;
        }
        let column = self.char_mappings[(c - START_CHAR) as usize] as usize;
        self.table.get_transition(column, state)
    }

    pub fn accept(&self, state: usize) -> Option<TokenId> {
        match self.accepts[state] {
            INVALID_TOKEN => None,
            id => Some(id),
        }
    }

    pub fn token_name(&self, id: TokenId) -> &str {
        self.token_names
            .get(id as usize)
            .map(String::as_str)
            .unwrap_or("<unknown>")
    }

    pub fn token_id(&self, name: &str) -> Option<TokenId> {
        self.token_names
            .iter()
            .position(|n| n == name)
            .map(|i| i as TokenId)
    }

    /// Checks every index the lookups rely on, so tables read from disk
    /// cannot make `next_state` or `accept` go out of bounds.
    pub fn validate(&self) -> Result<(), String> {
        let t = &self.table;
        let n_states = t.indices.len();
        if n_states <= INITIAL_STATE {
            return Err(format!("{n_states} states; the initial state is {INITIAL_STATE}"));
        }
        if self.accepts.len() != n_states {
            return Err(format!(
                "accepts has {} states but the table has {n_states}",
                self.accepts.len()
            ));
        }
        if t.num_transitions == 0 || t.num_transitions > NUM_CHARS {
            return Err(format!(
                "num_transitions {} outside 1..={NUM_CHARS}",
                t.num_transitions
            ));
        }
        if let Some(&m) = self
            .char_mappings
            .iter()
            .find(|&&m| m as usize >= t.num_transitions)
        {
            return Err(format!("char mapping {m} out of range"));
        }
        for (state, e) in t.indices.iter().enumerate() {
            let bound = match e.kind {
                EntryKind::Zero => continue,
                EntryKind::Full => t.full.len(),
                EntryKind::Compact => t.compact.len(),
            };
            if e.pos as usize >= bound {
                return Err(format!("state {state} points past the end of its entry list"));
            }
        }
        for (i, e) in t.full.iter().enumerate() {
            if e.data.len() != t.num_transitions {
                return Err(format!(
                    "full entry {i} has {} columns, expected {}",
                    e.data.len(),
                    t.num_transitions
                ));
            }
            if let Some(&v) = e.data.iter().find(|&&v| v as usize >= n_states) {
                return Err(format!("full entry {i} targets state {v} of {n_states}"));
            }
        }
        let packed_len = t.num_transitions.div_ceil(CODES_PER_BYTE);
        for (i, e) in t.compact.iter().enumerate() {
            if e.data.len() != packed_len {
                return Err(format!(
                    "compact entry {i} has {} bytes, expected {packed_len}",
                    e.data.len()
                ));
            }
            if let Some(&v) = e.values.iter().find(|&&v| v as usize >= n_states) {
                return Err(format!("compact entry {i} targets state {v} of {n_states}"));
            }
        }
        if self.token_names.is_empty() {
            return Err("no token names".into());
        }
        if let Some(&a) = self
            .accepts
            .iter()
            .find(|&&a| a != INVALID_TOKEN && a as usize >= self.token_names.len())
        {
            return Err(format!("accept token {a} has no name"));
        }
        Ok(())
    }

    /// Whole-input match using only the compacted tables.
    pub fn run(&self, input: &[u8]) -> Option<TokenId> {
        let mut state = INITIAL_STATE;
        for &c in input {
            state = self.next_state(c, state);
            if state == REJECT_STATE {
                return None;
            }
        }
        self.accept(state)
    }
}
