// src/lexer/tables/nfa.rs
//! Shared NFA for all token patterns.
//!
//! States live in one arena and refer to each other by index. `*` and `+`
//! allocate an empty `Remapped` placeholder for the loop head, build the
//! body pointing at it, then overwrite the placeholder through its index.

use anyhow::{Result, bail};
use hashbrown::HashSet;

use super::{END_CHAR, START_CHAR, regex::RegexNode, tokens::TokenId};

pub type StateIdx = usize;

// Inclusion bitsets cover every byte up to END_CHAR.
const TABLE_LEN: usize = END_CHAR as usize + 1;

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum NfaState {
    Accept(TokenId),
    Char {
        ch: u8,
        next: Vec<StateIdx>,
    },
    /// Any character except `\n`.
    Dot {
        next: Vec<StateIdx>,
    },
    /// Stands for all of its targets at once; never matches on its own.
    Remapped(Vec<StateIdx>),
    Table {
        include: Vec<bool>,
        inverse: bool,
        next: Vec<StateIdx>,
    },
}

impl NfaState {
    /// Whether reading `c` in this state moves to `next()`.
    pub fn accepts(&self, c: u8) -> bool {
        match self {
            NfaState::Char { ch, .. } => *ch == c,
            NfaState::Dot { .. } => c != b'\n',
            NfaState::Table {
                include, inverse, ..
            } => include.get(c as usize).copied().unwrap_or(false) != *inverse,
            NfaState::Accept(_) | NfaState::Remapped(_) => false,
        }
    }

    pub fn next(&self) -> &[StateIdx] {
        match self {
            NfaState::Char { next, .. } | NfaState::Dot { next } | NfaState::Table { next, .. } => {
                next.as_slice()
            }
            NfaState::Accept(_) | NfaState::Remapped(_) => &[],
        }
    }

    pub fn token(&self) -> Option<TokenId> {
        match self {
            NfaState::Accept(id) => Some(*id),
            _ => None,
        }
    }
}

#[derive(Debug, Clone, Default)]
pub struct Nfa {
    states: Vec<NfaState>,
    start_states: Vec<StateIdx>,
    regex_count: TokenId,
}

impl Nfa {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn states(&self) -> &[NfaState] {
        &self.states
    }

    pub fn start_states(&self) -> &[StateIdx] {
        &self.start_states
    }

    pub fn regex_count(&self) -> TokenId {
        self.regex_count
    }

    pub fn add_state(&mut self, state: NfaState) -> StateIdx {
        self.states.push(state);
        self.states.len() - 1
    }

    /// Registers one token pattern and returns its token id.
    ///
    /// Ids are handed out in call order starting at 1; a lower id wins when
    /// several patterns accept the same text.
    pub fn add_regex(&mut self, regex: &RegexNode) -> Result<TokenId> {
        self.regex_count += 1;
        let id = self.regex_count;
        let accept = self.add_state(NfaState::Accept(id));
        let starts = regex.create_states(self, &[accept])?;
        self.start_states.extend(starts);
        Ok(id)
    }

    /// Pushes `roots` onto `out`, replacing every `Remapped` state by the
    /// states it stands for. `Remapped` indices themselves never reach `out`.
    /// Loop heads may refer back to themselves; each is expanded once.
    pub fn resolve_into(&self, roots: &[StateIdx], out: &mut Vec<StateIdx>) {
        let mut expanded: HashSet<StateIdx> = HashSet::new();
        let mut pending: Vec<StateIdx> = roots.iter().rev().copied().collect();
        while let Some(idx) = pending.pop() {
            match &self.states[idx] {
                NfaState::Remapped(targets) => {
                    if expanded.insert(idx) {
                        pending.extend(targets.iter().rev());
                    }
                }
                _ => out.push(idx),
            }
        }
    }

    /// Resolved, sorted and deduplicated start states.
    pub fn initial_states(&self) -> Vec<StateIdx> {
        let mut states = Vec::new();
        self.resolve_into(&self.start_states, &mut states);
        states.sort_unstable();
        states.dedup();
        states
    }

    /// Lowest token id among the accept states in `states`.
    pub fn best_accept(&self, states: &[StateIdx]) -> Option<TokenId> {
        states.iter().filter_map(|&i| self.states[i].token()).min()
    }

    /// Whole-input match by simulating every live state, without building a
    /// DFA. Characters outside `[START_CHAR, END_CHAR]` never match.
    pub fn matches(&self, input: &[u8]) -> Option<TokenId> {
        let mut live = self.initial_states();
        for &c in input {
            if !(START_CHAR..=END_CHAR).contains(&c) {
                return None;
            }
            let mut next = Vec::new();
            for &idx in &live {
                let state = &self.states[idx];
                if state.accepts(c) {
                    self.resolve_into(state.next(), &mut next);
                }
            }
            if next.is_empty() {
                return None;
            }
            next.sort_unstable();
            next.dedup();
            live = next;
        }
        self.best_accept(&live)
    }
}

fn fill_charset(items: &[RegexNode], include: &mut [bool]) -> Result<()> {
    for item in items {
        match item {
            RegexNode::Char(c) => {
                if let Some(slot) = include.get_mut(*c as usize) {
                    *slot = true;
                }
            }
            RegexNode::Range(lo, hi) => {
                for c in *lo..=*hi {
                    if let Some(slot) = include.get_mut(c as usize) {
                        *slot = true;
                    }
                }
            }
            RegexNode::Charset { inverted, items } => {
                let mut inner = vec![false; include.len()];
                fill_charset(items, &mut inner)?;
                for (slot, member) in include.iter_mut().zip(inner) {
                    if member != *inverted {
                        *slot = true;
                    }
                }
            }
            other => bail!("internal: {other:?} inside a character set"),
        }
    }
    Ok(())
}

impl RegexNode {
    /// Appends this node's states to `nfa`, wiring them so that a full match
    /// continues into `accept`. Returns the states a match starts in.
    pub fn create_states(&self, nfa: &mut Nfa, accept: &[StateIdx]) -> Result<Vec<StateIdx>> {
        match self {
            RegexNode::Char(ch) => Ok(vec![nfa.add_state(NfaState::Char {
                ch: *ch,
                next: accept.to_vec(),
            })]),
            RegexNode::Charset { inverted, items } => {
                let mut include = vec![false; TABLE_LEN];
                fill_charset(items, &mut include)?;
                Ok(vec![nfa.add_state(NfaState::Table {
                    include,
                    inverse: *inverted,
                    next: accept.to_vec(),
                })])
            }
            RegexNode::Dot => Ok(vec![nfa.add_state(NfaState::Dot {
                next: accept.to_vec(),
            })]),
            RegexNode::Concat(left, right) => {
                let right_starts = right.create_states(nfa, accept)?;
                left.create_states(nfa, &right_starts)
            }
            RegexNode::Or(left, right) => {
                let mut starts = left.create_states(nfa, accept)?;
                starts.extend(right.create_states(nfa, accept)?);
                Ok(starts)
            }
            RegexNode::Question(child) => {
                let mut starts = child.create_states(nfa, accept)?;
                starts.extend_from_slice(accept);
                Ok(starts)
            }
            RegexNode::Plus(child) => {
                let loop_head = nfa.add_state(NfaState::Remapped(Vec::new()));
                let mut body_accept = accept.to_vec();
                body_accept.push(loop_head);
                let body = child.create_states(nfa, &body_accept)?;
                nfa.states[loop_head] = NfaState::Remapped(body.clone());
                Ok(body)
            }
            RegexNode::Star(child) => {
                let loop_head = nfa.add_state(NfaState::Remapped(Vec::new()));
                let mut body_accept = accept.to_vec();
                body_accept.push(loop_head);
                let mut starts = child.create_states(nfa, &body_accept)?;
                starts.extend_from_slice(accept);
                nfa.states[loop_head] = NfaState::Remapped(starts.clone());
                Ok(starts)
            }
            RegexNode::Range(lo, hi) => bail!(
                "internal: range {:?}-{:?} reached outside a character set",
                *lo as char,
                *hi as char
            ),
        }
    }
}
