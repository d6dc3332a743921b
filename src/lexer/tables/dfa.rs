// src/lexer/tables/dfa.rs
use hashbrown::HashMap;

use super::{
    END_CHAR, NUM_CHARS, START_CHAR,
    nfa::{Nfa, StateIdx},
    tokens::TokenId,
};

/// Dead state: every transition out of it stays put, nothing accepts.
pub const REJECT_STATE: usize = 0;
/// State for the label holding every NFA start state.
pub const INITIAL_STATE: usize = 1;

/// Sorted, deduplicated set of live NFA states. Equal labels are the same
/// DFA state.
#[derive(Debug, Clone, Default, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct Label(Vec<StateIdx>);

impl Label {
    pub fn new(mut states: Vec<StateIdx>) -> Self {
        states.sort_unstable();
        states.dedup();
        Self(states)
    }

    pub fn states(&self) -> &[StateIdx] {
        &self.0
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }
}

#[derive(Debug, Clone)]
pub struct DfaState {
    pub id: usize,
    pub label: Label,
    pub scanned: bool,
}

/// Determinized automaton.
///
/// Character codes in `[START_CHAR, END_CHAR]` that behave identically share
/// one row of `transitions`; `char_mappings[c - START_CHAR]` names the row.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Dfa {
    pub char_mappings: Vec<usize>,
    /// `transitions[row][state] -> state`
    pub transitions: Vec<Vec<usize>>,
    /// Lowest token id accepted in each state.
    pub accepts: Vec<Option<TokenId>>,
}

impl Dfa {
    pub fn state_count(&self) -> usize {
        self.accepts.len()
    }

    pub fn num_transitions(&self) -> usize {
        self.transitions.len()
    }

    /// Row for byte `c`, or `None` outside the supported range.
    #[inline]
    pub fn row_of(&self, c: u8) -> Option<usize> {
        if (START_CHAR..=END_CHAR).contains(&c) {
            Some(self.char_mappings[(c - START_CHAR) as usize])
        } else {
            None
        }
    }

    #[inline]
    pub fn next_state(&self, c: u8, state: usize) -> usize {
        match self.row_of(c) {
            Some(row) => self.transitions[row][state],
            None => REJECT_STATE,
        }
    }

    /// Whole-input match starting from `INITIAL_STATE`.
    pub fn run(&self, input: &[u8]) -> Option<TokenId> {
        let mut state = INITIAL_STATE;
        for &c in input {
            state = self.next_state(c, state);
            if state == REJECT_STATE {
                return None;
            }
        }
        self.accepts[state]
    }
}

// One suspended scan: the state being explored and the next character to try.
struct ScanFrame {
    state: usize,
    next_char: u8,
}

pub struct NfaToDfa<'a> {
    nfa: &'a Nfa,
    states: Vec<DfaState>,
    by_label: HashMap<Label, usize>,
    /// `transitions[c - START_CHAR][state]`, before row deduplication.
    transitions: Vec<Vec<usize>>,
    accepts: Vec<Option<TokenId>>,
}

impl<'a> NfaToDfa<'a> {
    pub fn new(nfa: &'a Nfa) -> Self {
        Self {
            nfa,
            states: Vec::new(),
            by_label: HashMap::new(),
            transitions: vec![Vec::new(); NUM_CHARS],
            accepts: Vec::new(),
        }
    }

    /// Subset construction. State ids follow depth-first discovery order, so
    /// the same NFA always yields the same DFA.
    pub fn convert(mut self) -> Dfa {
        let reject = self.get_state(Label::default());
        debug_assert_eq!(reject, REJECT_STATE);
        self.states[reject].scanned = true;

        // With no patterns the start label is empty; it still gets its own id.
        let start = Label::new(self.nfa.initial_states());
        let initial = if start.is_empty() {
            self.push_state(start)
        } else {
            self.get_state(start)
        };
        debug_assert_eq!(initial, INITIAL_STATE);
        self.scan_from(initial);

        let (char_mappings, transitions) = dedup_rows(self.transitions);
        Dfa {
            char_mappings,
            transitions,
            accepts: self.accepts,
        }
    }

    /// Interns `label`, creating a new DFA state if it has not been seen.
    fn get_state(&mut self, label: Label) -> usize {
        if let Some(&id) = self.by_label.get(&label) {
            return id;
        }
        let id = self.push_state(label.clone());
        self.by_label.insert(label, id);
        id
    }

    fn push_state(&mut self, label: Label) -> usize {
        let id = self.states.len();
        self.accepts.push(self.nfa.best_accept(label.states()));
        for row in &mut self.transitions {
            row.push(REJECT_STATE);
        }
        self.states.push(DfaState {
            id,
            label,
            scanned: false,
        });
        id
    }

    fn step(&mut self, from: usize, c: u8) -> usize {
        let nfa = self.nfa;
        let mut next = Vec::new();
        for &idx in self.states[from].label.states() {
            let state = &nfa.states()[idx];
            if state.accepts(c) {
                nfa.resolve_into(state.next(), &mut next);
            }
        }
        self.get_state(Label::new(next))
    }

    // Depth-first: a newly discovered state is explored completely before
    // its parent moves on to the next character.
    fn scan_from(&mut self, root: usize) {
        self.states[root].scanned = true;
        let mut stack = vec![ScanFrame {
            state: root,
            next_char: START_CHAR,
        }];

        loop {
            let (from, c) = match stack.last_mut() {
                None => break,
                Some(frame) if frame.next_char > END_CHAR => {
                    stack.pop();
                    continue;
                }
                Some(frame) => {
                    let c = frame.next_char;
                    frame.next_char += 1;
                    (frame.state, c)
                }
            };

            let to = self.step(from, c);
            self.transitions[(c - START_CHAR) as usize][from] = to;

            if !self.states[to].scanned {
                self.states[to].scanned = true;
                stack.push(ScanFrame {
                    state: to,
                    next_char: START_CHAR,
                });
            }
        }
    }
}

/// Collapses character codes with identical transition rows.
/// Returns (char -> row index, unique rows in first-seen order).
fn dedup_rows(per_char: Vec<Vec<usize>>) -> (Vec<usize>, Vec<Vec<usize>>) {
    let mut rows: Vec<Vec<usize>> = Vec::new();
    let mut index: HashMap<Vec<usize>, usize> = HashMap::new();
    let mut mappings = Vec::with_capacity(per_char.len());
    for row in per_char {
        let id = *index.entry(row).or_insert_with_key(|row| {
            rows.push(row.clone());
            rows.len() - 1
        });
        mappings.push(id);
    }
    (mappings, rows)
}

/// Builds the DFA for `nfa`.
pub fn convert(nfa: &Nfa) -> Dfa {
    NfaToDfa::new(nfa).convert()
}
