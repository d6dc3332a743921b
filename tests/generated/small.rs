// @generated by gen_lex_tables from small.lex. Do not edit by hand.

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[repr(u16)]
pub enum TokenKind {
    EndOfFile = 0,
    If = 1,
    Ident = 2,
    Number = 3,
    Ws = 4,
}

impl TokenKind {
    pub const fn from_id(id: u16) -> Option<Self> {
        Some(match id {
            0 => TokenKind::EndOfFile,
            1 => TokenKind::If,
            2 => TokenKind::Ident,
            3 => TokenKind::Number,
            4 => TokenKind::Ws,
            _ => return None,
        })
    }
}

pub type State = u8;

pub const START_CHAR: u8 = 9;
pub const END_CHAR: u8 = 126;
pub const INITIAL_STATE: State = 1;
pub const NO_TOKEN: u16 = u16::MAX;
pub const NUM_STATES: usize = 7;
const NUM_TRANSITIONS: usize = 6;

struct FullEntry {
    data: [State; NUM_TRANSITIONS],
}

struct CompactEntry {
    values: u32,
    data: [u8; 2],
}

static MAPPINGS: [u8; 118] = [
    0, 0, 1, 1, 0, 1, 1, 1, 1, 1, 1, 1, 1, 1, 1, 1,
    1, 1, 1, 1, 1, 1, 1, 0, 1, 1, 1, 1, 1, 1, 1, 1,
    1, 1, 1, 1, 1, 1, 1, 2, 2, 2, 2, 2, 2, 2, 2, 2,
    2, 1, 1, 1, 1, 1, 1, 1, 1, 1, 1, 1, 1, 1, 1, 1,
    1, 1, 1, 1, 1, 1, 1, 1, 1, 1, 1, 1, 1, 1, 1, 1,
    1, 1, 1, 1, 1, 1, 3, 1, 3, 3, 3, 3, 3, 4, 3, 3,
    5, 3, 3, 3, 3, 3, 3, 3, 3, 3, 3, 3, 3, 3, 3, 3,
    3, 3, 1, 1, 1, 1,
];

static FULL: [FullEntry; 1] = [
    FullEntry {
        data: [
            2, 0, 3, 4, 4, 5,
        ],
    },
];

static COMPACT: [CompactEntry; 4] = [
    CompactEntry {
        values: 0x2,
        data: [
            1, 0,
        ],
    },
    CompactEntry {
        values: 0x3,
        data: [
            16, 0,
        ],
    },
    CompactEntry {
        values: 0x4,
        data: [
            64, 5,
        ],
    },
    CompactEntry {
        values: 0x34,
        data: [
            64, 6,
        ],
    },
];

// low 2 bits: 0 = all reject, 1 = FULL, 2 = COMPACT; high 14 bits: position
static INDICES: [u16; 7] = [
    0, 1, 2, 6, 10, 14, 10,
];

pub static ACCEPTS: [u16; 7] = [
    NO_TOKEN, NO_TOKEN, 4, 3, 2, 2, 1,
];

pub fn get_transition(transition: usize, state: usize) -> State {
    let index = INDICES[state];
    let pos = (index >> 2) as usize;
    match index & 3 {
        1 => FULL[pos].data[transition],
        2 => {
            let entry = &COMPACT[pos];
            let code = (entry.data[transition / 4] >> ((transition % 4) * 2)) & 3;
            match code {
                1 => ((entry.values >> 0) & 0x7) as State,
                2 => ((entry.values >> 3) & 0x7) as State,
                _ => 0,
            }
        }
        _ => 0,
    }
}

#[inline]
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
