// src/lexer/tables/build.rs
use std::time::Instant;

use anyhow::{Context, Result, bail};

use super::{
    INVALID_TOKEN, LexerTables, NUM_CHARS,
    compact::TransitionTable,
    dfa::{self, Dfa},
    nfa::Nfa,
    regex::RegexParser,
    tokens::{TokenDef, parse_lex_file, token_names},
};

/// Registers every definition in order; token ids are `1 + index`.
pub fn build_nfa(defs: &[TokenDef]) -> Result<Nfa> {
    let mut nfa = Nfa::new();
    for def in defs {
        let tree = RegexParser::parse(&def.pattern)
            .with_context(|| format!("token {} = {}", def.name, def.pattern))?;
        nfa.add_regex(&tree)
            .with_context(|| format!("token {}", def.name))?;
    }
    Ok(nfa)
}

pub fn build_dfa(defs: &[TokenDef]) -> Result<(Nfa, Dfa)> {
    let nfa = build_nfa(defs)?;
    let dfa = dfa::convert(&nfa);
    Ok((nfa, dfa))
}

pub fn build_tables(defs: &[TokenDef]) -> Result<LexerTables> {
    if defs.is_empty() {
        bail!("no token definitions");
    }

    let t0 = Instant::now();
    let nfa = build_nfa(defs)?;
    log::debug!(
        "[tables] nfa: {} patterns, {} states",
        nfa.regex_count(),
        nfa.states().len()
    );

    let t1 = Instant::now();
    let dfa = dfa::convert(&nfa);
    log::info!(
        "[tables] dfa: {} states, {} unique transition rows (took {} ms)",
        dfa.state_count(),
        dfa.num_transitions(),
        t1.elapsed().as_millis()
    );

    let t2 = Instant::now();
    let table = TransitionTable::encode(&dfa)?;
    table.verify(&dfa)?;
    log::info!(
        "[tables] compacted: full={} compact={} ~{} bytes (took {} ms)",
        table.full.len(),
        table.compact.len(),
        table.size_in_bytes(),
        t2.elapsed().as_millis()
    );

    let mut char_mappings = [0u16; NUM_CHARS];
    for (slot, &row) in char_mappings.iter_mut().zip(&dfa.char_mappings) {
        *slot = u16::try_from(row).context("internal: transition row index exceeds u16")?;
    }

    let accepts = dfa
        .accepts
        .iter()
        .map(|a| a.unwrap_or(INVALID_TOKEN))
        .collect();

    log::info!("[tables] total {} ms", t0.elapsed().as_millis());
    Ok(LexerTables {
        token_names: token_names(defs),
        char_mappings,
        accepts,
        table,
    })
}

/// Parses a `.lex` source and builds its tables.
pub fn build_tables_from_source(src: &str) -> Result<LexerTables> {
    let defs = parse_lex_file(src)?;
    build_tables(&defs)
}
