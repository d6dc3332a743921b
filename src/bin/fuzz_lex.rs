// src/bin/fuzz_lex.rs
// Random pattern sets and random inputs. For every input the compacted
// tables, the uncompacted DFA, and a direct NFA simulation must agree on the
// accepted token. The bundled grammar is checked first on inputs drawn from
// the whole character range.
//
//   FUZZ_SEED=n         rng seed (default 42)
//   FUZZ_ITERS=n        pattern sets to try (default 200)
//   FUZZ_PATTERNS=n     max patterns per set (default 6)
//   FUZZ_LEN=n          max input length (default 12)
//   FUZZ_SAVE=1         write failing cases to FUZZ_DIR (default "fuzz-cases")
//   FUZZ_INPUT=path     replay a saved case

use std::{
    fs,
    path::{Path, PathBuf},
    time::{Instant, SystemTime, UNIX_EPOCH},
};

use anyhow::{Context, Result};
use lexgen::lexer::tables::{
    LexerTables, TokenDef, TokenId, build_dfa, build_tables, load_tables_bin_bytes,
    parse_lex_file, save_tables_bin,
};
use rand::{Rng, SeedableRng, rngs::StdRng};
use serde::{Deserialize, Serialize};

const ALPHABET: &[u8] = b"abc \n";
const INPUTS_PER_SET: usize = 256;
const GRAMMAR: &str = include_str!("../../grammar/tokens.lex");

fn env_or<T: std::str::FromStr>(key: &str, default: T) -> T {
    std::env::var(key)
        .ok()
        .and_then(|s| s.parse().ok())
        .unwrap_or(default)
}

// ---------- generator ----------

fn gen_atom<R: Rng>(rng: &mut R) -> String {
    const ATOMS: &[&str] = &["a", "b", "c", ".", "[ab]", "[^a]", "[a-c]", "\\s", "[\\sb]"];
    ATOMS[rng.random_range(0..ATOMS.len())].to_string()
}

fn gen_pattern<R: Rng>(rng: &mut R, depth: u32) -> String {
    if depth == 0 || rng.random_bool(0.3) {
        return gen_atom(rng);
    }
    match rng.random_range(0u32..6) {
        0 => format!(
            "{}{}",
            gen_pattern(rng, depth - 1),
            gen_pattern(rng, depth - 1)
        ),
        1 => format!(
            "({}|{})",
            gen_pattern(rng, depth - 1),
            gen_pattern(rng, depth - 1)
        ),
        2 => format!("({})*", gen_pattern(rng, depth - 1)),
        3 => format!("({})+", gen_pattern(rng, depth - 1)),
        4 => format!("({})?", gen_pattern(rng, depth - 1)),
        _ => gen_atom(rng),
    }
}

// Mostly printable text, with the occasional byte outside [9, 126].
fn gen_wide_input<R: Rng>(rng: &mut R, max_len: usize) -> Vec<u8> {
    let len = rng.random_range(0..=max_len);
    (0..len)
        .map(|_| {
            if rng.random_bool(0.02) {
                rng.random_range(0u8..=255)
            } else {
                rng.random_range(9u8..=126)
            }
        })
        .collect()
}

fn gen_input<R: Rng>(rng: &mut R, max_len: usize) -> Vec<u8> {
    let len = rng.random_range(0..=max_len);
    (0..len)
        .map(|_| ALPHABET[rng.random_range(0..ALPHABET.len())])
        .collect()
}

// ---------- cases ----------

#[derive(Debug, Clone, Serialize, Deserialize)]
struct Case {
    unix_ts: u64,
    seed: Option<u64>,
    iter: Option<usize>,
    patterns: Vec<String>,
    inputs: Vec<String>,
    note: String,
}

/// Checks `defs` on `inputs`; returns the first mismatch.
fn check_defs(defs: &[TokenDef], inputs: &[Vec<u8>]) -> Result<(LexerTables, Option<Mismatch>)> {
    let (nfa, dfa) = build_dfa(defs)?;
    let tables = build_tables(defs)?;

    for input in inputs {
        let want = nfa.matches(input);
        let from_dfa = dfa.run(input);
        let from_tables = tables.run(input);
        if from_dfa != want || from_tables != want {
            let bad = Mismatch {
                input: input.clone(),
                nfa: want,
                dfa: from_dfa,
                tables: from_tables,
            };
            return Ok((tables, Some(bad)));
        }
    }
    Ok((tables, None))
}

fn defs_for(patterns: &[String]) -> Vec<TokenDef> {
    patterns
        .iter()
        .enumerate()
        .map(|(i, p)| TokenDef::new(format!("T{}", i + 1), p.clone()))
        .collect()
}

#[derive(Debug)]
struct Mismatch {
    input: Vec<u8>,
    nfa: Option<TokenId>,
    dfa: Option<TokenId>,
    tables: Option<TokenId>,
}

/// Runs every input against the three automata; returns the tables and the
/// first mismatch.
fn check_set(patterns: &[String], inputs: &[Vec<u8>]) -> Result<(LexerTables, Option<Mismatch>)> {
    check_defs(&defs_for(patterns), inputs)
}

/// `iter` is `None` for the bundled grammar.
fn save_case(
    dir: &str,
    seed: u64,
    iter: Option<usize>,
    patterns: &[String],
    bad: &Mismatch,
) -> Result<PathBuf> {
    let ts = SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .unwrap_or_default()
        .as_secs();
    let case = Case {
        unix_ts: ts,
        seed: Some(seed),
        iter,
        patterns: patterns.to_vec(),
        inputs: vec![String::from_utf8_lossy(&bad.input).into_owned()],
        note: "Replay with: FUZZ_INPUT=<this file> cargo run --bin fuzz_lex".into(),
    };
    let name = match iter {
        Some(i) => format!("case_s{seed}_i{i}.json"),
        None => format!("case_s{seed}_grammar.json"),
    };
    let path = Path::new(dir).join(name);
    fs::write(&path, serde_json::to_string_pretty(&case)?)
        .with_context(|| format!("writing {}", path.display()))?;
    Ok(path)
}

fn report(patterns: &[String], bad: &Mismatch) {
    eprintln!("[fuzz] MISMATCH on input {:?}", String::from_utf8_lossy(&bad.input));
    for (i, p) in patterns.iter().enumerate() {
        eprintln!("  T{} = {p}", i + 1);
    }
    eprintln!(
        "  nfa={:?} dfa={:?} tables={:?}",
        bad.nfa, bad.dfa, bad.tables
    );
}

// ---------- main ----------

fn replay(path: &str) -> Result<bool> {
    eprintln!("[replay] reading {path}");
    let s = fs::read_to_string(path).with_context(|| format!("reading {path}"))?;
    let case: Case = serde_json::from_str(&s).with_context(|| format!("parsing {path}"))?;
    let inputs: Vec<Vec<u8>> = case.inputs.iter().map(|i| i.as_bytes().to_vec()).collect();
    match check_set(&case.patterns, &inputs)?.1 {
        Some(bad) => {
            report(&case.patterns, &bad);
            Ok(false)
        }
        None => {
            eprintln!("[replay] {} input(s) agree", inputs.len());
            Ok(true)
        }
    }
}

fn main() -> Result<()> {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("warn")).init();

    if let Ok(path) = std::env::var("FUZZ_INPUT") {
        if !replay(&path)? {
            std::process::exit(1);
        }
        return Ok(());
    }

    let seed: u64 = env_or("FUZZ_SEED", 42);
    let iters: usize = env_or("FUZZ_ITERS", 200);
    let max_patterns: usize = env_or("FUZZ_PATTERNS", 6).max(1);
    let max_len: usize = env_or("FUZZ_LEN", 12);
    let save_cases = std::env::var("FUZZ_SAVE").ok().as_deref() == Some("1");
    let out_dir = std::env::var("FUZZ_DIR").unwrap_or_else(|_| "fuzz-cases".to_string());

    eprintln!("[fuzz] seed={seed} iters={iters} patterns<={max_patterns} len<={max_len}");
    let mut rng = StdRng::seed_from_u64(seed);
    if save_cases {
        fs::create_dir_all(&out_dir).with_context(|| format!("creating {out_dir}"))?;
    }

    let grammar = parse_lex_file(GRAMMAR).context("parsing the bundled grammar")?;
    let wide: Vec<Vec<u8>> = (0..INPUTS_PER_SET * 4)
        .map(|_| gen_wide_input(&mut rng, max_len))
        .collect();
    if let (_, Some(bad)) = check_defs(&grammar, &wide)? {
        let patterns: Vec<String> = grammar.iter().map(|d| d.pattern.clone()).collect();
        eprintln!("[fuzz] bundled grammar");
        report(&patterns, &bad);
        if save_cases {
            let path = save_case(&out_dir, seed, None, &patterns, &bad)?;
            eprintln!("[save] wrote {}", path.display());
        }
        std::process::exit(1);
    }
    eprintln!("[fuzz] bundled grammar: {} inputs agree", wide.len());

    let bin = std::env::temp_dir().join(format!("fuzz_lex_{}.bin", std::process::id()));
    let t0 = Instant::now();
    let mut checked = 0usize;
    for i in 0..iters {
        let n = rng.random_range(1..=max_patterns);
        let patterns: Vec<String> = (0..n).map(|_| gen_pattern(&mut rng, 4)).collect();
        let inputs: Vec<Vec<u8>> = (0..INPUTS_PER_SET)
            .map(|_| gen_input(&mut rng, max_len))
            .collect();

        let (tables, mismatch) = check_set(&patterns, &inputs)
            .with_context(|| format!("iter {i}: building {patterns:?}"))?;
        if let Some(bad) = mismatch {
            eprintln!("[fuzz] iter {i}");
            report(&patterns, &bad);
            if save_cases {
                let path = save_case(&out_dir, seed, Some(i), &patterns, &bad)?;
                eprintln!("[save] wrote {}", path.display());
            }
            std::process::exit(1);
        }

        // The binary format must carry the tables through unchanged.
        save_tables_bin(&bin, &tables)?;
        let back = load_tables_bin_bytes(&fs::read(&bin)?)
            .map_err(|e| anyhow::anyhow!("iter {i}: reloading tables: {e}"))?;
        if back != tables {
            eprintln!("[fuzz] iter {i}: binary round trip changed the tables for {patterns:?}");
            std::process::exit(1);
        }
        checked += inputs.len();
    }
    let _ = fs::remove_file(&bin);

    eprintln!(
        "[fuzz] {iters} pattern sets, {checked} inputs agreed in {} ms ✅",
        t0.elapsed().as_millis()
    );
    Ok(())
}
