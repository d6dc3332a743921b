// src/bin/gen_lex_tables.rs
// Builds lexer tables from a .lex file and writes them out as Rust source.
//
// Usage: gen_lex_tables [INPUT.lex] [OUTPUT.rs]
//   LEXGEN_SAVE_JSON=path   also write the tables as JSON
//   LEXGEN_SAVE_BIN=path    also write the tables in the compact binary format

use std::{fs, path::Path, time::Instant};

use anyhow::{Context, Result};
use lexgen::lexer::tables::{
    build_tables, codegen::generate_rust, parse_lex_file, save_tables_bin, save_tables_json,
};

const DEFAULT_INPUT: &str = "grammar/tokens.lex";
const DEFAULT_OUTPUT: &str = "tables/lexer_tables.rs";

// Writes beside the target, then renames over it.
fn write_atomic(path: &Path, bytes: &[u8]) -> Result<()> {
    if let Some(dir) = path.parent() {
        fs::create_dir_all(dir).with_context(|| format!("creating {}", dir.display()))?;
    }
    let tmp = path.with_extension("rs.tmp");
    fs::write(&tmp, bytes).with_context(|| format!("writing {}", tmp.display()))?;
    fs::rename(&tmp, path).with_context(|| format!("renaming into {}", path.display()))
}

fn main() -> Result<()> {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();

    let mut args = std::env::args().skip(1);
    let input = args.next().unwrap_or_else(|| DEFAULT_INPUT.to_string());
    let output = args.next().unwrap_or_else(|| DEFAULT_OUTPUT.to_string());

    println!("[gen_lex_tables] reading {input}");
    let t0 = Instant::now();
    let src = fs::read_to_string(&input).with_context(|| format!("reading {input}"))?;
    let defs = parse_lex_file(&src).with_context(|| format!("parsing {input}"))?;
    let tables = build_tables(&defs).with_context(|| format!("building tables for {input}"))?;

    let source_name = Path::new(&input)
        .file_name()
        .map(|n| n.to_string_lossy().into_owned())
        .unwrap_or_else(|| input.clone());
    let rust = generate_rust(&tables, &source_name)?;

    // Nothing is written unless every step above succeeded.
    let out_path = Path::new(&output);
    write_atomic(out_path, rust.as_bytes())?;
    println!(
        "[gen_lex_tables] {} tokens, {} states, {} columns; full={} compact={} (~{:.1} KiB) → {} in {} ms",
        defs.len(),
        tables.state_count(),
        tables.table.num_transitions,
        tables.table.full.len(),
        tables.table.compact.len(),
        tables.table.size_in_bytes() as f64 / 1024.0,
        out_path.display(),
        t0.elapsed().as_millis()
    );

    if let Ok(p) = std::env::var("LEXGEN_SAVE_JSON") {
        let p = Path::new(&p);
        if let Some(dir) = p.parent() {
            fs::create_dir_all(dir)?;
        }
        save_tables_json(p, &tables).with_context(|| format!("writing {}", p.display()))?;
        println!("[gen_lex_tables] json → {}", p.display());
    }
    if let Ok(p) = std::env::var("LEXGEN_SAVE_BIN") {
        let p = Path::new(&p);
        if let Some(dir) = p.parent() {
            fs::create_dir_all(dir)?;
        }
        save_tables_bin(p, &tables).with_context(|| format!("writing {}", p.display()))?;
        println!("[gen_lex_tables] bin → {}", p.display());
    }
    Ok(())
}
