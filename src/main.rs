// src/main.rs
use lexgen::lexer::{
    cpu::{filter_kinds, lex_on_cpu},
    tables::build_tables_from_source,
};

const GRAMMAR: &str = include_str!("../grammar/tokens.lex");

fn main() {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();

    let tables = match build_tables_from_source(GRAMMAR) {
        Ok(t) => t,
        Err(e) => {
            eprintln!("table build failed: {e:#}");
            std::process::exit(1);
        }
    };

    // A tiny sample covering keywords, literals, comments, and operators.
    let src = r#"
        uniform half4 color; // tint
        half4 main(float2 p) {
            /* scale ** bias */
            float k = 1.5e2 + 0x1F;
            if (p.x >= k) { return color; }
            return half4(0);
        }
    "#;

    match lex_on_cpu(&tables, src) {
        Ok(tokens) => {
            let kept = filter_kinds(
                &tables,
                &tokens,
                &["WHITESPACE", "LINE_COMMENT", "BLOCK_COMMENT"],
            );
            println!("TOKENS:");
            for t in kept {
                println!("{:<14} {:?}", tables.token_name(t.kind), t.text(src));
            }
        }
        Err(e) => eprintln!("lex error: {e}"),
    }
}
