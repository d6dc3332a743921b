// src/lib.rs
pub mod lexer;
