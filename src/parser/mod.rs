//! Parser for HTML-like template markup

pub mod ast;
mod grammar;
pub mod lexer;

pub use ast::*;
pub use grammar::{parse, parse_with_depth, DEFAULT_MAX_DEPTH};
