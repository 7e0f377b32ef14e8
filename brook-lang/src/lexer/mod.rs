//! Lexer module for BROOK source text

pub mod scanner;
pub mod token;

pub use scanner::*;
pub use token::*;
