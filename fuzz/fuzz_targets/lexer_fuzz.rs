//! Fuzz target for the BROOK lexer.
//!
//! Run with: cargo +nightly fuzz run lexer_fuzz -- -max_total_time=60

#![no_main]

use brook_lang::{Lexer, TokenKind};
use libfuzzer_sys::fuzz_target;

fuzz_target!(|data: &[u8]| {
    let Ok(input) = std::str::from_utf8(data) else {
        return;
    };

    match Lexer::new(input).tokenize() {
        Ok(tokens) => {
            assert_eq!(
                tokens.last().map(|t| &t.kind),
                Some(&TokenKind::Eof),
                "token stream must end with Eof"
            );
            for token in &tokens {
                assert!(token.span.start <= token.span.end);
                assert!(token.span.end <= input.len());
                assert!(token.span.line >= 1 && token.span.column >= 1);
            }
        }
        Err(err) => {
            assert!(err.span.line >= 1 && err.span.column >= 1);
            assert!(!err.message.is_empty());
        }
    }
});
