//! Fuzz target for the BROOK parser.
//!
//! Run with: cargo +nightly fuzz run parser_fuzz -- -max_total_time=60

#![no_main]

use brook_lang::{parse, Error};
use libfuzzer_sys::fuzz_target;

fuzz_target!(|data: &[u8]| {
    let Ok(input) = std::str::from_utf8(data) else {
        return;
    };

    match parse(input) {
        Ok(file) => {
            for stmt in &file.body {
                assert!(!stmt.name().is_empty());
            }
        }
        Err(Error::Parse(err)) => {
            assert!(err.span.line >= 1 && err.span.column >= 1);
        }
        Err(_) => {}
    }
});
