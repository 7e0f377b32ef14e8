//! Formatting is idempotent: formatted output formats to itself.
//!
//! Run with: cargo +nightly fuzz run format_fuzz -- -max_total_time=60

#![no_main]

use brook_lang::format;
use libfuzzer_sys::fuzz_target;

fuzz_target!(|data: &[u8]| {
    let Ok(input) = std::str::from_utf8(data) else {
        return;
    };

    if let Ok(once) = format(input) {
        match format(&once) {
            Ok(twice) => assert_eq!(once, twice),
            Err(e) => panic!("formatted output does not parse: {}\n{}", e, once),
        }
    }
});
