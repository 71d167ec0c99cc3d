#![no_main]

use libfuzzer_sys::fuzz_target;
use lockpost_lock_scanner::parser::jsonc;

fuzz_target!(|data: &[u8]| {
    if let Ok(text) = std::str::from_utf8(data) {
        let _ = jsonc::parse(text);
    }
});
