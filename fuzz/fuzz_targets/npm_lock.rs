#![no_main]

use libfuzzer_sys::fuzz_target;
use lockpost_lock_scanner::parser::LockfileParser;
use lockpost_lock_scanner::parser::npm::NpmLockParser;

fuzz_target!(|data: &[u8]| {
    let parser = NpmLockParser;
    let _ = parser.parse(data, "fuzz/package-lock.json");
});
