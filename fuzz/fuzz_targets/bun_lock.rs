#![no_main]

use libfuzzer_sys::fuzz_target;
use lockpost_lock_scanner::parser::LockfileParser;
use lockpost_lock_scanner::parser::bun::BunLockParser;

fuzz_target!(|data: &[u8]| {
    let parser = BunLockParser;
    let _ = parser.parse(data, "fuzz/bun.lock");
});
