#![no_main]

use libfuzzer_sys::fuzz_target;
use lockpost_lock_scanner::parser::LockfileParser;
use lockpost_lock_scanner::parser::yarn::YarnLockParser;

fuzz_target!(|data: &[u8]| {
    let parser = YarnLockParser;
    let _ = parser.parse(data, "fuzz/yarn.lock");
});
