#![no_main]

use arbitrary::Arbitrary;
use libfuzzer_sys::fuzz_target;

use lockpost_lock_scanner::version::{compare, satisfies};

/// 퍼저용 구조적 입력
#[derive(Arbitrary, Debug)]
struct FuzzInput {
    version: String,
    other: String,
    range: String,
}

fuzz_target!(|input: FuzzInput| {
    let _ = satisfies(&input.version, &input.range);

    // 비교는 반대칭이어야 함
    let forward = compare(&input.version, &input.other);
    let backward = compare(&input.other, &input.version);
    assert_eq!(forward, backward.reverse());
});
