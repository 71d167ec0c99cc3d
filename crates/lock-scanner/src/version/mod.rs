//! 시맨틱 버전 비교 -- 파싱, 정렬, 최댓값
//!
//! `semver` 크레이트로 `MAJOR.MINOR.PATCH(-pre)(+build)` 문자열을 파싱합니다.
//! 빌드 메타데이터는 정렬에서 제외됩니다.
//!
//! # Lexical fallback
//!
//! 두 입력 중 하나라도 SemVer로 파싱되지 않으면 문자열 비교로 대체합니다.
//! 잘못된 버전 문자열 때문에 스캔이 중단되지 않고 결정적인 순서를 얻기 위한
//! 의도된 관용 규칙이며, 에러가 아닙니다.

pub mod range;

use std::cmp::Ordering;

pub use range::{Comparator, Op, satisfies};

/// 버전 문자열을 파싱합니다. 앞뒤 공백은 무시합니다.
///
/// 형식에 맞지 않으면 None을 반환합니다.
pub fn parse_version(input: &str) -> Option<semver::Version> {
    semver::Version::parse(input.trim()).ok()
}

/// 두 버전 문자열을 비교합니다.
///
/// - major, minor, patch를 숫자로 비교
/// - 같으면 prerelease가 없는 쪽이 큼
/// - prerelease 식별자는 원소별로 비교 (숫자 < 영숫자, 짧은 쪽이 작음)
/// - 어느 한쪽이라도 파싱 실패 시 문자열 비교 (lexical fallback)
pub fn compare(a: &str, b: &str) -> Ordering {
    match (parse_version(a), parse_version(b)) {
        (Some(va), Some(vb)) => compare_parsed(&va, &vb),
        _ => compare_lexical(a, b),
    }
}

/// 파싱된 두 버전을 precedence 순서로 비교합니다 (빌드 메타데이터 무시).
pub fn compare_parsed(a: &semver::Version, b: &semver::Version) -> Ordering {
    a.major
        .cmp(&b.major)
        .then(a.minor.cmp(&b.minor))
        .then(a.patch.cmp(&b.patch))
        .then_with(|| a.pre.cmp(&b.pre))
}

/// SemVer가 아닌 문자열에 쓰이는 대체 비교
pub fn compare_lexical(a: &str, b: &str) -> Ordering {
    a.cmp(b)
}

/// 가장 큰 버전을 반환합니다. 비어 있으면 None
pub fn max_version<'a, I>(versions: I) -> Option<&'a str>
where
    I: IntoIterator<Item = &'a str>,
{
    versions
        .into_iter()
        .reduce(|max, v| if compare(v, max) == Ordering::Greater { v } else { max })
}

/// 버전 목록을 오름차순으로 정렬합니다.
pub fn sort_versions(versions: &mut [String]) {
    versions.sort_by(|a, b| compare(a, b));
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn compare_orders_patch_versions() {
        assert_eq!(compare("1.2.3", "1.2.4"), Ordering::Less);
        assert_eq!(compare("1.2.4", "1.2.3"), Ordering::Greater);
        assert_eq!(compare("1.0.0", "1.0.0"), Ordering::Equal);
    }

    #[test]
    fn compare_is_numeric_not_lexical() {
        assert_eq!(compare("1.10.0", "1.9.0"), Ordering::Greater);
        assert_eq!(compare("10.0.0", "9.99.99"), Ordering::Greater);
    }

    #[test]
    fn release_is_greater_than_prerelease() {
        assert_eq!(compare("1.0.0-alpha", "1.0.0"), Ordering::Less);
        assert_eq!(compare("1.0.0", "1.0.0-rc.1"), Ordering::Greater);
    }

    #[test]
    fn prerelease_identifier_ordering() {
        // 1.0.0-alpha < alpha.1 < alpha.beta < beta < beta.2 < beta.11 < rc.1 < 1.0.0
        let ordered = [
            "1.0.0-alpha",
            "1.0.0-alpha.1",
            "1.0.0-alpha.beta",
            "1.0.0-beta",
            "1.0.0-beta.2",
            "1.0.0-beta.11",
            "1.0.0-rc.1",
            "1.0.0",
        ];
        for pair in ordered.windows(2) {
            assert_eq!(
                compare(pair[0], pair[1]),
                Ordering::Less,
                "{} should sort before {}",
                pair[0],
                pair[1]
            );
        }
    }

    #[test]
    fn numeric_identifier_sorts_before_alphanumeric() {
        assert_eq!(compare("1.0.0-1", "1.0.0-a"), Ordering::Less);
    }

    #[test]
    fn build_metadata_is_ignored() {
        assert_eq!(compare("1.0.0+build.1", "1.0.0+build.2"), Ordering::Equal);
        assert_eq!(compare("1.0.0+sha.abc", "1.0.0"), Ordering::Equal);
    }

    #[test]
    fn surrounding_whitespace_is_trimmed() {
        assert_eq!(compare(" 1.2.3 ", "1.2.3"), Ordering::Equal);
        assert!(parse_version("  4.4.2\t").is_some());
    }

    #[test]
    fn unparsable_falls_back_to_lexical() {
        assert_eq!(compare("abc", "abd"), Ordering::Less);
        assert_eq!(compare("workspace:*", "1.0.0"), "workspace:*".cmp("1.0.0"));
        // 한쪽만 유효해도 문자열 비교
        assert_eq!(compare("1.2", "1.10.0"), "1.2".cmp("1.10.0"));
    }

    #[test]
    fn max_version_picks_greatest() {
        let versions = ["1.2.3", "1.10.0", "1.9.9", "1.10.0-beta"];
        assert_eq!(max_version(versions), Some("1.10.0"));
    }

    #[test]
    fn max_version_empty_is_none() {
        assert_eq!(max_version(std::iter::empty::<&str>()), None);
    }

    #[test]
    fn sort_versions_ascending() {
        let mut versions = vec![
            "5.6.1".to_owned(),
            "5.6.0".to_owned(),
            "5.10.0".to_owned(),
            "5.6.1-rc.0".to_owned(),
        ];
        sort_versions(&mut versions);
        assert_eq!(versions, vec!["5.6.0", "5.6.1-rc.0", "5.6.1", "5.10.0"]);
    }
}
