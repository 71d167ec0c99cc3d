//! 버전 범위 매칭 -- npm 스타일 range 표현식
//!
//! 표현식은 `group ('||' group)*` 형태입니다. 그룹은 공백으로 구분된
//! 토큰들의 AND이며, 어느 한 그룹이라도 만족하면 전체가 만족됩니다.
//!
//! # 토큰 형식
//!
//! - `^X.Y.Z`: caret. `>=X.Y.Z`, 상한은 다음 breaking 경계 (major>0이면 major+1,
//!   아니면 minor>0이면 minor+1, 아니면 patch+1). `^1.2`처럼 일부만 쓴 버전은 0으로 채움
//! - `~X.Y.Z`: tilde. `>=X.Y.Z`, 상한은 다음 minor
//! - `<`, `<=`, `>`, `>=`, `=` 접두사 + 정확한 버전 (접두사 없으면 `=`)
//!
//! # 해석할 수 없는 토큰
//!
//! `*`, `1.x`, `latest` 같은 토큰은 건너뜁니다. 해당 그룹에서는 항상 참으로
//! 취급되므로 매칭 범위가 넓어집니다.

use std::cmp::Ordering;

use tracing::trace;

use super::{compare, parse_version};

/// 비교 연산자
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Op {
    /// `<`
    Lt,
    /// `<=`
    Le,
    /// `>`
    Gt,
    /// `>=`
    Ge,
    /// `=` (또는 접두사 없음)
    Eq,
}

/// 연산자와 기준 버전 한 쌍
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Comparator {
    /// 비교 연산자
    pub op: Op,
    /// 기준 버전
    pub version: String,
}

impl Comparator {
    /// 새 비교자를 생성합니다.
    pub fn new(op: Op, version: impl Into<String>) -> Self {
        Self {
            op,
            version: version.into(),
        }
    }

    /// 버전이 이 비교자를 만족하는지 확인합니다.
    pub fn matches(&self, version: &str) -> bool {
        let ord = compare(version, &self.version);
        match self.op {
            Op::Lt => ord == Ordering::Less,
            Op::Le => ord != Ordering::Greater,
            Op::Gt => ord == Ordering::Greater,
            Op::Ge => ord != Ordering::Less,
            Op::Eq => ord == Ordering::Equal,
        }
    }
}

/// 버전이 범위 표현식을 만족하는지 확인합니다.
///
/// 그룹이 하나도 없는 표현식(빈 문자열, `||`)은 모든 버전을 허용합니다.
pub fn satisfies(version: &str, range: &str) -> bool {
    let groups: Vec<&str> = range
        .split("||")
        .map(str::trim)
        .filter(|g| !g.is_empty())
        .collect();

    if groups.is_empty() {
        return true;
    }

    groups.iter().any(|group| group_satisfied(version, group))
}

fn group_satisfied(version: &str, group: &str) -> bool {
    group.split_whitespace().all(|token| match parse_token(token) {
        Some(comparators) => comparators.iter().all(|c| c.matches(version)),
        None => {
            trace!(token, "skipping unparsable range token");
            true
        }
    })
}

/// 토큰 하나를 비교자 목록으로 변환합니다.
///
/// 해석할 수 없는 토큰이면 None을 반환합니다.
pub fn parse_token(token: &str) -> Option<Vec<Comparator>> {
    let token = token.trim();
    if token.is_empty() {
        return None;
    }

    if let Some(base) = token.strip_prefix('^') {
        let base = coerce_partial(base)?;
        let upper = if base.major > 0 {
            semver::Version::new(base.major.checked_add(1)?, 0, 0)
        } else if base.minor > 0 {
            semver::Version::new(0, base.minor.checked_add(1)?, 0)
        } else {
            semver::Version::new(0, 0, base.patch.checked_add(1)?)
        };
        return Some(bounded(&base, &upper));
    }

    if let Some(base) = token.strip_prefix('~') {
        let base = coerce_partial(base)?;
        let upper = semver::Version::new(base.major, base.minor.checked_add(1)?, 0);
        return Some(bounded(&base, &upper));
    }

    let (op, rest) = split_operator(token);
    let version = leading_version(rest)?;
    Some(vec![Comparator::new(op, version)])
}

/// `[base, upper)` 구간. 하한에서 prerelease는 제거됩니다.
fn bounded(base: &semver::Version, upper: &semver::Version) -> Vec<Comparator> {
    let lower = semver::Version::new(base.major, base.minor, base.patch);
    vec![
        Comparator::new(Op::Ge, lower.to_string()),
        Comparator::new(Op::Lt, upper.to_string()),
    ]
}

/// `1` -> `1.0.0`, `1.2` -> `1.2.0` 으로 채운 뒤 파싱합니다.
fn coerce_partial(input: &str) -> Option<semver::Version> {
    let mut parts: Vec<&str> = input.split('.').take(3).collect();
    while parts.len() < 3 {
        parts.push("0");
    }
    parse_version(&parts.join("."))
}

fn split_operator(token: &str) -> (Op, &str) {
    const OPERATORS: [(&str, Op); 5] = [
        ("<=", Op::Le),
        (">=", Op::Ge),
        ("<", Op::Lt),
        (">", Op::Gt),
        ("=", Op::Eq),
    ];

    for (prefix, op) in OPERATORS {
        if let Some(rest) = token.strip_prefix(prefix) {
            return (op, rest.trim_start());
        }
    }
    (Op::Eq, token)
}

/// 문자열 앞부분의 `N.N.N(-pre)?` 를 잘라냅니다.
fn leading_version(s: &str) -> Option<&str> {
    let bytes = s.as_bytes();
    let mut idx = 0;

    for part in 0..3 {
        let start = idx;
        while idx < bytes.len() && bytes[idx].is_ascii_digit() {
            idx += 1;
        }
        if idx == start {
            return None;
        }
        if part < 2 {
            if bytes.get(idx) != Some(&b'.') {
                return None;
            }
            idx += 1;
        }
    }

    if bytes.get(idx) == Some(&b'-') {
        let pre_start = idx + 1;
        let mut end = pre_start;
        while end < bytes.len()
            && (bytes[end].is_ascii_alphanumeric() || bytes[end] == b'.' || bytes[end] == b'-')
        {
            end += 1;
        }
        if end > pre_start {
            idx = end;
        }
    }

    Some(&s[..idx])
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn bare_version_is_exact_match() {
        assert!(satisfies("6.2.2", "6.2.2"));
        assert!(!satisfies("6.2.1", "6.2.2"));
        assert!(!satisfies("6.2.3", "6.2.2"));
    }

    #[test]
    fn caret_with_nonzero_major() {
        assert!(satisfies("1.2.0", "^1.2.0"));
        assert!(satisfies("1.2.5", "^1.2.0"));
        assert!(satisfies("1.99.0", "^1.2.0"));
        assert!(!satisfies("2.0.0", "^1.2.0"));
        assert!(!satisfies("1.1.9", "^1.2.0"));
    }

    #[test]
    fn caret_with_zero_major() {
        assert!(satisfies("0.2.9", "^0.2.3"));
        assert!(!satisfies("0.3.0", "^0.2.3"));
        assert!(satisfies("0.0.3", "^0.0.3"));
        assert!(!satisfies("0.0.4", "^0.0.3"));
    }

    #[test]
    fn caret_coerces_partial_versions() {
        assert!(satisfies("1.5.0", "^1"));
        assert!(!satisfies("2.0.0", "^1"));
        assert!(satisfies("1.2.7", "^1.2"));
    }

    #[test]
    fn tilde_allows_patch_updates_only() {
        assert!(satisfies("1.2.3", "~1.2.3"));
        assert!(satisfies("1.2.9", "~1.2.3"));
        assert!(!satisfies("1.3.0", "~1.2.3"));
        assert!(!satisfies("1.2.2", "~1.2.3"));
    }

    #[test]
    fn comparator_operators() {
        assert!(satisfies("1.0.0", ">=1.0.0"));
        assert!(!satisfies("0.9.9", ">=1.0.0"));
        assert!(satisfies("0.9.9", "<1.0.0"));
        assert!(satisfies("1.0.0", "<=1.0.0"));
        assert!(satisfies("1.0.1", ">1.0.0"));
        assert!(satisfies("1.0.0", "=1.0.0"));
    }

    #[test]
    fn whitespace_group_is_and() {
        assert!(satisfies("1.5.0", ">=1.0.0 <2.0.0"));
        assert!(!satisfies("2.0.0", ">=1.0.0 <2.0.0"));
    }

    #[test]
    fn or_groups() {
        let range = "4.1.1 || 4.1.2";
        assert!(satisfies("4.1.1", range));
        assert!(satisfies("4.1.2", range));
        assert!(!satisfies("4.2.0", range));
    }

    #[test]
    fn prerelease_comparator_keeps_prerelease() {
        assert!(satisfies("1.0.0-beta.2", ">=1.0.0-beta.1"));
        assert!(!satisfies("1.0.0-alpha", ">=1.0.0-beta.1"));
    }

    #[test]
    fn empty_range_matches_everything() {
        assert!(satisfies("1.2.3", ""));
        assert!(satisfies("1.2.3", "  ||  "));
    }

    #[test]
    fn unparsable_token_is_permissive() {
        // `*`와 `1.x`는 해석할 수 없어 건너뜀 -> 해당 그룹은 다른 토큰만으로 판정
        assert!(satisfies("9.9.9", "*"));
        assert!(satisfies("3.0.0", "1.x"));
        assert!(!satisfies("3.0.0", "1.x <2.0.0"));
    }

    #[test]
    fn leading_version_ignores_trailing_garbage() {
        assert_eq!(leading_version("1.2.3+build"), Some("1.2.3"));
        assert_eq!(leading_version("1.2.3-rc.1"), Some("1.2.3-rc.1"));
        assert_eq!(leading_version("1.2.3-"), Some("1.2.3"));
        assert_eq!(leading_version("1.2"), None);
        assert_eq!(leading_version("v1.2.3"), None);
    }

    #[test]
    fn parse_token_caret_bounds() {
        let comparators = parse_token("^1.2.3").unwrap();
        assert_eq!(
            comparators,
            vec![
                Comparator::new(Op::Ge, "1.2.3"),
                Comparator::new(Op::Lt, "2.0.0"),
            ]
        );
    }

    #[test]
    fn parse_token_rejects_bare_operator() {
        assert!(parse_token(">=").is_none());
        assert!(parse_token("latest").is_none());
    }

    #[test]
    fn unparsable_version_uses_lexical_comparison() {
        // 버전 쪽이 SemVer가 아니면 비교는 문자열 기준
        assert!(!satisfies("garbage", "1.0.0"));
        assert!(satisfies("garbage", ">1.0.0"));
    }
}
