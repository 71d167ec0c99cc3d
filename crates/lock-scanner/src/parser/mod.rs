//! lockfile 파서 -- package-lock.json, yarn.lock, bun.lock, bun.lockb
//!
//! [`LockfileParser`] trait은 각 lockfile 형식의 파서가 구현해야 하는 인터페이스입니다.
//! [`LockfileDetector`]는 프로젝트 디렉토리에서 지원되는 lockfile을 찾습니다.
//!
//! # 지원 형식
//!
//! - `package-lock.json`, `npm-shrinkwrap.json` (v1 중첩 트리, v2+ 평면 맵) -- [`NpmLockParser`]
//! - `yarn.lock` (classic, berry) -- [`YarnLockParser`]
//! - `bun.lock` (JSONC) -- [`BunLockParser`]
//! - `bun.lockb` (바이너리, 외부 디코더 필요) -- [`BunBinaryLockParser`]
//!
//! # 실패 처리
//!
//! 파서는 전역 함수(total function)로 동작해야 합니다. 손상된 lockfile 하나가
//! 다른 lockfile의 스캔을 중단시키면 안 되므로, 스캐너는 [`LockfileParser::parse_lenient`]를
//! 사용하여 파싱 실패를 경고 로그와 빈 결과로 바꿉니다.

pub mod bun;
pub mod bun_binary;
pub mod jsonc;
pub mod npm;
pub mod yarn;

use std::path::Path;

use tracing::warn;

use crate::error::LockScanError;
use crate::types::{LockfileContents, LockfileKind};

pub use bun::BunLockParser;
pub use bun_binary::{BunBinaryLockParser, BunCliDecoder, LockbDecoder};
pub use npm::NpmLockParser;
pub use yarn::YarnLockParser;

/// yarn과 bun이 공통으로 사용하는 의존성 그룹 키
pub(crate) const DEPENDENCY_GROUPS: [&str; 3] =
    ["dependencies", "devDependencies", "optionalDependencies"];

/// Lockfile 파서 trait
///
/// lockfile 원본 바이트를 [`LockfileContents`] (패키지 레코드 + 의존성 간선)로 변환합니다.
pub trait LockfileParser: Send + Sync {
    /// 이 파서가 담당하는 lockfile 형식을 반환합니다.
    fn kind(&self) -> LockfileKind;

    /// 주어진 경로의 파일을 이 파서가 처리할 수 있는지 확인합니다.
    ///
    /// 파일 이름으로 판별합니다 (예: "yarn.lock", "bun.lockb").
    fn can_parse(&self, path: &Path) -> bool;

    /// lockfile 내용을 파싱합니다.
    ///
    /// # Arguments
    ///
    /// - `content`: lockfile 원본 바이트
    /// - `source_path`: 원본 파일 경로 (레코드 출처 및 에러 메시지용)
    fn parse(&self, content: &[u8], source_path: &str)
    -> Result<LockfileContents, LockScanError>;

    /// 실패하지 않는 파싱. 에러는 경고 로그로 남기고 빈 결과를 반환합니다.
    fn parse_lenient(&self, content: &[u8], source_path: &str) -> LockfileContents {
        match self.parse(content, source_path) {
            Ok(contents) => contents,
            Err(e) => {
                warn!(
                    path = source_path,
                    kind = %self.kind(),
                    error = %e,
                    "failed to parse lockfile, returning empty result"
                );
                LockfileContents::empty(source_path, self.kind())
            }
        }
    }
}

/// Lockfile 탐지기
///
/// 파일 이름 매칭으로 지원되는 lockfile과 그 형식을 판별합니다.
#[derive(Debug, Clone)]
pub struct LockfileDetector {
    /// 알려진 lockfile 파일명 목록
    known_filenames: Vec<(String, LockfileKind)>,
}

impl LockfileDetector {
    /// 기본 lockfile 패턴으로 탐지기를 생성합니다.
    pub fn new() -> Self {
        Self {
            known_filenames: vec![
                ("package-lock.json".to_owned(), LockfileKind::Npm),
                ("npm-shrinkwrap.json".to_owned(), LockfileKind::Npm),
                ("yarn.lock".to_owned(), LockfileKind::Yarn),
                ("bun.lock".to_owned(), LockfileKind::BunText),
                ("bun.lockb".to_owned(), LockfileKind::BunBinary),
            ],
        }
    }

    /// 알려진 lockfile 파일명 목록을 반환합니다.
    pub fn known_filenames(&self) -> &[(String, LockfileKind)] {
        &self.known_filenames
    }

    /// 주어진 경로가 알려진 lockfile인지 확인합니다.
    pub fn is_lockfile(&self, path: &Path) -> bool {
        self.detect_kind(path).is_some()
    }

    /// lockfile의 형식을 반환합니다.
    pub fn detect_kind(&self, path: &Path) -> Option<LockfileKind> {
        let file_name = path.file_name().and_then(|n| n.to_str())?;

        self.known_filenames
            .iter()
            .find(|(known, _)| known == file_name)
            .map(|(_, kind)| *kind)
    }
}

impl Default for LockfileDetector {
    fn default() -> Self {
        Self::new()
    }
}

/// 텍스트 lockfile을 UTF-8로 해석합니다. 선두 BOM은 제거합니다.
pub(crate) fn decode_utf8<'a>(
    content: &'a [u8],
    source_path: &str,
) -> Result<&'a str, LockScanError> {
    let text = std::str::from_utf8(content).map_err(|e| LockScanError::LockfileParse {
        path: source_path.to_owned(),
        reason: format!("invalid UTF-8: {e}"),
    })?;
    Ok(text.strip_prefix('\u{feff}').unwrap_or(text))
}

/// 의존성 지정자가 정확한 버전을 가리키면 그 버전을 반환합니다.
///
/// `npm:` 접두사를 제거한 뒤 숫자로 시작해야 합니다. `^1.2.0` 같은 범위는 None
pub(crate) fn exact_version_from_specifier(spec: &str) -> Option<String> {
    let spec = spec.trim();
    let spec = spec.strip_prefix("npm:").unwrap_or(spec);
    spec.starts_with(|c: char| c.is_ascii_digit())
        .then(|| spec.to_owned())
}
