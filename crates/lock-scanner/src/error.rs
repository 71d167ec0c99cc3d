//! lockfile 스캐너 에러 타입
//!
//! [`LockScanError`]는 스캐너 모듈 내에서 발생할 수 있는 모든 에러를 나타냅니다.
//! `From<LockScanError> for LockpostError` 구현을 통해 `?` 연산자로
//! 상위 에러 타입으로 자연스럽게 전파됩니다.
//!
//! # 에러 카테고리
//!
//! - **Lockfile 파싱**: `LockfileParse`, `Decoder` (스캔 흐름에서는 빈 결과로 흡수)
//! - **위협 DB**: `ThreatDbLoad`, `ThreatDbParse`
//! - **매니페스트**: `ManifestRead`, `ManifestWrite` (호출자에게 전파되는 유일한 경로)
//! - **설정**: `Config`
//! - **파일 I/O**: `Io`, `FileTooBig`
//! - **태스크**: `Task`

use lockpost_core::error::{
    ConfigError, LockfileError, LockpostError, ManifestError, ThreatDbError,
};

/// lockfile 스캐너 도메인 에러
#[derive(Debug, thiserror::Error)]
pub enum LockScanError {
    /// Lockfile 파싱 실패
    #[error("lockfile parse error: {path}: {reason}")]
    LockfileParse {
        /// 파싱 대상 파일 경로
        path: String,
        /// 파싱 실패 사유
        reason: String,
    },

    /// 바이너리 lockfile 디코딩 실패
    #[error("lockfile decode error: {path}: {reason}")]
    Decoder {
        /// 디코딩 대상 파일 경로
        path: String,
        /// 실패 사유
        reason: String,
    },

    /// 위협 DB 로딩 실패
    #[error("threat db load error: {path}: {reason}")]
    ThreatDbLoad {
        /// DB 파일 경로
        path: String,
        /// 로딩 실패 사유
        reason: String,
    },

    /// 위협 DB 파싱 실패
    #[error("threat db parse error: {0}")]
    ThreatDbParse(String),

    /// package.json 읽기 실패
    #[error("manifest read error: {path}: {reason}")]
    ManifestRead {
        /// 매니페스트 경로
        path: String,
        /// 실패 사유
        reason: String,
    },

    /// package.json 쓰기 실패 (백업 포함)
    #[error("manifest write error: {path}: {reason}")]
    ManifestWrite {
        /// 매니페스트 또는 백업 경로
        path: String,
        /// 실패 사유
        reason: String,
    },

    /// 설정 에러
    #[error("config error: {field}: {reason}")]
    Config {
        /// 설정 필드명
        field: String,
        /// 에러 사유
        reason: String,
    },

    /// 파일 I/O 에러
    #[error("io error: {path}: {source}")]
    Io {
        /// 관련 파일 경로
        path: String,
        /// 원본 I/O 에러
        source: std::io::Error,
    },

    /// 파일 크기 초과
    #[error("file too large: {path}: {size} bytes (max: {max})")]
    FileTooBig {
        /// 파일 경로
        path: String,
        /// 실제 파일 크기 (바이트)
        size: usize,
        /// 최대 허용 크기 (바이트)
        max: usize,
    },

    /// blocking 태스크 실행 실패
    #[error("task error: {0}")]
    Task(String),
}

impl From<LockScanError> for LockpostError {
    fn from(err: LockScanError) -> Self {
        match err {
            LockScanError::LockfileParse { path, reason } => LockpostError::Lockfile(
                LockfileError::ParseFailed(format!("{path}: {reason}")),
            ),
            LockScanError::Decoder { path, reason } => LockpostError::Lockfile(
                LockfileError::DecodeFailed(format!("{path}: {reason}")),
            ),
            LockScanError::FileTooBig { size, max, .. } => {
                LockpostError::Lockfile(LockfileError::TooLarge { size, max })
            }
            LockScanError::ThreatDbLoad { path, reason } => {
                LockpostError::ThreatDb(ThreatDbError::Load(format!("{path}: {reason}")))
            }
            LockScanError::ThreatDbParse(msg) => LockpostError::ThreatDb(ThreatDbError::Parse(msg)),
            LockScanError::ManifestRead { path, reason } => {
                LockpostError::Manifest(ManifestError::ReadFailed(format!("{path}: {reason}")))
            }
            LockScanError::ManifestWrite { path, reason } => {
                LockpostError::Manifest(ManifestError::WriteFailed(format!("{path}: {reason}")))
            }
            LockScanError::Config { field, reason } => {
                LockpostError::Config(ConfigError::InvalidValue { field, reason })
            }
            LockScanError::Io { source, .. } => LockpostError::Io(source),
            LockScanError::Task(msg) => {
                LockpostError::Io(std::io::Error::other(format!("task error: {msg}")))
            }
        }
    }
}
