//! 에러 타입 — 도메인별 에러 정의

/// Lockpost 최상위 에러 타입
#[derive(Debug, thiserror::Error)]
pub enum LockpostError {
    /// 설정 관련 에러
    #[error("config error: {0}")]
    Config(#[from] ConfigError),

    /// lockfile 읽기/파싱 에러
    #[error("lockfile error: {0}")]
    Lockfile(#[from] LockfileError),

    /// 위협 DB 에러
    #[error("threat db error: {0}")]
    ThreatDb(#[from] ThreatDbError),

    /// package.json 매니페스트 에러
    #[error("manifest error: {0}")]
    Manifest(#[from] ManifestError),

    /// I/O 에러
    #[error("io error: {0}")]
    Io(#[from] std::io::Error),
}

/// 설정 관련 에러
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    /// 설정 파일을 찾을 수 없음
    #[error("config file not found: {path}")]
    FileNotFound { path: String },

    /// 설정 파싱 실패
    #[error("failed to parse config: {reason}")]
    ParseFailed { reason: String },

    /// 유효하지 않은 설정 값
    #[error("invalid config value for '{field}': {reason}")]
    InvalidValue { field: String, reason: String },
}

/// lockfile 에러
///
/// 스캔 흐름에서는 대부분 빈 결과로 흡수되며, 호출자가 직접
/// 파서를 사용할 때만 드러납니다.
#[derive(Debug, thiserror::Error)]
pub enum LockfileError {
    /// 구조적 파싱 실패
    #[error("parse failed: {0}")]
    ParseFailed(String),

    /// 입력 크기 초과
    #[error("input too large: {size} bytes (max: {max})")]
    TooLarge { size: usize, max: usize },

    /// 바이너리 lockfile 디코딩 실패
    #[error("decode failed: {0}")]
    DecodeFailed(String),
}

/// 위협 DB 에러
#[derive(Debug, thiserror::Error)]
pub enum ThreatDbError {
    /// DB 파일 로딩 실패
    #[error("load failed: {0}")]
    Load(String),

    /// DB JSON 파싱 실패
    #[error("parse failed: {0}")]
    Parse(String),
}

/// package.json 매니페스트 에러
#[derive(Debug, thiserror::Error)]
pub enum ManifestError {
    /// 매니페스트 읽기 실패
    #[error("read failed: {0}")]
    ReadFailed(String),

    /// 매니페스트 쓰기 실패 (백업 포함)
    #[error("write failed: {0}")]
    WriteFailed(String),
}
