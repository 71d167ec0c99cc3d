//! Lockpost 공통 크레이트
//!
//! 워크스페이스의 모든 크레이트가 공유하는 최상위 에러 타입과
//! `lockpost.toml` 설정을 정의합니다.
//!
//! - [`error`]: 최상위 에러 [`LockpostError`]와 도메인별 하위 에러
//! - [`config`]: 설정 파일 로딩, 환경변수 오버라이드, 유효성 검증

pub mod config;
pub mod error;

// --- 주요 타입 re-export ---

// 에러
pub use error::{ConfigError, LockfileError, LockpostError, ManifestError, ThreatDbError};

// 설정
pub use config::{GeneralConfig, LockpostConfig, PinConfig, ScanConfig};
