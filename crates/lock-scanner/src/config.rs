//! lockfile 스캐너 설정
//!
//! [`LockScannerConfig`]는 core의 [`LockpostConfig`](lockpost_core::config::LockpostConfig)
//! 중 스캐너가 사용하는 `[scan]`, `[pin]` 값을 모은 것입니다.
//!
//! # 사용 예시
//!
//! ```
//! use lockpost_lock_scanner::LockScannerConfig;
//!
//! // 기본값으로 생성
//! let config = LockScannerConfig::default();
//! config.validate().unwrap();
//!
//! // 빌더로 생성
//! use lockpost_lock_scanner::LockScannerConfigBuilder;
//!
//! let config = LockScannerConfigBuilder::new()
//!     .max_chains(5)
//!     .max_chain_depth(10)
//!     .build()
//!     .unwrap();
//! ```

use std::path::{Component, Path};

use serde::{Deserialize, Serialize};

use lockpost_core::config::LockpostConfig;

use crate::error::LockScanError;

/// 설정 상한값 상수
const MAX_FILE_SIZE: usize = 100 * 1024 * 1024; // 100 MB
const MAX_CHAIN_DEPTH: usize = 64;
const MAX_CHAINS: usize = 1000;
const MAX_PATH_LEN: usize = 4096;

/// lockfile 스캐너 설정
///
/// # 필드
///
/// - **threat_db_path**: 외부 위협 DB 경로 (비어 있으면 내장 DB)
/// - **max_file_size**: lockfile 최대 크기 (바이트)
/// - **max_chains**: 침해 버전당 최대 체인 수 (0이면 체인 추적 안 함)
/// - **max_chain_depth**: 체인 추적 최대 깊이
/// - **bun_binary**: `bun.lockb` 디코딩용 bun 실행 파일 (비어 있으면 디코딩 안 함)
/// - **also_resolutions**, **backup**: 고정 계획 적용 옵션
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LockScannerConfig {
    /// 외부 위협 DB 경로
    pub threat_db_path: String,
    /// lockfile 최대 허용 크기 (바이트)
    pub max_file_size: usize,
    /// 침해 버전당 최대 체인 수
    pub max_chains: usize,
    /// 체인 추적 최대 깊이
    pub max_chain_depth: usize,
    /// bun 실행 파일
    pub bun_binary: String,
    /// `resolutions`에도 기록할지
    pub also_resolutions: bool,
    /// 쓰기 전 백업 여부
    pub backup: bool,
}

impl Default for LockScannerConfig {
    fn default() -> Self {
        Self {
            threat_db_path: String::new(),
            max_file_size: 50 * 1024 * 1024, // 50 MB
            max_chains: 3,
            max_chain_depth: 6,
            bun_binary: String::new(),
            also_resolutions: true,
            backup: true,
        }
    }
}

impl LockScannerConfig {
    /// core 설정에서 스캐너 설정을 생성합니다.
    pub fn from_core(core: &LockpostConfig) -> Self {
        Self {
            threat_db_path: core.scan.threat_db_path.clone(),
            max_file_size: core.scan.max_file_size,
            max_chains: core.scan.max_chains,
            max_chain_depth: core.scan.max_chain_depth,
            bun_binary: core.scan.bun_binary.clone(),
            also_resolutions: core.pin.also_resolutions,
            backup: core.pin.backup,
        }
    }

    /// 설정 값의 유효성을 검증합니다.
    ///
    /// # 검증 규칙
    ///
    /// - `max_file_size`: 1-104857600 (100MB)
    /// - `max_chain_depth`: 1-64
    /// - `max_chains`: 0-1000 (0은 체인 추적 비활성화)
    /// - `threat_db_path`: `..` 컴포넌트 금지, 최대 4096자
    pub fn validate(&self) -> Result<(), LockScanError> {
        if self.max_file_size == 0 || self.max_file_size > MAX_FILE_SIZE {
            return Err(LockScanError::Config {
                field: "max_file_size".to_owned(),
                reason: format!("must be 1-{MAX_FILE_SIZE}"),
            });
        }

        if self.max_chain_depth == 0 || self.max_chain_depth > MAX_CHAIN_DEPTH {
            return Err(LockScanError::Config {
                field: "max_chain_depth".to_owned(),
                reason: format!("must be 1-{MAX_CHAIN_DEPTH}"),
            });
        }

        if self.max_chains > MAX_CHAINS {
            return Err(LockScanError::Config {
                field: "max_chains".to_owned(),
                reason: format!("must be 0-{MAX_CHAINS}"),
            });
        }

        if !self.threat_db_path.is_empty() {
            // Path traversal 체크: Path::components()로 정확하게 ParentDir 컴포넌트 검출
            if Path::new(&self.threat_db_path)
                .components()
                .any(|c| c == Component::ParentDir)
            {
                return Err(LockScanError::Config {
                    field: "threat_db_path".to_owned(),
                    reason: "threat_db_path contains path traversal pattern '..'".to_owned(),
                });
            }

            if self.threat_db_path.len() > MAX_PATH_LEN {
                return Err(LockScanError::Config {
                    field: "threat_db_path".to_owned(),
                    reason: format!("threat_db_path exceeds maximum length {MAX_PATH_LEN}"),
                });
            }
        }

        Ok(())
    }
}

/// [`LockScannerConfig`] 빌더
///
/// 빌드 시 유효성 검증을 수행합니다.
#[derive(Default)]
pub struct LockScannerConfigBuilder {
    config: LockScannerConfig,
}

impl LockScannerConfigBuilder {
    /// 기본값을 가진 새 빌더를 생성합니다.
    pub fn new() -> Self {
        Self::default()
    }

    /// 외부 위협 DB 경로를 설정합니다.
    pub fn threat_db_path(mut self, path: impl Into<String>) -> Self {
        self.config.threat_db_path = path.into();
        self
    }

    /// lockfile 최대 크기를 설정합니다.
    pub fn max_file_size(mut self, bytes: usize) -> Self {
        self.config.max_file_size = bytes;
        self
    }

    /// 침해 버전당 최대 체인 수를 설정합니다.
    pub fn max_chains(mut self, chains: usize) -> Self {
        self.config.max_chains = chains;
        self
    }

    /// 체인 추적 최대 깊이를 설정합니다.
    pub fn max_chain_depth(mut self, depth: usize) -> Self {
        self.config.max_chain_depth = depth;
        self
    }

    /// bun 실행 파일을 설정합니다.
    pub fn bun_binary(mut self, program: impl Into<String>) -> Self {
        self.config.bun_binary = program.into();
        self
    }

    /// `resolutions` 기록 여부를 설정합니다.
    pub fn also_resolutions(mut self, enabled: bool) -> Self {
        self.config.also_resolutions = enabled;
        self
    }

    /// 백업 여부를 설정합니다.
    pub fn backup(mut self, enabled: bool) -> Self {
        self.config.backup = enabled;
        self
    }

    /// 설정을 검증하고 반환합니다.
    pub fn build(self) -> Result<LockScannerConfig, LockScanError> {
        self.config.validate()?;
        Ok(self.config)
    }
}
