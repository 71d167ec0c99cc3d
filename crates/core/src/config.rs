//! 설정 관리 — lockpost.toml 파싱 및 런타임 설정
//!
//! [`LockpostConfig`]는 모든 크레이트의 설정을 담는 최상위 구조체입니다.
//!
//! # 설정 로딩 우선순위
//! 1. CLI 인자 (최고 우선)
//! 2. 환경변수 (`LOCKPOST_SCAN_MAX_CHAINS=5` 형식)
//! 3. 설정 파일 (`lockpost.toml`)
//! 4. 기본값 (`Default` 구현)
//!
//! # 사용 예시
//! ```no_run
//! # async fn example() -> Result<(), lockpost_core::error::LockpostError> {
//! use lockpost_core::config::LockpostConfig;
//!
//! // 파일에서 로드 + 환경변수 오버라이드
//! let config = LockpostConfig::load("lockpost.toml").await?;
//!
//! // TOML 문자열에서 직접 파싱
//! let config = LockpostConfig::parse("[scan]\nmax_chains = 5")?;
//! # Ok(())
//! # }
//! ```

use std::path::Path;

use serde::{Deserialize, Serialize};
use tracing::{debug, warn};

use crate::error::{ConfigError, LockpostError};

/// Lockpost 통합 설정
///
/// `lockpost.toml` 파일의 최상위 구조를 나타냅니다.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct LockpostConfig {
    /// 일반 설정 (로깅)
    #[serde(default)]
    pub general: GeneralConfig,
    /// lockfile 스캔 설정
    #[serde(default)]
    pub scan: ScanConfig,
    /// 버전 고정(pin) 설정
    #[serde(default)]
    pub pin: PinConfig,
}

impl LockpostConfig {
    /// TOML 파일에서 설정을 로드하고 환경변수 오버라이드를 적용합니다.
    pub async fn load(path: impl AsRef<Path>) -> Result<Self, LockpostError> {
        let mut config = Self::from_file(path).await?;
        config.apply_env_overrides();
        config.validate()?;
        Ok(config)
    }

    /// 설정 파일이 없으면 기본값에서 시작합니다.
    ///
    /// 파일이 존재하지만 잘못된 경우에는 에러를 반환합니다.
    /// 어느 쪽이든 환경변수 오버라이드와 검증은 적용됩니다.
    pub async fn load_or_default(path: impl AsRef<Path>) -> Result<Self, LockpostError> {
        let path = path.as_ref();
        match Self::load(path).await {
            Err(LockpostError::Config(ConfigError::FileNotFound { .. })) => {
                debug!(path = %path.display(), "config file not found, using defaults");
                let mut config = Self::default();
                config.apply_env_overrides();
                config.validate()?;
                Ok(config)
            }
            other => other,
        }
    }

    /// TOML 파일에서 설정을 로드합니다 (환경변수 오버라이드 없음).
    pub async fn from_file(path: impl AsRef<Path>) -> Result<Self, LockpostError> {
        let path = path.as_ref();
        let content = tokio::fs::read_to_string(path).await.map_err(|e| {
            if e.kind() == std::io::ErrorKind::NotFound {
                LockpostError::Config(ConfigError::FileNotFound {
                    path: path.display().to_string(),
                })
            } else {
                LockpostError::Io(e)
            }
        })?;
        let config = Self::parse(&content)?;
        config.validate()?;
        Ok(config)
    }

    /// TOML 문자열에서 설정을 파싱합니다.
    pub fn parse(toml_str: &str) -> Result<Self, LockpostError> {
        toml::from_str(toml_str).map_err(|e| {
            LockpostError::Config(ConfigError::ParseFailed {
                reason: e.to_string(),
            })
        })
    }

    /// 환경변수로 설정값을 오버라이드합니다.
    ///
    /// 환경변수 네이밍 규칙: `LOCKPOST_{SECTION}_{FIELD}`
    /// 예: `LOCKPOST_SCAN_THREAT_DB_PATH=/etc/lockpost/threats.json`
    pub fn apply_env_overrides(&mut self) {
        // General
        override_string(&mut self.general.log_level, "LOCKPOST_GENERAL_LOG_LEVEL");
        override_string(&mut self.general.log_format, "LOCKPOST_GENERAL_LOG_FORMAT");

        // Scan
        override_string(
            &mut self.scan.threat_db_path,
            "LOCKPOST_SCAN_THREAT_DB_PATH",
        );
        override_usize(&mut self.scan.max_file_size, "LOCKPOST_SCAN_MAX_FILE_SIZE");
        override_usize(&mut self.scan.max_chains, "LOCKPOST_SCAN_MAX_CHAINS");
        override_usize(
            &mut self.scan.max_chain_depth,
            "LOCKPOST_SCAN_MAX_CHAIN_DEPTH",
        );
        override_string(&mut self.scan.bun_binary, "LOCKPOST_SCAN_BUN_BINARY");

        // Pin
        override_bool(
            &mut self.pin.also_resolutions,
            "LOCKPOST_PIN_ALSO_RESOLUTIONS",
        );
        override_bool(&mut self.pin.backup, "LOCKPOST_PIN_BACKUP");
    }

    /// 설정값의 유효성을 검증합니다.
    ///
    /// 스캔 한도(파일 크기, 체인 수/깊이)의 범위 검증은
    /// 스캐너 설정(`LockScannerConfig::validate`)이 담당합니다.
    pub fn validate(&self) -> Result<(), LockpostError> {
        let valid_levels = ["trace", "debug", "info", "warn", "error"];
        if !valid_levels.contains(&self.general.log_level.as_str()) {
            return Err(ConfigError::InvalidValue {
                field: "general.log_level".to_owned(),
                reason: format!("must be one of: {}", valid_levels.join(", ")),
            }
            .into());
        }

        let valid_formats = ["json", "pretty"];
        if !valid_formats.contains(&self.general.log_format.as_str()) {
            return Err(ConfigError::InvalidValue {
                field: "general.log_format".to_owned(),
                reason: format!("must be one of: {}", valid_formats.join(", ")),
            }
            .into());
        }

        if self.scan.max_file_size == 0 {
            return Err(ConfigError::InvalidValue {
                field: "scan.max_file_size".to_owned(),
                reason: "must be greater than 0".to_owned(),
            }
            .into());
        }

        if self.scan.max_chain_depth == 0 {
            return Err(ConfigError::InvalidValue {
                field: "scan.max_chain_depth".to_owned(),
                reason: "must be greater than 0".to_owned(),
            }
            .into());
        }

        Ok(())
    }
}

/// 일반 설정
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct GeneralConfig {
    /// 로그 레벨 (trace, debug, info, warn, error)
    pub log_level: String,
    /// 로그 형식 (json, pretty)
    pub log_format: String,
}

impl Default for GeneralConfig {
    fn default() -> Self {
        Self {
            log_level: "warn".to_owned(),
            log_format: "pretty".to_owned(),
        }
    }
}

/// lockfile 스캔 설정
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ScanConfig {
    /// 외부 위협 DB(JSON) 경로. 비어 있으면 내장 DB 사용
    pub threat_db_path: String,
    /// lockfile 최대 크기 (바이트)
    pub max_file_size: usize,
    /// 손상 버전당 출력할 최대 의존성 체인 수 (0이면 체인 추적 안 함)
    pub max_chains: usize,
    /// 체인 추적 최대 깊이
    pub max_chain_depth: usize,
    /// `bun.lockb` 디코딩에 사용할 bun 실행 파일. 비어 있으면 디코딩 안 함
    pub bun_binary: String,
}

impl Default for ScanConfig {
    fn default() -> Self {
        Self {
            threat_db_path: String::new(),
            max_file_size: 50 * 1024 * 1024, // 50 MB
            max_chains: 3,
            max_chain_depth: 6,
            bun_binary: String::new(),
        }
    }
}

/// 버전 고정(pin) 설정
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct PinConfig {
    /// `overrides`와 함께 yarn 스타일 `resolutions`에도 기록
    pub also_resolutions: bool,
    /// package.json 수정 전 타임스탬프 백업 생성
    pub backup: bool,
}

impl Default for PinConfig {
    fn default() -> Self {
        Self {
            also_resolutions: true,
            backup: true,
        }
    }
}

// --- 환경변수 오버라이드 헬퍼 ---

fn override_string(target: &mut String, env_key: &str) {
    if let Ok(val) = std::env::var(env_key) {
        *target = val;
    }
}

fn override_bool(target: &mut bool, env_key: &str) {
    if let Ok(val) = std::env::var(env_key) {
        match val.parse::<bool>() {
            Ok(parsed) => *target = parsed,
            Err(_) => warn!(
                env_key,
                value = val.as_str(),
                "failed to parse bool from env var, ignoring"
            ),
        }
    }
}

fn override_usize(target: &mut usize, env_key: &str) {
    if let Ok(val) = std::env::var(env_key) {
        match val.parse::<usize>() {
            Ok(parsed) => *target = parsed,
            Err(_) => warn!(
                env_key,
                value = val.as_str(),
                "failed to parse usize from env var, ignoring"
            ),
        }
    }
}
