//! 위협 데이터베이스 -- 내장 목록 및 외부 JSON 로딩
//!
//! [`ThreatDb`]는 침해된 패키지 버전 목록을 보유합니다. 기본값은 크레이트에
//! 내장된 `data/threats.json`이며, 외부 파일로 대체할 수 있습니다.
//!
//! # JSON 형식
//!
//! ```json
//! [
//!   {
//!     "name": "debug",
//!     "badRanges": ["4.4.2"],
//!     "lastSafe": "4.4.1",
//!     "notes": "JavaScript debugging utility - compromised on 2025-09-08",
//!     "advisoryUrl": "https://github.com/debug-js/debug/issues/1005"
//!   }
//! ]
//! ```

use std::collections::HashMap;
use std::path::Path;

use serde::{Deserialize, Serialize};

use crate::error::LockScanError;

/// 위협 DB 파일 최대 크기 (10 MB)
const MAX_THREAT_DB_FILE_SIZE: u64 = 10 * 1024 * 1024;

/// 내장 위협 목록
const BUILTIN_THREATS: &str = include_str!("../../data/threats.json");

/// 위협 DB 엔트리
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ThreatEntry {
    /// 패키지 이름
    pub name: String,
    /// 침해된 버전 범위 표현식 목록
    #[serde(default)]
    pub bad_ranges: Vec<String>,
    /// 마지막으로 안전하다고 알려진 버전
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub last_safe: Option<String>,
    /// 설명
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub notes: Option<String>,
    /// 권고문 URL
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub advisory_url: Option<String>,
}

impl ThreatEntry {
    /// 마지막 안전 버전. 빈 문자열은 알 수 없음(None)으로 취급합니다.
    pub fn last_safe(&self) -> Option<&str> {
        self.last_safe
            .as_deref()
            .map(str::trim)
            .filter(|v| !v.is_empty())
    }
}

/// 이름 -> 엔트리 인덱스를 만듭니다. 이름이 중복되면 마지막 엔트리가 남습니다.
pub fn build_threat_index(entries: &[ThreatEntry]) -> HashMap<String, &ThreatEntry> {
    entries
        .iter()
        .map(|entry| (entry.name.clone(), entry))
        .collect()
}

/// 위협 데이터베이스
#[derive(Debug)]
pub struct ThreatDb {
    /// 원본 순서의 엔트리
    entries: Vec<ThreatEntry>,
    /// 이름 -> `entries` 인덱스 (마지막 엔트리 우선)
    index: HashMap<String, usize>,
}

impl ThreatDb {
    /// 빈 데이터베이스를 생성합니다.
    pub fn empty() -> Self {
        Self::from_entries(Vec::new())
    }

    /// 크레이트에 내장된 위협 목록을 로드합니다.
    pub fn builtin() -> Result<Self, LockScanError> {
        Self::from_json(BUILTIN_THREATS)
    }

    /// 엔트리 목록으로 데이터베이스를 생성합니다.
    pub fn from_entries(entries: Vec<ThreatEntry>) -> Self {
        let index = entries
            .iter()
            .enumerate()
            .map(|(idx, entry)| (entry.name.clone(), idx))
            .collect();
        Self { entries, index }
    }

    /// JSON 문자열에서 데이터베이스를 파싱합니다.
    pub fn from_json(json: &str) -> Result<Self, LockScanError> {
        let entries: Vec<ThreatEntry> = serde_json::from_str(json).map_err(|e| {
            LockScanError::ThreatDbParse(format!("failed to parse threat db JSON: {e}"))
        })?;
        Ok(Self::from_entries(entries))
    }

    /// 외부 JSON 파일에서 데이터베이스를 로드합니다.
    ///
    /// # 보안 제한
    ///
    /// - 최대 10MB (`MAX_THREAT_DB_FILE_SIZE`)
    ///
    /// # Note
    ///
    /// 이 함수는 동기 I/O를 수행합니다. async 컨텍스트에서 호출할 때는
    /// `tokio::task::spawn_blocking`으로 감싸세요.
    pub fn load_from_file(path: &Path) -> Result<Self, LockScanError> {
        let metadata = std::fs::metadata(path).map_err(|e| LockScanError::ThreatDbLoad {
            path: path.display().to_string(),
            reason: e.to_string(),
        })?;

        if metadata.len() > MAX_THREAT_DB_FILE_SIZE {
            return Err(LockScanError::ThreatDbLoad {
                path: path.display().to_string(),
                reason: format!(
                    "file size {} bytes exceeds maximum {} bytes",
                    metadata.len(),
                    MAX_THREAT_DB_FILE_SIZE
                ),
            });
        }

        let content = std::fs::read_to_string(path).map_err(|e| LockScanError::ThreatDbLoad {
            path: path.display().to_string(),
            reason: e.to_string(),
        })?;

        let db = Self::from_json(&content).map_err(|e| match e {
            LockScanError::ThreatDbParse(reason) => {
                LockScanError::ThreatDbParse(format!("{}: {reason}", path.display()))
            }
            other => other,
        })?;

        tracing::info!(
            path = %path.display(),
            entries = db.entry_count(),
            "loaded threat db file"
        );
        Ok(db)
    }

    /// 전체 엔트리 수
    pub fn entry_count(&self) -> usize {
        self.entries.len()
    }

    /// 이름으로 엔트리를 조회합니다.
    pub fn get(&self, name: &str) -> Option<&ThreatEntry> {
        self.index.get(name).and_then(|&idx| self.entries.get(idx))
    }

    /// 원본 순서의 전체 엔트리
    pub fn entries(&self) -> &[ThreatEntry] {
        &self.entries
    }
}
