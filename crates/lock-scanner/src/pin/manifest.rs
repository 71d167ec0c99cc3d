//! package.json 입출력 -- 고정 상태 읽기, 계획 적용, 백업
//!
//! 쓰기 전에 기존 파일을 `package.json.lockpost.bak.<UTC 타임스탬프>`로 복사합니다.
//! 출력은 2칸 들여쓰기 JSON이며 기존 키 순서를 유지합니다.

use std::path::{Path, PathBuf};

use chrono::{SecondsFormat, Utc};
use serde::Serialize;
use serde_json::{Map, Value};
use tracing::{debug, info};

use crate::error::LockScanError;
use crate::pin::{PinPlan, PinState, key_matches};

/// 매니페스트 파일명
pub const MANIFEST_FILE: &str = "package.json";

/// 백업 파일명 접두사
const BACKUP_PREFIX: &str = "package.json.lockpost.bak.";

/// 읽어 들인 package.json
#[derive(Debug, Clone)]
pub struct PackageManifest {
    path: PathBuf,
    value: Value,
}

impl PackageManifest {
    /// 디렉토리의 package.json을 읽습니다.
    ///
    /// 파일이 없거나 JSON이 아니면 None을 반환합니다 (아무것도 고정되지 않은 상태).
    pub fn read(dir: &Path) -> Option<Self> {
        let path = dir.join(MANIFEST_FILE);
        match Self::load(&path) {
            Ok(manifest) => Some(manifest),
            Err(e) => {
                debug!(
                    path = %path.display(),
                    error = %e,
                    "package.json unavailable, treating as unpinned"
                );
                None
            }
        }
    }

    /// 경로에서 매니페스트를 읽습니다. 실패하면 `ManifestRead` 에러
    pub fn load(path: &Path) -> Result<Self, LockScanError> {
        let content = std::fs::read_to_string(path).map_err(|e| LockScanError::ManifestRead {
            path: path.display().to_string(),
            reason: e.to_string(),
        })?;

        let value: Value =
            serde_json::from_str(&content).map_err(|e| LockScanError::ManifestRead {
                path: path.display().to_string(),
                reason: e.to_string(),
            })?;

        if !value.is_object() {
            return Err(LockScanError::ManifestRead {
                path: path.display().to_string(),
                reason: "package.json is not a JSON object".to_owned(),
            });
        }

        Ok(Self {
            path: path.to_path_buf(),
            value,
        })
    }

    /// 파일 경로
    pub fn path(&self) -> &Path {
        &self.path
    }

    /// 프로젝트 이름 (`name` 필드)
    pub fn name(&self) -> Option<&str> {
        self.value.get("name").and_then(Value::as_str)
    }

    /// 현재 고정 상태
    pub fn pin_state(&self) -> PinState {
        PinState::from_manifest(&self.value)
    }

    /// 원본 JSON
    pub fn value(&self) -> &Value {
        &self.value
    }
}

/// 계획 적용 옵션
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ApplyOptions {
    /// `resolutions`에도 기록할지
    pub also_resolutions: bool,
    /// 쓰기 전에 백업할지
    pub backup: bool,
}

impl Default for ApplyOptions {
    fn default() -> Self {
        Self {
            also_resolutions: true,
            backup: true,
        }
    }
}

/// 계획 적용 결과
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ApplyOutcome {
    /// `overrides`에 새로 추가된 이름
    pub updated: Vec<String>,
    /// `resolutions`에 새로 추가된 이름
    pub updated_resolutions: Vec<String>,
    /// 매니페스트 경로
    pub path: PathBuf,
    /// 백업 경로 (백업하지 않았으면 None)
    pub backup_path: Option<PathBuf>,
}

/// 고정 계획을 디렉토리의 package.json에 적용합니다.
///
/// 이미 같은 이름(또는 `name@range` 키)이 있는 항목은 건드리지 않습니다.
///
/// # Note
///
/// 이 함수는 동기 I/O를 수행합니다. async 컨텍스트에서 호출할 때는
/// `tokio::task::spawn_blocking`으로 감싸세요.
pub fn apply_pin_plan(
    dir: &Path,
    plan: &PinPlan,
    options: &ApplyOptions,
) -> Result<ApplyOutcome, LockScanError> {
    let path = dir.join(MANIFEST_FILE);
    let mut manifest = PackageManifest::load(&path)?;

    let root = manifest
        .value
        .as_object_mut()
        .ok_or_else(|| LockScanError::ManifestRead {
            path: path.display().to_string(),
            reason: "package.json is not a JSON object".to_owned(),
        })?;

    let updated = merge_pins(root, "overrides", &plan.overrides);
    let updated_resolutions = if options.also_resolutions {
        merge_pins(root, "resolutions", &plan.resolutions)
    } else {
        Vec::new()
    };

    let backup_path = if options.backup {
        Some(backup_manifest(&path)?)
    } else {
        None
    };

    let mut rendered =
        serde_json::to_string_pretty(&manifest.value).map_err(|e| LockScanError::ManifestWrite {
            path: path.display().to_string(),
            reason: e.to_string(),
        })?;
    rendered.push('\n');

    std::fs::write(&path, rendered).map_err(|e| LockScanError::ManifestWrite {
        path: path.display().to_string(),
        reason: e.to_string(),
    })?;

    info!(
        path = %path.display(),
        overrides = updated.len(),
        resolutions = updated_resolutions.len(),
        backup = ?backup_path,
        "applied pins to package.json"
    );

    Ok(ApplyOutcome {
        updated,
        updated_resolutions,
        path,
        backup_path,
    })
}

/// `section` 객체에 없는 이름만 추가하고 추가된 이름을 반환합니다.
///
/// 섹션이 없거나 객체가 아니면 새 객체로 만듭니다.
fn merge_pins(
    root: &mut Map<String, Value>,
    section: &str,
    pins: &std::collections::BTreeMap<String, String>,
) -> Vec<String> {
    if pins.is_empty() {
        return Vec::new();
    }

    let entry = root
        .entry(section)
        .or_insert_with(|| Value::Object(Map::new()));
    if !entry.is_object() {
        *entry = Value::Object(Map::new());
    }
    let Some(existing) = entry.as_object_mut() else {
        return Vec::new();
    };

    let mut updated = Vec::new();
    for (name, version) in pins {
        if existing.keys().any(|key| key_matches(key, name)) {
            continue;
        }
        existing.insert(name.clone(), Value::String(version.clone()));
        updated.push(name.clone());
    }
    updated
}

/// 백업 파일명에 쓰는 타임스탬프. `:`와 `.`는 `-`로 바뀝니다.
pub fn backup_timestamp(now: chrono::DateTime<Utc>) -> String {
    now.to_rfc3339_opts(SecondsFormat::Millis, true)
        .replace([':', '.'], "-")
}

fn backup_manifest(path: &Path) -> Result<PathBuf, LockScanError> {
    let file_name = format!("{BACKUP_PREFIX}{}", backup_timestamp(Utc::now()));
    let backup = path.with_file_name(file_name);

    std::fs::copy(path, &backup).map_err(|e| LockScanError::ManifestWrite {
        path: backup.display().to_string(),
        reason: format!("backup failed: {e}"),
    })?;
    Ok(backup)
}
