//! 버전 고정 계획 -- 침해된 패키지를 안전한 버전으로 고정
//!
//! [`plan_pins`]는 분류 보고서와 매니페스트의 현재 고정 상태([`PinState`])만으로
//! 계획을 계산하는 순수 함수입니다. 계획을 `package.json`에 쓰는 일은
//! [`manifest::apply_pin_plan`]이 담당합니다.
//!
//! # 목표 버전 선택
//!
//! 1. 설치된 버전 중 safe로 분류된 최댓값 (`safe_installed_max`)
//! 2. 없으면 위협 DB의 `lastSafe`
//! 3. 둘 다 없으면 경고만 남기고 건너뜀

pub mod manifest;

use std::collections::{BTreeMap, BTreeSet};

use serde::Serialize;
use serde_json::{Map, Value};

use crate::threat::PackageReport;

pub use manifest::{ApplyOptions, ApplyOutcome, PackageManifest, apply_pin_plan};

/// 매니페스트에 이미 있는 고정 설정
///
/// npm `overrides`와 yarn `resolutions` 객체를 그대로 보관합니다.
/// 매니페스트가 없으면 기본값(아무것도 고정되지 않음)을 사용합니다.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct PinState {
    overrides: Map<String, Value>,
    resolutions: Map<String, Value>,
}

impl PinState {
    /// overrides, resolutions 객체로 생성합니다.
    pub fn new(overrides: Map<String, Value>, resolutions: Map<String, Value>) -> Self {
        Self {
            overrides,
            resolutions,
        }
    }

    /// 매니페스트 JSON에서 `overrides`와 `resolutions`를 읽습니다.
    ///
    /// 객체가 아닌 값은 비어 있는 것으로 취급합니다.
    pub fn from_manifest(manifest: &Value) -> Self {
        let section = |key: &str| {
            manifest
                .get(key)
                .and_then(Value::as_object)
                .cloned()
                .unwrap_or_default()
        };
        Self::new(section("overrides"), section("resolutions"))
    }

    /// overrides로 고정되어 있는지 확인합니다.
    ///
    /// 키가 정확히 같거나 `name@range` 형태이면 고정된 것으로 봅니다.
    /// 중첩 override 객체가 `name`을 문자열 값으로 가지는 경우도 포함합니다.
    pub fn is_pinned_by_overrides(&self, name: &str) -> bool {
        self.overrides.iter().any(|(key, value)| {
            key_matches(key, name)
                || value
                    .as_object()
                    .is_some_and(|inner| inner.get(name).is_some_and(Value::is_string))
        })
    }

    /// resolutions로 고정되어 있는지 확인합니다.
    pub fn is_pinned_by_resolutions(&self, name: &str) -> bool {
        self.resolutions.keys().any(|key| key_matches(key, name))
    }

    /// overrides 또는 resolutions로 고정되어 있는지 확인합니다.
    pub fn is_pinned(&self, name: &str) -> bool {
        self.is_pinned_by_overrides(name) || self.is_pinned_by_resolutions(name)
    }

    /// 현재 고정된 버전 (overrides 우선)
    pub fn pinned_version(&self, name: &str) -> Option<&str> {
        self.override_version(name)
            .or_else(|| self.resolution_version(name))
    }

    fn override_version(&self, name: &str) -> Option<&str> {
        if let Some(direct) = self.overrides.get(name).and_then(Value::as_str) {
            return Some(direct);
        }
        let scoped = self
            .overrides
            .iter()
            .filter(|(key, _)| key_matches(key, name))
            .find_map(|(_, value)| value.as_str());
        if scoped.is_some() {
            return scoped;
        }
        self.overrides
            .values()
            .filter_map(Value::as_object)
            .find_map(|inner| inner.get(name).and_then(Value::as_str))
    }

    fn resolution_version(&self, name: &str) -> Option<&str> {
        if let Some(direct) = self.resolutions.get(name).and_then(Value::as_str) {
            return Some(direct);
        }
        self.resolutions
            .iter()
            .filter(|(key, _)| key_matches(key, name))
            .find_map(|(_, value)| value.as_str())
    }
}

/// `name` 또는 `name@...` 형태의 키인지 확인합니다.
pub(crate) fn key_matches(key: &str, name: &str) -> bool {
    key == name
        || key
            .strip_prefix(name)
            .is_some_and(|rest| rest.starts_with('@'))
}

/// 고정 계획
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct PinPlan {
    /// npm `overrides`에 쓸 이름 -> 버전
    pub overrides: BTreeMap<String, String>,
    /// yarn `resolutions`에 쓸 이름 -> 버전 (overrides와 동일)
    pub resolutions: BTreeMap<String, String>,
    /// 경고 메시지
    pub warnings: Vec<String>,
}

impl PinPlan {
    /// 고정할 패키지가 없는지
    pub fn is_empty(&self) -> bool {
        self.overrides.is_empty() && self.resolutions.is_empty()
    }
}

/// [`plan_pins`] 결과
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct PlanOutcome {
    /// 계산된 계획
    pub plan: PinPlan,
    /// 이미 고정되어 있어 제외된 이름
    pub already_pinned: BTreeSet<String>,
}

/// 분류 보고서와 현재 고정 상태로 고정 계획을 계산합니다.
///
/// 같은 입력에 대해 항상 같은 결과를 돌려줍니다.
pub fn plan_pins(reports: &[PackageReport], state: &PinState) -> PlanOutcome {
    let mut outcome = PlanOutcome::default();

    for report in reports.iter().filter(|r| r.compromised) {
        if state.is_pinned(&report.name) {
            outcome.already_pinned.insert(report.name.clone());
            continue;
        }

        let Some(target) = report
            .safe_installed_max
            .as_deref()
            .or(report.last_safe.as_deref())
        else {
            outcome
                .plan
                .warnings
                .push(format!("no safe target known for {}", report.name));
            continue;
        };

        if report.versions.len() > 1 {
            outcome.plan.warnings.push(format!(
                "{} appears at multiple versions ({}); pinning to {target} may break dependents.",
                report.name,
                report.versions.join(", ")
            ));
        }

        outcome
            .plan
            .overrides
            .insert(report.name.clone(), target.to_owned());
        outcome
            .plan
            .resolutions
            .insert(report.name.clone(), target.to_owned());
    }

    outcome
}
