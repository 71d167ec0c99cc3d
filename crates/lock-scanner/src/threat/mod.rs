//! 위협 분류 -- 설치 버전을 위협 DB와 대조
//!
//! 버전 상태는 다음 순서로 결정됩니다.
//!
//! 1. 엔트리의 `badRanges` 중 하나라도 만족하면 **compromised**
//! 2. `lastSafe`가 있고 버전이 그 이하이면 **safe**
//! 3. 그 외에는 **unknown**
//!
//! 침해 판정이 항상 먼저입니다. `lastSafe` 이하인 버전이 나쁜 범위에도 걸리면
//! compromised로 분류됩니다.

pub mod db;

use std::cmp::Ordering;
use std::collections::HashMap;
use std::fmt;

use serde::Serialize;

use crate::graph::AggregateIndex;
use crate::version;

pub use db::{ThreatDb, ThreatEntry, build_threat_index};

/// 단일 버전의 분류 결과
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum VersionStatus {
    /// 마지막 안전 버전 이하
    Safe,
    /// 나쁜 범위에 해당
    Compromised,
    /// 판단 불가
    Unknown,
}

impl fmt::Display for VersionStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Safe => write!(f, "safe"),
            Self::Compromised => write!(f, "compromised"),
            Self::Unknown => write!(f, "unknown"),
        }
    }
}

/// 버전과 그 상태
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct VersionVerdict {
    /// 설치 버전
    pub version: String,
    /// 분류 결과
    pub status: VersionStatus,
}

/// 패키지 이름 하나에 대한 분류 보고서
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct PackageReport {
    /// 패키지 이름
    pub name: String,
    /// 설치 버전 (오름차순)
    pub versions: Vec<String>,
    /// 버전별 상태 (`versions`와 같은 순서)
    pub statuses: Vec<VersionVerdict>,
    /// 침해된 버전이 하나라도 있는지
    pub compromised: bool,
    /// 위협 DB의 마지막 안전 버전
    #[serde(skip_serializing_if = "Option::is_none")]
    pub last_safe: Option<String>,
    /// 설치된 버전 중 safe로 분류된 가장 큰 버전
    #[serde(skip_serializing_if = "Option::is_none")]
    pub safe_installed_max: Option<String>,
}

impl PackageReport {
    /// 주어진 상태의 버전 목록
    pub fn versions_with(&self, status: VersionStatus) -> impl Iterator<Item = &str> {
        self.statuses
            .iter()
            .filter(move |v| v.status == status)
            .map(|v| v.version.as_str())
    }

    /// 침해된 버전 목록
    pub fn compromised_versions(&self) -> Vec<&str> {
        self.versions_with(VersionStatus::Compromised).collect()
    }
}

/// 버전 하나의 상태를 판정합니다. 엔트리가 없으면 unknown
pub fn version_status(version: &str, entry: Option<&ThreatEntry>) -> VersionStatus {
    let Some(entry) = entry else {
        return VersionStatus::Unknown;
    };

    if entry
        .bad_ranges
        .iter()
        .any(|range| version::satisfies(version, range))
    {
        return VersionStatus::Compromised;
    }

    match entry.last_safe() {
        Some(last_safe) if version::compare(version, last_safe) != Ordering::Greater => {
            VersionStatus::Safe
        }
        _ => VersionStatus::Unknown,
    }
}

/// 버전이 만족하는 나쁜 범위 목록
pub fn matching_ranges<'a>(version: &str, entry: &'a ThreatEntry) -> Vec<&'a str> {
    entry
        .bad_ranges
        .iter()
        .filter(|range| version::satisfies(version, range))
        .map(String::as_str)
        .collect()
}

/// 위협 목록에 대한 분류기
///
/// 이름이 중복된 엔트리는 마지막 것이 사용됩니다.
pub struct ThreatClassifier<'a> {
    index: HashMap<String, &'a ThreatEntry>,
}

impl<'a> ThreatClassifier<'a> {
    /// 엔트리 목록으로 분류기를 생성합니다.
    pub fn new(threats: &'a [ThreatEntry]) -> Self {
        Self {
            index: build_threat_index(threats),
        }
    }

    /// 이름에 해당하는 엔트리
    pub fn entry(&self, name: &str) -> Option<&'a ThreatEntry> {
        self.index.get(name).copied()
    }

    /// `name@version`의 상태
    pub fn version_status(&self, name: &str, version: &str) -> VersionStatus {
        version_status(version, self.entry(name))
    }

    /// `name@version`이 만족하는 나쁜 범위
    pub fn matching_ranges(&self, name: &str, version: &str) -> Vec<&'a str> {
        self.entry(name)
            .map(|entry| matching_ranges(version, entry))
            .unwrap_or_default()
    }

    /// 이름 하나를 분류합니다.
    pub fn report(&self, name: &str, versions: impl IntoIterator<Item = String>) -> PackageReport {
        let entry = self.entry(name);

        let mut versions: Vec<String> = versions.into_iter().collect();
        version::sort_versions(&mut versions);
        versions.dedup();

        let statuses: Vec<VersionVerdict> = versions
            .iter()
            .map(|v| VersionVerdict {
                version: v.clone(),
                status: version_status(v, entry),
            })
            .collect();

        let compromised = statuses
            .iter()
            .any(|v| v.status == VersionStatus::Compromised);
        let safe_installed_max = version::max_version(
            statuses
                .iter()
                .filter(|v| v.status == VersionStatus::Safe)
                .map(|v| v.version.as_str()),
        )
        .map(str::to_owned);

        PackageReport {
            name: name.to_owned(),
            versions,
            statuses,
            compromised,
            last_safe: entry.and_then(ThreatEntry::last_safe).map(str::to_owned),
            safe_installed_max,
        }
    }

    /// 집계 인덱스의 모든 이름을 분류합니다. 결과는 이름 오름차순입니다.
    pub fn classify(&self, index: &AggregateIndex) -> Vec<PackageReport> {
        let mut reports: Vec<PackageReport> = index
            .iter()
            .map(|(name, versions)| self.report(name, versions.iter().cloned()))
            .collect();
        reports.sort_by(|a, b| a.name.cmp(&b.name));
        reports
    }
}

/// 집계 인덱스를 위협 목록과 대조합니다.
///
/// 위협 DB 엔트리마다가 아니라 인덱스에 실제로 있는 이름마다 보고서 하나를 만듭니다.
pub fn classify(index: &AggregateIndex, threats: &[ThreatEntry]) -> Vec<PackageReport> {
    ThreatClassifier::new(threats).classify(index)
}
