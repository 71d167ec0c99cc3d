//! 도메인 타입 -- lockfile 스캐너 전용 데이터 구조
//!
//! 패키지 레코드, 의존성 간선, lockfile 종류 등 파서와 집계기가 주고받는
//! 핵심 타입을 정의합니다.

use std::fmt;

use serde::{Deserialize, Serialize};

/// lockfile 형식
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum LockfileKind {
    /// npm `package-lock.json` / `npm-shrinkwrap.json` (v1, v2, v3)
    Npm,
    /// yarn `yarn.lock` (classic, berry)
    Yarn,
    /// bun `bun.lock` (JSONC 텍스트)
    BunText,
    /// bun `bun.lockb` (바이너리)
    BunBinary,
}

impl fmt::Display for LockfileKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Npm => write!(f, "npm"),
            Self::Yarn => write!(f, "yarn"),
            Self::BunText => write!(f, "bun"),
            Self::BunBinary => write!(f, "bun-binary"),
        }
    }
}

/// lockfile 안에서 관찰된 하나의 패키지 설치본
///
/// 파싱 중에 생성되며 집계기만 소비합니다.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PackageRecord {
    /// 패키지 이름 (scoped 패키지는 `@scope/name`)
    pub name: String,
    /// 설치된 정확한 버전
    pub version: String,
    /// 원본 lockfile 경로
    pub source_file: String,
    /// 설치 위치 힌트 (npm v2 설치 경로, npm v1 `parent>name` 경로)
    pub path_hint: Option<String>,
}

/// "parent가 child에 의존한다" 간선
///
/// `child_version`이 `None`이면 lockfile에서 자식의 정확한 버전을
/// 확정할 수 없었다는 뜻입니다 (예: yarn 범위 지정자).
/// 이런 간선은 특정 버전 노드에 고정되지 않으며, 표시 단계에서
/// 해당 이름의 모든 버전에 귀속됩니다.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct DependencyEdge {
    /// 부모 패키지 이름
    pub parent_name: String,
    /// 부모 패키지 버전
    pub parent_version: String,
    /// 자식 패키지 이름
    pub child_name: String,
    /// 자식 패키지 버전 (미확정이면 None)
    pub child_version: Option<String>,
}

impl DependencyEdge {
    /// 부모 노드 키 (`name@version`)
    pub fn parent_key(&self) -> String {
        node_key(&self.parent_name, &self.parent_version)
    }

    /// 자식 노드 키. 버전이 미확정이면 None
    pub fn child_key(&self) -> Option<String> {
        self.child_version
            .as_deref()
            .map(|v| node_key(&self.child_name, v))
    }
}

/// 단일 lockfile의 파싱 결과
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LockfileContents {
    /// 원본 lockfile 경로
    pub source_file: String,
    /// lockfile 형식
    pub kind: LockfileKind,
    /// 패키지 레코드
    pub packages: Vec<PackageRecord>,
    /// 의존성 간선 (중복 가능)
    pub edges: Vec<DependencyEdge>,
}

impl LockfileContents {
    /// 레코드와 간선이 없는 결과를 생성합니다.
    pub fn empty(source_file: impl Into<String>, kind: LockfileKind) -> Self {
        Self {
            source_file: source_file.into(),
            kind,
            packages: Vec::new(),
            edges: Vec::new(),
        }
    }

    /// 패키지 레코드 수
    pub fn package_count(&self) -> usize {
        self.packages.len()
    }

    /// 이름으로 첫 번째 레코드를 검색합니다.
    pub fn find_package(&self, name: &str) -> Option<&PackageRecord> {
        self.packages.iter().find(|p| p.name == name)
    }
}

impl fmt::Display for LockfileContents {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "LockfileContents({}, {} packages, {} edges, kind={})",
            self.source_file,
            self.packages.len(),
            self.edges.len(),
            self.kind,
        )
    }
}

/// 그래프 노드 키 `name@version`
pub fn node_key(name: &str, version: &str) -> String {
    format!("{name}@{version}")
}

/// 노드 키를 이름과 버전으로 분리합니다.
///
/// scoped 이름의 선두 `@`는 구분자로 취급하지 않습니다.
pub fn split_node_key(key: &str) -> Option<(&str, &str)> {
    let at = key.rfind('@').filter(|&idx| idx > 0)?;
    Some((&key[..at], &key[at + 1..]))
}
