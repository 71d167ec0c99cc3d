//! 그래프 집계 -- 여러 lockfile의 레코드와 간선 합치기
//!
//! 한 프로젝트에 여러 lockfile이 공존할 수 있습니다 (예: 오래된 `yarn.lock` 옆의
//! `bun.lock`). [`GraphAggregator`]는 모든 파싱 결과를 모아
//! 이름 -> 버전 집합 인덱스와 평탄화된 간선 목록을 만듭니다.
//!
//! 간선은 중복될 수 있습니다. 역방향 인덱스를 만들 때 중복이 제거됩니다.

use std::collections::{BTreeMap, BTreeSet};

use serde::Serialize;

use crate::types::{DependencyEdge, LockfileContents, LockfileKind};
use crate::version;

/// 패키지 이름 -> 관찰된 버전 집합
///
/// 집합 내부 순서는 의미가 없습니다. 표시할 때는 [`version::sort_versions`]로 정렬합니다.
pub type AggregateIndex = BTreeMap<String, BTreeSet<String>>;

/// 집계에 기여한 lockfile 요약
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct LockfileSummary {
    /// lockfile 경로
    pub path: String,
    /// lockfile 형식
    pub kind: LockfileKind,
    /// 패키지 레코드 수
    pub packages: usize,
    /// 간선 수
    pub edges: usize,
}

/// 집계된 의존성 그래프
#[derive(Debug, Clone, Default)]
pub struct DependencyGraph {
    /// 이름 -> 버전 집합
    pub index: AggregateIndex,
    /// 모든 lockfile의 간선 (중복 가능)
    pub edges: Vec<DependencyEdge>,
    /// 집계 순서대로의 lockfile 요약
    pub sources: Vec<LockfileSummary>,
}

impl DependencyGraph {
    /// 서로 다른 패키지 이름 수
    pub fn package_count(&self) -> usize {
        self.index.len()
    }

    /// 이름의 설치 버전을 오름차순으로 반환합니다.
    pub fn versions_of(&self, name: &str) -> Vec<String> {
        let mut versions: Vec<String> = self
            .index
            .get(name)
            .map(|set| set.iter().cloned().collect())
            .unwrap_or_default();
        version::sort_versions(&mut versions);
        versions
    }

    /// `name@version`이 관찰되었는지 확인합니다.
    pub fn contains(&self, name: &str, version: &str) -> bool {
        self.index
            .get(name)
            .is_some_and(|set| set.contains(version))
    }
}

/// lockfile 파싱 결과를 하나의 그래프로 합칩니다.
#[derive(Default)]
pub struct GraphAggregator {
    graph: DependencyGraph,
}

impl GraphAggregator {
    /// 빈 집계기를 생성합니다.
    pub fn new() -> Self {
        Self::default()
    }

    /// 파싱 결과 하나를 추가합니다.
    pub fn add(&mut self, contents: LockfileContents) {
        self.graph.sources.push(LockfileSummary {
            path: contents.source_file.clone(),
            kind: contents.kind,
            packages: contents.packages.len(),
            edges: contents.edges.len(),
        });

        for record in contents.packages {
            self.graph
                .index
                .entry(record.name)
                .or_default()
                .insert(record.version);
        }
        self.graph.edges.extend(contents.edges);
    }

    /// 집계를 끝내고 그래프를 반환합니다.
    pub fn finish(self) -> DependencyGraph {
        self.graph
    }
}

/// 여러 파싱 결과를 한 번에 집계합니다.
pub fn aggregate<I>(contents: I) -> DependencyGraph
where
    I: IntoIterator<Item = LockfileContents>,
{
    let mut aggregator = GraphAggregator::new();
    for item in contents {
        aggregator.add(item);
    }
    aggregator.finish()
}
