//! 의존성 체인 추적 -- 침해된 패키지에서 프로젝트 루트까지
//!
//! 간선을 뒤집은 역방향 인덱스(자식 -> 부모 집합)를 만든 뒤, 대상 노드에서
//! 부모가 없는 노드(루트)까지 깊이 우선으로 거슬러 올라갑니다.
//!
//! # 종료 보장
//!
//! - 한 번 지나간 `(자식, 부모)` 간선은 다시 지나지 않습니다 (순환 그래프 대응)
//! - 깊이가 `max_depth`를 넘으면 그 경로는 잘린 체인으로 기록하고 멈춥니다
//! - 체인 수가 `max_chains`에 도달하면 탐색을 끝냅니다
//!
//! 최단 경로 탐색이 아닙니다. 체인 길이는 제한될 뿐 최소화되지 않습니다.
//! 재귀 대신 명시적 스택을 사용합니다.

use std::collections::{BTreeMap, BTreeSet, HashSet};
use std::fmt;

use serde::Serialize;

use crate::types::{DependencyEdge, node_key};

/// 자식 노드 키 -> 부모 노드 키 집합
pub type ReverseIndex = BTreeMap<String, BTreeSet<String>>;

/// 루트에서 대상까지의 경로
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct DependencyChain {
    /// 루트 쪽부터 대상까지의 노드 키 (`name@version`)
    pub nodes: Vec<String>,
    /// 첫 노드가 실제 루트(부모 없음)인지. 깊이 제한으로 잘렸으면 false
    pub reaches_root: bool,
}

impl DependencyChain {
    /// 체인의 첫 노드
    pub fn root(&self) -> Option<&str> {
        self.nodes.first().map(String::as_str)
    }

    /// 노드 수
    pub fn len(&self) -> usize {
        self.nodes.len()
    }

    /// 노드가 없는지
    pub fn is_empty(&self) -> bool {
        self.nodes.is_empty()
    }
}

impl fmt::Display for DependencyChain {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if !self.reaches_root {
            write!(f, "... > ")?;
        }
        write!(f, "{}", self.nodes.join(" > "))
    }
}

/// 간선 목록으로 역방향 인덱스를 만듭니다.
///
/// 자식 버전이 미확정인 간선은 특정 노드에 고정할 수 없으므로 제외됩니다.
/// 중복 간선은 집합으로 합쳐집니다.
pub fn build_reverse_index(edges: &[DependencyEdge]) -> ReverseIndex {
    let mut index = ReverseIndex::new();
    for edge in edges {
        let Some(child) = edge.child_key() else {
            continue;
        };
        index.entry(child).or_default().insert(edge.parent_key());
    }
    index
}

struct Frame {
    node: String,
    /// `node`부터 대상까지
    path: Vec<String>,
    depth: usize,
    /// 이 프레임으로 들어온 `(자식, 부모)` 간선
    via: Option<(String, String)>,
}

/// 대상 노드에서 루트까지의 체인을 찾습니다.
///
/// # Arguments
///
/// - `target`: 대상 노드 키 (`name@version`)
/// - `reverse`: [`build_reverse_index`] 결과
/// - `max_chains`: 최대 체인 수 (0이면 빈 결과)
/// - `max_depth`: 대상으로부터의 최대 깊이
pub fn find_chains_to_root(
    target: &str,
    reverse: &ReverseIndex,
    max_chains: usize,
    max_depth: usize,
) -> Vec<DependencyChain> {
    let mut results = Vec::new();
    if max_chains == 0 {
        return results;
    }

    let mut visited: HashSet<(String, String)> = HashSet::new();
    let mut stack = vec![Frame {
        node: target.to_owned(),
        path: vec![target.to_owned()],
        depth: 0,
        via: None,
    }];

    while let Some(frame) = stack.pop() {
        if results.len() >= max_chains {
            break;
        }
        if let Some(edge) = frame.via {
            if !visited.insert(edge) {
                continue;
            }
        }

        if frame.depth > max_depth {
            results.push(DependencyChain {
                nodes: frame.path,
                reaches_root: false,
            });
            continue;
        }

        let parents = reverse.get(&frame.node).filter(|set| !set.is_empty());
        let Some(parents) = parents else {
            results.push(DependencyChain {
                nodes: frame.path,
                reaches_root: true,
            });
            continue;
        };

        for parent in parents.iter().rev() {
            let mut path = Vec::with_capacity(frame.path.len() + 1);
            path.push(parent.clone());
            path.extend(frame.path.iter().cloned());
            stack.push(Frame {
                node: parent.clone(),
                path,
                depth: frame.depth + 1,
                via: Some((frame.node.clone(), parent.clone())),
            });
        }
    }

    results
}

/// 버전별 직접 의존자(부모 노드 키)를 모읍니다.
///
/// 자식 버전이 미확정인 간선은 해당 이름의 모든 버전에 귀속됩니다.
/// `versions`에 없는 버전을 가리키는 간선은 무시됩니다.
pub fn direct_dependents(
    name: &str,
    versions: &[String],
    edges: &[DependencyEdge],
) -> BTreeMap<String, BTreeSet<String>> {
    let mut dependents: BTreeMap<String, BTreeSet<String>> = versions
        .iter()
        .map(|v| (v.clone(), BTreeSet::new()))
        .collect();

    for edge in edges.iter().filter(|e| e.child_name == name) {
        let parent = node_key(&edge.parent_name, &edge.parent_version);
        match &edge.child_version {
            Some(version) => {
                if let Some(set) = dependents.get_mut(version) {
                    set.insert(parent);
                }
            }
            None => {
                for set in dependents.values_mut() {
                    set.insert(parent.clone());
                }
            }
        }
    }

    dependents
}
