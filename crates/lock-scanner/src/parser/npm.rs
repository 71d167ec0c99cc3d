//! package-lock.json / npm-shrinkwrap.json 파서
//!
//! [`NpmLockParser`]는 두 가지 레이아웃을 처리합니다.
//!
//! - **v2/v3**: 설치 경로를 키로 하는 평면 `packages` 맵
//! - **v1**: 중첩된 `dependencies` 트리 (`packages`가 없을 때)
//!
//! # package-lock.json v3 형식 예시
//!
//! ```json
//! {
//!   "name": "my-app",
//!   "lockfileVersion": 3,
//!   "packages": {
//!     "": { "name": "my-app", "version": "1.0.0", "dependencies": { "debug": "^4.3.1" } },
//!     "node_modules/debug": { "version": "4.4.2", "dependencies": { "ms": "^2.1.3" } },
//!     "node_modules/ms": { "version": "2.1.3" }
//!   }
//! }
//! ```
//!
//! # 자식 버전 해석
//!
//! v2에서 `P/node_modules/C`가 있으면 그 버전을, 없으면 상위 설치 범위를 차례로
//! 거슬러 올라가 마지막으로 최상위 `node_modules/C`를 사용합니다. 끝까지 찾지
//! 못하면 자식 버전은 미확정(None)입니다.

use std::collections::BTreeMap;
use std::path::Path;

use serde::Deserialize;
use tracing::debug;

use crate::error::LockScanError;
use crate::parser::{LockfileParser, decode_utf8};
use crate::types::{DependencyEdge, LockfileContents, LockfileKind, PackageRecord};

const NODE_MODULES: &str = "node_modules/";

/// package-lock.json 파서
pub struct NpmLockParser;

/// package-lock.json 구조 (파싱용)
#[derive(Deserialize)]
struct NpmLockFile {
    #[serde(default, rename = "lockfileVersion")]
    lockfile_version: Option<u32>,
    #[serde(default)]
    packages: Option<BTreeMap<String, NpmPackageEntry>>,
    /// v1 트리. v2 파일에도 호환용으로 남아 있을 수 있으므로 필요할 때만 해석합니다.
    #[serde(default)]
    dependencies: Option<serde_json::Value>,
}

/// v2 `packages` 항목 (파싱용)
#[derive(Deserialize)]
struct NpmPackageEntry {
    #[serde(default)]
    name: Option<String>,
    #[serde(default)]
    version: Option<String>,
    #[serde(default)]
    dependencies: BTreeMap<String, String>,
    #[serde(default, rename = "optionalDependencies")]
    optional_dependencies: BTreeMap<String, String>,
    #[serde(default, rename = "devDependencies")]
    dev_dependencies: BTreeMap<String, String>,
}

impl NpmPackageEntry {
    fn dependency_names(&self) -> impl Iterator<Item = &String> {
        self.dependencies
            .keys()
            .chain(self.optional_dependencies.keys())
            .chain(self.dev_dependencies.keys())
    }
}

/// v1 `dependencies` 트리 노드 (파싱용)
#[derive(Deserialize)]
struct NpmV1Dependency {
    #[serde(default)]
    version: Option<String>,
    #[serde(default)]
    requires: BTreeMap<String, String>,
    #[serde(default)]
    dependencies: BTreeMap<String, NpmV1Dependency>,
}

impl LockfileParser for NpmLockParser {
    fn kind(&self) -> LockfileKind {
        LockfileKind::Npm
    }

    fn can_parse(&self, path: &Path) -> bool {
        path.file_name()
            .and_then(|n| n.to_str())
            .is_some_and(|name| name == "package-lock.json" || name == "npm-shrinkwrap.json")
    }

    fn parse(
        &self,
        content: &[u8],
        source_path: &str,
    ) -> Result<LockfileContents, LockScanError> {
        let text = decode_utf8(content, source_path)?;
        let lock_file: NpmLockFile =
            serde_json::from_str(text).map_err(|e| LockScanError::LockfileParse {
                path: source_path.to_owned(),
                reason: e.to_string(),
            })?;

        debug!(
            path = source_path,
            lockfile_version = ?lock_file.lockfile_version,
            "parsing npm lockfile"
        );

        if let Some(packages) = &lock_file.packages {
            return Ok(parse_packages(packages, source_path));
        }

        let tree: BTreeMap<String, NpmV1Dependency> = match lock_file.dependencies {
            Some(value) => {
                serde_json::from_value(value).map_err(|e| LockScanError::LockfileParse {
                    path: source_path.to_owned(),
                    reason: format!("invalid v1 dependencies tree: {e}"),
                })?
            }
            None => BTreeMap::new(),
        };

        Ok(parse_v1_tree(&tree, source_path))
    }
}

/// v2/v3 평면 맵을 레코드와 간선으로 변환합니다.
fn parse_packages(
    packages: &BTreeMap<String, NpmPackageEntry>,
    source_path: &str,
) -> LockfileContents {
    let mut contents = LockfileContents::empty(source_path, LockfileKind::Npm);

    for (path, entry) in packages {
        // 루트 항목("")은 프로젝트 자체이므로 레코드를 만들지 않음
        if path.is_empty() {
            continue;
        }
        let Some(version) = &entry.version else {
            continue;
        };
        let Some(name) = entry_name(path, entry) else {
            continue;
        };

        contents.packages.push(PackageRecord {
            name,
            version: version.clone(),
            source_file: source_path.to_owned(),
            path_hint: Some(path.clone()),
        });
    }

    for (path, entry) in packages {
        let Some(version) = &entry.version else {
            continue;
        };
        let name = if path.is_empty() {
            entry.name.clone()
        } else {
            entry_name(path, entry)
        };
        let Some(name) = name else {
            continue;
        };

        for child in entry.dependency_names() {
            contents.edges.push(DependencyEdge {
                parent_name: name.clone(),
                parent_version: version.clone(),
                child_name: child.clone(),
                child_version: resolve_child_version(packages, path, child),
            });
        }
    }

    contents
}

fn entry_name(path: &str, entry: &NpmPackageEntry) -> Option<String> {
    entry
        .name
        .clone()
        .or_else(|| name_from_install_path(path).map(str::to_owned))
}

/// 설치 경로의 마지막 `node_modules/` 뒤 부분에서 패키지명을 추출합니다.
///
/// `node_modules/` 세그먼트가 없는 경로(워크스페이스 디렉토리 등)는 None
pub(crate) fn name_from_install_path(path: &str) -> Option<&str> {
    let pos = path.rfind(NODE_MODULES)?;
    let after = &path[pos + NODE_MODULES.len()..];
    if after.is_empty() {
        return None;
    }

    let segments = if after.starts_with('@') { 2 } else { 1 };
    let end = after
        .match_indices('/')
        .nth(segments - 1)
        .map_or(after.len(), |(idx, _)| idx);
    Some(&after[..end])
}

/// 부모 설치 경로에서 시작해 바깥 범위로 올라가며 자식의 버전을 찾습니다.
fn resolve_child_version(
    packages: &BTreeMap<String, NpmPackageEntry>,
    parent_path: &str,
    child: &str,
) -> Option<String> {
    let mut scope = parent_path.trim_end_matches('/');
    loop {
        let candidate = if scope.is_empty() {
            format!("{NODE_MODULES}{child}")
        } else {
            format!("{scope}/{NODE_MODULES}{child}")
        };
        if let Some(entry) = packages.get(&candidate) {
            return entry.version.clone();
        }
        if scope.is_empty() {
            return None;
        }
        scope = enclosing_scope(scope);
    }
}

/// `a/node_modules/b/node_modules/c` -> `a/node_modules/b`, `node_modules/a` -> ``
fn enclosing_scope(scope: &str) -> &str {
    scope
        .rfind(&format!("/{NODE_MODULES}"))
        .map_or("", |idx| &scope[..idx])
}

/// v1 트리 탐색용 스택 프레임
struct V1Frame<'a> {
    name: &'a str,
    node: &'a NpmV1Dependency,
    breadcrumb: String,
    /// 바깥쪽부터 안쪽 순서의 `dependencies` 범위
    scopes: Vec<&'a BTreeMap<String, NpmV1Dependency>>,
}

/// v1 중첩 트리를 명시적 스택으로 순회합니다.
fn parse_v1_tree(tree: &BTreeMap<String, NpmV1Dependency>, source_path: &str) -> LockfileContents {
    let mut contents = LockfileContents::empty(source_path, LockfileKind::Npm);

    let mut stack: Vec<V1Frame<'_>> = tree
        .iter()
        .rev()
        .map(|(name, node)| V1Frame {
            name,
            node,
            breadcrumb: name.clone(),
            scopes: vec![tree],
        })
        .collect();

    while let Some(frame) = stack.pop() {
        let mut own_scopes = frame.scopes.clone();
        if !frame.node.dependencies.is_empty() {
            own_scopes.push(&frame.node.dependencies);
        }

        if let Some(version) = &frame.node.version {
            contents.packages.push(PackageRecord {
                name: frame.name.to_owned(),
                version: version.clone(),
                source_file: source_path.to_owned(),
                path_hint: Some(frame.breadcrumb.clone()),
            });

            for (child_name, child) in &frame.node.dependencies {
                contents.edges.push(DependencyEdge {
                    parent_name: frame.name.to_owned(),
                    parent_version: version.clone(),
                    child_name: child_name.clone(),
                    child_version: child.version.clone(),
                });
            }

            for required in frame.node.requires.keys() {
                if frame.node.dependencies.contains_key(required) {
                    continue;
                }
                let child_version = frame
                    .scopes
                    .iter()
                    .rev()
                    .find_map(|scope| scope.get(required))
                    .and_then(|dep| dep.version.clone());
                contents.edges.push(DependencyEdge {
                    parent_name: frame.name.to_owned(),
                    parent_version: version.clone(),
                    child_name: required.clone(),
                    child_version,
                });
            }
        }

        for (child_name, child) in frame.node.dependencies.iter().rev() {
            stack.push(V1Frame {
                name: child_name,
                node: child,
                breadcrumb: format!("{}>{child_name}", frame.breadcrumb),
                scopes: own_scopes.clone(),
            });
        }
    }

    contents
}
