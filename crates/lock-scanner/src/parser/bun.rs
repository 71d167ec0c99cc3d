//! bun.lock 파서 (JSONC 텍스트)
//!
//! `packages` 맵의 각 값은 배열입니다.
//!
//! ```text
//! "packages": {
//!   "debug": ["debug@4.4.2", "", { "dependencies": { "ms": "^2.1.3" } }, "sha512-..."],
//!   "debug/ms": ["ms@2.1.2", "", {}, "sha512-..."],
//! }
//! ```
//!
//! 원소 0은 `name@version` 식별자, 원소 2는 의존성 그룹을 담은 메타데이터입니다.
//! 중첩 설치는 `parent/child` 키로 표현됩니다.

use std::path::Path;

use serde_json::{Map, Value};

use crate::error::LockScanError;
use crate::parser::{
    DEPENDENCY_GROUPS, LockfileParser, decode_utf8, exact_version_from_specifier, jsonc,
};
use crate::types::{DependencyEdge, LockfileContents, LockfileKind, PackageRecord};

/// bun.lock 파서
pub struct BunLockParser;

impl LockfileParser for BunLockParser {
    fn kind(&self) -> LockfileKind {
        LockfileKind::BunText
    }

    fn can_parse(&self, path: &Path) -> bool {
        path.file_name()
            .and_then(|n| n.to_str())
            .is_some_and(|name| name == "bun.lock")
    }

    fn parse(
        &self,
        content: &[u8],
        source_path: &str,
    ) -> Result<LockfileContents, LockScanError> {
        let text = decode_utf8(content, source_path)?;
        let doc = jsonc::parse(text).map_err(|e| LockScanError::LockfileParse {
            path: source_path.to_owned(),
            reason: e.to_string(),
        })?;

        let mut contents = LockfileContents::empty(source_path, LockfileKind::BunText);
        let Some(packages) = doc.get("packages").and_then(Value::as_object) else {
            return Ok(contents);
        };

        for (key, entry) in packages {
            let Some((name, version)) = entry_identity(key, entry) else {
                continue;
            };
            // 워크스페이스, 링크 등 레지스트리 버전이 아닌 항목은 레코드에서 제외
            if !version.starts_with(|c: char| c.is_ascii_digit()) {
                continue;
            }
            contents.packages.push(PackageRecord {
                name,
                version,
                source_file: source_path.to_owned(),
                path_hint: Some(key.clone()),
            });
        }

        for (key, entry) in packages {
            let Some((parent_name, parent_version)) = entry_identity(key, entry) else {
                continue;
            };
            let Some(meta) = entry.get(2).and_then(Value::as_object) else {
                continue;
            };

            for group in DEPENDENCY_GROUPS {
                let Some(deps) = meta.get(group).and_then(Value::as_object) else {
                    continue;
                };
                for (child_name, spec) in deps {
                    let child_version = resolve_child_version(packages, key, child_name)
                        .or_else(|| spec.as_str().and_then(exact_version_from_specifier));
                    contents.edges.push(DependencyEdge {
                        parent_name: parent_name.clone(),
                        parent_version: parent_version.clone(),
                        child_name: child_name.clone(),
                        child_version,
                    });
                }
            }
        }

        Ok(contents)
    }
}

/// 항목의 원소 0 (`name@version`)에서 이름과 버전을 얻습니다.
///
/// 이름 부분이 비어 있으면 맵 키를 이름으로 사용합니다.
fn entry_identity(key: &str, entry: &Value) -> Option<(String, String)> {
    let spec = entry.get(0)?.as_str()?;
    let at = spec.rfind('@').filter(|&idx| idx > 0)?;
    let version = &spec[at + 1..];
    let version = version.strip_prefix("npm:").unwrap_or(version);
    if version.is_empty() {
        return None;
    }

    let name = &spec[..at];
    let name = if name.is_empty() { key } else { name };
    Some((name.to_owned(), version.to_owned()))
}

/// 중첩 키 `parent/child`를 먼저, 다음으로 최상위 `child` 키를 찾습니다.
fn resolve_child_version(
    packages: &Map<String, Value>,
    parent_key: &str,
    child_name: &str,
) -> Option<String> {
    let nested = format!("{parent_key}/{child_name}");
    [nested.as_str(), child_name]
        .into_iter()
        .find_map(|key| packages.get(key).map(|entry| (key, entry)))
        .and_then(|(key, entry)| entry_identity(key, entry))
        .map(|(_, version)| version)
}

#[cfg(test)]
mod tests {
    use super::*;

    const SAMPLE: &str = r#"{
  "lockfileVersion": 1,
  "workspaces": {
    "": {
      "name": "my-app",
      "dependencies": { "debug": "^4.3.1" },
    },
  },
  "packages": {
    // registry packages
    "debug": ["debug@4.4.2", "", { "dependencies": { "ms": "^2.1.3" } }, "sha512-a"],
    "ms": ["ms@2.1.3", "", {}, "sha512-b"],
    "chalk": ["chalk@5.3.0", "", { "optionalDependencies": { "ms": "2.1.2" } }, "sha512-c"],
    "chalk/ms": ["ms@2.1.2", "", {}, "sha512-d"],
    "@ctrl/tinycolor": ["@ctrl/tinycolor@4.1.1", "", {}, "sha512-e"],
    "local": ["local@workspace:packages/local", { "dependencies": { "debug": "^4.0.0" } }],
    "aliased": ["aliased@npm:1.0.0", "", { "devDependencies": { "ghost": "^1.0.0", "pinned": "3.0.0" } }, "sha512-f"],
  },
}"#;

    fn parse(text: &str) -> LockfileContents {
        BunLockParser.parse(text.as_bytes(), "bun.lock").unwrap()
    }

    fn child_version(contents: &LockfileContents, parent: &str, child: &str) -> Option<String> {
        contents
            .edges
            .iter()
            .find(|e| e.parent_name == parent && e.child_name == child)
            .and_then(|e| e.child_version.clone())
    }

    #[test]
    fn can_parse_bun_lock() {
        assert!(BunLockParser.can_parse(Path::new("bun.lock")));
        assert!(!BunLockParser.can_parse(Path::new("bun.lockb")));
    }

    #[test]
    fn records_exclude_non_registry_versions() {
        let contents = parse(SAMPLE);
        assert_eq!(contents.kind, LockfileKind::BunText);
        assert_eq!(contents.package_count(), 6);
        assert!(contents.find_package("local").is_none());
        assert_eq!(
            contents.find_package("@ctrl/tinycolor").unwrap().version,
            "4.1.1"
        );
        assert_eq!(contents.find_package("aliased").unwrap().version, "1.0.0");
    }

    #[test]
    fn nested_entry_named_from_element_zero() {
        let contents = parse(SAMPLE);
        let nested = contents
            .packages
            .iter()
            .find(|p| p.path_hint.as_deref() == Some("chalk/ms"))
            .unwrap();
        assert_eq!(nested.name, "ms");
        assert_eq!(nested.version, "2.1.2");
    }

    #[test]
    fn child_version_from_packages_lookup() {
        let contents = parse(SAMPLE);
        assert_eq!(child_version(&contents, "debug", "ms").as_deref(), Some("2.1.3"));
        // 중첩 설치가 최상위보다 우선
        assert_eq!(child_version(&contents, "chalk", "ms").as_deref(), Some("2.1.2"));
    }

    #[test]
    fn child_version_falls_back_to_exact_specifier() {
        let contents = parse(SAMPLE);
        assert_eq!(
            child_version(&contents, "aliased", "pinned").as_deref(),
            Some("3.0.0")
        );
        let ghost = contents
            .edges
            .iter()
            .find(|e| e.child_name == "ghost")
            .unwrap();
        assert!(ghost.child_version.is_none());
    }

    #[test]
    fn workspace_entries_stay_edge_endpoints() {
        let contents = parse(SAMPLE);
        // 원소 2가 없는 항목은 간선을 만들지 않음
        assert!(!contents.edges.iter().any(|e| e.parent_name == "local"));
    }

    #[test]
    fn missing_packages_is_empty() {
        let contents = parse(r#"{ "lockfileVersion": 1 }"#);
        assert_eq!(contents.package_count(), 0);
    }

    #[test]
    fn invalid_jsonc_is_an_error() {
        let result = BunLockParser.parse(b"{ \"packages\": ", "bun.lock");
        assert!(result.is_err());
        let lenient = BunLockParser.parse_lenient(b"{ \"packages\": ", "bun.lock");
        assert_eq!(lenient.package_count(), 0);
    }

    #[test]
    fn entry_identity_variants() {
        let value: Value = serde_json::json!(["@scope/x@npm:2.0.0"]);
        assert_eq!(
            entry_identity("k", &value),
            Some(("@scope/x".to_owned(), "2.0.0".to_owned()))
        );
        assert_eq!(entry_identity("k", &serde_json::json!(["noversion@"])), None);
        assert_eq!(entry_identity("k", &serde_json::json!({ "a": 1 })), None);
    }
}
