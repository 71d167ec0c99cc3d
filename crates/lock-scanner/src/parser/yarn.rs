//! yarn.lock 파서 -- classic (v1) 및 berry (v2+)
//!
//! 줄 단위 상태 기계로 한 번에 레코드와 간선을 모두 만듭니다.
//!
//! # 블록 구조
//!
//! ```text
//! "debug@^4.3.1", debug@^4.4.0:       <- 헤더 (들여쓰기 없음, ':'로 끝남)
//!   version "4.4.2"                   <- classic: `key value`
//!   resolution: "debug@npm:4.4.2"     <- berry: `key: value`
//!   dependencies:
//!     ms "^2.1.3"                     <- 4칸 이상 들여쓰기
//! ```
//!
//! 블록이 끝날 때(다음 헤더 또는 파일 끝) 이름과 버전이 모두 있으면
//! 레코드와 간선을 내보냅니다.

use std::path::Path;

use crate::error::LockScanError;
use crate::parser::{DEPENDENCY_GROUPS, LockfileParser, decode_utf8, exact_version_from_specifier};
use crate::types::{DependencyEdge, LockfileContents, LockfileKind, PackageRecord};

/// yarn 의존성 지정자에 쓰이는 프로토콜
const PROTOCOLS: [&str; 12] = [
    "npm:",
    "patch:",
    "workspace:",
    "link:",
    "file:",
    "http:",
    "https:",
    "git:",
    "github:",
    "gitlab:",
    "portal:",
    "exec:",
];

/// yarn.lock 파서
pub struct YarnLockParser;

impl LockfileParser for YarnLockParser {
    fn kind(&self) -> LockfileKind {
        LockfileKind::Yarn
    }

    fn can_parse(&self, path: &Path) -> bool {
        path.file_name()
            .and_then(|n| n.to_str())
            .is_some_and(|name| name == "yarn.lock")
    }

    fn parse(
        &self,
        content: &[u8],
        source_path: &str,
    ) -> Result<LockfileContents, LockScanError> {
        let text = decode_utf8(content, source_path)?;
        Ok(parse_yarn_text(text, source_path, LockfileKind::Yarn))
    }
}

/// 현재 처리 중인 블록
#[derive(Default)]
struct YarnBlock {
    specifiers: Vec<String>,
    version: Option<String>,
    resolution: Option<String>,
    dependencies: Vec<(String, String)>,
    in_dependency_group: bool,
}

impl YarnBlock {
    fn name(&self) -> Option<String> {
        self.resolution
            .as_deref()
            .and_then(name_from_resolution)
            .or_else(|| self.specifiers.first().and_then(|s| name_from_specifier(s)))
            .map(str::to_owned)
    }

    fn flush_into(self, contents: &mut LockfileContents, source_path: &str) {
        let (Some(name), Some(version)) = (self.name(), self.version.clone()) else {
            return;
        };

        for (child_name, spec) in self.dependencies {
            contents.edges.push(DependencyEdge {
                parent_name: name.clone(),
                parent_version: version.clone(),
                child_name,
                child_version: exact_version_from_specifier(&spec),
            });
        }

        contents.packages.push(PackageRecord {
            name,
            version,
            source_file: source_path.to_owned(),
            path_hint: None,
        });
    }
}

/// yarn.lock 형식의 텍스트를 파싱합니다.
///
/// `bun.lockb` 디코더의 출력도 같은 형식이므로 `kind`로 결과의 형식을 지정합니다.
pub fn parse_yarn_text(text: &str, source_path: &str, kind: LockfileKind) -> LockfileContents {
    let mut contents = LockfileContents::empty(source_path, kind);
    let mut block: Option<YarnBlock> = None;

    for line in text.lines() {
        let trimmed = line.trim();
        if trimmed.is_empty() || trimmed.starts_with('#') {
            continue;
        }

        let indent = line.len() - line.trim_start().len();

        if indent == 0 {
            if let Some(head) = trimmed.strip_suffix(':') {
                if let Some(done) = block.take() {
                    done.flush_into(&mut contents, source_path);
                }
                let specifiers = split_specifiers(head);
                // `__metadata:` 처럼 패키지가 아닌 헤더는 블록을 열지 않음
                if specifiers.iter().any(|s| name_from_specifier(s).is_some()) {
                    block = Some(YarnBlock {
                        specifiers,
                        ..YarnBlock::default()
                    });
                }
            }
            continue;
        }

        let Some(current) = block.as_mut() else {
            continue;
        };

        if indent >= 4 {
            if current.in_dependency_group {
                if let Some(dep) = parse_dependency_line(trimmed) {
                    current.dependencies.push(dep);
                }
            }
            continue;
        }

        current.in_dependency_group = false;
        if let Some(group) = trimmed.strip_suffix(':').map(str::trim_end) {
            if DEPENDENCY_GROUPS.contains(&group) {
                current.in_dependency_group = true;
                continue;
            }
        }
        if let Some(version) = field_value(trimmed, "version") {
            current.version = Some(version);
        } else if let Some(resolution) = field_value(trimmed, "resolution") {
            current.resolution = Some(resolution);
        }
    }

    if let Some(done) = block.take() {
        done.flush_into(&mut contents, source_path);
    }

    contents
}

/// 헤더를 따옴표 밖의 쉼표로 나눕니다.
fn split_specifiers(head: &str) -> Vec<String> {
    let mut specifiers = Vec::new();
    let mut current = String::new();
    let mut in_quotes = false;

    for c in head.chars() {
        match c {
            '"' => {
                in_quotes = !in_quotes;
                current.push(c);
            }
            ',' if !in_quotes => {
                specifiers.push(current.trim().to_owned());
                current.clear();
            }
            _ => current.push(c),
        }
    }
    if !current.trim().is_empty() {
        specifiers.push(current.trim().to_owned());
    }

    specifiers.retain(|s| !s.is_empty());
    specifiers
}

fn unquote(s: &str) -> &str {
    let s = s.trim();
    for quote in ['"', '\''] {
        if s.len() >= 2 && s.starts_with(quote) && s.ends_with(quote) {
            return &s[1..s.len() - 1];
        }
    }
    s
}

/// `name@range`, `@scope/name@npm:1.0.0` 형태의 지정자에서 패키지명을 추출합니다.
fn name_from_specifier(spec: &str) -> Option<&str> {
    let s = unquote(spec);

    let protocol_at = s
        .match_indices('@')
        .map(|(idx, _)| idx)
        .find(|&idx| idx > 0 && PROTOCOLS.iter().any(|p| s[idx + 1..].starts_with(p)));
    if let Some(idx) = protocol_at {
        return Some(&s[..idx]);
    }

    if let Some(rest) = s.strip_prefix('@') {
        let second = rest.find('@')? + 1;
        return (second > 1).then(|| &s[..second]);
    }

    let at = s.rfind('@').filter(|&idx| idx > 0)?;
    Some(&s[..at])
}

/// `debug@npm:4.4.2` -> `debug`
fn name_from_resolution(resolution: &str) -> Option<&str> {
    let idx = resolution.get(1..)?.find('@')? + 1;
    Some(&resolution[..idx])
}

/// `version "1.0.0"` 또는 `version: 1.0.0` 에서 값을 꺼냅니다.
fn field_value(line: &str, key: &str) -> Option<String> {
    let rest = line.strip_prefix(key)?;
    if !rest.starts_with(|c: char| c == ':' || c.is_whitespace()) {
        return None;
    }
    let value = unquote(rest.trim_start_matches(':').trim());
    (!value.is_empty()).then(|| value.to_owned())
}

/// 의존성 줄 `name "spec"` 또는 `name: spec`
fn parse_dependency_line(line: &str) -> Option<(String, String)> {
    let (name, rest) = if let Some(quoted) = line.strip_prefix('"') {
        let end = quoted.find('"')?;
        (&quoted[..end], &quoted[end + 1..])
    } else {
        let end = line.find(|c: char| c.is_whitespace() || c == ':')?;
        (&line[..end], &line[end..])
    };

    let spec = unquote(rest.trim_start().trim_start_matches(':').trim());
    if name.is_empty() || spec.is_empty() {
        return None;
    }
    Some((name.to_owned(), spec.to_owned()))
}

#[cfg(test)]
mod tests {
    use super::*;

    const CLASSIC: &str = r#"# THIS IS AN AUTOGENERATED FILE. DO NOT EDIT THIS FILE DIRECTLY.
# yarn lockfile v1


"@babel/code-frame@^7.0.0", "@babel/code-frame@^7.10.4":
  version "7.22.13"
  resolved "https://registry.yarnpkg.com/@babel/code-frame/-/code-frame-7.22.13.tgz"
  dependencies:
    "@babel/highlight" "^7.22.13"
    chalk "^2.4.2"

debug@^4.3.1, debug@^4.4.0:
  version "4.4.2"
  resolved "https://registry.yarnpkg.com/debug/-/debug-4.4.2.tgz"
  dependencies:
    ms "2.1.3"

ms@2.1.3:
  version "2.1.3"
"#;

    const BERRY: &str = r#"# This file is generated by running "yarn install" inside your project.

__metadata:
  version: 8
  cacheKey: 10c0

"chalk@npm:^5.0.0":
  version: 5.3.0
  resolution: "chalk@npm:5.3.0"
  checksum: 10c0/abc
  languageName: node
  linkType: hard

"debug@npm:^4.3.1":
  version: 4.4.2
  resolution: "debug@npm:4.4.2"
  dependencies:
    ms: "npm:^2.1.3"
  peerDependenciesMeta:
    supports-color:
      optional: true
  languageName: node

"my-app@workspace:.":
  version: 0.0.0-use.local
  resolution: "my-app@workspace:."
  dependencies:
    chalk: "npm:5.3.0"
    debug: "npm:^4.3.1"
  languageName: unknown
"#;

    fn parse(text: &str) -> LockfileContents {
        YarnLockParser.parse(text.as_bytes(), "yarn.lock").unwrap()
    }

    #[test]
    fn can_parse_yarn_lock() {
        assert!(YarnLockParser.can_parse(Path::new("/p/yarn.lock")));
        assert!(!YarnLockParser.can_parse(Path::new("/p/package-lock.json")));
    }

    #[test]
    fn classic_records() {
        let contents = parse(CLASSIC);
        assert_eq!(contents.kind, LockfileKind::Yarn);
        assert_eq!(contents.package_count(), 3);
        assert_eq!(
            contents.find_package("@babel/code-frame").unwrap().version,
            "7.22.13"
        );
        assert_eq!(contents.find_package("debug").unwrap().version, "4.4.2");
    }

    #[test]
    fn classic_edges_resolve_exact_versions_only() {
        let contents = parse(CLASSIC);
        let to_ms = contents
            .edges
            .iter()
            .find(|e| e.parent_name == "debug" && e.child_name == "ms")
            .unwrap();
        assert_eq!(to_ms.parent_version, "4.4.2");
        assert_eq!(to_ms.child_version.as_deref(), Some("2.1.3"));

        let to_chalk = contents
            .edges
            .iter()
            .find(|e| e.child_name == "chalk")
            .unwrap();
        assert!(to_chalk.child_version.is_none());

        // 따옴표로 감싼 scoped 이름은 따옴표 없이 기록됨
        assert!(contents.edges.iter().any(|e| e.child_name == "@babel/highlight"));
    }

    #[test]
    fn berry_records_skip_metadata() {
        let contents = parse(BERRY);
        assert!(contents.find_package("__metadata").is_none());
        assert_eq!(contents.find_package("chalk").unwrap().version, "5.3.0");
        assert_eq!(contents.find_package("debug").unwrap().version, "4.4.2");
        assert_eq!(
            contents.find_package("my-app").unwrap().version,
            "0.0.0-use.local"
        );
    }

    #[test]
    fn berry_dependency_lines_use_colon_syntax() {
        let contents = parse(BERRY);
        let app_edges: Vec<_> = contents
            .edges
            .iter()
            .filter(|e| e.parent_name == "my-app")
            .collect();
        assert_eq!(app_edges.len(), 2);
        let chalk = app_edges.iter().find(|e| e.child_name == "chalk").unwrap();
        assert_eq!(chalk.child_version.as_deref(), Some("5.3.0"));
        let debug = app_edges.iter().find(|e| e.child_name == "debug").unwrap();
        assert!(debug.child_version.is_none());
    }

    #[test]
    fn berry_peer_meta_is_not_a_dependency_group() {
        let contents = parse(BERRY);
        assert!(!contents.edges.iter().any(|e| e.child_name == "supports-color"));
        assert!(!contents.edges.iter().any(|e| e.child_name == "optional"));
    }

    #[test]
    fn crlf_line_endings() {
        let text =
            "debug@^4.0.0:\r\n  version \"4.4.2\"\r\n  dependencies:\r\n    ms \"2.1.3\"\r\n";
        let contents = parse(text);
        assert_eq!(contents.find_package("debug").unwrap().version, "4.4.2");
        assert_eq!(contents.edges[0].child_version.as_deref(), Some("2.1.3"));
    }

    #[test]
    fn block_without_version_is_dropped() {
        let contents = parse("orphan@^1.0.0:\n  resolved \"x\"\n");
        assert_eq!(contents.package_count(), 0);
    }

    #[test]
    fn garbage_input_yields_empty_result() {
        let contents = parse("this is not a lockfile\n\tat all");
        assert_eq!(contents.package_count(), 0);
        assert!(contents.edges.is_empty());
    }

    #[test]
    fn name_from_specifier_variants() {
        assert_eq!(name_from_specifier("debug@^4.3.1"), Some("debug"));
        assert_eq!(name_from_specifier("\"@scope/x@^1.0.0\""), Some("@scope/x"));
        assert_eq!(name_from_specifier("@scope/x@npm:1.0.0"), Some("@scope/x"));
        assert_eq!(
            name_from_specifier("left-pad@https://example.com/x@1.tgz"),
            Some("left-pad")
        );
        assert_eq!(name_from_specifier("__metadata"), None);
        assert_eq!(name_from_specifier("@scope"), None);
    }

    #[test]
    fn name_from_resolution_handles_scopes() {
        assert_eq!(name_from_resolution("debug@npm:4.4.2"), Some("debug"));
        assert_eq!(
            name_from_resolution("@ctrl/tinycolor@npm:4.1.1"),
            Some("@ctrl/tinycolor")
        );
        assert_eq!(name_from_resolution("plain"), None);
    }

    #[test]
    fn field_value_requires_exact_key() {
        assert_eq!(field_value("version \"1.0.0\"", "version").as_deref(), Some("1.0.0"));
        assert_eq!(field_value("version: 1.0.0", "version").as_deref(), Some("1.0.0"));
        assert_eq!(field_value("versions \"1\"", "version"), None);
    }

    #[test]
    fn split_specifiers_respects_quotes() {
        assert_eq!(
            split_specifiers("\"a@^1, b\", c@2"),
            vec!["\"a@^1, b\"".to_owned(), "c@2".to_owned()]
        );
    }
}
