//! 스캐너 오케스트레이터 -- lockfile 탐색부터 고정 계획까지
//!
//! [`LockScanner`]는 한 프로젝트 디렉토리에 대해 다음 단계를 수행합니다.
//!
//! ```text
//! project_dir --> LockfileDetector --> [spawn_blocking x N] LockfileParser
//!                                               |
//!                                        GraphAggregator
//!                                               |
//!                      +------------------------+----------------------+
//!                      |                                               |
//!               ThreatClassifier                            ReverseIndex (chain)
//!                      |                                               |
//!               Vec<PackageReport> ----------> ThreatenedPackage <-----+
//!                      |
//!                  plan_pins  <-- PackageManifest (package.json)
//!                      |
//!                  ScanReport
//! ```
//!
//! 파싱은 lockfile마다 독립적이므로 `JoinSet`에서 동시에 실행되고,
//! 결과는 탐색 순서로 다시 정렬된 뒤 집계됩니다. 분류, 체인 추적, 계획 계산은
//! 집계가 끝난 그래프 위에서 동기적으로 수행됩니다.

use std::path::{Path, PathBuf};
use std::sync::Arc;

use serde::Serialize;
use tokio::task::JoinSet;
use tracing::{debug, info, warn};

use crate::chain::{self, DependencyChain, ReverseIndex};
use crate::config::LockScannerConfig;
use crate::error::LockScanError;
use crate::graph::{self, DependencyGraph, LockfileSummary};
use crate::parser::{
    BunBinaryLockParser, BunCliDecoder, BunLockParser, LockbDecoder, LockfileDetector,
    LockfileParser, NpmLockParser, YarnLockParser,
};
use crate::pin::{
    ApplyOptions, ApplyOutcome, PackageManifest, PinPlan, PinState, PlanOutcome, plan_pins,
};
use crate::threat::{PackageReport, ThreatClassifier, ThreatDb, VersionStatus};
use crate::types::{LockfileContents, LockfileKind, node_key};

/// 위협 DB에 등록된 패키지의 버전 하나
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ThreatenedVersion {
    /// 설치 버전
    pub version: String,
    /// 분류 결과
    pub status: VersionStatus,
    /// 이 버전이 만족한 나쁜 범위
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub matched_ranges: Vec<String>,
    /// 직접 의존자 (`name@version`)
    pub dependents: Vec<String>,
    /// 루트까지의 체인 (침해된 버전만)
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub chains: Vec<DependencyChain>,
}

/// 위협 DB에 등록되어 있고 실제로 설치된 패키지
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ThreatenedPackage {
    /// 패키지 이름
    pub name: String,
    /// 침해된 버전이 하나라도 있는지
    pub compromised: bool,
    /// 버전별 상세 (오름차순)
    pub versions: Vec<ThreatenedVersion>,
    /// 위협 DB의 마지막 안전 버전
    #[serde(skip_serializing_if = "Option::is_none")]
    pub last_safe: Option<String>,
    /// 설치된 safe 버전 중 최댓값
    #[serde(skip_serializing_if = "Option::is_none")]
    pub safe_installed_max: Option<String>,
    /// package.json에 이미 고정된 버전
    #[serde(skip_serializing_if = "Option::is_none")]
    pub pinned_to: Option<String>,
    /// 위협 DB 메모
    #[serde(skip_serializing_if = "Option::is_none")]
    pub notes: Option<String>,
    /// 권고문 URL
    #[serde(skip_serializing_if = "Option::is_none")]
    pub advisory_url: Option<String>,
}

impl ThreatenedPackage {
    /// 침해된 버전 목록
    pub fn compromised_versions(&self) -> impl Iterator<Item = &ThreatenedVersion> {
        self.versions
            .iter()
            .filter(|v| v.status == VersionStatus::Compromised)
    }
}

/// 한 번의 스캔 결과
#[derive(Debug, Clone, Serialize)]
pub struct ScanReport {
    /// 스캔 식별자 (uuid v4)
    pub scan_id: String,
    /// 스캔한 프로젝트 디렉토리
    pub project_dir: String,
    /// 탐색된 lockfile (탐색 순서)
    pub lockfiles: Vec<LockfileSummary>,
    /// 고유 패키지 이름 수
    pub distinct_packages: usize,
    /// 전체 간선 수 (중복 포함)
    pub edge_count: usize,
    /// 사용한 위협 DB 엔트리 수
    pub threat_entries: usize,
    /// package.json 존재 여부
    pub manifest_found: bool,
    /// 위협 DB에 등록된 설치 패키지 (이름 오름차순)
    pub threatened: Vec<ThreatenedPackage>,
    /// 고정 계획
    pub plan: PlanOutcome,
}

impl ScanReport {
    /// 침해된 버전이 설치된 패키지
    pub fn compromised(&self) -> impl Iterator<Item = &ThreatenedPackage> {
        self.threatened.iter().filter(|p| p.compromised)
    }

    /// 침해된 패키지 수
    pub fn compromised_count(&self) -> usize {
        self.compromised().count()
    }

    /// 침해되었지만 package.json에 고정되지 않은 패키지 이름
    pub fn unpinned_compromised(&self) -> Vec<&str> {
        self.compromised()
            .filter(|p| !self.plan.already_pinned.contains(&p.name))
            .map(|p| p.name.as_str())
            .collect()
    }

    /// lockfile을 하나도 찾지 못했는지
    pub fn is_empty(&self) -> bool {
        self.lockfiles.is_empty()
    }
}

/// lockfile 스캐너
///
/// [`LockScannerBuilder`]로 생성합니다. 상태를 갖지 않으므로 같은 인스턴스로
/// 여러 디렉토리를 스캔할 수 있습니다.
pub struct LockScanner {
    config: LockScannerConfig,
    detector: LockfileDetector,
    parsers: Vec<Arc<dyn LockfileParser>>,
    threat_db: ThreatDb,
}

impl LockScanner {
    /// 스캐너 설정
    pub fn config(&self) -> &LockScannerConfig {
        &self.config
    }

    /// 사용 중인 위협 DB
    pub fn threat_db(&self) -> &ThreatDb {
        &self.threat_db
    }

    fn parser_for(&self, kind: LockfileKind) -> Option<Arc<dyn LockfileParser>> {
        self.parsers.iter().find(|p| p.kind() == kind).cloned()
    }

    /// 프로젝트 디렉토리를 스캔합니다.
    ///
    /// lockfile 파싱 실패는 해당 파일의 빈 결과로 흡수됩니다.
    /// 에러는 블로킹 태스크가 비정상 종료된 경우에만 반환됩니다.
    pub async fn scan(&self, dir: &Path) -> Result<ScanReport, LockScanError> {
        let scan_id = uuid::Uuid::new_v4().to_string();
        debug!(scan_id = %scan_id, dir = %dir.display(), "starting lockfile scan");

        let owned_dir = dir.to_path_buf();
        let detector = self.detector.clone();
        let (discovered, manifest) = tokio::task::spawn_blocking(move || {
            let discovered = discover_lockfiles(&owned_dir, &detector);
            let manifest = PackageManifest::read(&owned_dir);
            (discovered, manifest)
        })
        .await
        .map_err(|e| LockScanError::Task(format!("discovery task failed: {e}")))?;

        let contents = self.parse_all(discovered).await?;
        let graph = graph::aggregate(contents);

        let classifier = ThreatClassifier::new(self.threat_db.entries());
        let reports = classifier.classify(&graph.index);

        let pin_state = manifest
            .as_ref()
            .map(PackageManifest::pin_state)
            .unwrap_or_default();
        let plan = plan_pins(&reports, &pin_state);

        let threatened = self.annotate(&graph, &classifier, &reports, &pin_state);

        info!(
            scan_id = %scan_id,
            lockfiles = graph.sources.len(),
            packages = graph.package_count(),
            threatened = threatened.len(),
            compromised = threatened.iter().filter(|p| p.compromised).count(),
            "lockfile scan completed"
        );

        Ok(ScanReport {
            scan_id,
            project_dir: dir.display().to_string(),
            distinct_packages: graph.package_count(),
            edge_count: graph.edges.len(),
            lockfiles: graph.sources,
            threat_entries: self.threat_db.entry_count(),
            manifest_found: manifest.is_some(),
            threatened,
            plan,
        })
    }

    /// 고정 계획을 프로젝트의 package.json에 적용합니다.
    pub async fn apply_pins(
        &self,
        dir: &Path,
        plan: &PinPlan,
    ) -> Result<ApplyOutcome, LockScanError> {
        let dir = dir.to_path_buf();
        let plan = plan.clone();
        let options = ApplyOptions {
            also_resolutions: self.config.also_resolutions,
            backup: self.config.backup,
        };

        let outcome = tokio::task::spawn_blocking(move || {
            crate::pin::apply_pin_plan(&dir, &plan, &options)
        })
        .await
        .map_err(|e| LockScanError::Task(format!("pin apply task failed: {e}")))??;

        info!(
            path = %outcome.path.display(),
            overrides = outcome.updated.len(),
            resolutions = outcome.updated_resolutions.len(),
            "pin plan applied"
        );
        Ok(outcome)
    }

    /// 탐색된 lockfile을 동시에 파싱하고 탐색 순서대로 돌려줍니다.
    async fn parse_all(
        &self,
        discovered: Vec<DiscoveredLockfile>,
    ) -> Result<Vec<LockfileContents>, LockScanError> {
        let mut tasks = JoinSet::new();
        let max_file_size = self.config.max_file_size;

        for (idx, lockfile) in discovered.into_iter().enumerate() {
            let Some(parser) = self.parser_for(lockfile.kind) else {
                debug!(
                    path = %lockfile.path.display(),
                    kind = %lockfile.kind,
                    "no parser registered"
                );
                continue;
            };
            tasks.spawn_blocking(move || {
                (
                    idx,
                    read_and_parse(&lockfile, parser.as_ref(), max_file_size),
                )
            });
        }

        let mut results = Vec::with_capacity(tasks.len());
        while let Some(joined) = tasks.join_next().await {
            let (idx, contents) =
                joined.map_err(|e| LockScanError::Task(format!("parse task failed: {e}")))?;
            results.push((idx, contents));
        }

        results.sort_by_key(|(idx, _)| *idx);
        Ok(results.into_iter().map(|(_, contents)| contents).collect())
    }

    /// 위협 DB에 등록된 설치 패키지마다 표시용 상세를 만듭니다.
    fn annotate(
        &self,
        graph: &DependencyGraph,
        classifier: &ThreatClassifier<'_>,
        reports: &[PackageReport],
        pin_state: &PinState,
    ) -> Vec<ThreatenedPackage> {
        let reverse: ReverseIndex = chain::build_reverse_index(&graph.edges);

        reports
            .iter()
            .filter_map(|report| {
                let entry = classifier.entry(&report.name)?;
                let dependents =
                    chain::direct_dependents(&report.name, &report.versions, &graph.edges);

                let versions = report
                    .statuses
                    .iter()
                    .map(|verdict| {
                        let compromised = verdict.status == VersionStatus::Compromised;
                        let chains = if compromised {
                            self.chains_for(&node_key(&report.name, &verdict.version), &reverse)
                        } else {
                            Vec::new()
                        };

                        ThreatenedVersion {
                            version: verdict.version.clone(),
                            status: verdict.status,
                            matched_ranges: classifier
                                .matching_ranges(&report.name, &verdict.version)
                                .into_iter()
                                .map(str::to_owned)
                                .collect(),
                            dependents: dependents
                                .get(&verdict.version)
                                .map(|set| set.iter().cloned().collect())
                                .unwrap_or_default(),
                            chains,
                        }
                    })
                    .collect();

                Some(ThreatenedPackage {
                    name: report.name.clone(),
                    compromised: report.compromised,
                    versions,
                    last_safe: report.last_safe.clone(),
                    safe_installed_max: report.safe_installed_max.clone(),
                    pinned_to: pin_state.pinned_version(&report.name).map(str::to_owned),
                    notes: entry.notes.clone(),
                    advisory_url: entry.advisory_url.clone(),
                })
            })
            .collect()
    }

    /// 부모가 기록된 노드만 추적합니다. 부모가 없으면 대상 자신이 루트인
    /// 의미 없는 체인이 되므로 빈 목록을 돌려줍니다.
    fn chains_for(&self, target: &str, reverse: &ReverseIndex) -> Vec<DependencyChain> {
        if !reverse.get(target).is_some_and(|parents| !parents.is_empty()) {
            return Vec::new();
        }
        chain::find_chains_to_root(
            target,
            reverse,
            self.config.max_chains,
            self.config.max_chain_depth,
        )
    }
}

/// [`LockScanner`] 빌더
///
/// # 예시
///
/// ```
/// use lockpost_lock_scanner::{LockScannerBuilder, LockScannerConfig};
///
/// let scanner = LockScannerBuilder::new()
///     .config(LockScannerConfig::default())
///     .build()
///     .unwrap();
/// assert!(scanner.threat_db().entry_count() > 0);
/// ```
pub struct LockScannerBuilder {
    config: LockScannerConfig,
    threat_db: Option<ThreatDb>,
    decoder: Option<Arc<dyn LockbDecoder>>,
}

impl LockScannerBuilder {
    /// 새 빌더를 생성합니다.
    pub fn new() -> Self {
        Self {
            config: LockScannerConfig::default(),
            threat_db: None,
            decoder: None,
        }
    }

    /// 스캐너 설정을 지정합니다.
    pub fn config(mut self, config: LockScannerConfig) -> Self {
        self.config = config;
        self
    }

    /// 위협 DB를 직접 지정합니다.
    ///
    /// 지정하지 않으면 `threat_db_path`의 파일을, 경로가 비어 있으면 내장 DB를 사용합니다.
    pub fn threat_db(mut self, db: ThreatDb) -> Self {
        self.threat_db = Some(db);
        self
    }

    /// `bun.lockb` 디코더를 직접 지정합니다.
    ///
    /// 지정하지 않으면 `bun_binary` 설정이 있을 때 [`BunCliDecoder`]를 사용합니다.
    pub fn decoder(mut self, decoder: Arc<dyn LockbDecoder>) -> Self {
        self.decoder = Some(decoder);
        self
    }

    /// 스캐너를 빌드합니다.
    ///
    /// 설정 검증과 위협 DB 로드를 수행합니다.
    pub fn build(self) -> Result<LockScanner, LockScanError> {
        self.config.validate()?;

        let threat_db = match self.threat_db {
            Some(db) => db,
            None if self.config.threat_db_path.is_empty() => ThreatDb::builtin()?,
            None => ThreatDb::load_from_file(Path::new(&self.config.threat_db_path))?,
        };

        let decoder = self.decoder.or_else(|| {
            (!self.config.bun_binary.is_empty()).then(|| {
                Arc::new(BunCliDecoder::new(self.config.bun_binary.clone()))
                    as Arc<dyn LockbDecoder>
            })
        });

        // 기본 파서 등록
        let parsers: Vec<Arc<dyn LockfileParser>> = vec![
            Arc::new(NpmLockParser),
            Arc::new(YarnLockParser),
            Arc::new(BunLockParser),
            Arc::new(BunBinaryLockParser::new(decoder)),
        ];

        Ok(LockScanner {
            config: self.config,
            detector: LockfileDetector::new(),
            parsers,
            threat_db,
        })
    }
}

impl Default for LockScannerBuilder {
    fn default() -> Self {
        Self::new()
    }
}

/// 탐색된 lockfile
#[derive(Debug, Clone)]
struct DiscoveredLockfile {
    path: PathBuf,
    kind: LockfileKind,
}

/// 디렉토리에서 알려진 lockfile을 찾습니다 (동기 I/O, 재귀 없음).
///
/// 결과는 [`LockfileDetector::known_filenames`] 순서입니다.
/// `tokio::task::spawn_blocking` 내에서 호출되어야 합니다.
fn discover_lockfiles(dir: &Path, detector: &LockfileDetector) -> Vec<DiscoveredLockfile> {
    if !dir.is_dir() {
        warn!(dir = %dir.display(), "scan directory does not exist");
        return Vec::new();
    }

    detector
        .known_filenames()
        .iter()
        .filter_map(|(filename, kind)| {
            let path = dir.join(filename);
            path.is_file().then_some(DiscoveredLockfile { path, kind: *kind })
        })
        .collect()
}

/// lockfile 하나를 읽고 파싱합니다 (동기 I/O).
///
/// 읽기 실패나 크기 초과는 경고 로그를 남기고 빈 결과가 됩니다.
fn read_and_parse(
    lockfile: &DiscoveredLockfile,
    parser: &dyn LockfileParser,
    max_file_size: usize,
) -> LockfileContents {
    let source = lockfile.path.display().to_string();

    let bytes = match read_lockfile(lockfile, max_file_size) {
        Ok(bytes) => bytes,
        Err(e) => {
            warn!(path = %source, kind = %lockfile.kind, error = %e, "skipping lockfile");
            return LockfileContents::empty(source, lockfile.kind);
        }
    };

    let contents = parser.parse_lenient(&bytes, &source);
    info!(
        path = %source,
        kind = %lockfile.kind,
        packages = contents.packages.len(),
        edges = contents.edges.len(),
        "lockfile parsed"
    );
    contents
}

/// 크기 상한을 확인한 뒤 lockfile 바이트를 읽습니다.
fn read_lockfile(
    lockfile: &DiscoveredLockfile,
    max_file_size: usize,
) -> Result<Vec<u8>, LockScanError> {
    let io_error = |source: std::io::Error| LockScanError::Io {
        path: lockfile.path.display().to_string(),
        source,
    };

    let metadata = std::fs::metadata(&lockfile.path).map_err(io_error)?;
    let size = usize::try_from(metadata.len()).unwrap_or(usize::MAX);
    if size > max_file_size {
        return Err(LockScanError::FileTooBig {
            path: lockfile.path.display().to_string(),
            size,
            max: max_file_size,
        });
    }

    std::fs::read(&lockfile.path).map_err(io_error)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::threat::ThreatEntry;

    fn debug_db() -> ThreatDb {
        ThreatDb::from_entries(vec![ThreatEntry {
            name: "debug".to_owned(),
            bad_ranges: vec!["4.4.2".to_owned()],
            last_safe: Some("4.4.1".to_owned()),
            notes: Some("malicious release".to_owned()),
            advisory_url: None,
        }])
    }

    const NPM_LOCK: &str = r#"{
      "name": "app",
      "lockfileVersion": 3,
      "packages": {
        "": { "name": "app", "version": "0.0.0", "dependencies": { "package-a": "^1.0.0" } },
        "node_modules/package-a": { "version": "1.0.0", "dependencies": { "debug": "^4.4.0" } },
        "node_modules/debug": { "version": "4.4.2" }
      }
    }"#;

    #[test]
    fn builder_uses_builtin_db_by_default() {
        let scanner = LockScannerBuilder::new().build().unwrap();
        assert!(scanner.threat_db().get("debug").is_some());
    }

    #[test]
    fn builder_rejects_invalid_config() {
        let result = LockScannerBuilder::new()
            .config(LockScannerConfig {
                max_file_size: 0,
                ..Default::default()
            })
            .build();
        assert!(result.is_err());
    }

    #[test]
    fn builder_missing_threat_file_fails() {
        let result = LockScannerBuilder::new()
            .config(LockScannerConfig {
                threat_db_path: "/nonexistent/lockpost/threats.json".to_owned(),
                ..Default::default()
            })
            .build();
        assert!(matches!(result, Err(LockScanError::ThreatDbLoad { .. })));
    }

    #[test]
    fn discovery_follows_known_order() {
        let dir = tempfile::tempdir().unwrap();
        std::fs::write(dir.path().join("bun.lock"), "{}").unwrap();
        std::fs::write(dir.path().join("yarn.lock"), "").unwrap();
        std::fs::write(dir.path().join("package-lock.json"), "{}").unwrap();
        std::fs::write(dir.path().join("README.md"), "").unwrap();

        let found = discover_lockfiles(dir.path(), &LockfileDetector::new());
        let kinds: Vec<_> = found.iter().map(|l| l.kind).collect();
        assert_eq!(
            kinds,
            vec![LockfileKind::Npm, LockfileKind::Yarn, LockfileKind::BunText]
        );
    }

    #[test]
    fn discovery_of_missing_dir_is_empty() {
        let found =
            discover_lockfiles(Path::new("/nonexistent/lockpost"), &LockfileDetector::new());
        assert!(found.is_empty());
    }

    #[test]
    fn oversized_lockfile_is_empty_but_listed() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("package-lock.json");
        std::fs::write(&path, NPM_LOCK).unwrap();

        let lockfile = DiscoveredLockfile {
            path,
            kind: LockfileKind::Npm,
        };
        let err = read_lockfile(&lockfile, 16).unwrap_err();
        match err {
            LockScanError::FileTooBig { size, max, .. } => {
                assert_eq!(size, NPM_LOCK.len());
                assert_eq!(max, 16);
            }
            other => panic!("expected FileTooBig, got {other:?}"),
        }

        let contents = read_and_parse(&lockfile, &NpmLockParser, 16);
        assert!(contents.packages.is_empty());
        assert_eq!(contents.kind, LockfileKind::Npm);

        let contents = read_and_parse(&lockfile, &NpmLockParser, NPM_LOCK.len());
        assert!(contents.find_package("debug").is_some());
    }

    #[test]
    fn vanished_lockfile_is_io_error_and_empty() {
        let dir = tempfile::tempdir().unwrap();
        let lockfile = DiscoveredLockfile {
            path: dir.path().join("yarn.lock"),
            kind: LockfileKind::Yarn,
        };

        let err = read_lockfile(&lockfile, 1024).unwrap_err();
        assert!(matches!(err, LockScanError::Io { .. }));
        assert!(err.to_string().contains("yarn.lock"));

        let contents = read_and_parse(&lockfile, &YarnLockParser, 1024);
        assert!(contents.packages.is_empty());
        assert!(contents.edges.is_empty());
    }

    #[tokio::test]
    async fn scan_reports_compromised_debug() {
        let dir = tempfile::tempdir().unwrap();
        std::fs::write(dir.path().join("package-lock.json"), NPM_LOCK).unwrap();

        let scanner = LockScannerBuilder::new()
            .threat_db(debug_db())
            .build()
            .unwrap();
        let report = scanner.scan(dir.path()).await.unwrap();

        assert_eq!(report.lockfiles.len(), 1);
        assert_eq!(report.distinct_packages, 2);
        assert!(!report.manifest_found);
        assert_eq!(report.compromised_count(), 1);

        let debug = &report.threatened[0];
        assert_eq!(debug.name, "debug");
        assert_eq!(debug.notes.as_deref(), Some("malicious release"));
        let v = &debug.versions[0];
        assert_eq!(v.matched_ranges, vec!["4.4.2"]);
        assert_eq!(v.dependents, vec!["package-a@1.0.0"]);
        assert_eq!(v.chains.len(), 1);
        assert_eq!(
            v.chains[0].nodes,
            vec!["app@0.0.0", "package-a@1.0.0", "debug@4.4.2"]
        );
        assert!(v.chains[0].reaches_root);

        assert_eq!(report.plan.plan.overrides.get("debug").map(String::as_str), Some("4.4.1"));
        assert_eq!(report.unpinned_compromised(), vec!["debug"]);
    }

    #[tokio::test]
    async fn scan_without_chains_when_disabled() {
        let dir = tempfile::tempdir().unwrap();
        std::fs::write(dir.path().join("package-lock.json"), NPM_LOCK).unwrap();

        let scanner = LockScannerBuilder::new()
            .config(LockScannerConfig {
                max_chains: 0,
                ..Default::default()
            })
            .threat_db(debug_db())
            .build()
            .unwrap();
        let report = scanner.scan(dir.path()).await.unwrap();
        assert!(report.threatened[0].versions[0].chains.is_empty());
        assert_eq!(report.threatened[0].versions[0].dependents.len(), 1);
    }

    #[tokio::test]
    async fn scan_of_empty_dir() {
        let dir = tempfile::tempdir().unwrap();
        let scanner = LockScannerBuilder::new().build().unwrap();
        let report = scanner.scan(dir.path()).await.unwrap();

        assert!(report.is_empty());
        assert!(report.threatened.is_empty());
        assert!(report.plan.plan.is_empty());
        assert_eq!(uuid::Uuid::parse_str(&report.scan_id).unwrap().get_version_num(), 4);
    }
}
