//! # lockpost-lock-scanner
//!
//! JavaScript 프로젝트의 lockfile에서 알려진 침해 패키지 버전을 찾아내고,
//! 루트까지의 의존성 체인을 보여주며, package.json 버전 고정 계획을 계산합니다.
//!
//! # 모듈 구성
//!
//! - [`error`]: 도메인 에러 타입 (`LockScanError`)
//! - [`config`]: 스캐너 설정 (`LockScannerConfig`, 빌더)
//! - [`types`]: 도메인 타입 (`PackageRecord`, `DependencyEdge`, `LockfileContents`)
//! - [`version`]: semver 비교와 범위 매칭
//! - [`parser`]: lockfile 파서 (`LockfileParser` trait, npm / yarn / bun / bun.lockb)
//! - [`graph`]: 여러 lockfile 결과 집계 (`GraphAggregator`)
//! - [`threat`]: 위협 DB와 버전 분류 (`ThreatDb`, `ThreatClassifier`)
//! - [`chain`]: 루트까지의 의존성 체인 추적
//! - [`pin`]: 고정 계획 계산과 package.json 적용
//! - [`scanner`]: 오케스트레이터 (`LockScanner`, `LockScannerBuilder`)
//!
//! # 아키텍처
//!
//! ```text
//! lockfile bytes --> LockfileParser --> {PackageRecord, DependencyEdge}
//!                                                |
//!                                         GraphAggregator
//!                                                |
//!                        +-----------------------+-----------------------+
//!                        |                                               |
//!                 ThreatClassifier                                  ChainTracer
//!                        |                                               |
//!                 Vec<PackageReport> --> plan_pins --> PinPlan     DependencyChain
//! ```

pub mod chain;
pub mod config;
pub mod error;
pub mod graph;
pub mod parser;
pub mod pin;
pub mod scanner;
pub mod threat;
pub mod types;
pub mod version;

// --- Public API Re-exports ---

// Scanner (main orchestrator)
pub use scanner::{
    LockScanner, LockScannerBuilder, ScanReport, ThreatenedPackage, ThreatenedVersion,
};

// Configuration
pub use config::{LockScannerConfig, LockScannerConfigBuilder};

// Error
pub use error::LockScanError;

// Types
pub use types::{DependencyEdge, LockfileContents, LockfileKind, PackageRecord};

// Parser
pub use parser::{
    BunBinaryLockParser, BunCliDecoder, BunLockParser, LockbDecoder, LockfileDetector,
    LockfileParser, NpmLockParser, YarnLockParser,
};

// Graph, classification, chains, pins
pub use chain::{DependencyChain, build_reverse_index, direct_dependents, find_chains_to_root};
pub use graph::{AggregateIndex, DependencyGraph, GraphAggregator, LockfileSummary, aggregate};
pub use pin::{PinPlan, PinState, PlanOutcome, plan_pins};
pub use threat::{
    PackageReport, ThreatClassifier, ThreatDb, ThreatEntry, VersionStatus, VersionVerdict,
    classify,
};
