//! bun.lockb 파서 (바이너리)
//!
//! 바이너리 lockfile은 직접 해석하지 않습니다. [`LockbDecoder`]가 yarn.lock
//! 형식의 텍스트로 변환하면 yarn 파서로 처리합니다.
//!
//! 디코더가 설정되지 않았으면 빈 결과를 반환하고 debug 로그만 남깁니다.

use std::path::Path;
use std::process::Command;
use std::sync::Arc;

use tracing::debug;

use crate::error::LockScanError;
use crate::parser::LockfileParser;
use crate::parser::yarn::parse_yarn_text;
use crate::types::{LockfileContents, LockfileKind};

/// bun.lockb 디코더
///
/// 바이너리 lockfile 바이트를 yarn.lock 형식의 텍스트로 변환합니다.
pub trait LockbDecoder: Send + Sync {
    /// 디코딩을 수행합니다.
    ///
    /// # Arguments
    ///
    /// - `content`: bun.lockb 원본 바이트
    /// - `source_path`: 원본 파일 경로
    fn decode(&self, content: &[u8], source_path: &str) -> Result<String, LockScanError>;
}

/// `bun <path>` 명령으로 bun.lockb를 디코딩합니다.
///
/// bun CLI는 바이너리 lockfile 경로를 인자로 받으면 yarn.lock 형식으로 출력합니다.
/// 파일 경로에서 직접 읽으므로 전달받은 바이트는 사용하지 않습니다.
#[derive(Debug, Clone)]
pub struct BunCliDecoder {
    program: String,
}

impl BunCliDecoder {
    /// 실행 파일 경로 또는 이름으로 디코더를 생성합니다.
    pub fn new(program: impl Into<String>) -> Self {
        Self {
            program: program.into(),
        }
    }

    /// 실행 파일 경로
    pub fn program(&self) -> &str {
        &self.program
    }
}

impl Default for BunCliDecoder {
    fn default() -> Self {
        Self::new("bun")
    }
}

impl LockbDecoder for BunCliDecoder {
    fn decode(&self, _content: &[u8], source_path: &str) -> Result<String, LockScanError> {
        debug!(program = %self.program, path = source_path, "decoding bun.lockb");

        let output = Command::new(&self.program)
            .arg(source_path)
            .output()
            .map_err(|e| LockScanError::Decoder {
                path: source_path.to_owned(),
                reason: format!("failed to run {}: {e}", self.program),
            })?;

        if !output.status.success() {
            let stderr = String::from_utf8_lossy(&output.stderr);
            return Err(LockScanError::Decoder {
                path: source_path.to_owned(),
                reason: format!(
                    "{} exited with {}: {}",
                    self.program,
                    output.status,
                    stderr.trim()
                ),
            });
        }

        String::from_utf8(output.stdout).map_err(|e| LockScanError::Decoder {
            path: source_path.to_owned(),
            reason: format!("decoder produced invalid UTF-8: {e}"),
        })
    }
}

/// bun.lockb 파서
pub struct BunBinaryLockParser {
    decoder: Option<Arc<dyn LockbDecoder>>,
}

impl BunBinaryLockParser {
    /// 디코더를 지정하여 파서를 생성합니다.
    pub fn new(decoder: Option<Arc<dyn LockbDecoder>>) -> Self {
        Self { decoder }
    }

    /// 디코더 없이 생성합니다. 모든 입력에 대해 빈 결과를 반환합니다.
    pub fn without_decoder() -> Self {
        Self { decoder: None }
    }

    /// 디코더가 설정되어 있는지 확인합니다.
    pub fn has_decoder(&self) -> bool {
        self.decoder.is_some()
    }
}

impl LockfileParser for BunBinaryLockParser {
    fn kind(&self) -> LockfileKind {
        LockfileKind::BunBinary
    }

    fn can_parse(&self, path: &Path) -> bool {
        path.file_name()
            .and_then(|n| n.to_str())
            .is_some_and(|name| name == "bun.lockb")
    }

    fn parse(
        &self,
        content: &[u8],
        source_path: &str,
    ) -> Result<LockfileContents, LockScanError> {
        let Some(decoder) = &self.decoder else {
            debug!(path = source_path, "no bun.lockb decoder configured, skipping");
            return Ok(LockfileContents::empty(source_path, LockfileKind::BunBinary));
        };

        let text = decoder.decode(content, source_path)?;
        Ok(parse_yarn_text(&text, source_path, LockfileKind::BunBinary))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    struct FixedDecoder(&'static str);

    impl LockbDecoder for FixedDecoder {
        fn decode(&self, _content: &[u8], _source_path: &str) -> Result<String, LockScanError> {
            Ok(self.0.to_owned())
        }
    }

    struct FailingDecoder;

    impl LockbDecoder for FailingDecoder {
        fn decode(&self, _content: &[u8], source_path: &str) -> Result<String, LockScanError> {
            Err(LockScanError::Decoder {
                path: source_path.to_owned(),
                reason: "unsupported".to_owned(),
            })
        }
    }

    #[test]
    fn can_parse_bun_lockb() {
        let parser = BunBinaryLockParser::without_decoder();
        assert!(parser.can_parse(Path::new("/p/bun.lockb")));
        assert!(!parser.can_parse(Path::new("/p/bun.lock")));
    }

    #[test]
    fn without_decoder_returns_empty() {
        let parser = BunBinaryLockParser::without_decoder();
        assert!(!parser.has_decoder());
        let contents = parser.parse(&[0x00, 0x01, 0x02], "bun.lockb").unwrap();
        assert_eq!(contents.kind, LockfileKind::BunBinary);
        assert_eq!(contents.package_count(), 0);
    }

    #[test]
    fn decoded_text_is_parsed_as_yarn() {
        let decoder =
            FixedDecoder("debug@4.4.2:\n  version \"4.4.2\"\n  dependencies:\n    ms \"2.1.3\"\n");
        let parser = BunBinaryLockParser::new(Some(Arc::new(decoder)));
        let contents = parser.parse(b"binary", "bun.lockb").unwrap();

        assert_eq!(contents.kind, LockfileKind::BunBinary);
        assert_eq!(contents.source_file, "bun.lockb");
        assert_eq!(contents.find_package("debug").unwrap().version, "4.4.2");
        assert_eq!(contents.edges.len(), 1);
    }

    #[test]
    fn decoder_failure_is_lenient() {
        let parser = BunBinaryLockParser::new(Some(Arc::new(FailingDecoder)));
        assert!(matches!(
            parser.parse(b"x", "bun.lockb"),
            Err(LockScanError::Decoder { .. })
        ));
        let contents = parser.parse_lenient(b"x", "bun.lockb");
        assert_eq!(contents.package_count(), 0);
    }

    #[test]
    fn missing_bun_binary_is_decoder_error() {
        let decoder = BunCliDecoder::new("lockpost-test-no-such-program");
        let result = decoder.decode(b"", "bun.lockb");
        assert!(matches!(result, Err(LockScanError::Decoder { .. })));
    }

    #[test]
    fn default_decoder_program() {
        assert_eq!(BunCliDecoder::default().program(), "bun");
    }
}
