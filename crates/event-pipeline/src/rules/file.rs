//! 파일 규칙 출처 -- YAML 규칙 파일을 디스크에서 로드합니다.
//!
//! 규칙 디렉토리 내의 `.yml`/`.yaml` 파일을 스캔하고 파싱합니다.
//! 개별 파일 파싱 실패는 경고 로그를 남기고 건너뜁니다.
//!
//! # 파일 형식
//! ```yaml
//! sourcetype: cisco:asa
//! rules:
//!   - class: "0"
//!     pattern: '%ASA-\d-(?P<message_id>\d+)'
//!   - class: "1"
//!     pattern: 'from (?P<src>[\d.]+)'
//! ```

use std::path::{Path, PathBuf};

use serde::Deserialize;

use logrelay_core::types::RegexRule;

use crate::error::EventPipelineError;

const MAX_RULE_FILE_SIZE: u64 = 10 * 1024 * 1024; // 10MB
const MAX_RULES_COUNT: usize = 10_000;

/// YAML 규칙 파일 하나의 역직렬화 형태
#[derive(Debug, Deserialize)]
struct RuleFile {
    /// 이 파일의 규칙이 속하는 sourcetype
    sourcetype: String,
    /// 적용 순서대로 나열된 규칙
    #[serde(default)]
    rules: Vec<RuleFileEntry>,
}

/// 규칙 파일 내 엔트리
#[derive(Debug, Deserialize)]
struct RuleFileEntry {
    /// 규칙 이름 (정보성)
    class: String,
    /// 정규식 소스
    pattern: String,
}

/// 파일 규칙 출처
///
/// 디렉토리의 YAML 파일들에서 sourcetype이 일치하는 규칙을 모읍니다.
/// 파일명 순서로 순회하므로 여러 파일에 나뉜 규칙도 결정적 순서를
/// 가집니다.
pub struct FileRuleSource {
    /// 규칙 디렉토리
    dir: PathBuf,
}

impl FileRuleSource {
    /// 새 파일 규칙 출처를 생성합니다.
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        Self { dir: dir.into() }
    }

    /// 규칙 디렉토리 경로를 반환합니다.
    pub fn dir(&self) -> &Path {
        &self.dir
    }

    /// sourcetype의 규칙 목록을 조회합니다.
    ///
    /// sourcetype이 일치하는 파일이 없으면 빈 목록을 반환합니다
    /// (에러 아님). 디렉토리 자체를 읽을 수 없으면 에러를 반환합니다.
    pub async fn list_rules(
        &self,
        sourcetype: &str,
    ) -> Result<Vec<RegexRule>, EventPipelineError> {
        let mut entries = tokio::fs::read_dir(&self.dir).await.map_err(|e| {
            EventPipelineError::RuleLoad {
                source_name: self.dir.display().to_string(),
                reason: format!("failed to read directory: {e}"),
            }
        })?;

        let mut yaml_paths = Vec::new();
        while let Some(entry) =
            entries
                .next_entry()
                .await
                .map_err(|e| EventPipelineError::RuleLoad {
                    source_name: self.dir.display().to_string(),
                    reason: format!("failed to read directory entry: {e}"),
                })?
        {
            let path = entry.path();
            let is_yaml = path
                .extension()
                .is_some_and(|ext| ext == "yml" || ext == "yaml");
            if is_yaml {
                yaml_paths.push(path);
            }
        }

        // 파일명 순 정렬로 결정적 적용 순서를 보장합니다.
        yaml_paths.sort();

        let mut rules = Vec::new();
        for path in yaml_paths {
            match Self::load_file(&path).await {
                Ok(file) => {
                    if file.sourcetype != sourcetype {
                        continue;
                    }
                    for entry in file.rules {
                        rules.push(RegexRule::new(
                            file.sourcetype.clone(),
                            entry.class,
                            entry.pattern,
                        ));
                    }
                }
                Err(e) => {
                    tracing::warn!(
                        path = %path.display(),
                        error = %e,
                        "failed to load rule file, skipping"
                    );
                }
            }

            if rules.len() > MAX_RULES_COUNT {
                return Err(EventPipelineError::RuleLoad {
                    source_name: self.dir.display().to_string(),
                    reason: format!("too many rules: max {MAX_RULES_COUNT}"),
                });
            }
        }

        Ok(rules)
    }

    /// 단일 YAML 파일을 로드합니다.
    async fn load_file(path: &Path) -> Result<RuleFile, EventPipelineError> {
        let metadata =
            tokio::fs::metadata(path)
                .await
                .map_err(|e| EventPipelineError::RuleLoad {
                    source_name: path.display().to_string(),
                    reason: format!("failed to read file metadata: {e}"),
                })?;

        if metadata.len() > MAX_RULE_FILE_SIZE {
            return Err(EventPipelineError::RuleLoad {
                source_name: path.display().to_string(),
                reason: format!(
                    "file too large: {} bytes (max: {MAX_RULE_FILE_SIZE})",
                    metadata.len()
                ),
            });
        }

        let content =
            tokio::fs::read_to_string(path)
                .await
                .map_err(|e| EventPipelineError::RuleLoad {
                    source_name: path.display().to_string(),
                    reason: format!("failed to read file: {e}"),
                })?;

        Self::parse_yaml(&content, &path.display().to_string())
    }

    /// YAML 문자열을 파싱합니다.
    fn parse_yaml(yaml_str: &str, source_name: &str) -> Result<RuleFile, EventPipelineError> {
        serde_yaml::from_str(yaml_str).map_err(|e| EventPipelineError::RuleLoad {
            source_name: source_name.to_owned(),
            reason: format!("YAML parse error: {e}"),
        })
    }
}
