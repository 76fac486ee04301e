//! 추출 규칙 엔진 -- 규칙 컴파일, 출처, 스냅샷 캐시
//!
//! sourcetype별 규칙 세트를 로드하고 컴파일하여 추출 엔진에 제공합니다.
//!
//! # 아키텍처
//! - [`CompiledRuleSet`]: 로드 시 한 번 컴파일된 불변 규칙 세트
//! - [`file`]: YAML 규칙 디렉토리 출처
//! - [`http`]: 원격 규칙 저장소 출처 (페이지네이션 질의)
//! - [`RuleCache`]: sourcetype -> `Arc<CompiledRuleSet>` 스냅샷 캐시
//!
//! # 스냅샷 시맨틱
//! 캐시 리로드는 완성된 새 세트로의 원자적 교체입니다. 읽는 쪽은
//! 항상 이전 세트 전체 또는 새 세트 전체를 보며, 중간 상태를
//! 관측할 수 없습니다.

pub mod file;
pub mod http;

pub use file::FileRuleSource;
pub use http::HttpRuleSource;

use std::collections::HashMap;
use std::sync::Arc;

use metrics::{counter, gauge};
use regex::Regex;
use tokio::sync::RwLock;

use logrelay_core::metrics as metric_names;
use logrelay_core::types::RegexRule;

use crate::config::RuleSourceConfig;
use crate::error::EventPipelineError;

/// 규칙 유효성을 검증합니다.
///
/// 패턴 컴파일과는 별개로, 저장소에서 온 규칙의 형태를 확인합니다.
pub fn validate_rule(rule: &RegexRule) -> Result<(), EventPipelineError> {
    if rule.sourcetype.is_empty() {
        return Err(EventPipelineError::RuleValidation {
            sourcetype: "(empty)".to_owned(),
            class: rule.class.clone(),
            reason: "sourcetype must not be empty".to_owned(),
        });
    }

    if rule.pattern.is_empty() {
        return Err(EventPipelineError::RuleValidation {
            sourcetype: rule.sourcetype.clone(),
            class: rule.class.clone(),
            reason: "pattern must not be empty".to_owned(),
        });
    }

    if rule.pattern.len() > 4096 {
        return Err(EventPipelineError::RuleValidation {
            sourcetype: rule.sourcetype.clone(),
            class: rule.class.clone(),
            reason: "pattern must not exceed 4096 characters".to_owned(),
        });
    }

    Ok(())
}

/// 컴파일된 규칙 하나
#[derive(Debug)]
pub struct CompiledRule {
    /// 규칙 이름 (정보성)
    pub class: String,
    /// 컴파일된 정규식
    pub regex: Regex,
}

/// 컴파일된 규칙 세트 — 하나의 sourcetype에 대한 불변 스냅샷
///
/// 로드 시 한 번 컴파일하여 매칭 시 재컴파일 오버헤드를 제거합니다.
/// 같은 class의 규칙이 여럿이어도 모두 유지됩니다 — class는 중복
/// 제거 키가 아닙니다.
#[derive(Debug)]
pub struct CompiledRuleSet {
    /// 대상 sourcetype
    pub sourcetype: String,
    /// 적용 순서대로 정렬된 컴파일 규칙
    rules: Vec<CompiledRule>,
}

impl CompiledRuleSet {
    /// 빈 규칙 세트를 생성합니다.
    pub fn empty(sourcetype: impl Into<String>) -> Self {
        Self {
            sourcetype: sourcetype.into(),
            rules: Vec::new(),
        }
    }

    /// 규칙 목록을 관대하게 컴파일합니다.
    ///
    /// 유효하지 않은 규칙(검증 실패 또는 정규식 컴파일 실패)은 경고
    /// 로그를 남기고 건너뜁니다. 유효한 규칙의 상대 순서는 유지됩니다.
    /// 건너뛴 규칙 수를 함께 반환합니다.
    pub fn compile(sourcetype: impl Into<String>, rules: Vec<RegexRule>) -> (Self, usize) {
        let sourcetype = sourcetype.into();
        let mut compiled = Vec::with_capacity(rules.len());
        let mut skipped = 0usize;

        for rule in rules {
            if let Err(e) = validate_rule(&rule) {
                tracing::warn!(
                    sourcetype = %sourcetype,
                    class = %rule.class,
                    error = %e,
                    "invalid rule, skipping"
                );
                skipped += 1;
                continue;
            }

            match Regex::new(&rule.pattern) {
                Ok(regex) => compiled.push(CompiledRule {
                    class: rule.class,
                    regex,
                }),
                Err(e) => {
                    tracing::warn!(
                        sourcetype = %sourcetype,
                        class = %rule.class,
                        error = %e,
                        "regex compile failed, skipping rule"
                    );
                    skipped += 1;
                }
            }
        }

        if skipped > 0 {
            counter!(metric_names::EXTRACT_RULES_SKIPPED_TOTAL).increment(skipped as u64);
        }

        (
            Self {
                sourcetype,
                rules: compiled,
            },
            skipped,
        )
    }

    /// 규칙 목록을 엄격하게 컴파일합니다.
    ///
    /// 첫 번째 유효하지 않은 규칙에서 에러를 반환합니다.
    /// 규칙 파일을 사전 검증하는 CLI 경로에서 사용합니다.
    pub fn compile_strict(
        sourcetype: impl Into<String>,
        rules: Vec<RegexRule>,
    ) -> Result<Self, EventPipelineError> {
        let sourcetype = sourcetype.into();
        let mut compiled = Vec::with_capacity(rules.len());

        for rule in rules {
            validate_rule(&rule)?;
            let regex =
                Regex::new(&rule.pattern).map_err(|e| EventPipelineError::RuleValidation {
                    sourcetype: rule.sourcetype.clone(),
                    class: rule.class.clone(),
                    reason: format!("invalid regex: {e}"),
                })?;
            compiled.push(CompiledRule {
                class: rule.class,
                regex,
            });
        }

        Ok(Self {
            sourcetype,
            rules: compiled,
        })
    }

    /// 규칙 수를 반환합니다.
    pub fn len(&self) -> usize {
        self.rules.len()
    }

    /// 규칙이 하나도 없는지 확인합니다.
    pub fn is_empty(&self) -> bool {
        self.rules.is_empty()
    }

    /// 규칙을 적용 순서대로 순회합니다.
    pub fn iter(&self) -> impl Iterator<Item = &CompiledRule> {
        self.rules.iter()
    }
}

/// 규칙 출처 — 설정에 따라 선택되는 규칙 공급자
pub enum RuleProvider {
    /// YAML 규칙 디렉토리
    File(FileRuleSource),
    /// 원격 규칙 저장소
    Http(HttpRuleSource),
    /// 추출 비활성
    Disabled,
}

impl RuleProvider {
    /// 설정에서 규칙 출처를 생성합니다.
    pub fn from_config(config: &RuleSourceConfig) -> Result<Self, EventPipelineError> {
        match config {
            RuleSourceConfig::File { dir } => Ok(Self::File(FileRuleSource::new(dir))),
            RuleSourceConfig::Http { base_url } => {
                Ok(Self::Http(HttpRuleSource::new(base_url)?))
            }
            RuleSourceConfig::Disabled => Ok(Self::Disabled),
        }
    }

    /// sourcetype의 규칙 목록을 조회합니다.
    ///
    /// 목록 순서가 곧 적용 순서입니다.
    pub async fn list_rules(
        &self,
        sourcetype: &str,
    ) -> Result<Vec<RegexRule>, EventPipelineError> {
        match self {
            Self::File(source) => source.list_rules(sourcetype).await,
            Self::Http(source) => source.list_rules(sourcetype).await,
            Self::Disabled => Ok(Vec::new()),
        }
    }
}

/// 규칙 캐시 — sourcetype별 컴파일 규칙 세트의 스냅샷 캐시
///
/// 읽기 위주 공유 자원입니다. 세트가 한 번 로드되면 동시 읽기는
/// 잠금 경합 없이 `Arc` 클론으로 공유됩니다.
pub struct RuleCache {
    /// 규칙 공급자
    provider: RuleProvider,
    /// sourcetype -> 컴파일된 스냅샷
    sets: RwLock<HashMap<String, Arc<CompiledRuleSet>>>,
}

impl RuleCache {
    /// 새 규칙 캐시를 생성합니다.
    pub fn new(provider: RuleProvider) -> Self {
        Self {
            provider,
            sets: RwLock::new(HashMap::new()),
        }
    }

    /// sourcetype의 규칙 세트를 반환합니다. 필요하면 로드합니다.
    ///
    /// 공급자 질의 실패는 빈 규칙 세트로 강등됩니다 — 알 수 없는
    /// sourcetype이나 저장소 장애가 파이프라인을 멈추지 않습니다.
    pub async fn get(&self, sourcetype: &str) -> Arc<CompiledRuleSet> {
        {
            let sets = self.sets.read().await;
            if let Some(set) = sets.get(sourcetype) {
                return Arc::clone(set);
            }
        }

        let set = self.load(sourcetype).await;

        let mut sets = self.sets.write().await;
        // 경합한 다른 로더가 먼저 넣었으면 그쪽 스냅샷을 사용합니다.
        let entry = sets
            .entry(sourcetype.to_owned())
            .or_insert_with(|| Arc::new(set));
        let result = Arc::clone(entry);
        gauge!(metric_names::EXTRACT_CACHED_RULESETS).set(sets.len() as f64);
        result
    }

    /// sourcetype의 규칙 세트를 다시 로드하여 원자적으로 교체합니다.
    ///
    /// 로드가 끝날 때까지 기존 스냅샷이 유지되므로, 읽는 쪽이
    /// 부분 업데이트를 관측하는 일은 없습니다. 로드된 규칙 수를
    /// 반환합니다.
    pub async fn reload(&self, sourcetype: &str) -> usize {
        let set = self.load(sourcetype).await;
        let count = set.len();

        let mut sets = self.sets.write().await;
        sets.insert(sourcetype.to_owned(), Arc::new(set));
        gauge!(metric_names::EXTRACT_CACHED_RULESETS).set(sets.len() as f64);
        count
    }

    /// 캐시된 규칙 세트 수를 반환합니다.
    pub async fn cached_count(&self) -> usize {
        self.sets.read().await.len()
    }

    /// 공급자에서 규칙을 로드하고 컴파일합니다. 실패는 빈 세트로 강등됩니다.
    async fn load(&self, sourcetype: &str) -> CompiledRuleSet {
        match self.provider.list_rules(sourcetype).await {
            Ok(rules) => {
                let (set, skipped) = CompiledRuleSet::compile(sourcetype, rules);
                tracing::debug!(
                    sourcetype,
                    rules = set.len(),
                    skipped,
                    "loaded rule set"
                );
                set
            }
            Err(e) => {
                counter!(metric_names::EXTRACT_RULE_LOOKUP_FAILURES_TOTAL).increment(1);
                tracing::warn!(
                    sourcetype,
                    error = %e,
                    "rule lookup failed, degrading to empty rule set"
                );
                CompiledRuleSet::empty(sourcetype)
            }
        }
    }
}
