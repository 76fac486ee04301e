//! 원격 규칙 저장소 클라이언트 -- 페이지네이션 질의
//!
//! 규칙 저장소는 sourcetype별 규칙 아이템을 페이지 단위로 반환하는
//! 외부 협력자입니다. 호출자는 `last` 신호가 올 때까지 continuation
//! marker로 반복 질의해야 전체 세트를 얻습니다.
//!
//! 질의 실패는 호출 측([`RuleCache`](super::RuleCache))에서 빈 규칙
//! 세트로 강등됩니다 — 저장소 장애는 치명적이지 않습니다.

use std::time::Duration;

use serde::{Deserialize, Serialize};

use logrelay_core::types::RegexRule;

use crate::error::EventPipelineError;

/// 페이지당 최대 아이템 수
const PAGE_LIMIT: usize = 1000;
/// 전체 규칙 수 상한 (저장소 오동작으로 인한 무한 루프 방지)
const MAX_RULES_COUNT: usize = 10_000;
/// 기본 요청 타임아웃
const REQUEST_TIMEOUT: Duration = Duration::from_secs(10);

/// 규칙 목록 질의 요청 본문
#[derive(Debug, Serialize)]
struct ListRulesRequest<'a> {
    /// 페이지당 최대 아이템 수
    limit: usize,
    /// continuation marker (첫 페이지는 빈 문자열)
    marker: &'a str,
}

/// 규칙 목록 질의 응답 본문
#[derive(Debug, Deserialize)]
struct ListRulesResponse {
    /// 이 페이지의 규칙 아이템
    #[serde(default)]
    items: Vec<RuleItem>,
    /// 다음 페이지 marker
    #[serde(default)]
    next_marker: String,
    /// 마지막 페이지 여부
    #[serde(default)]
    last: bool,
}

/// 저장소의 규칙 아이템 (`{class, regex}`)
#[derive(Debug, Serialize, Deserialize)]
struct RuleItem {
    /// 규칙 이름
    class: String,
    /// 정규식 소스
    regex: String,
}

/// 원격 규칙 저장소 클라이언트
pub struct HttpRuleSource {
    /// 저장소 베이스 URL (예: "http://rules.internal:8081/conf")
    base_url: String,
    /// HTTP 클라이언트
    client: reqwest::Client,
}

impl HttpRuleSource {
    /// 새 저장소 클라이언트를 생성합니다.
    pub fn new(base_url: impl Into<String>) -> Result<Self, EventPipelineError> {
        let client = reqwest::Client::builder()
            .timeout(REQUEST_TIMEOUT)
            .build()
            .map_err(|e| EventPipelineError::Repository(format!("client build failed: {e}")))?;

        Ok(Self {
            base_url: base_url.into().trim_end_matches('/').to_owned(),
            client,
        })
    }

    /// 저장소 베이스 URL을 반환합니다.
    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    /// sourcetype의 전체 규칙 목록을 조회합니다.
    ///
    /// `last == true`인 페이지를 받을 때까지 marker로 반복 질의하여
    /// 전체 세트를 조립합니다. 아이템 순서는 저장소가 반환한 순서를
    /// 그대로 유지합니다.
    pub async fn list_rules(
        &self,
        sourcetype: &str,
    ) -> Result<Vec<RegexRule>, EventPipelineError> {
        let url = format!("{}/{}/extract", self.base_url, sourcetype);
        let mut rules = Vec::new();
        let mut marker = String::new();

        loop {
            let request = ListRulesRequest {
                limit: PAGE_LIMIT,
                marker: &marker,
            };

            let response = self
                .client
                .post(&url)
                .json(&request)
                .send()
                .await
                .map_err(|e| EventPipelineError::Repository(format!("query failed: {e}")))?;

            let status = response.status();
            if !status.is_success() {
                return Err(EventPipelineError::Repository(format!(
                    "repository returned status {status} for sourcetype '{sourcetype}'"
                )));
            }

            let page: ListRulesResponse = response
                .json()
                .await
                .map_err(|e| EventPipelineError::Repository(format!("invalid response: {e}")))?;

            for item in page.items {
                rules.push(RegexRule::new(sourcetype, item.class, item.regex));
            }

            if rules.len() > MAX_RULES_COUNT {
                return Err(EventPipelineError::Repository(format!(
                    "too many rules for sourcetype '{sourcetype}': max {MAX_RULES_COUNT}"
                )));
            }

            if page.last {
                break;
            }
            marker = page.next_marker;
        }

        tracing::debug!(sourcetype, count = rules.len(), "assembled rule set from repository");
        Ok(rules)
    }

    /// 규칙 하나를 저장소에 업로드합니다.
    ///
    /// `logrelay rules upload`가 사용하는 쓰기 경로입니다. 저장소가
    /// 거부하면 에러를 반환합니다.
    pub async fn put_rule(&self, rule: &RegexRule) -> Result<(), EventPipelineError> {
        let url = format!(
            "{}/{}/extract/{}",
            self.base_url, rule.sourcetype, rule.class
        );

        let item = RuleItem {
            class: rule.class.clone(),
            regex: rule.pattern.clone(),
        };

        let response = self
            .client
            .post(&url)
            .json(&item)
            .send()
            .await
            .map_err(|e| EventPipelineError::Repository(format!("upload failed: {e}")))?;

        let status = response.status();
        if !status.is_success() {
            return Err(EventPipelineError::Repository(format!(
                "repository rejected rule {}/{}: status {status}",
                rule.sourcetype, rule.class
            )));
        }

        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn base_url_trailing_slash_is_trimmed() {
        let source = HttpRuleSource::new("http://rules.internal:8081/conf/").unwrap();
        assert_eq!(source.base_url(), "http://rules.internal:8081/conf");
    }

    #[test]
    fn list_response_defaults_are_lenient() {
        // 필드가 없는 응답도 빈 페이지로 해석
        let page: ListRulesResponse = serde_json::from_str("{}").unwrap();
        assert!(page.items.is_empty());
        assert!(!page.last);
        assert!(page.next_marker.is_empty());
    }

    #[test]
    fn list_response_parses_items() {
        let json = r#"{
            "items": [
                {"class": "0", "regex": "(?P<a>\\d+)"},
                {"class": "1", "regex": "(?P<b>\\w+)"}
            ],
            "next_marker": "",
            "last": true
        }"#;
        let page: ListRulesResponse = serde_json::from_str(json).unwrap();
        assert_eq!(page.items.len(), 2);
        assert!(page.last);
        assert_eq!(page.items[0].class, "0");
    }

    #[tokio::test]
    async fn unreachable_repository_returns_error() {
        // 라우팅 불가능한 로컬 포트로 즉시 연결 실패를 유도
        let source = HttpRuleSource::new("http://127.0.0.1:1").unwrap();
        let result = source.list_rules("cisco:asa").await;
        assert!(matches!(result, Err(EventPipelineError::Repository(_))));
    }
}
