//! 추출 요청 핸들러 -- 요청/응답 방식의 추출 진입점
//!
//! 인바운드 이벤트를 전달하고 아웃바운드 응답을 직렬화하는 호출
//! 하네스는 외부 협력자입니다. 이 모듈은 전송에 독립적인
//! [`ExtractRequest`]/[`ExtractResponse`] 타입만을 다룹니다.
//! 헤더 값은 전송 경계에서 `&str`로 정규화됩니다 — 코어는 문자열
//! 외의 표현을 보지 않습니다.
//!
//! # 두 가지 추출 경로
//! - **단일 패턴** (`X-Regex` 헤더): 요청이 준 패턴 하나를 본문에
//!   적용합니다. 컴파일 실패는 클라이언트 에러(400)이고, 매칭 없음은
//!   204입니다 (엄격 모드).
//! - **규칙 세트** (헤더 없음): 본문을 [`LogEvent`] JSON으로 파싱하고
//!   sourcetype 규칙 세트 → 메타 보강 → 출력 모드 렌더링을 수행합니다.
//!   패턴 문제는 로드 시점에 걸러졌으므로 요청은 실패하지 않습니다
//!   (관대 모드). 매칭이 없어도 200입니다.

use std::collections::HashMap;
use std::sync::Arc;

use metrics::counter;
use regex::Regex;
use tracing::{debug, warn};

use logrelay_core::metrics as metric_names;
use logrelay_core::types::{LogEvent, OutputMode};

use crate::enrich::MetadataEnricher;
use crate::extract::{apply_rule_set, extract};
use crate::format::render;
use crate::rules::RuleCache;

/// 단일 패턴 추출을 요청하는 헤더
pub const HEADER_REGEX: &str = "x-regex";
/// 출력 모드 셀렉터 헤더
pub const HEADER_OUTPUT_MODE: &str = "event-output-mode";
/// 구식 이진 렌더링 스위치 헤더 (true = minimal, false = normal)
pub const HEADER_OPTIMIZE_EVENT: &str = "optimize-event";

/// 전송 독립적 추출 요청
///
/// 헤더 이름은 대소문자를 구분하지 않습니다.
#[derive(Debug, Default)]
pub struct ExtractRequest {
    /// 요청 본문
    pub body: String,
    /// 정규화된 헤더 (키는 소문자)
    headers: HashMap<String, String>,
}

impl ExtractRequest {
    /// 본문으로 새 요청을 생성합니다.
    pub fn new(body: impl Into<String>) -> Self {
        Self {
            body: body.into(),
            headers: HashMap::new(),
        }
    }

    /// 헤더를 추가합니다 (빌더 스타일).
    pub fn with_header(mut self, name: &str, value: impl Into<String>) -> Self {
        self.headers.insert(name.to_lowercase(), value.into());
        self
    }

    /// 헤더 값을 조회합니다.
    pub fn header(&self, name: &str) -> Option<&str> {
        self.headers.get(&name.to_lowercase()).map(String::as_str)
    }
}

/// 전송 독립적 추출 응답
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ExtractResponse {
    /// HTTP 상태 코드
    pub status: u16,
    /// 본문 content type
    pub content_type: &'static str,
    /// 응답 본문
    pub body: String,
}

impl ExtractResponse {
    /// 텍스트 응답을 생성합니다.
    fn text(status: u16, body: impl Into<String>) -> Self {
        Self {
            status,
            content_type: "application/text",
            body: body.into(),
        }
    }

    /// JSON 응답을 생성합니다.
    fn json(status: u16, body: impl Into<String>) -> Self {
        Self {
            status,
            content_type: "application/json",
            body: body.into(),
        }
    }
}

/// 추출 서비스 — 요청 단위 추출 파이프라인
///
/// 규칙 캐시와 보강기를 공유하는 요청 처리기입니다. 요청마다 격리된
/// `LogEvent`를 다루므로 동시 호출에 안전합니다.
pub struct ExtractService {
    /// sourcetype별 규칙 캐시
    rules: Arc<RuleCache>,
    /// 메타데이터 보강기
    enricher: MetadataEnricher,
    /// 헤더가 없을 때의 기본 출력 모드
    default_mode: OutputMode,
}

impl ExtractService {
    /// 새 추출 서비스를 생성합니다.
    pub fn new(rules: Arc<RuleCache>, default_mode: OutputMode) -> Self {
        Self {
            rules,
            enricher: MetadataEnricher::new(),
            default_mode,
        }
    }

    /// 추출 요청 하나를 처리합니다.
    ///
    /// §응답 계약: 빈 본문 204, 패턴 컴파일 실패 400, 성공 200.
    pub async fn handle(&self, request: &ExtractRequest) -> ExtractResponse {
        // 빈 본문은 어떤 정규식 작업도 하지 않고 단락됩니다.
        if request.body.is_empty() {
            debug!("body empty");
            return ExtractResponse::text(204, "Body empty");
        }

        if let Some(pattern) = request.header(HEADER_REGEX) {
            return self.handle_single_pattern(pattern, &request.body);
        }

        self.handle_rule_set(request).await
    }

    /// 단일 패턴 경로 (엄격 모드).
    fn handle_single_pattern(&self, pattern: &str, body: &str) -> ExtractResponse {
        let regex = match Regex::new(pattern) {
            Ok(regex) => regex,
            Err(e) => {
                warn!(error = %e, "request pattern failed to compile");
                return ExtractResponse::text(400, "Regex error");
            }
        };

        match extract(&regex, body) {
            Some(fields) => {
                counter!(metric_names::EXTRACT_FIELDS_TOTAL).increment(fields.len() as u64);
                let body = serde_json::Value::Object(
                    fields
                        .into_iter()
                        .map(|(k, v)| (k, serde_json::Value::String(v)))
                        .collect(),
                );
                ExtractResponse::json(200, body.to_string())
            }
            // 원래의 단일 패턴 변형은 "매칭 없음"을 204로 보고합니다.
            None => ExtractResponse::text(204, "Body empty"),
        }
    }

    /// 규칙 세트 경로 (관대 모드).
    async fn handle_rule_set(&self, request: &ExtractRequest) -> ExtractResponse {
        // 관대한 역직렬화: 실패는 진단으로만 남기고 기본값으로 진행합니다.
        let mut event: LogEvent = match serde_json::from_str(&request.body) {
            Ok(event) => event,
            Err(e) => {
                warn!(error = %e, "failed to unmarshal log event, using defaults");
                LogEvent::default()
            }
        };

        // 불변 조건: 추출 전 필드 맵은 빈 상태로 시작합니다.
        event.reset_fields();

        let rule_set = self.rules.get(&event.sourcetype).await;
        let fields = apply_rule_set(&rule_set, &event.event);
        counter!(metric_names::EXTRACT_FIELDS_TOTAL).increment(fields.len() as u64);
        event.merge_fields(fields);

        // 보강은 항상 sourcetype 규칙 이후에 실행됩니다 — 내장 필드 우선.
        self.enricher.enrich(&mut event);

        let mode = self.resolve_output_mode(request);
        let rendered = render(&event, mode);

        counter!(metric_names::EXTRACT_EVENTS_PROCESSED_TOTAL).increment(1);
        ExtractResponse::json(200, rendered.to_string())
    }

    /// 요청 헤더에서 출력 모드를 결정합니다.
    ///
    /// 우선순위: `Event-Output-Mode` > `Optimize-Event`(구식) > 기본값.
    fn resolve_output_mode(&self, request: &ExtractRequest) -> OutputMode {
        if let Some(selector) = request.header(HEADER_OUTPUT_MODE) {
            return OutputMode::from_selector(selector);
        }

        if let Some(optimize) = request.header(HEADER_OPTIMIZE_EVENT) {
            return match optimize.parse::<bool>() {
                Ok(true) => OutputMode::Minimal,
                Ok(false) => OutputMode::Normal,
                Err(_) => {
                    debug!(value = optimize, "unparsable optimize-event header, ignoring");
                    self.default_mode
                }
            };
        }

        self.default_mode
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    use crate::rules::{FileRuleSource, RuleProvider};

    fn disabled_service() -> ExtractService {
        let cache = RuleCache::new(RuleProvider::Disabled);
        ExtractService::new(Arc::new(cache), OutputMode::Normal)
    }

    /// tempdir에 규칙 파일을 깔고 파일 출처 기반 서비스를 만듭니다.
    fn file_service(rule_yaml: &str) -> (ExtractService, tempfile::TempDir) {
        let temp = tempfile::tempdir().unwrap();
        let mut file = std::fs::File::create(temp.path().join("rules.yml")).unwrap();
        file.write_all(rule_yaml.as_bytes()).unwrap();
        drop(file);

        let provider = RuleProvider::File(FileRuleSource::new(temp.path()));
        let service = ExtractService::new(Arc::new(RuleCache::new(provider)), OutputMode::Normal);
        (service, temp)
    }

    #[tokio::test]
    async fn empty_body_short_circuits_with_204() {
        let service = disabled_service();
        let response = service.handle(&ExtractRequest::new("")).await;
        assert_eq!(response.status, 204);
        assert_eq!(response.body, "Body empty");
        assert_eq!(response.content_type, "application/text");
    }

    #[tokio::test]
    async fn single_pattern_match_returns_field_json() {
        let service = disabled_service();
        let request = ExtractRequest::new("name=\"Kent\" firstname=\"Clark\"")
            .with_header("X-Regex", r#"name="(?P<name>\w+)" firstname="(?P<firstname>\w+)""#);
        let response = service.handle(&request).await;

        assert_eq!(response.status, 200);
        assert_eq!(response.content_type, "application/json");
        let fields: serde_json::Value = serde_json::from_str(&response.body).unwrap();
        assert_eq!(fields["name"], "Kent");
        assert_eq!(fields["firstname"], "Clark");
    }

    #[tokio::test]
    async fn single_pattern_compile_failure_returns_400() {
        let service = disabled_service();
        let request =
            ExtractRequest::new("some body").with_header("X-Regex", "(?P<broken[invalid");
        let response = service.handle(&request).await;

        assert_eq!(response.status, 400);
        assert_eq!(response.body, "Regex error");
    }

    #[tokio::test]
    async fn single_pattern_no_match_returns_204() {
        let service = disabled_service();
        let request =
            ExtractRequest::new("nothing to see").with_header("X-Regex", r"(?P<num>\d{10})");
        let response = service.handle(&request).await;

        assert_eq!(response.status, 204);
        assert_eq!(response.body, "Body empty");
    }

    #[tokio::test]
    async fn rule_set_path_extracts_and_returns_event() {
        let (service, _temp) = file_service(
            r#"
sourcetype: app:kv
rules:
  - class: "0"
    pattern: 'name="(?P<name>\w+)"'
  - class: "1"
    pattern: 'firstname="(?P<firstname>\w+)"'
"#,
        );

        let body = r#"{
            "time": "1700000000",
            "sourcetype": "app:kv",
            "host": "h1",
            "source": "s1",
            "event": "name=\"Kent\" firstname=\"Clark\""
        }"#;
        let response = service.handle(&ExtractRequest::new(body)).await;

        assert_eq!(response.status, 200);
        let event: serde_json::Value = serde_json::from_str(&response.body).unwrap();
        assert_eq!(event["fields"]["name"], "Kent");
        assert_eq!(event["fields"]["firstname"], "Clark");
        // normal 모드는 본문을 유지
        assert_eq!(event["event"], "name=\"Kent\" firstname=\"Clark\"");
    }

    #[tokio::test]
    async fn rule_set_path_no_match_still_returns_200() {
        let (service, _temp) = file_service(
            r#"
sourcetype: app:kv
rules:
  - class: "0"
    pattern: 'zzz=(?P<zzz>\d+)'
"#,
        );

        let body = r#"{"sourcetype": "app:kv", "event": "nothing matches"}"#;
        let response = service.handle(&ExtractRequest::new(body)).await;

        assert_eq!(response.status, 200);
        let event: serde_json::Value = serde_json::from_str(&response.body).unwrap();
        assert_eq!(event["event"], "nothing matches");
        assert!(event["fields"].as_object().unwrap().is_empty());
    }

    #[tokio::test]
    async fn unknown_sourcetype_passes_event_through() {
        let service = disabled_service();
        let body = r#"{"sourcetype": "never:seen", "event": "raw body"}"#;
        let response = service.handle(&ExtractRequest::new(body)).await;

        assert_eq!(response.status, 200);
        let event: serde_json::Value = serde_json::from_str(&response.body).unwrap();
        assert_eq!(event["event"], "raw body");
    }

    #[tokio::test]
    async fn malformed_body_degrades_to_defaults() {
        let service = disabled_service();
        let response = service.handle(&ExtractRequest::new("this is not json")).await;

        // 진단만 남기고 기본값 이벤트로 계속 진행
        assert_eq!(response.status, 200);
        let event: serde_json::Value = serde_json::from_str(&response.body).unwrap();
        assert_eq!(event["event"], "");
    }

    #[tokio::test]
    async fn inbound_fields_are_reset_before_extraction() {
        let service = disabled_service();
        let body = r#"{"sourcetype": "x", "event": "y", "fields": {"stale": "value"}}"#;
        let response = service.handle(&ExtractRequest::new(body)).await;

        let event: serde_json::Value = serde_json::from_str(&response.body).unwrap();
        assert!(event["fields"].as_object().unwrap().is_empty());
    }

    #[tokio::test]
    async fn metadata_rules_win_over_sourcetype_rules() {
        // sourcetype 규칙도 date_year를 내지만, 보강기가 나중에 실행되므로
        // meta에서 복원된 값이 최종값이어야 함
        let (service, _temp) = file_service(
            r#"
sourcetype: app:kv
rules:
  - class: "0"
    pattern: 'year=(?P<date_year>\d+)'
"#,
        );

        let body = r#"{
            "sourcetype": "app:kv",
            "meta": "date_year::2024",
            "event": "year=1999"
        }"#;
        let response = service.handle(&ExtractRequest::new(body)).await;

        let event: serde_json::Value = serde_json::from_str(&response.body).unwrap();
        assert_eq!(event["fields"]["date_year"], "2024");
    }

    #[tokio::test]
    async fn subsecond_is_appended_to_time_and_stripped_from_output() {
        let service = disabled_service();
        let body = r#"{
            "time": "1700000000",
            "sourcetype": "x",
            "meta": "_subsecond::.500",
            "event": "body"
        }"#;
        let response = service.handle(&ExtractRequest::new(body)).await;

        let event: serde_json::Value = serde_json::from_str(&response.body).unwrap();
        assert_eq!(event["time"], "1700000000.500");
        assert!(event.get("meta").is_none());
        assert!(event["fields"].get("_subsecond").is_none());
    }

    #[tokio::test]
    async fn output_mode_header_selects_rendering() {
        let (service, _temp) = file_service(
            r#"
sourcetype: app:kv
rules:
  - class: "0"
    pattern: 'name="(?P<name>\w+)"'
"#,
        );

        let body = r#"{"sourcetype": "app:kv", "event": "name=\"Kent\""}"#;

        let request = ExtractRequest::new(body).with_header("Event-Output-Mode", "kv");
        let response = service.handle(&request).await;
        let event: serde_json::Value = serde_json::from_str(&response.body).unwrap();
        assert_eq!(event["event"], "name=\"Kent\"");

        let request = ExtractRequest::new(body).with_header("Event-Output-Mode", "none");
        let response = service.handle(&request).await;
        let event: serde_json::Value = serde_json::from_str(&response.body).unwrap();
        assert_eq!(event["event"], "-");
    }

    #[tokio::test]
    async fn unknown_output_mode_falls_back_to_normal() {
        let service = disabled_service();
        let body = r#"{"sourcetype": "x", "event": "keep me"}"#;
        let request = ExtractRequest::new(body).with_header("Event-Output-Mode", "fancy");
        let response = service.handle(&request).await;

        let event: serde_json::Value = serde_json::from_str(&response.body).unwrap();
        assert_eq!(event["event"], "keep me");
    }

    #[tokio::test]
    async fn legacy_optimize_header_switches_to_minimal() {
        let (service, _temp) = file_service(
            r#"
sourcetype: app:kv
rules:
  - class: "0"
    pattern: 'name="(?P<name>\w+)"'
"#,
        );

        let body = r#"{"sourcetype": "app:kv", "event": "name=\"Kent\""}"#;
        let request = ExtractRequest::new(body).with_header("Optimize-Event", "true");
        let response = service.handle(&request).await;

        let event: serde_json::Value = serde_json::from_str(&response.body).unwrap();
        assert_eq!(event["event"], "Kent");
    }

    #[tokio::test]
    async fn header_names_are_case_insensitive() {
        let service = disabled_service();
        let request = ExtractRequest::new("v=1").with_header("x-regex", r"v=(?P<v>\d)");
        let response = service.handle(&request).await;
        assert_eq!(response.status, 200);
    }

    #[tokio::test]
    async fn invalid_pattern_in_rule_set_does_not_fail_request() {
        // 잘못된 패턴은 로드 시 건너뛰고 나머지 유효 규칙은 동작해야 함
        let (service, _temp) = file_service(
            r#"
sourcetype: app:kv
rules:
  - class: "bad"
    pattern: '(?P<broken'
  - class: "good"
    pattern: 'name="(?P<name>\w+)"'
"#,
        );

        let body = r#"{"sourcetype": "app:kv", "event": "name=\"Kent\""}"#;
        let response = service.handle(&ExtractRequest::new(body)).await;

        assert_eq!(response.status, 200);
        let event: serde_json::Value = serde_json::from_str(&response.body).unwrap();
        assert_eq!(event["fields"]["name"], "Kent");
    }
}
