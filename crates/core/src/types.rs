//! 도메인 타입 — 시스템 전역에서 사용되는 공통 타입
//!
//! 모든 모듈이 공유하는 데이터 구조를 정의합니다.
//! [`LogEvent`]는 수집기부터 포워더까지 파이프라인 전체를 관통하는
//! 작업 단위이며, [`RegexRule`]/[`RuleSet`]은 sourcetype별 필드 추출
//! 규칙을 나타냅니다.

use std::collections::HashMap;
use std::fmt;

use serde::{Deserialize, Serialize};

/// 로그 이벤트 — 파이프라인의 작업 단위
///
/// 다운스트림 수집기(HEC 계열)가 기대하는 JSON 와이어 형식과 1:1로
/// 대응합니다. 인바운드 JSON에 없는 필드는 빈 문자열로 채워집니다
/// (관대한 역직렬화).
///
/// # 불변 조건
/// - `fields`는 추출 규칙 실행 전에 항상 빈 맵으로 초기화됩니다.
/// - 규칙은 키를 추가하거나 덮어쓸 뿐, 삭제하지 않습니다.
/// - 키 충돌 시 나중에 실행된 규칙이 이깁니다 (last-write-wins).
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct LogEvent {
    /// 이벤트 타임스탬프 (불투명 문자열, `_subsecond` 접미사 추가 외에는 변경 없음)
    pub time: String,
    /// 메타데이터 블롭 — `event`와 별도로 파싱되는 `name::value` 토큰 열
    pub meta: String,
    /// 호스트 식별자 (통과 전용)
    pub host: String,
    /// 규칙 세트를 선택하는 카테고리 레이블
    pub sourcetype: String,
    /// 소스 식별자 (통과 전용)
    pub source: String,
    /// 인덱스 식별자 (통과 전용)
    pub index: String,
    /// 원시 이벤트 본문 (여러 줄 가능) — 필드 추출과 출력 모드 재작성의 대상
    pub event: String,
    /// 추출된 필드 (키 유일, last-write-wins, 순회 순서 무의미)
    pub fields: HashMap<String, String>,
}

impl LogEvent {
    /// 본문과 입력 기본값으로 새 이벤트를 생성합니다.
    ///
    /// 라인 단위 전송에는 프레임 헤더가 없으므로, 헤더 필드는
    /// 입력 설정의 기본값으로 채웁니다.
    pub fn from_body(
        body: impl Into<String>,
        time: impl Into<String>,
        host: impl Into<String>,
        sourcetype: impl Into<String>,
        source: impl Into<String>,
        index: impl Into<String>,
    ) -> Self {
        Self {
            time: time.into(),
            meta: String::new(),
            host: host.into(),
            sourcetype: sourcetype.into(),
            source: source.into(),
            index: index.into(),
            event: body.into(),
            fields: HashMap::new(),
        }
    }

    /// 추출 규칙 실행 전 필드 맵을 초기화합니다.
    pub fn reset_fields(&mut self) {
        self.fields = HashMap::new();
    }

    /// 필드 맵을 last-write-wins로 병합합니다.
    pub fn merge_fields(&mut self, fields: HashMap<String, String>) {
        for (key, value) in fields {
            self.fields.insert(key, value);
        }
    }
}

impl fmt::Display for LogEvent {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "sourcetype={} host={} source={} fields={} bytes={}",
            self.sourcetype,
            self.host,
            self.source,
            self.fields.len(),
            self.event.len(),
        )
    }
}

/// 필드 추출 규칙
///
/// 규칙 저장소의 `{sourcetype, class, pattern}` 트리플에 대응합니다.
/// 로드 후에는 불변입니다. `class`는 규칙 이름(정보성)일 뿐이며
/// 중복 제거에 사용되지 않습니다 — 같은 class의 뒤 규칙도 다시 실행됩니다.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RegexRule {
    /// 규칙이 적용되는 sourcetype (정확히 일치해야 선택됨)
    pub sourcetype: String,
    /// 규칙 이름 (정보성)
    pub class: String,
    /// 명명 캡처 그룹을 포함한 정규식 소스
    pub pattern: String,
}

impl RegexRule {
    /// 새 규칙을 생성합니다.
    pub fn new(
        sourcetype: impl Into<String>,
        class: impl Into<String>,
        pattern: impl Into<String>,
    ) -> Self {
        Self {
            sourcetype: sourcetype.into(),
            class: class.into(),
            pattern: pattern.into(),
        }
    }
}

impl fmt::Display for RegexRule {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}/{}: {}", self.sourcetype, self.class, self.pattern)
    }
}

/// 하나의 sourcetype에 속하는 순서 있는 규칙 목록
///
/// 순서는 정확성에 관여합니다 — 같은 필드명을 내는 규칙이 여럿이면
/// 목록에서 뒤에 있는 규칙의 값이 남습니다 (last-write-wins 타이브레이크).
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct RuleSet {
    /// 대상 sourcetype
    pub sourcetype: String,
    /// 적용 순서대로 정렬된 규칙 목록
    pub rules: Vec<RegexRule>,
}

impl RuleSet {
    /// 빈 규칙 세트를 생성합니다.
    pub fn empty(sourcetype: impl Into<String>) -> Self {
        Self {
            sourcetype: sourcetype.into(),
            rules: Vec::new(),
        }
    }

    /// 규칙 수를 반환합니다.
    pub fn len(&self) -> usize {
        self.rules.len()
    }

    /// 규칙이 하나도 없는지 확인합니다.
    pub fn is_empty(&self) -> bool {
        self.rules.is_empty()
    }
}

/// 출력 모드 — 추출 후 이벤트 본문의 렌더링 전략
///
/// 인식할 수 없는 셀렉터 문자열은 [`OutputMode::Normal`]로 처리됩니다.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum OutputMode {
    /// 본문 유지, 전체 구조화 JSON 출력 (기본값)
    #[default]
    Normal,
    /// 본문을 추출된 필드 값의 공백 결합으로 교체하고 특수문자 제거
    Minimal,
    /// 본문을 `key="value"` 쌍의 공백 결합으로 교체
    Kv,
    /// 본문을 자리표시자 `-`로 교체
    None,
}

impl OutputMode {
    /// 셀렉터 문자열에서 출력 모드를 파싱합니다.
    ///
    /// 대소문자를 구분하지 않으며, 알 수 없는 값은 `Normal`로
    /// 폴백합니다 (에러 아님).
    pub fn from_selector(s: &str) -> Self {
        match s.to_lowercase().as_str() {
            "minimal" => Self::Minimal,
            "kv" => Self::Kv,
            "none" => Self::None,
            _ => Self::Normal,
        }
    }
}

impl fmt::Display for OutputMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Normal => write!(f, "normal"),
            Self::Minimal => write!(f, "minimal"),
            Self::Kv => write!(f, "kv"),
            Self::None => write!(f, "none"),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn log_event_deserializes_wire_shape() {
        let json = r#"{
            "time": "15000000000.500",
            "sourcetype": "mysourcetype",
            "host": "myhost",
            "source": "mysource",
            "event": "name=\"Kent\" firstname=\"Clark\""
        }"#;
        let event: LogEvent = serde_json::from_str(json).unwrap();
        assert_eq!(event.time, "15000000000.500");
        assert_eq!(event.sourcetype, "mysourcetype");
        // 누락된 필드는 빈 값으로 채워짐
        assert_eq!(event.meta, "");
        assert_eq!(event.index, "");
        assert!(event.fields.is_empty());
    }

    #[test]
    fn log_event_ignores_unknown_fields() {
        let json = r#"{"event": "x", "unexpected": 42}"#;
        let event: LogEvent = serde_json::from_str(json).unwrap();
        assert_eq!(event.event, "x");
    }

    #[test]
    fn log_event_from_body_fills_defaults() {
        let event = LogEvent::from_body("line one", "1700000000", "h1", "app:log", "tcp", "main");
        assert_eq!(event.event, "line one");
        assert_eq!(event.sourcetype, "app:log");
        assert!(event.meta.is_empty());
        assert!(event.fields.is_empty());
    }

    #[test]
    fn merge_fields_is_last_write_wins() {
        let mut event = LogEvent::default();
        event.merge_fields(HashMap::from([("x".to_owned(), "1".to_owned())]));
        event.merge_fields(HashMap::from([("x".to_owned(), "2".to_owned())]));
        assert_eq!(event.fields.get("x").map(String::as_str), Some("2"));
    }

    #[test]
    fn reset_fields_clears_map() {
        let mut event = LogEvent::default();
        event.merge_fields(HashMap::from([("x".to_owned(), "1".to_owned())]));
        event.reset_fields();
        assert!(event.fields.is_empty());
    }

    #[test]
    fn log_event_display() {
        let event = LogEvent::from_body("body", "0", "web-01", "cisco:asa", "tcp", "main");
        let display = event.to_string();
        assert!(display.contains("cisco:asa"));
        assert!(display.contains("web-01"));
    }

    #[test]
    fn rule_set_empty() {
        let set = RuleSet::empty("cisco:asa");
        assert_eq!(set.sourcetype, "cisco:asa");
        assert!(set.is_empty());
        assert_eq!(set.len(), 0);
    }

    #[test]
    fn regex_rule_display() {
        let rule = RegexRule::new("cisco:asa", "0", r"(?P<src>\d+)");
        assert!(rule.to_string().contains("cisco:asa/0"));
    }

    #[test]
    fn output_mode_from_selector() {
        assert_eq!(OutputMode::from_selector("normal"), OutputMode::Normal);
        assert_eq!(OutputMode::from_selector("minimal"), OutputMode::Minimal);
        assert_eq!(OutputMode::from_selector("KV"), OutputMode::Kv);
        assert_eq!(OutputMode::from_selector("none"), OutputMode::None);
    }

    #[test]
    fn output_mode_unknown_falls_back_to_normal() {
        assert_eq!(OutputMode::from_selector("fancy"), OutputMode::Normal);
        assert_eq!(OutputMode::from_selector(""), OutputMode::Normal);
    }

    #[test]
    fn output_mode_default_is_normal() {
        assert_eq!(OutputMode::default(), OutputMode::Normal);
    }

    #[test]
    fn output_mode_display_roundtrip() {
        for mode in [
            OutputMode::Normal,
            OutputMode::Minimal,
            OutputMode::Kv,
            OutputMode::None,
        ] {
            assert_eq!(OutputMode::from_selector(&mode.to_string()), mode);
        }
    }

    #[test]
    fn log_event_serialize_roundtrip() {
        let mut event = LogEvent::from_body("raw", "123", "h", "st", "s", "i");
        event.fields.insert("name".to_owned(), "Kent".to_owned());
        let json = serde_json::to_string(&event).unwrap();
        let back: LogEvent = serde_json::from_str(&json).unwrap();
        assert_eq!(back.event, "raw");
        assert_eq!(back.fields.get("name").map(String::as_str), Some("Kent"));
    }
}
