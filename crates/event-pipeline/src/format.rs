//! 출력 포매터 -- 필드가 채워진 이벤트를 와이어 표현으로 렌더링합니다.
//!
//! 출력 모드([`OutputMode`])에 따라 이벤트 본문을 재작성한 뒤
//! 다운스트림 수집기가 기대하는 JSON으로 직렬화합니다.
//!
//! | 모드 | 효과 |
//! |---|---|
//! | normal | 본문 유지, 전체 구조화 JSON |
//! | minimal | 본문 = 필드 값의 공백 결합, 영숫자/공백 외 문자 제거 |
//! | kv | 본문 = `key="value"` 쌍의 공백 결합 |
//! | none | 본문 = 리터럴 `-` |
//!
//! minimal/kv의 결합 순서는 필드 맵 순회 순서이며 안정성이 보장되지
//! 않습니다 — 순서에 의존하는 소비자는 없습니다.
//!
//! 직렬화 단계는 다운스트림이 받을 수 없는 두 필드를 아웃바운드
//! JSON에서만 제거합니다: 원시 `meta`와 내부 `_subsecond`. 메모리의
//! 이벤트는 그대로 유지됩니다.

use serde_json::{Map, Value, json};

use logrelay_core::types::{LogEvent, OutputMode};

use crate::enrich::SUBSECOND_FIELD;

/// 출력 모드에 따라 이벤트 본문을 제자리에서 재작성합니다.
pub fn rewrite_body(event: &mut LogEvent, mode: OutputMode) {
    match mode {
        OutputMode::Normal => {}
        OutputMode::Minimal => {
            let joined = event
                .fields
                .values()
                .map(String::as_str)
                .collect::<Vec<_>>()
                .join(" ");
            event.event = strip_special(&joined);
        }
        OutputMode::Kv => {
            event.event = event
                .fields
                .iter()
                .map(|(key, value)| format!("{key}=\"{value}\""))
                .collect::<Vec<_>>()
                .join(" ");
        }
        OutputMode::None => {
            event.event = "-".to_owned();
        }
    }
}

/// 이벤트를 출력 모드에 따라 아웃바운드 JSON으로 렌더링합니다.
///
/// 입력 이벤트는 변경하지 않습니다. `meta`와 `_subsecond` 필드는
/// 직렬화 결과에서만 제거됩니다.
pub fn render(event: &LogEvent, mode: OutputMode) -> Value {
    let mut rewritten = event.clone();
    rewrite_body(&mut rewritten, mode);
    serialize_outbound(&rewritten)
}

/// 다운스트림 수집기용 JSON을 구성합니다.
///
/// 수집기가 받을 수 없는 필드(`meta`, `fields._subsecond`)는 여기서
/// 탈락합니다.
fn serialize_outbound(event: &LogEvent) -> Value {
    let mut fields = Map::new();
    for (key, value) in &event.fields {
        if key == SUBSECOND_FIELD {
            continue;
        }
        fields.insert(key.clone(), json!(value));
    }

    json!({
        "time": event.time,
        "host": event.host,
        "sourcetype": event.sourcetype,
        "source": event.source,
        "index": event.index,
        "event": event.event,
        "fields": Value::Object(fields),
    })
}

/// 영숫자/공백 외 문자를 제거합니다.
fn strip_special(s: &str) -> String {
    s.chars()
        .filter(|c| c.is_alphanumeric() || c.is_whitespace())
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    fn sample_event() -> LogEvent {
        let mut event = LogEvent::from_body(
            "name=\"Kent\" firstname=\"Clark\"",
            "1700000000",
            "web-01",
            "app:log",
            "tcp:8888",
            "main",
        );
        event.fields = HashMap::from([
            ("name".to_owned(), "Kent".to_owned()),
            ("firstname".to_owned(), "Clark".to_owned()),
        ]);
        event
    }

    #[test]
    fn normal_mode_keeps_body() {
        let event = sample_event();
        let value = render(&event, OutputMode::Normal);
        assert_eq!(value["event"], "name=\"Kent\" firstname=\"Clark\"");
        assert_eq!(value["sourcetype"], "app:log");
        assert_eq!(value["fields"]["name"], "Kent");
    }

    #[test]
    fn kv_mode_renders_pairs_in_some_order() {
        let event = sample_event();
        let value = render(&event, OutputMode::Kv);
        let body = value["event"].as_str().unwrap();
        // 순서는 보장되지 않으므로 두 쌍의 존재만 확인
        assert!(body.contains("name=\"Kent\""));
        assert!(body.contains("firstname=\"Clark\""));
    }

    #[test]
    fn none_mode_replaces_body_with_placeholder() {
        let event = sample_event();
        let value = render(&event, OutputMode::None);
        assert_eq!(value["event"], "-");

        // 필드가 없어도 동일
        let mut empty = sample_event();
        empty.reset_fields();
        let value = render(&empty, OutputMode::None);
        assert_eq!(value["event"], "-");
    }

    #[test]
    fn minimal_mode_joins_values_and_strips_special_chars() {
        let mut event = sample_event();
        event.fields = HashMap::from([("addr".to_owned(), "101 main-street, NY".to_owned())]);
        let value = render(&event, OutputMode::Minimal);
        let body = value["event"].as_str().unwrap();
        assert_eq!(body, "101 mainstreet NY");
    }

    #[test]
    fn minimal_mode_with_empty_fields_yields_empty_body() {
        let mut event = sample_event();
        event.reset_fields();
        let value = render(&event, OutputMode::Minimal);
        assert_eq!(value["event"], "");
    }

    #[test]
    fn meta_is_dropped_from_outbound_json() {
        let mut event = sample_event();
        event.meta = "_subsecond::.500 date_hour::12".to_owned();
        let value = render(&event, OutputMode::Normal);
        assert!(value.get("meta").is_none());
        // 메모리의 이벤트는 그대로
        assert!(!event.meta.is_empty());
    }

    #[test]
    fn subsecond_field_is_dropped_from_outbound_json() {
        let mut event = sample_event();
        event
            .fields
            .insert(SUBSECOND_FIELD.to_owned(), ".500".to_owned());
        let value = render(&event, OutputMode::Normal);
        assert!(value["fields"].get(SUBSECOND_FIELD).is_none());
        assert_eq!(value["fields"]["name"], "Kent");
        // 메모리의 필드 맵은 그대로
        assert!(event.fields.contains_key(SUBSECOND_FIELD));
    }

    #[test]
    fn rewrite_body_in_place_kv() {
        let mut event = sample_event();
        rewrite_body(&mut event, OutputMode::Kv);
        assert!(event.event.contains("name=\"Kent\""));
    }

    #[test]
    fn strip_special_keeps_unicode_letters() {
        assert_eq!(strip_special("héllo, wörld!"), "héllo wörld");
        assert_eq!(strip_special("a.b,c:d;e"), "abcde");
        assert_eq!(strip_special("tab\tand newline\n"), "tab\tand newline\n");
    }
}
