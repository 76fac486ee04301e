//! 메타데이터 보강기 -- 내장 규칙으로 타임스탬프 구성 요소를 복원합니다.
//!
//! 이벤트의 `meta` 블롭은 `name::value` 토큰 열로 내부 타임스탬프
//! 구성 요소를 담습니다. 보강기는 외부에서 공급되지 않는 고정
//! 내장 규칙 세트를 `meta`에 적용하여 이 필드들을 복원합니다.
//!
//! # 실행 순서 불변 조건
//! 보강은 sourcetype 규칙 추출 **이후에** 항상 실행됩니다.
//! last-write-wins 병합에서 나중에 실행되므로, 사용자 규칙이 같은
//! 이름의 내장 필드를 조용히 덮어쓸 수 없습니다.
//!
//! # 후처리
//! `_subsecond` 필드 값이 있으면 `time` 필드 끝에 문자열로 덧붙입니다.
//! 다운스트림 수집기의 타임스탬프 정밀도 요구에 따른 의도된
//! 비정규화이며, 일반 병합이 아닙니다.

use logrelay_core::types::{LogEvent, RegexRule};

use crate::extract::apply_rule_set;
use crate::rules::CompiledRuleSet;

/// 서브초 필드명
pub const SUBSECOND_FIELD: &str = "_subsecond";

/// 내장 메타 규칙 (이름, 패턴)
const BUILTIN_RULES: &[(&str, &str)] = &[
    ("_subsecond", r"_subsecond::(?P<_subsecond>\S+)"),
    ("date_second", r"date_second::(?P<date_second>\d+)"),
    ("date_hour", r"date_hour::(?P<date_hour>\d+)"),
    ("date_year", r"date_year::(?P<date_year>\d+)"),
    ("date_month", r"date_month::(?P<date_month>\w+)"),
    ("date_wday", r"date_wday::(?P<date_wday>\w+)"),
    ("date_zone", r"date_zone::(?P<date_zone>\S+)"),
];

/// 메타데이터 보강기
///
/// 내장 규칙은 생성 시 한 번만 컴파일합니다. sourcetype과 무관하게
/// 모든 이벤트에 항상 적용됩니다.
pub struct MetadataEnricher {
    /// 컴파일된 내장 규칙 세트
    rules: CompiledRuleSet,
}

impl MetadataEnricher {
    /// 새 보강기를 생성합니다.
    pub fn new() -> Self {
        let rules = BUILTIN_RULES
            .iter()
            .map(|(name, pattern)| RegexRule::new("_meta", *name, *pattern))
            .collect();
        // 상수 패턴이므로 컴파일은 실패할 수 없습니다.
        let rules = CompiledRuleSet::compile_strict("_meta", rules)
            .expect("built-in metadata rules are valid");
        Self { rules }
    }

    /// 내장 규칙 수를 반환합니다.
    pub fn rule_count(&self) -> usize {
        self.rules.len()
    }

    /// 이벤트를 제자리에서 보강합니다.
    ///
    /// `meta`에서 복원된 필드를 병합한 뒤 `_subsecond` 접미사를
    /// `time`에 덧붙입니다. `meta`가 비어있으면 아무 일도 하지 않습니다.
    pub fn enrich(&self, event: &mut LogEvent) {
        if event.meta.is_empty() {
            return;
        }

        let fields = apply_rule_set(&self.rules, &event.meta);
        event.merge_fields(fields);

        if let Some(subsecond) = event.fields.get(SUBSECOND_FIELD)
            && !subsecond.is_empty()
        {
            event.time.push_str(subsecond);
        }
    }
}

impl Default for MetadataEnricher {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn event_with_meta(meta: &str) -> LogEvent {
        let mut event = LogEvent::from_body("body", "1700000000", "h", "st", "s", "i");
        event.meta = meta.to_owned();
        event
    }

    #[test]
    fn enricher_compiles_all_builtin_rules() {
        let enricher = MetadataEnricher::new();
        assert_eq!(enricher.rule_count(), 7);
    }

    #[test]
    fn recovers_date_components_from_meta() {
        let enricher = MetadataEnricher::new();
        let mut event = event_with_meta(
            "date_year::2024 date_month::january date_wday::monday date_hour::12 date_second::30 date_zone::local",
        );
        enricher.enrich(&mut event);

        assert_eq!(event.fields.get("date_year").map(String::as_str), Some("2024"));
        assert_eq!(
            event.fields.get("date_month").map(String::as_str),
            Some("january")
        );
        assert_eq!(
            event.fields.get("date_wday").map(String::as_str),
            Some("monday")
        );
        assert_eq!(event.fields.get("date_hour").map(String::as_str), Some("12"));
        assert_eq!(
            event.fields.get("date_second").map(String::as_str),
            Some("30")
        );
        assert_eq!(
            event.fields.get("date_zone").map(String::as_str),
            Some("local")
        );
    }

    #[test]
    fn appends_subsecond_to_time() {
        let enricher = MetadataEnricher::new();
        let mut event = event_with_meta("_subsecond::.500");
        enricher.enrich(&mut event);

        assert_eq!(
            event.fields.get(SUBSECOND_FIELD).map(String::as_str),
            Some(".500")
        );
        assert_eq!(event.time, "1700000000.500");
    }

    #[test]
    fn missing_subsecond_leaves_time_untouched() {
        let enricher = MetadataEnricher::new();
        let mut event = event_with_meta("date_hour::09");
        enricher.enrich(&mut event);
        assert_eq!(event.time, "1700000000");
    }

    #[test]
    fn empty_meta_is_a_noop() {
        let enricher = MetadataEnricher::new();
        let mut event = event_with_meta("");
        enricher.enrich(&mut event);
        assert!(event.fields.is_empty());
        assert_eq!(event.time, "1700000000");
    }

    #[test]
    fn builtin_fields_override_user_rules_of_same_name() {
        // sourcetype 규칙이 먼저 date_year를 넣었더라도,
        // 보강기가 나중에 실행되므로 meta에서 온 값이 남아야 함
        let enricher = MetadataEnricher::new();
        let mut event = event_with_meta("date_year::2024");
        event
            .fields
            .insert("date_year".to_owned(), "1999".to_owned());
        enricher.enrich(&mut event);
        assert_eq!(
            event.fields.get("date_year").map(String::as_str),
            Some("2024")
        );
    }

    #[test]
    fn unrelated_meta_tokens_are_ignored() {
        let enricher = MetadataEnricher::new();
        let mut event = event_with_meta("punct::\"10\" timestartpos::0");
        enricher.enrich(&mut event);
        assert!(event.fields.is_empty());
    }
}
