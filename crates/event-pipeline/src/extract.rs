//! 정규식 필드 추출 엔진
//!
//! 명명 캡처 그룹을 가진 정규식을 텍스트 본문에 적용하여
//! 필드 맵(`name -> value`)을 생성합니다.
//!
//! # 매칭 시맨틱
//! - 첫 매칭만 사용합니다 (전역/전체 매칭 아님), 앵커 없음.
//! - 명명 그룹만 필드가 됩니다 — 그룹 0과 무명 그룹은 제외합니다.
//! - 매칭에 참여하지 않은 명명 그룹은 빈 문자열 값을 냅니다 (부재 아님).
//! - 매칭이 없으면 `None`을 반환하며 필드 맵은 변경되지 않습니다.
//!
//! # 병합 시맨틱
//! [`apply_rule_set`]은 규칙을 목록 순서대로 같은 본문에 적용하고
//! 결과를 last-write-wins로 누적합니다. 같은 규칙 세트를 두 번
//! 적용해도 결과는 같습니다 (멱등).

use std::collections::HashMap;

use regex::Regex;

use crate::rules::CompiledRuleSet;

/// 컴파일된 패턴 하나를 본문에 적용합니다.
///
/// 매칭되면 명명 캡처 그룹으로 구성된 필드 맵을, 매칭이 없으면
/// `None`을 반환합니다.
pub fn extract(regex: &Regex, text: &str) -> Option<HashMap<String, String>> {
    let captures = regex.captures(text)?;

    let mut fields = HashMap::new();
    for name in regex.capture_names().flatten() {
        let value = captures
            .name(name)
            .map(|m| m.as_str().to_owned())
            .unwrap_or_default();
        fields.insert(name.to_owned(), value);
    }
    Some(fields)
}

/// 규칙 세트를 목록 순서대로 본문에 적용하고 결과를 병합합니다.
///
/// 키 충돌 시 뒤 규칙의 값이 남습니다 — 규칙 순서는 외형이 아니라
/// 정확성에 관여하는 타이브레이크입니다. 매칭되지 않는 규칙은
/// 아무 키도 추가하지 않습니다.
pub fn apply_rule_set(rules: &CompiledRuleSet, text: &str) -> HashMap<String, String> {
    let mut merged = HashMap::new();
    for rule in rules.iter() {
        if let Some(fields) = extract(&rule.regex, text) {
            for (key, value) in fields {
                merged.insert(key, value);
            }
        }
    }
    merged
}

#[cfg(test)]
mod tests {
    use super::*;
    use logrelay_core::types::RegexRule;

    fn compile_set(patterns: &[&str]) -> CompiledRuleSet {
        let rules = patterns
            .iter()
            .enumerate()
            .map(|(i, p)| RegexRule::new("test", i.to_string(), *p))
            .collect();
        let (set, skipped) = CompiledRuleSet::compile("test", rules);
        assert_eq!(skipped, 0);
        set
    }

    #[test]
    fn extract_named_groups() {
        let regex = Regex::new(r#"name="(?P<name>\w+)" firstname="(?P<firstname>\w+)""#).unwrap();
        let fields = extract(&regex, r#"name="Kent" firstname="Clark""#).unwrap();
        assert_eq!(fields.get("name").map(String::as_str), Some("Kent"));
        assert_eq!(fields.get("firstname").map(String::as_str), Some("Clark"));
    }

    #[test]
    fn extract_no_match_returns_none() {
        let regex = Regex::new(r"(?P<num>\d+)").unwrap();
        assert!(extract(&regex, "no digits here").is_none());
    }

    #[test]
    fn extract_excludes_unnamed_groups() {
        let regex = Regex::new(r"(\w+)=(?P<value>\w+)").unwrap();
        let fields = extract(&regex, "key=val").unwrap();
        assert_eq!(fields.len(), 1);
        assert_eq!(fields.get("value").map(String::as_str), Some("val"));
    }

    #[test]
    fn extract_nonparticipating_group_yields_empty_string() {
        // 교대(alternation)에서 한쪽 그룹만 매칭에 참여
        let regex = Regex::new(r"(?P<a>foo)|(?P<b>bar)").unwrap();
        let fields = extract(&regex, "foo").unwrap();
        assert_eq!(fields.get("a").map(String::as_str), Some("foo"));
        assert_eq!(fields.get("b").map(String::as_str), Some(""));
    }

    #[test]
    fn extract_uses_first_match_only() {
        let regex = Regex::new(r"(?P<num>\d+)").unwrap();
        let fields = extract(&regex, "first 11 then 22").unwrap();
        assert_eq!(fields.get("num").map(String::as_str), Some("11"));
    }

    #[test]
    fn extract_is_unanchored() {
        let regex = Regex::new(r"(?P<word>\w+)$").unwrap();
        let fields = extract(&regex, "ends with tail").unwrap();
        assert_eq!(fields.get("word").map(String::as_str), Some("tail"));
    }

    #[test]
    fn apply_rule_set_merges_in_order() {
        let set = compile_set(&[r"src=(?P<src>\S+)", r"dst=(?P<dst>\S+)"]);
        let fields = apply_rule_set(&set, "src=10.0.0.1 dst=10.0.0.2");
        assert_eq!(fields.get("src").map(String::as_str), Some("10.0.0.1"));
        assert_eq!(fields.get("dst").map(String::as_str), Some("10.0.0.2"));
    }

    #[test]
    fn apply_rule_set_later_rule_wins_on_collision() {
        // 규칙 A는 숫자만, 규칙 B는 단어 전체를 캡처 — B가 뒤이므로 B가 이김
        let set = compile_set(&[r"name=(?P<x>\d+)", r"name=(?P<x>\w+)"]);
        let fields = apply_rule_set(&set, "name=42");
        assert_eq!(fields.get("x").map(String::as_str), Some("42"));

        let set = compile_set(&[r"v=(?P<x>\d)", r"v=(?P<x>\d+)"]);
        let fields = apply_rule_set(&set, "v=123");
        assert_eq!(fields.get("x").map(String::as_str), Some("123"));
    }

    #[test]
    fn apply_rule_set_is_idempotent() {
        let set = compile_set(&[r"user=(?P<user>\w+)", r"ip=(?P<ip>[\d.]+)"]);
        let text = "user=root ip=192.168.1.1 user=admin";
        let once = apply_rule_set(&set, text);
        let twice = {
            let mut acc = apply_rule_set(&set, text);
            for (k, v) in apply_rule_set(&set, text) {
                acc.insert(k, v);
            }
            acc
        };
        assert_eq!(once, twice);
    }

    #[test]
    fn apply_rule_set_no_match_leaves_map_unchanged() {
        let set = compile_set(&[r"user=(?P<user>\w+)", r"zzz=(?P<zzz>\d+)"]);
        let fields = apply_rule_set(&set, "user=root");
        assert_eq!(fields.len(), 1);
        assert!(!fields.contains_key("zzz"));
    }

    #[test]
    fn apply_empty_rule_set_is_noop() {
        let set = CompiledRuleSet::empty("unknown");
        let fields = apply_rule_set(&set, "anything at all");
        assert!(fields.is_empty());
    }
}
