//! logrelay.toml 통합 설정 테스트
//!
//! - logrelay.toml.example 파싱 테스트
//! - 부분 설정 (일부 섹션만) 로딩 테스트
//! - 환경변수 우선순위 테스트
//! - 빈 파일 / 잘못된 형식 에러 테스트

use logrelay_core::config::LogrelayConfig;
use logrelay_core::error::{ConfigError, LogrelayError};

// =============================================================================
// logrelay.toml.example 파싱 테스트
// =============================================================================

#[test]
fn example_config_parses_successfully() {
    let content = include_str!("../../../logrelay.toml.example");
    let config = LogrelayConfig::parse(content).expect("example config should parse");

    // general 기본값 확인
    assert_eq!(config.general.log_level, "info");
    assert_eq!(config.general.log_format, "json");
}

#[test]
fn example_config_passes_validation() {
    let content = include_str!("../../../logrelay.toml.example");
    let config = LogrelayConfig::parse(content).expect("should parse");
    config
        .validate()
        .expect("example config should pass validation");
}

#[test]
fn example_config_has_correct_tcp_input_defaults() {
    let content = include_str!("../../../logrelay.toml.example");
    let config = LogrelayConfig::parse(content).expect("should parse");

    assert!(config.tcp_input.enabled);
    assert_eq!(config.tcp_input.bind_addr, "0.0.0.0:8888");
    assert_eq!(config.tcp_input.max_connections, 256);
    assert_eq!(config.tcp_input.max_line_bytes, 1048576);
    assert_eq!(config.tcp_input.idle_timeout_secs, 30);
    assert_eq!(config.tcp_input.framing, "multiline");
    assert_eq!(config.tcp_input.boundary_pattern, r"^\d{4}-\d{2}-\d{2}");
}

#[test]
fn example_config_has_correct_extract_defaults() {
    let content = include_str!("../../../logrelay.toml.example");
    let config = LogrelayConfig::parse(content).expect("should parse");

    assert_eq!(config.extract.rule_source, "file");
    assert_eq!(config.extract.rule_dir, "/etc/logrelay/rules");
    assert_eq!(config.extract.output_mode, "normal");
}

#[test]
fn example_config_has_correct_forward_defaults() {
    let content = include_str!("../../../logrelay.toml.example");
    let config = LogrelayConfig::parse(content).expect("should parse");

    assert!(!config.forward.enabled);
    assert!(config.forward.collector_url.is_empty());
    assert_eq!(config.forward.request_timeout_secs, 10);
}

// =============================================================================
// 부분 설정 로딩 테스트
// =============================================================================

#[test]
fn partial_config_only_general_section() {
    let toml = r#"
[general]
log_level = "trace"
"#;
    let config = LogrelayConfig::parse(toml).expect("should parse");
    assert_eq!(config.general.log_level, "trace");
    // 나머지 섹션은 기본값
    assert_eq!(config.tcp_input.bind_addr, "0.0.0.0:8888");
    assert_eq!(config.extract.rule_source, "file");
}

#[test]
fn partial_config_only_forward_section() {
    let toml = r#"
[forward]
enabled = true
collector_url = "http://hec.internal:8088/services/collector/event"
token = "secret"
"#;
    let config = LogrelayConfig::parse(toml).expect("should parse");
    config.validate().expect("should validate");
    assert!(config.forward.enabled);
    assert_eq!(config.forward.token, "secret");
}

// =============================================================================
// 에러 케이스
// =============================================================================

#[test]
fn empty_config_uses_all_defaults() {
    let config = LogrelayConfig::parse("").expect("empty config should parse");
    config.validate().expect("defaults should validate");
}

#[test]
fn malformed_toml_reports_parse_error() {
    let result = LogrelayConfig::parse("[tcp_input\nbind_addr = ");
    match result {
        Err(LogrelayError::Config(ConfigError::ParseFailed { .. })) => {}
        other => panic!("expected ParseFailed, got: {other:?}"),
    }
}

#[test]
fn wrong_value_type_reports_parse_error() {
    let result = LogrelayConfig::parse("[tcp_input]\nmax_connections = \"lots\"");
    assert!(result.is_err());
}
