//! 메트릭 상수 및 설명 등록
//!
//! 모든 Prometheus 메트릭의 이름과 설명을 중앙에서 정의합니다.
//! 각 모듈은 이 상수를 사용하여 `metrics::counter!()`, `metrics::gauge!()`
//! 매크로를 호출합니다.
//!
//! # 네이밍 컨벤션
//!
//! - 접두어: `logrelay_`
//! - 모듈명: `tcp_input_`, `extract_`, `forward_`
//! - 접미어: `_total` (counter), 없음 (gauge)
//!
//! # 사용 예시
//!
//! ```ignore
//! use metrics::counter;
//!
//! counter!(logrelay_core::metrics::EXTRACT_EVENTS_PROCESSED_TOTAL).increment(1);
//! ```

// ─── 레이블 키 상수 ────────────────────────────────────────────────

/// sourcetype 레이블 키
pub const LABEL_SOURCETYPE: &str = "sourcetype";

/// 프레이밍 레이블 키 (multiline, framed, raw)
pub const LABEL_FRAMING: &str = "framing";

/// 출력 모드 레이블 키 (normal, minimal, kv, none)
pub const LABEL_OUTPUT_MODE: &str = "output_mode";

/// 결과 레이블 키 (success, failure)
pub const LABEL_RESULT: &str = "result";

// ─── TCP 입력 메트릭 ────────────────────────────────────────────────

/// TCP 입력: 수락된 연결 수 (counter)
pub const TCP_INPUT_CONNECTIONS_TOTAL: &str = "logrelay_tcp_input_connections_total";

/// TCP 입력: 연결 수 제한으로 거부된 연결 수 (counter)
pub const TCP_INPUT_CONNECTIONS_REJECTED_TOTAL: &str =
    "logrelay_tcp_input_connections_rejected_total";

/// TCP 입력: 수신한 라인 수 (counter)
pub const TCP_INPUT_LINES_TOTAL: &str = "logrelay_tcp_input_lines_total";

/// TCP 입력: 재조립되어 방출된 이벤트 수 (counter)
pub const TCP_INPUT_EVENTS_EMITTED_TOTAL: &str = "logrelay_tcp_input_events_emitted_total";

/// TCP 입력: 프레임 문법 불일치로 드롭된 라인 수 (counter)
pub const TCP_INPUT_FRAMES_DROPPED_TOTAL: &str = "logrelay_tcp_input_frames_dropped_total";

/// TCP 입력: 유휴 타임아웃으로 플러시된 이벤트 수 (counter)
pub const TCP_INPUT_IDLE_FLUSH_TOTAL: &str = "logrelay_tcp_input_idle_flush_total";

/// TCP 입력: 현재 활성 연결 수 (gauge)
pub const TCP_INPUT_ACTIVE_CONNECTIONS: &str = "logrelay_tcp_input_active_connections";

// ─── 추출 메트릭 ────────────────────────────────────────────────────

/// 추출: 처리된 이벤트 수 (counter)
pub const EXTRACT_EVENTS_PROCESSED_TOTAL: &str = "logrelay_extract_events_processed_total";

/// 추출: 추출된 필드 수 (counter)
pub const EXTRACT_FIELDS_TOTAL: &str = "logrelay_extract_fields_total";

/// 추출: 정규식 컴파일 실패로 건너뛴 규칙 수 (counter)
pub const EXTRACT_RULES_SKIPPED_TOTAL: &str = "logrelay_extract_rules_skipped_total";

/// 추출: 규칙 저장소 질의 실패 수 (counter)
pub const EXTRACT_RULE_LOOKUP_FAILURES_TOTAL: &str =
    "logrelay_extract_rule_lookup_failures_total";

/// 추출: 캐시된 규칙 세트 수 (gauge)
pub const EXTRACT_CACHED_RULESETS: &str = "logrelay_extract_cached_rulesets";

// ─── 전달 메트릭 ────────────────────────────────────────────────────

/// 전달: 수집기로 전송된 이벤트 수 (counter, label: result)
pub const FORWARD_EVENTS_TOTAL: &str = "logrelay_forward_events_total";

/// 전달: 수집기가 거부한 이벤트 수 (counter)
pub const FORWARD_REJECTED_TOTAL: &str = "logrelay_forward_rejected_total";

/// 모든 메트릭의 설명을 레코더에 등록합니다.
///
/// 레코더 설치 직후 한 번 호출합니다.
pub fn describe_all() {
    use metrics::{describe_counter, describe_gauge};

    describe_counter!(TCP_INPUT_CONNECTIONS_TOTAL, "Accepted TCP connections");
    describe_counter!(
        TCP_INPUT_CONNECTIONS_REJECTED_TOTAL,
        "Connections rejected by the concurrent connection cap"
    );
    describe_counter!(TCP_INPUT_LINES_TOTAL, "Physical lines received");
    describe_counter!(
        TCP_INPUT_EVENTS_EMITTED_TOTAL,
        "Logical events emitted by the collectors"
    );
    describe_counter!(
        TCP_INPUT_FRAMES_DROPPED_TOTAL,
        "Lines dropped for not matching the frame grammar"
    );
    describe_counter!(
        TCP_INPUT_IDLE_FLUSH_TOTAL,
        "Events flushed by the idle timeout"
    );
    describe_gauge!(TCP_INPUT_ACTIVE_CONNECTIONS, "Currently active connections");

    describe_counter!(
        EXTRACT_EVENTS_PROCESSED_TOTAL,
        "Events run through the extraction pipeline"
    );
    describe_counter!(EXTRACT_FIELDS_TOTAL, "Fields produced by extraction rules");
    describe_counter!(
        EXTRACT_RULES_SKIPPED_TOTAL,
        "Rules skipped because they failed validation or compilation"
    );
    describe_counter!(
        EXTRACT_RULE_LOOKUP_FAILURES_TOTAL,
        "Rule repository lookups that degraded to an empty set"
    );
    describe_gauge!(EXTRACT_CACHED_RULESETS, "Rule sets held in the cache");

    describe_counter!(FORWARD_EVENTS_TOTAL, "Events handed to the collector endpoint");
    describe_counter!(
        FORWARD_REJECTED_TOTAL,
        "Events rejected by the collector endpoint"
    );
}
