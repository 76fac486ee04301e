//! 이벤트 엔벨로프 — 모듈 간 통신의 기본 단위
//!
//! 파이프라인 단계 간 전달은 이벤트 기반 메시지 패싱으로 수행됩니다.
//! [`EventMetadata`]는 모든 이벤트에 공통으로 포함되는 추적 정보이며,
//! [`PipelineEvent`]는 [`LogEvent`]를 감싸 수집부터 전달까지 같은
//! trace id로 흐름을 추적할 수 있게 합니다. 엔벨로프는 내부 전용이며
//! 다운스트림 수집기로 직렬화되지 않습니다.

use std::fmt;
use std::time::SystemTime;

use serde::{Deserialize, Serialize};

use crate::types::LogEvent;

// --- 모듈명 상수 ---

/// TCP 입력 수집기 모듈명
pub const MODULE_TCP_INPUT: &str = "tcp-input";
/// 추출 파이프라인 모듈명
pub const MODULE_EVENT_PIPELINE: &str = "event-pipeline";
/// 요청 핸들러 모듈명
pub const MODULE_HANDLER: &str = "handler";

// --- 이벤트 타입 상수 ---

/// 로그 이벤트 타입
pub const EVENT_TYPE_LOG: &str = "log";

/// 이벤트 메타데이터 — 모든 이벤트에 공통으로 포함되는 추적 정보
///
/// 각 이벤트의 발생 시각, 생성 모듈, 추적 ID를 담고 있어
/// 이벤트 흐름을 추적하고 디버깅할 수 있습니다.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EventMetadata {
    /// 이벤트 발생 시각
    pub timestamp: SystemTime,
    /// 이벤트를 생성한 모듈명 (예: "tcp-input", "handler")
    pub source_module: String,
    /// 추적 ID — 같은 흐름의 이벤트를 연결합니다
    pub trace_id: String,
}

impl EventMetadata {
    /// 기존 trace_id를 사용하여 새 메타데이터를 생성합니다.
    pub fn new(source_module: impl Into<String>, trace_id: impl Into<String>) -> Self {
        Self {
            timestamp: SystemTime::now(),
            source_module: source_module.into(),
            trace_id: trace_id.into(),
        }
    }

    /// 새로운 UUID v4 trace_id를 생성하여 메타데이터를 만듭니다.
    ///
    /// 새로운 이벤트 체인의 시작점(연결 수락, 요청 수신)에서 사용합니다.
    pub fn with_new_trace(source_module: impl Into<String>) -> Self {
        Self {
            timestamp: SystemTime::now(),
            source_module: source_module.into(),
            trace_id: uuid::Uuid::new_v4().to_string(),
        }
    }
}

impl fmt::Display for EventMetadata {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "[{}] source={} trace={}",
            unix_timestamp_str(self.timestamp),
            self.source_module,
            self.trace_id,
        )
    }
}

/// 모든 이벤트가 구현해야 하는 기본 trait
///
/// `Send + Sync + 'static` 바운드로 `tokio::mpsc` 채널을 통한
/// 안전한 전송을 보장합니다.
pub trait Event: Send + Sync + 'static {
    /// 이벤트 고유 ID (UUID v4)
    fn event_id(&self) -> &str;

    /// 이벤트 메타데이터 (timestamp, source_module, trace_id)
    fn metadata(&self) -> &EventMetadata;

    /// 이벤트 타입명 (로깅 및 라우팅에 사용)
    fn event_type(&self) -> &str;
}

/// 파이프라인을 흐르는 로그 이벤트 엔벨로프
///
/// 수집기가 생성하고, 추출/보강/렌더링 단계가 `event`를 제자리에서
/// 변형한 뒤 포워더가 소비합니다. 각 인스턴스는 자신을 처리하는
/// 태스크가 배타적으로 소유합니다.
#[derive(Debug, Clone)]
pub struct PipelineEvent {
    /// 이벤트 고유 ID
    pub id: String,
    /// 이벤트 메타데이터
    pub metadata: EventMetadata,
    /// 로그 이벤트 본체
    pub event: LogEvent,
}

impl PipelineEvent {
    /// 새로운 trace를 시작하는 파이프라인 이벤트를 생성합니다.
    pub fn new(event: LogEvent, source_module: &'static str) -> Self {
        Self {
            id: uuid::Uuid::new_v4().to_string(),
            metadata: EventMetadata::with_new_trace(source_module),
            event,
        }
    }

    /// 기존 trace에 연결된 파이프라인 이벤트를 생성합니다.
    ///
    /// 같은 연결에서 나온 이벤트들을 하나의 trace로 묶을 때 사용합니다.
    pub fn with_trace(
        event: LogEvent,
        source_module: &'static str,
        trace_id: impl Into<String>,
    ) -> Self {
        Self {
            id: uuid::Uuid::new_v4().to_string(),
            metadata: EventMetadata::new(source_module, trace_id),
            event,
        }
    }
}

impl Event for PipelineEvent {
    fn event_id(&self) -> &str {
        &self.id
    }

    fn metadata(&self) -> &EventMetadata {
        &self.metadata
    }

    fn event_type(&self) -> &str {
        EVENT_TYPE_LOG
    }
}

impl fmt::Display for PipelineEvent {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "PipelineEvent[{}] sourcetype={} host={} fields={}",
            &self.id[..8.min(self.id.len())],
            self.event.sourcetype,
            self.event.host,
            self.event.fields.len(),
        )
    }
}

/// SystemTime을 에포크 초 문자열로 변환합니다.
fn unix_timestamp_str(time: SystemTime) -> String {
    match time.duration_since(SystemTime::UNIX_EPOCH) {
        Ok(duration) => {
            let secs = duration.as_secs();
            format!("{secs}")
        }
        Err(_) => "unknown".to_owned(),
    }
}
