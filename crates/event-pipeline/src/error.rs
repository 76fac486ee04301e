//! 이벤트 파이프라인 에러 타입
//!
//! [`EventPipelineError`]는 이벤트 파이프라인 내부에서 발생하는 모든 에러를 표현합니다.
//! `From<EventPipelineError> for LogrelayError` 변환이 구현되어 있어
//! 상위 레이어에서 `?` 연산자로 자연스럽게 전파할 수 있습니다.

use logrelay_core::error::{
    ExtractError, ForwardError, LogrelayError, PipelineError, RuleError,
};

/// 이벤트 파이프라인 도메인 에러
///
/// 수집, 재조립, 규칙 로딩, 필드 추출, 렌더링, 전달 등
/// 파이프라인 내부의 모든 에러 상황을 포괄합니다.
#[derive(Debug, thiserror::Error)]
pub enum EventPipelineError {
    /// 수집기 에러 (바인드 실패, 네트워크 등)
    #[error("collector error: {source_type}: {reason}")]
    Collector {
        /// 수집 소스 유형 (tcp 등)
        source_type: String,
        /// 에러 사유
        reason: String,
    },

    /// 규칙 로딩 실패
    #[error("rule load error: {source_name}: {reason}")]
    RuleLoad {
        /// 규칙 출처 (디렉토리 경로, 저장소 URL)
        source_name: String,
        /// 로딩 실패 사유
        reason: String,
    },

    /// 규칙 유효성 검증 실패
    #[error("rule validation error: {sourcetype}/{class}: {reason}")]
    RuleValidation {
        /// 문제가 된 규칙의 sourcetype
        sourcetype: String,
        /// 문제가 된 규칙의 class
        class: String,
        /// 검증 실패 사유
        reason: String,
    },

    /// 규칙 저장소 질의 실패
    #[error("rule repository error: {0}")]
    Repository(String),

    /// 인바운드 본문이 기대한 구조가 아님
    #[error("malformed body: {0}")]
    MalformedBody(String),

    /// 다운스트림 전달 실패
    #[error("forward error: {0}")]
    Forward(String),

    /// 수집기가 2xx 이외의 상태로 응답함
    #[error("collector endpoint rejected event: status {0}")]
    ForwardRejected(u16),

    /// 설정 에러
    #[error("config error: {field}: {reason}")]
    Config {
        /// 설정 필드명
        field: String,
        /// 에러 사유
        reason: String,
    },

    /// 채널 통신 에러
    #[error("channel error: {0}")]
    Channel(String),

    /// I/O 에러
    #[error("io error: {0}")]
    Io(#[from] std::io::Error),

    /// 정규식 컴파일 에러
    #[error("regex error: {0}")]
    Regex(#[from] regex::Error),
}

impl From<EventPipelineError> for LogrelayError {
    fn from(err: EventPipelineError) -> Self {
        match err {
            EventPipelineError::RuleLoad {
                source_name,
                reason,
            } => LogrelayError::Rule(RuleError::Load {
                source_name,
                reason,
            }),
            EventPipelineError::RuleValidation {
                sourcetype,
                class,
                reason,
            } => LogrelayError::Rule(RuleError::Validation {
                sourcetype,
                class,
                reason,
            }),
            EventPipelineError::Repository(reason) => {
                LogrelayError::Rule(RuleError::Repository(reason))
            }
            EventPipelineError::MalformedBody(reason) => {
                LogrelayError::Extract(ExtractError::MalformedBody(reason))
            }
            EventPipelineError::Regex(e) => LogrelayError::Extract(ExtractError::RegexCompile {
                class: "(inline)".to_owned(),
                reason: e.to_string(),
            }),
            EventPipelineError::Forward(reason) => {
                LogrelayError::Forward(ForwardError::Request(reason))
            }
            EventPipelineError::ForwardRejected(status) => {
                LogrelayError::Forward(ForwardError::Rejected { status })
            }
            EventPipelineError::Io(e) => LogrelayError::Io(e),
            other => LogrelayError::Pipeline(PipelineError::InitFailed(other.to_string())),
        }
    }
}
