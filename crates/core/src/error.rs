//! 에러 타입 — 도메인별 에러 정의

/// Logrelay 최상위 에러 타입
#[derive(Debug, thiserror::Error)]
pub enum LogrelayError {
    /// 설정 관련 에러
    #[error("config error: {0}")]
    Config(#[from] ConfigError),

    /// 파이프라인 처리 에러
    #[error("pipeline error: {0}")]
    Pipeline(#[from] PipelineError),

    /// 필드 추출 에러
    #[error("extract error: {0}")]
    Extract(#[from] ExtractError),

    /// 규칙 저장소 에러
    #[error("rule error: {0}")]
    Rule(#[from] RuleError),

    /// 다운스트림 전달 에러
    #[error("forward error: {0}")]
    Forward(#[from] ForwardError),

    /// I/O 에러
    #[error("io error: {0}")]
    Io(#[from] std::io::Error),
}

/// 설정 관련 에러
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    /// 설정 파일을 찾을 수 없음
    #[error("config file not found: {path}")]
    FileNotFound { path: String },

    /// 설정 파싱 실패
    #[error("failed to parse config: {reason}")]
    ParseFailed { reason: String },

    /// 유효하지 않은 설정 값
    #[error("invalid config value for '{field}': {reason}")]
    InvalidValue { field: String, reason: String },
}

/// 파이프라인 처리 에러
#[derive(Debug, thiserror::Error)]
pub enum PipelineError {
    /// 채널 전송 실패
    #[error("channel send failed: {0}")]
    ChannelSend(String),

    /// 채널 수신 실패
    #[error("channel receive failed: {0}")]
    ChannelRecv(String),

    /// 파이프라인 초기화 실패
    #[error("pipeline init failed: {0}")]
    InitFailed(String),

    /// 이미 실행 중인 파이프라인을 다시 시작함
    #[error("pipeline already running")]
    AlreadyRunning,

    /// 실행 중이 아닌 파이프라인을 정지함
    #[error("pipeline not running")]
    NotRunning,
}

/// 필드 추출 에러
#[derive(Debug, thiserror::Error)]
pub enum ExtractError {
    /// 정규식 컴파일 실패 — 해당 규칙/요청 범위로 한정되며 치명적이지 않음
    #[error("regex compile failed for '{class}': {reason}")]
    RegexCompile { class: String, reason: String },

    /// 인바운드 본문이 기대한 구조가 아님
    #[error("malformed inbound body: {0}")]
    MalformedBody(String),
}

/// 규칙 저장소 에러
#[derive(Debug, thiserror::Error)]
pub enum RuleError {
    /// 규칙 파일/저장소 로딩 실패
    #[error("rule load error: {source_name}: {reason}")]
    Load {
        source_name: String,
        reason: String,
    },

    /// 규칙 유효성 검증 실패
    #[error("rule validation error: {sourcetype}/{class}: {reason}")]
    Validation {
        sourcetype: String,
        class: String,
        reason: String,
    },

    /// 규칙 저장소 질의 실패
    #[error("rule repository query failed: {0}")]
    Repository(String),
}

/// 다운스트림 전달 에러
#[derive(Debug, thiserror::Error)]
pub enum ForwardError {
    /// 수집기 HTTP 호출 실패 (연결, 타임아웃 등)
    #[error("collector request failed: {0}")]
    Request(String),

    /// 수집기가 2xx 이외의 상태로 응답함
    #[error("collector rejected event: status {status}")]
    Rejected { status: u16 },
}
