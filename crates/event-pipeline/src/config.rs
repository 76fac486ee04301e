//! 이벤트 파이프라인 설정
//!
//! [`PipelineConfig`]는 core의 [`LogrelayConfig`](logrelay_core::config::LogrelayConfig)를
//! 기반으로 파이프라인 전용의 타입 있는 설정을 제공합니다.
//!
//! # 사용 예시
//! ```ignore
//! use logrelay_core::config::LogrelayConfig;
//! use logrelay_event_pipeline::config::PipelineConfig;
//!
//! let core_config = LogrelayConfig::default();
//! let config = PipelineConfig::from_core(&core_config)?;
//! ```

use logrelay_core::types::OutputMode;

use crate::error::EventPipelineError;

/// TCP 전송 프레이밍 방식
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub enum Framing {
    /// 경계 정규식으로 여러 물리 라인을 하나의 논리 이벤트로 재조립 (기본값)
    #[default]
    Multiline,
    /// 업스트림이 한 줄에 한 이벤트를 `###END###` 마커로 패킹한 프레임 문법
    Framed,
    /// 한 줄 한 이벤트, 파싱 없이 본문 통과
    Raw,
}

impl Framing {
    /// 설정 문자열에서 프레이밍을 파싱합니다.
    pub fn from_config_str(s: &str) -> Result<Self, EventPipelineError> {
        match s {
            "multiline" => Ok(Self::Multiline),
            "framed" => Ok(Self::Framed),
            "raw" => Ok(Self::Raw),
            other => Err(EventPipelineError::Config {
                field: "framing".to_owned(),
                reason: format!("unknown framing '{other}'"),
            }),
        }
    }

    /// 메트릭 레이블 값으로 쓰이는 이름을 반환합니다.
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Multiline => "multiline",
            Self::Framed => "framed",
            Self::Raw => "raw",
        }
    }
}

/// 규칙 출처 설정
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RuleSourceConfig {
    /// YAML 규칙 파일 디렉토리
    File {
        /// 규칙 디렉토리 경로
        dir: String,
    },
    /// 원격 규칙 저장소 (페이지네이션 질의)
    Http {
        /// 저장소 베이스 URL
        base_url: String,
    },
    /// 추출 비활성 — 모든 sourcetype이 빈 규칙 세트를 가짐
    Disabled,
}

impl Default for RuleSourceConfig {
    fn default() -> Self {
        Self::File {
            dir: "/etc/logrelay/rules".to_owned(),
        }
    }
}

/// 이벤트 파이프라인 설정
///
/// core 설정의 문자열 필드를 파이프라인 내부에서 쓰는 타입으로
/// 변환해 담습니다. 생성 후에는 불변입니다.
#[derive(Debug, Clone)]
pub struct PipelineConfig {
    /// TCP 입력 활성화 여부
    pub tcp_enabled: bool,
    /// TCP 바인드 주소
    pub bind_addr: String,
    /// 최대 동시 연결 수
    pub max_connections: usize,
    /// 라인당 최대 크기 (바이트)
    pub max_line_bytes: usize,
    /// 유휴 타임아웃 (초)
    pub idle_timeout_secs: u64,
    /// 프레이밍 방식
    pub framing: Framing,
    /// 새 이벤트 경계 정규식 (multiline 전용)
    pub boundary_pattern: String,
    /// 프레임 헤더가 없는 전송의 기본 sourcetype
    pub default_sourcetype: String,
    /// 프레임 헤더가 없는 전송의 기본 host
    pub default_host: String,
    /// 프레임 헤더가 없는 전송의 기본 index
    pub default_index: String,
    /// 규칙 출처
    pub rule_source: RuleSourceConfig,
    /// 기본 출력 모드
    pub output_mode: OutputMode,
    /// 내부 채널 용량
    pub channel_capacity: usize,
}

impl Default for PipelineConfig {
    fn default() -> Self {
        Self {
            tcp_enabled: true,
            bind_addr: "0.0.0.0:8888".to_owned(),
            max_connections: 256,
            max_line_bytes: 1024 * 1024,
            idle_timeout_secs: 30,
            framing: Framing::Multiline,
            boundary_pattern: r"^\d{4}-\d{2}-\d{2}".to_owned(),
            default_sourcetype: "generic:line".to_owned(),
            default_host: "unknown".to_owned(),
            default_index: "main".to_owned(),
            rule_source: RuleSourceConfig::default(),
            output_mode: OutputMode::Normal,
            channel_capacity: 1024,
        }
    }
}

impl PipelineConfig {
    /// core의 `LogrelayConfig`에서 파이프라인 설정을 생성합니다.
    pub fn from_core(
        core: &logrelay_core::config::LogrelayConfig,
    ) -> Result<Self, EventPipelineError> {
        let rule_source = match core.extract.rule_source.as_str() {
            "file" => RuleSourceConfig::File {
                dir: core.extract.rule_dir.clone(),
            },
            "http" => RuleSourceConfig::Http {
                base_url: core.extract.repository_url.clone(),
            },
            "none" => RuleSourceConfig::Disabled,
            other => {
                return Err(EventPipelineError::Config {
                    field: "extract.rule_source".to_owned(),
                    reason: format!("unknown rule source '{other}'"),
                });
            }
        };

        let config = Self {
            tcp_enabled: core.tcp_input.enabled,
            bind_addr: core.tcp_input.bind_addr.clone(),
            max_connections: core.tcp_input.max_connections,
            max_line_bytes: core.tcp_input.max_line_bytes,
            idle_timeout_secs: core.tcp_input.idle_timeout_secs,
            framing: Framing::from_config_str(&core.tcp_input.framing)?,
            boundary_pattern: core.tcp_input.boundary_pattern.clone(),
            default_sourcetype: core.tcp_input.default_sourcetype.clone(),
            default_host: core.tcp_input.default_host.clone(),
            default_index: core.tcp_input.default_index.clone(),
            rule_source,
            output_mode: OutputMode::from_selector(&core.extract.output_mode),
            channel_capacity: 1024,
        };
        config.validate()?;
        Ok(config)
    }

    /// 설정값의 유효성을 검증합니다.
    pub fn validate(&self) -> Result<(), EventPipelineError> {
        const MAX_LINE_BYTES_LIMIT: usize = 16 * 1024 * 1024; // 16MB
        const MAX_CHANNEL_CAPACITY: usize = 1_000_000;

        if self.tcp_enabled {
            if self.bind_addr.is_empty() {
                return Err(EventPipelineError::Config {
                    field: "bind_addr".to_owned(),
                    reason: "must not be empty".to_owned(),
                });
            }

            if self.max_connections == 0 {
                return Err(EventPipelineError::Config {
                    field: "max_connections".to_owned(),
                    reason: "must be greater than 0".to_owned(),
                });
            }

            if self.idle_timeout_secs == 0 {
                return Err(EventPipelineError::Config {
                    field: "idle_timeout_secs".to_owned(),
                    reason: "must be greater than 0".to_owned(),
                });
            }
        }

        if self.max_line_bytes == 0 || self.max_line_bytes > MAX_LINE_BYTES_LIMIT {
            return Err(EventPipelineError::Config {
                field: "max_line_bytes".to_owned(),
                reason: format!("must be 1-{MAX_LINE_BYTES_LIMIT}"),
            });
        }

        if self.channel_capacity == 0 || self.channel_capacity > MAX_CHANNEL_CAPACITY {
            return Err(EventPipelineError::Config {
                field: "channel_capacity".to_owned(),
                reason: format!("must be 1-{MAX_CHANNEL_CAPACITY}"),
            });
        }

        // 경계 정규식은 여기서 한 번 컴파일하여 시작 전에 오류를 드러냅니다.
        if self.framing == Framing::Multiline {
            if self.boundary_pattern.is_empty() {
                return Err(EventPipelineError::Config {
                    field: "boundary_pattern".to_owned(),
                    reason: "must not be empty for multiline framing".to_owned(),
                });
            }
            regex::Regex::new(&self.boundary_pattern).map_err(|e| {
                EventPipelineError::Config {
                    field: "boundary_pattern".to_owned(),
                    reason: format!("invalid regex: {e}"),
                }
            })?;
        }

        Ok(())
    }
}

/// 파이프라인 설정 빌더
///
/// 필드가 많으므로 빌더 패턴을 사용합니다.
#[derive(Default)]
pub struct PipelineConfigBuilder {
    config: PipelineConfig,
}

impl PipelineConfigBuilder {
    /// 새 빌더를 생성합니다.
    pub fn new() -> Self {
        Self::default()
    }

    /// TCP 입력 활성화 여부를 설정합니다.
    pub fn tcp_enabled(mut self, enabled: bool) -> Self {
        self.config.tcp_enabled = enabled;
        self
    }

    /// TCP 바인드 주소를 설정합니다.
    pub fn bind_addr(mut self, addr: impl Into<String>) -> Self {
        self.config.bind_addr = addr.into();
        self
    }

    /// 최대 동시 연결 수를 설정합니다.
    pub fn max_connections(mut self, max: usize) -> Self {
        self.config.max_connections = max;
        self
    }

    /// 유휴 타임아웃(초)을 설정합니다.
    pub fn idle_timeout_secs(mut self, secs: u64) -> Self {
        self.config.idle_timeout_secs = secs;
        self
    }

    /// 프레이밍 방식을 설정합니다.
    pub fn framing(mut self, framing: Framing) -> Self {
        self.config.framing = framing;
        self
    }

    /// 경계 정규식을 설정합니다.
    pub fn boundary_pattern(mut self, pattern: impl Into<String>) -> Self {
        self.config.boundary_pattern = pattern.into();
        self
    }

    /// 기본 sourcetype을 설정합니다.
    pub fn default_sourcetype(mut self, sourcetype: impl Into<String>) -> Self {
        self.config.default_sourcetype = sourcetype.into();
        self
    }

    /// 규칙 출처를 설정합니다.
    pub fn rule_source(mut self, source: RuleSourceConfig) -> Self {
        self.config.rule_source = source;
        self
    }

    /// 기본 출력 모드를 설정합니다.
    pub fn output_mode(mut self, mode: OutputMode) -> Self {
        self.config.output_mode = mode;
        self
    }

    /// 내부 채널 용량을 설정합니다.
    pub fn channel_capacity(mut self, capacity: usize) -> Self {
        self.config.channel_capacity = capacity;
        self
    }

    /// 설정을 검증하고 `PipelineConfig`를 생성합니다.
    pub fn build(self) -> Result<PipelineConfig, EventPipelineError> {
        self.config.validate()?;
        Ok(self.config)
    }
}
