//! 설정 관리 — logrelay.toml 파싱 및 런타임 설정
//!
//! [`LogrelayConfig`]는 모든 모듈의 설정을 담는 최상위 구조체입니다.
//!
//! # 설정 로딩 우선순위
//! 1. CLI 인자 (최고 우선)
//! 2. 환경변수 (`LOGRELAY_TCP_INPUT_BIND_ADDR=0.0.0.0:9000` 형식)
//! 3. 설정 파일 (`logrelay.toml`)
//! 4. 기본값 (`Default` 구현)
//!
//! # 사용 예시
//! ```no_run
//! # async fn example() -> Result<(), logrelay_core::error::LogrelayError> {
//! use logrelay_core::config::LogrelayConfig;
//!
//! // 파일에서 로드 + 환경변수 오버라이드
//! let config = LogrelayConfig::load("logrelay.toml").await?;
//!
//! // TOML 문자열에서 직접 파싱
//! let config = LogrelayConfig::parse("[general]\nlog_level = \"debug\"")?;
//! # Ok(())
//! # }
//! ```

use std::path::Path;

use serde::{Deserialize, Serialize};
use tracing::warn;

use crate::error::{ConfigError, LogrelayError};

/// Logrelay 통합 설정
///
/// `logrelay.toml` 파일의 최상위 구조를 나타냅니다.
/// 각 모듈은 자기 섹션만 읽어 사용합니다.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct LogrelayConfig {
    /// 일반 설정
    #[serde(default)]
    pub general: GeneralConfig,
    /// TCP 입력 설정
    #[serde(default)]
    pub tcp_input: TcpInputConfig,
    /// 필드 추출 설정
    #[serde(default)]
    pub extract: ExtractConfig,
    /// 다운스트림 전달 설정
    #[serde(default)]
    pub forward: ForwardConfig,
    /// 메트릭 노출 설정
    #[serde(default)]
    pub metrics: MetricsConfig,
}

impl LogrelayConfig {
    /// TOML 파일에서 설정을 로드하고 환경변수 오버라이드를 적용합니다.
    pub async fn load(path: impl AsRef<Path>) -> Result<Self, LogrelayError> {
        let mut config = Self::from_file(path).await?;
        config.apply_env_overrides();
        config.validate()?;
        Ok(config)
    }

    /// TOML 파일에서 설정을 로드합니다 (환경변수 오버라이드 없음).
    pub async fn from_file(path: impl AsRef<Path>) -> Result<Self, LogrelayError> {
        let path = path.as_ref();
        let content = tokio::fs::read_to_string(path).await.map_err(|e| {
            if e.kind() == std::io::ErrorKind::NotFound {
                LogrelayError::Config(ConfigError::FileNotFound {
                    path: path.display().to_string(),
                })
            } else {
                LogrelayError::Io(e)
            }
        })?;
        let config = Self::parse(&content)?;
        config.validate()?;
        Ok(config)
    }

    /// TOML 문자열에서 설정을 파싱합니다.
    pub fn parse(toml_str: &str) -> Result<Self, LogrelayError> {
        toml::from_str(toml_str).map_err(|e| {
            LogrelayError::Config(ConfigError::ParseFailed {
                reason: e.to_string(),
            })
        })
    }

    /// 환경변수로 설정값을 오버라이드합니다.
    ///
    /// 환경변수 네이밍 규칙: `LOGRELAY_{SECTION}_{FIELD}`
    /// 예: `LOGRELAY_FORWARD_TOKEN=...`
    pub fn apply_env_overrides(&mut self) {
        // General
        override_string(&mut self.general.log_level, "LOGRELAY_GENERAL_LOG_LEVEL");
        override_string(&mut self.general.log_format, "LOGRELAY_GENERAL_LOG_FORMAT");

        // TCP input
        override_bool(&mut self.tcp_input.enabled, "LOGRELAY_TCP_INPUT_ENABLED");
        override_string(&mut self.tcp_input.bind_addr, "LOGRELAY_TCP_INPUT_BIND_ADDR");
        override_usize(
            &mut self.tcp_input.max_connections,
            "LOGRELAY_TCP_INPUT_MAX_CONNECTIONS",
        );
        override_usize(
            &mut self.tcp_input.max_line_bytes,
            "LOGRELAY_TCP_INPUT_MAX_LINE_BYTES",
        );
        override_u64(
            &mut self.tcp_input.idle_timeout_secs,
            "LOGRELAY_TCP_INPUT_IDLE_TIMEOUT_SECS",
        );
        override_string(&mut self.tcp_input.framing, "LOGRELAY_TCP_INPUT_FRAMING");
        override_string(
            &mut self.tcp_input.boundary_pattern,
            "LOGRELAY_TCP_INPUT_BOUNDARY_PATTERN",
        );
        override_string(
            &mut self.tcp_input.default_sourcetype,
            "LOGRELAY_TCP_INPUT_DEFAULT_SOURCETYPE",
        );
        override_string(
            &mut self.tcp_input.default_host,
            "LOGRELAY_TCP_INPUT_DEFAULT_HOST",
        );
        override_string(
            &mut self.tcp_input.default_index,
            "LOGRELAY_TCP_INPUT_DEFAULT_INDEX",
        );

        // Extract
        override_string(&mut self.extract.rule_source, "LOGRELAY_EXTRACT_RULE_SOURCE");
        override_string(
            &mut self.extract.repository_url,
            "LOGRELAY_EXTRACT_REPOSITORY_URL",
        );
        override_string(&mut self.extract.rule_dir, "LOGRELAY_EXTRACT_RULE_DIR");
        override_string(&mut self.extract.output_mode, "LOGRELAY_EXTRACT_OUTPUT_MODE");

        // Forward
        override_bool(&mut self.forward.enabled, "LOGRELAY_FORWARD_ENABLED");
        override_string(&mut self.forward.collector_url, "LOGRELAY_FORWARD_COLLECTOR_URL");
        override_string(&mut self.forward.token, "LOGRELAY_FORWARD_TOKEN");
        override_u64(
            &mut self.forward.request_timeout_secs,
            "LOGRELAY_FORWARD_REQUEST_TIMEOUT_SECS",
        );

        // Metrics
        override_bool(&mut self.metrics.enabled, "LOGRELAY_METRICS_ENABLED");
        override_string(&mut self.metrics.bind_addr, "LOGRELAY_METRICS_BIND_ADDR");
    }

    /// 설정값의 유효성을 검증합니다.
    pub fn validate(&self) -> Result<(), LogrelayError> {
        // log_level 검증
        let valid_levels = ["trace", "debug", "info", "warn", "error"];
        if !valid_levels.contains(&self.general.log_level.as_str()) {
            return Err(ConfigError::InvalidValue {
                field: "general.log_level".to_owned(),
                reason: format!("must be one of: {}", valid_levels.join(", ")),
            }
            .into());
        }

        // log_format 검증
        let valid_formats = ["json", "pretty"];
        if !valid_formats.contains(&self.general.log_format.as_str()) {
            return Err(ConfigError::InvalidValue {
                field: "general.log_format".to_owned(),
                reason: format!("must be one of: {}", valid_formats.join(", ")),
            }
            .into());
        }

        // framing 검증
        if self.tcp_input.enabled {
            let valid_framings = ["multiline", "framed", "raw"];
            if !valid_framings.contains(&self.tcp_input.framing.as_str()) {
                return Err(ConfigError::InvalidValue {
                    field: "tcp_input.framing".to_owned(),
                    reason: format!("must be one of: {}", valid_framings.join(", ")),
                }
                .into());
            }

            if self.tcp_input.bind_addr.is_empty() {
                return Err(ConfigError::InvalidValue {
                    field: "tcp_input.bind_addr".to_owned(),
                    reason: "bind_addr must not be empty when tcp_input is enabled".to_owned(),
                }
                .into());
            }

            if self.tcp_input.framing == "multiline" && self.tcp_input.boundary_pattern.is_empty()
            {
                return Err(ConfigError::InvalidValue {
                    field: "tcp_input.boundary_pattern".to_owned(),
                    reason: "boundary_pattern must not be empty for multiline framing".to_owned(),
                }
                .into());
            }

            if self.tcp_input.max_connections == 0 {
                return Err(ConfigError::InvalidValue {
                    field: "tcp_input.max_connections".to_owned(),
                    reason: "must be greater than 0".to_owned(),
                }
                .into());
            }

            if self.tcp_input.idle_timeout_secs == 0 {
                return Err(ConfigError::InvalidValue {
                    field: "tcp_input.idle_timeout_secs".to_owned(),
                    reason: "must be greater than 0".to_owned(),
                }
                .into());
            }
        }

        // rule_source 검증
        let valid_sources = ["http", "file", "none"];
        if !valid_sources.contains(&self.extract.rule_source.as_str()) {
            return Err(ConfigError::InvalidValue {
                field: "extract.rule_source".to_owned(),
                reason: format!("must be one of: {}", valid_sources.join(", ")),
            }
            .into());
        }

        if self.extract.rule_source == "http" && self.extract.repository_url.is_empty() {
            return Err(ConfigError::InvalidValue {
                field: "extract.repository_url".to_owned(),
                reason: "repository_url must not be empty for http rule source".to_owned(),
            }
            .into());
        }

        if self.extract.rule_source == "file" && self.extract.rule_dir.is_empty() {
            return Err(ConfigError::InvalidValue {
                field: "extract.rule_dir".to_owned(),
                reason: "rule_dir must not be empty for file rule source".to_owned(),
            }
            .into());
        }

        // output_mode 검증 (요청 헤더와 달리 설정 파일 오타는 명시적으로 거부)
        let valid_modes = ["normal", "minimal", "kv", "none"];
        if !valid_modes.contains(&self.extract.output_mode.as_str()) {
            return Err(ConfigError::InvalidValue {
                field: "extract.output_mode".to_owned(),
                reason: format!("must be one of: {}", valid_modes.join(", ")),
            }
            .into());
        }

        // forward 검증
        if self.forward.enabled {
            if self.forward.collector_url.is_empty() {
                return Err(ConfigError::InvalidValue {
                    field: "forward.collector_url".to_owned(),
                    reason: "collector_url must not be empty when forward is enabled".to_owned(),
                }
                .into());
            }

            if self.forward.request_timeout_secs == 0 {
                return Err(ConfigError::InvalidValue {
                    field: "forward.request_timeout_secs".to_owned(),
                    reason: "must be greater than 0".to_owned(),
                }
                .into());
            }
        }

        Ok(())
    }
}

/// 일반 설정
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct GeneralConfig {
    /// 로그 레벨 (trace, debug, info, warn, error)
    pub log_level: String,
    /// 로그 형식 (json, pretty)
    pub log_format: String,
}

impl Default for GeneralConfig {
    fn default() -> Self {
        Self {
            log_level: "info".to_owned(),
            log_format: "json".to_owned(),
        }
    }
}

/// TCP 입력 설정
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct TcpInputConfig {
    /// 활성화 여부
    pub enabled: bool,
    /// 바인드 주소 (예: "0.0.0.0:8888")
    pub bind_addr: String,
    /// 최대 동시 연결 수
    pub max_connections: usize,
    /// 라인당 최대 크기 (바이트)
    pub max_line_bytes: usize,
    /// 유휴 타임아웃 (초) — 이 시간 동안 라인이 없으면 잔여 이벤트를 플러시
    pub idle_timeout_secs: u64,
    /// 프레이밍 방식 (multiline, framed, raw)
    pub framing: String,
    /// 새 이벤트 시작을 판별하는 경계 정규식 (multiline 전용)
    pub boundary_pattern: String,
    /// 프레임 헤더가 없는 전송의 기본 sourcetype
    pub default_sourcetype: String,
    /// 프레임 헤더가 없는 전송의 기본 host
    pub default_host: String,
    /// 프레임 헤더가 없는 전송의 기본 index
    pub default_index: String,
}

impl Default for TcpInputConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            bind_addr: "0.0.0.0:8888".to_owned(),
            max_connections: 256,
            max_line_bytes: 1024 * 1024, // 1MB
            idle_timeout_secs: 30,
            framing: "multiline".to_owned(),
            boundary_pattern: r"^\d{4}-\d{2}-\d{2}".to_owned(),
            default_sourcetype: "generic:line".to_owned(),
            default_host: "unknown".to_owned(),
            default_index: "main".to_owned(),
        }
    }
}

/// 필드 추출 설정
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ExtractConfig {
    /// 규칙 출처 (http: 원격 저장소, file: YAML 디렉토리, none: 추출 비활성)
    pub rule_source: String,
    /// 규칙 저장소 베이스 URL (rule_source = "http")
    pub repository_url: String,
    /// 규칙 YAML 디렉토리 (rule_source = "file")
    pub rule_dir: String,
    /// 기본 출력 모드 (normal, minimal, kv, none)
    pub output_mode: String,
}

impl Default for ExtractConfig {
    fn default() -> Self {
        Self {
            rule_source: "file".to_owned(),
            repository_url: String::new(),
            rule_dir: "/etc/logrelay/rules".to_owned(),
            output_mode: "normal".to_owned(),
        }
    }
}

/// 다운스트림 전달 설정
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ForwardConfig {
    /// 활성화 여부
    pub enabled: bool,
    /// 수집기 엔드포인트 URL
    pub collector_url: String,
    /// 인증 토큰 (Authorization 헤더로 전송)
    pub token: String,
    /// 요청 타임아웃 (초)
    pub request_timeout_secs: u64,
}

impl Default for ForwardConfig {
    fn default() -> Self {
        Self {
            enabled: false,
            collector_url: String::new(),
            token: String::new(),
            request_timeout_secs: 10,
        }
    }
}

/// 메트릭 노출 설정
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct MetricsConfig {
    /// 활성화 여부
    pub enabled: bool,
    /// Prometheus 엔드포인트 바인드 주소
    pub bind_addr: String,
}

impl Default for MetricsConfig {
    fn default() -> Self {
        Self {
            enabled: false,
            bind_addr: "127.0.0.1:9598".to_owned(),
        }
    }
}

// --- 환경변수 오버라이드 헬퍼 ---

fn override_string(target: &mut String, env_key: &str) {
    if let Ok(val) = std::env::var(env_key) {
        *target = val;
    }
}

fn override_bool(target: &mut bool, env_key: &str) {
    if let Ok(val) = std::env::var(env_key) {
        match val.parse::<bool>() {
            Ok(parsed) => *target = parsed,
            Err(_) => warn!(
                env_key,
                value = val.as_str(),
                "failed to parse bool from env var, ignoring"
            ),
        }
    }
}

fn override_usize(target: &mut usize, env_key: &str) {
    if let Ok(val) = std::env::var(env_key) {
        match val.parse::<usize>() {
            Ok(parsed) => *target = parsed,
            Err(_) => warn!(
                env_key,
                value = val.as_str(),
                "failed to parse usize from env var, ignoring"
            ),
        }
    }
}

fn override_u64(target: &mut u64, env_key: &str) {
    if let Ok(val) = std::env::var(env_key) {
        match val.parse::<u64>() {
            Ok(parsed) => *target = parsed,
            Err(_) => warn!(
                env_key,
                value = val.as_str(),
                "failed to parse u64 from env var, ignoring"
            ),
        }
    }
}
