#![doc = include_str!("../README.md")]
//!
//! # 모듈 구성
//!
//! - [`collector`]: TCP 수집기 (연결당 태스크, 유휴 타임아웃, 프레이밍)
//! - [`reassembler`]: 물리 라인 -> 논리 이벤트 경계 재조립
//! - [`frame`]: `###END###` 프레임 문법 파서
//! - [`extract`]: 명명 캡처 정규식 필드 추출 엔진
//! - [`rules`]: 규칙 출처 (YAML 디렉토리 / 원격 저장소)와 스냅샷 캐시
//! - [`enrich`]: 내장 메타데이터 규칙 보강기
//! - [`format`]: 출력 모드 렌더링 (normal/minimal/kv/none)
//! - [`handler`]: 요청/응답 방식의 추출 진입점
//! - [`forward`]: 다운스트림 수집기 전달
//! - [`pipeline`]: 전체 파이프라인 오케스트레이션 (Pipeline trait 구현)
//! - [`config`]: 파이프라인 설정 (core 설정 확장)
//! - [`error`]: 도메인 에러 타입

pub mod config;
pub mod error;
pub mod pipeline;

pub mod collector;
pub mod enrich;
pub mod extract;
pub mod format;
pub mod forward;
pub mod frame;
pub mod handler;
pub mod reassembler;
pub mod rules;

// --- 주요 타입 re-export ---

// 파이프라인
pub use pipeline::{EventPipeline, EventPipelineBuilder};

// 설정
pub use config::{Framing, PipelineConfig, PipelineConfigBuilder, RuleSourceConfig};

// 에러
pub use error::EventPipelineError;

// 수집기
pub use collector::TcpCollector;

// 재조립기 / 프레임 파서
pub use frame::FrameParser;
pub use reassembler::EventReassembler;

// 규칙 엔진
pub use rules::{CompiledRuleSet, FileRuleSource, HttpRuleSource, RuleCache, RuleProvider};

// 보강 / 렌더링
pub use enrich::MetadataEnricher;
pub use format::render;

// 요청 핸들러
pub use handler::{ExtractRequest, ExtractResponse, ExtractService};

// 포워더
pub use forward::{CollectorClient, OutboundEvent};
