//! 파이프라인 오케스트레이션 -- 수집/추출/보강/렌더링의 전체 흐름을 관리합니다.
//!
//! [`EventPipeline`]은 core의 [`Pipeline`](logrelay_core::pipeline::Pipeline)
//! trait을 구현하여 `logrelay-daemon`에서 표준 생명주기로 관리됩니다.
//!
//! # 내부 아키텍처
//! ```text
//! TcpCollector -> mpsc -> processing loop -> mpsc -> Forwarder
//!                         (reset fields -> rules -> enrich -> render)
//! ```
//!
//! 이벤트는 자신을 처리하는 태스크가 배타적으로 소유하며, 유일한 공유
//! 자원은 읽기 위주의 규칙 캐시입니다. 연결 간 순서 보장은 없고,
//! 연결 내 방출 순서는 라인 도착 순서와 같습니다.

use std::sync::Arc;
use std::sync::atomic::{AtomicU64, Ordering};

use metrics::counter;
use tokio::sync::mpsc;
use tokio_util::sync::CancellationToken;
use tracing::{debug, error, info};

use logrelay_core::error::{LogrelayError, PipelineError};
use logrelay_core::event::PipelineEvent;
use logrelay_core::metrics as metric_names;
use logrelay_core::pipeline::{HealthStatus, Pipeline};
use logrelay_core::types::OutputMode;

use crate::collector::TcpCollector;
use crate::config::PipelineConfig;
use crate::enrich::MetadataEnricher;
use crate::error::EventPipelineError;
use crate::extract::apply_rule_set;
use crate::format::render;
use crate::forward::OutboundEvent;
use crate::rules::{RuleCache, RuleProvider};

/// 파이프라인 실행 상태
#[derive(Debug, Clone, PartialEq, Eq)]
enum PipelineState {
    /// 초기화됨, 아직 시작하지 않음
    Initialized,
    /// 실행 중
    Running,
    /// 정지됨
    Stopped,
}

/// 이벤트 파이프라인 — 수집/추출/보강/렌더링의 전체 흐름을 관리합니다.
///
/// # 사용 예시
/// ```ignore
/// use logrelay_event_pipeline::{EventPipeline, EventPipelineBuilder};
///
/// let (mut pipeline, outbound_rx) = EventPipelineBuilder::new()
///     .config(config)
///     .build()?;
///
/// pipeline.start().await?;
/// // outbound_rx에서 렌더링된 이벤트를 소비 (포워더)
/// ```
pub struct EventPipeline {
    /// 파이프라인 설정
    config: PipelineConfig,
    /// 현재 상태
    state: PipelineState,
    /// sourcetype별 규칙 캐시 (읽기 위주 공유 자원)
    rules: Arc<RuleCache>,
    /// 메타데이터 보강기
    enricher: Arc<MetadataEnricher>,
    /// 수집기 -> 파이프라인 채널 송신측
    raw_tx: mpsc::Sender<PipelineEvent>,
    /// 수집기 -> 파이프라인 채널 수신측 (실행 중에는 처리 루프가 소유)
    raw_rx: Option<mpsc::Receiver<PipelineEvent>>,
    /// 파이프라인 -> 포워더 채널
    out_tx: mpsc::Sender<OutboundEvent>,
    /// 실행 중 태스크 취소 토큰
    cancel: CancellationToken,
    /// 백그라운드 태스크 핸들
    tasks: Vec<tokio::task::JoinHandle<()>>,
    /// 처리된 이벤트 카운터
    processed: Arc<AtomicU64>,
    /// 실제 바인드된 주소 (시작 후, TCP 활성 시)
    bound_addr: Option<std::net::SocketAddr>,
}

impl EventPipeline {
    /// 현재 상태 이름을 반환합니다.
    pub fn state_name(&self) -> &str {
        match self.state {
            PipelineState::Initialized => "initialized",
            PipelineState::Running => "running",
            PipelineState::Stopped => "stopped",
        }
    }

    /// 처리된 이벤트 수를 반환합니다.
    pub fn processed_count(&self) -> u64 {
        self.processed.load(Ordering::Relaxed)
    }

    /// 수집기 채널 송신측을 반환합니다.
    ///
    /// 테스트나 외부 수집기가 파이프라인에 이벤트를 직접 주입할 때
    /// 사용합니다.
    pub fn raw_sender(&self) -> mpsc::Sender<PipelineEvent> {
        self.raw_tx.clone()
    }

    /// 규칙 캐시를 반환합니다.
    pub fn rule_cache(&self) -> Arc<RuleCache> {
        Arc::clone(&self.rules)
    }

    /// 실제 바인드된 수집기 주소를 반환합니다.
    ///
    /// 포트 0으로 바인드한 경우 실제 할당 포트를 알아낼 때 사용합니다.
    pub fn bound_addr(&self) -> Option<std::net::SocketAddr> {
        self.bound_addr
    }
}

impl Pipeline for EventPipeline {
    async fn start(&mut self) -> Result<(), LogrelayError> {
        if self.state == PipelineState::Running {
            return Err(PipelineError::AlreadyRunning.into());
        }

        info!("starting event pipeline");

        // 재시작이면 수집기 채널을 새로 만듭니다.
        let raw_rx = match self.raw_rx.take() {
            Some(rx) => rx,
            None => {
                let (tx, rx) = mpsc::channel(self.config.channel_capacity);
                self.raw_tx = tx;
                rx
            }
        };

        self.cancel = CancellationToken::new();

        // 1. TCP 수집기 (활성화된 경우) — 바인드 실패는 시작 실패로 전파
        if self.config.tcp_enabled {
            let mut collector = TcpCollector::new(
                self.config.clone(),
                self.raw_tx.clone(),
                self.cancel.clone(),
            );
            let listener = collector.bind().await.map_err(LogrelayError::from)?;
            self.bound_addr = listener.local_addr().ok();

            self.tasks.push(tokio::spawn(async move {
                if let Err(e) = collector.run_with(listener).await {
                    error!(error = %e, "tcp collector terminated");
                }
            }));
        }

        // 2. 처리 루프
        let rules = Arc::clone(&self.rules);
        let enricher = Arc::clone(&self.enricher);
        let out_tx = self.out_tx.clone();
        let cancel = self.cancel.clone();
        let processed = Arc::clone(&self.processed);
        let output_mode = self.config.output_mode;

        self.tasks.push(tokio::spawn(async move {
            processing_loop(raw_rx, out_tx, rules, enricher, output_mode, processed, cancel).await;
        }));

        self.state = PipelineState::Running;
        info!("event pipeline started");
        Ok(())
    }

    async fn stop(&mut self) -> Result<(), LogrelayError> {
        if self.state != PipelineState::Running {
            return Err(PipelineError::NotRunning.into());
        }

        info!("stopping event pipeline");

        // 취소 신호로 수집기/처리 루프를 내리고, 남은 태스크는 중단합니다.
        self.cancel.cancel();
        for task in self.tasks.drain(..) {
            task.abort();
        }

        self.state = PipelineState::Stopped;
        info!("event pipeline stopped");
        Ok(())
    }

    async fn health_check(&self) -> HealthStatus {
        match self.state {
            PipelineState::Running => {
                if self.out_tx.is_closed() {
                    HealthStatus::Degraded("outbound channel closed".to_owned())
                } else {
                    HealthStatus::Healthy
                }
            }
            PipelineState::Initialized => HealthStatus::Unhealthy("not started".to_owned()),
            PipelineState::Stopped => HealthStatus::Unhealthy("stopped".to_owned()),
        }
    }
}

/// 메인 처리 루프 — 수집된 이벤트를 추출/보강/렌더링하여 전달합니다.
async fn processing_loop(
    mut raw_rx: mpsc::Receiver<PipelineEvent>,
    out_tx: mpsc::Sender<OutboundEvent>,
    rules: Arc<RuleCache>,
    enricher: Arc<MetadataEnricher>,
    output_mode: OutputMode,
    processed: Arc<AtomicU64>,
    cancel: CancellationToken,
) {
    loop {
        tokio::select! {
            maybe_event = raw_rx.recv() => {
                let Some(mut pipeline_event) = maybe_event else {
                    debug!("raw channel closed, processing loop exiting");
                    break;
                };

                // 불변 조건: 추출 전 필드 맵은 빈 상태로 시작합니다.
                pipeline_event.event.reset_fields();

                let rule_set = rules.get(&pipeline_event.event.sourcetype).await;
                let fields = apply_rule_set(&rule_set, &pipeline_event.event.event);
                counter!(metric_names::EXTRACT_FIELDS_TOTAL).increment(fields.len() as u64);
                pipeline_event.event.merge_fields(fields);

                // 보강은 항상 sourcetype 규칙 이후 — 내장 필드 우선.
                enricher.enrich(&mut pipeline_event.event);

                let payload = render(&pipeline_event.event, output_mode);
                let outbound = OutboundEvent {
                    id: pipeline_event.id,
                    trace_id: pipeline_event.metadata.trace_id,
                    payload,
                };

                processed.fetch_add(1, Ordering::Relaxed);
                counter!(metric_names::EXTRACT_EVENTS_PROCESSED_TOTAL).increment(1);

                if out_tx.send(outbound).await.is_err() {
                    // 포워더가 사라졌어도 수집 자체는 계속합니다 (이벤트는 드롭).
                    debug!("outbound channel closed, dropping rendered event");
                }
            }
            _ = cancel.cancelled() => {
                debug!("processing loop received shutdown signal");
                break;
            }
        }
    }
}

/// 이벤트 파이프라인 빌더
///
/// 파이프라인을 구성하고 필요한 채널을 생성합니다.
pub struct EventPipelineBuilder {
    config: PipelineConfig,
    out_tx: Option<mpsc::Sender<OutboundEvent>>,
    out_channel_capacity: usize,
}

impl EventPipelineBuilder {
    /// 새 빌더를 생성합니다.
    pub fn new() -> Self {
        Self {
            config: PipelineConfig::default(),
            out_tx: None,
            out_channel_capacity: 1024,
        }
    }

    /// 파이프라인 설정을 지정합니다.
    pub fn config(mut self, config: PipelineConfig) -> Self {
        self.config = config;
        self
    }

    /// 외부 아웃바운드 채널을 설정합니다.
    ///
    /// 설정하지 않으면 빌더가 새 채널을 생성합니다.
    pub fn outbound_sender(mut self, tx: mpsc::Sender<OutboundEvent>) -> Self {
        self.out_tx = Some(tx);
        self
    }

    /// 아웃바운드 채널 용량을 설정합니다 (외부 채널 미사용 시).
    pub fn outbound_channel_capacity(mut self, capacity: usize) -> Self {
        self.out_channel_capacity = capacity;
        self
    }

    /// 파이프라인을 빌드합니다.
    ///
    /// # Returns
    /// - `EventPipeline`: 파이프라인 인스턴스
    /// - `Option<mpsc::Receiver<OutboundEvent>>`: 아웃바운드 수신 채널
    ///   (외부 outbound_sender를 설정한 경우 None)
    pub fn build(
        self,
    ) -> Result<(EventPipeline, Option<mpsc::Receiver<OutboundEvent>>), EventPipelineError> {
        self.config.validate()?;

        let (raw_tx, raw_rx) = mpsc::channel(self.config.channel_capacity);

        let (out_tx, out_rx) = if let Some(tx) = self.out_tx {
            (tx, None)
        } else {
            let (tx, rx) = mpsc::channel(self.out_channel_capacity);
            (tx, Some(rx))
        };

        let provider = RuleProvider::from_config(&self.config.rule_source)?;

        let pipeline = EventPipeline {
            config: self.config,
            state: PipelineState::Initialized,
            rules: Arc::new(RuleCache::new(provider)),
            enricher: Arc::new(MetadataEnricher::new()),
            raw_tx,
            raw_rx: Some(raw_rx),
            out_tx,
            cancel: CancellationToken::new(),
            tasks: Vec::new(),
            processed: Arc::new(AtomicU64::new(0)),
            bound_addr: None,
        };

        Ok((pipeline, out_rx))
    }
}

impl Default for EventPipelineBuilder {
    fn default() -> Self {
        Self::new()
    }
}
