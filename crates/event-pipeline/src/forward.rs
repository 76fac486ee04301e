//! 다운스트림 포워더 -- 렌더링된 이벤트를 수집기 엔드포인트로 전달합니다.
//!
//! 전달은 최선 노력(best effort)입니다: 응답 상태는 로그로 남기고
//! 호출자에게 보고하지만, 이 코어는 재시도하지 않습니다. 전달 실패는
//! 해당 이벤트에 국한되며 이웃 이벤트나 연결에 영향을 주지 않습니다.
//!
//! 여러 연결에서 온 이벤트는 하나의 채널로 합류하여 단일 포워더
//! 태스크가 순서대로 전송합니다 — 공유 파일 핸들 같은 동기화 없는
//! 공유 쓰기는 존재하지 않습니다.

use std::time::Duration;

use metrics::counter;
use serde_json::Value;
use tokio::sync::mpsc;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};

use logrelay_core::config::ForwardConfig;
use logrelay_core::metrics as metric_names;

use crate::error::EventPipelineError;

/// 포워더로 전달되는 아웃바운드 이벤트
#[derive(Debug, Clone)]
pub struct OutboundEvent {
    /// 원본 파이프라인 이벤트 ID
    pub id: String,
    /// 추적 ID
    pub trace_id: String,
    /// 렌더링된 JSON 페이로드
    pub payload: Value,
}

/// 수집기 클라이언트
///
/// 설정된 수집기 URL로 렌더링된 JSON을 POST합니다.
pub struct CollectorClient {
    /// 수집기 엔드포인트 URL
    collector_url: String,
    /// 인증 토큰
    token: String,
    /// HTTP 클라이언트
    client: reqwest::Client,
}

impl CollectorClient {
    /// 새 수집기 클라이언트를 생성합니다.
    pub fn new(config: &ForwardConfig) -> Result<Self, EventPipelineError> {
        let client = reqwest::Client::builder()
            .timeout(Duration::from_secs(config.request_timeout_secs))
            .build()
            .map_err(|e| EventPipelineError::Forward(format!("client build failed: {e}")))?;

        Ok(Self {
            collector_url: config.collector_url.clone(),
            token: config.token.clone(),
            client,
        })
    }

    /// 수집기 URL을 반환합니다.
    pub fn collector_url(&self) -> &str {
        &self.collector_url
    }

    /// 이벤트 하나를 수집기로 전달합니다.
    ///
    /// 성공 시 응답 상태 코드를 반환합니다. 2xx 이외의 상태는
    /// 에러로 보고하지만 재시도하지 않습니다.
    pub async fn forward(&self, payload: &Value) -> Result<u16, EventPipelineError> {
        let mut request = self.client.post(&self.collector_url).json(payload);
        if !self.token.is_empty() {
            request = request.header("Authorization", format!("Splunk {}", self.token));
        }

        let response = request
            .send()
            .await
            .map_err(|e| EventPipelineError::Forward(format!("request failed: {e}")))?;

        let status = response.status();
        debug!(status = status.as_u16(), "collector response");

        if !status.is_success() {
            counter!(metric_names::FORWARD_REJECTED_TOTAL).increment(1);
            return Err(EventPipelineError::ForwardRejected(status.as_u16()));
        }

        Ok(status.as_u16())
    }

    /// 아웃바운드 채널을 소비하는 포워더 루프를 실행합니다.
    ///
    /// 이벤트마다 전달을 시도하고 결과를 로그로 남깁니다. 실패한
    /// 이벤트는 버려집니다 (at-least-once 보장 없음 — 명시적 비목표).
    pub async fn run(&self, mut rx: mpsc::Receiver<OutboundEvent>, cancel: CancellationToken) {
        info!(url = %self.collector_url, "forwarder started");

        loop {
            tokio::select! {
                maybe_event = rx.recv() => {
                    let Some(event) = maybe_event else {
                        debug!("outbound channel closed, forwarder exiting");
                        break;
                    };

                    match self.forward(&event.payload).await {
                        Ok(status) => {
                            counter!(metric_names::FORWARD_EVENTS_TOTAL, metric_names::LABEL_RESULT => "success")
                                .increment(1);
                            debug!(
                                event_id = %event.id,
                                trace_id = %event.trace_id,
                                status,
                                "event forwarded"
                            );
                        }
                        Err(e) => {
                            counter!(metric_names::FORWARD_EVENTS_TOTAL, metric_names::LABEL_RESULT => "failure")
                                .increment(1);
                            warn!(
                                event_id = %event.id,
                                trace_id = %event.trace_id,
                                error = %e,
                                "event delivery failed, dropping"
                            );
                        }
                    }
                }
                _ = cancel.cancelled() => {
                    info!("forwarder received shutdown signal");
                    break;
                }
            }
        }
    }
}
