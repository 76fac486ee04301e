//! TCP 수집기
//!
//! TCP 소켓으로 로그 라인을 수신하여 논리 이벤트로 변환합니다.
//! 프레이밍 방식에 따라 경계 재조립(multiline), 프레임 문법
//! 파싱(framed), 통과(raw) 중 하나로 동작합니다.
//!
//! # 타임아웃 시맨틱
//! 읽기 데드라인은 라인을 하나 읽을 때마다 리셋됩니다. 설정된 유휴
//! 시간(기본 30초) 안에 새 라인이 도착하지 않으면 스트림을 닫힌
//! 것으로 간주하고, 누적 중인 이벤트를 플러시한 뒤 연결을 종료합니다.

use std::sync::Arc;
use std::time::Duration;

use metrics::{counter, gauge};
use regex::Regex;
use tokio::io::{AsyncBufReadExt, BufReader};
use tokio::net::{TcpListener, TcpStream};
use tokio::sync::{Semaphore, mpsc};
use tokio::time::timeout;
use tokio_util::sync::CancellationToken;
use tracing::{debug, error, info, warn};

use logrelay_core::event::{MODULE_TCP_INPUT, PipelineEvent};
use logrelay_core::metrics as metric_names;
use logrelay_core::types::LogEvent;

use super::CollectorStatus;
use crate::config::{Framing, PipelineConfig};
use crate::error::EventPipelineError;
use crate::frame::FrameParser;
use crate::reassembler::EventReassembler;

/// TCP 수집기
///
/// TCP 소켓에서 로그 라인을 수신합니다.
/// 각 TCP 연결은 별도의 tokio 태스크에서 처리됩니다.
pub struct TcpCollector {
    /// 파이프라인 설정
    config: PipelineConfig,
    /// 수집된 이벤트 전송 채널
    tx: mpsc::Sender<PipelineEvent>,
    /// Cancellation token for graceful shutdown
    cancel_token: CancellationToken,
    /// 현재 상태
    status: CollectorStatus,
}

impl TcpCollector {
    /// 새 TCP 수집기를 생성합니다.
    pub fn new(
        config: PipelineConfig,
        tx: mpsc::Sender<PipelineEvent>,
        cancel_token: CancellationToken,
    ) -> Self {
        Self {
            config,
            tx,
            cancel_token,
            status: CollectorStatus::Idle,
        }
    }

    /// 바인드 주소를 반환합니다.
    pub fn bind_addr(&self) -> &str {
        &self.config.bind_addr
    }

    /// 현재 상태를 반환합니다.
    pub fn status(&self) -> &CollectorStatus {
        &self.status
    }

    /// 리스닝 소켓을 바인드합니다.
    ///
    /// 바인드 실패는 치명적 에러로 전파됩니다 — 그 이후의 모든 연결
    /// 단위 에러는 해당 연결에만 국한됩니다. 파이프라인은 시작 시점에
    /// 바인드 실패를 바로 드러내기 위해 이 단계를 분리해 호출합니다.
    pub async fn bind(&self) -> Result<TcpListener, EventPipelineError> {
        TcpListener::bind(&self.config.bind_addr)
            .await
            .map_err(|e| EventPipelineError::Collector {
                source_type: "tcp".to_owned(),
                reason: format!("failed to bind to {}: {}", self.config.bind_addr, e),
            })
    }

    /// 수집기를 시작합니다 (바인드 + 수락 루프).
    pub async fn run(&mut self) -> Result<(), EventPipelineError> {
        let listener = self.bind().await?;
        self.run_with(listener).await
    }

    /// 이미 바인드된 리스너로 연결 수락 루프를 실행합니다.
    pub async fn run_with(&mut self, listener: TcpListener) -> Result<(), EventPipelineError> {
        self.status = CollectorStatus::Running;
        info!("tcp collector listening on {}", self.config.bind_addr);

        // 연결 수 제한을 위한 세마포어
        let connection_semaphore = Arc::new(Semaphore::new(self.config.max_connections));

        loop {
            tokio::select! {
                result = listener.accept() => {
                    let (stream, addr) = match result {
                        Ok(accepted) => accepted,
                        Err(e) => {
                            // 일시적 수락 실패는 수락 루프를 죽이지 않습니다.
                            warn!(error = %e, "accept failed");
                            continue;
                        }
                    };

                    debug!("accepted connection from {}", addr);
                    counter!(metric_names::TCP_INPUT_CONNECTIONS_TOTAL).increment(1);

                    let permit = match connection_semaphore.clone().try_acquire_owned() {
                        Ok(p) => p,
                        Err(_) => {
                            counter!(metric_names::TCP_INPUT_CONNECTIONS_REJECTED_TOTAL)
                                .increment(1);
                            warn!("max connections reached, rejecting connection from {}", addr);
                            continue;
                        }
                    };

                    gauge!(metric_names::TCP_INPUT_ACTIVE_CONNECTIONS).increment(1.0);

                    let tx = self.tx.clone();
                    let config = self.config.clone();
                    let cancel = self.cancel_token.clone();

                    // 각 연결을 별도 태스크에서 처리 — 연결 에러는 서로 격리됩니다.
                    tokio::spawn(async move {
                        if let Err(e) = handle_connection(stream, tx, config, cancel).await {
                            error!("connection handler error: {}", e);
                        }
                        gauge!(metric_names::TCP_INPUT_ACTIVE_CONNECTIONS).decrement(1.0);
                        drop(permit); // 연결 종료 시 세마포어 반환
                    });
                }
                _ = self.cancel_token.cancelled() => {
                    info!("tcp collector received shutdown signal");
                    self.status = CollectorStatus::Stopped;
                    break;
                }
            }
        }

        Ok(())
    }
}

/// 단일 TCP 연결을 처리합니다.
///
/// 연결 하나가 하나의 trace를 이룹니다 — 이 연결에서 방출되는 모든
/// 이벤트는 같은 trace_id를 공유합니다.
async fn handle_connection(
    stream: TcpStream,
    tx: mpsc::Sender<PipelineEvent>,
    config: PipelineConfig,
    cancel: CancellationToken,
) -> Result<(), EventPipelineError> {
    let peer_addr = stream
        .peer_addr()
        .map(|a| a.to_string())
        .unwrap_or_else(|_| "unknown".to_owned());
    let trace_id = uuid::Uuid::new_v4().to_string();
    let source = format!("tcp:{peer_addr}");

    // 연결 단위 프레이밍 상태 — 다른 연결과 절대 공유되지 않습니다.
    let mut reassembler = match config.framing {
        Framing::Multiline => {
            let boundary = Regex::new(&config.boundary_pattern)?;
            Some(EventReassembler::new(boundary))
        }
        _ => None,
    };
    let frame_parser = match config.framing {
        Framing::Framed => Some(FrameParser::new()),
        _ => None,
    };

    let idle_timeout = Duration::from_secs(config.idle_timeout_secs);
    let mut reader = BufReader::new(stream);
    let mut line_buffer: Vec<u8> = Vec::new();

    loop {
        line_buffer.clear();

        // 타임아웃과 함께 라인 읽기 — 데드라인은 매 라인 후 리셋됩니다.
        tokio::select! {
            result = timeout(idle_timeout, reader.read_until(b'\n', &mut line_buffer)) => {
                match result {
                    Ok(Ok(0)) => {
                        // EOF — 잔여 이벤트 플러시 후 종료
                        debug!("connection closed by peer: {}", peer_addr);
                        flush_remainder(reassembler.as_mut(), &tx, &config, &source, &trace_id)
                            .await?;
                        break;
                    }
                    Ok(Ok(_)) => {
                        if line_buffer.len() > config.max_line_bytes {
                            warn!(
                                "line exceeds max size from {} ({} bytes, max: {}), closing connection",
                                peer_addr,
                                line_buffer.len(),
                                config.max_line_bytes
                            );
                            flush_remainder(reassembler.as_mut(), &tx, &config, &source, &trace_id)
                                .await?;
                            break;
                        }

                        counter!(metric_names::TCP_INPUT_LINES_TOTAL).increment(1);

                        // 인코딩이 깨진 라인도 손실 변환으로 통과시킵니다 (치명적 아님).
                        let line = String::from_utf8_lossy(&line_buffer);
                        let line = line.trim_end_matches(['\r', '\n']);

                        handle_line(
                            line,
                            reassembler.as_mut(),
                            frame_parser.as_ref(),
                            &tx,
                            &config,
                            &source,
                            &trace_id,
                        )
                        .await?;
                    }
                    Ok(Err(e)) => {
                        error!("read error from {}: {}", peer_addr, e);
                        flush_remainder(reassembler.as_mut(), &tx, &config, &source, &trace_id)
                            .await?;
                        return Err(EventPipelineError::Collector {
                            source_type: "tcp".to_owned(),
                            reason: format!("read error: {e}"),
                        });
                    }
                    Err(_) => {
                        // 유휴 타임아웃 — 방출 관점에서 스트림 종료로 간주
                        debug!("idle timeout from {}, flushing", peer_addr);
                        counter!(metric_names::TCP_INPUT_IDLE_FLUSH_TOTAL).increment(1);
                        flush_remainder(reassembler.as_mut(), &tx, &config, &source, &trace_id)
                            .await?;
                        break;
                    }
                }
            }
            _ = cancel.cancelled() => {
                debug!("connection handler for {} received shutdown signal", peer_addr);
                flush_remainder(reassembler.as_mut(), &tx, &config, &source, &trace_id).await?;
                break;
            }
        }
    }

    Ok(())
}

/// 라인 하나를 프레이밍 방식에 따라 처리합니다.
async fn handle_line(
    line: &str,
    reassembler: Option<&mut EventReassembler>,
    frame_parser: Option<&FrameParser>,
    tx: &mpsc::Sender<PipelineEvent>,
    config: &PipelineConfig,
    source: &str,
    trace_id: &str,
) -> Result<(), EventPipelineError> {
    match config.framing {
        Framing::Multiline => {
            if let Some(reassembler) = reassembler
                && let Some(body) = reassembler.push_line(line)
            {
                emit_body(body, tx, config, source, trace_id).await?;
            }
        }
        Framing::Framed => {
            if line.is_empty() {
                return Ok(());
            }
            match frame_parser.and_then(|p| p.parse_line(line)) {
                Some(event) => emit_event(event, tx, trace_id).await?,
                None => {
                    // 프레임 문법 불일치 — 방출 없이 드롭, 진단만 남김
                    counter!(metric_names::TCP_INPUT_FRAMES_DROPPED_TOTAL).increment(1);
                    debug!(bytes = line.len(), "line does not match frame grammar, dropped");
                }
            }
        }
        Framing::Raw => {
            if line.is_empty() {
                return Ok(());
            }
            emit_body(line.to_owned(), tx, config, source, trace_id).await?;
        }
    }
    Ok(())
}

/// 누적 중인 잔여 이벤트를 방출합니다 (EOF, 타임아웃, 셧다운).
async fn flush_remainder(
    reassembler: Option<&mut EventReassembler>,
    tx: &mpsc::Sender<PipelineEvent>,
    config: &PipelineConfig,
    source: &str,
    trace_id: &str,
) -> Result<(), EventPipelineError> {
    if let Some(reassembler) = reassembler
        && let Some(body) = reassembler.flush()
    {
        emit_body(body, tx, config, source, trace_id).await?;
    }
    Ok(())
}

/// 본문만 있는 이벤트를 입력 기본값으로 감싸 방출합니다.
async fn emit_body(
    body: String,
    tx: &mpsc::Sender<PipelineEvent>,
    config: &PipelineConfig,
    source: &str,
    trace_id: &str,
) -> Result<(), EventPipelineError> {
    let event = LogEvent::from_body(
        body,
        chrono::Utc::now().timestamp().to_string(),
        config.default_host.clone(),
        config.default_sourcetype.clone(),
        source,
        config.default_index.clone(),
    );
    emit_event(event, tx, trace_id).await
}

/// 이벤트를 파이프라인 채널로 전송합니다.
async fn emit_event(
    event: LogEvent,
    tx: &mpsc::Sender<PipelineEvent>,
    trace_id: &str,
) -> Result<(), EventPipelineError> {
    counter!(metric_names::TCP_INPUT_EVENTS_EMITTED_TOTAL).increment(1);
    tx.send(PipelineEvent::with_trace(event, MODULE_TCP_INPUT, trace_id))
        .await
        .map_err(|e| EventPipelineError::Channel(e.to_string()))
}
