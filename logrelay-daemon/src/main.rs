use anyhow::Result;
use clap::Parser;
use tokio::sync::mpsc;
use tokio_util::sync::CancellationToken;

use logrelay_core::config::LogrelayConfig;
use logrelay_core::pipeline::Pipeline;
use logrelay_event_pipeline::forward::OutboundEvent;
use logrelay_event_pipeline::{CollectorClient, EventPipelineBuilder, PipelineConfig};

mod cli;
mod logging;
mod metrics_server;

use cli::DaemonCli;

#[tokio::main]
async fn main() -> Result<()> {
    let args = DaemonCli::parse();

    // 설정 로드 + CLI 오버라이드
    let mut config = LogrelayConfig::load(&args.config)
        .await
        .map_err(|e| anyhow::anyhow!("failed to load config {}: {}", args.config.display(), e))?;
    if let Some(level) = args.log_level {
        config.general.log_level = level;
    }
    if let Some(format) = args.log_format {
        config.general.log_format = format;
    }
    config
        .validate()
        .map_err(|e| anyhow::anyhow!("invalid config: {}", e))?;

    if args.validate {
        println!("config ok: {}", args.config.display());
        return Ok(());
    }

    logging::init_tracing(&config.general)?;
    tracing::info!(config = %args.config.display(), "logrelay-daemon starting");

    if config.metrics.enabled {
        metrics_server::install_metrics_recorder(&config.metrics)?;
    }

    // 파이프라인 빌드
    let pipeline_config = PipelineConfig::from_core(&config)
        .map_err(|e| anyhow::anyhow!("failed to derive pipeline config: {}", e))?;

    let (outbound_tx, outbound_rx) = mpsc::channel::<OutboundEvent>(1024);
    let (mut pipeline, _) = EventPipelineBuilder::new()
        .config(pipeline_config)
        .outbound_sender(outbound_tx)
        .build()
        .map_err(|e| anyhow::anyhow!("failed to build pipeline: {}", e))?;

    tracing::info!("event pipeline initialized");

    // 포워더 태스크 — 비활성화 시 드레인 싱크로 대체
    let forward_cancel = CancellationToken::new();
    let forwarder_task = if config.forward.enabled {
        let client = CollectorClient::new(&config.forward)
            .map_err(|e| anyhow::anyhow!("failed to build collector client: {}", e))?;
        let cancel = forward_cancel.clone();
        tokio::spawn(async move {
            client.run(outbound_rx, cancel).await;
        })
    } else {
        tracing::warn!("forwarder disabled, rendered events will be discarded");
        let cancel = forward_cancel.clone();
        tokio::spawn(async move {
            discard_sink(outbound_rx, cancel).await;
        })
    };

    // 파이프라인 시작
    pipeline
        .start()
        .await
        .map_err(|e| anyhow::anyhow!("failed to start pipeline: {}", e))?;
    if let Some(addr) = pipeline.bound_addr() {
        tracing::info!(%addr, "tcp input listening");
    }

    // 종료 시그널 대기
    tracing::info!("logrelay-daemon running");
    tokio::signal::ctrl_c().await?;
    tracing::info!("shutdown signal received");

    // 우아한 종료 — 파이프라인 먼저, 포워더는 잔여 이벤트를 비운 뒤
    if let Err(e) = pipeline.stop().await {
        tracing::error!(error = %e, "failed to stop pipeline");
    }
    forward_cancel.cancel();
    if let Err(e) = forwarder_task.await {
        tracing::error!(error = %e, "forwarder task join failed");
    }

    tracing::info!("logrelay-daemon shut down");
    Ok(())
}

/// 포워더 비활성 시 아웃바운드 채널을 비우는 싱크.
async fn discard_sink(
    mut rx: mpsc::Receiver<OutboundEvent>,
    cancel: CancellationToken,
) {
    loop {
        tokio::select! {
            maybe_event = rx.recv() => {
                let Some(event) = maybe_event else { break };
                tracing::debug!(event_id = %event.id, "discarding rendered event (forwarder disabled)");
            }
            _ = cancel.cancelled() => break,
        }
    }
}
