//! `linkprobe run` – serve the controller.

use anyhow::Result;
use linkprobe_core::config::LinkprobeConfig;
use linkprobe_core::engine::Engine;
use linkprobe_core::host::chromium::ChromiumHost;
use linkprobe_core::service::Service;
use std::sync::Arc;
use tokio::sync::mpsc;

pub async fn run_service(cfg: &LinkprobeConfig) -> Result<()> {
    let (events_tx, events_rx) = mpsc::unbounded_channel();
    let host = ChromiumHost::launch(&cfg.browser, &cfg.probe, events_tx).await?;
    let engine = Engine::new(cfg.probe.matcher(), cfg.max_batch);
    let service = Service::new(
        cfg.controller_url.clone(),
        engine,
        cfg.reconnect.policy(),
        Arc::new(host),
        events_rx,
    );

    tracing::info!(
        controller = %cfg.controller_url,
        max_batch = cfg.max_batch,
        "serving controller"
    );
    let exit = service
        .run(async {
            if let Err(e) = tokio::signal::ctrl_c().await {
                tracing::warn!("cannot listen for Ctrl-C: {}", e);
                std::future::pending::<()>().await;
            }
        })
        .await;
    tracing::info!(?exit, "service stopped");
    Ok(())
}
