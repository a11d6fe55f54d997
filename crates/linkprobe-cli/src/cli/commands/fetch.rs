//! `linkprobe fetch-link` / `fetch-playlist` – one-shot extraction.

use anyhow::{anyhow, Result};
use linkprobe_core::codec::{self, codes, CorrelationToken, Inbound};
use linkprobe_core::config::LinkprobeConfig;
use linkprobe_core::engine::Engine;
use linkprobe_core::host::chromium::ChromiumHost;
use linkprobe_core::local;
use serde_json::json;
use std::time::Duration;
use tokio::sync::mpsc;

/// Build the request a controller would send for `url`.
pub fn fetch_request(code: i64, url: &str) -> Inbound {
    let token = CorrelationToken(json!({ "code": code, "data": { "url": url } }));
    if code == codes::FETCH_PLAYLIST {
        Inbound::FetchPlaylist {
            url: url.to_string(),
            token,
        }
    } else {
        Inbound::FetchLink {
            url: url.to_string(),
            token,
        }
    }
}

pub async fn run_fetch(cfg: &LinkprobeConfig, request: Inbound, timeout: Duration) -> Result<()> {
    let (events_tx, mut events_rx) = mpsc::unbounded_channel();
    let host = ChromiumHost::launch(&cfg.browser, &cfg.probe, events_tx).await?;
    let engine = Engine::new(cfg.probe.matcher(), cfg.max_batch);

    let msg = tokio::time::timeout(
        timeout,
        local::run_once(engine, &host, &mut events_rx, request),
    )
    .await
    .map_err(|_| anyhow!("no result after {}s", timeout.as_secs()))??;

    println!("{}", codec::encode(&msg)?);
    Ok(())
}
