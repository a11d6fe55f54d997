//! One-shot extraction without a controller.
//!
//! Feeds a single request through a fresh engine and drives the host until
//! the first outbound message is produced.

use anyhow::{bail, Context, Result};
use tokio::sync::mpsc::UnboundedReceiver;
use tracing::debug;

use crate::codec::{Inbound, Outbound};
use crate::engine::{Effects, Engine};
use crate::host::{HostEvent, ProbeHost};

/// Run `request` to completion and return the message that would have been
/// sent to the controller. Leftover probe sources are released first.
pub async fn run_once(
    mut engine: Engine,
    host: &dyn ProbeHost,
    events: &mut UnboundedReceiver<HostEvent>,
    request: Inbound,
) -> Result<Outbound> {
    let mut fx = engine.handle_inbound(request);
    if fx.host.is_empty() && fx.outbound.is_empty() {
        bail!("request produced no work");
    }
    loop {
        dispatch(host, &fx);
        if let Some(msg) = fx.outbound.into_iter().next() {
            dispatch(host, &engine.shutdown());
            return Ok(msg);
        }
        let event = events
            .recv()
            .await
            .context("host event channel closed before completion")?;
        debug!(?event, "host event");
        fx = engine.handle_host_event(event);
    }
}

fn dispatch(host: &dyn ProbeHost, fx: &Effects) {
    for cmd in &fx.host {
        cmd.dispatch(host);
    }
}
