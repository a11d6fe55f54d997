//! The service event loop.

use std::future::{pending, Future};
use std::pin::Pin;
use std::time::Duration;

use tokio::time::{interval_at, sleep_until, Instant, Interval, MissedTickBehavior};
use tracing::{debug, info, warn};

use crate::codec::{self, Outbound};
use crate::engine::Effects;
use crate::session::SessionState;

use super::transport::{Transport, TransportError, CONNECT_TIMEOUT};
use super::{Service, ServiceExit};

type Connecting = Pin<Box<dyn Future<Output = Result<Transport, TransportError>> + Send>>;

impl Service {
    /// Serve the controller until it sends TERMINATE or `shutdown` resolves.
    ///
    /// Transport failures never end the loop; they only schedule a reconnect.
    pub async fn run<F>(mut self, shutdown: F) -> ServiceExit
    where
        F: Future<Output = ()> + Send,
    {
        tokio::pin!(shutdown);
        let mut reconnect_at = Some(Instant::now());
        let mut connecting: Option<Connecting> = None;
        let mut watchdog: Option<Interval> = None;

        loop {
            tokio::select! {
                _ = &mut shutdown => {
                    info!("shutdown requested");
                    self.stop().await;
                    return ServiceExit::Interrupted;
                }
                _ = wait_until(reconnect_at) => {
                    reconnect_at = None;
                    if self.session.begin_connect() {
                        debug!(url = %self.url, "connecting to controller");
                        connecting = Some(Box::pin(Transport::connect(
                            self.url.clone(),
                            CONNECT_TIMEOUT,
                        )));
                    }
                }
                result = wait_connect(&mut connecting) => {
                    connecting = None;
                    match result {
                        Ok(transport) => {
                            if let Some(period) = self.session.on_open() {
                                info!(url = %self.url, "connected to controller");
                                self.transport = Some(transport);
                                watchdog = Some(watchdog_timer(period));
                            }
                        }
                        Err(e) => {
                            if let Some(delay) = self.session.on_error() {
                                warn!(
                                    error = %e,
                                    delay_ms = delay.as_millis() as u64,
                                    budget = self.session.retry_budget(),
                                    "failed to connect, retrying"
                                );
                                reconnect_at = Some(Instant::now() + delay);
                            }
                        }
                    }
                }
                frame = wait_frame(&mut self.transport) => {
                    match frame {
                        Some(Ok(text)) => {
                            if self.on_frame(&text).await {
                                return ServiceExit::Terminated;
                            }
                        }
                        Some(Err(e)) => {
                            warn!(error = %e, "transport error");
                            self.transport = None;
                            watchdog = None;
                            reconnect_at = self.session.on_error().map(|d| Instant::now() + d);
                        }
                        None => {
                            info!("controller closed the connection");
                            self.transport = None;
                            watchdog = None;
                            reconnect_at = self.session.on_close().map(|d| Instant::now() + d);
                        }
                    }
                }
                _ = wait_tick(&mut watchdog) => {
                    let closed = self.transport.as_ref().map_or(true, Transport::is_closed);
                    if let Some(delay) = self.session.on_watchdog_tick(closed) {
                        warn!("lost connection, reconnecting");
                        self.transport = None;
                        watchdog = None;
                        reconnect_at = Some(Instant::now() + delay);
                    }
                }
                Some(event) = self.host_events.recv() => {
                    let fx = self.engine.handle_host_event(event);
                    self.apply(fx).await;
                }
            }
        }
    }

    /// Handle one text frame. Returns true when the controller asked us to stop.
    async fn on_frame(&mut self, text: &str) -> bool {
        match codec::decode(text) {
            Ok(msg) => {
                debug!(?msg, "received");
                let fx = self.engine.handle_inbound(msg);
                self.apply(fx).await
            }
            Err(e) => {
                warn!(error = %e, "dropping malformed frame");
                false
            }
        }
    }

    /// Carry out engine effects. Returns `fx.terminate`.
    async fn apply(&mut self, fx: Effects) -> bool {
        for cmd in &fx.host {
            cmd.dispatch(self.host.as_ref());
        }
        for msg in fx.outbound {
            self.send(msg).await;
        }
        if fx.terminate {
            if let Some(transport) = self.transport.as_mut() {
                transport.close().await;
            }
        }
        fx.terminate
    }

    /// Best-effort send; dropped while not connected.
    async fn send(&mut self, msg: Outbound) {
        let name = msg.name();
        let transport = match self.transport.as_mut() {
            Some(t) if self.session.state() == SessionState::Connected && !t.is_closed() => t,
            _ => {
                debug!(message = name, "not connected, dropping outbound message");
                return;
            }
        };
        let text = match codec::encode(&msg) {
            Ok(text) => text,
            Err(e) => {
                warn!(message = name, error = %e, "failed to encode outbound message");
                return;
            }
        };
        match transport.send_text(text).await {
            Ok(()) => debug!(message = name, "sent"),
            Err(e) => warn!(message = name, error = %e, "send failed, message dropped"),
        }
    }

    async fn stop(&mut self) {
        let fx = self.engine.shutdown();
        self.apply(fx).await;
    }
}

fn watchdog_timer(period: Duration) -> Interval {
    let mut timer = interval_at(Instant::now() + period, period);
    timer.set_missed_tick_behavior(MissedTickBehavior::Delay);
    timer
}

async fn wait_until(deadline: Option<Instant>) {
    match deadline {
        Some(at) => sleep_until(at).await,
        None => pending().await,
    }
}

async fn wait_connect(connecting: &mut Option<Connecting>) -> Result<Transport, TransportError> {
    match connecting {
        Some(fut) => fut.await,
        None => pending().await,
    }
}

async fn wait_frame(transport: &mut Option<Transport>) -> Option<Result<String, TransportError>> {
    match transport {
        Some(t) => t.recv().await,
        None => pending().await,
    }
}

async fn wait_tick(watchdog: &mut Option<Interval>) {
    match watchdog {
        Some(timer) => {
            timer.tick().await;
        }
        None => pending().await,
    }
}
