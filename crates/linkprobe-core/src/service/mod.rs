//! Controller connection service.
//!
//! Runs the event loop that ties everything together: the WebSocket
//! transport, the reconnect session, the host event channel and the engine.
//! Every event is handled to completion on the loop's own turn; timers are
//! plain deadlines computed from the session's answers.

mod run;
mod transport;

use std::sync::Arc;

use tokio::sync::mpsc::UnboundedReceiver;

use crate::engine::Engine;
use crate::host::{HostEvent, ProbeHost};
use crate::session::{ConnectionSession, ReconnectPolicy};

pub use transport::{Transport, TransportError, CONNECT_TIMEOUT};

/// Why [`Service::run`] returned.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ServiceExit {
    /// The controller sent TERMINATE.
    Terminated,
    /// The caller's shutdown future resolved (e.g. Ctrl-C).
    Interrupted,
}

pub struct Service {
    url: String,
    engine: Engine,
    session: ConnectionSession,
    host: Arc<dyn ProbeHost>,
    host_events: UnboundedReceiver<HostEvent>,
    transport: Option<Transport>,
}

impl Service {
    /// `host_events` must be the receiving end of the channel `host` reports on.
    pub fn new(
        url: impl Into<String>,
        engine: Engine,
        policy: ReconnectPolicy,
        host: Arc<dyn ProbeHost>,
        host_events: UnboundedReceiver<HostEvent>,
    ) -> Self {
        Self {
            url: url.into(),
            engine,
            session: ConnectionSession::new(policy),
            host,
            host_events,
            transport: None,
        }
    }

    pub fn session(&self) -> &ConnectionSession {
        &self.session
    }
}
