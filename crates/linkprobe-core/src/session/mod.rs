//! Controller session state machine.
//!
//! Pure state: the service feeds it transport outcomes and watchdog ticks and
//! gets back the delay after which to reconnect. No timers live here, so the
//! backoff behaviour is testable without a clock.

mod policy;
mod state;

pub use policy::ReconnectPolicy;
pub use state::{ConnectionSession, SessionState};
