//! Controller wire format.
//!
//! Every frame is a JSON object `{ "code": <int>, "data": <object> }`.
//! Completion payloads echo the request envelope back under the reserved
//! `echo` key so the controller can match responses without tracking a
//! request window.

mod envelope;
mod error;
mod message;

pub use envelope::{decode, encode, Envelope};
pub use error::ProtocolError;
pub use message::{codes, CorrelationToken, FetchedLink, Inbound, Outbound};
