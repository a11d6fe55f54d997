use thiserror::Error;

/// A frame from the controller that cannot be acted on.
///
/// Dropped with a log line; the connection stays open.
#[derive(Debug, Error)]
pub enum ProtocolError {
    #[error("malformed envelope: {0}")]
    Json(#[from] serde_json::Error),
    #[error("message with code {code} is missing `{field}`")]
    MissingField { code: i64, field: &'static str },
}
