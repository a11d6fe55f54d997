//! Envelope framing: JSON text <-> typed messages.

use serde::{Deserialize, Serialize};
use serde_json::Value;

use super::error::ProtocolError;
use super::message::{
    codes, CorrelationToken, Inbound, LinkFetchedData, Outbound, PlaylistFailedData,
    PlaylistFetchedData,
};

/// Raw wire envelope.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Envelope {
    pub code: i64,
    #[serde(default)]
    pub data: Value,
}

/// Decode one text frame from the controller.
///
/// Unknown codes decode to [`Inbound::Unsupported`]; only unparseable frames
/// and requests without a usable `url` are errors.
pub fn decode(text: &str) -> Result<Inbound, ProtocolError> {
    let raw: Value = serde_json::from_str(text)?;
    let envelope: Envelope = serde_json::from_value(raw.clone())?;

    let inbound = match envelope.code {
        codes::FETCH_PLAYLIST => Inbound::FetchPlaylist {
            url: required_url(&envelope)?,
            token: CorrelationToken(raw),
        },
        codes::FETCH_LINK => Inbound::FetchLink {
            url: required_url(&envelope)?,
            token: CorrelationToken(raw),
        },
        codes::PING => Inbound::Ping,
        codes::TERMINATE => Inbound::Terminate,
        code => Inbound::Unsupported { code },
    };
    Ok(inbound)
}

fn required_url(envelope: &Envelope) -> Result<String, ProtocolError> {
    envelope
        .data
        .get("url")
        .and_then(Value::as_str)
        .map(str::trim)
        .filter(|u| !u.is_empty())
        .map(String::from)
        .ok_or(ProtocolError::MissingField {
            code: envelope.code,
            field: "url",
        })
}

/// Encode an outbound message as a text frame.
pub fn encode(msg: &Outbound) -> Result<String, ProtocolError> {
    let data = match msg {
        Outbound::PlaylistFetched {
            playlist,
            links,
            token,
        } => serde_json::to_value(PlaylistFetchedData {
            playlist,
            links,
            echo: token,
        })?,
        Outbound::PlaylistFailed {
            playlist,
            reason,
            token,
        } => serde_json::to_value(PlaylistFailedData {
            playlist,
            reason,
            echo: token,
        })?,
        Outbound::LinkFetched {
            link,
            data_links,
            token,
        } => serde_json::to_value(LinkFetchedData {
            link,
            data_links,
            echo: token,
        })?,
    };
    let envelope = Envelope {
        code: msg.code(),
        data,
    };
    Ok(serde_json::to_string(&envelope)?)
}
