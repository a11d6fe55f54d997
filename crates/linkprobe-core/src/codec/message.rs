//! Typed inbound and outbound messages.

use serde::{Deserialize, Serialize};
use serde_json::Value;

/// Operation codes shared with the controller.
pub mod codes {
    pub const TERMINATE: i64 = 0;
    pub const FETCH_PLAYLIST: i64 = 1;
    pub const PLAYLIST_FAILED: i64 = 3;
    pub const PLAYLIST_FETCHED: i64 = 4;
    /// Legacy keep-alive, ignored.
    pub const PING: i64 = 5;
    /// Controller-internal; never acted on here.
    pub const LOST_CONNECTION: i64 = 6;
    /// Controller-internal; never acted on here.
    pub const CONNECTION_NOT_ESTB: i64 = 7;
    pub const FETCH_LINK: i64 = 8;
    pub const LINK_FETCHED: i64 = 9;
}

/// Opaque value round-tripped from a request to its response.
///
/// Decoded requests carry their whole envelope here.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct CorrelationToken(pub Value);

/// Message received from the controller.
#[derive(Debug, Clone, PartialEq)]
pub enum Inbound {
    FetchPlaylist { url: String, token: CorrelationToken },
    FetchLink { url: String, token: CorrelationToken },
    Ping,
    Terminate,
    /// Any code this side does not handle.
    Unsupported { code: i64 },
}

/// One playlist member in a `PLAYLIST_FETCHED` report.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct FetchedLink {
    pub link: String,
    pub title: String,
    pub data_links: Vec<String>,
}

/// Message sent to the controller.
#[derive(Debug, Clone, PartialEq)]
pub enum Outbound {
    PlaylistFetched {
        playlist: String,
        links: Vec<FetchedLink>,
        token: CorrelationToken,
    },
    PlaylistFailed {
        playlist: String,
        reason: String,
        token: CorrelationToken,
    },
    LinkFetched {
        link: String,
        data_links: Vec<String>,
        token: CorrelationToken,
    },
}

impl Outbound {
    pub fn code(&self) -> i64 {
        match self {
            Outbound::PlaylistFetched { .. } => codes::PLAYLIST_FETCHED,
            Outbound::PlaylistFailed { .. } => codes::PLAYLIST_FAILED,
            Outbound::LinkFetched { .. } => codes::LINK_FETCHED,
        }
    }

    /// Short name for log lines.
    pub fn name(&self) -> &'static str {
        match self {
            Outbound::PlaylistFetched { .. } => "PLAYLIST_FETCHED",
            Outbound::PlaylistFailed { .. } => "PLAYLIST_FAILED",
            Outbound::LinkFetched { .. } => "LINK_FETCHED",
        }
    }
}

#[derive(Serialize)]
pub(super) struct PlaylistFetchedData<'a> {
    pub playlist: &'a str,
    pub links: &'a [FetchedLink],
    pub echo: &'a CorrelationToken,
}

#[derive(Serialize)]
pub(super) struct PlaylistFailedData<'a> {
    pub playlist: &'a str,
    pub reason: &'a str,
    pub echo: &'a CorrelationToken,
}

#[derive(Serialize)]
pub(super) struct LinkFetchedData<'a> {
    pub link: &'a str,
    #[serde(rename = "dataLinks")]
    pub data_links: &'a [String],
    pub echo: &'a CorrelationToken,
}
