//! Host browser collaborator interface.
//!
//! The engine never talks to a browser directly. It emits [`HostCommand`]s
//! (allocate a probe tab, release it, expand a playlist page) and consumes
//! [`HostEvent`]s (allocation results, observed requests, expansion results)
//! from a single ordered channel. Hosts must send `ProbeAllocated` for a
//! source before any `RequestObserved` naming it.

pub mod chromium;

use std::fmt;

use thiserror::Error;

/// Identifier of a host-allocated probe source (a browser tab).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct ProbeSourceId(pub u64);

impl fmt::Display for ProbeSourceId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "probe#{}", self.0)
    }
}

/// One member of an expanded playlist.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PlaylistEntry {
    pub link: String,
    pub title: String,
}

/// Result of scraping a playlist page.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Expansion {
    pub entries: Vec<PlaylistEntry>,
}

impl Expansion {
    /// Build from the parallel link/title arrays a page script reports.
    /// Missing titles become empty strings.
    pub fn from_parallel(links: Vec<String>, titles: Vec<Option<String>>) -> Self {
        let mut titles = titles.into_iter();
        let entries = links
            .into_iter()
            .map(|link| PlaylistEntry {
                link,
                title: titles.next().flatten().unwrap_or_default(),
            })
            .collect();
        Self { entries }
    }
}

/// Probe allocation failure reported by a host.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum HostError {
    #[error("browser unavailable: {0}")]
    Unavailable(String),
    #[error("failed to open probe tab for {link}: {reason}")]
    Allocation { link: String, reason: String },
}

/// Events a host pushes back to the engine.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum HostEvent {
    ProbeAllocated {
        link: String,
        result: Result<ProbeSourceId, HostError>,
    },
    RequestObserved {
        source: ProbeSourceId,
        url: String,
    },
    PlaylistExpanded {
        playlist: String,
        /// `Err` carries the reason forwarded to the controller.
        result: Result<Expansion, String>,
    },
}

/// Host browser automation layer.
///
/// Every method returns immediately; outcomes arrive later as [`HostEvent`]s
/// on the channel the host was constructed with.
pub trait ProbeHost: Send + Sync {
    /// Open a probe source for `link` and start observing its requests.
    fn allocate_probe_source(&self, link: &str);
    /// Tear down a probe source. Unknown ids are ignored.
    fn release_probe_source(&self, source: ProbeSourceId);
    /// Navigate to a playlist page and report its member links and titles.
    fn expand_playlist(&self, playlist: &str);
}

/// Work the engine asks the host to perform.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum HostCommand {
    Allocate { link: String },
    Release { source: ProbeSourceId },
    Expand { playlist: String },
}

impl HostCommand {
    pub fn dispatch(&self, host: &dyn ProbeHost) {
        match self {
            HostCommand::Allocate { link } => host.allocate_probe_source(link),
            HostCommand::Release { source } => host.release_probe_source(*source),
            HostCommand::Expand { playlist } => host.expand_playlist(playlist),
        }
    }
}
