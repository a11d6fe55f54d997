//! Scripted probe host for integration tests.
//!
//! Every allocation succeeds and immediately reports one audio and one video
//! request for the new source. Playlist expansions answer from a table set up
//! by the test; unknown playlists fail.

use std::collections::HashMap;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Mutex};

use linkprobe_core::host::{
    Expansion, HostCommand, HostEvent, PlaylistEntry, ProbeHost, ProbeSourceId,
};
use tokio::sync::mpsc::UnboundedSender;

pub struct FakeHost {
    events: UnboundedSender<HostEvent>,
    next_id: AtomicU64,
    playlists: Mutex<HashMap<String, Vec<PlaylistEntry>>>,
    log: Mutex<Vec<HostCommand>>,
}

pub fn audio_url(source: ProbeSourceId) -> String {
    format!(
        "https://rr1.googlevideo.com/videoplayback?src={}&mime=audio%2Fwebm&rbuf=0",
        source.0
    )
}

pub fn video_url(source: ProbeSourceId) -> String {
    format!(
        "https://rr1.googlevideo.com/videoplayback?src={}&mime=video%2Fmp4&rbuf=0",
        source.0
    )
}

impl FakeHost {
    pub fn new(events: UnboundedSender<HostEvent>) -> Arc<Self> {
        Arc::new(Self {
            events,
            next_id: AtomicU64::new(1),
            playlists: Mutex::new(HashMap::new()),
            log: Mutex::new(Vec::new()),
        })
    }

    /// Make `url` expand to `links`, titled "title <link>".
    pub fn with_playlist(&self, url: &str, links: &[&str]) {
        let entries = links
            .iter()
            .map(|l| PlaylistEntry {
                link: l.to_string(),
                title: format!("title {l}"),
            })
            .collect();
        self.playlists.lock().unwrap().insert(url.to_string(), entries);
    }

    pub fn commands(&self) -> Vec<HostCommand> {
        self.log.lock().unwrap().clone()
    }

    pub fn allocations(&self) -> usize {
        self.commands()
            .iter()
            .filter(|c| matches!(c, HostCommand::Allocate { .. }))
            .count()
    }

    pub fn releases(&self) -> usize {
        self.commands()
            .iter()
            .filter(|c| matches!(c, HostCommand::Release { .. }))
            .count()
    }
}

impl ProbeHost for FakeHost {
    fn allocate_probe_source(&self, link: &str) {
        self.log.lock().unwrap().push(HostCommand::Allocate {
            link: link.to_string(),
        });
        let source = ProbeSourceId(self.next_id.fetch_add(1, Ordering::Relaxed));
        let _ = self.events.send(HostEvent::ProbeAllocated {
            link: link.to_string(),
            result: Ok(source),
        });
        for url in [audio_url(source), video_url(source)] {
            let _ = self.events.send(HostEvent::RequestObserved { source, url });
        }
    }

    fn release_probe_source(&self, source: ProbeSourceId) {
        self.log
            .lock()
            .unwrap()
            .push(HostCommand::Release { source });
    }

    fn expand_playlist(&self, playlist: &str) {
        self.log.lock().unwrap().push(HostCommand::Expand {
            playlist: playlist.to_string(),
        });
        let result = match self.playlists.lock().unwrap().get(playlist) {
            Some(entries) => Ok(Expansion {
                entries: entries.clone(),
            }),
            None => Err("Failed to get playlist links".to_string()),
        };
        let _ = self.events.send(HostEvent::PlaylistExpanded {
            playlist: playlist.to_string(),
            result,
        });
    }
}
