//! Extraction engine: the correlator and the orchestrator behind one event
//! interface.
//!
//! The engine owns all task and playlist state and is driven one event at a
//! time. Each call returns the [`Effects`] the caller has to carry out: host
//! commands to dispatch and messages to send. Nothing here performs I/O.

use tracing::{debug, info};

use crate::artifact::ArtifactMatcher;
use crate::codec::{Inbound, Outbound};
use crate::host::{HostCommand, HostEvent};
use crate::playlist::{PlaylistAction, PlaylistOrchestrator};
use crate::task::{Completion, ReturnAddress, TaskCorrelator};

/// Side effects produced by one engine turn.
#[derive(Debug, Default, PartialEq)]
pub struct Effects {
    pub host: Vec<HostCommand>,
    pub outbound: Vec<Outbound>,
    /// The controller asked us to stop.
    pub terminate: bool,
}

#[derive(Debug, Default)]
pub struct Engine {
    correlator: TaskCorrelator,
    playlists: PlaylistOrchestrator,
}

impl Engine {
    pub fn new(matcher: ArtifactMatcher, max_batch: usize) -> Self {
        Self {
            correlator: TaskCorrelator::new(matcher),
            playlists: PlaylistOrchestrator::new(max_batch),
        }
    }

    /// Dispatch one decoded controller message.
    pub fn handle_inbound(&mut self, msg: Inbound) -> Effects {
        let mut fx = Effects::default();
        match msg {
            Inbound::FetchLink { url, token } => {
                self.correlator
                    .submit(&url, ReturnAddress::Link { token }, &mut fx.host);
            }
            Inbound::FetchPlaylist { url, token } => {
                let mut actions = Vec::new();
                self.playlists.submit(&url, token, &mut actions);
                self.apply(actions, &mut fx);
            }
            Inbound::Ping => debug!("ping"),
            Inbound::Terminate => {
                info!("terminate requested by controller");
                fx = self.shutdown();
            }
            Inbound::Unsupported { code } => {
                debug!(code, "unsupported operation code ignored");
            }
        }
        fx
    }

    /// Dispatch one event reported by the host.
    pub fn handle_host_event(&mut self, event: HostEvent) -> Effects {
        let mut fx = Effects::default();
        match event {
            HostEvent::ProbeAllocated { link, result } => {
                if let Some(done) = self
                    .correlator
                    .on_probe_allocated(&link, result, &mut fx.host)
                {
                    self.deliver(done, &mut fx);
                }
            }
            HostEvent::RequestObserved { source, url } => {
                if let Some(done) = self.correlator.on_probe_event(source, &url, &mut fx.host) {
                    self.deliver(done, &mut fx);
                }
            }
            HostEvent::PlaylistExpanded { playlist, result } => {
                let mut actions = Vec::new();
                self.playlists.on_expanded(&playlist, result, &mut actions);
                self.apply(actions, &mut fx);
            }
        }
        fx
    }

    /// Route a completion to every return address it carries.
    fn deliver(&mut self, done: Completion, fx: &mut Effects) {
        for address in done.subscribers {
            match address {
                ReturnAddress::Link { token } => {
                    info!(link = %done.link, artifacts = done.collected.len(), "link fetched");
                    fx.outbound.push(Outbound::LinkFetched {
                        link: done.link.clone(),
                        data_links: done.collected.clone(),
                        token,
                    });
                }
                ReturnAddress::Playlist { playlist } => {
                    let mut actions = Vec::new();
                    self.playlists.on_task_complete(
                        &playlist,
                        &done.link,
                        done.collected.clone(),
                        &mut actions,
                    );
                    self.apply(actions, fx);
                }
            }
        }
    }

    fn apply(&mut self, actions: Vec<PlaylistAction>, fx: &mut Effects) {
        for action in actions {
            match action {
                PlaylistAction::Expand { playlist } => {
                    fx.host.push(HostCommand::Expand { playlist });
                }
                PlaylistAction::Submit { playlist, link } => {
                    self.correlator
                        .submit(&link, ReturnAddress::Playlist { playlist }, &mut fx.host);
                }
                PlaylistAction::Report(msg) => fx.outbound.push(msg),
            }
        }
    }

    /// Abandon all work: release every probe source and clear the queue.
    pub fn shutdown(&mut self) -> Effects {
        let mut fx = Effects {
            terminate: true,
            ..Effects::default()
        };
        let tasks = self.correlator.shutdown(&mut fx.host);
        let playlists = self.playlists.shutdown();
        info!(tasks, playlists, "engine shut down");
        fx
    }

    pub fn correlator(&self) -> &TaskCorrelator {
        &self.correlator
    }

    pub fn playlists(&self) -> &PlaylistOrchestrator {
        &self.playlists
    }
}

#[cfg(test)]
mod tests {
    use serde_json::json;

    use super::*;
    use crate::codec::CorrelationToken;
    use crate::host::{Expansion, PlaylistEntry, ProbeSourceId};

    const AUDIO: &str = "https://rr2.googlevideo.com/videoplayback?mime=audio%2Fmp4&rbuf=0";
    const VIDEO: &str = "https://rr2.googlevideo.com/videoplayback?mime=video%2Fmp4&rbuf=0";

    fn fetch_link(url: &str, token: &str) -> Inbound {
        Inbound::FetchLink {
            url: url.into(),
            token: CorrelationToken(json!(token)),
        }
    }

    /// Allocate `source` for `link` and feed both kinds.
    fn resolve(engine: &mut Engine, link: &str, source: u64) -> Effects {
        let mut fx = engine.handle_host_event(HostEvent::ProbeAllocated {
            link: link.into(),
            result: Ok(ProbeSourceId(source)),
        });
        for url in [AUDIO, VIDEO] {
            let next = engine.handle_host_event(HostEvent::RequestObserved {
                source: ProbeSourceId(source),
                url: url.into(),
            });
            fx.host.extend(next.host);
            fx.outbound.extend(next.outbound);
        }
        fx
    }

    fn allocations(fx: &Effects) -> Vec<&str> {
        fx.host
            .iter()
            .filter_map(|c| match c {
                HostCommand::Allocate { link } => Some(link.as_str()),
                _ => None,
            })
            .collect()
    }

    #[test]
    fn duplicate_fetch_link_yields_one_response_with_first_token() {
        let mut e = Engine::default();
        let first = e.handle_inbound(fetch_link("L", "t1"));
        let second = e.handle_inbound(fetch_link("L", "t2"));
        assert_eq!(allocations(&first), vec!["L"]);
        assert!(second.host.is_empty());

        let fx = resolve(&mut e, "L", 1);
        assert_eq!(
            fx.outbound,
            vec![Outbound::LinkFetched {
                link: "L".into(),
                data_links: vec![AUDIO.into(), VIDEO.into()],
                token: CorrelationToken(json!("t1")),
            }]
        );
        assert!(fx.host.contains(&HostCommand::Release {
            source: ProbeSourceId(1)
        }));
    }

    #[test]
    fn playlist_of_three_with_batch_of_two() {
        let mut e = Engine::new(ArtifactMatcher::default(), 2);
        let fx = e.handle_inbound(Inbound::FetchPlaylist {
            url: "P".into(),
            token: CorrelationToken(json!({"code": 1})),
        });
        assert_eq!(
            fx.host,
            vec![HostCommand::Expand {
                playlist: "P".into()
            }]
        );

        let entries = ["a", "b", "c"]
            .iter()
            .map(|l| PlaylistEntry {
                link: l.to_string(),
                title: l.to_uppercase(),
            })
            .collect();
        let fx = e.handle_host_event(HostEvent::PlaylistExpanded {
            playlist: "P".into(),
            result: Ok(Expansion { entries }),
        });
        assert_eq!(allocations(&fx), vec!["a", "b"]);
        assert_eq!(e.correlator().pending_len(), 2);

        let fx = resolve(&mut e, "a", 1);
        assert_eq!(allocations(&fx), vec!["c"]);
        assert!(fx.outbound.is_empty());

        let fx = resolve(&mut e, "b", 2);
        assert!(fx.outbound.is_empty());
        let fx = resolve(&mut e, "c", 3);
        match fx.outbound.as_slice() {
            [Outbound::PlaylistFetched { links, .. }] => {
                assert_eq!(links.len(), 3);
                assert_eq!(links[2].title, "C");
                assert_eq!(links[2].data_links.len(), 2);
            }
            other => panic!("unexpected {other:?}"),
        }
    }

    #[test]
    fn direct_and_playlist_requests_share_one_probe() {
        let mut e = Engine::new(ArtifactMatcher::default(), 2);
        e.handle_inbound(fetch_link("a", "t1"));
        e.handle_inbound(Inbound::FetchPlaylist {
            url: "P".into(),
            token: CorrelationToken::default(),
        });
        let fx = e.handle_host_event(HostEvent::PlaylistExpanded {
            playlist: "P".into(),
            result: Ok(Expansion::from_parallel(vec!["a".into()], vec![])),
        });
        assert!(allocations(&fx).is_empty());

        let fx = resolve(&mut e, "a", 1);
        assert_eq!(fx.outbound.len(), 2);
        assert!(matches!(fx.outbound[0], Outbound::LinkFetched { .. }));
        assert!(matches!(fx.outbound[1], Outbound::PlaylistFetched { .. }));
    }

    #[test]
    fn terminate_releases_sources_and_clears_state() {
        let mut e = Engine::default();
        e.handle_inbound(fetch_link("L", "t1"));
        e.handle_host_event(HostEvent::ProbeAllocated {
            link: "L".into(),
            result: Ok(ProbeSourceId(5)),
        });
        e.handle_inbound(Inbound::FetchPlaylist {
            url: "P".into(),
            token: CorrelationToken::default(),
        });
        let fx = e.handle_inbound(Inbound::Terminate);
        assert!(fx.terminate);
        assert_eq!(
            fx.host,
            vec![HostCommand::Release {
                source: ProbeSourceId(5)
            }]
        );
        assert_eq!(e.correlator().pending_len(), 0);
        assert_eq!(e.playlists().queued_len(), 0);
    }

    #[test]
    fn ping_and_unknown_codes_do_nothing() {
        let mut e = Engine::default();
        assert_eq!(e.handle_inbound(Inbound::Ping), Effects::default());
        assert_eq!(
            e.handle_inbound(Inbound::Unsupported { code: 6 }),
            Effects::default()
        );
    }
}
