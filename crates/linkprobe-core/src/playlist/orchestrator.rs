use std::collections::VecDeque;

use tracing::{debug, info, warn};

use crate::codec::{CorrelationToken, Outbound};
use crate::host::Expansion;

use super::job::{JobPhase, PlaylistJob};

/// Default cap on in-flight member tasks for the active playlist.
pub const DEFAULT_MAX_BATCH: usize = 5;

/// Work the orchestrator asks the engine to carry out.
#[derive(Debug, Clone, PartialEq)]
pub enum PlaylistAction {
    /// Ask the host to expand this playlist.
    Expand { playlist: String },
    /// Submit a member link as a task owned by `playlist`.
    Submit { playlist: String, link: String },
    /// Send a report to the controller.
    Report(Outbound),
}

/// FIFO queue of playlist jobs; the front job is the active one.
#[derive(Debug)]
pub struct PlaylistOrchestrator {
    max_batch: usize,
    queue: VecDeque<PlaylistJob>,
}

impl Default for PlaylistOrchestrator {
    fn default() -> Self {
        Self::new(DEFAULT_MAX_BATCH)
    }
}

impl PlaylistOrchestrator {
    pub fn new(max_batch: usize) -> Self {
        Self {
            max_batch: max_batch.max(1),
            queue: VecDeque::new(),
        }
    }

    /// Queue a playlist. Returns false if it is already queued or active.
    pub fn submit(
        &mut self,
        url: &str,
        token: CorrelationToken,
        out: &mut Vec<PlaylistAction>,
    ) -> bool {
        if self.queue.iter().any(|job| job.url() == url) {
            debug!(playlist = url, "playlist already queued");
            return false;
        }
        self.queue.push_back(PlaylistJob::new(url, token));
        debug!(playlist = url, queued = self.queue.len(), "playlist queued");
        if self.queue.len() == 1 {
            self.start_front(out);
        }
        true
    }

    /// Host finished (or failed) expanding `playlist`.
    pub fn on_expanded(
        &mut self,
        playlist: &str,
        result: Result<Expansion, String>,
        out: &mut Vec<PlaylistAction>,
    ) {
        let expecting = self
            .queue
            .front()
            .is_some_and(|job| job.url() == playlist && job.phase() == JobPhase::Expanding);
        if !expecting {
            debug!(playlist, "stale expansion result dropped");
            return;
        }

        match result {
            Err(reason) => {
                warn!(playlist, %reason, "playlist expansion failed");
                if let Some(job) = self.queue.pop_front() {
                    out.push(PlaylistAction::Report(job.into_failure(reason)));
                }
                self.start_front(out);
            }
            Ok(expansion) => {
                if let Some(job) = self.queue.front_mut() {
                    job.load(expansion);
                    info!(playlist, members = job.members().len(), "playlist expanded");
                }
                self.fill_window(out);
                self.finish_if_done(out);
            }
        }
    }

    /// A member task of `playlist` completed.
    pub fn on_task_complete(
        &mut self,
        playlist: &str,
        link: &str,
        collected: Vec<String>,
        out: &mut Vec<PlaylistAction>,
    ) {
        let Some(job) = self
            .queue
            .front_mut()
            .filter(|job| job.url() == playlist && job.phase() == JobPhase::Draining)
        else {
            debug!(playlist, link, "completion for inactive playlist dropped");
            return;
        };
        if !job.finish_member(link, collected) {
            debug!(playlist, link, "completion for a link not in flight dropped");
            return;
        }
        debug!(
            playlist,
            link,
            done = job.done_count(),
            total = job.members().len(),
            "playlist member done"
        );
        self.fill_window(out);
        self.finish_if_done(out);
    }

    /// Submit unsubmitted members until the window is full.
    fn fill_window(&mut self, out: &mut Vec<PlaylistAction>) {
        let Some(job) = self.queue.front_mut() else {
            return;
        };
        while job.in_flight_count() < self.max_batch {
            let Some(link) = job.take_next() else {
                break;
            };
            out.push(PlaylistAction::Submit {
                playlist: job.url().to_string(),
                link,
            });
        }
    }

    fn finish_if_done(&mut self, out: &mut Vec<PlaylistAction>) {
        if !self.queue.front().is_some_and(PlaylistJob::is_finished) {
            return;
        }
        if let Some(job) = self.queue.pop_front() {
            info!(playlist = job.url(), links = job.members().len(), "playlist fetched");
            out.push(PlaylistAction::Report(job.into_report()));
        }
        self.start_front(out);
    }

    fn start_front(&mut self, out: &mut Vec<PlaylistAction>) {
        if let Some(job) = self.queue.front() {
            debug!(playlist = job.url(), "expanding playlist");
            out.push(PlaylistAction::Expand {
                playlist: job.url().to_string(),
            });
        }
    }

    /// Discard every queued job. Returns how many were dropped.
    pub fn shutdown(&mut self) -> usize {
        let dropped = self.queue.len();
        self.queue.clear();
        dropped
    }

    pub fn max_batch(&self) -> usize {
        self.max_batch
    }

    pub fn active(&self) -> Option<&PlaylistJob> {
        self.queue.front()
    }

    pub fn queued_len(&self) -> usize {
        self.queue.len()
    }
}
