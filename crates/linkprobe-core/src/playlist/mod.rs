//! Playlist orchestrator.
//!
//! Playlists are processed strictly one at a time in FIFO order. The job at
//! the front of the queue is expanded by the host into its member links,
//! which are then fed to the task correlator through a sliding window of at
//! most `max_batch` in-flight tasks. When every member has completed, the
//! aggregated report is emitted and the next queued playlist starts.

mod job;
mod orchestrator;

pub use job::{JobPhase, PlaylistJob};
pub use orchestrator::{PlaylistAction, PlaylistOrchestrator, DEFAULT_MAX_BATCH};
