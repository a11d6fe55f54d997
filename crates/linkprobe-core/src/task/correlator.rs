use std::collections::{BTreeSet, HashMap};

use tracing::{debug, warn};

use crate::artifact::{ArtifactKind, ArtifactMatcher};
use crate::codec::CorrelationToken;
use crate::host::{HostCommand, HostError, ProbeSourceId};

/// Where a task's completion has to be delivered.
#[derive(Debug, Clone, PartialEq)]
pub enum ReturnAddress {
    /// Direct `FETCH_LINK` request, answered with `LINK_FETCHED`.
    Link { token: CorrelationToken },
    /// Member of the playlist job with this URL.
    Playlist { playlist: String },
}

/// One link being resolved.
#[derive(Debug, Clone)]
pub struct Task {
    link: String,
    needed: BTreeSet<ArtifactKind>,
    collected: Vec<String>,
    source: Option<ProbeSourceId>,
    subscribers: Vec<ReturnAddress>,
}

impl Task {
    fn new(link: &str, address: ReturnAddress) -> Self {
        Self {
            link: link.to_string(),
            needed: ArtifactKind::REQUIRED.into_iter().collect(),
            collected: Vec::with_capacity(ArtifactKind::REQUIRED.len()),
            source: None,
            subscribers: vec![address],
        }
    }

    pub fn link(&self) -> &str {
        &self.link
    }

    /// Kinds still outstanding.
    pub fn needed(&self) -> &BTreeSet<ArtifactKind> {
        &self.needed
    }

    /// Accepted artifact URLs, in acceptance order.
    pub fn collected(&self) -> &[String] {
        &self.collected
    }

    /// Probe source, once the host has allocated one.
    pub fn source(&self) -> Option<ProbeSourceId> {
        self.source
    }

    pub fn subscribers(&self) -> &[ReturnAddress] {
        &self.subscribers
    }
}

/// Returned by [`TaskCorrelator::submit`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TaskHandle {
    pub link: String,
    /// False when the link was already pending and no new work was started.
    pub created: bool,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CompletionReason {
    /// Every required kind was collected.
    Collected,
    /// An observation could not be classified; partial results.
    Malformed,
    /// The host could not open a probe source; no results.
    AllocationFailed,
}

/// A finished task, handed back to the engine for delivery.
#[derive(Debug, Clone, PartialEq)]
pub struct Completion {
    pub link: String,
    pub collected: Vec<String>,
    pub subscribers: Vec<ReturnAddress>,
    pub reason: CompletionReason,
}

/// Owner of the pending-task map and the source -> link association.
///
/// All mutation happens through `&mut self` on the engine's event turn; host
/// work is requested by pushing [`HostCommand`]s onto the caller's buffer.
#[derive(Debug, Default)]
pub struct TaskCorrelator {
    matcher: ArtifactMatcher,
    pending: HashMap<String, Task>,
    sources: HashMap<ProbeSourceId, String>,
}

impl TaskCorrelator {
    pub fn new(matcher: ArtifactMatcher) -> Self {
        Self {
            matcher,
            pending: HashMap::new(),
            sources: HashMap::new(),
        }
    }

    /// Start resolving `link`, or attach to the task already resolving it.
    ///
    /// A second direct request for a pending link is dropped (the first
    /// token wins); a playlist address not yet subscribed is added so one
    /// probe serves both.
    pub fn submit(
        &mut self,
        link: &str,
        address: ReturnAddress,
        out: &mut Vec<HostCommand>,
    ) -> TaskHandle {
        if let Some(task) = self.pending.get_mut(link) {
            let duplicate = match &address {
                ReturnAddress::Link { .. } => task
                    .subscribers
                    .iter()
                    .any(|a| matches!(a, ReturnAddress::Link { .. })),
                ReturnAddress::Playlist { .. } => task.subscribers.contains(&address),
            };
            if duplicate {
                debug!(link, "link already pending, duplicate request dropped");
            } else {
                debug!(link, "link already pending, sharing its probe");
                task.subscribers.push(address);
            }
            return TaskHandle {
                link: link.to_string(),
                created: false,
            };
        }

        self.pending
            .insert(link.to_string(), Task::new(link, address));
        out.push(HostCommand::Allocate {
            link: link.to_string(),
        });
        debug!(link, pending = self.pending.len(), "task submitted");
        TaskHandle {
            link: link.to_string(),
            created: true,
        }
    }

    /// Record the host's answer to an `Allocate` command.
    pub fn on_probe_allocated(
        &mut self,
        link: &str,
        result: Result<ProbeSourceId, HostError>,
        out: &mut Vec<HostCommand>,
    ) -> Option<Completion> {
        match result {
            Ok(source) => {
                match self.pending.get_mut(link) {
                    Some(task) if task.source.is_none() => {
                        task.source = Some(source);
                        self.sources.insert(source, link.to_string());
                        debug!(link, %source, "probe source allocated");
                    }
                    _ => {
                        debug!(link, %source, "probe source not wanted, releasing");
                        out.push(HostCommand::Release { source });
                    }
                }
                None
            }
            Err(err) => {
                let waiting = self
                    .pending
                    .get(link)
                    .is_some_and(|task| task.source.is_none());
                if !waiting {
                    debug!(link, error = %err, "allocation failure for a task not waiting on one");
                    return None;
                }
                warn!(link, error = %err, "probe allocation failed, completing without artifacts");
                self.complete(link, CompletionReason::AllocationFailed, out)
            }
        }
    }

    /// Handle one request observed on a probe source.
    pub fn on_probe_event(
        &mut self,
        source: ProbeSourceId,
        url: &str,
        out: &mut Vec<HostCommand>,
    ) -> Option<Completion> {
        let Some(link) = self.sources.get(&source).cloned() else {
            debug!(%source, "event for unknown probe source dropped");
            return None;
        };
        if !self.matcher.is_probe_url(url) {
            return None;
        }
        let kind = match self.matcher.classify(url) {
            Ok(Some(kind)) => kind,
            Ok(None) => {
                debug!(link = %link, url, "probe url of an unrequired kind dropped");
                return None;
            }
            Err(err) => {
                warn!(link = %link, error = %err, "malformed observation, force-completing task");
                return self.complete(&link, CompletionReason::Malformed, out);
            }
        };

        let task = self.pending.get_mut(&link)?;
        if !task.needed.remove(&kind) {
            debug!(link = %link, %kind, "kind already collected, observation dropped");
            return None;
        }
        task.collected.push(url.to_string());
        debug!(link = %link, %kind, remaining = task.needed.len(), "artifact accepted");
        if task.needed.is_empty() {
            self.complete(&link, CompletionReason::Collected, out)
        } else {
            None
        }
    }

    /// Remove the task, release its source and hand back its results.
    fn complete(
        &mut self,
        link: &str,
        reason: CompletionReason,
        out: &mut Vec<HostCommand>,
    ) -> Option<Completion> {
        let task = self.pending.remove(link)?;
        if let Some(source) = task.source {
            self.sources.remove(&source);
            out.push(HostCommand::Release { source });
        }
        debug!(link, ?reason, collected = task.collected.len(), "task complete");
        Some(Completion {
            link: task.link,
            collected: task.collected,
            subscribers: task.subscribers,
            reason,
        })
    }

    /// Drop every pending task and release every source. Returns how many
    /// tasks were abandoned.
    pub fn shutdown(&mut self, out: &mut Vec<HostCommand>) -> usize {
        let dropped = self.pending.len();
        for (_, task) in self.pending.drain() {
            if let Some(source) = task.source {
                out.push(HostCommand::Release { source });
            }
        }
        self.sources.clear();
        dropped
    }

    pub fn pending_len(&self) -> usize {
        self.pending.len()
    }

    pub fn is_pending(&self, link: &str) -> bool {
        self.pending.contains_key(link)
    }

    pub fn task(&self, link: &str) -> Option<&Task> {
        self.pending.get(link)
    }

    pub fn matcher(&self) -> &ArtifactMatcher {
        &self.matcher
    }
}
