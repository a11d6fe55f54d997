use std::collections::{HashMap, HashSet};

use crate::codec::{CorrelationToken, FetchedLink, Outbound};
use crate::host::Expansion;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum JobPhase {
    /// Waiting for the host to report member links.
    Expanding,
    /// Members known; tasks being submitted and drained.
    Draining,
}

/// One queued or active playlist.
#[derive(Debug, Clone)]
pub struct PlaylistJob {
    url: String,
    token: CorrelationToken,
    phase: JobPhase,
    members: Vec<String>,
    titles: HashMap<String, String>,
    results: HashMap<String, Vec<String>>,
    in_flight: HashSet<String>,
    /// Index of the next member not yet submitted.
    next: usize,
    done: usize,
}

impl PlaylistJob {
    pub fn new(url: &str, token: CorrelationToken) -> Self {
        Self {
            url: url.to_string(),
            token,
            phase: JobPhase::Expanding,
            members: Vec::new(),
            titles: HashMap::new(),
            results: HashMap::new(),
            in_flight: HashSet::new(),
            next: 0,
            done: 0,
        }
    }

    pub fn url(&self) -> &str {
        &self.url
    }

    pub fn token(&self) -> &CorrelationToken {
        &self.token
    }

    pub fn phase(&self) -> JobPhase {
        self.phase
    }

    /// Distinct member links in playlist order. Empty until expanded.
    pub fn members(&self) -> &[String] {
        &self.members
    }

    pub fn title_of(&self, link: &str) -> Option<&str> {
        self.titles.get(link).map(String::as_str)
    }

    pub fn done_count(&self) -> usize {
        self.done
    }

    pub fn in_flight_count(&self) -> usize {
        self.in_flight.len()
    }

    pub fn is_finished(&self) -> bool {
        self.phase == JobPhase::Draining && self.done == self.members.len()
    }

    /// Install the expansion result. Repeated links keep their first position
    /// and title.
    pub(super) fn load(&mut self, expansion: Expansion) {
        for entry in expansion.entries {
            if self.titles.contains_key(&entry.link) {
                continue;
            }
            self.titles.insert(entry.link.clone(), entry.title);
            self.members.push(entry.link);
        }
        self.phase = JobPhase::Draining;
    }

    /// Take the next unsubmitted member and mark it in flight.
    pub(super) fn take_next(&mut self) -> Option<String> {
        let link = self.members.get(self.next)?.clone();
        self.next += 1;
        self.in_flight.insert(link.clone());
        Some(link)
    }

    /// Record a member's results. False if the link was not in flight.
    pub(super) fn finish_member(&mut self, link: &str, collected: Vec<String>) -> bool {
        if !self.in_flight.remove(link) {
            return false;
        }
        self.results.insert(link.to_string(), collected);
        self.done += 1;
        true
    }

    /// Build the success report, links in playlist order.
    pub(super) fn into_report(mut self) -> Outbound {
        let links = self
            .members
            .iter()
            .map(|link| FetchedLink {
                link: link.clone(),
                title: self.titles.remove(link).unwrap_or_default(),
                data_links: self.results.remove(link).unwrap_or_default(),
            })
            .collect();
        Outbound::PlaylistFetched {
            playlist: self.url,
            links,
            token: self.token,
        }
    }

    pub(super) fn into_failure(self, reason: String) -> Outbound {
        Outbound::PlaylistFailed {
            playlist: self.url,
            reason,
            token: self.token,
        }
    }
}
