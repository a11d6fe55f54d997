//! Tests for the task correlator.

use serde_json::json;

use crate::artifact::ArtifactKind;
use crate::codec::CorrelationToken;
use crate::host::{HostCommand, HostError, ProbeSourceId};

use super::*;

const LINK: &str = "https://v.test/watch?v=abc";
const AUDIO: &str = "https://rr1.googlevideo.com/videoplayback?mime=audio%2Fwebm&rbuf=0";
const AUDIO_AGAIN: &str =
    "https://rr1.googlevideo.com/videoplayback?mime=audio%2Fwebm&rbuf=0&range=100-200";
const VIDEO: &str = "https://rr1.googlevideo.com/videoplayback?mime=video%2Fmp4&rbuf=0";

fn direct(token: &str) -> ReturnAddress {
    ReturnAddress::Link {
        token: CorrelationToken(json!(token)),
    }
}

fn member(playlist: &str) -> ReturnAddress {
    ReturnAddress::Playlist {
        playlist: playlist.to_string(),
    }
}

/// Submit `LINK` and allocate `source` for it.
fn allocated(source: u64) -> TaskCorrelator {
    let mut c = TaskCorrelator::default();
    let mut out = Vec::new();
    c.submit(LINK, direct("t1"), &mut out);
    assert!(c
        .on_probe_allocated(LINK, Ok(ProbeSourceId(source)), &mut out)
        .is_none());
    c
}

#[test]
fn submit_requests_one_allocation() {
    let mut c = TaskCorrelator::default();
    let mut out = Vec::new();
    let h = c.submit(LINK, direct("t1"), &mut out);
    assert!(h.created);
    assert_eq!(
        out,
        vec![HostCommand::Allocate {
            link: LINK.to_string()
        }]
    );
    let task = c.task(LINK).unwrap();
    assert_eq!(task.needed().len(), 2);
    assert!(task.collected().is_empty());
    assert_eq!(task.source(), None);
}

#[test]
fn duplicate_direct_submit_is_noop_and_first_token_wins() {
    let mut c = TaskCorrelator::default();
    let mut out = Vec::new();
    c.submit(LINK, direct("t1"), &mut out);
    let h = c.submit(LINK, direct("t2"), &mut out);
    assert!(!h.created);
    assert_eq!(out.len(), 1);
    assert_eq!(c.pending_len(), 1);
    assert_eq!(c.task(LINK).unwrap().subscribers(), &[direct("t1")]);
}

#[test]
fn playlist_member_shares_pending_direct_task() {
    let mut c = TaskCorrelator::default();
    let mut out = Vec::new();
    c.submit(LINK, direct("t1"), &mut out);
    c.submit(LINK, member("P"), &mut out);
    c.submit(LINK, member("P"), &mut out);
    assert_eq!(out.len(), 1);
    assert_eq!(
        c.task(LINK).unwrap().subscribers(),
        &[direct("t1"), member("P")]
    );
}

#[test]
fn completes_when_both_kinds_collected() {
    let mut c = allocated(1);
    let mut out = Vec::new();
    assert!(c.on_probe_event(ProbeSourceId(1), AUDIO, &mut out).is_none());
    let done = c
        .on_probe_event(ProbeSourceId(1), VIDEO, &mut out)
        .expect("complete");
    assert_eq!(done.link, LINK);
    assert_eq!(done.collected, vec![AUDIO.to_string(), VIDEO.to_string()]);
    assert_eq!(done.reason, CompletionReason::Collected);
    assert_eq!(done.subscribers, vec![direct("t1")]);
    assert_eq!(
        out,
        vec![HostCommand::Release {
            source: ProbeSourceId(1)
        }]
    );
    assert!(!c.is_pending(LINK));
}

#[test]
fn replayed_kind_is_accepted_once() {
    let mut c = allocated(1);
    let mut out = Vec::new();
    for url in [AUDIO, AUDIO_AGAIN, AUDIO] {
        assert!(c.on_probe_event(ProbeSourceId(1), url, &mut out).is_none());
    }
    let task = c.task(LINK).unwrap();
    assert_eq!(task.collected(), &[AUDIO.to_string()]);
    assert!(task.collected().len() <= ArtifactKind::REQUIRED.len());
    assert!(out.is_empty());
}

#[test]
fn unknown_source_and_non_probe_urls_are_dropped() {
    let mut c = allocated(1);
    let mut out = Vec::new();
    assert!(c.on_probe_event(ProbeSourceId(9), AUDIO, &mut out).is_none());
    assert!(c
        .on_probe_event(ProbeSourceId(1), "https://rr1.googlevideo.com/generate_204", &mut out)
        .is_none());
    assert!(c
        .on_probe_event(
            ProbeSourceId(1),
            "https://rr1.googlevideo.com/videoplayback?mime=text%2Fplain&rbuf=0",
            &mut out
        )
        .is_none());
    assert!(c.task(LINK).unwrap().collected().is_empty());
}

#[test]
fn malformed_observation_force_completes_with_partial_results() {
    let mut c = allocated(1);
    let mut out = Vec::new();
    c.on_probe_event(ProbeSourceId(1), AUDIO, &mut out);
    let done = c
        .on_probe_event(ProbeSourceId(1), "/videoplayback?rbuf=0", &mut out)
        .expect("forced completion");
    assert_eq!(done.reason, CompletionReason::Malformed);
    assert_eq!(done.collected.len(), 1);
    assert_eq!(out.len(), 1);
    assert_eq!(c.pending_len(), 0);
}

#[test]
fn missing_kind_tag_counts_as_malformed() {
    let mut c = allocated(1);
    let mut out = Vec::new();
    let done = c
        .on_probe_event(
            ProbeSourceId(1),
            "https://rr1.googlevideo.com/videoplayback?rbuf=0",
            &mut out,
        )
        .unwrap();
    assert_eq!(done.reason, CompletionReason::Malformed);
    assert!(done.collected.is_empty());
}

#[test]
fn allocation_failure_completes_with_nothing() {
    let mut c = TaskCorrelator::default();
    let mut out = Vec::new();
    c.submit(LINK, member("P"), &mut out);
    out.clear();
    let done = c
        .on_probe_allocated(
            LINK,
            Err(HostError::Unavailable("gone".into())),
            &mut out,
        )
        .unwrap();
    assert_eq!(done.reason, CompletionReason::AllocationFailed);
    assert!(done.collected.is_empty());
    assert!(out.is_empty());
}

#[test]
fn late_allocation_is_released() {
    let mut c = TaskCorrelator::default();
    let mut out = Vec::new();
    assert!(c
        .on_probe_allocated(LINK, Ok(ProbeSourceId(4)), &mut out)
        .is_none());
    assert_eq!(
        out,
        vec![HostCommand::Release {
            source: ProbeSourceId(4)
        }]
    );
}

#[test]
fn events_after_completion_are_stale() {
    let mut c = allocated(1);
    let mut out = Vec::new();
    c.on_probe_event(ProbeSourceId(1), AUDIO, &mut out);
    c.on_probe_event(ProbeSourceId(1), VIDEO, &mut out);
    out.clear();
    assert!(c.on_probe_event(ProbeSourceId(1), AUDIO, &mut out).is_none());
    assert!(out.is_empty());
}

#[test]
fn shutdown_releases_everything() {
    let mut c = allocated(1);
    let mut out = Vec::new();
    c.submit("https://v.test/watch?v=other", direct("t9"), &mut out);
    out.clear();
    assert_eq!(c.shutdown(&mut out), 2);
    assert_eq!(
        out,
        vec![HostCommand::Release {
            source: ProbeSourceId(1)
        }]
    );
    assert_eq!(c.pending_len(), 0);
    assert!(c.on_probe_event(ProbeSourceId(1), AUDIO, &mut out).is_none());
}
