//! Artifact matching for observed network requests.
//!
//! A probe tab issues plenty of traffic; only media requests carrying the
//! probe marker are interesting, and each of those is tagged with the kind of
//! stream it serves (audio or video). This module decides, without any shared
//! state, whether a URL is a probe request and which kind it satisfies.

mod kind;
mod matcher;

pub use kind::ArtifactKind;
pub use matcher::{ArtifactMatcher, MatchError, DEFAULT_KIND_PARAM, DEFAULT_MARKER};
