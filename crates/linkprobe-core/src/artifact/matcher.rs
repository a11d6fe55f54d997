//! Probe-URL filter and kind classification.

use std::fmt;

use url::Url;

use super::kind::ArtifactKind;

/// Default marker present on every probe request worth looking at.
pub const DEFAULT_MARKER: &str = "rbuf=0";
/// Default query key carrying the kind tag.
pub const DEFAULT_KIND_PARAM: &str = "mime";

/// An observed URL passed the probe filter but its shape is unexpected.
///
/// The task that observed it is force-completed with what it has collected.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum MatchError {
    /// The URL could not be parsed at all.
    Unparseable { url: String, source: url::ParseError },
    /// The URL parsed but carries no kind tag.
    MissingKindTag { url: String },
}

impl fmt::Display for MatchError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            MatchError::Unparseable { url, source } => {
                write!(f, "unparseable probe url {}: {}", url, source)
            }
            MatchError::MissingKindTag { url } => write!(f, "probe url {} has no kind tag", url),
        }
    }
}

impl std::error::Error for MatchError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            MatchError::Unparseable { source, .. } => Some(source),
            MatchError::MissingKindTag { .. } => None,
        }
    }
}

/// Stateless matcher; cloning it is cheap and it can be used from any task.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ArtifactMatcher {
    marker: String,
    kind_param: String,
}

impl Default for ArtifactMatcher {
    fn default() -> Self {
        Self::new(DEFAULT_MARKER, DEFAULT_KIND_PARAM)
    }
}

impl ArtifactMatcher {
    /// `marker` is a full `key=value` query pair, `kind_param` the key holding the tag.
    pub fn new(marker: &str, kind_param: &str) -> Self {
        Self {
            marker: marker.trim().to_string(),
            kind_param: kind_param.trim().to_string(),
        }
    }

    /// Cheap pre-filter: true if the raw query string contains the marker pair.
    ///
    /// Does not allocate or percent-decode; irrelevant traffic is rejected here
    /// before `classify` runs.
    pub fn is_probe_url(&self, url: &str) -> bool {
        let Some((_, rest)) = url.split_once('?') else {
            return false;
        };
        let query = rest.split('#').next().unwrap_or(rest);
        query.split('&').any(|pair| pair == self.marker)
    }

    /// Extract the artifact kind from the URL's kind tag.
    ///
    /// `Ok(None)` means the tag is present but names a kind nobody needs.
    pub fn classify(&self, url: &str) -> Result<Option<ArtifactKind>, MatchError> {
        let parsed = Url::parse(url).map_err(|source| MatchError::Unparseable {
            url: url.to_string(),
            source,
        })?;
        let tag = parsed
            .query_pairs()
            .find(|(k, _)| k == self.kind_param.as_str())
            .map(|(_, v)| v.into_owned())
            .filter(|v| !v.trim().is_empty())
            .ok_or_else(|| MatchError::MissingKindTag {
                url: url.to_string(),
            })?;
        Ok(ArtifactKind::from_tag(&tag))
    }
}
