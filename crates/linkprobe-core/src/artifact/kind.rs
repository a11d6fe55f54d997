use std::fmt;

/// Kind of media stream a task has to collect.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum ArtifactKind {
    Audio,
    Video,
}

impl ArtifactKind {
    /// Every task needs exactly one artifact of each of these kinds.
    pub const REQUIRED: [ArtifactKind; 2] = [ArtifactKind::Audio, ArtifactKind::Video];

    /// Map a kind tag (`audio`, `video/mp4`, ...) to a kind.
    ///
    /// Only the major type is considered; anything else yields `None`.
    pub fn from_tag(tag: &str) -> Option<Self> {
        let major = tag.split('/').next().unwrap_or(tag).trim();
        if major.eq_ignore_ascii_case("audio") {
            Some(ArtifactKind::Audio)
        } else if major.eq_ignore_ascii_case("video") {
            Some(ArtifactKind::Video)
        } else {
            None
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            ArtifactKind::Audio => "audio",
            ArtifactKind::Video => "video",
        }
    }
}

impl fmt::Display for ArtifactKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}
