use std::fmt::{Display, Formatter};
use std::path::PathBuf;

/// Result type used by the engine crate.
pub type Result<T> = std::result::Result<T, EngineError>;

/// Errors produced by engine commands and the core data structures.
#[derive(Debug)]
pub enum EngineError {
    AudioNotLoaded,
    EmptyTimeline,
    InsufficientBoundaries {
        count: usize,
    },
    InsufficientSelection {
        count: usize,
    },
    NoSegmentSelected,
    InvalidIndex {
        index: usize,
        len: usize,
    },
    NothingToExport,
    /// Internal signal from the playback backend; consumed by the seek
    /// fallback and never shown to the user.
    SeekUnsupported,
    ExportIo {
        context: &'static str,
        path: PathBuf,
        source: std::io::Error,
    },
    ProjectIo {
        context: &'static str,
        path: PathBuf,
        source: std::io::Error,
    },
    ProjectSerialization {
        path: PathBuf,
        source: serde_json::Error,
    },
    InvalidProjectFile {
        reason: String,
    },
    Media(media_audio::MediaAudioError),
}

impl Display for EngineError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::AudioNotLoaded => write!(f, "no audio file is loaded"),
            Self::EmptyTimeline => write!(f, "decoded audio has no duration"),
            Self::InsufficientBoundaries { count } => write!(
                f,
                "automatic segmentation found only {count} boundary candidates (need at least 2)"
            ),
            Self::InsufficientSelection { count } => write!(
                f,
                "merging requires at least two selected segments ({count} selected)"
            ),
            Self::NoSegmentSelected => write!(f, "no segment is selected"),
            Self::InvalidIndex { index, len } => {
                write!(f, "segment index {index} out of range (len {len})")
            }
            Self::NothingToExport => write!(f, "there are no segments to export"),
            Self::SeekUnsupported => write!(f, "playback backend cannot start at an offset"),
            Self::ExportIo {
                context,
                path,
                source,
            } => write!(f, "{context}: {} ({source})", path.display()),
            Self::ProjectIo {
                context,
                path,
                source,
            } => write!(f, "{context}: {} ({source})", path.display()),
            Self::ProjectSerialization { path, source } => write!(
                f,
                "project serialization/deserialization failed at {} ({source})",
                path.display()
            ),
            Self::InvalidProjectFile { reason } => write!(f, "invalid project file: {reason}"),
            Self::Media(err) => write!(f, "media backend error: {err}"),
        }
    }
}

impl std::error::Error for EngineError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            Self::ExportIo { source, .. } | Self::ProjectIo { source, .. } => Some(source),
            Self::ProjectSerialization { source, .. } => Some(source),
            Self::Media(err) => Some(err),
            _ => None,
        }
    }
}

impl From<media_audio::MediaAudioError> for EngineError {
    fn from(value: media_audio::MediaAudioError) -> Self {
        match value {
            media_audio::MediaAudioError::SeekUnsupported => Self::SeekUnsupported,
            other => Self::Media(other),
        }
    }
}
