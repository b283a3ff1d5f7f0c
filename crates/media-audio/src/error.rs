use std::fmt::{Display, Formatter};
use std::path::PathBuf;

/// Result type used by this crate.
pub type Result<T> = std::result::Result<T, MediaAudioError>;

/// Error type for audio decoding, playback and rasterization backends.
#[derive(Debug)]
pub enum MediaAudioError {
    Io {
        context: &'static str,
        path: PathBuf,
        source: std::io::Error,
    },
    Probe {
        path: PathBuf,
        source: symphonia::core::errors::Error,
    },
    Decode {
        path: PathBuf,
        source: symphonia::core::errors::Error,
    },
    NoAudioTrack(PathBuf),
    MissingSampleRate(PathBuf),
    EmptySamples(PathBuf),
    OutputDevice {
        source: rodio::StreamError,
    },
    NoClipLoaded,
    SeekUnsupported,
    PngEncode {
        path: PathBuf,
        source: image::ImageError,
    },
}

impl Display for MediaAudioError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Io {
                context,
                path,
                source,
            } => write!(f, "{context}: {} ({source})", path.display()),
            Self::Probe { path, source } => {
                write!(f, "unreadable audio container: {} ({source})", path.display())
            }
            Self::Decode { path, source } => {
                write!(f, "audio decode failed: {} ({source})", path.display())
            }
            Self::NoAudioTrack(path) => {
                write!(f, "no decodable audio track: {}", path.display())
            }
            Self::MissingSampleRate(path) => {
                write!(f, "audio track has no sample rate: {}", path.display())
            }
            Self::EmptySamples(path) => {
                write!(f, "decoded zero audio samples: {}", path.display())
            }
            Self::OutputDevice { source } => {
                write!(f, "audio output device unavailable: {source}")
            }
            Self::NoClipLoaded => write!(f, "no preview clip loaded"),
            Self::SeekUnsupported => write!(f, "playback backend cannot start at an offset"),
            Self::PngEncode { path, source } => {
                write!(f, "waveform image export failed: {} ({source})", path.display())
            }
        }
    }
}

impl std::error::Error for MediaAudioError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            Self::Io { source, .. } => Some(source),
            Self::Probe { source, .. } | Self::Decode { source, .. } => Some(source),
            Self::OutputDevice { source } => Some(source),
            Self::PngEncode { source, .. } => Some(source),
            _ => None,
        }
    }
}
