//! UI-agnostic core of the audio segment editor.

pub mod api;
pub mod audio;
pub mod error;
pub mod export;
pub mod playback;
pub mod project;
pub mod render;
pub mod segments;
pub mod time;
pub mod timeline;
pub mod viewport;

pub use api::{
    AudioSummary, Command, EDGE_HIT_EPSILON, Engine, EngineErrorEvent, Event, PlaybackSummary,
    SegmentSummary, Snapshot, ViewSummary,
};
pub use audio::{
    AudioDecoder, BeatDetector, DecodedAudio, OnsetBeatDetector, PlaybackEngine, RodioPlayback,
    SymphoniaDecoder,
};
pub use error::{EngineError, Result};
pub use playback::{FINISHED_SENTINEL, PlaybackSession, TICK_INTERVAL_MS};
pub use project::{Project, Settings};
pub use render::{PngSurface, RenderModel, RenderSurface};
pub use segments::{Edge, Segment, SegmentStore};
pub use time::{format_mmss, parse_mmss};
pub use timeline::Timeline;
pub use viewport::{MAX_ZOOM_PERCENT, MIN_ZOOM_PERCENT, Viewport};
