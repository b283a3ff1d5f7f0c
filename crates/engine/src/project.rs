use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};
use tracing::info;

use crate::error::{EngineError, Result};
use crate::segments::{Segment, SegmentStore};
use crate::timeline::{DEFAULT_DECIMATION, Timeline};
use crate::viewport::Viewport;

/// Tunable analysis parameters; saved alongside projects.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Settings {
    /// Minimum segment length produced by automatic analysis, in seconds.
    pub min_segment_len: f64,
    /// Envelope decimation factor applied at load time.
    pub decimation: usize,
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            min_segment_len: 8.0,
            decimation: DEFAULT_DECIMATION,
        }
    }
}

/// Loaded editing state: the decoded timeline plus the mutable segment set
/// and view window. Owned exclusively by the engine.
#[derive(Debug, Clone, PartialEq)]
pub struct Project {
    pub source: PathBuf,
    pub timeline: Timeline,
    pub segments: SegmentStore,
    pub viewport: Viewport,
}

impl Project {
    /// Builds a fresh project around decoded audio: no segments, full view.
    pub fn new(source: PathBuf, timeline: Timeline) -> Self {
        let viewport = Viewport::full(timeline.duration());
        Self {
            source,
            timeline,
            segments: SegmentStore::new(),
            viewport,
        }
    }
}

/// On-disk project format: the audio path plus the segment set; the audio
/// itself is re-decoded on open.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SavedProject {
    pub source: PathBuf,
    pub settings: Settings,
    pub segments: Vec<Segment>,
}

/// Saves the project's segment set and settings as JSON.
pub fn save_project(project: &Project, settings: Settings, path: &Path) -> Result<()> {
    let saved = SavedProject {
        source: project.source.clone(),
        settings,
        segments: project.segments.iter().cloned().collect(),
    };
    let json =
        serde_json::to_string_pretty(&saved).map_err(|source| EngineError::ProjectSerialization {
            path: path.to_path_buf(),
            source,
        })?;
    std::fs::write(path, json).map_err(|source| EngineError::ProjectIo {
        context: "write project file",
        path: path.to_path_buf(),
        source,
    })?;
    info!(path = ?path, segment_count = saved.segments.len(), "project saved");
    Ok(())
}

/// Reads a saved project file without touching the referenced audio.
pub fn read_saved_project(path: &Path) -> Result<SavedProject> {
    let json = std::fs::read_to_string(path).map_err(|source| EngineError::ProjectIo {
        context: "read project file",
        path: path.to_path_buf(),
        source,
    })?;
    serde_json::from_str(&json).map_err(|source| EngineError::ProjectSerialization {
        path: path.to_path_buf(),
        source,
    })
}

/// Validates stored segments against a freshly decoded timeline and
/// restores them as a segment store.
pub fn restore_segments(saved: &SavedProject, timeline: &Timeline) -> Result<SegmentStore> {
    let duration = timeline.duration();
    for segment in &saved.segments {
        if !(segment.start >= 0.0 && segment.start < segment.end && segment.end <= duration) {
            return Err(EngineError::InvalidProjectFile {
                reason: format!(
                    "segment '{}' [{:.3}, {:.3}] does not fit the audio duration {:.3}",
                    segment.label, segment.start, segment.end, duration
                ),
            });
        }
    }
    for pair in saved.segments.windows(2) {
        if pair[0].end > pair[1].start {
            return Err(EngineError::InvalidProjectFile {
                reason: format!(
                    "segments '{}' and '{}' overlap or are out of order",
                    pair[0].label, pair[1].label
                ),
            });
        }
    }
    Ok(SegmentStore::from_segments(saved.segments.clone()))
}
