use std::io::Write;
use std::path::Path;

use tracing::info;

use crate::error::{EngineError, Result};
use crate::render::{RenderSurface, build_render_model};
use crate::segments::SegmentStore;
use crate::time::format_mmss;
use crate::timeline::Timeline;
use crate::viewport::Viewport;

/// Writes segments as CSV rows of `Start,End,Label` with `mm:ss` times.
///
/// Fails with [`EngineError::NothingToExport`] when the store is empty and
/// leaves no partial file behind in that case.
pub fn write_csv(segments: &SegmentStore, path: &Path) -> Result<()> {
    if segments.is_empty() {
        return Err(EngineError::NothingToExport);
    }

    let mut file = std::fs::File::create(path).map_err(|source| EngineError::ExportIo {
        context: "create csv file",
        path: path.to_path_buf(),
        source,
    })?;
    let mut out = String::from("Start,End,Label\n");
    for segment in segments.iter() {
        out.push_str(&format!(
            "{},{},{}\n",
            format_mmss(segment.start),
            format_mmss(segment.end),
            segment.label
        ));
    }
    file.write_all(out.as_bytes())
        .map_err(|source| EngineError::ExportIo {
            context: "write csv file",
            path: path.to_path_buf(),
            source,
        })?;

    info!(segment_count = segments.len(), path = ?path, "csv export finished");
    Ok(())
}

/// Renders the full, unzoomed waveform view through a rendering
/// collaborator (the playback cursor is omitted from exports).
pub fn export_waveform<S: RenderSurface>(
    timeline: &Timeline,
    segments: &SegmentStore,
    surface: &mut S,
    target: &Path,
) -> Result<()> {
    let full_view = Viewport::full(timeline.duration());
    let model = build_render_model(timeline, segments, &full_view, None);
    surface.draw(&model, target)?;
    info!(path = ?target, "waveform export finished");
    Ok(())
}
