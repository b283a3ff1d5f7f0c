use std::path::Path;

use crate::error::Result;
use crate::segments::SegmentStore;
use crate::timeline::Timeline;
use crate::viewport::Viewport;

/// One envelope point inside the visible window.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct EnvelopePoint {
    pub time: f64,
    pub amplitude: f32,
}

/// One segment clipped to the visible window.
#[derive(Debug, Clone, PartialEq)]
pub struct SegmentSpan {
    pub index: usize,
    /// Span actually drawn, clipped to the view.
    pub draw_start: f64,
    pub draw_end: f64,
    pub label: String,
    /// True edges that fall inside the view get a boundary line.
    pub start_boundary: Option<f64>,
    pub end_boundary: Option<f64>,
}

/// Everything a rendering collaborator needs to draw one frame: the visible
/// envelope slice, the clipped segments, the view bounds and the playback
/// cursor (when it is inside the view).
#[derive(Debug, Clone, PartialEq)]
pub struct RenderModel {
    pub view_start: f64,
    pub view_end: f64,
    pub envelope: Vec<EnvelopePoint>,
    pub segments: Vec<SegmentSpan>,
    pub cursor: Option<f64>,
}

/// External drawing collaborator consuming a [`RenderModel`].
pub trait RenderSurface {
    fn draw(&mut self, model: &RenderModel, target: &Path) -> Result<()>;
}

/// Builds the render model for the current view.
pub fn build_render_model(
    timeline: &Timeline,
    segments: &SegmentStore,
    viewport: &Viewport,
    cursor: Option<f64>,
) -> RenderModel {
    let view_start = viewport.start();
    let view_end = viewport.end();

    let envelope = (0..timeline.envelope().len())
        .map(|index| EnvelopePoint {
            time: timeline.envelope_time(index),
            amplitude: timeline.envelope()[index],
        })
        .filter(|point| point.time >= view_start && point.time <= view_end)
        .collect();

    let segments = segments
        .overlapping(view_start, view_end)
        .map(|(index, segment)| SegmentSpan {
            index,
            draw_start: segment.start.max(view_start),
            draw_end: segment.end.min(view_end),
            label: segment.label.clone(),
            start_boundary: viewport.contains(segment.start).then_some(segment.start),
            end_boundary: viewport.contains(segment.end).then_some(segment.end),
        })
        .collect();

    RenderModel {
        view_start,
        view_end,
        envelope,
        segments,
        cursor: cursor.filter(|&time| viewport.contains(time)),
    }
}

/// PNG file output implementing the rendering collaborator, used for the
/// full-waveform image export.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PngSurface {
    pub width: u32,
    pub height: u32,
}

impl Default for PngSurface {
    fn default() -> Self {
        Self {
            width: 1_200,
            height: 300,
        }
    }
}

impl RenderSurface for PngSurface {
    fn draw(&mut self, model: &RenderModel, target: &Path) -> Result<()> {
        let envelope: Vec<(f64, f32)> = model
            .envelope
            .iter()
            .map(|point| (point.time, point.amplitude))
            .collect();
        let spans: Vec<(f64, f64)> = model
            .segments
            .iter()
            .map(|span| (span.draw_start, span.draw_end))
            .collect();
        let boundaries: Vec<f64> = model
            .segments
            .iter()
            .flat_map(|span| [span.start_boundary, span.end_boundary])
            .flatten()
            .collect();

        media_audio::render_waveform_png(
            &media_audio::WaveformImage {
                width: self.width,
                height: self.height,
                view_start: model.view_start,
                view_end: model.view_end,
                envelope: &envelope,
                spans: &spans,
                boundaries: &boundaries,
                cursor: model.cursor,
            },
            target,
        )?;
        Ok(())
    }
}
