use std::path::Path;

use image::{Rgba, RgbaImage};

use crate::error::{MediaAudioError, Result};

const BACKGROUND: Rgba<u8> = Rgba([255, 255, 255, 255]);
const SEGMENT_TINT: Rgba<u8> = Rgba([255, 165, 0, 77]);
const ENVELOPE_COLOR: Rgba<u8> = Rgba([0, 0, 0, 153]);
const BOUNDARY_COLOR: Rgba<u8> = Rgba([30, 60, 220, 255]);
const CURSOR_COLOR: Rgba<u8> = Rgba([220, 40, 30, 255]);

/// Draw data for one waveform image, already restricted to a view range.
#[derive(Debug, Clone, PartialEq)]
pub struct WaveformImage<'a> {
    pub width: u32,
    pub height: u32,
    pub view_start: f64,
    pub view_end: f64,
    /// `(seconds, amplitude)` envelope points inside the view.
    pub envelope: &'a [(f64, f32)],
    /// `(start, end)` spans of segments clipped to the view.
    pub spans: &'a [(f64, f64)],
    /// Segment boundary times inside the view.
    pub boundaries: &'a [f64],
    pub cursor: Option<f64>,
}

/// Rasterizes a waveform view and writes it as a PNG file.
pub fn render_waveform_png(image: &WaveformImage<'_>, path: &Path) -> Result<()> {
    let canvas = rasterize(image);
    canvas.save(path).map_err(|source| MediaAudioError::PngEncode {
        path: path.to_path_buf(),
        source,
    })
}

fn rasterize(image: &WaveformImage<'_>) -> RgbaImage {
    let width = image.width.max(1);
    let height = image.height.max(1);
    let mut canvas = RgbaImage::from_pixel(width, height, BACKGROUND);

    for &(start, end) in image.spans {
        let x0 = column(image, start, width);
        let x1 = column(image, end, width);
        for x in x0..=x1 {
            for y in 0..height {
                blend(&mut canvas, x, y, SEGMENT_TINT);
            }
        }
    }

    draw_envelope(image, &mut canvas, width, height);

    for &boundary in image.boundaries {
        draw_vline(&mut canvas, column(image, boundary, width), height, BOUNDARY_COLOR);
    }
    if let Some(cursor) = image.cursor {
        draw_vline(&mut canvas, column(image, cursor, width), height, CURSOR_COLOR);
    }

    canvas
}

/// Per-pixel min/max column rendering of the envelope.
fn draw_envelope(image: &WaveformImage<'_>, canvas: &mut RgbaImage, width: u32, height: u32) {
    let peak = image
        .envelope
        .iter()
        .map(|&(_, amplitude)| amplitude.abs())
        .fold(0.0_f32, f32::max)
        .max(f32::EPSILON);

    let mut columns: Vec<Option<(f32, f32)>> = vec![None; width as usize];
    for &(time, amplitude) in image.envelope {
        let x = column(image, time, width) as usize;
        let entry = columns[x].get_or_insert((amplitude, amplitude));
        entry.0 = entry.0.min(amplitude);
        entry.1 = entry.1.max(amplitude);
    }

    let mid = (height - 1) as f32 / 2.0;
    for (x, entry) in columns.iter().enumerate() {
        let Some((lo, hi)) = entry else {
            continue;
        };
        let y_top = (mid - hi / peak * mid).round().clamp(0.0, (height - 1) as f32) as u32;
        let y_bottom = (mid - lo / peak * mid).round().clamp(0.0, (height - 1) as f32) as u32;
        for y in y_top..=y_bottom {
            blend(canvas, x as u32, y, ENVELOPE_COLOR);
        }
    }
}

fn column(image: &WaveformImage<'_>, time: f64, width: u32) -> u32 {
    let span = (image.view_end - image.view_start).max(f64::EPSILON);
    let ratio = ((time - image.view_start) / span).clamp(0.0, 1.0);
    (ratio * (width - 1) as f64).round() as u32
}

fn draw_vline(canvas: &mut RgbaImage, x: u32, height: u32, color: Rgba<u8>) {
    for y in 0..height {
        canvas.put_pixel(x, y, color);
    }
}

fn blend(canvas: &mut RgbaImage, x: u32, y: u32, color: Rgba<u8>) {
    let alpha = color.0[3] as u32;
    let inverse = 255 - alpha;
    let below = canvas.get_pixel(x, y).0;
    let mixed = [
        ((color.0[0] as u32 * alpha + below[0] as u32 * inverse) / 255) as u8,
        ((color.0[1] as u32 * alpha + below[1] as u32 * inverse) / 255) as u8,
        ((color.0[2] as u32 * alpha + below[2] as u32 * inverse) / 255) as u8,
        255,
    ];
    canvas.put_pixel(x, y, Rgba(mixed));
}

#[cfg(test)]
mod tests {
    use super::{BACKGROUND, WaveformImage, rasterize};

    fn sample_image<'a>(
        envelope: &'a [(f64, f32)],
        spans: &'a [(f64, f64)],
        boundaries: &'a [f64],
    ) -> WaveformImage<'a> {
        WaveformImage {
            width: 100,
            height: 40,
            view_start: 0.0,
            view_end: 10.0,
            envelope,
            spans,
            boundaries,
            cursor: None,
        }
    }

    #[test]
    fn empty_model_renders_plain_background() {
        let image = sample_image(&[], &[], &[]);
        let canvas = rasterize(&image);
        assert_eq!(canvas.dimensions(), (100, 40));
        assert!(canvas.pixels().all(|pixel| *pixel == BACKGROUND));
    }

    #[test]
    fn segment_span_tints_its_columns_only() {
        let image = sample_image(&[], &[(0.0, 5.0)], &[]);
        let canvas = rasterize(&image);
        assert_ne!(*canvas.get_pixel(10, 20), BACKGROUND);
        assert_eq!(*canvas.get_pixel(99, 20), BACKGROUND);
    }

    #[test]
    fn boundary_line_spans_full_height() {
        let image = sample_image(&[], &[], &[5.0]);
        let canvas = rasterize(&image);
        let x = 50;
        let top = *canvas.get_pixel(x, 0);
        assert_ne!(top, BACKGROUND);
        assert!((0..40).all(|y| *canvas.get_pixel(x, y) == top));
    }

    #[test]
    fn envelope_paints_around_the_vertical_midline() {
        let envelope = [(2.0, 1.0_f32), (2.02, -1.0)];
        let image = sample_image(&envelope, &[], &[]);
        let canvas = rasterize(&image);
        // Both extremes land in one column, so the whole midline is covered.
        assert_ne!(*canvas.get_pixel(20, 19), BACKGROUND);
        assert_ne!(*canvas.get_pixel(20, 0), BACKGROUND);
        assert_ne!(*canvas.get_pixel(20, 39), BACKGROUND);
    }
}
