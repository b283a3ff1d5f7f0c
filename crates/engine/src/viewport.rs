/// Smallest window width a zoom can produce, in seconds.
pub const MIN_VIEW_WIDTH: f64 = 0.1;
/// Zoom percentage bounds; 100 shows the full timeline.
pub const MIN_ZOOM_PERCENT: u32 = 1;
pub const MAX_ZOOM_PERCENT: u32 = 10_000;

/// Visible time window over the timeline, `0 <= start < end <= total`.
///
/// Zooming changes the window width around a pivot; scrolling repositions a
/// fixed-width window. Both clamp by shifting the window back inside the
/// timeline rather than rescaling it.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Viewport {
    start: f64,
    end: f64,
    total: f64,
}

impl Viewport {
    /// Viewport showing the whole timeline.
    pub fn full(total: f64) -> Self {
        Self {
            start: 0.0,
            end: total,
            total,
        }
    }

    /// Resets to the full timeline (used after loading a new file).
    pub fn reset(&mut self, total: f64) {
        *self = Self::full(total);
    }

    pub fn start(&self) -> f64 {
        self.start
    }

    pub fn end(&self) -> f64 {
        self.end
    }

    pub fn width(&self) -> f64 {
        self.end - self.start
    }

    pub fn total(&self) -> f64 {
        self.total
    }

    pub fn contains(&self, time: f64) -> bool {
        self.start <= time && time <= self.end
    }

    /// `(start, end)` as fractions of the total, for scrollbar display.
    pub fn span_fractions(&self) -> (f64, f64) {
        (self.start / self.total, self.end / self.total)
    }

    /// Zooms around the current window center.
    pub fn zoom(&mut self, percent: u32) {
        let pivot = (self.start + self.end) / 2.0;
        self.zoom_around(percent, pivot);
    }

    /// Zooms to `percent` around `pivot` seconds.
    ///
    /// The window width becomes `total * 100 / percent`, floored at
    /// [`MIN_VIEW_WIDTH`]; `percent` is clamped to
    /// `MIN_ZOOM_PERCENT..=MAX_ZOOM_PERCENT`. Zooming twice to the same
    /// percent around the same pivot yields the same window.
    pub fn zoom_around(&mut self, percent: u32, pivot: f64) {
        let percent = percent.clamp(MIN_ZOOM_PERCENT, MAX_ZOOM_PERCENT);
        let width = (self.total * 100.0 / percent as f64)
            .max(MIN_VIEW_WIDTH)
            .min(self.total);
        self.place(pivot - width / 2.0, width);
    }

    /// Scrolls so the window starts at `fraction` of the total duration.
    pub fn scroll_to(&mut self, fraction: f64) {
        let fraction = fraction.clamp(0.0, 1.0);
        let width = self.width();
        self.place(fraction * self.total, width);
    }

    /// Positions a window of `width`, shifting it back inside the timeline.
    fn place(&mut self, start: f64, width: f64) {
        let mut start = start;
        if start + width > self.total {
            start = self.total - width;
        }
        if start < 0.0 {
            start = 0.0;
        }
        self.start = start;
        self.end = (start + width).min(self.total);
        debug_assert!(self.start >= 0.0 && self.start < self.end && self.end <= self.total);
    }
}
