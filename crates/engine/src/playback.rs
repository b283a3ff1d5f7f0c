use tracing::debug;

use crate::segments::Segment;

/// Position value a playback backend reports once the clip has played out.
pub const FINISHED_SENTINEL: i64 = -1;

/// Polling cadence for playback progress, in milliseconds.
pub const TICK_INTERVAL_MS: u64 = 50;

/// Outcome of applying one progress tick to a session.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum Tick {
    /// Playback advanced; carries the new absolute cursor position.
    Progress { cursor: f64, elapsed: f64 },
    /// The backend reported the finished sentinel; the session is over.
    Finished,
}

/// State of one segment preview against the playback backend.
///
/// The engine holds at most one session (`Option<PlaybackSession>`: `None`
/// is idle, `Some` is playing). The session tracks the displayed elapsed
/// time; the absolute playback cursor is derived as segment start plus
/// elapsed.
#[derive(Debug, Clone, PartialEq)]
pub struct PlaybackSession {
    segment_index: usize,
    segment_start: f64,
    segment_duration: f64,
    elapsed: f64,
    /// Added to backend-reported positions. Zero normally; set to the
    /// requested offset after a seek fallback where the backend restarted
    /// from the clip start.
    rebase_offset: f64,
}

impl PlaybackSession {
    /// Starts tracking a preview of `segment` from its beginning.
    pub fn new(segment_index: usize, segment: &Segment) -> Self {
        Self {
            segment_index,
            segment_start: segment.start,
            segment_duration: segment.end - segment.start,
            elapsed: 0.0,
            rebase_offset: 0.0,
        }
    }

    pub fn segment_index(&self) -> usize {
        self.segment_index
    }

    pub fn segment_duration(&self) -> f64 {
        self.segment_duration
    }

    pub fn elapsed(&self) -> f64 {
        self.elapsed
    }

    /// Absolute position of the playback cursor on the timeline.
    pub fn cursor(&self) -> f64 {
        self.segment_start + self.elapsed
    }

    /// Applies one backend position report.
    ///
    /// [`FINISHED_SENTINEL`] ends the session (the caller drops it exactly
    /// as if stop had been requested); any other value updates the elapsed
    /// time and derived cursor.
    pub fn apply_tick(&mut self, position_millis: i64) -> Tick {
        if position_millis == FINISHED_SENTINEL {
            debug!(segment_index = self.segment_index, "playback finished");
            return Tick::Finished;
        }
        self.elapsed = self.rebase_offset + position_millis as f64 / 1_000.0;
        Tick::Progress {
            cursor: self.cursor(),
            elapsed: self.elapsed,
        }
    }

    /// Records a successful seek: the backend now reports positions
    /// relative to `offset` already, so no rebase is needed.
    pub fn seeked(&mut self, offset: f64) {
        self.rebase_offset = 0.0;
        self.elapsed = offset;
    }

    /// Records the seek fallback: the backend restarted from the clip
    /// start, so reported positions are shifted by `offset` from now on.
    ///
    /// After this the displayed cursor tracks the requested offset while
    /// the audible position runs from the segment start — a documented
    /// limitation of backends without offset support.
    pub fn seeked_with_restart(&mut self, offset: f64) {
        debug!(
            segment_index = self.segment_index,
            offset, "seek fallback: restarting from segment start"
        );
        self.rebase_offset = offset;
        self.elapsed = offset;
    }
}
