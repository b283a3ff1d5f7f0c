use std::time::Duration;

use rodio::buffer::SamplesBuffer;
use rodio::{OutputStream, OutputStreamBuilder, Sink};

use crate::error::{MediaAudioError, Result};

/// Position value reported once the current clip has played out.
pub const FINISHED_SENTINEL: i64 = -1;

/// Preview player backed by a rodio output stream.
///
/// Holds at most one clip at a time: loading a clip drops the previous sink
/// and buffer, and dropping the player stops any running sink, so the
/// preview buffer is released on every exit path. The output stream is
/// opened lazily on the first clip load, which keeps headless use (CSV/PNG
/// export) from requiring an audio device.
pub struct RodioPlayer {
    stream: Option<OutputStream>,
    sink: Option<Sink>,
    clip: Option<Clip>,
}

struct Clip {
    samples: Vec<f32>,
    sample_rate: u32,
}

impl RodioPlayer {
    pub fn new() -> Self {
        Self {
            stream: None,
            sink: None,
            clip: None,
        }
    }

    /// Replaces the current preview clip.
    ///
    /// Any playing sink is stopped and dropped before the new buffer is
    /// stored.
    pub fn load_clip(&mut self, samples: &[f32], sample_rate: u32) -> Result<()> {
        self.stop();
        self.ensure_stream()?;
        self.clip = Some(Clip {
            samples: samples.to_vec(),
            sample_rate,
        });
        Ok(())
    }

    /// Starts the loaded clip from `start_offset` seconds.
    ///
    /// Returns [`MediaAudioError::SeekUnsupported`] when a non-zero offset
    /// is requested but the source refuses to seek; the caller is expected
    /// to fall back to playing from the clip start.
    pub fn play(&mut self, start_offset: f64) -> Result<()> {
        self.stop_sink();
        self.ensure_stream()?;
        let (Some(stream), Some(clip)) = (self.stream.as_ref(), self.clip.as_ref()) else {
            return Err(MediaAudioError::NoClipLoaded);
        };

        let source = SamplesBuffer::new(1, clip.sample_rate, clip.samples.clone());
        let sink = Sink::connect_new(stream.mixer());
        sink.append(source);
        if start_offset > 0.0
            && sink
                .try_seek(Duration::from_secs_f64(start_offset))
                .is_err()
        {
            sink.stop();
            return Err(MediaAudioError::SeekUnsupported);
        }
        sink.play();
        self.sink = Some(sink);
        Ok(())
    }

    /// Stops playback and releases the preview buffer.
    pub fn stop(&mut self) {
        self.stop_sink();
        self.clip = None;
    }

    /// Reports the playback position of the current sink in milliseconds,
    /// or [`FINISHED_SENTINEL`] when nothing is playing anymore.
    pub fn position_millis(&mut self) -> i64 {
        match &self.sink {
            Some(sink) if !sink.empty() => sink.get_pos().as_millis() as i64,
            _ => FINISHED_SENTINEL,
        }
    }

    fn stop_sink(&mut self) {
        if let Some(sink) = self.sink.take() {
            sink.stop();
        }
    }

    fn ensure_stream(&mut self) -> Result<()> {
        if self.stream.is_none() {
            let stream = OutputStreamBuilder::open_default_stream()
                .map_err(|source| MediaAudioError::OutputDevice { source })?;
            self.stream = Some(stream);
        }
        Ok(())
    }
}

impl Default for RodioPlayer {
    fn default() -> Self {
        Self::new()
    }
}

impl Drop for RodioPlayer {
    fn drop(&mut self) {
        self.stop();
    }
}
