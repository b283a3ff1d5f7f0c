use std::path::Path;

use crate::error::Result;

/// Decoded audio handed to the engine by a decoder backend.
#[derive(Debug, Clone, PartialEq)]
pub struct DecodedAudio {
    pub samples: Vec<f32>,
    pub sample_rate: u32,
}

/// Audio file decoding required by the engine.
pub trait AudioDecoder {
    /// Decodes a whole file into mono samples.
    fn load(&self, path: &Path) -> Result<DecodedAudio>;
}

/// Boundary candidate detection over decoded audio.
pub trait BeatDetector {
    /// Returns monotonically increasing candidate boundary times in
    /// seconds. An empty or too-short result signals analysis failure; the
    /// engine reports it as such.
    fn detect(&self, samples: &[f32], sample_rate: u32) -> Vec<f64>;
}

/// Preview playback required by the engine.
///
/// The backend owns the single preview clip buffer: loading a clip replaces
/// the previous one, and dropping the backend must halt playback and release
/// the buffer.
pub trait PlaybackEngine {
    /// Loads a clip, replacing any previous one.
    fn load_clip(&mut self, samples: &[f32], sample_rate: u32) -> Result<()>;

    /// Starts the loaded clip from `start_offset` seconds. Backends without
    /// offset support fail with `SeekUnsupported` for non-zero offsets; the
    /// engine then falls back to playing from the clip start.
    fn play(&mut self, start_offset: f64) -> Result<()>;

    /// Halts playback and releases the clip buffer.
    fn stop(&mut self);

    /// Current playback position in milliseconds, or
    /// [`crate::playback::FINISHED_SENTINEL`] once the clip has played out.
    fn position_millis(&mut self) -> i64;
}

/// Symphonia-backed decoder used by production wiring.
#[derive(Debug, Default, Clone, Copy)]
pub struct SymphoniaDecoder;

impl AudioDecoder for SymphoniaDecoder {
    fn load(&self, path: &Path) -> Result<DecodedAudio> {
        let decoded = media_audio::load_audio(path)?;
        Ok(DecodedAudio {
            samples: decoded.samples,
            sample_rate: decoded.sample_rate,
        })
    }
}

/// Energy-flux onset detector used by production wiring.
#[derive(Debug, Default, Clone, Copy)]
pub struct OnsetBeatDetector;

impl BeatDetector for OnsetBeatDetector {
    fn detect(&self, samples: &[f32], sample_rate: u32) -> Vec<f64> {
        media_audio::detect_beats(samples, sample_rate)
    }
}

/// Rodio-backed preview playback used by production wiring.
#[derive(Default)]
pub struct RodioPlayback {
    player: media_audio::RodioPlayer,
}

impl RodioPlayback {
    pub fn new() -> Self {
        Self::default()
    }
}

impl PlaybackEngine for RodioPlayback {
    fn load_clip(&mut self, samples: &[f32], sample_rate: u32) -> Result<()> {
        self.player.load_clip(samples, sample_rate)?;
        Ok(())
    }

    fn play(&mut self, start_offset: f64) -> Result<()> {
        self.player.play(start_offset)?;
        Ok(())
    }

    fn stop(&mut self) {
        self.player.stop();
    }

    fn position_millis(&mut self) -> i64 {
        self.player.position_millis()
    }
}
