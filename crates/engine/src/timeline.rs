use crate::error::{EngineError, Result};

/// Default chunk size for the display envelope: one envelope point per 100
/// source samples.
pub const DEFAULT_DECIMATION: usize = 100;

/// Decoded audio owned by the project: raw mono samples plus a decimated
/// amplitude envelope used for waveform rendering. Read-only after load.
#[derive(Debug, Clone, PartialEq)]
pub struct Timeline {
    samples: Vec<f32>,
    sample_rate: u32,
    envelope: Vec<f32>,
    decimation: usize,
}

impl Timeline {
    /// Builds a timeline from decoded mono samples.
    ///
    /// Fails with [`EngineError::EmptyTimeline`] when the input cannot
    /// produce a positive duration.
    pub fn from_samples(samples: Vec<f32>, sample_rate: u32, decimation: usize) -> Result<Self> {
        if samples.is_empty() || sample_rate == 0 {
            return Err(EngineError::EmptyTimeline);
        }
        let decimation = decimation.max(1);
        let envelope = decimate(&samples, decimation);
        Ok(Self {
            samples,
            sample_rate,
            envelope,
            decimation,
        })
    }

    /// Total duration in seconds; positive by construction.
    pub fn duration(&self) -> f64 {
        self.samples.len() as f64 / self.sample_rate as f64
    }

    pub fn sample_rate(&self) -> u32 {
        self.sample_rate
    }

    /// Decimated amplitude envelope for display.
    pub fn envelope(&self) -> &[f32] {
        &self.envelope
    }

    /// Exact time in seconds of the envelope point at `index`.
    pub fn envelope_time(&self, index: usize) -> f64 {
        (index * self.decimation) as f64 / self.sample_rate as f64
    }

    /// Sample slice covering `[start_s, end_s)`, clamped to the timeline.
    pub fn clip_samples(&self, start_s: f64, end_s: f64) -> &[f32] {
        let len = self.samples.len();
        let start = ((start_s.max(0.0) * self.sample_rate as f64) as usize).min(len);
        let end = ((end_s.max(0.0) * self.sample_rate as f64) as usize).clamp(start, len);
        &self.samples[start..end]
    }
}

/// Chunk-mean decimation; a factor of one returns the input unchanged.
fn decimate(samples: &[f32], factor: usize) -> Vec<f32> {
    if factor <= 1 {
        return samples.to_vec();
    }
    samples
        .chunks_exact(factor)
        .map(|chunk| chunk.iter().sum::<f32>() / factor as f32)
        .collect()
}
