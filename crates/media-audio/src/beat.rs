const FRAME_LEN: usize = 1024;
const HOP_LEN: usize = 512;
/// Minimum spacing between reported onsets, in seconds.
const MIN_ONSET_SPACING: f64 = 0.25;
/// Multiplier over the local mean flux a peak must clear.
const THRESHOLD_GAIN: f32 = 1.5;
/// Frames of context on each side used for the adaptive threshold.
const THRESHOLD_CONTEXT: usize = 16;

/// Detects rhythmic onset times in mono audio.
///
/// Frames the signal, computes RMS energy per frame and picks local maxima
/// of the positive energy flux that clear an adaptive threshold. The result
/// is a strictly increasing list of candidate boundary times in seconds;
/// silent or too-short input yields an empty or short list rather than an
/// error, which the caller treats as an analysis failure.
pub fn detect_beats(samples: &[f32], sample_rate: u32) -> Vec<f64> {
    if sample_rate == 0 || samples.len() < FRAME_LEN * 2 {
        return Vec::new();
    }

    let energies: Vec<f32> = samples
        .windows(FRAME_LEN)
        .step_by(HOP_LEN)
        .map(rms)
        .collect();
    if energies.len() < 3 {
        return Vec::new();
    }

    // Positive energy flux: rises in loudness mark note and beat onsets.
    let flux: Vec<f32> = energies
        .windows(2)
        .map(|pair| (pair[1] - pair[0]).max(0.0))
        .collect();

    let seconds_per_hop = HOP_LEN as f64 / sample_rate as f64;
    let mut onsets = Vec::new();
    let mut last_onset = f64::NEG_INFINITY;

    for i in 1..flux.len().saturating_sub(1) {
        if flux[i] <= flux[i - 1] || flux[i] < flux[i + 1] {
            continue;
        }
        let threshold = local_mean(&flux, i, THRESHOLD_CONTEXT) * THRESHOLD_GAIN;
        if flux[i] <= threshold || flux[i] <= f32::EPSILON {
            continue;
        }
        // flux[i] compares frame i+1 against frame i: the rise lands at i+1.
        let time = (i + 1) as f64 * seconds_per_hop;
        if time - last_onset < MIN_ONSET_SPACING {
            continue;
        }
        onsets.push(time);
        last_onset = time;
    }

    onsets
}

fn rms(frame: &[f32]) -> f32 {
    let sum: f32 = frame.iter().map(|sample| sample * sample).sum();
    (sum / frame.len() as f32).sqrt()
}

fn local_mean(flux: &[f32], center: usize, context: usize) -> f32 {
    let lo = center.saturating_sub(context);
    let hi = (center + context + 1).min(flux.len());
    let window = &flux[lo..hi];
    window.iter().sum::<f32>() / window.len() as f32
}
