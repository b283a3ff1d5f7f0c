use std::fs::File;
use std::path::Path;

use symphonia::core::audio::SampleBuffer;
use symphonia::core::codecs::{CODEC_TYPE_NULL, DecoderOptions};
use symphonia::core::errors::Error as SymphoniaError;
use symphonia::core::formats::FormatOptions;
use symphonia::core::io::MediaSourceStream;
use symphonia::core::meta::MetadataOptions;
use symphonia::core::probe::Hint;

use crate::error::{MediaAudioError, Result};

/// Decoded audio, downmixed to a single channel.
#[derive(Debug, Clone, PartialEq)]
pub struct DecodedAudio {
    pub samples: Vec<f32>,
    pub sample_rate: u32,
}

/// Decodes a whole audio file into mono f32 samples.
///
/// Interleaved multi-channel input is downmixed by averaging the channels of
/// each frame. Recoverable decode errors on individual packets are skipped;
/// the file fails only when no samples could be produced at all.
///
/// # Example
/// ```no_run
/// use media_audio::load_audio;
///
/// let audio = load_audio("song.mp3".as_ref()).expect("decode should succeed");
/// assert!(audio.sample_rate > 0);
/// ```
pub fn load_audio(path: &Path) -> Result<DecodedAudio> {
    let file = File::open(path).map_err(|source| MediaAudioError::Io {
        context: "open audio file",
        path: path.to_path_buf(),
        source,
    })?;
    let stream = MediaSourceStream::new(Box::new(file), Default::default());

    let mut hint = Hint::new();
    if let Some(extension) = path.extension().and_then(|ext| ext.to_str()) {
        hint.with_extension(extension);
    }

    let probed = symphonia::default::get_probe()
        .format(
            &hint,
            stream,
            &FormatOptions::default(),
            &MetadataOptions::default(),
        )
        .map_err(|source| MediaAudioError::Probe {
            path: path.to_path_buf(),
            source,
        })?;
    let mut format = probed.format;

    let track = format
        .tracks()
        .iter()
        .find(|track| track.codec_params.codec != CODEC_TYPE_NULL)
        .ok_or_else(|| MediaAudioError::NoAudioTrack(path.to_path_buf()))?;
    let track_id = track.id;
    let codec_params = track.codec_params.clone();
    let sample_rate = codec_params
        .sample_rate
        .ok_or_else(|| MediaAudioError::MissingSampleRate(path.to_path_buf()))?;

    let mut decoder = symphonia::default::get_codecs()
        .make(&codec_params, &DecoderOptions::default())
        .map_err(|source| MediaAudioError::Decode {
            path: path.to_path_buf(),
            source,
        })?;

    let mut samples = Vec::new();
    let mut sample_buf: Option<SampleBuffer<f32>> = None;
    let mut channels = 1usize;

    loop {
        let packet = match format.next_packet() {
            Ok(packet) => packet,
            Err(SymphoniaError::IoError(err))
                if err.kind() == std::io::ErrorKind::UnexpectedEof =>
            {
                break;
            }
            Err(SymphoniaError::ResetRequired) => break,
            Err(source) => {
                return Err(MediaAudioError::Decode {
                    path: path.to_path_buf(),
                    source,
                });
            }
        };
        if packet.track_id() != track_id {
            continue;
        }

        let decoded = match decoder.decode(&packet) {
            Ok(decoded) => decoded,
            // Corrupt packets are skipped, matching common symphonia usage.
            Err(SymphoniaError::DecodeError(_)) => continue,
            Err(source) => {
                return Err(MediaAudioError::Decode {
                    path: path.to_path_buf(),
                    source,
                });
            }
        };

        let buf = sample_buf.get_or_insert_with(|| {
            let spec = *decoded.spec();
            channels = spec.channels.count().max(1);
            SampleBuffer::<f32>::new(decoded.capacity() as u64, spec)
        });
        buf.copy_interleaved_ref(decoded);
        downmix_into(buf.samples(), channels, &mut samples);
    }

    if samples.is_empty() {
        return Err(MediaAudioError::EmptySamples(path.to_path_buf()));
    }

    Ok(DecodedAudio {
        samples,
        sample_rate,
    })
}

/// Averages interleaved frames into the mono output buffer.
fn downmix_into(interleaved: &[f32], channels: usize, out: &mut Vec<f32>) {
    if channels <= 1 {
        out.extend_from_slice(interleaved);
        return;
    }
    out.reserve(interleaved.len() / channels);
    for frame in interleaved.chunks_exact(channels) {
        out.push(frame.iter().sum::<f32>() / channels as f32);
    }
}

#[cfg(test)]
mod tests {
    use super::downmix_into;

    #[test]
    fn downmix_averages_each_interleaved_frame() {
        let mut out = Vec::new();
        downmix_into(&[1.0, 3.0, -2.0, 2.0], 2, &mut out);
        assert_eq!(out, vec![2.0, 0.0]);
    }

    #[test]
    fn downmix_passes_mono_through_unchanged() {
        let mut out = Vec::new();
        downmix_into(&[0.5, -0.5, 0.25], 1, &mut out);
        assert_eq!(out, vec![0.5, -0.5, 0.25]);
    }

    #[test]
    fn downmix_drops_trailing_partial_frame() {
        let mut out = Vec::new();
        downmix_into(&[1.0, 1.0, 1.0], 2, &mut out);
        assert_eq!(out, vec![1.0]);
    }
}
