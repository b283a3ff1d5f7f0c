//! Audio backends for the segment editor: symphonia decoding, onset
//! detection, rodio preview playback and waveform rasterization.

pub mod beat;
pub mod decode;
pub mod error;
pub mod playback;
pub mod raster;

pub use beat::detect_beats;
pub use decode::{DecodedAudio, load_audio};
pub use error::{MediaAudioError, Result};
pub use playback::RodioPlayer;
pub use raster::{WaveformImage, render_waveform_png};
