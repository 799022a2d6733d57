//! Audio boundary: mono sample buffers, WAV ingestion and clip export.
//!
//! The spectral engine only ever sees a [`SampleBuffer`].

mod buffer;
mod decode;
mod error;
mod export;
mod resample;

pub use buffer::SampleBuffer;
pub use decode::{decode_wav_bytes, load_wav};
pub use error::{AudioExportError, AudioLoadError};
pub use export::export_segments;
pub use resample::resample_linear;
