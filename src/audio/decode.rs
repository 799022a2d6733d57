use std::io::Cursor;
use std::path::Path;

use hound::SampleFormat;
use tracing::debug;

use super::buffer::SampleBuffer;
use super::error::AudioLoadError;
use super::resample::resample_linear;

/// Read a WAV file from disk, downmix it to mono and optionally resample it.
pub fn load_wav(
    path: &Path,
    target_sample_rate: Option<u32>,
) -> Result<SampleBuffer, AudioLoadError> {
    let bytes = std::fs::read(path).map_err(|source| AudioLoadError::Read {
        path: path.to_path_buf(),
        source,
    })?;
    let buffer = decode_wav_bytes(&bytes, target_sample_rate)?;
    debug!(
        path = %path.display(),
        sample_rate = buffer.sample_rate(),
        seconds = buffer.duration_seconds(),
        "decoded wav"
    );
    Ok(buffer)
}

/// Decode in-memory WAV bytes into a mono [`SampleBuffer`].
pub fn decode_wav_bytes(
    bytes: &[u8],
    target_sample_rate: Option<u32>,
) -> Result<SampleBuffer, AudioLoadError> {
    let mut reader = hound::WavReader::new(Cursor::new(bytes))
        .map_err(|source| AudioLoadError::Invalid { source })?;
    let spec = reader.spec();
    let channels = spec.channels.max(1) as usize;
    let interleaved = match spec.sample_format {
        SampleFormat::Float => {
            if spec.bits_per_sample != 32 {
                return Err(AudioLoadError::Unsupported {
                    bits_per_sample: spec.bits_per_sample,
                    format: "float",
                });
            }
            read_float_samples(&mut reader)?
        }
        SampleFormat::Int => read_int_samples(&mut reader, spec.bits_per_sample)?,
    };
    let mono = downmix(&interleaved, channels);
    let (samples, sample_rate) = match target_sample_rate.filter(|rate| *rate > 0) {
        Some(rate) if rate != spec.sample_rate => {
            (resample_linear(&mono, spec.sample_rate, rate), rate)
        }
        _ => (mono, spec.sample_rate),
    };
    Ok(SampleBuffer::new(samples, sample_rate))
}

fn read_float_samples(
    reader: &mut hound::WavReader<Cursor<&[u8]>>,
) -> Result<Vec<f32>, AudioLoadError> {
    reader
        .samples::<f32>()
        .map(|s| s.map_err(|source| AudioLoadError::Sample { source }))
        .collect()
}

fn read_int_samples(
    reader: &mut hound::WavReader<Cursor<&[u8]>>,
    bits_per_sample: u16,
) -> Result<Vec<f32>, AudioLoadError> {
    if bits_per_sample == 0 || bits_per_sample > 32 {
        return Err(AudioLoadError::Unsupported {
            bits_per_sample,
            format: "int",
        });
    }
    let scale = (1i64 << (bits_per_sample - 1)) as f32;
    reader
        .samples::<i32>()
        .map(|s| {
            s.map(|v| v as f32 / scale)
                .map_err(|source| AudioLoadError::Sample { source })
        })
        .collect()
}

fn downmix(interleaved: &[f32], channels: usize) -> Vec<f32> {
    if channels <= 1 {
        return interleaved.to_vec();
    }
    interleaved
        .chunks_exact(channels)
        .map(|frame| frame.iter().sum::<f32>() / channels as f32)
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn wav_bytes_i16(channels: u16, sample_rate: u32, samples: &[i16]) -> Vec<u8> {
        let spec = hound::WavSpec {
            channels,
            sample_rate,
            bits_per_sample: 16,
            sample_format: SampleFormat::Int,
        };
        let mut cursor = Cursor::new(Vec::new());
        {
            let mut writer = hound::WavWriter::new(&mut cursor, spec).expect("create wav writer");
            for &sample in samples {
                writer.write_sample(sample).expect("write sample");
            }
            writer.finalize().expect("finalize wav");
        }
        cursor.into_inner()
    }

    #[test]
    fn stereo_is_averaged_to_mono() {
        let half = i16::MAX / 2;
        let bytes = wav_bytes_i16(2, 8_000, &[half, 0, 0, half, half, half]);
        let buffer = decode_wav_bytes(&bytes, None).expect("decode stereo wav");
        assert_eq!(buffer.len(), 3);
        assert_eq!(buffer.sample_rate(), 8_000);
        let expected = half as f32 / 32_768.0;
        assert!((buffer.samples()[0] - expected / 2.0).abs() < 1e-4);
        assert!((buffer.samples()[2] - expected).abs() < 1e-4);
    }

    #[test]
    fn resamples_to_target_rate() {
        let samples: Vec<i16> = (0..800).map(|i| (i % 100) as i16).collect();
        let bytes = wav_bytes_i16(1, 8_000, &samples);
        let buffer = decode_wav_bytes(&bytes, Some(16_000)).expect("decode wav");
        assert_eq!(buffer.sample_rate(), 16_000);
        assert_eq!(buffer.len(), 1_600);
    }

    #[test]
    fn garbage_bytes_are_rejected() {
        let err = decode_wav_bytes(b"not a wav file at all", None).unwrap_err();
        assert!(matches!(err, AudioLoadError::Invalid { .. }));
    }
}
