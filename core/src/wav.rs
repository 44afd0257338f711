//! In-memory WAV container: mono, 16-bit signed PCM

use crate::error::{ModemError, Result};
use hound::{SampleFormat, WavReader, WavSpec, WavWriter};
use std::io::Cursor;

/// Full-scale value used for quantization in both directions
const PCM_SCALE: f32 = 32767.0;

pub struct WavCodec;

impl WavCodec {
    pub fn spec(sample_rate: u32) -> WavSpec {
        WavSpec {
            channels: 1,
            sample_rate,
            bits_per_sample: 16,
            sample_format: SampleFormat::Int,
        }
    }

    /// Serialize samples into a complete WAV file
    ///
    /// The RIFF and data chunk sizes are patched when the writer is finalized,
    /// so the header always describes exactly the samples written.
    pub fn write(samples: &[f32], sample_rate: u32) -> Result<Vec<u8>> {
        let mut buffer = Cursor::new(Vec::with_capacity(44 + samples.len() * 2));

        {
            let mut writer = WavWriter::new(&mut buffer, Self::spec(sample_rate)).map_err(wav_error)?;
            for &sample in samples {
                writer.write_sample(quantize(sample)).map_err(wav_error)?;
            }
            writer.finalize().map_err(wav_error)?;
        }

        Ok(buffer.into_inner())
    }

    /// Parse a WAV file, returning samples scaled to [-1, 1] and the header's sample rate
    pub fn read(bytes: &[u8]) -> Result<(Vec<f32>, u32)> {
        let mut reader = WavReader::new(Cursor::new(bytes)).map_err(wav_error)?;
        let spec = reader.spec();

        if spec.channels != 1 {
            return Err(ModemError::WavFormat(format!(
                "expected mono, found {} channels",
                spec.channels
            )));
        }
        if spec.sample_format != SampleFormat::Int || spec.bits_per_sample != 16 {
            return Err(ModemError::WavFormat(format!(
                "expected 16-bit integer PCM, found {}-bit {:?}",
                spec.bits_per_sample, spec.sample_format
            )));
        }
        if reader.len() == 0 {
            return Err(ModemError::WavFormat("data chunk is empty".to_string()));
        }

        let samples = reader
            .samples::<i16>()
            .map(|s| s.map(|v| v as f32 / PCM_SCALE))
            .collect::<std::result::Result<Vec<f32>, _>>()
            .map_err(wav_error)?;

        log::debug!(
            "Read WAV: {} samples at {} Hz",
            samples.len(),
            spec.sample_rate
        );

        Ok((samples, spec.sample_rate))
    }
}

fn quantize(sample: f32) -> i16 {
    (sample.clamp(-1.0, 1.0) * PCM_SCALE).round() as i16
}

fn wav_error(err: hound::Error) -> ModemError {
    ModemError::WavFormat(err.to_string())
}
