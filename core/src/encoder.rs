use crate::config::ModemConfig;
use crate::error::{ModemError, Result};
use crate::framing::{frame_len, FrameEncoder};
use crate::modulator::Modulator;
use crate::symbol_coder::SymbolCoder;
use crate::wav::WavCodec;
use crate::MAX_PAYLOAD_SIZE;

/// Payload -> WAV
///
/// Pipeline: frame (length + CRC-32) -> symbols (interleaved, repeated) ->
/// preamble + tones -> 16-bit mono PCM.
pub struct Encoder {
    config: ModemConfig,
    coder: SymbolCoder,
    modulator: Modulator,
}

impl Encoder {
    pub fn new(config: ModemConfig) -> Result<Self> {
        config.validate()?;
        Ok(Self {
            coder: SymbolCoder::from_config(&config),
            modulator: Modulator::new(&config),
            config,
        })
    }

    pub fn config(&self) -> &ModemConfig {
        &self.config
    }

    /// Length in samples of the waveform `encode_samples` produces for a
    /// payload of `payload_len` bytes, without rendering it
    pub fn sample_count(&self, payload_len: usize) -> usize {
        let symbols = self.coder.transmitted_len(frame_len(payload_len));
        self.modulator.total_samples(symbols)
    }

    /// Encode a payload into audio samples in [-amplitude, amplitude]
    pub fn encode_samples(&self, payload: &[u8]) -> Result<Vec<f32>> {
        if payload.len() > MAX_PAYLOAD_SIZE {
            return Err(ModemError::InvalidConfig(format!(
                "payload of {} bytes exceeds the {} byte frame limit",
                payload.len(),
                MAX_PAYLOAD_SIZE
            )));
        }

        let frame = FrameEncoder::build(payload);
        let symbols = self.coder.encode(&frame);
        let samples = self.modulator.modulate(&symbols);

        log::info!(
            "Encoded {} bytes into {} symbols ({:.2} s at {} Hz, {} mode)",
            payload.len(),
            symbols.len(),
            samples.len() as f32 / self.config.sample_rate as f32,
            self.config.sample_rate,
            self.config.mode
        );

        Ok(samples)
    }

    /// Encode a payload into a complete WAV file
    pub fn encode(&self, payload: &[u8]) -> Result<Vec<u8>> {
        let samples = self.encode_samples(payload)?;
        WavCodec::write(&samples, self.config.sample_rate)
    }
}
