use crate::config::ModemConfig;
use crate::demodulator::Demodulator;
use crate::error::{ModemError, Result};
use crate::wav::WavCodec;

/// WAV -> payload
///
/// Every modem parameter must match the encoder's except the sample rate,
/// which is always taken from the container header.
pub struct Decoder {
    config: ModemConfig,
    demodulator: Demodulator,
}

impl Decoder {
    pub fn new(config: ModemConfig) -> Result<Self> {
        config.validate()?;
        Ok(Self {
            demodulator: Demodulator::new(&config),
            config,
        })
    }

    pub fn config(&self) -> &ModemConfig {
        &self.config
    }

    /// Decode a complete WAV file
    pub fn decode(&self, wav: &[u8]) -> Result<Vec<u8>> {
        let (samples, sample_rate) = WavCodec::read(wav)?;
        self.decode_samples(&samples, sample_rate)
    }

    /// Decode samples captured at `sample_rate`
    pub fn decode_samples(&self, samples: &[f32], sample_rate: u32) -> Result<Vec<u8>> {
        if sample_rate == self.config.sample_rate {
            check_capture_len(&self.config, samples.len())?;
            return self.demodulator.demodulate(samples);
        }

        log::debug!(
            "Capture rate {} Hz differs from configured {} Hz",
            sample_rate,
            self.config.sample_rate
        );
        let config = self.config.with_sample_rate(sample_rate);
        config.validate().map_err(|e| {
            log::debug!("Header rate rejected: {}", e);
            ModemError::WavFormat(format!("unsupported sample rate {} Hz", sample_rate))
        })?;
        check_capture_len(&config, samples.len())?;
        Demodulator::new(&config).demodulate(samples)
    }
}

/// The capture must hold a full preamble and one symbol window.
/// Checked before the preamble template is synthesized at the header's rate.
fn check_capture_len(config: &ModemConfig, len: usize) -> Result<()> {
    let needed = config.preamble_samples() + config.samples_per_symbol();
    if len < needed {
        log::debug!("Capture of {} samples cannot hold {} sync + symbol samples", len, needed);
        return Err(ModemError::SyncNotFound);
    }
    Ok(())
}
