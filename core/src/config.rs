use crate::error::{ModemError, Result};
use std::fmt;
use std::str::FromStr;

/// Smallest symbol window the Goertzel detector can resolve tones in.
pub const MIN_SAMPLES_PER_SYMBOL: usize = 16;

/// Highest tone allowed, as a fraction of the sample rate (below Nyquist with margin).
pub const MAX_TONE_FRACTION: f32 = 0.45;

/// Highest sample rate accepted from configuration or a container header.
pub const MAX_SAMPLE_RATE: u32 = 384_000;

/// Slowest symbol rate; keeps one symbol window at or below one second of audio.
pub const MIN_BAUD: f32 = 1.0;

pub const MAX_PREAMBLE_S: f32 = 10.0;
pub const MAX_GAP_MS: f32 = 1000.0;
pub const MAX_INTERLEAVE_DEPTH: usize = 1024;
pub const MAX_REPEATS: usize = 16;

/// Symbol alphabet selection
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Mode {
    /// Two simultaneous tones per symbol, 4 bits per symbol
    #[default]
    Dense,
    /// Single tone on/off keying, 1 bit per symbol, optional inter-symbol gap
    Sparse,
}

impl Mode {
    pub fn as_str(&self) -> &'static str {
        match self {
            Mode::Dense => "dense",
            Mode::Sparse => "sparse",
        }
    }
}

impl FromStr for Mode {
    type Err = ModemError;

    fn from_str(s: &str) -> Result<Self> {
        match s.trim().to_ascii_lowercase().as_str() {
            "dense" => Ok(Mode::Dense),
            "sparse" => Ok(Mode::Sparse),
            other => Err(ModemError::InvalidConfig(format!("unknown mode '{}'", other))),
        }
    }
}

impl fmt::Display for Mode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Strategy used to assemble the sample buffer from symbols
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum MixProfile {
    /// One continuous buffer, oscillator phase continuous across symbols
    #[default]
    Streaming,
    /// Each symbol rendered independently with its phase reset to zero
    Block,
}

impl MixProfile {
    pub fn as_str(&self) -> &'static str {
        match self {
            MixProfile::Streaming => "streaming",
            MixProfile::Block => "block",
        }
    }
}

impl FromStr for MixProfile {
    type Err = ModemError;

    fn from_str(s: &str) -> Result<Self> {
        match s.trim().to_ascii_lowercase().as_str() {
            "streaming" => Ok(MixProfile::Streaming),
            "block" => Ok(MixProfile::Block),
            other => Err(ModemError::InvalidConfig(format!(
                "unknown mix profile '{}'",
                other
            ))),
        }
    }
}

impl fmt::Display for MixProfile {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Modem parameters shared by encoder and decoder.
///
/// The waveform carries no parameter metadata, so both sides must agree on
/// every field. The only exception is `sample_rate`: the decoder always uses
/// the rate stored in the container header.
#[derive(Debug, Clone, PartialEq)]
pub struct ModemConfig {
    /// Sample rate in Hz
    pub sample_rate: u32,
    /// Symbols per second
    pub baud: f32,
    /// Peak amplitude as a fraction of full scale
    pub amplitude: f32,
    pub mode: Mode,
    pub mix_profile: MixProfile,
    /// Silence between symbols in milliseconds (sparse mode only)
    pub gap_ms: f32,
    /// Preamble duration in seconds
    pub preamble_s: f32,
    /// Interleaver grid width
    pub interleave_depth: usize,
    /// Consecutive transmissions of every interleaved symbol
    pub repeats: usize,
    /// Linear fade length at both ends of each symbol in milliseconds
    pub ramp_ms: f32,
}

impl Default for ModemConfig {
    fn default() -> Self {
        Self {
            sample_rate: 48_000,
            baud: 90.0,
            amplitude: 0.06,
            mode: Mode::Dense,
            mix_profile: MixProfile::Streaming,
            gap_ms: 0.0,
            preamble_s: 0.8,
            interleave_depth: 4,
            repeats: 2,
            ramp_ms: 5.0,
        }
    }
}

impl ModemConfig {
    /// Copy of this configuration at a different sample rate
    pub fn with_sample_rate(&self, sample_rate: u32) -> Self {
        Self {
            sample_rate,
            ..self.clone()
        }
    }

    pub fn validate(&self) -> Result<()> {
        if self.sample_rate == 0 {
            return Err(invalid("sample rate must be positive"));
        }
        if self.sample_rate > MAX_SAMPLE_RATE {
            return Err(ModemError::InvalidConfig(format!(
                "sample rate {} Hz exceeds {} Hz",
                self.sample_rate, MAX_SAMPLE_RATE
            )));
        }
        if !(self.baud.is_finite() && self.baud >= MIN_BAUD) {
            return Err(invalid("baud must be at least 1"));
        }
        if !(self.amplitude.is_finite() && self.amplitude > 0.0 && self.amplitude <= 1.0) {
            return Err(invalid("amplitude must be in (0, 1]"));
        }
        if !(self.gap_ms.is_finite() && (0.0..=MAX_GAP_MS).contains(&self.gap_ms)) {
            return Err(invalid("gap must be between 0 and 1000 ms"));
        }
        if !(self.preamble_s.is_finite() && (0.0..=MAX_PREAMBLE_S).contains(&self.preamble_s)) {
            return Err(invalid("preamble duration must be between 0 and 10 s"));
        }
        if !(self.ramp_ms.is_finite() && self.ramp_ms >= 0.0) {
            return Err(invalid("ramp must be >= 0 ms"));
        }
        if !(1..=MAX_INTERLEAVE_DEPTH).contains(&self.interleave_depth) {
            return Err(invalid("interleave depth must be between 1 and 1024"));
        }
        if !(1..=MAX_REPEATS).contains(&self.repeats) {
            return Err(invalid("repeat count must be between 1 and 16"));
        }
        if self.samples_per_symbol() < MIN_SAMPLES_PER_SYMBOL {
            return Err(ModemError::InvalidConfig(format!(
                "baud {} too high for {} Hz: {} samples per symbol (minimum {})",
                self.baud,
                self.sample_rate,
                self.samples_per_symbol(),
                MIN_SAMPLES_PER_SYMBOL
            )));
        }

        // A chirp shorter than one symbol has too little energy to correlate against
        let preamble = self.preamble_samples();
        if preamble > 0 && preamble < self.samples_per_symbol() {
            return Err(ModemError::InvalidConfig(format!(
                "preamble of {} samples is shorter than one symbol ({} samples); use 0 to disable it",
                preamble,
                self.samples_per_symbol()
            )));
        }

        let highest = crate::fsk::ToneTable::new(self).highest_frequency();
        let limit = self.sample_rate as f32 * MAX_TONE_FRACTION;
        if highest >= limit {
            return Err(ModemError::InvalidConfig(format!(
                "highest tone {:.0} Hz exceeds {:.0} Hz at {} Hz sample rate (lower the baud)",
                highest, limit, self.sample_rate
            )));
        }

        Ok(())
    }

    pub fn samples_per_symbol(&self) -> usize {
        (self.sample_rate as f32 / self.baud).round() as usize
    }

    /// Inter-symbol silence; always zero in dense mode
    pub fn gap_samples(&self) -> usize {
        match self.mode {
            Mode::Dense => 0,
            Mode::Sparse => ms_to_samples(self.gap_ms, self.sample_rate),
        }
    }

    /// Ramp length, capped at half a symbol so fade-in and fade-out never overlap
    pub fn ramp_samples(&self) -> usize {
        ms_to_samples(self.ramp_ms, self.sample_rate).min(self.samples_per_symbol() / 2)
    }

    pub fn preamble_samples(&self) -> usize {
        (self.preamble_s * self.sample_rate as f32).round() as usize
    }

    /// Distance in samples between the starts of consecutive symbols
    pub fn symbol_stride(&self) -> usize {
        self.samples_per_symbol() + self.gap_samples()
    }
}

fn ms_to_samples(ms: f32, sample_rate: u32) -> usize {
    (ms * sample_rate as f32 / 1000.0).round() as usize
}

fn invalid(msg: &str) -> ModemError {
    ModemError::InvalidConfig(msg.to_string())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_config_is_valid() {
        let config = ModemConfig::default();
        assert!(config.validate().is_ok());
        assert_eq!(config.samples_per_symbol(), 533);
        assert_eq!(config.ramp_samples(), 240);
        assert_eq!(config.preamble_samples(), 38_400);
        assert_eq!(config.gap_samples(), 0);
    }

    #[test]
    fn test_mode_and_profile_parsing() {
        assert_eq!("dense".parse::<Mode>().unwrap(), Mode::Dense);
        assert_eq!("Sparse".parse::<Mode>().unwrap(), Mode::Sparse);
        assert_eq!("streaming".parse::<MixProfile>().unwrap(), MixProfile::Streaming);
        assert_eq!(" block ".parse::<MixProfile>().unwrap(), MixProfile::Block);

        assert!(matches!("loud".parse::<Mode>(), Err(ModemError::InvalidConfig(_))));
        assert!(matches!("chunked".parse::<MixProfile>(), Err(ModemError::InvalidConfig(_))));
    }

    #[test]
    fn test_gap_only_applies_in_sparse_mode() {
        let dense = ModemConfig {
            gap_ms: 10.0,
            ..ModemConfig::default()
        };
        assert_eq!(dense.gap_samples(), 0);

        let sparse = ModemConfig {
            mode: Mode::Sparse,
            ..dense
        };
        assert_eq!(sparse.gap_samples(), 480);
        assert_eq!(sparse.symbol_stride(), 533 + 480);
    }

    #[test]
    fn test_ramp_capped_at_half_symbol() {
        let config = ModemConfig {
            ramp_ms: 50.0,
            ..ModemConfig::default()
        };
        assert_eq!(config.ramp_samples(), config.samples_per_symbol() / 2);
    }

    #[test]
    fn test_rejects_out_of_range_values() {
        let base = ModemConfig::default();

        let cases = vec![
            ModemConfig { sample_rate: 0, ..base.clone() },
            ModemConfig { baud: 0.0, ..base.clone() },
            ModemConfig { baud: f32::NAN, ..base.clone() },
            ModemConfig { amplitude: 0.0, ..base.clone() },
            ModemConfig { amplitude: 1.5, ..base.clone() },
            ModemConfig { gap_ms: -1.0, ..base.clone() },
            ModemConfig { preamble_s: -0.1, ..base.clone() },
            ModemConfig { ramp_ms: -5.0, ..base.clone() },
            ModemConfig { interleave_depth: 0, ..base.clone() },
            ModemConfig { repeats: 0, ..base.clone() },
            ModemConfig { baud: 10_000.0, ..base.clone() },
            ModemConfig { baud: 0.001, ..base.clone() },
            ModemConfig { sample_rate: 400_000_000, ..base.clone() },
            ModemConfig { preamble_s: 100_000.0, ..base.clone() },
            ModemConfig { gap_ms: 5_000.0, ..base.clone() },
            ModemConfig { interleave_depth: 1_000_000, ..base.clone() },
            ModemConfig { repeats: 1_000, ..base.clone() },
        ];

        for config in cases {
            assert!(
                matches!(config.validate(), Err(ModemError::InvalidConfig(_))),
                "expected rejection for {:?}",
                config
            );
        }
    }

    #[test]
    fn test_rejects_tones_above_nyquist_margin() {
        // Dense band tops out at 600 + 31 * 180 = 6180 Hz at 90 baud
        let config = ModemConfig {
            sample_rate: 8_000,
            ..ModemConfig::default()
        };
        assert!(matches!(config.validate(), Err(ModemError::InvalidConfig(_))));

        let ok = ModemConfig {
            sample_rate: 16_000,
            ..ModemConfig::default()
        };
        assert!(ok.validate().is_ok());
    }

    #[test]
    fn test_preamble_shorter_than_a_symbol_rejected() {
        // 0.00004 s at 48 kHz is a 2-sample chirp: sin(0) and a near-zero sample
        let short = ModemConfig {
            preamble_s: 0.00004,
            ..ModemConfig::default()
        };
        assert_eq!(short.preamble_samples(), 2);
        assert!(matches!(short.validate(), Err(ModemError::InvalidConfig(_))));

        let one_symbol = ModemConfig {
            preamble_s: 533.0 / 48_000.0,
            ..ModemConfig::default()
        };
        assert!(one_symbol.validate().is_ok());

        // Rounds to zero samples, i.e. no preamble at all
        let disabled = ModemConfig {
            preamble_s: 0.000001,
            ..ModemConfig::default()
        };
        assert_eq!(disabled.preamble_samples(), 0);
        assert!(disabled.validate().is_ok());
    }
}
