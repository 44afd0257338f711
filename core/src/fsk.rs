use crate::config::{Mode, ModemConfig};
use crate::symbol_coder::Symbol;
use std::f32::consts::PI;

// Tone plan
//
// Tones are spaced TONE_SPACING_FACTOR * baud apart. With a symbol window of
// sample_rate / baud samples that puts neighbours two Goertzel bins apart, on
// the first null of the (nearly triangular) ramped symbol envelope.
//
// Dense: 32 tones in two bands of 16. Symbol v lights tone v in the lower band
// and its mirror 31 - v in the upper band, so every symbol is carried on two
// well separated frequencies.
//
// Sparse: a single on/off data tone plus a guard frequency that is never
// transmitted; the demodulator reads the guard as a noise-floor probe.

/// Lowest dense-mode tone in Hz
const DENSE_BASE_FREQ: f32 = 600.0;

/// Tones per dense band; also the dense alphabet size
const DENSE_TONES_PER_BAND: usize = 16;

/// Number of mirrored dense bands
const DENSE_BANDS: usize = 2;

/// Bits carried by one dense symbol (2^4 = 16 alphabet entries)
const DENSE_BITS_PER_SYMBOL: usize = 4;

/// Sparse-mode data tone in Hz
const SPARSE_TONE_FREQ: f32 = 1500.0;

/// Guard probe distance above the sparse tone, in tone spacings
const SPARSE_GUARD_SPACINGS: f32 = 2.0;

/// Tone spacing relative to the baud rate
pub const TONE_SPACING_FACTOR: f32 = 2.0;

pub fn bits_per_symbol(mode: Mode) -> usize {
    match mode {
        Mode::Dense => DENSE_BITS_PER_SYMBOL,
        Mode::Sparse => 1,
    }
}

/// Index of the sparse data tone in the sparse table
pub const SPARSE_DATA_TONE: usize = 0;

/// Index of the sparse guard probe in the sparse table
pub const SPARSE_GUARD_TONE: usize = 1;

/// Frequencies and symbol alphabet for one configuration
#[derive(Debug, Clone)]
pub struct ToneTable {
    mode: Mode,
    frequencies: Vec<f32>,
}

impl ToneTable {
    pub fn new(config: &ModemConfig) -> Self {
        let spacing = TONE_SPACING_FACTOR * config.baud;
        let frequencies = match config.mode {
            Mode::Dense => (0..DENSE_TONES_PER_BAND * DENSE_BANDS)
                .map(|i| DENSE_BASE_FREQ + i as f32 * spacing)
                .collect(),
            Mode::Sparse => vec![
                SPARSE_TONE_FREQ,
                SPARSE_TONE_FREQ + SPARSE_GUARD_SPACINGS * spacing,
            ],
        };

        Self {
            mode: config.mode,
            frequencies,
        }
    }

    pub fn frequencies(&self) -> &[f32] {
        &self.frequencies
    }

    pub fn highest_frequency(&self) -> f32 {
        self.frequencies.iter().copied().fold(0.0, f32::max)
    }

    pub fn bits_per_symbol(&self) -> usize {
        bits_per_symbol(self.mode)
    }

    pub fn alphabet_size(&self) -> usize {
        1 << self.bits_per_symbol()
    }

    /// Tone indices lit by `symbol`
    pub fn active_tones(&self, symbol: Symbol) -> Vec<usize> {
        match self.mode {
            Mode::Dense => {
                let v = symbol as usize % DENSE_TONES_PER_BAND;
                vec![v, DENSE_TONES_PER_BAND * DENSE_BANDS - 1 - v]
            }
            Mode::Sparse => {
                if symbol & 1 == 1 {
                    vec![SPARSE_DATA_TONE]
                } else {
                    Vec::new()
                }
            }
        }
    }

    /// Amplitude share of each active tone so that a full symbol peaks at 1.0
    pub fn tone_gain(&self) -> f32 {
        match self.mode {
            Mode::Dense => 1.0 / DENSE_BANDS as f32,
            Mode::Sparse => 1.0,
        }
    }

    /// Energies of every tone in the table over one window
    pub fn energies(&self, window: &[f32], sample_rate: f32) -> Vec<f32> {
        let conditioned = remove_dc(window);
        self.frequencies
            .iter()
            .map(|&freq| goertzel_power(&conditioned, freq, sample_rate))
            .collect()
    }

    /// Dense-mode match score of every alphabet entry: sum of its tones' energies
    pub fn dense_scores(&self, energies: &[f32]) -> Vec<f32> {
        (0..DENSE_TONES_PER_BAND)
            .map(|v| {
                self.active_tones(v as Symbol)
                    .iter()
                    .map(|&tone| energies[tone])
                    .sum()
            })
            .collect()
    }
}

/// Generalized Goertzel: power of `freq` over the whole window, no FFT needed
pub fn goertzel_power(samples: &[f32], freq: f32, sample_rate: f32) -> f32 {
    let omega = 2.0 * PI * freq / sample_rate;
    let cos = omega.cos();
    let coeff = 2.0 * cos;

    let mut q1 = 0.0f32;
    let mut q2 = 0.0f32;
    for &sample in samples {
        let q0 = coeff * q1 - q2 + sample;
        q2 = q1;
        q1 = q0;
    }

    (q1 * q1 + q2 * q2 - coeff * q1 * q2).max(0.0)
}

/// Remove DC so leakage into the low tones does not bias detection
fn remove_dc(samples: &[f32]) -> Vec<f32> {
    if samples.is_empty() {
        return Vec::new();
    }
    let mean = samples.iter().sum::<f32>() / samples.len() as f32;
    samples.iter().map(|s| s - mean).collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn tone(freq: f32, len: usize, sample_rate: f32, amplitude: f32) -> Vec<f32> {
        (0..len)
            .map(|n| amplitude * (2.0 * PI * freq * n as f32 / sample_rate).sin())
            .collect()
    }

    #[test]
    fn test_dense_table_layout() {
        let table = ToneTable::new(&ModemConfig::default());
        assert_eq!(table.frequencies().len(), 32);
        assert_eq!(table.frequencies()[0], 600.0);
        assert_eq!(table.frequencies()[1], 780.0);
        assert_eq!(table.highest_frequency(), 600.0 + 31.0 * 180.0);
        assert_eq!(table.alphabet_size(), 16);
    }

    #[test]
    fn test_dense_symbols_are_distinct_mirrored_pairs() {
        let table = ToneTable::new(&ModemConfig::default());
        let mut seen = std::collections::HashSet::new();
        for v in 0..16u8 {
            let tones = table.active_tones(v);
            assert_eq!(tones, vec![v as usize, 31 - v as usize]);
            assert!(seen.insert(tones));
        }
    }

    #[test]
    fn test_sparse_table_layout() {
        let config = ModemConfig {
            mode: Mode::Sparse,
            ..ModemConfig::default()
        };
        let table = ToneTable::new(&config);
        assert_eq!(table.frequencies(), &[1500.0, 1860.0]);
        assert_eq!(table.alphabet_size(), 2);
        assert_eq!(table.active_tones(1), vec![SPARSE_DATA_TONE]);
        assert!(table.active_tones(0).is_empty());
        assert_eq!(table.tone_gain(), 1.0);
    }

    #[test]
    fn test_goertzel_picks_transmitted_tone() {
        let sample_rate = 48_000.0;
        let signal = tone(1500.0, 533, sample_rate, 0.5);

        let on = goertzel_power(&signal, 1500.0, sample_rate);
        let off = goertzel_power(&signal, 1860.0, sample_rate);
        assert!(on > off * 100.0, "on={} off={}", on, off);
    }

    #[test]
    fn test_goertzel_power_scales_with_amplitude_squared() {
        let sample_rate = 48_000.0;
        let loud = goertzel_power(&tone(960.0, 500, sample_rate, 1.0), 960.0, sample_rate);
        let quiet = goertzel_power(&tone(960.0, 500, sample_rate, 0.5), 960.0, sample_rate);
        assert!((loud / quiet - 4.0).abs() < 0.01);
    }

    #[test]
    fn test_dense_scores_peak_on_sent_symbol() {
        let config = ModemConfig::default();
        let table = ToneTable::new(&config);
        let sample_rate = config.sample_rate as f32;
        let len = config.samples_per_symbol();

        for v in [0u8, 5, 15] {
            let mut window = vec![0.0f32; len];
            for tone_idx in table.active_tones(v) {
                let freq = table.frequencies()[tone_idx];
                for (n, s) in tone(freq, len, sample_rate, 0.03).iter().enumerate() {
                    window[n] += s;
                }
            }
            let scores = table.dense_scores(&table.energies(&window, sample_rate));
            let best = scores
                .iter()
                .enumerate()
                .max_by(|a, b| a.1.partial_cmp(b.1).unwrap())
                .map(|(i, _)| i)
                .unwrap();
            assert_eq!(best, v as usize);
        }
    }

    #[test]
    fn test_energies_ignore_dc_offset() {
        let sample_rate = 48_000.0;
        let table = ToneTable::new(&ModemConfig::default());
        let clean = tone(600.0, 533, sample_rate, 0.1);
        let shifted: Vec<f32> = clean.iter().map(|s| s + 0.3).collect();

        let a = table.energies(&clean, sample_rate);
        let b = table.energies(&shifted, sample_rate);
        assert!((a[0] - b[0]).abs() / a[0] < 0.05);
    }
}
