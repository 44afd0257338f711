//! Samples -> frame payload
//!
//! Decoding is an explicit state machine:
//!
//! ```text
//! Searching -> Synced -> Collecting -> Validating -> Done
//!     \          \           \             \
//!      `----------`-----------`-------------`--> Failed
//! ```
//!
//! The waveform does not announce its own length, so `Validating` recovers the
//! symbol count from the frame header: every interleaver grid height that fits
//! the collected windows is tried, and only a grid whose decoded length field
//! asks for exactly that many rows is checked against the CRC.

use crate::config::{Mode, ModemConfig};
use crate::error::{ModemError, Result};
use crate::framing::{frame_len, FrameDecoder};
use crate::fsk::{ToneTable, SPARSE_DATA_TONE, SPARSE_GUARD_TONE};
use crate::modulator::Modulator;
use crate::symbol_coder::{Symbol, SymbolCoder};
use crate::sync::{detect_preamble, generate_preamble};
use crate::FRAME_HEADER_SIZE;

/// A dense window is an erasure unless its best score beats the median by this factor
const DENSE_NOISE_FLOOR_RATIO: f32 = 2.0;

/// Fraction of the expected on-energy a sparse tone must clear to read as 1
const SPARSE_THRESHOLD_FRACTION: f32 = 0.25;

#[derive(Debug)]
pub enum DemodState {
    /// Looking for the preamble
    Searching,
    /// Preamble located; `data_start` is the first sample of symbol 0
    Synced { preamble_start: usize, data_start: usize },
    /// Reading symbol windows with the estimated channel gain
    Collecting { data_start: usize, gain: f32 },
    /// Resolving the frame from the collected windows (`None` = erasure)
    Validating { captured: Vec<Option<Symbol>> },
    Done(Vec<u8>),
    Failed(ModemError),
}

pub struct Demodulator {
    config: ModemConfig,
    tones: ToneTable,
    coder: SymbolCoder,
    preamble: Vec<f32>,
    /// Energy of a clean sparse "1" on the data tone at unit channel gain
    reference_on_energy: f32,
}

impl Demodulator {
    /// `config` is expected to be validated already
    pub fn new(config: &ModemConfig) -> Self {
        let tones = ToneTable::new(config);
        let reference_on_energy = match config.mode {
            Mode::Sparse => {
                let reference = Modulator::new(config).reference_symbol(1);
                tones.energies(&reference, config.sample_rate as f32)[SPARSE_DATA_TONE]
            }
            Mode::Dense => 0.0,
        };

        Self {
            config: config.clone(),
            tones,
            coder: SymbolCoder::from_config(config),
            preamble: generate_preamble(config),
            reference_on_energy,
        }
    }

    /// Run the state machine to completion
    pub fn demodulate(&self, samples: &[f32]) -> Result<Vec<u8>> {
        let mut state = DemodState::Searching;
        loop {
            state = match self.step(state, samples) {
                DemodState::Done(payload) => return Ok(payload),
                DemodState::Failed(err) => return Err(err),
                next => next,
            };
        }
    }

    /// Advance one state
    pub fn step(&self, state: DemodState, samples: &[f32]) -> DemodState {
        match state {
            DemodState::Searching => self.search(samples),
            DemodState::Synced {
                preamble_start,
                data_start,
            } => DemodState::Collecting {
                data_start,
                gain: self.estimate_gain(&samples[preamble_start..data_start]),
            },
            DemodState::Collecting { data_start, gain } => DemodState::Validating {
                captured: self.collect_symbols(&samples[data_start..], gain),
            },
            DemodState::Validating { captured } => self.validate(&captured),
            terminal => terminal,
        }
    }

    fn search(&self, samples: &[f32]) -> DemodState {
        let sps = self.config.samples_per_symbol();

        if self.preamble.is_empty() {
            if samples.len() < sps {
                return DemodState::Failed(ModemError::SyncNotFound);
            }
            return DemodState::Synced {
                preamble_start: 0,
                data_start: 0,
            };
        }

        let sync = match detect_preamble(samples, &self.preamble) {
            Ok(Some(sync)) => sync,
            Ok(None) => return DemodState::Failed(ModemError::SyncNotFound),
            Err(e) => return DemodState::Failed(e),
        };

        let data_start = sync.offset + self.preamble.len();
        if samples.len() < data_start + sps {
            log::warn!(
                "Preamble at sample {} leaves no room for a symbol window",
                sync.offset
            );
            return DemodState::Failed(ModemError::SyncNotFound);
        }

        log::info!(
            "Preamble found at sample {} (correlation {:.3})",
            sync.offset,
            sync.correlation
        );

        DemodState::Synced {
            preamble_start: sync.offset,
            data_start,
        }
    }

    /// Received level relative to the synthesized preamble
    pub fn estimate_gain(&self, captured_preamble: &[f32]) -> f32 {
        let template: f32 = self.preamble.iter().map(|x| x * x).sum();
        if template <= f32::EPSILON || captured_preamble.len() != self.preamble.len() {
            return 1.0;
        }
        let received: f32 = captured_preamble.iter().map(|x| x * x).sum();
        (received / template).sqrt()
    }

    /// Detect every complete symbol window in `data`
    pub fn collect_symbols(&self, data: &[f32], gain: f32) -> Vec<Option<Symbol>> {
        let sps = self.config.samples_per_symbol();
        let stride = self.config.symbol_stride();
        if data.len() < sps {
            return Vec::new();
        }

        let windows = (data.len() - sps) / stride + 1;
        let captured: Vec<Option<Symbol>> = (0..windows)
            .map(|i| {
                let start = i * stride;
                self.detect_symbol(&data[start..start + sps], gain)
            })
            .collect();

        log::debug!(
            "Collected {} symbol windows ({} erasures)",
            captured.len(),
            captured.iter().filter(|s| s.is_none()).count()
        );

        captured
    }

    /// Hard decision for one window, `None` when nothing clears the noise floor
    pub fn detect_symbol(&self, window: &[f32], gain: f32) -> Option<Symbol> {
        let energies = self.tones.energies(window, self.config.sample_rate as f32);

        match self.config.mode {
            Mode::Dense => {
                let scores = self.tones.dense_scores(&energies);
                let (best, best_score) = scores.iter().enumerate().fold(
                    (0, f32::MIN),
                    |acc, (i, &s)| if s > acc.1 { (i, s) } else { acc },
                );
                if best_score <= DENSE_NOISE_FLOOR_RATIO * median(&scores) {
                    return None;
                }
                Some(best as Symbol)
            }
            Mode::Sparse => {
                let threshold = self.reference_on_energy * gain * gain * SPARSE_THRESHOLD_FRACTION;
                let excess = energies[SPARSE_DATA_TONE] - energies[SPARSE_GUARD_TONE];
                Some(if excess > threshold { 1 } else { 0 })
            }
        }
    }

    fn validate(&self, captured: &[Option<Symbol>]) -> DemodState {
        let per_row = self.coder.symbols_per_row();
        let max_rows = captured.len() / per_row;
        let mut mismatch = None;

        for rows in 1..=max_rows {
            let header = match self.coder.peek_bytes(captured, rows, FRAME_HEADER_SIZE) {
                Some(header) => header,
                None => continue,
            };
            let declared = match FrameDecoder::declared_len(&header) {
                Ok(len) => len,
                Err(_) => continue,
            };
            if self.coder.rows_for(frame_len(declared)) != rows {
                continue;
            }

            let bytes = match self.coder.decode(&captured[..rows * per_row]) {
                Ok(bytes) => bytes,
                Err(e) => return DemodState::Failed(e),
            };

            match FrameDecoder::parse(&bytes) {
                Ok(frame) => {
                    log::info!(
                        "Frame verified: {} payload bytes in {} grid rows",
                        frame.payload_len,
                        rows
                    );
                    return DemodState::Done(frame.payload);
                }
                Err(e) => {
                    log::warn!("Rejected {}-row candidate declaring {} bytes: {}", rows, declared, e);
                    if mismatch.is_none() {
                        mismatch = Some(e);
                    }
                }
            }
        }

        DemodState::Failed(mismatch.unwrap_or_else(|| {
            ModemError::Desync(format!(
                "no frame header consistent with {} collected symbols",
                captured.len()
            ))
        }))
    }
}

fn median(values: &[f32]) -> f32 {
    if values.is_empty() {
        return 0.0;
    }
    let mut sorted = values.to_vec();
    sorted.sort_by(|a, b| a.total_cmp(b));
    let mid = sorted.len() / 2;
    if sorted.len() % 2 == 0 {
        (sorted[mid - 1] + sorted[mid]) / 2.0
    } else {
        sorted[mid]
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::framing::FrameEncoder;

    fn transmit(payload: &[u8], config: &ModemConfig) -> Vec<f32> {
        let frame = FrameEncoder::build(payload);
        let symbols = SymbolCoder::from_config(config).encode(&frame);
        Modulator::new(config).modulate(&symbols)
    }

    fn short_preamble() -> ModemConfig {
        ModemConfig {
            preamble_s: 0.2,
            ..ModemConfig::default()
        }
    }

    #[test]
    fn test_state_sequence() {
        let config = short_preamble();
        let samples = transmit(b"states", &config);
        let demod = Demodulator::new(&config);

        let state = demod.step(DemodState::Searching, &samples);
        match state {
            DemodState::Synced {
                preamble_start,
                data_start,
            } => {
                assert_eq!(preamble_start, 0);
                assert_eq!(data_start, config.preamble_samples());
            }
            ref other => panic!("Expected Synced, got {:?}", other),
        }

        let state = demod.step(state, &samples);
        match state {
            DemodState::Collecting { gain, .. } => assert!((gain - 1.0).abs() < 0.01),
            ref other => panic!("Expected Collecting, got {:?}", other),
        }

        let state = demod.step(state, &samples);
        let expected_symbols = SymbolCoder::from_config(&config).transmitted_len(frame_len(6));
        match state {
            DemodState::Validating { ref captured } => {
                assert_eq!(captured.len(), expected_symbols);
                assert!(captured.iter().all(|s| s.is_some()));
            }
            ref other => panic!("Expected Validating, got {:?}", other),
        }

        match demod.step(state, &samples) {
            DemodState::Done(payload) => assert_eq!(payload, b"states"),
            other => panic!("Expected Done, got {:?}", other),
        }
    }

    #[test]
    fn test_silence_never_syncs() {
        let config = short_preamble();
        let demod = Demodulator::new(&config);
        assert!(matches!(
            demod.demodulate(&vec![0.0; 50_000]),
            Err(ModemError::SyncNotFound)
        ));
    }

    #[test]
    fn test_preamble_without_data_is_sync_failure() {
        let config = short_preamble();
        let demod = Demodulator::new(&config);
        let preamble = generate_preamble(&config);
        assert!(matches!(
            demod.demodulate(&preamble),
            Err(ModemError::SyncNotFound)
        ));
    }

    #[test]
    fn test_trailing_silence_tolerated() {
        let config = short_preamble();
        let mut samples = transmit(b"trailing", &config);
        samples.extend(vec![0.0; 20 * config.samples_per_symbol()]);
        assert_eq!(Demodulator::new(&config).demodulate(&samples).unwrap(), b"trailing");
    }

    #[test]
    fn test_gain_tracks_received_level() {
        let config = short_preamble();
        let samples: Vec<f32> = transmit(b"quiet", &config).iter().map(|s| s * 0.25).collect();
        let demod = Demodulator::new(&config);
        let gain = demod.estimate_gain(&samples[..config.preamble_samples()]);
        assert!((gain - 0.25).abs() < 0.01, "gain = {}", gain);
        assert_eq!(demod.demodulate(&samples).unwrap(), b"quiet");
    }

    #[test]
    fn test_no_preamble_starts_at_zero() {
        let config = ModemConfig {
            preamble_s: 0.0,
            ..ModemConfig::default()
        };
        let samples = transmit(b"no preamble", &config);
        let demod = Demodulator::new(&config);
        assert_eq!(demod.estimate_gain(&[]), 1.0);
        assert_eq!(demod.demodulate(&samples).unwrap(), b"no preamble");
        assert!(matches!(
            demod.demodulate(&samples[..10]),
            Err(ModemError::SyncNotFound)
        ));
    }

    #[test]
    fn test_sparse_windows_read_bits() {
        let config = ModemConfig {
            mode: Mode::Sparse,
            gap_ms: 5.0,
            ..short_preamble()
        };
        let demod = Demodulator::new(&config);
        let modulator = Modulator::new(&config);
        assert_eq!(demod.detect_symbol(&modulator.reference_symbol(1), 1.0), Some(1));
        assert_eq!(demod.detect_symbol(&modulator.reference_symbol(0), 1.0), Some(0));
    }

    #[test]
    fn test_dense_silence_is_erasure() {
        let demod = Demodulator::new(&ModemConfig::default());
        assert_eq!(demod.detect_symbol(&[0.0; 533], 1.0), None);
    }

    #[test]
    fn test_too_few_symbols_is_desync() {
        // One grid row of 4 nibbles cannot hold an 8-byte header
        let demod = Demodulator::new(&ModemConfig::default());
        let captured = vec![Some(3); 8];
        match demod.step(DemodState::Validating { captured }, &[]) {
            DemodState::Failed(ModemError::Desync(_)) => {}
            other => panic!("Expected Desync, got {:?}", other),
        }
    }

    #[test]
    fn test_silent_capture_fails_checksum() {
        // Erasures vote to zero: the header declares an empty payload whose
        // all-zero checksum can never match
        let demod = Demodulator::new(&ModemConfig::default());
        let captured = vec![None; 64];
        match demod.step(DemodState::Validating { captured }, &[]) {
            DemodState::Failed(ModemError::ChecksumMismatch { expected: 0, .. }) => {}
            other => panic!("Expected ChecksumMismatch, got {:?}", other),
        }
    }

    #[test]
    fn test_corrupted_payload_is_checksum_mismatch() {
        let config = ModemConfig {
            interleave_depth: 1,
            repeats: 1,
            ..ModemConfig::default()
        };
        let coder = SymbolCoder::from_config(&config);
        let frame = FrameEncoder::build(b"checksum");
        let mut captured: Vec<Option<Symbol>> = coder.encode(&frame).into_iter().map(Some).collect();
        // Flip the last payload nibble; header stays intact
        let last = captured.len() - 1;
        captured[last] = captured[last].map(|s| s ^ 0x1);

        let demod = Demodulator::new(&config);
        match demod.step(DemodState::Validating { captured }, &[]) {
            DemodState::Failed(ModemError::ChecksumMismatch { .. }) => {}
            other => panic!("Expected ChecksumMismatch, got {:?}", other),
        }
    }

    #[test]
    fn test_median() {
        assert_eq!(median(&[3.0, 1.0, 2.0]), 2.0);
        assert_eq!(median(&[4.0, 1.0, 3.0, 2.0]), 2.5);
        assert_eq!(median(&[]), 0.0);
    }
}
