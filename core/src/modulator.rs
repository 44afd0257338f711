//! Symbols -> samples
//!
//! Output layout: preamble, then one window of `samples_per_symbol` per
//! symbol, with `gap_samples` of silence between symbols in sparse mode.

use crate::config::{MixProfile, ModemConfig};
use crate::fsk::ToneTable;
use crate::symbol_coder::Symbol;
use crate::sync::generate_preamble;
use std::f32::consts::PI;

/// Strategy for placing rendered symbols into the output buffer
pub trait SymbolMixer {
    /// Append `len` samples of the given tones (`(frequency, amplitude)` pairs)
    /// to `out`. `start` is the absolute index of the first sample in the
    /// output stream.
    fn mix(&self, tones: &[(f32, f32)], start: usize, len: usize, sample_rate: f32, out: &mut Vec<f32>);
}

/// Oscillators run continuously: phase comes from the absolute sample index
#[derive(Debug, Clone, Copy, Default)]
pub struct StreamingMixer;

/// Every symbol rendered on its own with the phase reset to zero
#[derive(Debug, Clone, Copy, Default)]
pub struct BlockMixer;

impl SymbolMixer for StreamingMixer {
    fn mix(&self, tones: &[(f32, f32)], start: usize, len: usize, sample_rate: f32, out: &mut Vec<f32>) {
        out.extend((0..len).map(|n| {
            // f64 keeps the phase accurate deep into long transmissions
            let t = (start + n) as f64 / sample_rate as f64;
            tones
                .iter()
                .map(|&(freq, amp)| amp * (2.0 * std::f64::consts::PI * freq as f64 * t).sin() as f32)
                .sum::<f32>()
        }));
    }
}

impl SymbolMixer for BlockMixer {
    fn mix(&self, tones: &[(f32, f32)], _start: usize, len: usize, sample_rate: f32, out: &mut Vec<f32>) {
        let mut block = vec![0.0f32; len];
        for &(freq, amp) in tones {
            let omega = 2.0 * PI * freq / sample_rate;
            for (n, sample) in block.iter_mut().enumerate() {
                *sample += amp * (omega * n as f32).sin();
            }
        }
        out.extend_from_slice(&block);
    }
}

pub fn mixer_for(profile: MixProfile) -> Box<dyn SymbolMixer + Send + Sync> {
    match profile {
        MixProfile::Streaming => Box::new(StreamingMixer),
        MixProfile::Block => Box::new(BlockMixer),
    }
}

/// Symbol envelope: linear fade over `ramp` samples at both ends
pub fn ramp_gain(n: usize, len: usize, ramp: usize) -> f32 {
    if ramp == 0 {
        return 1.0;
    }
    let rise = n as f32 / ramp as f32;
    let fall = (len.saturating_sub(1 + n)) as f32 / ramp as f32;
    rise.min(fall).min(1.0)
}

pub struct Modulator {
    config: ModemConfig,
    tones: ToneTable,
    mixer: Box<dyn SymbolMixer + Send + Sync>,
}

impl Modulator {
    /// `config` is expected to be validated already
    pub fn new(config: &ModemConfig) -> Self {
        Self {
            config: config.clone(),
            tones: ToneTable::new(config),
            mixer: mixer_for(config.mix_profile),
        }
    }

    pub fn tones(&self) -> &ToneTable {
        &self.tones
    }

    /// Exact length of the waveform for `symbol_count` symbols
    pub fn total_samples(&self, symbol_count: usize) -> usize {
        self.config.preamble_samples()
            + symbol_count * self.config.samples_per_symbol()
            + symbol_count.saturating_sub(1) * self.config.gap_samples()
    }

    pub fn modulate(&self, symbols: &[Symbol]) -> Vec<f32> {
        let total = self.total_samples(symbols.len());
        let mut samples = Vec::with_capacity(total);
        samples.extend(generate_preamble(&self.config));

        let gap = self.config.gap_samples();
        for (i, &symbol) in symbols.iter().enumerate() {
            if i > 0 && gap > 0 {
                samples.resize(samples.len() + gap, 0.0);
            }
            let start = samples.len();
            self.render_at(symbol, start, &mut samples);
        }

        let limit = self.config.amplitude;
        for sample in samples.iter_mut() {
            *sample = sample.clamp(-limit, limit);
        }

        debug_assert_eq!(samples.len(), total);
        log::debug!(
            "Modulated {} symbols ({} profile) into {} samples",
            symbols.len(),
            self.config.mix_profile,
            samples.len()
        );

        samples
    }

    /// One isolated symbol window, phase starting at zero
    pub fn reference_symbol(&self, symbol: Symbol) -> Vec<f32> {
        let mut out = Vec::with_capacity(self.config.samples_per_symbol());
        // Streaming phase at index 0 matches a block render
        self.render_at(symbol, 0, &mut out);
        out
    }

    fn render_at(&self, symbol: Symbol, start: usize, out: &mut Vec<f32>) {
        let len = self.config.samples_per_symbol();
        let amp = self.config.amplitude * self.tones.tone_gain();
        let tones: Vec<(f32, f32)> = self
            .tones
            .active_tones(symbol)
            .into_iter()
            .map(|i| (self.tones.frequencies()[i], amp))
            .collect();

        let begin = out.len();
        self.mixer
            .mix(&tones, start, len, self.config.sample_rate as f32, out);

        let ramp = self.config.ramp_samples();
        for (n, sample) in out[begin..].iter_mut().enumerate() {
            *sample *= ramp_gain(n, len, ramp);
        }
    }
}
