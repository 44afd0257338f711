use crate::config::ModemConfig;
use crate::error::Result;
use crate::fft_correlation::fft_correlate_valid;
use std::f32::consts::PI;

/// Preamble chirp start frequency in Hz
pub const PREAMBLE_START_FREQ: f32 = 400.0;

/// Preamble chirp end frequency in Hz, lowered at low sample rates
pub const PREAMBLE_END_FREQ: f32 = 4000.0;

/// Minimum normalized correlation accepted as a preamble
pub const SYNC_THRESHOLD: f32 = 0.4;

/// Result of a preamble search
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct SyncPoint {
    /// Sample index where the preamble starts
    pub offset: usize,
    /// Normalized correlation at `offset` (0.0 to 1.0)
    pub correlation: f32,
}

/// Linear chirp sweeping `start_freq` -> `end_freq` over `duration_samples`
pub fn generate_chirp(
    duration_samples: usize,
    start_freq: f32,
    end_freq: f32,
    amplitude: f32,
    sample_rate: f32,
) -> Vec<f32> {
    if duration_samples == 0 {
        return Vec::new();
    }
    let duration = duration_samples as f32 / sample_rate;
    let k = (end_freq - start_freq) / duration;

    (0..duration_samples)
        .map(|n| {
            let t = n as f32 / sample_rate;
            let phase = 2.0 * PI * (start_freq * t + k * t * t / 2.0);
            amplitude * phase.sin()
        })
        .collect()
}

/// Linear fade applied over `ramp` samples at both ends of `samples`
pub fn apply_ramp(samples: &mut [f32], ramp: usize) {
    let len = samples.len();
    let ramp = ramp.min(len / 2);
    if ramp == 0 {
        return;
    }
    for i in 0..ramp {
        let gain = i as f32 / ramp as f32;
        samples[i] *= gain;
        samples[len - 1 - i] *= gain;
    }
}

/// The preamble for a configuration: an ascending chirp at the configured
/// amplitude and duration, ramped like a symbol
pub fn generate_preamble(config: &ModemConfig) -> Vec<f32> {
    let sample_rate = config.sample_rate as f32;
    let end_freq = PREAMBLE_END_FREQ.min(0.4 * sample_rate);
    let mut preamble = generate_chirp(
        config.preamble_samples(),
        PREAMBLE_START_FREQ,
        end_freq,
        config.amplitude,
        sample_rate,
    );
    apply_ramp(&mut preamble, config.ramp_samples());
    preamble
}

/// Find the best-matching position of `template` in `samples`
///
/// Uses FFT cross-correlation normalized by the energy of each window, so the
/// score is independent of the received level. Returns `None` when the best
/// score stays below [`SYNC_THRESHOLD`] or the capture is shorter than the template.
pub fn detect_preamble(samples: &[f32], template: &[f32]) -> Result<Option<SyncPoint>> {
    if template.is_empty() || samples.len() < template.len() {
        return Ok(None);
    }

    let raw = fft_correlate_valid(samples, template)?;

    let template_energy: f64 = template.iter().map(|&x| (x as f64) * (x as f64)).sum();

    // Prefix sums of squared samples give each window's energy in O(1)
    let mut sq_prefix = vec![0.0f64; samples.len() + 1];
    for (k, &s) in samples.iter().enumerate() {
        sq_prefix[k + 1] = sq_prefix[k] + (s as f64) * (s as f64);
    }

    let mut best = SyncPoint {
        offset: 0,
        correlation: 0.0,
    };

    for (i, &value) in raw.iter().enumerate() {
        let window_energy = (sq_prefix[i + template.len()] - sq_prefix[i]).max(0.0);
        let denom = (window_energy * template_energy).sqrt();
        if denom <= 1e-12 {
            continue;
        }
        let normalized = (value as f64 / denom).abs() as f32;
        if normalized > best.correlation {
            best = SyncPoint {
                offset: i,
                correlation: normalized,
            };
        }
    }

    log::debug!(
        "Preamble search: best correlation {:.3} at sample {}",
        best.correlation,
        best.offset
    );

    if best.correlation >= SYNC_THRESHOLD {
        Ok(Some(best))
    } else {
        Ok(None)
    }
}
