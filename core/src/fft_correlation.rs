//! FFT-based cross-correlation for 1D real-valued signals
//!
//! Only the fully-overlapping ("valid") lags are produced: output index `i`
//! is the dot product of `template` with `signal[i..i + template.len()]`.
//! Complexity is O(N log N) instead of the O(N * M) of a sliding window.

use crate::error::{ModemError, Result};
use realfft::RealFftPlanner;

/// Correlate `template` against every fully-overlapping window of `signal`.
///
/// Returns `signal.len() - template.len() + 1` values, or an empty vector if
/// either input is empty or the template is longer than the signal.
pub fn fft_correlate_valid(signal: &[f32], template: &[f32]) -> Result<Vec<f32>> {
    if signal.is_empty() || template.is_empty() || template.len() > signal.len() {
        return Ok(Vec::new());
    }

    let full_len = signal.len() + template.len() - 1;
    let fft_size = full_len.next_power_of_two();

    let mut padded_signal = vec![0.0f32; fft_size];
    let mut padded_template = vec![0.0f32; fft_size];
    padded_signal[..signal.len()].copy_from_slice(signal);

    // Time-reversed template: correlation becomes a convolution
    for (i, &val) in template.iter().rev().enumerate() {
        padded_template[i] = val;
    }

    let mut planner = RealFftPlanner::<f32>::new();
    let r2c = planner.plan_fft_forward(fft_size);
    let c2r = planner.plan_fft_inverse(fft_size);

    let mut signal_spectrum = r2c.make_output_vec();
    let mut template_spectrum = r2c.make_output_vec();

    r2c.process(&mut padded_signal, &mut signal_spectrum)
        .map_err(|e| ModemError::Fft(format!("forward transform of signal failed: {:?}", e)))?;
    r2c.process(&mut padded_template, &mut template_spectrum)
        .map_err(|e| ModemError::Fft(format!("forward transform of template failed: {:?}", e)))?;

    for (s, t) in signal_spectrum.iter_mut().zip(template_spectrum.iter()) {
        *s *= *t;
    }

    // DC and Nyquist bins of a real signal's spectrum are purely real
    if let Some(first) = signal_spectrum.first_mut() {
        first.im = 0.0;
    }
    if let Some(last) = signal_spectrum.last_mut() {
        last.im = 0.0;
    }

    let mut result = c2r.make_output_vec();
    c2r.process(&mut signal_spectrum, &mut result)
        .map_err(|e| ModemError::Fft(format!("inverse transform failed: {:?}", e)))?;

    let normalization = fft_size as f32;
    let start = template.len() - 1;
    let valid_len = signal.len() - template.len() + 1;

    Ok(result[start..start + valid_len]
        .iter()
        .map(|x| x / normalization)
        .collect())
}
