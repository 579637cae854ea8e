//! Per-chunk ten-stage DSP effect chain. Operates on mono `f32` PCM at the
//! synthesizer's native 24 kHz.
//!
//! Pitch shift is sinc resampling via `rubato`, which changes chunk duration
//! rather than preserving it like a phase vocoder would. Formant shift is an
//! STFT magnitude bin remap with phase preserved, via `rustfft`.

use rubato::{Resampler, SincFixedIn, SincInterpolationParameters, SincInterpolationType, WindowFunction};
use rustfft::{num_complex::Complex32, FftPlanner};

use crate::config::VoiceModConfig;

pub const SAMPLE_RATE: u32 = 24_000;

const STFT_WINDOW: usize = 1024;
const STFT_HOP: usize = 256;

/// Run the full ten-stage chain over one chunk's PCM.
pub fn apply_chain(input: &[f32], cfg: &VoiceModConfig) -> Vec<f32> {
    if !cfg.enabled || input.is_empty() {
        return input.to_vec();
    }

    let original = input.to_vec();
    let mut processed = pitch_shift(input, cfg.pitch_shift);
    processed = formant_shift(&processed, cfg.formant_shift);
    processed = reverb(&processed, cfg.reverb_amount);
    processed = echo(&processed, cfg.echo_delay);
    processed = soft_saturation(&processed, cfg.distortion);
    processed = three_band_eq(&processed, cfg.eq_bass, cfg.eq_mid, cfg.eq_treble);
    processed = compress(&processed, cfg.compression);
    let mixed = mix(&original, &processed, cfg.effect_blend);
    let gained = apply_gain(&mixed, cfg.output_volume);
    soft_clip(&gained)
}

/// Step 1: pitch shift in semitones via resampling (duration changes).
pub fn pitch_shift(input: &[f32], semitones: f32) -> Vec<f32> {
    if semitones == 0.0 || input.is_empty() {
        return input.to_vec();
    }
    let ratio = 2f64.powf(semitones as f64 / 12.0);
    resample_sinc(input, 1.0 / ratio).unwrap_or_else(|| {
        tracing::warn!("pitch_shift: rubato resampler failed, passing audio through unshifted");
        input.to_vec()
    })
}

/// Resample `input` by `resample_ratio` (output_len ≈ input_len * ratio)
/// via rubato's sinc interpolator. `None` on construction/processing failure
/// (e.g. a degenerate chunk size).
fn resample_sinc(input: &[f32], resample_ratio: f64) -> Option<Vec<f32>> {
    let params = SincInterpolationParameters {
        sinc_len: 128,
        f_cutoff: 0.95,
        interpolation: SincInterpolationType::Linear,
        oversampling_factor: 128,
        window: WindowFunction::BlackmanHarris2,
    };
    let mut resampler =
        SincFixedIn::<f32>::new(resample_ratio, 2.0, params, input.len(), 1).ok()?;
    let waves_in = vec![input.to_vec()];
    let waves_out = resampler.process(&waves_in, None).ok()?;
    waves_out.into_iter().next()
}

/// Step 2: formant shift via STFT magnitude bin remap, phase preserved.
pub fn formant_shift(input: &[f32], shift: f32) -> Vec<f32> {
    if shift == 0.0 || input.len() < STFT_WINDOW {
        return input.to_vec();
    }
    let shift_factor = 2f32.powf(shift / 12.0);
    let window = hann_window(STFT_WINDOW);

    let mut planner = FftPlanner::<f32>::new();
    let fft = planner.plan_fft_forward(STFT_WINDOW);
    let ifft = planner.plan_fft_inverse(STFT_WINDOW);

    let mut output = vec![0.0f32; input.len()];
    let mut norm = vec![0.0f32; input.len()];

    let mut pos = 0;
    while pos + STFT_WINDOW <= input.len() {
        let mut frame: Vec<Complex32> = input[pos..pos + STFT_WINDOW]
            .iter()
            .zip(window.iter())
            .map(|(&s, &w)| Complex32::new(s * w, 0.0))
            .collect();
        fft.process(&mut frame);

        let mags: Vec<f32> = frame.iter().map(|c| c.norm()).collect();
        let phases: Vec<f32> = frame.iter().map(|c| c.arg()).collect();
        let n = frame.len();

        let mut remapped = vec![Complex32::new(0.0, 0.0); n];
        for (bin, slot) in remapped.iter_mut().enumerate().take(n / 2 + 1) {
            let src_bin = (bin as f32 / shift_factor).round() as usize;
            let mag = mags.get(src_bin).copied().unwrap_or(0.0);
            let phase = phases[bin];
            *slot = Complex32::from_polar(mag, phase);
            if bin != 0 && bin != n / 2 {
                remapped[n - bin] = slot.conj();
            }
        }

        ifft.process(&mut remapped);
        let scale = 1.0 / n as f32;
        for (i, c) in remapped.iter().enumerate() {
            output[pos + i] += c.re * scale * window[i];
            norm[pos + i] += window[i] * window[i];
        }
        pos += STFT_HOP;
    }

    for (sample, n) in output.iter_mut().zip(norm.iter()) {
        if *n > 1e-6 {
            *sample /= n;
        }
    }
    output
}

fn hann_window(len: usize) -> Vec<f32> {
    (0..len)
        .map(|i| 0.5 - 0.5 * (2.0 * std::f32::consts::PI * i as f32 / (len - 1) as f32).cos())
        .collect()
}

/// Step 3: four parallel delay taps at 30/70/110/150 ms.
pub fn reverb(input: &[f32], amount: f32) -> Vec<f32> {
    if amount <= 0.0 {
        return input.to_vec();
    }
    const TAPS_MS: [f32; 4] = [30.0, 70.0, 110.0, 150.0];
    let mut out = input.to_vec();
    for (k, &tap_ms) in TAPS_MS.iter().enumerate() {
        let delay_samples = ms_to_samples(tap_ms);
        let gain = 0.6 * amount * 0.7f32.powi(k as i32);
        add_delayed(&mut out, input, delay_samples, gain);
    }
    out
}

/// Step 4: one tap at `0.2 * delay * 200ms`, gain `0.5 * delay`.
pub fn echo(input: &[f32], delay: f32) -> Vec<f32> {
    if delay <= 0.0 {
        return input.to_vec();
    }
    let delay_ms = 0.2 * delay * 200.0;
    let gain = 0.5 * delay;
    let mut out = input.to_vec();
    add_delayed(&mut out, input, ms_to_samples(delay_ms), gain);
    out
}

fn ms_to_samples(ms: f32) -> usize {
    ((ms / 1000.0) * SAMPLE_RATE as f32).round().max(0.0) as usize
}

fn add_delayed(out: &mut [f32], input: &[f32], delay_samples: usize, gain: f32) {
    for (i, &s) in input.iter().enumerate() {
        let j = i + delay_samples;
        if j < out.len() {
            out[j] += s * gain;
        }
    }
}

/// Step 5: `y = tanh(d*x)/d`, `d = 1 + 10*amount`, mixed back by `amount`.
pub fn soft_saturation(input: &[f32], amount: f32) -> Vec<f32> {
    if amount <= 0.0 {
        return input.to_vec();
    }
    let d = 1.0 + 10.0 * amount;
    input
        .iter()
        .map(|&x| {
            let y = (d * x).tanh() / d;
            x * (1.0 - amount) + y * amount
        })
        .collect()
}

/// Step 6: three-band EQ (bass 80-250 Hz, mid 250-4000 Hz, treble 4kHz+),
/// summed with per-band weights. Implemented as one-pole low/band/high-pass
/// filters (a standard lightweight stand-in for a true Butterworth design).
pub fn three_band_eq(input: &[f32], bass: f32, mid: f32, treble: f32) -> Vec<f32> {
    let low = low_pass(input, 250.0);
    let high = high_pass(input, 4000.0);
    let band: Vec<f32> = high_pass(&low_pass(input, 4000.0), 250.0);

    (0..input.len())
        .map(|i| low[i] * bass + band[i] * mid + high[i] * treble)
        .collect()
}

fn low_pass(input: &[f32], cutoff_hz: f32) -> Vec<f32> {
    let rc = 1.0 / (2.0 * std::f32::consts::PI * cutoff_hz);
    let dt = 1.0 / SAMPLE_RATE as f32;
    let alpha = dt / (rc + dt);
    let mut out = Vec::with_capacity(input.len());
    let mut prev = 0.0f32;
    for &x in input {
        prev += alpha * (x - prev);
        out.push(prev);
    }
    out
}

fn high_pass(input: &[f32], cutoff_hz: f32) -> Vec<f32> {
    let rc = 1.0 / (2.0 * std::f32::consts::PI * cutoff_hz);
    let dt = 1.0 / SAMPLE_RATE as f32;
    let alpha = rc / (rc + dt);
    let mut out = Vec::with_capacity(input.len());
    let mut prev_in = 0.0f32;
    let mut prev_out = 0.0f32;
    for &x in input {
        let y = alpha * (prev_out + x - prev_in);
        out.push(y);
        prev_in = x;
        prev_out = y;
    }
    out
}

/// Step 7: soft-knee compression. `threshold = 0.5(1-a)`, `ratio = 2+8a`,
/// makeup gain `1 + 0.5a`.
pub fn compress(input: &[f32], amount: f32) -> Vec<f32> {
    if amount <= 0.0 {
        return input.to_vec();
    }
    let threshold = 0.5 * (1.0 - amount);
    let ratio = 2.0 + 8.0 * amount;
    let makeup = 1.0 + 0.5 * amount;
    input
        .iter()
        .map(|&x| {
            let sign = x.signum();
            let mag = x.abs();
            let compressed = if mag > threshold {
                threshold + (mag - threshold) / ratio
            } else {
                mag
            };
            sign * compressed * makeup
        })
        .collect()
}

/// Step 8: `out = original*(1-blend) + processed*blend`.
pub fn mix(original: &[f32], processed: &[f32], blend: f32) -> Vec<f32> {
    let len = original.len().max(processed.len());
    (0..len)
        .map(|i| {
            let o = original.get(i).copied().unwrap_or(0.0);
            let p = processed.get(i).copied().unwrap_or(0.0);
            o * (1.0 - blend) + p * blend
        })
        .collect()
}

/// Step 9: `10^(dB/20)`.
pub fn apply_gain(input: &[f32], db: f32) -> Vec<f32> {
    let gain = 10f32.powf(db / 20.0);
    input.iter().map(|&x| x * gain).collect()
}

/// Step 10: `tanh(0.9*x)*0.95` to prevent overs.
pub fn soft_clip(input: &[f32]) -> Vec<f32> {
    input.iter().map(|&x| (0.9 * x).tanh() * 0.95).collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn pitch_shift_zero_is_identity() {
        let input = vec![0.1, 0.2, -0.3, 0.4];
        assert_eq!(pitch_shift(&input, 0.0), input);
    }

    #[test]
    fn pitch_shift_up_shortens_chunk() {
        let input: Vec<f32> = (0..1000).map(|i| (i as f32 * 0.01).sin()).collect();
        let out = pitch_shift(&input, 12.0);
        assert!(out.len() < input.len());
    }

    #[test]
    fn soft_clip_stays_bounded() {
        let input = vec![10.0, -10.0, 0.0];
        let out = soft_clip(&input);
        assert!(out.iter().all(|v| v.abs() <= 0.95));
    }

    #[test]
    fn compress_reduces_peaks_above_threshold() {
        let input = vec![0.9, -0.9, 0.1];
        let out = compress(&input, 0.8);
        assert!(out[0].abs() < input[0].abs() * 2.0);
    }

    #[test]
    fn full_chain_never_panics_on_silence() {
        let cfg = VoiceModConfig { enabled: true, ..VoiceModConfig::default() };
        let out = apply_chain(&vec![0.0; 2048], &cfg);
        assert_eq!(out.len(), 2048);
    }

    #[test]
    fn disabled_chain_is_identity() {
        let cfg = VoiceModConfig::default();
        let input = vec![0.1, 0.2, 0.3];
        assert_eq!(apply_chain(&input, &cfg), input);
    }
}
