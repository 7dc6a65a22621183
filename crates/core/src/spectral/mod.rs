//! Short-time Fourier machinery backing the time-stretch and pitch-shift
//! augmentations.

use std::{
    f32::consts::PI,
    fmt,
    sync::Arc,
};

use realfft::{num_complex::Complex32, ComplexToReal, RealFftPlanner, RealToComplex};

use crate::{audio::resample_to_len, BeatSynthError, Result};

const DEFAULT_FFT_SIZE: usize = 2048;
const DEFAULT_HOP_DIVISOR: usize = 4;

/// Phase vocoder working on fixed-size Hann windows. Plans and scratch space
/// are built once and reused for every frame.
pub struct PhaseVocoder {
    size: usize,
    hop: usize,
    window: Vec<f32>,
    forward: Arc<dyn RealToComplex<f32>>,
    inverse: Arc<dyn ComplexToReal<f32>>,
    time_buf: Vec<f32>,
    spectrum: Vec<Complex32>,
    scratch_fwd: Vec<Complex32>,
    scratch_inv: Vec<Complex32>,
}

impl PhaseVocoder {
    pub fn new() -> Self {
        Self::with_size(DEFAULT_FFT_SIZE)
    }

    /// Builds a vocoder with a frame of `size` samples and a hop of a quarter
    /// frame.
    pub fn with_size(size: usize) -> Self {
        let size = size.max(DEFAULT_HOP_DIVISOR);
        let mut planner = RealFftPlanner::<f32>::new();
        let forward = planner.plan_fft_forward(size);
        let inverse = planner.plan_fft_inverse(size);
        Self {
            size,
            hop: size / DEFAULT_HOP_DIVISOR,
            window: (0..size).map(|i| periodic_hann(i, size)).collect(),
            time_buf: forward.make_input_vec(),
            spectrum: forward.make_output_vec(),
            scratch_fwd: forward.make_scratch_vec(),
            scratch_inv: inverse.make_scratch_vec(),
            forward,
            inverse,
        }
    }

    pub fn size(&self) -> usize {
        self.size
    }

    pub fn hop(&self) -> usize {
        self.hop
    }

    /// Changes playback speed by `rate` without changing pitch. `rate > 1`
    /// shortens the signal; the result has `round(len / rate)` samples.
    pub fn time_stretch(&mut self, input: &[f32], rate: f32) -> Result<Vec<f32>> {
        if !rate.is_finite() || rate <= 0.0 {
            return Err(BeatSynthError::invalid_config(format!(
                "time stretch rate must be positive, got {rate}"
            )));
        }

        let target_len = (input.len() as f64 / rate as f64).round() as usize;
        if input.is_empty() || target_len == 0 {
            return Ok(vec![0.0; target_len]);
        }

        let frames = self.stft(input)?;
        let stretched = self.stretch_frames(&frames, rate);
        self.istft(&stretched, target_len)
    }

    /// Shifts pitch by `semitones` while keeping the length of `input`.
    pub fn pitch_shift(&mut self, input: &[f32], semitones: f32) -> Result<Vec<f32>> {
        let rate = 2.0_f32.powf(-semitones / 12.0);
        let stretched = self.time_stretch(input, rate)?;
        Ok(resample_to_len(&stretched, input.len()))
    }

    /// Centred STFT: the signal is zero padded by half a frame on both ends.
    fn stft(&mut self, input: &[f32]) -> Result<Vec<Vec<Complex32>>> {
        let pad = self.size / 2;
        let mut padded = vec![0.0; input.len() + 2 * pad];
        padded[pad..pad + input.len()].copy_from_slice(input);

        let frame_count = 1 + padded.len().saturating_sub(self.size).div_ceil(self.hop);
        let mut frames = Vec::with_capacity(frame_count);

        for frame in 0..frame_count {
            let start = frame * self.hop;
            for (i, slot) in self.time_buf.iter_mut().enumerate() {
                *slot = padded.get(start + i).copied().unwrap_or(0.0) * self.window[i];
            }
            self.forward.process_with_scratch(
                &mut self.time_buf,
                &mut self.spectrum,
                &mut self.scratch_fwd,
            )?;
            frames.push(self.spectrum.clone());
        }

        Ok(frames)
    }

    /// Resamples the frame sequence at `rate`, interpolating magnitudes and
    /// accumulating phase so partials stay coherent.
    fn stretch_frames(&self, frames: &[Vec<Complex32>], rate: f32) -> Vec<Vec<Complex32>> {
        let bins = frames[0].len();
        let phase_advance: Vec<f32> = (0..bins)
            .map(|k| 2.0 * PI * self.hop as f32 * k as f32 / self.size as f32)
            .collect();
        let silent = vec![Complex32::new(0.0, 0.0); bins];

        let mut phase: Vec<f32> = frames[0].iter().map(|bin| bin.arg()).collect();
        let mut output = Vec::new();
        let mut step = 0.0_f64;

        while (step as usize) < frames.len() {
            let left_index = step as usize;
            let left = &frames[left_index];
            let right = frames.get(left_index + 1).unwrap_or(&silent);
            let alpha = (step - left_index as f64) as f32;

            let mut frame = Vec::with_capacity(bins);
            for k in 0..bins {
                let magnitude = (1.0 - alpha) * left[k].norm() + alpha * right[k].norm();
                frame.push(Complex32::from_polar(magnitude, phase[k]));

                let delta = right[k].arg() - left[k].arg() - phase_advance[k];
                let wrapped = delta - 2.0 * PI * (delta / (2.0 * PI)).round();
                phase[k] += phase_advance[k] + wrapped;
            }
            output.push(frame);
            step += rate as f64;
        }

        output
    }

    /// Weighted overlap-add back to `len` samples.
    fn istft(&mut self, frames: &[Vec<Complex32>], len: usize) -> Result<Vec<f32>> {
        let pad = self.size / 2;
        let total = (frames.len().saturating_sub(1)) * self.hop + self.size;
        let mut output = vec![0.0_f32; total.max(len + pad)];
        let mut weights = vec![0.0_f32; output.len()];
        let scale = 1.0 / self.size as f32;

        for (index, frame) in frames.iter().enumerate() {
            self.spectrum.copy_from_slice(frame);
            // A real signal has purely real DC and Nyquist bins.
            if let Some(first) = self.spectrum.first_mut() {
                first.im = 0.0;
            }
            if self.size % 2 == 0 {
                if let Some(last) = self.spectrum.last_mut() {
                    last.im = 0.0;
                }
            }
            self.inverse.process_with_scratch(
                &mut self.spectrum,
                &mut self.time_buf,
                &mut self.scratch_inv,
            )?;

            let start = index * self.hop;
            for i in 0..self.size {
                output[start + i] += self.time_buf[i] * scale * self.window[i];
                weights[start + i] += self.window[i] * self.window[i];
            }
        }

        Ok(output
            .iter()
            .zip(weights.iter())
            .skip(pad)
            .take(len)
            .map(|(sample, weight)| {
                if *weight > 1e-6 {
                    sample / weight
                } else {
                    *sample
                }
            })
            .chain(std::iter::repeat(0.0))
            .take(len)
            .collect())
    }
}

impl Default for PhaseVocoder {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Debug for PhaseVocoder {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("PhaseVocoder")
            .field("size", &self.size)
            .field("hop", &self.hop)
            .finish()
    }
}

fn periodic_hann(index: usize, len: usize) -> f32 {
    if len <= 1 {
        return 1.0;
    }

    0.5 - 0.5 * ((2.0 * PI * index as f32) / len as f32).cos()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sine(freq: f32, rate: f32, len: usize) -> Vec<f32> {
        (0..len)
            .map(|i| (2.0 * PI * freq * i as f32 / rate).sin() * 0.5)
            .collect()
    }

    fn zero_crossings(signal: &[f32]) -> usize {
        signal
            .windows(2)
            .filter(|w| (w[0] < 0.0) != (w[1] < 0.0))
            .count()
    }

    #[test]
    fn stretch_changes_length() {
        let mut vocoder = PhaseVocoder::with_size(512);
        let input = sine(440.0, 8_000.0, 8_000);

        assert_eq!(vocoder.time_stretch(&input, 2.0).unwrap().len(), 4_000);
        assert_eq!(vocoder.time_stretch(&input, 0.5).unwrap().len(), 16_000);
    }

    #[test]
    fn unit_rate_reconstructs_signal() {
        let mut vocoder = PhaseVocoder::with_size(256);
        let input = sine(200.0, 8_000.0, 2_000);
        let output = vocoder.time_stretch(&input, 1.0).unwrap();

        let error: f32 = input[256..1_744]
            .iter()
            .zip(&output[256..1_744])
            .map(|(a, b)| (a - b).abs())
            .fold(0.0, f32::max);
        assert!(error < 1e-2, "max reconstruction error {error}");
    }

    #[test]
    fn stretch_preserves_pitch() {
        let mut vocoder = PhaseVocoder::with_size(512);
        let input = sine(500.0, 8_000.0, 8_000);
        let output = vocoder.time_stretch(&input, 2.0).unwrap();

        let per_sample_in = zero_crossings(&input) as f32 / input.len() as f32;
        let per_sample_out = zero_crossings(&output) as f32 / output.len() as f32;
        assert!((per_sample_in - per_sample_out).abs() / per_sample_in < 0.1);
    }

    #[test]
    fn pitch_shift_keeps_length_and_raises_frequency() {
        let mut vocoder = PhaseVocoder::with_size(512);
        let input = sine(300.0, 8_000.0, 8_000);
        let output = vocoder.pitch_shift(&input, 12.0).unwrap();

        assert_eq!(output.len(), input.len());
        let ratio = zero_crossings(&output) as f32 / zero_crossings(&input) as f32;
        assert!((ratio - 2.0).abs() < 0.25, "crossing ratio {ratio}");
    }

    #[test]
    fn rejects_non_positive_rate() {
        let mut vocoder = PhaseVocoder::with_size(64);
        assert!(vocoder.time_stretch(&[0.0; 10], 0.0).is_err());
    }

    #[test]
    fn short_inputs_are_handled() {
        let mut vocoder = PhaseVocoder::with_size(512);
        let output = vocoder.time_stretch(&[0.25; 10], 1.1).unwrap();
        assert_eq!(output.len(), 9);
    }
}
