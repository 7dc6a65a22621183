//! Sample-domain effects used by dataset augmentation.

use std::f32::consts::PI;

use biquad::{Biquad, Coefficients, DirectForm2Transposed, ToHertz, Type, Q_BUTTERWORTH_F32};
use rand::Rng;

use crate::{audio::db_to_amplitude, BeatSynthError, Result};

/// Adds white Gaussian noise scaled by `level`.
pub fn add_noise<R: Rng + ?Sized>(input: &[f32], level: f32, rng: &mut R) -> Vec<f32> {
    input
        .iter()
        .map(|sample| sample + level * standard_normal(rng))
        .collect()
}

/// Box-Muller draw from N(0, 1).
fn standard_normal<R: Rng + ?Sized>(rng: &mut R) -> f32 {
    let u1: f32 = rng.gen_range(f32::EPSILON..1.0);
    let u2: f32 = rng.gen();
    (-2.0 * u1.ln()).sqrt() * (2.0 * PI * u2).cos()
}

/// First-order pre-emphasis `y[n] = x[n] - coef * x[n - 1]`. The sample
/// before the first is extrapolated as `2 * x[0] - x[1]`.
pub fn preemphasis(input: &[f32], coef: f32) -> Vec<f32> {
    let Some(&first) = input.first() else {
        return Vec::new();
    };
    let mut previous = match input.get(1) {
        Some(&second) => 2.0 * first - second,
        None => first,
    };

    input
        .iter()
        .map(|&sample| {
            let out = sample - coef * previous;
            previous = sample;
            out
        })
        .collect()
}

/// Settings of the feed-forward dynamic range compressor.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct CompressorSettings {
    pub threshold_db: f32,
    pub ratio: f32,
    pub attack_ms: f32,
    pub release_ms: f32,
}

impl Default for CompressorSettings {
    fn default() -> Self {
        Self {
            threshold_db: -20.0,
            ratio: 4.0,
            attack_ms: 5.0,
            release_ms: 50.0,
        }
    }
}

/// Peak-envelope compressor. Levels above the threshold are reduced by
/// `ratio`; the envelope rises with the attack time and falls with the
/// release time.
pub fn compress(input: &[f32], sample_rate: u32, settings: &CompressorSettings) -> Result<Vec<f32>> {
    if settings.ratio < 1.0 || !settings.ratio.is_finite() {
        return Err(BeatSynthError::invalid_config(format!(
            "compressor ratio must be at least 1, got {}",
            settings.ratio
        )));
    }

    let attack = smoothing_coefficient(settings.attack_ms, sample_rate);
    let release = smoothing_coefficient(settings.release_ms, sample_rate);
    let threshold = db_to_amplitude(settings.threshold_db);
    let mut envelope = 0.0_f32;

    Ok(input
        .iter()
        .map(|&sample| {
            let level = sample.abs();
            let coef = if level > envelope { attack } else { release };
            envelope = coef * envelope + (1.0 - coef) * level;

            if envelope <= threshold {
                return sample;
            }
            let over_db = 20.0 * (envelope / threshold).log10();
            let reduction_db = over_db - over_db / settings.ratio;
            sample * db_to_amplitude(-reduction_db)
        })
        .collect())
}

fn smoothing_coefficient(time_ms: f32, sample_rate: u32) -> f32 {
    let samples = time_ms.max(0.0) * sample_rate as f32 / 1000.0;
    if samples < 1.0 {
        0.0
    } else {
        (-1.0 / samples).exp()
    }
}

/// Band-pass built from `order` high-pass sections at `low_hz` followed by
/// `order` low-pass sections at `high_hz`, all with Butterworth Q.
pub fn band_pass(
    input: &[f32],
    sample_rate: u32,
    low_hz: f32,
    high_hz: f32,
    order: usize,
) -> Result<Vec<f32>> {
    let nyquist = sample_rate as f32 / 2.0;
    if !(low_hz > 0.0 && low_hz < high_hz && high_hz < nyquist) {
        return Err(BeatSynthError::invalid_config(format!(
            "band edges must satisfy 0 < {low_hz} < {high_hz} < {nyquist} Hz"
        )));
    }

    let mut sections = Vec::with_capacity(order * 2);
    for (high_pass, cutoff) in [(true, low_hz), (false, high_hz)] {
        for _ in 0..order {
            let kind = if high_pass { Type::HighPass } else { Type::LowPass };
            let coeffs = Coefficients::<f32>::from_params(
                kind,
                (sample_rate as f32).hz(),
                cutoff.hz(),
                Q_BUTTERWORTH_F32,
            )
            .map_err(|err| BeatSynthError::invalid_config(format!("band-pass design: {err:?}")))?;
            sections.push(DirectForm2Transposed::<f32>::new(coeffs));
        }
    }

    Ok(input
        .iter()
        .map(|&sample| {
            sections
                .iter_mut()
                .fold(sample, |acc, section| section.run(acc))
        })
        .collect())
}
