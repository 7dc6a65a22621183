use crate::{BeatSynthError, Result};

/// Largest representable amplitude once samples are scaled to `[-1, 1]`.
pub const FULL_SCALE: f32 = 1.0;

/// Immutable mono audio value. Every transform borrows the clip and returns a
/// new one, so a loaded stroke can be reused freely.
#[derive(Debug, Clone, PartialEq)]
pub struct AudioClip {
    samples: Vec<f32>,
    sample_rate: u32,
}

impl AudioClip {
    /// Wraps raw samples recorded at `sample_rate`.
    pub fn new(samples: Vec<f32>, sample_rate: u32) -> Result<Self> {
        if sample_rate == 0 {
            return Err(BeatSynthError::invalid_config(
                "sample rate must be positive",
            ));
        }
        Ok(Self {
            samples,
            sample_rate,
        })
    }

    /// Silent clip lasting `duration_ms` milliseconds.
    pub fn silent(duration_ms: u64, sample_rate: u32) -> Result<Self> {
        let len = ms_to_samples(duration_ms, sample_rate);
        Self::silent_samples(len, sample_rate)
    }

    /// Silent clip holding exactly `len` samples.
    pub fn silent_samples(len: usize, sample_rate: u32) -> Result<Self> {
        Self::new(vec![0.0; len], sample_rate)
    }

    pub fn samples(&self) -> &[f32] {
        &self.samples
    }

    pub fn into_samples(self) -> Vec<f32> {
        self.samples
    }

    pub fn sample_rate(&self) -> u32 {
        self.sample_rate
    }

    pub fn len(&self) -> usize {
        self.samples.len()
    }

    pub fn is_empty(&self) -> bool {
        self.samples.is_empty()
    }

    /// Duration in milliseconds.
    pub fn duration_ms(&self) -> f64 {
        self.samples.len() as f64 * 1000.0 / self.sample_rate as f64
    }

    /// Largest absolute sample value.
    pub fn peak(&self) -> f32 {
        self.samples
            .iter()
            .fold(0.0_f32, |peak, sample| peak.max(sample.abs()))
    }

    /// Linearly attenuates the trailing `duration_ms` to silence. A window
    /// longer than the clip covers the whole clip.
    pub fn fade_out(&self, duration_ms: f64) -> Self {
        let window = ms_f64_to_samples(duration_ms, self.sample_rate).min(self.len());
        let mut samples = self.samples.clone();
        if window == 0 {
            return self.with_samples(samples);
        }

        let start = samples.len() - window;
        for (i, sample) in samples[start..].iter_mut().enumerate() {
            // Reaches exactly zero on the final sample.
            let gain = if window == 1 {
                0.0
            } else {
                1.0 - i as f32 / (window - 1) as f32
            };
            *sample *= gain;
        }
        self.with_samples(samples)
    }

    /// Boosts or cuts by `db` decibels, saturating at full scale.
    pub fn apply_gain(&self, db: f32) -> Self {
        let factor = db_to_amplitude(db);
        self.map(|sample| (sample * factor).clamp(-FULL_SCALE, FULL_SCALE))
    }

    /// Multiplies every sample by `factor` without clipping.
    pub fn scale(&self, factor: f32) -> Self {
        self.map(|sample| sample * factor)
    }

    /// Peak normalisation: rescales so the loudest sample sits `headroom_db`
    /// below full scale. Silent clips are returned unchanged.
    pub fn normalize(&self, headroom_db: f32) -> Self {
        let peak = self.peak();
        if peak <= f32::EPSILON {
            return self.clone();
        }
        let target = FULL_SCALE * db_to_amplitude(-headroom_db.abs());
        let factor = target / peak;
        self.map(|sample| sample * factor)
    }

    /// Adds `other` into a copy of this clip starting at `position_ms`. The mix
    /// is purely additive and unclipped; anything past the end is dropped.
    pub fn overlay(&self, other: &AudioClip, position_ms: u64) -> Result<Self> {
        let offset = ms_to_samples(position_ms, self.sample_rate);
        self.overlay_at(other, offset)
    }

    /// Same as [`overlay`](Self::overlay) with a sample offset.
    pub fn overlay_at(&self, other: &AudioClip, offset: usize) -> Result<Self> {
        if other.sample_rate != self.sample_rate {
            return Err(BeatSynthError::msg(format!(
                "cannot overlay a {} Hz clip onto a {} Hz canvas",
                other.sample_rate, self.sample_rate
            )));
        }

        let mut samples = self.samples.clone();
        if offset < samples.len() {
            for (dst, src) in samples[offset..].iter_mut().zip(other.samples.iter()) {
                *dst += *src;
            }
        }
        Ok(self.with_samples(samples))
    }

    /// Clamps every sample into the representable range.
    pub fn clamped(&self) -> Self {
        self.map(|sample| sample.clamp(-FULL_SCALE, FULL_SCALE))
    }

    /// Linear-interpolation resampling to `target_rate`.
    pub fn resample(&self, target_rate: u32) -> Result<Self> {
        if target_rate == 0 {
            return Err(BeatSynthError::invalid_config(
                "target sample rate must be positive",
            ));
        }
        if target_rate == self.sample_rate {
            return Ok(self.clone());
        }

        let len = (self.len() as u64 * target_rate as u64 / self.sample_rate as u64) as usize;
        let samples = resample_to_len(&self.samples, len);
        Self::new(samples, target_rate)
    }

    fn map(&self, f: impl Fn(f32) -> f32) -> Self {
        self.with_samples(self.samples.iter().map(|s| f(*s)).collect())
    }

    fn with_samples(&self, samples: Vec<f32>) -> Self {
        Self {
            samples,
            sample_rate: self.sample_rate,
        }
    }
}

/// Converts a decibel offset into a linear amplitude factor.
pub fn db_to_amplitude(db: f32) -> f32 {
    10.0_f32.powf(db / 20.0)
}

/// Converts whole milliseconds into a sample count, truncating.
pub fn ms_to_samples(ms: u64, sample_rate: u32) -> usize {
    (ms * sample_rate as u64 / 1000) as usize
}

fn ms_f64_to_samples(ms: f64, sample_rate: u32) -> usize {
    if !ms.is_finite() || ms <= 0.0 {
        return 0;
    }
    (ms * sample_rate as f64 / 1000.0) as usize
}

/// Stretches or squeezes `input` to exactly `len` samples by linear
/// interpolation.
pub fn resample_to_len(input: &[f32], len: usize) -> Vec<f32> {
    if len == 0 || input.is_empty() {
        return vec![0.0; len];
    }
    if input.len() == 1 || len == 1 {
        return vec![input[0]; len];
    }

    let step = (input.len() - 1) as f64 / (len - 1) as f64;
    (0..len)
        .map(|i| {
            let pos = i as f64 * step;
            let left = pos.floor() as usize;
            let right = (left + 1).min(input.len() - 1);
            let alpha = (pos - left as f64) as f32;
            input[left] * (1.0 - alpha) + input[right] * alpha
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn clip(samples: Vec<f32>, rate: u32) -> AudioClip {
        AudioClip::new(samples, rate).unwrap()
    }

    #[test]
    fn fade_out_silences_the_tail_only() {
        let faded = clip(vec![1.0; 2_000], 1_000).fade_out(100.0);

        assert_eq!(faded.samples()[0], 1.0);
        assert_eq!(faded.samples()[1_899], 1.0);
        assert!(faded.samples()[1_950] < 1.0 && faded.samples()[1_950] > 0.0);
        assert_eq!(faded.samples()[1_999], 0.0);
    }

    #[test]
    fn fade_longer_than_clip_covers_everything() {
        let faded = clip(vec![0.5; 50], 1_000).fade_out(100.0);

        assert_eq!(faded.len(), 50);
        assert!((faded.samples()[0] - 0.5).abs() < f32::EPSILON);
        assert_eq!(faded.samples()[49], 0.0);
        assert!(faded.samples().windows(2).all(|w| w[1] <= w[0]));
    }

    #[test]
    fn gain_saturates_at_full_scale() {
        let boosted = clip(vec![0.9, -0.9, 0.1], 10).apply_gain(6.0);

        assert_eq!(boosted.samples()[0], FULL_SCALE);
        assert_eq!(boosted.samples()[1], -FULL_SCALE);
        assert!((boosted.samples()[2] - 0.1 * db_to_amplitude(6.0)).abs() < 1e-6);
    }

    #[test]
    fn normalize_is_idempotent() {
        let once = clip(vec![0.1, -0.25, 0.2], 10).normalize(0.0);
        let twice = once.normalize(0.0);

        assert!((once.peak() - FULL_SCALE).abs() < 1e-6);
        assert!((twice.peak() - once.peak()).abs() < 1e-6);
    }

    #[test]
    fn normalize_leaves_silence_alone() {
        let silent = AudioClip::silent(10, 1_000).unwrap();
        assert_eq!(silent.normalize(0.0), silent);
    }

    #[test]
    fn overlay_adds_at_offset_and_truncates() {
        let canvas = AudioClip::silent(4, 1_000).unwrap();
        let stroke = clip(vec![0.5, 0.5, 0.5], 1_000);

        let mixed = canvas.overlay(&stroke, 2).unwrap();
        assert_eq!(mixed.samples(), &[0.0, 0.0, 0.5, 0.5]);

        let mixed = mixed.overlay(&stroke, 0).unwrap();
        assert_eq!(mixed.samples(), &[0.5, 0.5, 1.0, 0.5]);
    }

    #[test]
    fn overlay_rejects_mismatched_rates() {
        let canvas = AudioClip::silent(4, 1_000).unwrap();
        let stroke = clip(vec![0.5], 2_000);
        assert!(canvas.overlay(&stroke, 0).is_err());
    }

    #[test]
    fn resample_scales_length() {
        let resampled = clip(vec![0.0, 1.0, 0.0, -1.0], 4).resample(8).unwrap();
        assert_eq!(resampled.len(), 8);
        assert_eq!(resampled.sample_rate(), 8);
        assert_eq!(resampled.samples()[0], 0.0);
        assert_eq!(resampled.samples()[7], -1.0);
    }

    #[test]
    fn rejects_zero_sample_rate() {
        assert!(AudioClip::new(vec![0.0], 0).is_err());
    }
}
