//! # Pitch Estimation Module
//!
//! Time-domain autocorrelation pitch estimation for monophonic instrument
//! signals (guitar, ukulele, banjo, violin strings).
//!
//! ## Pipeline
//! - RMS noise gate to reject silence and the noise floor
//! - Edge trimming to the quiet points nearest each end of the frame
//! - Unnormalized autocorrelation over every lag of the trimmed frame
//! - Period pick: the highest peak after the first dip of the correlation
//! - Parabolic interpolation for sub-sample accuracy

use serde::{Deserialize, Serialize};

/// Outcome of one estimation cycle.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum PitchEstimate {
    /// Too quiet, or no usable periodicity in the frame.
    NoSignal,
    /// Estimated fundamental frequency in Hz. Always finite and positive.
    Frequency(f32),
}

impl PitchEstimate {
    pub fn frequency(&self) -> Option<f32> {
        match self {
            PitchEstimate::Frequency(hz) => Some(*hz),
            PitchEstimate::NoSignal => None,
        }
    }
}

/// Tunables for the estimator.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct PitchConfig {
    /// Frames with an RMS below this are treated as silence.
    pub silence_rms: f32,
    /// Absolute amplitude under which a sample counts as a quiet edge point.
    pub trim_threshold: f32,
    /// Shortest trimmed region worth correlating.
    pub min_trimmed_len: usize,
}

impl Default for PitchConfig {
    fn default() -> Self {
        Self {
            silence_rms: 0.01,
            trim_threshold: 0.2,
            min_trimmed_len: 32,
        }
    }
}

/// Root-mean-square level of a frame. Zero for an empty frame.
pub fn rms(samples: &[f32]) -> f32 {
    if samples.is_empty() {
        return 0.0;
    }
    (samples.iter().map(|&s| s * s).sum::<f32>() / samples.len() as f32).sqrt()
}

/// Autocorrelation pitch estimator with a reusable correlation buffer.
///
/// After the first frame of a given size the estimator does not allocate,
/// which keeps it usable from a tight per-frame loop.
#[derive(Debug, Clone, Default)]
pub struct AutocorrelationEstimator {
    config: PitchConfig,
    correlation: Vec<f32>,
}

impl AutocorrelationEstimator {
    pub fn new(config: PitchConfig) -> Self {
        Self {
            config,
            correlation: Vec::new(),
        }
    }

    /// Estimates the fundamental frequency of `samples`.
    ///
    /// # Arguments
    /// * `samples` - Mono signal, nominally in `[-1.0, 1.0]`
    /// * `sample_rate` - Sample rate in Hz
    ///
    /// # Returns
    /// * `PitchEstimate::Frequency(hz)` - Estimated fundamental
    /// * `PitchEstimate::NoSignal` - Silence, a degenerate frame, or no clear period
    pub fn estimate(&mut self, samples: &[f32], sample_rate: u32) -> PitchEstimate {
        if sample_rate == 0 || samples.is_empty() {
            return PitchEstimate::NoSignal;
        }

        // --- Noise gate ---
        let level = rms(samples);
        if !level.is_finite() || level < self.config.silence_rms {
            return PitchEstimate::NoSignal;
        }

        // --- Trim to the quiet points nearest each edge ---
        let Some(trimmed) = trim_edges(samples, self.config.trim_threshold) else {
            return PitchEstimate::NoSignal;
        };
        if trimmed.len() < self.config.min_trimmed_len.max(3) {
            return PitchEstimate::NoSignal;
        }

        // --- Unnormalized autocorrelation ---
        let len = trimmed.len();
        self.correlation.clear();
        self.correlation.resize(len, 0.0);
        for lag in 0..len {
            let mut sum = 0.0;
            for j in 0..(len - lag) {
                sum += trimmed[j] * trimmed[j + lag];
            }
            self.correlation[lag] = sum;
        }
        let c = &self.correlation;

        // --- Walk down the zero-lag peak to the first dip ---
        let mut dip = 0;
        while dip + 1 < len && c[dip] > c[dip + 1] {
            dip += 1;
        }
        if dip + 1 >= len {
            // Monotonic decay, nothing periodic in here.
            return PitchEstimate::NoSignal;
        }

        // --- Highest peak after the dip is the period ---
        let mut period = 0;
        let mut peak = f32::NEG_INFINITY;
        for (lag, &value) in c.iter().enumerate().skip(dip) {
            if value > peak {
                peak = value;
                period = lag;
            }
        }
        if period == 0 || !(peak > 0.0) {
            return PitchEstimate::NoSignal;
        }

        let refined = refine_period(c, period);
        let frequency = sample_rate as f32 / refined;

        if frequency.is_finite() && frequency > 0.0 {
            PitchEstimate::Frequency(frequency)
        } else {
            PitchEstimate::NoSignal
        }
    }
}

/// One-shot estimation with a throwaway estimator.
pub fn estimate_pitch(samples: &[f32], sample_rate: u32, config: &PitchConfig) -> PitchEstimate {
    AutocorrelationEstimator::new(config.clone()).estimate(samples, sample_rate)
}

/// Cuts off the loud leading and trailing parts of a frame.
///
/// The start is the first sample in the first half that is quieter than
/// `threshold`, the end the first such sample in the second half scanning
/// backwards from the last sample. `None` when either half has no quiet
/// sample.
fn trim_edges(samples: &[f32], threshold: f32) -> Option<&[f32]> {
    let len = samples.len();
    let half = len / 2;

    let start = samples[..half].iter().position(|s| s.abs() < threshold)?;
    let from_end = samples[half..]
        .iter()
        .rev()
        .position(|s| s.abs() < threshold)?;
    let end = len - from_end;

    if end <= start {
        return None;
    }
    Some(&samples[start..end])
}

/// Parabolic interpolation of the correlation peak at `period`.
fn refine_period(correlation: &[f32], period: usize) -> f32 {
    if period + 1 >= correlation.len() {
        return period as f32;
    }

    let y1 = correlation[period - 1];
    let y2 = correlation[period];
    let y3 = correlation[period + 1];

    let curvature = (y1 + y3 - 2.0 * y2) / 2.0;
    let slope = (y3 - y1) / 2.0;
    if curvature == 0.0 {
        return period as f32;
    }

    let shift = -slope / (2.0 * curvature);
    if shift.is_finite() && shift.abs() <= 1.0 {
        period as f32 + shift
    } else {
        period as f32
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::f32::consts::PI;

    fn sine(freq_hz: f32, amplitude: f32, sample_rate: u32, len: usize) -> Vec<f32> {
        (0..len)
            .map(|i| amplitude * (2.0 * PI * freq_hz * i as f32 / sample_rate as f32).sin())
            .collect()
    }

    fn assert_near(estimate: PitchEstimate, expected: f32, tolerance: f32) {
        match estimate {
            PitchEstimate::Frequency(hz) => assert!(
                (hz - expected).abs() <= tolerance,
                "expected ~{expected} Hz, got {hz} Hz"
            ),
            PitchEstimate::NoSignal => panic!("expected ~{expected} Hz, got NoSignal"),
        }
    }

    #[test]
    fn detects_220hz_sine() {
        let samples = sine(220.0, 0.5, 44100, 2048);
        assert_near(estimate_pitch(&samples, 44100, &PitchConfig::default()), 220.0, 1.0);
    }

    #[test]
    fn detects_low_e_string() {
        let samples = sine(82.41, 0.8, 44100, 4096);
        assert_near(estimate_pitch(&samples, 44100, &PitchConfig::default()), 82.41, 1.0);
    }

    #[test]
    fn detects_a4_at_48k() {
        let samples = sine(440.0, 0.4, 48000, 2048);
        assert_near(estimate_pitch(&samples, 48000, &PitchConfig::default()), 440.0, 2.0);
    }

    #[test]
    fn all_zero_frame_is_silence() {
        let samples = vec![0.0; 2048];
        for rate in [8000, 44100, 96000] {
            assert_eq!(
                estimate_pitch(&samples, rate, &PitchConfig::default()),
                PitchEstimate::NoSignal
            );
        }
    }

    #[test]
    fn quiet_frame_is_silence() {
        let samples = sine(220.0, 0.005, 44100, 2048);
        assert_eq!(
            estimate_pitch(&samples, 44100, &PitchConfig::default()),
            PitchEstimate::NoSignal
        );
    }

    #[test]
    fn tiny_and_empty_frames_are_silence() {
        let config = PitchConfig::default();
        assert_eq!(estimate_pitch(&[], 44100, &config), PitchEstimate::NoSignal);
        assert_eq!(estimate_pitch(&[0.5, -0.5, 0.1], 44100, &config), PitchEstimate::NoSignal);
    }

    #[test]
    fn frame_without_quiet_points_is_rejected() {
        // Loud DC never drops under the trim threshold.
        let samples = vec![0.9; 2048];
        assert_eq!(
            estimate_pitch(&samples, 44100, &PitchConfig::default()),
            PitchEstimate::NoSignal
        );
    }

    #[test]
    fn nan_samples_do_not_leak_into_the_result() {
        let mut samples = sine(220.0, 0.5, 44100, 2048);
        samples[100] = f32::NAN;
        assert_eq!(
            estimate_pitch(&samples, 44100, &PitchConfig::default()),
            PitchEstimate::NoSignal
        );
    }

    #[test]
    fn zero_sample_rate_is_silence() {
        let samples = sine(220.0, 0.5, 44100, 2048);
        assert_eq!(
            estimate_pitch(&samples, 0, &PitchConfig::default()),
            PitchEstimate::NoSignal
        );
    }

    #[test]
    fn estimator_reuses_its_buffer_across_frames() {
        let mut estimator = AutocorrelationEstimator::new(PitchConfig::default());
        let a = sine(196.0, 0.5, 44100, 2048);
        let b = sine(293.66, 0.5, 44100, 2048);
        assert_near(estimator.estimate(&a, 44100), 196.0, 1.0);
        assert_near(estimator.estimate(&b, 44100), 293.66, 1.5);
        assert_near(estimator.estimate(&a, 44100), 196.0, 1.0);
    }

    #[test]
    fn trim_keeps_the_region_between_quiet_points() {
        let samples = [0.9, 0.1, 0.5, -0.5, 0.05, 0.9];
        let trimmed = trim_edges(&samples, 0.2).unwrap();
        assert_eq!(trimmed, &[0.1, 0.5, -0.5, 0.05]);
    }

    #[test]
    fn rms_of_full_scale_square_is_one() {
        let samples: Vec<f32> = (0..64).map(|i| if i % 2 == 0 { 1.0 } else { -1.0 }).collect();
        assert!((rms(&samples) - 1.0).abs() < 1e-6);
        assert_eq!(rms(&[]), 0.0);
    }
}
