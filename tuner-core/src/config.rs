//! # Configuration Module
//!
//! Frame size, capture rate, pitch-detector thresholds and tuning-scale
//! geometry, loaded from JSON with every field optional.

use anyhow::{Context, Result, anyhow};
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::Path;

use crate::pitch::PitchConfig;
use crate::scale::ScaleConfig;

/// Tuner configuration, loaded from a JSON file.
///
/// Every struct is `#[serde(default)]`, so a file only needs the fields it
/// wants to change.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct TunerConfig {
    /// Samples per analysis frame.
    pub frame_size: usize,
    /// Sample rate requested from the capture device.
    pub sample_rate: u32,
    pub pitch: PitchConfig,
    pub scale: ScaleConfig,
}

impl Default for TunerConfig {
    fn default() -> Self {
        Self {
            frame_size: 2048,
            sample_rate: 44100,
            pitch: PitchConfig::default(),
            scale: ScaleConfig::default(),
        }
    }
}

impl TunerConfig {
    /// Load configuration from a JSON file
    pub fn load(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let content = fs::read_to_string(path)
            .with_context(|| format!("Failed to read config file: {}", path.display()))?;

        let config = Self::from_json_str(&content)
            .with_context(|| format!("Invalid config file: {}", path.display()))?;
        log::info!("Loaded tuner configuration from {}", path.display());
        Ok(config)
    }

    /// Loads `path` if it exists, defaults otherwise.
    pub fn load_or_default(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        if path.exists() {
            Self::load(path)
        } else {
            log::debug!("No config at {}, using defaults", path.display());
            Ok(Self::default())
        }
    }

    pub fn from_json_str(content: &str) -> Result<Self> {
        let config: TunerConfig =
            serde_json::from_str(content).context("Failed to parse JSON config")?;
        config.validate()?;
        Ok(config)
    }

    /// Validate the configuration
    pub fn validate(&self) -> Result<()> {
        if self.frame_size < 64 {
            return Err(anyhow!("frame_size must be at least 64 samples"));
        }
        if self.sample_rate == 0 {
            return Err(anyhow!("sample_rate must be positive"));
        }

        let pitch = &self.pitch;
        if !(pitch.silence_rms >= 0.0 && pitch.silence_rms < 1.0) {
            return Err(anyhow!("pitch.silence_rms must be in [0, 1)"));
        }
        if !(pitch.trim_threshold > 0.0 && pitch.trim_threshold <= 1.0) {
            return Err(anyhow!("pitch.trim_threshold must be in (0, 1]"));
        }
        if pitch.min_trimmed_len > self.frame_size {
            return Err(anyhow!("pitch.min_trimmed_len cannot exceed frame_size"));
        }

        let scale = &self.scale;
        if scale.segments < 3 || scale.segments % 2 == 0 {
            return Err(anyhow!(
                "scale.segments must be odd and at least 3, got {}",
                scale.segments
            ));
        }
        if !(scale.span_cents > 0.0 && scale.span_cents.is_finite()) {
            return Err(anyhow!("scale.span_cents must be positive"));
        }
        if scale.near_band >= scale.center() {
            return Err(anyhow!(
                "scale.near_band must be smaller than {}",
                scale.center()
            ));
        }
        if !(scale.in_tune_tolerance_hz >= 0.0 && scale.in_tune_tolerance_hz.is_finite()) {
            return Err(anyhow!("scale.in_tune_tolerance_hz must be non-negative"));
        }

        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    #[test]
    fn defaults_are_valid() {
        let config = TunerConfig::default();
        assert!(config.validate().is_ok());
        assert_eq!(config.scale.segments, 21);
        assert_eq!(config.scale.span_cents, 50.0);
        assert_eq!(config.scale.near_band, 2);
        assert_eq!(config.scale.in_tune_tolerance_hz, 1.0);
        assert_eq!(config.pitch.silence_rms, 0.01);
    }

    #[test]
    fn partial_json_keeps_defaults() {
        let config =
            TunerConfig::from_json_str(r#"{ "scale": { "in_tune_tolerance_hz": 2.0 } }"#).unwrap();
        assert_eq!(config.scale.in_tune_tolerance_hz, 2.0);
        assert_eq!(config.scale.segments, 21);
        assert_eq!(config.frame_size, 2048);
    }

    #[test]
    fn even_segment_count_is_rejected() {
        let err = TunerConfig::from_json_str(r#"{ "scale": { "segments": 20 } }"#).unwrap_err();
        assert!(format!("{err:#}").contains("odd"));
    }

    #[test]
    fn wide_near_band_is_rejected() {
        assert!(TunerConfig::from_json_str(r#"{ "scale": { "near_band": 10 } }"#).is_err());
    }

    #[test]
    fn loads_from_file() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        write!(file, r#"{{ "frame_size": 4096, "pitch": {{ "silence_rms": 0.02 }} }}"#).unwrap();
        let config = TunerConfig::load(file.path()).unwrap();
        assert_eq!(config.frame_size, 4096);
        assert_eq!(config.pitch.silence_rms, 0.02);
        assert_eq!(config.pitch.trim_threshold, 0.2);
    }

    #[test]
    fn missing_file_falls_back_to_defaults() {
        let dir = tempfile::tempdir().unwrap();
        let config = TunerConfig::load_or_default(dir.path().join("absent.json")).unwrap();
        assert_eq!(config, TunerConfig::default());
        assert!(TunerConfig::load(dir.path().join("absent.json")).is_err());
    }
}
