// tuner-core/src/lib.rs

//! The core logic for the instrument tuner.
//! This crate is responsible for pitch estimation, note resolution,
//! cents deviation and the mapping of that deviation onto the segmented
//! tuning scale. It is completely headless and contains no GUI code.

pub mod analysis;
pub mod audio;
pub mod config;
pub mod error;
pub mod instruments;
pub mod pitch;
pub mod scale;
pub mod tuning;

pub use analysis::{AnalysisResult, AnalysisSession, TunerReading};
pub use error::TuningError;

/// One block of mono audio handed to the pipeline.
///
/// A frame is produced by the capture callback and consumed by exactly one
/// analysis cycle. Samples are expected in `[-1.0, 1.0]`.
#[derive(Debug, Clone, PartialEq)]
pub struct AudioFrame {
    /// Mono samples, oldest first.
    pub samples: Vec<f32>,
    /// Sample rate in Hz.
    pub sample_rate: u32,
}

impl AudioFrame {
    pub fn new(samples: Vec<f32>, sample_rate: u32) -> Self {
        Self {
            samples,
            sample_rate,
        }
    }
}
