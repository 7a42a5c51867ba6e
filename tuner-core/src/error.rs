//! Recoverable conditions raised by the catalog and the analysis session.
//!
//! None of these are fatal. Silence is not an error at all: it travels as
//! [`crate::pitch::PitchEstimate::NoSignal`].

use thiserror::Error;

#[derive(Debug, Clone, PartialEq, Error)]
pub enum TuningError {
    /// The selected target is missing from the catalog, out of range, or has
    /// a non-positive frequency.
    #[error("invalid target: {0}")]
    InvalidTarget(String),

    /// The selected tuning key does not exist for the selected instrument.
    #[error("tuning `{tuning}` is not defined for instrument `{instrument}`")]
    ConfigurationMismatch { instrument: String, tuning: String },

    #[error("unknown instrument `{0}`")]
    UnknownInstrument(String),

    #[error("unknown note `{0}`")]
    UnknownNote(String),

    /// Catalog entries must be in strictly ascending pitch order.
    #[error("catalog is not in ascending order: `{previous}` ({previous_hz} Hz) precedes `{next}` ({next_hz} Hz)")]
    UnorderedCatalog {
        previous: String,
        previous_hz: f32,
        next: String,
        next_hz: f32,
    },

    #[error("note `{name}` has an invalid frequency {frequency} Hz")]
    InvalidFrequency { name: String, frequency: f32 },
}
