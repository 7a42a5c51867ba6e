//! # Musical Tuning Module
//!
//! Note tables, nearest-note resolution and cents deviation.
//!
//! ## Features
//! - Ordered note catalog (name → Hz) with an ascending-pitch invariant
//! - Standard 88-key equal temperament catalog (A0 to C8, A4 = 440 Hz)
//! - Nearest-note lookup by absolute frequency difference
//! - Flat spellings (`Bb3`, `Eb2`) accepted wherever a note name is looked up
//! - Cents deviation, plus a checked form that refuses invalid targets

use once_cell::sync::Lazy;
use serde::{Deserialize, Serialize};

use crate::error::TuningError;

/// Sharp spellings in semitone order starting at C.
const NOTE_NAMES: [&str; 12] = [
    "C", "C#", "D", "D#", "E", "F", "F#", "G", "G#", "A", "A#", "B",
];

/// Represents a single musical note with its name and frequency.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Note {
    /// Note name (e.g., "A4", "C#3")
    pub name: String,
    /// Frequency in Hz
    pub frequency: f32,
}

impl Note {
    pub fn new(name: impl Into<String>, frequency: f32) -> Self {
        Self {
            name: name.into(),
            frequency,
        }
    }
}

/// Ordered note table. Catalog order is pitch order.
///
/// Construction enforces that every frequency is finite and positive and
/// that frequencies strictly increase from one entry to the next.
#[derive(Debug, Clone, PartialEq)]
pub struct NoteCatalog {
    notes: Vec<Note>,
}

impl NoteCatalog {
    /// Builds a catalog, checking the ascending-pitch invariant.
    pub fn new(notes: Vec<Note>) -> Result<Self, TuningError> {
        for note in &notes {
            if !note.frequency.is_finite() || note.frequency <= 0.0 {
                return Err(TuningError::InvalidFrequency {
                    name: note.name.clone(),
                    frequency: note.frequency,
                });
            }
        }
        for pair in notes.windows(2) {
            if pair[1].frequency <= pair[0].frequency {
                return Err(TuningError::UnorderedCatalog {
                    previous: pair[0].name.clone(),
                    previous_hz: pair[0].frequency,
                    next: pair[1].name.clone(),
                    next_hz: pair[1].frequency,
                });
            }
        }
        Ok(Self { notes })
    }

    /// Convenience constructor from `(name, hz)` pairs.
    pub fn from_pairs<'a>(
        pairs: impl IntoIterator<Item = (&'a str, f32)>,
    ) -> Result<Self, TuningError> {
        Self::new(pairs.into_iter().map(|(n, f)| Note::new(n, f)).collect())
    }

    /// The standard 88-key catalog, A0 to C8.
    pub fn standard() -> &'static NoteCatalog {
        &STANDARD_CATALOG
    }

    pub fn notes(&self) -> &[Note] {
        &self.notes
    }

    pub fn len(&self) -> usize {
        self.notes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.notes.is_empty()
    }

    /// Position of a note in catalog order. Flat spellings are accepted.
    pub fn index_of(&self, name: &str) -> Option<usize> {
        let wanted = normalize_note_name(name)?;
        self.notes.iter().position(|n| n.name == wanted)
    }

    /// Frequency of a note by name. Flat spellings are accepted.
    pub fn frequency_of(&self, name: &str) -> Option<f32> {
        self.index_of(name).map(|i| self.notes[i].frequency)
    }

    /// Finds the catalog note closest to `frequency`.
    ///
    /// Linear scan on absolute Hz difference. Ties go to the earlier entry,
    /// and anything beyond either end of the catalog lands on the boundary
    /// note. `None` for an empty catalog or a non-finite frequency.
    pub fn nearest(&self, frequency: f32) -> Option<&Note> {
        if !frequency.is_finite() {
            return None;
        }
        let mut best: Option<(&Note, f32)> = None;
        for note in &self.notes {
            let diff = (note.frequency - frequency).abs();
            match best {
                Some((_, best_diff)) if diff >= best_diff => {}
                _ => best = Some((note, diff)),
            }
        }
        best.map(|(note, _)| note)
    }

    /// Sub-catalog of every note from `low` to `high` inclusive.
    pub fn slice(&self, low: &str, high: &str) -> Result<NoteCatalog, TuningError> {
        let lo = self
            .index_of(low)
            .ok_or_else(|| TuningError::UnknownNote(low.to_string()))?;
        let hi = self
            .index_of(high)
            .ok_or_else(|| TuningError::UnknownNote(high.to_string()))?;
        let (lo, hi) = if lo <= hi { (lo, hi) } else { (hi, lo) };
        Ok(NoteCatalog {
            notes: self.notes[lo..=hi].to_vec(),
        })
    }
}

/// Statically computed notes for a standard 88-key range (A0 to C8).
///
/// Frequencies use equal temperament with A4 = 440 Hz, rounded to 0.01 Hz
/// like the printed tuning charts.
static STANDARD_CATALOG: Lazy<NoteCatalog> = Lazy::new(|| {
    let mut notes = Vec::with_capacity(88);
    for key in 0..88 {
        // Key 0 is A0, nine semitones above C0.
        let semitone = key + 9;
        let name = format!("{}{}", NOTE_NAMES[semitone % 12], semitone / 12);
        let frequency = round_hz(440.0 * 2.0_f32.powf((key as f32 - 48.0) / 12.0));
        notes.push(Note { name, frequency });
    }
    NoteCatalog::new(notes).expect("equal temperament is strictly ascending")
});

fn round_hz(hz: f32) -> f32 {
    (hz * 100.0).round() / 100.0
}

/// Octaves a note name may carry; anything else is not a note.
const OCTAVE_RANGE: std::ops::RangeInclusive<i32> = -1..=10;

/// Splits a scientific pitch name into (semitone within octave, octave).
///
/// Accepts `#` and `b` accidentals; `Cb` and `B#` cross the octave line the
/// way they sound (`Cb4` is `B3`).
fn parse_note_name(name: &str) -> Option<(i32, i32)> {
    let mut chars = name.trim().chars();
    let letter = chars.next()?.to_ascii_uppercase();
    let base = match letter {
        'C' => 0,
        'D' => 2,
        'E' => 4,
        'F' => 5,
        'G' => 7,
        'A' => 9,
        'B' => 11,
        _ => return None,
    };
    let rest: String = chars.collect();
    let (accidental, octave_text) = if let Some(octave) = rest.strip_prefix('#') {
        (1, octave)
    } else if let Some(octave) = rest.strip_prefix('b') {
        (-1, octave)
    } else {
        (0, rest.as_str())
    };
    let octave: i32 = octave_text.parse().ok()?;
    if !OCTAVE_RANGE.contains(&octave) {
        return None;
    }

    let absolute = octave * 12 + base + accidental;
    Some((absolute.rem_euclid(12), absolute.div_euclid(12)))
}

/// Canonical (sharp) spelling of a note name, e.g. `Bb3` → `A#3`.
pub fn normalize_note_name(name: &str) -> Option<String> {
    let (semitone, octave) = parse_note_name(name)?;
    Some(format!("{}{}", NOTE_NAMES[semitone as usize], octave))
}

/// Equal temperament frequency of a named note relative to `a4_hz`,
/// rounded to 0.01 Hz.
pub fn equal_temperament_frequency(name: &str, a4_hz: f32) -> Option<f32> {
    let (semitone, octave) = parse_note_name(name)?;
    let from_a4 = (octave - 4) * 12 + semitone - 9;
    Some(round_hz(a4_hz * 2.0_f32.powf(from_a4 as f32 / 12.0)))
}

/// Name of the catalog note closest to `frequency`.
pub fn resolve_note(frequency: f32, catalog: &NoteCatalog) -> Option<&str> {
    catalog.nearest(frequency).map(|n| n.name.as_str())
}

/// Signed deviation from a target frequency in whole cents.
///
/// Positive is sharp, negative is flat. When either frequency is not a
/// positive finite number the result is 0, which callers must read as "no
/// deviation data" rather than "in tune".
pub fn cents_deviation(detected_hz: f32, target_hz: f32) -> i32 {
    if !valid_hz(detected_hz) || !valid_hz(target_hz) {
        return 0;
    }
    (1200.0 * (detected_hz / target_hz).log2()).round() as i32
}

fn valid_hz(hz: f32) -> bool {
    hz.is_finite() && hz > 0.0
}

/// Deviation of one detected frequency from one target.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct DeviationResult {
    pub detected_hz: f32,
    pub target_hz: f32,
    pub cents: i32,
    /// `|detected - target| <= tolerance_hz`.
    pub in_tune: bool,
}

impl DeviationResult {
    /// Measures `detected_hz` against `target_hz`.
    ///
    /// # Returns
    /// * `Ok(result)` - Both frequencies valid
    /// * `Err(TuningError::InvalidTarget)` - Either frequency non-positive or not finite
    pub fn measure(
        detected_hz: f32,
        target_hz: f32,
        tolerance_hz: f32,
    ) -> Result<Self, TuningError> {
        if !valid_hz(target_hz) {
            return Err(TuningError::InvalidTarget(format!(
                "target frequency {target_hz} Hz"
            )));
        }
        if !valid_hz(detected_hz) {
            return Err(TuningError::InvalidTarget(format!(
                "detected frequency {detected_hz} Hz"
            )));
        }
        Ok(Self {
            detected_hz,
            target_hz,
            cents: cents_deviation(detected_hz, target_hz),
            in_tune: (detected_hz - target_hz).abs() <= tolerance_hz,
        })
    }
}
