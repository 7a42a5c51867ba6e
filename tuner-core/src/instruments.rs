//! # Instrument Catalog Module
//!
//! Instruments, their tunings, and the note range each one is resolved
//! against. The built-in table covers guitar, ukulele, banjo and violin; a
//! replacement table can be loaded from JSON.
//!
//! The catalog is read-only once loaded. Selecting a tuning that the
//! instrument does not define is a [`TuningError::ConfigurationMismatch`];
//! [`Instrument::tuning_or_default`] resolves that by falling back to the
//! instrument's default tuning.

use anyhow::{Context, Result, anyhow};
use once_cell::sync::Lazy;
use serde::{Deserialize, Serialize};

use crate::error::TuningError;
use crate::tuning::NoteCatalog;

/// An ordered set of target notes, one per string or course.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Tuning {
    pub key: String,
    pub name: String,
    pub notes: Vec<String>,
}

impl Tuning {
    /// Target note at `index`, if the tuning has that many strings.
    pub fn target(&self, index: usize) -> Option<&str> {
        self.notes.get(index).map(String::as_str)
    }

    pub fn len(&self) -> usize {
        self.notes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.notes.is_empty()
    }
}

/// Lowest and highest note an instrument is expected to produce.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct NoteRange {
    pub low: String,
    pub high: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Instrument {
    key: String,
    name: String,
    default_tuning: String,
    range: NoteRange,
    tunings: Vec<Tuning>,
}

impl Instrument {
    pub fn key(&self) -> &str {
        &self.key
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn range(&self) -> &NoteRange {
        &self.range
    }

    pub fn tunings(&self) -> &[Tuning] {
        &self.tunings
    }

    /// Looks up a tuning by key.
    pub fn tuning(&self, key: &str) -> Result<&Tuning, TuningError> {
        self.tunings
            .iter()
            .find(|t| t.key == key)
            .ok_or_else(|| TuningError::ConfigurationMismatch {
                instrument: self.key.clone(),
                tuning: key.to_string(),
            })
    }

    pub fn default_tuning(&self) -> Result<&Tuning, TuningError> {
        self.tuning(&self.default_tuning)
    }

    /// Looks up a tuning, falling back to the default tuning when the key is
    /// not defined for this instrument.
    pub fn tuning_or_default(&self, key: &str) -> Result<&Tuning, TuningError> {
        match self.tuning(key) {
            Ok(tuning) => Ok(tuning),
            Err(mismatch) => {
                log::warn!("{mismatch}; falling back to `{}`", self.default_tuning);
                self.default_tuning()
            }
        }
    }

    /// The part of `base` that readings on this instrument resolve against.
    ///
    /// That is the instrument's range, widened so every note of `tuning` is
    /// included (bass and reentrant tunings leave the nominal range).
    pub fn resolution_catalog(
        &self,
        tuning: &Tuning,
        base: &NoteCatalog,
    ) -> Result<NoteCatalog, TuningError> {
        let index = |name: &str| {
            base.index_of(name)
                .ok_or_else(|| TuningError::UnknownNote(name.to_string()))
        };

        let mut low = index(&self.range.low)?;
        let mut high = index(&self.range.high)?;
        for note in &tuning.notes {
            let i = index(note)?;
            low = low.min(i);
            high = high.max(i);
        }

        let notes = base.notes();
        base.slice(&notes[low].name, &notes[high].name)
    }

    fn validate(&self, base: &NoteCatalog) -> Result<()> {
        if self.tunings.is_empty() {
            return Err(anyhow!("instrument `{}` has no tunings", self.key));
        }
        self.default_tuning()?;
        for name in [&self.range.low, &self.range.high] {
            if base.index_of(name).is_none() {
                return Err(anyhow!(
                    "instrument `{}` range note `{}` is not in the note catalog",
                    self.key,
                    name
                ));
            }
        }
        for tuning in &self.tunings {
            if tuning.notes.is_empty() {
                return Err(anyhow!(
                    "tuning `{}` of `{}` has no notes",
                    tuning.key,
                    self.key
                ));
            }
            if let Some(missing) = tuning.notes.iter().find(|n| base.index_of(n).is_none()) {
                return Err(anyhow!(
                    "tuning `{}` of `{}` uses unknown note `{}`",
                    tuning.key,
                    self.key,
                    missing
                ));
            }
        }
        Ok(())
    }
}

/// Every instrument the tuner knows about.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct InstrumentCatalog {
    instruments: Vec<Instrument>,
}

impl InstrumentCatalog {
    /// The built-in table.
    pub fn builtin() -> &'static InstrumentCatalog {
        &BUILTIN_CATALOG
    }

    /// Parses and validates a catalog against the standard note table.
    pub fn from_json_str(content: &str) -> Result<Self> {
        let catalog: InstrumentCatalog =
            serde_json::from_str(content).context("Failed to parse instrument catalog")?;
        catalog.validate(NoteCatalog::standard())?;
        Ok(catalog)
    }

    pub fn instruments(&self) -> &[Instrument] {
        &self.instruments
    }

    pub fn instrument(&self, key: &str) -> Result<&Instrument, TuningError> {
        self.instruments
            .iter()
            .find(|i| i.key == key)
            .ok_or_else(|| TuningError::UnknownInstrument(key.to_string()))
    }

    /// Resolves an instrument/tuning selection, with default-tuning fallback.
    pub fn select(
        &self,
        instrument: &str,
        tuning: &str,
    ) -> Result<(&Instrument, &Tuning), TuningError> {
        let instrument = self.instrument(instrument)?;
        let tuning = instrument.tuning_or_default(tuning)?;
        Ok((instrument, tuning))
    }

    pub fn validate(&self, base: &NoteCatalog) -> Result<()> {
        if self.instruments.is_empty() {
            return Err(anyhow!("instrument catalog is empty"));
        }
        for instrument in &self.instruments {
            instrument
                .validate(base)
                .with_context(|| format!("Invalid instrument `{}`", instrument.key))?;
        }
        Ok(())
    }
}

type TuningRow = (&'static str, &'static str, &'static [&'static str]);

struct InstrumentRow {
    key: &'static str,
    name: &'static str,
    default_tuning: &'static str,
    range: (&'static str, &'static str),
    tunings: &'static [TuningRow],
}

const BUILTIN_INSTRUMENTS: &[InstrumentRow] = &[
    InstrumentRow {
        key: "guitar",
        name: "Guitar",
        default_tuning: "standard",
        range: ("E2", "E6"),
        tunings: &[
            ("standard", "Standard E", &["E2", "A2", "D3", "G3", "B3", "E4"]),
            ("drop_d", "Drop D", &["D2", "A2", "D3", "G3", "B3", "E4"]),
            ("double_drop_d", "Double Drop D", &["D2", "A2", "D3", "G3", "B3", "D4"]),
            ("dadgad", "DADGAD", &["D2", "A2", "D3", "G3", "A3", "D4"]),
            ("open_d", "Open D", &["D2", "A2", "D3", "F#3", "A3", "D4"]),
            ("open_g", "Open G", &["D2", "G2", "D3", "G3", "B3", "D4"]),
            ("open_c", "Open C", &["C2", "G2", "C3", "G3", "C4", "E4"]),
            ("open_e", "Open E", &["E2", "B2", "E3", "G#3", "B3", "E4"]),
            ("open_a", "Open A", &["E2", "A2", "E3", "A3", "C#4", "E4"]),
            ("half_step_down", "Half Step Down", &["Eb2", "Ab2", "Db3", "Gb3", "Bb3", "Eb4"]),
            ("full_step_down", "Full Step Down", &["D2", "G2", "C3", "F3", "A3", "D4"]),
            ("drop_c", "Drop C", &["C2", "G2", "C3", "F3", "A3", "D4"]),
            ("c_standard", "C Standard", &["C2", "F2", "Bb2", "Eb3", "G3", "C4"]),
            ("baritone_b_standard", "Baritone B Standard", &["B1", "E2", "A2", "D3", "F#3", "B3"]),
            ("seven_string_b_standard", "7-String B Standard", &["B1", "E2", "A2", "D3", "G3", "B3", "E4"]),
            ("eight_string_f_sharp_standard", "8-String F# Standard", &["F#1", "B1", "E2", "A2", "D3", "G3", "B3", "E4"]),
        ],
    },
    InstrumentRow {
        key: "ukulele",
        name: "Ukulele",
        default_tuning: "standard_c",
        range: ("G3", "C6"),
        tunings: &[
            ("standard_c", "Standard C (GCEA, reentrant)", &["G4", "C4", "E4", "A4"]),
            ("low_g", "Low G (linear)", &["G3", "C4", "E4", "A4"]),
            ("d_tuning", "D Tuning (ADF#B)", &["A4", "D4", "F#4", "B4"]),
            ("canadian", "Canadian Bb Tuning (F Bb D G)", &["F4", "Bb3", "D4", "G4"]),
            ("baritone", "Baritone (DGBE)", &["D3", "G3", "B3", "E4"]),
            ("sopranino", "Sopranino (a higher GCEA)", &["G4", "C4", "E4", "A4"]),
            ("bass", "Bass Ukulele (EADG)", &["E1", "A1", "D2", "G2"]),
        ],
    },
    InstrumentRow {
        key: "banjo",
        name: "Banjo",
        default_tuning: "open_g",
        range: ("D3", "G5"),
        tunings: &[
            ("open_g", "Standard 5-string Open G", &["G4", "D3", "G3", "B3", "D4"]),
            ("double_c", "Double C", &["G4", "C3", "G3", "C4", "D4"]),
            ("sawmill", "Sawmill / Modal G", &["G4", "D3", "G3", "C4", "D4"]),
            ("open_d", "Open D", &["F#4", "D3", "F#3", "A3", "D4"]),
            ("c_tuning", "Classic C", &["G4", "C3", "G3", "B3", "D4"]),
            ("old_time_d", "Old-Time D", &["A4", "D3", "F#3", "A3", "D4"]),
            ("tenor_standard", "Tenor Banjo Standard (Irish GDAE)", &["G3", "D4", "A4", "E5"]),
            ("tenor_jazz", "Tenor Banjo Jazz (CGDA)", &["C3", "G3", "D4", "A4"]),
            ("plectrum", "Plectrum Banjo (CGBD)", &["C3", "G3", "B3", "D4"]),
            ("six_string_guitar", "6-String Banjo (Guitar Tuning)", &["E2", "A2", "D3", "G3", "B3", "E4"]),
        ],
    },
    InstrumentRow {
        key: "violin",
        name: "Violin",
        default_tuning: "standard",
        range: ("G3", "C7"),
        tunings: &[
            ("standard", "Standard (GDAE)", &["G3", "D4", "A4", "E5"]),
            ("cross_a", "Cross A (AEAE)", &["A3", "E4", "A4", "E5"]),
            ("cross_d", "Cross D (ADAD)", &["A3", "D4", "A4", "D5"]),
        ],
    },
];

static BUILTIN_CATALOG: Lazy<InstrumentCatalog> = Lazy::new(|| {
    let instruments = BUILTIN_INSTRUMENTS
        .iter()
        .map(|row| Instrument {
            key: row.key.to_string(),
            name: row.name.to_string(),
            default_tuning: row.default_tuning.to_string(),
            range: NoteRange {
                low: row.range.0.to_string(),
                high: row.range.1.to_string(),
            },
            tunings: row
                .tunings
                .iter()
                .map(|(key, name, notes)| Tuning {
                    key: key.to_string(),
                    name: name.to_string(),
                    notes: notes.iter().map(|n| n.to_string()).collect(),
                })
                .collect(),
        })
        .collect();
    let catalog = InstrumentCatalog { instruments };
    if let Err(e) = catalog.validate(NoteCatalog::standard()) {
        panic!("built-in instrument catalog is invalid: {e:#}");
    }
    catalog
});

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn builtin_catalog_is_valid() {
        let catalog = InstrumentCatalog::builtin();
        assert!(catalog.validate(NoteCatalog::standard()).is_ok());
        let keys: Vec<&str> = catalog.instruments().iter().map(|i| i.key()).collect();
        assert_eq!(keys, ["guitar", "ukulele", "banjo", "violin"]);
    }

    #[test]
    fn every_default_tuning_exists() {
        for instrument in InstrumentCatalog::builtin().instruments() {
            assert!(instrument.default_tuning().is_ok(), "{}", instrument.key());
        }
    }

    #[test]
    fn every_tuning_note_has_a_frequency() {
        let notes = NoteCatalog::standard();
        for instrument in InstrumentCatalog::builtin().instruments() {
            for tuning in instrument.tunings() {
                for note in &tuning.notes {
                    assert!(
                        notes.frequency_of(note).is_some(),
                        "{}/{} uses {note}",
                        instrument.key(),
                        tuning.key
                    );
                }
            }
        }
    }

    #[test]
    fn unknown_tuning_is_a_mismatch() {
        let guitar = InstrumentCatalog::builtin().instrument("guitar").unwrap();
        let err = guitar.tuning("standard_c").unwrap_err();
        assert_eq!(
            err,
            TuningError::ConfigurationMismatch {
                instrument: "guitar".into(),
                tuning: "standard_c".into()
            }
        );
    }

    #[test]
    fn unknown_tuning_falls_back_to_default() {
        let (instrument, tuning) = InstrumentCatalog::builtin()
            .select("ukulele", "drop_d")
            .unwrap();
        assert_eq!(instrument.key(), "ukulele");
        assert_eq!(tuning.key, "standard_c");
        assert_eq!(tuning.target(0), Some("G4"));
    }

    #[test]
    fn unknown_instrument_is_an_error() {
        assert_eq!(
            InstrumentCatalog::builtin().select("theremin", "standard").unwrap_err(),
            TuningError::UnknownInstrument("theremin".into())
        );
    }

    #[test]
    fn resolution_catalog_covers_range_and_tuning() {
        let ukulele = InstrumentCatalog::builtin().instrument("ukulele").unwrap();

        let standard = ukulele.tuning("standard_c").unwrap();
        let catalog = ukulele
            .resolution_catalog(standard, NoteCatalog::standard())
            .unwrap();
        assert_eq!(catalog.notes().first().unwrap().name, "G3");
        assert_eq!(catalog.notes().last().unwrap().name, "C6");

        let bass = ukulele.tuning("bass").unwrap();
        let catalog = ukulele
            .resolution_catalog(bass, NoteCatalog::standard())
            .unwrap();
        assert_eq!(catalog.notes().first().unwrap().name, "E1");
        assert_eq!(catalog.notes().last().unwrap().name, "C6");
    }

    #[test]
    fn loads_catalog_from_json() {
        let json = r#"{
            "instruments": [{
                "key": "mandolin",
                "name": "Mandolin",
                "default_tuning": "standard",
                "range": { "low": "G3", "high": "A6" },
                "tunings": [
                    { "key": "standard", "name": "Standard (GDAE)", "notes": ["G3", "D4", "A4", "E5"] }
                ]
            }]
        }"#;
        let catalog = InstrumentCatalog::from_json_str(json).unwrap();
        let (_, tuning) = catalog.select("mandolin", "standard").unwrap();
        assert_eq!(tuning.len(), 4);
    }

    #[test]
    fn json_catalog_with_bad_default_is_rejected() {
        let json = r#"{
            "instruments": [{
                "key": "mandolin",
                "name": "Mandolin",
                "default_tuning": "missing",
                "range": { "low": "G3", "high": "A6" },
                "tunings": [
                    { "key": "standard", "name": "Standard", "notes": ["G3", "D4", "A4", "E5"] }
                ]
            }]
        }"#;
        assert!(InstrumentCatalog::from_json_str(json).is_err());
    }

    #[test]
    fn json_catalog_with_absurd_octave_is_rejected() {
        let json = r#"{
            "instruments": [{
                "key": "mandolin",
                "name": "Mandolin",
                "default_tuning": "standard",
                "range": { "low": "G3", "high": "A6" },
                "tunings": [
                    { "key": "standard", "name": "Standard", "notes": ["A300000000", "D4", "A4", "E5"] }
                ]
            }]
        }"#;
        assert!(InstrumentCatalog::from_json_str(json).is_err());
    }
}
