//! # Tuner - Real-time Instrument Tuner GUI
//!
//! This module contains the main GUI application for the string instrument tuner.
//! It lets the user pick an instrument, a tuning and the string to tune, and
//! draws every analysis result as a segmented tuning arc.
//!
//! ## Architecture
//! - **Main Thread**: Iced GUI application with dark theme
//! - **Analysis Thread**: `tuner_core::AnalysisWorker`, which also owns the capture stream
//! - **Communication**: Crossbeam channels inside the worker; the GUI polls results
//! - **Updates**: 60 FPS continuous updates via subscription system

mod ui;

use anyhow::Context;
use iced::{Element, Subscription, Theme};
use std::fmt;
use std::sync::Arc;
use tuner_core::analysis::AnalysisWorker;
use tuner_core::config::TunerConfig;
use tuner_core::instruments::{InstrumentCatalog, Tuning};
use tuner_core::scale::ScaleConfig;
use tuner_core::tuning::NoteCatalog;
use tuner_core::{AnalysisResult, AnalysisSession, audio};
use ui::main_display::create_main_view;

/// Config file looked up in the working directory.
const CONFIG_PATH: &str = "tuner_config.json";
/// Instrument shown at start-up.
const DEFAULT_INSTRUMENT: &str = "guitar";

/// Main entry point for the tuner application.
///
/// Installs the logger (level from `RUST_LOG`) and starts the Iced
/// application with dark theme and continuous updates.
pub fn main() -> iced::Result {
    env_logger::init();
    log::info!("Starting tuner application");
    let result = iced::application("Tuner", TunerApp::update, TunerApp::view)
        .subscription(TunerApp::subscription)
        .theme(TunerApp::theme)
        .run();
    log::info!("Application finished with result: {:?}", result);
    result
}

/// Application message types for the Iced GUI framework.
#[derive(Debug, Clone)]
pub enum Message {
    InstrumentSelected(Choice),
    TuningSelected(Choice),
    /// User clicked the button of a tuning note (string index).
    TargetSelected(usize),

    // Continuous update message
    Tick,
}

/// An entry of a pick list: catalog key plus the label shown to the user.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Choice {
    pub key: String,
    pub label: String,
}

impl Choice {
    fn new(key: &str, label: &str) -> Self {
        Self {
            key: key.to_string(),
            label: label.to_string(),
        }
    }
}

impl fmt::Display for Choice {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.label)
    }
}

/// UI-specific data needed for rendering the interface.
///
/// This struct contains only the data that the UI components need
#[derive(Debug, Clone)]
pub struct AppDisplayData {
    // Audio state
    pub audio_worker_active: bool,
    pub last_analysis: Option<AnalysisResult>,

    // Selection state
    pub instruments: Vec<Choice>,
    pub selected_instrument: Option<Choice>,
    pub tunings: Vec<Choice>,
    pub selected_tuning: Option<Choice>,
    pub target_notes: Vec<String>,
    pub target_index: usize,

    /// Arc geometry, for drawing before the first reading arrives.
    pub scale: ScaleConfig,
}

/// Main application state for the tuner.
#[derive(Debug)]
struct TunerApp {
    catalog: &'static InstrumentCatalog,
    worker: Option<AnalysisWorker>,

    // Single source of truth for all display data
    display_data: AppDisplayData,
}

impl Default for TunerApp {
    /// Creates a new TunerApp with the default instrument selected and the
    /// analysis worker running.
    fn default() -> Self {
        let config = TunerConfig::load_or_default(CONFIG_PATH).unwrap_or_else(|e| {
            log::error!("{e:#}; falling back to default configuration");
            TunerConfig::default()
        });
        let catalog = InstrumentCatalog::builtin();

        let instruments = catalog
            .instruments()
            .iter()
            .map(|i| Choice::new(i.key(), i.name()))
            .collect();

        let mut app = Self {
            catalog,
            worker: None,
            display_data: AppDisplayData {
                audio_worker_active: false, // Will be set to true after audio starts
                last_analysis: None,
                instruments,
                selected_instrument: None,
                tunings: Vec::new(),
                selected_tuning: None,
                target_notes: Vec::new(),
                target_index: 0,
                scale: config.scale.clone(),
            },
        };

        match app.select(DEFAULT_INSTRUMENT, None) {
            Ok((tuning, note_catalog)) => app.start_analysis(config, tuning, note_catalog),
            Err(e) => log::error!("{e:#}"),
        }
        app
    }
}

impl TunerApp {
    /// Starts the analysis worker; the capture stream is opened on the
    /// worker thread and lives as long as the worker.
    fn start_analysis(&mut self, config: TunerConfig, tuning: Tuning, catalog: Arc<NoteCatalog>) {
        let frame_size = config.frame_size;
        let sample_rate = config.sample_rate;
        let session = AnalysisSession::new(catalog, tuning, config);

        let worker = AnalysisWorker::spawn_with_source(session, move |frames| {
            audio::start_audio_capture(frames, frame_size, sample_rate)
        });
        self.worker = Some(worker);
        self.display_data.audio_worker_active = true;
    }

    /// Resolves an instrument/tuning pair and updates the selection lists.
    ///
    /// Without a tuning key the instrument's default tuning is selected.
    fn select(
        &mut self,
        instrument_key: &str,
        tuning_key: Option<&str>,
    ) -> anyhow::Result<(Tuning, Arc<NoteCatalog>)> {
        let catalog = self.catalog;
        let (instrument, tuning) = match tuning_key {
            Some(key) => catalog.select(instrument_key, key),
            None => catalog
                .instrument(instrument_key)
                .and_then(|i| Ok((i, i.default_tuning()?))),
        }
        .with_context(|| format!("Cannot select `{instrument_key}`"))?;
        let note_catalog = instrument
            .resolution_catalog(tuning, NoteCatalog::standard())
            .with_context(|| format!("Cannot build note table for `{}`", tuning.key))?;

        let data = &mut self.display_data;
        data.selected_instrument = Some(Choice::new(instrument.key(), instrument.name()));
        data.tunings = instrument
            .tunings()
            .iter()
            .map(|t| Choice::new(&t.key, &t.name))
            .collect();
        data.selected_tuning = Some(Choice::new(&tuning.key, &tuning.name));
        data.target_notes = tuning.notes.clone();
        data.target_index = 0;
        data.last_analysis = None;

        Ok((tuning.clone(), Arc::new(note_catalog)))
    }

    /// Applies a new selection and forwards it to the worker.
    fn change_selection(&mut self, instrument_key: &str, tuning_key: Option<&str>) {
        match self.select(instrument_key, tuning_key) {
            Ok((tuning, catalog)) => {
                if let Some(worker) = &self.worker {
                    worker.change_tuning(tuning, catalog);
                }
            }
            Err(e) => log::warn!("{e:#}"),
        }
    }

    /// Handles application state updates based on incoming messages.
    fn update(&mut self, message: Message) {
        match message {
            Message::InstrumentSelected(choice) => {
                log::debug!("Instrument selected: {}", choice.key);
                self.change_selection(&choice.key, None);
            }
            Message::TuningSelected(choice) => {
                let Some(instrument) = self.display_data.selected_instrument.clone() else {
                    return;
                };
                log::debug!("Tuning selected: {}", choice.key);
                self.change_selection(&instrument.key, Some(&choice.key));
            }
            Message::TargetSelected(index) => {
                if index >= self.display_data.target_notes.len() {
                    return;
                }
                self.display_data.target_index = index;
                self.display_data.last_analysis = None;
                if let Some(worker) = &self.worker {
                    worker.select_target(index);
                }
            }
            Message::Tick => {
                let Some(worker) = &self.worker else {
                    return;
                };
                // Only the newest result for the current target is drawn
                let data = &mut self.display_data;
                let target = data.target_notes.get(data.target_index).map(String::as_str);
                if let Some(result) = worker
                    .try_results()
                    .into_iter()
                    .rev()
                    .find(|result| is_for_target(result, target))
                {
                    data.last_analysis = Some(result);
                }
                if self.display_data.audio_worker_active && !worker.is_running() {
                    log::warn!("Analysis worker stopped; no audio input");
                    self.display_data.audio_worker_active = false;
                }
            }
        }
    }

    /// Renders the main application interface.
    ///
    /// Delegates all UI rendering to the main_display module,
    /// keeping this function focused on application logic only.
    fn view(&self) -> Element<'_, Message> {
        create_main_view(&self.display_data)
    }

    /// Creates a subscription for continuous application updates.
    ///
    /// Returns a timer subscription that fires every 16ms (60 FPS) so new
    /// readings are picked up promptly.
    fn subscription(&self) -> Subscription<Message> {
        iced::time::every(std::time::Duration::from_millis(16)).map(|_| Message::Tick)
    }

    fn theme(&self) -> Theme {
        Theme::Dark
    }
}

/// False for a reading computed against another target, e.g. one queued
/// before the user switched strings.
fn is_for_target(result: &AnalysisResult, target: Option<&str>) -> bool {
    match result.reading() {
        Some(reading) => reading.target_note.as_deref() == target,
        None => true,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tuner_core::TunerReading;
    use tuner_core::scale::TuningZone;

    fn reading_for(target: &str) -> AnalysisResult {
        AnalysisResult::Reading(TunerReading {
            frequency_hz: 110.0,
            note_name: "A2".to_string(),
            target_note: Some(target.to_string()),
            target_hz: Some(110.0),
            cents: Some(0),
            in_tune: true,
            zone: TuningZone::idle(&ScaleConfig::default()),
        })
    }

    #[test]
    fn stale_readings_for_a_previous_target_are_skipped() {
        assert!(is_for_target(&reading_for("A2"), Some("A2")));
        assert!(!is_for_target(&reading_for("E2"), Some("A2")));
        assert!(!is_for_target(&reading_for("A2"), None));
    }

    #[test]
    fn silence_is_never_stale() {
        assert!(is_for_target(&AnalysisResult::NoSignal, Some("A2")));
        assert!(is_for_target(&AnalysisResult::NoSignal, None));
    }
}
