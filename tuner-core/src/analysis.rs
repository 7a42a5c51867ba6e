//! # Analysis Loop Module
//!
//! Runs the per-frame pipeline: pitch estimation, note resolution, cents
//! deviation and scale mapping. An [`AnalysisSession`] owns the only state
//! that lives across frames (the target selection and the last published
//! result); [`run_analysis_loop`] drives a session from channels, and
//! [`AnalysisWorker`] puts that loop on its own thread.

use crossbeam_channel::{Receiver, Sender};
use std::sync::Arc;
use std::thread::{self, JoinHandle};

use crate::config::TunerConfig;
use crate::error::TuningError;
use crate::instruments::Tuning;
use crate::pitch::{AutocorrelationEstimator, PitchEstimate};
use crate::scale::{self, TuningZone};
use crate::tuning::{DeviationResult, NoteCatalog};
use crate::AudioFrame;

/// Frames buffered between the capture callback and the analysis thread.
pub const FRAME_QUEUE_DEPTH: usize = 8;

/// Everything a display needs for one pitched frame.
#[derive(Debug, Clone, PartialEq)]
pub struct TunerReading {
    /// Estimated fundamental in Hz.
    pub frequency_hz: f32,
    /// Catalog note nearest to the estimate.
    pub note_name: String,
    /// Currently selected target note, if any.
    pub target_note: Option<String>,
    /// Target frequency, when the target is in the catalog.
    pub target_hz: Option<f32>,
    /// Cents from the target. `None` when there is no valid target, which is
    /// not the same as 0 cents.
    pub cents: Option<i32>,
    pub in_tune: bool,
    pub zone: TuningZone,
}

/// Per-cycle output of the pipeline.
#[derive(Debug, Clone, PartialEq)]
pub enum AnalysisResult {
    /// Too quiet or no clear period. Displays should blank, not hold.
    NoSignal,
    Reading(TunerReading),
}

impl AnalysisResult {
    pub fn reading(&self) -> Option<&TunerReading> {
        match self {
            AnalysisResult::Reading(reading) => Some(reading),
            AnalysisResult::NoSignal => None,
        }
    }
}

/// Messages accepted by a running loop between frames.
#[derive(Debug, Clone)]
pub enum SessionCommand {
    SelectTarget(usize),
    ChangeTuning {
        tuning: Tuning,
        catalog: Arc<NoteCatalog>,
    },
}

/// Pipeline state for one instrument.
///
/// Independent sessions never share a target selection.
#[derive(Debug)]
pub struct AnalysisSession {
    catalog: Arc<NoteCatalog>,
    tuning: Tuning,
    target_index: usize,
    config: TunerConfig,
    estimator: AutocorrelationEstimator,
    last: Option<AnalysisResult>,
}

impl AnalysisSession {
    /// Creates a session targeting the first note of `tuning`.
    pub fn new(catalog: Arc<NoteCatalog>, tuning: Tuning, config: TunerConfig) -> Self {
        let estimator = AutocorrelationEstimator::new(config.pitch.clone());
        Self {
            catalog,
            tuning,
            target_index: 0,
            config,
            estimator,
            last: None,
        }
    }

    pub fn tuning(&self) -> &Tuning {
        &self.tuning
    }

    pub fn target_index(&self) -> usize {
        self.target_index
    }

    pub fn target_note(&self) -> Option<&str> {
        self.tuning.target(self.target_index)
    }

    /// Selects the string to tune. An index past the end of the tuning is
    /// rejected and the previous selection kept.
    pub fn select_target(&mut self, index: usize) -> Result<(), TuningError> {
        if index >= self.tuning.len() {
            return Err(TuningError::InvalidTarget(format!(
                "string {} of {} in `{}`",
                index + 1,
                self.tuning.len(),
                self.tuning.key
            )));
        }
        self.target_index = index;
        self.last = None;
        log::debug!("Target set to {:?}", self.target_note());
        Ok(())
    }

    /// Swaps in another tuning and its resolution catalog; targets the first
    /// string again.
    pub fn change_tuning(&mut self, tuning: Tuning, catalog: Arc<NoteCatalog>) {
        log::info!("Tuning changed to `{}`", tuning.key);
        self.tuning = tuning;
        self.catalog = catalog;
        self.target_index = 0;
        self.last = None;
    }

    fn apply(&mut self, command: SessionCommand) {
        match command {
            SessionCommand::SelectTarget(index) => {
                if let Err(e) = self.select_target(index) {
                    log::warn!("Ignoring target selection: {e}");
                }
            }
            SessionCommand::ChangeTuning { tuning, catalog } => {
                self.change_tuning(tuning, catalog)
            }
        }
    }

    /// Runs the full pipeline on one frame.
    pub fn analyze(&mut self, frame: &AudioFrame) -> AnalysisResult {
        let frequency = match self.estimator.estimate(&frame.samples, frame.sample_rate) {
            PitchEstimate::Frequency(hz) => hz,
            PitchEstimate::NoSignal => return AnalysisResult::NoSignal,
        };

        let Some(note) = self.catalog.nearest(frequency) else {
            return AnalysisResult::NoSignal;
        };
        let note_name = note.name.clone();

        let target_note = self.target_note().map(str::to_string);
        let target_hz = target_note
            .as_deref()
            .and_then(|name| self.catalog.frequency_of(name));

        let scale_config = &self.config.scale;
        let deviation = match target_hz {
            Some(hz) => DeviationResult::measure(frequency, hz, scale_config.in_tune_tolerance_hz),
            None => Err(TuningError::InvalidTarget(format!(
                "{:?} is not in the note catalog",
                target_note
            ))),
        };

        let (cents, in_tune, zone) = match deviation {
            Ok(deviation) => {
                // Compare canonical spellings so a flat-spelled target still glows.
                let target_name = target_note
                    .as_deref()
                    .and_then(crate::tuning::normalize_note_name)
                    .unwrap_or_default();
                let zone = scale::map_to_zone(
                    deviation.detected_hz,
                    deviation.target_hz,
                    deviation.cents,
                    &note_name,
                    &target_name,
                    scale_config,
                );
                (Some(deviation.cents), deviation.in_tune, zone)
            }
            Err(e) => {
                log::debug!("No deviation for this frame: {e}");
                (None, false, TuningZone::idle(scale_config))
            }
        };

        log::debug!(
            "{:.2} Hz -> {} ({:?} cents, target {:?})",
            frequency,
            note_name,
            cents,
            target_note
        );

        AnalysisResult::Reading(TunerReading {
            frequency_hz: frequency,
            note_name,
            target_note,
            target_hz,
            cents,
            in_tune,
            zone,
        })
    }

    /// Like [`analyze`](Self::analyze), but returns `None` when the result is
    /// identical to the last one published.
    pub fn process(&mut self, frame: &AudioFrame) -> Option<AnalysisResult> {
        let result = self.analyze(frame);
        if self.last.as_ref() == Some(&result) {
            return None;
        }
        self.last = Some(result.clone());
        Some(result)
    }
}

/// Drives `session` until shutdown.
///
/// Frames are processed one at a time in arrival order. Commands are applied
/// between frames. The loop ends when a shutdown message arrives, when the
/// frame or shutdown channel closes, or when nobody listens for results.
/// Returns the session so a caller can restart it.
pub fn run_analysis_loop(
    mut session: AnalysisSession,
    frames: Receiver<AudioFrame>,
    commands: Receiver<SessionCommand>,
    shutdown: Receiver<()>,
    results: Sender<AnalysisResult>,
) -> AnalysisSession {
    log::debug!("Entering analysis loop");
    let never = crossbeam_channel::never();
    let mut commands_open = true;
    loop {
        let command_rx = if commands_open { &commands } else { &never };
        crossbeam_channel::select! {
            recv(shutdown) -> _ => {
                log::debug!("Analysis loop received shutdown signal");
                break;
            },
            recv(command_rx) -> msg => match msg {
                Ok(command) => session.apply(command),
                // Nobody can steer the session any more; keep analysing.
                Err(_) => commands_open = false,
            },
            recv(frames) -> msg => match msg {
                Ok(frame) => {
                    if let Some(result) = session.process(&frame) {
                        if results.send(result).is_err() {
                            log::debug!("Result receiver dropped");
                            break;
                        }
                    }
                }
                Err(_) => {
                    log::debug!("Frame channel closed");
                    break;
                }
            },
        }
    }
    session
}

/// An analysis loop on a dedicated thread.
#[derive(Debug)]
pub struct AnalysisWorker {
    commands: Sender<SessionCommand>,
    shutdown: Sender<()>,
    results: Receiver<AnalysisResult>,
    thread_handle: Option<JoinHandle<()>>,
}

impl AnalysisWorker {
    /// Spawns the loop fed by an existing frame channel.
    pub fn spawn(session: AnalysisSession, frames: Receiver<AudioFrame>) -> Self {
        Self::spawn_inner(session, move || Ok((frames, ())))
    }

    /// Spawns the loop and starts its frame source on the worker thread.
    ///
    /// `start_source` receives the sending half of a bounded frame queue and
    /// returns a guard that keeps the source alive (for a capture device, the
    /// open stream). The guard is dropped after the loop ends, so sources
    /// that cannot cross threads still work.
    pub fn spawn_with_source<F, G>(session: AnalysisSession, start_source: F) -> Self
    where
        F: FnOnce(Sender<AudioFrame>) -> anyhow::Result<G> + Send + 'static,
    {
        Self::spawn_inner(session, move || {
            let (frame_tx, frame_rx) = crossbeam_channel::bounded(FRAME_QUEUE_DEPTH);
            let guard = start_source(frame_tx)?;
            Ok((frame_rx, guard))
        })
    }

    fn spawn_inner<S, G>(session: AnalysisSession, setup: S) -> Self
    where
        S: FnOnce() -> anyhow::Result<(Receiver<AudioFrame>, G)> + Send + 'static,
    {
        let (command_tx, command_rx) = crossbeam_channel::unbounded();
        let (shutdown_tx, shutdown_rx) = crossbeam_channel::bounded(1);
        let (result_tx, result_rx) = crossbeam_channel::unbounded();

        let thread_handle = thread::spawn(move || {
            log::debug!("Analysis worker starting");
            let (frame_rx, guard) = match setup() {
                Ok(pair) => pair,
                Err(e) => {
                    log::error!("Failed to start frame source: {e:#}");
                    return;
                }
            };

            run_analysis_loop(session, frame_rx, command_rx, shutdown_rx, result_tx);
            drop(guard);
            log::debug!("Analysis worker finished");
        });

        Self {
            commands: command_tx,
            shutdown: shutdown_tx,
            results: result_rx,
            thread_handle: Some(thread_handle),
        }
    }

    pub fn select_target(&self, index: usize) {
        let _ = self.commands.send(SessionCommand::SelectTarget(index));
    }

    pub fn change_tuning(&self, tuning: Tuning, catalog: Arc<NoteCatalog>) {
        let _ = self
            .commands
            .send(SessionCommand::ChangeTuning { tuning, catalog });
    }

    /// Every result published since the last call, oldest first.
    pub fn try_results(&self) -> Vec<AnalysisResult> {
        self.results.try_iter().collect()
    }

    pub fn results(&self) -> &Receiver<AnalysisResult> {
        &self.results
    }

    /// False once the thread has exited, e.g. because the source failed.
    pub fn is_running(&self) -> bool {
        self.thread_handle
            .as_ref()
            .is_some_and(|handle| !handle.is_finished())
    }

    /// Signals the loop to stop and waits for the thread.
    pub fn stop(mut self) {
        self.shutdown_and_join();
    }

    fn shutdown_and_join(&mut self) {
        let _ = self.shutdown.try_send(());
        if let Some(handle) = self.thread_handle.take() {
            if handle.join().is_err() {
                log::error!("Analysis worker panicked");
            }
        }
    }
}

impl Drop for AnalysisWorker {
    fn drop(&mut self) {
        self.shutdown_and_join();
    }
}
