//! # Main Display Module
//!
//! This module contains the main display components and layout logic
//! for the tuner application.

use iced::widget::{Space, button, column, container, horizontal_space, pick_list, row, text};
use iced::{Alignment, Color, Element, Length};
use tuner_core::AnalysisResult;
use tuner_core::scale::TuningZone;

use super::tuning_meter::TuningMeter;
use crate::{AppDisplayData, Message};

/// Deviation, in cents, beyond which a tuning direction arrow lights up.
pub const DIRECTION_THRESHOLD_CENTS: i32 = 5;

const ARROW_LIT: Color = Color::from_rgb(0xff as f32 / 255.0, 0xd7 as f32 / 255.0, 0x00 as f32 / 255.0);
const ARROW_DIM: Color = Color::from_rgb(0x50 as f32 / 255.0, 0x50 as f32 / 255.0, 0x50 as f32 / 255.0);

/// Which way the string has to go to reach the target.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TuneDirection {
    /// Flat: tighten.
    Up,
    /// Sharp: loosen.
    Down,
}

/// Direction to tune in, or `None` within the threshold or without
/// deviation data.
pub fn tune_direction(cents: Option<i32>) -> Option<TuneDirection> {
    match cents? {
        c if c < -DIRECTION_THRESHOLD_CENTS => Some(TuneDirection::Up),
        c if c > DIRECTION_THRESHOLD_CENTS => Some(TuneDirection::Down),
        _ => None,
    }
}

/// Frequency readout; blank dashes rather than zero when there is no value.
pub fn format_hz(hz: Option<f32>) -> String {
    match hz {
        Some(hz) => format!("{hz:.2} Hz"),
        None => "-- Hz".to_string(),
    }
}

/// Creates the complete main application view
pub fn create_main_view(data: &AppDisplayData) -> Element<'static, Message> {
    let title = text("Tuner").size(28);

    let main_content = column![
        title,
        Space::with_height(10),
        create_selection_panel(data),
        create_target_panel(data),
        Space::with_height(10),
        create_meter_panel(data),
    ]
    .spacing(10)
    .padding(20)
    .width(Length::Fill);

    container(main_content)
        .width(Length::Fill)
        .height(Length::Fill)
        .into()
}

/// Instrument and tuning pick lists.
fn create_selection_panel(data: &AppDisplayData) -> Element<'static, Message> {
    let instrument_list = pick_list(
        data.instruments.clone(),
        data.selected_instrument.clone(),
        Message::InstrumentSelected,
    )
    .placeholder("Instrument")
    .width(Length::Fixed(200.0));

    let tuning_list = pick_list(
        data.tunings.clone(),
        data.selected_tuning.clone(),
        Message::TuningSelected,
    )
    .placeholder("Tuning")
    .width(Length::Fixed(260.0));

    row![
        text("Instrument").size(14),
        instrument_list,
        Space::with_width(20),
        text("Tuning").size(14),
        tuning_list,
    ]
    .spacing(10)
    .align_y(Alignment::Center)
    .into()
}

/// One button per tuning note; the selected target is highlighted.
fn create_target_panel(data: &AppDisplayData) -> Element<'static, Message> {
    let buttons = data
        .target_notes
        .iter()
        .enumerate()
        .fold(row![].spacing(8), |buttons, (index, note)| {
            let style = if index == data.target_index {
                button::primary
            } else {
                button::secondary
            };
            buttons.push(
                button(text(note.clone()).size(16))
                    .padding([6, 14])
                    .style(style)
                    .on_press(Message::TargetSelected(index)),
            )
        });

    column![text("String").size(14), buttons].spacing(5).into()
}

/// Readouts and the tuning arc for the latest result.
fn create_meter_panel(data: &AppDisplayData) -> Element<'static, Message> {
    let target_text = data
        .target_notes
        .get(data.target_index)
        .cloned()
        .unwrap_or_else(|| "--".to_string());

    let reading = data.last_analysis.as_ref().and_then(AnalysisResult::reading);
    let (note_text, freq_text, cents_text, expected_text, direction, zone) = match reading {
        Some(reading) => (
            reading.note_name.clone(),
            format_hz(Some(reading.frequency_hz)),
            reading
                .cents
                .map(|c| format!("{c:+} cents"))
                .unwrap_or_else(|| "--".to_string()),
            format!("{} ({target_text})", format_hz(reading.target_hz)),
            tune_direction(reading.cents),
            reading.zone.clone(),
        ),
        None => (
            "--".to_string(),
            format_hz(None),
            "--".to_string(),
            format!("{} ({target_text})", format_hz(None)),
            None,
            TuningZone::idle(&data.scale),
        ),
    };

    let status = if data.audio_worker_active {
        "Listening"
    } else {
        "No audio input"
    };

    let readout = row![
        column![text("Expected").size(14), text(expected_text).size(24)].spacing(5),
        Space::with_width(30),
        column![text("Detected").size(14), text(note_text).size(24)].spacing(5),
        Space::with_width(30),
        column![text("Frequency").size(14), text(freq_text).size(24)].spacing(5),
        Space::with_width(30),
        column![text("Deviation").size(14), text(cents_text).size(24)].spacing(5),
        horizontal_space(),
        text(status).size(14),
    ]
    .align_y(Alignment::Start);

    container(
        column![
            readout,
            Space::with_height(10),
            create_direction_row(direction),
            TuningMeter::new(zone).view(),
        ]
        .spacing(5)
        .padding(15),
    )
    .width(Length::Fill)
    .into()
}

/// Flat and sharp arrows; the one pointing the way to tune is lit.
fn create_direction_row(direction: Option<TuneDirection>) -> Element<'static, Message> {
    let color = |lit: bool| if lit { ARROW_LIT } else { ARROW_DIM };
    row![
        text("\u{25B2} tune up").size(18).color(color(direction == Some(TuneDirection::Up))),
        horizontal_space(),
        text("tune down \u{25BC}").size(18).color(color(direction == Some(TuneDirection::Down))),
    ]
    .into()
}
