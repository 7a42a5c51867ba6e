//! # Tuning Meter Widget
//!
//! Draws a [`TuningZone`] as a segmented arc: flat segments on the left,
//! sharp segments on the right, the in-tune segment at the top.
//!
//! ## Features
//! - One bar per segment, coloured by zone class
//! - Pointer segment drawn longer and fully opaque
//! - Green outline while the reading glows (in tune on the target note)

use iced::widget::canvas::{self, Geometry, LineCap, Path, Stroke, path};
use iced::widget::container;
use iced::{Color, Element, Point, Radians, Rectangle, Renderer, Theme, mouse};
use tuner_core::scale::{Emphasis, SegmentState, TuningZone, ZoneClass};

/// Angle covered by the arc, in radians (120 degrees).
const ARC_SWEEP: f32 = 2.0 * std::f32::consts::PI / 3.0;

const FLAT_COLOR: Color = Color::from_rgb(0x00 as f32 / 255.0, 0x95 as f32 / 255.0, 0xff as f32 / 255.0);
const NEAR_COLOR: Color = Color::from_rgb(0xff as f32 / 255.0, 0xd7 as f32 / 255.0, 0x00 as f32 / 255.0);
const IN_TUNE_COLOR: Color = Color::from_rgb(0x00 as f32 / 255.0, 0xff as f32 / 255.0, 0x00 as f32 / 255.0);
const SHARP_COLOR: Color = Color::from_rgb(0xff as f32 / 255.0, 0x3b as f32 / 255.0, 0x3b as f32 / 255.0);

/// Segmented tuning arc.
pub struct TuningMeter {
    zone: TuningZone,
}

impl TuningMeter {
    pub fn new(zone: TuningZone) -> Self {
        Self { zone }
    }

    pub fn view(self) -> Element<'static, crate::Message> {
        container(
            canvas::Canvas::new(self)
                .width(iced::Length::Fill)
                .height(iced::Length::Fixed(220.0)),
        )
        .into()
    }
}

/// Fill colour of one segment, with the emphasis applied as opacity.
pub fn segment_color(segment: SegmentState) -> Color {
    let base = match segment.class {
        ZoneClass::Flat => FLAT_COLOR,
        ZoneClass::Near => NEAR_COLOR,
        ZoneClass::InTune => IN_TUNE_COLOR,
        ZoneClass::Sharp => SHARP_COLOR,
    };
    let alpha = match segment.emphasis {
        Emphasis::Pointer => 1.0,
        Emphasis::Normal => 0.7,
        Emphasis::Dimmed => 0.25,
    };
    Color { a: alpha, ..base }
}

/// Screen angle of the centre of segment `index` out of `count`.
///
/// Segment 0 sits at the left end of the arc; the middle segment points
/// straight up.
fn segment_angle(index: usize, count: usize) -> f32 {
    let step = ARC_SWEEP / count.max(1) as f32;
    let start = -std::f32::consts::FRAC_PI_2 - ARC_SWEEP / 2.0;
    start + step * (index as f32 + 0.5)
}

impl<Message> canvas::Program<Message> for TuningMeter {
    type State = ();

    fn draw(
        &self,
        _state: &Self::State,
        renderer: &Renderer,
        _theme: &Theme,
        bounds: Rectangle,
        _cursor: mouse::Cursor,
    ) -> Vec<Geometry> {
        let mut frame = canvas::Frame::new(renderer, bounds.size());

        let center = Point::new(bounds.width / 2.0, bounds.height * 0.9);
        let radius = (bounds.width / 2.0).min(bounds.height * 0.85);
        let count = self.zone.segments.len();
        let bar_width = (radius * ARC_SWEEP / count.max(1) as f32 * 0.6).max(2.0);

        for (i, segment) in self.zone.segments.iter().enumerate() {
            let angle = segment_angle(i, count);
            let (inner, outer) = match segment.emphasis {
                Emphasis::Pointer => (radius * 0.55, radius),
                _ => (radius * 0.7, radius * 0.9),
            };
            let (sin, cos) = angle.sin_cos();
            let bar = Path::line(
                Point::new(center.x + inner * cos, center.y + inner * sin),
                Point::new(center.x + outer * cos, center.y + outer * sin),
            );
            frame.stroke(
                &bar,
                Stroke::default()
                    .with_width(bar_width)
                    .with_color(segment_color(*segment))
                    .with_line_cap(LineCap::Round),
            );
        }

        if self.zone.glow {
            let start = segment_angle(0, count) - 0.1;
            let end = segment_angle(count.saturating_sub(1), count) + 0.1;
            let outline = Path::new(|builder| {
                builder.arc(path::Arc {
                    center,
                    radius: radius * 1.05,
                    start_angle: Radians(start),
                    end_angle: Radians(end),
                });
            });
            frame.stroke(
                &outline,
                Stroke::default()
                    .with_width(4.0)
                    .with_color(IN_TUNE_COLOR),
            );
        }

        vec![frame.into_geometry()]
    }
}
