//! # Tuning Scale Module
//!
//! Maps a deviation onto the segmented tuning arc.
//!
//! The arc has an odd number of segments so that a true centre exists. The
//! pointer position comes from the cents offset (clamped to the configured
//! span); the in-tune decision is an absolute Hz tolerance. Those two units
//! are fixed here and nowhere else.

use serde::{Deserialize, Serialize};

/// Scale geometry and the in-tune tolerance.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ScaleConfig {
    /// Number of segments on the arc. Must be odd and at least 3.
    pub segments: usize,
    /// Half-span of the arc in cents; offsets beyond it pin to the ends.
    pub span_cents: f32,
    /// Segments on either side of centre that form the near band.
    pub near_band: usize,
    /// Largest absolute Hz difference still counted as in tune.
    pub in_tune_tolerance_hz: f32,
}

impl Default for ScaleConfig {
    fn default() -> Self {
        Self {
            segments: 21,
            span_cents: 50.0,
            near_band: 2,
            in_tune_tolerance_hz: 1.0,
        }
    }
}

impl ScaleConfig {
    pub fn center(&self) -> usize {
        self.segments / 2
    }
}

/// Colour class of a segment.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum ZoneClass {
    Flat,
    Near,
    InTune,
    Sharp,
}

/// How strongly a segment is drawn.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Emphasis {
    /// The segment the reading points at.
    Pointer,
    Normal,
    /// Background segment while the centre is lit for an in-tune reading.
    Dimmed,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct SegmentState {
    pub class: ZoneClass,
    pub emphasis: Emphasis,
}

/// Discretized position of one reading on the arc.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TuningZone {
    /// Segment the cents offset maps to, always in `[0, segments - 1]`.
    pub segment_index: usize,
    /// Class of the highlighted segment.
    pub class: ZoneClass,
    /// In tune and the resolved note is the target note.
    pub glow: bool,
    pub in_tune: bool,
    /// Every segment, left (flat) to right (sharp).
    pub segments: Vec<SegmentState>,
}

impl TuningZone {
    /// The arc with nothing to show: pointer at centre, no glow.
    pub fn idle(config: &ScaleConfig) -> Self {
        let center = config.center();
        let segments = (0..config.segments)
            .map(|i| SegmentState {
                class: positional_class(i, config),
                emphasis: Emphasis::Normal,
            })
            .collect();
        Self {
            segment_index: center,
            class: ZoneClass::Near,
            glow: false,
            in_tune: false,
            segments,
        }
    }

    /// Index of the segment drawn as the pointer.
    pub fn pointer_index(&self) -> Option<usize> {
        self.segments
            .iter()
            .position(|s| s.emphasis == Emphasis::Pointer)
    }
}

/// Maps one deviation onto the arc.
///
/// # Arguments
/// * `detected_hz` / `target_hz` - Frequencies for the in-tune decision
/// * `cents` - Signed cents offset, drives the pointer position
/// * `resolved_note` / `target_note` - Names compared for the glow signal
/// * `config` - Scale geometry and tolerance
///
/// A non-positive or non-finite target yields a zone that is never in tune
/// and never glows.
pub fn map_to_zone(
    detected_hz: f32,
    target_hz: f32,
    cents: i32,
    resolved_note: &str,
    target_note: &str,
    config: &ScaleConfig,
) -> TuningZone {
    let segments = config.segments.max(1);
    let center = segments / 2;

    let target_valid = target_hz.is_finite() && target_hz > 0.0;
    let hz_offset = detected_hz - target_hz;
    let in_tune = target_valid
        && hz_offset.is_finite()
        && hz_offset.abs() <= config.in_tune_tolerance_hz;

    let segment_index = segment_for_cents(cents as f32, config);

    let sharp = if cents != 0 { cents > 0 } else { hz_offset > 0.0 };
    let pointer_class = if sharp { ZoneClass::Sharp } else { ZoneClass::Flat };

    let states = (0..segments)
        .map(|i| {
            if in_tune {
                if i == center {
                    SegmentState {
                        class: ZoneClass::InTune,
                        emphasis: Emphasis::Pointer,
                    }
                } else {
                    SegmentState {
                        class: positional_class(i, config),
                        emphasis: Emphasis::Dimmed,
                    }
                }
            } else if i == segment_index {
                SegmentState {
                    class: pointer_class,
                    emphasis: Emphasis::Pointer,
                }
            } else {
                SegmentState {
                    class: positional_class(i, config),
                    emphasis: Emphasis::Normal,
                }
            }
        })
        .collect();

    TuningZone {
        segment_index,
        class: if in_tune { ZoneClass::InTune } else { pointer_class },
        glow: in_tune && resolved_note == target_note,
        in_tune,
        segments: states,
    }
}

/// Linear map of a cents offset onto `[0, segments - 1]`.
pub fn segment_for_cents(cents: f32, config: &ScaleConfig) -> usize {
    let last = config.segments.saturating_sub(1);
    let span = config.span_cents;
    if !(span > 0.0) || !cents.is_finite() {
        return config.segments / 2;
    }
    let clamped = cents.clamp(-span, span);
    let index = ((clamped + span) * last as f32 / (2.0 * span)).round();
    (index.max(0.0) as usize).min(last)
}

/// Class a segment has by position alone.
fn positional_class(index: usize, config: &ScaleConfig) -> ZoneClass {
    let center = config.center();
    if index + config.near_band < center {
        ZoneClass::Flat
    } else if index > center + config.near_band {
        ZoneClass::Sharp
    } else {
        ZoneClass::Near
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn zone(detected: f32, target: f32, resolved: &str, wanted: &str) -> TuningZone {
        let cents = crate::tuning::cents_deviation(detected, target);
        map_to_zone(detected, target, cents, resolved, wanted, &ScaleConfig::default())
    }

    #[test]
    fn zero_offset_points_at_center() {
        let config = ScaleConfig::default();
        assert_eq!(segment_for_cents(0.0, &config), 10);
        assert_eq!(segment_for_cents(-50.0, &config), 0);
        assert_eq!(segment_for_cents(50.0, &config), 20);
        assert_eq!(segment_for_cents(25.0, &config), 15);
    }

    #[test]
    fn far_offsets_stay_in_bounds() {
        let config = ScaleConfig::default();
        for cents in [-100_000.0, -51.0, 51.0, 1200.0, f32::MAX, f32::MIN] {
            let index = segment_for_cents(cents, &config);
            assert!(index < config.segments, "{cents} mapped to {index}");
        }
        assert_eq!(segment_for_cents(-1200.0, &config), 0);
        assert_eq!(segment_for_cents(1200.0, &config), 20);
    }

    #[test]
    fn in_tune_uses_hz_tolerance() {
        assert!(zone(440.5, 440.0, "A4", "A4").in_tune);
        assert!(!zone(442.0, 440.0, "A4", "A4").in_tune);
    }

    #[test]
    fn in_tune_lights_center_and_dims_the_rest() {
        let z = zone(440.5, 440.0, "A4", "A4");
        assert_eq!(z.class, ZoneClass::InTune);
        assert_eq!(z.pointer_index(), Some(10));
        assert_eq!(z.segments[10].class, ZoneClass::InTune);
        assert!(
            z.segments
                .iter()
                .enumerate()
                .filter(|(i, _)| *i != 10)
                .all(|(_, s)| s.emphasis == Emphasis::Dimmed)
        );
        assert!(z.glow);
    }

    #[test]
    fn sharp_reading_colors_pointer_sharp() {
        let z = zone(445.0, 440.0, "A4", "A4");
        assert!(!z.in_tune);
        assert_eq!(z.class, ZoneClass::Sharp);
        assert_eq!(z.segment_index, 14); // 20 cents
        assert_eq!(z.pointer_index(), Some(14));
        assert_eq!(z.segments[14].class, ZoneClass::Sharp);
    }

    #[test]
    fn flat_reading_inside_near_band_colors_pointer_flat() {
        let z = zone(436.0, 440.0, "A4", "A4");
        assert_eq!(z.class, ZoneClass::Flat);
        assert_eq!(z.segment_index, 7); // -16 cents
        assert_eq!(z.segments[7].class, ZoneClass::Flat);
        assert_eq!(z.segments[8].class, ZoneClass::Near);
    }

    #[test]
    fn positional_bands() {
        let z = zone(445.0, 440.0, "A4", "A4");
        for (i, s) in z.segments.iter().enumerate() {
            if i == z.segment_index {
                continue;
            }
            let expected = match i {
                0..=7 => ZoneClass::Flat,
                8..=12 => ZoneClass::Near,
                _ => ZoneClass::Sharp,
            };
            assert_eq!(s.class, expected, "segment {i}");
            assert_eq!(s.emphasis, Emphasis::Normal);
        }
    }

    #[test]
    fn glow_requires_matching_note() {
        // Pitch within tolerance but resolved to a different name.
        let z = zone(440.5, 440.0, "A3", "A4");
        assert!(z.in_tune);
        assert!(!z.glow);
    }

    #[test]
    fn invalid_target_is_never_in_tune() {
        let config = ScaleConfig::default();
        let z = map_to_zone(0.5, 0.0, 0, "A0", "A0", &config);
        assert!(!z.in_tune);
        assert!(!z.glow);
        assert!(z.segment_index < config.segments);
    }

    #[test]
    fn zero_cents_out_of_tolerance_uses_hz_sign() {
        // At high pitch 1 cent is more than 1 Hz.
        let config = ScaleConfig::default();
        let z = map_to_zone(2094.2, 2093.0, 0, "C7", "C7", &config);
        assert!(!z.in_tune);
        assert_eq!(z.class, ZoneClass::Sharp);
        assert_eq!(z.segment_index, 10);
    }

    #[test]
    fn mapping_is_idempotent() {
        let a = zone(447.3, 440.0, "A4", "A4");
        let b = zone(447.3, 440.0, "A4", "A4");
        assert_eq!(a, b);
    }

    #[test]
    fn idle_zone_has_no_pointer() {
        let z = TuningZone::idle(&ScaleConfig::default());
        assert_eq!(z.segment_index, 10);
        assert_eq!(z.pointer_index(), None);
        assert!(!z.glow);
        assert_eq!(z.segments.len(), 21);
    }
}
