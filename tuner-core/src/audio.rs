//! # Audio Capture Module
//!
//! Feeds the analysis loop from the default input device using CPAL.
//! The capture callback only downmixes and chunks samples into fixed-size
//! [`AudioFrame`]s; all analysis happens on the receiving side of the
//! channel.
//!
//! ## Features
//! - Default input device selection
//! - Prefers mono 32-bit float, downmixes multi-channel input otherwise
//! - Non-blocking hand-off: frames are dropped, never reordered, when the
//!   analysis thread falls behind

use anyhow::{Context, Result, anyhow};
use cpal::SupportedStreamConfigRange;
use cpal::traits::{DeviceTrait, HostTrait, StreamTrait};
use crossbeam_channel::{Sender, TrySendError};

use crate::AudioFrame;

/// An open input stream. Dropping it pauses and releases the stream.
pub struct AudioCapture {
    stream: cpal::Stream,
    sample_rate: u32,
    channels: u16,
    device_name: String,
}

impl std::fmt::Debug for AudioCapture {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("AudioCapture")
            .field("sample_rate", &self.sample_rate)
            .field("channels", &self.channels)
            .field("device_name", &self.device_name)
            .finish()
    }
}

impl Drop for AudioCapture {
    fn drop(&mut self) {
        if let Err(e) = self.stream.pause() {
            log::warn!("Error pausing input stream: {e}");
        }
        log::info!(
            "Audio capture stopped on {} ({} Hz, {} channel(s))",
            self.device_name,
            self.sample_rate,
            self.channels
        );
    }
}

/// Starts capturing from the default input device.
///
/// # Arguments
/// * `sender` - Frame queue towards the analysis loop
/// * `frame_size` - Samples per frame, after downmixing
/// * `target_rate` - Preferred sample rate in Hz
///
/// # Returns
/// * `Ok(capture)` - Running stream; keep it alive for as long as frames are needed
/// * `Err(e)` - No device, no f32 input format, or the stream failed to start
pub fn start_audio_capture(
    sender: Sender<AudioFrame>,
    frame_size: usize,
    target_rate: u32,
) -> Result<AudioCapture> {
    let host = cpal::default_host();
    let device = host
        .default_input_device()
        .ok_or_else(|| anyhow!("No input device available"))?;
    let device_name = device.name().unwrap_or_else(|_| "unknown".to_string());
    log::info!("Using audio input device: {device_name}");

    let configs = device
        .supported_input_configs()
        .context("Failed to query input configurations")?
        .collect::<Vec<_>>();
    let supported_config = find_supported_config(configs, target_rate)
        .ok_or_else(|| anyhow!("No suitable f32 input format found"))?;

    let rate = target_rate.clamp(
        supported_config.min_sample_rate().0,
        supported_config.max_sample_rate().0,
    );
    let config = supported_config.with_sample_rate(cpal::SampleRate(rate));
    let sample_rate = config.sample_rate().0;
    let channels = config.channels();
    let config: cpal::StreamConfig = config.into();
    log::info!("Selected {sample_rate} Hz, {channels} channel(s), {frame_size}-sample frames");

    let mut assembler = FrameAssembler::new(frame_size, channels, sample_rate);
    let mut dropped: u64 = 0;

    let stream = device
        .build_input_stream(
            &config,
            move |data: &[f32], _: &cpal::InputCallbackInfo| {
                assembler.push(data, |frame| match sender.try_send(frame) {
                    Ok(()) => {}
                    Err(TrySendError::Full(_)) => {
                        dropped += 1;
                        if dropped.is_power_of_two() {
                            log::debug!("Analysis is behind, {dropped} frame(s) dropped so far");
                        }
                    }
                    Err(TrySendError::Disconnected(_)) => {}
                });
            },
            |err| log::error!("An error occurred on the audio stream: {err}"),
            None,
        )
        .context("Failed to build input stream")?;

    stream.play().context("Failed to start input stream")?;

    Ok(AudioCapture {
        stream,
        sample_rate,
        channels,
        device_name,
    })
}

/// Picks the f32 input configuration closest to `target_rate`, preferring
/// mono over multi-channel.
fn find_supported_config(
    configs: Vec<SupportedStreamConfigRange>,
    target_rate: u32,
) -> Option<SupportedStreamConfigRange> {
    configs
        .into_iter()
        .filter(|c| c.sample_format() == cpal::SampleFormat::F32)
        .min_by_key(|c| {
            let rate_miss = if (c.min_sample_rate().0..=c.max_sample_rate().0).contains(&target_rate) {
                0
            } else {
                let min_diff = c.min_sample_rate().0.abs_diff(target_rate);
                let max_diff = c.max_sample_rate().0.abs_diff(target_rate);
                min_diff.min(max_diff)
            };
            (c.channels() != 1, rate_miss)
        })
}

/// Turns interleaved callback buffers of arbitrary length into mono frames
/// of a fixed size.
#[derive(Debug)]
pub struct FrameAssembler {
    frame_size: usize,
    channels: usize,
    sample_rate: u32,
    pending: Vec<f32>,
}

impl FrameAssembler {
    pub fn new(frame_size: usize, channels: u16, sample_rate: u32) -> Self {
        Self {
            frame_size: frame_size.max(1),
            channels: usize::from(channels.max(1)),
            sample_rate,
            pending: Vec::with_capacity(frame_size * 2),
        }
    }

    /// Appends interleaved samples, calling `emit` for every completed frame.
    ///
    /// A trailing partial multi-channel group is ignored; callbacks always
    /// deliver whole groups.
    pub fn push(&mut self, interleaved: &[f32], mut emit: impl FnMut(AudioFrame)) {
        if self.channels == 1 {
            self.pending.extend_from_slice(interleaved);
        } else {
            let scale = 1.0 / self.channels as f32;
            self.pending.extend(
                interleaved
                    .chunks_exact(self.channels)
                    .map(|group| group.iter().sum::<f32>() * scale),
            );
        }

        while self.pending.len() >= self.frame_size {
            let samples = self.pending[..self.frame_size].to_vec();
            self.pending.drain(..self.frame_size);
            emit(AudioFrame::new(samples, self.sample_rate));
        }
    }

    /// Samples waiting for the next frame.
    pub fn pending(&self) -> usize {
        self.pending.len()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn assembles_fixed_size_frames_across_callbacks() {
        let mut assembler = FrameAssembler::new(4, 1, 44100);
        let mut frames = Vec::new();
        assembler.push(&[0.1, 0.2, 0.3], |f| frames.push(f));
        assert!(frames.is_empty());
        assembler.push(&[0.4, 0.5, 0.6, 0.7, 0.8, 0.9], |f| frames.push(f));
        assert_eq!(frames.len(), 2);
        assert_eq!(frames[0].samples, vec![0.1, 0.2, 0.3, 0.4]);
        assert_eq!(frames[1].samples, vec![0.5, 0.6, 0.7, 0.8]);
        assert_eq!(frames[1].sample_rate, 44100);
        assert_eq!(assembler.pending(), 1);
    }

    #[test]
    fn downmixes_stereo() {
        let mut assembler = FrameAssembler::new(2, 2, 48000);
        let mut frames = Vec::new();
        assembler.push(&[1.0, 0.0, -0.5, -0.5], |f| frames.push(f));
        assert_eq!(frames.len(), 1);
        assert_eq!(frames[0].samples, vec![0.5, -0.5]);
    }

    #[test]
    fn frames_pushed_to_a_full_queue_are_dropped_in_order() {
        let (tx, rx) = crossbeam_channel::bounded(1);
        let mut assembler = FrameAssembler::new(2, 1, 8000);
        assembler.push(&[1.0, 2.0, 3.0, 4.0], |f| {
            let _ = tx.try_send(f);
        });
        assert_eq!(rx.try_recv().unwrap().samples, vec![1.0, 2.0]);
        assert!(rx.try_recv().is_err());
    }
}
