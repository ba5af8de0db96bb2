//! Non-blocking chunk playback
//!
//! Chunks selected on the UI thread are resampled to the device rate and
//! pushed into a lock-free ring that the cpal output callback drains. Pushing
//! never blocks; samples that do not fit are dropped.

use std::sync::atomic::{AtomicU32, Ordering};
use std::sync::Arc;

use cpal::traits::{DeviceTrait, HostTrait, StreamTrait};
use cpal::{FromSample, Sample, SizedSample};
use ringbuf::{
    traits::{Consumer, Observer, Producer, Split},
    HeapRb,
};
use thiserror::Error;

/// Seconds of audio the output ring can hold ahead of the device
const RING_SECONDS: usize = 2;

/// Errors that can occur while opening the output stream
#[derive(Error, Debug)]
pub enum OutputError {
    #[error("No output device available")]
    NoDevice,

    #[error("Failed to query output config: {0}")]
    Config(#[from] cpal::DefaultStreamConfigError),

    #[error("Unsupported sample format: {0:?}")]
    UnsupportedFormat(cpal::SampleFormat),

    #[error("Failed to build output stream: {0}")]
    Build(#[from] cpal::BuildStreamError),

    #[error("Failed to start output stream: {0}")]
    Play(#[from] cpal::PlayStreamError),
}

/// Playback state
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub enum PlaybackState {
    #[default]
    Stopped,
    Playing,
    Paused,
}

/// Plays sample chunks through the default output device
pub struct ChunkPlayer {
    /// cpal output stream, dropped on stop
    stream: Option<cpal::Stream>,

    /// Producer side of the output ring (mono samples at device rate)
    producer: Option<ringbuf::HeapProd<f32>>,

    /// Device sample rate of the open stream
    device_rate: u32,

    /// Shared volume for audio thread (AtomicU32 with f32 bits)
    volume_atomic: Arc<AtomicU32>,

    /// Volume for UI binding
    pub volume: f32,
}

impl Default for ChunkPlayer {
    fn default() -> Self {
        Self::new()
    }
}

impl ChunkPlayer {
    pub fn new() -> Self {
        Self {
            stream: None,
            producer: None,
            device_rate: 44100,
            volume_atomic: Arc::new(AtomicU32::new(1.0_f32.to_bits())),
            volume: 1.0,
        }
    }

    pub fn is_open(&self) -> bool {
        self.stream.is_some()
    }

    /// Open the default output device if it is not open yet
    pub fn open(&mut self) -> Result<(), OutputError> {
        if self.stream.is_some() {
            return Ok(());
        }

        let host = cpal::default_host();
        let device = host.default_output_device().ok_or(OutputError::NoDevice)?;
        let supported = device.default_output_config()?;

        let format = supported.sample_format();
        let config: cpal::StreamConfig = supported.into();
        let channels = config.channels as usize;
        let device_rate = config.sample_rate.0;

        let rb = HeapRb::<f32>::new(device_rate as usize * RING_SECONDS);
        let (prod, cons) = rb.split();

        self.sync_volume();
        let volume = Arc::clone(&self.volume_atomic);

        let stream = match format {
            cpal::SampleFormat::F32 => build_output_stream::<f32>(&device, &config, cons, volume)?,
            cpal::SampleFormat::I16 => build_output_stream::<i16>(&device, &config, cons, volume)?,
            cpal::SampleFormat::U16 => build_output_stream::<u16>(&device, &config, cons, volume)?,
            format => return Err(OutputError::UnsupportedFormat(format)),
        };
        stream.play()?;

        log::info!(
            "Output stream opened: {} Hz, {} channel(s)",
            device_rate,
            channels
        );

        self.stream = Some(stream);
        self.producer = Some(prod);
        self.device_rate = device_rate;

        Ok(())
    }

    /// Queue `chunk` (recorded at `sample_rate`) for playback without blocking.
    ///
    /// Returns the number of device-rate samples accepted by the ring.
    pub fn play(&mut self, chunk: &[f32], sample_rate: u32) -> usize {
        let Some(producer) = self.producer.as_mut() else {
            return 0;
        };

        let resampled = resample_linear(chunk, sample_rate, self.device_rate);
        let pushed = producer.push_slice(&resampled);
        if pushed < resampled.len() {
            log::debug!(
                "Output ring full, dropped {} samples",
                resampled.len() - pushed
            );
        }
        pushed
    }

    /// Samples queued but not yet consumed by the device
    pub fn queued(&self) -> usize {
        self.producer
            .as_ref()
            .map(|p| p.occupied_len())
            .unwrap_or(0)
    }

    /// Stop playback and release the device
    pub fn stop(&mut self) {
        if self.stream.take().is_some() {
            log::info!("Output stream closed");
        }
        self.producer = None;
    }

    /// Sync UI volume to audio thread
    pub fn sync_volume(&self) {
        self.volume_atomic
            .store(self.volume.to_bits(), Ordering::Relaxed);
    }
}

fn build_output_stream<T>(
    device: &cpal::Device,
    config: &cpal::StreamConfig,
    mut cons: ringbuf::HeapCons<f32>,
    volume_atomic: Arc<AtomicU32>,
) -> Result<cpal::Stream, cpal::BuildStreamError>
where
    T: SizedSample + FromSample<f32>,
{
    let channels = config.channels as usize;
    device.build_output_stream(
        config,
        move |data: &mut [T], _: &cpal::OutputCallbackInfo| {
            let volume = f32::from_bits(volume_atomic.load(Ordering::Relaxed));
            write_frames(data, channels, volume, || cons.try_pop());
        },
        |err| log::error!("Audio output error: {}", err),
        None,
    )
}

/// Fill interleaved `data` with one mono sample per frame, copied to every
/// channel. Frames past the end of `next` get silence.
fn write_frames<T, F>(data: &mut [T], channels: usize, volume: f32, mut next: F)
where
    T: Sample + FromSample<f32>,
    F: FnMut() -> Option<f32>,
{
    for frame in data.chunks_mut(channels.max(1)) {
        let sample = next().unwrap_or(0.0) * volume;
        frame.fill(T::from_sample(sample));
    }
}

/// Convert `input` from `from_rate` to `to_rate` by linear interpolation
pub fn resample_linear(input: &[f32], from_rate: u32, to_rate: u32) -> Vec<f32> {
    if input.is_empty() || from_rate == 0 || to_rate == 0 {
        return Vec::new();
    }
    if from_rate == to_rate {
        return input.to_vec();
    }

    let ratio = from_rate as f64 / to_rate as f64;
    let out_len = ((input.len() as f64) / ratio).round().max(1.0) as usize;
    let last = input.len() - 1;

    (0..out_len)
        .map(|i| {
            let pos = i as f64 * ratio;
            let idx = (pos.floor() as usize).min(last);
            let next = (idx + 1).min(last);
            let frac = (pos - idx as f64).clamp(0.0, 1.0) as f32;
            input[idx] + (input[next] - input[idx]) * frac
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_resample_same_rate_is_copy() {
        let input = [0.1, 0.2, 0.3];
        assert_eq!(resample_linear(&input, 44100, 44100), input.to_vec());
    }

    #[test]
    fn test_resample_upsample_interpolates() {
        let input = [0.0, 1.0];
        let out = resample_linear(&input, 1, 2);
        assert_eq!(out.len(), 4);
        assert_eq!(out[0], 0.0);
        assert_eq!(out[1], 0.5);
        assert_eq!(out[2], 1.0);
    }

    #[test]
    fn test_resample_downsample_length() {
        let input = vec![0.5; 4410];
        let out = resample_linear(&input, 44100, 22050);
        assert_eq!(out.len(), 2205);
        assert!(out.iter().all(|s| *s == 0.5));
    }

    #[test]
    fn test_resample_degenerate_input() {
        assert!(resample_linear(&[], 44100, 48000).is_empty());
        assert!(resample_linear(&[1.0], 0, 48000).is_empty());
    }

    #[test]
    fn test_write_frames_f32_duplicates_channels() {
        let mut source = vec![0.5_f32, -0.25].into_iter();
        let mut data = [9.0_f32; 6];
        write_frames(&mut data, 2, 1.0, || source.next());
        assert_eq!(data, [0.5, 0.5, -0.25, -0.25, 0.0, 0.0]);
    }

    #[test]
    fn test_write_frames_i16_applies_volume() {
        let mut source = vec![1.0_f32, 0.0].into_iter();
        let mut data = [1_i16; 2];
        write_frames(&mut data, 1, 0.5, || source.next());
        assert_eq!(data, [16384, 0]);
    }

    #[test]
    fn test_write_frames_u16_silence_is_midpoint() {
        let mut data = [0_u16; 4];
        write_frames(&mut data, 2, 1.0, || None);
        assert_eq!(data, [32768; 4]);
    }

    #[test]
    fn test_play_without_stream_is_noop() {
        let mut player = ChunkPlayer::new();
        assert!(!player.is_open());
        assert_eq!(player.play(&[0.1, 0.2], 44100), 0);
        assert_eq!(player.queued(), 0);
    }
}
