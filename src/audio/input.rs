//! Live audio input capture
//!
//! Opens the default input device and forwards every driver callback block,
//! downmixed to mono, to the UI through a [`block_channel`].

use cpal::traits::{DeviceTrait, HostTrait, StreamTrait};
use cpal::{FromSample, Sample, SizedSample};
use thiserror::Error;

use super::buffer::{block_channel, BlockConsumer, BlockProducer};

/// Undrained blocks the channel holds before dropping new ones
const BLOCK_QUEUE: usize = 32;

/// Errors that can occur while opening the capture stream
#[derive(Error, Debug)]
pub enum InputError {
    #[error("No input device available")]
    NoDevice,

    #[error("Failed to query input config: {0}")]
    Config(#[from] cpal::DefaultStreamConfigError),

    #[error("Unsupported sample format: {0:?}")]
    UnsupportedFormat(cpal::SampleFormat),

    #[error("Failed to build input stream: {0}")]
    Build(#[from] cpal::BuildStreamError),

    #[error("Failed to start input stream: {0}")]
    Play(#[from] cpal::PlayStreamError),
}

/// Audio input capture engine
pub struct LiveInput {
    /// The running input stream, dropped on stop
    stream: Option<cpal::Stream>,

    /// UI side of the block channel for the running stream
    consumer: Option<BlockConsumer>,

    /// Name of the device being captured
    device_name: Option<String>,
}

impl Default for LiveInput {
    fn default() -> Self {
        Self::new()
    }
}

impl LiveInput {
    pub fn new() -> Self {
        Self {
            stream: None,
            consumer: None,
            device_name: None,
        }
    }

    pub fn is_capturing(&self) -> bool {
        self.stream.is_some()
    }

    pub fn device_name(&self) -> Option<&str> {
        self.device_name.as_deref()
    }

    /// Open the default input device and start capturing
    pub fn start(&mut self) -> Result<(), InputError> {
        if self.stream.is_some() {
            return Ok(());
        }

        log::info!("Starting audio capture...");

        let host = cpal::default_host();
        let device = host.default_input_device().ok_or(InputError::NoDevice)?;
        let device_name = device.name().unwrap_or_else(|_| "Unknown".to_string());
        log::info!("Using input device: {}", device_name);

        let supported = device.default_input_config()?;
        log::info!("Audio config: {:?}", supported);

        let format = supported.sample_format();
        let config: cpal::StreamConfig = supported.into();
        let (producer, consumer) = block_channel(BLOCK_QUEUE);

        let stream = match format {
            cpal::SampleFormat::F32 => build_stream::<f32>(&device, &config, producer)?,
            cpal::SampleFormat::I16 => build_stream::<i16>(&device, &config, producer)?,
            cpal::SampleFormat::U16 => build_stream::<u16>(&device, &config, producer)?,
            format => return Err(InputError::UnsupportedFormat(format)),
        };
        stream.play()?;

        self.stream = Some(stream);
        self.consumer = Some(consumer);
        self.device_name = Some(device_name);
        log::info!("Capture started");

        Ok(())
    }

    /// Stop audio capture and release the device
    pub fn stop(&mut self) {
        if self.stream.take().is_some() {
            log::info!("Capture stopped");
        }
        self.consumer = None;
        self.device_name = None;
    }

    /// Toggle capture state
    pub fn toggle(&mut self) -> Result<(), InputError> {
        if self.is_capturing() {
            self.stop();
            Ok(())
        } else {
            self.start()
        }
    }

    /// Newest block delivered by the driver since the last call
    pub fn latest_block(&mut self) -> Option<Vec<f32>> {
        self.consumer.as_mut().and_then(BlockConsumer::latest)
    }

    /// Blocks delivered by the driver since capture started
    pub fn blocks_received(&self) -> u64 {
        self.consumer
            .as_ref()
            .map(BlockConsumer::blocks_pushed)
            .unwrap_or(0)
    }

    /// Blocks dropped because the UI did not drain fast enough
    pub fn blocks_dropped(&self) -> u64 {
        self.consumer
            .as_ref()
            .map(BlockConsumer::blocks_dropped)
            .unwrap_or(0)
    }
}

fn build_stream<T>(
    device: &cpal::Device,
    config: &cpal::StreamConfig,
    mut producer: BlockProducer,
) -> Result<cpal::Stream, cpal::BuildStreamError>
where
    T: SizedSample,
    f32: FromSample<T>,
{
    let channels = config.channels as usize;
    device.build_input_stream(
        config,
        move |data: &[T], _: &cpal::InputCallbackInfo| {
            if !data.is_empty() {
                producer.push(downmix(data, channels));
            }
        },
        |err| log::error!("Audio input error: {}", err),
        None,
    )
}

/// Average each interleaved frame into one mono sample
fn downmix<T>(data: &[T], channels: usize) -> Vec<f32>
where
    T: Sample,
    f32: FromSample<T>,
{
    let channels = channels.max(1);
    data.chunks(channels)
        .map(|frame| {
            let sum: f32 = frame.iter().map(|s| s.to_sample::<f32>()).sum();
            sum / frame.len() as f32
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_downmix_mono_passthrough() {
        let data = [0.25_f32, -0.5, 1.0];
        assert_eq!(downmix(&data, 1), vec![0.25, -0.5, 1.0]);
    }

    #[test]
    fn test_downmix_stereo_average() {
        let data = [1.0_f32, 0.0, -0.5, -0.5];
        assert_eq!(downmix(&data, 2), vec![0.5, -0.5]);
    }

    #[test]
    fn test_downmix_i16() {
        let data = [i16::MIN, i16::MIN, 0, 0];
        let mono = downmix(&data, 2);
        assert_eq!(mono.len(), 2);
        assert!((mono[0] + 1.0).abs() < 1e-6);
        assert_eq!(mono[1], 0.0);
    }

    #[test]
    fn test_new_input_is_idle() {
        let mut input = LiveInput::new();
        assert!(!input.is_capturing());
        assert_eq!(input.latest_block(), None);
        assert_eq!(input.blocks_dropped(), 0);
    }
}
