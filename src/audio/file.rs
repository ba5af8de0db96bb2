//! Audio file decoding
//!
//! Decodes a whole file into memory using symphonia. The decoded samples are
//! downmixed to mono so the same buffer can be plotted and played.

use std::fs::File;
use std::path::{Path, PathBuf};
use std::time::Duration;

use symphonia::core::audio::SampleBuffer as DecodeBuffer;
use symphonia::core::codecs::{DecoderOptions, CODEC_TYPE_NULL};
use symphonia::core::errors::Error as SymphoniaError;
use symphonia::core::formats::FormatOptions;
use symphonia::core::io::MediaSourceStream;
use symphonia::core::meta::MetadataOptions;
use symphonia::core::probe::Hint;
use thiserror::Error;

/// Errors that can occur while decoding an audio file
#[derive(Error, Debug)]
pub enum FileError {
    #[error("Failed to open file: {0}")]
    IoError(#[from] std::io::Error),

    #[error("Failed to probe audio format: {0}")]
    ProbeError(String),

    #[error("No audio tracks found")]
    NoTracks,

    #[error("Unsupported codec: {0}")]
    UnsupportedCodec(String),

    #[error("Decoder error: {0}")]
    DecoderError(String),

    #[error("File contains no audio samples")]
    Empty,
}

/// A fully decoded audio file
#[derive(Debug, Clone)]
pub struct DecodedAudio {
    pub path: PathBuf,
    pub filename: String,
    /// Mono samples in the range -1.0..=1.0
    pub samples: Vec<f32>,
    pub sample_rate: u32,
    /// Channel count of the source before downmixing
    pub channels: usize,
}

impl DecodedAudio {
    pub fn len(&self) -> usize {
        self.samples.len()
    }

    pub fn is_empty(&self) -> bool {
        self.samples.is_empty()
    }

    pub fn duration(&self) -> Duration {
        self.duration_of(self.samples.len())
    }

    /// Playing time covered by `samples` samples of this file
    pub fn duration_of(&self, samples: usize) -> Duration {
        if self.sample_rate == 0 {
            return Duration::ZERO;
        }
        Duration::from_secs_f64(samples as f64 / self.sample_rate as f64)
    }
}

/// Decode the entire file at `path` into memory
pub fn decode_file(path: impl AsRef<Path>) -> Result<DecodedAudio, FileError> {
    let path = path.as_ref();
    let file = File::open(path)?;

    let mss = MediaSourceStream::new(Box::new(file), Default::default());

    // Create hint from file extension
    let mut hint = Hint::new();
    if let Some(ext) = path.extension().and_then(|e| e.to_str()) {
        hint.with_extension(ext);
    }

    let probed = symphonia::default::get_probe()
        .format(
            &hint,
            mss,
            &FormatOptions::default(),
            &MetadataOptions::default(),
        )
        .map_err(|e| FileError::ProbeError(e.to_string()))?;

    let mut format = probed.format;

    let track = format
        .tracks()
        .iter()
        .find(|t| t.codec_params.codec != CODEC_TYPE_NULL)
        .ok_or(FileError::NoTracks)?;

    let track_id = track.id;
    let mut sample_rate = track.codec_params.sample_rate.unwrap_or(44100);
    let mut channels = track.codec_params.channels.map(|c| c.count()).unwrap_or(0);

    let mut decoder = symphonia::default::get_codecs()
        .make(&track.codec_params, &DecoderOptions::default())
        .map_err(|e| match e {
            SymphoniaError::Unsupported(what) => FileError::UnsupportedCodec(what.to_string()),
            other => FileError::DecoderError(other.to_string()),
        })?;

    let mut samples = Vec::new();
    let mut scratch: Option<DecodeBuffer<f32>> = None;

    loop {
        let packet = match format.next_packet() {
            Ok(p) => p,
            Err(SymphoniaError::IoError(e)) if e.kind() == std::io::ErrorKind::UnexpectedEof => {
                break;
            }
            Err(SymphoniaError::ResetRequired) => break,
            Err(e) => return Err(FileError::DecoderError(e.to_string())),
        };

        if packet.track_id() != track_id {
            continue;
        }

        let decoded = match decoder.decode(&packet) {
            Ok(decoded) => decoded,
            // Corrupt packets are skipped
            Err(SymphoniaError::DecodeError(e)) => {
                log::warn!("Skipping undecodable packet: {}", e);
                continue;
            }
            Err(e) => return Err(FileError::DecoderError(e.to_string())),
        };

        let spec = *decoded.spec();
        sample_rate = spec.rate;
        channels = spec.channels.count();

        let needs_alloc = scratch
            .as_ref()
            .map_or(true, |buf| buf.capacity() < decoded.capacity() * channels);
        if needs_alloc {
            scratch = Some(DecodeBuffer::new(decoded.capacity() as u64, spec));
        }

        if let Some(buf) = scratch.as_mut() {
            buf.copy_interleaved_ref(decoded);
            append_mono(&mut samples, buf.samples(), channels);
        }
    }

    if samples.is_empty() {
        return Err(FileError::Empty);
    }

    let filename = path
        .file_name()
        .and_then(|n| n.to_str())
        .unwrap_or("Unknown")
        .to_string();

    log::info!(
        "Decoded {:?}: {} samples, {} Hz, {} channel(s)",
        path,
        samples.len(),
        sample_rate,
        channels
    );

    Ok(DecodedAudio {
        path: path.to_path_buf(),
        filename,
        samples,
        sample_rate,
        channels,
    })
}

/// Append interleaved frames to `out`, averaging the channels of each frame
fn append_mono(out: &mut Vec<f32>, interleaved: &[f32], channels: usize) {
    let channels = channels.max(1);
    out.reserve(interleaved.len() / channels);
    for frame in interleaved.chunks(channels) {
        out.push(frame.iter().sum::<f32>() / frame.len() as f32);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::f32::consts::PI;

    fn temp_path(name: &str) -> PathBuf {
        std::env::temp_dir().join(format!("wavescope-{}-{}", std::process::id(), name))
    }

    fn write_sine_wav(path: &Path, channels: u16, frames: usize) {
        let spec = hound::WavSpec {
            channels,
            sample_rate: 8000,
            bits_per_sample: 16,
            sample_format: hound::SampleFormat::Int,
        };
        let mut writer = hound::WavWriter::create(path, spec).unwrap();
        for i in 0..frames {
            let v = (2.0 * PI * 440.0 * i as f32 / 8000.0).sin();
            for _ in 0..channels {
                writer.write_sample((v * 16000.0) as i16).unwrap();
            }
        }
        writer.finalize().unwrap();
    }

    #[test]
    fn test_decode_wav_populates_buffer() {
        let path = temp_path("mono.wav");
        write_sine_wav(&path, 1, 4000);

        let audio = decode_file(&path).unwrap();
        std::fs::remove_file(&path).ok();

        assert_eq!(audio.len(), 4000);
        assert_eq!(audio.sample_rate, 8000);
        assert_eq!(audio.channels, 1);
        assert!(audio.filename.ends_with("mono.wav"));
        assert!(audio.samples.iter().all(|s| (-1.0..=1.0).contains(s)));
        assert!(audio.samples.iter().any(|s| s.abs() > 0.1));
        assert_eq!(audio.duration(), Duration::from_millis(500));
    }

    #[test]
    fn test_decode_stereo_downmixes() {
        let path = temp_path("stereo.wav");
        write_sine_wav(&path, 2, 1000);

        let audio = decode_file(&path).unwrap();
        std::fs::remove_file(&path).ok();

        assert_eq!(audio.channels, 2);
        assert_eq!(audio.len(), 1000);
    }

    #[test]
    fn test_decode_missing_file() {
        let err = decode_file(temp_path("does-not-exist.wav")).unwrap_err();
        assert!(matches!(err, FileError::IoError(_)));
    }

    #[test]
    fn test_decode_unsupported_file() {
        let path = temp_path("notes.txt");
        std::fs::write(&path, "definitely not audio, just some text").unwrap();

        let result = decode_file(&path);
        std::fs::remove_file(&path).ok();

        assert!(result.is_err());
    }

    #[test]
    fn test_append_mono() {
        let mut out = vec![0.0];
        append_mono(&mut out, &[1.0, 0.0, 0.5, 0.5], 2);
        assert_eq!(out, vec![0.0, 0.5, 0.5]);
    }
}
