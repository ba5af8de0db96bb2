//! Audio module - handles capture, decoding and playback
//!
//! This module provides:
//! - Lock-free block channel from the capture callback to the UI
//! - Live audio input capture
//! - Whole-file decoding
//! - Chunk selection and non-blocking chunk playback

mod buffer;
mod chunk;
mod file;
mod input;
mod playback;

pub use chunk::{chunk_size, PlaybackCursor};
pub use file::{decode_file, DecodedAudio};
pub use input::LiveInput;
pub use playback::{ChunkPlayer, PlaybackState};
