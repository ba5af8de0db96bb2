//! Render module - UI components for visualization

mod waveform;

pub use waveform::WaveformPlot;
