//! Waveform plot widget
//!
//! Holds one curve of samples and draws it as a polyline across the
//! available width. Assigning new data replaces the curve wholesale.

use eframe::egui::{self, Color32, Pos2, Rect, Shape, Stroke};

/// Display settings for the plot
#[derive(Clone)]
pub struct PlotSettings {
    pub color: Color32,
    pub background: Color32,
    pub line_width: f32,
    /// Vertical scale; 1.0 maps full scale to the plot edges
    pub zoom: f32,
    pub show_axis: bool,
}

impl Default for PlotSettings {
    fn default() -> Self {
        Self {
            color: Color32::from_rgb(0, 0, 255),
            background: Color32::from_gray(20),
            line_width: 2.0,
            zoom: 1.0,
            show_axis: true,
        }
    }
}

/// Single-curve waveform widget
#[derive(Default)]
pub struct WaveformPlot {
    pub settings: PlotSettings,
    data: Vec<f32>,
}

impl WaveformPlot {
    pub fn new() -> Self {
        Self::default()
    }

    /// Replace the displayed curve
    pub fn set_data(&mut self, data: Vec<f32>) {
        self.data = data;
    }

    pub fn clear(&mut self) {
        self.data.clear();
    }

    pub fn data(&self) -> &[f32] {
        &self.data
    }

    pub fn show(&self, ui: &mut egui::Ui) -> egui::Response {
        let size = ui.available_size();
        let (response, painter) = ui.allocate_painter(size, egui::Sense::hover());
        let rect = response.rect;

        painter.rect_filled(rect, 4.0, self.settings.background);

        if self.settings.show_axis {
            let axis = Stroke::new(1.0, Color32::from_gray(70));
            painter.line_segment(
                [
                    Pos2::new(rect.left(), rect.center().y),
                    Pos2::new(rect.right(), rect.center().y),
                ],
                axis,
            );
        }

        let points = curve_points(&self.data, rect, self.settings.zoom);
        if points.len() >= 2 {
            painter.add(Shape::line(
                points,
                Stroke::new(self.settings.line_width, self.settings.color),
            ));
        }

        response
    }
}

/// Map samples to screen space: index spans the width, value spans the height.
///
/// Values outside the zoomed range are clamped to the plot edges. Curves with
/// more samples than horizontal pixels are decimated to one point per pixel.
fn curve_points(data: &[f32], rect: Rect, zoom: f32) -> Vec<Pos2> {
    if data.is_empty() || rect.width() <= 0.0 {
        return Vec::new();
    }

    let max_points = (rect.width().ceil() as usize).max(2);
    let step = data.len().div_ceil(max_points).max(1);
    let span = (data.len().saturating_sub(1)).max(1) as f32;
    let half = rect.height() / 2.0;
    let zoom = if zoom > 0.0 { zoom } else { 1.0 };

    data.iter()
        .enumerate()
        .step_by(step)
        .map(|(i, v)| {
            let x = rect.left() + (i as f32 / span) * rect.width();
            let y = rect.center().y - (v * zoom).clamp(-1.0, 1.0) * half;
            Pos2::new(x, y)
        })
        .collect()
}
