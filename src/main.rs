//! wavescope - Waveform Viewer
//!
//! Shows a live waveform of the default audio input, or plays back an audio
//! file while plotting the chunk currently being played.

use eframe::egui;
use std::path::Path;
use std::time::{Duration, Instant};

mod audio;
mod render;
mod settings;
mod timer;

use audio::{
    chunk_size, decode_file, ChunkPlayer, DecodedAudio, LiveInput, PlaybackCursor, PlaybackState,
};
use render::WaveformPlot;
use settings::AppSettings;
use timer::UpdateTimer;

const APP_TITLE: &str = "wavescope";

/// Input source mode
#[derive(Debug, Clone, Copy, PartialEq, Default)]
enum InputMode {
    #[default]
    Live,
    File,
}

fn main() -> eframe::Result<()> {
    env_logger::init();
    log::info!("Starting wavescope");

    let settings = AppSettings::load();

    let options = eframe::NativeOptions {
        viewport: egui::ViewportBuilder::default()
            .with_inner_size([settings.window_width, settings.window_height])
            .with_title(APP_TITLE),
        ..Default::default()
    };

    eframe::run_native(
        APP_TITLE,
        options,
        Box::new(move |cc| Ok(Box::new(WaveApp::new(cc, settings)))),
    )
}

struct WaveApp {
    settings: AppSettings,
    plot: WaveformPlot,
    live: LiveInput,
    player: ChunkPlayer,
    /// Currently loaded file
    audio: Option<DecodedAudio>,
    cursor: PlaybackCursor,
    state: PlaybackState,
    timer: UpdateTimer,
    input_mode: InputMode,
    status: String,
}

impl WaveApp {
    fn new(_cc: &eframe::CreationContext<'_>, settings: AppSettings) -> Self {
        let mut plot = WaveformPlot::new();
        let [r, g, b] = settings.line_color;
        plot.settings.color = egui::Color32::from_rgb(r, g, b);
        plot.settings.line_width = settings.line_width;
        plot.settings.zoom = settings.zoom;

        let mut player = ChunkPlayer::new();
        player.volume = settings.volume;

        let mut app = Self {
            timer: UpdateTimer::from_fps(settings.fps, Instant::now()),
            settings,
            plot,
            live: LiveInput::new(),
            player,
            audio: None,
            cursor: PlaybackCursor::new(),
            state: PlaybackState::Stopped,
            input_mode: InputMode::default(),
            status: String::new(),
        };
        app.start_live();
        app
    }

    fn start_live(&mut self) {
        match self.live.start() {
            Ok(()) => {
                self.status = format!(
                    "Capturing: {}",
                    self.live.device_name().unwrap_or("Unknown")
                );
            }
            Err(e) => {
                log::error!("Failed to start capture: {}", e);
                self.status = format!("Error: {}", e);
            }
        }
    }

    fn set_mode(&mut self, mode: InputMode) {
        if mode == self.input_mode {
            return;
        }
        self.input_mode = mode;
        self.plot.clear();

        match mode {
            InputMode::Live => {
                self.stop_file();
                self.start_live();
            }
            InputMode::File => {
                self.live.stop();
                self.status = match &self.audio {
                    Some(audio) => format!("Loaded: {}", audio.filename),
                    None => "No file loaded".to_string(),
                };
            }
        }
    }

    fn open_dialog(&mut self, ctx: &egui::Context) {
        let mut dialog = rfd::FileDialog::new()
            .set_title("Open Audio File")
            .add_filter("Audio Files", &["wav", "mp3"])
            .add_filter("All Files", &["*"]);
        if let Some(dir) = &self.settings.last_dir {
            dialog = dialog.set_directory(dir);
        }

        if let Some(path) = dialog.pick_file() {
            self.load_file(ctx, &path);
        }
    }

    fn load_file(&mut self, ctx: &egui::Context, path: &Path) {
        let audio = match decode_file(path) {
            Ok(audio) => audio,
            Err(e) => {
                log::error!("Failed to load file: {}", e);
                self.status = format!("Error: {}", e);
                return;
            }
        };

        if let Some(dir) = path.parent() {
            self.settings.last_dir = Some(dir.to_path_buf());
            self.settings.save();
        }

        ctx.send_viewport_cmd(egui::ViewportCommand::Title(format!(
            "{} - {}",
            APP_TITLE,
            path.display()
        )));

        self.stop_file();
        self.set_mode(InputMode::File);
        self.status = format!("Loaded: {}", audio.filename);
        log::info!("Loaded audio file: {}", audio.path.display());
        self.audio = Some(audio);
        self.play_file();
    }

    fn play_file(&mut self) {
        if self.audio.is_none() {
            return;
        }
        if !self.player.is_open() {
            if let Err(e) = self.player.open() {
                // Keep plotting even without an output device
                log::warn!("Playback unavailable: {}", e);
                self.status = format!("Error: {}", e);
            }
        }
        self.state = PlaybackState::Playing;
        self.timer.reset(Instant::now());
    }

    fn pause_file(&mut self) {
        if self.state == PlaybackState::Playing {
            self.state = PlaybackState::Paused;
        }
    }

    fn stop_file(&mut self) {
        self.player.stop();
        self.cursor.reset();
        self.state = PlaybackState::Stopped;
    }

    /// End of file: rewind but keep the output open so queued audio plays out
    fn finish_file(&mut self) {
        log::info!("Playback finished");
        self.status = "Finished".to_string();
        self.cursor.reset();
        self.state = PlaybackState::Stopped;
    }

    /// Close the output stream once a finished file has drained
    fn release_drained_output(&mut self) {
        if self.state == PlaybackState::Stopped
            && self.player.is_open()
            && self.player.queued() == 0
        {
            self.player.stop();
        }
    }

    /// One timer tick of the shared update path
    fn tick(&mut self) {
        match self.input_mode {
            InputMode::Live => {
                if let Some(block) = self.live.latest_block() {
                    self.plot.set_data(block);
                }
            }
            InputMode::File => {
                self.advance_file();
                self.release_drained_output();
            }
        }
    }

    fn advance_file(&mut self) {
        if self.state != PlaybackState::Playing {
            return;
        }
        let Some(audio) = self.audio.as_ref() else {
            return;
        };
        if audio.is_empty() {
            return;
        }

        let total = audio.len();
        let size = chunk_size(total, self.settings.plot_width);

        match self.cursor.next_chunk(size, total) {
            Some(range) => {
                let chunk = &audio.samples[range];
                self.player.play(chunk, audio.sample_rate);
                self.plot.set_data(chunk.to_vec());
            }
            None if self.settings.loop_enabled && size > 0 => {
                self.cursor.reset();
            }
            None => self.finish_file(),
        }
    }

    fn file_controls(&mut self, ui: &mut egui::Ui) {
        let play_text = match self.state {
            PlaybackState::Playing => "⏸",
            _ => "▶",
        };
        if ui
            .add_enabled(self.audio.is_some(), egui::Button::new(play_text))
            .clicked()
        {
            match self.state {
                PlaybackState::Playing => self.pause_file(),
                _ => self.play_file(),
            }
        }

        if ui
            .add_enabled(self.audio.is_some(), egui::Button::new("⏹"))
            .clicked()
        {
            self.stop_file();
        }

        ui.separator();

        ui.label("Vol:");
        let volume =
            ui.add(egui::Slider::new(&mut self.player.volume, 0.0..=2.0).show_value(false));
        if volume.changed() {
            self.player.sync_volume();
            self.settings.volume = self.player.volume;
        }
        if volume.drag_stopped() || (volume.changed() && !volume.dragged()) {
            self.settings.save();
        }

        if ui
            .checkbox(&mut self.settings.loop_enabled, "Loop")
            .changed()
        {
            self.settings.save();
        }
    }

    /// Progress strip with click-to-seek
    fn seek_bar(&mut self, ui: &mut egui::Ui) {
        let Some(total) = self.audio.as_ref().map(DecodedAudio::len) else {
            return;
        };

        let width = ui.available_width();
        let (response, painter) =
            ui.allocate_painter(egui::vec2(width, 8.0), egui::Sense::click_and_drag());
        let rect = response.rect;

        painter.rect_filled(rect, 2.0, egui::Color32::from_gray(40));
        let played = rect.width() * self.cursor.fraction(total);
        painter.rect_filled(
            egui::Rect::from_min_size(rect.min, egui::vec2(played, rect.height())),
            2.0,
            egui::Color32::from_gray(160),
        );

        if response.dragged() || response.clicked() {
            if let Some(pos) = response.interact_pointer_pos() {
                let fraction = (pos.x - rect.left()) / rect.width();
                self.cursor.seek(fraction, total);
            }
        }
    }
}

impl eframe::App for WaveApp {
    fn update(&mut self, ctx: &egui::Context, _frame: &mut eframe::Frame) {
        let now = Instant::now();
        if self.timer.poll(now) {
            self.tick();
        }
        ctx.request_repaint_after(self.timer.remaining(now).max(Duration::from_millis(1)));

        // Top panel
        egui::TopBottomPanel::top("top_panel").show(ctx, |ui| {
            ui.horizontal(|ui| {
                ui.heading(APP_TITLE);
                ui.separator();

                let mut mode = self.input_mode;
                ui.selectable_value(&mut mode, InputMode::Live, "Live");
                ui.selectable_value(&mut mode, InputMode::File, "File");
                self.set_mode(mode);
                ui.separator();

                match self.input_mode {
                    InputMode::Live => {
                        let button_text = if self.live.is_capturing() {
                            "⏹ Stop"
                        } else {
                            "▶ Capture"
                        };
                        if ui.button(button_text).clicked() {
                            self.status = match self.live.toggle() {
                                Ok(()) => match self.live.device_name() {
                                    Some(name) => format!("Capturing: {}", name),
                                    None => "Stopped".to_string(),
                                },
                                Err(e) => {
                                    log::error!("Failed to start capture: {}", e);
                                    format!("Error: {}", e)
                                }
                            };
                        }
                    }
                    InputMode::File => {
                        if ui.button("📂 Open Audio File").clicked() {
                            self.open_dialog(ctx);
                        }
                        ui.separator();
                        self.file_controls(ui);
                    }
                }

                ui.separator();
                ui.label(&self.status);
            });
        });

        // Status bar
        egui::TopBottomPanel::bottom("status_panel").show(ctx, |ui| {
            if self.input_mode == InputMode::File {
                self.seek_bar(ui);
            }

            ui.horizontal(|ui| {
                ui.small(format!("Samples: {}", self.plot.data().len()));
                ui.separator();
                match (self.input_mode, &self.audio) {
                    (InputMode::Live, _) => {
                        ui.small(format!(
                            "Blocks: {} (dropped {})",
                            self.live.blocks_received(),
                            self.live.blocks_dropped()
                        ));
                    }
                    (InputMode::File, Some(audio)) => {
                        ui.small(format!(
                            "{} / {} | {} Hz, {} ch | queued {}",
                            format_duration(audio.duration_of(self.cursor.position())),
                            format_duration(audio.duration()),
                            audio.sample_rate,
                            audio.channels,
                            self.player.queued()
                        ));
                    }
                    (InputMode::File, None) => {
                        ui.small("No file loaded");
                    }
                }
            });
        });

        // Main waveform display
        egui::CentralPanel::default().show(ctx, |ui| {
            self.plot.show(ui);
        });
    }
}

/// Format a duration as MM:SS
fn format_duration(d: Duration) -> String {
    let secs = d.as_secs();
    let mins = secs / 60;
    let secs = secs % 60;
    format!("{:02}:{:02}", mins, secs)
}
