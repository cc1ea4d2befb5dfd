use std::time::{Duration, Instant};

use crate::camera::Camera;
use crate::data_provider::{DataProviderUi, LineSource};
use crate::mesh::Mesh;
use crate::renderer::{Frame, Renderer};
use crate::serial_data_provider::SerialDataProvider;
use crate::settings::Settings;
use crate::tilt::{bar_outline, TiltHistory};
use eframe::egui::{self, Color32, Stroke};
use egui::menu;
use egui_modal::Modal;
use egui_plot::{Legend, Line, PlotBounds, PlotPoint, PlotPoints, Polygon, Text};
use nalgebra::Vector3;

const CUP_TITLE: &str = "3D Cup Tilt (Pitch=Blue, Roll=Green, Yaw=Red)";

// scene box drawn around the cup
const SCENE_MIN: Vector3<f64> = Vector3::new(-2.0, -2.0, 0.0);
const SCENE_MAX: Vector3<f64> = Vector3::new(2.0, 2.0, 4.0);

fn run(title: &str, size: [f32; 2], app: Box<dyn eframe::App>) -> eframe::Result {
    let options = eframe::NativeOptions {
        viewport: egui::ViewportBuilder::default().with_inner_size(size),
        ..Default::default()
    };
    eframe::run_native(title, options, Box::new(move |_cc| Ok(app)))
}

pub fn run_cup(provider: SerialDataProvider, settings: &Settings) -> eframe::Result {
    run(
        "3D Cup Tilt",
        [1024.0, 768.0],
        Box::new(CupApp::new(provider, settings)),
    )
}

pub fn run_tilt(provider: SerialDataProvider, settings: &Settings) -> eframe::Result {
    run(
        "Pitch & Roll",
        [1024.0, 640.0],
        Box::new(TiltApp::new(provider, settings)),
    )
}

/// Fires once per `interval`, however often egui repaints.
struct Ticker {
    interval: Duration,
    last: Option<Instant>,
}

impl Ticker {
    fn new(interval: Duration) -> Self {
        Self {
            interval,
            last: None,
        }
    }

    fn due(&mut self) -> bool {
        let now = Instant::now();
        match self.last {
            Some(last) if now.duration_since(last) < self.interval => false,
            _ => {
                self.last = Some(now);
                true
            }
        }
    }
}

/// Current cup frame, replaced once per tick.
struct CupScene {
    renderer: Renderer,
    frame: Frame,
    fallback_frames: u64,
}

impl CupScene {
    fn new(renderer: Renderer) -> Self {
        Self {
            frame: renderer.initial_frame(),
            renderer,
            fallback_frames: 0,
        }
    }

    fn tick<S: LineSource + ?Sized>(&mut self, source: &mut S) {
        let current = std::mem::replace(&mut self.frame, self.renderer.initial_frame());
        self.frame = self.renderer.update(current, source);
        if self.frame.fallback {
            self.fallback_frames += 1;
        }
    }
}

struct CupApp {
    provider: SerialDataProvider,
    scene: CupScene,
    camera: Camera,
    ticker: Ticker,
}

impl CupApp {
    fn new(provider: SerialDataProvider, settings: &Settings) -> Self {
        let mesh = Mesh::cup(
            settings.cup_radius,
            settings.cup_height,
            settings.cup_resolution,
        );
        let (rows, cols) = mesh.shape();
        log::info!("cup mesh {rows}x{cols}, {} read attempts per frame", settings.read_attempts);

        Self {
            provider,
            scene: CupScene::new(Renderer::new(mesh, settings.read_attempts)),
            camera: Camera::default(),
            ticker: Ticker::new(settings.frame_interval()),
        }
    }
}

impl eframe::App for CupApp {
    fn update(&mut self, ctx: &egui::Context, _frame: &mut eframe::Frame) {
        if self.ticker.due() {
            self.scene.tick(&mut self.provider);
        }

        egui::SidePanel::left("left_panel").show(ctx, |ui| {
            self.provider.show(ui);
            ui.separator();

            ui.heading("Orientation");
            let scene = &self.scene;
            let frame = &scene.frame;
            egui::Grid::new("orientation")
                .num_columns(2)
                .striped(true)
                .show(ui, |ui| {
                    ui.label("Pitch");
                    ui.label(format!("{:+.1}°", frame.sample.pitch));
                    ui.end_row();
                    ui.label("Roll");
                    ui.label(format!("{:+.1}°", frame.sample.roll));
                    ui.end_row();
                    ui.label("Yaw");
                    ui.label(format!("{:+.1}°", frame.sample.yaw));
                    ui.end_row();
                    ui.label("Dominant");
                    ui.colored_label(frame.axis.color(), format!("{:?}", frame.axis));
                    ui.end_row();
                    ui.label("Level frames");
                    ui.label(format!("{}", scene.fallback_frames));
                    ui.end_row();
                    ui.label("Vertices");
                    ui.label(format!("{}", scene.renderer.mesh().len()));
                });
            ui.separator();
        });

        egui::CentralPanel::default().show(ctx, |ui| {
            ui.heading(CUP_TITLE);

            let frame = &self.scene.frame;
            let (min, max) = self.camera.bounds(SCENE_MIN, SCENE_MAX);
            let faces = self.camera.ordered_faces(&frame.mesh);
            let fill = frame.axis.color().gamma_multiply(0.8);
            let edge = Stroke::new(1.0, frame.axis.color());

            let axes = [
                ("X", Vector3::new(SCENE_MAX.x, 0.0, 0.0)),
                ("Y", Vector3::new(0.0, SCENE_MAX.y, 0.0)),
                ("Z", Vector3::new(0.0, 0.0, SCENE_MAX.z)),
            ];

            egui_plot::Plot::new("cup_plot")
                .allow_zoom(false)
                .allow_drag(false)
                .allow_scroll(false)
                .allow_boxed_zoom(false)
                .data_aspect(1.0)
                .show_axes(false)
                .show_grid(false)
                .show(ui, |plot_ui| {
                    plot_ui.set_plot_bounds(PlotBounds::from_min_max(min, max));

                    let (origin, _) = self.camera.project(&Vector3::zeros());
                    for (name, tip) in axes {
                        let (tip, _) = self.camera.project(&tip);
                        plot_ui.line(
                            Line::new(PlotPoints::from(vec![origin, tip])).color(Color32::GRAY),
                        );
                        plot_ui.text(Text::new(PlotPoint::new(tip[0], tip[1]), name));
                    }

                    for face in faces {
                        plot_ui.polygon(
                            Polygon::new(PlotPoints::from(face.outline))
                                .fill_color(fill)
                                .stroke(edge),
                        );
                    }
                });
        });

        ctx.request_repaint_after(self.ticker.interval);
    }
}

struct TiltApp {
    provider: SerialDataProvider,
    history: TiltHistory,
    read_attempts: usize,
    ticker: Ticker,
    save_error: Option<String>,
}

impl TiltApp {
    fn new(provider: SerialDataProvider, settings: &Settings) -> Self {
        Self {
            provider,
            history: TiltHistory::new(settings.window),
            read_attempts: settings.read_attempts,
            ticker: Ticker::new(settings.frame_interval()),
            save_error: None,
        }
    }
}

impl eframe::App for TiltApp {
    fn update(&mut self, ctx: &egui::Context, _frame: &mut eframe::Frame) {
        if self.ticker.due() {
            self.history.ingest(&mut self.provider, self.read_attempts);
        }

        let modal_save_error = Modal::new(ctx, "save_error");
        modal_save_error.show(|ui| {
            modal_save_error.title(ui, "Save failed");
            modal_save_error.frame(ui, |ui| {
                modal_save_error.body(ui, self.save_error.clone().unwrap_or_default());
            });
            modal_save_error.buttons(ui, |ui| {
                modal_save_error.caution_button(ui, "close");
            });
        });

        egui::SidePanel::left("left_panel").show(ctx, |ui| {
            menu::bar(ui, |ui| {
                ui.menu_button("File", |ui| {
                    if ui.button("🖴 Save").clicked() {
                        ui.close_menu();
                        if let Some(mut path) = rfd::FileDialog::new()
                            .add_filter("data", &["json"])
                            .save_file()
                        {
                            path.set_extension("json");
                            if let Err(e) = self.history.save_to_file(&path) {
                                log::error!("unable to save {}: {e}", path.display());
                                self.save_error = Some(format!("{}: {e}", path.display()));
                                modal_save_error.open();
                            }
                        }
                    }
                });
            });
            ui.separator();

            self.provider.show(ui);
            ui.separator();

            ui.heading("Samples");
            if self.history.is_empty() {
                ui.label("waiting for data");
            } else {
                ui.label(format!("{} / {}", self.history.len(), self.history.window()));
            }
            if let Some(pitch) = self.history.latest_pitch() {
                ui.label(format!("Pitch {pitch:+.1}°"));
            }
            ui.separator();
        });

        egui::CentralPanel::default().show(ctx, |ui| {
            let half_height = ui.available_height() / 2.0 - 20.0;

            ui.heading("Pitch & Roll");
            let (x_min, x_max) = self.history.x_bounds();
            egui_plot::Plot::new("series_plot")
                .height(half_height)
                .allow_zoom(false)
                .allow_drag(false)
                .allow_scroll(false)
                .allow_boxed_zoom(false)
                .x_axis_label("Samples")
                .y_axis_label("Angle (°)")
                .legend(Legend::default())
                .show(ui, |plot_ui| {
                    plot_ui.set_plot_bounds(PlotBounds::from_min_max(
                        [x_min, -90.0],
                        [x_max, 90.0],
                    ));
                    plot_ui.line(
                        Line::new(PlotPoints::from(self.history.pitch_series())).name("Pitch (°)"),
                    );
                    plot_ui.line(
                        Line::new(PlotPoints::from(self.history.roll_series())).name("Roll (°)"),
                    );
                });

            ui.heading("Pitch-driven Tilt");
            let angle = self.history.latest_pitch().unwrap_or(0.0);
            egui_plot::Plot::new("bar_plot")
                .height(half_height)
                .allow_zoom(false)
                .allow_drag(false)
                .allow_scroll(false)
                .allow_boxed_zoom(false)
                .data_aspect(1.0)
                .show_axes(false)
                .show_grid(false)
                .show(ui, |plot_ui| {
                    plot_ui.set_plot_bounds(PlotBounds::from_min_max(
                        [-2.0, -1.2],
                        [2.0, 1.2],
                    ));
                    plot_ui.polygon(
                        Polygon::new(PlotPoints::from(bar_outline(angle)))
                            .fill_color(Color32::from_rgb(31, 119, 180))
                            .stroke(Stroke::new(1.0, Color32::from_rgb(31, 119, 180))),
                    );
                });
        });

        ctx.request_repaint_after(self.ticker.interval);
    }
}
