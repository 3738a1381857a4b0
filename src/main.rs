//! Entry point for the egui-based survival dashboard.
#![cfg_attr(
    all(not(debug_assertions), target_os = "windows"),
    windows_subsystem = "windows"
)]
use eframe::egui;
use gridsurv::egui_app::ui::{EguiApp, MIN_VIEWPORT_SIZE};
use gridsurv::{logging, settings};

fn main() -> Result<(), Box<dyn std::error::Error>> {
    if let Err(err) = logging::init() {
        eprintln!("Logging disabled: {err}");
    }

    let settings = settings::load_or_default().unwrap_or_else(|err| {
        eprintln!("Using default settings: {err}");
        tracing::warn!("Using default settings: {err}");
        settings::AppSettings::default()
    });

    let viewport = egui::ViewportBuilder::default()
        .with_min_inner_size(MIN_VIEWPORT_SIZE)
        .with_inner_size(egui::vec2(1280.0, 860.0));
    let native_options = eframe::NativeOptions {
        viewport,
        ..Default::default()
    };

    eframe::run_native(
        "Equipment survival dashboard",
        native_options,
        Box::new(move |_cc| {
            let app: Box<dyn eframe::App> = match EguiApp::new(&settings) {
                Ok(app) => Box::new(app),
                Err(message) => {
                    tracing::error!("{message}");
                    Box::new(LaunchError { message })
                }
            };
            Ok(app)
        }),
    )?;
    Ok(())
}

/// Minimal fallback app to display initialization errors.
struct LaunchError {
    message: String,
}

impl eframe::App for LaunchError {
    fn update(&mut self, ctx: &egui::Context, _frame: &mut eframe::Frame) {
        egui::CentralPanel::default().show(ctx, |ui| {
            ui.vertical_centered(|ui| {
                ui.heading("Failed to start dashboard");
                ui.label(&self.message);
            });
        });
    }
}
