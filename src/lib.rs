//! Library exports for reuse in benchmarks, tests, and the report binary.
/// Application directory helpers.
pub mod app_dirs;
/// Equipment records, CSV loading, and synthetic data.
pub mod dataset;
/// Desktop dashboard UI.
pub mod egui_app;
/// Logging setup.
pub mod logging;
/// Dashboard session state.
pub mod session;
/// Persistent settings.
pub mod settings;
/// Cox proportional hazards and Kaplan-Meier estimation.
pub mod survival;
/// Per-selection derived views.
pub mod views;
