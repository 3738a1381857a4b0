//! egui renderer for the dashboard.

pub mod charts;
pub mod style;

use eframe::egui::{self, Color32, Frame, RichText, Ui};

use crate::egui_app::controller::EguiController;
use crate::egui_app::state::DashboardTab;
use crate::settings::AppSettings;
use crate::views::{DerivedView, GroupedSurvival, NO_COEFFICIENTS, median_survival_time};
use charts::ChartSeries;

/// Smallest window size that keeps the charts legible.
pub const MIN_VIEWPORT_SIZE: egui::Vec2 = egui::vec2(960.0, 640.0);

/// Renders the dashboard using the shared controller state.
pub struct EguiApp {
    controller: EguiController,
    visuals_set: bool,
}

impl EguiApp {
    pub fn new(settings: &AppSettings) -> Result<Self, String> {
        let controller = EguiController::new(settings)
            .map_err(|err| format!("Failed to start dashboard: {err}"))?;
        Ok(Self {
            controller,
            visuals_set: false,
        })
    }

    fn apply_visuals(&mut self, ctx: &egui::Context) {
        if self.visuals_set {
            return;
        }
        let mut visuals = egui::Visuals::dark();
        style::apply_visuals(&mut visuals);
        ctx.set_visuals(visuals);
        self.visuals_set = true;
    }

    fn render_top_bar(&mut self, ctx: &egui::Context) {
        let palette = style::palette();
        egui::TopBottomPanel::top("top_bar")
            .frame(
                Frame::new()
                    .fill(palette.bg_tertiary)
                    .inner_margin(egui::Margin::same(8)),
            )
            .show(ctx, |ui| {
                ui.heading(RichText::new(&self.controller.ui.title).color(Color32::WHITE));
                ui.add_space(4.0);
                ui.horizontal(|ui| self.render_selector(ui));
                if let Some(view) = &self.controller.ui.view {
                    ui.label(RichText::new(&view.summary).color(palette.text_primary));
                    ui.horizontal(|ui| render_load_gauge(ui, view));
                }
                ui.horizontal(|ui| self.render_actions(ui));
            });
    }

    fn render_selector(&mut self, ui: &mut Ui) {
        ui.label("Record #");
        // Unclamped so a typed index past the end reaches the error window.
        let mut index = self.controller.ui.index_input;
        let response = ui.add(egui::DragValue::new(&mut index).speed(0.1));
        if response.changed() {
            self.commit_index_input(index);
        }

        ui.label("ID");
        let mut chosen: Option<String> = None;
        egui::ComboBox::from_id_salt("record_id_combo")
            .selected_text(self.controller.ui.selected_id.clone())
            .show_ui(ui, |ui| {
                for id in &self.controller.ui.record_ids {
                    let selected = *id == self.controller.ui.selected_id;
                    if ui.selectable_label(selected, id).clicked() && !selected {
                        chosen = Some(id.clone());
                    }
                }
            });
        if let Some(id) = chosen {
            self.controller.select_id(&id);
        }

        if let Some(view) = &self.controller.ui.view {
            ui.separator();
            ui.label(
                RichText::new(view.risk.label())
                    .strong()
                    .color(style::risk_color(view.risk)),
            );
            ui.label(format!("partial hazard {:.2}", view.partial_hazard));
        }
    }

    fn commit_index_input(&mut self, index: usize) {
        if index != self.controller.ui.index_input {
            self.controller.select_index(index);
        }
    }

    fn render_actions(&mut self, ui: &mut Ui) {
        if ui.button("Regenerate test data").clicked() {
            self.controller.regenerate();
        }
        if ui.button("Refresh").clicked() {
            self.controller.refresh();
        }
        let details = if self.controller.ui.show_details {
            "Hide details"
        } else {
            "Show details"
        };
        if ui.button(details).clicked() {
            self.controller.toggle_details();
        }
    }

    fn render_status(&mut self, ctx: &egui::Context) {
        egui::TopBottomPanel::bottom("status_bar")
            .frame(Frame::new().fill(Color32::from_rgb(0, 0, 0)))
            .show(ctx, |ui| {
                let status = &self.controller.ui.status;
                ui.horizontal(|ui| {
                    ui.add_space(8.0);
                    ui.painter().circle_filled(
                        ui.cursor().min + egui::vec2(9.0, 11.0),
                        9.0,
                        status.badge_color,
                    );
                    ui.add_space(24.0);
                    ui.label(RichText::new(&status.badge_label).color(Color32::WHITE));
                    ui.separator();
                    ui.label(RichText::new(&status.text).color(Color32::WHITE));
                });
            });
    }

    fn render_details_panel(&mut self, ctx: &egui::Context) {
        if !self.controller.ui.show_details {
            return;
        }
        let Some(view) = &self.controller.ui.view else {
            return;
        };
        egui::SidePanel::right("details_panel")
            .resizable(true)
            .default_width(280.0)
            .show(ctx, |ui| {
                ui.heading("Details");
                egui::ScrollArea::vertical()
                    .id_salt("details_scroll")
                    .show(ui, |ui| {
                        egui::Grid::new("details_grid").striped(true).show(ui, |ui| {
                            for (field, value) in &view.details {
                                ui.label(RichText::new(field).color(style::palette().text_muted));
                                ui.label(value);
                                ui.end_row();
                            }
                        });
                    });
            });
    }

    fn render_report_panel(&mut self, ctx: &egui::Context) {
        let Some(view) = &self.controller.ui.view else {
            return;
        };
        let palette = style::palette();
        egui::TopBottomPanel::bottom("report_panel")
            .resizable(true)
            .default_height(170.0)
            .frame(
                Frame::new()
                    .fill(palette.bg_primary)
                    .inner_margin(egui::Margin::same(8)),
            )
            .show(ctx, |ui| {
                ui.label(RichText::new("Report").strong().color(palette.text_muted));
                egui::ScrollArea::vertical()
                    .id_salt("report_scroll")
                    .auto_shrink([false, false])
                    .show(ui, |ui| {
                        ui.label(RichText::new(&view.report).monospace());
                    });
            });
    }

    fn render_tabs(&mut self, ctx: &egui::Context) {
        egui::CentralPanel::default().show(ctx, |ui| {
            ui.horizontal(|ui| {
                for tab in DashboardTab::ALL {
                    ui.selectable_value(&mut self.controller.ui.tab, tab, tab.label());
                }
            });
            ui.separator();
            let Some(view) = self.controller.ui.view.take() else {
                ui.label("No data");
                return;
            };
            match self.controller.ui.tab {
                DashboardTab::SurvivalForecast => render_survival_tab(ui, &view),
                DashboardTab::HazardRatios => render_hazard_tab(ui, &view),
                DashboardTab::CumulativeHazard => render_cumulative_tab(ui, &view),
                DashboardTab::GroupedSurvival => self.render_grouped_tab(ui, &view),
            }
            // A grouping change this frame has already stored its own view.
            if self.controller.ui.view.is_none() {
                self.controller.ui.view = Some(view);
            }
        });
    }

    fn render_grouped_tab(&mut self, ui: &mut Ui, view: &DerivedView) {
        let current = self.controller.ui.grouping.clone().unwrap_or_default();
        let current_label = self
            .controller
            .ui
            .grouping_options
            .iter()
            .find(|(name, _)| *name == current)
            .map(|(_, label)| label.clone())
            .unwrap_or_else(|| "None".to_string());
        let mut chosen: Option<String> = None;
        ui.horizontal(|ui| {
            ui.label("Group by");
            egui::ComboBox::from_id_salt("grouping_combo")
                .selected_text(current_label)
                .show_ui(ui, |ui| {
                    for (name, label) in &self.controller.ui.grouping_options {
                        if ui.selectable_label(*name == current, label).clicked() {
                            chosen = Some(name.clone());
                        }
                    }
                });
        });
        if let Some(name) = chosen {
            self.controller.change_grouping(&name);
        }

        match &view.grouped {
            GroupedSurvival::Curves { group_by, groups } => {
                let curves: Vec<_> = groups.iter().map(|group| group.curve.survival()).collect();
                let series: Vec<ChartSeries<'_>> = groups
                    .iter()
                    .zip(&curves)
                    .enumerate()
                    .map(|(index, (group, curve))| ChartSeries {
                        label: &group.label,
                        curve,
                        color: style::series_color(index),
                    })
                    .collect();
                ui.label(format!("Kaplan-Meier survival by {}", group_by.label()));
                charts::step_chart(ui, &series, Some((0.0, 1.0)), None, "survival");
                for (group, curve) in groups.iter().zip(&curves) {
                    let median = median_survival_time(curve)
                        .map(|time| format!("{time:.0}"))
                        .unwrap_or_else(|| "not reached".to_string());
                    ui.label(format!(
                        "{}: {} records, median {median}",
                        group.label,
                        group.curve.observations()
                    ));
                }
            }
            GroupedSurvival::Unavailable(reason) => {
                ui.label(RichText::new(reason).italics());
            }
        }
    }

    fn render_windows(&mut self, ctx: &egui::Context) {
        if let Some(message) = self.controller.ui.warning.clone() {
            let mut open = true;
            egui::Window::new("Data warning")
                .collapsible(false)
                .resizable(false)
                .open(&mut open)
                .show(ctx, |ui| {
                    ui.label(message);
                    if ui.button("OK").clicked() {
                        self.controller.dismiss_warning();
                    }
                });
            if !open {
                self.controller.dismiss_warning();
            }
        }
        if let Some(message) = self.controller.ui.error.clone() {
            let mut open = true;
            egui::Window::new("Error")
                .collapsible(false)
                .resizable(false)
                .open(&mut open)
                .show(ctx, |ui| {
                    ui.label(RichText::new(message).color(style::palette().danger));
                    if ui.button("OK").clicked() {
                        self.controller.dismiss_error();
                    }
                });
            if !open {
                self.controller.dismiss_error();
            }
        }
    }
}

impl EguiApp {
    fn render(&mut self, ctx: &egui::Context) {
        self.apply_visuals(ctx);
        self.render_top_bar(ctx);
        self.render_status(ctx);
        self.render_report_panel(ctx);
        self.render_details_panel(ctx);
        self.render_tabs(ctx);
        self.render_windows(ctx);
    }
}

impl eframe::App for EguiApp {
    fn update(&mut self, ctx: &egui::Context, _frame: &mut eframe::Frame) {
        self.render(ctx);
    }
}

fn render_load_gauge(ui: &mut Ui, view: &DerivedView) {
    ui.label("Load");
    ui.add(
        egui::ProgressBar::new((view.load_percent / 100.0) as f32)
            .desired_width(260.0)
            .text(format!("{:.0} MW ({:.0}%)", view.load_mw, view.load_percent)),
    );
}

fn render_survival_tab(ui: &mut Ui, view: &DerivedView) {
    let marker_label = view
        .median_survival
        .map(|time| format!("median {time:.0}"));
    let marker = view.median_survival.zip(marker_label.as_deref());
    let series = [ChartSeries {
        label: "survival",
        curve: &view.survival,
        color: style::palette().accent_ice,
    }];
    charts::step_chart(ui, &series, Some((0.0, 1.0)), marker, "survival probability");
    match view.median_survival {
        Some(time) => ui.label(format!("Median survival time: {time:.0}")),
        None => ui.label("Median survival not reached within the observed horizon"),
    };
}

fn render_hazard_tab(ui: &mut Ui, view: &DerivedView) {
    if view.hazard_ratios.is_empty() {
        ui.label(RichText::new(NO_COEFFICIENTS).italics());
        return;
    }
    charts::hazard_ratio_chart(ui, &view.hazard_ratios);
    ui.add_space(8.0);
    for effect in &view.effects {
        ui.label(effect.describe());
    }
}

fn render_cumulative_tab(ui: &mut Ui, view: &DerivedView) {
    let series = [ChartSeries {
        label: "cumulative hazard",
        curve: &view.cumulative_hazard,
        color: style::palette().accent_copper,
    }];
    charts::step_chart(ui, &series, None, None, "cumulative hazard");
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::tempdir;

    fn test_app() -> EguiApp {
        let dir = tempdir().unwrap();
        let mut settings = AppSettings::default();
        settings.data.path = dir.path().join("missing.csv");
        settings.data.seed = Some(8);
        EguiApp::new(&settings).unwrap()
    }

    fn painted_text(ctx: &egui::Context, app: &mut EguiApp) -> String {
        let input = egui::RawInput {
            screen_rect: Some(egui::Rect::from_min_size(
                egui::Pos2::ZERO,
                egui::vec2(1280.0, 860.0),
            )),
            ..Default::default()
        };
        let output = ctx.run(input, |ctx| app.render(ctx));
        let mut text = String::new();
        for clipped in &output.shapes {
            collect_text(&clipped.shape, &mut text);
        }
        text
    }

    fn collect_text(shape: &egui::Shape, out: &mut String) {
        match shape {
            egui::Shape::Text(text) => {
                out.push_str(text.galley.text());
                out.push('\n');
            }
            egui::Shape::Vec(shapes) => shapes.iter().for_each(|shape| collect_text(shape, out)),
            _ => {}
        }
    }

    #[test]
    fn report_is_painted_while_details_are_hidden() {
        let ctx = egui::Context::default();
        let mut app = test_app();
        assert!(!app.controller.ui.show_details);

        let text = painted_text(&ctx, &mut app);

        assert!(text.contains("Strongest effect"));
        assert!(text.contains("Individual load state of item #0"));
        assert!(!text.contains("(censored)") && !text.contains("(failure observed)"));
        assert!(app.controller.ui.view.is_some());
    }

    #[test]
    fn typed_index_past_the_end_opens_error_window() {
        let mut app = test_app();
        app.commit_index_input(3);
        assert_eq!(app.controller.ui.index_input, 3);

        app.commit_index_input(10_000);
        assert_eq!(app.controller.ui.index_input, 3);
        assert!(
            app.controller
                .ui
                .error
                .as_deref()
                .is_some_and(|message| message.contains("out of range"))
        );
    }
}
