//! Shared state types for the egui dashboard.

use egui::Color32;

use crate::egui_app::ui::style;
use crate::views::DerivedView;

/// Top-level UI model consumed by the egui renderer.
#[derive(Clone, Debug)]
pub struct UiState {
    pub title: String,
    pub status: StatusBarState,
    pub tab: DashboardTab,
    pub show_details: bool,
    /// Index typed into the record spinner.
    pub index_input: usize,
    pub selected_id: String,
    /// Record ids offered by the id combo box, in dataset order.
    pub record_ids: Vec<String>,
    /// `(column name, label)` pairs offered by the grouping combo box.
    pub grouping_options: Vec<(String, String)>,
    pub grouping: Option<String>,
    pub view: Option<DerivedView>,
    /// Non-fatal data warning, shown until dismissed.
    pub warning: Option<String>,
    /// Last rejected action, shown until dismissed.
    pub error: Option<String>,
}

impl Default for UiState {
    fn default() -> Self {
        Self {
            title: String::new(),
            status: StatusBarState::idle(),
            tab: DashboardTab::default(),
            show_details: false,
            index_input: 0,
            selected_id: String::new(),
            record_ids: Vec::new(),
            grouping_options: Vec::new(),
            grouping: None,
            view: None,
            warning: None,
            error: None,
        }
    }
}

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub enum DashboardTab {
    #[default]
    SurvivalForecast,
    HazardRatios,
    CumulativeHazard,
    GroupedSurvival,
}

impl DashboardTab {
    pub const ALL: [DashboardTab; 4] = [
        DashboardTab::SurvivalForecast,
        DashboardTab::HazardRatios,
        DashboardTab::CumulativeHazard,
        DashboardTab::GroupedSurvival,
    ];

    pub fn label(self) -> &'static str {
        match self {
            DashboardTab::SurvivalForecast => "Survival forecast",
            DashboardTab::HazardRatios => "Hazard ratios",
            DashboardTab::CumulativeHazard => "Cumulative hazard",
            DashboardTab::GroupedSurvival => "Grouped survival",
        }
    }
}

/// Status badge + text shown in the footer.
#[derive(Clone, Debug, PartialEq)]
pub struct StatusBarState {
    pub text: String,
    pub badge_label: String,
    pub badge_color: Color32,
}

impl StatusBarState {
    pub fn idle() -> Self {
        Self {
            text: "No data loaded".into(),
            badge_label: "Idle".into(),
            badge_color: style::status_badge_color(style::StatusTone::Idle),
        }
    }
}
