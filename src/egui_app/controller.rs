//! Bridges the dashboard session to the egui UI state.

use tracing::warn;

use crate::egui_app::state::UiState;
use crate::egui_app::ui::style::{self, StatusTone};
use crate::session::{Session, SessionError};
use crate::settings::AppSettings;
use crate::views::{DerivedView, GroupBy};

/// Maintains the session and mirrors its latest view into [`UiState`].
pub struct EguiController {
    pub ui: UiState,
    session: Session,
}

impl EguiController {
    /// Start a session from settings; only an unusable model is fatal.
    pub fn new(settings: &AppSettings) -> Result<Self, SessionError> {
        let startup = Session::start(settings)?;
        let mut controller = Self {
            ui: UiState::default(),
            session: startup.session,
        };
        controller.sync_dataset();
        controller.apply_view(startup.view);
        match startup.notice {
            Some(notice) => {
                let message = notice.to_string();
                controller.set_status("Showing generated data", StatusTone::Warning);
                controller.ui.warning = Some(message);
            }
            None => controller.set_status("Data loaded", StatusTone::Info),
        }
        Ok(controller)
    }

    pub fn session(&self) -> &Session {
        &self.session
    }

    pub fn select_index(&mut self, index: usize) {
        let result = self.session.select(index);
        self.handle(result);
    }

    pub fn select_id(&mut self, id: &str) {
        let result = self.session.select_by_id(id);
        self.handle(result);
    }

    pub fn change_grouping(&mut self, name: &str) {
        let result = self.session.change_grouping(name);
        self.ui.grouping = self.session.grouping().map(|group_by| group_by.name().to_string());
        self.handle(result);
    }

    /// Replace the data with freshly generated records of the configured size.
    pub fn regenerate(&mut self) {
        let size = self.session.regenerate_size();
        match self.session.regenerate(size) {
            Ok(view) => {
                self.sync_dataset();
                self.apply_view(view);
                self.set_status(format!("Generated {size} new records"), StatusTone::Info);
            }
            Err(err) => self.report_error(err),
        }
    }

    pub fn refresh(&mut self) {
        let result = self.session.refresh();
        self.handle(result);
    }

    pub fn toggle_details(&mut self) {
        self.ui.show_details = !self.ui.show_details;
    }

    pub fn dismiss_warning(&mut self) {
        self.ui.warning = None;
    }

    pub fn dismiss_error(&mut self) {
        self.ui.error = None;
    }

    fn handle(&mut self, result: Result<DerivedView, SessionError>) {
        match result {
            Ok(view) => self.apply_view(view),
            Err(err) => self.report_error(err),
        }
    }

    fn report_error(&mut self, err: SessionError) {
        warn!("{err}");
        // Keep the spinner and combo box in step with the unchanged selection.
        self.ui.index_input = self.session.selected_index();
        self.set_status(err.to_string(), StatusTone::Error);
        self.ui.error = Some(err.to_string());
    }

    fn apply_view(&mut self, view: DerivedView) {
        self.ui.index_input = view.index;
        self.ui.selected_id = view.record_id.to_string();
        self.ui.view = Some(view);
    }

    fn sync_dataset(&mut self) {
        let dataset = self.session.dataset();
        self.ui.title = format!("Equipment survival dashboard ({})", dataset.origin().label());
        self.ui.record_ids = dataset
            .records()
            .iter()
            .map(|record| record.id.to_string())
            .collect();
        self.ui.grouping_options = self
            .session
            .available_groupings()
            .into_iter()
            .map(|group_by: GroupBy| (group_by.name().to_string(), group_by.label().to_string()))
            .collect();
        self.ui.grouping = self.session.grouping().map(|group_by| group_by.name().to_string());
    }

    fn set_status(&mut self, text: impl Into<String>, tone: StatusTone) {
        self.ui.status.text = text.into();
        self.ui.status.badge_label = style::status_badge_label(tone).to_string();
        self.ui.status.badge_color = style::status_badge_color(tone);
    }
}
