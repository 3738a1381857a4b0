//! Dashboard session: the current dataset, its fitted model, and the selection.
//!
//! All mutation of data goes through [`Session::replace_dataset_and_model`];
//! every other operation only moves the selection or grouping and returns a
//! freshly computed [`DerivedView`].

use std::fmt;
use std::path::{Path, PathBuf};

use rand::SeedableRng;
use rand::rngs::StdRng;
use thiserror::Error;
use tracing::{info, warn};

use crate::dataset::{self, Dataset, DatasetLoadError};
use crate::settings::AppSettings;
use crate::survival::{CoxModel, FitError, FitOptions, fit};
use crate::views::{self, DerivedView, GroupBy, ViewError, resolve_grouping};

#[derive(Debug, Error)]
pub enum SessionError {
    #[error("Record index {index} is out of range (dataset has {len} records)")]
    Index { index: usize, len: usize },
    #[error("No record with id '{0}'")]
    UnknownId(String),
    #[error("Model fit failed: {0}")]
    Fit(#[from] FitError),
    #[error("No usable model could be fitted, even on generated data: {0}")]
    NoUsableModel(FitError),
    #[error(transparent)]
    View(#[from] ViewError),
}

/// Why the configured data file was replaced by generated data.
#[derive(Debug, Error)]
pub enum FallbackReason {
    #[error(transparent)]
    Load(#[from] DatasetLoadError),
    #[error("model fit failed on loaded data: {0}")]
    Fit(#[from] FitError),
}

/// Non-fatal warning shown when startup fell back to generated data.
#[derive(Debug)]
pub struct FallbackNotice {
    pub path: PathBuf,
    pub reason: FallbackReason,
    pub generated: usize,
}

impl fmt::Display for FallbackNotice {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "Could not use {}: {}\nShowing {} randomly generated records instead.",
            self.path.display(),
            self.reason,
            self.generated
        )
    }
}

/// Result of [`Session::start`].
#[derive(Debug)]
pub struct Startup {
    pub session: Session,
    pub view: DerivedView,
    pub notice: Option<FallbackNotice>,
}

#[derive(Debug)]
pub struct Session {
    dataset: Dataset,
    model: CoxModel,
    selected: usize,
    requested_grouping: String,
    grouping: Option<GroupBy>,
    fit_options: FitOptions,
    regenerate_size: usize,
    rng: StdRng,
}

impl Session {
    /// Load the configured dataset and fit it, falling back to generated data.
    pub fn start(settings: &AppSettings) -> Result<Startup, SessionError> {
        let mut rng = session_rng(settings);
        let fit_options = settings.model.fit_options();
        let path = settings.data.path.as_path();

        let (dataset, model, notice) = match load_and_fit(path, &fit_options) {
            Ok((dataset, model)) => {
                info!("Loaded {} records from {}", dataset.len(), path.display());
                (dataset, model, None)
            }
            Err(reason) => {
                warn!("Falling back to generated data: {reason}");
                let generated = settings.data.synthetic_size;
                let dataset = dataset::synthesize(generated, &mut rng);
                let model = fit(&dataset, &fit_options).map_err(SessionError::NoUsableModel)?;
                let notice = FallbackNotice {
                    path: path.to_path_buf(),
                    reason,
                    generated,
                };
                (dataset, model, Some(notice))
            }
        };

        let mut session = Self::assemble(dataset, model, settings, rng);
        let view = session.select(0)?;
        Ok(Startup {
            session,
            view,
            notice,
        })
    }

    /// Backfill and fit a dataset supplied by the caller; no fallback is attempted.
    pub fn with_dataset(
        mut dataset: Dataset,
        settings: &AppSettings,
    ) -> Result<Self, SessionError> {
        dataset.backfill_display_columns();
        let model = fit(&dataset, &settings.model.fit_options())?;
        Ok(Self::assemble(dataset, model, settings, session_rng(settings)))
    }

    fn assemble(dataset: Dataset, model: CoxModel, settings: &AppSettings, rng: StdRng) -> Self {
        Session {
            grouping: resolve_grouping(&settings.view.default_grouping, &dataset).ok(),
            dataset,
            model,
            selected: 0,
            requested_grouping: settings.view.default_grouping.clone(),
            fit_options: settings.model.fit_options(),
            regenerate_size: settings.data.regenerate_size,
            rng,
        }
    }

    pub fn dataset(&self) -> &Dataset {
        &self.dataset
    }

    pub fn model(&self) -> &CoxModel {
        &self.model
    }

    pub fn selected_index(&self) -> usize {
        self.selected
    }

    /// Effective grouping, `None` when the dataset offers nothing to group by.
    pub fn grouping(&self) -> Option<GroupBy> {
        self.grouping
    }

    pub fn available_groupings(&self) -> Vec<GroupBy> {
        GroupBy::available(&self.dataset)
    }

    /// Record count used by [`Session::regenerate`] when driven from the UI.
    pub fn regenerate_size(&self) -> usize {
        self.regenerate_size
    }

    /// Swap in a new dataset and model, resetting the selection to the first record.
    pub fn replace_dataset_and_model(
        &mut self,
        dataset: Dataset,
        model: CoxModel,
    ) -> Result<DerivedView, SessionError> {
        self.grouping = resolve_grouping(&self.requested_grouping, &dataset).ok();
        self.dataset = dataset;
        self.model = model;
        self.selected = 0;
        info!(
            "Session now holds {} records from {}",
            self.dataset.len(),
            self.dataset.origin().label()
        );
        self.refresh()
    }

    /// Move the selection; out-of-range indices leave it unchanged.
    pub fn select(&mut self, index: usize) -> Result<DerivedView, SessionError> {
        let len = self.dataset.len();
        if index >= len {
            warn!("Rejected selection of index {index} ({len} records)");
            return Err(SessionError::Index { index, len });
        }
        let view = views::compute_view(&self.dataset, &self.model, index, self.grouping)?;
        self.selected = index;
        Ok(view)
    }

    pub fn select_by_id(&mut self, id: &str) -> Result<DerivedView, SessionError> {
        let index = self
            .dataset
            .position_of_id(id)
            .ok_or_else(|| SessionError::UnknownId(id.trim().to_string()))?;
        self.select(index)
    }

    /// Regroup the stratified survival tab by the named column.
    pub fn change_grouping(&mut self, name: &str) -> Result<DerivedView, SessionError> {
        self.requested_grouping = name.to_string();
        self.grouping = resolve_grouping(name, &self.dataset).ok();
        match self.grouping {
            Some(group_by) if !group_by.name().eq_ignore_ascii_case(name.trim()) => {
                info!("Grouping '{name}' unavailable, using {}", group_by.name())
            }
            Some(group_by) => info!("Grouping by {}", group_by.name()),
            None => warn!("No variable available for grouping"),
        }
        self.refresh()
    }

    /// Generate `size` fresh records and refit; the old state survives a failed fit.
    pub fn regenerate(&mut self, size: usize) -> Result<DerivedView, SessionError> {
        let dataset = dataset::synthesize(size, &mut self.rng);
        let model = fit(&dataset, &self.fit_options).inspect_err(|err| {
            warn!("Regenerated data could not be fitted, keeping current data: {err}");
        })?;
        self.replace_dataset_and_model(dataset, model)
    }

    /// Recompute the view for the current selection.
    pub fn refresh(&mut self) -> Result<DerivedView, SessionError> {
        self.select(self.selected)
    }
}

fn session_rng(settings: &AppSettings) -> StdRng {
    match settings.data.seed {
        Some(seed) => StdRng::seed_from_u64(seed),
        None => StdRng::from_os_rng(),
    }
}

fn load_and_fit(path: &Path, options: &FitOptions) -> Result<(Dataset, CoxModel), FallbackReason> {
    let mut dataset = dataset::load(path)?;
    dataset.backfill_display_columns();
    let model = fit(&dataset, options)?;
    Ok((dataset, model))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::dataset::Covariate;
    use tempfile::tempdir;

    fn seeded_settings(path: PathBuf) -> AppSettings {
        let mut settings = AppSettings::default();
        settings.data.path = path;
        settings.data.seed = Some(42);
        settings
    }

    #[test]
    fn missing_file_falls_back_to_generated_data() {
        let dir = tempdir().unwrap();
        let startup = Session::start(&seeded_settings(dir.path().join("absent.csv"))).unwrap();
        let notice = startup.notice.expect("fallback notice");
        assert!(matches!(
            notice.reason,
            FallbackReason::Load(DatasetLoadError::NotFound { .. })
        ));
        assert!(notice.to_string().contains("120 randomly generated records"));
        assert_eq!(startup.session.dataset().len(), 120);
        assert!(startup.session.dataset().origin().is_synthetic());
        assert_eq!(startup.view.index, 0);
    }

    #[test]
    fn schema_errors_fall_back_too() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("bad.csv");
        std::fs::write(&path, "duration,event\n5,1\n").unwrap();
        let startup = Session::start(&seeded_settings(path)).unwrap();
        assert!(matches!(
            startup.notice.map(|notice| notice.reason),
            Some(FallbackReason::Load(DatasetLoadError::Schema { .. }))
        ));
    }

    #[test]
    fn unparsable_cell_falls_back_with_parse_reason() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("typo.csv");
        std::fs::write(
            &path,
            "duration,event,load_mw,capacity_mw,utilization,\
             temperature_c,wind_speed_ms,holiday,age_years\n\
             12,1,abc,5000,0.6,10,3,0,4\n",
        )
        .unwrap();
        let startup = Session::start(&seeded_settings(path)).unwrap();
        match startup.notice.map(|notice| notice.reason) {
            Some(FallbackReason::Load(DatasetLoadError::Parse { line, column, .. })) => {
                assert_eq!(line, 2);
                assert_eq!(column, "load_mw");
            }
            other => panic!("unexpected fallback reason: {other:?}"),
        }
        assert!(startup.session.dataset().origin().is_synthetic());
    }

    #[test]
    fn non_utf8_file_falls_back_with_encoding_reason() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("latin1.csv");
        let mut bytes = b"duration,event,name\n5,1,Transformateur ".to_vec();
        bytes.extend_from_slice(&[0xC9, 0xFF, b'\n']);
        std::fs::write(&path, bytes).unwrap();
        let startup = Session::start(&seeded_settings(path)).unwrap();
        assert!(matches!(
            startup.notice.map(|notice| notice.reason),
            Some(FallbackReason::Load(DatasetLoadError::Encoding(_)))
        ));
        assert_eq!(startup.session.dataset().len(), 120);
    }

    #[test]
    fn unfittable_file_falls_back_with_fit_reason() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("censored.csv");
        let mut text = String::from(
            "duration,event,load_mw,capacity_mw,utilization,\
             temperature_c,wind_speed_ms,holiday,age_years\n",
        );
        for row in 0..6 {
            text.push_str(&format!(
                "{},0,{},5000,0.6,10,3,0,{}\n",
                10 + row,
                3000 + row * 100,
                row + 1
            ));
        }
        std::fs::write(&path, text).unwrap();
        let startup = Session::start(&seeded_settings(path)).unwrap();
        assert!(matches!(
            startup.notice.map(|notice| notice.reason),
            Some(FallbackReason::Fit(FitError::NoEvents))
        ));
    }

    #[test]
    fn selection_errors_leave_state_unchanged() {
        let dir = tempdir().unwrap();
        let mut session = Session::start(&seeded_settings(dir.path().join("absent.csv")))
            .unwrap()
            .session;
        session.select(5).unwrap();
        let err = session.select(500).unwrap_err();
        assert!(matches!(err, SessionError::Index { index: 500, len: 120 }));
        assert_eq!(session.selected_index(), 5);
        assert!(matches!(
            session.select_by_id("nope"),
            Err(SessionError::UnknownId(_))
        ));
        let view = session.select_by_id("10").unwrap();
        assert_eq!(view.index, 9);
    }

    #[test]
    fn grouping_changes_and_falls_back() {
        let dir = tempdir().unwrap();
        let mut session = Session::start(&seeded_settings(dir.path().join("absent.csv")))
            .unwrap()
            .session;
        assert_eq!(session.grouping(), Some(GroupBy::Covariate(Covariate::Load)));
        session.change_grouping("category").unwrap();
        assert_eq!(session.grouping(), Some(GroupBy::Category));
        session.change_grouping("voltage").unwrap();
        assert_eq!(session.grouping(), Some(GroupBy::Covariate(Covariate::Load)));
    }

    #[test]
    fn regenerate_replaces_data_and_resets_selection() {
        let dir = tempdir().unwrap();
        let mut session = Session::start(&seeded_settings(dir.path().join("absent.csv")))
            .unwrap()
            .session;
        session.select(17).unwrap();
        let view = session.regenerate(150).unwrap();
        assert_eq!(session.dataset().len(), 150);
        assert_eq!(session.selected_index(), 0);
        assert_eq!(view.index, 0);
        assert_eq!(view.hazard_ratios.len(), Covariate::COUNT);
    }

    #[test]
    fn prepared_dataset_is_fitted_without_fallback() {
        let dataset = dataset::synthetic::synthesize_seeded(60, 9);
        let mut session = Session::with_dataset(dataset, &AppSettings::default()).unwrap();
        assert_eq!(session.refresh().unwrap().index, 0);

        let empty = Dataset::new(Vec::new(), dataset::DataOrigin::Synthetic { seed: None });
        assert!(matches!(
            Session::with_dataset(empty, &AppSettings::default()),
            Err(SessionError::Fit(FitError::EmptyDataset))
        ));
    }

    #[test]
    fn prepared_dataset_gets_display_columns_backfilled() {
        let records = dataset::synthetic::synthesize_seeded(60, 4)
            .records()
            .iter()
            .cloned()
            .map(|mut record| {
                record.name = None;
                record.category = None;
                record
            })
            .collect();
        let dataset = Dataset::new(records, dataset::DataOrigin::File(PathBuf::from("fleet.csv")));
        let mut session = Session::with_dataset(dataset, &AppSettings::default()).unwrap();
        assert!(session.dataset().backfilled().category);
        assert!(session.available_groupings().contains(&GroupBy::Category));
        let view = session.select(0).unwrap();
        assert!(view.details.iter().any(|(field, value)| {
            field == "category source" && value == "inferred from capacity"
        }));
        assert!(view.summary.starts_with("Item-1"));
    }

    #[test]
    fn failed_regenerate_keeps_previous_state() {
        let dir = tempdir().unwrap();
        let mut session = Session::start(&seeded_settings(dir.path().join("absent.csv")))
            .unwrap()
            .session;
        session.select(3).unwrap();
        assert!(matches!(
            session.regenerate(0),
            Err(SessionError::Fit(FitError::EmptyDataset))
        ));
        assert_eq!(session.dataset().len(), 120);
        assert_eq!(session.selected_index(), 3);
    }
}
