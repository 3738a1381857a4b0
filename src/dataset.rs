//! Equipment records, dataset container, and display-column back-filling.

use std::fmt;
use std::path::PathBuf;

use serde::Serialize;

pub mod loader;
pub mod synthetic;

pub use loader::{DatasetLoadError, load, parse_csv};
pub use synthetic::synthesize;

/// Required column holding the observed duration until failure or censoring.
pub const DURATION_COLUMN: &str = "duration";
/// Required column holding the failure indicator.
pub const EVENT_COLUMN: &str = "event";
/// Optional identifier column.
pub const ID_COLUMN: &str = "id";
/// Optional display-name column.
pub const NAME_COLUMN: &str = "name";
/// Optional equipment-category column.
pub const CATEGORY_COLUMN: &str = "category";

/// Capacity above which equipment is classified as a generator.
pub const GENERATOR_CAPACITY_MW: f64 = 6000.0;
/// Capacity above which equipment is classified as a substation.
pub const SUBSTATION_CAPACITY_MW: f64 = 5200.0;

/// Covariates fed into the proportional-hazards fit, in fit order.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum Covariate {
    Load,
    Capacity,
    Utilization,
    Temperature,
    WindSpeed,
    Holiday,
    Age,
}

impl Covariate {
    /// Number of covariates in the schema.
    pub const COUNT: usize = 7;

    /// Every covariate in fit order.
    pub const ALL: [Covariate; Covariate::COUNT] = [
        Covariate::Load,
        Covariate::Capacity,
        Covariate::Utilization,
        Covariate::Temperature,
        Covariate::WindSpeed,
        Covariate::Holiday,
        Covariate::Age,
    ];

    /// Column header used in input files.
    pub fn column(self) -> &'static str {
        match self {
            Covariate::Load => "load_mw",
            Covariate::Capacity => "capacity_mw",
            Covariate::Utilization => "utilization",
            Covariate::Temperature => "temperature_c",
            Covariate::WindSpeed => "wind_speed_ms",
            Covariate::Holiday => "holiday",
            Covariate::Age => "age_years",
        }
    }

    /// Human-readable label for charts and reports.
    pub fn label(self) -> &'static str {
        match self {
            Covariate::Load => "Load (MW)",
            Covariate::Capacity => "Capacity (MW)",
            Covariate::Utilization => "Utilization",
            Covariate::Temperature => "Temperature (°C)",
            Covariate::WindSpeed => "Wind speed (m/s)",
            Covariate::Holiday => "Holiday",
            Covariate::Age => "Age (years)",
        }
    }

    /// Position of the covariate inside a [`CovariateVector`].
    pub fn index(self) -> usize {
        self as usize
    }

    /// Resolve a column header back to its covariate.
    pub fn from_column(name: &str) -> Option<Self> {
        let name = name.trim();
        Self::ALL
            .into_iter()
            .find(|covariate| covariate.column().eq_ignore_ascii_case(name))
    }
}

impl fmt::Display for Covariate {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.column())
    }
}

/// Fixed-size covariate values for one record, indexed by [`Covariate`].
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct CovariateVector([f64; Covariate::COUNT]);

impl CovariateVector {
    pub fn new(values: [f64; Covariate::COUNT]) -> Self {
        Self(values)
    }

    pub fn get(&self, covariate: Covariate) -> f64 {
        self.0[covariate.index()]
    }

    pub fn set(&mut self, covariate: Covariate, value: f64) {
        self.0[covariate.index()] = value;
    }

    pub fn as_slice(&self) -> &[f64] {
        &self.0
    }
}

/// Equipment class shown on record cards and usable as a grouping variable.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize)]
pub enum Category {
    Generator,
    Substation,
    Line,
    Other(String),
}

impl Category {
    /// Classify equipment by installed capacity.
    pub fn from_capacity(capacity_mw: f64) -> Self {
        if capacity_mw > GENERATOR_CAPACITY_MW {
            Category::Generator
        } else if capacity_mw > SUBSTATION_CAPACITY_MW {
            Category::Substation
        } else {
            Category::Line
        }
    }

    /// Parse a category cell; unknown names are kept verbatim.
    pub fn parse(value: &str) -> Option<Self> {
        let value = value.trim();
        if value.is_empty() {
            return None;
        }
        let category = match value.to_ascii_lowercase().as_str() {
            "generator" => Category::Generator,
            "substation" => Category::Substation,
            "line" => Category::Line,
            _ => Category::Other(value.to_string()),
        };
        Some(category)
    }

    pub fn label(&self) -> &str {
        match self {
            Category::Generator => "Generator",
            Category::Substation => "Substation",
            Category::Line => "Line",
            Category::Other(name) => name,
        }
    }
}

impl fmt::Display for Category {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}

/// Identifier of an equipment record as it appears in the source data.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize)]
pub struct RecordId(String);

impl RecordId {
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    /// Identifier assigned to rows of files without an `id` column.
    pub fn from_row_number(row: usize) -> Self {
        Self((row + 1).to_string())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for RecordId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// One row of the equipment dataset.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct EquipmentRecord {
    pub id: RecordId,
    /// Observed time until failure or censoring; never negative.
    pub duration: f64,
    /// `true` when a failure was observed, `false` when censored.
    pub event: bool,
    pub covariates: CovariateVector,
    pub name: Option<String>,
    pub category: Option<Category>,
    /// Unrecognized input columns, kept for the detail panel.
    pub extras: Vec<(String, String)>,
}

impl EquipmentRecord {
    /// Display name, deriving `Item-{id}` when none is stored.
    pub fn display_name(&self) -> String {
        self.name
            .clone()
            .unwrap_or_else(|| default_item_name(&self.id))
    }

    /// Stored category, or the capacity-derived one.
    pub fn category_or_inferred(&self) -> Category {
        self.category
            .clone()
            .unwrap_or_else(|| Category::from_capacity(self.covariates.get(Covariate::Capacity)))
    }

    pub fn load_mw(&self) -> f64 {
        self.covariates.get(Covariate::Load)
    }
}

/// Where the records of a dataset came from.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub enum DataOrigin {
    File(PathBuf),
    Synthetic { seed: Option<u64> },
}

impl DataOrigin {
    /// Short source label used in window titles and report headers.
    pub fn label(&self) -> String {
        match self {
            DataOrigin::File(path) => path
                .file_name()
                .map(|name| name.to_string_lossy().to_string())
                .unwrap_or_else(|| path.display().to_string()),
            DataOrigin::Synthetic { .. } => "random data".to_string(),
        }
    }

    pub fn is_synthetic(&self) -> bool {
        matches!(self, DataOrigin::Synthetic { .. })
    }
}

/// Display columns that were derived rather than read from the source.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct Backfilled {
    pub name: bool,
    pub category: bool,
}

/// Ordered collection of equipment records sharing one schema.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Dataset {
    records: Vec<EquipmentRecord>,
    origin: DataOrigin,
    backfilled: Backfilled,
    extra_columns: Vec<String>,
}

impl Dataset {
    pub fn new(records: Vec<EquipmentRecord>, origin: DataOrigin) -> Self {
        Self {
            records,
            origin,
            backfilled: Backfilled::default(),
            extra_columns: Vec::new(),
        }
    }

    pub(crate) fn with_extra_columns(mut self, extra_columns: Vec<String>) -> Self {
        self.extra_columns = extra_columns;
        self
    }

    pub fn len(&self) -> usize {
        self.records.len()
    }

    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }

    pub fn records(&self) -> &[EquipmentRecord] {
        &self.records
    }

    pub fn get(&self, index: usize) -> Option<&EquipmentRecord> {
        self.records.get(index)
    }

    pub fn origin(&self) -> &DataOrigin {
        &self.origin
    }

    pub fn backfilled(&self) -> Backfilled {
        self.backfilled
    }

    /// Passthrough column headers in file order.
    pub fn extra_columns(&self) -> &[String] {
        &self.extra_columns
    }

    /// Covariates carried by every record of this dataset.
    ///
    /// The loader rejects files missing any covariate column, so a non-empty
    /// dataset always carries the full set.
    pub fn covariates(&self) -> &'static [Covariate] {
        if self.records.is_empty() {
            &[]
        } else {
            &Covariate::ALL
        }
    }

    /// Whether any record has a category (stored or back-filled).
    pub fn has_categories(&self) -> bool {
        self.records.iter().any(|record| record.category.is_some())
    }

    /// Row index of the first record with the given identifier.
    pub fn position_of_id(&self, id: &str) -> Option<usize> {
        let id = id.trim();
        self.records
            .iter()
            .position(|record| record.id.as_str() == id)
    }

    /// Column of values for one covariate, in record order.
    pub fn covariate_values(&self, covariate: Covariate) -> Vec<f64> {
        self.records
            .iter()
            .map(|record| record.covariates.get(covariate))
            .collect()
    }

    /// Observed `(min, max)` load, or `None` for an empty dataset.
    pub fn load_range(&self) -> Option<(f64, f64)> {
        self.records.iter().map(EquipmentRecord::load_mw).fold(None, |acc, load| {
            Some(match acc {
                None => (load, load),
                Some((min, max)) => (min.min(load), max.max(load)),
            })
        })
    }

    /// Fill missing display names and categories in place.
    pub fn backfill_display_columns(&mut self) {
        for record in &mut self.records {
            if record.name.is_none() {
                record.name = Some(default_item_name(&record.id));
                self.backfilled.name = true;
            }
            if record.category.is_none() {
                record.category = Some(Category::from_capacity(
                    record.covariates.get(Covariate::Capacity),
                ));
                self.backfilled.category = true;
            }
        }
    }
}

/// Ensure display name and category are present on every record.
pub fn backfill_display_columns(dataset: &mut Dataset) {
    dataset.backfill_display_columns();
}

fn default_item_name(id: &RecordId) -> String {
    format!("Item-{id}")
}

#[cfg(test)]
pub(crate) mod test_support {
    use super::*;

    /// Build a record with every covariate zeroed except the given overrides.
    pub fn record(
        id: usize,
        duration: f64,
        event: bool,
        overrides: &[(Covariate, f64)],
    ) -> EquipmentRecord {
        let mut covariates = CovariateVector::new([0.0; Covariate::COUNT]);
        for &(covariate, value) in overrides {
            covariates.set(covariate, value);
        }
        EquipmentRecord {
            id: RecordId::new(id.to_string()),
            duration,
            event,
            covariates,
            name: None,
            category: None,
            extras: Vec::new(),
        }
    }
}
