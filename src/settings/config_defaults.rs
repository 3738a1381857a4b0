use std::path::PathBuf;

use crate::dataset::Covariate;
use crate::dataset::synthetic::{DEFAULT_REGENERATE_SIZE, DEFAULT_SYNTHETIC_SIZE};

/// Smallest dataset the generator is asked for.
pub(super) const MIN_DATASET_SIZE: usize = 2;

pub(super) fn default_data_path() -> PathBuf {
    PathBuf::from("cox_energy_dataset.csv")
}

pub(super) fn default_synthetic_size() -> usize {
    DEFAULT_SYNTHETIC_SIZE
}

pub(super) fn default_regenerate_size() -> usize {
    DEFAULT_REGENERATE_SIZE
}

pub(super) fn default_max_iterations() -> usize {
    50
}

pub(super) fn default_tolerance() -> f64 {
    1e-9
}

pub(super) fn default_grouping() -> String {
    Covariate::Load.column().to_string()
}

pub(super) fn clamp_dataset_size(size: usize) -> usize {
    size.max(MIN_DATASET_SIZE)
}

pub(super) fn clamp_max_iterations(value: usize) -> usize {
    value.max(1)
}

pub(super) fn sanitize_tolerance(value: f64) -> f64 {
    if value.is_finite() && value > 0.0 {
        value
    } else {
        default_tolerance()
    }
}
