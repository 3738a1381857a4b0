//! Per-selection view data derived from a dataset and its fitted model.
//!
//! Everything here is recomputed from scratch whenever the selection,
//! grouping, or data changes; nothing is cached between selections.

use serde::Serialize;
use thiserror::Error;

use crate::dataset::{Dataset, RecordId};
use crate::survival::{CoxModel, Curve};

pub mod effects;
pub mod grouping;
mod record;
pub mod risk;

pub use effects::{
    EffectDirection, HazardRatioBar, NO_COEFFICIENTS, RankedEffect, hazard_ratio_bars,
    rank_effects, render_report,
};
pub use grouping::{
    GroupBy, GroupCurve, GroupingUnavailable, assign_groups, group_survival, resolve_grouping,
};
pub use record::{detail_rows, summary_card};
pub use risk::{RiskBucket, normalized_load, risk_bucket};

/// Survival probability at which the median is read off a curve.
pub const MEDIAN_SURVIVAL_LEVEL: f64 = 0.5;

#[derive(Debug, Error, PartialEq, Eq)]
pub enum ViewError {
    #[error("Record index {index} is out of range (dataset has {len} records)")]
    IndexOutOfRange { index: usize, len: usize },
}

/// Stratified survival curves, or the reason they cannot be drawn.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub enum GroupedSurvival {
    Curves {
        group_by: GroupBy,
        groups: Vec<GroupCurve>,
    },
    Unavailable(String),
}

/// Everything the dashboard shows for one selected record.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct DerivedView {
    pub index: usize,
    pub record_id: RecordId,
    pub summary: String,
    pub details: Vec<(String, String)>,
    pub survival: Curve,
    pub median_survival: Option<f64>,
    pub cumulative_hazard: Curve,
    pub partial_hazard: f64,
    pub risk: RiskBucket,
    pub load_mw: f64,
    /// Load within the dataset's observed range, 0..=100.
    pub load_percent: f64,
    pub hazard_ratios: Vec<HazardRatioBar>,
    pub effects: Vec<RankedEffect>,
    pub grouped: GroupedSurvival,
    pub report: String,
}

/// First time at which the curve is at or below one half.
pub fn median_survival_time(curve: &Curve) -> Option<f64> {
    curve
        .points()
        .iter()
        .find(|point| point.value <= MEDIAN_SURVIVAL_LEVEL)
        .map(|point| point.time)
}

/// Compute the full view for the record at `index`.
pub fn compute_view(
    dataset: &Dataset,
    model: &CoxModel,
    index: usize,
    group_by: Option<GroupBy>,
) -> Result<DerivedView, ViewError> {
    let record = dataset.get(index).ok_or(ViewError::IndexOutOfRange {
        index,
        len: dataset.len(),
    })?;

    let survival = model.predict_survival(record);
    let median_survival = median_survival_time(&survival);
    let partial_hazard = model.predict_partial_hazard(record);
    let risk = risk_bucket(partial_hazard);
    let effects = rank_effects(model.coefficients());
    let report = render_report(&effects, index, risk, Some(model.diagnostics()));
    let grouped = match group_by {
        Some(group_by) => GroupedSurvival::Curves {
            group_by,
            groups: group_survival(dataset, group_by),
        },
        None => GroupedSurvival::Unavailable(GroupingUnavailable.to_string()),
    };

    Ok(DerivedView {
        index,
        record_id: record.id.clone(),
        summary: summary_card(record),
        details: detail_rows(record, dataset),
        survival,
        median_survival,
        cumulative_hazard: model.predict_cumulative_hazard(record),
        partial_hazard,
        risk,
        load_mw: record.load_mw(),
        load_percent: normalized_load(record, dataset),
        hazard_ratios: hazard_ratio_bars(model.coefficients()),
        effects,
        grouped,
        report,
    })
}
