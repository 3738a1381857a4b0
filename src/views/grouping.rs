//! Stratified Kaplan-Meier curves.

use std::collections::{BTreeMap, BTreeSet};
use std::fmt;

use serde::Serialize;
use thiserror::Error;

use crate::dataset::{Covariate, Dataset};
use crate::survival::{KaplanMeierCurve, kaplan_meier};

/// Name accepted by [`resolve_grouping`] for the category column.
pub const CATEGORY_GROUPING: &str = "category";

/// Variables with more distinct values than this are cut into tertiles.
const LITERAL_GROUP_LIMIT: usize = 3;

/// Variable used to stratify the grouped survival tab.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum GroupBy {
    Covariate(Covariate),
    Category,
}

impl GroupBy {
    /// Column name as accepted by [`resolve_grouping`].
    pub fn name(self) -> &'static str {
        match self {
            GroupBy::Covariate(covariate) => covariate.column(),
            GroupBy::Category => CATEGORY_GROUPING,
        }
    }

    pub fn label(self) -> &'static str {
        match self {
            GroupBy::Covariate(covariate) => covariate.label(),
            GroupBy::Category => "Category",
        }
    }

    /// Every grouping the dataset supports, covariates first.
    pub fn available(dataset: &Dataset) -> Vec<GroupBy> {
        let mut options: Vec<GroupBy> = dataset
            .covariates()
            .iter()
            .copied()
            .map(GroupBy::Covariate)
            .collect();
        if dataset.has_categories() {
            options.push(GroupBy::Category);
        }
        options
    }
}

impl fmt::Display for GroupBy {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("No variable available for grouping")]
pub struct GroupingUnavailable;

/// Resolve a grouping name against the dataset, falling back to the first
/// available variable when the name is unknown or not present.
pub fn resolve_grouping(
    requested: &str,
    dataset: &Dataset,
) -> Result<GroupBy, GroupingUnavailable> {
    let available = GroupBy::available(dataset);
    let wanted = requested.trim();
    if let Some(found) = available
        .iter()
        .find(|option| option.name().eq_ignore_ascii_case(wanted))
    {
        return Ok(*found);
    }
    available.first().copied().ok_or(GroupingUnavailable)
}

/// One stratum of the grouped survival tab.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct GroupCurve {
    pub label: String,
    pub curve: KaplanMeierCurve,
}

/// Per-record group membership; `membership[i]` indexes `labels`.
#[derive(Debug, Clone, PartialEq)]
pub struct GroupAssignment {
    pub labels: Vec<String>,
    pub membership: Vec<usize>,
}

pub fn assign_groups(dataset: &Dataset, group_by: GroupBy) -> GroupAssignment {
    match group_by {
        GroupBy::Covariate(covariate) => assign_numeric(&dataset.covariate_values(covariate)),
        GroupBy::Category => {
            let labels: Vec<String> = dataset
                .records()
                .iter()
                .map(|record| record.category_or_inferred().label().to_string())
                .collect();
            assign_literal(labels)
        }
    }
}

/// Kaplan-Meier curve for every non-empty group, in group order.
pub fn group_survival(dataset: &Dataset, group_by: GroupBy) -> Vec<GroupCurve> {
    let assignment = assign_groups(dataset, group_by);
    let mut members: Vec<Vec<(f64, bool)>> = vec![Vec::new(); assignment.labels.len()];
    for (record, group) in dataset.records().iter().zip(&assignment.membership) {
        members[*group].push((record.duration, record.event));
    }
    assignment
        .labels
        .into_iter()
        .zip(members)
        .filter(|(_, observations)| !observations.is_empty())
        .map(|(label, observations)| GroupCurve {
            label,
            curve: kaplan_meier(&observations),
        })
        .collect()
}

fn assign_numeric(values: &[f64]) -> GroupAssignment {
    let mut sorted = values.to_vec();
    sorted.sort_by(f64::total_cmp);
    let mut distinct = sorted.clone();
    distinct.dedup();
    if distinct.len() <= LITERAL_GROUP_LIMIT {
        let labels = distinct.iter().map(|value| format_value(*value)).collect();
        let membership = values
            .iter()
            .map(|value| {
                distinct
                    .iter()
                    .position(|candidate| candidate == value)
                    .unwrap_or_default()
            })
            .collect();
        return GroupAssignment { labels, membership };
    }

    let mut edges: Vec<f64> = [0.0, 1.0 / 3.0, 2.0 / 3.0, 1.0]
        .iter()
        .map(|q| quantile(&sorted, *q))
        .collect();
    edges.dedup();
    let bins = edges.len().saturating_sub(1).max(1);
    let membership = values
        .iter()
        .map(|value| {
            edges[1..]
                .iter()
                .position(|upper| value <= upper)
                .unwrap_or(bins - 1)
        })
        .collect();
    GroupAssignment {
        labels: tertile_labels(bins),
        membership,
    }
}

fn assign_literal(values: Vec<String>) -> GroupAssignment {
    let positions: BTreeMap<String, usize> = values
        .iter()
        .cloned()
        .collect::<BTreeSet<_>>()
        .into_iter()
        .enumerate()
        .map(|(position, key)| (key, position))
        .collect();
    let membership = values
        .iter()
        .map(|value| positions.get(value).copied().unwrap_or_default())
        .collect();
    GroupAssignment {
        labels: positions.into_keys().collect(),
        membership,
    }
}

/// Linearly interpolated quantile of sorted, non-empty values.
fn quantile(sorted: &[f64], q: f64) -> f64 {
    let Some(last) = sorted.len().checked_sub(1) else {
        return 0.0;
    };
    let position = q * last as f64;
    let lower = position.floor() as usize;
    let upper = position.ceil() as usize;
    let fraction = position - lower as f64;
    sorted[lower] + (sorted[upper] - sorted[lower]) * fraction
}

fn tertile_labels(bins: usize) -> Vec<String> {
    let labels: &[&str] = match bins {
        1 => &["All"],
        2 => &["Low", "High"],
        _ => &["Low", "Medium", "High"],
    };
    labels.iter().map(|label| label.to_string()).collect()
}

/// Whole numbers print without a fractional part.
pub(crate) fn format_value(value: f64) -> String {
    if value.fract() == 0.0 && value.abs() < 1e15 {
        format!("{value:.0}")
    } else {
        format!("{value}")
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::dataset::test_support::record;
    use crate::dataset::{Category, DataOrigin, synthetic};

    fn dataset_with(covariate: Covariate, values: &[f64]) -> Dataset {
        let records = values
            .iter()
            .enumerate()
            .map(|(i, value)| record(i, 10.0 + i as f64, i % 2 == 0, &[(covariate, *value)]))
            .collect();
        Dataset::new(records, DataOrigin::Synthetic { seed: None })
    }

    fn assert_covers_every_record(dataset: &Dataset, group_by: GroupBy) {
        let curves = group_survival(dataset, group_by);
        assert!(curves.iter().all(|group| group.curve.observations() > 0));
        let total: usize = curves.iter().map(|group| group.curve.observations()).sum();
        assert_eq!(total, dataset.len());
    }

    #[test]
    fn many_distinct_values_are_cut_into_tertiles() {
        let values: Vec<f64> = (1..=9).map(f64::from).collect();
        let dataset = dataset_with(Covariate::Load, &values);
        let assignment = assign_groups(&dataset, GroupBy::Covariate(Covariate::Load));
        assert_eq!(assignment.labels, vec!["Low", "Medium", "High"]);
        assert_eq!(assignment.membership, vec![0, 0, 0, 1, 1, 1, 2, 2, 2]);
        assert_covers_every_record(&dataset, GroupBy::Covariate(Covariate::Load));
    }

    #[test]
    fn duplicate_edges_collapse_to_fewer_bins() {
        let values = [0.0, 0.0, 0.0, 0.0, 0.0, 5.0, 7.0, 9.0];
        let dataset = dataset_with(Covariate::Age, &values);
        let assignment = assign_groups(&dataset, GroupBy::Covariate(Covariate::Age));
        assert_eq!(assignment.labels, vec!["Low", "High"]);
        assert_eq!(assignment.membership, vec![0, 0, 0, 0, 0, 1, 1, 1]);
        assert_covers_every_record(&dataset, GroupBy::Covariate(Covariate::Age));
    }

    #[test]
    fn few_distinct_values_group_literally_in_numeric_order() {
        let values = [1.0, 0.0, 1.0, 0.0, 0.0];
        let dataset = dataset_with(Covariate::Holiday, &values);
        let curves = group_survival(&dataset, GroupBy::Covariate(Covariate::Holiday));
        let labels: Vec<&str> = curves.iter().map(|group| group.label.as_str()).collect();
        assert_eq!(labels, vec!["0", "1"]);
        assert_eq!(curves[0].curve.observations(), 3);
    }

    #[test]
    fn categories_group_lexicographically() {
        let mut records: Vec<_> = (0..4).map(|i| record(i, 5.0, true, &[])).collect();
        records[0].category = Some(Category::Substation);
        records[1].category = Some(Category::Generator);
        records[2].category = Some(Category::Line);
        records[3].category = Some(Category::Generator);
        let dataset = Dataset::new(records, DataOrigin::Synthetic { seed: None });
        let curves = group_survival(&dataset, GroupBy::Category);
        let labels: Vec<&str> = curves.iter().map(|group| group.label.as_str()).collect();
        assert_eq!(labels, vec!["Generator", "Line", "Substation"]);
        assert_covers_every_record(&dataset, GroupBy::Category);
    }

    #[test]
    fn synthetic_data_groups_cover_all_records() {
        let dataset = synthetic::synthesize_seeded(120, 42);
        for group_by in GroupBy::available(&dataset) {
            assert_covers_every_record(&dataset, group_by);
        }
    }

    #[test]
    fn unknown_grouping_falls_back_to_first_variable() {
        let dataset = synthetic::synthesize_seeded(10, 1);
        assert_eq!(
            resolve_grouping("CATEGORY", &dataset),
            Ok(GroupBy::Category)
        );
        assert_eq!(
            resolve_grouping("wind_speed_ms", &dataset),
            Ok(GroupBy::Covariate(Covariate::WindSpeed))
        );
        assert_eq!(
            resolve_grouping("voltage", &dataset),
            Ok(GroupBy::Covariate(Covariate::Load))
        );
        let empty = Dataset::new(Vec::new(), DataOrigin::Synthetic { seed: None });
        assert_eq!(resolve_grouping("load_mw", &empty), Err(GroupingUnavailable));
    }

    #[test]
    fn whole_numbers_format_without_decimals() {
        assert_eq!(format_value(3.0), "3");
        assert_eq!(format_value(0.25), "0.25");
    }
}
