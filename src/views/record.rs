use crate::dataset::{
    CATEGORY_COLUMN, Covariate, DURATION_COLUMN, Dataset, EVENT_COLUMN, EquipmentRecord,
    ID_COLUMN, NAME_COLUMN,
};

use super::grouping::format_value;

/// Separator between the parts of the summary card.
const CARD_SEPARATOR: &str = "  •  ";

/// One-line identity card shown above the charts.
pub fn summary_card(record: &EquipmentRecord) -> String {
    [
        record.display_name(),
        format!("({})", record.category_or_inferred()),
        format!("ID: {}", record.id),
        format!("Load: {:.0} MW", record.load_mw()),
        format!("Capacity: {:.0} MW", record.covariates.get(Covariate::Capacity)),
        format!(
            "Utilization: {:.2}",
            record.covariates.get(Covariate::Utilization)
        ),
    ]
    .join(CARD_SEPARATOR)
}

/// Field/value pairs for the detail panel, passthrough columns included.
pub fn detail_rows(record: &EquipmentRecord, dataset: &Dataset) -> Vec<(String, String)> {
    let mut rows = vec![
        (ID_COLUMN.to_string(), record.id.to_string()),
        (NAME_COLUMN.to_string(), record.display_name()),
        (
            CATEGORY_COLUMN.to_string(),
            record.category_or_inferred().to_string(),
        ),
        (DURATION_COLUMN.to_string(), format_value(record.duration)),
        (
            EVENT_COLUMN.to_string(),
            if record.event {
                "1 (failure observed)".to_string()
            } else {
                "0 (censored)".to_string()
            },
        ),
    ];
    rows.extend(Covariate::ALL.iter().map(|covariate| {
        (
            covariate.column().to_string(),
            format_value(record.covariates.get(*covariate)),
        )
    }));
    rows.extend(record.extras.iter().cloned());
    if dataset.backfilled().category {
        rows.push((
            "category source".to_string(),
            "inferred from capacity".to_string(),
        ));
    }
    rows
}
