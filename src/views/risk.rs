use serde::Serialize;

use crate::dataset::{Dataset, EquipmentRecord};

/// Partial hazard below which a record is low risk.
pub const LOW_RISK_BELOW: f64 = 0.8;
/// Partial hazard from which a record is high risk.
pub const HIGH_RISK_FROM: f64 = 1.2;

/// Categorical reading of a record's partial hazard.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum RiskBucket {
    Low,
    Moderate,
    High,
}

impl RiskBucket {
    /// Label shown next to the record selector and in the report.
    pub fn label(self) -> &'static str {
        match self {
            RiskBucket::Low => "Low load",
            RiskBucket::Moderate => "Moderate load",
            RiskBucket::High => "High load",
        }
    }
}

pub fn risk_bucket(partial_hazard: f64) -> RiskBucket {
    if partial_hazard < LOW_RISK_BELOW {
        RiskBucket::Low
    } else if partial_hazard < HIGH_RISK_FROM {
        RiskBucket::Moderate
    } else {
        RiskBucket::High
    }
}

/// Record load rescaled to the dataset's observed load range, in percent.
pub fn normalized_load(record: &EquipmentRecord, dataset: &Dataset) -> f64 {
    let Some((min, max)) = dataset.load_range() else {
        return 0.0;
    };
    if max <= min {
        return 0.0;
    }
    ((record.load_mw() - min) / (max - min) * 100.0).clamp(0.0, 100.0)
}
