use std::fmt::Write as _;

use serde::Serialize;

use super::risk::RiskBucket;
use crate::dataset::Covariate;
use crate::survival::{Coefficient, FitDiagnostics};

/// Hazard ratio above which a covariate is reported as raising risk.
pub const INCREASES_ABOVE: f64 = 1.1;
/// Hazard ratio below which a covariate is reported as lowering risk.
pub const DECREASES_BELOW: f64 = 0.9;

/// Placeholder shown when the model has no coefficients.
pub const NO_COEFFICIENTS: &str = "No coefficients available";

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum EffectDirection {
    Increases,
    Decreases,
    Negligible,
}

/// One line of the effect report.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct RankedEffect {
    pub covariate: Covariate,
    pub hazard_ratio: f64,
    pub ci_low: f64,
    pub ci_high: f64,
    /// `(hazard_ratio - 1) * 100`.
    pub percent: f64,
    pub direction: EffectDirection,
}

impl RankedEffect {
    pub fn describe(&self) -> String {
        let effect = match self.direction {
            EffectDirection::Increases => {
                format!("increases risk by about {:.1}%", self.percent)
            }
            EffectDirection::Decreases => {
                format!("decreases risk by about {:.1}%", self.percent.abs())
            }
            EffectDirection::Negligible => "has a negligible effect on risk".to_string(),
        };
        format!(
            "{}: {effect} (HR={:.2}, CI {:.2}-{:.2})",
            self.covariate.label(),
            self.hazard_ratio,
            self.ci_low,
            self.ci_high
        )
    }
}

/// Bar of the hazard-ratio chart.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct HazardRatioBar {
    pub covariate: Covariate,
    pub hazard_ratio: f64,
    pub increases_risk: bool,
}

pub fn classify(hazard_ratio: f64) -> EffectDirection {
    if hazard_ratio > INCREASES_ABOVE {
        EffectDirection::Increases
    } else if hazard_ratio < DECREASES_BELOW {
        EffectDirection::Decreases
    } else {
        EffectDirection::Negligible
    }
}

/// Order coefficients by how far their hazard ratio is from 1, largest first.
pub fn rank_effects(coefficients: &[Coefficient]) -> Vec<RankedEffect> {
    let mut effects: Vec<RankedEffect> = coefficients
        .iter()
        .map(|c| RankedEffect {
            covariate: c.covariate,
            hazard_ratio: c.hazard_ratio,
            ci_low: c.ci_low,
            ci_high: c.ci_high,
            percent: (c.hazard_ratio - 1.0) * 100.0,
            direction: classify(c.hazard_ratio),
        })
        .collect();
    effects.sort_by(|a, b| {
        (b.hazard_ratio - 1.0)
            .abs()
            .total_cmp(&(a.hazard_ratio - 1.0).abs())
    });
    effects
}

/// Hazard ratios in ascending order for the bar chart.
pub fn hazard_ratio_bars(coefficients: &[Coefficient]) -> Vec<HazardRatioBar> {
    let mut bars: Vec<HazardRatioBar> = coefficients
        .iter()
        .map(|c| HazardRatioBar {
            covariate: c.covariate,
            hazard_ratio: c.hazard_ratio,
            increases_risk: c.hazard_ratio > 1.0,
        })
        .collect();
    bars.sort_by(|a, b| a.hazard_ratio.total_cmp(&b.hazard_ratio));
    bars
}

/// Plain-text monitoring report for the selected record.
pub fn render_report(
    effects: &[RankedEffect],
    index: usize,
    risk: RiskBucket,
    diagnostics: Option<&FitDiagnostics>,
) -> String {
    let Some(strongest) = effects.first() else {
        return NO_COEFFICIENTS.to_string();
    };
    let mut report = String::from("Load monitoring report (Cox model)\n\n");
    if let Some(diagnostics) = diagnostics {
        let _ = writeln!(
            report,
            "Concordance index: {:.3} ({} records, {} failures)\n",
            diagnostics.concordance, diagnostics.observations, diagnostics.events
        );
    }
    for effect in effects {
        let _ = writeln!(report, "• {}", effect.describe());
    }
    let _ = writeln!(report, "\nStrongest effect: {}", strongest.covariate.label());
    let _ = writeln!(report, "Individual load state of item #{index}: {}", risk.label());
    report
}
