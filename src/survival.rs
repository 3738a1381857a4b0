//! Survival estimation: Cox proportional hazards and Kaplan-Meier.
//!
//! The pipeline only talks to this module through [`fit`], the prediction
//! methods on [`CoxModel`], and [`kaplan_meier`].

use serde::Serialize;

pub mod cox;
pub mod kaplan_meier;
mod linalg;
pub mod metrics;

pub use cox::{Coefficient, CoxModel, FitDiagnostics, FitError, FitOptions, fit};
pub use kaplan_meier::{KaplanMeierCurve, KaplanMeierStep, kaplan_meier};

/// One `(time, value)` sample of a step function.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct CurvePoint {
    pub time: f64,
    pub value: f64,
}

/// Step function sampled on an increasing time grid.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct Curve {
    points: Vec<CurvePoint>,
}

impl Curve {
    pub fn new(points: Vec<CurvePoint>) -> Self {
        Self { points }
    }

    pub fn from_pairs(pairs: impl IntoIterator<Item = (f64, f64)>) -> Self {
        Self::new(
            pairs
                .into_iter()
                .map(|(time, value)| CurvePoint { time, value })
                .collect(),
        )
    }

    pub fn points(&self) -> &[CurvePoint] {
        &self.points
    }

    pub fn len(&self) -> usize {
        self.points.len()
    }

    pub fn is_empty(&self) -> bool {
        self.points.is_empty()
    }

    pub fn first(&self) -> Option<&CurvePoint> {
        self.points.first()
    }

    pub fn last(&self) -> Option<&CurvePoint> {
        self.points.last()
    }

    /// Apply `f` to every value, keeping the time grid.
    pub fn map_values(&self, f: impl Fn(f64) -> f64) -> Self {
        Self::new(
            self.points
                .iter()
                .map(|point| CurvePoint {
                    time: point.time,
                    value: f(point.value),
                })
                .collect(),
        )
    }
}
