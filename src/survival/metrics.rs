//! Goodness-of-fit helpers for survival models.

/// Harrell's concordance index between risk scores and observed durations.
///
/// A pair is comparable when the shorter duration ended in a failure; it is
/// concordant when that record also has the higher risk. Tied risks count as
/// half. Returns 0.5 when no pair is comparable.
pub fn concordance_index(durations: &[f64], events: &[bool], risk: &[f64]) -> f64 {
    let n = durations.len().min(events.len()).min(risk.len());
    let mut concordant = 0.0;
    let mut comparable = 0u64;
    for i in 0..n {
        if !events[i] {
            continue;
        }
        for j in 0..n {
            if durations[i] >= durations[j] {
                continue;
            }
            comparable += 1;
            if risk[i] > risk[j] {
                concordant += 1.0;
            } else if risk[i] == risk[j] {
                concordant += 0.5;
            }
        }
    }
    if comparable == 0 {
        0.5
    } else {
        concordant / comparable as f64
    }
}

/// Two-sided p-value of a standard normal statistic.
pub fn two_sided_p_value(z: f64) -> f64 {
    if !z.is_finite() {
        return 0.0;
    }
    erfc(z.abs() / std::f64::consts::SQRT_2).clamp(0.0, 1.0)
}

/// Complementary error function (Numerical Recipes `erfcc`, |error| < 1.2e-7).
fn erfc(x: f64) -> f64 {
    let z = x.abs();
    let t = 1.0 / (1.0 + 0.5 * z);
    let poly = -z * z - 1.265_512_23
        + t * (1.000_023_68
            + t * (0.374_091_96
                + t * (0.096_784_18
                    + t * (-0.186_288_06
                        + t * (0.278_868_07
                            + t * (-1.135_203_98
                                + t * (1.488_515_87 + t * (-0.822_152_23 + t * 0.170_872_77))))))));
    let ans = t * poly.exp();
    if x >= 0.0 { ans } else { 2.0 - ans }
}
