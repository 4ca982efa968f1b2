//! Triangular cycle profit model

/// Default proportional fee per leg (0.1%)
pub const DEFAULT_LEG_FEE: f64 = 0.001;

/// Default fee tuple for a three-leg cycle
pub const DEFAULT_CYCLE_FEES: (f64, f64, f64) = (DEFAULT_LEG_FEE, DEFAULT_LEG_FEE, DEFAULT_LEG_FEE);

/// Amount of base currency held after running one unit through the cycle.
///
/// `rate_ca` is the inverse of the direct quote/base rate. A rate that is not
/// strictly positive and finite wipes out the position and yields 0.0.
pub fn cycle_return(rate_ab: f64, rate_bc: f64, rate_ca: f64, fees: (f64, f64, f64)) -> f64 {
    let usable = |rate: f64| rate.is_finite() && rate > 0.0;
    if !(usable(rate_ab) && usable(rate_bc) && usable(rate_ca)) {
        return 0.0;
    }

    let effective_ab = rate_ab * (1.0 - fees.0);
    let effective_bc = rate_bc * (1.0 - fees.1);
    let effective_ca = rate_ca * (1.0 - fees.2);

    effective_ab * effective_bc * effective_ca
}

/// Fractional profit of a triangular cycle after all three fees.
///
/// Never fails: unusable rates degrade to -1.0 (total loss) and callers
/// filter for positivity downstream.
pub fn triangular_profit(rate_ab: f64, rate_bc: f64, rate_ca: f64, fees: (f64, f64, f64)) -> f64 {
    cycle_return(rate_ab, rate_bc, rate_ca, fees) - 1.0
}
