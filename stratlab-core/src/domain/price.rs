//! Price-step rounding.
//!
//! One rounding policy for the whole engine: round half to even (banker's
//! rounding). Ties are resolved toward the even multiple of `step`, so a
//! stream of tie-breaks does not drift in one direction.

/// Round `value` to the nearest multiple of `step`, ties to even.
///
/// A non-positive or non-finite `step` returns `value` unchanged.
pub fn round_half_even(value: f64, step: f64) -> f64 {
    if !(step.is_finite() && step > 0.0) || !value.is_finite() {
        return value;
    }
    let ticks = value / step;
    let floor = ticks.floor();
    let frac = ticks - floor;
    let rounded = if (frac - 0.5).abs() < 1e-9 {
        if floor % 2.0 == 0.0 {
            floor
        } else {
            floor + 1.0
        }
    } else {
        ticks.round()
    };
    rounded * step
}
