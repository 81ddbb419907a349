use core::f64::consts::{PI, TAU};

use num_traits::Float;

#[macro_export]
macro_rules! signed_mod {
    ($dividend:expr, $divisor:expr) => {
        (($dividend % $divisor) + $divisor) % $divisor
    };
}

pub use signed_mod;

/// Wraps an angle in radians into `[-PI, PI)`.
pub fn normalize_orientation(angle: f64) -> f64 {
    let wrapped = signed_mod!(angle + PI, TAU) - PI;
    // `signed_mod` can round up to exactly TAU for tiny negative inputs.
    if wrapped >= PI {
        wrapped - TAU
    } else {
        wrapped
    }
}

/// Signed shortest rotation that takes `from` onto `to`, in `[-PI, PI)`.
pub fn orientation_difference(from: f64, to: f64) -> f64 {
    normalize_orientation(to - from)
}

/// Speed damping factor while turning.
///
/// Returns 1 when the heading does not change and falls to 0 once the change
/// reaches `angular_velocity_limit`.
pub fn turning_velocity_rate(orientation_change: f64, angular_velocity_limit: f64) -> f64 {
    let ratio = orientation_change / angular_velocity_limit;
    (1.0 - (ratio * ratio).min(1.0)).max(0.0).sqrt()
}

/// Circular mean of a set of weighted headings.
///
/// Returns `None` when the weights cancel out.
pub fn circular_mean<I: IntoIterator<Item = (f64, f64)>>(angles_and_weights: I) -> Option<f64> {
    let (sin_sum, cos_sum) = angles_and_weights
        .into_iter()
        .fold((0.0, 0.0), |(s, c), (angle, weight)| {
            (s + weight * angle.sin(), c + weight * angle.cos())
        });
    if sin_sum.abs() < f64::EPSILON && cos_sum.abs() < f64::EPSILON {
        return None;
    }
    Some(normalize_orientation(sin_sum.atan2(cos_sum)))
}
