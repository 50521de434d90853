//! Angle normalization and electrical angle derivation.
//!
//! Absolute angles live in `[0, 2π)`, angle deltas in `[-π, π)`. Every angle
//! stored by the controller goes through one of these two functions.

use core::f32::consts::{PI, TAU};

/// Normalize an absolute angle into `[0, 2π)`.
///
/// NaN and infinities propagate as NaN.
pub fn normalize_absolute(angle: f32) -> f32 {
    if (0.0..TAU).contains(&angle) {
        return angle;
    }

    // fmod is exact, so the only rounding happens when wrapping a tiny
    // negative remainder back up by 2π.
    let mut wrapped = libm::fmodf(angle, TAU);
    if wrapped < 0.0 {
        wrapped += TAU;
    }
    if wrapped >= TAU {
        wrapped -= TAU;
    }
    wrapped
}

/// Normalize an angle difference into `[-π, π)`.
pub fn normalize_delta(angle: f32) -> f32 {
    if (-PI..PI).contains(&angle) {
        return angle;
    }

    let mut wrapped = libm::fmodf(angle, TAU);
    if wrapped >= PI {
        wrapped -= TAU;
    } else if wrapped < -PI {
        wrapped += TAU;
    }
    wrapped
}

/// Scale a mechanical angle by the pole pair count and remove the
/// calibration offset. The result is an absolute electrical angle.
pub fn electrical_angle(mechanical: f32, pole_pairs: u16, offset: f32) -> f32 {
    normalize_absolute(mechanical * f32::from(pole_pairs) - offset)
}

/// Sine and cosine of an angle in radians, returned as `(sin, cos)`.
#[cfg(not(feature = "cordic"))]
pub fn sin_cos(angle: f32) -> (f32, f32) {
    (libm::sinf(angle), libm::cosf(angle))
}

/// Sine and cosine of an angle in radians, returned as `(sin, cos)`.
///
/// Runs on `I16F16` through the CORDIC algorithm, for cores without an FPU.
#[cfg(feature = "cordic")]
pub fn sin_cos(angle: f32) -> (f32, f32) {
    use fixed::types::I16F16;

    let (sin, cos) = cordic::sin_cos(I16F16::from_num(normalize_delta(angle)));
    (sin.to_num(), cos.to_num())
}
