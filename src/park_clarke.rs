//! Park and Clarke transformations (along with their inverses).
//!
//! The algorithms implemented here are based on [Microsemi's suggested implementation](https://www.microsemi.com/document-portal/doc_view/132799-park-inverse-park-and-clarke-inverse-clarke-transformations-mss-software-implementation-user-guide).
//! Every transform is pure; NaN and infinite inputs propagate to the output.

use crate::{FRAC_1_SQRT_3, FRAC_SQRT_3_2};

/// Rotating `d-q` frame. `d` is the flux axis, `q` the torque axis.
#[derive(Debug, Clone, Copy, Default, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct RotatingReferenceFrame {
    pub d: f32,
    pub q: f32,
}

/// Stationary `alpha-beta` frame.
#[derive(Debug, Clone, Copy, Default, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct TwoPhaseStationaryOrthogonalReferenceFrame {
    pub alpha: f32,
    pub beta: f32,
}

/// Three phase `a-b-c` quantities.
#[derive(Debug, Clone, Copy, Default, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct ThreePhaseStationaryReferenceFrame {
    pub a: f32,
    pub b: f32,
    pub c: f32,
}

/// Two measured phases of a balanced system, `c = -a - b`.
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct ThreePhaseBalancedStationaryReferenceFrame {
    pub a: f32,
    pub b: f32,
}

/// Clarke transform
///
/// Implements equations 1-4 from the Microsemi guide.
pub fn clarke(
    inputs: ThreePhaseBalancedStationaryReferenceFrame,
) -> TwoPhaseStationaryOrthogonalReferenceFrame {
    TwoPhaseStationaryOrthogonalReferenceFrame {
        // Eq3
        alpha: inputs.a,
        // Eq4
        beta: FRAC_1_SQRT_3 * (inputs.a + 2. * inputs.b),
    }
}

/// Inverse Clarke transform
///
/// Implements equations 5-7 from the Microsemi guide.
pub fn inverse_clarke(
    inputs: TwoPhaseStationaryOrthogonalReferenceFrame,
) -> ThreePhaseStationaryReferenceFrame {
    ThreePhaseStationaryReferenceFrame {
        // Eq5
        a: inputs.alpha,
        // Eq6
        b: -inputs.alpha / 2. + FRAC_SQRT_3_2 * inputs.beta,
        // Eq7
        c: -inputs.alpha / 2. - FRAC_SQRT_3_2 * inputs.beta,
    }
}

/// Park transform
///
/// Implements equations 8 and 9 from the Microsemi guide. The angle is
/// supplied by the caller as its sine and cosine.
pub fn park(
    cos_angle: f32,
    sin_angle: f32,
    inputs: TwoPhaseStationaryOrthogonalReferenceFrame,
) -> RotatingReferenceFrame {
    RotatingReferenceFrame {
        // Eq8
        d: cos_angle * inputs.alpha + sin_angle * inputs.beta,
        // Eq9
        q: cos_angle * inputs.beta - sin_angle * inputs.alpha,
    }
}

/// Inverse Park transform
///
/// Implements equations 10 and 11 from the Microsemi guide.
pub fn inverse_park(
    cos_angle: f32,
    sin_angle: f32,
    inputs: RotatingReferenceFrame,
) -> TwoPhaseStationaryOrthogonalReferenceFrame {
    TwoPhaseStationaryOrthogonalReferenceFrame {
        // Eq10
        alpha: cos_angle * inputs.d - sin_angle * inputs.q,
        // Eq11
        beta: sin_angle * inputs.d + cos_angle * inputs.q,
    }
}
