//! Space vector PWM.
//!
//! An `alpha-beta` voltage vector is synthesized from the two active
//! switching states bounding its 60° sector plus the zero vectors, laid out
//! symmetrically for a center-aligned timer. Compare values are in timer
//! ticks: a lower compare value keeps that phase's high side on for longer.

use crate::{park_clarke::TwoPhaseStationaryOrthogonalReferenceFrame, FRAC_SQRT_3_2, SQRT_3};

/// Sector lookup indexed by the sign code `[A>0] | [B>0] << 1 | [C>0] << 2`.
/// Codes 0 and 7 only occur for the zero vector.
const SECTOR_BY_CODE: [Option<u8>; 8] = [
    None,
    Some(2),
    Some(6),
    Some(1),
    Some(4),
    Some(3),
    Some(5),
    None,
];

/// Active and zero vector durations for one PWM period, in timer ticks.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct SectorTimings {
    /// Sector 1-6, `None` for the zero vector.
    pub sector: Option<u8>,
    pub t1: f32,
    pub t2: f32,
    pub t0: f32,
}

/// Classify a voltage vector into its one-indexed sector.
///
/// Returns `None` for the zero vector, the only input that produces one of
/// the two degenerate sign codes.
pub fn sector(value: TwoPhaseStationaryOrthogonalReferenceFrame) -> Option<u8> {
    let a = value.beta;
    let b = SQRT_3 * value.alpha - value.beta;
    let c = -SQRT_3 * value.alpha - value.beta;

    let code = usize::from(a > 0.) | usize::from(b > 0.) << 1 | usize::from(c > 0.) << 2;
    SECTOR_BY_CODE[code]
}

/// Compute the active vector times for `value`, saturating when the vector
/// leaves the linear modulation region.
///
/// `bus_voltage` must be positive; the caller validates it once.
pub fn timings(
    value: TwoPhaseStationaryOrthogonalReferenceFrame,
    bus_voltage: f32,
    period: u32,
) -> SectorTimings {
    let period_ticks = period as f32;
    let sector = sector(value);

    let tmp = period_ticks * SQRT_3 / bus_voltage;
    let x = tmp * value.beta;
    let y = tmp * (value.alpha * FRAC_SQRT_3_2 + value.beta / 2.);
    let z = tmp * (-value.alpha * FRAC_SQRT_3_2 + value.beta / 2.);

    let (mut t1, mut t2) = match sector {
        Some(1) => (-z, x),
        Some(2) => (z, y),
        Some(3) => (x, -y),
        Some(4) => (-x, z),
        Some(5) => (-y, -z),
        Some(6) => (y, -x),
        _ => (0., 0.),
    };

    // t0 is derived after rescaling and stays non-negative.
    let active = t1 + t2;
    if active > period_ticks {
        log::trace!("over-modulation: t1 + t2 = {} > {}", active, period_ticks);
        t1 = t1 * period_ticks / active;
        t2 = period_ticks - t1;
    }

    SectorTimings {
        sector,
        t1,
        t2,
        t0: (period_ticks - t1 - t2).max(0.),
    }
}

/// Turn sector timings into the compare values for phases a, b and c.
pub fn compare_values(timings: SectorTimings, period: u32) -> [u32; 3] {
    let a0 = timings.t0 / 4.;
    let b0 = a0 + timings.t1 / 2.;
    let c0 = b0 + timings.t2 / 2.;

    let phases = match timings.sector {
        Some(1) => [a0, b0, c0],
        Some(2) => [b0, a0, c0],
        Some(3) => [c0, a0, b0],
        Some(4) => [c0, b0, a0],
        Some(5) => [b0, c0, a0],
        Some(6) => [a0, c0, b0],
        _ => [a0, a0, a0],
    };

    let max = period as f32;
    // NaN survives the clamp and becomes zero through the saturating cast.
    phases.map(|ticks| libm::roundf(ticks.clamp(0., max)) as u32)
}

/// Modulate a stationary frame voltage vector into three compare values.
pub fn modulate(
    value: TwoPhaseStationaryOrthogonalReferenceFrame,
    bus_voltage: f32,
    period: u32,
) -> [u32; 3] {
    compare_values(timings(value, bus_voltage, period), period)
}
