//! Open-loop Field Oriented Control core.
//!
//! Converts a `(Ud, Uq)` voltage command and a rotor angle into three PWM
//! compare values for a center-aligned, complementary three-phase inverter,
//! using inverse Park/Clarke transforms and space-vector modulation.
#![cfg_attr(not(test), no_std)]
#![forbid(unsafe_code)]

pub mod angle;
pub mod error;
pub mod motor;
pub mod park_clarke;
pub mod pwm;
pub mod sensor;
pub mod svpwm;
pub mod telemetry;
pub mod transport;

pub use error::{ConfigError, Error};
pub use motor::{ControlMode, Motor, MotorConfig};

/// sqrt(3)
pub(crate) const SQRT_3: f32 = 1.732_050_8;
/// 1 / sqrt(3)
pub(crate) const FRAC_1_SQRT_3: f32 = 0.577_350_26;
/// sqrt(3) / 2
pub(crate) const FRAC_SQRT_3_2: f32 = 0.866_025_4;
