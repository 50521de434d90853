//! Motor instance and open-loop control modes.
//!
//! A [`Motor`] is registered once at start-up, initialised once, and then
//! driven every control tick by [`Motor::run_open_loop`] or
//! [`Motor::run_encoder_open_loop`]. Each tick runs inverse Park, inverse
//! Clarke and SVPWM, then writes the PWM output exactly once.

use crate::{
    angle::{electrical_angle, normalize_absolute, sin_cos},
    error::{ConfigError, Error},
    park_clarke::{
        inverse_clarke, inverse_park, RotatingReferenceFrame,
        ThreePhaseStationaryReferenceFrame, TwoPhaseStationaryOrthogonalReferenceFrame,
    },
    pwm::PwmOutput,
    sensor::AngleSensor,
    svpwm,
    telemetry::Telemetry,
};

/// Where the electrical angle comes from.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub enum ControlMode {
    /// The caller supplies the electrical angle directly.
    #[default]
    OpenLoop,
    /// The caller supplies a mechanical angle from the rotor sensor.
    EncoderOpenLoop,
}

/// Registration parameters.
#[derive(Debug, Clone, Copy, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct MotorConfig {
    /// DC bus voltage in volts.
    pub bus_voltage: f32,
    pub pole_pairs: u16,
}

/// Electrical parameters and the state of the last control tick.
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct MotorParameters {
    bus_voltage: f32,
    bus_voltage_half: f32,
    pole_pairs: u16,
    angle_offset: f32,
    udq: RotatingReferenceFrame,
    uabc: ThreePhaseStationaryReferenceFrame,
    alpha_beta: TwoPhaseStationaryOrthogonalReferenceFrame,
    angle_mechanical: f32,
    angle_electrical: f32,
}

impl MotorParameters {
    pub fn bus_voltage(&self) -> f32 {
        self.bus_voltage
    }

    pub fn bus_voltage_half(&self) -> f32 {
        self.bus_voltage_half
    }

    pub fn pole_pairs(&self) -> u16 {
        self.pole_pairs
    }

    pub fn angle_offset(&self) -> f32 {
        self.angle_offset
    }

    pub fn udq(&self) -> RotatingReferenceFrame {
        self.udq
    }

    pub fn uabc(&self) -> ThreePhaseStationaryReferenceFrame {
        self.uabc
    }

    pub fn alpha_beta(&self) -> TwoPhaseStationaryOrthogonalReferenceFrame {
        self.alpha_beta
    }

    /// Mechanical angle in `[0, 2π)`, only written in encoder mode.
    pub fn angle_mechanical(&self) -> f32 {
        self.angle_mechanical
    }

    /// Electrical angle in `[0, 2π)`.
    pub fn angle_electrical(&self) -> f32 {
        self.angle_electrical
    }
}

struct PwmTarget<P> {
    /// Ticks per PWM period, the timer's configured period plus one.
    period: u32,
    output: P,
}

/// One motor on one three-phase inverter.
pub struct Motor<P> {
    mode: ControlMode,
    params: MotorParameters,
    pwm: PwmTarget<P>,
}

impl<P> Motor<P>
where
    P: PwmOutput,
{
    /// Validate the configuration and create a zeroed motor in
    /// [`ControlMode::OpenLoop`]. The PWM output is not touched until
    /// [`init`](Self::init).
    pub fn register(config: MotorConfig, pwm: Option<P>) -> Result<Self, Error> {
        let validated = Self::validate(&config).and_then(|()| {
            let output = pwm.ok_or(ConfigError::MissingPwm)?;
            let period = output
                .configured_period()
                .checked_add(1)
                .ok_or(ConfigError::PwmPeriod)?;
            Ok(PwmTarget { period, output })
        });

        let pwm = match validated {
            Ok(pwm) => pwm,
            Err(reason) => {
                log::warn!("motor registration rejected: {}", reason);
                return Err(reason.into());
            }
        };

        log::info!(
            "motor registered: {} V bus, {} pole pairs, {} tick period",
            config.bus_voltage,
            config.pole_pairs,
            pwm.period
        );

        Ok(Self {
            mode: ControlMode::default(),
            params: MotorParameters {
                bus_voltage: config.bus_voltage,
                bus_voltage_half: config.bus_voltage / 2.,
                pole_pairs: config.pole_pairs,
                ..Default::default()
            },
            pwm,
        })
    }

    fn validate(config: &MotorConfig) -> Result<(), ConfigError> {
        // Written so NaN fails too.
        if !(config.bus_voltage > 0.) {
            return Err(ConfigError::BusVoltage);
        }
        if config.pole_pairs == 0 {
            return Err(ConfigError::PolePairs);
        }
        Ok(())
    }

    /// Record the electrical angle offset and start the PWM output at zero
    /// duty.
    pub fn init(&mut self, angle_offset: f32) {
        self.params.angle_offset = angle_offset;
        self.pwm.output.start();
        log::info!("motor initialised, angle offset {} rad", angle_offset);
    }

    pub fn set_mode(&mut self, mode: ControlMode) {
        if mode != self.mode {
            log::info!("control mode {:?} -> {:?}", self.mode, mode);
        }
        self.mode = mode;
    }

    pub fn mode(&self) -> ControlMode {
        self.mode
    }

    /// Apply `(ud, uq)` at an externally generated electrical angle.
    pub fn run_open_loop(&mut self, ud: f32, uq: f32, angle_electrical: f32) {
        self.params.udq = RotatingReferenceFrame { d: ud, q: uq };
        self.params.angle_electrical = normalize_absolute(angle_electrical);
        self.apply();
    }

    /// Apply `(ud, uq)` at the electrical angle derived from a mechanical
    /// rotor angle.
    pub fn run_encoder_open_loop(&mut self, ud: f32, uq: f32, angle_mechanical: f32) {
        let params = &mut self.params;
        params.udq = RotatingReferenceFrame { d: ud, q: uq };
        params.angle_mechanical = normalize_absolute(angle_mechanical);
        params.angle_electrical = electrical_angle(
            params.angle_mechanical,
            params.pole_pairs,
            params.angle_offset,
        );
        self.apply();
    }

    /// Run whichever path the current mode selects. `angle` is electrical in
    /// [`ControlMode::OpenLoop`] and mechanical in
    /// [`ControlMode::EncoderOpenLoop`].
    pub fn update(&mut self, ud: f32, uq: f32, angle: f32) {
        match self.mode {
            ControlMode::OpenLoop => self.run_open_loop(ud, uq, angle),
            ControlMode::EncoderOpenLoop => self.run_encoder_open_loop(ud, uq, angle),
        }
    }

    /// Poll `sensor` once and run the encoder path with its reading.
    pub fn run_with_sensor<S>(&mut self, ud: f32, uq: f32, sensor: &mut S)
    where
        S: AngleSensor + ?Sized,
    {
        let angle = sensor.read_angle();
        self.run_encoder_open_loop(ud, uq, angle);
    }

    fn apply(&mut self) {
        let params = &mut self.params;
        let (sin_angle, cos_angle) = sin_cos(params.angle_electrical);

        params.alpha_beta = inverse_park(cos_angle, sin_angle, params.udq);
        params.uabc = inverse_clarke(params.alpha_beta);

        let compare = svpwm::modulate(params.alpha_beta, params.bus_voltage, self.pwm.period);
        self.pwm.output.set_compare(self.pwm.period, compare);
    }

    pub fn parameters(&self) -> &MotorParameters {
        &self.params
    }

    /// Ticks per PWM period.
    pub fn period(&self) -> u32 {
        self.pwm.period
    }

    pub fn pwm(&self) -> &P {
        &self.pwm.output
    }

    pub fn pwm_mut(&mut self) -> &mut P {
        &mut self.pwm.output
    }

    pub fn telemetry(&self) -> Telemetry {
        let params = &self.params;
        Telemetry {
            ud: params.udq.d,
            uq: params.udq.q,
            ua: params.uabc.a,
            ub: params.uabc.b,
            uc: params.uabc.c,
            alpha: params.alpha_beta.alpha,
            beta: params.alpha_beta.beta,
            angle_mechanical: params.angle_mechanical,
            angle_electrical: params.angle_electrical,
        }
    }
}

#[cfg(test)]
mod tests {
    use core::f32::consts::{FRAC_PI_2, TAU};
    use std::vec::Vec;

    use approx::assert_abs_diff_eq;

    use super::*;

    #[derive(Default)]
    struct FakePwm {
        arr: u32,
        started: bool,
        writes: Vec<(u32, [u32; 3])>,
    }

    impl PwmOutput for FakePwm {
        fn configured_period(&self) -> u32 {
            self.arr
        }

        fn start(&mut self) {
            self.started = true;
            self.writes.push((self.arr + 1, [0; 3]));
        }

        fn set_compare(&mut self, period: u32, compare: [u32; 3]) {
            self.writes.push((period, compare));
        }
    }

    struct FixedSensor(f32);

    impl AngleSensor for FixedSensor {
        fn read_angle(&mut self) -> f32 {
            self.0
        }
    }

    fn pwm() -> Option<FakePwm> {
        Some(FakePwm {
            arr: 999,
            ..Default::default()
        })
    }

    fn config(bus_voltage: f32, pole_pairs: u16) -> MotorConfig {
        MotorConfig {
            bus_voltage,
            pole_pairs,
        }
    }

    fn motor() -> Motor<FakePwm> {
        let mut motor = Motor::register(config(24., 7), pwm()).unwrap();
        motor.init(0.5);
        motor
    }

    #[test]
    fn registration_rejects_bad_config() {
        assert_eq!(
            Motor::register(config(0., 7), pwm()).err(),
            Some(Error::InvalidConfig(ConfigError::BusVoltage))
        );
        assert_eq!(
            Motor::register(config(-5., 7), pwm()).err(),
            Some(Error::InvalidConfig(ConfigError::BusVoltage))
        );
        assert_eq!(
            Motor::register(config(f32::NAN, 7), pwm()).err(),
            Some(Error::InvalidConfig(ConfigError::BusVoltage))
        );
        assert_eq!(
            Motor::register(config(24., 0), pwm()).err(),
            Some(Error::InvalidConfig(ConfigError::PolePairs))
        );
        assert_eq!(
            Motor::<FakePwm>::register(config(24., 7), None).err(),
            Some(Error::InvalidConfig(ConfigError::MissingPwm))
        );
        let overflowing = Some(FakePwm {
            arr: u32::MAX,
            ..Default::default()
        });
        assert_eq!(
            Motor::register(config(24., 7), overflowing).err(),
            Some(Error::InvalidConfig(ConfigError::PwmPeriod))
        );
    }

    #[test]
    fn registration_derives_parameters() {
        let motor = Motor::register(config(24., 7), pwm()).unwrap();
        let params = motor.parameters();
        assert_eq!(params.bus_voltage(), 24.);
        assert_eq!(params.bus_voltage_half(), 12.);
        assert_eq!(params.pole_pairs(), 7);
        assert_eq!(params.udq(), RotatingReferenceFrame::default());
        assert_eq!(params.angle_electrical(), 0.);
        assert_eq!(motor.period(), 1000);
        assert_eq!(motor.mode(), ControlMode::OpenLoop);
        assert!(!motor.pwm().started);
        assert!(motor.pwm().writes.is_empty());
    }

    #[test]
    fn init_starts_pwm_at_zero_duty() {
        let motor = motor();
        assert_eq!(motor.parameters().angle_offset(), 0.5);
        assert!(motor.pwm().started);
        assert_eq!(motor.pwm().writes, [(1000, [0, 0, 0])]);
    }

    #[test]
    fn open_loop_stores_normalized_angle() {
        let mut motor = motor();
        motor.run_open_loop(0., 2., TAU + 1.);
        let params = motor.parameters();
        assert_abs_diff_eq!(params.angle_electrical(), 1., epsilon = 1e-5);
        assert_eq!(params.udq(), RotatingReferenceFrame { d: 0., q: 2. });
        assert_eq!(params.angle_mechanical(), 0.);
    }

    #[test]
    fn open_loop_writes_one_compare_per_call() {
        let mut motor = motor();
        motor.run_open_loop(0., 2., 0.3);
        motor.run_open_loop(0., 2., 0.3);
        let writes = &motor.pwm().writes;
        assert_eq!(writes.len(), 3);
        // Same inputs, same output: nothing accumulates between calls.
        assert_eq!(writes[1], writes[2]);
        assert!(writes[1].1.iter().all(|&ticks| ticks <= 1000));
    }

    #[test]
    fn open_loop_runs_the_transform_chain() {
        // CORDIC on I16F16 resolves sine and cosine to about 1e-4.
        let tolerance = if cfg!(feature = "cordic") { 1e-3 } else { 1e-5 };
        let mut motor = motor();
        // q axis at 90° electrical points along -alpha.
        motor.run_open_loop(0., 4., FRAC_PI_2);
        let params = motor.parameters();
        assert_abs_diff_eq!(params.alpha_beta().alpha, -4., epsilon = tolerance);
        assert_abs_diff_eq!(params.alpha_beta().beta, 0., epsilon = tolerance);
        assert_abs_diff_eq!(params.uabc().a, -4., epsilon = tolerance);
        assert_abs_diff_eq!(params.uabc().b, 2., epsilon = tolerance);
        assert_abs_diff_eq!(params.uabc().c, 2., epsilon = tolerance);

        let (_, compare) = *motor.pwm().writes.last().unwrap();
        let expected = svpwm::modulate(params.alpha_beta(), 24., 1000);
        assert_eq!(compare, expected);
        // Phase a is driven lowest, so it gets the largest compare value.
        assert!(compare[0] > compare[1] && compare[0] > compare[2]);
    }

    #[test]
    fn encoder_open_loop_derives_electrical_angle() {
        let mut motor = motor();
        motor.run_encoder_open_loop(0., 1., 1.0);
        let params = motor.parameters();
        assert_eq!(params.angle_mechanical(), 1.0);
        assert_abs_diff_eq!(
            params.angle_electrical(),
            normalize_absolute(6.5),
            epsilon = 1e-6
        );
    }

    #[test]
    fn encoder_open_loop_normalizes_mechanical_angle() {
        let mut motor = motor();
        motor.run_encoder_open_loop(0., 1., -1.0);
        let params = motor.parameters();
        assert_abs_diff_eq!(params.angle_mechanical(), TAU - 1.0, epsilon = 1e-6);
        assert!((0.0..TAU).contains(&params.angle_electrical()));
    }

    #[test]
    fn update_follows_mode() {
        let mut motor = motor();
        motor.update(0., 1., 1.0);
        assert_eq!(motor.parameters().angle_electrical(), 1.0);

        motor.set_mode(ControlMode::EncoderOpenLoop);
        motor.update(0., 1., 1.0);
        assert_abs_diff_eq!(
            motor.parameters().angle_electrical(),
            normalize_absolute(6.5),
            epsilon = 1e-6
        );

        motor.set_mode(ControlMode::OpenLoop);
        assert_eq!(motor.mode(), ControlMode::OpenLoop);
    }

    #[test]
    fn sensor_reading_drives_encoder_path() {
        let mut motor = motor();
        let mut sensor = FixedSensor(1.0);
        motor.run_with_sensor(0., 1., &mut sensor);
        assert_eq!(motor.parameters().angle_mechanical(), 1.0);
        assert_eq!(motor.pwm().writes.len(), 2);
    }

    #[test]
    fn telemetry_mirrors_parameters() {
        let mut motor = motor();
        motor.run_encoder_open_loop(0.5, 1.5, 0.2);
        let telemetry = motor.telemetry();
        let params = motor.parameters();
        assert_eq!(telemetry.ud, 0.5);
        assert_eq!(telemetry.uq, 1.5);
        assert_eq!(telemetry.ub, params.uabc().b);
        assert_eq!(telemetry.beta, params.alpha_beta().beta);
        assert_eq!(telemetry.angle_mechanical, 0.2);
        assert_eq!(telemetry.angle_electrical, params.angle_electrical());
    }
}
