use core::fmt;

/// Errors reported when registering a motor.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum Error {
    /// The registration parameters were rejected; no motor was created.
    InvalidConfig(ConfigError),
}

/// The parameter that failed validation.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum ConfigError {
    /// Bus voltage was zero, negative or NaN.
    BusVoltage,
    /// Pole pair count was zero.
    PolePairs,
    /// No PWM output was supplied.
    MissingPwm,
    /// The timer period does not fit in a `u32` once the extra tick is added.
    PwmPeriod,
}

impl fmt::Display for Error {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Error::InvalidConfig(reason) => write!(f, "invalid motor configuration: {reason}"),
        }
    }
}

impl fmt::Display for ConfigError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            ConfigError::BusVoltage => "bus voltage must be positive",
            ConfigError::PolePairs => "pole pair count must be at least one",
            ConfigError::MissingPwm => "no PWM output supplied",
            ConfigError::PwmPeriod => "PWM period overflows",
        })
    }
}

impl From<ConfigError> for Error {
    fn from(reason: ConfigError) -> Self {
        Error::InvalidConfig(reason)
    }
}
