//! Rotor angle sensing.
//!
//! [`LowPassAngle`] smooths a noisy absolute angle without tearing at the
//! `0 / 2π` seam. [`As5047p`] reads the AMS AS5047P magnetic encoder over
//! SPI and feeds its readings through that filter.

use core::f32::consts::TAU;

use embedded_hal::spi::SpiDevice;
use fixed::types::U2F14;

use crate::angle::{normalize_absolute, normalize_delta};

/// Something that yields the rotor's mechanical angle once per control cycle.
pub trait AngleSensor {
    /// Mechanical angle in `[0, 2π)`. A sensor that failed to read returns
    /// its last good value.
    fn read_angle(&mut self) -> f32;
}

/// First order low-pass filter on an absolute angle.
///
/// The innovation `raw - estimate` is wrapped into `[-π, π)` before it is
/// weighted, so a reading that crosses zero pulls the estimate the short
/// way round.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct LowPassAngle {
    alpha: f32,
    measure: f32,
    angle: f32,
}

impl LowPassAngle {
    /// `alpha` is the weight of each new reading, in `(0, 1]`. `1.0`
    /// disables filtering, and is used in place of any value outside that
    /// range, NaN included.
    pub fn new(alpha: f32) -> Self {
        let alpha = if alpha > 0. && alpha <= 1. {
            alpha
        } else {
            log::warn!("low-pass weight {} outside (0, 1], filtering disabled", alpha);
            1.
        };
        Self {
            alpha,
            measure: 0.,
            angle: 0.,
        }
    }

    /// Blend a raw reading in radians into the estimate and return it.
    pub fn update(&mut self, raw: f32) -> f32 {
        self.measure = raw;
        let error = normalize_delta(raw - self.angle);
        self.angle = normalize_absolute(self.angle + error * self.alpha);
        self.angle
    }

    pub fn angle(&self) -> f32 {
        self.angle
    }

    /// The last raw reading passed to [`update`](Self::update).
    pub fn measure(&self) -> f32 {
        self.measure
    }
}

/// AS5047P register addresses.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[repr(u16)]
pub enum Register {
    Nop = 0x0000,
    /// Error flags
    Errfl = 0x0001,
    Prog = 0x0003,
    /// Diagnostics and automatic gain control
    Diaagc = 0x3FFC,
    /// CORDIC magnitude
    Mag = 0x3FFD,
    /// Angle without dynamic angle error compensation
    AngleUnc = 0x3FFE,
    /// Angle with dynamic angle error compensation
    AngleCom = 0x3FFF,
}

const READ: u16 = 0x4000;
const PARITY: u16 = 0x8000;
const DATA_MASK: u16 = 0x3FFF;

/// Set bit 15 so the command frame has even parity.
fn with_parity(frame: u16) -> u16 {
    if frame.count_ones() % 2 == 1 {
        frame | PARITY
    } else {
        frame
    }
}

/// Convert a 14-bit encoder count to radians in `[0, 2π)`.
pub fn counts_to_radians(counts: u16) -> f32 {
    U2F14::from_bits(counts & DATA_MASK).to_num::<f32>() * TAU
}

/// AS5047P 14-bit absolute magnetic encoder on a 16-bit SPI bus.
pub struct As5047p<SPI> {
    spi: SPI,
    filter: LowPassAngle,
}

impl<SPI> As5047p<SPI>
where
    SPI: SpiDevice<u16>,
{
    /// `lowpass_alpha` is the weight of each new reading, see [`LowPassAngle::new`].
    pub fn new(spi: SPI, lowpass_alpha: f32) -> Self {
        Self {
            spi,
            filter: LowPassAngle::new(lowpass_alpha),
        }
    }

    /// Read a register. The reply to a command arrives on the next frame,
    /// so a NOP is clocked out to fetch it.
    pub fn read_register(&mut self, register: Register) -> Result<u16, SPI::Error> {
        self.transfer(with_parity(register as u16 | READ))?;
        let data = self.transfer(with_parity(Register::Nop as u16 | READ))?;
        Ok(data & DATA_MASK)
    }

    /// Raw compensated angle in encoder counts.
    pub fn read_counts(&mut self) -> Result<u16, SPI::Error> {
        self.read_register(Register::AngleCom)
    }

    /// The filtered angle from the last successful read.
    pub fn angle(&self) -> f32 {
        self.filter.angle()
    }

    pub fn release(self) -> SPI {
        self.spi
    }

    fn transfer(&mut self, frame: u16) -> Result<u16, SPI::Error> {
        let mut word = [frame];
        self.spi.transfer_in_place(&mut word)?;
        Ok(word[0])
    }
}

impl<SPI> AngleSensor for As5047p<SPI>
where
    SPI: SpiDevice<u16>,
{
    fn read_angle(&mut self) -> f32 {
        match self.read_counts() {
            Ok(counts) => self.filter.update(counts_to_radians(counts)),
            Err(err) => {
                log::warn!("AS5047P read failed: {:?}", err);
                self.filter.angle()
            }
        }
    }
}
