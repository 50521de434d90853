//! The PWM timer the controller writes its compare values to.

use embedded_hal::pwm::SetDutyCycle;

/// A center-aligned timer driving three complementary channel pairs.
pub trait PwmOutput {
    /// The auto-reload value the timer was configured with. One PWM period
    /// is this value plus one tick.
    fn configured_period(&self) -> u32;

    /// Start the three complementary pairs and the base counter with every
    /// channel at zero duty.
    fn start(&mut self);

    /// Write one compare value per phase. Each value is in `0..=period` and
    /// counts the ticks that phase's high side is off, so `0` is full duty.
    fn set_compare(&mut self, period: u32, compare: [u32; 3]);
}

/// Three independent [`SetDutyCycle`] channels acting as one PWM output.
///
/// The channels are expected to already be configured for center-aligned,
/// complementary operation; `start` only zeroes them. A compare value counts
/// the ticks a phase's high side is off, while a channel's duty is its on
/// time, so each phase is written as `max_duty_cycle() - compare`.
pub struct ChannelPwm<A, B, C> {
    channels: (A, B, C),
}

impl<A, B, C> ChannelPwm<A, B, C>
where
    A: SetDutyCycle,
    B: SetDutyCycle,
    C: SetDutyCycle,
{
    pub fn new(a: A, b: B, c: C) -> Self {
        Self { channels: (a, b, c) }
    }

    pub fn release(self) -> (A, B, C) {
        self.channels
    }

    fn write_duty(&mut self, duty: [u16; 3]) {
        let results = [
            self.channels.0.set_duty_cycle(duty[0]).is_ok(),
            self.channels.1.set_duty_cycle(duty[1]).is_ok(),
            self.channels.2.set_duty_cycle(duty[2]).is_ok(),
        ];
        if results.contains(&false) {
            log::warn!("PWM channel rejected duty cycle {:?}", duty);
        }
    }
}

impl<A, B, C> PwmOutput for ChannelPwm<A, B, C>
where
    A: SetDutyCycle,
    B: SetDutyCycle,
    C: SetDutyCycle,
{
    fn configured_period(&self) -> u32 {
        u32::from(self.channels.0.max_duty_cycle()).saturating_sub(1)
    }

    fn start(&mut self) {
        self.write_duty([0; 3]);
    }

    fn set_compare(&mut self, _period: u32, compare: [u32; 3]) {
        let max = self.channels.0.max_duty_cycle();
        let duty = compare.map(|ticks| {
            let ticks = u16::try_from(ticks).unwrap_or(u16::MAX);
            max - ticks.min(max)
        });
        self.write_duty(duty);
    }
}

#[cfg(test)]
mod tests {
    use core::convert::Infallible;

    use embedded_hal::pwm::ErrorType;

    use super::*;

    struct Channel {
        max: u16,
        duty: u16,
    }

    impl ErrorType for Channel {
        type Error = Infallible;
    }

    impl SetDutyCycle for Channel {
        fn max_duty_cycle(&self) -> u16 {
            self.max
        }

        fn set_duty_cycle(&mut self, duty: u16) -> Result<(), Self::Error> {
            self.duty = duty;
            Ok(())
        }
    }

    fn channel() -> Channel {
        Channel {
            max: 4250,
            duty: 1234,
        }
    }

    #[test]
    fn period_matches_max_duty() {
        let pwm = ChannelPwm::new(channel(), channel(), channel());
        assert_eq!(pwm.configured_period() + 1, 4250);
    }

    #[test]
    fn start_zeroes_all_channels() {
        let mut pwm = ChannelPwm::new(channel(), channel(), channel());
        pwm.start();
        let (a, b, c) = pwm.release();
        assert_eq!([a.duty, b.duty, c.duty], [0, 0, 0]);
    }

    #[test]
    fn compare_values_become_high_side_duty() {
        let mut pwm = ChannelPwm::new(channel(), channel(), channel());
        pwm.set_compare(4250, [10, 2000, 4250]);
        let (a, b, c) = pwm.release();
        assert_eq!([a.duty, b.duty, c.duty], [4240, 2250, 0]);
    }

    #[test]
    fn oversized_compare_values_turn_the_phase_off() {
        let mut pwm = ChannelPwm::new(channel(), channel(), channel());
        pwm.set_compare(4250, [5000, u32::MAX, 0]);
        let (a, b, c) = pwm.release();
        assert_eq!([a.duty, b.duty, c.duty], [0, 0, 4250]);
    }
}
