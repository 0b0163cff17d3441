/// Status LED on a single PWM channel.
///
/// The board routes one LED line to the LEDC peripheral, so a requested
/// RGB colour is collapsed into one brightness: the integer average of the
/// three channels, scaled onto the PWM duty range. True colour would need
/// one channel per component.
use embedded_hal::pwm::SetDutyCycle;

/// Duty ceiling of the 13-bit LED timer
pub const LED_MAX_DUTY_13BIT: u16 = 8191;

/// Integer mean of the three colour components.
pub fn average_brightness(red: u8, green: u8, blue: u8) -> u8 {
    ((red as u16 + green as u16 + blue as u16) / 3) as u8
}

/// Duty cycle for a colour on a channel whose full-on duty is `max_duty`.
pub fn duty_for_color(red: u8, green: u8, blue: u8, max_duty: u16) -> u16 {
    let avg = average_brightness(red, green, blue) as u32;
    (avg * max_duty as u32 / 255) as u16
}

pub struct StatusLed<P> {
    pwm: P,
    color: (u8, u8, u8),
}

impl<P: SetDutyCycle> StatusLed<P> {
    /// Take ownership of a configured PWM channel and switch the LED off.
    pub fn new(mut pwm: P) -> Result<Self, P::Error> {
        pwm.set_duty_cycle_fully_off()?;
        Ok(Self {
            pwm,
            color: (0, 0, 0),
        })
    }

    pub fn set_color(&mut self, red: u8, green: u8, blue: u8) -> Result<(), P::Error> {
        let duty = duty_for_color(red, green, blue, self.pwm.max_duty_cycle());
        self.pwm.set_duty_cycle(duty)?;
        self.color = (red, green, blue);
        Ok(())
    }

    pub fn off(&mut self) -> Result<(), P::Error> {
        self.set_color(0, 0, 0)
    }

    /// Last colour requested (not what the single channel can show).
    pub fn color(&self) -> (u8, u8, u8) {
        self.color
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use core::convert::Infallible;
    use embedded_hal::pwm::ErrorType;

    struct MockPwm {
        max: u16,
        duty: u16,
    }

    impl ErrorType for MockPwm {
        type Error = Infallible;
    }

    impl SetDutyCycle for MockPwm {
        fn max_duty_cycle(&self) -> u16 {
            self.max
        }

        fn set_duty_cycle(&mut self, duty: u16) -> Result<(), Infallible> {
            self.duty = duty;
            Ok(())
        }
    }

    #[test]
    fn average_uses_integer_division() {
        assert_eq!(average_brightness(0, 0, 0), 0);
        assert_eq!(average_brightness(255, 255, 255), 255);
        assert_eq!(average_brightness(255, 0, 0), 85);
        assert_eq!(average_brightness(1, 1, 0), 0);
    }

    #[test]
    fn duty_on_13bit_scale() {
        assert_eq!(duty_for_color(255, 255, 255, LED_MAX_DUTY_13BIT), 8191);
        assert_eq!(duty_for_color(0, 0, 0, LED_MAX_DUTY_13BIT), 0);
        // 85 * 8191 / 255 = 2730.33
        assert_eq!(duty_for_color(255, 0, 0, LED_MAX_DUTY_13BIT), 2730);
    }

    #[test]
    fn new_led_starts_off() {
        let led = StatusLed::new(MockPwm { max: 8191, duty: 1234 }).unwrap();
        assert_eq!(led.pwm.duty, 0);
        assert_eq!(led.color(), (0, 0, 0));
    }

    #[test]
    fn set_color_writes_averaged_duty() {
        let mut led = StatusLed::new(MockPwm { max: 8191, duty: 0 }).unwrap();
        led.set_color(0, 255, 0).unwrap();
        assert_eq!(led.pwm.duty, 2730);
        assert_eq!(led.color(), (0, 255, 0));

        led.off().unwrap();
        assert_eq!(led.pwm.duty, 0);
    }

    #[test]
    fn scales_to_channel_range() {
        let mut led = StatusLed::new(MockPwm { max: 1023, duty: 0 }).unwrap();
        led.set_color(255, 255, 255).unwrap();
        assert_eq!(led.pwm.duty, 1023);
    }
}
