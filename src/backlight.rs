/// LCD backlight dimmed through a PWM channel.
///
/// Brightness is expressed in percent. The last non-zero brightness is
/// remembered so the backlight can be switched off and restored.
use embedded_hal::pwm::SetDutyCycle;

pub const DEFAULT_BRIGHTNESS: u8 = 100;

pub struct PwmBacklight<P> {
    pwm: P,
    output_invert: bool,
    brightness: u8,
    saved: u8,
}

impl<P: SetDutyCycle> PwmBacklight<P> {
    /// Wrap a configured PWM channel. The backlight starts dark.
    pub fn new(pwm: P, output_invert: bool) -> Result<Self, P::Error> {
        let mut backlight = Self {
            pwm,
            output_invert,
            brightness: 0,
            saved: DEFAULT_BRIGHTNESS,
        };
        backlight.write(0)?;
        Ok(backlight)
    }

    /// Set brightness in percent; values above 100 are clamped.
    pub fn set_brightness(&mut self, percent: u8) -> Result<(), P::Error> {
        let percent = percent.min(100);
        self.write(percent)?;
        self.brightness = percent;
        if percent > 0 {
            self.saved = percent;
        }
        log::debug!("Backlight brightness {}%", percent);
        Ok(())
    }

    pub fn brightness(&self) -> u8 {
        self.brightness
    }

    pub fn turn_off(&mut self) -> Result<(), P::Error> {
        self.write(0)?;
        self.brightness = 0;
        Ok(())
    }

    /// Re-apply the last non-zero brightness.
    pub fn restore(&mut self) -> Result<(), P::Error> {
        self.set_brightness(self.saved)
    }

    fn write(&mut self, percent: u8) -> Result<(), P::Error> {
        let max = self.pwm.max_duty_cycle() as u32;
        let mut duty = max * percent as u32 / 100;
        if self.output_invert {
            duty = max - duty;
        }
        self.pwm.set_duty_cycle(duty as u16)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use core::convert::Infallible;
    use embedded_hal::pwm::ErrorType;

    struct MockPwm {
        duty: u16,
    }

    impl ErrorType for MockPwm {
        type Error = Infallible;
    }

    impl SetDutyCycle for MockPwm {
        fn max_duty_cycle(&self) -> u16 {
            1023
        }

        fn set_duty_cycle(&mut self, duty: u16) -> Result<(), Infallible> {
            self.duty = duty;
            Ok(())
        }
    }

    #[test]
    fn starts_dark() {
        let bl = PwmBacklight::new(MockPwm { duty: 500 }, false).unwrap();
        assert_eq!(bl.pwm.duty, 0);
        assert_eq!(bl.brightness(), 0);
    }

    #[test]
    fn brightness_maps_to_duty() {
        let mut bl = PwmBacklight::new(MockPwm { duty: 0 }, false).unwrap();
        bl.set_brightness(100).unwrap();
        assert_eq!(bl.pwm.duty, 1023);
        bl.set_brightness(50).unwrap();
        assert_eq!(bl.pwm.duty, 511);
        assert_eq!(bl.brightness(), 50);
    }

    #[test]
    fn brightness_is_clamped() {
        let mut bl = PwmBacklight::new(MockPwm { duty: 0 }, false).unwrap();
        bl.set_brightness(250).unwrap();
        assert_eq!(bl.brightness(), 100);
        assert_eq!(bl.pwm.duty, 1023);
    }

    #[test]
    fn inverted_output() {
        let mut bl = PwmBacklight::new(MockPwm { duty: 0 }, true).unwrap();
        assert_eq!(bl.pwm.duty, 1023);
        bl.set_brightness(100).unwrap();
        assert_eq!(bl.pwm.duty, 0);
    }

    #[test]
    fn off_and_restore() {
        let mut bl = PwmBacklight::new(MockPwm { duty: 0 }, false).unwrap();
        bl.set_brightness(40).unwrap();
        bl.turn_off().unwrap();
        assert_eq!(bl.brightness(), 0);
        assert_eq!(bl.pwm.duty, 0);

        bl.restore().unwrap();
        assert_eq!(bl.brightness(), 40);
    }

    #[test]
    fn restore_defaults_to_full() {
        let mut bl = PwmBacklight::new(MockPwm { duty: 0 }, false).unwrap();
        bl.restore().unwrap();
        assert_eq!(bl.brightness(), DEFAULT_BRIGHTNESS);
    }
}
