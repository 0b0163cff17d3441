/// The board interface consumed by the rest of the firmware.
///
/// Application, audio and UI code only talk to the hardware through
/// [`Board`]; each firmware flavour provides one implementation that owns
/// the concrete drivers created during bring-up.
use embedded_hal::pwm::SetDutyCycle;

use crate::backlight::PwmBacklight;
pub use crate::battery::BatteryStatus;

/// Percentage-based backlight control.
pub trait Backlight {
    fn set_brightness(&mut self, percent: u8);
    fn brightness(&self) -> u8;
}

impl<P: SetDutyCycle> Backlight for PwmBacklight<P> {
    fn set_brightness(&mut self, percent: u8) {
        if let Err(e) = PwmBacklight::set_brightness(self, percent) {
            log::warn!("Backlight duty update failed: {:?}", e);
        }
    }

    fn brightness(&self) -> u8 {
        PwmBacklight::brightness(self)
    }
}

pub trait Board {
    type AudioCodec;
    type Display;
    type Backlight: Backlight;
    type Touch;

    fn name(&self) -> &'static str {
        crate::board::BOARD_NAME
    }

    fn audio_codec(&mut self) -> &mut Self::AudioCodec;
    fn display(&mut self) -> &mut Self::Display;
    fn backlight(&mut self) -> &mut Self::Backlight;
    fn touch(&mut self) -> &mut Self::Touch;

    /// Battery charge, or `None` when the board cannot sense it right now.
    fn battery_level(&mut self) -> Option<BatteryStatus>;

    /// Drive the status LED; the three components are averaged.
    fn set_rgb_led_color(&mut self, red: u8, green: u8, blue: u8);
}
