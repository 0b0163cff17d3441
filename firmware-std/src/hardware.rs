//! The ES3C28P on ESP-IDF: ordered bring-up and the `Board` implementation.
//!
//! Same order and fatal-on-failure contract as the bare-metal firmware;
//! a failed step comes back as an `anyhow` error carrying the
//! `BringupError`, and `main` returning it aborts the firmware.
//! Bus handles and LEDC timers are leaked to get `'static` drivers, the
//! std stand-in for `StaticCell`.

use std::cell::RefCell;
use std::fmt::Debug;

use embedded_hal_bus::i2c::RefCellDevice;
use esp_idf_svc::hal::adc::attenuation::DB_12;
use esp_idf_svc::hal::adc::oneshot::config::AdcChannelConfig;
use esp_idf_svc::hal::adc::oneshot::{AdcChannelDriver, AdcDriver};
use esp_idf_svc::hal::adc::ADC1;
use esp_idf_svc::hal::delay::Delay;
use esp_idf_svc::hal::gpio::{AnyIOPin, Gpio0, Gpio1, Gpio17, Gpio18, Gpio46, Gpio9, Input, Output, PinDriver, Pull};
use esp_idf_svc::hal::i2c::{I2cConfig, I2cDriver};
use esp_idf_svc::hal::ledc::config::TimerConfig;
use esp_idf_svc::hal::ledc::{LedcDriver, LedcTimerDriver, Resolution};
use esp_idf_svc::hal::peripherals::Peripherals;
use esp_idf_svc::hal::spi::config::{Config as SpiConfig, DriverConfig as SpiDriverConfig};
use esp_idf_svc::hal::spi::{SpiDeviceDriver, SpiDriver};
use esp_idf_svc::hal::units::Hertz;
use esp_idf_svc::sys::EspError;
use mipidsi::interface::SpiInterface;
use mipidsi::models::ST7789;
use mipidsi::options::{ColorInversion, ColorOrder, Orientation};
use mipidsi::{Builder, NoResetPin};

use es3c28p::backlight::PwmBacklight;
use es3c28p::battery::{BatteryMonitor, BatterySense};
use es3c28p::board;
use es3c28p::bringup::{Bringup, FailureKind, InitStep};
use es3c28p::codec::{CodecConfig, Es8311};
use es3c28p::led::StatusLed;
use es3c28p::platform::{BatteryStatus, Board};
use es3c28p::touch::{self, Ft6x36, TouchConfig, TouchError};

type SharedI2c = RefCellDevice<'static, I2cDriver<'static>>;
type LcdInterface = SpiInterface<'static, SpiDeviceDriver<'static, SpiDriver<'static>>, PinDriver<'static, Gpio46, Output>>;

pub type Lcd = mipidsi::Display<LcdInterface, ST7789, NoResetPin>;
pub type Codec = Es8311<SharedI2c, PinDriver<'static, Gpio1, Output>>;
pub type Touch = Ft6x36<SharedI2c>;
pub type BootButton = PinDriver<'static, Gpio0, Input>;

/// One-shot battery reads; GPIO9 is ADC1 channel 8.
pub struct AdcBattery {
    channel: AdcChannelDriver<'static, Gpio9, AdcDriver<'static, ADC1>>,
}

impl BatterySense for AdcBattery {
    type Error = EspError;

    fn read_raw(&mut self) -> Result<u16, EspError> {
        self.channel.read_raw()
    }
}

pub struct Es3c28p {
    codec: Codec,
    display: Lcd,
    backlight: PwmBacklight<LedcDriver<'static>>,
    touch: Touch,
    touch_int: PinDriver<'static, Gpio17, Input>,
    _touch_rst: PinDriver<'static, Gpio18, Output>,
    battery: BatteryMonitor<AdcBattery>,
    led: StatusLed<LedcDriver<'static>>,
}

impl Es3c28p {
    /// The controller pulls INT low while a finger is down.
    pub fn touch_pending(&self) -> bool {
        self.touch_int.is_low()
    }

    pub fn led_color(&self) -> (u8, u8, u8) {
        self.led.color()
    }
}

impl Board for Es3c28p {
    type AudioCodec = Codec;
    type Display = Lcd;
    type Backlight = PwmBacklight<LedcDriver<'static>>;
    type Touch = Touch;

    fn audio_codec(&mut self) -> &mut Codec {
        &mut self.codec
    }

    fn display(&mut self) -> &mut Lcd {
        &mut self.display
    }

    fn backlight(&mut self) -> &mut Self::Backlight {
        &mut self.backlight
    }

    fn touch(&mut self) -> &mut Touch {
        &mut self.touch
    }

    fn battery_level(&mut self) -> Option<BatteryStatus> {
        match self.battery.read() {
            Ok(status) => Some(status),
            Err(e) => {
                log::warn!("Battery read failed: {:?}", e);
                None
            }
        }
    }

    fn set_rgb_led_color(&mut self, red: u8, green: u8, blue: u8) {
        if let Err(e) = self.led.set_color(red, green, blue) {
            log::warn!("Status LED update failed: {:?}", e);
        }
    }
}

/// Turn a driver error into the fatal error for `step`.
fn fatal<E: Debug>(bringup: &Bringup, step: InitStep, kind: FailureKind) -> impl FnOnce(E) -> anyhow::Error + '_ {
    move |e| {
        log::error!("{} error: {:?}", step.name(), e);
        bringup.fail(step, kind).into()
    }
}

fn leak<T>(value: T) -> &'static mut T {
    Box::leak(Box::new(value))
}

/// Bring the board up in contract order.
pub fn bring_up(p: Peripherals) -> anyhow::Result<(Es3c28p, BootButton)> {
    let mut bringup = Bringup::new();
    let mut delay = Delay::new_default();
    let pins = p.pins;

    // ── 1. I2C bus (codec + touch) ───────────────────────────────────
    bringup.begin(InitStep::I2cBus)?;
    let i2c_config = I2cConfig::new()
        .baudrate(Hertz(board::TOUCH_I2C_FREQ_KHZ * 1_000))
        .sda_enable_pullup(board::I2C_INTERNAL_PULLUP)
        .scl_enable_pullup(board::I2C_INTERNAL_PULLUP);
    let i2c = I2cDriver::new(p.i2c0, pins.gpio16, pins.gpio15, &i2c_config)
        .map_err(fatal(&bringup, InitStep::I2cBus, FailureKind::Bus))?;
    let i2c_bus: &'static RefCell<I2cDriver<'static>> = leak(RefCell::new(i2c));
    bringup.complete(InitStep::I2cBus)?;

    // ── 2. SPI bus ───────────────────────────────────────────────────
    bringup.begin(InitStep::SpiBus)?;
    let spi = SpiDriver::new(p.spi3, pins.gpio12, pins.gpio11, None::<AnyIOPin>, &SpiDriverConfig::new())
        .map_err(fatal(&bringup, InitStep::SpiBus, FailureKind::Bus))?;
    bringup.complete(InitStep::SpiBus)?;

    // ── 3. Display panel ─────────────────────────────────────────────
    bringup.begin(InitStep::Display)?;
    let spi_config = SpiConfig::new()
        .baudrate(Hertz(board::DISPLAY_SPI_FREQ_MHZ * 1_000_000))
        .data_mode(embedded_hal::spi::MODE_0);
    let spi_device = SpiDeviceDriver::new(spi, Some(pins.gpio10), &spi_config)
        .map_err(fatal(&bringup, InitStep::Display, FailureKind::Bus))?;
    let dc = PinDriver::output(pins.gpio46).map_err(fatal(&bringup, InitStep::Display, FailureKind::Gpio))?;
    let buffer = leak([0u8; 512]);
    let di = SpiInterface::new(spi_device, dc, buffer);

    let mut orientation = Orientation::new();
    if board::DISPLAY_MIRROR_X {
        orientation = orientation.flip_horizontal();
    }
    if board::DISPLAY_MIRROR_Y {
        orientation = orientation.flip_vertical();
    }
    let inversion = if board::DISPLAY_INVERT_COLORS {
        ColorInversion::Inverted
    } else {
        ColorInversion::Normal
    };
    let color_order = if board::DISPLAY_COLOR_BGR {
        ColorOrder::Bgr
    } else {
        ColorOrder::Rgb
    };

    let display = Builder::new(ST7789, di)
        .display_size(board::DISPLAY_WIDTH, board::DISPLAY_HEIGHT)
        .display_offset(board::DISPLAY_OFFSET_X, board::DISPLAY_OFFSET_Y)
        .invert_colors(inversion)
        .color_order(color_order)
        .orientation(orientation)
        .init(&mut delay)
        .map_err(fatal(&bringup, InitStep::Display, FailureKind::Panel))?;
    delay.delay_ms(board::DISPLAY_ON_DELAY_MS);
    bringup.complete(InitStep::Display)?;

    // ── 4. Touch controller ──────────────────────────────────────────
    bringup.begin(InitStep::Touch)?;
    let mut touch_rst = PinDriver::output(pins.gpio18).map_err(fatal(&bringup, InitStep::Touch, FailureKind::Gpio))?;
    touch::hard_reset(&mut touch_rst, &mut delay).map_err(fatal(&bringup, InitStep::Touch, FailureKind::Gpio))?;
    let mut touch_int = PinDriver::input(pins.gpio17).map_err(fatal(&bringup, InitStep::Touch, FailureKind::Gpio))?;
    touch_int
        .set_pull(Pull::Up)
        .map_err(fatal(&bringup, InitStep::Touch, FailureKind::Gpio))?;
    let mut touch = Ft6x36::new(
        RefCellDevice::new(i2c_bus),
        board::TOUCH_I2C_ADDR,
        TouchConfig::board(),
    );
    match touch.probe() {
        Ok(info) => log::info!("Touch controller {} (chip {:#04x})", info.model(), info.chip),
        // Clones report other vendor ids but speak the same protocol
        Err(TouchError::UnknownVendor(id)) => log::warn!("Touch vendor id {:#04x} not FocalTech", id),
        Err(e) => return Err(fatal(&bringup, InitStep::Touch, FailureKind::Touch)(e)),
    }
    bringup.complete(InitStep::Touch)?;

    // ── 5. Buttons ───────────────────────────────────────────────────
    bringup.begin(InitStep::Buttons)?;
    let mut boot_button = PinDriver::input(pins.gpio0).map_err(fatal(&bringup, InitStep::Buttons, FailureKind::Gpio))?;
    boot_button
        .set_pull(Pull::Up)
        .map_err(fatal(&bringup, InitStep::Buttons, FailureKind::Gpio))?;
    bringup.complete(InitStep::Buttons)?;

    // ── 6. Battery ADC ───────────────────────────────────────────────
    bringup.begin(InitStep::Battery)?;
    let adc = AdcDriver::new(p.adc1).map_err(fatal(&bringup, InitStep::Battery, FailureKind::Adc))?;
    let channel_config = AdcChannelConfig {
        attenuation: DB_12,
        ..Default::default()
    };
    let channel = AdcChannelDriver::new(adc, pins.gpio9, &channel_config)
        .map_err(fatal(&bringup, InitStep::Battery, FailureKind::Adc))?;
    let battery = BatteryMonitor::new(AdcBattery { channel });
    bringup.complete(InitStep::Battery)?;

    // ── 7. Status LED PWM ────────────────────────────────────────────
    bringup.begin(InitStep::StatusLed)?;
    let led_timer_config = TimerConfig::new()
        .frequency(Hertz(board::LED_PWM_FREQ_HZ))
        .resolution(Resolution::Bits13);
    let led_timer = LedcTimerDriver::new(p.ledc.timer0, &led_timer_config)
        .map_err(fatal(&bringup, InitStep::StatusLed, FailureKind::Pwm))?;
    let led_timer: &'static _ = leak(led_timer);
    let led_channel = LedcDriver::new(p.ledc.channel0, led_timer, pins.gpio42)
        .map_err(fatal(&bringup, InitStep::StatusLed, FailureKind::Pwm))?;
    let led = StatusLed::new(led_channel).map_err(fatal(&bringup, InitStep::StatusLed, FailureKind::Pwm))?;
    bringup.complete(InitStep::StatusLed)?;

    // ── Backlight (own timer and channel) ────────────────────────────
    let backlight_timer_config = TimerConfig::new()
        .frequency(Hertz(board::BACKLIGHT_PWM_FREQ_HZ))
        .resolution(Resolution::Bits10);
    let backlight_timer: &'static _ = leak(LedcTimerDriver::new(p.ledc.timer1, &backlight_timer_config)?);
    let backlight_channel = LedcDriver::new(p.ledc.channel1, backlight_timer, pins.gpio45)?;
    let backlight = PwmBacklight::new(backlight_channel, board::DISPLAY_BACKLIGHT_OUTPUT_INVERT)?;

    // ── Audio codec (PA held off until playback) ─────────────────────
    let pa = PinDriver::output(pins.gpio1)?;
    let mut codec = Es8311::new(RefCellDevice::new(i2c_bus), pa, CodecConfig::board())
        .map_err(|e| anyhow::anyhow!("codec PA init failed: {:?}", e))?;
    if let Err(e) = codec.probe() {
        log::warn!("ES8311 probe failed: {:?}", e);
    }

    log::info!("{} bring-up complete", board::BOARD_NAME);

    let board = Es3c28p {
        codec,
        display,
        backlight,
        touch,
        touch_int,
        _touch_rst: touch_rst,
        battery,
        led,
    };
    Ok((board, boot_button))
}
