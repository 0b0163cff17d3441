/// The ES3C28P on esp-hal: ordered bring-up and the `Board` implementation.
///
/// Every bring-up step is fatal on failure. The codec and the touch
/// controller share I2C0 through `RefCellDevice`; the LEDC peripheral
/// drives the status LED (timer 0 / channel 0) and the backlight
/// (timer 1 / channel 1) so the two never fight over a channel.
use core::cell::RefCell;

use embedded_hal_bus::i2c::RefCellDevice;
use esp_hal::analog::adc::{Adc, AdcConfig, AdcPin, Attenuation};
use esp_hal::delay::Delay;
use esp_hal::gpio::{DriveMode, Input, InputConfig, Level, Output, OutputConfig, Pull};
use esp_hal::i2c::master::{Config as I2cConfig, I2c};
use esp_hal::ledc::channel::{self, ChannelIFace};
use esp_hal::ledc::timer::{self, config::Duty, TimerIFace};
use esp_hal::ledc::{LSGlobalClkSource, Ledc, LowSpeed};
use esp_hal::peripherals;
use esp_hal::time::Rate;
use esp_hal::Blocking;
use static_cell::StaticCell;

use crate::backlight::PwmBacklight;
use crate::battery::{BatteryMonitor, BatterySense};
use crate::board;
use crate::bringup::{Bringup, FailureKind, InitStep};
use crate::codec::{CodecConfig, Es8311};
use crate::display::{self, Lcd};
use crate::led::StatusLed;
use crate::platform::{BatteryStatus, Board};
use crate::touch::{self, Ft6x36, TouchConfig, TouchError};

type I2cBus = I2c<'static, Blocking>;
type SharedI2c = RefCellDevice<'static, I2cBus>;
type Pwm = channel::Channel<'static, LowSpeed>;

pub type Codec = Es8311<SharedI2c, Output<'static>>;
pub type Touch = Ft6x36<SharedI2c>;

static I2C_BUS: StaticCell<RefCell<I2cBus>> = StaticCell::new();
static LEDC: StaticCell<Ledc<'static>> = StaticCell::new();
static LED_TIMER: StaticCell<timer::Timer<'static, LowSpeed>> = StaticCell::new();
static BACKLIGHT_TIMER: StaticCell<timer::Timer<'static, LowSpeed>> = StaticCell::new();

/// Peripherals the board takes over, by role.
pub struct BoardPeripherals {
    pub i2c0: peripherals::I2C0<'static>,
    pub i2c_sda: peripherals::GPIO16<'static>,
    pub i2c_scl: peripherals::GPIO15<'static>,
    pub spi3: peripherals::SPI3<'static>,
    pub lcd_sck: peripherals::GPIO12<'static>,
    pub lcd_mosi: peripherals::GPIO11<'static>,
    pub lcd_cs: peripherals::GPIO10<'static>,
    pub lcd_dc: peripherals::GPIO46<'static>,
    pub touch_rst: peripherals::GPIO18<'static>,
    pub touch_int: peripherals::GPIO17<'static>,
    pub boot_button: peripherals::GPIO0<'static>,
    pub adc1: peripherals::ADC1<'static>,
    pub battery_adc: peripherals::GPIO9<'static>,
    pub ledc: peripherals::LEDC<'static>,
    pub rgb_led: peripherals::GPIO42<'static>,
    pub backlight: peripherals::GPIO45<'static>,
    pub codec_pa: peripherals::GPIO1<'static>,
}

/// One-shot battery reads on ADC1 (GPIO9 is ADC1 channel 8).
pub struct AdcBattery {
    adc: Adc<'static, peripherals::ADC1<'static>, Blocking>,
    pin: AdcPin<peripherals::GPIO9<'static>, peripherals::ADC1<'static>>,
}

impl BatterySense for AdcBattery {
    type Error = ();

    fn read_raw(&mut self) -> Result<u16, ()> {
        nb::block!(self.adc.read_oneshot(&mut self.pin))
    }
}

pub struct Es3c28p {
    codec: Codec,
    display: Lcd,
    backlight: PwmBacklight<Pwm>,
    touch: Touch,
    touch_int: Input<'static>,
    _touch_rst: Output<'static>,
    battery: BatteryMonitor<AdcBattery>,
    led: StatusLed<Pwm>,
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
    type Backlight = PwmBacklight<Pwm>;
    type Touch = Touch;

    fn audio_codec(&mut self) -> &mut Codec {
        &mut self.codec
    }

    fn display(&mut self) -> &mut Lcd {
        &mut self.display
    }

    fn backlight(&mut self) -> &mut PwmBacklight<Pwm> {
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

/// Unwrap a bring-up result or halt with the failing step.
fn check<T, E: core::fmt::Debug>(bringup: &Bringup, step: InitStep, kind: FailureKind, result: Result<T, E>) -> T {
    match result {
        Ok(value) => value,
        Err(e) => {
            log::error!("{} error: {:?}", step.name(), e);
            panic!("{}", bringup.fail(step, kind));
        }
    }
}

fn begin(bringup: &Bringup, step: InitStep) {
    if let Err(e) = bringup.begin(step) {
        panic!("{}", e);
    }
}

fn complete(bringup: &mut Bringup, step: InitStep) {
    if let Err(e) = bringup.complete(step) {
        panic!("{}", e);
    }
}

/// Bring the board up in contract order.
///
/// Returns the board and the boot button input; the button is polled by
/// its own task rather than owned by the board.
pub fn bring_up(p: BoardPeripherals) -> (Es3c28p, Input<'static>) {
    let mut bringup = Bringup::new();
    let mut delay = Delay::new();

    // ── 1. I2C bus (codec + touch) ───────────────────────────────────
    begin(&bringup, InitStep::I2cBus);
    let i2c_config = I2cConfig::default().with_frequency(Rate::from_khz(board::TOUCH_I2C_FREQ_KHZ));
    let i2c = check(&bringup, InitStep::I2cBus, FailureKind::Bus, I2c::new(p.i2c0, i2c_config))
        .with_sda(p.i2c_sda)
        .with_scl(p.i2c_scl);
    let i2c_bus: &'static RefCell<I2cBus> = I2C_BUS.init(RefCell::new(i2c));
    complete(&mut bringup, InitStep::I2cBus);

    // ── 2. SPI bus ───────────────────────────────────────────────────
    begin(&bringup, InitStep::SpiBus);
    let spi = check(
        &bringup,
        InitStep::SpiBus,
        FailureKind::Bus,
        display::open_spi(p.spi3, p.lcd_sck, p.lcd_mosi),
    );
    complete(&mut bringup, InitStep::SpiBus);

    // ── 3. Display panel ─────────────────────────────────────────────
    begin(&bringup, InitStep::Display);
    let lcd = match display::init_panel(spi, p.lcd_cs, p.lcd_dc, &mut delay) {
        Ok(lcd) => lcd,
        Err(kind) => panic!("{}", bringup.fail(InitStep::Display, kind)),
    };
    complete(&mut bringup, InitStep::Display);

    // ── 4. Touch controller ──────────────────────────────────────────
    begin(&bringup, InitStep::Touch);
    let mut touch_rst = Output::new(p.touch_rst, Level::High, OutputConfig::default());
    check(
        &bringup,
        InitStep::Touch,
        FailureKind::Gpio,
        touch::hard_reset(&mut touch_rst, &mut delay),
    );
    let touch_int = Input::new(p.touch_int, InputConfig::default().with_pull(Pull::Up));
    let mut touch = Ft6x36::new(
        RefCellDevice::new(i2c_bus),
        board::TOUCH_I2C_ADDR,
        TouchConfig::board(),
    );
    match touch.probe() {
        Ok(info) => log::info!("Touch controller {} (chip {:#04x})", info.model(), info.chip),
        // Clones report other vendor ids but speak the same protocol
        Err(TouchError::UnknownVendor(id)) => log::warn!("Touch vendor id {:#04x} not FocalTech", id),
        Err(e) => check(&bringup, InitStep::Touch, FailureKind::Touch, Err(e)),
    }
    complete(&mut bringup, InitStep::Touch);

    // ── 5. Buttons ───────────────────────────────────────────────────
    begin(&bringup, InitStep::Buttons);
    let boot_button = Input::new(p.boot_button, InputConfig::default().with_pull(Pull::Up));
    complete(&mut bringup, InitStep::Buttons);

    // ── 6. Battery ADC ───────────────────────────────────────────────
    begin(&bringup, InitStep::Battery);
    let mut adc_config = AdcConfig::new();
    let pin = adc_config.enable_pin(p.battery_adc, Attenuation::_11dB);
    let adc = Adc::new(p.adc1, adc_config);
    let battery = BatteryMonitor::new(AdcBattery { adc, pin });
    complete(&mut bringup, InitStep::Battery);

    // ── 7. Status LED PWM ────────────────────────────────────────────
    begin(&bringup, InitStep::StatusLed);
    let ledc = LEDC.init(Ledc::new(p.ledc));
    ledc.set_global_slow_clock(LSGlobalClkSource::APBClk);
    let ledc: &'static Ledc<'static> = ledc;

    let led_timer = LED_TIMER.init(ledc.timer::<LowSpeed>(timer::Number::Timer0));
    check(
        &bringup,
        InitStep::StatusLed,
        FailureKind::Pwm,
        led_timer.configure(timer::config::Config {
            duty: Duty::Duty13Bit,
            clock_source: timer::LSClockSource::APBClk,
            frequency: Rate::from_hz(board::LED_PWM_FREQ_HZ),
        }),
    );
    let led_timer: &'static timer::Timer<'static, LowSpeed> = led_timer;

    let mut led_channel = ledc.channel(channel::Number::Channel0, p.rgb_led);
    check(
        &bringup,
        InitStep::StatusLed,
        FailureKind::Pwm,
        led_channel.configure(channel::config::Config {
            timer: led_timer,
            duty_pct: 0,
            drive_mode: DriveMode::PushPull,
        }),
    );
    let led = check(&bringup, InitStep::StatusLed, FailureKind::Pwm, StatusLed::new(led_channel));
    complete(&mut bringup, InitStep::StatusLed);

    // ── Backlight (own timer and channel) ────────────────────────────
    let backlight_timer = BACKLIGHT_TIMER.init(ledc.timer::<LowSpeed>(timer::Number::Timer1));
    backlight_timer
        .configure(timer::config::Config {
            duty: Duty::Duty10Bit,
            clock_source: timer::LSClockSource::APBClk,
            frequency: Rate::from_hz(board::BACKLIGHT_PWM_FREQ_HZ),
        })
        .expect("backlight timer config failed");
    let backlight_timer: &'static timer::Timer<'static, LowSpeed> = backlight_timer;

    let mut backlight_channel = ledc.channel(channel::Number::Channel1, p.backlight);
    backlight_channel
        .configure(channel::config::Config {
            timer: backlight_timer,
            duty_pct: 0,
            drive_mode: DriveMode::PushPull,
        })
        .expect("backlight channel config failed");
    let backlight = PwmBacklight::new(backlight_channel, board::DISPLAY_BACKLIGHT_OUTPUT_INVERT)
        .expect("backlight init failed");

    // ── Audio codec (PA held off until playback) ─────────────────────
    let pa_off = if board::AUDIO_CODEC_PA_INVERTED { Level::High } else { Level::Low };
    let pa = Output::new(p.codec_pa, pa_off, OutputConfig::default());
    let mut codec = Es8311::new(RefCellDevice::new(i2c_bus), pa, CodecConfig::board()).expect("codec PA init failed");
    if let Err(e) = codec.probe() {
        log::warn!("ES8311 probe failed: {:?}", e);
    }

    log::info!("{} bring-up complete", board::BOARD_NAME);

    let board = Es3c28p {
        codec,
        display: lcd,
        backlight,
        touch,
        touch_int,
        _touch_rst: touch_rst,
        battery,
        led,
    };
    (board, boot_button)
}
