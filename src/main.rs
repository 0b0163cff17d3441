//! ES3C28P voice-assistant board firmware (bare-metal, esp-hal + embassy).
//!
//! Brings the board up in its fixed order, switches the backlight on and
//! then runs the board: the boot button is polled by its own task, board
//! tool calls arrive as NDJSON on the USB-Serial-JTAG console, and the
//! main loop owns the hardware (tool calls, touch, battery, status screen).

#![no_std]
#![no_main]

use esp_backtrace as _;

esp_bootloader_esp_idf::esp_app_desc!();

// Hardware-specific modules (binary crate only)
mod display;
mod hardware;

// Re-export library modules so binary submodules can use crate::*
pub(crate) use es3c28p::{backlight, battery, board, bringup, button, codec, comm, led, platform, protocol, screen, touch};

use core::sync::atomic::{AtomicU8, Ordering};

use embassy_futures::select::{select3, Either3};
use embassy_sync::blocking_mutex::raw::CriticalSectionRawMutex;
use embassy_sync::channel::Channel;
use embassy_time::{Duration, Instant, Timer};
use embedded_io_async::{Read, Write};
use esp_hal::gpio::Input;
use esp_hal::interrupt::software::SoftwareInterruptControl;
use esp_hal::timer::timg::TimerGroup;
use esp_hal::usb_serial_jtag::UsbSerialJtag;

use button::{boot_click_action, state_after, BootAction, ButtonEvent, ClickDetector, DeviceState, StartupWindow};
use comm::LineReader;
use hardware::{BoardPeripherals, Es3c28p};
use platform::Board;
use protocol::{ToolCall, ToolResponse, MAX_MSG_LEN, VERSION};
use screen::StatusView;

// ── Channel type aliases ──────────────────────────────────────────────

type ToolCallChannel = Channel<CriticalSectionRawMutex, ToolCall, 2>;
type ResponseChannel = Channel<CriticalSectionRawMutex, ToolResponse, 2>;
type ActionChannel = Channel<CriticalSectionRawMutex, BootAction, 4>;

// ── Static channels and shared state ─────────────────────────────────

/// Parsed tool calls from the console, applied by the board loop
static TOOL_CALLS: ToolCallChannel = Channel::new();

/// One response per tool call, back to the console
static TOOL_RESPONSES: ResponseChannel = Channel::new();

/// Boot-button clicks, resolved against the device state at click time
static BOOT_ACTIONS: ActionChannel = Channel::new();

/// Device state as last published by the application
static DEVICE_STATE: AtomicU8 = AtomicU8::new(DeviceState::Starting as u8);

const BUTTON_POLL_MS: u64 = 10;
const BOARD_POLL_MS: u64 = 50;
const STATUS_REFRESH_MS: u64 = 500;
const BATTERY_LOG_SECS: u64 = 30;

fn current_state() -> DeviceState {
    DeviceState::from_u8(DEVICE_STATE.load(Ordering::Relaxed))
}

fn publish_state(state: DeviceState) {
    DEVICE_STATE.store(state as u8, Ordering::Relaxed);
    log::info!("Device state: {}", state.as_str());
}

// ── Entry point ──────────────────────────────────────────────────────

#[esp_rtos::main]
async fn main(spawner: embassy_executor::Spawner) {
    esp_println::logger::init_logger_from_env();

    let peripherals = esp_hal::init(esp_hal::Config::default());

    // Start the RTOS on a timer and a software interrupt
    let timg0 = TimerGroup::new(peripherals.TIMG0);
    let sw_int = SoftwareInterruptControl::new(peripherals.SW_INTERRUPT);
    esp_rtos::start(timg0.timer0, sw_int.software_interrupt0);

    log::info!("ES3C28P firmware v{} starting on {}", VERSION, board::BOARD_NAME);

    let (mut hw, boot_button) = hardware::bring_up(BoardPeripherals {
        i2c0: peripherals.I2C0,
        i2c_sda: peripherals.GPIO16,
        i2c_scl: peripherals.GPIO15,
        spi3: peripherals.SPI3,
        lcd_sck: peripherals.GPIO12,
        lcd_mosi: peripherals.GPIO11,
        lcd_cs: peripherals.GPIO10,
        lcd_dc: peripherals.GPIO46,
        touch_rst: peripherals.GPIO18,
        touch_int: peripherals.GPIO17,
        boot_button: peripherals.GPIO0,
        adc1: peripherals.ADC1,
        battery_adc: peripherals.GPIO9,
        ledc: peripherals.LEDC,
        rgb_led: peripherals.GPIO42,
        backlight: peripherals.GPIO45,
        codec_pa: peripherals.GPIO1,
    });

    screen::draw_splash(hw.display(), board::BOARD_NAME);
    if let Err(e) = hw.backlight().set_brightness(backlight::DEFAULT_BRIGHTNESS) {
        log::warn!("Backlight on failed: {:?}", e);
    }

    spawner.spawn(button_task(boot_button)).unwrap();
    spawner.spawn(console_task(peripherals.USB_DEVICE)).unwrap();

    board_loop(&mut hw).await;
}

// ── Board loop ───────────────────────────────────────────────────────

/// Owns the hardware: applies tool calls and boot actions, follows the
/// touch panel, logs the battery and keeps the status screen current.
/// The splash stays up until the startup window closes.
async fn board_loop(hw: &mut Es3c28p) -> ! {
    let calls = TOOL_CALLS.receiver();
    let actions = BOOT_ACTIONS.receiver();
    let mut startup = StartupWindow::new(Instant::now().as_millis());

    let mut view = StatusView {
        state: current_state(),
        battery: hw.battery_level().map(|status| status.level),
        brightness: hw.backlight().brightness(),
        led: hw.led_color(),
        touch: None,
        uptime_secs: 0,
    };
    let mut last_battery = Instant::now();
    let mut last_redraw = Instant::MIN;

    loop {
        match select3(
            calls.receive(),
            actions.receive(),
            Timer::after(Duration::from_millis(BOARD_POLL_MS)),
        )
        .await
        {
            Either3::First(call) => {
                let response = comm::handle_tool_call(call, hw);
                TOOL_RESPONSES.send(response).await;
            }
            Either3::Second(action) => apply_boot_action(action),
            Either3::Third(()) => {}
        }

        if startup.expire(Instant::now().as_millis()) {
            if current_state() == DeviceState::Starting {
                publish_state(DeviceState::Idle);
            }
            screen::prepare_status(hw.display());
        }

        if hw.touch_pending() {
            match hw.touch().read_touches() {
                Ok(touches) => {
                    if let Some(point) = touches.first() {
                        log::debug!("Touch {:?} at {},{}", point.event, point.x, point.y);
                        view.touch = Some((point.x, point.y));
                    }
                }
                Err(e) => log::warn!("Touch read failed: {:?}", e),
            }
        }

        if last_battery.elapsed() >= Duration::from_secs(BATTERY_LOG_SECS) {
            last_battery = Instant::now();
            view.battery = hw.battery_level().map(|status| status.level);
            if let Some(level) = view.battery {
                log::info!("Battery {}%", level);
            }
        }

        if !startup.is_open() && last_redraw.elapsed() >= Duration::from_millis(STATUS_REFRESH_MS) {
            last_redraw = Instant::now();
            view.state = current_state();
            view.brightness = hw.backlight().brightness();
            view.led = hw.led_color();
            view.uptime_secs = Instant::now().as_secs() as u32;
            screen::draw_status(hw.display(), &view);
        }
    }
}

/// Stand-in for the application state machine: enough for the boot
/// button to have a visible effect on this firmware.
fn apply_boot_action(action: BootAction) {
    publish_state(state_after(action, current_state()));
}

// ── Tasks ────────────────────────────────────────────────────────────

/// Boot button task: samples GPIO0 and dispatches clicks by device state.
#[embassy_executor::task]
async fn button_task(button: Input<'static>) {
    log::info!("Boot button ready on GPIO{}", board::BOOT_BUTTON_PIN);

    let mut detector = ClickDetector::new();

    loop {
        match detector.update(button.is_low(), Instant::now().as_millis()) {
            Some(ButtonEvent::Click) => {
                let state = current_state();
                let action = boot_click_action(state);
                log::info!("Boot button click while {} -> {:?}", state.as_str(), action);
                if BOOT_ACTIONS.try_send(action).is_err() {
                    log::warn!("Boot action queue full, click dropped");
                }
            }
            Some(ButtonEvent::LongPress) => log::debug!("Boot button long press"),
            None => {}
        }
        Timer::after(Duration::from_millis(BUTTON_POLL_MS)).await;
    }
}

/// Console task: reads NDJSON tool calls from USB-Serial-JTAG and writes
/// one response line per call.
#[embassy_executor::task]
async fn console_task(usb: esp_hal::peripherals::USB_DEVICE<'static>) {
    let (mut rx, mut tx) = UsbSerialJtag::new(usb).into_async().split();
    log::info!("Tool console ready");

    let mut reader = LineReader::new();
    let mut chunk = [0u8; 64];
    let mut out = [0u8; MAX_MSG_LEN];

    loop {
        let n = match rx.read(&mut chunk).await {
            Ok(n) => n,
            Err(e) => {
                log::warn!("Console read error: {:?}", e);
                continue;
            }
        };

        for &byte in &chunk[..n] {
            let Some(line) = reader.feed(byte) else {
                continue;
            };

            let response = match comm::parse_tool_call(line) {
                Some(call) => {
                    log::debug!("Tool call {}", call.name());
                    TOOL_CALLS.send(call).await;
                    TOOL_RESPONSES.receive().await
                }
                None => comm::unknown_call(),
            };

            if let Some(len) = comm::serialize_response(&response, &mut out) {
                if let Err(e) = tx.write_all(&out[..len]).await {
                    log::warn!("Console write error: {:?}", e);
                }
                if let Err(e) = tx.flush().await {
                    log::warn!("Console flush error: {:?}", e);
                }
            }
        }
    }
}
