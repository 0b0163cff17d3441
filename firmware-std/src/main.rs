//! ES3C28P ESP-IDF std firmware
//!
//! Thread-based twin of the bare-metal firmware: the same bring-up and
//! board loop, with FreeRTOS threads and `std::sync::mpsc` channels in
//! place of embassy tasks. Tool calls are read as NDJSON from the console
//! (stdin) and answered on stdout.

mod hardware;

use std::io::{ErrorKind, Read, Write};
use std::sync::atomic::{AtomicU8, Ordering};
use std::sync::mpsc::{self, Receiver, RecvTimeoutError, SyncSender};
use std::thread;
use std::time::{Duration, Instant};

use es3c28p::backlight::DEFAULT_BRIGHTNESS;
use es3c28p::board;
use es3c28p::button::{boot_click_action, state_after, BootAction, ButtonEvent, ClickDetector, DeviceState, StartupWindow};
use es3c28p::comm::{self, LineReader};
use es3c28p::platform::Board;
use es3c28p::protocol::{ToolCall, ToolResponse, MAX_MSG_LEN, VERSION};
use es3c28p::screen::{self, StatusView};
use esp_idf_svc::hal::peripherals::Peripherals;

use hardware::{BootButton, Es3c28p};

/// Work for the thread that owns the board
enum BoardEvent {
    Tool(ToolCall),
    Boot(BootAction),
}

/// Device state as last published by the application
static DEVICE_STATE: AtomicU8 = AtomicU8::new(DeviceState::Starting as u8);

const BUTTON_POLL: Duration = Duration::from_millis(10);
const BOARD_POLL: Duration = Duration::from_millis(50);
const CONSOLE_IDLE: Duration = Duration::from_millis(20);
const STATUS_REFRESH: Duration = Duration::from_millis(500);
const BATTERY_LOG: Duration = Duration::from_secs(30);

fn current_state() -> DeviceState {
    DeviceState::from_u8(DEVICE_STATE.load(Ordering::Relaxed))
}

fn publish_state(state: DeviceState) {
    DEVICE_STATE.store(state as u8, Ordering::Relaxed);
    log::info!("Device state: {}", state.as_str());
}

fn main() -> anyhow::Result<()> {
    // Bind the ESP-IDF logger to the `log` facade
    esp_idf_svc::log::EspLogger::initialize_default();

    let boot = Instant::now();
    log::info!("ES3C28P firmware v{} starting on {} (std)", VERSION, board::BOARD_NAME);

    let peripherals = Peripherals::take()?;
    let (mut hw, boot_button) = hardware::bring_up(peripherals)?;

    screen::draw_splash(hw.display(), board::BOARD_NAME);
    hw.backlight().set_brightness(DEFAULT_BRIGHTNESS)?;

    // ── Channels ─────────────────────────────────────────────────────

    let (event_tx, event_rx) = mpsc::sync_channel::<BoardEvent>(4);
    let (response_tx, response_rx) = mpsc::sync_channel::<ToolResponse>(1);

    // ── Button thread ────────────────────────────────────────────────

    let button_tx = event_tx.clone();
    thread::Builder::new()
        .name("button".into())
        .stack_size(3072)
        .spawn(move || {
            button_thread(boot_button, button_tx);
        })?;
    log::info!("Button thread spawned");

    // ── Console thread ───────────────────────────────────────────────

    thread::Builder::new()
        .name("console".into())
        .stack_size(4096)
        .spawn(move || {
            console_thread(event_tx, response_rx);
        })?;
    log::info!("Console thread spawned");

    board_loop(&mut hw, event_rx, response_tx, boot)
}

// ── Board loop (main thread) ─────────────────────────────────────────

fn board_loop(
    hw: &mut Es3c28p,
    events: Receiver<BoardEvent>,
    responses: SyncSender<ToolResponse>,
    boot: Instant,
) -> anyhow::Result<()> {
    let mut view = StatusView {
        state: current_state(),
        battery: hw.battery_level().map(|status| status.level),
        brightness: hw.backlight().brightness(),
        led: hw.led_color(),
        touch: None,
        uptime_secs: 0,
    };
    let uptime_ms = || boot.elapsed().as_millis() as u64;
    let mut startup = StartupWindow::new(uptime_ms());
    let mut last_battery = Instant::now();
    let mut last_redraw: Option<Instant> = None;

    loop {
        match events.recv_timeout(BOARD_POLL) {
            Ok(BoardEvent::Tool(call)) => {
                let response = comm::handle_tool_call(call, hw);
                if responses.send(response).is_err() {
                    anyhow::bail!("console thread stopped");
                }
            }
            Ok(BoardEvent::Boot(action)) => apply_boot_action(action),
            Err(RecvTimeoutError::Timeout) => {}
            Err(RecvTimeoutError::Disconnected) => anyhow::bail!("board event channel closed"),
        }

        if startup.expire(uptime_ms()) {
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

        if last_battery.elapsed() >= BATTERY_LOG {
            last_battery = Instant::now();
            view.battery = hw.battery_level().map(|status| status.level);
            if let Some(level) = view.battery {
                log::info!("Battery {}%", level);
            }
        }

        if !startup.is_open() && last_redraw.map_or(true, |at| at.elapsed() >= STATUS_REFRESH) {
            last_redraw = Some(Instant::now());
            view.state = current_state();
            view.brightness = hw.backlight().brightness();
            view.led = hw.led_color();
            view.uptime_secs = boot.elapsed().as_secs() as u32;
            screen::draw_status(hw.display(), &view);
        }
    }
}

/// Stand-in for the application state machine: enough for the boot
/// button to have a visible effect on this firmware.
fn apply_boot_action(action: BootAction) {
    publish_state(state_after(action, current_state()));
}

// ── Button thread ────────────────────────────────────────────────────

fn button_thread(button: BootButton, events: SyncSender<BoardEvent>) {
    log::info!("Boot button ready on GPIO{}", board::BOOT_BUTTON_PIN);

    let start = Instant::now();
    let mut detector = ClickDetector::new();

    loop {
        let now_ms = start.elapsed().as_millis() as u64;
        match detector.update(button.is_low(), now_ms) {
            Some(ButtonEvent::Click) => {
                let state = current_state();
                let action = boot_click_action(state);
                log::info!("Boot button click while {} -> {:?}", state.as_str(), action);
                if events.try_send(BoardEvent::Boot(action)).is_err() {
                    log::warn!("Board event queue full, click dropped");
                }
            }
            Some(ButtonEvent::LongPress) => log::debug!("Boot button long press"),
            None => {}
        }
        thread::sleep(BUTTON_POLL);
    }
}

// ── Console thread ───────────────────────────────────────────────────

fn console_thread(events: SyncSender<BoardEvent>, responses: Receiver<ToolResponse>) {
    log::info!("Tool console ready");

    let mut stdin = std::io::stdin();
    let mut stdout = std::io::stdout();
    let mut reader = LineReader::new();
    let mut chunk = [0u8; 64];
    let mut out = [0u8; MAX_MSG_LEN];

    loop {
        // The IDF console is non-blocking: no data reads as 0 or WouldBlock
        let n = match stdin.read(&mut chunk) {
            Ok(0) => {
                thread::sleep(CONSOLE_IDLE);
                continue;
            }
            Ok(n) => n,
            Err(e) if e.kind() == ErrorKind::WouldBlock => {
                thread::sleep(CONSOLE_IDLE);
                continue;
            }
            Err(e) => {
                log::warn!("Console read error: {}", e);
                thread::sleep(CONSOLE_IDLE);
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
                    if events.send(BoardEvent::Tool(call)).is_err() {
                        return;
                    }
                    match responses.recv() {
                        Ok(response) => response,
                        Err(_) => return,
                    }
                }
                None => comm::unknown_call(),
            };

            if let Some(len) = comm::serialize_response(&response, &mut out) {
                if let Err(e) = stdout.write_all(&out[..len]).and_then(|_| stdout.flush()) {
                    log::warn!("Console write error: {}", e);
                }
            }
        }
    }
}
