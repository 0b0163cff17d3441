/// Console transport for board tool calls.
///
/// Tool calls arrive as NDJSON over the serial console (USB-Serial-JTAG
/// on the bare-metal firmware, stdin on ESP-IDF). Each line is parsed
/// into a [`ToolCall`], applied to the [`Board`], and answered with one
/// [`ToolResponse`] line.
use crate::platform::{Backlight, Board};
use crate::protocol::{tools, RawToolCall, ToolCall, ToolResponse, MAX_MSG_LEN, VERSION};

// ── Serialization helpers ──────────────────────────────────────────────

/// Serialize a ToolResponse as one NDJSON line into the output buffer.
/// Returns the line length including `\n`, or None if it does not fit.
pub fn serialize_response(msg: &ToolResponse, buf: &mut [u8]) -> Option<usize> {
    let len = serde_json_core::to_slice(msg, buf).ok()?;
    // The newline needs one more byte
    let newline = buf.get_mut(len)?;
    *newline = b'\n';
    Some(len + 1)
}

/// Deserialize a ToolCall from a JSON byte slice.
///
/// Unknown tools and calls with missing arguments yield `None`.
pub fn parse_tool_call(data: &[u8]) -> Option<ToolCall> {
    let trimmed = trim_trailing_whitespace(data);
    if trimmed.is_empty() {
        return None;
    }
    let (raw, _) = serde_json_core::from_slice::<RawToolCall>(trimmed).ok()?;
    let args = raw.arguments.unwrap_or_default();

    match raw.name.as_str() {
        tools::BATTERY_GET_LEVEL => Some(ToolCall::GetBatteryLevel),
        tools::SCREEN_GET_BRIGHTNESS => Some(ToolCall::GetBrightness),
        tools::SCREEN_SET_BRIGHTNESS => Some(ToolCall::SetBrightness {
            brightness: args.brightness?,
        }),
        tools::LIGHT_SET_RGB => Some(ToolCall::SetRgb {
            r: args.r?,
            g: args.g?,
            b: args.b?,
        }),
        tools::BOARD_GET_INFO => Some(ToolCall::GetBoardInfo),
        _ => None,
    }
}

/// Apply a tool call to the board and build its response.
pub fn handle_tool_call<B: Board>(call: ToolCall, board: &mut B) -> ToolResponse {
    match call {
        ToolCall::GetBatteryLevel => match board.battery_level() {
            Some(status) => ToolResponse::Battery {
                level: status.level,
                charging: status.charging,
                discharging: status.discharging,
            },
            None => ToolResponse::Error {
                tool: call.name(),
                message: "battery sensing unavailable",
            },
        },
        ToolCall::GetBrightness => ToolResponse::Brightness {
            brightness: board.backlight().brightness(),
        },
        ToolCall::SetBrightness { brightness } => {
            board.backlight().set_brightness(brightness);
            log::info!("Brightness set to {}% by tool call", brightness.min(100));
            ToolResponse::Ok { tool: call.name() }
        }
        ToolCall::SetRgb { r, g, b } => {
            board.set_rgb_led_color(r, g, b);
            log::info!("Status LED set to ({}, {}, {}) by tool call", r, g, b);
            ToolResponse::Ok { tool: call.name() }
        }
        ToolCall::GetBoardInfo => ToolResponse::BoardInfo {
            board: board.name(),
            version: VERSION,
        },
    }
}

/// Error response for a line that did not parse as a known tool call.
pub fn unknown_call() -> ToolResponse {
    ToolResponse::Error {
        tool: "unknown",
        message: "unknown tool or bad arguments",
    }
}

// ── Console NDJSON reader ──────────────────────────────────────────────

/// Console NDJSON reader state machine.
/// Accumulates bytes until a newline is found, then yields the line.
pub struct LineReader {
    buf: [u8; MAX_MSG_LEN],
    pos: usize,
    overflowed: bool,
}

impl LineReader {
    pub const fn new() -> Self {
        Self {
            buf: [0; MAX_MSG_LEN],
            pos: 0,
            overflowed: false,
        }
    }

    /// Feed a byte into the reader. Returns a complete line (without newline)
    /// when one is detected.
    pub fn feed(&mut self, byte: u8) -> Option<&[u8]> {
        if byte == b'\n' || byte == b'\r' {
            let overflowed = core::mem::replace(&mut self.overflowed, false);
            let len = core::mem::replace(&mut self.pos, 0);
            if len > 0 && !overflowed {
                Some(&self.buf[..len])
            } else {
                None
            }
        } else if self.overflowed {
            None
        } else if self.pos < self.buf.len() {
            self.buf[self.pos] = byte;
            self.pos += 1;
            None
        } else {
            // Overflow: drop the rest of this line
            self.overflowed = true;
            self.pos = 0;
            None
        }
    }
}

impl Default for LineReader {
    fn default() -> Self {
        Self::new()
    }
}

fn trim_trailing_whitespace(data: &[u8]) -> &[u8] {
    let mut end = data.len();
    while end > 0 && matches!(data[end - 1], b' ' | b'\n' | b'\r' | b'\t') {
        end -= 1;
    }
    &data[..end]
}
