/// JSON messages for the board tool console.
///
/// Tool calls arrive as newline-delimited JSON (NDJSON) and every call is
/// answered with exactly one response line. Uses `heapless` types for
/// no_std/no-alloc operation.
use heapless::String;
use serde::{Deserialize, Serialize};

/// Tool names, as the assistant addresses them
pub mod tools {
    pub const BATTERY_GET_LEVEL: &str = "self.battery.get_level";
    pub const SCREEN_GET_BRIGHTNESS: &str = "self.screen.get_brightness";
    pub const SCREEN_SET_BRIGHTNESS: &str = "self.screen.set_brightness";
    pub const LIGHT_SET_RGB: &str = "self.light.set_rgb";
    pub const BOARD_GET_INFO: &str = "self.board.get_info";
}

/// Tool calls the board understands.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ToolCall {
    GetBatteryLevel,
    GetBrightness,
    /// Backlight brightness in percent (clamped to 100)
    SetBrightness { brightness: u8 },
    /// Status LED colour; the board shows the average brightness
    SetRgb { r: u8, g: u8, b: u8 },
    GetBoardInfo,
}

impl ToolCall {
    pub fn name(&self) -> &'static str {
        match self {
            Self::GetBatteryLevel => tools::BATTERY_GET_LEVEL,
            Self::GetBrightness => tools::SCREEN_GET_BRIGHTNESS,
            Self::SetBrightness { .. } => tools::SCREEN_SET_BRIGHTNESS,
            Self::SetRgb { .. } => tools::LIGHT_SET_RGB,
            Self::GetBoardInfo => tools::BOARD_GET_INFO,
        }
    }
}

/// Wire format for tool calls: flat structs that `serde_json_core` can
/// deserialize without `deserialize_any`. Converted to [`ToolCall`] in
/// `comm::parse_tool_call()`.
#[derive(Deserialize)]
pub(crate) struct RawToolCall {
    pub name: String<32>,
    #[serde(default)]
    pub arguments: Option<RawArguments>,
}

#[derive(Deserialize, Default)]
pub(crate) struct RawArguments {
    #[serde(default)]
    pub brightness: Option<u8>,
    #[serde(default)]
    pub r: Option<u8>,
    #[serde(default)]
    pub g: Option<u8>,
    #[serde(default)]
    pub b: Option<u8>,
}

/// Responses sent back on the console
#[derive(Debug, Serialize)]
#[serde(tag = "type")]
pub enum ToolResponse {
    #[serde(rename = "battery")]
    Battery {
        level: u8,
        charging: bool,
        discharging: bool,
    },
    #[serde(rename = "brightness")]
    Brightness { brightness: u8 },
    /// Call applied, nothing to report
    #[serde(rename = "ok")]
    Ok { tool: &'static str },
    #[serde(rename = "board")]
    BoardInfo {
        board: &'static str,
        version: &'static str,
    },
    #[serde(rename = "error")]
    Error {
        tool: &'static str,
        message: &'static str,
    },
}

/// Firmware version string
pub const VERSION: &str = env!("CARGO_PKG_VERSION");

/// Maximum size of a serialized JSON message or console line
pub const MAX_MSG_LEN: usize = 256;

#[cfg(test)]
mod tests {
    use super::*;

    fn to_json(msg: &ToolResponse) -> String<MAX_MSG_LEN> {
        let mut buf = [0u8; MAX_MSG_LEN];
        let len = serde_json_core::to_slice(msg, &mut buf).unwrap();
        String::try_from(core::str::from_utf8(&buf[..len]).unwrap()).unwrap()
    }

    #[test]
    fn tool_names_fit_wire_buffer() {
        for call in [
            ToolCall::GetBatteryLevel,
            ToolCall::GetBrightness,
            ToolCall::SetBrightness { brightness: 1 },
            ToolCall::SetRgb { r: 0, g: 0, b: 0 },
            ToolCall::GetBoardInfo,
        ] {
            assert!(call.name().len() <= 32, "{}", call.name());
        }
    }

    #[test]
    fn serialize_battery_response() {
        let json = to_json(&ToolResponse::Battery {
            level: 42,
            charging: false,
            discharging: true,
        });
        assert!(json.contains(r#""type":"battery""#));
        assert!(json.contains(r#""level":42"#));
        assert!(json.contains(r#""charging":false"#));
        assert!(json.contains(r#""discharging":true"#));
    }

    #[test]
    fn serialize_ok_response() {
        let json = to_json(&ToolResponse::Ok { tool: tools::LIGHT_SET_RGB });
        assert_eq!(json.as_str(), r#"{"type":"ok","tool":"self.light.set_rgb"}"#);
    }

    #[test]
    fn serialize_error_response() {
        let json = to_json(&ToolResponse::Error {
            tool: tools::BATTERY_GET_LEVEL,
            message: "battery sensing unavailable",
        });
        assert!(json.contains(r#""type":"error""#));
        assert!(json.contains(r#""message":"battery sensing unavailable""#));
    }

    #[test]
    fn serialize_board_info() {
        let json = to_json(&ToolResponse::BoardInfo {
            board: "test_board",
            version: VERSION,
        });
        assert!(json.contains(r#""type":"board""#));
        assert!(json.contains(r#""board":"test_board""#));
    }
}
