/// Boot button handling.
///
/// The button on GPIO0 doubles as the strap pin, so it is only read after
/// boot. A click toggles the conversation, except while the device is
/// still starting, where it enters Wi-Fi provisioning instead.

/// Edges closer together than this are treated as contact bounce
pub const DEBOUNCE_MS: u64 = 20;

/// Presses held at least this long are long presses, not clicks
pub const LONG_PRESS_MS: u64 = 1000;

/// Clicks inside this window after boot enter Wi-Fi provisioning
pub const STARTUP_WINDOW_MS: u64 = 3000;

/// Device states as published by the application.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[repr(u8)]
pub enum DeviceState {
    Unknown = 0,
    Starting,
    WifiConfiguring,
    Idle,
    Connecting,
    Listening,
    Speaking,
    Upgrading,
    Activating,
    AudioTesting,
    FatalError,
}

impl DeviceState {
    pub fn from_u8(value: u8) -> Self {
        match value {
            1 => Self::Starting,
            2 => Self::WifiConfiguring,
            3 => Self::Idle,
            4 => Self::Connecting,
            5 => Self::Listening,
            6 => Self::Speaking,
            7 => Self::Upgrading,
            8 => Self::Activating,
            9 => Self::AudioTesting,
            10 => Self::FatalError,
            _ => Self::Unknown,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Unknown => "unknown",
            Self::Starting => "starting",
            Self::WifiConfiguring => "wifi_configuring",
            Self::Idle => "idle",
            Self::Connecting => "connecting",
            Self::Listening => "listening",
            Self::Speaking => "speaking",
            Self::Upgrading => "upgrading",
            Self::Activating => "activating",
            Self::AudioTesting => "audio_testing",
            Self::FatalError => "fatal_error",
        }
    }
}

/// What the application should do in response to a boot-button click.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BootAction {
    EnterWifiConfig,
    ToggleChat,
}

pub fn boot_click_action(state: DeviceState) -> BootAction {
    match state {
        DeviceState::Starting => BootAction::EnterWifiConfig,
        _ => BootAction::ToggleChat,
    }
}

/// State the device moves to once `action` is applied in `state`.
///
/// Without a voice pipeline, toggling the chat only flips between
/// listening and idle.
pub fn state_after(action: BootAction, state: DeviceState) -> DeviceState {
    match (action, state) {
        (BootAction::EnterWifiConfig, _) => DeviceState::WifiConfiguring,
        (BootAction::ToggleChat, DeviceState::Listening | DeviceState::Speaking) => DeviceState::Idle,
        (BootAction::ToggleChat, _) => DeviceState::Listening,
    }
}

/// The startup period after boot, closed once by the board loop.
pub struct StartupWindow {
    ends_at: Option<u64>,
}

impl StartupWindow {
    pub const fn new(boot_ms: u64) -> Self {
        Self {
            ends_at: Some(boot_ms + STARTUP_WINDOW_MS),
        }
    }

    pub fn is_open(&self) -> bool {
        self.ends_at.is_some()
    }

    /// Returns `true` exactly once, on the first poll at or after the end.
    pub fn expire(&mut self, now_ms: u64) -> bool {
        match self.ends_at {
            Some(end) if now_ms >= end => {
                self.ends_at = None;
                true
            }
            _ => false,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ButtonEvent {
    Click,
    LongPress,
}

/// Debounced click/long-press detector fed with sampled button levels.
pub struct ClickDetector {
    pressed: bool,
    pressed_at: u64,
    last_edge: Option<u64>,
    long_fired: bool,
}

impl ClickDetector {
    pub const fn new() -> Self {
        Self {
            pressed: false,
            pressed_at: 0,
            last_edge: None,
            long_fired: false,
        }
    }

    /// Feed the current level (`true` = pressed) sampled at `now_ms`.
    pub fn update(&mut self, pressed: bool, now_ms: u64) -> Option<ButtonEvent> {
        if pressed == self.pressed {
            if pressed && !self.long_fired && now_ms.saturating_sub(self.pressed_at) >= LONG_PRESS_MS {
                self.long_fired = true;
                return Some(ButtonEvent::LongPress);
            }
            return None;
        }

        if let Some(edge) = self.last_edge {
            if now_ms.saturating_sub(edge) < DEBOUNCE_MS {
                return None;
            }
        }
        self.last_edge = Some(now_ms);
        self.pressed = pressed;

        if pressed {
            self.pressed_at = now_ms;
            self.long_fired = false;
            None
        } else if self.long_fired || now_ms.saturating_sub(self.pressed_at) >= LONG_PRESS_MS {
            None
        } else {
            Some(ButtonEvent::Click)
        }
    }
}

impl Default for ClickDetector {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn click_while_starting_enters_wifi_config() {
        assert_eq!(boot_click_action(DeviceState::Starting), BootAction::EnterWifiConfig);
    }

    #[test]
    fn click_otherwise_toggles_chat() {
        for state in [
            DeviceState::Unknown,
            DeviceState::Idle,
            DeviceState::Listening,
            DeviceState::Speaking,
            DeviceState::WifiConfiguring,
        ] {
            assert_eq!(boot_click_action(state), BootAction::ToggleChat);
        }
    }

    #[test]
    fn startup_click_applies_before_window_closes() {
        let mut window = StartupWindow::new(0);
        let state = state_after(boot_click_action(DeviceState::Starting), DeviceState::Starting);
        assert_eq!(state, DeviceState::WifiConfiguring);
        assert!(!window.expire(1500));
        assert!(window.is_open());
        assert!(window.expire(3000));
        assert!(!window.is_open());
        assert!(!window.expire(6000));
    }

    #[test]
    fn toggle_chat_flips_listening_and_idle() {
        assert_eq!(state_after(BootAction::ToggleChat, DeviceState::Idle), DeviceState::Listening);
        assert_eq!(state_after(BootAction::ToggleChat, DeviceState::Listening), DeviceState::Idle);
        assert_eq!(state_after(BootAction::ToggleChat, DeviceState::Speaking), DeviceState::Idle);
        assert_eq!(
            state_after(BootAction::EnterWifiConfig, DeviceState::Idle),
            DeviceState::WifiConfiguring
        );
    }

    #[test]
    fn state_round_trips_through_u8() {
        for value in 0..=10u8 {
            assert_eq!(DeviceState::from_u8(value) as u8, value);
        }
        assert_eq!(DeviceState::from_u8(200), DeviceState::Unknown);
    }

    #[test]
    fn short_press_is_click() {
        let mut d = ClickDetector::new();
        assert_eq!(d.update(true, 100), None);
        assert_eq!(d.update(true, 150), None);
        assert_eq!(d.update(false, 250), Some(ButtonEvent::Click));
        assert_eq!(d.update(false, 300), None);
    }

    #[test]
    fn bounce_is_ignored() {
        let mut d = ClickDetector::new();
        assert_eq!(d.update(true, 100), None);
        // chatter right after the press edge
        assert_eq!(d.update(false, 105), None);
        assert_eq!(d.update(true, 110), None);
        assert_eq!(d.update(false, 400), Some(ButtonEvent::Click));
    }

    #[test]
    fn long_press_fires_once_and_suppresses_click() {
        let mut d = ClickDetector::new();
        d.update(true, 0);
        assert_eq!(d.update(true, 500), None);
        assert_eq!(d.update(true, 1000), Some(ButtonEvent::LongPress));
        assert_eq!(d.update(true, 1500), None);
        assert_eq!(d.update(false, 1600), None);
    }

    #[test]
    fn unsampled_long_hold_is_not_click() {
        let mut d = ClickDetector::new();
        assert_eq!(d.update(true, 0), None);
        assert_eq!(d.update(false, 1500), None);
        // the next short press still clicks
        assert_eq!(d.update(true, 2000), None);
        assert_eq!(d.update(false, 2100), Some(ButtonEvent::Click));
    }

    #[test]
    fn click_after_long_press() {
        let mut d = ClickDetector::new();
        d.update(true, 0);
        d.update(true, 1200);
        d.update(false, 1300);
        d.update(true, 2000);
        assert_eq!(d.update(false, 2100), Some(ButtonEvent::Click));
    }
}
