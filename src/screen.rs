/// Status screen renderer for the 240x320 portrait LCD.
///
/// Draws straight to any `DrawTarget` (no framebuffer: a full 16-bit
/// frame is 150 KB). Rows are padded to the full line width so a redraw
/// overwrites the previous text without clearing the screen.
use core::fmt::Write;

use embedded_graphics::mono_font::ascii::FONT_6X10;
use embedded_graphics::mono_font::{MonoTextStyle, MonoTextStyleBuilder};
use embedded_graphics::pixelcolor::Rgb565;
use embedded_graphics::prelude::*;
use embedded_graphics::primitives::{PrimitiveStyle, Rectangle};
use embedded_graphics::text::Text;

use crate::button::DeviceState;
use crate::protocol::VERSION;

// ── Display geometry ─────────────────────────────────────────────────

const W: i32 = 240;
const ROW_H: i32 = 14;
const LINE_W: usize = (W / 6) as usize;

// ── Color palette ────────────────────────────────────────────────────

const BG: Rgb565 = Rgb565::BLACK;
const HEADER_BG: Rgb565 = Rgb565::new(2, 4, 12);
const FG: Rgb565 = Rgb565::WHITE;
const ACCENT: Rgb565 = Rgb565::new(0, 50, 0);
const DIM: Rgb565 = Rgb565::new(12, 24, 12);

/// Values shown on the status screen.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct StatusView {
    pub state: DeviceState,
    pub battery: Option<u8>,
    pub brightness: u8,
    pub led: (u8, u8, u8),
    pub touch: Option<(u16, u16)>,
    pub uptime_secs: u32,
}

struct Screen<'a, D> {
    display: &'a mut D,
    y: i32,
    buf: heapless::String<48>,
}

impl<'a, D: DrawTarget<Color = Rgb565>> Screen<'a, D> {
    fn new(display: &'a mut D) -> Self {
        Self {
            display,
            y: 0,
            buf: heapless::String::new(),
        }
    }

    fn clear(&mut self) {
        let _ = self.display.clear(BG);
        self.y = 0;
    }

    fn skip(&mut self, pixels: i32) {
        self.y += pixels;
    }

    fn row(&mut self, color: Rgb565, args: core::fmt::Arguments<'_>) {
        self.buf.clear();
        let _ = self.buf.write_fmt(args);
        self.pad();
        self.emit(color, BG, 0);
        self.y += ROW_H;
    }

    fn centered(&mut self, color: Rgb565, args: core::fmt::Arguments<'_>) {
        self.buf.clear();
        let _ = self.buf.write_fmt(args);
        let x = (W - self.buf.len() as i32 * 6) / 2;
        self.emit(color, BG, x);
        self.y += ROW_H;
    }

    fn header(&mut self, title_args: core::fmt::Arguments<'_>, indicator: &str, indicator_color: Rgb565) {
        let _ = Rectangle::new(Point::new(0, self.y), Size::new(W as u32, ROW_H as u32))
            .into_styled(PrimitiveStyle::with_fill(HEADER_BG))
            .draw(self.display);

        self.buf.clear();
        let _ = self.buf.write_fmt(title_args);
        self.emit(FG, HEADER_BG, 0);

        let x = W - indicator.len() as i32 * 6 - 2;
        let _ = Text::new(
            indicator,
            Point::new(x, self.y + 10),
            Self::text_style(indicator_color, HEADER_BG),
        )
        .draw(self.display);
        self.y += ROW_H;
    }

    fn divider(&mut self) {
        let _ = Rectangle::new(Point::new(0, self.y), Size::new(W as u32, 1))
            .into_styled(PrimitiveStyle::with_fill(DIM))
            .draw(self.display);
        self.y += 3;
    }

    fn pad(&mut self) {
        while self.buf.len() < LINE_W {
            let _ = self.buf.push(' ');
        }
    }

    fn emit(&mut self, fg: Rgb565, bg: Rgb565, x: i32) {
        let _ = Text::new(&self.buf, Point::new(x, self.y + 10), Self::text_style(fg, bg)).draw(self.display);
    }

    fn text_style(fg: Rgb565, bg: Rgb565) -> MonoTextStyle<'static, Rgb565> {
        MonoTextStyleBuilder::new()
            .font(&FONT_6X10)
            .text_color(fg)
            .background_color(bg)
            .build()
    }
}

macro_rules! row {
    ($s:expr, $color:expr, $($arg:tt)*) => {
        $s.row($color, format_args!($($arg)*))
    };
}

macro_rules! centered {
    ($s:expr, $color:expr, $($arg:tt)*) => {
        $s.centered($color, format_args!($($arg)*))
    };
}

pub fn draw_splash(display: &mut impl DrawTarget<Color = Rgb565>, board_name: &str) {
    let mut s = Screen::new(display);
    s.clear();
    s.skip(130);
    centered!(s, FG, "{}", board_name);
    centered!(s, ACCENT, "v{}", VERSION);
    s.skip(12);
    centered!(s, DIM, "Voice Assistant");
}

/// Clear the screen ahead of the first status redraw.
pub fn prepare_status(display: &mut impl DrawTarget<Color = Rgb565>) {
    Screen::new(display).clear();
}

pub fn draw_status(display: &mut impl DrawTarget<Color = Rgb565>, view: &StatusView) {
    let mut s = Screen::new(display);

    let (indicator, indicator_color) = match view.state {
        DeviceState::Listening | DeviceState::Speaking => ("[LIVE]", Rgb565::GREEN),
        DeviceState::FatalError => ("[FAIL]", Rgb565::RED),
        DeviceState::WifiConfiguring => ("[WIFI]", Rgb565::YELLOW),
        _ => ("[IDLE]", DIM),
    };
    s.header(format_args!(" ES3C28P v{}", VERSION), indicator, indicator_color);

    row!(s, FG, " State: {}", view.state.as_str());
    match view.battery {
        Some(level) => row!(s, FG, " Battery: {}%", level),
        None => row!(s, DIM, " Battery: ---"),
    }

    s.divider();

    row!(s, DIM, " Backlight: {}%", view.brightness);
    let (r, g, b) = view.led;
    row!(s, DIM, " LED: {} {} {}", r, g, b);
    match view.touch {
        Some((x, y)) => row!(s, Rgb565::GREEN, " Touch: {},{}", x, y),
        None => row!(s, DIM, " Touch: ---"),
    }

    let up = view.uptime_secs;
    row!(s, DIM, " Up: {:02}:{:02}:{:02}", up / 3600, (up % 3600) / 60, up % 60);
}

#[cfg(test)]
mod tests {
    use super::*;
    use embedded_graphics::mock_display::MockDisplay;

    fn mock() -> MockDisplay<Rgb565> {
        let mut display = MockDisplay::new();
        display.set_allow_out_of_bounds_drawing(true);
        display.set_allow_overdraw(true);
        display
    }

    #[test]
    fn status_draws_header() {
        let mut display = mock();
        let view = StatusView {
            state: DeviceState::Idle,
            battery: Some(77),
            brightness: 100,
            led: (0, 0, 0),
            touch: None,
            uptime_secs: 3725,
        };
        draw_status(&mut display, &view);
        // Header band is filled from the top-left corner
        assert_eq!(display.get_pixel(Point::new(0, 0)), Some(HEADER_BG));
    }

    #[test]
    fn splash_clears_screen() {
        let mut display = mock();
        draw_splash(&mut display, "shenzhen-es3c28p");
        assert_eq!(display.get_pixel(Point::new(0, 0)), Some(BG));
    }

    #[test]
    fn padded_row_fills_line() {
        let mut display = mock();
        let mut s = Screen::new(&mut display);
        row!(s, FG, " x");
        assert_eq!(s.buf.len(), LINE_W);
        assert_eq!(s.y, ROW_H);
    }
}
