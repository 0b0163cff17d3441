/// ST7789 LCD bring-up for the ES3C28P (240x320 portrait, SPI3).
///
/// The panel has no reset line wired, so the controller is reset over SPI
/// during `init`. Drawing goes straight to the panel (no framebuffer) via
/// the shared `screen` renderer.
use embedded_hal_bus::spi::{ExclusiveDevice, NoDelay};
use esp_hal::delay::Delay;
use esp_hal::gpio::{Level, Output, OutputConfig};
use esp_hal::spi::master::{Config as SpiConfig, ConfigError, Spi};
use esp_hal::spi::Mode;
use esp_hal::time::Rate;
use esp_hal::Blocking;
use mipidsi::interface::SpiInterface;
use mipidsi::models::ST7789;
use mipidsi::options::{ColorInversion, ColorOrder, Orientation};
use mipidsi::{Builder, NoResetPin};
use static_cell::StaticCell;

use crate::board;
use crate::bringup::FailureKind;

type LcdSpi = ExclusiveDevice<Spi<'static, Blocking>, Output<'static>, NoDelay>;

/// The panel handle handed out by `Board::display()`
pub type Lcd = mipidsi::Display<SpiInterface<'static, LcdSpi, Output<'static>>, ST7789, NoResetPin>;

/// mipidsi pixel staging buffer
static LCD_BUFFER: StaticCell<[u8; 512]> = StaticCell::new();

/// Configure the SPI bus: 16 MHz, mode 0, write-only.
pub fn open_spi(
    spi3: esp_hal::peripherals::SPI3<'static>,
    sck: esp_hal::peripherals::GPIO12<'static>,
    mosi: esp_hal::peripherals::GPIO11<'static>,
) -> Result<Spi<'static, Blocking>, ConfigError> {
    let spi_config = SpiConfig::default()
        .with_frequency(Rate::from_mhz(board::DISPLAY_SPI_FREQ_MHZ))
        .with_mode(Mode::_0);
    Ok(Spi::new(spi3, spi_config)?.with_sck(sck).with_mosi(mosi))
}

/// Attach the panel to the bus and run the controller init sequence.
///
/// `init` leaves sleep mode and switches the panel on; colors are
/// inverted and the Y axis mirrored to match the glass.
pub fn init_panel(
    spi: Spi<'static, Blocking>,
    cs_pin: esp_hal::peripherals::GPIO10<'static>,
    dc_pin: esp_hal::peripherals::GPIO46<'static>,
    delay: &mut Delay,
) -> Result<Lcd, FailureKind> {
    let cs = Output::new(cs_pin, Level::High, OutputConfig::default());
    let dc = Output::new(dc_pin, Level::Low, OutputConfig::default());
    let spi_device = match ExclusiveDevice::new_no_delay(spi, cs) {
        Ok(device) => device,
        Err(never) => match never {},
    };

    let buffer = LCD_BUFFER.init([0u8; 512]);
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
        .init(delay)
        .map_err(|e| {
            log::error!("Panel init failed: {:?}", e);
            FailureKind::Panel
        })?;

    delay.delay_millis(board::DISPLAY_ON_DELAY_MS);
    log::info!(
        "Display initialized ({}x{} portrait)",
        board::DISPLAY_WIDTH,
        board::DISPLAY_HEIGHT
    );
    Ok(display)
}
