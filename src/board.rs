/// Pin assignments and tuning constants for supported boards.
///
/// Each board module defines its wiring and capabilities, selected at
/// compile time via feature flags.

#[cfg(feature = "board-es3c28p")]
mod hw {
    // ── Buses ───────────────────────────────────────────────────────────
    pub const I2C_PORT: u8 = 0;
    pub const I2C_GLITCH_FILTER_CYCLES: u8 = 7;
    pub const I2C_INTERNAL_PULLUP: bool = true;
    /// SPI host driving the LCD (SPI3 / VSPI)
    pub const LCD_SPI_HOST: u8 = 3;

    // ── Audio (ES8311 over I2S + I2C) ───────────────────────────────────
    pub const AUDIO_INPUT_SAMPLE_RATE: u32 = 24_000;
    pub const AUDIO_OUTPUT_SAMPLE_RATE: u32 = 24_000;
    pub const AUDIO_INPUT_REFERENCE: bool = true;
    pub const AUDIO_I2S_MCLK_PIN: u8 = 4;
    pub const AUDIO_I2S_WS_PIN: u8 = 7;
    pub const AUDIO_I2S_BCLK_PIN: u8 = 5;
    pub const AUDIO_I2S_DIN_PIN: u8 = 6;
    pub const AUDIO_I2S_DOUT_PIN: u8 = 8;
    pub const AUDIO_CODEC_PA_PIN: u8 = 1;
    pub const AUDIO_CODEC_PA_INVERTED: bool = true; // active-low amplifier
    pub const AUDIO_CODEC_USE_MCLK: bool = true;
    pub const AUDIO_CODEC_I2C_SDA_PIN: u8 = 16;
    pub const AUDIO_CODEC_I2C_SCL_PIN: u8 = 15;
    /// 7-bit address (0x30 in the 8-bit write form)
    pub const AUDIO_CODEC_ES8311_ADDR: u8 = 0x18;

    pub const BOOT_BUTTON_PIN: u8 = 0;

    // ── Display (ILI9341V panel driven with the ST7789 command set) ─────
    pub const DISPLAY_SPI_SCK_PIN: u8 = 12;
    pub const DISPLAY_SPI_MOSI_PIN: u8 = 11;
    pub const DISPLAY_SPI_CS_PIN: u8 = 10;
    pub const DISPLAY_DC_PIN: u8 = 46;
    /// RST is left unconnected to avoid clashing with the boot button.
    pub const DISPLAY_RST_PIN: Option<u8> = None;
    pub const DISPLAY_WIDTH: u16 = 240;
    pub const DISPLAY_HEIGHT: u16 = 320;
    pub const DISPLAY_MIRROR_X: bool = false;
    pub const DISPLAY_MIRROR_Y: bool = true;
    pub const DISPLAY_SWAP_XY: bool = false;
    pub const DISPLAY_OFFSET_X: u16 = 0;
    pub const DISPLAY_OFFSET_Y: u16 = 0;
    pub const DISPLAY_INVERT_COLORS: bool = true;
    pub const DISPLAY_COLOR_BGR: bool = true;
    pub const DISPLAY_SPI_FREQ_MHZ: u32 = 16;
    pub const DISPLAY_SPI_MODE: u8 = 0;
    pub const DISPLAY_SPI_QUEUE_DEPTH: usize = 10;
    pub const DISPLAY_MAX_TRANSFER: usize =
        DISPLAY_WIDTH as usize * DISPLAY_HEIGHT as usize * core::mem::size_of::<u16>();
    pub const DISPLAY_ON_DELAY_MS: u32 = 50;

    pub const DISPLAY_BACKLIGHT_PIN: u8 = 45;
    pub const DISPLAY_BACKLIGHT_OUTPUT_INVERT: bool = false;
    pub const BACKLIGHT_PWM_FREQ_HZ: u32 = 25_000;
    pub const BACKLIGHT_PWM_BITS: u8 = 10;

    // ── Touch (FT6x36 on the codec I2C bus) ─────────────────────────────
    pub const TOUCH_I2C_SDA_PIN: u8 = 16;
    pub const TOUCH_I2C_SCL_PIN: u8 = 15;
    pub const TOUCH_I2C_ADDR: u8 = 0x38;
    pub const TOUCH_I2C_FREQ_KHZ: u32 = 400;
    pub const TOUCH_RST_PIN: u8 = 18;
    pub const TOUCH_INT_PIN: u8 = 17;
    pub const TOUCH_SWAP_XY: bool = false;
    pub const TOUCH_MIRROR_X: bool = false;
    pub const TOUCH_MIRROR_Y: bool = false;

    // ── SD card (SDMMC, 4-bit) ──────────────────────────────────────────
    pub const SD_MMC_CMD_PIN: u8 = 40;
    pub const SD_MMC_CLK_PIN: u8 = 38;
    pub const SD_MMC_D0_PIN: u8 = 39;
    pub const SD_MMC_D1_PIN: u8 = 41;
    pub const SD_MMC_D2_PIN: u8 = 48;
    pub const SD_MMC_D3_PIN: u8 = 47;

    // ── Battery sense ───────────────────────────────────────────────────
    pub const BATTERY_ADC_PIN: u8 = 9; // ADC1 channel 8 on ESP32-S3

    // ── Status LED ──────────────────────────────────────────────────────
    pub const RGB_LED_PIN: u8 = 42;
    pub const LED_PWM_FREQ_HZ: u32 = 5_000;
    pub const LED_PWM_BITS: u8 = 13;

    pub const BOARD_NAME: &str = "shenzhen-es3c28p";
}

#[cfg(not(feature = "board-es3c28p"))]
mod hw {
    pub const BOARD_NAME: &str = "unknown";
}

pub use hw::*;

#[cfg(all(test, feature = "board-es3c28p"))]
mod tests {
    use super::*;

    #[test]
    fn touch_shares_codec_bus() {
        assert_eq!(TOUCH_I2C_SDA_PIN, AUDIO_CODEC_I2C_SDA_PIN);
        assert_eq!(TOUCH_I2C_SCL_PIN, AUDIO_CODEC_I2C_SCL_PIN);
        assert_ne!(TOUCH_I2C_ADDR, AUDIO_CODEC_ES8311_ADDR);
    }

    #[test]
    fn max_transfer_covers_full_frame() {
        assert_eq!(DISPLAY_MAX_TRANSFER, 240 * 320 * 2);
    }

    #[test]
    fn panel_has_no_reset_line() {
        assert!(DISPLAY_RST_PIN.is_none());
        assert_ne!(BOOT_BUTTON_PIN, TOUCH_RST_PIN);
    }
}
