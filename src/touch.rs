/// FocalTech FT6x36 capacitive touch controller over I2C.
///
/// The controller reports up to two contacts. Each read fetches the status
/// register plus both point records in one transaction, then maps raw
/// panel coordinates into display space (swap, mirror, clamp) the same
/// way for every board.
use embedded_hal::delay::DelayNs;
use embedded_hal::digital::OutputPin;
use embedded_hal::i2c::I2c;
use heapless::Vec;

pub const DEFAULT_ADDR: u8 = 0x38;

/// Register map
pub mod reg {
    pub const TD_STATUS: u8 = 0x02;
    pub const P1_XH: u8 = 0x03;
    pub const P2_XH: u8 = 0x09;
    pub const TH_GROUP: u8 = 0x80;
    pub const CHIP_ID: u8 = 0xA3;
    pub const VENDOR_ID: u8 = 0xA8;
}

/// FocalTech panel vendor id
pub const FOCALTECH_VENDOR_ID: u8 = 0x11;

pub const MAX_POINTS: usize = 2;
const POINT_LEN: usize = 6;
const READ_LEN: usize = 1 + MAX_POINTS * POINT_LEN;

const RESET_LOW_MS: u32 = 10;
const RESET_SETTLE_MS: u32 = 300;

#[derive(Debug, PartialEq)]
pub enum TouchError<E> {
    I2c(E),
    /// Vendor register did not read back as FocalTech
    UnknownVendor(u8),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TouchEvent {
    PressDown,
    LiftUp,
    Contact,
    None,
}

impl TouchEvent {
    fn from_bits(bits: u8) -> Self {
        match bits & 0x03 {
            0 => Self::PressDown,
            1 => Self::LiftUp,
            2 => Self::Contact,
            _ => Self::None,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TouchPoint {
    pub x: u16,
    pub y: u16,
    pub id: u8,
    pub event: TouchEvent,
    pub weight: u8,
}

pub type Touches = Vec<TouchPoint, MAX_POINTS>;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TouchConfig {
    pub x_max: u16,
    pub y_max: u16,
    pub swap_xy: bool,
    pub mirror_x: bool,
    pub mirror_y: bool,
}

#[cfg(feature = "board-es3c28p")]
impl TouchConfig {
    pub const fn board() -> Self {
        use crate::board;
        Self {
            x_max: board::DISPLAY_WIDTH,
            y_max: board::DISPLAY_HEIGHT,
            swap_xy: board::TOUCH_SWAP_XY,
            mirror_x: board::TOUCH_MIRROR_X,
            mirror_y: board::TOUCH_MIRROR_Y,
        }
    }
}

impl TouchConfig {
    /// Map a raw controller coordinate into display space.
    pub fn transform(&self, x: u16, y: u16) -> (u16, u16) {
        let (mut x, mut y) = if self.swap_xy { (y, x) } else { (x, y) };
        let x_last = self.x_max.saturating_sub(1);
        let y_last = self.y_max.saturating_sub(1);
        x = x.min(x_last);
        y = y.min(y_last);
        if self.mirror_x {
            x = x_last - x;
        }
        if self.mirror_y {
            y = y_last - y;
        }
        (x, y)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ChipInfo {
    pub vendor: u8,
    pub chip: u8,
}

impl ChipInfo {
    pub fn model(&self) -> &'static str {
        match self.chip {
            0x06 => "FT6206",
            0x36 => "FT6236",
            0x64 => "FT6336U",
            _ => "FT6x36",
        }
    }
}

pub struct Ft6x36<I2C> {
    i2c: I2C,
    address: u8,
    config: TouchConfig,
}

/// Pulse the active-low reset line and wait for the controller to boot.
pub fn hard_reset<P: OutputPin, D: DelayNs>(rst: &mut P, delay: &mut D) -> Result<(), P::Error> {
    rst.set_low()?;
    delay.delay_ms(RESET_LOW_MS);
    rst.set_high()?;
    delay.delay_ms(RESET_SETTLE_MS);
    Ok(())
}

impl<I2C: I2c> Ft6x36<I2C> {
    pub fn new(i2c: I2C, address: u8, config: TouchConfig) -> Self {
        Self { i2c, address, config }
    }

    pub fn config(&self) -> &TouchConfig {
        &self.config
    }

    /// Read and check the vendor/chip identification registers.
    pub fn probe(&mut self) -> Result<ChipInfo, TouchError<I2C::Error>> {
        let vendor = self.read_reg(reg::VENDOR_ID)?;
        if vendor != FOCALTECH_VENDOR_ID {
            return Err(TouchError::UnknownVendor(vendor));
        }
        let chip = self.read_reg(reg::CHIP_ID)?;
        Ok(ChipInfo { vendor, chip })
    }

    pub fn set_threshold(&mut self, threshold: u8) -> Result<(), TouchError<I2C::Error>> {
        self.i2c
            .write(self.address, &[reg::TH_GROUP, threshold])
            .map_err(TouchError::I2c)
    }

    /// Current contacts, already transformed into display coordinates.
    pub fn read_touches(&mut self) -> Result<Touches, TouchError<I2C::Error>> {
        let mut buf = [0u8; READ_LEN];
        self.i2c
            .write_read(self.address, &[reg::TD_STATUS], &mut buf)
            .map_err(TouchError::I2c)?;
        Ok(self.decode(&buf))
    }

    fn decode(&self, buf: &[u8; READ_LEN]) -> Touches {
        let mut touches = Touches::new();
        let count = (buf[0] & 0x0F) as usize;
        // Counts above two show up while the controller is still settling
        if count > MAX_POINTS {
            return touches;
        }
        for record in buf[1..].chunks_exact(POINT_LEN).take(count) {
            let raw_x = (((record[0] & 0x0F) as u16) << 8) | record[1] as u16;
            let raw_y = (((record[2] & 0x0F) as u16) << 8) | record[3] as u16;
            let (x, y) = self.config.transform(raw_x, raw_y);
            let _ = touches.push(TouchPoint {
                x,
                y,
                id: record[2] >> 4,
                event: TouchEvent::from_bits(record[0] >> 6),
                weight: record[4],
            });
        }
        touches
    }

    fn read_reg(&mut self, reg: u8) -> Result<u8, TouchError<I2C::Error>> {
        let mut value = [0u8];
        self.i2c
            .write_read(self.address, &[reg], &mut value)
            .map_err(TouchError::I2c)?;
        Ok(value[0])
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use embedded_hal::i2c::{ErrorKind, ErrorType, Operation, SevenBitAddress};

    /// Register-file I2C mock: a write sets the pointer, reads stream from it.
    struct MockBus {
        regs: [u8; 256],
        fail: bool,
        last_addr: u8,
    }

    impl MockBus {
        fn new() -> Self {
            let mut regs = [0u8; 256];
            regs[reg::VENDOR_ID as usize] = FOCALTECH_VENDOR_ID;
            regs[reg::CHIP_ID as usize] = 0x64;
            Self { regs, fail: false, last_addr: 0 }
        }

        fn set_point(&mut self, slot: usize, event: u8, x: u16, id: u8, y: u16, weight: u8) {
            let base = (reg::P1_XH as usize) + slot * POINT_LEN;
            self.regs[base] = (event << 6) | ((x >> 8) as u8 & 0x0F);
            self.regs[base + 1] = x as u8;
            self.regs[base + 2] = (id << 4) | ((y >> 8) as u8 & 0x0F);
            self.regs[base + 3] = y as u8;
            self.regs[base + 4] = weight;
        }
    }

    impl ErrorType for MockBus {
        type Error = ErrorKind;
    }

    impl I2c<SevenBitAddress> for MockBus {
        fn transaction(
            &mut self,
            address: u8,
            operations: &mut [Operation<'_>],
        ) -> Result<(), ErrorKind> {
            if self.fail {
                return Err(ErrorKind::Other);
            }
            self.last_addr = address;
            let mut ptr = 0usize;
            for op in operations {
                match op {
                    Operation::Write(bytes) => {
                        ptr = bytes[0] as usize;
                        for (i, b) in bytes[1..].iter().enumerate() {
                            self.regs[ptr + i] = *b;
                        }
                    }
                    Operation::Read(buf) => {
                        for b in buf.iter_mut() {
                            *b = self.regs[ptr];
                            ptr += 1;
                        }
                    }
                }
            }
            Ok(())
        }
    }

    const PLAIN: TouchConfig = TouchConfig {
        x_max: 240,
        y_max: 320,
        swap_xy: false,
        mirror_x: false,
        mirror_y: false,
    };

    #[test]
    fn probe_reports_chip() {
        let mut touch = Ft6x36::new(MockBus::new(), DEFAULT_ADDR, PLAIN);
        let info = touch.probe().unwrap();
        assert_eq!(info.vendor, FOCALTECH_VENDOR_ID);
        assert_eq!(info.model(), "FT6336U");
        assert_eq!(touch.i2c.last_addr, DEFAULT_ADDR);
    }

    #[test]
    fn probe_rejects_unknown_vendor() {
        let mut bus = MockBus::new();
        bus.regs[reg::VENDOR_ID as usize] = 0x42;
        let mut touch = Ft6x36::new(bus, DEFAULT_ADDR, PLAIN);
        assert_eq!(touch.probe(), Err(TouchError::UnknownVendor(0x42)));
    }

    #[test]
    fn no_touches() {
        let mut touch = Ft6x36::new(MockBus::new(), DEFAULT_ADDR, PLAIN);
        assert!(touch.read_touches().unwrap().is_empty());
    }

    #[test]
    fn decodes_single_point() {
        let mut bus = MockBus::new();
        bus.regs[reg::TD_STATUS as usize] = 1;
        bus.set_point(0, 2, 0x0AB, 0, 0x12C, 30);
        let mut touch = Ft6x36::new(bus, DEFAULT_ADDR, PLAIN);

        let touches = touch.read_touches().unwrap();
        assert_eq!(touches.len(), 1);
        let p = touches[0];
        assert_eq!((p.x, p.y), (0x0AB, 0x12C));
        assert_eq!(p.event, TouchEvent::Contact);
        assert_eq!(p.weight, 30);
    }

    #[test]
    fn decodes_two_points() {
        let mut bus = MockBus::new();
        bus.regs[reg::TD_STATUS as usize] = 2;
        bus.set_point(0, 0, 10, 0, 20, 1);
        bus.set_point(1, 1, 200, 1, 300, 2);
        let mut touch = Ft6x36::new(bus, DEFAULT_ADDR, PLAIN);

        let touches = touch.read_touches().unwrap();
        assert_eq!(touches.len(), 2);
        assert_eq!(touches[0].event, TouchEvent::PressDown);
        assert_eq!((touches[1].x, touches[1].y, touches[1].id), (200, 300, 1));
        assert_eq!(touches[1].event, TouchEvent::LiftUp);
    }

    #[test]
    fn ignores_invalid_count() {
        let mut bus = MockBus::new();
        bus.regs[reg::TD_STATUS as usize] = 0x0F;
        let mut touch = Ft6x36::new(bus, DEFAULT_ADDR, PLAIN);
        assert!(touch.read_touches().unwrap().is_empty());
    }

    #[test]
    fn bus_error_is_reported() {
        let mut bus = MockBus::new();
        bus.fail = true;
        let mut touch = Ft6x36::new(bus, DEFAULT_ADDR, PLAIN);
        assert_eq!(touch.read_touches(), Err(TouchError::I2c(ErrorKind::Other)));
    }

    #[test]
    fn threshold_write() {
        let mut touch = Ft6x36::new(MockBus::new(), DEFAULT_ADDR, PLAIN);
        touch.set_threshold(40).unwrap();
        assert_eq!(touch.i2c.regs[reg::TH_GROUP as usize], 40);
    }

    #[test]
    fn transform_clamps_to_panel() {
        assert_eq!(PLAIN.transform(500, 500), (239, 319));
    }

    #[cfg(feature = "board-es3c28p")]
    #[test]
    fn board_config_is_portrait_panel() {
        assert_eq!(TouchConfig::board(), PLAIN);
    }

    #[test]
    fn transform_swap_and_mirror() {
        let cfg = TouchConfig {
            swap_xy: true,
            mirror_x: true,
            mirror_y: false,
            ..PLAIN
        };
        // swapped: (50, 10), then x mirrored across 0..=239
        assert_eq!(cfg.transform(10, 50), (189, 10));

        let cfg = TouchConfig { mirror_y: true, ..PLAIN };
        assert_eq!(cfg.transform(0, 0), (0, 319));
    }

    struct MockPin {
        high: bool,
        transitions: u8,
    }

    impl embedded_hal::digital::ErrorType for MockPin {
        type Error = core::convert::Infallible;
    }

    impl OutputPin for MockPin {
        fn set_low(&mut self) -> Result<(), Self::Error> {
            self.high = false;
            self.transitions += 1;
            Ok(())
        }

        fn set_high(&mut self) -> Result<(), Self::Error> {
            self.high = true;
            self.transitions += 1;
            Ok(())
        }
    }

    struct MockDelay {
        total_ns: u64,
    }

    impl DelayNs for MockDelay {
        fn delay_ns(&mut self, ns: u32) {
            self.total_ns += ns as u64;
        }
    }

    #[test]
    fn reset_pulses_low_then_high() {
        let mut rst = MockPin { high: true, transitions: 0 };
        let mut delay = MockDelay { total_ns: 0 };
        hard_reset(&mut rst, &mut delay).unwrap();
        assert!(rst.high);
        assert_eq!(rst.transitions, 2);
        assert!(delay.total_ns >= (RESET_LOW_MS + RESET_SETTLE_MS) as u64 * 1_000_000);
    }
}
