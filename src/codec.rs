/// ES8311 audio codec handle.
///
/// Covers what the board owns: the codec's control address on the shared
/// I2C bus, the external power amplifier enable line, and the I2S wiring
/// the audio pipeline needs. Register programming for playback and
/// capture belongs to the audio pipeline.
use embedded_hal::digital::OutputPin;
use embedded_hal::i2c::I2c;

/// Chip id registers and their expected contents
pub const REG_CHIP_ID1: u8 = 0xFD;
pub const REG_CHIP_ID2: u8 = 0xFE;
pub const CHIP_ID1: u8 = 0x83;
pub const CHIP_ID2: u8 = 0x11;

/// I2S pin assignment
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct I2sPins {
    pub mclk: u8,
    pub bclk: u8,
    pub ws: u8,
    pub dout: u8,
    pub din: u8,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CodecConfig {
    pub input_sample_rate: u32,
    pub output_sample_rate: u32,
    pub i2s: I2sPins,
    pub pa_pin: u8,
    pub address: u8,
    pub use_mclk: bool,
    /// PA enable line is active low
    pub pa_inverted: bool,
    /// Feed playback back into the capture path as an AEC reference
    pub input_reference: bool,
}

#[cfg(feature = "board-es3c28p")]
impl CodecConfig {
    pub const fn board() -> Self {
        use crate::board;
        Self {
            input_sample_rate: board::AUDIO_INPUT_SAMPLE_RATE,
            output_sample_rate: board::AUDIO_OUTPUT_SAMPLE_RATE,
            i2s: I2sPins {
                mclk: board::AUDIO_I2S_MCLK_PIN,
                bclk: board::AUDIO_I2S_BCLK_PIN,
                ws: board::AUDIO_I2S_WS_PIN,
                dout: board::AUDIO_I2S_DOUT_PIN,
                din: board::AUDIO_I2S_DIN_PIN,
            },
            pa_pin: board::AUDIO_CODEC_PA_PIN,
            address: board::AUDIO_CODEC_ES8311_ADDR,
            use_mclk: board::AUDIO_CODEC_USE_MCLK,
            pa_inverted: board::AUDIO_CODEC_PA_INVERTED,
            input_reference: board::AUDIO_INPUT_REFERENCE,
        }
    }
}

#[derive(Debug, PartialEq)]
pub enum CodecError<E, P> {
    I2c(E),
    Pin(P),
    /// Chip id registers did not match an ES8311
    WrongChip(u8, u8),
}

/// Speaker amplifier enable line.
pub struct PowerAmp<P> {
    pin: P,
    inverted: bool,
    enabled: bool,
}

impl<P: OutputPin> PowerAmp<P> {
    /// Take the pin and drive the amplifier off.
    pub fn new(pin: P, inverted: bool) -> Result<Self, P::Error> {
        let mut pa = Self {
            pin,
            inverted,
            enabled: true,
        };
        pa.set(false)?;
        Ok(pa)
    }

    pub fn set(&mut self, enabled: bool) -> Result<(), P::Error> {
        if enabled != self.inverted {
            self.pin.set_high()?;
        } else {
            self.pin.set_low()?;
        }
        self.enabled = enabled;
        Ok(())
    }

    pub fn is_enabled(&self) -> bool {
        self.enabled
    }
}

pub struct Es8311<I2C, PA> {
    i2c: I2C,
    pa: PowerAmp<PA>,
    config: CodecConfig,
}

impl<I2C: I2c, PA: OutputPin> Es8311<I2C, PA> {
    pub fn new(i2c: I2C, pa_pin: PA, config: CodecConfig) -> Result<Self, CodecError<I2C::Error, PA::Error>> {
        let pa = PowerAmp::new(pa_pin, config.pa_inverted).map_err(CodecError::Pin)?;
        Ok(Self { i2c, pa, config })
    }

    pub fn config(&self) -> &CodecConfig {
        &self.config
    }

    /// Confirm the codec answers at its address with the ES8311 chip id.
    pub fn probe(&mut self) -> Result<(), CodecError<I2C::Error, PA::Error>> {
        let id1 = self.read_reg(REG_CHIP_ID1)?;
        let id2 = self.read_reg(REG_CHIP_ID2)?;
        if (id1, id2) != (CHIP_ID1, CHIP_ID2) {
            return Err(CodecError::WrongChip(id1, id2));
        }
        Ok(())
    }

    pub fn enable_output(&mut self, enable: bool) -> Result<(), CodecError<I2C::Error, PA::Error>> {
        self.pa.set(enable).map_err(CodecError::Pin)?;
        log::info!("Speaker amplifier {}", if enable { "on" } else { "off" });
        Ok(())
    }

    pub fn output_enabled(&self) -> bool {
        self.pa.is_enabled()
    }

    fn read_reg(&mut self, reg: u8) -> Result<u8, CodecError<I2C::Error, PA::Error>> {
        let mut value = [0u8];
        self.i2c
            .write_read(self.config.address, &[reg], &mut value)
            .map_err(CodecError::I2c)?;
        Ok(value[0])
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use core::convert::Infallible;
    use embedded_hal::i2c::{ErrorKind, ErrorType, Operation};

    struct MockPin {
        high: bool,
    }

    impl embedded_hal::digital::ErrorType for MockPin {
        type Error = Infallible;
    }

    impl OutputPin for MockPin {
        fn set_low(&mut self) -> Result<(), Infallible> {
            self.high = false;
            Ok(())
        }

        fn set_high(&mut self) -> Result<(), Infallible> {
            self.high = true;
            Ok(())
        }
    }

    struct MockBus {
        id: (u8, u8),
    }

    impl ErrorType for MockBus {
        type Error = ErrorKind;
    }

    impl I2c for MockBus {
        fn transaction(&mut self, _address: u8, operations: &mut [Operation<'_>]) -> Result<(), ErrorKind> {
            let mut reg = 0u8;
            for op in operations {
                match op {
                    Operation::Write(bytes) => reg = bytes[0],
                    Operation::Read(buf) => {
                        buf[0] = match reg {
                            REG_CHIP_ID1 => self.id.0,
                            REG_CHIP_ID2 => self.id.1,
                            _ => 0,
                        }
                    }
                }
            }
            Ok(())
        }
    }

    fn config(pa_inverted: bool) -> CodecConfig {
        CodecConfig {
            input_sample_rate: 24_000,
            output_sample_rate: 24_000,
            i2s: I2sPins { mclk: 4, bclk: 5, ws: 7, dout: 8, din: 6 },
            pa_pin: 1,
            address: 0x18,
            use_mclk: true,
            pa_inverted,
            input_reference: true,
        }
    }

    #[test]
    fn inverted_amp_starts_off_high() {
        let pa = PowerAmp::new(MockPin { high: false }, true).unwrap();
        assert!(pa.pin.high);
        assert!(!pa.is_enabled());
    }

    #[test]
    fn inverted_amp_enables_low() {
        let mut pa = PowerAmp::new(MockPin { high: false }, true).unwrap();
        pa.set(true).unwrap();
        assert!(!pa.pin.high);
        assert!(pa.is_enabled());
    }

    #[test]
    fn plain_amp_enables_high() {
        let mut pa = PowerAmp::new(MockPin { high: true }, false).unwrap();
        assert!(!pa.pin.high);
        pa.set(true).unwrap();
        assert!(pa.pin.high);
    }

    #[test]
    fn probe_accepts_es8311() {
        let mut codec = Es8311::new(MockBus { id: (0x83, 0x11) }, MockPin { high: false }, config(true)).unwrap();
        assert!(codec.probe().is_ok());
    }

    #[test]
    fn probe_rejects_other_chip() {
        let mut codec = Es8311::new(MockBus { id: (0x00, 0x00) }, MockPin { high: false }, config(true)).unwrap();
        assert_eq!(codec.probe(), Err(CodecError::WrongChip(0, 0)));
    }

    #[test]
    fn output_toggle() {
        let mut codec = Es8311::new(MockBus { id: (0x83, 0x11) }, MockPin { high: false }, config(true)).unwrap();
        assert!(!codec.output_enabled());
        codec.enable_output(true).unwrap();
        assert!(codec.output_enabled());
        assert!(!codec.pa.pin.high);
    }

    #[cfg(feature = "board-es3c28p")]
    #[test]
    fn board_config_matches_wiring() {
        let cfg = CodecConfig::board();
        assert_eq!(cfg, config(true));
    }
}
