/// Battery sensing through a one-shot ADC channel.
///
/// The cell voltage is read raw (12-bit, 3.3 V reference) and mapped
/// linearly onto 0–100 % between [`EMPTY_VOLTS`] and [`FULL_VOLTS`].
/// The board has no charge-detect line, so every reading reports
/// "discharging".

/// ADC reference voltage
pub const ADC_REF_VOLTS: f32 = 3.3;

/// Full-scale raw reading at 12-bit resolution
pub const ADC_FULL_SCALE: u16 = 4095;

/// Voltage reported as 0 %
pub const EMPTY_VOLTS: f32 = 3.0;

/// Voltage reported as 100 %
pub const FULL_VOLTS: f32 = 4.2;

/// Source of raw battery ADC samples.
pub trait BatterySense {
    type Error: core::fmt::Debug;

    /// Take one raw reading (0..=4095).
    fn read_raw(&mut self) -> Result<u16, Self::Error>;
}

/// Snapshot of the battery state.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct BatteryStatus {
    /// Charge level in percent (0..=100)
    pub level: u8,
    pub charging: bool,
    pub discharging: bool,
}

#[derive(Debug, PartialEq)]
pub enum BatteryError<E> {
    /// No ADC channel was configured for battery sensing
    NotAvailable,
    /// The ADC read itself failed
    Read(E),
}

/// Convert a raw 12-bit sample to volts at the ADC pin.
pub fn raw_to_volts(raw: u16) -> f32 {
    raw as f32 * ADC_REF_VOLTS / ADC_FULL_SCALE as f32
}

/// Linear charge estimate, truncated toward zero and clamped to 0..=100.
pub fn level_from_volts(volts: f32) -> u8 {
    let level = ((volts - EMPTY_VOLTS) / (FULL_VOLTS - EMPTY_VOLTS) * 100.0) as i32;
    level.clamp(0, 100) as u8
}

/// Reads the battery channel on demand.
pub struct BatteryMonitor<S> {
    sense: Option<S>,
}

impl<S: BatterySense> BatteryMonitor<S> {
    pub fn new(sense: S) -> Self {
        Self { sense: Some(sense) }
    }

    /// Monitor for a build where the ADC could not be set up.
    pub fn absent() -> Self {
        Self { sense: None }
    }

    pub fn is_available(&self) -> bool {
        self.sense.is_some()
    }

    pub fn read(&mut self) -> Result<BatteryStatus, BatteryError<S::Error>> {
        let sense = self.sense.as_mut().ok_or(BatteryError::NotAvailable)?;
        let raw = sense.read_raw().map_err(BatteryError::Read)?;
        let volts = raw_to_volts(raw);
        let level = level_from_volts(volts);
        log::debug!("Battery raw={} ({} mV) -> {}%", raw, (volts * 1000.0) as u32, level);

        Ok(BatteryStatus {
            level,
            charging: false,
            discharging: true,
        })
    }
}
