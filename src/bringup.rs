/// Ordered board bring-up.
///
/// Peripherals come up in a fixed order; later steps depend on earlier
/// ones (touch shares the codec I2C bus, the display needs the SPI bus).
/// Firmware walks the steps through a [`Bringup`] tracker, which refuses
/// to run a step out of order and turns failures into a fatal error value.
use core::fmt;

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub enum InitStep {
    I2cBus,
    SpiBus,
    Display,
    Touch,
    Buttons,
    Battery,
    StatusLed,
}

impl InitStep {
    pub const ALL: [InitStep; 7] = [
        InitStep::I2cBus,
        InitStep::SpiBus,
        InitStep::Display,
        InitStep::Touch,
        InitStep::Buttons,
        InitStep::Battery,
        InitStep::StatusLed,
    ];

    pub fn name(&self) -> &'static str {
        match self {
            Self::I2cBus => "I2C bus",
            Self::SpiBus => "SPI bus",
            Self::Display => "display panel",
            Self::Touch => "touch controller",
            Self::Buttons => "buttons",
            Self::Battery => "battery ADC",
            Self::StatusLed => "status LED PWM",
        }
    }

    fn index(&self) -> usize {
        *self as usize
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FailureKind {
    Bus,
    Panel,
    Touch,
    Adc,
    Pwm,
    Gpio,
    Codec,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BringupError {
    OutOfOrder { expected: Option<InitStep>, got: InitStep },
    Failed { step: InitStep, kind: FailureKind },
}

impl fmt::Display for BringupError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::OutOfOrder { expected: Some(expected), got } => {
                write!(f, "{} started before {}", got.name(), expected.name())
            }
            Self::OutOfOrder { expected: None, got } => {
                write!(f, "{} started after bring-up finished", got.name())
            }
            Self::Failed { step, kind } => write!(f, "{} init failed ({:?})", step.name(), kind),
        }
    }
}

impl core::error::Error for BringupError {}

/// Tracks progress through [`InitStep::ALL`].
pub struct Bringup {
    next: usize,
}

impl Bringup {
    pub const fn new() -> Self {
        Self { next: 0 }
    }

    /// The step that must run next, or `None` once every step is done.
    pub fn expected(&self) -> Option<InitStep> {
        InitStep::ALL.get(self.next).copied()
    }

    pub fn begin(&self, step: InitStep) -> Result<(), BringupError> {
        self.check_order(step)?;
        log::debug!("Initializing {}", step.name());
        Ok(())
    }

    pub fn complete(&mut self, step: InitStep) -> Result<(), BringupError> {
        self.check_order(step)?;
        self.next = step.index() + 1;
        log::info!("{} ready", step.name());
        Ok(())
    }

    fn check_order(&self, step: InitStep) -> Result<(), BringupError> {
        match self.expected() {
            Some(expected) if expected == step => Ok(()),
            expected => Err(BringupError::OutOfOrder { expected, got: step }),
        }
    }

    pub fn fail(&self, step: InitStep, kind: FailureKind) -> BringupError {
        let err = BringupError::Failed { step, kind };
        log::error!("{}", err);
        err
    }

    pub fn is_complete(&self) -> bool {
        self.next == InitStep::ALL.len()
    }
}

impl Default for Bringup {
    fn default() -> Self {
        Self::new()
    }
}
