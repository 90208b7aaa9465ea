//! Mock pin controller with an ESP32-like capability map.

use crate::{HardwareError, Result, traits::Gpio};
use homekey_core::{Level, PinDirection};
use std::collections::HashMap;
use std::sync::{Arc, Mutex, MutexGuard};

/// Pins 34..=39 on the ESP32 are input-only.
const INPUT_ONLY: std::ops::RangeInclusive<u8> = 34..=39;

/// Whether `pin` exists on a classic ESP32.
fn is_valid_pin(pin: u8) -> bool {
    matches!(pin, 0..=19 | 21..=23 | 25..=27 | 32..=39)
}

/// One recorded pin write.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PinWrite {
    pub pin: u8,
    pub level: Level,
}

#[derive(Debug, Default)]
struct GpioState {
    modes: HashMap<u8, PinDirection>,
    outputs: HashMap<u8, Level>,
    inputs: HashMap<u8, Level>,
    writes: Vec<PinWrite>,
    resets: Vec<u8>,
}

fn lock(state: &Mutex<GpioState>) -> MutexGuard<'_, GpioState> {
    state.lock().unwrap_or_else(|e| e.into_inner())
}

/// Mock pin controller.
///
/// # Examples
///
/// ```
/// use homekey_core::{Level, PinDirection};
/// use homekey_hardware::mock::MockGpio;
/// use homekey_hardware::traits::Gpio;
///
/// let (gpio, handle) = MockGpio::new();
/// assert!(gpio.supports(4, PinDirection::Output));
/// assert!(!gpio.supports(34, PinDirection::Output));
///
/// gpio.write(4, Level::High).unwrap();
/// assert_eq!(handle.level(4), Some(Level::High));
/// ```
#[derive(Debug)]
pub struct MockGpio {
    state: Arc<Mutex<GpioState>>,
}

impl MockGpio {
    /// Create a new mock and its inspection handle.
    pub fn new() -> (Self, MockGpioHandle) {
        let state = Arc::new(Mutex::new(GpioState::default()));
        (
            Self {
                state: Arc::clone(&state),
            },
            MockGpioHandle { state },
        )
    }
}

impl Gpio for MockGpio {
    fn supports(&self, pin: u8, direction: PinDirection) -> bool {
        match direction {
            PinDirection::Input => is_valid_pin(pin),
            PinDirection::Output => is_valid_pin(pin) && !INPUT_ONLY.contains(&pin),
        }
    }

    fn set_mode(&self, pin: u8, direction: PinDirection) -> Result<()> {
        if !self.supports(pin, direction) {
            return Err(HardwareError::unsupported_pin(pin, direction));
        }
        lock(&self.state).modes.insert(pin, direction);
        Ok(())
    }

    fn write(&self, pin: u8, level: Level) -> Result<()> {
        if !self.supports(pin, PinDirection::Output) {
            return Err(HardwareError::unsupported_pin(pin, PinDirection::Output));
        }
        let mut state = lock(&self.state);
        state.outputs.insert(pin, level);
        state.writes.push(PinWrite { pin, level });
        Ok(())
    }

    fn read(&self, pin: u8) -> Result<Level> {
        if !self.supports(pin, PinDirection::Input) {
            return Err(HardwareError::unsupported_pin(pin, PinDirection::Input));
        }
        Ok(lock(&self.state)
            .inputs
            .get(&pin)
            .copied()
            .unwrap_or(Level::Low))
    }

    fn reset(&self, pin: u8) -> Result<()> {
        let mut state = lock(&self.state);
        state.modes.remove(&pin);
        state.outputs.remove(&pin);
        state.resets.push(pin);
        Ok(())
    }
}

/// Inspection and stimulus handle for [`MockGpio`].
#[derive(Debug, Clone)]
pub struct MockGpioHandle {
    state: Arc<Mutex<GpioState>>,
}

impl MockGpioHandle {
    /// Drive an input pin from the outside.
    pub fn set_input(&self, pin: u8, level: Level) {
        lock(&self.state).inputs.insert(pin, level);
    }

    /// Last level written to `pin`.
    pub fn level(&self, pin: u8) -> Option<Level> {
        lock(&self.state).outputs.get(&pin).copied()
    }

    /// Programmed mode of `pin`.
    pub fn mode(&self, pin: u8) -> Option<PinDirection> {
        lock(&self.state).modes.get(&pin).copied()
    }

    /// Every write so far, in order.
    pub fn writes(&self) -> Vec<PinWrite> {
        lock(&self.state).writes.clone()
    }

    /// Levels written to `pin`, in order.
    pub fn writes_to(&self, pin: u8) -> Vec<Level> {
        lock(&self.state)
            .writes
            .iter()
            .filter(|w| w.pin == pin)
            .map(|w| w.level)
            .collect()
    }

    /// Pins that were reset, in order.
    pub fn resets(&self) -> Vec<u8> {
        lock(&self.state).resets.clone()
    }

    pub fn clear_writes(&self) {
        lock(&self.state).writes.clear();
    }
}
