//! Mock accessory property store.

use crate::{PairedController, Result, traits::AccessoryStore};
use homekey_core::LockState;
use std::sync::{Arc, Mutex, MutexGuard};

/// Recorded write to the lock state pair.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StateWrite {
    Current(LockState),
    Target(LockState),
}

#[derive(Debug)]
struct AccessoryState {
    current: LockState,
    target: LockState,
    controllers: Vec<PairedController>,
    pairing_codes: Vec<String>,
    battery_level: Option<u8>,
    low_battery: bool,
    writes: Vec<StateWrite>,
}

fn lock(state: &Mutex<AccessoryState>) -> MutexGuard<'_, AccessoryState> {
    state.lock().unwrap_or_else(|e| e.into_inner())
}

/// In-memory accessory store.
///
/// Starts LOCKED/LOCKED with no controllers and no battery service, like a
/// freshly booted accessory.
///
/// # Examples
///
/// ```
/// use homekey_core::LockState;
/// use homekey_hardware::mock::MockAccessory;
/// use homekey_hardware::traits::AccessoryStore;
///
/// let (store, handle) = MockAccessory::new();
/// store.set_current_state(LockState::Unlocked);
/// assert_eq!(handle.current_state(), LockState::Unlocked);
/// assert_eq!(store.paired_controllers(), 0);
/// ```
#[derive(Debug)]
pub struct MockAccessory {
    state: Arc<Mutex<AccessoryState>>,
}

impl MockAccessory {
    pub fn new() -> (Self, MockAccessoryHandle) {
        Self::with_state(LockState::Locked)
    }

    /// Start with both current and target set to `state`.
    pub fn with_state(state: LockState) -> (Self, MockAccessoryHandle) {
        let shared = Arc::new(Mutex::new(AccessoryState {
            current: state,
            target: state,
            controllers: Vec::new(),
            pairing_codes: Vec::new(),
            battery_level: None,
            low_battery: false,
            writes: Vec::new(),
        }));
        (
            Self {
                state: Arc::clone(&shared),
            },
            MockAccessoryHandle { state: shared },
        )
    }
}

impl AccessoryStore for MockAccessory {
    fn current_state(&self) -> LockState {
        lock(&self.state).current
    }

    fn set_current_state(&self, state: LockState) {
        let mut s = lock(&self.state);
        s.current = state;
        s.writes.push(StateWrite::Current(state));
    }

    fn target_state(&self) -> LockState {
        lock(&self.state).target
    }

    fn set_target_state(&self, state: LockState) {
        let mut s = lock(&self.state);
        s.target = state;
        s.writes.push(StateWrite::Target(state));
    }

    fn controllers(&self) -> Vec<PairedController> {
        lock(&self.state).controllers.clone()
    }

    fn set_pairing_code(&self, code: &str) -> Result<()> {
        lock(&self.state).pairing_codes.push(code.to_string());
        Ok(())
    }

    fn battery_level(&self) -> Option<u8> {
        lock(&self.state).battery_level
    }

    fn set_battery_level(&self, level: u8) {
        lock(&self.state).battery_level = Some(level);
    }

    fn low_battery(&self) -> bool {
        lock(&self.state).low_battery
    }

    fn set_low_battery(&self, low: bool) {
        lock(&self.state).low_battery = low;
    }
}

/// Inspection and stimulus handle for [`MockAccessory`].
#[derive(Debug, Clone)]
pub struct MockAccessoryHandle {
    state: Arc<Mutex<AccessoryState>>,
}

impl MockAccessoryHandle {
    pub fn current_state(&self) -> LockState {
        lock(&self.state).current
    }

    pub fn target_state(&self) -> LockState {
        lock(&self.state).target
    }

    /// Simulate a remote controller writing the target state.
    pub fn write_target(&self, state: LockState) {
        lock(&self.state).target = state;
    }

    /// Overwrite both states without recording a write.
    pub fn set_states(&self, current: LockState, target: LockState) {
        let mut s = lock(&self.state);
        s.current = current;
        s.target = target;
    }

    pub fn add_controller(&self, controller: PairedController) {
        lock(&self.state).controllers.push(controller);
    }

    pub fn clear_controllers(&self) {
        lock(&self.state).controllers.clear();
    }

    /// Pairing codes programmed so far, in order.
    pub fn pairing_codes(&self) -> Vec<String> {
        lock(&self.state).pairing_codes.clone()
    }

    pub fn set_battery_level(&self, level: u8) {
        lock(&self.state).battery_level = Some(level);
    }

    pub fn low_battery(&self) -> bool {
        lock(&self.state).low_battery
    }

    /// State pair writes so far, in order.
    pub fn writes(&self) -> Vec<StateWrite> {
        lock(&self.state).writes.clone()
    }

    pub fn clear_writes(&self) {
        lock(&self.state).writes.clear();
    }
}
