//! Mock contactless reader bus.
//!
//! The mock keeps a queue of card presentations and failure counters so
//! tests can script link loss, recovery and garbled frames. Passive detection
//! with no card in the field sleeps for the requested timeout, so tests
//! should run with a paused tokio clock.

use crate::{FirmwareVersion, HardwareError, PassiveTarget, Result, traits::NfcBus};
use std::collections::VecDeque;
use std::sync::{Arc, Mutex, MutexGuard};
use std::time::Duration;

/// Firmware word reported by a healthy PN532 (IC 0x32, v1.6).
pub const PN532_FIRMWARE: u32 = 0x3201_0607;

/// A card brought into the field.
#[derive(Debug, Clone)]
pub struct Presentation {
    pub target: PassiveTarget,
    /// Response to any APDU while this card is selected.
    pub select_response: Vec<u8>,
    /// Number of detections before the card leaves the field.
    pub dwell_reads: u32,
}

impl Presentation {
    /// A digital key answering the select with `90 00`, detected once.
    pub fn homekey(uid: impl Into<Vec<u8>>) -> Self {
        Self {
            target: PassiveTarget::new(uid, [0x00, 0x04], 0x20),
            select_response: vec![0x5A, 0x01, 0x90, 0x00],
            dwell_reads: 1,
        }
    }

    /// A plain tag that rejects the select.
    pub fn foreign_tag(uid: impl Into<Vec<u8>>) -> Self {
        Self {
            target: PassiveTarget::new(uid, [0x00, 0x44], 0x00),
            select_response: vec![0x6A, 0x82],
            dwell_reads: 1,
        }
    }

    /// Keep the card in the field for `reads` detections.
    pub fn dwell(mut self, reads: u32) -> Self {
        self.dwell_reads = reads.max(1);
        self
    }
}

/// Counters exposed by [`MockNfcBusHandle::stats`].
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct NfcBusStats {
    pub begin_calls: u32,
    pub probe_calls: u32,
    pub probe_failures: u32,
    pub sam_configs: u32,
    pub write_calls: u32,
    pub write_failures: u32,
    pub detections: u32,
    pub garbled_reads: u32,
    pub releases: u32,
    pub stops: u32,
    pub frames: Vec<Vec<u8>>,
    pub apdus: Vec<Vec<u8>>,
    pub rf_fields: Vec<(u8, u8)>,
    pub passive_retries: Vec<u8>,
}

#[derive(Debug)]
struct NfcState {
    online: bool,
    failing_probes: u32,
    failing_writes: u32,
    garbled_reads: u32,
    firmware: u32,
    cards: VecDeque<Presentation>,
    /// Set when a card leaves; the next detection reports an empty field.
    gap: bool,
    /// Select response of the card reported by the last detection.
    selected: Option<Vec<u8>>,
    stats: NfcBusStats,
}

fn lock(state: &Mutex<NfcState>) -> MutexGuard<'_, NfcState> {
    state.lock().unwrap_or_else(|e| e.into_inner())
}

/// Mock PN532-style reader bus.
///
/// # Examples
///
/// ```
/// use homekey_hardware::mock::{MockNfcBus, Presentation};
/// use homekey_hardware::traits::NfcBus;
/// use std::time::Duration;
///
/// #[tokio::main(flavor = "current_thread", start_paused = true)]
/// async fn main() -> homekey_hardware::Result<()> {
///     let (mut bus, handle) = MockNfcBus::new();
///     handle.present(Presentation::homekey(vec![0x01, 0x02, 0x03, 0x04]));
///
///     let target = bus.read_passive_target(Duration::from_millis(500)).await?;
///     assert_eq!(target.unwrap().uid, vec![0x01, 0x02, 0x03, 0x04]);
///     Ok(())
/// }
/// ```
#[derive(Debug)]
pub struct MockNfcBus {
    state: Arc<Mutex<NfcState>>,
}

impl MockNfcBus {
    /// Create an online bus with no card in the field.
    pub fn new() -> (Self, MockNfcBusHandle) {
        let state = Arc::new(Mutex::new(NfcState {
            online: true,
            failing_probes: 0,
            failing_writes: 0,
            garbled_reads: 0,
            firmware: PN532_FIRMWARE,
            cards: VecDeque::new(),
            gap: false,
            selected: None,
            stats: NfcBusStats::default(),
        }));
        (
            Self {
                state: Arc::clone(&state),
            },
            MockNfcBusHandle { state },
        )
    }

    fn ensure_online(state: &NfcState, operation: &str) -> Result<()> {
        if state.online {
            Ok(())
        } else {
            Err(HardwareError::communication(format!(
                "{} failed: no answer from reader",
                operation
            )))
        }
    }
}

impl NfcBus for MockNfcBus {
    async fn begin(&mut self) -> Result<()> {
        let mut state = lock(&self.state);
        state.stats.begin_calls += 1;
        state.selected = None;
        Ok(())
    }

    async fn firmware_version(&mut self) -> Result<FirmwareVersion> {
        let mut state = lock(&self.state);
        state.stats.probe_calls += 1;
        if !state.online || state.failing_probes > 0 {
            state.failing_probes = state.failing_probes.saturating_sub(1);
            state.stats.probe_failures += 1;
            return Err(HardwareError::initialization_failed(
                "no firmware version reported",
            ));
        }
        FirmwareVersion::from_word(state.firmware)
            .ok_or_else(|| HardwareError::initialization_failed("firmware word is zero"))
    }

    async fn sam_config(&mut self) -> Result<()> {
        let mut state = lock(&self.state);
        Self::ensure_online(&state, "SAMConfig")?;
        state.stats.sam_configs += 1;
        Ok(())
    }

    async fn set_rf_field(&mut self, cfg_item: u8, value: u8) -> Result<()> {
        let mut state = lock(&self.state);
        Self::ensure_online(&state, "RFConfiguration")?;
        state.stats.rf_fields.push((cfg_item, value));
        Ok(())
    }

    async fn set_passive_activation_retries(&mut self, retries: u8) -> Result<()> {
        let mut state = lock(&self.state);
        Self::ensure_online(&state, "RFConfiguration")?;
        state.stats.passive_retries.push(retries);
        Ok(())
    }

    async fn write_register(&mut self, _register: u16, _value: u8) -> Result<()> {
        let mut state = lock(&self.state);
        state.stats.write_calls += 1;
        if !state.online || state.failing_writes > 0 {
            state.failing_writes = state.failing_writes.saturating_sub(1);
            state.stats.write_failures += 1;
            return Err(HardwareError::communication("WriteRegister not acknowledged"));
        }
        Ok(())
    }

    async fn communicate_thru(&mut self, frame: &[u8], _timeout: Duration) -> Result<Vec<u8>> {
        let mut state = lock(&self.state);
        Self::ensure_online(&state, "InCommunicateThru")?;
        state.stats.frames.push(frame.to_vec());
        Ok(Vec::new())
    }

    async fn read_passive_target(&mut self, timeout: Duration) -> Result<Option<PassiveTarget>> {
        {
            let mut state = lock(&self.state);
            Self::ensure_online(&state, "InListPassiveTarget")?;
            if state.garbled_reads > 0 {
                state.garbled_reads -= 1;
                state.stats.garbled_reads += 1;
                return Err(HardwareError::invalid_data(
                    "InListPassiveTarget frame checksum mismatch",
                ));
            }
            if state.gap {
                state.gap = false;
            } else if let Some(front) = state.cards.front_mut() {
                front.dwell_reads = front.dwell_reads.saturating_sub(1);
                let target = front.target.clone();
                let response = front.select_response.clone();
                if front.dwell_reads == 0 {
                    state.cards.pop_front();
                    state.gap = true;
                }
                state.selected = Some(response);
                state.stats.detections += 1;
                return Ok(Some(target));
            }
        }
        tokio::time::sleep(timeout).await;
        Ok(None)
    }

    async fn data_exchange(&mut self, apdu: &[u8]) -> Result<Vec<u8>> {
        let mut state = lock(&self.state);
        Self::ensure_online(&state, "InDataExchange")?;
        state.stats.apdus.push(apdu.to_vec());
        state
            .selected
            .clone()
            .ok_or_else(|| HardwareError::communication("no target selected"))
    }

    async fn release(&mut self) -> Result<()> {
        let mut state = lock(&self.state);
        state.stats.releases += 1;
        state.selected = None;
        Ok(())
    }

    async fn stop(&mut self) {
        let mut state = lock(&self.state);
        state.stats.stops += 1;
        state.selected = None;
    }
}

/// Control handle for [`MockNfcBus`].
#[derive(Debug, Clone)]
pub struct MockNfcBusHandle {
    state: Arc<Mutex<NfcState>>,
}

impl MockNfcBusHandle {
    /// Queue a card presentation.
    pub fn present(&self, presentation: Presentation) {
        lock(&self.state).cards.push_back(presentation);
    }

    /// Take the reader off the bus (every probe and write fails) or back on.
    pub fn set_online(&self, online: bool) {
        lock(&self.state).online = online;
    }

    /// Fail the next `count` register writes.
    pub fn fail_next_writes(&self, count: u32) {
        lock(&self.state).failing_writes = count;
    }

    /// Fail the next `count` firmware probes.
    pub fn fail_next_probes(&self, count: u32) {
        lock(&self.state).failing_probes = count;
    }

    /// Answer the next `count` passive detections with a corrupt frame.
    /// The link itself stays up.
    pub fn garble_next_reads(&self, count: u32) {
        lock(&self.state).garbled_reads = count;
    }

    /// Cards still waiting to be detected.
    pub fn pending_cards(&self) -> usize {
        lock(&self.state).cards.len()
    }

    pub fn stats(&self) -> NfcBusStats {
        lock(&self.state).stats.clone()
    }
}
