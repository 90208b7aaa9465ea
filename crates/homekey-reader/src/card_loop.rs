//! Card presence and authentication loop.
//!
//! One long-lived task owns the reader bus. Every cycle re-arms the chip,
//! sends the presence broadcast and waits for a card. A digital key is
//! selected and handed to the [`Authenticator`]; the outcome fans out to the
//! actuation queues and to event subscribers. Any link failure hands the bus
//! to a single reconnect worker and suspends the loop until the bus comes
//! back.

use crate::auth::{AnyAuthenticator, AuthOutcome, Authenticator, KeyFlow};
use crate::events::ReaderEvent;
use crate::reconnect::{configure, reconnect};
use crate::settings::ReaderSettings;
use homekey_actuation::{Dispatch, TaskTermination};
use homekey_core::constants::{ACTIVE_PASSIVE_RETRIES, READER_CONTROL_REGISTER, is_pin_assigned};
use homekey_core::{
    ConfigReader, Configuration, FeedbackEvent, LockState, TriggerEvent, TriggerSource,
};
use homekey_hardware::{AccessoryStore, AnyNfcBus, NfcBus, PassiveTarget};
use homekey_protocol::{EcpFrame, SELECT_HOMEKEY_APPLET, is_success};
use homekey_storage::SharedReaderData;
use std::fmt;
use std::sync::Arc;
use std::sync::atomic::{AtomicU64, Ordering};
use tokio::sync::{broadcast, oneshot, watch};
use tokio::task::JoinHandle;
use tokio::time::{Instant, sleep};
use tracing::{debug, error, info, trace, warn};

/// Where the loop currently is.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum LoopState {
    Init,
    Polling,
    CardPresent,
    Authenticating,
    FeedbackDispatch,
    Reconnecting,
    /// The reconnect worker died without returning the bus.
    Halted,
}

impl fmt::Display for LoopState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            LoopState::Init => "init",
            LoopState::Polling => "polling",
            LoopState::CardPresent => "card present",
            LoopState::Authenticating => "authenticating",
            LoopState::FeedbackDispatch => "feedback dispatch",
            LoopState::Reconnecting => "reconnecting",
            LoopState::Halted => "halted",
        };
        f.write_str(name)
    }
}

/// Loop counters.
#[derive(Debug, Default)]
pub struct ReaderStats {
    cycles: AtomicU64,
    detections: AtomicU64,
    authenticated: AtomicU64,
    rejected: AtomicU64,
    foreign_tags: AtomicU64,
    reconnect_spawns: AtomicU64,
    reconnects: AtomicU64,
    bus_errors: AtomicU64,
}

/// Point-in-time copy of [`ReaderStats`].
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ReaderStatsSnapshot {
    pub cycles: u64,
    pub detections: u64,
    pub authenticated: u64,
    pub rejected: u64,
    pub foreign_tags: u64,
    pub reconnect_spawns: u64,
    pub reconnects: u64,
    /// Failed cycles that did not take the link down.
    pub bus_errors: u64,
}

impl ReaderStats {
    pub fn snapshot(&self) -> ReaderStatsSnapshot {
        ReaderStatsSnapshot {
            cycles: self.cycles.load(Ordering::Relaxed),
            detections: self.detections.load(Ordering::Relaxed),
            authenticated: self.authenticated.load(Ordering::Relaxed),
            rejected: self.rejected.load(Ordering::Relaxed),
            foreign_tags: self.foreign_tags.load(Ordering::Relaxed),
            reconnect_spawns: self.reconnect_spawns.load(Ordering::Relaxed),
            reconnects: self.reconnects.load(Ordering::Relaxed),
            bus_errors: self.bus_errors.load(Ordering::Relaxed),
        }
    }
}

fn bump(counter: &AtomicU64) {
    counter.fetch_add(1, Ordering::Relaxed);
}

fn log_failure(operation: &str, result: homekey_hardware::Result<()>) {
    if let Err(e) = result {
        debug!("{} failed: {}", operation, e);
    }
}

/// The card loop, ready to be spawned.
pub struct CardReader {
    authenticator: AnyAuthenticator,
    dispatch: Dispatch,
    accessory: Arc<dyn AccessoryStore>,
    config: ConfigReader,
    identity: SharedReaderData,
    settings: ReaderSettings,
    events: broadcast::Sender<ReaderEvent>,
    state: watch::Sender<LoopState>,
    key_flow: watch::Receiver<KeyFlow>,
    key_flow_tx: watch::Sender<KeyFlow>,
    stats: Arc<ReaderStats>,
}

impl fmt::Debug for CardReader {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("CardReader")
            .field("state", &*self.state.borrow())
            .field("settings", &self.settings)
            .finish_non_exhaustive()
    }
}

impl CardReader {
    pub fn new(
        authenticator: AnyAuthenticator,
        dispatch: Dispatch,
        accessory: Arc<dyn AccessoryStore>,
        config: ConfigReader,
        identity: SharedReaderData,
        settings: ReaderSettings,
    ) -> Self {
        let (events, _) = broadcast::channel(settings.event_capacity);
        let (state, _) = watch::channel(LoopState::Init);
        let (key_flow_tx, key_flow) = watch::channel(settings.key_flow);
        Self {
            authenticator,
            dispatch,
            accessory,
            config,
            identity,
            settings,
            events,
            state,
            key_flow,
            key_flow_tx,
            stats: Arc::new(ReaderStats::default()),
        }
    }

    /// Subscribe before spawning to see the very first events.
    pub fn subscribe(&self) -> broadcast::Receiver<ReaderEvent> {
        self.events.subscribe()
    }

    /// Move the loop onto its own task, taking ownership of `bus`.
    pub fn spawn(self, bus: AnyNfcBus) -> ReaderHandle {
        let handle_parts = (
            self.events.clone(),
            self.state.subscribe(),
            self.key_flow_tx.clone(),
            Arc::clone(&self.stats),
        );
        let task = tokio::spawn(self.run(bus));
        let (events, state, key_flow, stats) = handle_parts;
        ReaderHandle {
            events,
            state,
            key_flow,
            stats,
            task,
        }
    }

    /// Run the loop on the current task. Only returns if the bus is lost
    /// for good.
    pub async fn run(mut self, mut bus: AnyNfcBus) {
        self.set_state(LoopState::Init);
        if let Err(e) = configure(&mut bus).await {
            error!("Reader not found: {}", e);
            bus = match self.recover(bus).await {
                Some(bus) => bus,
                None => return,
            };
        }

        loop {
            match self.poll_cycle(&mut bus).await {
                Err(e) if e.is_link_failure() => {
                    warn!("Lost the reader: {}", e);
                    bus = match self.recover(bus).await {
                        Some(bus) => bus,
                        None => return,
                    };
                    continue;
                }
                Err(e) => {
                    bump(&self.stats.bus_errors);
                    debug!("Poll cycle skipped: {}", e);
                }
                Ok(()) => {}
            }
            sleep(self.settings.cycle_delay).await;
        }
    }

    fn set_state(&self, state: LoopState) {
        self.state.send_if_modified(|current| {
            if *current == state {
                return false;
            }
            trace!("Card loop {} -> {}", current, state);
            *current = state;
            true
        });
    }

    /// Hand the bus to a fresh reconnect worker and wait for it to return.
    async fn recover(&self, mut bus: AnyNfcBus) -> Option<AnyNfcBus> {
        self.set_state(LoopState::Reconnecting);
        bus.stop().await;

        let (handback, recovered) = oneshot::channel();
        bump(&self.stats.reconnect_spawns);
        tokio::spawn(reconnect(bus, self.settings.reconnect_delay, handback));

        match recovered.await {
            Ok(bus) => {
                bump(&self.stats.reconnects);
                self.set_state(LoopState::Polling);
                Some(bus)
            }
            Err(_) => {
                error!("Reconnect worker ended without returning the reader, card loop halted");
                self.set_state(LoopState::Halted);
                None
            }
        }
    }

    async fn presence_frame(&self) -> EcpFrame {
        let identity = self.identity.read().await;
        EcpFrame::new(&identity.reader_gid)
    }

    /// One poll. Link failures among the errors send the loop to
    /// [`recover`](Self::recover).
    async fn poll_cycle(&mut self, bus: &mut AnyNfcBus) -> homekey_hardware::Result<()> {
        self.set_state(LoopState::Polling);
        bump(&self.stats.cycles);

        bus.write_register(READER_CONTROL_REGISTER, 0x00).await?;

        let frame = self.presence_frame().await;
        if let Err(e) = bus
            .communicate_thru(frame.as_bytes(), self.settings.ecp_timeout)
            .await
        {
            trace!("Presence broadcast not answered: {}", e);
        }

        let Some(target) = bus
            .read_passive_target(self.settings.detection_timeout)
            .await?
        else {
            return Ok(());
        };

        self.serve(bus, target).await;
        Ok(())
    }

    async fn serve(&mut self, bus: &mut AnyNfcBus, target: PassiveTarget) {
        self.set_state(LoopState::CardPresent);
        bump(&self.stats.detections);
        let detected_at = Instant::now();

        log_failure(
            "Setting passive retries",
            bus.set_passive_activation_retries(ACTIVE_PASSIVE_RETRIES)
                .await,
        );
        debug!("ATQA: {:02X}{:02X}", target.atqa[0], target.atqa[1]);
        debug!("SAK: {:02X}", target.sak);
        info!("*** PASSIVE TARGET DETECTED ***");

        let config = self.config.snapshot();
        let selected = match bus.data_exchange(&SELECT_HOMEKEY_APPLET).await {
            Ok(response) => is_success(&response),
            Err(e) => {
                debug!("Applet select failed: {}", e);
                false
            }
        };

        if selected {
            self.set_state(LoopState::Authenticating);
            let flow = *self.key_flow.borrow();
            let outcome = self
                .authenticator
                .authenticate(bus, &self.identity, flow)
                .await;
            self.set_state(LoopState::FeedbackDispatch);
            match outcome {
                AuthOutcome::Success {
                    issuer_id,
                    endpoint_id,
                } => {
                    bump(&self.stats.authenticated);
                    self.dispatch_success(&config);
                    let reader_id = self.identity.read().await.reader_id.clone();
                    self.publish(ReaderEvent::authenticated(
                        &issuer_id,
                        &endpoint_id,
                        &reader_id,
                    ));
                    info!(
                        "Total Time (detection->auth->feedback): {} ms",
                        detected_at.elapsed().as_millis()
                    );
                }
                AuthOutcome::Failure => {
                    bump(&self.stats.rejected);
                    self.dispatch_failure(&config);
                    warn!("We got status FlowFailed, mqtt untouched!");
                }
            }
            log_failure("Resetting RF field", bus.set_rf_field(0x02, 0x01).await);
        } else {
            warn!("Invalid Response, probably not Homekey, publishing target's UID");
            self.set_state(LoopState::FeedbackDispatch);
            bump(&self.stats.foreign_tags);
            self.dispatch_failure(&config);
            if !config.nfc_tag_no_publish {
                self.publish(ReaderEvent::tag_read(&target));
            }
        }

        self.wait_for_removal(bus).await;
    }

    fn dispatch_success(&self, config: &Configuration) {
        if is_pin_assigned(config.nfc_success_pin) {
            self.dispatch.indicator(FeedbackEvent::Success);
        }
        if is_pin_assigned(config.nfc_neopixel_pin) {
            self.dispatch.pixel(FeedbackEvent::Success);
        }
        if config.card_drives_controller() {
            self.dispatch.trigger(TriggerEvent::toggle(TriggerSource::Card));
        } else if config.lock_always_unlock {
            self.force_state(LockState::Unlocked);
        } else if config.lock_always_lock {
            self.force_state(LockState::Locked);
        }
        if config.alt_action_wired() {
            self.dispatch.indicator(FeedbackEvent::AltAction);
        }
    }

    fn dispatch_failure(&self, config: &Configuration) {
        if is_pin_assigned(config.nfc_fail_pin) {
            self.dispatch.indicator(FeedbackEvent::Fail);
        }
        if is_pin_assigned(config.nfc_neopixel_pin) {
            self.dispatch.pixel(FeedbackEvent::Fail);
        }
    }

    /// Write a forced state straight into the property store. Only used
    /// when no lock controller follows card triggers.
    fn force_state(&self, state: LockState) {
        debug!("No controller follows the card, forcing {}", state);
        self.accessory.set_current_state(state);
        self.accessory.set_target_state(state);
    }

    fn publish(&self, event: ReaderEvent) {
        if self.events.send(event).is_err() {
            trace!("No reader event subscribers");
        }
    }

    /// Keep re-detecting until the card leaves the field or the attempts
    /// run out.
    async fn wait_for_removal(&self, bus: &mut AnyNfcBus) {
        let interval = self.settings.cycle_delay;
        sleep(interval).await;
        let mut present = self.still_present(bus).await;
        let mut attempts = 0;
        while present && attempts < self.settings.removal_attempts {
            trace!("Target still present");
            sleep(interval).await;
            present = self.still_present(bus).await;
            attempts += 1;
        }
        if present {
            debug!("Card still in the field after {} checks", attempts);
        }
        log_failure("Release", bus.release().await);
        log_failure(
            "Setting passive retries",
            bus.set_passive_activation_retries(0).await,
        );
    }

    async fn still_present(&self, bus: &mut AnyNfcBus) -> bool {
        log_failure("Release", bus.release().await);
        matches!(
            bus.read_passive_target(self.settings.cycle_delay).await,
            Ok(Some(_))
        )
    }
}

/// Handle to a spawned [`CardReader`].
#[derive(Debug)]
pub struct ReaderHandle {
    events: broadcast::Sender<ReaderEvent>,
    state: watch::Receiver<LoopState>,
    key_flow: watch::Sender<KeyFlow>,
    stats: Arc<ReaderStats>,
    task: JoinHandle<()>,
}

impl ReaderHandle {
    pub fn subscribe(&self) -> broadcast::Receiver<ReaderEvent> {
        self.events.subscribe()
    }

    pub fn state(&self) -> LoopState {
        *self.state.borrow()
    }

    pub fn stats(&self) -> ReaderStatsSnapshot {
        self.stats.snapshot()
    }

    pub fn key_flow(&self) -> KeyFlow {
        *self.key_flow.borrow()
    }

    /// Key flow used from the next authentication on.
    pub fn set_key_flow(&self, flow: KeyFlow) {
        info!("Key flow set to {}", flow);
        self.key_flow.send_replace(flow);
    }

    pub fn is_finished(&self) -> bool {
        self.task.is_finished()
    }

    /// Stop the loop. A pending reconnect worker notices and exits on its
    /// own.
    pub async fn shutdown(self) -> TaskTermination {
        self.task.abort();
        TaskTermination::classify(self.task.await)
    }
}
