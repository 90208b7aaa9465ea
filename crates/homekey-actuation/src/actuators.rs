//! Actuation supervisor.
//!
//! Owns the worker queues and the lifecycle table. The configuration engine
//! holds the [`Actuators`] and calls [`reconcile`](Actuators::reconcile)
//! after every apply; the card loop and the accessory stack only get cheap
//! sender handles ([`Dispatch`], [`AccessoryBridge`]).

use crate::alt::AltActionTask;
use crate::bridge::AccessoryBridge;
use crate::indicator::IndicatorWorker;
use crate::lifecycle::{TaskTermination, WorkerKind, WorkerSlot};
use crate::lock::LockController;
use crate::pixel::PixelWorker;
use crate::queue::{Queue, QueueSender};
use crate::settings::WorkerSettings;
use crate::worker::drive;
use homekey_core::constants::is_pin_assigned;
use homekey_core::{
    ConfigReader, Configuration, FeedbackEvent, Level, LockState, PinDirection, TriggerEvent,
};
use homekey_hardware::{AccessoryStore, Gpio, PixelDriver};
use std::collections::BTreeMap;
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use tracing::{debug, info, warn};

/// Hardware the workers drive.
#[derive(Debug, Clone)]
pub struct Peripherals {
    pub gpio: Arc<dyn Gpio>,
    pub pixel: Arc<dyn PixelDriver>,
    pub accessory: Arc<dyn AccessoryStore>,
}

/// Messages dropped on full queues, per queue.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct DropCounts {
    pub indicator: u64,
    pub pixel: u64,
    pub lock: u64,
}

/// Workers started and stopped by one reconcile pass.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ReconcileReport {
    pub started: Vec<WorkerKind>,
    pub stopped: Vec<WorkerKind>,
}

impl ReconcileReport {
    pub fn is_empty(&self) -> bool {
        self.started.is_empty() && self.stopped.is_empty()
    }
}

/// Sender side of every worker queue, handed to the card loop.
#[derive(Debug, Clone)]
pub struct Dispatch {
    indicator: QueueSender<FeedbackEvent>,
    pixel: QueueSender<FeedbackEvent>,
    lock: QueueSender<TriggerEvent>,
}

impl Dispatch {
    /// Queue feedback for the indicator worker. Returns `false` if dropped.
    pub fn indicator(&self, event: FeedbackEvent) -> bool {
        self.indicator.try_send(event)
    }

    /// Queue feedback for the pixel worker. Returns `false` if dropped.
    pub fn pixel(&self, event: FeedbackEvent) -> bool {
        self.pixel.try_send(event)
    }

    /// Queue a trigger for the lock controller. Returns `false` if dropped.
    pub fn trigger(&self, event: TriggerEvent) -> bool {
        self.lock.try_send(event)
    }

    pub fn drop_counts(&self) -> DropCounts {
        DropCounts {
            indicator: self.indicator.dropped(),
            pixel: self.pixel.dropped(),
            lock: self.lock.dropped(),
        }
    }
}

/// Owner of the actuation workers.
#[derive(Debug)]
pub struct Actuators {
    peripherals: Peripherals,
    config: ConfigReader,
    settings: WorkerSettings,
    indicator_queue: Queue<FeedbackEvent>,
    pixel_queue: Queue<FeedbackEvent>,
    lock_queue: Queue<TriggerEvent>,
    alt_active: Arc<AtomicBool>,
    slots: BTreeMap<WorkerKind, WorkerSlot>,
}

impl Actuators {
    pub fn new(peripherals: Peripherals, config: ConfigReader, settings: WorkerSettings) -> Self {
        let depth = settings.queue_depth;
        Self {
            peripherals,
            config,
            indicator_queue: Queue::new("indicator", depth),
            pixel_queue: Queue::new("pixel", depth),
            lock_queue: Queue::new("lock", depth),
            alt_active: Arc::new(AtomicBool::new(false)),
            slots: WorkerKind::ALL
                .iter()
                .map(|&kind| (kind, WorkerSlot::new(kind)))
                .collect(),
            settings,
        }
    }

    pub fn dispatch(&self) -> Dispatch {
        Dispatch {
            indicator: self.indicator_queue.sender(),
            pixel: self.pixel_queue.sender(),
            lock: self.lock_queue.sender(),
        }
    }

    pub fn bridge(&self) -> AccessoryBridge {
        AccessoryBridge::new(
            Arc::clone(&self.peripherals.accessory),
            self.lock_queue.sender(),
            self.config.clone(),
        )
    }

    pub fn peripherals(&self) -> &Peripherals {
        &self.peripherals
    }

    pub fn drop_counts(&self) -> DropCounts {
        self.dispatch().drop_counts()
    }

    pub fn is_running(&self, kind: WorkerKind) -> bool {
        self.slots.get(&kind).is_some_and(WorkerSlot::is_running)
    }

    pub fn running(&self) -> Vec<WorkerKind> {
        WorkerKind::ALL
            .into_iter()
            .filter(|&kind| self.is_running(kind))
            .collect()
    }

    /// Start the worker for `kind`. Returns `false` if it was already running.
    pub fn start(&mut self, kind: WorkerKind) -> bool {
        let poll = self.settings.poll_interval;
        let gpio = Arc::clone(&self.peripherals.gpio);
        let config = self.config.clone();
        let Some(slot) = self.slots.get_mut(&kind) else {
            return false;
        };
        let started = match kind {
            WorkerKind::Indicator => {
                let worker =
                    IndicatorWorker::new(gpio, config, Arc::clone(&self.alt_active), poll);
                slot.start(worker.run(self.indicator_queue.receiver()))
            }
            WorkerKind::Pixel => {
                let worker =
                    PixelWorker::new(Arc::clone(&self.peripherals.pixel), config, poll);
                slot.start(worker.run(self.pixel_queue.receiver()))
            }
            WorkerKind::Lock => {
                let worker = LockController::new(
                    gpio,
                    Arc::clone(&self.peripherals.accessory),
                    config,
                    poll,
                );
                slot.start(worker.run(self.lock_queue.receiver()))
            }
            WorkerKind::AltAction => {
                let task = AltActionTask::new(
                    gpio,
                    config,
                    Arc::clone(&self.alt_active),
                    self.settings.alt_poll_interval,
                );
                slot.start(task.run())
            }
        };
        if started {
            info!("Started {} worker", kind);
        }
        started
    }

    /// Stop the worker for `kind`. Returns `false` if it was not running.
    pub async fn stop(&mut self, kind: WorkerKind) -> bool {
        let timeout = self.settings.stop_timeout;
        let indicator = self.indicator_queue.sender();
        let pixel = self.pixel_queue.sender();
        let lock = self.lock_queue.sender();
        let Some(slot) = self.slots.get_mut(&kind) else {
            return false;
        };
        let stopped = match kind {
            WorkerKind::Indicator => {
                slot.stop(async {
                    indicator
                        .send_timeout(FeedbackEvent::Stop, timeout)
                        .await
                        .is_ok()
                })
                .await
            }
            WorkerKind::Pixel => {
                slot.stop(async {
                    pixel
                        .send_timeout(FeedbackEvent::Stop, timeout)
                        .await
                        .is_ok()
                })
                .await
            }
            WorkerKind::Lock => {
                slot.stop(async {
                    lock.send_timeout(TriggerEvent::stop(), timeout)
                        .await
                        .is_ok()
                })
                .await
            }
            WorkerKind::AltAction => {
                let aborted = slot.abort();
                if aborted {
                    self.alt_active.store(false, Ordering::SeqCst);
                    let led = self.config.with(|c| c.hk_alt_action_init_led_pin);
                    drive(self.peripherals.gpio.as_ref(), led, Level::Low);
                }
                aborted
            }
        };
        if stopped {
            info!("Stopped {} worker", kind);
        }
        stopped
    }

    /// Start and stop workers until the running set matches `config`.
    pub async fn reconcile(&mut self, config: &Configuration) -> ReconcileReport {
        let mut report = ReconcileReport::default();
        for kind in WorkerKind::ALL {
            let wanted = kind.wanted(config);
            if wanted && self.start(kind) {
                report.started.push(kind);
            } else if !wanted && self.stop(kind).await {
                report.stopped.push(kind);
            }
        }
        if !report.is_empty() {
            debug!("Reconciled workers: {:?}", report);
        }
        report
    }

    /// Program pins to their idle levels and start the wanted workers.
    pub async fn boot(&mut self) -> ReconcileReport {
        let config = self.config.snapshot();
        let gpio = self.peripherals.gpio.as_ref();

        for (pin, active) in [
            (config.nfc_success_pin, config.nfc_success_hl),
            (config.nfc_fail_pin, config.nfc_fail_hl),
            (config.hk_alt_action_pin, config.hk_alt_action_gpio_state),
        ] {
            if output(gpio, pin) {
                drive(gpio, pin, !Level::from(active));
            }
        }
        if output(gpio, config.hk_alt_action_init_led_pin) {
            drive(gpio, config.hk_alt_action_init_led_pin, Level::Low);
        }
        if is_pin_assigned(config.hk_alt_action_init_pin)
            && let Err(e) = gpio.set_mode(config.hk_alt_action_init_pin, PinDirection::Input)
        {
            warn!("Failed to configure alt action button: {}", e);
        }
        if output(gpio, config.gpio_action_pin) {
            let policy = config.lock_policy();
            match self.peripherals.accessory.current_state() {
                LockState::Locked => drive(gpio, policy.action_pin, policy.lock_level),
                LockState::Unlocked => drive(gpio, policy.action_pin, policy.unlock_level),
                _ => {}
            }
        }

        self.reconcile(&config).await
    }

    /// Stop every worker and wait for all of them to end.
    pub async fn shutdown(mut self) -> Vec<(WorkerKind, TaskTermination)> {
        for kind in WorkerKind::ALL {
            self.stop(kind).await;
        }
        let mut results = Vec::new();
        for (kind, slot) in self.slots.iter_mut() {
            for termination in slot.join_all().await {
                if termination == TaskTermination::Panic {
                    warn!("{} worker panicked", kind);
                }
                results.push((*kind, termination));
            }
        }
        results
    }
}

/// Set `pin` to output; `false` when unassigned or unusable.
fn output(gpio: &dyn Gpio, pin: u8) -> bool {
    if !is_pin_assigned(pin) {
        return false;
    }
    match gpio.set_mode(pin, PinDirection::Output) {
        Ok(()) => true,
        Err(e) => {
            warn!("Failed to configure pin {} as output: {}", pin, e);
            false
        }
    }
}
