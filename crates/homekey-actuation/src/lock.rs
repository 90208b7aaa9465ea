//! Lock arbitration controller.
//!
//! The controller is the only writer of the accessory's current/target lock
//! state. It consumes [`TriggerEvent`]s from its queue and resolves each one
//! against the configured policy:
//!
//! 1. **always unlock** (non-app source): force UNLOCKED, optionally
//!    relocking after the momentary timeout.
//! 2. **always lock** (non-app source): force LOCKED.
//! 3. **toggle**: flip the current state. The actuator level follows the
//!    state being left, and a momentary source that unlocked a LOCKED door
//!    restores LOCKED after the timeout.
//!
//! An app trigger never writes the target state itself; the remote
//! controller already wrote it before the update hook fired.

use crate::queue::SharedReceiver;
use crate::worker::{drive, recv_polling};
use homekey_core::{
    ConfigReader, LockPolicy, LockState, TriggerAction, TriggerEvent, TriggerSource,
};
use homekey_hardware::{AccessoryStore, Gpio};
use std::sync::Arc;
use std::time::Duration;
use tracing::{debug, info};

#[derive(Debug)]
pub struct LockController {
    gpio: Arc<dyn Gpio>,
    accessory: Arc<dyn AccessoryStore>,
    config: ConfigReader,
    poll: Duration,
}

impl LockController {
    pub fn new(
        gpio: Arc<dyn Gpio>,
        accessory: Arc<dyn AccessoryStore>,
        config: ConfigReader,
        poll: Duration,
    ) -> Self {
        Self {
            gpio,
            accessory,
            config,
            poll,
        }
    }

    /// Serve the trigger queue until a stop request arrives.
    pub async fn run(self, queue: SharedReceiver<TriggerEvent>) {
        let mut rx = queue.lock().await;
        debug!("Lock controller started");
        while let Some(event) = recv_polling(&mut rx, self.poll).await {
            debug!(
                "Got something in queue - source = {} action = {:?}",
                event.source, event.action
            );
            match event.action {
                TriggerAction::Toggle => self.handle(event.source).await,
                TriggerAction::Stop => break,
            }
        }
        info!("Lock controller stopped");
    }

    /// Resolve one toggle request from `source`.
    pub async fn handle(&self, source: TriggerSource) {
        let policy = self.config.with(|c| c.lock_policy());
        let from_app = source == TriggerSource::App;

        if policy.always_unlock && !from_app {
            self.force(LockState::Unlocked, &policy);
            if policy.momentary.applies_to(source) {
                tokio::time::sleep(policy.momentary_timeout).await;
                self.force(LockState::Locked, &policy);
            }
        } else if policy.always_lock && !from_app {
            self.force(LockState::Locked, &policy);
        } else {
            let current = self.accessory.current_state();
            let next = current.complement();
            if !from_app {
                self.accessory.set_target_state(next);
            }
            let level = if current == LockState::Unlocked {
                policy.lock_level
            } else {
                policy.unlock_level
            };
            drive(self.gpio.as_ref(), policy.action_pin, level);
            self.accessory.set_current_state(next);
            info!("Lock {} -> {} ({})", current, next, source);

            if policy.momentary.applies_to(source) && current == LockState::Locked {
                tokio::time::sleep(policy.momentary_timeout).await;
                self.accessory.set_target_state(current);
                drive(self.gpio.as_ref(), policy.action_pin, policy.lock_level);
                self.accessory.set_current_state(current);
                info!("Momentary timeout, lock restored to {}", current);
            }
        }
    }

    /// Set target and current to `state` and drive the matching level.
    fn force(&self, state: LockState, policy: &LockPolicy) {
        let level = match state {
            LockState::Unlocked => policy.unlock_level,
            _ => policy.lock_level,
        };
        self.accessory.set_target_state(state);
        drive(self.gpio.as_ref(), policy.action_pin, level);
        self.accessory.set_current_state(state);
        info!("Lock forced to {}", state);
    }
}
