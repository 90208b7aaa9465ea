//! Validate-and-apply engine over the field table.
//!
//! A request names one section and carries a flat JSON object. Every field
//! is validated before the first one is applied, so a rejected batch leaves
//! the configuration untouched. Accepted fields are applied in document
//! order; each one stores its value and runs the side effect its table row
//! names. One reconcile pass and one persist follow the whole batch.

use crate::error::{ConfigError, Result};
use crate::presets::EthernetInfo;
use crate::schema::{self, Effect, FieldSpec, FieldValue, ValidationContext};
use crate::section::Section;
use homekey_actuation::{Actuators, ReconcileReport};
use homekey_core::constants::is_pin_assigned;
use homekey_core::{ConfigReader, ConfigWriter, Configuration, PinDirection};
use homekey_reader::IdentityService;
use homekey_storage::ConfigRepository;
use serde_json::Value;
use tracing::{debug, error, info, warn};

const PIXEL_TYPE_RESTART: &str = "Pixel Type was changed, reboot needed! Rebooting...";
const FIELD_RESTART: &str = "Saved! Restarting...";

/// Result of a successful apply.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ApplyOutcome {
    /// Every change is live.
    Applied,
    /// Stored, but some change only takes effect after a restart.
    RestartRequired(String),
}

impl ApplyOutcome {
    pub fn message(&self) -> &str {
        match self {
            ApplyOutcome::Applied => "Saved and applied!",
            ApplyOutcome::RestartRequired(message) => message,
        }
    }

    pub fn restart_required(&self) -> bool {
        matches!(self, ApplyOutcome::RestartRequired(_))
    }
}

/// Sole owner of the configuration writer and the actuation workers.
#[derive(Debug)]
pub struct ConfigEngine {
    writer: ConfigWriter,
    actuators: Actuators,
    repository: ConfigRepository,
    identity: IdentityService,
}

impl ConfigEngine {
    pub fn new(
        writer: ConfigWriter,
        actuators: Actuators,
        repository: ConfigRepository,
        identity: IdentityService,
    ) -> Self {
        Self {
            writer,
            actuators,
            repository,
            identity,
        }
    }

    /// Read handle on the live configuration.
    pub fn reader(&self) -> ConfigReader {
        self.writer.reader()
    }

    pub fn snapshot(&self) -> Configuration {
        self.writer.snapshot()
    }

    pub fn actuators(&self) -> &Actuators {
        &self.actuators
    }

    pub fn actuators_mut(&mut self) -> &mut Actuators {
        &mut self.actuators
    }

    pub fn identity(&self) -> &IdentityService {
        &self.identity
    }

    /// Give up the engine, keeping the workers for shutdown.
    pub fn into_actuators(self) -> Actuators {
        self.actuators
    }

    /// Validate `document` against `section` and apply it.
    pub async fn apply_partial(
        &mut self,
        section: Section,
        document: &Value,
    ) -> Result<ApplyOutcome> {
        if !section.is_writable() {
            return Err(ConfigError::ReadOnlySection(section.to_string()));
        }
        let fields = document.as_object().ok_or(ConfigError::NotAnObject)?;

        let staged = self.validate(section, fields)?;
        debug!("Validated {} field(s) for {}", staged.len(), section);

        let mut restart: Option<&'static str> = None;
        for (spec, value) in staged {
            let previous = self.writer.with(|c| (spec.get)(c));
            let changed = previous != value;
            self.writer.modify(|c| (spec.set)(c, value.clone()));
            if let Some(message) = self.side_effect(spec, &previous, &value, changed) {
                // the pixel type message wins over the generic one
                if restart.is_none() || message == PIXEL_TYPE_RESTART {
                    restart = Some(message);
                }
            }
        }

        let config = self.writer.snapshot();
        let report = self.actuators.reconcile(&config).await;
        log_report(&report);

        if let Err(e) = self.repository.save(&config).await {
            error!("Could not persist {}: {}", section, e);
            return Err(e.into());
        }
        info!("Config successfully saved");

        Ok(match restart {
            Some(message) => ApplyOutcome::RestartRequired(message.to_string()),
            None => ApplyOutcome::Applied,
        })
    }

    /// JSON view of `section`.
    ///
    /// `actions` and `misc` return the whole record.
    pub async fn get(&self, section: Section) -> Value {
        match section {
            Section::Actions | Section::Misc => {
                serde_json::to_value(self.writer.snapshot()).unwrap_or(Value::Null)
            }
            Section::HkInfo => {
                serde_json::to_value(self.identity.info().await).unwrap_or(Value::Null)
            }
        }
    }

    /// Erase the stored record, reset to defaults and reconcile the workers.
    pub async fn clear(&mut self, section: Section) -> Result<ReconcileReport> {
        if !section.is_writable() {
            return Err(ConfigError::ReadOnlySection(section.to_string()));
        }
        self.repository.clear().await?;
        self.writer.replace(Configuration::default());
        info!("Config {} reset to defaults", section);
        let config = self.writer.snapshot();
        let report = self.actuators.reconcile(&config).await;
        log_report(&report);
        Ok(report)
    }

    /// Supported Ethernet chips and board presets.
    pub fn ethernet_info(&self) -> EthernetInfo {
        EthernetInfo::new(self.writer.with(|c| c.ethernet_enabled))
    }

    fn validate(
        &self,
        section: Section,
        fields: &serde_json::Map<String, Value>,
    ) -> Result<Vec<(&'static FieldSpec, FieldValue)>> {
        let peripherals = self.actuators.peripherals();
        let ctx = ValidationContext {
            gpio: peripherals.gpio.as_ref(),
            paired_controllers: peripherals.accessory.paired_controllers(),
        };

        fields
            .iter()
            .map(|(name, value)| {
                let spec = schema::lookup(section, name).ok_or_else(|| {
                    warn!("\"{}\" could not validate!", name);
                    ConfigError::unknown_field(name.as_str())
                })?;
                let parsed = spec.parse(value, &ctx).inspect_err(|_| {
                    warn!("\"{}\" could not validate!", name);
                })?;
                Ok((spec, parsed))
            })
            .collect()
    }

    /// Run the side effect of one stored field.
    ///
    /// Returns a restart message when the change is not live.
    fn side_effect(
        &self,
        spec: &FieldSpec,
        previous: &FieldValue,
        value: &FieldValue,
        changed: bool,
    ) -> Option<&'static str> {
        let gpio = self.actuators.peripherals().gpio.as_ref();
        let accessory = self.actuators.peripherals().accessory.as_ref();

        match spec.effect {
            Effect::None => {}
            Effect::OutputPin | Effect::InputPin => {
                let direction = if spec.effect == Effect::InputPin {
                    PinDirection::Input
                } else {
                    PinDirection::Output
                };
                if let Some(pin) = value.pin().filter(|p| is_pin_assigned(*p))
                    && let Err(e) = gpio.set_mode(pin, direction)
                {
                    warn!("Could not configure pin {} for {}: {}", pin, spec.name, e);
                }
            }
            Effect::ActionPin => {
                let old = previous.pin().filter(|p| is_pin_assigned(*p));
                let new = value.pin().filter(|p| is_pin_assigned(*p));
                match (old, new) {
                    (None, Some(pin)) => {
                        debug!("Enabling lock actuator on pin {}", pin);
                        self.enable_output(pin, spec.name);
                        if self.writer.with(|c| c.hk_dumb_switch_mode) {
                            self.writer.modify(|c| c.hk_dumb_switch_mode = false);
                            info!("Actuator pin assigned, leaving dumb switch mode");
                        }
                    }
                    (Some(pin), None) => {
                        debug!("Disabling lock actuator on pin {}", pin);
                        if let Err(e) = gpio.reset(pin) {
                            warn!("Could not reset pin {}: {}", pin, e);
                        }
                    }
                    (_, Some(pin)) => self.enable_output(pin, spec.name),
                    (None, None) => {}
                }
            }
            Effect::PixelType => {
                if changed {
                    return Some(PIXEL_TYPE_RESTART);
                }
            }
            Effect::SetupCode => {
                if let FieldValue::Text(code) = value
                    && changed
                    && accessory.paired_controllers() == 0
                {
                    match accessory.set_pairing_code(code) {
                        Ok(()) => info!("Pairing code updated"),
                        Err(e) => warn!("Could not set pairing code: {}", e),
                    }
                }
            }
            Effect::LowBatteryThreshold => {
                if let FieldValue::U8(threshold) = value
                    && let Some(low) = self.actuators.bridge().reevaluate_low_battery(*threshold)
                {
                    debug!("Low battery re-evaluated against {}%: {}", threshold, low);
                }
            }
            Effect::Restart => {
                if changed {
                    return Some(FIELD_RESTART);
                }
            }
        }
        None
    }

    fn enable_output(&self, pin: u8, field: &str) {
        if let Err(e) = self
            .actuators
            .peripherals()
            .gpio
            .set_mode(pin, PinDirection::Output)
        {
            warn!("Could not configure pin {} for {}: {}", pin, field, e);
        }
    }
}

fn log_report(report: &ReconcileReport) {
    for kind in &report.started {
        info!("Started {} worker", kind);
    }
    for kind in &report.stopped {
        info!("Stopped {} worker", kind);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_outcome_messages() {
        assert_eq!(ApplyOutcome::Applied.message(), "Saved and applied!");
        let restart = ApplyOutcome::RestartRequired(PIXEL_TYPE_RESTART.to_string());
        assert!(restart.restart_required());
        assert_eq!(restart.message(), PIXEL_TYPE_RESTART);
        assert!(!ApplyOutcome::Applied.restart_required());
    }
}
