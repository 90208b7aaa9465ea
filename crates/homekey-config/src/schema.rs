//! Field table of the device configuration.
//!
//! Every field the configuration surface accepts is one [`FieldSpec`]: its
//! wire name, the section it belongs to, how a JSON value is validated into
//! a typed [`FieldValue`], the side effect applying it has, and accessors
//! into [`Configuration`]. The engine walks this table; nothing else knows
//! field names.

use crate::error::{ConfigError, Result};
use crate::section::Section;
use homekey_core::constants::{DISABLED_PIN, SETUP_CODE_LENGTH};
use homekey_core::{Configuration, PinDirection, Rgb};
use homekey_hardware::Gpio;
use serde_json::{Value, json};

/// JSON type class used for the type check.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum JsonType {
    Boolean,
    Number,
    String,
    Array,
    Object,
}

impl JsonType {
    pub fn of(value: &Value) -> Option<JsonType> {
        match value {
            Value::Bool(_) => Some(JsonType::Boolean),
            Value::Number(_) => Some(JsonType::Number),
            Value::String(_) => Some(JsonType::String),
            Value::Array(_) => Some(JsonType::Array),
            Value::Object(_) => Some(JsonType::Object),
            Value::Null => None,
        }
    }
}

/// How a field's value is validated.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FieldKind {
    Bool,
    U8 { max: u8 },
    U16,
    /// A pin usable in the given direction, or the disabled sentinel.
    Pin(PinDirection),
    Text,
    SetupCode,
    Color,
    /// The four reader bus pins.
    PinList,
    /// Ethernet SPI settings, `-1` meaning unset.
    SpiConfig,
}

impl FieldKind {
    pub fn json_type(&self) -> JsonType {
        match self {
            FieldKind::Bool => JsonType::Boolean,
            FieldKind::U8 { .. } | FieldKind::U16 | FieldKind::Pin(_) => JsonType::Number,
            FieldKind::Text | FieldKind::SetupCode => JsonType::String,
            FieldKind::Color => JsonType::Object,
            FieldKind::PinList | FieldKind::SpiConfig => JsonType::Array,
        }
    }
}

/// A validated field value.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum FieldValue {
    Bool(bool),
    U8(u8),
    U16(u16),
    Text(String),
    Color(Rgb),
    PinList([u8; 4]),
    SpiConfig([i8; 7]),
}

impl FieldValue {
    pub fn to_json(&self) -> Value {
        match self {
            FieldValue::Bool(b) => json!(b),
            FieldValue::U8(n) => json!(n),
            FieldValue::U16(n) => json!(n),
            FieldValue::Text(s) => json!(s),
            FieldValue::Color(c) => json!({ "r": c.r, "g": c.g, "b": c.b }),
            FieldValue::PinList(pins) => json!(pins),
            FieldValue::SpiConfig(spi) => json!(spi),
        }
    }

    /// Pin number, for pin fields.
    pub fn pin(&self) -> Option<u8> {
        match self {
            FieldValue::U8(pin) => Some(*pin),
            _ => None,
        }
    }
}

/// What applying a field does besides storing it.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Effect {
    None,
    /// Program the pin as an output when it gets assigned.
    OutputPin,
    /// Program the pin as an input when it gets assigned.
    InputPin,
    /// Actuator relay pin: output when assigned, reset when released, and
    /// assigning it leaves dumb switch mode.
    ActionPin,
    /// Pixel channel order; only read at startup.
    PixelType,
    /// Reprogram the pairing code.
    SetupCode,
    /// Re-evaluate the low-battery flag.
    LowBatteryThreshold,
    /// Only read at startup.
    Restart,
}

/// Facts about the running device a validation needs.
#[derive(Debug, Clone, Copy)]
pub struct ValidationContext<'a> {
    pub gpio: &'a dyn Gpio,
    pub paired_controllers: usize,
}

/// One row of the field table.
#[derive(Debug, Clone, Copy)]
pub struct FieldSpec {
    pub name: &'static str,
    pub section: Section,
    pub kind: FieldKind,
    pub effect: Effect,
    pub get: fn(&Configuration) -> FieldValue,
    pub set: fn(&mut Configuration, FieldValue),
}

impl FieldSpec {
    /// Validate `value` for this field.
    pub fn parse(&self, value: &Value, ctx: &ValidationContext<'_>) -> Result<FieldValue> {
        let expected = self.kind.json_type();
        let actual = JsonType::of(value);
        let coercible = match (expected, actual) {
            // booleans also take numeric 0/1
            (JsonType::Boolean, Some(JsonType::Number)) => true,
            // colours also take [[channel, level], ...] pairs
            (JsonType::Object, Some(JsonType::Array)) => self.kind == FieldKind::Color,
            _ => false,
        };
        if actual != Some(expected) && !coercible {
            return Err(ConfigError::unknown_field(self.name));
        }
        let invalid = || ConfigError::invalid_value(self.name, value);

        match self.kind {
            FieldKind::Bool => match value {
                Value::Bool(b) => Ok(FieldValue::Bool(*b)),
                _ => match value.as_u64() {
                    Some(0) => Ok(FieldValue::Bool(false)),
                    Some(1) => Ok(FieldValue::Bool(true)),
                    _ => Err(invalid()),
                },
            },
            FieldKind::U8 { max } => value
                .as_u64()
                .and_then(|n| u8::try_from(n).ok())
                .filter(|n| *n <= max)
                .map(FieldValue::U8)
                .ok_or_else(invalid),
            FieldKind::U16 => value
                .as_u64()
                .and_then(|n| u16::try_from(n).ok())
                .map(FieldValue::U16)
                .ok_or_else(invalid),
            FieldKind::Pin(direction) => {
                let pin = value
                    .as_u64()
                    .and_then(|n| u8::try_from(n).ok())
                    .filter(|n| *n > 0)
                    .ok_or_else(invalid)?;
                if pin != DISABLED_PIN && !ctx.gpio.supports(pin, direction) {
                    return Err(ConfigError::invalid_pin(self.name, value));
                }
                Ok(FieldValue::U8(pin))
            }
            FieldKind::Text => Ok(FieldValue::Text(
                value.as_str().unwrap_or_default().to_string(),
            )),
            FieldKind::SetupCode => {
                let code = value.as_str().unwrap_or_default();
                if code.len() != SETUP_CODE_LENGTH || !code.bytes().all(|b| b.is_ascii_digit()) {
                    return Err(invalid());
                }
                if ctx.paired_controllers > 0 {
                    return Err(ConfigError::SetupCodeLocked);
                }
                Ok(FieldValue::Text(code.to_string()))
            }
            FieldKind::Color => match value {
                Value::Array(pairs) => rgb_from_pairs(pairs),
                _ => rgb_from_object(value),
            }
            .map(FieldValue::Color)
            .ok_or_else(invalid),
            FieldKind::PinList => {
                let pins: Vec<u8> = value
                    .as_array()
                    .into_iter()
                    .flatten()
                    .filter_map(|v| v.as_u64().and_then(|n| u8::try_from(n).ok()))
                    .collect();
                <[u8; 4]>::try_from(pins)
                    .map(FieldValue::PinList)
                    .map_err(|_| invalid())
            }
            FieldKind::SpiConfig => {
                let items: Vec<i8> = value
                    .as_array()
                    .into_iter()
                    .flatten()
                    .filter_map(|v| v.as_i64().and_then(|n| i8::try_from(n).ok()))
                    .collect();
                <[i8; 7]>::try_from(items)
                    .map(FieldValue::SpiConfig)
                    .map_err(|_| invalid())
            }
        }
    }
}

macro_rules! field {
    ($name:literal, $section:ident, $kind:expr, $effect:ident, $member:ident: $variant:ident) => {
        FieldSpec {
            name: $name,
            section: Section::$section,
            kind: $kind,
            effect: Effect::$effect,
            get: |c| FieldValue::$variant(c.$member.to_owned()),
            set: |c, v| {
                if let FieldValue::$variant(x) = v {
                    c.$member = x;
                }
            },
        }
    };
}

fn channel_level(value: &Value) -> Option<u8> {
    value.as_u64().and_then(|n| u8::try_from(n).ok())
}

fn rgb_from_object(value: &Value) -> Option<Rgb> {
    let channel = |name: &str| value.get(name).and_then(channel_level);
    Some(Rgb::new(channel("r")?, channel("g")?, channel("b")?))
}

/// Channel index 0, 1, 2 is red, green, blue; every channel must be present.
fn rgb_from_pairs(pairs: &[Value]) -> Option<Rgb> {
    let mut channels = [None; 3];
    for pair in pairs {
        let [index, level] = pair.as_array()?.as_slice() else {
            return None;
        };
        let slot = channels.get_mut(usize::try_from(index.as_u64()?).ok()?)?;
        *slot = Some(channel_level(level)?);
    }
    let [r, g, b] = channels;
    Some(Rgb::new(r?, g?, b?))
}

use FieldKind::{Bool, Color, Pin, PinList, SetupCode, SpiConfig, Text, U8, U16};
use PinDirection::{Input, Output};

/// The complete field table.
pub static FIELDS: &[FieldSpec] = &[
    field!("deviceName", Misc, Text, Restart, device_name: Text),
    field!("otaPasswd", Misc, Text, Restart, ota_passwd: Text),
    field!("hk_key_color", Misc, U8 { max: 3 }, Restart, hk_key_color: U8),
    field!("setupCode", Misc, SetupCode, SetupCode, setup_code: Text),
    field!("controlPin", Misc, Pin(Input), Restart, control_pin: U8),
    field!("hsStatusPin", Misc, Pin(Output), Restart, hs_status_pin: U8),
    field!("webAuthEnabled", Misc, Bool, Restart, web_auth_enabled: Bool),
    field!("webUsername", Misc, Text, Restart, web_username: Text),
    field!("webPassword", Misc, Text, Restart, web_password: Text),
    field!("nfcGpioPins", Misc, PinList, Restart, nfc_gpio_pins: PinList),
    field!("btrLowStatusThreshold", Misc, U8 { max: 100 }, LowBatteryThreshold, btr_low_status_threshold: U8),
    field!("proxBatEnabled", Misc, Bool, Restart, prox_bat_enabled: Bool),
    field!("ethernetEnabled", Misc, Bool, Restart, ethernet_enabled: Bool),
    field!("ethActivePreset", Misc, U8 { max: 255 }, Restart, eth_active_preset: U8),
    field!("ethPhyType", Misc, U8 { max: 8 }, Restart, eth_phy_type: U8),
    field!("ethSpiConfig", Misc, SpiConfig, Restart, eth_spi_config: SpiConfig),
    field!("lockAlwaysUnlock", Actions, Bool, None, lock_always_unlock: Bool),
    field!("lockAlwaysLock", Actions, Bool, None, lock_always_lock: Bool),
    field!("nfcNeopixelPin", Actions, Pin(Output), OutputPin, nfc_neopixel_pin: U8),
    field!("neoPixelType", Actions, U8 { max: 5 }, PixelType, neo_pixel_type: U8),
    field!("neopixelSuccessColor", Actions, Color, None, neopixel_success_color: Color),
    field!("neopixelFailureColor", Actions, Color, None, neopixel_failure_color: Color),
    field!("neopixelSuccessTime", Actions, U16, None, neopixel_success_time: U16),
    field!("neopixelFailTime", Actions, U16, None, neopixel_fail_time: U16),
    field!("nfcSuccessPin", Actions, Pin(Output), OutputPin, nfc_success_pin: U8),
    field!("nfcSuccessHL", Actions, Bool, None, nfc_success_hl: Bool),
    field!("nfcSuccessTime", Actions, U16, None, nfc_success_time: U16),
    field!("nfcFailPin", Actions, Pin(Output), OutputPin, nfc_fail_pin: U8),
    field!("nfcFailHL", Actions, Bool, None, nfc_fail_hl: Bool),
    field!("nfcFailTime", Actions, U16, None, nfc_fail_time: U16),
    field!("gpioActionPin", Actions, Pin(Output), ActionPin, gpio_action_pin: U8),
    field!("gpioActionLockState", Actions, Bool, None, gpio_action_lock_state: Bool),
    field!("gpioActionUnlockState", Actions, Bool, None, gpio_action_unlock_state: Bool),
    field!("gpioActionMomentaryEnabled", Actions, U8 { max: 3 }, None, gpio_action_momentary_enabled: U8),
    field!("gpioActionMomentaryTimeout", Actions, U16, None, gpio_action_momentary_timeout: U16),
    field!("hkGpioControlledState", Actions, Bool, None, hk_gpio_controlled_state: Bool),
    field!("hkDumbSwitchMode", Actions, Bool, None, hk_dumb_switch_mode: Bool),
    field!("hkAltActionInitPin", Actions, Pin(Input), InputPin, hk_alt_action_init_pin: U8),
    field!("hkAltActionInitLedPin", Actions, Pin(Output), OutputPin, hk_alt_action_init_led_pin: U8),
    field!("hkAltActionInitTimeout", Actions, U16, None, hk_alt_action_init_timeout: U16),
    field!("hkAltActionPin", Actions, Pin(Output), OutputPin, hk_alt_action_pin: U8),
    field!("hkAltActionTimeout", Actions, U16, None, hk_alt_action_timeout: U16),
    field!("hkAltActionGpioState", Actions, Bool, None, hk_alt_action_gpio_state: Bool),
    field!("nfcTagNoPublish", Actions, Bool, None, nfc_tag_no_publish: Bool),
];

/// Row for `name` within `section`.
pub fn lookup(section: Section, name: &str) -> Option<&'static FieldSpec> {
    FIELDS
        .iter()
        .find(|spec| spec.section == section && spec.name == name)
}

/// Every row of `section`, in table order.
pub fn fields_of(section: Section) -> impl Iterator<Item = &'static FieldSpec> {
    FIELDS.iter().filter(move |spec| spec.section == section)
}

#[cfg(test)]
mod tests {
    use super::*;
    use homekey_hardware::mock::MockGpio;
    use rstest::rstest;
    use std::collections::BTreeSet;

    fn parse(name: &str, value: Value, paired: usize) -> Result<FieldValue> {
        let (gpio, _) = MockGpio::new();
        let ctx = ValidationContext {
            gpio: &gpio,
            paired_controllers: paired,
        };
        let spec = FIELDS
            .iter()
            .find(|s| s.name == name)
            .expect("field in table");
        spec.parse(&value, &ctx)
    }

    #[test]
    fn test_table_matches_record() {
        let record = serde_json::to_value(Configuration::default()).unwrap();
        let persisted: BTreeSet<&str> = record
            .as_object()
            .unwrap()
            .keys()
            .map(String::as_str)
            .collect();
        let table: BTreeSet<&str> = FIELDS.iter().map(|s| s.name).collect();
        assert_eq!(persisted, table);
        assert_eq!(table.len(), FIELDS.len());
    }

    #[test]
    fn test_get_matches_serialized_form() {
        let config = Configuration::default();
        let record = serde_json::to_value(&config).unwrap();
        for spec in FIELDS {
            assert_eq!((spec.get)(&config).to_json(), record[spec.name], "{}", spec.name);
        }
    }

    #[test]
    fn test_set_roundtrip() {
        let mut config = Configuration::default();
        let spec = lookup(Section::Actions, "nfcFailTime").unwrap();
        (spec.set)(&mut config, FieldValue::U16(250));
        assert_eq!(config.nfc_fail_time, 250);
        // mismatched variants are ignored
        (spec.set)(&mut config, FieldValue::Bool(true));
        assert_eq!(config.nfc_fail_time, 250);
    }

    #[test]
    fn test_lookup_is_section_scoped() {
        assert!(lookup(Section::Actions, "nfcSuccessPin").is_some());
        assert!(lookup(Section::Misc, "nfcSuccessPin").is_none());
        assert!(lookup(Section::HkInfo, "setupCode").is_none());
        assert_eq!(fields_of(Section::Misc).count() + fields_of(Section::Actions).count(), FIELDS.len());
    }

    #[rstest]
    #[case("lockAlwaysLock", json!(true), FieldValue::Bool(true))]
    #[case("lockAlwaysLock", json!(0), FieldValue::Bool(false))]
    #[case("lockAlwaysLock", json!(1), FieldValue::Bool(true))]
    #[case("nfcSuccessPin", json!(4), FieldValue::U8(4))]
    #[case("nfcSuccessPin", json!(255), FieldValue::U8(255))]
    #[case("hkAltActionInitPin", json!(36), FieldValue::U8(36))]
    #[case("neoPixelType", json!(5), FieldValue::U8(5))]
    #[case("nfcFailTime", json!(65535), FieldValue::U16(65535))]
    #[case("setupCode", json!("12345678"), FieldValue::Text("12345678".into()))]
    #[case("neopixelSuccessColor", json!({"r": 1, "g": 2, "b": 3}), FieldValue::Color(Rgb::new(1, 2, 3)))]
    #[case("neopixelFailureColor", json!([[2, 30], [0, 10], [1, 20]]), FieldValue::Color(Rgb::new(10, 20, 30)))]
    #[case("nfcGpioPins", json!([5, 18, 19, 23]), FieldValue::PinList([5, 18, 19, 23]))]
    #[case("ethSpiConfig", json!([20, -1, -1, -1, -1, -1, -1]), FieldValue::SpiConfig([20, -1, -1, -1, -1, -1, -1]))]
    fn test_accepts(#[case] name: &str, #[case] value: Value, #[case] expected: FieldValue) {
        assert_eq!(parse(name, value, 0).unwrap(), expected);
    }

    #[rstest]
    #[case("lockAlwaysLock", json!("yes"))]
    #[case("nfcSuccessPin", json!("4"))]
    #[case("setupCode", json!(12345678))]
    #[case("nfcGpioPins", json!({"a": 1}))]
    #[case("nfcFailTime", json!(null))]
    fn test_type_mismatch(#[case] name: &str, #[case] value: Value) {
        assert!(matches!(
            parse(name, value, 0),
            Err(ConfigError::UnknownField { field }) if field == name
        ));
    }

    #[rstest]
    #[case("lockAlwaysLock", json!(2))]
    #[case("nfcSuccessPin", json!(0))]
    #[case("nfcSuccessPin", json!(256))]
    #[case("nfcSuccessPin", json!(4.5))]
    #[case("neoPixelType", json!(6))]
    #[case("nfcFailTime", json!(70000))]
    #[case("nfcFailTime", json!(-1))]
    #[case("setupCode", json!("1234567"))]
    #[case("setupCode", json!("1234567a"))]
    #[case("neopixelSuccessColor", json!({"r": 1, "g": 2}))]
    #[case("neopixelSuccessColor", json!([[0, 1], [1, 2]]))]
    #[case("neopixelSuccessColor", json!([[0, 1], [1, 2], [3, 4]]))]
    #[case("neopixelSuccessColor", json!([[0, 1], [1, 2], [2, 256]]))]
    #[case("nfcGpioPins", json!([5, 18, 19]))]
    #[case("ethSpiConfig", json!([200, 0, 0, 0, 0, 0, 0]))]
    fn test_invalid_value(#[case] name: &str, #[case] value: Value) {
        assert!(matches!(
            parse(name, value, 0),
            Err(ConfigError::InvalidValue { .. })
        ));
    }

    #[rstest]
    #[case("nfcSuccessPin", 34)]
    #[case("nfcSuccessPin", 20)]
    #[case("hkAltActionInitPin", 40)]
    fn test_invalid_pin(#[case] name: &str, #[case] pin: u8) {
        assert!(matches!(
            parse(name, json!(pin), 0),
            Err(ConfigError::InvalidPin { .. })
        ));
    }

    #[test]
    fn test_setup_code_locked_when_paired() {
        assert!(matches!(
            parse("setupCode", json!("46637726"), 1),
            Err(ConfigError::SetupCodeLocked)
        ));
    }
}
