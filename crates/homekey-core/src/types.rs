use crate::{Result, error::Error};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::ops::Not;

/// Lock mechanism state as exposed through the accessory property store.
///
/// The discriminants match the accessory protocol's integer encoding.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[repr(u8)]
pub enum LockState {
    Unlocked = 0,
    Locked = 1,
    Jammed = 2,
    Unknown = 3,
    Unlocking = 4,
    Locking = 5,
}

impl LockState {
    /// Logical complement used by the toggle policy.
    ///
    /// `Unlocked` becomes `Locked`; every other state (including the
    /// transitional and fault states) becomes `Unlocked`.
    ///
    /// # Examples
    ///
    /// ```
    /// use homekey_core::LockState;
    ///
    /// assert_eq!(LockState::Unlocked.complement(), LockState::Locked);
    /// assert_eq!(LockState::Locked.complement(), LockState::Unlocked);
    /// assert_eq!(LockState::Jammed.complement(), LockState::Unlocked);
    /// ```
    #[must_use]
    pub fn complement(self) -> Self {
        match self {
            LockState::Unlocked => LockState::Locked,
            _ => LockState::Unlocked,
        }
    }

    /// Raw integer value.
    #[must_use]
    pub fn as_u8(self) -> u8 {
        self as u8
    }
}

impl TryFrom<u8> for LockState {
    type Error = Error;

    fn try_from(value: u8) -> Result<Self> {
        match value {
            0 => Ok(LockState::Unlocked),
            1 => Ok(LockState::Locked),
            2 => Ok(LockState::Jammed),
            3 => Ok(LockState::Unknown),
            4 => Ok(LockState::Unlocking),
            5 => Ok(LockState::Locking),
            other => Err(Error::InvalidLockState(other)),
        }
    }
}

impl fmt::Display for LockState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            LockState::Unlocked => "UNLOCKED",
            LockState::Locked => "LOCKED",
            LockState::Jammed => "JAMMED",
            LockState::Unknown => "UNKNOWN",
            LockState::Unlocking => "UNLOCKING",
            LockState::Locking => "LOCKING",
        };
        write!(f, "{}", name)
    }
}

/// Originator of a lock state change request.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[repr(u8)]
pub enum TriggerSource {
    /// Remote controller wrote the target state property.
    App = 1,
    /// Successful card authentication.
    Card = 2,
    /// Internal cause (configuration engine, maintenance).
    Other = 3,
}

impl fmt::Display for TriggerSource {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            TriggerSource::App => write!(f, "app"),
            TriggerSource::Card => write!(f, "card"),
            TriggerSource::Other => write!(f, "other"),
        }
    }
}

/// What a trigger event asks the lock controller to do.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum TriggerAction {
    Toggle,
    /// Reserved cancellation value; terminates the controller task.
    Stop,
}

/// Message consumed by the lock arbitration controller.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct TriggerEvent {
    pub source: TriggerSource,
    pub action: TriggerAction,
}

impl TriggerEvent {
    /// Toggle request from the given source.
    pub fn toggle(source: TriggerSource) -> Self {
        Self {
            source,
            action: TriggerAction::Toggle,
        }
    }

    /// Stop request, always tagged [`TriggerSource::Other`].
    pub fn stop() -> Self {
        Self {
            source: TriggerSource::Other,
            action: TriggerAction::Stop,
        }
    }
}

/// Message consumed by a feedback worker.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum FeedbackEvent {
    Fail,
    Success,
    /// Pulse the alt-action output (indicator worker only).
    AltAction,
    /// Reserved cancellation value; terminates the worker.
    Stop,
}

/// Digital pin level.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Level {
    Low,
    High,
}

impl From<bool> for Level {
    fn from(high: bool) -> Self {
        if high { Level::High } else { Level::Low }
    }
}

impl From<Level> for bool {
    fn from(level: Level) -> Self {
        level == Level::High
    }
}

impl Not for Level {
    type Output = Level;

    fn not(self) -> Level {
        match self {
            Level::Low => Level::High,
            Level::High => Level::Low,
        }
    }
}

/// Electrical direction a pin is programmed for.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum PinDirection {
    Input,
    Output,
}

impl fmt::Display for PinDirection {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            PinDirection::Input => write!(f, "input"),
            PinDirection::Output => write!(f, "output"),
        }
    }
}

/// 8-bit RGB color used by the addressable pixel.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Rgb {
    pub r: u8,
    pub g: u8,
    pub b: u8,
}

impl Rgb {
    pub const fn new(r: u8, g: u8, b: u8) -> Self {
        Self { r, g, b }
    }
}

/// Color channel order of the addressable pixel.
///
/// Indexes follow the persisted `neoPixelType` value.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum PixelType {
    Rgb,
    Rbg,
    Brg,
    Bgr,
    Gbr,
    Grb,
}

impl PixelType {
    /// Channel order as a three-letter string.
    pub fn as_str(&self) -> &'static str {
        match self {
            PixelType::Rgb => "RGB",
            PixelType::Rbg => "RBG",
            PixelType::Brg => "BRG",
            PixelType::Bgr => "BGR",
            PixelType::Gbr => "GBR",
            PixelType::Grb => "GRB",
        }
    }

    /// Reorder a color into wire order for this pixel type.
    ///
    /// # Examples
    ///
    /// ```
    /// use homekey_core::{PixelType, Rgb};
    ///
    /// let color = Rgb::new(1, 2, 3);
    /// assert_eq!(PixelType::Grb.wire_order(color), [2, 1, 3]);
    /// assert_eq!(PixelType::Rgb.wire_order(color), [1, 2, 3]);
    /// ```
    pub fn wire_order(&self, color: Rgb) -> [u8; 3] {
        let Rgb { r, g, b } = color;
        match self {
            PixelType::Rgb => [r, g, b],
            PixelType::Rbg => [r, b, g],
            PixelType::Brg => [b, r, g],
            PixelType::Bgr => [b, g, r],
            PixelType::Gbr => [g, b, r],
            PixelType::Grb => [g, r, b],
        }
    }
}

impl TryFrom<u8> for PixelType {
    type Error = Error;

    fn try_from(value: u8) -> Result<Self> {
        match value {
            0 => Ok(PixelType::Rgb),
            1 => Ok(PixelType::Rbg),
            2 => Ok(PixelType::Brg),
            3 => Ok(PixelType::Bgr),
            4 => Ok(PixelType::Gbr),
            5 => Ok(PixelType::Grb),
            other => Err(Error::InvalidPixelType(other)),
        }
    }
}

/// Hardware finish advertised for the digital key.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum HomeKeyColor {
    Tan,
    Gold,
    Silver,
    Black,
}

impl HomeKeyColor {
    /// TLV payload announced through the accessory information service.
    pub fn finish_tlv(&self) -> [u8; 6] {
        match self {
            HomeKeyColor::Tan => [0x01, 0x04, 0xce, 0xd5, 0xda, 0x00],
            HomeKeyColor::Gold => [0x01, 0x04, 0xaa, 0xd6, 0xec, 0x00],
            HomeKeyColor::Silver => [0x01, 0x04, 0xe3, 0xe3, 0xe3, 0x00],
            HomeKeyColor::Black => [0x01, 0x04, 0x00, 0x00, 0x00, 0x00],
        }
    }
}

impl TryFrom<u8> for HomeKeyColor {
    type Error = Error;

    fn try_from(value: u8) -> Result<Self> {
        match value {
            0 => Ok(HomeKeyColor::Tan),
            1 => Ok(HomeKeyColor::Gold),
            2 => Ok(HomeKeyColor::Silver),
            3 => Ok(HomeKeyColor::Black),
            other => Err(Error::InvalidKeyColor(other)),
        }
    }
}

/// Sources for which the lock auto-relocks after the momentary timeout.
///
/// Bit 0 selects app triggers, bit 1 selects card triggers.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct MomentarySources(u8);

impl MomentarySources {
    pub const DISABLED: Self = Self(0);
    pub const APP: Self = Self(1 << 0);
    pub const CARD: Self = Self(1 << 1);
    pub const APP_AND_CARD: Self = Self((1 << 0) | (1 << 1));

    /// Build from the persisted bitmask, ignoring unknown bits.
    pub fn from_bits(bits: u8) -> Self {
        Self(bits & Self::APP_AND_CARD.0)
    }

    pub fn bits(&self) -> u8 {
        self.0
    }

    /// Whether a trigger from `source` gets the auto-relock behavior.
    ///
    /// # Examples
    ///
    /// ```
    /// use homekey_core::{MomentarySources, TriggerSource};
    ///
    /// let card_only = MomentarySources::CARD;
    /// assert!(card_only.applies_to(TriggerSource::Card));
    /// assert!(!card_only.applies_to(TriggerSource::App));
    /// assert!(!MomentarySources::APP_AND_CARD.applies_to(TriggerSource::Other));
    /// ```
    pub fn applies_to(&self, source: TriggerSource) -> bool {
        match source {
            TriggerSource::App => self.0 & Self::APP.0 != 0,
            TriggerSource::Card => self.0 & Self::CARD.0 != 0,
            TriggerSource::Other => false,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rstest::rstest;

    #[rstest]
    #[case(0, LockState::Unlocked)]
    #[case(1, LockState::Locked)]
    #[case(2, LockState::Jammed)]
    #[case(3, LockState::Unknown)]
    #[case(4, LockState::Unlocking)]
    #[case(5, LockState::Locking)]
    fn test_lock_state_from_u8(#[case] raw: u8, #[case] expected: LockState) {
        assert_eq!(LockState::try_from(raw).unwrap(), expected);
        assert_eq!(expected.as_u8(), raw);
    }

    #[test]
    fn test_lock_state_rejects_out_of_range() {
        assert!(matches!(
            LockState::try_from(6),
            Err(Error::InvalidLockState(6))
        ));
    }

    #[rstest]
    #[case(LockState::Unlocked, LockState::Locked)]
    #[case(LockState::Locked, LockState::Unlocked)]
    #[case(LockState::Unknown, LockState::Unlocked)]
    #[case(LockState::Locking, LockState::Unlocked)]
    fn test_lock_state_complement(#[case] state: LockState, #[case] expected: LockState) {
        assert_eq!(state.complement(), expected);
    }

    #[test]
    fn test_level_conversions() {
        assert_eq!(Level::from(true), Level::High);
        assert_eq!(Level::from(false), Level::Low);
        assert_eq!(!Level::High, Level::Low);
        assert!(bool::from(Level::High));
    }

    #[test]
    fn test_pixel_type_index() {
        assert_eq!(PixelType::try_from(5).unwrap(), PixelType::Grb);
        assert_eq!(PixelType::try_from(0).unwrap().as_str(), "RGB");
        assert!(PixelType::try_from(6).is_err());
    }

    #[test]
    fn test_momentary_sources_ignores_unknown_bits() {
        let sources = MomentarySources::from_bits(0b1111_1110);
        assert_eq!(sources, MomentarySources::CARD);
    }

    #[test]
    fn test_trigger_event_constructors() {
        let toggle = TriggerEvent::toggle(TriggerSource::Card);
        assert_eq!(toggle.action, TriggerAction::Toggle);
        assert_eq!(TriggerEvent::stop().action, TriggerAction::Stop);
    }

    #[test]
    fn test_key_color_tlv() {
        assert_eq!(HomeKeyColor::try_from(3).unwrap().finish_tlv()[2], 0x00);
        assert_eq!(HomeKeyColor::Tan.finish_tlv()[2], 0xce);
    }
}
