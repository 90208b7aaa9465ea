//! Catalogue of supported Ethernet chips and board presets.

use serde::Serialize;

/// Ethernet PHY / MAC chip family.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
#[repr(u8)]
pub enum PhyType {
    Lan8720 = 0,
    Tlk110 = 1,
    Rtl8201 = 2,
    Dp83848 = 3,
    Ksz8041 = 4,
    Ksz8081 = 5,
    Dm9051 = 6,
    W5500 = 7,
    Ksz8851 = 8,
}

impl PhyType {
    pub const ALL: [PhyType; 9] = [
        PhyType::Lan8720,
        PhyType::Tlk110,
        PhyType::Rtl8201,
        PhyType::Dp83848,
        PhyType::Ksz8041,
        PhyType::Ksz8081,
        PhyType::Dm9051,
        PhyType::W5500,
        PhyType::Ksz8851,
    ];

    pub fn name(&self) -> &'static str {
        match self {
            PhyType::Lan8720 => "LAN8720",
            PhyType::Tlk110 => "TLK110",
            PhyType::Rtl8201 => "RTL8201",
            PhyType::Dp83848 => "DP83848",
            PhyType::Ksz8041 => "KSZ8041",
            PhyType::Ksz8081 => "KSZ8081",
            PhyType::Dm9051 => "DM9051",
            PhyType::W5500 => "W5500",
            PhyType::Ksz8851 => "KSZ8851",
        }
    }

    /// Whether the chip hangs off the internal EMAC (RMII) rather than SPI.
    pub fn is_emac(&self) -> bool {
        *self <= PhyType::Ksz8081
    }
}

impl Serialize for PhyType {
    fn serialize<S: serde::Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_u8(*self as u8)
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct EthChip {
    pub name: &'static str,
    pub emac: bool,
    pub phy_type: PhyType,
}

impl From<PhyType> for EthChip {
    fn from(phy_type: PhyType) -> Self {
        Self {
            name: phy_type.name(),
            emac: phy_type.is_emac(),
            phy_type,
        }
    }
}

/// RMII reference clock source.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[repr(u8)]
pub enum ClockMode {
    Gpio0In = 0,
    Gpio0Out = 1,
    Gpio16Out = 2,
    Gpio17Out = 3,
}

impl Serialize for ClockMode {
    fn serialize<S: serde::Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_u8(*self as u8)
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct RmiiConf {
    pub phy_addr: i32,
    pub pin_mcd: u8,
    pub pin_mdio: u8,
    pub pin_power: i8,
    pub pin_rmii_clock: ClockMode,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct SpiConf {
    pub spi_freq_mhz: u8,
    pub pin_cs: u8,
    pub pin_irq: u8,
    pub pin_rst: u8,
    pub pin_sck: u8,
    pub pin_miso: u8,
    pub pin_mosi: u8,
}

/// Named board wiring. EMAC boards carry `rmii_conf`, SPI boards `spi_conf`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct BoardPreset {
    pub name: &'static str,
    #[serde(rename = "ethChip")]
    pub eth_chip: EthChip,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub rmii_conf: Option<RmiiConf>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub spi_conf: Option<SpiConf>,
}

impl BoardPreset {
    fn rmii(name: &'static str, chip: PhyType, conf: RmiiConf) -> Self {
        Self {
            name,
            eth_chip: chip.into(),
            rmii_conf: Some(conf),
            spi_conf: None,
        }
    }

    fn spi(name: &'static str, chip: PhyType, conf: SpiConf) -> Self {
        Self {
            name,
            eth_chip: chip.into(),
            rmii_conf: None,
            spi_conf: Some(conf),
        }
    }
}

const fn rmii(phy_addr: i32, pin_power: i8, clock: ClockMode) -> RmiiConf {
    RmiiConf {
        phy_addr,
        pin_mcd: 23,
        pin_mdio: 18,
        pin_power,
        pin_rmii_clock: clock,
    }
}

pub fn board_presets() -> Vec<BoardPreset> {
    vec![
        BoardPreset::spi(
            "Generic W5500",
            PhyType::W5500,
            SpiConf {
                spi_freq_mhz: 20,
                pin_cs: 5,
                pin_irq: 39,
                pin_rst: 32,
                pin_sck: 18,
                pin_miso: 19,
                pin_mosi: 23,
            },
        ),
        BoardPreset::spi(
            "T-ETH-Lite-ESP32S3",
            PhyType::W5500,
            SpiConf {
                spi_freq_mhz: 20,
                pin_cs: 9,
                pin_irq: 13,
                pin_rst: 14,
                pin_sck: 10,
                pin_miso: 11,
                pin_mosi: 12,
            },
        ),
        BoardPreset::rmii("WT32-ETH01", PhyType::Lan8720, rmii(1, 16, ClockMode::Gpio0In)),
        BoardPreset::rmii(
            "Olimex ESP32-POE",
            PhyType::Lan8720,
            rmii(0, 12, ClockMode::Gpio17Out),
        ),
        BoardPreset::rmii("EST-PoE-32", PhyType::Lan8720, rmii(0, 12, ClockMode::Gpio17Out)),
        BoardPreset::rmii(
            "T-ETH-Lite-ESP32",
            PhyType::Rtl8201,
            rmii(0, 12, ClockMode::Gpio0In),
        ),
    ]
}

/// Ethernet support view served next to the `misc` section.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct EthernetInfo {
    pub supported_chips: Vec<EthChip>,
    pub board_presets: Vec<BoardPreset>,
    pub eth_enabled: bool,
}

impl EthernetInfo {
    pub fn new(eth_enabled: bool) -> Self {
        Self {
            supported_chips: PhyType::ALL.into_iter().map(EthChip::from).collect(),
            board_presets: board_presets(),
            eth_enabled,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_chip_catalogue() {
        let info = EthernetInfo::new(false);
        assert_eq!(info.supported_chips.len(), 9);
        assert!(info.supported_chips[0].emac);
        assert!(!EthChip::from(PhyType::W5500).emac);
        assert_eq!(EthChip::from(PhyType::Ksz8851).phy_type as u8, 8);
    }

    #[test]
    fn test_preset_serializes_one_wiring() {
        let presets = serde_json::to_value(board_presets()).unwrap();
        assert_eq!(
            presets[0],
            json!({
                "name": "Generic W5500",
                "ethChip": {"name": "W5500", "emac": false, "phy_type": 7},
                "spi_conf": {
                    "spi_freq_mhz": 20, "pin_cs": 5, "pin_irq": 39, "pin_rst": 32,
                    "pin_sck": 18, "pin_miso": 19, "pin_mosi": 23
                }
            })
        );
        assert_eq!(
            presets[2]["rmii_conf"],
            json!({"phy_addr": 1, "pin_mcd": 23, "pin_mdio": 18, "pin_power": 16, "pin_rmii_clock": 0})
        );
        assert!(presets[2].get("spi_conf").is_none());
    }

    #[test]
    fn test_info_shape() {
        let value = serde_json::to_value(EthernetInfo::new(true)).unwrap();
        assert_eq!(value["ethEnabled"], json!(true));
        assert_eq!(value["boardPresets"].as_array().unwrap().len(), 6);
        assert_eq!(value["supportedChips"][2]["name"], json!("RTL8201"));
    }
}
