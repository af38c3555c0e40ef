//! Source catalog entries

use std::fmt;
use std::str::FromStr;

use serde::de::{self, Deserializer};
use serde::Deserialize;

/// Carrier phase information a reference station provides
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash)]
pub enum Carrier {
    /// No carrier phase
    #[default]
    No,
    /// L1 carrier phase
    L1,
    /// L1 and L2 carrier phase
    L1L2,
}

impl Carrier {
    /// Numeric code used in the sourcetable
    pub fn code(self) -> u8 {
        match self {
            Carrier::No => 0,
            Carrier::L1 => 1,
            Carrier::L1L2 => 2,
        }
    }

    /// Inverse of [`Carrier::code`]
    pub fn from_code(code: u8) -> Option<Self> {
        match code {
            0 => Some(Carrier::No),
            1 => Some(Carrier::L1),
            2 => Some(Carrier::L1L2),
            _ => None,
        }
    }
}

impl fmt::Display for Carrier {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Carrier::No => write!(f, "No"),
            Carrier::L1 => write!(f, "L1"),
            Carrier::L1L2 => write!(f, "L1L2"),
        }
    }
}

impl FromStr for Carrier {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "no" | "none" | "0" => Ok(Carrier::No),
            "l1" | "1" => Ok(Carrier::L1),
            "l1l2" | "l1+l2" | "2" => Ok(Carrier::L1L2),
            other => Err(format!("unknown carrier '{}'", other)),
        }
    }
}

// Config files carry the carrier either as its numeric code or by name.
impl<'de> Deserialize<'de> for Carrier {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        #[derive(Deserialize)]
        #[serde(untagged)]
        enum Repr {
            Code(u8),
            Name(String),
        }

        match Repr::deserialize(deserializer)? {
            Repr::Code(code) => Carrier::from_code(code)
                .ok_or_else(|| de::Error::custom(format!("unknown carrier code {}", code))),
            Repr::Name(name) => name.parse().map_err(de::Error::custom),
        }
    }
}

/// One configured mountpoint and the metadata published in the sourcetable
#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub struct SourceEntry {
    /// Mountpoint name (normalized when the catalog is built)
    pub mountpoint: String,
    /// Human-readable station identifier, usually the nearest town
    #[serde(default)]
    pub identifier: String,
    /// Data format, e.g. `RTCM 3.2`
    #[serde(default)]
    pub format: String,
    /// Carrier phase information
    #[serde(default)]
    pub carrier: Carrier,
    /// Navigation systems, e.g. `GPS+GLO`
    #[serde(default)]
    pub nav_system: String,
    /// Network name
    #[serde(default)]
    pub network: String,
    /// Three-letter country code
    #[serde(default)]
    pub country: String,
    /// Latitude in decimal degrees
    #[serde(default)]
    pub latitude: f64,
    /// Longitude in decimal degrees
    #[serde(default)]
    pub longitude: f64,
    /// Whether clients must authenticate to subscribe
    #[serde(default)]
    pub auth_required: bool,
    /// Password the source must present on `SOURCE`
    #[serde(default)]
    pub password: String,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_carrier_codes() {
        for carrier in [Carrier::No, Carrier::L1, Carrier::L1L2] {
            assert_eq!(Carrier::from_code(carrier.code()), Some(carrier));
        }
        assert_eq!(Carrier::from_code(3), None);
    }

    #[test]
    fn test_carrier_from_str() {
        assert_eq!("L1L2".parse::<Carrier>().unwrap(), Carrier::L1L2);
        assert_eq!("none".parse::<Carrier>().unwrap(), Carrier::No);
        assert_eq!("l1".parse::<Carrier>().unwrap(), Carrier::L1);
        assert!("L5".parse::<Carrier>().is_err());
    }

    #[test]
    fn test_carrier_deserialize_code_or_name() {
        let by_code: Carrier = serde_json::from_str("2").unwrap();
        let by_name: Carrier = serde_json::from_str("\"L1\"").unwrap();

        assert_eq!(by_code, Carrier::L1L2);
        assert_eq!(by_name, Carrier::L1);
        assert!(serde_json::from_str::<Carrier>("7").is_err());
    }

    #[test]
    fn test_source_entry_deserialize() {
        let json = r#"{
            "Mountpoint": "/TEST1",
            "Identifier": "Test Station",
            "Format": "RTCM 3",
            "Carrier": 2,
            "NavSystem": "GPS",
            "Network": "NET",
            "Country": "NLD",
            "Latitude": 52.0,
            "Longitude": 4.0,
            "AuthRequired": true,
            "Password": "secret"
        }"#;
        let entry: SourceEntry = serde_json::from_str(json).unwrap();

        assert_eq!(entry.mountpoint, "/TEST1");
        assert_eq!(entry.carrier, Carrier::L1L2);
        assert_eq!(entry.nav_system, "GPS");
        assert!(entry.auth_required);
    }
}
