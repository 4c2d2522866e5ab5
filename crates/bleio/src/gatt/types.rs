//! Common types for GATT attributes
//!
//! This module defines the UUID, property and locality types shared by
//! services, characteristics and descriptors.

use bitflags::bitflags;
use byteorder::{ByteOrder, LittleEndian};
use std::fmt;
use std::str::FromStr;
use thiserror::Error;

/// Bluetooth base UUID 00000000-0000-1000-8000-00805F9B34FB, little-endian
const BASE_UUID_BYTES: [u8; 16] = [
    0xFB, 0x34, 0x9B, 0x5F, 0x80, 0x00, 0x00, 0x80, 0x00, 0x10, 0x00, 0x00, 0x00, 0x00, 0x00, 0x00,
];

/// UUID for GATT attributes
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Uuid {
    /// 16-bit SIG-assigned UUID
    Uuid16(u16),
    /// 128-bit UUID, little-endian
    Uuid128([u8; 16]),
}

impl Uuid {
    /// Convert little-endian bytes to a UUID based on length
    pub fn from_bytes(bytes: &[u8]) -> Option<Self> {
        match bytes.len() {
            2 => Some(Uuid::Uuid16(LittleEndian::read_u16(bytes))),
            16 => {
                let mut uuid = [0u8; 16];
                uuid.copy_from_slice(bytes);
                Some(Uuid::Uuid128(uuid))
            }
            _ => None,
        }
    }

    /// Create a UUID from a 16-bit value
    pub fn from_u16(uuid: u16) -> Self {
        Uuid::Uuid16(uuid)
    }

    /// Create a UUID from a 128-bit value
    pub fn from_u128(uuid: u128) -> Self {
        let mut bytes = [0u8; 16];
        LittleEndian::write_u128(&mut bytes, uuid);
        Uuid::Uuid128(bytes)
    }

    /// Get the little-endian bytes of this UUID
    pub fn as_bytes(&self) -> Vec<u8> {
        match self {
            Uuid::Uuid16(uuid) => uuid.to_le_bytes().to_vec(),
            Uuid::Uuid128(uuid) => uuid.to_vec(),
        }
    }

    /// Get the 16-bit value, including 128-bit UUIDs built on the base UUID
    pub fn as_u16(&self) -> Option<u16> {
        match self {
            Uuid::Uuid16(uuid) => Some(*uuid),
            Uuid::Uuid128(bytes) => {
                if bytes[..12] == BASE_UUID_BYTES[..12] && bytes[14..] == [0, 0] {
                    Some(LittleEndian::read_u16(&bytes[12..14]))
                } else {
                    None
                }
            }
        }
    }

    /// Expand to the full 128-bit little-endian form
    pub fn to_u128_bytes(&self) -> [u8; 16] {
        match self {
            Uuid::Uuid16(uuid) => {
                let mut bytes = BASE_UUID_BYTES;
                LittleEndian::write_u16(&mut bytes[12..14], *uuid);
                bytes
            }
            Uuid::Uuid128(bytes) => *bytes,
        }
    }
}

impl fmt::Display for Uuid {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Uuid::Uuid16(uuid) => write!(f, "{:04x}", uuid),
            Uuid::Uuid128(uuid) => {
                let mut be = *uuid;
                be.reverse();
                let text = hex::encode(be);
                write!(
                    f,
                    "{}-{}-{}-{}-{}",
                    &text[0..8],
                    &text[8..12],
                    &text[12..16],
                    &text[16..20],
                    &text[20..32]
                )
            }
        }
    }
}

/// Error parsing a UUID from text
#[derive(Debug, Clone, PartialEq, Error)]
pub enum UuidParseError {
    #[error("UUID must have 4 or 32 hex digits")]
    InvalidLength,

    #[error("Invalid hex in UUID: {0}")]
    HexError(#[from] hex::FromHexError),
}

impl FromStr for Uuid {
    type Err = UuidParseError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let cleaned: String = s
            .trim_start_matches("0x")
            .chars()
            .filter(|c| *c != '-')
            .collect();

        match cleaned.len() {
            4 => {
                let mut be = [0u8; 2];
                hex::decode_to_slice(&cleaned, &mut be)?;
                Ok(Uuid::Uuid16(u16::from_be_bytes(be)))
            }
            32 => {
                let mut bytes = [0u8; 16];
                hex::decode_to_slice(&cleaned, &mut bytes)?;
                bytes.reverse();
                Ok(Uuid::Uuid128(bytes))
            }
            _ => Err(UuidParseError::InvalidLength),
        }
    }
}

bitflags! {
    /// Characteristic properties as defined in the Bluetooth specification
    #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
    pub struct CharacteristicProperty: u8 {
        const BROADCAST = 0x01;
        const READ = 0x02;
        const WRITE_WITHOUT_RESPONSE = 0x04;
        const WRITE = 0x08;
        const NOTIFY = 0x10;
        const INDICATE = 0x20;
        const AUTHENTICATED_SIGNED_WRITES = 0x40;
        const EXTENDED_PROPERTIES = 0x80;
    }
}

/// Where the authoritative value of a service's attributes lives
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Locality {
    /// This device hosts the GATT server
    Local,
    /// This device is a client of a server across the given connection
    Remote { conn_handle: u16 },
}

impl Locality {
    /// Whether the value lives on a peer
    pub fn is_remote(&self) -> bool {
        matches!(self, Locality::Remote { .. })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_uuid_from_bytes() {
        assert_eq!(Uuid::from_bytes(&[0x01, 0x29]), Some(Uuid::Uuid16(0x2901)));
        assert_eq!(Uuid::from_bytes(&[0x01, 0x29, 0x00]), None);

        let long = Uuid::from_bytes(&[0xAB; 16]).unwrap();
        assert_eq!(long, Uuid::Uuid128([0xAB; 16]));
    }

    #[test]
    fn test_uuid_short_form() {
        let expanded = Uuid::Uuid128(Uuid::from_u16(0x2902).to_u128_bytes());
        assert_eq!(expanded.as_u16(), Some(0x2902));
        assert_eq!(Uuid::from_u128(0x1234).as_u16(), None);
    }

    #[test]
    fn test_uuid_parse_and_display() {
        let short: Uuid = "2901".parse().unwrap();
        assert_eq!(short, Uuid::Uuid16(0x2901));
        assert_eq!(short.to_string(), "2901");

        let text = "6e400001-b5a3-f393-e0a9-e50e24dcca9e";
        let long: Uuid = text.parse().unwrap();
        assert_eq!(long, Uuid::from_u128(0x6e400001_b5a3_f393_e0a9_e50e24dcca9e));
        assert_eq!(long.to_string(), text);

        assert_eq!("12345".parse::<Uuid>(), Err(UuidParseError::InvalidLength));
        assert!(matches!("zz01".parse::<Uuid>(), Err(UuidParseError::HexError(_))));
    }
}
