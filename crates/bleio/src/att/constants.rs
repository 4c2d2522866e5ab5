//! ATT constants used by descriptor attributes

// ATT handle values
pub const ATT_HANDLE_INVALID: u16 = 0x0000;
pub const ATT_HANDLE_MIN: u16 = 0x0001;
pub const ATT_HANDLE_MAX: u16 = 0xFFFF;

// Attribute value length ceilings
/// Longest value a fixed length attribute may hold
pub const FIXED_ATTR_LEN_MAX: usize = 510;
/// Longest value a variable length attribute may hold
pub const VARIABLE_ATTR_LEN_MAX: usize = 512;

/// Default `max_length` for a descriptor when none is given
pub const DEFAULT_MAX_LENGTH: usize = 20;

// Security mode codes (level << 4 | mode)
pub const SEC_MODE_NO_ACCESS: u8 = 0x00;
pub const SEC_MODE_OPEN: u8 = 0x11;
pub const SEC_MODE_ENC_NO_MITM: u8 = 0x21;
pub const SEC_MODE_ENC_WITH_MITM: u8 = 0x31;
pub const SEC_MODE_LESC_ENC_WITH_MITM: u8 = 0x41;
pub const SEC_MODE_SIGNED_NO_MITM: u8 = 0x12;
pub const SEC_MODE_SIGNED_WITH_MITM: u8 = 0x22;

// Well-known descriptor UUIDs
pub const CHAR_EXTENDED_PROPS_UUID: u16 = 0x2900;
pub const CHAR_USER_DESC_UUID: u16 = 0x2901;
pub const CLIENT_CHAR_CONFIG_UUID: u16 = 0x2902;
pub const SERVER_CHAR_CONFIG_UUID: u16 = 0x2903;
pub const CHAR_FORMAT_UUID: u16 = 0x2904;
pub const CHAR_AGGREGATE_FORMAT_UUID: u16 = 0x2905;
