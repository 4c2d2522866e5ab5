//! bleio - GATT descriptor values for Bluetooth LE
//!
//! This library manages the value of GATT descriptor attributes: length
//! policy enforcement at construction and on every write, registration in a
//! local attribute table, and read/write dispatch for descriptors of locally
//! hosted services versus services mirrored from a remote peer.

pub mod att;
pub mod error;
pub mod gatt;

// Re-export common types for convenience
pub use att::{
    AttPermissions, AttributeTable, AttributeTableConfig, Registration, SecurityLevel, SecurityMode,
};
pub use error::{DescriptorError, DescriptorResult};
pub use gatt::{
    Characteristic, CharacteristicProperty, Descriptor, DescriptorConfig, Locality, ReadOutcome,
    Service, Uuid, WriteOutcome,
};
