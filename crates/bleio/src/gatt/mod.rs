//! GATT (Generic Attribute Profile) attributes
//!
//! This module provides services, characteristics and the descriptor value
//! store.

pub mod descriptor;
pub mod service;
pub mod types;


pub use descriptor::{Descriptor, DescriptorConfig, ReadOutcome, WriteOutcome};
pub use service::{Characteristic, Service};
pub use types::{CharacteristicProperty, Locality, Uuid, UuidParseError};
