//! Attribute Protocol (ATT) pieces needed by hosted descriptors
//!
//! This module provides handle and length constants, attribute permissions
//! and the local attribute table that assigns handles to descriptors.

pub mod constants;
pub mod table;
pub mod types;

// Re-export the public API
pub use self::constants::*;
pub use self::table::{AttributeTable, AttributeTableConfig};
pub use self::types::{AttPermissions, Registration, SecurityLevel, SecurityMode};
