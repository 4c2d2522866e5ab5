//! Error types for the bleio library
//!
//! This module defines the errors raised by descriptor construction, value
//! updates and attribute table access.

use thiserror::Error;

/// Errors that can occur when working with descriptor values
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum DescriptorError {
    #[error("{0}")]
    InvalidArgument(String),

    #[error("Value length != required fixed length ({actual} != {expected})")]
    LengthMismatch { expected: usize, actual: usize },

    #[error("Value length > max_length ({actual} > {max_length})")]
    LengthExceeded { max_length: usize, actual: usize },

    #[error("Descriptor already registered with handle 0x{0:04X}")]
    AlreadyRegistered(u16),

    #[error("Invalid handle: 0x{0:04X}")]
    InvalidHandle(u16),

    #[error("Attribute not found")]
    AttributeNotFound,

    #[error("Insufficient resources")]
    InsufficientResources,

    #[error("Read not permitted")]
    ReadNotPermitted,

    #[error("Write not permitted")]
    WriteNotPermitted,

    #[error("Insufficient encryption")]
    InsufficientEncryption,

    #[error("Insufficient authentication")]
    InsufficientAuthentication,
}

impl DescriptorError {
    /// Whether this error comes from a length policy check
    pub fn is_length_error(&self) -> bool {
        matches!(
            self,
            DescriptorError::LengthMismatch { .. } | DescriptorError::LengthExceeded { .. }
        )
    }
}

/// Descriptor result type
pub type DescriptorResult<T> = Result<T, DescriptorError>;
