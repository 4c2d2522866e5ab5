//! Type definitions for attribute access control and registration
use super::constants::*;
use crate::error::{DescriptorError, DescriptorResult};
use bitflags::bitflags;
use std::convert::TryFrom;
use std::fmt;

/// Security level of the link a request arrived on
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum SecurityLevel {
    /// No security (unencrypted)
    None,
    /// Encryption without authentication
    EncryptionOnly,
    /// Encryption with authentication
    EncryptionWithAuthentication,
    /// Secure Connections with encryption and authentication
    SecureConnections,
}

/// Access requirement attached to one direction (read or write) of an attribute
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum SecurityMode {
    /// Never accessible to a peer
    NoAccess,
    /// Accessible on any link
    #[default]
    Open,
    /// Requires an encrypted link
    EncryptionNoMitm,
    /// Requires an encrypted and authenticated link
    EncryptionWithMitm,
    /// Requires an LE Secure Connections link
    LescEncryptionWithMitm,
    /// Signed data, unauthenticated signing key
    SignedNoMitm,
    /// Signed data, authenticated signing key
    SignedWithMitm,
}

impl SecurityMode {
    /// Raw security mode code as used by the host bindings
    pub fn code(&self) -> u8 {
        match self {
            SecurityMode::NoAccess => SEC_MODE_NO_ACCESS,
            SecurityMode::Open => SEC_MODE_OPEN,
            SecurityMode::EncryptionNoMitm => SEC_MODE_ENC_NO_MITM,
            SecurityMode::EncryptionWithMitm => SEC_MODE_ENC_WITH_MITM,
            SecurityMode::LescEncryptionWithMitm => SEC_MODE_LESC_ENC_WITH_MITM,
            SecurityMode::SignedNoMitm => SEC_MODE_SIGNED_NO_MITM,
            SecurityMode::SignedWithMitm => SEC_MODE_SIGNED_WITH_MITM,
        }
    }

    /// Minimum link security level needed, or `None` if access is never allowed
    pub fn required_level(&self) -> Option<SecurityLevel> {
        match self {
            SecurityMode::NoAccess => None,
            SecurityMode::Open => Some(SecurityLevel::None),
            SecurityMode::EncryptionNoMitm => Some(SecurityLevel::EncryptionOnly),
            SecurityMode::EncryptionWithMitm => Some(SecurityLevel::EncryptionWithAuthentication),
            SecurityMode::LescEncryptionWithMitm => Some(SecurityLevel::SecureConnections),
            // The signature, not the link, carries the protection
            SecurityMode::SignedNoMitm | SecurityMode::SignedWithMitm => Some(SecurityLevel::None),
        }
    }

    /// Whether this mode relies on signed writes
    pub fn is_signed(&self) -> bool {
        matches!(self, SecurityMode::SignedNoMitm | SecurityMode::SignedWithMitm)
    }
}

impl TryFrom<u8> for SecurityMode {
    type Error = DescriptorError;

    fn try_from(code: u8) -> Result<Self, Self::Error> {
        match code {
            SEC_MODE_NO_ACCESS => Ok(SecurityMode::NoAccess),
            SEC_MODE_OPEN => Ok(SecurityMode::Open),
            SEC_MODE_ENC_NO_MITM => Ok(SecurityMode::EncryptionNoMitm),
            SEC_MODE_ENC_WITH_MITM => Ok(SecurityMode::EncryptionWithMitm),
            SEC_MODE_LESC_ENC_WITH_MITM => Ok(SecurityMode::LescEncryptionWithMitm),
            SEC_MODE_SIGNED_NO_MITM => Ok(SecurityMode::SignedNoMitm),
            SEC_MODE_SIGNED_WITH_MITM => Ok(SecurityMode::SignedWithMitm),
            _ => Err(DescriptorError::InvalidArgument(format!(
                "Invalid security mode: 0x{:02X}",
                code
            ))),
        }
    }
}

bitflags! {
    /// ATT permission flags derived from a read/write security mode pair
    #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
    pub struct AttPermissions: u16 {
        const READ = 0x0001;
        const WRITE = 0x0002;
        const READ_ENCRYPTED = 0x0004;
        const WRITE_ENCRYPTED = 0x0008;
        const READ_AUTHENTICATED = 0x0010;
        const WRITE_AUTHENTICATED = 0x0020;
        const READ_SECURE_CONNECTIONS = 0x0040;
        const WRITE_SECURE_CONNECTIONS = 0x0080;
        const WRITE_SIGNED = 0x0100;
    }
}

impl AttPermissions {
    /// Build permissions from the read and write security modes of an attribute
    pub fn from_modes(read: SecurityMode, write: SecurityMode) -> Self {
        let mut perms = AttPermissions::empty();

        match read.required_level() {
            None => {}
            Some(level) => {
                perms |= AttPermissions::READ;
                if level >= SecurityLevel::EncryptionOnly {
                    perms |= AttPermissions::READ_ENCRYPTED;
                }
                if level >= SecurityLevel::EncryptionWithAuthentication {
                    perms |= AttPermissions::READ_AUTHENTICATED;
                }
                if level >= SecurityLevel::SecureConnections {
                    perms |= AttPermissions::READ_SECURE_CONNECTIONS;
                }
            }
        }

        match write.required_level() {
            None => {}
            Some(level) => {
                perms |= AttPermissions::WRITE;
                if write.is_signed() {
                    perms |= AttPermissions::WRITE_SIGNED;
                }
                if level >= SecurityLevel::EncryptionOnly {
                    perms |= AttPermissions::WRITE_ENCRYPTED;
                }
                if level >= SecurityLevel::EncryptionWithAuthentication {
                    perms |= AttPermissions::WRITE_AUTHENTICATED;
                }
                if level >= SecurityLevel::SecureConnections {
                    perms |= AttPermissions::WRITE_SECURE_CONNECTIONS;
                }
            }
        }

        perms
    }

    /// Get required security level for reading
    pub fn read_security_level(&self) -> SecurityLevel {
        if self.contains(AttPermissions::READ_SECURE_CONNECTIONS) {
            SecurityLevel::SecureConnections
        } else if self.contains(AttPermissions::READ_AUTHENTICATED) {
            SecurityLevel::EncryptionWithAuthentication
        } else if self.contains(AttPermissions::READ_ENCRYPTED) {
            SecurityLevel::EncryptionOnly
        } else {
            SecurityLevel::None
        }
    }

    /// Get required security level for writing
    pub fn write_security_level(&self) -> SecurityLevel {
        if self.contains(AttPermissions::WRITE_SECURE_CONNECTIONS) {
            SecurityLevel::SecureConnections
        } else if self.contains(AttPermissions::WRITE_AUTHENTICATED) {
            SecurityLevel::EncryptionWithAuthentication
        } else if self.contains(AttPermissions::WRITE_ENCRYPTED) {
            SecurityLevel::EncryptionOnly
        } else {
            SecurityLevel::None
        }
    }

    /// Check that a peer on a link with `level` may read
    pub fn check_read(&self, level: SecurityLevel) -> DescriptorResult<()> {
        if !self.contains(AttPermissions::READ) {
            return Err(DescriptorError::ReadNotPermitted);
        }
        Self::check_level(self.read_security_level(), level)
    }

    /// Check that a peer on a link with `level` may write
    pub fn check_write(&self, level: SecurityLevel) -> DescriptorResult<()> {
        if !self.contains(AttPermissions::WRITE) {
            return Err(DescriptorError::WriteNotPermitted);
        }
        Self::check_level(self.write_security_level(), level)
    }

    fn check_level(required: SecurityLevel, actual: SecurityLevel) -> DescriptorResult<()> {
        if actual >= required {
            Ok(())
        } else if required >= SecurityLevel::EncryptionWithAuthentication {
            Err(DescriptorError::InsufficientAuthentication)
        } else {
            Err(DescriptorError::InsufficientEncryption)
        }
    }
}

/// Registration state of an attribute in a live attribute table
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum Registration {
    /// Not yet attached to an attribute table
    #[default]
    Unregistered,
    /// Attached with the given attribute handle
    Handle(u16),
}

impl Registration {
    /// Map a raw handle, treating `ATT_HANDLE_INVALID` as unregistered
    pub fn from_raw(handle: u16) -> Self {
        if handle == ATT_HANDLE_INVALID {
            Registration::Unregistered
        } else {
            Registration::Handle(handle)
        }
    }

    /// Raw handle value, `ATT_HANDLE_INVALID` when unregistered
    pub fn raw(&self) -> u16 {
        match self {
            Registration::Unregistered => ATT_HANDLE_INVALID,
            Registration::Handle(handle) => *handle,
        }
    }

    /// Attribute handle, if registered
    pub fn handle(&self) -> Option<u16> {
        match self {
            Registration::Unregistered => None,
            Registration::Handle(handle) => Some(*handle),
        }
    }

    /// Whether a handle has been assigned
    pub fn is_registered(&self) -> bool {
        matches!(self, Registration::Handle(_))
    }
}

impl fmt::Display for Registration {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Registration::Unregistered => write!(f, "unregistered"),
            Registration::Handle(handle) => write!(f, "0x{:04X}", handle),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_security_mode_codes() {
        for mode in [
            SecurityMode::NoAccess,
            SecurityMode::Open,
            SecurityMode::EncryptionNoMitm,
            SecurityMode::EncryptionWithMitm,
            SecurityMode::LescEncryptionWithMitm,
            SecurityMode::SignedNoMitm,
            SecurityMode::SignedWithMitm,
        ] {
            assert_eq!(SecurityMode::try_from(mode.code()), Ok(mode));
        }

        assert!(matches!(
            SecurityMode::try_from(0x13),
            Err(DescriptorError::InvalidArgument(_))
        ));
    }

    #[test]
    fn test_open_permissions() {
        let perms = AttPermissions::from_modes(SecurityMode::Open, SecurityMode::Open);
        assert_eq!(perms, AttPermissions::READ | AttPermissions::WRITE);
        assert!(perms.check_read(SecurityLevel::None).is_ok());
        assert!(perms.check_write(SecurityLevel::None).is_ok());
    }

    #[test]
    fn test_no_access_permissions() {
        let perms = AttPermissions::from_modes(SecurityMode::NoAccess, SecurityMode::NoAccess);
        assert!(perms.is_empty());
        assert_eq!(
            perms.check_read(SecurityLevel::SecureConnections),
            Err(DescriptorError::ReadNotPermitted)
        );
        assert_eq!(
            perms.check_write(SecurityLevel::SecureConnections),
            Err(DescriptorError::WriteNotPermitted)
        );
    }

    #[test]
    fn test_encrypted_permissions() {
        let perms = AttPermissions::from_modes(
            SecurityMode::EncryptionNoMitm,
            SecurityMode::EncryptionWithMitm,
        );

        assert_eq!(
            perms.check_read(SecurityLevel::None),
            Err(DescriptorError::InsufficientEncryption)
        );
        assert!(perms.check_read(SecurityLevel::EncryptionOnly).is_ok());

        assert_eq!(
            perms.check_write(SecurityLevel::EncryptionOnly),
            Err(DescriptorError::InsufficientAuthentication)
        );
        assert!(perms.check_write(SecurityLevel::EncryptionWithAuthentication).is_ok());
    }

    #[test]
    fn test_signed_write_permissions() {
        let perms = AttPermissions::from_modes(SecurityMode::Open, SecurityMode::SignedNoMitm);
        assert!(perms.contains(AttPermissions::WRITE_SIGNED));
        assert!(perms.check_write(SecurityLevel::None).is_ok());
    }

    #[test]
    fn test_registration_raw() {
        assert_eq!(Registration::from_raw(ATT_HANDLE_INVALID), Registration::Unregistered);
        assert_eq!(Registration::from_raw(0x0010), Registration::Handle(0x0010));
        assert_eq!(Registration::Unregistered.raw(), ATT_HANDLE_INVALID);
        assert_eq!(Registration::Handle(0x0010).handle(), Some(0x0010));
        assert!(!Registration::default().is_registered());
    }
}
