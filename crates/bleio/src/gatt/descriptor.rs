//! GATT descriptor value store
//!
//! A [`Descriptor`] owns the current value of one descriptor attribute and
//! enforces its length policy. Reads and writes dispatch on two facts: whether
//! the descriptor has been registered in an attribute table yet, and whether
//! the owning service is hosted locally or mirrored from a remote peer.
//!
//! Remote reads and writes are not supported yet. They need an ATT Read/Write
//! Request exchange on the service's connection, which this crate does not
//! implement; both paths report [`ReadOutcome::RemoteUnsupported`] /
//! [`WriteOutcome::RemoteUnsupported`] instead of touching the peer.

use super::service::Characteristic;
use super::types::{Locality, Uuid};
use crate::att::constants::*;
use crate::att::types::{AttPermissions, Registration, SecurityMode};
use crate::error::{DescriptorError, DescriptorResult};
use log::{debug, trace, warn};
use std::sync::{Arc, PoisonError, RwLock, RwLockReadGuard, RwLockWriteGuard, Weak};

/// Result of a get-value call
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ReadOutcome {
    /// Not attached to an attribute table yet, nothing copied
    Unregistered,
    /// Owning service is remote and remote reads are not implemented, nothing copied
    RemoteUnsupported,
    /// Copied this many bytes from the local value
    Copied(usize),
}

impl ReadOutcome {
    /// Number of bytes written into the destination
    pub fn len(&self) -> usize {
        match self {
            ReadOutcome::Copied(len) => *len,
            ReadOutcome::Unregistered | ReadOutcome::RemoteUnsupported => 0,
        }
    }

    /// Whether nothing was copied
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

/// Result of a successful set-value call
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum WriteOutcome {
    /// The local value was replaced
    Stored,
    /// The local value was replaced but the peer was not written
    RemoteUnsupported,
    /// The commit-time length check failed and the previous value was kept
    Abandoned,
}

/// Construction parameters for a descriptor
///
/// Defaults match the host bindings: 20 byte variable length value, open
/// access in both directions.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DescriptorConfig {
    pub uuid: Uuid,
    pub read_perm: SecurityMode,
    pub write_perm: SecurityMode,
    pub max_length: usize,
    pub fixed_length: bool,
    /// Initial value; `None` means zeros for fixed length, empty otherwise
    pub initial_value: Option<Vec<u8>>,
}

impl DescriptorConfig {
    /// Default configuration for a descriptor with `uuid`
    pub fn new(uuid: Uuid) -> Self {
        Self {
            uuid,
            read_perm: SecurityMode::Open,
            write_perm: SecurityMode::Open,
            max_length: DEFAULT_MAX_LENGTH,
            fixed_length: false,
            initial_value: None,
        }
    }
}

/// A GATT characteristic descriptor
#[derive(Debug)]
pub struct Descriptor {
    /// Descriptor UUID
    uuid: Uuid,
    /// Owning characteristic
    characteristic: Weak<Characteristic>,
    read_perm: SecurityMode,
    write_perm: SecurityMode,
    max_length: usize,
    fixed_length: bool,
    /// Current value, replaced wholesale on every write
    value: RwLock<Vec<u8>>,
    registration: RwLock<Registration>,
}

impl Descriptor {
    /// Create a descriptor for `characteristic` holding `initial_value`
    ///
    /// `max_length` may be at most [`FIXED_ATTR_LEN_MAX`] for fixed length
    /// descriptors and [`VARIABLE_ATTR_LEN_MAX`] otherwise. The initial value
    /// goes through [`Descriptor::set_value`], so it must satisfy the same
    /// length policy as any later write.
    pub fn new(
        characteristic: &Arc<Characteristic>,
        uuid: Uuid,
        read_perm: SecurityMode,
        write_perm: SecurityMode,
        max_length: usize,
        fixed_length: bool,
        initial_value: &[u8],
    ) -> DescriptorResult<Self> {
        check_max_length(max_length, fixed_length)?;

        let descriptor = Self {
            uuid,
            characteristic: Arc::downgrade(characteristic),
            read_perm,
            write_perm,
            max_length,
            fixed_length,
            value: RwLock::new(Vec::new()),
            registration: RwLock::new(Registration::Unregistered),
        };
        descriptor.set_value(initial_value)?;

        Ok(descriptor)
    }

    /// Create a descriptor from a [`DescriptorConfig`]
    pub fn with_config(
        characteristic: &Arc<Characteristic>,
        config: DescriptorConfig,
    ) -> DescriptorResult<Self> {
        // Checked before building the zeroed default so a bad max_length never allocates
        check_max_length(config.max_length, config.fixed_length)?;

        let initial_value = match config.initial_value {
            Some(value) => value,
            None if config.fixed_length => vec![0u8; config.max_length],
            None => Vec::new(),
        };

        Self::new(
            characteristic,
            config.uuid,
            config.read_perm,
            config.write_perm,
            config.max_length,
            config.fixed_length,
            &initial_value,
        )
    }

    /// Descriptor UUID
    pub fn uuid(&self) -> Uuid {
        self.uuid
    }

    /// The owning characteristic, if it is still alive
    pub fn characteristic(&self) -> Option<Arc<Characteristic>> {
        self.characteristic.upgrade()
    }

    pub(crate) fn characteristic_ptr(&self) -> *const Characteristic {
        self.characteristic.as_ptr()
    }

    /// Security mode required for peer reads
    pub fn read_perm(&self) -> SecurityMode {
        self.read_perm
    }

    /// Security mode required for peer writes
    pub fn write_perm(&self) -> SecurityMode {
        self.write_perm
    }

    /// ATT permissions equivalent to the read/write security modes
    pub fn permissions(&self) -> AttPermissions {
        AttPermissions::from_modes(self.read_perm, self.write_perm)
    }

    /// Longest value the descriptor accepts
    pub fn max_length(&self) -> usize {
        self.max_length
    }

    /// Whether every value must be exactly `max_length` bytes
    pub fn fixed_length(&self) -> bool {
        self.fixed_length
    }

    /// Current registration state
    pub fn registration(&self) -> Registration {
        *read_lock(&self.registration)
    }

    /// Attribute handle, if registered
    pub fn handle(&self) -> Option<u16> {
        self.registration().handle()
    }

    /// Record the attribute handle assigned by the attribute table
    ///
    /// Registration happens once; a descriptor never goes back to unregistered.
    pub fn assign_handle(&self, handle: u16) -> DescriptorResult<()> {
        if handle == ATT_HANDLE_INVALID {
            return Err(DescriptorError::InvalidArgument(format!(
                "Invalid attribute handle 0x{:04X}",
                handle
            )));
        }

        let mut registration = write_lock(&self.registration);
        if let Registration::Handle(existing) = *registration {
            return Err(DescriptorError::AlreadyRegistered(existing));
        }
        *registration = Registration::Handle(handle);

        debug!("Descriptor {} registered at handle 0x{:04X}", self.uuid, handle);
        Ok(())
    }

    /// Whether the owning service is local or remote
    ///
    /// A descriptor whose characteristic or service has been dropped resolves
    /// as local, since its own buffer is the only value left.
    pub fn locality(&self) -> Locality {
        self.characteristic
            .upgrade()
            .and_then(|characteristic| characteristic.service())
            .map(|service| service.locality())
            .unwrap_or(Locality::Local)
    }

    /// Copy the current value into `buf`
    ///
    /// Copies `min(buf.len(), value.len())` bytes for a registered local
    /// descriptor. Unregistered descriptors and remote descriptors copy
    /// nothing.
    pub fn get_value(&self, buf: &mut [u8]) -> ReadOutcome {
        let handle = match self.registration() {
            Registration::Unregistered => return ReadOutcome::Unregistered,
            Registration::Handle(handle) => handle,
        };

        match self.locality() {
            Locality::Remote { conn_handle } => {
                // TODO: issue an ATT Read Request on conn_handle and copy the response
                warn!(
                    "Remote read of descriptor 0x{:04X} on connection 0x{:04X} is not supported",
                    handle, conn_handle
                );
                ReadOutcome::RemoteUnsupported
            }
            Locality::Local => {
                let value = read_lock(&self.value);
                let len = buf.len().min(value.len());
                buf[..len].copy_from_slice(&value[..len]);
                trace!("Read {} of {} bytes from descriptor 0x{:04X}", len, value.len(), handle);
                ReadOutcome::Copied(len)
            }
        }
    }

    /// Read the value the way the host bindings do: into a `max_length` buffer
    pub fn value(&self) -> Vec<u8> {
        let mut buf = vec![0u8; self.max_length];
        let len = self.get_value(&mut buf).len();
        buf.truncate(len);
        buf
    }

    /// Copy of the locally stored value, regardless of registration
    pub fn stored_value(&self) -> Vec<u8> {
        read_lock(&self.value).clone()
    }

    /// Replace the value
    ///
    /// Fails with [`DescriptorError::LengthMismatch`] when a fixed length
    /// descriptor gets a value of the wrong size and with
    /// [`DescriptorError::LengthExceeded`] when the value is longer than
    /// `max_length`. The stored value is unchanged on failure.
    pub fn set_value(&self, value: &[u8]) -> DescriptorResult<WriteOutcome> {
        self.check_length(value.len())?;

        let handle = match self.registration() {
            Registration::Unregistered => {
                self.replace_value(value);
                return Ok(WriteOutcome::Stored);
            }
            Registration::Handle(handle) => handle,
        };

        match self.locality() {
            Locality::Remote { conn_handle } => {
                self.replace_value(value);
                // TODO: issue an ATT Write Request on conn_handle
                warn!(
                    "Remote write of descriptor 0x{:04X} on connection 0x{:04X} is not supported",
                    handle, conn_handle
                );
                Ok(WriteOutcome::RemoteUnsupported)
            }
            Locality::Local => {
                // Always written locally, even with no peers connected
                if let Err(err) = self.check_length(value.len()) {
                    warn!("Dropping write to descriptor 0x{:04X}: {}", handle, err);
                    return Ok(WriteOutcome::Abandoned);
                }
                self.replace_value(value);
                Ok(WriteOutcome::Stored)
            }
        }
    }

    fn check_length(&self, len: usize) -> DescriptorResult<()> {
        if self.fixed_length && len != self.max_length {
            return Err(DescriptorError::LengthMismatch {
                expected: self.max_length,
                actual: len,
            });
        }
        if len > self.max_length {
            return Err(DescriptorError::LengthExceeded {
                max_length: self.max_length,
                actual: len,
            });
        }
        Ok(())
    }

    fn replace_value(&self, value: &[u8]) {
        *write_lock(&self.value) = value.to_vec();
        debug!("Descriptor {} value set to {}", self.uuid, hex::encode(value));
    }
}

fn check_max_length(max_length: usize, fixed_length: bool) -> DescriptorResult<()> {
    let ceiling = if fixed_length {
        FIXED_ATTR_LEN_MAX
    } else {
        VARIABLE_ATTR_LEN_MAX
    };
    if max_length > ceiling {
        return Err(DescriptorError::InvalidArgument(format!(
            "max_length must be 0-{} when fixed_length is {}",
            ceiling,
            if fixed_length { "True" } else { "False" }
        )));
    }
    Ok(())
}

fn read_lock<T>(lock: &RwLock<T>) -> RwLockReadGuard<'_, T> {
    lock.read().unwrap_or_else(PoisonError::into_inner)
}

fn write_lock<T>(lock: &RwLock<T>) -> RwLockWriteGuard<'_, T> {
    lock.write().unwrap_or_else(PoisonError::into_inner)
}
