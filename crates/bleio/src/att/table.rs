//! Local attribute table for hosted descriptors
//!
//! The table hands out attribute handles to descriptors of local services and
//! routes peer reads and writes to them after checking permissions.
use super::constants::*;
use super::types::SecurityLevel;
use crate::error::{DescriptorError, DescriptorResult};
use crate::gatt::descriptor::{Descriptor, WriteOutcome};
use log::debug;
use std::collections::BTreeMap;
use std::sync::{Arc, PoisonError, RwLock, Weak};

/// Attribute table configuration
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct AttributeTableConfig {
    /// First handle handed out
    pub start_handle: u16,
    /// Last handle that may be handed out
    pub end_handle: u16,
}

impl Default for AttributeTableConfig {
    fn default() -> Self {
        Self {
            start_handle: ATT_HANDLE_MIN,
            end_handle: ATT_HANDLE_MAX,
        }
    }
}

/// Attribute table
#[derive(Debug)]
pub struct AttributeTable {
    config: AttributeTableConfig,
    /// Map of handles to descriptors; the characteristic owns them
    attributes: RwLock<BTreeMap<u16, Weak<Descriptor>>>,
    /// Next available handle, `None` once the range is used up
    next_handle: RwLock<Option<u16>>,
}

impl Default for AttributeTable {
    fn default() -> Self {
        Self::new()
    }
}

impl AttributeTable {
    /// Create a new empty attribute table
    pub fn new() -> Self {
        Self::with_config(AttributeTableConfig::default())
    }

    /// Create a table handing out handles from `config`'s range
    pub fn with_config(config: AttributeTableConfig) -> Self {
        let first = if config.start_handle == ATT_HANDLE_INVALID {
            ATT_HANDLE_MIN
        } else {
            config.start_handle
        };
        let next_handle = (first <= config.end_handle).then_some(first);

        Self {
            config,
            attributes: RwLock::new(BTreeMap::new()),
            next_handle: RwLock::new(next_handle),
        }
    }

    /// Get the table configuration
    pub fn config(&self) -> AttributeTableConfig {
        self.config
    }

    /// Register a descriptor of a local service, returning its new handle
    pub fn add_descriptor(&self, descriptor: &Arc<Descriptor>) -> DescriptorResult<u16> {
        if descriptor.locality().is_remote() {
            return Err(DescriptorError::InvalidArgument(format!(
                "Descriptor {} belongs to a remote service",
                descriptor.uuid()
            )));
        }
        if let Some(handle) = descriptor.handle() {
            return Err(DescriptorError::AlreadyRegistered(handle));
        }

        let mut next_handle = self.next_handle.write().unwrap_or_else(PoisonError::into_inner);
        let handle = next_handle.ok_or(DescriptorError::InsufficientResources)?;

        descriptor.assign_handle(handle)?;
        let mut attributes = self.attributes.write().unwrap_or_else(PoisonError::into_inner);
        attributes.retain(|_, entry| entry.strong_count() > 0);
        attributes.insert(handle, Arc::downgrade(descriptor));
        drop(attributes);

        *next_handle = if handle < self.config.end_handle {
            Some(handle + 1)
        } else {
            None
        };

        debug!("Attribute table: descriptor {} at 0x{:04X}", descriptor.uuid(), handle);
        Ok(handle)
    }

    fn lookup(&self, handle: u16) -> DescriptorResult<Arc<Descriptor>> {
        let live = {
            let attributes = self.attributes.read().unwrap_or_else(PoisonError::into_inner);
            attributes
                .get(&handle)
                .ok_or(DescriptorError::InvalidHandle(handle))?
                .upgrade()
        };

        match live {
            Some(descriptor) => Ok(descriptor),
            None => {
                // Owner dropped the descriptor; forget the handle
                let mut attributes = self.attributes.write().unwrap_or_else(PoisonError::into_inner);
                if attributes.get(&handle).is_some_and(|entry| entry.strong_count() == 0) {
                    attributes.remove(&handle);
                    debug!("Attribute table: pruned dropped descriptor at 0x{:04X}", handle);
                }
                Err(DescriptorError::AttributeNotFound)
            }
        }
    }

    /// Read an attribute value on behalf of a peer
    pub fn read_by_handle(
        &self,
        handle: u16,
        security_level: SecurityLevel,
    ) -> DescriptorResult<Vec<u8>> {
        let descriptor = self.lookup(handle)?;
        descriptor.permissions().check_read(security_level)?;

        Ok(descriptor.value())
    }

    /// Write an attribute value on behalf of a peer
    pub fn write_by_handle(
        &self,
        handle: u16,
        value: &[u8],
        security_level: SecurityLevel,
    ) -> DescriptorResult<WriteOutcome> {
        let descriptor = self.lookup(handle)?;
        descriptor.permissions().check_write(security_level)?;

        descriptor.set_value(value)
    }

    /// Check if a live attribute exists at `handle`
    pub fn has_attribute(&self, handle: u16) -> bool {
        self.attributes
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .get(&handle)
            .is_some_and(|entry| entry.strong_count() > 0)
    }

    /// Remove an attribute by handle
    ///
    /// The descriptor keeps its handle; handles are never reused.
    pub fn remove_attribute(&self, handle: u16) -> DescriptorResult<()> {
        let mut attributes = self.attributes.write().unwrap_or_else(PoisonError::into_inner);

        if attributes.remove(&handle).is_none() {
            return Err(DescriptorError::AttributeNotFound);
        }
        Ok(())
    }

    /// Number of live attributes in the table
    pub fn len(&self) -> usize {
        self.attributes
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .values()
            .filter(|entry| entry.strong_count() > 0)
            .count()
    }

    /// Check if the table holds no live attributes
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::att::types::SecurityMode;
    use crate::gatt::{CharacteristicProperty, DescriptorConfig, Service, Uuid};

    fn local_descriptor(service: &Arc<Service>, config: DescriptorConfig) -> Arc<Descriptor> {
        let characteristic =
            service.add_characteristic(Uuid::from_u16(0x2A19), CharacteristicProperty::READ);
        characteristic.create_descriptor(config).unwrap()
    }

    #[test]
    fn test_handles_are_sequential() {
        let service = Service::new_local(Uuid::from_u16(0x180F));
        let table = AttributeTable::new();

        let first = local_descriptor(&service, DescriptorConfig::new(Uuid::from_u16(0x2901)));
        let second = local_descriptor(&service, DescriptorConfig::new(Uuid::from_u16(0x2904)));

        assert_eq!(table.add_descriptor(&first), Ok(ATT_HANDLE_MIN));
        assert_eq!(table.add_descriptor(&second), Ok(ATT_HANDLE_MIN + 1));
        assert_eq!(first.handle(), Some(ATT_HANDLE_MIN));
        assert_eq!(table.len(), 2);
        assert!(table.has_attribute(ATT_HANDLE_MIN + 1));
    }

    #[test]
    fn test_add_twice_fails() {
        let service = Service::new_local(Uuid::from_u16(0x180F));
        let table = AttributeTable::new();
        let descriptor = local_descriptor(&service, DescriptorConfig::new(Uuid::from_u16(0x2901)));

        let handle = table.add_descriptor(&descriptor).unwrap();
        assert_eq!(
            table.add_descriptor(&descriptor),
            Err(DescriptorError::AlreadyRegistered(handle))
        );
    }

    #[test]
    fn test_remote_descriptor_rejected() {
        let service = Service::new_remote(Uuid::from_u16(0x180F), 0x0040);
        let table = AttributeTable::new();
        let descriptor = local_descriptor(&service, DescriptorConfig::new(Uuid::from_u16(0x2901)));

        assert!(matches!(
            table.add_descriptor(&descriptor),
            Err(DescriptorError::InvalidArgument(_))
        ));
        assert!(table.is_empty());
        assert_eq!(descriptor.handle(), None);
    }

    #[test]
    fn test_handle_range_exhausted() {
        let service = Service::new_local(Uuid::from_u16(0x180F));
        let table = AttributeTable::with_config(AttributeTableConfig {
            start_handle: 0x0010,
            end_handle: 0x0011,
        });

        for expected in [0x0010, 0x0011] {
            let d = local_descriptor(&service, DescriptorConfig::new(Uuid::from_u16(0x2901)));
            assert_eq!(table.add_descriptor(&d), Ok(expected));
        }

        let d = local_descriptor(&service, DescriptorConfig::new(Uuid::from_u16(0x2901)));
        assert_eq!(table.add_descriptor(&d), Err(DescriptorError::InsufficientResources));
        assert_eq!(d.handle(), None);
    }

    #[test]
    fn test_peer_read_write() {
        let service = Service::new_local(Uuid::from_u16(0x180F));
        let table = AttributeTable::new();
        let descriptor = local_descriptor(
            &service,
            DescriptorConfig {
                initial_value: Some(b"Battery".to_vec()),
                ..DescriptorConfig::new(Uuid::from_u16(0x2901))
            },
        );
        let handle = table.add_descriptor(&descriptor).unwrap();

        assert_eq!(table.read_by_handle(handle, SecurityLevel::None).unwrap(), b"Battery");
        assert_eq!(
            table.write_by_handle(handle, b"Cell", SecurityLevel::None),
            Ok(WriteOutcome::Stored)
        );
        assert_eq!(table.read_by_handle(handle, SecurityLevel::None).unwrap(), b"Cell");

        let too_long = [0u8; DEFAULT_MAX_LENGTH + 1];
        assert!(matches!(
            table.write_by_handle(handle, &too_long, SecurityLevel::None),
            Err(DescriptorError::LengthExceeded { .. })
        ));
    }

    #[test]
    fn test_peer_access_checks_permissions() {
        let service = Service::new_local(Uuid::from_u16(0x180F));
        let table = AttributeTable::new();
        let descriptor = local_descriptor(
            &service,
            DescriptorConfig {
                read_perm: SecurityMode::EncryptionNoMitm,
                write_perm: SecurityMode::NoAccess,
                ..DescriptorConfig::new(Uuid::from_u16(0x2901))
            },
        );
        let handle = table.add_descriptor(&descriptor).unwrap();

        assert_eq!(
            table.read_by_handle(handle, SecurityLevel::None),
            Err(DescriptorError::InsufficientEncryption)
        );
        assert!(table.read_by_handle(handle, SecurityLevel::EncryptionOnly).is_ok());
        assert_eq!(
            table.write_by_handle(handle, b"x", SecurityLevel::SecureConnections),
            Err(DescriptorError::WriteNotPermitted)
        );
    }

    #[test]
    fn test_unknown_and_dropped_handles() {
        let table = AttributeTable::new();
        assert_eq!(
            table.read_by_handle(0x0042, SecurityLevel::None),
            Err(DescriptorError::InvalidHandle(0x0042))
        );

        let handle = {
            let service = Service::new_local(Uuid::from_u16(0x180F));
            let descriptor =
                local_descriptor(&service, DescriptorConfig::new(Uuid::from_u16(0x2901)));
            let handle = table.add_descriptor(&descriptor).unwrap();
            assert!(table.has_attribute(handle));
            assert_eq!(table.len(), 1);
            handle
        };

        assert!(!table.has_attribute(handle));
        assert!(table.is_empty());
        assert_eq!(
            table.read_by_handle(handle, SecurityLevel::None),
            Err(DescriptorError::AttributeNotFound)
        );
        // The dead entry is gone after the failed lookup
        assert_eq!(
            table.read_by_handle(handle, SecurityLevel::None),
            Err(DescriptorError::InvalidHandle(handle))
        );
        assert_eq!(table.remove_attribute(handle), Err(DescriptorError::AttributeNotFound));
    }

    #[test]
    fn test_dropped_descriptors_are_pruned() {
        let table = AttributeTable::new();

        for _ in 0..3 {
            let service = Service::new_local(Uuid::from_u16(0x180F));
            let descriptor =
                local_descriptor(&service, DescriptorConfig::new(Uuid::from_u16(0x2901)));
            table.add_descriptor(&descriptor).unwrap();
        }
        assert_eq!(table.len(), 0);
        assert!(!table.has_attribute(ATT_HANDLE_MIN));

        let service = Service::new_local(Uuid::from_u16(0x180F));
        let live = local_descriptor(&service, DescriptorConfig::new(Uuid::from_u16(0x2901)));
        let handle = table.add_descriptor(&live).unwrap();

        assert_eq!(handle, ATT_HANDLE_MIN + 3);
        assert_eq!(table.len(), 1);
        assert!(!table.has_attribute(ATT_HANDLE_MIN));
        assert_eq!(
            table.read_by_handle(ATT_HANDLE_MIN, SecurityLevel::None),
            Err(DescriptorError::InvalidHandle(ATT_HANDLE_MIN))
        );
        assert!(table.has_attribute(handle));
    }
}
