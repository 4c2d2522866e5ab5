//! GATT services and characteristics that own descriptors
//!
//! Ownership flows downward: a service owns its characteristics and a
//! characteristic owns its descriptors. Back-references are weak so the graph
//! has no cycles and is torn down with the service.

use super::descriptor::{Descriptor, DescriptorConfig};
use super::types::{CharacteristicProperty, Locality, Uuid};
use crate::error::{DescriptorError, DescriptorResult};
use log::debug;
use std::sync::{Arc, PoisonError, RwLock, Weak};

/// A GATT service, hosted locally or mirrored from a remote peer
#[derive(Debug)]
pub struct Service {
    /// Service UUID
    uuid: Uuid,
    /// Where the authoritative attribute values live
    locality: Locality,
    /// Service characteristics
    characteristics: RwLock<Vec<Arc<Characteristic>>>,
}

impl Service {
    /// Create a service hosted by this device
    pub fn new_local(uuid: Uuid) -> Arc<Self> {
        Self::new(uuid, Locality::Local)
    }

    /// Create a service discovered on a peer over `conn_handle`
    pub fn new_remote(uuid: Uuid, conn_handle: u16) -> Arc<Self> {
        Self::new(uuid, Locality::Remote { conn_handle })
    }

    fn new(uuid: Uuid, locality: Locality) -> Arc<Self> {
        Arc::new(Self {
            uuid,
            locality,
            characteristics: RwLock::new(Vec::new()),
        })
    }

    /// Service UUID
    pub fn uuid(&self) -> Uuid {
        self.uuid
    }

    /// Where the service's attribute values live
    pub fn locality(&self) -> Locality {
        self.locality
    }

    /// Whether the service lives across a connection rather than on this device
    pub fn is_remote(&self) -> bool {
        self.locality.is_remote()
    }

    /// Add a characteristic to this service
    pub fn add_characteristic(
        self: &Arc<Self>,
        uuid: Uuid,
        properties: CharacteristicProperty,
    ) -> Arc<Characteristic> {
        let characteristic = Arc::new(Characteristic {
            uuid,
            properties,
            service: Arc::downgrade(self),
            descriptors: RwLock::new(Vec::new()),
        });

        self.characteristics
            .write()
            .unwrap_or_else(PoisonError::into_inner)
            .push(characteristic.clone());

        debug!("Added characteristic {} to service {}", uuid, self.uuid);
        characteristic
    }

    /// Snapshot of the service's characteristics
    pub fn characteristics(&self) -> Vec<Arc<Characteristic>> {
        self.characteristics
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
    }
}

/// A GATT characteristic with its descriptors
#[derive(Debug)]
pub struct Characteristic {
    /// Characteristic UUID
    uuid: Uuid,
    /// Characteristic properties
    properties: CharacteristicProperty,
    /// Owning service
    service: Weak<Service>,
    /// Characteristic descriptors
    descriptors: RwLock<Vec<Arc<Descriptor>>>,
}

impl Characteristic {
    /// Characteristic UUID
    pub fn uuid(&self) -> Uuid {
        self.uuid
    }

    /// Characteristic properties
    pub fn properties(&self) -> CharacteristicProperty {
        self.properties
    }

    /// The owning service, if it is still alive
    pub fn service(&self) -> Option<Arc<Service>> {
        self.service.upgrade()
    }

    /// Attach a descriptor that was constructed for this characteristic
    pub fn add_descriptor(&self, descriptor: Descriptor) -> DescriptorResult<Arc<Descriptor>> {
        if !std::ptr::eq(descriptor.characteristic_ptr(), self) {
            return Err(DescriptorError::InvalidArgument(format!(
                "Descriptor {} belongs to a different characteristic",
                descriptor.uuid()
            )));
        }

        let descriptor = Arc::new(descriptor);
        self.descriptors
            .write()
            .unwrap_or_else(PoisonError::into_inner)
            .push(descriptor.clone());

        debug!("Added descriptor {} to characteristic {}", descriptor.uuid(), self.uuid);
        Ok(descriptor)
    }

    /// Construct a descriptor from `config` and attach it
    pub fn create_descriptor(
        self: &Arc<Self>,
        config: DescriptorConfig,
    ) -> DescriptorResult<Arc<Descriptor>> {
        let descriptor = Descriptor::with_config(self, config)?;
        self.add_descriptor(descriptor)
    }

    /// Snapshot of the characteristic's descriptors
    pub fn descriptors(&self) -> Vec<Arc<Descriptor>> {
        self.descriptors
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
    }

    /// Find a descriptor by UUID
    pub fn descriptor(&self, uuid: &Uuid) -> Option<Arc<Descriptor>> {
        self.descriptors
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .iter()
            .find(|d| d.uuid() == *uuid)
            .cloned()
    }
}
