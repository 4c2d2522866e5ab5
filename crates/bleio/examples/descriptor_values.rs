//! Example demonstrating descriptor values on a locally hosted service
//!
//! This example builds a Battery service with a User Description descriptor,
//! registers it in an attribute table and serves a few peer reads and writes.

use bleio::att::{AttributeTable, SecurityLevel, SecurityMode, CHAR_USER_DESC_UUID};
use bleio::gatt::{CharacteristicProperty, DescriptorConfig, Service, Uuid};

fn main() -> Result<(), Box<dyn std::error::Error>> {
    let service = Service::new_local(Uuid::from_u16(0x180F)); // Battery service
    let battery_level = service.add_characteristic(
        Uuid::from_u16(0x2A19),
        CharacteristicProperty::READ | CharacteristicProperty::NOTIFY,
    );

    let user_desc = battery_level.create_descriptor(DescriptorConfig {
        write_perm: SecurityMode::EncryptionNoMitm,
        initial_value: Some(b"Main battery".to_vec()),
        ..DescriptorConfig::new(Uuid::from_u16(CHAR_USER_DESC_UUID))
    })?;
    println!("Created descriptor {} (max_length {})", user_desc.uuid(), user_desc.max_length());

    // Not in a table yet, so reads see nothing
    println!("Before registration: {:?}", user_desc.value());

    let table = AttributeTable::new();
    let handle = table.add_descriptor(&user_desc)?;
    println!("Registered at handle 0x{:04X}", handle);

    let value = table.read_by_handle(handle, SecurityLevel::None)?;
    println!("Peer read: {}", String::from_utf8_lossy(&value));

    match table.write_by_handle(handle, b"Backup", SecurityLevel::None) {
        Ok(outcome) => println!("Unencrypted write: {:?}", outcome),
        Err(e) => println!("Unencrypted write rejected: {}", e),
    }

    let outcome = table.write_by_handle(handle, b"Backup battery", SecurityLevel::EncryptionOnly)?;
    println!("Encrypted write: {:?}", outcome);
    println!("Value now: {}", String::from_utf8_lossy(&user_desc.value()));

    if let Err(e) = user_desc.set_value(&[b'x'; 32]) {
        println!("Oversized write rejected: {}", e);
    }

    Ok(())
}
