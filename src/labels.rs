//! Persisted per-device labels.
//!
//! A label replaces the generated device name on published readings and
//! survives reboots.  One postcard blob per address, keyed `lbl_XX` in the
//! `chirp` namespace.

use log::{debug, warn};
use serde::{Deserialize, Serialize};

use crate::app::ports::{StorageError, StoragePort};
use crate::sensors::{DeviceName, NAME_CAP, SensorAddress};

pub const LABEL_NAMESPACE: &str = "chirp";

/// Encoded blob upper bound: address + length prefix + label bytes.
const BLOB_CAP: usize = NAME_CAP + 8;

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
struct StoredLabel {
    address: u8,
    label: DeviceName,
}

fn key(address: SensorAddress) -> heapless::String<8> {
    let mut k = heapless::String::new();
    // "lbl_" + two hex digits always fits in 8 bytes.
    let _ = core::fmt::write(&mut k, format_args!("lbl_{:02x}", address.get()));
    k
}

/// Label persistence on top of any [`StoragePort`].
pub struct LabelStore;

impl LabelStore {
    /// Stored label for `address`, if any.  Unreadable blobs count as
    /// absent and are logged.
    pub fn load(storage: &impl StoragePort, address: SensorAddress) -> Option<DeviceName> {
        let slot = key(address);
        if !storage.exists(LABEL_NAMESPACE, &slot) {
            return None;
        }
        let mut buf = [0u8; BLOB_CAP];
        let len = match storage.read(LABEL_NAMESPACE, &slot, &mut buf) {
            Ok(len) => len,
            Err(StorageError::NotFound) => return None,
            Err(e) => {
                warn!("labels: read for {} failed: {}", address, e);
                return None;
            }
        };
        match postcard::from_bytes::<StoredLabel>(&buf[..len]) {
            Ok(stored) if stored.address == address.get() => Some(stored.label),
            Ok(stored) => {
                warn!(
                    "labels: entry for {} belongs to 0x{:02X}, ignoring",
                    address, stored.address
                );
                None
            }
            Err(_) => {
                warn!("labels: entry for {} is corrupted, ignoring", address);
                None
            }
        }
    }

    pub fn save(
        storage: &mut impl StoragePort,
        address: SensorAddress,
        label: &DeviceName,
    ) -> Result<(), StorageError> {
        let stored = StoredLabel {
            address: address.get(),
            label: label.clone(),
        };
        let mut buf = [0u8; BLOB_CAP];
        let bytes = postcard::to_slice(&stored, &mut buf).map_err(|_| StorageError::IoError)?;
        storage.write(LABEL_NAMESPACE, &key(address), bytes)?;
        debug!("labels: saved '{}' for {}", label, address);
        Ok(())
    }

    pub fn remove(storage: &mut impl StoragePort, address: SensorAddress) -> Result<(), StorageError> {
        storage.delete(LABEL_NAMESPACE, &key(address))
    }
}
