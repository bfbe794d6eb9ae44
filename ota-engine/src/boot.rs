// SPDX-FileCopyrightText: 2024 Foundation Devices, Inc. <hello@foundationdevices.com>
// SPDX-License-Identifier: GPL-3.0-or-later

//! Boot slot selection.
//!
//! The engine only talks to [`BootSlots`]. Images built for a dual-slot boot loader
//! hand it a [`DualSlot`] wrapping the boot descriptor store, single-image builds hand
//! it [`SingleImage`], which refuses everything slot related.

use consts::{BOOT_CONFIG_MAGIC, SLOT_COUNT};
use ota_protocol::OtaError;
use serde::{Deserialize, Serialize};

/// Boot descriptor record shared with the boot loader.
#[derive(Serialize, Deserialize, Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct BootConfig {
    pub magic: u8,
    pub count: u8,
    pub current_slot: u8,
    pub slots: [u32; SLOT_COUNT],
}

impl BootConfig {
    pub fn new(slots: [u32; SLOT_COUNT], current_slot: u8) -> Self {
        Self {
            magic: BOOT_CONFIG_MAGIC,
            count: SLOT_COUNT as u8,
            current_slot,
            slots,
        }
    }

    pub fn is_valid(&self) -> bool {
        self.magic == BOOT_CONFIG_MAGIC && usize::from(self.count) == SLOT_COUNT && self.current_slot < self.count
    }

    /// The slot that is not running, with its base address.
    pub fn inactive_slot(&self) -> Option<(u8, u32)> {
        if !self.is_valid() {
            return None;
        }
        let slot = if self.current_slot == 0 { 1 } else { 0 };
        Some((slot, self.slots[usize::from(slot)]))
    }
}

/// Persistent home of the boot descriptor.
pub trait BootStore {
    type Error;

    fn load(&mut self) -> Result<BootConfig, Self::Error>;

    /// Mark `slot` as the one to boot next. After a power loss the descriptor must
    /// name either the old or the new slot.
    fn set_current_slot(&mut self, slot: u8) -> Result<(), Self::Error>;
}

/// Slot capability of the running image.
pub trait BootSlots {
    /// Whether the image can switch boot slots at all.
    fn supported(&self) -> bool {
        true
    }

    /// Slot index and base address the next image should be written to.
    fn current_inactive_slot_address(&mut self) -> Result<(u8, u32), OtaError>;

    /// Make `slot` the next boot image.
    fn commit_slot(&mut self, slot: u8) -> Result<(), OtaError>;
}

/// Image without dual-slot boot support.
#[derive(Debug, Default, Clone, Copy)]
pub struct SingleImage;

impl BootSlots for SingleImage {
    fn supported(&self) -> bool {
        false
    }

    fn current_inactive_slot_address(&mut self) -> Result<(u8, u32), OtaError> {
        Err(OtaError::SlotsUnsupported)
    }

    fn commit_slot(&mut self, _slot: u8) -> Result<(), OtaError> {
        Err(OtaError::SlotsUnsupported)
    }
}

#[cfg(feature = "dual-slot")]
pub use dual::{BootStoreError, DualSlot, FlashBootStore};

#[cfg(feature = "dual-slot")]
mod dual {
    use super::*;
    use crc::{Crc, CRC_32_ISO_HDLC};
    use embedded_storage::nor_flash::NorFlash;

    const CRC32: Crc<u32> = Crc::<u32>::new(&CRC_32_ISO_HDLC);

    /// Size of one stored record: length, CRC, postcard body, 0xFF padding.
    const RECORD_LEN: usize = 32;
    const HEADER_LEN: usize = 6;
    /// Record copies, one per erase sector.
    const COPIES: u32 = 2;

    /// Image built for the dual-slot boot loader.
    pub struct DualSlot<S> {
        store: S,
    }

    impl<S: BootStore> DualSlot<S> {
        pub fn new(store: S) -> Self {
            Self { store }
        }

        pub fn store(&self) -> &S {
            &self.store
        }

        pub fn store_mut(&mut self) -> &mut S {
            &mut self.store
        }
    }

    impl<S: BootStore> BootSlots for DualSlot<S> {
        fn current_inactive_slot_address(&mut self) -> Result<(u8, u32), OtaError> {
            let config = self.store.load().map_err(|_| OtaError::BootConfigInvalid)?;
            config.inactive_slot().ok_or(OtaError::BootConfigInvalid)
        }

        fn commit_slot(&mut self, slot: u8) -> Result<(), OtaError> {
            self.store.set_current_slot(slot).map_err(|_| {
                error!("set current slot to {} failed", slot);
                OtaError::BootCommitFailed { slot }
            })
        }
    }

    #[derive(Debug, Clone, Copy, PartialEq, Eq)]
    #[cfg_attr(feature = "defmt", derive(defmt::Format))]
    pub enum BootStoreError {
        /// Flash driver error
        Flash,
        /// No copy of the record is intact
        Corrupt,
        /// Record does not describe two slots
        Invalid,
        /// Requested slot does not exist
        NoSuchSlot(u8),
    }

    #[derive(Serialize, Deserialize, Debug, Clone, Copy, PartialEq, Eq)]
    struct Record {
        sequence: u32,
        config: BootConfig,
    }

    /// `a` was written after `b`, allowing the counter to wrap.
    fn is_newer(a: u32, b: u32) -> bool {
        (a.wrapping_sub(b) as i32) > 0
    }

    /// Boot descriptor kept in two alternating flash sectors.
    ///
    /// Each copy is `[len: u16 LE][crc32: u32 LE][postcard body]`, padded with 0xFF,
    /// where the body carries a sequence number next to the descriptor. An update
    /// rewrites the sector holding the older copy and reads it back, the newest copy
    /// stays untouched until then. Loading picks the intact copy with the highest
    /// sequence, so an interrupted update leaves the previous descriptor in effect.
    pub struct FlashBootStore<F> {
        flash: F,
        address: u32,
    }

    impl<F: NorFlash> FlashBootStore<F> {
        /// `address` is the first of two consecutive erase sectors.
        pub fn new(flash: F, address: u32) -> Self {
            Self { flash, address }
        }

        pub fn into_inner(self) -> F {
            self.flash
        }

        /// Write `config` as the newest descriptor.
        pub fn store(&mut self, config: &BootConfig) -> Result<(), BootStoreError> {
            let (copy, sequence) = match self.newest()? {
                Some((current, record)) => ((current + 1) % COPIES, record.sequence.wrapping_add(1)),
                None => (0, 0),
            };
            let record = Record {
                sequence,
                config: *config,
            };

            let mut raw = [0xFFu8; RECORD_LEN];
            let body_len = postcard::to_slice(&record, &mut raw[HEADER_LEN..])
                .map_err(|_| BootStoreError::Invalid)?
                .len();
            let crc = CRC32.checksum(&raw[HEADER_LEN..HEADER_LEN + body_len]);
            raw[..2].copy_from_slice(&(body_len as u16).to_le_bytes());
            raw[2..HEADER_LEN].copy_from_slice(&crc.to_le_bytes());

            let address = self.copy_address(copy);
            self.flash
                .erase(address, address + F::ERASE_SIZE as u32)
                .map_err(|_| BootStoreError::Flash)?;
            self.flash.write(address, &raw).map_err(|_| BootStoreError::Flash)?;

            if self.read_copy(copy)? != Some(record) {
                return Err(BootStoreError::Corrupt);
            }
            debug!("boot descriptor sequence {} stored in copy {}", sequence, copy);
            Ok(())
        }

        fn copy_address(&self, copy: u32) -> u32 {
            self.address + copy * F::ERASE_SIZE as u32
        }

        /// Decode one copy, `None` when it is erased or damaged.
        fn read_copy(&mut self, copy: u32) -> Result<Option<Record>, BootStoreError> {
            let mut raw = [0u8; RECORD_LEN];
            self.flash
                .read(self.copy_address(copy), &mut raw)
                .map_err(|_| BootStoreError::Flash)?;

            let body_len = usize::from(u16::from_le_bytes([raw[0], raw[1]]));
            if body_len > RECORD_LEN - HEADER_LEN {
                return Ok(None);
            }
            let crc = u32::from_le_bytes([raw[2], raw[3], raw[4], raw[5]]);
            let body = &raw[HEADER_LEN..HEADER_LEN + body_len];
            if CRC32.checksum(body) != crc {
                return Ok(None);
            }
            Ok(postcard::from_bytes(body).ok())
        }

        /// Newest intact copy and its index.
        fn newest(&mut self) -> Result<Option<(u32, Record)>, BootStoreError> {
            let mut newest: Option<(u32, Record)> = None;
            for copy in 0..COPIES {
                let Some(record) = self.read_copy(copy)? else {
                    continue;
                };
                match newest {
                    Some((_, best)) if !is_newer(record.sequence, best.sequence) => {}
                    _ => newest = Some((copy, record)),
                }
            }
            Ok(newest)
        }
    }

    impl<F: NorFlash> BootStore for FlashBootStore<F> {
        type Error = BootStoreError;

        fn load(&mut self) -> Result<BootConfig, Self::Error> {
            self.newest()?
                .map(|(_, record)| record.config)
                .ok_or(BootStoreError::Corrupt)
        }

        fn set_current_slot(&mut self, slot: u8) -> Result<(), Self::Error> {
            let mut config = self.load()?;
            if !config.is_valid() {
                return Err(BootStoreError::Invalid);
            }
            if slot >= config.count {
                return Err(BootStoreError::NoSuchSlot(slot));
            }
            config.current_slot = slot;
            self.store(&config)
        }
    }
}
