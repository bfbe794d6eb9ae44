// SPDX-FileCopyrightText: 2024 Foundation Devices, Inc. <hello@foundationdevices.com>
// SPDX-License-Identifier: GPL-3.0-or-later

//! Over-the-air update protocol.
//! A remote client drives the device with one textual command at a time and the device
//! answers each with exactly one response.
//! Defines the commands, responses, chunk records, checksums and error kinds shared by
//! the device engine and host tooling.

#![no_std]

#[cfg(test)]
mod tests;

pub mod checksum;
pub mod codec;
pub mod command;
mod error;
pub mod response;

use serde::{Deserialize, Serialize};

pub use checksum::{chunk_crc, DigestValue, TransferDigest};
pub use codec::{ChunkRecord, DataRecord};
pub use command::Command;
pub use error::OtaError;
pub use response::Response;

/// Where a write session puts the image.
#[derive(Serialize, Deserialize, Clone, Copy, Debug, Eq, PartialEq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum WriteTarget {
    /// Address given by the client, outside of boot slot management
    ExplicitAddress(u32),
    /// Inactive boot slot picked from the boot descriptor
    ManagedSlot(u8),
}

impl WriteTarget {
    /// Slot number as reported on the wire, `-1` for an explicit address.
    pub fn wire_slot(&self) -> i32 {
        match self {
            WriteTarget::ExplicitAddress(_) => -1,
            WriteTarget::ManagedSlot(slot) => i32::from(*slot),
        }
    }
}
