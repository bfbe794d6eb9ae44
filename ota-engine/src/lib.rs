// SPDX-FileCopyrightText: 2024 Foundation Devices, Inc. <hello@foundationdevices.com>
// SPDX-License-Identifier: GPL-3.0-or-later

//! Over-the-air firmware update engine.
//!
//! Reads back the running image for verification, or receives a new image into the
//! inactive slot, verifies it sector by sector and against a whole-image digest, and
//! promotes it to the next boot image on `commit`. Whatever goes wrong, the device is
//! left with the old image untouched or a fully verified new one.

#![cfg_attr(not(test), no_std)]

// Must come first, the other modules use its macros.
mod fmt;

pub mod boot;
pub mod flash;
pub mod radio;
pub mod session;

#[cfg(test)]
mod tests;

pub use boot::{BootConfig, BootSlots, BootStore, SingleImage};
#[cfg(feature = "dual-slot")]
pub use boot::{BootStoreError, DualSlot, FlashBootStore};
pub use flash::SectorOutcome;
pub use radio::{NoRadio, RadioScan};
pub use session::{Session, SessionState, Updater};

pub use ota_protocol::{OtaError, Response, WriteTarget};
