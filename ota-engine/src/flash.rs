// SPDX-FileCopyrightText: 2024 Foundation Devices, Inc. <hello@foundationdevices.com>
// SPDX-License-Identifier: GPL-3.0-or-later

//! Sector write / verify / skip.
//!
//! A sector is only erased and programmed when its current contents differ from the
//! new data. Either way the sector is read back afterwards, the bytes actually
//! resident in flash feed the transfer digest and must match the intended data.

use consts::SECTOR_SIZE;
use embedded_storage::nor_flash::{NorFlash, ReadNorFlash};
use ota_protocol::{OtaError, TransferDigest};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum SectorOutcome {
    /// Contents differed, the sector was erased and programmed
    Written,
    /// Contents already matched, flash left untouched
    Skipped,
}

/// Flash address of the first byte of `sector`.
pub fn sector_address(sector: u32) -> u32 {
    sector * SECTOR_SIZE as u32
}

/// Persist `data` (a full sector, or the shorter final one) at `sector`.
///
/// `scratch` must hold at least one sector. On success the re-read contents have been
/// folded into `digest`.
pub fn write_verify_sector<F: NorFlash>(
    flash: &mut F,
    sector: u32,
    data: &[u8],
    scratch: &mut [u8],
    digest: &mut TransferDigest,
) -> Result<SectorOutcome, OtaError> {
    if data.len() > SECTOR_SIZE {
        return Err(OtaError::UnalignedBufferOverflow(data.len()));
    }
    if scratch.len() < SECTOR_SIZE {
        return Err(OtaError::ScratchBufferTooSmall {
            available: scratch.len(),
            required: SECTOR_SIZE,
        });
    }

    let address = sector_address(sector);

    let existing = read_padded(flash, address, data.len(), scratch)?;
    let outcome = if existing == data {
        SectorOutcome::Skipped
    } else {
        flash
            .erase(address, address + SECTOR_SIZE as u32)
            .map_err(|_| OtaError::FlashIo { address })?;
        program(flash, address, data, scratch)?;
        SectorOutcome::Written
    };

    let resident = read_padded(flash, address, data.len(), scratch)?;
    digest.update(resident);

    if resident != data {
        error!("verify mismatch in sector {}", sector);
        return Err(OtaError::FlashVerifyMismatch { sector });
    }

    debug!("sector {}: {:?} ({} bytes)", sector, outcome, data.len());
    Ok(outcome)
}

/// Plain read used by the random access read path.
pub fn read_at<F: ReadNorFlash>(flash: &mut F, address: u32, out: &mut [u8]) -> Result<(), OtaError> {
    flash.read(address, out).map_err(|_| OtaError::FlashIo { address })
}

/// Read `len` bytes, rounding the access up to the driver's read granularity.
fn read_padded<'s, F: ReadNorFlash>(
    flash: &mut F,
    address: u32,
    len: usize,
    scratch: &'s mut [u8],
) -> Result<&'s [u8], OtaError> {
    let padded = round_up(len, F::READ_SIZE);
    read_at(flash, address, &mut scratch[..padded])?;
    Ok(&scratch[..len])
}

/// Program `data`, padding a trailing partial word with the erased value.
fn program<F: NorFlash>(flash: &mut F, address: u32, data: &[u8], scratch: &mut [u8]) -> Result<(), OtaError> {
    let aligned = data.len() - data.len() % F::WRITE_SIZE;
    if aligned > 0 {
        flash
            .write(address, &data[..aligned])
            .map_err(|_| OtaError::FlashIo { address })?;
    }

    let tail = &data[aligned..];
    if !tail.is_empty() {
        let word = &mut scratch[..F::WRITE_SIZE];
        word.fill(0xFF);
        word[..tail.len()].copy_from_slice(tail);
        let address = address + aligned as u32;
        flash.write(address, word).map_err(|_| OtaError::FlashIo { address })?;
    }
    Ok(())
}

fn round_up(len: usize, granularity: usize) -> usize {
    len.div_ceil(granularity) * granularity
}
