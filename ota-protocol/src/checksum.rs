// SPDX-FileCopyrightText: 2024 Foundation Devices, Inc. <hello@foundationdevices.com>
// SPDX-License-Identifier: GPL-3.0-or-later

//! Per-chunk CRC and whole-transfer digest.

use core::fmt;

use consts::{DIGEST_HEX_LEN, DIGEST_LEN};
use crc::{Crc, CRC_32_ISO_HDLC};
use md5::{Digest, Md5};
use serde::{Deserialize, Serialize};

use crate::OtaError;

const CRC32: Crc<u32> = Crc::<u32>::new(&CRC_32_ISO_HDLC);

/// CRC-32 of a single chunk. Computed fresh for every chunk, never carried over.
pub fn chunk_crc(data: &[u8]) -> u32 {
    CRC32.checksum(data)
}

/// Running MD5 over everything a session moved through flash.
#[derive(Clone, Default)]
pub struct TransferDigest {
    md5: Md5,
}

impl TransferDigest {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn update(&mut self, data: &[u8]) {
        self.md5.update(data);
    }

    /// Produce the digest and leave the accumulator empty for the next session.
    pub fn finalize(&mut self) -> DigestValue {
        let md5 = core::mem::take(&mut self.md5);
        DigestValue(md5.finalize().into())
    }
}

/// Finalized 128-bit transfer digest.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct DigestValue(pub [u8; DIGEST_LEN]);

impl DigestValue {
    /// Lowercase hexadecimal rendering, as exchanged on the wire.
    pub fn to_hex(&self) -> heapless::String<DIGEST_HEX_LEN> {
        self.0
            .iter()
            .flat_map(|byte| [byte >> 4, byte & 0x0f])
            .filter_map(|nibble| char::from_digit(u32::from(nibble), 16))
            .collect()
    }

    /// Parse a reference digest supplied by the client. Case is ignored.
    pub fn from_hex(text: &str) -> Result<Self, OtaError> {
        let mut bytes = [0u8; DIGEST_LEN];
        hex::decode_to_slice(text, &mut bytes).map_err(|_| OtaError::MissingOrInvalidParameter)?;
        Ok(Self(bytes))
    }
}

impl fmt::Display for DigestValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.to_hex())
    }
}
