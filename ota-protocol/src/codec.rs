// SPDX-FileCopyrightText: 2024 Foundation Devices, Inc. <hello@foundationdevices.com>
// SPDX-License-Identifier: GPL-3.0-or-later

//! Chunk records travelling in both directions.

use consts::MAX_READ_CHUNK;

use crate::checksum::chunk_crc;
use crate::OtaError;

/// Inbound chunk as announced by the client.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ChunkRecord<'a> {
    pub declared_length: usize,
    pub declared_crc: u32,
    pub payload: &'a [u8],
}

impl<'a> ChunkRecord<'a> {
    /// Check the payload against its declared length and CRC.
    ///
    /// Only a payload that passes both checks is handed back for buffering.
    pub fn validate(&self) -> Result<&'a [u8], OtaError> {
        let actual = self.payload.len();
        if actual != self.declared_length {
            return Err(OtaError::ChunkLengthMismatch {
                declared: self.declared_length,
                actual,
            });
        }

        let crc = chunk_crc(self.payload);
        if crc != self.declared_crc {
            return Err(OtaError::ChunkCrcMismatch {
                declared: self.declared_crc,
                actual: crc,
            });
        }

        Ok(self.payload)
    }
}

/// Reject read requests above the chunk limit.
pub fn check_read_length(length: usize) -> Result<(), OtaError> {
    if length > MAX_READ_CHUNK {
        return Err(OtaError::ChunkTooLarge {
            requested: length,
            max: MAX_READ_CHUNK,
        });
    }
    Ok(())
}

/// Outbound chunk answering a `read-chunk` request.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DataRecord<'a> {
    /// Session total including this chunk
    pub transferred: u32,
    pub crc: u32,
    pub bytes: &'a [u8],
}

impl<'a> DataRecord<'a> {
    pub fn new(transferred: u32, bytes: &'a [u8]) -> Self {
        Self {
            transferred,
            crc: chunk_crc(bytes),
            bytes,
        }
    }

    pub fn length(&self) -> usize {
        self.bytes.len()
    }
}
