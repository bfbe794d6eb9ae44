// SPDX-FileCopyrightText: 2024 Foundation Devices, Inc. <hello@foundationdevices.com>
// SPDX-License-Identifier: GPL-3.0-or-later

use core::fmt;

/// Every way an update command can be rejected.
///
/// A session command failing with any of these leaves the session inactive; the
/// client has to start over from `start-read` / `start-write`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum OtaError {
    /// Scratch or response buffer cannot hold what the command needs
    ScratchBufferTooSmall { available: usize, required: usize },
    /// A radio scan is running, flash access would disturb its timing
    RadioScanActive,
    /// A required argument is missing or does not parse
    MissingOrInvalidParameter,
    /// Requested read chunk exceeds the chunk limit
    ChunkTooLarge { requested: usize, max: usize },
    /// Payload length differs from the declared length
    ChunkLengthMismatch { declared: usize, actual: usize },
    /// Payload CRC differs from the declared CRC
    ChunkCrcMismatch { declared: u32, actual: u32 },
    /// Target address is not sector aligned
    UnalignedAddress(u32),
    /// A chunk would overflow the pending sector buffer
    UnalignedBufferOverflow(usize),
    /// Flash contents differ from the intended data after writing a sector
    FlashVerifyMismatch { sector: u32 },
    /// The flash driver reported an error
    FlashIo { address: u32 },
    /// Bytes transferred differ from the announced file length
    FileSizeMismatch { expected: u32, actual: u32 },
    /// Local digest differs from the reference digest
    DigestMismatch,
    /// Boot descriptor is missing or malformed
    BootConfigInvalid,
    /// Boot descriptor store refused to switch slots
    BootCommitFailed { slot: u8 },
    /// The image was built without dual-slot boot support
    SlotsUnsupported,
    /// Command received out of sequence
    NotActive,
    /// Command token not recognised
    UnknownCommand,
}

impl OtaError {
    /// Short stable token identifying the error kind on the wire.
    pub fn token(&self) -> &'static str {
        match self {
            OtaError::ScratchBufferTooSmall { .. } => "scratch-buffer-too-small",
            OtaError::RadioScanActive => "radio-scan-active",
            OtaError::MissingOrInvalidParameter => "invalid-parameter",
            OtaError::ChunkTooLarge { .. } => "chunk-too-large",
            OtaError::ChunkLengthMismatch { .. } => "chunk-length-mismatch",
            OtaError::ChunkCrcMismatch { .. } => "chunk-crc-mismatch",
            OtaError::UnalignedAddress(_) => "unaligned-address",
            OtaError::UnalignedBufferOverflow(_) => "unaligned-buffer-overflow",
            OtaError::FlashVerifyMismatch { .. } => "flash-verify-mismatch",
            OtaError::FlashIo { .. } => "flash-io",
            OtaError::FileSizeMismatch { .. } => "file-size-mismatch",
            OtaError::DigestMismatch => "digest-mismatch",
            OtaError::BootConfigInvalid => "boot-config-invalid",
            OtaError::BootCommitFailed { .. } => "boot-commit-failed",
            OtaError::SlotsUnsupported => "slots-unsupported",
            OtaError::NotActive => "not-active",
            OtaError::UnknownCommand => "unknown-command",
        }
    }
}

impl fmt::Display for OtaError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match *self {
            OtaError::ScratchBufferTooSmall { available, required } => {
                write!(f, "buffer too small: {} < {}", available, required)
            }
            OtaError::RadioScanActive => f.write_str("radio scan active"),
            OtaError::MissingOrInvalidParameter => f.write_str("missing or invalid parameter"),
            OtaError::ChunkTooLarge { requested, max } => {
                write!(f, "chunk size invalid ({} > {})", requested, max)
            }
            OtaError::ChunkLengthMismatch { declared, actual } => {
                write!(f, "chunk length mismatch: {} != {}", declared, actual)
            }
            OtaError::ChunkCrcMismatch { declared, actual } => {
                write!(f, "CRC mismatch {:08x} != {:08x}", declared, actual)
            }
            OtaError::UnalignedAddress(address) => write!(f, "start address not aligned: {:x}", address),
            OtaError::UnalignedBufferOverflow(len) => write!(f, "unaligned {}", len),
            OtaError::FlashVerifyMismatch { sector } => write!(f, "verify mismatch in sector {}", sector),
            OtaError::FlashIo { address } => write!(f, "flash access failed at {:x}", address),
            OtaError::FileSizeMismatch { expected, actual } => {
                write!(f, "file size differs: {} != {}", expected, actual)
            }
            OtaError::DigestMismatch => f.write_str("invalid digest"),
            OtaError::BootConfigInvalid => f.write_str("boot config invalid"),
            OtaError::BootCommitFailed { slot } => write!(f, "set current slot to {} failed", slot),
            OtaError::SlotsUnsupported => f.write_str("unavailable on single-image build"),
            OtaError::NotActive => f.write_str("not active"),
            OtaError::UnknownCommand => f.write_str("unknown command"),
        }
    }
}
