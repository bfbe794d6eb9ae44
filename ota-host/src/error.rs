// SPDX-FileCopyrightText: 2024 Foundation Devices, Inc. <hello@foundation.xyz>
// SPDX-License-Identifier: GPL-3.0-or-later

use ota_protocol::DigestValue;

#[derive(Debug)]
pub enum ClientError {
    Io(std::io::Error),
    OpenPort(serialport::Error),
    ReadImage(std::io::Error),
    /// Upload chunks must tile a sector exactly
    InvalidChunkSize(usize),
    /// Read range runs past the 32-bit address space
    AddressRange {
        address: u32,
        length: usize,
    },
    /// Reply could not be parsed
    Malformed(String),
    /// Device answered with an `ERROR` response
    Device {
        token: String,
        message: String,
    },
    /// Well formed reply that does not answer the request
    Unexpected {
        request: String,
        reply: String,
    },
    ChunkCrc {
        transferred: u32,
    },
    DigestMismatch {
        local: DigestValue,
        remote: DigestValue,
    },
    /// Device finished a read with a byte count other than what was received
    LengthMismatch {
        received: usize,
        reported: u32,
    },
    ContentMismatch {
        offset: usize,
    },
}

impl From<std::io::Error> for ClientError {
    fn from(e: std::io::Error) -> Self {
        ClientError::Io(e)
    }
}

impl std::fmt::Display for ClientError {
    fn fmt(&self, f: &mut std::fmt::Formatter) -> std::fmt::Result {
        match self {
            ClientError::Io(e) => write!(f, "serial link: {e}"),
            ClientError::OpenPort(e) => write!(f, "failed to open serial port: {e}"),
            ClientError::ReadImage(e) => write!(f, "failed to read image file: {e}"),
            ClientError::InvalidChunkSize(size) => {
                write!(f, "chunk size {size} does not divide the {} byte sector", consts::SECTOR_SIZE)
            }
            ClientError::AddressRange { address, length } => {
                write!(f, "{length} bytes from {address:#x} do not fit the address space")
            }
            ClientError::Malformed(reply) => write!(f, "malformed reply {reply:?}"),
            ClientError::Device { token, message } => write!(f, "device error {token}: {message}"),
            ClientError::Unexpected { request, reply } => {
                write!(f, "unexpected reply to {request:?}: {reply:?}")
            }
            ClientError::ChunkCrc { transferred } => {
                write!(f, "CRC mismatch in chunk ending at {transferred}")
            }
            ClientError::DigestMismatch { local, remote } => {
                write!(f, "digest mismatch: device {remote}, host {local}")
            }
            ClientError::LengthMismatch { received, reported } => {
                write!(f, "length mismatch: device read {reported} bytes, host received {received}")
            }
            ClientError::ContentMismatch { offset } => {
                write!(f, "flash contents differ from image at offset {offset:#x}")
            }
        }
    }
}

impl std::error::Error for ClientError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            ClientError::Io(e) | ClientError::ReadImage(e) => Some(e),
            ClientError::OpenPort(e) => Some(e),
            _ => None,
        }
    }
}
