// SPDX-FileCopyrightText: 2024 Foundation Devices, Inc. <hello@foundation.xyz>
// SPDX-License-Identifier: GPL-3.0-or-later

//! Client side of the update protocol: one request, one reply, strictly in turn.

use std::io;

use consts::{MAX_READ_CHUNK, SECTOR_SIZE};
use log::{debug, info};
use ota_protocol::{chunk_crc, DigestValue, TransferDigest};

use crate::error::ClientError;
use crate::reply::Reply;

/// Link carrying requests to the device and replies back.
pub trait Transport {
    /// Send `request` and replace the contents of `reply` with the device's answer.
    fn exchange(&mut self, request: &[u8], reply: &mut Vec<u8>) -> io::Result<()>;
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UploadReport {
    /// Boot slot written, `None` for an explicit address
    pub slot: Option<u8>,
    pub first_sector: u32,
    pub digest: DigestValue,
    pub sectors_written: u32,
    pub sectors_skipped: u32,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ReadBack {
    pub data: Vec<u8>,
    pub digest: DigestValue,
}

pub struct OtaClient<T> {
    transport: T,
    reply: Vec<u8>,
}

impl<T: Transport> OtaClient<T> {
    pub fn new(transport: T) -> Self {
        Self {
            transport,
            reply: Vec::new(),
        }
    }

    fn request(&mut self, request: &[u8]) -> Result<Reply<'_>, ClientError> {
        self.transport.exchange(request, &mut self.reply)?;
        match Reply::parse(&self.reply)? {
            Reply::Error { token, message } => Err(ClientError::Device {
                token: token.into(),
                message: message.into(),
            }),
            reply => Ok(reply),
        }
    }

    /// Write `image` to the inactive slot, or to `address` when given.
    ///
    /// `chunk_size` must divide the sector size, the device refuses chunks that would
    /// straddle a sector boundary.
    pub fn upload(&mut self, image: &[u8], address: Option<u32>, chunk_size: usize) -> Result<UploadReport, ClientError> {
        if chunk_size == 0 || chunk_size > SECTOR_SIZE || SECTOR_SIZE % chunk_size != 0 {
            return Err(ClientError::InvalidChunkSize(chunk_size));
        }

        let start = match address {
            Some(address) => format!("start-write {} {:#x}", image.len(), address),
            None => format!("start-write {}", image.len()),
        };
        let (slot, first_sector) = match self.request(start.as_bytes())? {
            Reply::Write { slot, first_sector } => (slot, first_sector),
            other => return Err(unexpected(&start, &other)),
        };
        info!("writing {} bytes from sector {} (slot {:?})", image.len(), first_sector, slot);

        let mut digest = TransferDigest::new();
        let mut line = Vec::with_capacity(chunk_size + 32);
        for (idx, chunk) in image.chunks(chunk_size).enumerate() {
            line.clear();
            line.extend_from_slice(format!("send-chunk {} {} ", chunk.len(), chunk_crc(chunk)).as_bytes());
            line.extend_from_slice(chunk);
            digest.update(chunk);

            match self.request(&line)? {
                Reply::Ack { transferred } => debug!("chunk {} acked, {} bytes flushed", idx, transferred),
                other => return Err(unexpected("send-chunk", &other)),
            }
        }

        let digest = digest.finalize();
        let finish = format!("finish {}", digest);
        match self.request(finish.as_bytes())? {
            Reply::WriteOk {
                local,
                sectors_written,
                sectors_skipped,
                ..
            } => {
                if local != digest {
                    return Err(ClientError::DigestMismatch { local: digest, remote: local });
                }
                info!("image verified: {} sectors written, {} unchanged", sectors_written, sectors_skipped);
                Ok(UploadReport {
                    slot,
                    first_sector,
                    digest,
                    sectors_written,
                    sectors_skipped,
                })
            }
            other => Err(unexpected(&finish, &other)),
        }
    }

    /// Read `length` bytes starting at `address`, checking every chunk CRC and the
    /// device's digest of the whole read.
    pub fn read_back(&mut self, address: u32, length: usize, chunk_size: usize) -> Result<ReadBack, ClientError> {
        let chunk_size = chunk_size.clamp(1, MAX_READ_CHUNK);
        let end = u32::try_from(length)
            .ok()
            .and_then(|len| address.checked_add(len))
            .ok_or(ClientError::AddressRange { address, length })?;

        match self.request(b"start-read")? {
            Reply::Read => {}
            other => return Err(unexpected("start-read", &other)),
        }

        let mut data = Vec::with_capacity(length);
        let mut digest = TransferDigest::new();
        while data.len() < length {
            let count = chunk_size.min(length - data.len());
            let at = end - (length - data.len()) as u32;
            let request = format!("read-chunk {:#x} {}", at, count);
            match self.request(request.as_bytes())? {
                Reply::Data { transferred, crc, bytes } => {
                    if chunk_crc(bytes) != crc {
                        return Err(ClientError::ChunkCrc { transferred });
                    }
                    digest.update(bytes);
                    data.extend_from_slice(bytes);
                }
                other => return Err(unexpected(&request, &other)),
            }
        }

        let local = digest.finalize();
        match self.request(b"finish")? {
            Reply::ReadOk { digest, transferred } => {
                if transferred as usize != data.len() {
                    return Err(ClientError::LengthMismatch {
                        received: data.len(),
                        reported: transferred,
                    });
                }
                if digest != local {
                    return Err(ClientError::DigestMismatch { local, remote: digest });
                }
                Ok(ReadBack { data, digest })
            }
            other => Err(unexpected("finish", &other)),
        }
    }

    /// Promote the last uploaded image. Returns the slot that boots next.
    pub fn commit(&mut self) -> Result<u8, ClientError> {
        match self.request(b"commit")? {
            Reply::CommitOk { slot } => Ok(slot),
            other => Err(unexpected("commit", &other)),
        }
    }
}

fn unexpected(request: &str, reply: &Reply<'_>) -> ClientError {
    ClientError::Unexpected {
        request: request.into(),
        reply: format!("{reply:?}"),
    }
}

/// Compare a read back with the image it should hold.
pub fn compare(image: &[u8], read: &[u8]) -> Result<(), ClientError> {
    match image.iter().zip(read).position(|(a, b)| a != b) {
        Some(offset) => Err(ClientError::ContentMismatch { offset }),
        None if image.len() != read.len() => Err(ClientError::ContentMismatch {
            offset: image.len().min(read.len()),
        }),
        None => Ok(()),
    }
}
