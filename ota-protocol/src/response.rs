// SPDX-FileCopyrightText: 2024 Foundation Devices, Inc. <hello@foundationdevices.com>
// SPDX-License-Identifier: GPL-3.0-or-later

//! Outbound responses.

use core::fmt::{self, Write};

use crate::checksum::DigestValue;
use crate::codec::DataRecord;
use crate::{OtaError, WriteTarget};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Response<'a> {
    /// Read session opened
    Read,
    /// One chunk of flash contents
    Data(DataRecord<'a>),
    /// Write session opened
    Write { target: WriteTarget, first_sector: u32 },
    /// Chunk accepted
    Ack { transferred: u32 },
    /// Read session closed
    ReadOk { digest: DigestValue, transferred: u32 },
    /// Write session verified
    WriteOk {
        target: WriteTarget,
        local: DigestValue,
        remote: DigestValue,
        sectors_written: u32,
        sectors_skipped: u32,
    },
    /// Boot slot switched, the device should reboot now
    CommitOk { slot: u8 },
    Error(OtaError),
}

impl Response<'_> {
    /// Encode into `out`, returning the number of bytes used.
    pub fn encode(&self, out: &mut [u8]) -> Result<usize, OtaError> {
        let mut cursor = Cursor::new(out);
        let written = match self {
            Response::Read => cursor.put(b"READ\n"),
            Response::Data(record) => cursor
                .format(format_args!(
                    "DATA {} {} {} @",
                    record.length(),
                    record.transferred,
                    record.crc
                ))
                .and_then(|_| cursor.put(record.bytes)),
            Response::Write { target, first_sector } => {
                cursor.format(format_args!("WRITE {} {}\n", target.wire_slot(), first_sector))
            }
            Response::Ack { transferred } => cursor.format(format_args!("ACK {}\n", transferred)),
            Response::ReadOk { digest, transferred } => {
                cursor.format(format_args!("READ_OK {} {}\n", digest, transferred))
            }
            Response::WriteOk {
                target,
                local,
                remote,
                sectors_written,
                sectors_skipped,
            } => {
                let tag = match target {
                    WriteTarget::ExplicitAddress(_) => "PARTIAL_WRITE_OK",
                    WriteTarget::ManagedSlot(_) => "WRITE_OK",
                };
                cursor.format(format_args!(
                    "{} {} {} {} {}\n",
                    tag, local, remote, sectors_written, sectors_skipped
                ))
            }
            Response::CommitOk { slot } => cursor.format(format_args!("COMMIT_OK {}\n", slot)),
            Response::Error(err) => cursor.format(format_args!("ERROR {}: {}\n", err.token(), err)),
        };
        written.map(|_| cursor.pos)
    }
}

struct Cursor<'b> {
    buf: &'b mut [u8],
    pos: usize,
    required: usize,
}

impl<'b> Cursor<'b> {
    fn new(buf: &'b mut [u8]) -> Self {
        Self { buf, pos: 0, required: 0 }
    }

    fn put(&mut self, bytes: &[u8]) -> Result<(), OtaError> {
        let end = self.pos + bytes.len();
        if end > self.buf.len() {
            self.required = end;
            return Err(self.overflow());
        }
        self.buf[self.pos..end].copy_from_slice(bytes);
        self.pos = end;
        Ok(())
    }

    fn format(&mut self, args: fmt::Arguments<'_>) -> Result<(), OtaError> {
        self.write_fmt(args).map_err(|_| self.overflow())
    }

    fn overflow(&self) -> OtaError {
        OtaError::ScratchBufferTooSmall {
            available: self.buf.len(),
            required: self.required,
        }
    }
}

impl Write for Cursor<'_> {
    fn write_str(&mut self, s: &str) -> fmt::Result {
        self.put(s.as_bytes()).map_err(|_| fmt::Error)
    }
}
