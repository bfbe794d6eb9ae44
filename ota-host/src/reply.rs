// SPDX-FileCopyrightText: 2024 Foundation Devices, Inc. <hello@foundation.xyz>
// SPDX-License-Identifier: GPL-3.0-or-later

//! Device responses as seen from the host.

use std::io::{self, Read};

use consts::MAX_READ_CHUNK;
use ota_protocol::command::parse_number;
use ota_protocol::DigestValue;

use crate::error::ClientError;

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Reply<'a> {
    Read,
    Data {
        transferred: u32,
        crc: u32,
        bytes: &'a [u8],
    },
    Write {
        /// `None` for an explicit address
        slot: Option<u8>,
        first_sector: u32,
    },
    Ack {
        transferred: u32,
    },
    ReadOk {
        digest: DigestValue,
        transferred: u32,
    },
    WriteOk {
        partial: bool,
        local: DigestValue,
        remote: DigestValue,
        sectors_written: u32,
        sectors_skipped: u32,
    },
    CommitOk {
        slot: u8,
    },
    Error {
        token: &'a str,
        message: &'a str,
    },
}

impl<'a> Reply<'a> {
    pub fn parse(raw: &'a [u8]) -> Result<Self, ClientError> {
        if let Some(rest) = raw.strip_prefix(b"DATA ") {
            return parse_data(rest);
        }

        let text = std::str::from_utf8(raw).map_err(|_| malformed(raw))?;
        let text = text.trim_end();
        let (tag, rest) = text.split_once(' ').unwrap_or((text, ""));

        if tag == "ERROR" {
            let (token, message) = rest.split_once(": ").ok_or_else(|| malformed(raw))?;
            return Ok(Reply::Error { token, message });
        }

        let mut fields = Fields {
            tokens: rest.split_ascii_whitespace(),
            raw,
        };
        let reply = match tag {
            "READ" => Reply::Read,
            "ACK" => Reply::Ack {
                transferred: fields.number()?,
            },
            "COMMIT_OK" => Reply::CommitOk {
                slot: u8::try_from(fields.number()?).map_err(|_| malformed(raw))?,
            },
            "WRITE" => {
                let slot = match fields.token()? {
                    "-1" => None,
                    slot => Some(slot.parse::<u8>().map_err(|_| malformed(raw))?),
                };
                Reply::Write {
                    slot,
                    first_sector: fields.number()?,
                }
            }
            "READ_OK" => Reply::ReadOk {
                digest: fields.digest()?,
                transferred: fields.number()?,
            },
            "WRITE_OK" | "PARTIAL_WRITE_OK" => Reply::WriteOk {
                partial: tag == "PARTIAL_WRITE_OK",
                local: fields.digest()?,
                remote: fields.digest()?,
                sectors_written: fields.number()?,
                sectors_skipped: fields.number()?,
            },
            _ => return Err(malformed(raw)),
        };
        Ok(reply)
    }
}

struct Fields<'a> {
    tokens: std::str::SplitAsciiWhitespace<'a>,
    raw: &'a [u8],
}

impl<'a> Fields<'a> {
    fn token(&mut self) -> Result<&'a str, ClientError> {
        self.tokens.next().ok_or_else(|| malformed(self.raw))
    }

    fn number(&mut self) -> Result<u32, ClientError> {
        let token = self.token()?;
        parse_number(token.as_bytes()).map_err(|_| malformed(self.raw))
    }

    fn digest(&mut self) -> Result<DigestValue, ClientError> {
        let token = self.token()?;
        DigestValue::from_hex(token).map_err(|_| malformed(self.raw))
    }
}

/// `DATA {length} {transferred} {crc} @{bytes}`, with the tag already stripped.
fn parse_data(rest: &[u8]) -> Result<Reply<'_>, ClientError> {
    let at = rest.iter().position(|&b| b == b'@').ok_or_else(|| malformed(rest))?;
    let header = std::str::from_utf8(&rest[..at]).map_err(|_| malformed(rest))?;
    let bytes = &rest[at + 1..];

    let mut fields = header.split_ascii_whitespace().map(str::parse::<u32>);
    let (Some(Ok(length)), Some(Ok(transferred)), Some(Ok(crc)), None) =
        (fields.next(), fields.next(), fields.next(), fields.next())
    else {
        return Err(malformed(rest));
    };
    if bytes.len() != length as usize {
        return Err(malformed(rest));
    }

    Ok(Reply::Data { transferred, crc, bytes })
}

fn malformed(raw: &[u8]) -> ClientError {
    ClientError::Malformed(String::from_utf8_lossy(raw).into_owned())
}

/// Read one response off the link into `reply`.
///
/// Text responses end at the newline. A `DATA` response carries binary payload after
/// the `@` marker, its length comes from the header.
pub fn read_reply<R: Read>(reader: &mut R, reply: &mut Vec<u8>) -> io::Result<()> {
    reply.clear();
    let mut byte = [0u8; 1];
    loop {
        reader.read_exact(&mut byte)?;
        reply.push(byte[0]);
        match byte[0] {
            b'\n' => return Ok(()),
            b'@' if reply.starts_with(b"DATA ") => break,
            _ => {}
        }
    }

    let length = std::str::from_utf8(&reply[5..])
        .ok()
        .and_then(|header| header.split_ascii_whitespace().next())
        .and_then(|field| field.parse::<usize>().ok())
        .filter(|&length| length <= MAX_READ_CHUNK)
        .ok_or_else(|| io::Error::new(io::ErrorKind::InvalidData, "bad DATA header"))?;

    let start = reply.len();
    reply.resize(start + length, 0);
    reader.read_exact(&mut reply[start..])
}
