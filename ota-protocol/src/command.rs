// SPDX-FileCopyrightText: 2024 Foundation Devices, Inc. <hello@foundationdevices.com>
// SPDX-License-Identifier: GPL-3.0-or-later

//! Inbound command lines.
//!
//! Fields are separated by single spaces. Numbers are decimal unless prefixed with
//! `0x`. The `send-chunk` payload is everything after the third separator, taken
//! verbatim, so it may contain any byte including spaces and line feeds.

use crate::codec::ChunkRecord;
use crate::OtaError;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Command<'a> {
    /// `start-read`
    StartRead,
    /// `read-chunk <address> <length>`
    ReadChunk { address: u32, length: usize },
    /// `start-write <file_length> [<address>]`
    StartWrite { file_length: u32, address: Option<u32> },
    /// `send-chunk <length> <crc> <payload>`
    SendChunk(ChunkRecord<'a>),
    /// `finish [<digest_hex>]`
    Finish { reference: Option<&'a str> },
    /// `commit`
    Commit,
}

impl<'a> Command<'a> {
    pub fn parse(line: &'a [u8]) -> Result<Self, OtaError> {
        let (name, rest) = split_field(line);

        match trim_end(name) {
            b"start-read" => Ok(Command::StartRead),
            b"read-chunk" => {
                let mut args = Args::new(rest);
                let address = args.number()?;
                let length = args.number()? as usize;
                Ok(Command::ReadChunk { address, length })
            }
            b"start-write" => {
                let mut args = Args::new(rest);
                let file_length = args.number()?;
                let address = args.optional_number()?;
                Ok(Command::StartWrite { file_length, address })
            }
            b"send-chunk" => {
                let rest = rest.ok_or(OtaError::MissingOrInvalidParameter)?;
                let (length, rest) = split_field(rest);
                let rest = rest.ok_or(OtaError::MissingOrInvalidParameter)?;
                let (crc, payload) = split_field(rest);
                let payload = payload.ok_or(OtaError::MissingOrInvalidParameter)?;

                Ok(Command::SendChunk(ChunkRecord {
                    declared_length: parse_number(length)? as usize,
                    declared_crc: parse_number(crc)?,
                    payload,
                }))
            }
            b"finish" => {
                let mut args = Args::new(rest);
                let reference = match args.next() {
                    Some(token) => Some(core::str::from_utf8(token).map_err(|_| OtaError::MissingOrInvalidParameter)?),
                    None => None,
                };
                Ok(Command::Finish { reference })
            }
            b"commit" => Ok(Command::Commit),
            _ => Err(OtaError::UnknownCommand),
        }
    }
}

/// Split at the first space. The remainder is `None` when there is no separator.
fn split_field(input: &[u8]) -> (&[u8], Option<&[u8]>) {
    match input.iter().position(|&b| b == b' ') {
        Some(idx) => (&input[..idx], Some(&input[idx + 1..])),
        None => (input, None),
    }
}

fn trim_end(mut input: &[u8]) -> &[u8] {
    while let [head @ .., last] = input {
        if !last.is_ascii_whitespace() {
            break;
        }
        input = head;
    }
    input
}

/// Whitespace separated arguments of the non-payload commands.
struct Args<'a> {
    tokens: core::slice::Split<'a, u8, fn(&u8) -> bool>,
}

impl<'a> Args<'a> {
    fn new(rest: Option<&'a [u8]>) -> Self {
        let is_separator: fn(&u8) -> bool = |b| b.is_ascii_whitespace();
        Self {
            tokens: trim_end(rest.unwrap_or_default()).split(is_separator),
        }
    }

    fn next(&mut self) -> Option<&'a [u8]> {
        self.tokens.by_ref().find(|token| !token.is_empty())
    }

    fn number(&mut self) -> Result<u32, OtaError> {
        self.next().ok_or(OtaError::MissingOrInvalidParameter).and_then(parse_number)
    }

    fn optional_number(&mut self) -> Result<Option<u32>, OtaError> {
        self.next().map(parse_number).transpose()
    }
}

/// Decimal or `0x` prefixed hexadecimal.
pub fn parse_number(token: &[u8]) -> Result<u32, OtaError> {
    let text = core::str::from_utf8(token).map_err(|_| OtaError::MissingOrInvalidParameter)?;
    let parsed = match text.strip_prefix("0x").or_else(|| text.strip_prefix("0X")) {
        Some(hex) => u32::from_str_radix(hex, 16),
        None => text.parse::<u32>(),
    };
    parsed.map_err(|_| OtaError::MissingOrInvalidParameter)
}
