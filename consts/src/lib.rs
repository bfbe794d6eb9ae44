// SPDX-FileCopyrightText: 2024 Foundation Devices, Inc. <hello@foundationdevices.com>
// SPDX-License-Identifier: GPL-3.0-or-later

#![no_std]

/// Size of a flash sector in bytes (4KB).
/// This is the minimum erase granularity of the flash device. Every write target
/// address must be aligned to it and the engine flushes received data one full
/// sector at a time.
pub const SECTOR_SIZE: usize = 4096;

/// Largest payload a single `read-chunk` request may ask for.
pub const MAX_READ_CHUNK: usize = 1024;

/// Length of the whole-transfer digest (MD5, 128 bits).
pub const DIGEST_LEN: usize = 16;

/// Length of the hexadecimal rendering of the digest.
pub const DIGEST_HEX_LEN: usize = DIGEST_LEN * 2;

/// Number of firmware slots described by the boot descriptor.
pub const SLOT_COUNT: usize = 2;

/// Magic byte identifying a valid boot descriptor record.
pub const BOOT_CONFIG_MAGIC: u8 = 0xe1;

/// Flash address of the boot descriptor record.
/// The first sector belongs to the second stage loader. The descriptor occupies the
/// two sectors right after it, updates alternate between them.
pub const BOOT_CONFIG_ADDR: u32 = 0x1000;

/// Upper bound for an encoded response: the `DATA` header plus a full read chunk.
pub const MAX_RESPONSE_LEN: usize = MAX_READ_CHUNK + 64;

/// Upper bound for an inbound command: the `send-chunk` header plus a full sector.
pub const MAX_COMMAND_LEN: usize = SECTOR_SIZE + 64;
