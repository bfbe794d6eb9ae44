mod flash_tests;

use embedded_storage::nor_flash::{
    check_erase, check_read, check_write, ErrorType, NorFlash, NorFlashErrorKind, ReadNorFlash,
};
use ota_protocol::{chunk_crc, ChunkRecord, TransferDigest};

use crate::boot::{BootConfig, BootStore};

pub const FLASH_SIZE: usize = 0x20000;
pub const SLOT_ADDRESSES: [u32; 2] = [0x2000, 0x10000];

/// RAM backed NOR flash: erase sets 0xFF, programming can only clear bits.
pub struct MemFlash {
    pub data: Vec<u8>,
    pub erases: usize,
    pub writes: usize,
    /// Byte that ignores programming, to fake a worn cell
    pub stuck_at: Option<usize>,
    /// Fail every program operation, to fake power loss mid-update
    pub reject_writes: bool,
}

impl MemFlash {
    pub fn new() -> Self {
        Self {
            data: vec![0xFF; FLASH_SIZE],
            erases: 0,
            writes: 0,
            stuck_at: None,
            reject_writes: false,
        }
    }

    pub fn fill(&mut self, address: usize, bytes: &[u8]) {
        self.data[address..address + bytes.len()].copy_from_slice(bytes);
    }
}

impl ErrorType for MemFlash {
    type Error = NorFlashErrorKind;
}

impl ReadNorFlash for MemFlash {
    const READ_SIZE: usize = 1;

    fn read(&mut self, offset: u32, bytes: &mut [u8]) -> Result<(), Self::Error> {
        check_read(self, offset, bytes.len())?;
        let offset = offset as usize;
        bytes.copy_from_slice(&self.data[offset..offset + bytes.len()]);
        Ok(())
    }

    fn capacity(&self) -> usize {
        self.data.len()
    }
}

impl NorFlash for MemFlash {
    const WRITE_SIZE: usize = 4;
    const ERASE_SIZE: usize = 4096;

    fn erase(&mut self, from: u32, to: u32) -> Result<(), Self::Error> {
        check_erase(self, from, to)?;
        self.data[from as usize..to as usize].fill(0xFF);
        self.erases += 1;
        Ok(())
    }

    fn write(&mut self, offset: u32, bytes: &[u8]) -> Result<(), Self::Error> {
        check_write(self, offset, bytes.len())?;
        if self.reject_writes {
            return Err(NorFlashErrorKind::Other);
        }
        let offset = offset as usize;
        for (idx, byte) in bytes.iter().enumerate() {
            if self.stuck_at == Some(offset + idx) {
                continue;
            }
            self.data[offset + idx] &= *byte;
        }
        self.writes += 1;
        Ok(())
    }
}

/// Boot descriptor store kept in memory.
pub struct MemBootStore {
    pub config: BootConfig,
    pub reject_commit: bool,
    pub commits: usize,
}

impl MemBootStore {
    pub fn new() -> Self {
        Self {
            config: BootConfig::new(SLOT_ADDRESSES, 0),
            reject_commit: false,
            commits: 0,
        }
    }
}

impl BootStore for MemBootStore {
    type Error = ();

    fn load(&mut self) -> Result<BootConfig, Self::Error> {
        Ok(self.config)
    }

    fn set_current_slot(&mut self, slot: u8) -> Result<(), Self::Error> {
        if self.reject_commit {
            return Err(());
        }
        self.config.current_slot = slot;
        self.commits += 1;
        Ok(())
    }
}

/// Deterministic image contents without erased (0xFF) bytes.
pub fn image(len: usize) -> Vec<u8> {
    (0..len).map(|i| ((i * 31 + 7) % 251) as u8).collect()
}

pub fn chunk(payload: &[u8]) -> ChunkRecord<'_> {
    ChunkRecord {
        declared_length: payload.len(),
        declared_crc: chunk_crc(payload),
        payload,
    }
}

pub fn md5_hex(data: &[u8]) -> String {
    let mut digest = TransferDigest::new();
    digest.update(data);
    digest.finalize().to_hex().as_str().into()
}
