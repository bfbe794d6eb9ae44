use consts::SECTOR_SIZE;
use ota_protocol::{OtaError, TransferDigest};

use super::*;
use crate::flash::{write_verify_sector, SectorOutcome};

#[test]
fn identical_sector_is_skipped() {
    let mut flash = MemFlash::new();
    let mut scratch = [0u8; SECTOR_SIZE];
    let mut digest = TransferDigest::new();
    let data = image(SECTOR_SIZE);

    let first = write_verify_sector(&mut flash, 3, &data, &mut scratch, &mut digest).unwrap();
    assert_eq!(first, SectorOutcome::Written);
    assert_eq!(flash.erases, 1);

    let second = write_verify_sector(&mut flash, 3, &data, &mut scratch, &mut digest).unwrap();
    assert_eq!(second, SectorOutcome::Skipped);
    assert_eq!(flash.erases, 1);
    assert_eq!(&flash.data[3 * SECTOR_SIZE..4 * SECTOR_SIZE], &data[..]);
}

#[test]
fn digest_covers_flash_resident_bytes() {
    let mut flash = MemFlash::new();
    let mut scratch = [0u8; SECTOR_SIZE];
    let mut digest = TransferDigest::new();
    let data = image(SECTOR_SIZE);

    write_verify_sector(&mut flash, 1, &data, &mut scratch, &mut digest).unwrap();
    assert_eq!(digest.finalize().to_hex().as_str(), md5_hex(&data));
}

#[test]
fn short_final_sector_pads_to_write_size() {
    let mut flash = MemFlash::new();
    let mut scratch = [0u8; SECTOR_SIZE];
    let mut digest = TransferDigest::new();
    let data = image(101);

    let outcome = write_verify_sector(&mut flash, 2, &data, &mut scratch, &mut digest).unwrap();
    assert_eq!(outcome, SectorOutcome::Written);

    let base = 2 * SECTOR_SIZE;
    assert_eq!(&flash.data[base..base + 101], &data[..]);
    assert!(flash.data[base + 101..base + SECTOR_SIZE].iter().all(|&b| b == 0xFF));
}

#[test]
fn verify_mismatch_is_reported() {
    let mut flash = MemFlash::new();
    flash.stuck_at = Some(SECTOR_SIZE + 17);
    let mut scratch = [0u8; SECTOR_SIZE];
    let mut digest = TransferDigest::new();
    let data = [0u8; SECTOR_SIZE];

    assert_eq!(
        write_verify_sector(&mut flash, 1, &data, &mut scratch, &mut digest),
        Err(OtaError::FlashVerifyMismatch { sector: 1 })
    );
}

#[test]
fn small_scratch_is_refused() {
    let mut flash = MemFlash::new();
    let mut scratch = [0u8; 512];
    let mut digest = TransferDigest::new();

    assert_eq!(
        write_verify_sector(&mut flash, 0, &[1, 2, 3, 4], &mut scratch, &mut digest),
        Err(OtaError::ScratchBufferTooSmall {
            available: 512,
            required: SECTOR_SIZE
        })
    );
    assert_eq!(flash.writes, 0);
}
