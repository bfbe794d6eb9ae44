// SPDX-FileCopyrightText: 2024 Foundation Devices, Inc. <hello@foundationdevices.com>
// SPDX-License-Identifier: GPL-3.0-or-later

//! Update session state machine.
//!
//! ```text
//!             start-read            read-chunk
//!  Inactive ─────────────► Reading ◄──────────┐
//!     ▲  │                   │ finish ─────────┘
//!     │  │ start-write       ▼
//!     │  └──────────► Writing ──finish──► Successful ──commit──► Inactive
//!     │                  │ send-chunk        (managed slot)
//!     └──── any error, read finish, explicit-address finish
//! ```
//!
//! Every rejected command drops the session back to `Inactive`.

use consts::{MAX_READ_CHUNK, SECTOR_SIZE};
use embedded_storage::nor_flash::NorFlash;
use heapless::Vec;
use ota_protocol::{codec, ChunkRecord, Command, DataRecord, DigestValue, OtaError, Response, TransferDigest, WriteTarget};

use crate::boot::BootSlots;
use crate::flash::{self, SectorOutcome};
use crate::radio::{NoRadio, RadioScan};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum SessionState {
    Inactive,
    Reading,
    Writing,
    /// Image written and verified to a managed slot, waiting for `commit`
    Successful,
}

/// The one update session of the device.
pub struct Session {
    state: SessionState,
    bytes_transferred: u32,
    remote_file_length: u32,
    sector_cursor: u32,
    target: WriteTarget,
    sectors_written: u32,
    sectors_skipped: u32,
    digest: TransferDigest,
    pending: Vec<u8, SECTOR_SIZE>,
}

impl Default for Session {
    fn default() -> Self {
        Self {
            state: SessionState::Inactive,
            bytes_transferred: 0,
            remote_file_length: 0,
            sector_cursor: 0,
            target: WriteTarget::ExplicitAddress(0),
            sectors_written: 0,
            sectors_skipped: 0,
            digest: TransferDigest::new(),
            pending: Vec::new(),
        }
    }
}

impl Session {
    pub fn state(&self) -> SessionState {
        self.state
    }

    pub fn bytes_transferred(&self) -> u32 {
        self.bytes_transferred
    }

    pub fn sector_cursor(&self) -> u32 {
        self.sector_cursor
    }

    pub fn target(&self) -> WriteTarget {
        self.target
    }

    pub fn sectors_written(&self) -> u32 {
        self.sectors_written
    }

    pub fn sectors_skipped(&self) -> u32 {
        self.sectors_skipped
    }

    /// Bytes received but not yet flushed to flash.
    pub fn pending_len(&self) -> usize {
        self.pending.len()
    }

    fn begin(&mut self, state: SessionState) {
        *self = Self {
            state,
            ..Self::default()
        };
    }

    fn abort(&mut self) {
        self.state = SessionState::Inactive;
        self.pending.clear();
    }
}

/// Drives the session against the flash, the boot slots and the radio guard.
///
/// `SCRATCH` is the capacity of the verify buffer each flush allocates on the stack;
/// sessions are refused when it cannot hold a sector.
pub struct Updater<F, B, R = NoRadio, const SCRATCH: usize = SECTOR_SIZE> {
    flash: F,
    boot: B,
    radio: R,
    session: Session,
}

impl<F, B, R, const SCRATCH: usize> Updater<F, B, R, SCRATCH>
where
    F: NorFlash,
    B: BootSlots,
    R: RadioScan,
{
    pub fn new(flash: F, boot: B, radio: R) -> Self {
        Self {
            flash,
            boot,
            radio,
            session: Session::default(),
        }
    }

    /// True while a read or write session is open or a written image awaits commit.
    /// Other flash users should stay away meanwhile.
    pub fn is_active(&self) -> bool {
        self.session.state != SessionState::Inactive
    }

    pub fn session(&self) -> &Session {
        &self.session
    }

    pub fn flash(&self) -> &F {
        &self.flash
    }

    pub fn flash_mut(&mut self) -> &mut F {
        &mut self.flash
    }

    pub fn boot(&self) -> &B {
        &self.boot
    }

    pub fn boot_mut(&mut self) -> &mut B {
        &mut self.boot
    }

    /// Parse `line`, run the command and encode the response into `out`.
    /// Returns the response length.
    pub fn handle(&mut self, line: &[u8], out: &mut [u8]) -> usize {
        let mut chunk = [0u8; MAX_READ_CHUNK];

        let result = match Command::parse(line) {
            Ok(Command::StartRead) => self.start_read(),
            Ok(Command::ReadChunk { address, length }) => self.read_chunk(address, length, &mut chunk),
            Ok(Command::StartWrite { file_length, address }) => self.start_write(file_length, address),
            Ok(Command::SendChunk(record)) => self.send_chunk(record),
            Ok(Command::Finish { reference }) => self.finish(reference),
            Ok(Command::Commit) => self.commit(),
            Err(OtaError::UnknownCommand) => Err(OtaError::UnknownCommand),
            Err(err) => self.settle(Err(err)),
        };

        let response = result.unwrap_or_else(Response::Error);
        match response.encode(out) {
            Ok(len) => len,
            Err(err) => {
                warn!("response does not fit: {}", err);
                self.session.abort();
                Response::Error(err).encode(out).unwrap_or(0)
            }
        }
    }

    pub fn start_read(&mut self) -> Result<Response<'static>, OtaError> {
        let result = self.try_start_read();
        self.settle(result).map(|_| Response::Read)
    }

    /// Read `length` bytes at `address` into `out` and describe them.
    pub fn read_chunk<'o>(&mut self, address: u32, length: usize, out: &'o mut [u8]) -> Result<Response<'o>, OtaError> {
        let result = self.try_read_chunk(address, length, out);
        let transferred = self.settle(result)?;
        Ok(Response::Data(DataRecord::new(transferred, &out[..length])))
    }

    pub fn start_write(&mut self, file_length: u32, address: Option<u32>) -> Result<Response<'static>, OtaError> {
        let result = self.try_start_write(file_length, address);
        self.settle(result)
    }

    pub fn send_chunk(&mut self, record: ChunkRecord<'_>) -> Result<Response<'static>, OtaError> {
        let result = self.try_send_chunk(record);
        self.settle(result).map(|transferred| Response::Ack { transferred })
    }

    /// Close the session. Write sessions need the client's digest as `reference`.
    pub fn finish(&mut self, reference: Option<&str>) -> Result<Response<'static>, OtaError> {
        let result = self.try_finish(reference);
        self.settle(result)
    }

    /// Switch the boot slot to the freshly written image. The caller is expected to
    /// reboot once the response went out.
    pub fn commit(&mut self) -> Result<Response<'static>, OtaError> {
        let result = self.try_commit();
        self.settle(result)
    }

    fn settle<T>(&mut self, result: Result<T, OtaError>) -> Result<T, OtaError> {
        if let Err(err) = &result {
            warn!("ota: {} in state {:?}, session aborted", err, self.session.state);
            self.session.abort();
        }
        result
    }

    fn require(&self, state: SessionState) -> Result<(), OtaError> {
        if self.session.state != state {
            return Err(OtaError::NotActive);
        }
        Ok(())
    }

    fn check_can_start(&self) -> Result<(), OtaError> {
        self.require(SessionState::Inactive)?;
        if SCRATCH < SECTOR_SIZE {
            return Err(OtaError::ScratchBufferTooSmall {
                available: SCRATCH,
                required: SECTOR_SIZE,
            });
        }
        if self.radio.scan_active() {
            return Err(OtaError::RadioScanActive);
        }
        Ok(())
    }

    fn try_start_read(&mut self) -> Result<(), OtaError> {
        self.check_can_start()?;
        self.session.begin(SessionState::Reading);
        info!("ota: read session started");
        Ok(())
    }

    fn try_read_chunk(&mut self, address: u32, length: usize, out: &mut [u8]) -> Result<u32, OtaError> {
        self.require(SessionState::Reading)?;
        codec::check_read_length(length)?;
        if out.len() < length {
            return Err(OtaError::ScratchBufferTooSmall {
                available: out.len(),
                required: length,
            });
        }

        let bytes = &mut out[..length];
        flash::read_at(&mut self.flash, address, bytes)?;
        self.session.digest.update(bytes);
        self.session.bytes_transferred += length as u32;
        trace!("ota: read {} bytes at {:x}", length, address);

        Ok(self.session.bytes_transferred)
    }

    fn try_start_write(&mut self, file_length: u32, address: Option<u32>) -> Result<Response<'static>, OtaError> {
        self.check_can_start()?;

        let (target, start_address) = match address {
            Some(address) => (WriteTarget::ExplicitAddress(address), address),
            None => {
                let (slot, address) = self.boot.current_inactive_slot_address()?;
                (WriteTarget::ManagedSlot(slot), address)
            }
        };

        if start_address % SECTOR_SIZE as u32 != 0 {
            return Err(OtaError::UnalignedAddress(start_address));
        }

        let first_sector = start_address / SECTOR_SIZE as u32;
        self.session.begin(SessionState::Writing);
        self.session.remote_file_length = file_length;
        self.session.target = target;
        self.session.sector_cursor = first_sector;

        info!(
            "ota: write session started, {} bytes to {:x} ({:?})",
            file_length, start_address, target
        );
        Ok(Response::Write { target, first_sector })
    }

    fn try_send_chunk(&mut self, record: ChunkRecord<'_>) -> Result<u32, OtaError> {
        self.require(SessionState::Writing)?;
        let payload = record.validate()?;

        // nothing past the declared length reaches flash
        let received = u64::from(self.session.bytes_transferred) + (self.session.pending.len() + payload.len()) as u64;
        if received > u64::from(self.session.remote_file_length) {
            return Err(OtaError::FileSizeMismatch {
                expected: self.session.remote_file_length,
                actual: u32::try_from(received).unwrap_or(u32::MAX),
            });
        }

        let buffered = self.session.pending.len() + payload.len();
        if buffered > SECTOR_SIZE {
            return Err(OtaError::UnalignedBufferOverflow(buffered));
        }
        self.session
            .pending
            .extend_from_slice(payload)
            .map_err(|_| OtaError::UnalignedBufferOverflow(buffered))?;

        if self.session.pending.len() == SECTOR_SIZE {
            self.flush()?;
        }
        Ok(self.session.bytes_transferred)
    }

    /// Hand the pending buffer to the sector writer and advance the cursor.
    fn flush(&mut self) -> Result<(), OtaError> {
        let mut scratch = [0u8; SCRATCH];
        let session = &mut self.session;

        let outcome = flash::write_verify_sector(
            &mut self.flash,
            session.sector_cursor,
            &session.pending,
            &mut scratch,
            &mut session.digest,
        )?;

        match outcome {
            SectorOutcome::Written => session.sectors_written += 1,
            SectorOutcome::Skipped => session.sectors_skipped += 1,
        }
        session.sector_cursor += 1;
        session.bytes_transferred += session.pending.len() as u32;
        session.pending.clear();
        Ok(())
    }

    fn try_finish(&mut self, reference: Option<&str>) -> Result<Response<'static>, OtaError> {
        match self.session.state {
            SessionState::Reading => {
                let digest = self.session.digest.finalize();
                let transferred = self.session.bytes_transferred;
                self.session.state = SessionState::Inactive;
                info!("ota: read session finished, {} bytes", transferred);
                Ok(Response::ReadOk { digest, transferred })
            }
            SessionState::Writing => {
                let remote = DigestValue::from_hex(reference.ok_or(OtaError::MissingOrInvalidParameter)?)?;

                if !self.session.pending.is_empty() {
                    self.flush()?;
                }

                let local = self.session.digest.finalize();
                let session = &mut self.session;
                if session.remote_file_length != session.bytes_transferred {
                    return Err(OtaError::FileSizeMismatch {
                        expected: session.remote_file_length,
                        actual: session.bytes_transferred,
                    });
                }
                if local != remote {
                    return Err(OtaError::DigestMismatch);
                }

                session.state = match session.target {
                    WriteTarget::ExplicitAddress(_) => SessionState::Inactive,
                    WriteTarget::ManagedSlot(_) => SessionState::Successful,
                };
                info!(
                    "ota: image verified, {} sectors written, {} skipped",
                    session.sectors_written, session.sectors_skipped
                );

                Ok(Response::WriteOk {
                    target: session.target,
                    local,
                    remote,
                    sectors_written: session.sectors_written,
                    sectors_skipped: session.sectors_skipped,
                })
            }
            SessionState::Inactive | SessionState::Successful => Err(OtaError::NotActive),
        }
    }

    fn try_commit(&mut self) -> Result<Response<'static>, OtaError> {
        if !self.boot.supported() {
            return Err(OtaError::SlotsUnsupported);
        }
        self.require(SessionState::Successful)?;

        let WriteTarget::ManagedSlot(slot) = self.session.target else {
            return Err(OtaError::NotActive);
        };
        self.boot.commit_slot(slot)?;
        self.session.state = SessionState::Inactive;

        info!("ota: slot {} committed", slot);
        Ok(Response::CommitOk { slot })
    }
}
