use super::*;

#[test]
fn chunk_crc_is_standard_crc32() {
    assert_eq!(chunk_crc(b"123456789"), 0xCBF4_3926);
    assert_eq!(chunk_crc(b""), 0);
}

#[test]
fn digest_accumulates_across_updates() {
    let mut digest = TransferDigest::new();
    digest.update(b"a");
    digest.update(b"bc");
    assert_eq!(digest.finalize().to_hex().as_str(), "900150983cd24fb0d6963f7d28e17f72");

    // finalize leaves a fresh accumulator behind
    assert_eq!(digest.finalize().to_hex().as_str(), "d41d8cd98f00b204e9800998ecf8427e");
}

#[test]
fn digest_renders_lowercase_with_leading_zeros() {
    let mut bytes = [0u8; 16];
    bytes[0] = 0x0a;
    bytes[1] = 0xf0;
    bytes[15] = 0x01;
    let value = DigestValue(bytes);
    assert_eq!(value.to_hex().as_str(), "0af00000000000000000000000000001");

    let mut response = [0u8; 64];
    let len = Response::ReadOk {
        digest: value,
        transferred: 0,
    }
    .encode(&mut response)
    .unwrap();
    assert_eq!(&response[..len], b"READ_OK 0af00000000000000000000000000001 0\n");
}

#[test]
fn digest_hex_parsing_ignores_case() {
    let lower = DigestValue::from_hex("900150983cd24fb0d6963f7d28e17f72").unwrap();
    let upper = DigestValue::from_hex("900150983CD24FB0D6963F7D28E17F72").unwrap();
    assert_eq!(lower, upper);

    assert_eq!(DigestValue::from_hex("9001"), Err(OtaError::MissingOrInvalidParameter));
    assert_eq!(
        DigestValue::from_hex("zz0150983cd24fb0d6963f7d28e17f72"),
        Err(OtaError::MissingOrInvalidParameter)
    );
}

#[test]
fn chunk_with_short_payload_is_rejected() {
    let payload = [0x55u8; 10];
    let record = ChunkRecord {
        declared_length: 12,
        declared_crc: chunk_crc(&payload),
        payload: &payload,
    };
    assert_eq!(
        record.validate(),
        Err(OtaError::ChunkLengthMismatch { declared: 12, actual: 10 })
    );
}

#[test]
fn chunk_with_wrong_crc_is_rejected() {
    let record = ChunkRecord {
        declared_length: 9,
        declared_crc: 0x1234_5678,
        payload: b"123456789",
    };
    assert_eq!(
        record.validate(),
        Err(OtaError::ChunkCrcMismatch {
            declared: 0x1234_5678,
            actual: 0xCBF4_3926
        })
    );
}

#[test]
fn read_length_limit() {
    assert!(codec::check_read_length(1024).is_ok());
    assert_eq!(
        codec::check_read_length(1025),
        Err(OtaError::ChunkTooLarge { requested: 1025, max: 1024 })
    );
}

#[test]
fn parse_simple_commands() {
    assert_eq!(Command::parse(b"start-read"), Ok(Command::StartRead));
    assert_eq!(Command::parse(b"commit\r\n"), Ok(Command::Commit));
    assert_eq!(
        Command::parse(b"read-chunk 0x2000 1024\n"),
        Ok(Command::ReadChunk { address: 0x2000, length: 1024 })
    );
    assert_eq!(Command::parse(b"launch"), Err(OtaError::UnknownCommand));
}

#[test]
fn parse_start_write_with_and_without_address() {
    assert_eq!(
        Command::parse(b"start-write 4096"),
        Ok(Command::StartWrite { file_length: 4096, address: None })
    );
    assert_eq!(
        Command::parse(b"start-write 4096 0x1000"),
        Ok(Command::StartWrite {
            file_length: 4096,
            address: Some(0x1000)
        })
    );
    assert_eq!(Command::parse(b"start-write"), Err(OtaError::MissingOrInvalidParameter));
    assert_eq!(Command::parse(b"start-write 12k"), Err(OtaError::MissingOrInvalidParameter));
}

#[test]
fn send_chunk_payload_is_verbatim() {
    let line = b"send-chunk 5 3735928559 a b\n\0";
    match Command::parse(line) {
        Ok(Command::SendChunk(record)) => {
            assert_eq!(record.declared_length, 5);
            assert_eq!(record.declared_crc, 0xDEAD_BEEF);
            assert_eq!(record.payload, b"a b\n\0");
        }
        other => panic!("unexpected {:?}", other),
    }

    match Command::parse(b"send-chunk 0 0 ") {
        Ok(Command::SendChunk(record)) => assert!(record.payload.is_empty()),
        other => panic!("unexpected {:?}", other),
    }

    assert_eq!(Command::parse(b"send-chunk 5 0"), Err(OtaError::MissingOrInvalidParameter));
}

#[test]
fn parse_finish_reference() {
    assert_eq!(Command::parse(b"finish"), Ok(Command::Finish { reference: None }));
    assert_eq!(
        Command::parse(b"finish d41d8cd98f00b204e9800998ecf8427e\n"),
        Ok(Command::Finish {
            reference: Some("d41d8cd98f00b204e9800998ecf8427e")
        })
    );
}

#[test]
fn encode_data_response() {
    let mut out = [0u8; 64];
    let record = DataRecord::new(9, b"123456789");
    let len = Response::Data(record).encode(&mut out).unwrap();
    assert_eq!(&out[..len], b"DATA 9 9 3421780262 @123456789");
}

#[test]
fn encode_write_responses() {
    let mut out = [0u8; 128];
    let len = Response::Write {
        target: WriteTarget::ExplicitAddress(0x1000),
        first_sector: 1,
    }
    .encode(&mut out)
    .unwrap();
    assert_eq!(&out[..len], b"WRITE -1 1\n");

    let len = Response::Write {
        target: WriteTarget::ManagedSlot(1),
        first_sector: 0x102,
    }
    .encode(&mut out)
    .unwrap();
    assert_eq!(&out[..len], b"WRITE 1 258\n");

    let digest = DigestValue([0xab; 16]);
    let len = Response::WriteOk {
        target: WriteTarget::ExplicitAddress(0),
        local: digest,
        remote: digest,
        sectors_written: 2,
        sectors_skipped: 1,
    }
    .encode(&mut out)
    .unwrap();
    assert_eq!(
        &out[..len],
        b"PARTIAL_WRITE_OK abababababababababababababababab abababababababababababababababab 2 1\n"
    );
}

#[test]
fn encode_error_response() {
    let mut out = [0u8; 128];
    let len = Response::Error(OtaError::UnalignedAddress(0x1001)).encode(&mut out).unwrap();
    assert_eq!(&out[..len], b"ERROR unaligned-address: start address not aligned: 1001\n");
}

#[test]
fn encode_into_short_buffer_fails() {
    let mut out = [0u8; 8];
    let record = DataRecord::new(4, b"abcd");
    assert!(matches!(
        Response::Data(record).encode(&mut out),
        Err(OtaError::ScratchBufferTooSmall { available: 8, .. })
    ));
}
