//! Integration-level checks for the properties enumerated in the
//! ingestion server's testable-properties section: catalog round-trips,
//! garbage tolerance, Mercury precondition, idempotence, and ack echo.

use bytes::Bytes;
use galileosky_protocol::catalog::{TagLength, TAG_CATALOG};
use galileosky_protocol::frame::FrameAssembler;
use galileosky_protocol::mercury;
use galileosky_protocol::tags::parse_packet;

#[test]
fn every_fixed_length_catalog_tag_round_trips() {
    for descriptor in TAG_CATALOG {
        let TagLength::Fixed(len) = descriptor.length else {
            continue;
        };
        let synthetic: Vec<u8> = (0..len).map(|i| (i % 256) as u8).collect();
        let mut payload = vec![descriptor.id];
        payload.extend(&synthetic);

        let packet = parse_packet(&Bytes::from(payload));
        assert_eq!(packet.tags.len(), 1, "tag {:#04x} failed to round-trip", descriptor.id);
        assert_eq!(packet.tags[0].id, descriptor.id);
        assert_eq!(&packet.tags[0].data[..], &synthetic[..]);
        assert!(packet.skipped.is_empty());
    }
}

#[test]
fn garbage_prefixed_frame_is_recovered_with_no_loss_after() {
    let mut assembler = FrameAssembler::new();
    let mut stream = vec![0x00, 0xFE, 0x7F, 0x01, 0x01, 0x02];
    stream.extend([0x01, 0x02, 0x00, 0x10, 0x20, 0xAB, 0xCD]);
    assembler.feed(&stream);

    let frame = assembler.next_frame().expect("frame recovered after garbage");
    assert_eq!(frame.payload(), &[0x10, 0x20]);
    assert_eq!(frame.checksum(), 0xCDAB);
}

#[test]
fn mercury_decode_is_total_over_wrong_length_and_missing_marker() {
    assert!(mercury::decode(&[0x02; 10]).is_none());
    let mut wrong_marker = vec![0u8; mercury::MERCURY_BLOB_LEN];
    wrong_marker[0] = 0x01;
    assert!(mercury::decode(&wrong_marker).is_none());
}

#[test]
fn parsing_a_payload_twice_is_idempotent() {
    let payload = Bytes::from_static(&[0x10, 0xD2, 0x04, 0x35, 0x01, 0x99, 0x41, 0x01, 0x00]);
    assert_eq!(parse_packet(&payload), parse_packet(&payload));
}

#[test]
fn recognised_tag_order_matches_input_order() {
    let payload = Bytes::from_static(&[0x35, 0x01, 0x10, 0xD2, 0x04, 0x49, 0x02]);
    let packet = parse_packet(&payload);
    let ids: Vec<u8> = packet.tags.iter().map(|t| t.id).collect();
    assert_eq!(ids, vec![0x35, 0x10, 0x49]);
}

#[test]
fn ack_echoes_received_checksum_byte_for_byte() {
    let mut assembler = FrameAssembler::new();
    assembler.feed(&[0x01, 0x03, 0x00, 0x10, 0xD2, 0x04, 0x12, 0x34]);
    let frame = assembler.next_frame().unwrap();
    assert_eq!(frame.ack(), [0x02, 0x12, 0x34]);
}
