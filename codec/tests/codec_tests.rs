//
// Copyright 2017-2026 Hans W. Uhlig. All Rights Reserved.
//
// Licensed under the Apache License, Version 2.0 (the "License");
// you may not use this file except in compliance with the License.
// You may obtain a copy of the License at
//
//      http://www.apache.org/licenses/LICENSE-2.0
//
// Unless required by applicable law or agreed to in writing, software
// distributed under the License is distributed on an "AS IS" BASIS,
// WITHOUT WARRANTIES OR CONDITIONS OF ANY KIND, either express or implied.
// See the License for the specific language governing permissions and
// limitations under the License.
//

//! Unit tests for the packet codec

use bytes::{BufMut, BytesMut};
use crosstalk_codec::{
    CodecError, Inbound, LENGTH_PREFIX_LEN, MAX_PAYLOAD_SIZE, Packet, PacketCodec, PacketKind,
    encode_frame,
};
use tokio_util::codec::{Decoder, Encoder};

// ============================================================================
// Helper Functions
// ============================================================================

fn encode_packet(packet: &Packet) -> BytesMut {
    let mut codec = PacketCodec::new();
    let mut buffer = BytesMut::new();
    codec.encode(packet, &mut buffer).unwrap();
    buffer
}

fn decode_one(buffer: &mut BytesMut) -> Option<Inbound> {
    PacketCodec::new().decode(buffer).unwrap()
}

fn round_trip(packet: Packet) {
    let mut buffer = encode_packet(&packet);
    let decoded = decode_one(&mut buffer).expect("complete frame");
    assert_eq!(decoded, Inbound::Packet(packet));
    assert!(buffer.is_empty());
}

// ============================================================================
// Round-Trip Tests
// ============================================================================

#[test]
fn round_trip_chat() {
    round_trip(Packet::chat("hello there"));
    round_trip(Packet::chat_from("Alice", "hello there"));
}

#[test]
fn round_trip_system() {
    round_trip(Packet::system("Alice left the chat"));
}

#[test]
fn round_trip_command() {
    round_trip(Packet::command("name", "Alice"));
    round_trip(Packet::command("who", ""));
}

#[test]
fn round_trip_liveness() {
    round_trip(Packet::ping());
    round_trip(Packet::pong());
}

#[test]
fn round_trip_unicode_text() {
    round_trip(Packet::chat_from("Ægir", "héllo wörld \u{1F980}"));
}

// ============================================================================
// JSON Shape Tests
// ============================================================================

#[test]
fn absent_fields_are_omitted() {
    let buffer = encode_packet(&Packet::chat("hi"));
    let payload = std::str::from_utf8(&buffer[LENGTH_PREFIX_LEN..]).unwrap();
    assert_eq!(payload, r#"{"type":"chat","text":"hi"}"#);
}

#[test]
fn server_packets_carry_server_from() {
    let buffer = encode_packet(&Packet::ping());
    let payload = std::str::from_utf8(&buffer[LENGTH_PREFIX_LEN..]).unwrap();
    assert_eq!(payload, r#"{"type":"ping","from":"SERVER"}"#);
}

#[test]
fn unknown_type_decodes_to_unknown_kind() {
    let payload = br#"{"type":"frobnicate","text":"hi"}"#;
    let mut buffer = BytesMut::new();
    buffer.put_u32(payload.len() as u32);
    buffer.extend_from_slice(payload);

    match decode_one(&mut buffer) {
        Some(Inbound::Packet(packet)) => assert_eq!(packet.kind, PacketKind::Unknown),
        other => panic!("expected packet, got {:?}", other),
    }
}

#[test]
fn client_supplied_from_survives_decode() {
    // The codec itself is neutral; discarding a client `from` is the
    // server's responsibility.
    let payload = br#"{"type":"chat","from":"impostor","text":"hi"}"#;
    let mut buffer = BytesMut::new();
    buffer.put_u32(payload.len() as u32);
    buffer.extend_from_slice(payload);

    match decode_one(&mut buffer) {
        Some(Inbound::Packet(packet)) => assert_eq!(packet.from.as_deref(), Some("impostor")),
        other => panic!("expected packet, got {:?}", other),
    }
}

// ============================================================================
// Framing Tests
// ============================================================================

#[test]
fn partial_prefix_yields_none() {
    let mut buffer = BytesMut::from(&[0u8, 0][..]);
    assert_eq!(decode_one(&mut buffer), None);
    assert_eq!(buffer.len(), 2);
}

#[test]
fn partial_payload_yields_none() {
    let full = encode_packet(&Packet::chat("hello"));
    let mut buffer = BytesMut::from(&full[..full.len() - 3]);
    assert_eq!(decode_one(&mut buffer), None);
}

#[test]
fn chunked_delivery_accumulates() {
    let full = encode_packet(&Packet::chat_from("Guest1", "hi"));
    let mut codec = PacketCodec::new();
    let mut buffer = BytesMut::new();

    for (i, byte) in full.iter().enumerate() {
        buffer.put_u8(*byte);
        let decoded = codec.decode(&mut buffer).unwrap();
        if i + 1 < full.len() {
            assert_eq!(decoded, None);
        } else {
            assert_eq!(
                decoded,
                Some(Inbound::Packet(Packet::chat_from("Guest1", "hi")))
            );
        }
    }
}

#[test]
fn back_to_back_frames_decode_in_order() {
    let mut buffer = BytesMut::new();
    buffer.extend_from_slice(&encode_packet(&Packet::chat("first")));
    buffer.extend_from_slice(&encode_packet(&Packet::chat("second")));

    assert_eq!(
        decode_one(&mut buffer),
        Some(Inbound::Packet(Packet::chat("first")))
    );
    assert_eq!(
        decode_one(&mut buffer),
        Some(Inbound::Packet(Packet::chat("second")))
    );
    assert_eq!(decode_one(&mut buffer), None);
}

#[test]
fn oversized_length_is_rejected_before_payload_arrives() {
    // Only the hostile header is present; the bound check must fire without
    // waiting for (or allocating) the declared payload.
    let mut buffer = BytesMut::new();
    buffer.put_u32((MAX_PAYLOAD_SIZE + 1) as u32);

    let err = PacketCodec::new().decode(&mut buffer).unwrap_err();
    assert_eq!(
        err,
        CodecError::FrameTooLarge {
            declared: MAX_PAYLOAD_SIZE + 1,
            limit: MAX_PAYLOAD_SIZE,
        }
    );
}

#[test]
fn maximum_length_header_is_rejected() {
    let mut buffer = BytesMut::new();
    buffer.put_u32(u32::MAX);

    let err = PacketCodec::new().decode(&mut buffer).unwrap_err();
    assert!(matches!(err, CodecError::FrameTooLarge { .. }));
}

#[test]
fn payload_at_limit_is_accepted() {
    // A frame exactly at the maximum must still round-trip.
    let text = "x".repeat(MAX_PAYLOAD_SIZE - 64);
    round_trip(Packet::chat(text));
}

#[test]
fn encode_rejects_oversized_payload() {
    let packet = Packet::chat("x".repeat(MAX_PAYLOAD_SIZE + 1));
    let err = encode_frame(&packet).unwrap_err();
    assert!(matches!(err, CodecError::FrameTooLarge { .. }));
}

#[test]
fn encode_frame_matches_encoder_output() {
    let packet = Packet::system("welcome");
    let frame = encode_frame(&packet).unwrap();
    let buffer = encode_packet(&packet);
    assert_eq!(&frame[..], &buffer[..]);

    let declared = u32::from_be_bytes(frame[..4].try_into().unwrap()) as usize;
    assert_eq!(declared, frame.len() - LENGTH_PREFIX_LEN);
}

// ============================================================================
// Malformed Payload Tests
// ============================================================================

#[test]
fn malformed_payload_is_reported_not_raised() {
    let payload = b"{not json at all";
    let mut buffer = BytesMut::new();
    buffer.put_u32(payload.len() as u32);
    buffer.extend_from_slice(payload);

    match decode_one(&mut buffer) {
        Some(Inbound::Malformed { .. }) => {}
        other => panic!("expected malformed frame, got {:?}", other),
    }
}

#[test]
fn stream_survives_a_malformed_frame() {
    // The malformed frame's bytes are fully consumed, so the next frame
    // decodes normally.
    let mut buffer = BytesMut::new();
    buffer.put_u32(4);
    buffer.extend_from_slice(b"????");
    buffer.extend_from_slice(&encode_packet(&Packet::pong()));

    let mut codec = PacketCodec::new();
    assert!(matches!(
        codec.decode(&mut buffer).unwrap(),
        Some(Inbound::Malformed { .. })
    ));
    assert_eq!(
        codec.decode(&mut buffer).unwrap(),
        Some(Inbound::Packet(Packet::pong()))
    );
}

#[test]
fn missing_type_field_is_malformed() {
    let payload = br#"{"text":"hi"}"#;
    let mut buffer = BytesMut::new();
    buffer.put_u32(payload.len() as u32);
    buffer.extend_from_slice(payload);

    assert!(matches!(
        decode_one(&mut buffer),
        Some(Inbound::Malformed { .. })
    ));
}
