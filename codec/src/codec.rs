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

use super::{CodecError, CodecResult, Packet};
use bytes::{Buf, BufMut, Bytes, BytesMut};
use tokio_util::codec::{Decoder, Encoder};
use tracing::trace;

/// Maximum payload size in bytes (64 KiB). A frame declaring more is a fatal
/// protocol error for its connection.
pub const MAX_PAYLOAD_SIZE: usize = 64 * 1024;

/// Size of the big-endian length prefix preceding every payload.
pub const LENGTH_PREFIX_LEN: usize = 4;

/// One decoded frame off the wire.
///
/// The framing layer has no opinion on packet semantics, so a well-framed
/// payload that fails to parse is still a successfully decoded frame. Whether
/// a malformed payload tears the connection down is the caller's policy.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Inbound {
    /// A well-formed packet.
    Packet(Packet),
    /// Payload bytes were well-framed but did not parse as a packet.
    Malformed {
        /// Description of the parse failure
        reason: String,
    },
}

/// Serialize a packet into a complete wire frame (length prefix included).
///
/// Broadcast uses this to encode a packet exactly once and hand cheaply
/// cloneable [`Bytes`] to every recipient's writer.
pub fn encode_frame(packet: &Packet) -> CodecResult<Bytes> {
    let payload = serde_json::to_vec(packet).map_err(|err| CodecError::EncodingFailed {
        reason: err.to_string(),
    })?;
    if payload.len() > MAX_PAYLOAD_SIZE {
        return Err(CodecError::FrameTooLarge {
            declared: payload.len(),
            limit: MAX_PAYLOAD_SIZE,
        });
    }
    let mut frame = BytesMut::with_capacity(LENGTH_PREFIX_LEN + payload.len());
    frame.put_u32(payload.len() as u32);
    frame.extend_from_slice(&payload);
    Ok(frame.freeze())
}

/// A codec for the Crosstalk length-prefixed packet protocol.
///
/// Stateless; the accumulation buffer lives in the `Framed` transport driving
/// it. Pair with `FramedRead`/`FramedWrite` over any ordered, reliable byte
/// stream.
#[derive(Debug, Default, Clone, Copy)]
pub struct PacketCodec;

impl PacketCodec {
    /// Creates a new instance of `PacketCodec`.
    pub fn new() -> PacketCodec {
        PacketCodec
    }
}

impl Decoder for PacketCodec {
    type Item = Inbound;
    type Error = CodecError;

    fn decode(&mut self, src: &mut BytesMut) -> CodecResult<Option<Inbound>> {
        if src.len() < LENGTH_PREFIX_LEN {
            return Ok(None);
        }

        let mut prefix = [0u8; LENGTH_PREFIX_LEN];
        prefix.copy_from_slice(&src[..LENGTH_PREFIX_LEN]);
        let length = u32::from_be_bytes(prefix) as usize;

        // Validate the declared length before reserving anything for the
        // payload; a hostile header must not drive an allocation.
        if length > MAX_PAYLOAD_SIZE {
            return Err(CodecError::FrameTooLarge {
                declared: length,
                limit: MAX_PAYLOAD_SIZE,
            });
        }

        if src.len() < LENGTH_PREFIX_LEN + length {
            src.reserve(LENGTH_PREFIX_LEN + length - src.len());
            return Ok(None);
        }

        src.advance(LENGTH_PREFIX_LEN);
        let payload = src.split_to(length);
        trace!(length, "decoded frame");

        match serde_json::from_slice::<Packet>(&payload) {
            Ok(packet) => Ok(Some(Inbound::Packet(packet))),
            Err(err) => Ok(Some(Inbound::Malformed {
                reason: err.to_string(),
            })),
        }
    }
}

impl Encoder<&Packet> for PacketCodec {
    type Error = CodecError;

    fn encode(&mut self, packet: &Packet, dst: &mut BytesMut) -> CodecResult<()> {
        let frame = encode_frame(packet)?;
        dst.extend_from_slice(&frame);
        Ok(())
    }
}

impl Encoder<Packet> for PacketCodec {
    type Error = CodecError;

    fn encode(&mut self, packet: Packet, dst: &mut BytesMut) -> CodecResult<()> {
        Encoder::<&Packet>::encode(self, &packet, dst)
    }
}
