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

//! Wire codec for the Crosstalk chat protocol.
//!
//! Every message on the wire is a frame of the form
//!
//! ```text
//! [4-byte big-endian unsigned length][length bytes of UTF-8 JSON]
//! ```
//!
//! where the JSON payload is the textual encoding of a [`Packet`]. The
//! [`PacketCodec`] implements the tokio-util [`Encoder`]/[`Decoder`] traits so
//! it can drive a `Framed` stream directly; [`encode_frame`] is the standalone
//! entry point for callers that want to serialize a packet once and hand the
//! resulting bytes to many writers.
//!
//! Framing errors (a declared length above [`MAX_PAYLOAD_SIZE`], stream I/O
//! failures) are fatal for the connection and surface as [`CodecError`]. A
//! well-framed payload that fails to parse is *not* an error at this layer:
//! the decoder yields [`Inbound::Malformed`] and the caller decides whether to
//! drop the frame or hang up.
//!
//! [`Encoder`]: tokio_util::codec::Encoder
//! [`Decoder`]: tokio_util::codec::Decoder

mod codec;
mod packet;
mod result;

pub use codec::{Inbound, LENGTH_PREFIX_LEN, MAX_PAYLOAD_SIZE, PacketCodec, encode_frame};
pub use packet::{Packet, PacketKind, SERVER_NAME};
pub use result::{CodecError, CodecResult};
