// Copyright 2020 Google LLC
//
// Licensed under the Apache License, Version 2.0 (the "License");
// you may not use this file except in compliance with the License.
// You may obtain a copy of the License at
//
// https://www.apache.org/licenses/LICENSE-2.0
//
// Unless required by applicable law or agreed to in writing, software
// distributed under the License is distributed on an "AS IS" BASIS,
// WITHOUT WARRANTIES OR CONDITIONS OF ANY KIND, either express or implied.
// See the License for the specific language governing permissions and
// limitations under the License.

//! The rebase plug-in's other half: [`Codec`], the wire encoding contract
//! a host supplies alongside its `ChangeRebaser`.

use serde::de::DeserializeOwned;
use serde::Serialize;

use crate::edit_manager::PeerId;
use crate::error::CodecMismatch;
use crate::revision::RevisionTag;

/// Context available to a codec at encode/decode time: who produced the
/// change, what revision it carries, and (conceptually) a handle to the
/// id-compressor that normalises revision tags across sessions. Id
/// compression itself is a host concern; this core only needs the two
/// fields it actually reads.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CodecContext {
    pub originator_session_id: PeerId,
    pub current_revision: RevisionTag,
}

/// Encodes and decodes changesets for wire transmission or persistence.
///
/// Implementations must round-trip any change produced by
/// `compose`/`invert`/`rebase`: `decode(encode(c, ctx), ctx)` must be
/// equivalent (per the rebaser's own notion of equivalence) to `c`.
pub trait Codec<C> {
    type Encoded;

    fn encode(&self, change: &C, context: &CodecContext) -> Self::Encoded;

    fn decode(&self, encoded: &Self::Encoded, context: &CodecContext) -> Result<C, CodecMismatch>;
}

/// A `serde_json`-backed codec, suitable as the reference implementation
/// exercised by the round-trip test suite: any changeset kind that derives
/// `Serialize`/`Deserialize` gets a working codec for free.
#[derive(Debug, Default)]
pub struct JsonCodec;

impl<C: Serialize + DeserializeOwned> Codec<C> for JsonCodec {
    type Encoded = serde_json::Value;

    fn encode(&self, change: &C, _context: &CodecContext) -> serde_json::Value {
        serde_json::to_value(change).expect("changeset kinds under test always serialize")
    }

    fn decode(&self, encoded: &serde_json::Value, _context: &CodecContext) -> Result<C, CodecMismatch> {
        serde_json::from_value(encoded.clone()).map_err(|err| CodecMismatch(err.to_string()))
    }
}
