// Copyright 2023 Parity Technologies (UK) Ltd.
//
// Permission is hereby granted, free of charge, to any person obtaining a
// copy of this software and associated documentation files (the "Software"),
// to deal in the Software without restriction, including without limitation
// the rights to use, copy, modify, merge, publish, distribute, sublicense,
// and/or sell copies of the Software, and to permit persons to whom the
// Software is furnished to do so, subject to the following conditions:
//
// The above copyright notice and this permission notice shall be included in
// all copies or substantial portions of the Software.
//
// THE SOFTWARE IS PROVIDED "AS IS", WITHOUT WARRANTY OF ANY KIND, EXPRESS
// OR IMPLIED, INCLUDING BUT NOT LIMITED TO THE WARRANTIES OF MERCHANTABILITY,
// FITNESS FOR A PARTICULAR PURPOSE AND NONINFRINGEMENT. IN NO EVENT SHALL THE
// AUTHORS OR COPYRIGHT HOLDERS BE LIABLE FOR ANY CLAIM, DAMAGES OR OTHER
// LIABILITY, WHETHER IN AN ACTION OF CONTRACT, TORT OR OTHERWISE, ARISING
// FROM, OUT OF OR IN CONNECTION WITH THE SOFTWARE OR THE USE OR OTHER
// DEALINGS IN THE SOFTWARE.

//! Per-hop routing commands.
//!
//! The plaintext of a packet's routing-info field. A command block starts with a
//! single command byte: deliver (this relay is the exit) or forward. A forward
//! command carries everything the relay needs to hand on: the next hop's KEM
//! ciphertext, integrity tag and public key, then the next routing-info field
//! occupying the remainder of the block.

use super::{
	packet::{KemCiphertext, KemPublic, Mac, KEM_CIPHERTEXT_SIZE, KEM_PUBLIC_SIZE, MAC_SIZE},
	SphinxError,
};
use arrayref::{array_ref, array_refs};

const COMMAND_SIZE: usize = 1;
const COMMAND_DELIVER: u8 = 0;
const COMMAND_FORWARD: u8 = 1;

/// Encoded size of a deliver command.
pub const DELIVER_COMMANDS_SIZE: usize = COMMAND_SIZE;
/// Encoded size of a forward command, excluding the nested routing-info field.
pub const FORWARD_COMMANDS_SIZE: usize =
	COMMAND_SIZE + KEM_CIPHERTEXT_SIZE + MAC_SIZE + KEM_PUBLIC_SIZE;

const FORWARD_FIXED_SIZE: usize = KEM_CIPHERTEXT_SIZE + MAC_SIZE + KEM_PUBLIC_SIZE;

/// Size in bytes of the routing-info field of a freshly built packet for a path of
/// `num_hops` relays.
pub const fn routing_info_size(num_hops: usize) -> usize {
	DELIVER_COMMANDS_SIZE + num_hops.saturating_sub(1) * FORWARD_COMMANDS_SIZE
}

/// Fields a relay needs to forward a packet on to the next hop.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct ForwardCommands {
	/// KEM ciphertext for the next hop.
	pub kem_ciphertext: KemCiphertext,
	/// Integrity tag for the next hop.
	pub integrity_tag: Mac,
	/// Public key identifying the next relay.
	pub next_hop: KemPublic,
	/// Routing-info field of the next packet.
	pub routing_info: Vec<u8>,
}

/// Routing commands revealed to a relay by one layer of stream-cipher decryption.
/// Never transmitted bare; only ever the plaintext of a routing-info field.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum RoutingCommands {
	/// This relay is the exit hop; the payload is for it.
	Deliver,
	/// Pass the rebuilt packet on.
	Forward(Box<ForwardCommands>),
}

impl RoutingCommands {
	pub fn encode(&self) -> Vec<u8> {
		match self {
			Self::Deliver => vec![COMMAND_DELIVER],
			Self::Forward(forward) => {
				let mut out =
					Vec::with_capacity(FORWARD_COMMANDS_SIZE + forward.routing_info.len());
				out.push(COMMAND_FORWARD);
				out.extend_from_slice(&forward.kem_ciphertext);
				out.extend_from_slice(&forward.integrity_tag);
				out.extend_from_slice(&forward.next_hop);
				out.extend_from_slice(&forward.routing_info);
				out
			},
		}
	}

	pub fn decode(bytes: &[u8]) -> Result<Self, SphinxError> {
		match bytes.split_first() {
			Some((&COMMAND_DELIVER, rest)) if rest.is_empty() => Ok(Self::Deliver),
			Some((&COMMAND_FORWARD, rest)) if rest.len() >= FORWARD_FIXED_SIZE => {
				let (fixed, routing_info) = rest.split_at(FORWARD_FIXED_SIZE);
				let fixed = array_ref![fixed, 0, FORWARD_FIXED_SIZE];
				let (kem_ciphertext, integrity_tag, next_hop) =
					array_refs![fixed, KEM_CIPHERTEXT_SIZE, MAC_SIZE, KEM_PUBLIC_SIZE];
				Ok(Self::Forward(Box::new(ForwardCommands {
					kem_ciphertext: *kem_ciphertext,
					integrity_tag: *integrity_tag,
					next_hop: *next_hop,
					routing_info: routing_info.to_vec(),
				})))
			},
			_ => Err(SphinxError::Malformed),
		}
	}
}
