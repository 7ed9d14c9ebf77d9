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

//! Sphinx packet building and peeling.
//!
//! The format is the KEM variant of Sphinx: instead of a blinded group element
//! traversing the whole path, every layer of routing info carries the next hop's KEM
//! ciphertext. Each relay decapsulates its ciphertext, checks the MAC over the
//! routing info, strips one stream-cipher layer to reveal its routing commands, and
//! strips one Lioness layer from the payload. A wrong decapsulation key never fails
//! on its own; it yields a garbage shared secret that the MAC check rejects.

pub(crate) mod crypto;

mod commands;
mod packet;
mod tests;

use arrayvec::ArrayVec;
use crypto::PacketKeys;
use thiserror::Error;

pub use commands::{
	routing_info_size, ForwardCommands, RoutingCommands, DELIVER_COMMANDS_SIZE,
	FORWARD_COMMANDS_SIZE,
};
pub use crypto::{SharedSecret, KEM_SECRET_SIZE, SHARED_SECRET_SIZE};
pub use packet::{
	KemCiphertext, KemPublic, Mac, SphinxPacket, KEM_CIPHERTEXT_SIZE, KEM_PUBLIC_SIZE, MAC_SIZE,
	MIN_PAYLOAD_BLOCK_SIZE,
};

/// Maximum hops the packet format supports. Sending a packet directly to the final
/// destination relay would count as one hop.
pub const MAX_HOPS: usize = 6;

#[derive(Clone, Copy, Debug, Error, PartialEq, Eq)]
pub enum SphinxError {
	/// Tried to build a packet for an empty path.
	#[error("No hops in path")]
	EmptyPath,
	/// Tried to build a packet for a path longer than [`MAX_HOPS`].
	#[error("Too many hops in path")]
	TooManyHops,
	/// Message too large to frame into a payload block.
	#[error("Message too large")]
	PayloadSize,
	/// MAC mismatch over the routing info.
	#[error("Integrity tag mismatch")]
	Mac,
	/// Malformed packet or routing-command bytes.
	#[error("Malformed packet bytes")]
	Malformed,
	/// Malformed payload block at the exit hop.
	#[error("Malformed payload block")]
	Payload,
}

/// What a relay should do with a peeled packet.
#[derive(Debug, PartialEq, Eq)]
pub enum Action {
	/// Pass the rebuilt packet to the relay owning `next_hop`.
	Forward { next_hop: Box<KemPublic>, packet: Box<SphinxPacket> },
	/// This relay is the exit hop; `payload` is the delivered message.
	Deliver { payload: Vec<u8> },
}

/// Build a packet addressed to the first relay in `hops`, such that the last relay
/// delivers exactly `payload`.
///
/// Layers are wrapped from the exit hop back towards the entry hop, as each layer's
/// ciphertext and tag must exist before the previous hop's routing commands can
/// mention them. Errors are caller precondition violations only; no failure here is
/// recoverable.
pub fn build_packet(hops: &[KemPublic], payload: &[u8]) -> Result<SphinxPacket, SphinxError> {
	if hops.is_empty() {
		return Err(SphinxError::EmptyPath)
	}
	if hops.len() > MAX_HOPS {
		return Err(SphinxError::TooManyHops)
	}
	if payload.len() >= u32::MAX as usize {
		return Err(SphinxError::PayloadSize)
	}

	// Encapsulate against every hop up front; the shared secrets are fresh per packet
	// and consumed immediately by the KDF.
	let mut kem_ciphertexts = ArrayVec::<KemCiphertext, MAX_HOPS>::new();
	let mut keys = ArrayVec::<PacketKeys, MAX_HOPS>::new();
	for public in hops {
		let (ciphertext, shared_secret) = crypto::encapsulate(public);
		kem_ciphertexts.push(ciphertext);
		keys.push(crypto::kdf(&shared_secret));
	}

	// Innermost layer: the terminal marker for the exit hop.
	let last = hops.len() - 1;
	let mut routing_info = RoutingCommands::Deliver.encode();
	crypto::apply_routing_encryption_keystream(&mut routing_info, &keys[last].routing_encryption);
	let mut integrity_tag = crypto::compute_mac(&routing_info, &keys[last].mac);

	// One forward layer per remaining hop, exit towards entry.
	for i in (0..last).rev() {
		let commands = RoutingCommands::Forward(Box::new(ForwardCommands {
			kem_ciphertext: kem_ciphertexts[i + 1],
			integrity_tag,
			next_hop: hops[i + 1],
			routing_info,
		}));
		let mut encoded = commands.encode();
		crypto::apply_routing_encryption_keystream(&mut encoded, &keys[i].routing_encryption);
		integrity_tag = crypto::compute_mac(&encoded, &keys[i].mac);
		routing_info = encoded;
	}

	// Payload layers, also exit towards entry.
	let mut payload = packet::pack_payload(payload);
	for hop_keys in keys.iter().rev() {
		crypto::encrypt_payload(&mut payload, &hop_keys.payload_encryption);
	}

	Ok(SphinxPacket {
		kem_ciphertext: kem_ciphertexts[0],
		routing_info,
		integrity_tag,
		payload,
	})
}

/// Peel one layer off a packet, using the shared secret decapsulated from its KEM
/// ciphertext (see [`KemPair::decapsulate`](crate::KemPair::decapsulate);
/// decapsulation is split out so the caller can also derive a replay tag from the
/// same secret).
///
/// Any error means the packet must be dropped. The caller should not reveal which
/// check failed to anyone but its own logs.
pub fn peel(packet: &SphinxPacket, shared_secret: &SharedSecret) -> Result<Action, SphinxError> {
	let keys = crypto::kdf(shared_secret);

	// A garbage shared secret from a mismatched ciphertext ends up here too, and gets
	// rejected just like a tampered packet.
	if !crypto::mac_ok(&packet.integrity_tag, &packet.routing_info, &keys.mac) {
		return Err(SphinxError::Mac)
	}

	let mut commands = packet.routing_info.clone();
	crypto::apply_routing_encryption_keystream(&mut commands, &keys.routing_encryption);

	// The payload is not covered by the MAC; an undersized block must be caught
	// before Lioness sees it.
	if packet.payload.len() < MIN_PAYLOAD_BLOCK_SIZE {
		return Err(SphinxError::Payload)
	}
	let mut payload = packet.payload.clone();
	crypto::decrypt_payload(&mut payload, &keys.payload_encryption);

	match RoutingCommands::decode(&commands)? {
		RoutingCommands::Deliver =>
			Ok(Action::Deliver { payload: packet::unpack_payload(&payload)? }),
		RoutingCommands::Forward(forward) => {
			let ForwardCommands { kem_ciphertext, integrity_tag, next_hop, routing_info } =
				*forward;
			Ok(Action::Forward {
				next_hop: Box::new(next_hop),
				packet: Box::new(SphinxPacket {
					kem_ciphertext,
					routing_info,
					integrity_tag,
					payload,
				}),
			})
		},
	}
}
