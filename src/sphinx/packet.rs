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

//! Sphinx packet layout and wire codec.
//!
//! Packets consist of the following, in order:
//!
//! - KEM ciphertext ([`KemCiphertext`], the encapsulation for the current hop).
//! - Routing info (stream-ciphered routing commands for the current hop).
//! - [`Mac`] over the routing info.
//! - Payload (the Lioness-layered payload block).
//!
//! The KEM ciphertext and MAC have protocol-fixed sizes; routing info and payload are
//! length-prefixed on the wire. The routing info shrinks by one forward command per
//! hop (it is not padded back to a fixed length), so a relay can infer its distance
//! from the exit hop; the payload block length is preserved by every hop.

use super::SphinxError;

/// Size in bytes of a [`KemPublic`].
pub const KEM_PUBLIC_SIZE: usize = 1184;
/// Kyber768 public key for a relay.
pub type KemPublic = [u8; KEM_PUBLIC_SIZE];

/// Size in bytes of a [`KemCiphertext`].
pub const KEM_CIPHERTEXT_SIZE: usize = 1088;
/// Kyber768 ciphertext encapsulating one hop's shared secret.
pub type KemCiphertext = [u8; KEM_CIPHERTEXT_SIZE];

pub const MAC_SIZE: usize = 16;
pub type Mac = [u8; MAC_SIZE];

const LEN_PREFIX_SIZE: usize = 4;

/// Smallest payload block the format will carry. Lioness rejects blocks no longer
/// than its 32-byte digest; short messages are padded up to this size.
pub const MIN_PAYLOAD_BLOCK_SIZE: usize = 64;

/// Type for packets passed between relays. Note that peeling a layer produces a new
/// packet value; an inbound packet is never modified in place.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct SphinxPacket {
	pub kem_ciphertext: KemCiphertext,
	pub routing_info: Vec<u8>,
	pub integrity_tag: Mac,
	pub payload: Vec<u8>,
}

impl SphinxPacket {
	/// Serialize for transmission.
	pub fn encode(&self) -> Vec<u8> {
		let mut out = Vec::with_capacity(
			KEM_CIPHERTEXT_SIZE +
				MAC_SIZE + (2 * LEN_PREFIX_SIZE) +
				self.routing_info.len() +
				self.payload.len(),
		);
		out.extend_from_slice(&self.kem_ciphertext);
		out.extend_from_slice(&(self.routing_info.len() as u32).to_be_bytes());
		out.extend_from_slice(&self.routing_info);
		out.extend_from_slice(&self.integrity_tag);
		out.extend_from_slice(&(self.payload.len() as u32).to_be_bytes());
		out.extend_from_slice(&self.payload);
		out
	}

	/// Parse a received packet. Truncated input and trailing bytes are both rejected.
	pub fn decode(bytes: &[u8]) -> Result<Self, SphinxError> {
		let (kem_ciphertext, rest) = take::<KEM_CIPHERTEXT_SIZE>(bytes)?;
		let (routing_info, rest) = take_prefixed(rest)?;
		let (integrity_tag, rest) = take::<MAC_SIZE>(rest)?;
		let (payload, rest) = take_prefixed(rest)?;
		if !rest.is_empty() {
			return Err(SphinxError::Malformed)
		}
		Ok(Self {
			kem_ciphertext: *kem_ciphertext,
			routing_info,
			integrity_tag: *integrity_tag,
			payload,
		})
	}
}

fn take<const N: usize>(bytes: &[u8]) -> Result<(&[u8; N], &[u8]), SphinxError> {
	if bytes.len() < N {
		return Err(SphinxError::Malformed)
	}
	let (head, rest) = bytes.split_at(N);
	Ok((head.try_into().expect("split_at returns exactly N bytes"), rest))
}

fn take_prefixed(bytes: &[u8]) -> Result<(Vec<u8>, &[u8]), SphinxError> {
	let (len, rest) = take::<LEN_PREFIX_SIZE>(bytes)?;
	let len = u32::from_be_bytes(*len) as usize;
	if rest.len() < len {
		return Err(SphinxError::Malformed)
	}
	let (data, rest) = rest.split_at(len);
	Ok((data.to_vec(), rest))
}

/// Frame a message into a payload block: big-endian length, message bytes, zero
/// padding up to [`MIN_PAYLOAD_BLOCK_SIZE`]. The block length is what every SPRP
/// layer sees and is preserved across the whole path.
pub(super) fn pack_payload(message: &[u8]) -> Vec<u8> {
	let size = (LEN_PREFIX_SIZE + message.len()).max(MIN_PAYLOAD_BLOCK_SIZE);
	let mut block = Vec::with_capacity(size);
	block.extend_from_slice(&(message.len() as u32).to_be_bytes());
	block.extend_from_slice(message);
	block.resize(size, 0);
	block
}

/// Recover the message from a decrypted payload block at the exit hop.
pub(super) fn unpack_payload(block: &[u8]) -> Result<Vec<u8>, SphinxError> {
	let (len, rest) = take::<LEN_PREFIX_SIZE>(block).map_err(|_| SphinxError::Payload)?;
	let len = u32::from_be_bytes(*len) as usize;
	if len > rest.len() {
		return Err(SphinxError::Payload)
	}
	Ok(rest[..len].to_vec())
}
