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

//! Sphinx packet building/peeling tests.

#![cfg(test)]

use super::{crypto, *};
use crate::kem_pair::KemPair;
use itertools::Itertools;
use pqcrypto_kyber::kyber768;
use rand::{Rng, RngCore};

const PAYLOAD: &[u8] = b"We must defend our own privacy if we expect to have any. \
	We must come together and create systems which allow anonymous transactions to take \
	place. People have been defending their own privacy for centuries with whispers, \
	darkness, envelopes, closed doors, secret handshakes, and couriers. The technologies \
	of the past did not allow for strong privacy, but electronic technologies do.";

fn gen_hops(num_hops: usize) -> (Vec<KemPair>, Vec<KemPublic>) {
	(0..num_hops)
		.map(|_i| {
			let pair = KemPair::generate();
			let public = *pair.public();
			(pair, public)
		})
		.unzip()
}

/// Walk a packet through the whole path, asserting the intermediate actions, and
/// return the delivered payload.
fn run_path(pairs: &[KemPair], publics: &[KemPublic], mut packet: SphinxPacket) -> Vec<u8> {
	for (i, pair) in pairs.iter().enumerate() {
		let shared_secret = pair.decapsulate(&packet.kem_ciphertext);
		let action = peel(&packet, &shared_secret).unwrap();
		match action {
			Action::Forward { next_hop, packet: next } => {
				assert_ne!(i, pairs.len() - 1, "Exit hop must deliver, not forward");
				assert_eq!(*next_hop, publics[i + 1]);
				packet = *next;
			},
			Action::Deliver { payload } => {
				assert_eq!(i, pairs.len() - 1, "Only the exit hop may deliver");
				return payload
			},
		}
	}
	unreachable!("Exit hop returns early")
}

#[test]
fn kem_sizes_match_kyber768() {
	assert_eq!(kyber768::public_key_bytes(), KEM_PUBLIC_SIZE);
	assert_eq!(kyber768::secret_key_bytes(), KEM_SECRET_SIZE);
	assert_eq!(kyber768::ciphertext_bytes(), KEM_CIPHERTEXT_SIZE);
	assert_eq!(kyber768::shared_secret_bytes(), SHARED_SECRET_SIZE);
}

#[test]
fn basic_operation() {
	for num_hops in 1..=MAX_HOPS {
		let (pairs, publics) = gen_hops(num_hops);
		let packet = build_packet(&publics, PAYLOAD).unwrap();
		assert_eq!(packet.routing_info.len(), routing_info_size(num_hops));
		assert_eq!(run_path(&pairs, &publics, packet), PAYLOAD);
	}
}

#[test]
fn short_and_empty_payloads() {
	let (pairs, publics) = gen_hops(2);
	for payload in [&b"hello"[..], &[]] {
		let packet = build_packet(&publics, payload).unwrap();
		assert_eq!(run_path(&pairs, &publics, packet), payload);
	}
}

#[test]
fn path_preconditions() {
	assert_eq!(build_packet(&[], PAYLOAD), Err(SphinxError::EmptyPath));
	let (_, publics) = gen_hops(MAX_HOPS + 1);
	assert_eq!(build_packet(&publics, PAYLOAD), Err(SphinxError::TooManyHops));
}

#[test]
fn field_sizes_across_hops() {
	let num_hops = 3;
	let (pairs, publics) = gen_hops(num_hops);
	let mut packet = build_packet(&publics, PAYLOAD).unwrap();
	let payload_len = packet.payload.len();

	for (i, pair) in pairs.iter().take(num_hops - 1).enumerate() {
		let shared_secret = pair.decapsulate(&packet.kem_ciphertext);
		packet = match peel(&packet, &shared_secret).unwrap() {
			Action::Forward { packet, .. } => *packet,
			Action::Deliver { .. } => panic!("Unexpected deliver action"),
		};
		// KEM ciphertext and tag sizes are fixed by their types; the payload block
		// keeps its length and the routing info shrinks by one forward command.
		assert_eq!(packet.payload.len(), payload_len);
		assert_eq!(packet.routing_info.len(), routing_info_size(num_hops - i - 1));
	}
}

#[test]
fn tampered_tag_rejected() {
	let (pairs, publics) = gen_hops(1);
	let packet = build_packet(&publics, PAYLOAD).unwrap();
	let shared_secret = pairs[0].decapsulate(&packet.kem_ciphertext);

	for (byte, bit) in (0..MAC_SIZE).cartesian_product(0..8) {
		let mut tampered = packet.clone();
		tampered.integrity_tag[byte] ^= 1 << bit;
		assert_eq!(peel(&tampered, &shared_secret), Err(SphinxError::Mac));
	}

	// The untampered packet still peels
	assert!(peel(&packet, &shared_secret).is_ok());
}

#[test]
fn tampered_routing_info_rejected() {
	let (pairs, publics) = gen_hops(2);
	let packet = build_packet(&publics, PAYLOAD).unwrap();
	let shared_secret = pairs[0].decapsulate(&packet.kem_ciphertext);

	for (byte, bit) in (0..packet.routing_info.len()).cartesian_product(0..8) {
		let mut tampered = packet.clone();
		tampered.routing_info[byte] ^= 1 << bit;
		assert_eq!(peel(&tampered, &shared_secret), Err(SphinxError::Mac));
	}
}

#[test]
fn wrong_key_fails_mac_without_panic() {
	let (pairs, publics) = gen_hops(2);
	let packet = build_packet(&publics, PAYLOAD).unwrap();

	// Decapsulating with the second relay's key succeeds (implicit rejection) but
	// yields a secret whose derived MAC key rejects the packet.
	let shared_secret = pairs[1].decapsulate(&packet.kem_ciphertext);
	assert_eq!(peel(&packet, &shared_secret), Err(SphinxError::Mac));
}

#[test]
fn truncated_payload_rejected() {
	let (pairs, publics) = gen_hops(1);
	let mut packet = build_packet(&publics, b"hello").unwrap();
	let shared_secret = pairs[0].decapsulate(&packet.kem_ciphertext);
	packet.payload.truncate(MIN_PAYLOAD_BLOCK_SIZE - 1);
	assert_eq!(peel(&packet, &shared_secret), Err(SphinxError::Payload));
}

#[test]
fn key_separation() {
	let mut rng = rand::thread_rng();
	let mut shared_secret: SharedSecret = Default::default();
	rng.fill_bytes(&mut shared_secret);

	// Deterministic in the shared secret
	let keys = crypto::kdf(&shared_secret);
	let again = crypto::kdf(&shared_secret);
	assert_eq!(keys.mac, again.mac);
	assert_eq!(keys.routing_encryption, again.routing_encryption);
	assert_eq!(keys.payload_encryption, again.payload_encryption);

	// A different secret derives entirely different keys
	let mut other_secret = shared_secret;
	other_secret[0] ^= 1;
	let other = crypto::kdf(&other_secret);
	assert_ne!(keys.mac, other.mac);
	assert_ne!(keys.routing_encryption, other.routing_encryption);
	assert_ne!(keys.payload_encryption, other.payload_encryption);

	// The three keys of one schedule are pairwise distinct, and a key derived for
	// one purpose does not work for another
	assert_ne!(keys.mac, keys.routing_encryption);
	assert_ne!(keys.mac[..], keys.payload_encryption[..32]);
	assert_ne!(keys.routing_encryption[..], keys.payload_encryption[..32]);
	let tag = crypto::compute_mac(b"routing info", &keys.mac);
	assert!(crypto::mac_ok(&tag, b"routing info", &keys.mac));
	assert!(!crypto::mac_ok(&tag, b"routing info", &keys.routing_encryption));
}

#[test]
fn keystream_is_involutive() {
	let mut rng = rand::thread_rng();
	let mut key = [0; 32];
	rng.fill_bytes(&mut key);
	let mut data = vec![0u8; 300];
	rng.fill_bytes(&mut data);
	let original = data.clone();

	crypto::apply_routing_encryption_keystream(&mut data, &key);
	assert_ne!(data, original);
	crypto::apply_routing_encryption_keystream(&mut data, &key);
	assert_eq!(data, original);
}

#[test]
fn commands_round_trip() {
	let mut rng = rand::thread_rng();

	let deliver = RoutingCommands::Deliver;
	assert_eq!(RoutingCommands::decode(&deliver.encode()), Ok(deliver));

	let mut kem_ciphertext = [0; KEM_CIPHERTEXT_SIZE];
	rng.fill_bytes(&mut kem_ciphertext);
	let mut next_hop = [0; KEM_PUBLIC_SIZE];
	rng.fill_bytes(&mut next_hop);
	let forward = RoutingCommands::Forward(Box::new(ForwardCommands {
		kem_ciphertext,
		integrity_tag: rng.gen(),
		next_hop,
		routing_info: (0..497).map(|_| rng.gen()).collect(),
	}));
	assert_eq!(RoutingCommands::decode(&forward.encode()), Ok(forward));
}

#[test]
fn malformed_commands_rejected() {
	assert_eq!(RoutingCommands::decode(&[]), Err(SphinxError::Malformed));
	// Unknown command byte
	assert_eq!(RoutingCommands::decode(&[2]), Err(SphinxError::Malformed));
	// Deliver followed by trailing bytes
	assert_eq!(RoutingCommands::decode(&[0, 0]), Err(SphinxError::Malformed));
	// Forward command too short for its fixed fields
	let short = vec![1; FORWARD_COMMANDS_SIZE - 1];
	assert_eq!(RoutingCommands::decode(&short), Err(SphinxError::Malformed));
}

#[test]
fn packet_round_trip() {
	let (_, publics) = gen_hops(3);
	let packet = build_packet(&publics, PAYLOAD).unwrap();
	let encoded = packet.encode();
	assert_eq!(SphinxPacket::decode(&encoded), Ok(packet));

	// Truncation anywhere is rejected
	assert_eq!(SphinxPacket::decode(&encoded[..encoded.len() - 1]), Err(SphinxError::Malformed));
	assert_eq!(SphinxPacket::decode(&encoded[..KEM_CIPHERTEXT_SIZE]), Err(SphinxError::Malformed));
	assert_eq!(SphinxPacket::decode(&[]), Err(SphinxError::Malformed));

	// So are trailing bytes
	let mut trailing = encoded;
	trailing.push(0);
	assert_eq!(SphinxPacket::decode(&trailing), Err(SphinxError::Malformed));
}
