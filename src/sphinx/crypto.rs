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

//! Key encapsulation, secret derivation, MAC computation, and encryption.

use super::packet::{KemCiphertext, KemPublic, Mac, KEM_CIPHERTEXT_SIZE, KEM_PUBLIC_SIZE};
use arrayref::array_refs;
use blake2::{
	digest::{
		consts::{U16, U64},
		generic_array::GenericArray,
		FixedOutput, Mac as DigestMac,
	},
	Blake2bMac,
};
use c2_chacha::{
	stream_cipher::{NewStreamCipher, SyncStreamCipher},
	ChaCha20,
};
use lioness::LionessDefault;
use pqcrypto_kyber::kyber768;
use pqcrypto_traits::kem::{
	Ciphertext as _, PublicKey as _, SecretKey as _, SharedSecret as _,
};
use subtle::ConstantTimeEq;

const HOP_KEYS_PERSONAL: &[u8; 16] = b"pqsphinx-hop-key";
const PAYLOAD_ENCRYPTION_KEY_PERSONAL: &[u8; 16] = b"pqsphinx-payload";

/// Size in bytes of a [`SharedSecret`].
pub const SHARED_SECRET_SIZE: usize = 32;
/// Produced by KEM encapsulation, fresh for every (packet, hop) pair.
pub type SharedSecret = [u8; SHARED_SECRET_SIZE];

/// Size in bytes of a Kyber768 secret key.
pub const KEM_SECRET_SIZE: usize = 2400;

////////////////////////////////////////////////////////////////////////////////
// Key encapsulation
////////////////////////////////////////////////////////////////////////////////

/// Encapsulate a fresh shared secret against a relay's public key.
pub fn encapsulate(their_public: &KemPublic) -> (KemCiphertext, SharedSecret) {
	let public =
		kyber768::PublicKey::from_bytes(their_public).expect("Public key size is fixed");
	let (shared_secret, ciphertext) = kyber768::encapsulate(&public);
	let mut ct = [0; KEM_CIPHERTEXT_SIZE];
	ct.copy_from_slice(ciphertext.as_bytes());
	let mut ss = [0; SHARED_SECRET_SIZE];
	ss.copy_from_slice(shared_secret.as_bytes());
	(ct, ss)
}

/// Recover the shared secret from a ciphertext. Kyber decapsulation performs
/// implicit rejection: a ciphertext produced for a different key pair yields an
/// unpredictable shared secret rather than an error, and is only caught by the MAC
/// check downstream.
pub fn decapsulate(secret: &[u8; KEM_SECRET_SIZE], ciphertext: &KemCiphertext) -> SharedSecret {
	let secret = kyber768::SecretKey::from_bytes(secret).expect("Secret key size is fixed");
	let ciphertext =
		kyber768::Ciphertext::from_bytes(ciphertext).expect("Ciphertext size is fixed");
	let shared_secret = kyber768::decapsulate(&ciphertext, &secret);
	let mut ss = [0; SHARED_SECRET_SIZE];
	ss.copy_from_slice(shared_secret.as_bytes());
	ss
}

/// Public key embedded in a Kyber768 secret key. The PQClean secret-key layout is
/// `sk_cpa ‖ pk ‖ H(pk) ‖ z`, so the public key sits at a fixed offset.
pub fn embedded_public(secret: &[u8; KEM_SECRET_SIZE]) -> KemPublic {
	const CPA_SECRET_SIZE: usize = 1152;
	let mut public = [0; KEM_PUBLIC_SIZE];
	public.copy_from_slice(&secret[CPA_SECRET_SIZE..CPA_SECRET_SIZE + KEM_PUBLIC_SIZE]);
	public
}

////////////////////////////////////////////////////////////////////////////////
// Secret derivation
////////////////////////////////////////////////////////////////////////////////

fn derive_secret(derived: &mut [u8], shared_secret: &SharedSecret, personal: &[u8; 16]) {
	for (i, chunk) in derived.chunks_mut(64).enumerate() {
		// This is the construction libsodium uses for crypto_kdf_derive_from_key; see
		// https://doc.libsodium.org/key_derivation/
		let h = Blake2bMac::<U64>::new_with_salt_and_personal(
			shared_secret,
			&i.to_le_bytes(),
			personal,
		)
		.expect("Key, salt, and personalisation sizes are fixed and small enough");
		h.finalize_into(GenericArray::from_mut_slice(chunk));
	}
}

const MAC_KEY_SIZE: usize = 32;
pub type MacKey = [u8; MAC_KEY_SIZE];
const ROUTING_ENCRYPTION_KEY_SIZE: usize = 32;
pub type RoutingEncryptionKey = [u8; ROUTING_ENCRYPTION_KEY_SIZE];
const HOP_KEYS_SIZE: usize = MAC_KEY_SIZE + ROUTING_ENCRYPTION_KEY_SIZE;

pub const PAYLOAD_ENCRYPTION_KEY_SIZE: usize = 192;
pub type PayloadEncryptionKey = [u8; PAYLOAD_ENCRYPTION_KEY_SIZE];

/// The per-hop keys derived from one shared secret. Derivation is deterministic, and
/// the three keys live in separate personalisation domains.
pub struct PacketKeys {
	pub mac: MacKey,
	pub routing_encryption: RoutingEncryptionKey,
	pub payload_encryption: PayloadEncryptionKey,
}

pub fn kdf(shared_secret: &SharedSecret) -> PacketKeys {
	let mut hop_keys = [0; HOP_KEYS_SIZE];
	derive_secret(&mut hop_keys, shared_secret, HOP_KEYS_PERSONAL);
	let (mac, routing_encryption) =
		array_refs![&hop_keys, MAC_KEY_SIZE, ROUTING_ENCRYPTION_KEY_SIZE];
	let mut payload_encryption = [0; PAYLOAD_ENCRYPTION_KEY_SIZE];
	derive_secret(&mut payload_encryption, shared_secret, PAYLOAD_ENCRYPTION_KEY_PERSONAL);
	PacketKeys { mac: *mac, routing_encryption: *routing_encryption, payload_encryption }
}

////////////////////////////////////////////////////////////////////////////////
// MAC computation
////////////////////////////////////////////////////////////////////////////////

pub fn compute_mac(routing_info: &[u8], key: &MacKey) -> Mac {
	let mut h = Blake2bMac::<U16>::new_from_slice(key).expect("Key size is fixed and small enough");
	h.update(routing_info);
	h.finalize().into_bytes().into()
}

pub fn mac_ok(mac: &Mac, routing_info: &[u8], key: &MacKey) -> bool {
	let calculated = compute_mac(routing_info, key);
	calculated[..].ct_eq(&mac[..]).into()
}

////////////////////////////////////////////////////////////////////////////////
// Routing-info encryption
////////////////////////////////////////////////////////////////////////////////

/// Involutive: applying the keystream twice returns the input. Decryption at a relay
/// is the same operation as encryption at the sender.
pub fn apply_routing_encryption_keystream(data: &mut [u8], key: &RoutingEncryptionKey) {
	// Key is only used once, so fine for nonce to be 0
	let mut c = ChaCha20::new(key.into(), &[0; 8].into());
	c.apply_keystream(data);
}

////////////////////////////////////////////////////////////////////////////////
// Payload encryption
////////////////////////////////////////////////////////////////////////////////

pub fn encrypt_payload(payload: &mut [u8], key: &PayloadEncryptionKey) {
	let l = LionessDefault::new_raw(key);
	l.encrypt(payload).expect("Payload blocks are always above the Lioness minimum");
}

pub fn decrypt_payload(payload: &mut [u8], key: &PayloadEncryptionKey) {
	let l = LionessDefault::new_raw(key);
	l.decrypt(payload).expect("Payload blocks are always above the Lioness minimum");
}
