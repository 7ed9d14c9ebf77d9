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

//! Relay KEM key pair.

use crate::sphinx::{
	crypto, KemCiphertext, KemPublic, SharedSecret, KEM_PUBLIC_SIZE, KEM_SECRET_SIZE,
};
use pqcrypto_kyber::kyber768;
use pqcrypto_traits::kem::{PublicKey as _, SecretKey as _};
use zeroize::Zeroizing;

/// A relay's long-term Kyber768 key pair. Immutable for its lifetime; key rotation
/// means provisioning a new pair.
pub struct KemPair {
	/// Boxed to avoid leaving copies of the secret key around in memory if `KemPair`
	/// is moved.
	secret: Box<Zeroizing<[u8; KEM_SECRET_SIZE]>>,
	public: KemPublic,
}

impl KemPair {
	pub fn generate() -> Self {
		let (public, secret) = kyber768::keypair();
		let mut secret_bytes = Box::new(Zeroizing::new([0; KEM_SECRET_SIZE]));
		secret_bytes.copy_from_slice(secret.as_bytes());
		let mut public_bytes = [0; KEM_PUBLIC_SIZE];
		public_bytes.copy_from_slice(public.as_bytes());
		Self { secret: secret_bytes, public: public_bytes }
	}

	pub fn public(&self) -> &KemPublic {
		&self.public
	}

	/// Never fails: a ciphertext for some other key pair decapsulates to a garbage
	/// shared secret, caught by the MAC check in [`peel`](crate::peel).
	pub fn decapsulate(&self, ciphertext: &KemCiphertext) -> SharedSecret {
		crypto::decapsulate(&self.secret, ciphertext)
	}
}

impl From<[u8; KEM_SECRET_SIZE]> for KemPair {
	fn from(secret: [u8; KEM_SECRET_SIZE]) -> Self {
		// We box the secret to avoid leaving copies of it in memory when the KemPair
		// is moved. Note that we will likely leave some copies on the stack here; I'm
		// not aware of any good way of avoiding this.
		let public = crypto::embedded_public(&secret);
		Self { secret: Box::new(Zeroizing::new(secret)), public }
	}
}
