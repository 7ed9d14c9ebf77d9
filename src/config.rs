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

//! Relay configuration.

use crate::{kem_pair::KemPair, sphinx::KEM_SECRET_SIZE};

/// Configuration injected into a relay at startup. The key pair is fixed for the
/// relay instance's lifetime; rotation means provisioning a new instance.
pub struct Config {
	/// Long-term KEM key pair for this relay.
	pub kem_pair: KemPair,
}

impl Config {
	/// Configuration with a freshly generated key pair.
	pub fn generate() -> Self {
		Self { kem_pair: KemPair::generate() }
	}

	/// Configuration from persisted secret-key bytes.
	pub fn from_secret(secret: [u8; KEM_SECRET_SIZE]) -> Self {
		Self { kem_pair: secret.into() }
	}
}

impl From<KemPair> for Config {
	fn from(kem_pair: KemPair) -> Self {
		Self { kem_pair }
	}
}
