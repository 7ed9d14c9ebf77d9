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

//! Relay-side packet handling. This module simply plugs together the key pair, the
//! replay filter and the Sphinx peel operation.

use crate::{
	config::Config,
	error::Error,
	kem_pair::KemPair,
	replay_filter::ReplayFilter,
	sphinx::{peel, Action, KemPublic, SphinxPacket},
};
use rand::{CryptoRng, Rng};

/// One relay instance. Holds no per-packet state; the replay filter is the only
/// shared resource, and packet handling may run concurrently from any number of
/// threads.
pub struct Mixnode {
	kem_pair: KemPair,
	replay_filter: ReplayFilter,
}

impl Mixnode {
	pub fn new(config: Config, rng: &mut (impl Rng + CryptoRng)) -> Self {
		Self { kem_pair: config.kem_pair, replay_filter: ReplayFilter::new(rng) }
	}

	pub fn public(&self) -> &KemPublic {
		self.kem_pair.public()
	}

	/// Process one inbound packet. On error the packet must simply be dropped; the
	/// failure cause is for local logs only and must not be echoed to the network.
	pub fn handle_packet(&self, packet: &SphinxPacket) -> Result<Action, Error> {
		let shared_secret = self.kem_pair.decapsulate(&packet.kem_ciphertext);
		let action = peel(packet, &shared_secret).map_err(|e| {
			log::debug!(target: "pqsphinx", "Dropping packet: {e}");
			Error::Sphinx(e)
		})?;
		// Only packets that passed the MAC check make it into the filter; checked
		// after peeling but before the action is released to the caller.
		if !self.replay_filter.insert_if_absent(self.replay_filter.tag(&shared_secret)) {
			log::debug!(target: "pqsphinx", "Dropping replayed packet");
			return Err(Error::Replay)
		}
		Ok(action)
	}
}
