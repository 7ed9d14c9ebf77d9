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

//! Post-quantum Sphinx packet format. Senders build layered packets for a fixed
//! relay path with [`build_packet`]; each relay peels one layer with
//! [`Mixnode::handle_packet`] (or [`peel`] directly, for callers that manage their
//! own replay protection) and forwards or delivers the result. Transport and key
//! distribution are out of scope; this crate is the packet core only.

mod config;
mod error;
mod kem_pair;
mod mixnode;
mod replay_filter;
mod sphinx;

pub use config::Config;
pub use error::Error;
pub use kem_pair::KemPair;
pub use mixnode::Mixnode;
pub use replay_filter::{ReplayFilter, ReplayTag};
pub use sphinx::{
	build_packet, peel, routing_info_size, Action, ForwardCommands, KemCiphertext, KemPublic,
	Mac, RoutingCommands, SharedSecret, SphinxError, SphinxPacket, DELIVER_COMMANDS_SIZE,
	FORWARD_COMMANDS_SIZE, KEM_CIPHERTEXT_SIZE, KEM_PUBLIC_SIZE, KEM_SECRET_SIZE, MAC_SIZE,
	MAX_HOPS, MIN_PAYLOAD_BLOCK_SIZE, SHARED_SECRET_SIZE,
};
