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

//! Relay replay filter.

use crate::sphinx::SharedSecret;
use blake2::{
	digest::{
		consts::U8,
		generic_array::{sequence::Concat, GenericArray},
		Mac,
	},
	Blake2bMac,
};
use parking_lot::Mutex;
use rand::{
	distributions::{Distribution, Standard},
	CryptoRng, Rng,
};

// https://hur.st/bloomfilter/?n=7000000&p=&m=67108864&k=8
// The false positive rate is ~1% with 7m packets in the filter, and a false positive
// only ever costs one dropped packet. The filter lives exactly as long as the relay's
// KEM key pair; provisioning a new pair starts an empty filter.
const NUM_BITS: usize = 64 * 1024 * 1024;
const NUM_WORDS: usize = NUM_BITS / 64;
const NUM_TAG_BITS: usize = 8;

#[derive(Clone, Copy)]
pub struct ReplayTag {
	base: u32,
	inc: u32,
}

impl Distribution<ReplayTag> for Standard {
	fn sample<R: Rng + ?Sized>(&self, rng: &mut R) -> ReplayTag {
		ReplayTag { base: rng.gen(), inc: rng.gen() }
	}
}

pub struct ReplayFilter {
	key: [u8; 32],
	/// Allocated on demand. The mutex makes insert-if-absent atomic under concurrent
	/// packet processing; this is the only synchronisation point in the crate.
	words: Mutex<Option<Box<[u64; NUM_WORDS]>>>,
}

impl ReplayFilter {
	fn new_with_key(key: [u8; 32]) -> Self {
		Self { key, words: Mutex::new(None) }
	}

	pub fn new(rng: &mut (impl Rng + CryptoRng)) -> Self {
		let mut key = [0; 32];
		rng.fill_bytes(&mut key);
		Self::new_with_key(key)
	}

	/// The filter key is random per instance, so remote parties cannot grind shared
	/// secrets into colliding tags.
	pub fn tag(&self, shared_secret: &SharedSecret) -> ReplayTag {
		let key: &GenericArray<_, _> = (&self.key).into();
		let key = key.concat((*shared_secret).into());
		let h = Blake2bMac::<U8>::new_with_salt_and_personal(&key, b"", b"pqsphinx-rply-tg")
			.expect("Key, salt, and personalisation sizes are fixed and small enough");
		let tag = u64::from_le_bytes(h.finalize().into_bytes().into());
		ReplayTag { base: tag as u32, inc: (tag >> 32) as u32 }
	}

	/// Returns true iff the tag was not already present; the tag is present
	/// afterwards either way. At most one of any set of concurrent calls with the
	/// same tag returns true.
	pub fn insert_if_absent(&self, tag: ReplayTag) -> bool {
		let mut words = self.words.lock();
		let words = words
			.get_or_insert_with(|| vec![0; NUM_WORDS].try_into().expect("Vec has the right size"));
		let mut absent = false;
		let mut i = tag.base;
		for _ in 0..NUM_TAG_BITS {
			let word = &mut words[((i as usize) >> 6) % NUM_WORDS];
			let bit = 1 << (i & 63);
			absent |= (*word & bit) == 0;
			*word |= bit;
			i = i.wrapping_add(tag.inc);
		}
		absent
	}

	pub fn contains(&self, tag: ReplayTag) -> bool {
		match self.words.lock().as_ref() {
			None => false,
			Some(words) => {
				let mut i = tag.base;
				for _ in 0..NUM_TAG_BITS {
					if (words[((i as usize) >> 6) % NUM_WORDS] & (1 << (i & 63))) == 0 {
						return false
					}
					i = i.wrapping_add(tag.inc);
				}
				true
			},
		}
	}
}
