//! Permit2 unordered nonces.
//!
//! Permit2 tracks signature-transfer nonces in 256-bit words keyed by
//! `(owner, wordPos)`. Bit `b` of word `w` set means nonce `(w << 8) | b` has
//! been consumed. A new permit must use a nonce whose bit is still clear.

use alloy_primitives::U256;
use thiserror::Error;

/// Number of nonces tracked by a single bitmap word.
pub const BITS_PER_WORD: usize = 256;

/// Errors that can occur while selecting a Permit2 nonce.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum NonceError {
	/// Every bit of the given word is set.
	#[error("No available nonce found in word {word_pos}")]
	WordExhausted { word_pos: U256 },
	/// Every scanned word is set.
	#[error("No available nonce found in the first {words} nonce words")]
	Exhausted { words: u32 },
}

/// One word of an owner's Permit2 nonce bitmap.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct NonceBitmap {
	pub word_pos: U256,
	pub bitmap: U256,
}

impl NonceBitmap {
	pub fn new(word_pos: U256, bitmap: U256) -> Self {
		Self { word_pos, bitmap }
	}

	/// Returns the lowest unused nonce in this word.
	pub fn next_unused(&self) -> Result<U256, NonceError> {
		find_next_nonce(self.bitmap, self.word_pos)
	}
}

/// Finds the lowest unset bit of `bitmap` and combines it with `word_pos`
/// into a full 256-bit Permit2 nonce.
pub fn find_next_nonce(bitmap: U256, word_pos: U256) -> Result<U256, NonceError> {
	for bit in 0..BITS_PER_WORD {
		if !bitmap.bit(bit) {
			return Ok((word_pos << 8usize) | U256::from(bit));
		}
	}
	Err(NonceError::WordExhausted { word_pos })
}

/// Splits a nonce into its bitmap word position and bit index.
pub fn split_nonce(nonce: U256) -> (U256, usize) {
	let bit = (nonce.as_limbs()[0] & 0xff) as usize;
	(nonce >> 8usize, bit)
}
