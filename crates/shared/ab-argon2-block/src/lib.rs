//! Argon2 block compression (RFC 9106) over 64-bit lanes emulated with pairs of 32-bit halves.
//!
//! A block is 1 KiB, viewed as 128 lanes or 256 little-endian `u32` words where lane `i` occupies
//! words `2i` (low half) and `2i + 1` (high half). Compression computes `R = X ^ Y`, permutes `R`
//! column group by column group and then row group by row group using the BLAMKA quarter-round
//! `G`, and finally writes `R ^ permuted(R)` into the output block (or XORs it into existing
//! contents).
//!
//! The crate owns no memory besides the [`Scratch`] buffer, blocks live in a caller-owned `u32`
//! arena and are addressed by word offsets, see [`block()`]. Memory layout, lane/slice scheduling
//! and hashing around block compression are the caller's concern.
//!
//! Three interchangeable kernels are provided, see [`Kernel`]. Two of them are generated at build
//! time by `ab-argon2-block-codegen` from the same schedule the reference kernel loops over.

#![no_std]

#[cfg(any(feature = "std", test))]
extern crate std;

mod block;
pub mod lane;
pub mod round;
mod unrolled;

pub use ab_argon2_block_codegen::schedule;
#[cfg(feature = "std")]
pub use block::block_with_thread_scratch;
pub use block::{BlockError, Kernel, Scratch, block, block_with, compress, try_block};

/// Number of 64-bit lanes in a block
pub const BLOCK_LANES: usize = schedule::BLOCK_LANES;
/// Number of 32-bit words in a block
pub const BLOCK_WORDS: usize = BLOCK_LANES * 2;
/// Number of bytes in a block
pub const BLOCK_BYTES: usize = BLOCK_WORDS * size_of::<u32>();

/// Block as 32-bit words
pub type BlockWords = [u32; BLOCK_WORDS];
/// Block as bytes
pub type BlockBytes = [u8; BLOCK_BYTES];

/// Converts block bytes into little-endian words
#[inline]
#[cfg_attr(feature = "no-panic", no_panic::no_panic)]
pub fn words_from_le_bytes(bytes: &BlockBytes) -> BlockWords {
    let mut words = [0; BLOCK_WORDS];
    for (word, chunk) in words.iter_mut().zip(bytes.as_chunks::<4>().0) {
        *word = u32::from_le_bytes(*chunk);
    }
    words
}

/// Converts block words into little-endian bytes
#[inline]
#[cfg_attr(feature = "no-panic", no_panic::no_panic)]
pub fn le_bytes_from_words(words: &BlockWords) -> BlockBytes {
    let mut bytes = [0; BLOCK_BYTES];
    for (chunk, word) in bytes.as_chunks_mut::<4>().0.iter_mut().zip(words) {
        *chunk = word.to_le_bytes();
    }
    bytes
}
