
use crate::round::p;
use crate::schedule::{COLUMN_GROUPS, ROW_GROUPS};
use crate::unrolled::{compress_full_unroll, compress_partial_unroll};
use crate::{BLOCK_WORDS, BlockWords};
use core::fmt;
use zeroize::Zeroize;

/// Working buffer of block compression.
///
/// Holds the intermediate `R = X ^ Y` during compression and is zeroed before every compression
/// call returns, so it never retains block contents between calls. Reusing a single instance
/// avoids placing 1 KiB on the stack for every block.
#[derive(Clone)]
#[repr(C, align(64))]
pub struct Scratch {
    words: BlockWords,
}

impl fmt::Debug for Scratch {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Scratch").finish_non_exhaustive()
    }
}

impl Default for Scratch {
    #[inline]
    fn default() -> Self {
        Self::new()
    }
}

impl Drop for Scratch {
    #[inline]
    fn drop(&mut self) {
        self.clear();
    }
}

impl Scratch {
    /// Create zeroed scratch buffer
    #[inline]
    pub const fn new() -> Self {
        Self {
            words: [0; BLOCK_WORDS],
        }
    }

    /// Whether every word of the buffer is zero
    #[inline]
    pub fn is_clear(&self) -> bool {
        self.words.iter().all(|&word| word == 0)
    }

    #[inline(always)]
    pub(crate) fn words_mut(&mut self) -> &mut BlockWords {
        &mut self.words
    }

    #[inline(always)]
    pub(crate) fn clear(&mut self) {
        self.words.zeroize();
    }
}

/// Block compression implementation.
///
/// All kernels produce bit-identical results, they differ only in how much of the fixed schedule
/// is expanded into straight-line code.
#[derive(
    Debug,
    Default,
    Copy,
    Clone,
    Eq,
    PartialEq,
    Hash,
    strum::EnumIter,
    strum::EnumString,
    strum::IntoStaticStr,
)]
#[strum(serialize_all = "kebab-case")]
pub enum Kernel {
    /// Loops over permutation groups and `G` applications, lanes are accessed by computed index
    Reference,
    /// Generated, loops over permutation groups with `G` call sites of a group expanded
    PartialUnroll,
    /// Generated, every lane is a local and every `G` call site is expanded in place
    #[default]
    FullUnroll,
}

impl fmt::Display for Kernel {
    #[inline]
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl Kernel {
    /// Kernel used by [`block()`]
    pub const DEFAULT: Self = Self::FullUnroll;

    /// Stable kernel name
    #[inline]
    pub fn as_str(self) -> &'static str {
        self.into()
    }
}

/// Error returned by [`try_block()`]
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum BlockError {
    /// Block position is not a multiple of the number of words in a block
    #[error("Block position {position} is not a multiple of {BLOCK_WORDS}")]
    Misaligned {
        /// Offending position
        position: usize,
    },
    /// Block does not fit into the arena
    #[error("Block at position {position} does not fit into arena of {arena_len} words")]
    OutOfBounds {
        /// Offending position
        position: usize,
        /// Number of words in the arena
        arena_len: usize,
    },
    /// Output block is one of the inputs
    #[error("Output block at {out_pos} overlaps input block at {input_pos}")]
    OutputOverlapsInput {
        /// Position of the output block
        out_pos: usize,
        /// Position of the overlapping input block
        input_pos: usize,
    },
}

#[inline(always)]
pub(crate) fn load_xor(state: &mut BlockWords, x: &BlockWords, y: &BlockWords) {
    for ((s, x), y) in state.iter_mut().zip(x).zip(y) {
        *s = x ^ y;
    }
}

/// Writes `R ^ permuted(R)` into `out`, where `R = x ^ y` and `state` holds `permuted(R)`
#[inline(always)]
pub(crate) fn store_result(
    state: &BlockWords,
    x: &BlockWords,
    y: &BlockWords,
    out: &mut BlockWords,
    need_xor: bool,
) {
    let result = state.iter().zip(x).zip(y).map(|((s, x), y)| s ^ x ^ y);
    if need_xor {
        for (out, result) in out.iter_mut().zip(result) {
            *out ^= result;
        }
    } else {
        for (out, result) in out.iter_mut().zip(result) {
            *out = result;
        }
    }
}

fn compress_reference(
    x: &BlockWords,
    y: &BlockWords,
    out: &mut BlockWords,
    need_xor: bool,
    scratch: &mut Scratch,
) {
    let state = scratch.words_mut();
    load_xor(state, x, y);

    for group in &COLUMN_GROUPS {
        p(state, group);
    }
    for group in &ROW_GROUPS {
        p(state, group);
    }

    store_result(state, x, y, out, need_xor);
    scratch.clear();
}

/// Compresses blocks `x` and `y` into `out` with a specific kernel.
///
/// `out` is overwritten with the result if `need_xor` is `false`, otherwise the result is XORed
/// into existing contents of `out`. `scratch` is zeroed before return.
#[inline]
pub fn compress(
    kernel: Kernel,
    x: &BlockWords,
    y: &BlockWords,
    out: &mut BlockWords,
    need_xor: bool,
    scratch: &mut Scratch,
) {
    match kernel {
        Kernel::Reference => compress_reference(x, y, out, need_xor, scratch),
        Kernel::PartialUnroll => compress_partial_unroll(x, y, out, need_xor, scratch),
        Kernel::FullUnroll => compress_full_unroll(x, y, out, need_xor, scratch),
    }
}

fn input_window<'a>(
    before: &'a [u32],
    after: &'a [u32],
    out_pos: usize,
    pos: usize,
) -> &'a BlockWords {
    let words = if pos < out_pos {
        before.get(pos..)
    } else {
        pos.checked_sub(out_pos + BLOCK_WORDS)
            .and_then(|offset| after.get(offset..))
    };

    words
        .and_then(|words| words.first_chunk())
        .expect("Input block must be inside arena and must not overlap output block")
}

/// Compresses blocks at word offsets `x_pos` and `y_pos` of `arena` into the block at `out_pos`
/// with a specific kernel.
///
/// All positions must be multiples of [`BLOCK_WORDS`] with the whole block inside `arena`, output
/// block must not be `x_pos` or `y_pos` (`x_pos == y_pos` is fine). Violations are caught by
/// debug assertions, out of bounds and overlapping windows also panic in release builds. See
/// [`try_block()`] for checked version.
#[inline]
pub fn block_with(
    kernel: Kernel,
    arena: &mut [u32],
    x_pos: usize,
    y_pos: usize,
    out_pos: usize,
    need_xor: bool,
    scratch: &mut Scratch,
) {
    debug_assert!(
        x_pos.is_multiple_of(BLOCK_WORDS)
            && y_pos.is_multiple_of(BLOCK_WORDS)
            && out_pos.is_multiple_of(BLOCK_WORDS),
        "Block positions must be aligned to {BLOCK_WORDS} words: {x_pos} {y_pos} {out_pos}"
    );
    debug_assert!(
        out_pos != x_pos && out_pos != y_pos,
        "Output block must not be an input: {x_pos} {y_pos} {out_pos}"
    );

    let (before, rest) = arena.split_at_mut(out_pos);
    let (out, after) = rest.split_at_mut(BLOCK_WORDS);
    let out = <&mut BlockWords>::try_from(out)
        .expect("Split at exactly the number of words in a block; qed");
    let x = input_window(before, after, out_pos, x_pos);
    let y = input_window(before, after, out_pos, y_pos);

    compress(kernel, x, y, out, need_xor, scratch);
}

/// Compresses blocks at word offsets `x_pos` and `y_pos` of `arena` into the block at `out_pos`.
///
/// Uses [`Kernel::DEFAULT`], see [`block_with()`] for details and preconditions.
#[inline]
pub fn block(
    arena: &mut [u32],
    x_pos: usize,
    y_pos: usize,
    out_pos: usize,
    need_xor: bool,
    scratch: &mut Scratch,
) {
    block_with(
        Kernel::DEFAULT,
        arena,
        x_pos,
        y_pos,
        out_pos,
        need_xor,
        scratch,
    );
}

/// Same as [`block()`], but checks preconditions and returns an error instead of panicking
pub fn try_block(
    arena: &mut [u32],
    x_pos: usize,
    y_pos: usize,
    out_pos: usize,
    need_xor: bool,
    scratch: &mut Scratch,
) -> Result<(), BlockError> {
    let arena_len = arena.len();
    for position in [x_pos, y_pos, out_pos] {
        if !position.is_multiple_of(BLOCK_WORDS) {
            return Err(BlockError::Misaligned { position });
        }
        if position
            .checked_add(BLOCK_WORDS)
            .is_none_or(|end| end > arena_len)
        {
            return Err(BlockError::OutOfBounds {
                position,
                arena_len,
            });
        }
    }
    // Aligned blocks either coincide or don't overlap at all
    for input_pos in [x_pos, y_pos] {
        if input_pos == out_pos {
            return Err(BlockError::OutputOverlapsInput { out_pos, input_pos });
        }
    }

    block(arena, x_pos, y_pos, out_pos, need_xor, scratch);

    Ok(())
}

/// Same as [`block()`], but uses scratch buffer owned by the current thread
#[cfg(feature = "std")]
pub fn block_with_thread_scratch(
    arena: &mut [u32],
    x_pos: usize,
    y_pos: usize,
    out_pos: usize,
    need_xor: bool,
) {
    use core::cell::RefCell;

    std::thread_local! {
        static SCRATCH: RefCell<Scratch> = const { RefCell::new(Scratch::new()) };
    }

    SCRATCH.with_borrow_mut(|scratch| {
        block(arena, x_pos, y_pos, out_pos, need_xor, scratch);
    });
}
