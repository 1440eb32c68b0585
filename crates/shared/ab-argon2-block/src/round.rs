//! BLAMKA quarter-round `G` and permutation `P` over the lanes of a block


use crate::BlockWords;
use crate::lane::Lane;
use crate::schedule::{G_GROUPS, G_ROTATIONS, GROUP_LANES};

/// Quarter-round `G` on four lanes.
///
/// Same shape as the BLAKE2b `G` with additions replaced by [`Lane::blamka()`] and no message
/// words.
#[inline(always)]
#[cfg_attr(feature = "no-panic", no_panic::no_panic)]
pub fn g_lanes(a: &mut Lane, b: &mut Lane, c: &mut Lane, d: &mut Lane) {
    *a = a.blamka(*b);
    *d = (*d ^ *a).rotate_right::<{ G_ROTATIONS[0] }>();
    *c = c.blamka(*d);
    *b = (*b ^ *c).rotate_right::<{ G_ROTATIONS[1] }>();
    *a = a.blamka(*b);
    *d = (*d ^ *a).rotate_right::<{ G_ROTATIONS[2] }>();
    *c = c.blamka(*d);
    *b = (*b ^ *c).rotate_right::<{ G_ROTATIONS[3] }>();
}

#[inline(always)]
fn load(state: &BlockWords, lane: usize) -> Lane {
    Lane::from_words(state[2 * lane], state[2 * lane + 1])
}

#[inline(always)]
fn store(state: &mut BlockWords, lane: usize, value: Lane) {
    state[2 * lane] = value.lo();
    state[2 * lane + 1] = value.hi();
}

/// Quarter-round `G` on lanes `a`, `b`, `c` and `d` of a block, in place.
///
/// Lane indices must be pairwise distinct and below [`BLOCK_LANES`](crate::BLOCK_LANES).
#[inline]
pub fn g(state: &mut BlockWords, a: usize, b: usize, c: usize, d: usize) {
    debug_assert!(
        a != b && a != c && a != d && b != c && b != d && c != d,
        "G lanes must be pairwise distinct: {a} {b} {c} {d}"
    );

    let (mut va, mut vb, mut vc, mut vd) = (
        load(state, a),
        load(state, b),
        load(state, c),
        load(state, d),
    );
    g_lanes(&mut va, &mut vb, &mut vc, &mut vd);
    store(state, a, va);
    store(state, b, vb);
    store(state, c, vc);
    store(state, d, vd);
}

/// Permutation `P` on the 16 lanes of `group`, in place.
///
/// `group` holds lane indices, see [`COLUMN_GROUPS`](crate::schedule::COLUMN_GROUPS) and
/// [`ROW_GROUPS`](crate::schedule::ROW_GROUPS).
#[inline]
pub fn p(state: &mut BlockWords, group: &[usize; GROUP_LANES]) {
    for [a, b, c, d] in G_GROUPS {
        g(state, group[a], group[b], group[c], group[d]);
    }
}
