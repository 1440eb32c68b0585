//! Minimal Argon2 (RFC 9106) built around the block kernel, exists only to check the kernel
//! against published tags and an independent implementation

use ab_argon2_block::{
    BLOCK_BYTES, BLOCK_WORDS, Kernel, Scratch, block_with, le_bytes_from_words,
    words_from_le_bytes,
};
use blake2::digest::{Digest, Update, VariableOutput};
use blake2::{Blake2b512, Blake2bVar};

const SYNC_POINTS: usize = 4;
const ADDRESSES_IN_BLOCK: usize = 128;

#[derive(Debug, Copy, Clone, Eq, PartialEq)]
pub(crate) enum Algorithm {
    Argon2d = 0,
    Argon2i = 1,
    Argon2id = 2,
}

#[derive(Debug, Copy, Clone, Eq, PartialEq)]
pub(crate) enum Version {
    V0x10 = 0x10,
    V0x13 = 0x13,
}

#[derive(Debug, Clone)]
pub(crate) struct Params<'a> {
    pub(crate) algorithm: Algorithm,
    pub(crate) version: Version,
    pub(crate) m_cost: u32,
    pub(crate) t_cost: u32,
    pub(crate) lanes: u32,
    pub(crate) password: &'a [u8],
    pub(crate) salt: &'a [u8],
    pub(crate) secret: &'a [u8],
    pub(crate) associated_data: &'a [u8],
    pub(crate) tag_len: usize,
}

#[derive(Debug, Copy, Clone)]
struct Geometry {
    lanes: usize,
    segment_length: usize,
    lane_length: usize,
}

impl Geometry {
    fn new(params: &Params<'_>) -> Self {
        let lanes = params.lanes as usize;
        // Memory is rounded down to a multiple of `4 * lanes` blocks, with at least 2 blocks per
        // segment
        let memory_blocks = (params.m_cost as usize).max(2 * SYNC_POINTS * lanes);
        let segment_length = memory_blocks / (lanes * SYNC_POINTS);

        Self {
            lanes,
            segment_length,
            lane_length: segment_length * SYNC_POINTS,
        }
    }

    fn block_count(&self) -> usize {
        self.lane_length * self.lanes
    }
}

/// `H'` from RFC 9106 section 3.3
fn blake2b_long(inputs: &[&[u8]], out: &mut [u8]) {
    const HALF: usize = 32;

    let len_bytes = u32::try_from(out.len()).unwrap().to_le_bytes();

    if out.len() <= 64 {
        let mut digest = Blake2bVar::new(out.len()).unwrap();
        digest.update(&len_bytes);
        for input in inputs {
            digest.update(input);
        }
        digest.finalize_variable(out).unwrap();
        return;
    }

    let mut digest = Blake2b512::new();
    Digest::update(&mut digest, len_bytes);
    for input in inputs {
        Digest::update(&mut digest, input);
    }
    let mut last = digest.finalize();
    out[..HALF].copy_from_slice(&last[..HALF]);

    let mut offset = HALF;
    while out.len() - offset > 64 {
        last = Blake2b512::digest(last);
        out[offset..][..HALF].copy_from_slice(&last[..HALF]);
        offset += HALF;
    }

    let mut digest = Blake2bVar::new(out.len() - offset).unwrap();
    digest.update(&last);
    digest.finalize_variable(&mut out[offset..]).unwrap();
}

/// `H0` from RFC 9106 section 3.2
fn initial_hash(params: &Params<'_>) -> [u8; 64] {
    let mut digest = Blake2b512::new();
    for value in [
        params.lanes,
        u32::try_from(params.tag_len).unwrap(),
        params.m_cost,
        params.t_cost,
        params.version as u32,
        params.algorithm as u32,
    ] {
        Digest::update(&mut digest, value.to_le_bytes());
    }
    for input in [
        params.password,
        params.salt,
        params.secret,
        params.associated_data,
    ] {
        Digest::update(&mut digest, u32::try_from(input.len()).unwrap().to_le_bytes());
        Digest::update(&mut digest, input);
    }

    let mut h0 = [0; 64];
    h0.copy_from_slice(&digest.finalize());
    h0
}

/// Pseudo-random values of data-independent addressing, RFC 9106 section 3.4.2
#[derive(Debug)]
struct AddressGenerator {
    /// `[zero, input, intermediate, addresses]`
    arena: Vec<u32>,
}

impl AddressGenerator {
    const ZERO: usize = 0;
    const INPUT: usize = BLOCK_WORDS;
    const INTERMEDIATE: usize = 2 * BLOCK_WORDS;
    const ADDRESSES: usize = 3 * BLOCK_WORDS;
    const COUNTER_LANE: usize = 6;

    fn new(params: &Params<'_>, geometry: &Geometry, pass: usize, lane: usize, slice: usize) -> Self {
        let mut arena = vec![0; 4 * BLOCK_WORDS];
        let input = [
            pass,
            lane,
            slice,
            geometry.block_count(),
            params.t_cost as usize,
            params.algorithm as usize,
        ];
        for (index, value) in input.into_iter().enumerate() {
            set_lane(&mut arena, Self::INPUT, index, value as u64);
        }

        Self { arena }
    }

    fn next_block(&mut self, kernel: Kernel, scratch: &mut Scratch) {
        let counter = get_lane(&self.arena, Self::INPUT, Self::COUNTER_LANE);
        set_lane(&mut self.arena, Self::INPUT, Self::COUNTER_LANE, counter + 1);

        block_with(
            kernel,
            &mut self.arena,
            Self::ZERO,
            Self::INPUT,
            Self::INTERMEDIATE,
            false,
            scratch,
        );
        block_with(
            kernel,
            &mut self.arena,
            Self::ZERO,
            Self::INTERMEDIATE,
            Self::ADDRESSES,
            false,
            scratch,
        );
    }

    fn address(&self, index: usize) -> u64 {
        get_lane(&self.arena, Self::ADDRESSES, index)
    }
}

fn get_lane(arena: &[u32], block_pos: usize, lane: usize) -> u64 {
    let lo = arena[block_pos + 2 * lane];
    let hi = arena[block_pos + 2 * lane + 1];
    (u64::from(hi) << 32) | u64::from(lo)
}

fn set_lane(arena: &mut [u32], block_pos: usize, lane: usize, value: u64) {
    arena[block_pos + 2 * lane] = value as u32;
    arena[block_pos + 2 * lane + 1] = (value >> 32) as u32;
}

/// Index of the reference block within the reference lane, RFC 9106 section 3.4.1.2
fn reference_index(
    geometry: &Geometry,
    pass: usize,
    slice: usize,
    index: usize,
    j1: u32,
    same_lane: bool,
) -> usize {
    let Geometry {
        segment_length,
        lane_length,
        ..
    } = *geometry;

    let area_size = if pass == 0 {
        if slice == 0 {
            index - 1
        } else if same_lane {
            slice * segment_length + index - 1
        } else if index == 0 {
            slice * segment_length - 1
        } else {
            slice * segment_length
        }
    } else if same_lane {
        lane_length - segment_length + index - 1
    } else if index == 0 {
        lane_length - segment_length - 1
    } else {
        lane_length - segment_length
    };

    let x = (u64::from(j1) * u64::from(j1)) >> 32;
    let y = (area_size as u64 * x) >> 32;
    let relative = area_size - 1 - y as usize;

    let start = if pass == 0 || slice == SYNC_POINTS - 1 {
        0
    } else {
        (slice + 1) * segment_length
    };

    (start + relative) % lane_length
}

#[expect(clippy::too_many_arguments, reason = "Mirrors RFC 9106 segment parameters")]
fn fill_segment(
    arena: &mut [u32],
    kernel: Kernel,
    scratch: &mut Scratch,
    params: &Params<'_>,
    geometry: &Geometry,
    pass: usize,
    slice: usize,
    lane: usize,
) {
    let data_independent = match params.algorithm {
        Algorithm::Argon2d => false,
        Algorithm::Argon2i => true,
        Algorithm::Argon2id => pass == 0 && slice < SYNC_POINTS / 2,
    };
    let mut addresses =
        data_independent.then(|| AddressGenerator::new(params, geometry, pass, lane, slice));

    // First two blocks of every lane are produced from `H0`
    let starting_index = if pass == 0 && slice == 0 { 2 } else { 0 };
    if starting_index != 0
        && let Some(addresses) = &mut addresses
    {
        addresses.next_block(kernel, scratch);
    }

    let segment_start = lane * geometry.lane_length + slice * geometry.segment_length;
    let first = segment_start + starting_index;
    let mut previous = if first.is_multiple_of(geometry.lane_length) {
        first + geometry.lane_length - 1
    } else {
        first - 1
    };
    // Overwritten on the first pass and for the old version, XORed into later passes otherwise
    let need_xor = pass != 0 && params.version == Version::V0x13;

    for index in starting_index..geometry.segment_length {
        let current = segment_start + index;
        let pseudo_random = match &mut addresses {
            Some(addresses) => {
                if index.is_multiple_of(ADDRESSES_IN_BLOCK) {
                    addresses.next_block(kernel, scratch);
                }
                addresses.address(index % ADDRESSES_IN_BLOCK)
            }
            None => get_lane(arena, previous * BLOCK_WORDS, 0),
        };

        let reference_lane = if pass == 0 && slice == 0 {
            lane
        } else {
            ((pseudo_random >> 32) % geometry.lanes as u64) as usize
        };
        let reference_index = reference_index(
            geometry,
            pass,
            slice,
            index,
            pseudo_random as u32,
            reference_lane == lane,
        );
        let reference = reference_lane * geometry.lane_length + reference_index;

        block_with(
            kernel,
            arena,
            previous * BLOCK_WORDS,
            reference * BLOCK_WORDS,
            current * BLOCK_WORDS,
            need_xor,
            scratch,
        );

        previous = current;
    }
}

/// Computes Argon2 tag using `kernel` for every block compression
pub(crate) fn hash(params: &Params<'_>, kernel: Kernel) -> Vec<u8> {
    let geometry = Geometry::new(params);
    let mut arena = vec![0u32; geometry.block_count() * BLOCK_WORDS];
    let mut scratch = Scratch::new();

    let h0 = initial_hash(params);
    for lane in 0..geometry.lanes {
        for column in 0..2 {
            let mut bytes = [0; BLOCK_BYTES];
            blake2b_long(
                &[
                    &h0,
                    &(column as u32).to_le_bytes(),
                    &(lane as u32).to_le_bytes(),
                ],
                &mut bytes,
            );
            let position = (lane * geometry.lane_length + column) * BLOCK_WORDS;
            arena[position..][..BLOCK_WORDS].copy_from_slice(&words_from_le_bytes(&bytes));
        }
    }

    for pass in 0..params.t_cost as usize {
        for slice in 0..SYNC_POINTS {
            for lane in 0..geometry.lanes {
                fill_segment(
                    &mut arena,
                    kernel,
                    &mut scratch,
                    params,
                    &geometry,
                    pass,
                    slice,
                    lane,
                );
            }
        }
    }

    let mut last = [0u32; BLOCK_WORDS];
    for lane in 0..geometry.lanes {
        let position = (lane * geometry.lane_length + geometry.lane_length - 1) * BLOCK_WORDS;
        for (last, word) in last.iter_mut().zip(&arena[position..][..BLOCK_WORDS]) {
            *last ^= word;
        }
    }

    let mut tag = vec![0; params.tag_len];
    blake2b_long(&[&le_bytes_from_words(&last)], &mut tag);
    tag
}
