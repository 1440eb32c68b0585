//! Kernels generated by `build.rs` from the Argon2 schedule

use crate::BlockWords;
use crate::block::{Scratch, load_xor, store_result};
use crate::lane::Lane;
use crate::round::g_lanes;

include!(concat!(env!("OUT_DIR"), "/full_unroll.rs"));
include!(concat!(env!("OUT_DIR"), "/partial_unroll.rs"));
