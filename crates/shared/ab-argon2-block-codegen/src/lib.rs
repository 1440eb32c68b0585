//! Permutation schedule of Argon2 block compression and generator of unrolled kernels.
//!
//! [`schedule`] is always available (and `no_std`), it is the single source of truth for lane
//! positions used by both the loop-based reference kernel and the generated ones. With `build`
//! feature enabled, [`generate_kernels()`] is meant to be called from `build.rs` of a crate that
//! `include!()`s the generated source.

#![cfg_attr(not(feature = "build"), no_std)]

#[cfg(feature = "build")]
mod generate;
pub mod schedule;

#[cfg(feature = "build")]
pub use generate::{
    Strategy, WriteOutcome, check_kernel, generate, generate_kernels, write_kernel,
};
