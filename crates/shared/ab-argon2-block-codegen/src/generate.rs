
use crate::schedule::{BLOCK_LANES, GROUP_LANES, Schedule};
use anyhow::Context;
use prettyplease::unparse;
use proc_macro2::{Literal, TokenStream};
use quote::{format_ident, quote};
use std::env;
use std::fs;
use std::path::{Path, PathBuf};
use syn::{Ident, parse2};
use tracing::{debug, info, warn};

const HEADER: &str = "// Generated by `ab-argon2-block-codegen`, do not edit\n\n";

/// How much of block compression is expanded into straight-line code
#[derive(Debug, Copy, Clone, Eq, PartialEq, Hash)]
#[cfg_attr(feature = "cli", derive(clap::ValueEnum))]
pub enum Strategy {
    /// Every lane is a local, every loop is unrolled and every `G` call site is expanded in place.
    ///
    /// Generates `compress_full_unroll()`.
    #[cfg_attr(feature = "cli", value(name = "full"))]
    FullInline,
    /// Loop over permutation groups is kept, `G` call sites within a group are emitted with
    /// literal positions and delegate to `g_lanes()`.
    ///
    /// Generates `compress_partial_unroll()` and its `PERMUTATION_WORD_OFFSETS` table.
    #[cfg_attr(feature = "cli", value(name = "partial"))]
    PartialInline,
}

impl Strategy {
    /// All strategies
    pub const ALL: [Self; 2] = [Self::FullInline, Self::PartialInline];

    /// Name of the file the kernel is written into by [`generate_kernels()`]
    pub const fn file_name(self) -> &'static str {
        match self {
            Self::FullInline => "full_unroll.rs",
            Self::PartialInline => "partial_unroll.rs",
        }
    }
}

/// Result of [`write_kernel()`]
#[derive(Debug, Copy, Clone, Eq, PartialEq)]
pub enum WriteOutcome {
    /// File was created or its contents were replaced
    Written,
    /// File already had identical contents and was left untouched
    Unchanged,
}

/// Generates formatted Rust source of a kernel.
///
/// Output is deterministic: the same schedule and strategy always produce byte-identical text.
/// The source expects `Lane`, `BlockWords` and `Scratch` to be in scope at the place of
/// inclusion, partial kernel additionally expects `g_lanes`, `load_xor` and `store_result`.
pub fn generate(schedule: &Schedule, strategy: Strategy) -> anyhow::Result<String> {
    schedule
        .validate()
        .context("Refusing to generate kernel from malformed schedule")?;

    let tokens = match strategy {
        Strategy::FullInline => full_inline(schedule),
        Strategy::PartialInline => partial_inline(schedule),
    };
    let file = parse2(tokens).context("Generated kernel is not valid Rust")?;
    let code = format!("{HEADER}{}", unparse(&file));
    debug!(?strategy, bytes = code.len(), "Kernel generated");

    Ok(code)
}

/// Writes a kernel into `out_dir`, leaving the file alone if contents are already up to date
pub fn write_kernel(
    out_dir: &Path,
    schedule: &Schedule,
    strategy: Strategy,
) -> anyhow::Result<(PathBuf, WriteOutcome)> {
    let code = generate(schedule, strategy)?;
    let path = out_dir.join(strategy.file_name());

    // Avoid touching the file if contents didn't change, otherwise dependent crate is recompiled
    if fs::read_to_string(&path).ok().as_ref() == Some(&code) {
        info!(path = %path.display(), ?strategy, "Kernel is up to date");
        return Ok((path, WriteOutcome::Unchanged));
    }

    fs::write(&path, code)
        .with_context(|| format!("Failed to write generated kernel `{}`", path.display()))?;
    info!(path = %path.display(), ?strategy, "Kernel written");

    Ok((path, WriteOutcome::Written))
}

/// Checks whether `path` contains exactly the kernel generated from `schedule` with `strategy`.
///
/// Returns `Ok(false)` for a stale file, missing or unreadable file is an error.
pub fn check_kernel(path: &Path, schedule: &Schedule, strategy: Strategy) -> anyhow::Result<bool> {
    let code = generate(schedule, strategy)?;
    let existing = fs::read_to_string(path)
        .with_context(|| format!("Failed to read kernel `{}`", path.display()))?;

    if existing != code {
        warn!(path = %path.display(), ?strategy, "Kernel is out of date");
        return Ok(false);
    }

    info!(path = %path.display(), ?strategy, "Kernel is up to date");
    Ok(true)
}

/// Generates all kernels of the Argon2 schedule into `OUT_DIR` when called from `build.rs`
pub fn generate_kernels() -> anyhow::Result<()> {
    let out_dir = env::var_os("OUT_DIR").context(
        "Failed to retrieve `OUT_DIR` environment variable, make sure to call \
        `generate_kernels` from `build.rs`",
    )?;
    println!("cargo::rerun-if-changed=build.rs");

    for strategy in Strategy::ALL {
        write_kernel(Path::new(&out_dir), &Schedule::ARGON2, strategy)?;
    }

    Ok(())
}

fn usize_literal(value: usize) -> Literal {
    Literal::usize_unsuffixed(value)
}

/// Lane `lane` of a block lives in words `2 * lane` (low half) and `2 * lane + 1` (high half)
fn lane_words(lane: usize) -> (Literal, Literal) {
    (usize_literal(2 * lane), usize_literal(2 * lane + 1))
}

/// `G` on four local lanes, expanded in place
fn g_inline(schedule: &Schedule, [a, b, c, d]: [&Ident; 4]) -> TokenStream {
    let [r0, r1, r2, r3] = schedule.g_rotations.map(Literal::u32_unsuffixed);

    quote! {
        #a = #a.blamka(#b);
        #d = (#d ^ #a).rotate_right::<#r0>();
        #c = #c.blamka(#d);
        #b = (#b ^ #c).rotate_right::<#r1>();
        #a = #a.blamka(#b);
        #d = (#d ^ #a).rotate_right::<#r2>();
        #c = #c.blamka(#d);
        #b = (#b ^ #c).rotate_right::<#r3>();
    }
}

fn full_inline_group(schedule: &Schedule, lanes: &[usize; GROUP_LANES]) -> TokenStream {
    let locals = (0..GROUP_LANES)
        .map(|position| format_ident!("v{position}"))
        .collect::<Vec<_>>();

    let loads = lanes.iter().zip(&locals).map(|(&lane, local)| {
        let (lo, hi) = lane_words(lane);
        quote! { let mut #local = Lane::from_words(s[#lo], s[#hi]); }
    });
    let mixes = schedule
        .g_groups
        .iter()
        .map(|positions| g_inline(schedule, positions.map(|position| &locals[position])));
    let stores = lanes.iter().zip(&locals).map(|(&lane, local)| {
        let (lo, hi) = lane_words(lane);
        quote! {
            s[#lo] = #local.lo();
            s[#hi] = #local.hi();
        }
    });

    quote! {
        {
            #( #loads )*
            #( #mixes )*
            #( #stores )*
        }
    }
}

fn full_inline(schedule: &Schedule) -> TokenStream {
    let words = (0..2 * BLOCK_LANES).map(usize_literal).collect::<Vec<_>>();
    let groups = schedule
        .permutation_groups()
        .map(|lanes| full_inline_group(schedule, lanes));

    quote! {
        /// Block compression with every lane in a local and every `G` call site expanded in place
        #[cfg_attr(feature = "no-panic", no_panic::no_panic)]
        pub(crate) fn compress_full_unroll(
            x: &BlockWords,
            y: &BlockWords,
            out: &mut BlockWords,
            need_xor: bool,
            scratch: &mut Scratch,
        ) {
            let s = scratch.words_mut();

            #( s[#words] = x[#words] ^ y[#words]; )*

            #( #groups )*

            if need_xor {
                #( out[#words] ^= s[#words] ^ x[#words] ^ y[#words]; )*
            } else {
                #( out[#words] = s[#words] ^ x[#words] ^ y[#words]; )*
            }

            scratch.clear();
        }
    }
}

fn partial_inline(schedule: &Schedule) -> TokenStream {
    let group_lanes = usize_literal(GROUP_LANES);
    let group_count = usize_literal(schedule.permutation_groups().count());
    let offsets = schedule.permutation_groups().map(|lanes| {
        let offsets = lanes.iter().map(|&lane| usize_literal(2 * lane));
        quote! { [ #( #offsets ),* ] }
    });

    let g_sites = schedule.g_groups.iter().map(|positions| {
        let [a, b, c, d] = positions.map(usize_literal);
        quote! {
            {
                let mut a = Lane::from_words(s[group[#a]], s[group[#a] + 1]);
                let mut b = Lane::from_words(s[group[#b]], s[group[#b] + 1]);
                let mut c = Lane::from_words(s[group[#c]], s[group[#c] + 1]);
                let mut d = Lane::from_words(s[group[#d]], s[group[#d] + 1]);
                g_lanes(&mut a, &mut b, &mut c, &mut d);
                s[group[#a]] = a.lo();
                s[group[#a] + 1] = a.hi();
                s[group[#b]] = b.lo();
                s[group[#b] + 1] = b.hi();
                s[group[#c]] = c.lo();
                s[group[#c] + 1] = c.hi();
                s[group[#d]] = d.lo();
                s[group[#d] + 1] = d.hi();
            }
        }
    });

    quote! {
        /// Word offsets of the low halves of lanes of every permutation group, column groups first
        const PERMUTATION_WORD_OFFSETS: [[usize; #group_lanes]; #group_count] = [
            #( #offsets ),*
        ];

        /// Block compression that loops over permutation groups with `G` call sites expanded
        /// within a group
        pub(crate) fn compress_partial_unroll(
            x: &BlockWords,
            y: &BlockWords,
            out: &mut BlockWords,
            need_xor: bool,
            scratch: &mut Scratch,
        ) {
            let s = scratch.words_mut();
            load_xor(s, x, y);

            for group in &PERMUTATION_WORD_OFFSETS {
                #( #g_sites )*
            }

            store_result(s, x, y, out, need_xor);
            scratch.clear();
        }
    }
}
