// Quote-aware row-boundary scan
//
// Reports the offset just past every unquoted row terminator. The streaming
// coordinator takes the highest such offset as its safe split point; the
// parallel strategy slabs the full list.
//
// Single-byte escapes get a simdjson-style prefix-XOR pass: one quote
// bitmask per chunk, cumulative XOR to mark in-quotes lanes, newline bits
// filtered through the complement. The parity IS the in-quotes state:
// every escape occurrence toggles it and a doubled pair cancels itself.
// Multi-byte escapes take a scalar walk with an explicit doubled-escape
// skip, where that equivalence does not hold (overlapping matches).

use std::simd::prelude::*;

use crate::core::config::Config;

/// Baseline SIMD chunk size (128-bit).
const CHUNK: usize = 16;

/// Wide chunk size for AVX2 targets.
#[cfg(target_feature = "avx2")]
const WIDE: usize = 32;

/// Prefix-XOR via shift-and-xor cascade (works for 16 and 32 bits within a
/// u64, since upper bits are zero). Bit i of the result is set iff an odd
/// number of bits at positions 0..=i are set in the input.
#[inline]
fn prefix_xor(mut x: u64) -> u64 {
    x ^= x << 1;
    x ^= x << 2;
    x ^= x << 4;
    x ^= x << 8;
    x ^= x << 16;
    x ^= x << 32;
    x
}

/// Emit a cut for each set bit: `\n` cuts just past itself, `\r` cuts just
/// past itself unless a `\n` follows (the pair is reported once, by its
/// `\n` bit, which may sit in the next chunk).
#[inline]
fn emit_cuts(buffer: &[u8], chunk_start: usize, mut bits: u64, cut: &mut impl FnMut(usize)) {
    while bits != 0 {
        let abs = chunk_start + bits.trailing_zeros() as usize;
        if buffer[abs] == b'\r' && buffer.get(abs + 1) == Some(&b'\n') {
            // Reported by the \n bit.
        } else {
            cut(abs + 1);
        }
        bits &= bits - 1;
    }
}

/// Prefix-XOR scan for single-byte escapes.
fn for_each_row_cut_simd(buffer: &[u8], escape: u8, mut cut: impl FnMut(usize)) {
    let mut pos = 0usize;
    let mut quote_carry: u64 = 0; // 0 or 1: parity of escapes seen so far

    #[cfg(target_feature = "avx2")]
    {
        let esc_splat = Simd::<u8, WIDE>::splat(escape);
        let lf_splat = Simd::<u8, WIDE>::splat(b'\n');
        let cr_splat = Simd::<u8, WIDE>::splat(b'\r');

        const MASK_32: u64 = (1u64 << 32) - 1;

        while pos + WIDE <= buffer.len() {
            let chunk = Simd::<u8, WIDE>::from_slice(&buffer[pos..pos + WIDE]);

            let esc_mask = chunk.simd_eq(esc_splat).to_bitmask() & MASK_32;
            let raw_quoted = prefix_xor(esc_mask) & MASK_32;
            let quoted = raw_quoted ^ (quote_carry.wrapping_neg() & MASK_32);
            quote_carry ^= (esc_mask.count_ones() as u64) & 1;
            let not_quoted = !quoted & MASK_32;

            let nl_bits = (chunk.simd_eq(lf_splat).to_bitmask()
                | chunk.simd_eq(cr_splat).to_bitmask())
                & not_quoted;
            emit_cuts(buffer, pos, nl_bits, &mut cut);

            pos += WIDE;
        }
    }

    {
        let esc_splat = Simd::<u8, CHUNK>::splat(escape);
        let lf_splat = Simd::<u8, CHUNK>::splat(b'\n');
        let cr_splat = Simd::<u8, CHUNK>::splat(b'\r');

        const MASK_16: u64 = (1u64 << 16) - 1;

        while pos + CHUNK <= buffer.len() {
            let chunk = Simd::<u8, CHUNK>::from_slice(&buffer[pos..pos + CHUNK]);

            let esc_mask = chunk.simd_eq(esc_splat).to_bitmask() & MASK_16;
            let raw_quoted = prefix_xor(esc_mask) & MASK_16;
            let quoted = raw_quoted ^ (quote_carry.wrapping_neg() & MASK_16);
            quote_carry ^= (esc_mask.count_ones() as u64) & 1;
            let not_quoted = !quoted & MASK_16;

            let nl_bits = (chunk.simd_eq(lf_splat).to_bitmask()
                | chunk.simd_eq(cr_splat).to_bitmask())
                & not_quoted;
            emit_cuts(buffer, pos, nl_bits, &mut cut);

            pos += CHUNK;
        }
    }

    // Scalar tail.
    let mut in_quotes = quote_carry != 0;
    let mut i = pos;
    while i < buffer.len() {
        let byte = buffer[i];
        if byte == escape {
            in_quotes = !in_quotes;
            i += 1;
        } else if in_quotes {
            i += 1;
        } else if byte == b'\n' {
            i += 1;
            cut(i);
        } else if byte == b'\r' {
            i += 1;
            if buffer.get(i) == Some(&b'\n') {
                i += 1;
            }
            cut(i);
        } else {
            i += 1;
        }
    }
}

/// Scalar walk for multi-byte escapes, with the doubled-escape skip.
fn for_each_row_cut_scalar(buffer: &[u8], config: &Config, mut cut: impl FnMut(usize)) {
    let k = config.escape_len();
    let mut in_quotes = false;
    let mut i = 0;
    while i < buffer.len() {
        if config.match_escape_at(buffer, i).is_some() {
            if in_quotes && config.match_escape_at(buffer, i + k).is_some() {
                i += 2 * k;
            } else {
                in_quotes = !in_quotes;
                i += k;
            }
            continue;
        }
        if in_quotes {
            i += 1;
            continue;
        }
        match buffer[i] {
            b'\n' => {
                i += 1;
                cut(i);
            }
            b'\r' => {
                i += 1;
                if buffer.get(i) == Some(&b'\n') {
                    i += 1;
                }
                cut(i);
            }
            _ => i += 1,
        }
    }
}

/// Walk `buffer` with quote tracking and report each offset just past an
/// unquoted row terminator, in ascending order.
///
/// A `\r` at the end of the buffer is still a cut; when its `\n` arrives in
/// a later chunk the resulting bare-newline row is dropped by the streaming
/// body emitter.
pub(crate) fn for_each_row_cut(buffer: &[u8], config: &Config, cut: impl FnMut(usize)) {
    if config.is_single_byte_esc() {
        for_each_row_cut_simd(buffer, config.escape_byte(), cut);
    } else {
        for_each_row_cut_scalar(buffer, config, cut);
    }
}

/// Highest offset after which no quoted field is open and an unquoted row
/// terminator has just been consumed; 0 when there is none.
pub(crate) fn last_complete_row_boundary(buffer: &[u8], config: &Config) -> usize {
    let mut last = 0;
    for_each_row_cut(buffer, config, |c| last = c);
    last
}
