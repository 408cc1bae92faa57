// SIMD byte-class scanner
//
// Small-set byte search used by the parse engine: find the first occurrence
// of any byte in a set of at most ten targets (eight separator first bytes
// plus \n and \r), find a multi-byte pattern, count a byte.
//
// ## Stabilization-safe API subset (std::simd)
//
// We use only: Simd::from_slice, splat, simd_eq, to_bitmask, bitwise ops.
// These are the most stable parts of portable_simd. We avoid: swizzle,
// scatter, gather, and any SIMD shuffles.
//
// ## Shape
//
// AVX2 wide path (32 bytes) processes first, then 16-byte chunks, then a
// scalar tail. `to_bitmask()` returns u64 regardless of lane count; the
// lowest set bit of the combined mask is the chunk-relative match index.

use std::simd::prelude::*;

use crate::core::config::{Config, MAX_SEPARATORS};

/// Baseline SIMD chunk size (128-bit).
const CHUNK: usize = 16;

/// Wide chunk size for AVX2 targets.
#[cfg(target_feature = "avx2")]
const WIDE: usize = 32;

/// Find the first occurrence of `target` in `haystack`.
pub fn find_byte(haystack: &[u8], target: u8) -> Option<usize> {
    let mut pos = 0;

    #[cfg(target_feature = "avx2")]
    {
        let splat = Simd::<u8, WIDE>::splat(target);
        while pos + WIDE <= haystack.len() {
            let chunk = Simd::<u8, WIDE>::from_slice(&haystack[pos..pos + WIDE]);
            let mask = chunk.simd_eq(splat).to_bitmask();
            if mask != 0 {
                return Some(pos + mask.trailing_zeros() as usize);
            }
            pos += WIDE;
        }
    }

    {
        let splat = Simd::<u8, CHUNK>::splat(target);
        while pos + CHUNK <= haystack.len() {
            let chunk = Simd::<u8, CHUNK>::from_slice(&haystack[pos..pos + CHUNK]);
            let mask = chunk.simd_eq(splat).to_bitmask();
            if mask != 0 {
                return Some(pos + mask.trailing_zeros() as usize);
            }
            pos += CHUNK;
        }
    }

    haystack[pos..]
        .iter()
        .position(|&b| b == target)
        .map(|i| pos + i)
}

/// Find the first occurrence of any byte in `targets`.
///
/// `targets` is expected to be small; one broadcast compare per target per
/// chunk, result masks ORed together.
pub(crate) fn find_any_of(haystack: &[u8], targets: &[u8]) -> Option<usize> {
    let mut pos = 0;

    #[cfg(target_feature = "avx2")]
    {
        while pos + WIDE <= haystack.len() {
            let chunk = Simd::<u8, WIDE>::from_slice(&haystack[pos..pos + WIDE]);
            let mut mask = 0u64;
            for &t in targets {
                mask |= chunk.simd_eq(Simd::splat(t)).to_bitmask();
            }
            if mask != 0 {
                return Some(pos + mask.trailing_zeros() as usize);
            }
            pos += WIDE;
        }
    }

    {
        while pos + CHUNK <= haystack.len() {
            let chunk = Simd::<u8, CHUNK>::from_slice(&haystack[pos..pos + CHUNK]);
            let mut mask = 0u64;
            for &t in targets {
                mask |= chunk.simd_eq(Simd::splat(t)).to_bitmask();
            }
            if mask != 0 {
                return Some(pos + mask.trailing_zeros() as usize);
            }
            pos += CHUNK;
        }
    }

    haystack[pos..]
        .iter()
        .position(|b| targets.contains(b))
        .map(|i| pos + i)
}

/// Find the first occurrence of any of three target bytes.
#[inline]
pub fn find_any_of_three(haystack: &[u8], a: u8, b: u8, c: u8) -> Option<usize> {
    find_any_of(haystack, &[a, b, c])
}

/// Count occurrences of `target` in `haystack`.
pub fn count_byte(haystack: &[u8], target: u8) -> usize {
    let mut count = 0usize;
    let mut pos = 0;

    #[cfg(target_feature = "avx2")]
    {
        let splat = Simd::<u8, WIDE>::splat(target);
        while pos + WIDE <= haystack.len() {
            let chunk = Simd::<u8, WIDE>::from_slice(&haystack[pos..pos + WIDE]);
            count += chunk.simd_eq(splat).to_bitmask().count_ones() as usize;
            pos += WIDE;
        }
    }

    {
        let splat = Simd::<u8, CHUNK>::splat(target);
        while pos + CHUNK <= haystack.len() {
            let chunk = Simd::<u8, CHUNK>::from_slice(&haystack[pos..pos + CHUNK]);
            count += chunk.simd_eq(splat).to_bitmask().count_ones() as usize;
            pos += CHUNK;
        }
    }

    count + haystack[pos..].iter().filter(|&&b| b == target).count()
}

/// Find the first occurrence of a multi-byte pattern.
///
/// Uses `find_byte` on the pattern's first byte as a candidate filter, then
/// verifies the remaining bytes; a failed candidate advances the search by
/// one byte.
pub fn find_pattern(haystack: &[u8], pattern: &[u8]) -> Option<usize> {
    if pattern.is_empty() || pattern.len() > haystack.len() {
        return None;
    }
    if pattern.len() == 1 {
        return find_byte(haystack, pattern[0]);
    }

    let mut base = 0;
    while base + pattern.len() <= haystack.len() {
        let i = base + find_byte(&haystack[base..], pattern[0])?;
        if i + pattern.len() > haystack.len() {
            return None;
        }
        if haystack[i..i + pattern.len()] == *pattern {
            return Some(i);
        }
        base = i + 1;
    }
    None
}

/// Kind of boundary found by `find_next_delimiter`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DelimiterKind {
    Separator,
    Newline,
}

/// A field or row boundary: position, kind, and byte length of the match.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Delimiter {
    pub pos: usize,
    pub kind: DelimiterKind,
    pub len: usize,
}

/// `\r\n` is one newline of length 2; a lone `\r` or `\n` has length 1.
#[inline]
fn newline_len(haystack: &[u8], pos: usize) -> usize {
    if haystack[pos] == b'\r' && haystack.get(pos + 1) == Some(&b'\n') {
        2
    } else {
        1
    }
}

/// Find the next field separator or row terminator in `haystack`.
///
/// With a single-byte separator this is one three-target vector search. The
/// general path prefilters on separator first bytes plus the newline bytes,
/// verifies full separator patterns at each candidate, and steps past
/// candidates that fail verification. Separator match takes precedence over
/// newline classification at the same position.
pub fn find_next_delimiter(haystack: &[u8], config: &Config) -> Option<Delimiter> {
    if config.is_single_byte_sep() {
        let sep = config.separator_byte();
        let i = find_any_of_three(haystack, sep, b'\n', b'\r')?;
        return Some(if haystack[i] == sep {
            Delimiter {
                pos: i,
                kind: DelimiterKind::Separator,
                len: 1,
            }
        } else {
            Delimiter {
                pos: i,
                kind: DelimiterKind::Newline,
                len: newline_len(haystack, i),
            }
        });
    }

    let first = config.separator_first_bytes();
    let mut targets = [0u8; MAX_SEPARATORS + 2];
    targets[..first.len()].copy_from_slice(first);
    targets[first.len()] = b'\n';
    targets[first.len() + 1] = b'\r';
    let targets = &targets[..first.len() + 2];

    let mut from = 0;
    while let Some(rel) = find_any_of(&haystack[from..], targets) {
        let i = from + rel;
        if let Some(len) = config.match_separator_at(haystack, i) {
            return Some(Delimiter {
                pos: i,
                kind: DelimiterKind::Separator,
                len,
            });
        }
        if haystack[i] == b'\n' || haystack[i] == b'\r' {
            return Some(Delimiter {
                pos: i,
                kind: DelimiterKind::Newline,
                len: newline_len(haystack, i),
            });
        }
        // A first-byte candidate that did not complete a separator.
        from = i + 1;
    }
    None
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::config::Config;

    #[test]
    fn test_find_byte_short_input() {
        assert_eq!(find_byte(b"hello world", b'o'), Some(4));
        assert_eq!(find_byte(b"hello", b'z'), None);
        assert_eq!(find_byte(b"", b'a'), None);
    }

    #[test]
    fn test_find_byte_across_chunk_boundaries() {
        // Target in the scalar tail after full SIMD chunks.
        let mut input = vec![b'x'; 70];
        input[67] = b'y';
        assert_eq!(find_byte(&input, b'y'), Some(67));

        // Target inside the first 16-byte chunk.
        let mut input = vec![b'x'; 70];
        input[3] = b'y';
        assert_eq!(find_byte(&input, b'y'), Some(3));

        // Target at byte 33 (second wide chunk / third 16-byte chunk).
        let mut input = vec![b'x'; 70];
        input[33] = b'y';
        assert_eq!(find_byte(&input, b'y'), Some(33));
    }

    #[test]
    fn test_find_byte_returns_first_of_many() {
        let mut input = vec![b'x'; 100];
        input[40] = b'y';
        input[41] = b'y';
        input[80] = b'y';
        assert_eq!(find_byte(&input, b'y'), Some(40));
    }

    #[test]
    fn test_find_any_of_three_lowest_wins() {
        let input = b"abc\ndef,ghi";
        assert_eq!(find_any_of_three(input, b',', b'\n', b'\r'), Some(3));
        assert_eq!(find_any_of_three(b"plain text", b',', b'\n', b'\r'), None);
    }

    #[test]
    fn test_find_any_of_three_long_input() {
        let mut input = vec![b'x'; 50];
        input[35] = b'\r';
        input[45] = b',';
        assert_eq!(find_any_of_three(&input, b',', b'\n', b'\r'), Some(35));
    }

    #[test]
    fn test_count_byte() {
        assert_eq!(count_byte(b"a,b,c", b','), 2);
        assert_eq!(count_byte(b"", b','), 0);

        let mut input = Vec::new();
        for _ in 0..100 {
            input.extend_from_slice(b"aaa,bbb\n");
        }
        assert_eq!(count_byte(&input, b','), 100);
        assert_eq!(count_byte(&input, b'\n'), 100);
        assert_eq!(count_byte(&input, b'z'), 0);
    }

    #[test]
    fn test_find_pattern() {
        assert_eq!(find_pattern(b"a::b", b"::"), Some(1));
        assert_eq!(find_pattern(b"aab", b"ab"), Some(1));
        assert_eq!(find_pattern(b"$$$", b"$$"), Some(0));
        assert_eq!(find_pattern(b"x$y$$z", b"$$"), Some(3));
        assert_eq!(find_pattern(b"abc", b"cd"), None);
        assert_eq!(find_pattern(b"ab", b"abc"), None);
        assert_eq!(find_pattern(b"", b"a"), None);
    }

    #[test]
    fn test_find_pattern_candidate_rejection_over_chunks() {
        // Lone '$' candidates sprinkled before the real "$$" occurrence.
        let mut input = vec![b'x'; 64];
        input[5] = b'$';
        input[20] = b'$';
        input[40] = b'$';
        input[41] = b'$';
        assert_eq!(find_pattern(&input, b"$$"), Some(40));
    }

    #[test]
    fn test_delimiter_fast_path() {
        let config = Config::default();
        assert_eq!(
            find_next_delimiter(b"abc,def", &config),
            Some(Delimiter {
                pos: 3,
                kind: DelimiterKind::Separator,
                len: 1
            })
        );
        assert_eq!(
            find_next_delimiter(b"ab\r\ncd", &config),
            Some(Delimiter {
                pos: 2,
                kind: DelimiterKind::Newline,
                len: 2
            })
        );
        // Lone \r is a newline of length 1.
        assert_eq!(
            find_next_delimiter(b"ab\rcd", &config),
            Some(Delimiter {
                pos: 2,
                kind: DelimiterKind::Newline,
                len: 1
            })
        );
        assert_eq!(find_next_delimiter(b"abc", &config), None);
        assert_eq!(find_next_delimiter(b"", &config), None);
    }

    #[test]
    fn test_delimiter_general_path_multi_byte() {
        let config = Config::new(vec![b"||".to_vec()], b"\"".to_vec()).unwrap();
        assert_eq!(
            find_next_delimiter(b"a||b", &config),
            Some(Delimiter {
                pos: 1,
                kind: DelimiterKind::Separator,
                len: 2
            })
        );
        // A lone '|' candidate is stepped past.
        assert_eq!(
            find_next_delimiter(b"a|b||c", &config),
            Some(Delimiter {
                pos: 3,
                kind: DelimiterKind::Separator,
                len: 2
            })
        );
        // A lone '|' then a newline: the newline wins.
        assert_eq!(
            find_next_delimiter(b"a|b\nc", &config),
            Some(Delimiter {
                pos: 3,
                kind: DelimiterKind::Newline,
                len: 1
            })
        );
    }

    #[test]
    fn test_delimiter_general_path_multiple_patterns() {
        let config = Config::new(vec![b",".to_vec(), b"|".to_vec()], b"\"".to_vec()).unwrap();
        assert_eq!(
            find_next_delimiter(b"a|b,c", &config),
            Some(Delimiter {
                pos: 1,
                kind: DelimiterKind::Separator,
                len: 1
            })
        );
    }

    #[test]
    fn test_delimiter_shared_prefix_order() {
        // ",," listed before ",": the longer pattern matches at a ",," site.
        let config = Config::new(vec![b",,".to_vec(), b",".to_vec()], b"\"".to_vec()).unwrap();
        assert_eq!(
            find_next_delimiter(b"a,,b", &config),
            Some(Delimiter {
                pos: 1,
                kind: DelimiterKind::Separator,
                len: 2
            })
        );
    }

    #[test]
    fn test_delimiter_crlf_split_over_chunk_sizes() {
        // \r at byte 15, \n at byte 16: the pair straddles a 16-byte chunk.
        let mut input = vec![b'x'; 15];
        input.push(b'\r');
        input.push(b'\n');
        input.extend_from_slice(b"y");
        assert_eq!(
            find_next_delimiter(&input, &Config::default()),
            Some(Delimiter {
                pos: 15,
                kind: DelimiterKind::Newline,
                len: 2
            })
        );
    }
}
