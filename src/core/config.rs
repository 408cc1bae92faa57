// Separator and escape configuration
//
// Validated once at construction, immutable afterwards. Separator matching is
// first-match-wins in caller order; that is the deterministic tie-break when
// two patterns share a prefix (e.g. "," and ",,").

use thiserror::Error;

/// Maximum number of separator patterns.
pub const MAX_SEPARATORS: usize = 8;

/// Maximum length in bytes of a separator or escape pattern.
pub const MAX_PATTERN_LEN: usize = 16;

/// Rejected configuration input.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
pub enum ConfigError {
    #[error("at least one separator pattern is required")]
    NoSeparators,
    #[error("too many separator patterns: {0} (max {MAX_SEPARATORS})")]
    TooManySeparators(usize),
    #[error("separator pattern length {0} outside 1..={MAX_PATTERN_LEN}")]
    SeparatorLength(usize),
    #[error("escape pattern length {0} outside 1..={MAX_PATTERN_LEN}")]
    EscapeLength(usize),
}

/// Parsed, validated separator/escape configuration.
#[derive(Debug, Clone, PartialEq)]
pub struct Config {
    /// Separator patterns in caller order.
    separators: Vec<Vec<u8>>,
    /// Quote/escape pattern.
    escape: Vec<u8>,
    /// Deduplicated first bytes of all separators, for the SIMD prefilter.
    first_bytes: Vec<u8>,
    single_byte_sep: bool,
    single_byte_esc: bool,
}

impl Config {
    /// Build a configuration from separator patterns and an escape pattern.
    pub fn new(separators: Vec<Vec<u8>>, escape: Vec<u8>) -> Result<Self, ConfigError> {
        if separators.is_empty() {
            return Err(ConfigError::NoSeparators);
        }
        if separators.len() > MAX_SEPARATORS {
            return Err(ConfigError::TooManySeparators(separators.len()));
        }
        for sep in &separators {
            if sep.is_empty() || sep.len() > MAX_PATTERN_LEN {
                return Err(ConfigError::SeparatorLength(sep.len()));
            }
        }
        if escape.is_empty() || escape.len() > MAX_PATTERN_LEN {
            return Err(ConfigError::EscapeLength(escape.len()));
        }

        let mut first_bytes = Vec::with_capacity(separators.len());
        for sep in &separators {
            if !first_bytes.contains(&sep[0]) {
                first_bytes.push(sep[0]);
            }
        }
        let single_byte_sep = separators.len() == 1 && separators[0].len() == 1;
        let single_byte_esc = escape.len() == 1;

        Ok(Config {
            separators,
            escape,
            first_bytes,
            single_byte_sep,
            single_byte_esc,
        })
    }

    /// Decode the length-prefixed separator encoding
    /// `<count:u8><len1:u8><sep1><len2:u8><sep2>...`.
    ///
    /// Returns `None` on any bound violation or truncation; callers fall back
    /// to `Config::default()`.
    pub fn decode_separators(encoded: &[u8]) -> Option<Vec<Vec<u8>>> {
        let (&count, mut rest) = encoded.split_first()?;
        let count = count as usize;
        if count == 0 || count > MAX_SEPARATORS {
            return None;
        }
        let mut patterns = Vec::with_capacity(count);
        for _ in 0..count {
            let (&len, tail) = rest.split_first()?;
            let len = len as usize;
            if len == 0 || len > MAX_PATTERN_LEN || tail.len() < len {
                return None;
            }
            patterns.push(tail[..len].to_vec());
            rest = &tail[len..];
        }
        if !rest.is_empty() {
            return None;
        }
        Some(patterns)
    }

    /// Try each separator in caller order at `pos`; first match wins.
    /// Returns the matched pattern's length.
    #[inline]
    pub fn match_separator_at(&self, input: &[u8], pos: usize) -> Option<usize> {
        for sep in &self.separators {
            if input[pos..].starts_with(sep) {
                return Some(sep.len());
            }
        }
        None
    }

    /// Full-equality check of the escape pattern at `pos`.
    #[inline]
    pub fn match_escape_at(&self, input: &[u8], pos: usize) -> Option<usize> {
        if input[pos..].starts_with(&self.escape) {
            Some(self.escape.len())
        } else {
            None
        }
    }

    /// True when there is exactly one separator and it is one byte long.
    #[inline]
    pub fn is_single_byte_sep(&self) -> bool {
        self.single_byte_sep
    }

    #[inline]
    pub fn is_single_byte_esc(&self) -> bool {
        self.single_byte_esc
    }

    /// The sole separator's byte. Only meaningful with `is_single_byte_sep`.
    #[inline]
    pub fn separator_byte(&self) -> u8 {
        self.separators[0][0]
    }

    /// First byte of the escape pattern.
    #[inline]
    pub fn escape_byte(&self) -> u8 {
        self.escape[0]
    }

    #[inline]
    pub fn escape(&self) -> &[u8] {
        &self.escape
    }

    #[inline]
    pub fn escape_len(&self) -> usize {
        self.escape.len()
    }

    #[inline]
    pub fn separators(&self) -> &[Vec<u8>] {
        &self.separators
    }

    /// Deduplicated first bytes of all separators (at most 8).
    #[inline]
    pub fn separator_first_bytes(&self) -> &[u8] {
        &self.first_bytes
    }
}

impl Default for Config {
    /// Single comma separator, double-quote escape.
    fn default() -> Self {
        Config {
            separators: vec![vec![b',']],
            escape: vec![b'"'],
            first_bytes: vec![b','],
            single_byte_sep: true,
            single_byte_esc: true,
        }
    }
}
