// Parallel strategy
//
// Phase 1 (single-threaded): quote-aware scan for row boundaries.
// Phase 2 (rayon): run the engine over contiguous slabs of complete rows.
//
// Slabs start at row boundaries, so no quoted field spans a slab and rows
// concatenate back in input order. The output matches parse_owned for every
// input, empty rows included.

use rayon::prelude::*;

use crate::core::boundary::for_each_row_cut;
use crate::core::config::Config;
use crate::core::scanner;
use crate::engine::ParseErrorKind;
use crate::strategy::owned::{parse_owned, Parsed};

/// Available parallelism, capped at 8.
pub fn recommended_threads() -> usize {
    std::thread::available_parallelism()
        .map(|p| p.get().min(8))
        .unwrap_or(4)
}

/// Below this many rows per thread the fan-out costs more than it saves.
const MIN_ROWS_PER_THREAD: usize = 256;

/// Parse `input` into owned rows using one engine run per slab of rows.
pub fn parse_parallel(input: &[u8], config: &Config) -> Parsed {
    let threads = recommended_threads();
    // Cheap row estimate; lone-\r terminated rows are rare enough to ignore.
    let estimated_rows = scanner::count_byte(input, b'\n');
    if threads < 2 || estimated_rows < threads * MIN_ROWS_PER_THREAD {
        return parse_owned(input, config);
    }

    let mut cuts = Vec::with_capacity(estimated_rows + 1);
    for_each_row_cut(input, config, |c| cuts.push(c));
    // A cut at EOF adds nothing; the trailing slab always runs to the end.
    if cuts.last() == Some(&input.len()) {
        cuts.pop();
    }
    if cuts.is_empty() {
        return parse_owned(input, config);
    }

    let per_slab = cuts.len().div_ceil(threads);
    let mut slabs: Vec<(usize, usize)> = Vec::with_capacity(threads + 1);
    let mut start = 0usize;
    for chunk in cuts.chunks(per_slab) {
        if let Some(&end) = chunk.last() {
            slabs.push((start, end));
            start = end;
        }
    }
    if start < input.len() {
        slabs.push((start, input.len()));
    }

    let mut outputs: Vec<Parsed> = slabs
        .par_iter()
        .map(|&(start, end)| {
            let mut parsed = parse_owned(&input[start..end], config);
            if let Some(ParseErrorKind::UnexpectedEscape(pos)) = parsed.error {
                parsed.error = Some(ParseErrorKind::UnexpectedEscape(pos + start));
            }
            parsed
        })
        .collect();

    let total: usize = outputs.iter().map(|p| p.rows.len()).sum();
    let mut rows = Vec::with_capacity(total);
    let mut error = None;
    for slab in &mut outputs {
        rows.append(&mut slab.rows);
        if error.is_none() {
            error = slab.error;
        }
    }
    Parsed { rows, error }
}
