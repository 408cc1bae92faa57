// Standalone benchmark for the parse strategies
//
// Run: cargo bench --bench parse_bench
//
// Compares owned, zero-copy, parallel, and streaming parsing across:
//   - Clean data (no quoting)
//   - Mixed data (a quarter of the rows carry quoted fields)
//   - Various sizes (1K, 10K, 100K rows)

use std::time::{Duration, Instant};

use veloxcsv::{parse_borrowed, parse_owned, parse_parallel, Config, StreamingParser};

const STREAM_CHUNK: usize = 64 * 1024;

fn generate(rows: usize, quoted: bool) -> Vec<u8> {
    let mut out = Vec::with_capacity(rows * 32);
    for i in 0..rows {
        if quoted && i % 4 == 0 {
            out.extend_from_slice(
                format!("{},\"field, with sep\",\"say \"\"hi\"\"\"\n", i).as_bytes(),
            );
        } else {
            out.extend_from_slice(
                format!("{},plain-{},tail{}\n", i, i * 7 % 1000, i % 97).as_bytes(),
            );
        }
    }
    out
}

/// Best-of-N wall clock; returns the best duration and the last row count
/// so the work cannot be optimized away.
fn best_of<F: FnMut() -> usize>(mut f: F, runs: usize) -> (Duration, usize) {
    let mut best = Duration::MAX;
    let mut rows = 0;
    for _ in 0..runs {
        let start = Instant::now();
        rows = f();
        let elapsed = start.elapsed();
        if elapsed < best {
            best = elapsed;
        }
    }
    (best, rows)
}

fn mbps(bytes: usize, d: Duration) -> f64 {
    bytes as f64 / (1024.0 * 1024.0) / d.as_secs_f64()
}

fn stream_rows(input: &[u8], config: &Config) -> usize {
    let mut parser = StreamingParser::new(config.clone());
    let mut rows = 0;
    for chunk in input.chunks(STREAM_CHUNK) {
        match parser.feed(chunk) {
            Ok(parsed) => rows += parsed.rows.len(),
            Err(overflow) => {
                eprintln!("{overflow}");
                return rows;
            }
        }
    }
    rows + parser.finalize().rows.len()
}

fn main() {
    let config = Config::default();
    let runs = 5;

    for &(label, rows) in &[("1K", 1_000usize), ("10K", 10_000), ("100K", 100_000)] {
        for &quoted in &[false, true] {
            let input = generate(rows, quoted);
            let kind = if quoted { "mixed" } else { "clean" };
            println!("== {label} rows, {kind} ({} bytes)", input.len());

            let (d, n) = best_of(|| parse_owned(&input, &config).rows.len(), runs);
            println!("  owned      {:>9.1} MB/s  ({n} rows, {d:?})", mbps(input.len(), d));

            let (d, n) = best_of(|| parse_borrowed(&input, &config).rows.len(), runs);
            println!("  zero_copy  {:>9.1} MB/s  ({n} rows, {d:?})", mbps(input.len(), d));

            let (d, n) = best_of(|| parse_parallel(&input, &config).rows.len(), runs);
            println!("  parallel   {:>9.1} MB/s  ({n} rows, {d:?})", mbps(input.len(), d));

            let (d, n) = best_of(|| stream_rows(&input, &config), runs);
            println!("  streaming  {:>9.1} MB/s  ({n} rows, {d:?})", mbps(input.len(), d));

            println!();
        }
    }
}
