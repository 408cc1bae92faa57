#![feature(portable_simd)]
// veloxcsv - SIMD-accelerated CSV parsing core
//
// Library safety: no unwrap/expect in production code. Fallible paths use
// match + early return.
#![cfg_attr(not(test), deny(clippy::unwrap_used, clippy::expect_used))]
//
// One engine, five ways to consume it:
// - owned: every field copied into caller-owned bytes
// - zero_copy: fields borrow from the input where no decoding is needed
// - chunked: owned rows plus the last complete-row offset
// - parallel: slab-parallel engine runs via rayon
// - streaming: chunked feeding of unbounded input in bounded memory

pub mod core;
pub mod engine;
pub mod strategy;

pub use crate::core::collector::{Row, RowCollector};
pub use crate::core::config::{Config, ConfigError, MAX_PATTERN_LEN, MAX_SEPARATORS};
pub use crate::core::unescape::{unescape, unescape_into};
pub use crate::engine::{parse, Emitter, ParseErrorKind};
pub use crate::strategy::chunked::{parse_chunk, ChunkParsed};
pub use crate::strategy::owned::{parse_owned, Parsed};
pub use crate::strategy::parallel::{parse_parallel, recommended_threads};
pub use crate::strategy::streaming::{BufferOverflow, StreamingParser, DEFAULT_MAX_BUFFER};
pub use crate::strategy::zero_copy::{parse_borrowed, BorrowedParsed};

// ============================================================================
// Allocator Configuration
// ============================================================================

// When memory_tracking is enabled, wrap the allocator to track usage
#[cfg(feature = "memory_tracking")]
mod tracking {
    use std::alloc::{GlobalAlloc, Layout};
    use std::sync::atomic::{AtomicUsize, Ordering};

    /// Bytes currently allocated.
    pub static IN_USE: AtomicUsize = AtomicUsize::new(0);
    /// High-water mark since the last reset.
    pub static HIGH_WATER: AtomicUsize = AtomicUsize::new(0);

    pub struct CountingAllocator;

    #[cfg(feature = "mimalloc")]
    static INNER: mimalloc::MiMalloc = mimalloc::MiMalloc;

    #[cfg(not(feature = "mimalloc"))]
    static INNER: std::alloc::System = std::alloc::System;

    // Relaxed throughout: the counters are a diagnostic approximation, and
    // fetch_max keeps the high-water mark monotonic without a retry loop.
    unsafe impl GlobalAlloc for CountingAllocator {
        unsafe fn alloc(&self, layout: Layout) -> *mut u8 {
            let block = INNER.alloc(layout);
            if !block.is_null() {
                let now = IN_USE.fetch_add(layout.size(), Ordering::Relaxed) + layout.size();
                HIGH_WATER.fetch_max(now, Ordering::Relaxed);
            }
            block
        }

        unsafe fn dealloc(&self, block: *mut u8, layout: Layout) {
            IN_USE.fetch_sub(layout.size(), Ordering::Relaxed);
            INNER.dealloc(block, layout)
        }
    }
}

#[cfg(feature = "memory_tracking")]
#[global_allocator]
static GLOBAL: tracking::CountingAllocator = tracking::CountingAllocator;

// When memory_tracking is disabled, use mimalloc directly (no overhead)
#[cfg(all(feature = "mimalloc", not(feature = "memory_tracking")))]
#[global_allocator]
static GLOBAL: mimalloc::MiMalloc = mimalloc::MiMalloc;

// ============================================================================
// Memory Tracking (only meaningful with the memory_tracking feature)
// ============================================================================

/// Current heap allocation in bytes (requires memory_tracking feature)
#[cfg(feature = "memory_tracking")]
pub fn current_allocated() -> usize {
    use std::sync::atomic::Ordering;
    tracking::IN_USE.load(Ordering::SeqCst)
}

/// Peak heap allocation since last reset (requires memory_tracking feature)
#[cfg(feature = "memory_tracking")]
pub fn peak_allocated() -> usize {
    use std::sync::atomic::Ordering;
    tracking::HIGH_WATER.load(Ordering::SeqCst)
}

/// Reset memory stats, returning (current, previous_peak)
#[cfg(feature = "memory_tracking")]
pub fn reset_memory_stats() -> (usize, usize) {
    use std::sync::atomic::Ordering;
    let current = tracking::IN_USE.load(Ordering::SeqCst);
    let peak = tracking::HIGH_WATER.swap(current, Ordering::SeqCst);
    (current, peak)
}

/// Stub: returns 0 when memory_tracking is disabled
#[cfg(not(feature = "memory_tracking"))]
pub fn current_allocated() -> usize {
    0
}

/// Stub: returns 0 when memory_tracking is disabled
#[cfg(not(feature = "memory_tracking"))]
pub fn peak_allocated() -> usize {
    0
}

/// Stub: returns (0, 0) when memory_tracking is disabled
#[cfg(not(feature = "memory_tracking"))]
pub fn reset_memory_stats() -> (usize, usize) {
    (0, 0)
}
