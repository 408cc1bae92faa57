// Chunk-with-offset strategy
//
// Owned rows plus the byte offset just past the terminator of the last
// newline-terminated row. Chunk re-framers feed a buffer, take the complete
// rows, and resume from that offset.

use crate::core::collector::Row;
use crate::core::config::Config;
use crate::engine::{parse, Emitter, ParseErrorKind};
use crate::strategy::owned::OwnedEmitter;

/// Owned rows plus the last complete-row offset.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct ChunkParsed {
    pub rows: Vec<Row>,
    pub error: Option<ParseErrorKind>,
    /// Offset just past the terminator of the last newline-terminated row;
    /// 0 when no row terminator was seen.
    pub last_row_end: usize,
}

struct ChunkEmitter {
    inner: OwnedEmitter,
    last_row_end: usize,
}

impl ChunkEmitter {
    fn new() -> Self {
        ChunkEmitter {
            inner: OwnedEmitter::new(),
            last_row_end: 0,
        }
    }
}

impl<'a> Emitter<'a> for ChunkEmitter {
    type Output = ChunkParsed;

    fn on_field(
        &mut self,
        input: &'a [u8],
        start: usize,
        end: usize,
        needs_unescape: bool,
        config: &Config,
    ) {
        self.inner.on_field(input, start, end, needs_unescape, config);
    }

    fn on_row_end(&mut self, pos: usize, terminated: bool) {
        if terminated {
            self.last_row_end = pos;
        }
        self.inner.on_row_end(pos, terminated);
    }

    fn finish(self) -> ChunkParsed {
        let parsed = self.inner.finish();
        ChunkParsed {
            rows: parsed.rows,
            error: parsed.error,
            last_row_end: self.last_row_end,
        }
    }

    fn on_unterminated_quote(&mut self) {
        self.inner.on_unterminated_quote();
    }

    fn on_mid_field_escape(&mut self, byte_pos: usize) {
        self.inner.on_mid_field_escape(byte_pos);
    }

    fn on_oom(&mut self) {
        self.inner.on_oom();
    }
}

/// Parse `input` into owned rows, also reporting where the last complete
/// row ended.
pub fn parse_chunk(input: &[u8], config: &Config) -> ChunkParsed {
    parse(input, config, ChunkEmitter::new())
}
