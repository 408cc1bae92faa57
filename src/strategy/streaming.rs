// Streaming coordinator
//
// Stateful chunked parsing for unbounded input in bounded memory. Each feed
// appends to a buffer, parses the longest complete-row prefix, and retains
// the suffix for the next feed. At rest the buffer is either empty or the
// continuation of a row not yet terminated by an unquoted newline.

use crate::core::boundary::last_complete_row_boundary;
use crate::core::config::Config;
use crate::engine::{parse, Emitter, ParseErrorKind};
use crate::strategy::owned::{OwnedEmitter, Parsed};

/// Default cap on buffered bytes (256 MB).
pub const DEFAULT_MAX_BUFFER: usize = 256 * 1024 * 1024;

/// Returned when a feed would exceed the buffer cap. Bounds memory when the
/// input contains a quoted field that never closes.
#[derive(Debug, Clone, Copy, PartialEq, Eq, thiserror::Error)]
#[error("streaming buffer limit exceeded")]
pub struct BufferOverflow;

/// Drives the owned emitter over a complete-row prefix, dropping rows that
/// are nothing but their terminator (a bare newline). That skip is what keeps
/// a CRLF pair split across two chunks from producing a phantom empty row.
struct StreamingBodyEmitter {
    inner: OwnedEmitter,
    row_start: usize,
    fields_in_row: usize,
    bytes_in_row: usize,
    first_field_start: usize,
}

impl StreamingBodyEmitter {
    fn new() -> Self {
        StreamingBodyEmitter {
            inner: OwnedEmitter::new(),
            row_start: 0,
            fields_in_row: 0,
            bytes_in_row: 0,
            first_field_start: 0,
        }
    }
}

impl<'a> Emitter<'a> for StreamingBodyEmitter {
    type Output = Parsed;

    fn on_field(
        &mut self,
        input: &'a [u8],
        start: usize,
        end: usize,
        needs_unescape: bool,
        config: &Config,
    ) {
        if self.fields_in_row == 0 {
            self.first_field_start = start;
        }
        self.fields_in_row += 1;
        self.bytes_in_row += end - start;
        self.inner.on_field(input, start, end, needs_unescape, config);
    }

    fn on_row_end(&mut self, pos: usize, terminated: bool) {
        // Blank means a single empty unquoted field: a quoted empty field
        // ("") starts past the row start and is a real row.
        let blank = self.fields_in_row == 1
            && self.bytes_in_row == 0
            && self.first_field_start == self.row_start;
        if blank {
            self.inner.discard_current_row();
        } else {
            self.inner.on_row_end(pos, terminated);
        }
        self.row_start = pos;
        self.fields_in_row = 0;
        self.bytes_in_row = 0;
    }

    fn finish(self) -> Parsed {
        self.inner.finish()
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

/// Stateful streaming parser: feed chunks, take complete rows as they
/// become available, finalize for the remainder.
///
/// One logical owner per parser; concurrent feeds on the same parser are a
/// caller bug (each thread gets its own).
pub struct StreamingParser {
    buffer: Vec<u8>,
    config: Config,
    max_buffer_size: usize,
    /// Bytes already dispatched to the engine; rebases error offsets to the
    /// logical stream.
    consumed: usize,
}

impl StreamingParser {
    pub fn new(config: Config) -> Self {
        Self::with_max_buffer(config, DEFAULT_MAX_BUFFER)
    }

    pub fn with_max_buffer(config: Config, max_buffer_size: usize) -> Self {
        StreamingParser {
            buffer: Vec::new(),
            config,
            max_buffer_size,
            consumed: 0,
        }
    }

    /// Adjust the buffer cap checked on each feed.
    pub fn set_max_buffer_size(&mut self, max: usize) {
        self.max_buffer_size = max;
    }

    /// Append a chunk and parse every complete row it unlocks.
    pub fn feed(&mut self, chunk: &[u8]) -> Result<Parsed, BufferOverflow> {
        if self.buffer.len() + chunk.len() > self.max_buffer_size {
            return Err(BufferOverflow);
        }
        self.buffer.extend_from_slice(chunk);

        let cut = last_complete_row_boundary(&self.buffer, &self.config);
        if cut == 0 {
            return Ok(Parsed::default());
        }

        let mut parsed = parse(&self.buffer[..cut], &self.config, StreamingBodyEmitter::new());
        self.rebase_error(&mut parsed);
        self.buffer.drain(..cut);
        self.consumed += cut;
        Ok(parsed)
    }

    /// Parse whatever remains as the final row(s) and clear the buffer.
    pub fn finalize(&mut self) -> Parsed {
        let mut parsed = parse(&self.buffer, &self.config, StreamingBodyEmitter::new());
        self.rebase_error(&mut parsed);
        self.consumed += self.buffer.len();
        self.buffer.clear();
        parsed
    }

    /// `(buffered_bytes, has_partial_row)`.
    pub fn status(&self) -> (usize, bool) {
        (self.buffer.len(), !self.buffer.is_empty())
    }

    /// Size of the retained suffix (for memory monitoring).
    pub fn buffer_size(&self) -> usize {
        self.buffer.len()
    }

    fn rebase_error(&self, parsed: &mut Parsed) {
        if let Some(ParseErrorKind::UnexpectedEscape(pos)) = parsed.error {
            parsed.error = Some(ParseErrorKind::UnexpectedEscape(pos + self.consumed));
        }
    }
}
