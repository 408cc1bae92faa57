// Zero-copy (slicing) strategy
//
// Clean fields borrow straight from the input; only interiors with doubled
// escapes are decoded into owned bytes. The output's lifetime is the input
// buffer's lifetime; callers keep the input alive as long as any field
// borrows from it.

use std::borrow::Cow;

use crate::core::config::Config;
use crate::core::unescape::unescape;
use crate::engine::{parse, Emitter, ParseErrorKind};

/// Rows of maybe-borrowed fields, plus the first structural error.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct BorrowedParsed<'a> {
    pub rows: Vec<Vec<Cow<'a, [u8]>>>,
    pub error: Option<ParseErrorKind>,
}

impl BorrowedParsed<'_> {
    pub fn is_partial(&self) -> bool {
        self.error.is_some()
    }
}

struct SliceEmitter<'a> {
    rows: Vec<Vec<Cow<'a, [u8]>>>,
    current: Vec<Cow<'a, [u8]>>,
    error: Option<ParseErrorKind>,
    unterminated_row: bool,
}

impl<'a> SliceEmitter<'a> {
    fn new() -> Self {
        SliceEmitter {
            rows: Vec::new(),
            current: Vec::new(),
            error: None,
            unterminated_row: false,
        }
    }

    fn record(&mut self, error: ParseErrorKind) {
        if self.error.is_none() {
            self.error = Some(error);
        }
    }
}

impl<'a> Emitter<'a> for SliceEmitter<'a> {
    type Output = BorrowedParsed<'a>;

    fn on_field(
        &mut self,
        input: &'a [u8],
        start: usize,
        end: usize,
        needs_unescape: bool,
        config: &Config,
    ) {
        let raw = &input[start..end];
        let value = if needs_unescape {
            Cow::Owned(unescape(raw, config.escape()))
        } else {
            Cow::Borrowed(raw)
        };
        self.current.push(value);
    }

    fn on_row_end(&mut self, _pos: usize, _terminated: bool) {
        let row = std::mem::take(&mut self.current);
        if self.unterminated_row {
            self.unterminated_row = false;
            return;
        }
        self.rows.push(row);
    }

    fn finish(self) -> BorrowedParsed<'a> {
        BorrowedParsed {
            rows: self.rows,
            error: self.error,
        }
    }

    fn on_unterminated_quote(&mut self) {
        self.record(ParseErrorKind::UnterminatedEscape);
        self.unterminated_row = true;
    }

    fn on_mid_field_escape(&mut self, byte_pos: usize) {
        self.record(ParseErrorKind::UnexpectedEscape(byte_pos));
    }
}

/// Parse `input` into rows that borrow from it wherever no decoding is
/// needed.
pub fn parse_borrowed<'a>(input: &'a [u8], config: &Config) -> BorrowedParsed<'a> {
    parse(input, config, SliceEmitter::new())
}
