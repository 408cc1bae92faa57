// Owned (copying) strategy
//
// Materializes every field into caller-owned bytes: escaped interiors are
// decoded, everything else is copied as-is. Rows flow through the
// RowCollector, so an allocation failure degrades to a partial result
// instead of aborting.

use crate::core::collector::{Row, RowCollector};
use crate::core::config::Config;
use crate::core::unescape::unescape_into;
use crate::engine::{parse, Emitter, ParseErrorKind};

/// Result of a parse that runs to end of input even after a structural
/// error: the rows recovered, plus the first error observed.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct Parsed {
    pub rows: Vec<Row>,
    pub error: Option<ParseErrorKind>,
}

impl Parsed {
    /// True when a structural error made this a partial result.
    pub fn is_partial(&self) -> bool {
        self.error.is_some()
    }

    /// Complete rows, or the error paired with the rows recovered so far.
    pub fn into_result(self) -> Result<Vec<Row>, (ParseErrorKind, Vec<Row>)> {
        match self.error {
            None => Ok(self.rows),
            Some(e) => Err((e, self.rows)),
        }
    }
}

/// Copying emitter shared by the owned, chunked, parallel, and streaming
/// strategies.
pub(crate) struct OwnedEmitter {
    rows: RowCollector,
    current: Row,
    error: Option<ParseErrorKind>,
    unterminated_row: bool,
}

impl OwnedEmitter {
    pub(crate) fn new() -> Self {
        OwnedEmitter {
            rows: RowCollector::new(),
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

    /// Drop the row currently being built. The streaming body uses this for
    /// bare-newline rows.
    pub(crate) fn discard_current_row(&mut self) {
        self.current.clear();
        self.unterminated_row = false;
    }
}

impl<'a> Emitter<'a> for OwnedEmitter {
    type Output = Parsed;

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
            // Decoded length never exceeds the raw length.
            let mut out = Vec::with_capacity(raw.len());
            unescape_into(raw, config.escape(), &mut out);
            out
        } else {
            raw.to_vec()
        };
        self.current.push(value);
    }

    fn on_row_end(&mut self, _pos: usize, _terminated: bool) {
        let row = std::mem::take(&mut self.current);
        if self.unterminated_row {
            // The trailing open-quoted row is not a complete row; the error
            // reason is already recorded.
            self.unterminated_row = false;
            return;
        }
        if !self.rows.push(row) {
            self.on_oom();
        }
    }

    fn finish(self) -> Parsed {
        Parsed {
            rows: self.rows.finish(),
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

    fn on_oom(&mut self) {
        self.record(ParseErrorKind::OutOfMemory);
    }
}

/// Parse `input` into owned rows.
pub fn parse_owned(input: &[u8], config: &Config) -> Parsed {
    parse(input, config, OwnedEmitter::new())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn rows(input: &[u8]) -> Vec<Vec<Vec<u8>>> {
        let parsed = parse_owned(input, &Config::default());
        assert_eq!(parsed.error, None);
        parsed.rows
    }

    fn strs(rows: &[Vec<Vec<u8>>]) -> Vec<Vec<String>> {
        rows.iter()
            .map(|row| {
                row.iter()
                    .map(|f| String::from_utf8_lossy(f).to_string())
                    .collect()
            })
            .collect()
    }

    #[test]
    fn test_two_rows() {
        assert_eq!(
            strs(&rows(b"a,b,c\n1,2,3\n")),
            vec![vec!["a", "b", "c"], vec!["1", "2", "3"]]
        );
    }

    #[test]
    fn test_quoted_and_doubled() {
        assert_eq!(
            strs(&rows(b"\"hello, world\",\"he said \"\"hi\"\"\"\n")),
            vec![vec!["hello, world", "he said \"hi\""]]
        );
    }

    #[test]
    fn test_empty_rows_kept() {
        assert_eq!(strs(&rows(b"a\n\nb\n")), vec![vec!["a"], vec![""], vec!["b"]]);
    }

    #[test]
    fn test_quoted_empty_field() {
        assert_eq!(strs(&rows(b"\"\"\n")), vec![vec![""]]);
    }

    #[test]
    fn test_ragged_rows() {
        assert_eq!(
            strs(&rows(b"a,b,c\nd\ne,f\n")),
            vec![vec!["a", "b", "c"], vec!["d"], vec!["e", "f"]]
        );
    }

    #[test]
    fn test_lone_cr_is_row_terminator() {
        assert_eq!(strs(&rows(b"a\rb\n")), vec![vec!["a"], vec!["b"]]);
    }

    #[test]
    fn test_unterminated_quote_partial() {
        let parsed = parse_owned(b"\"unterminated,x\n", &Config::default());
        assert_eq!(parsed.error, Some(ParseErrorKind::UnterminatedEscape));
        assert_eq!(parsed.rows, Vec::<Vec<Vec<u8>>>::new());
    }

    #[test]
    fn test_unterminated_quote_keeps_prior_rows() {
        let parsed = parse_owned(b"a,b\n\"open", &Config::default());
        assert_eq!(parsed.error, Some(ParseErrorKind::UnterminatedEscape));
        assert_eq!(parsed.rows, vec![vec![b"a".to_vec(), b"b".to_vec()]]);
    }

    #[test]
    fn test_mid_field_escape_partial_keeps_rows() {
        let parsed = parse_owned(b"a\"b,c\n", &Config::default());
        assert_eq!(parsed.error, Some(ParseErrorKind::UnexpectedEscape(1)));
        assert_eq!(parsed.rows, vec![vec![b"a\"b".to_vec(), b"c".to_vec()]]);
        assert!(parsed.is_partial());
    }

    #[test]
    fn test_into_result() {
        let ok = parse_owned(b"a\n", &Config::default()).into_result();
        assert_eq!(ok, Ok(vec![vec![b"a".to_vec()]]));

        let err = parse_owned(b"\"x", &Config::default()).into_result();
        assert_eq!(err, Err((ParseErrorKind::UnterminatedEscape, vec![])));
    }

    #[test]
    fn test_multi_separator_config() {
        let config = Config::new(vec![b",".to_vec(), b"|".to_vec()], b"\"".to_vec()).unwrap();
        let parsed = parse_owned(b"a,b|c\n", &config);
        assert_eq!(parsed.error, None);
        assert_eq!(
            parsed.rows,
            vec![vec![b"a".to_vec(), b"b".to_vec(), b"c".to_vec()]]
        );
    }
}
