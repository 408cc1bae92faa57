// The shared parse engine
//
// One generic driver walks the input in field/row units and hands every field
// and row boundary to an Emitter. The output strategies differ only in their
// Emitter; the (start, end, needs_unescape) sequence a parse produces depends
// solely on the input and the config, never on the Emitter.
//
// The engine never aborts mid-stream. Structural problems (unterminated
// quote, escape inside an unquoted field) are reported through the Emitter's
// hooks and the parse runs to end of input, so callers always get the rows
// that could be recovered.

use thiserror::Error;

use crate::core::config::Config;
use crate::core::scanner;

/// Structural errors observed during a parse, surfaced by the strategy
/// finishers as a partial result.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
pub enum ParseErrorKind {
    /// End of input reached inside a quoted field.
    #[error("quoted field not closed before end of input")]
    UnterminatedEscape,
    /// Escape pattern found inside an unquoted field, with its byte offset.
    #[error("escape sequence inside an unquoted field at byte {0}")]
    UnexpectedEscape(usize),
    /// Row storage could not grow; rows collected before the failure are kept.
    #[error("row storage allocation failed")]
    OutOfMemory,
}

/// Sink for engine events, in input order.
///
/// Guarantees: every `on_field` of a row precedes that row's `on_row_end`,
/// and field ranges satisfy `start <= end <= input.len()`.
pub trait Emitter<'a> {
    type Output;

    /// One field. `start..end` is the raw content range; quoted interiors
    /// exclude the enclosing escape patterns. `needs_unescape` is true when
    /// the range contains doubled escape sequences.
    fn on_field(
        &mut self,
        input: &'a [u8],
        start: usize,
        end: usize,
        needs_unescape: bool,
        config: &Config,
    );

    /// End of a row. `pos` is the offset just past the row terminator, or
    /// `input.len()`; `terminated` is false only when the input ended without
    /// a trailing newline.
    fn on_row_end(&mut self, pos: usize, terminated: bool);

    /// End of input; produces the strategy's result.
    fn finish(self) -> Self::Output;

    /// End of input was reached inside a quoted field.
    fn on_unterminated_quote(&mut self) {}

    /// The escape pattern appeared inside an unquoted field at `byte_pos`.
    fn on_mid_field_escape(&mut self, _byte_pos: usize) {}

    /// Downstream row storage could not grow.
    fn on_oom(&mut self) {}
}

/// Next escape occurrence at or after `pos`, as an absolute offset.
#[inline]
fn find_escape_from(input: &[u8], pos: usize, config: &Config) -> Option<usize> {
    let found = if config.is_single_byte_esc() {
        scanner::find_byte(&input[pos..], config.escape_byte())
    } else {
        scanner::find_pattern(&input[pos..], config.escape())
    };
    found.map(|i| pos + i)
}

/// First escape occurrence inside an unquoted span, as an absolute offset.
#[inline]
fn find_escape_in_span(input: &[u8], start: usize, end: usize, config: &Config) -> Option<usize> {
    let span = &input[start..end];
    let found = if config.is_single_byte_esc() {
        scanner::find_byte(span, config.escape_byte())
    } else {
        scanner::find_pattern(span, config.escape())
    };
    found.map(|i| start + i)
}

/// Run the engine over `input`, feeding `emitter`, and return its result.
///
/// Empty input produces no fields and no rows. A trailing unquoted newline
/// terminates the last row without starting an empty one. A lone `\r` counts
/// as a row terminator, as does `\r\n` (one terminator) and `\n`.
pub fn parse<'a, E: Emitter<'a>>(input: &'a [u8], config: &Config, mut emitter: E) -> E::Output {
    if input.is_empty() {
        return emitter.finish();
    }

    let k = config.escape_len();
    let mut pos = 0usize;

    loop {
        // One row: fields until an unquoted newline or end of input.
        let terminated = loop {
            if config.match_escape_at(input, pos).is_some() {
                // Quoted field.
                pos += k;
                let content_start = pos;
                let mut needs_unescape = false;
                let content_end = loop {
                    match find_escape_from(input, pos, config) {
                        None => {
                            // No closing escape before EOF; the open content
                            // runs to the end of the input.
                            emitter.on_unterminated_quote();
                            pos = input.len();
                            break pos;
                        }
                        Some(at) if config.match_escape_at(input, at + k).is_some() => {
                            // Doubled escape: a literal occurrence, still quoted.
                            needs_unescape = true;
                            pos = at + 2 * k;
                        }
                        Some(at) => {
                            pos = at + k;
                            break at;
                        }
                    }
                };
                emitter.on_field(input, content_start, content_end, needs_unescape, config);
            } else {
                // Unquoted field: runs to the next separator or newline.
                let start = pos;
                let end = match scanner::find_next_delimiter(&input[pos..], config) {
                    Some(d) => pos + d.pos,
                    None => input.len(),
                };
                if let Some(at) = find_escape_in_span(input, start, end, config) {
                    emitter.on_mid_field_escape(at);
                }
                emitter.on_field(input, start, end, false, config);
                pos = end;
            }

            // Row boundary arbitration: a separator continues the row, an
            // unquoted newline (or EOF) ends it.
            if pos >= input.len() {
                break false;
            }
            if let Some(sep_len) = config.match_separator_at(input, pos) {
                pos += sep_len;
                continue;
            }
            match input[pos] {
                b'\n' => {
                    pos += 1;
                    break true;
                }
                b'\r' => {
                    pos += 1;
                    if input.get(pos) == Some(&b'\n') {
                        pos += 1;
                    }
                    break true;
                }
                // Stray bytes after a closing escape: the next field starts
                // right here.
                _ => continue,
            }
        };

        emitter.on_row_end(pos, terminated);
        if pos >= input.len() {
            break;
        }
    }

    emitter.finish()
}
