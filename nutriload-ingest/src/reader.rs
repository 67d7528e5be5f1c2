//! Line-record reader
//!
//! Accepts both newline-delimited json objects and a json array spread over lines, one element
//! per line. Structural noise is dropped before parsing, malformed lines are reported as
//! [`LineOutcome::Skipped`] and never end the stream.
use futures_util::StreamExt as _;
use nutriload_core::{JsonLine, LineOutcome, LineStream, RecordStream, SkipReason};

const BYTE_ORDER_MARK: char = '\u{feff}';

/// Decodes a single raw line.
///
/// Returns `None` for noise: empty lines and lines that are exactly `[`, `]` or `,`. These are
/// never handed to the json parser.
pub fn decode_line(line_number: usize, raw: &str) -> Option<LineOutcome> {
    let line = raw.trim_start_matches(BYTE_ORDER_MARK).trim();

    if matches!(line, "" | "[" | "]" | ",") {
        return None;
    }

    let line = line.strip_suffix(',').unwrap_or(line).trim_end();

    let outcome = match serde_json::from_str(line) {
        Ok(value) => LineOutcome::Record(JsonLine {
            line: line_number,
            value,
        }),
        Err(err) => {
            tracing::warn!(line = line_number, error = %err, "Skipping malformed json line");
            LineOutcome::Skipped(SkipReason::MalformedJson {
                line: line_number,
                message: err.to_string(),
            })
        }
    };

    Some(outcome)
}

/// Turns a stream of raw lines into a stream of decoded records.
///
/// Line numbers are 1-based and count every raw line, noise included. Errors from the
/// underlying loader are passed through untouched.
pub fn json_records(lines: LineStream) -> RecordStream {
    lines
        .enumerate()
        .filter_map(|(index, line)| async move {
            match line {
                Ok(raw) => decode_line(index + 1, &raw).map(Ok),
                Err(err) => Some(Err(err)),
            }
        })
        .boxed()
        .into()
}
