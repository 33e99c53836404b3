//! Human-readable error reports.

use core::fmt;

use crate::error::{Error, ErrorKind};

/// Bytes of input shown on each side of the error offset.
pub const REPORT_WINDOW: usize = 40;

/// An [`Error`] rendered together with the input it refers to.
///
/// The report prints the error message and its path, then up to [`REPORT_WINDOW`] bytes of
/// input on either side of the offset with a caret under the failing position. Text input is
/// shown as text; binary input as hex.
///
/// ```
/// # #[cfg(feature = "alloc")] {
/// let input = br#"{"id": 99}"#;
/// let err = shapewire::parse_json::<bool>(&mut false, input).unwrap_err();
/// let report = err.report(input).to_string();
/// assert!(report.contains("non-boolean value"));
/// # }
/// ```
#[derive(Debug, Clone, Copy)]
pub struct ErrorReport<'a> {
    error: &'a Error,
    input: &'a [u8],
}

impl<'a> ErrorReport<'a> {
    /// Pair `error` with the input (parse) or output (serialize) it was raised on.
    #[must_use]
    pub const fn new(error: &'a Error, input: &'a [u8]) -> Self {
        Self { error, input }
    }

    /// The byte range shown by the report, clamped to the input.
    #[must_use]
    pub fn window(&self) -> (usize, usize) {
        let at = self.error.offset.min(self.input.len());
        let start = at.saturating_sub(REPORT_WINDOW);
        let end = at.saturating_add(REPORT_WINDOW).min(self.input.len());
        (start, end)
    }
}

impl Error {
    /// Render this error against `input`.
    #[must_use]
    pub const fn report<'a>(&'a self, input: &'a [u8]) -> ErrorReport<'a> {
        ErrorReport::new(self, input)
    }
}

fn text_window(input: &[u8], start: usize, end: usize) -> Option<(&str, usize)> {
    let mut start = start;
    let mut end = end;
    // Widen to whole UTF-8 sequences; a cut continuation byte is not an encoding error.
    while start > 0 && input.get(start).is_some_and(|b| b & 0xc0 == 0x80) {
        start -= 1;
    }
    while end < input.len() && input.get(end).is_some_and(|b| b & 0xc0 == 0x80) {
        end += 1;
    }
    let text = core::str::from_utf8(input.get(start..end)?).ok()?;
    if text.chars().any(|c| c.is_control() && c != '\n' && c != '\t' && c != '\r') {
        return None;
    }
    Some((text, start))
}

impl fmt::Display for ErrorReport<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(f, "{}", self.error)?;
        if self.input.is_empty() {
            return Ok(());
        }
        let at = self.error.offset.min(self.input.len());
        let (start, end) = self.window();
        let label = match self.error.kind {
            ErrorKind::Parse => "input",
            ErrorKind::Serialize => "output",
        };

        if let Some((text, start)) = text_window(self.input, start, end) {
            let before = if start > 0 { "..." } else { "" };
            let after = if start + text.len() < self.input.len() { "..." } else { "" };
            write!(f, "  {label}: {before}")?;
            let mut caret = before.len();
            for (i, c) in text.char_indices() {
                match c {
                    '\n' | '\r' | '\t' => f.write_str(" ")?,
                    _ => write!(f, "{c}")?,
                }
                if start + i < at {
                    caret += 1;
                }
            }
            writeln!(f, "{after}")?;
            write!(f, "  {:width$}^", "", width = label.len() + 2 + caret)
        } else {
            write!(f, "  {label} bytes {start}..{end}:")?;
            let mut caret = 0;
            for (i, b) in self.input[start..end].iter().enumerate() {
                if start + i < at {
                    caret += 3;
                }
                write!(f, " {b:02x}")?;
            }
            writeln!(f)?;
            let prefix = label.len() + " bytes ..:".len() + digits(start) + digits(end) + 2;
            write!(f, "  {:width$}^", "", width = prefix + caret + 1)
        }
    }
}

const fn digits(mut n: usize) -> usize {
    let mut d = 1;
    while n >= 10 {
        n /= 10;
        d += 1;
    }
    d
}

#[cfg(all(test, feature = "alloc"))]
mod tests {
    use alloc::string::ToString;

    use super::*;
    use crate::error::ErrorCode;

    #[test]
    fn text_window_points_at_offset() {
        let input = br#"{"a": tru}"#;
        let err = Error::parse(ErrorCode::NonBoolInBool, 6);
        let report = err.report(input).to_string();
        let mut lines = report.lines();
        assert!(lines.next().unwrap().contains("non-boolean"));
        let shown = lines.next().unwrap();
        let caret = lines.next().unwrap();
        assert_eq!(shown, r#"  input: {"a": tru}"#);
        assert_eq!(caret.find('^'), shown.find("tru"));
    }

    #[test]
    fn long_input_is_elided() {
        let mut input = [b' '; 200];
        input[0] = b'[';
        input[199] = b']';
        let err = Error::parse(ErrorCode::NonBoolInBool, 100);
        let report = err.report(&input).to_string();
        assert!(report.contains("input: ..."));
        assert_eq!(err.report(&input).window(), (60, 140));
    }

    #[test]
    fn binary_input_is_hex() {
        let input = [0xa1, 0x61, 0x61, 0x00, 0xff];
        let err = Error::parse(ErrorCode::NonBoolInBool, 3);
        let report = err.report(&input).to_string();
        assert!(report.contains("bytes 0..5: a1 61 61 00 ff"));
    }
}
