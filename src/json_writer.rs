//! JSON text writer.

use core::fmt::Write as _;

use arrayvec::ArrayString;

use crate::error::WriteError;
use crate::limits::WriteOptions;
use crate::reader::WireFormat;
use crate::scalar::NumberValue;
use crate::writer::{Output, Writer};

/// Largest number of fractional digits honored for fixed-precision floats.
const MAX_DECIMALS: u8 = 17;

/// Writer producing compact JSON text.
#[derive(Debug)]
pub struct JsonWriter<O: Output> {
    out: O,
    escape_solidus: bool,
    pending_separator: bool,
}

/// Container state; JSON needs nothing beyond the closing byte.
#[derive(Debug)]
pub struct JsonFrame {
    close: u8,
}

impl<O: Output> JsonWriter<O> {
    /// Writer with default options.
    pub fn new(out: O) -> Self {
        Self::with_options(out, &WriteOptions::new())
    }

    /// Writer honoring `options.escape_solidus`.
    pub fn with_options(out: O, options: &WriteOptions) -> Self {
        Self {
            out,
            escape_solidus: options.escape_solidus,
            pending_separator: false,
        }
    }

    /// Borrow the output.
    pub fn output(&self) -> &O {
        &self.out
    }

    /// Recover the output.
    pub fn into_output(self) -> O {
        self.out
    }

    fn begin_value(&mut self) -> Result<(), WriteError> {
        if self.pending_separator {
            self.pending_separator = false;
            self.out.write_u8(b',')?;
        }
        Ok(())
    }

    fn write_escaped(&mut self, value: &str) -> Result<(), WriteError> {
        const HEX: &[u8; 16] = b"0123456789abcdef";
        let bytes = value.as_bytes();
        let mut run = 0;
        for (i, &b) in bytes.iter().enumerate() {
            let escape: &[u8] = match b {
                b'"' => b"\\\"",
                b'\\' => b"\\\\",
                b'/' if self.escape_solidus => b"\\/",
                b'\n' => b"\\n",
                b'\r' => b"\\r",
                b'\t' => b"\\t",
                0x08 => b"\\b",
                0x0c => b"\\f",
                0x00..=0x1f => &[],
                _ => continue,
            };
            self.out.write(&bytes[run..i])?;
            run = i + 1;
            if escape.is_empty() {
                let hex = [
                    b'\\',
                    b'u',
                    b'0',
                    b'0',
                    HEX[usize::from(b >> 4)],
                    HEX[usize::from(b & 0xf)],
                ];
                self.out.write(&hex)?;
            } else {
                self.out.write(escape)?;
            }
        }
        self.out.write(&bytes[run..])
    }

    #[allow(clippy::cast_possible_truncation)]
    fn write_float(&mut self, value: f64, single: bool, decimals: Option<u8>) -> Result<(), WriteError> {
        if !value.is_finite() {
            return Err(WriteError::NonFiniteFloat);
        }
        let mut text = ArrayString::<384>::new();
        let magnitude = value.abs();
        let exponential = magnitude != 0.0 && !(1e-6..1e21).contains(&magnitude);
        let formatted = match (exponential, decimals) {
            (true, _) if single => write!(text, "{:e}", value as f32),
            (true, _) => write!(text, "{value:e}"),
            (false, Some(d)) => {
                let d = usize::from(d.min(MAX_DECIMALS));
                write!(text, "{value:.d$}").map(|()| trim_fraction(&mut text))
            }
            (false, None) if single => write!(text, "{}", value as f32),
            (false, None) => write!(text, "{value}"),
        };
        formatted.map_err(|_| WriteError::BufferFull)?;
        self.out.write(text.as_bytes())
    }
}

/// Drops trailing zeros (and a bare `.`) from a fixed-precision rendering.
fn trim_fraction(text: &mut ArrayString<384>) {
    if !text.contains('.') {
        return;
    }
    let kept = text.trim_end_matches('0').trim_end_matches('.').len();
    text.truncate(kept);
    if text.as_str() == "-0" {
        text.clear();
        text.push('0');
    }
}

impl<O: Output> Writer for JsonWriter<O> {
    const FORMAT: WireFormat = WireFormat::Json;
    type Frame = JsonFrame;

    fn position(&self) -> usize {
        self.out.position()
    }

    fn write_null(&mut self) -> Result<(), WriteError> {
        self.begin_value()?;
        self.out.write(b"null")
    }

    fn write_bool(&mut self, value: bool) -> Result<(), WriteError> {
        self.begin_value()?;
        self.out.write(if value { b"true" } else { b"false" })
    }

    fn write_number(&mut self, value: NumberValue, decimals: Option<u8>) -> Result<(), WriteError> {
        self.begin_value()?;
        let mut text = ArrayString::<24>::new();
        match value {
            NumberValue::Unsigned(v) => write!(text, "{v}").map_err(|_| WriteError::BufferFull)?,
            NumberValue::Signed(v) => write!(text, "{v}").map_err(|_| WriteError::BufferFull)?,
            NumberValue::F32(v) => return self.write_float(f64::from(v), true, decimals),
            NumberValue::F64(v) => return self.write_float(v, false, decimals),
        }
        self.out.write(text.as_bytes())
    }

    fn write_string(&mut self, value: &str) -> Result<(), WriteError> {
        self.begin_value()?;
        self.out.write_u8(b'"')?;
        self.write_escaped(value)?;
        self.out.write_u8(b'"')
    }

    fn write_array_begin(&mut self, _len: Option<usize>) -> Result<Self::Frame, WriteError> {
        self.begin_value()?;
        self.out.write_u8(b'[')?;
        Ok(JsonFrame { close: b']' })
    }

    fn write_array_end(&mut self, frame: Self::Frame) -> Result<(), WriteError> {
        self.pending_separator = false;
        self.out.write_u8(frame.close)
    }

    fn write_map_begin(&mut self, _len: Option<usize>) -> Result<Self::Frame, WriteError> {
        self.begin_value()?;
        self.out.write_u8(b'{')?;
        Ok(JsonFrame { close: b'}' })
    }

    fn write_map_end(&mut self, frame: Self::Frame) -> Result<(), WriteError> {
        self.pending_separator = false;
        self.out.write_u8(frame.close)
    }

    fn advance_after_value(&mut self, _frame: &mut Self::Frame) -> Result<(), WriteError> {
        self.pending_separator = true;
        Ok(())
    }

    fn write_key_as_index(&mut self, key: u64) -> Result<(), WriteError> {
        self.begin_value()?;
        let mut text = ArrayString::<24>::new();
        write!(text, "\"{key}\"").map_err(|_| WriteError::BufferFull)?;
        self.out.write(text.as_bytes())
    }

    fn move_to_value(&mut self) -> Result<(), WriteError> {
        self.out.write_u8(b':')
    }

    fn write_raw(&mut self, bytes: &[u8]) -> Result<(), WriteError> {
        self.begin_value()?;
        self.out.write(bytes)
    }

    fn finish(&mut self) -> Result<usize, WriteError> {
        Ok(self.out.position())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::writer::SliceOutput;

    fn render(f: impl FnOnce(&mut JsonWriter<SliceOutput<'_>>) -> Result<(), WriteError>) -> String {
        let mut buf = [0u8; 256];
        let mut w = JsonWriter::new(SliceOutput::new(&mut buf));
        f(&mut w).unwrap();
        String::from_utf8(w.output().written().to_vec()).unwrap()
    }

    #[test]
    fn separators_follow_values() {
        let text = render(|w| {
            let mut arr = w.write_array_begin(None)?;
            w.write_number(NumberValue::Unsigned(1), None)?;
            w.advance_after_value(&mut arr)?;
            let mut map = w.write_map_begin(Some(1))?;
            w.write_string("k")?;
            w.move_to_value()?;
            w.write_null()?;
            w.advance_after_value(&mut map)?;
            w.write_map_end(map)?;
            w.advance_after_value(&mut arr)?;
            w.write_bool(false)?;
            w.advance_after_value(&mut arr)?;
            w.write_array_end(arr)
        });
        assert_eq!(text, r#"[1,{"k":null},false]"#);
    }

    #[test]
    fn strings_are_escaped() {
        let text = render(|w| w.write_string("a\"b\\c\n\u{1}/"));
        assert_eq!(text, r#""a\"b\\c\n\u0001/""#);

        let mut buf = [0u8; 16];
        let opts = WriteOptions::new().with_escape_solidus(true);
        let mut w = JsonWriter::with_options(SliceOutput::new(&mut buf), &opts);
        w.write_string("/").unwrap();
        assert_eq!(w.output().written(), br#""\/""#);
    }

    #[test]
    fn float_rendering() {
        assert_eq!(render(|w| w.write_number(NumberValue::F64(0.1), None)), "0.1");
        assert_eq!(render(|w| w.write_number(NumberValue::F64(1e21), None)), "1e21");
        assert_eq!(render(|w| w.write_number(NumberValue::F64(1.26), Some(1))), "1.3");
        assert_eq!(render(|w| w.write_number(NumberValue::F64(2.0), Some(3))), "2");
        assert_eq!(render(|w| w.write_number(NumberValue::F32(0.1), None)), "0.1");
        assert_eq!(render(|w| w.write_number(NumberValue::Signed(-7), None)), "-7");
    }

    #[test]
    fn non_finite_floats_fail() {
        let mut buf = [0u8; 16];
        let mut w = JsonWriter::new(SliceOutput::new(&mut buf));
        assert_eq!(
            w.write_number(NumberValue::F64(f64::NAN), None),
            Err(WriteError::NonFiniteFloat)
        );
    }

    #[test]
    fn full_buffer_is_reported() {
        let mut buf = [0u8; 3];
        let mut w = JsonWriter::new(SliceOutput::new(&mut buf));
        assert_eq!(w.write_string("abcd"), Err(WriteError::BufferFull));
    }
}
