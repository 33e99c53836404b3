//! JSON text reader (RFC 8259).

use crate::error::ReadError;
use crate::limits::ParseOptions;
use crate::reader::{Reader, StrChunk, TokenKind, WireFormat};
use crate::scalar::{NumberKind, NumberValue};
use crate::sink::WireSink;
use crate::utf8;
use crate::wire::SmallStack;

/// Reader over a JSON document held in memory.
#[derive(Debug, Clone)]
pub struct JsonReader<'a> {
    data: &'a [u8],
    pos: usize,
    max_skip_depth: usize,
    lenient_leading_zeros: bool,
}

/// Array iteration state.
#[derive(Debug)]
pub struct JsonArrayFrame {
    first: bool,
}

/// Object iteration state.
#[derive(Debug)]
pub struct JsonMapFrame {
    first: bool,
}

struct NumberToken {
    start: usize,
    end: usize,
    negative: bool,
    float: bool,
}

const fn hex_value(b: u8) -> Option<u32> {
    match b {
        b'0'..=b'9' => Some((b - b'0') as u32),
        b'a'..=b'f' => Some((b - b'a' + 10) as u32),
        b'A'..=b'F' => Some((b - b'A' + 10) as u32),
        _ => None,
    }
}

const fn utf8_sequence_len(lead: u8) -> Option<usize> {
    match lead {
        0xC2..=0xDF => Some(2),
        0xE0..=0xEF => Some(3),
        0xF0..=0xF4 => Some(4),
        _ => None,
    }
}

impl<'a> JsonReader<'a> {
    /// Reader with default options.
    #[must_use]
    pub fn new(data: &'a [u8]) -> Self {
        Self::with_options(data, &ParseOptions::new())
    }

    /// Reader honoring `options.max_skip_depth` and `options.lenient_leading_zeros`.
    #[must_use]
    pub const fn with_options(data: &'a [u8], options: &ParseOptions) -> Self {
        Self {
            data,
            pos: 0,
            max_skip_depth: options.max_skip_depth,
            lenient_leading_zeros: options.lenient_leading_zeros,
        }
    }

    fn peek(&self) -> Option<u8> {
        self.data.get(self.pos).copied()
    }

    fn peek_required(&self) -> Result<u8, ReadError> {
        self.peek().ok_or(ReadError::UnexpectedEnd)
    }

    fn skip_ws(&mut self) {
        while let Some(b' ' | b'\t' | b'\n' | b'\r') = self.peek() {
            self.pos += 1;
        }
    }

    fn expect_literal(&mut self, literal: &[u8], err: ReadError) -> Result<(), ReadError> {
        let end = self.pos + literal.len();
        match self.data.get(self.pos..end) {
            Some(s) if s == literal => {
                self.pos = end;
                Ok(())
            }
            Some(_) => Err(err),
            None => Err(ReadError::UnexpectedEnd),
        }
    }

    fn scan_digits(&mut self) -> usize {
        let start = self.pos;
        while let Some(b'0'..=b'9') = self.peek() {
            self.pos += 1;
        }
        self.pos - start
    }

    fn scan_number(&mut self) -> Result<NumberToken, ReadError> {
        let start = self.pos;
        let negative = self.peek() == Some(b'-');
        if negative {
            self.pos += 1;
        }
        let int_start = self.pos;
        let int_digits = self.scan_digits();
        if int_digits == 0 {
            return Err(if self.peek().is_none() {
                ReadError::UnexpectedEnd
            } else {
                ReadError::IllformedNumber
            });
        }
        if int_digits > 1 && self.data[int_start] == b'0' && !self.lenient_leading_zeros {
            return Err(ReadError::IllformedNumber);
        }
        let mut float = false;
        if self.peek() == Some(b'.') {
            self.pos += 1;
            float = true;
            if self.scan_digits() == 0 {
                return Err(ReadError::IllformedNumber);
            }
        }
        if let Some(b'e' | b'E') = self.peek() {
            self.pos += 1;
            float = true;
            if let Some(b'+' | b'-') = self.peek() {
                self.pos += 1;
            }
            if self.scan_digits() == 0 {
                return Err(ReadError::IllformedNumber);
            }
        }
        Ok(NumberToken {
            start,
            end: self.pos,
            negative,
            float,
        })
    }

    fn parse_magnitude(&self, token: &NumberToken) -> Result<u64, ReadError> {
        let digits = &self.data[token.start + usize::from(token.negative)..token.end];
        digits.iter().try_fold(0u64, |acc, &d| {
            acc.checked_mul(10)
                .and_then(|v| v.checked_add(u64::from(d - b'0')))
                .ok_or(ReadError::NumberOutOfRange)
        })
    }

    /// Decodes the escape starting at `at` (a backslash); returns the char and escape length.
    fn decode_escape(&self, at: usize) -> Result<(char, usize), ReadError> {
        let kind = *self.data.get(at + 1).ok_or(ReadError::UnexpectedEnd)?;
        let simple = match kind {
            b'"' => '"',
            b'\\' => '\\',
            b'/' => '/',
            b'b' => '\u{08}',
            b'f' => '\u{0c}',
            b'n' => '\n',
            b'r' => '\r',
            b't' => '\t',
            b'u' => return self.decode_unicode_escape(at),
            _ => return Err(ReadError::IllformedString),
        };
        Ok((simple, 2))
    }

    fn hex4(&self, at: usize) -> Result<u32, ReadError> {
        let digits = self.data.get(at..at + 4).ok_or(ReadError::UnexpectedEnd)?;
        digits.iter().try_fold(0u32, |acc, &b| {
            hex_value(b)
                .map(|v| (acc << 4) | v)
                .ok_or(ReadError::IllformedString)
        })
    }

    fn decode_unicode_escape(&self, at: usize) -> Result<(char, usize), ReadError> {
        let high = self.hex4(at + 2)?;
        if (0xDC00..=0xDFFF).contains(&high) {
            return Err(ReadError::IllformedString);
        }
        if !(0xD800..=0xDBFF).contains(&high) {
            let c = char::from_u32(high).ok_or(ReadError::IllformedString)?;
            return Ok((c, 6));
        }
        match self.data.get(at + 6..at + 8) {
            Some(b"\\u") => {}
            Some(_) => return Err(ReadError::IllformedString),
            None => return Err(ReadError::UnexpectedEnd),
        }
        let low = self.hex4(at + 8)?;
        if !(0xDC00..=0xDFFF).contains(&low) {
            return Err(ReadError::IllformedString);
        }
        let code = 0x10000 + ((high - 0xD800) << 10) + (low - 0xDC00);
        let c = char::from_u32(code).ok_or(ReadError::IllformedString)?;
        Ok((c, 12))
    }

    fn skip_string(&mut self) -> Result<(), ReadError> {
        self.pos += 1;
        loop {
            match self.peek_required()? {
                b'"' => {
                    self.pos += 1;
                    return Ok(());
                }
                b'\\' => {
                    let (_, len) = self.decode_escape(self.pos)?;
                    self.pos += len;
                }
                0x00..=0x1f => return Err(ReadError::IllformedString),
                _ => self.pos += 1,
            }
        }
    }

    fn skip_key_and_colon(&mut self) -> Result<(), ReadError> {
        self.skip_ws();
        if self.peek_required()? != b'"' {
            return Err(ReadError::IllformedObject);
        }
        self.skip_string()?;
        self.read_key_separator()
    }

    fn skip_scalar(&mut self, lead: u8) -> Result<(), ReadError> {
        match lead {
            b'"' => self.skip_string(),
            b't' => self.expect_literal(b"true", ReadError::IllformedBool),
            b'f' => self.expect_literal(b"false", ReadError::IllformedBool),
            b'n' => self.expect_literal(b"null", ReadError::IllformedNull),
            b'-' | b'0'..=b'9' => self.scan_number().map(|_| ()),
            _ => Err(ReadError::UnexpectedSymbol),
        }
    }
}

impl Reader for JsonReader<'_> {
    const FORMAT: WireFormat = WireFormat::Json;
    type ArrayFrame = JsonArrayFrame;
    type MapFrame = JsonMapFrame;

    fn position(&self) -> usize {
        self.pos
    }

    fn input(&self) -> &[u8] {
        self.data
    }

    fn start_value_and_try_read_null(&mut self) -> Result<bool, ReadError> {
        self.skip_ws();
        if self.peek_required()? == b'n' {
            self.expect_literal(b"null", ReadError::IllformedNull)?;
            return Ok(true);
        }
        Ok(false)
    }

    fn peek_kind(&mut self) -> Result<TokenKind, ReadError> {
        Ok(match self.peek_required()? {
            b'"' => TokenKind::String,
            b'[' => TokenKind::Array,
            b'{' => TokenKind::Map,
            b't' | b'f' => TokenKind::Bool,
            b'n' => TokenKind::Null,
            b'-' | b'0'..=b'9' => TokenKind::Number,
            _ => return Err(ReadError::UnexpectedSymbol),
        })
    }

    fn read_bool(&mut self) -> Result<bool, ReadError> {
        if self.peek_required()? == b't' {
            self.expect_literal(b"true", ReadError::IllformedBool)?;
            Ok(true)
        } else {
            self.expect_literal(b"false", ReadError::IllformedBool)?;
            Ok(false)
        }
    }

    fn read_number(&mut self, kind: NumberKind) -> Result<NumberValue, ReadError> {
        let token = self.scan_number()?;
        if kind == NumberKind::Float {
            let text = utf8::validate(&self.data[token.start..token.end])
                .ok_or(ReadError::IllformedNumber)?;
            let v: f64 = text.parse().map_err(|_| ReadError::IllformedNumber)?;
            if !v.is_finite() {
                return Err(ReadError::NumberOutOfRange);
            }
            return Ok(NumberValue::F64(v));
        }
        if token.float {
            return Err(ReadError::FloatInIntegerStorage);
        }
        let magnitude = self.parse_magnitude(&token)?;
        if token.negative {
            0i64.checked_sub_unsigned(magnitude)
                .map(NumberValue::Signed)
                .ok_or(ReadError::NumberOutOfRange)
        } else {
            Ok(NumberValue::Unsigned(magnitude))
        }
    }

    fn read_string_begin(&mut self) -> Result<(), ReadError> {
        self.skip_ws();
        if self.peek_required()? != b'"' {
            return Err(ReadError::UnexpectedSymbol);
        }
        self.pos += 1;
        Ok(())
    }

    fn read_string_chunk<'b>(&mut self, buf: &'b mut [u8]) -> Result<StrChunk<'b>, ReadError> {
        let mut n = 0;
        let mut done = false;
        loop {
            let b = self.peek_required()?;
            match b {
                b'"' => {
                    self.pos += 1;
                    done = true;
                    break;
                }
                b'\\' => {
                    let (c, len) = self.decode_escape(self.pos)?;
                    let width = c.len_utf8();
                    if n + width > buf.len() {
                        break;
                    }
                    c.encode_utf8(&mut buf[n..n + width]);
                    n += width;
                    self.pos += len;
                }
                0x00..=0x1f => return Err(ReadError::IllformedString),
                0x20..=0x7f => {
                    if n == buf.len() {
                        break;
                    }
                    buf[n] = b;
                    n += 1;
                    self.pos += 1;
                }
                _ => {
                    let width = utf8_sequence_len(b).ok_or(ReadError::IllformedString)?;
                    if n + width > buf.len() {
                        break;
                    }
                    let seq = self
                        .data
                        .get(self.pos..self.pos + width)
                        .ok_or(ReadError::UnexpectedEnd)?;
                    buf[n..n + width].copy_from_slice(seq);
                    n += width;
                    self.pos += width;
                }
            }
        }
        let text = utf8::validate(&buf[..n]).ok_or(ReadError::IllformedString)?;
        Ok(StrChunk { text, done })
    }

    fn read_array_begin(&mut self) -> Result<Self::ArrayFrame, ReadError> {
        self.skip_ws();
        if self.peek_required()? != b'[' {
            return Err(ReadError::UnexpectedSymbol);
        }
        self.pos += 1;
        Ok(JsonArrayFrame { first: true })
    }

    fn advance_array(&mut self, frame: &mut Self::ArrayFrame) -> Result<bool, ReadError> {
        self.skip_ws();
        let b = self.peek_required()?;
        if frame.first {
            frame.first = false;
            if b == b']' {
                self.pos += 1;
                return Ok(false);
            }
            return Ok(true);
        }
        match b {
            b',' => {
                self.pos += 1;
                self.skip_ws();
                if self.peek() == Some(b']') {
                    return Err(ReadError::IllformedArray);
                }
                Ok(true)
            }
            b']' => {
                self.pos += 1;
                Ok(false)
            }
            _ => Err(ReadError::IllformedArray),
        }
    }

    fn read_map_begin(&mut self) -> Result<Self::MapFrame, ReadError> {
        self.skip_ws();
        if self.peek_required()? != b'{' {
            return Err(ReadError::UnexpectedSymbol);
        }
        self.pos += 1;
        Ok(JsonMapFrame { first: true })
    }

    fn advance_map(&mut self, frame: &mut Self::MapFrame) -> Result<bool, ReadError> {
        self.skip_ws();
        let b = self.peek_required()?;
        if frame.first {
            frame.first = false;
            if b == b'}' {
                self.pos += 1;
                return Ok(false);
            }
        } else {
            match b {
                b',' => {
                    self.pos += 1;
                    self.skip_ws();
                }
                b'}' => {
                    self.pos += 1;
                    return Ok(false);
                }
                _ => return Err(ReadError::IllformedObject),
            }
        }
        if self.peek_required()? != b'"' {
            return Err(ReadError::IllformedObject);
        }
        Ok(true)
    }

    fn read_key_separator(&mut self) -> Result<(), ReadError> {
        self.skip_ws();
        if self.peek_required()? != b':' {
            return Err(ReadError::IllformedObject);
        }
        self.pos += 1;
        Ok(())
    }

    fn read_key_as_index(&mut self) -> Result<Option<u64>, ReadError> {
        self.read_string_begin()?;
        let mut buf = [0u8; 32];
        let mut value = Some(0u64);
        let mut empty = true;
        loop {
            let chunk = self.read_string_chunk(&mut buf)?;
            for d in chunk.text.bytes() {
                empty = false;
                value = value.and_then(|v| {
                    if d.is_ascii_digit() {
                        v.checked_mul(10)?.checked_add(u64::from(d - b'0'))
                    } else {
                        None
                    }
                });
            }
            if chunk.done {
                break;
            }
        }
        Ok(if empty { None } else { value })
    }

    fn skip_value(&mut self) -> Result<(), ReadError> {
        let mut stack =
            SmallStack::<bool, 16>::new(false, self.max_skip_depth.saturating_sub(1));
        loop {
            self.skip_ws();
            let lead = self.peek_required()?;
            match lead {
                b'{' | b'[' => {
                    let object = lead == b'{';
                    self.pos += 1;
                    self.skip_ws();
                    let close = if object { b'}' } else { b']' };
                    if self.peek() == Some(close) {
                        self.pos += 1;
                    } else {
                        stack.push(object)?;
                        if object {
                            self.skip_key_and_colon()?;
                        }
                        continue;
                    }
                }
                _ => self.skip_scalar(lead)?,
            }

            // A complete value was consumed; close finished containers.
            loop {
                let Some(&mut object) = stack.peek_mut() else {
                    return Ok(());
                };
                self.skip_ws();
                match self.peek_required()? {
                    b',' => {
                        self.pos += 1;
                        if object {
                            self.skip_key_and_colon()?;
                        }
                        break;
                    }
                    b'}' if object => {
                        self.pos += 1;
                        stack.pop();
                    }
                    b']' if !object => {
                        self.pos += 1;
                        stack.pop();
                    }
                    _ if object => return Err(ReadError::IllformedObject),
                    _ => return Err(ReadError::IllformedArray),
                }
            }
        }
    }

    fn capture_to_sink(&mut self, sink: &mut dyn WireSink) -> Result<(), ReadError> {
        self.skip_ws();
        let start = self.pos;
        self.skip_value()?;
        sink.begin(WireFormat::Json);
        if sink.write(&self.data[start..self.pos]) {
            Ok(())
        } else {
            Err(ReadError::SinkOverflow)
        }
    }

    fn finish(&mut self) -> Result<(), ReadError> {
        self.skip_ws();
        if self.pos < self.data.len() {
            return Err(ReadError::ExcessData);
        }
        Ok(())
    }
}
