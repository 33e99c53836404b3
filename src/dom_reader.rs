//! A [`Reader`] over an already-parsed `serde_json::Value`.
//!
//! The tree is walked in document order. Positions are node counters rather than byte
//! offsets, and [`Reader::input`] is empty.

use serde_json::{map, Number, Value};

use crate::error::ReadError;
use crate::reader::{Reader, StrChunk, TokenKind, WireFormat};
use crate::scalar::{NumberKind, NumberValue};
use crate::sink::WireSink;

#[derive(Debug, Clone, Copy)]
enum Cursor<'a> {
    Value(&'a Value),
    Key(&'a str),
    Consumed,
}

/// Iteration state of a DOM array.
#[derive(Debug, Clone)]
pub struct DomArrayFrame<'a> {
    items: core::slice::Iter<'a, Value>,
}

/// Iteration state of a DOM object.
#[derive(Debug, Clone)]
pub struct DomMapFrame<'a> {
    entries: map::Iter<'a>,
}

/// Reads a `serde_json::Value` through the reader contract.
#[derive(Debug, Clone)]
pub struct DomReader<'a> {
    cursor: Cursor<'a>,
    pending: Option<&'a Value>,
    text: &'a str,
    nodes: usize,
}

impl<'a> DomReader<'a> {
    /// Reader positioned at `root`.
    #[must_use]
    pub const fn new(root: &'a Value) -> Self {
        Self {
            cursor: Cursor::Value(root),
            pending: None,
            text: "",
            nodes: 0,
        }
    }

    fn take_value(&mut self) -> Result<&'a Value, ReadError> {
        match self.cursor {
            Cursor::Value(v) => {
                self.cursor = Cursor::Consumed;
                self.nodes += 1;
                Ok(v)
            }
            Cursor::Key(_) => Err(ReadError::UnexpectedSymbol),
            Cursor::Consumed => Err(ReadError::UnexpectedEnd),
        }
    }

    fn read_integer(n: &Number) -> Result<NumberValue, ReadError> {
        if let Some(u) = n.as_u64() {
            Ok(NumberValue::Unsigned(u))
        } else if let Some(i) = n.as_i64() {
            Ok(NumberValue::Signed(i))
        } else {
            Err(ReadError::FloatInIntegerStorage)
        }
    }
}

impl<'a> Reader for DomReader<'a> {
    const FORMAT: WireFormat = WireFormat::Json;
    type ArrayFrame = DomArrayFrame<'a>;
    type MapFrame = DomMapFrame<'a>;

    fn position(&self) -> usize {
        self.nodes
    }

    fn input(&self) -> &[u8] {
        &[]
    }

    fn start_value_and_try_read_null(&mut self) -> Result<bool, ReadError> {
        match self.cursor {
            Cursor::Value(Value::Null) => {
                self.take_value()?;
                Ok(true)
            }
            Cursor::Value(_) | Cursor::Key(_) => Ok(false),
            Cursor::Consumed => Err(ReadError::UnexpectedEnd),
        }
    }

    fn peek_kind(&mut self) -> Result<TokenKind, ReadError> {
        Ok(match self.cursor {
            Cursor::Value(Value::Null) => TokenKind::Null,
            Cursor::Value(Value::Bool(_)) => TokenKind::Bool,
            Cursor::Value(Value::Number(_)) => TokenKind::Number,
            Cursor::Value(Value::String(_)) | Cursor::Key(_) => TokenKind::String,
            Cursor::Value(Value::Array(_)) => TokenKind::Array,
            Cursor::Value(Value::Object(_)) => TokenKind::Map,
            Cursor::Consumed => return Err(ReadError::UnexpectedEnd),
        })
    }

    fn read_bool(&mut self) -> Result<bool, ReadError> {
        match self.take_value()? {
            Value::Bool(b) => Ok(*b),
            _ => Err(ReadError::IllformedBool),
        }
    }

    fn read_number(&mut self, kind: NumberKind) -> Result<NumberValue, ReadError> {
        let Value::Number(n) = self.take_value()? else {
            return Err(ReadError::IllformedNumber);
        };
        match kind {
            NumberKind::Float => n
                .as_f64()
                .map(NumberValue::F64)
                .ok_or(ReadError::NumberOutOfRange),
            NumberKind::Unsigned | NumberKind::Signed => Self::read_integer(n),
        }
    }

    fn read_string_begin(&mut self) -> Result<(), ReadError> {
        if let Cursor::Key(k) = self.cursor {
            self.cursor = Cursor::Consumed;
            self.text = k;
            return Ok(());
        }
        match self.take_value()? {
            Value::String(s) => {
                self.text = s;
                Ok(())
            }
            _ => Err(ReadError::UnexpectedSymbol),
        }
    }

    fn read_string_chunk<'b>(&mut self, buf: &'b mut [u8]) -> Result<StrChunk<'b>, ReadError> {
        let mut end = self.text.len().min(buf.len());
        while !self.text.is_char_boundary(end) {
            end -= 1;
        }
        let (head, rest) = self.text.split_at(end);
        buf[..end].copy_from_slice(head.as_bytes());
        self.text = rest;
        let text = core::str::from_utf8(&buf[..end]).map_err(|_| ReadError::IllformedString)?;
        Ok(StrChunk {
            text,
            done: rest.is_empty(),
        })
    }

    fn read_array_begin(&mut self) -> Result<Self::ArrayFrame, ReadError> {
        match self.take_value()? {
            Value::Array(items) => Ok(DomArrayFrame {
                items: items.iter(),
            }),
            _ => Err(ReadError::UnexpectedSymbol),
        }
    }

    fn advance_array(&mut self, frame: &mut Self::ArrayFrame) -> Result<bool, ReadError> {
        Ok(frame.items.next().map_or(false, |item| {
            self.cursor = Cursor::Value(item);
            true
        }))
    }

    fn read_map_begin(&mut self) -> Result<Self::MapFrame, ReadError> {
        match self.take_value()? {
            Value::Object(entries) => Ok(DomMapFrame {
                entries: entries.iter(),
            }),
            _ => Err(ReadError::UnexpectedSymbol),
        }
    }

    fn advance_map(&mut self, frame: &mut Self::MapFrame) -> Result<bool, ReadError> {
        Ok(frame.entries.next().map_or(false, |(key, value)| {
            self.cursor = Cursor::Key(key);
            self.pending = Some(value);
            true
        }))
    }

    fn read_key_separator(&mut self) -> Result<(), ReadError> {
        let value = self.pending.take().ok_or(ReadError::IllformedObject)?;
        self.cursor = Cursor::Value(value);
        Ok(())
    }

    fn read_key_as_index(&mut self) -> Result<Option<u64>, ReadError> {
        let Cursor::Key(key) = self.cursor else {
            return Err(ReadError::IllformedObject);
        };
        self.cursor = Cursor::Consumed;
        if key.is_empty() || !key.bytes().all(|b| b.is_ascii_digit()) {
            return Ok(None);
        }
        key.parse().map(Some).map_err(|_| ReadError::NumberOutOfRange)
    }

    fn skip_value(&mut self) -> Result<(), ReadError> {
        self.take_value().map(|_| ())
    }

    fn capture_to_sink(&mut self, sink: &mut dyn WireSink) -> Result<(), ReadError> {
        let value = self.take_value()?;
        let bytes = serde_json::to_vec(value).map_err(|_| ReadError::UnsupportedItem)?;
        sink.begin(WireFormat::Json);
        if sink.write(&bytes) {
            Ok(())
        } else {
            Err(ReadError::SinkOverflow)
        }
    }

    fn finish(&mut self) -> Result<(), ReadError> {
        match self.cursor {
            Cursor::Consumed => Ok(()),
            Cursor::Value(_) | Cursor::Key(_) => Err(ReadError::ExcessData),
        }
    }
}
