//! CBOR (RFC 8949) reader.

use crate::error::ReadError;
use crate::limits::ParseOptions;
use crate::reader::{Reader, StrChunk, TokenKind, WireFormat};
use crate::scalar::{NumberKind, NumberValue};
use crate::sink::WireSink;
use crate::utf8;
use crate::wire::{
    f16_to_f64, len_to_usize, read_argument, read_be_u16, read_be_u32, read_be_u64, read_u8,
    skip_item, AI_INDEFINITE, BREAK, MAJOR_ARRAY, MAJOR_BYTES, MAJOR_MAP, MAJOR_NEGATIVE,
    MAJOR_SIMPLE, MAJOR_TAG, MAJOR_TEXT, MAJOR_UNSIGNED, SIMPLE_FALSE, SIMPLE_NULL, SIMPLE_TRUE,
};

/// Reader over one CBOR data item held in memory.
///
/// Tags are skipped, floats of every width are accepted, and arrays and maps may use either
/// length encoding. Text strings must be definite-length.
#[derive(Debug, Clone)]
pub struct CborReader<'a> {
    data: &'a [u8],
    pos: usize,
    max_skip_depth: usize,
    text_remaining: usize,
}

/// Remaining elements, or `None` for an indefinite-length container.
#[derive(Debug)]
pub struct CborFrame {
    remaining: Option<u64>,
}

impl<'a> CborReader<'a> {
    /// Reader with default options.
    #[must_use]
    pub fn new(data: &'a [u8]) -> Self {
        Self::with_options(data, &ParseOptions::new())
    }

    /// Reader honoring `options.max_skip_depth`.
    #[must_use]
    pub const fn with_options(data: &'a [u8], options: &ParseOptions) -> Self {
        Self {
            data,
            pos: 0,
            max_skip_depth: options.max_skip_depth,
            text_remaining: 0,
        }
    }

    fn peek(&self) -> Result<u8, ReadError> {
        self.data.get(self.pos).copied().ok_or(ReadError::UnexpectedEnd)
    }

    fn skip_tags(&mut self) -> Result<(), ReadError> {
        while self.peek()? >> 5 == MAJOR_TAG {
            let ib = read_u8(self.data, &mut self.pos)?;
            read_argument(self.data, &mut self.pos, ib & 0x1f)?;
        }
        Ok(())
    }

    fn container_begin(&mut self, major: u8) -> Result<CborFrame, ReadError> {
        self.skip_tags()?;
        let ib = read_u8(self.data, &mut self.pos)?;
        if ib >> 5 != major {
            return Err(ReadError::UnexpectedSymbol);
        }
        let ai = ib & 0x1f;
        let remaining = if ai == AI_INDEFINITE {
            None
        } else {
            Some(read_argument(self.data, &mut self.pos, ai)?)
        };
        Ok(CborFrame { remaining })
    }

    fn container_advance(&mut self, frame: &mut CborFrame) -> Result<bool, ReadError> {
        match frame.remaining.as_mut() {
            Some(0) => Ok(false),
            Some(n) => {
                *n -= 1;
                Ok(true)
            }
            None => {
                if self.peek()? == BREAK {
                    self.pos += 1;
                    Ok(false)
                } else {
                    Ok(true)
                }
            }
        }
    }
}

impl Reader for CborReader<'_> {
    const FORMAT: WireFormat = WireFormat::Cbor;
    type ArrayFrame = CborFrame;
    type MapFrame = CborFrame;

    fn position(&self) -> usize {
        self.pos
    }

    fn input(&self) -> &[u8] {
        self.data
    }

    fn start_value_and_try_read_null(&mut self) -> Result<bool, ReadError> {
        self.skip_tags()?;
        if self.peek()? == (MAJOR_SIMPLE << 5) | SIMPLE_NULL {
            self.pos += 1;
            return Ok(true);
        }
        Ok(false)
    }

    fn peek_kind(&mut self) -> Result<TokenKind, ReadError> {
        self.skip_tags()?;
        let ib = self.peek()?;
        Ok(match (ib >> 5, ib & 0x1f) {
            (MAJOR_UNSIGNED | MAJOR_NEGATIVE, _) => TokenKind::Number,
            (MAJOR_BYTES, _) => TokenKind::Other,
            (MAJOR_TEXT, _) => TokenKind::String,
            (MAJOR_ARRAY, _) => TokenKind::Array,
            (MAJOR_MAP, _) => TokenKind::Map,
            (_, SIMPLE_FALSE | SIMPLE_TRUE) => TokenKind::Bool,
            (_, SIMPLE_NULL) => TokenKind::Null,
            (_, 25..=27) => TokenKind::Number,
            (_, AI_INDEFINITE) => return Err(ReadError::UnexpectedSymbol),
            _ => TokenKind::Other,
        })
    }

    fn read_bool(&mut self) -> Result<bool, ReadError> {
        match read_u8(self.data, &mut self.pos)? {
            0xf4 => Ok(false),
            0xf5 => Ok(true),
            _ => Err(ReadError::IllformedBool),
        }
    }

    #[allow(clippy::cast_precision_loss)]
    fn read_number(&mut self, kind: NumberKind) -> Result<NumberValue, ReadError> {
        let float = kind == NumberKind::Float;
        let ib = read_u8(self.data, &mut self.pos)?;
        let ai = ib & 0x1f;
        match ib >> 5 {
            MAJOR_UNSIGNED => {
                let v = read_argument(self.data, &mut self.pos, ai)?;
                Ok(if float {
                    NumberValue::F64(v as f64)
                } else {
                    NumberValue::Unsigned(v)
                })
            }
            MAJOR_NEGATIVE => {
                let n = read_argument(self.data, &mut self.pos, ai)?;
                if float {
                    return Ok(NumberValue::F64(-1.0 - n as f64));
                }
                i64::try_from(n)
                    .map(|n| NumberValue::Signed(-1 - n))
                    .map_err(|_| ReadError::NumberOutOfRange)
            }
            MAJOR_SIMPLE if (25..=27).contains(&ai) => {
                if !float {
                    return Err(ReadError::FloatInIntegerStorage);
                }
                Ok(match ai {
                    25 => NumberValue::F64(f16_to_f64(read_be_u16(self.data, &mut self.pos)?)),
                    26 => NumberValue::F32(f32::from_bits(read_be_u32(self.data, &mut self.pos)?)),
                    _ => NumberValue::F64(f64::from_bits(read_be_u64(self.data, &mut self.pos)?)),
                })
            }
            _ => Err(ReadError::IllformedNumber),
        }
    }

    fn read_string_begin(&mut self) -> Result<(), ReadError> {
        self.skip_tags()?;
        let ib = read_u8(self.data, &mut self.pos)?;
        if ib >> 5 != MAJOR_TEXT {
            return Err(ReadError::UnexpectedSymbol);
        }
        let ai = ib & 0x1f;
        if ai == AI_INDEFINITE {
            return Err(ReadError::UnsupportedItem);
        }
        let len = len_to_usize(read_argument(self.data, &mut self.pos, ai)?)?;
        let end = self.pos.checked_add(len).ok_or(ReadError::UnexpectedEnd)?;
        let bytes = self.data.get(self.pos..end).ok_or(ReadError::UnexpectedEnd)?;
        utf8::validate(bytes).ok_or(ReadError::IllformedString)?;
        self.text_remaining = len;
        Ok(())
    }

    fn read_string_chunk<'b>(&mut self, buf: &'b mut [u8]) -> Result<StrChunk<'b>, ReadError> {
        let rest = &self.data[self.pos..self.pos + self.text_remaining];
        let n = utf8::boundary_at_or_before(rest, buf.len());
        buf[..n].copy_from_slice(&rest[..n]);
        self.pos += n;
        self.text_remaining -= n;
        let text = utf8::validate(&buf[..n]).ok_or(ReadError::IllformedString)?;
        Ok(StrChunk {
            text,
            done: self.text_remaining == 0,
        })
    }

    fn read_array_begin(&mut self) -> Result<Self::ArrayFrame, ReadError> {
        self.container_begin(MAJOR_ARRAY)
    }

    fn advance_array(&mut self, frame: &mut Self::ArrayFrame) -> Result<bool, ReadError> {
        self.container_advance(frame)
    }

    fn read_map_begin(&mut self) -> Result<Self::MapFrame, ReadError> {
        self.container_begin(MAJOR_MAP)
    }

    fn advance_map(&mut self, frame: &mut Self::MapFrame) -> Result<bool, ReadError> {
        self.container_advance(frame)
    }

    fn read_key_separator(&mut self) -> Result<(), ReadError> {
        Ok(())
    }

    fn read_key_as_index(&mut self) -> Result<Option<u64>, ReadError> {
        self.skip_tags()?;
        if self.peek()? >> 5 == MAJOR_UNSIGNED {
            let ib = read_u8(self.data, &mut self.pos)?;
            return read_argument(self.data, &mut self.pos, ib & 0x1f).map(Some);
        }
        self.skip_value()?;
        Ok(None)
    }

    fn skip_value(&mut self) -> Result<(), ReadError> {
        self.pos = skip_item(self.data, self.pos, self.max_skip_depth)?;
        Ok(())
    }

    fn capture_to_sink(&mut self, sink: &mut dyn WireSink) -> Result<(), ReadError> {
        let start = self.pos;
        self.skip_value()?;
        sink.begin(WireFormat::Cbor);
        if sink.write(&self.data[start..self.pos]) {
            Ok(())
        } else {
            Err(ReadError::SinkOverflow)
        }
    }

    fn finish(&mut self) -> Result<(), ReadError> {
        if self.pos < self.data.len() {
            return Err(ReadError::ExcessData);
        }
        Ok(())
    }
}
