//! CBOR (RFC 8949) writer.
//!
//! Integers and lengths use the shortest argument encoding. Containers of known size are
//! definite-length; containers opened without a length are closed with a break byte.

use crate::error::WriteError;
use crate::reader::WireFormat;
use crate::scalar::NumberValue;
use crate::wire::{
    AI_INDEFINITE, BREAK, MAJOR_ARRAY, MAJOR_MAP, MAJOR_NEGATIVE, MAJOR_SIMPLE, MAJOR_TEXT,
    MAJOR_UNSIGNED, SIMPLE_FALSE, SIMPLE_NULL, SIMPLE_TRUE,
};
use crate::writer::{Output, Writer};

/// Writer producing one CBOR data item.
#[derive(Debug)]
pub struct CborWriter<O: Output> {
    out: O,
}

/// Declared length (if any) and the number of completed elements.
#[derive(Debug)]
pub struct CborFrame {
    declared: Option<u64>,
    count: u64,
}

impl<O: Output> CborWriter<O> {
    /// Writer over `out`.
    pub const fn new(out: O) -> Self {
        Self { out }
    }

    /// Borrow the output.
    pub fn output(&self) -> &O {
        &self.out
    }

    /// Recover the output.
    pub fn into_output(self) -> O {
        self.out
    }

    fn write_major_uint(&mut self, major: u8, value: u64) -> Result<(), WriteError> {
        debug_assert!(major <= 7);
        if let Ok(v8) = u8::try_from(value) {
            if v8 < 24 {
                return self.out.write_u8((major << 5) | v8);
            }
            self.out.write_u8((major << 5) | 24)?;
            return self.out.write_u8(v8);
        }
        if let Ok(v16) = u16::try_from(value) {
            self.out.write_u8((major << 5) | 25)?;
            return self.out.write(&v16.to_be_bytes());
        }
        if let Ok(v32) = u32::try_from(value) {
            self.out.write_u8((major << 5) | 26)?;
            return self.out.write(&v32.to_be_bytes());
        }
        self.out.write_u8((major << 5) | 27)?;
        self.out.write(&value.to_be_bytes())
    }

    fn begin_container(&mut self, major: u8, len: Option<usize>) -> Result<CborFrame, WriteError> {
        let declared = match len {
            Some(len) => {
                let len = u64::try_from(len).map_err(|_| WriteError::LengthMismatch)?;
                self.write_major_uint(major, len)?;
                Some(len)
            }
            None => {
                self.out.write_u8((major << 5) | AI_INDEFINITE)?;
                None
            }
        };
        Ok(CborFrame { declared, count: 0 })
    }

    fn end_container(&mut self, frame: &CborFrame) -> Result<(), WriteError> {
        match frame.declared {
            Some(declared) if declared == frame.count => Ok(()),
            Some(_) => Err(WriteError::LengthMismatch),
            None => self.out.write_u8(BREAK),
        }
    }
}

impl<O: Output> Writer for CborWriter<O> {
    const FORMAT: WireFormat = WireFormat::Cbor;
    type Frame = CborFrame;

    fn position(&self) -> usize {
        self.out.position()
    }

    fn write_null(&mut self) -> Result<(), WriteError> {
        self.out.write_u8((MAJOR_SIMPLE << 5) | SIMPLE_NULL)
    }

    fn write_bool(&mut self, value: bool) -> Result<(), WriteError> {
        let simple = if value { SIMPLE_TRUE } else { SIMPLE_FALSE };
        self.out.write_u8((MAJOR_SIMPLE << 5) | simple)
    }

    fn write_number(&mut self, value: NumberValue, _decimals: Option<u8>) -> Result<(), WriteError> {
        match value {
            NumberValue::Unsigned(v) => self.write_major_uint(MAJOR_UNSIGNED, v),
            NumberValue::Signed(v) if v >= 0 => self.write_major_uint(MAJOR_UNSIGNED, v.unsigned_abs()),
            NumberValue::Signed(v) => self.write_major_uint(MAJOR_NEGATIVE, v.unsigned_abs() - 1),
            NumberValue::F32(v) => {
                self.out.write_u8((MAJOR_SIMPLE << 5) | 26)?;
                self.out.write(&v.to_bits().to_be_bytes())
            }
            NumberValue::F64(v) => {
                self.out.write_u8((MAJOR_SIMPLE << 5) | 27)?;
                self.out.write(&v.to_bits().to_be_bytes())
            }
        }
    }

    fn write_string(&mut self, value: &str) -> Result<(), WriteError> {
        let len = u64::try_from(value.len()).map_err(|_| WriteError::LengthMismatch)?;
        self.write_major_uint(MAJOR_TEXT, len)?;
        self.out.write(value.as_bytes())
    }

    fn write_array_begin(&mut self, len: Option<usize>) -> Result<Self::Frame, WriteError> {
        self.begin_container(MAJOR_ARRAY, len)
    }

    fn write_array_end(&mut self, frame: Self::Frame) -> Result<(), WriteError> {
        self.end_container(&frame)
    }

    fn write_map_begin(&mut self, len: Option<usize>) -> Result<Self::Frame, WriteError> {
        self.begin_container(MAJOR_MAP, len)
    }

    fn write_map_end(&mut self, frame: Self::Frame) -> Result<(), WriteError> {
        self.end_container(&frame)
    }

    fn advance_after_value(&mut self, frame: &mut Self::Frame) -> Result<(), WriteError> {
        frame.count += 1;
        match frame.declared {
            Some(declared) if frame.count > declared => Err(WriteError::LengthMismatch),
            _ => Ok(()),
        }
    }

    fn write_key_as_index(&mut self, key: u64) -> Result<(), WriteError> {
        self.write_major_uint(MAJOR_UNSIGNED, key)
    }

    fn move_to_value(&mut self) -> Result<(), WriteError> {
        Ok(())
    }

    fn write_raw(&mut self, bytes: &[u8]) -> Result<(), WriteError> {
        self.out.write(bytes)
    }

    fn finish(&mut self) -> Result<usize, WriteError> {
        Ok(self.out.position())
    }
}
