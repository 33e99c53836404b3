//! The writer contract consumed by the serializer engine, and output buffers.

use crate::error::WriteError;
use crate::reader::WireFormat;
use crate::scalar::NumberValue;

#[cfg(feature = "alloc")]
use crate::alloc_util::try_extend;
#[cfg(feature = "alloc")]
use alloc::vec::Vec;

/// Byte destination for writers.
pub trait Output {
    /// Append bytes.
    ///
    /// # Errors
    ///
    /// `BufferFull` or `AllocationFailed`.
    fn write(&mut self, bytes: &[u8]) -> Result<(), WriteError>;

    /// Append one byte.
    ///
    /// # Errors
    ///
    /// `BufferFull` or `AllocationFailed`.
    fn write_u8(&mut self, byte: u8) -> Result<(), WriteError> {
        self.write(&[byte])
    }

    /// Bytes written so far.
    fn position(&self) -> usize;
}

/// Writes into a caller-provided slice.
#[derive(Debug)]
pub struct SliceOutput<'a> {
    buf: &'a mut [u8],
    pos: usize,
}

impl<'a> SliceOutput<'a> {
    /// Write into `buf` from the start.
    #[must_use]
    pub fn new(buf: &'a mut [u8]) -> Self {
        Self { buf, pos: 0 }
    }

    /// The written prefix.
    #[must_use]
    pub fn written(&self) -> &[u8] {
        &self.buf[..self.pos]
    }
}

impl Output for SliceOutput<'_> {
    fn write(&mut self, bytes: &[u8]) -> Result<(), WriteError> {
        let end = self
            .pos
            .checked_add(bytes.len())
            .ok_or(WriteError::BufferFull)?;
        let dst = self.buf.get_mut(self.pos..end).ok_or(WriteError::BufferFull)?;
        dst.copy_from_slice(bytes);
        self.pos = end;
        Ok(())
    }

    fn position(&self) -> usize {
        self.pos
    }
}

/// Writes into a growable vector.
#[cfg(feature = "alloc")]
#[derive(Debug, Default)]
pub struct VecOutput {
    buf: Vec<u8>,
}

#[cfg(feature = "alloc")]
impl VecOutput {
    /// Empty output.
    #[must_use]
    pub const fn new() -> Self {
        Self { buf: Vec::new() }
    }

    /// The written bytes.
    #[must_use]
    pub fn into_vec(self) -> Vec<u8> {
        self.buf
    }
}

#[cfg(feature = "alloc")]
impl Output for VecOutput {
    fn write(&mut self, bytes: &[u8]) -> Result<(), WriteError> {
        if try_extend(&mut self.buf, bytes) {
            Ok(())
        } else {
            Err(WriteError::AllocationFailed)
        }
    }

    fn position(&self) -> usize {
        self.buf.len()
    }
}

/// A push writer producing one wire document.
///
/// Containers are opened with a begin call returning a frame; after every element the engine
/// calls [`Writer::advance_after_value`] with that frame, and closes it with the end call.
/// Map keys are written with [`Writer::write_string`] or [`Writer::write_key_as_index`],
/// followed by [`Writer::move_to_value`].
pub trait Writer {
    /// Format of the produced bytes.
    const FORMAT: WireFormat;
    /// Per-container state.
    type Frame;

    /// Bytes written so far.
    fn position(&self) -> usize;

    /// Write `null`.
    ///
    /// # Errors
    ///
    /// Output errors.
    fn write_null(&mut self) -> Result<(), WriteError>;

    /// Write a boolean.
    ///
    /// # Errors
    ///
    /// Output errors.
    fn write_bool(&mut self, value: bool) -> Result<(), WriteError>;

    /// Write a number; floats honor `decimals` fractional digits when given.
    ///
    /// # Errors
    ///
    /// Output errors; `NonFiniteFloat` for NaN or infinities in JSON.
    fn write_number(&mut self, value: NumberValue, decimals: Option<u8>) -> Result<(), WriteError>;

    /// Write a string (also used for textual map keys).
    ///
    /// # Errors
    ///
    /// Output errors.
    fn write_string(&mut self, value: &str) -> Result<(), WriteError>;

    /// Open an array of `len` elements, or of unknown length.
    ///
    /// # Errors
    ///
    /// Output errors.
    fn write_array_begin(&mut self, len: Option<usize>) -> Result<Self::Frame, WriteError>;

    /// Close an array.
    ///
    /// # Errors
    ///
    /// Output errors; `LengthMismatch` if a declared length was not met.
    fn write_array_end(&mut self, frame: Self::Frame) -> Result<(), WriteError>;

    /// Open a map of `len` entries, or of unknown length.
    ///
    /// # Errors
    ///
    /// Output errors.
    fn write_map_begin(&mut self, len: Option<usize>) -> Result<Self::Frame, WriteError>;

    /// Close a map.
    ///
    /// # Errors
    ///
    /// Output errors; `LengthMismatch` if a declared length was not met.
    fn write_map_end(&mut self, frame: Self::Frame) -> Result<(), WriteError>;

    /// Record that an element (or map entry) of `frame` was completed.
    ///
    /// # Errors
    ///
    /// `LengthMismatch` if the declared length is exceeded.
    fn advance_after_value(&mut self, frame: &mut Self::Frame) -> Result<(), WriteError>;

    /// Write an integer map key.
    ///
    /// # Errors
    ///
    /// Output errors.
    fn write_key_as_index(&mut self, key: u64) -> Result<(), WriteError>;

    /// Separate a key from its value.
    ///
    /// # Errors
    ///
    /// Output errors.
    fn move_to_value(&mut self) -> Result<(), WriteError>;

    /// Copy pre-encoded bytes of this writer's format as one value.
    ///
    /// # Errors
    ///
    /// Output errors.
    fn write_raw(&mut self, bytes: &[u8]) -> Result<(), WriteError>;

    /// Complete the document and return the number of bytes written.
    ///
    /// # Errors
    ///
    /// Output errors.
    fn finish(&mut self) -> Result<usize, WriteError>;
}
