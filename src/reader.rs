//! The reader contract consumed by the parser engine.

use crate::error::ReadError;
use crate::scalar::{NumberKind, NumberValue};
use crate::sink::WireSink;

/// Wire formats understood by the engine.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum WireFormat {
    /// UTF-8 JSON text.
    Json,
    /// CBOR (RFC 8949).
    Cbor,
}

/// Kind of the next token.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TokenKind {
    /// `null`.
    Null,
    /// `true` / `false`.
    Bool,
    /// Any number.
    Number,
    /// Text string.
    String,
    /// Array.
    Array,
    /// Object / map.
    Map,
    /// Valid on the wire but not modelled (byte strings, `undefined`, other simple values).
    Other,
}

/// A decoded piece of a string, copied into the caller's scratch buffer.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct StrChunk<'b> {
    /// Decoded text; always ends on a character boundary.
    pub text: &'b str,
    /// True if this is the last chunk of the string.
    pub done: bool,
}

/// Smallest scratch buffer a reader must be able to make progress with.
pub const MIN_CHUNK: usize = 4;

/// A pull reader over one wire document.
///
/// The engine calls `start_value_and_try_read_null` before every value, then `peek_kind`, and
/// then exactly one of the typed reads. Containers are read with a begin call returning a
/// frame and an advance call per element.
pub trait Reader {
    /// Format of the bytes this reader consumes.
    const FORMAT: WireFormat;
    /// Per-array iteration state.
    type ArrayFrame;
    /// Per-map iteration state.
    type MapFrame;

    /// Current byte offset (or a node counter for tree readers).
    fn position(&self) -> usize;

    /// The raw input, if the reader works over bytes.
    fn input(&self) -> &[u8];

    /// Move to the start of the next value; consume it and return `true` if it is `null`.
    ///
    /// # Errors
    ///
    /// Syntax errors at the value start.
    fn start_value_and_try_read_null(&mut self) -> Result<bool, ReadError>;

    /// Kind of the value at the cursor.
    ///
    /// # Errors
    ///
    /// `UnexpectedSymbol` if no value can start here.
    fn peek_kind(&mut self) -> Result<TokenKind, ReadError>;

    /// Read a boolean.
    ///
    /// # Errors
    ///
    /// Syntax errors.
    fn read_bool(&mut self) -> Result<bool, ReadError>;

    /// Read a number for storage of `kind`.
    ///
    /// Integer storage receives `Unsigned` for non-negative and `Signed` for negative values;
    /// float storage receives `F64` (or `F32` when the wire carries single precision).
    ///
    /// # Errors
    ///
    /// `FloatInIntegerStorage`, `NumberOutOfRange`, or syntax errors.
    fn read_number(&mut self, kind: NumberKind) -> Result<NumberValue, ReadError>;

    /// Enter a string value.
    ///
    /// # Errors
    ///
    /// Syntax errors.
    fn read_string_begin(&mut self) -> Result<(), ReadError>;

    /// Decode the next piece of the current string into `buf`.
    ///
    /// # Errors
    ///
    /// `IllformedString` on bad escapes, control characters or invalid UTF-8.
    fn read_string_chunk<'b>(&mut self, buf: &'b mut [u8]) -> Result<StrChunk<'b>, ReadError>;

    /// Enter an array.
    ///
    /// # Errors
    ///
    /// Syntax errors.
    fn read_array_begin(&mut self) -> Result<Self::ArrayFrame, ReadError>;

    /// Returns `true` if another element follows, `false` after consuming the array end.
    ///
    /// # Errors
    ///
    /// `IllformedArray` on bad separators or trailing commas.
    fn advance_array(&mut self, frame: &mut Self::ArrayFrame) -> Result<bool, ReadError>;

    /// Enter a map.
    ///
    /// # Errors
    ///
    /// Syntax errors.
    fn read_map_begin(&mut self) -> Result<Self::MapFrame, ReadError>;

    /// Returns `true` if another key follows (cursor at the key), `false` after the map end.
    ///
    /// # Errors
    ///
    /// `IllformedObject` on bad separators, non-string JSON keys or trailing commas.
    fn advance_map(&mut self, frame: &mut Self::MapFrame) -> Result<bool, ReadError>;

    /// Consume whatever separates a key from its value.
    ///
    /// # Errors
    ///
    /// `IllformedObject` if the separator is missing.
    fn read_key_separator(&mut self) -> Result<(), ReadError>;

    /// Read the key at the cursor as an integer; `None` (key consumed) if it is not one.
    ///
    /// # Errors
    ///
    /// Syntax errors.
    fn read_key_as_index(&mut self) -> Result<Option<u64>, ReadError>;

    /// Skip the value at the cursor.
    ///
    /// # Errors
    ///
    /// Syntax errors or `NestingTooDeep`.
    fn skip_value(&mut self) -> Result<(), ReadError>;

    /// Copy the value at the cursor into `sink` in this reader's format.
    ///
    /// # Errors
    ///
    /// Syntax errors, `NestingTooDeep`, or `SinkOverflow`.
    fn capture_to_sink(&mut self, sink: &mut dyn WireSink) -> Result<(), ReadError>;

    /// Check that only insignificant input remains.
    ///
    /// # Errors
    ///
    /// `ExcessData`.
    fn finish(&mut self) -> Result<(), ReadError>;
}
