//! # shapewire
//!
//! Schema-driven JSON and CBOR codec: documents are parsed straight into statically declared
//! Rust types and serialized back from them, with validation in the same single pass.
//!
//! ## Design principles
//!
//! - **The type is the schema.**
//!   Every type the engine handles implements [`Model`]; structs get it from
//!   [`#[derive(Model)]`](derive@Model) or the [`shape!`] macro. Field tables, wire keys and
//!   decorations are `const` data computed at compile time.
//! - **No intermediate document.**
//!   The parser pulls tokens from a [`Reader`] and writes them into the target's storage; the
//!   serializer walks the value and pushes tokens into a [`Writer`].
//! - **Bounded resources.**
//!   Models built from fixed-capacity containers (`ArrayString`, `ArrayVec`, arrays,
//!   [`RawSink`]) never allocate, string limits are enforced while reading, and unbounded
//!   arrays and maps can be streamed through [`Consumer`]s and [`Producer`]s.
//! - **One error model.**
//!   Every call returns [`Error`] with a stable [`ErrorCode`], the wire offset, the
//!   validator that failed, and the [`Path`] from the document root.
//!
//! ## Example
//!
//! ```
//! # #[cfg(feature = "alloc")] {
//! use shapewire::Model;
//!
//! #[derive(Model, Default, Debug, PartialEq)]
//! struct Motor {
//!     #[wire(rename = "id", range(1, 8))]
//!     motor_id: u8,
//!     #[wire(max_length = 16)]
//!     label: String,
//! }
//!
//! let motor: Motor = shapewire::from_json(br#"{"id": 3, "label": "left"}"#).unwrap();
//! assert_eq!(motor.motor_id, 3);
//!
//! let err = shapewire::from_json::<Motor>(br#"{"id": 99, "label": "x"}"#).unwrap_err();
//! assert_eq!(err.path.to_string(), "$.id");
//!
//! let json = shapewire::to_json_string(&motor).unwrap();
//! assert_eq!(json, r#"{"id":3,"label":"left"}"#);
//! # }
//! ```
//!
//! ## Feature flags
//!
//! - `std` *(default)*: implements `std::error::Error` for [`Error`] and supports `HashMap`.
//! - `alloc` *(default)*: `Vec`, `String`, `BTreeMap` and `Box` models, growable paths, and the
//!   `to_*_vec` helpers.
//! - `simdutf8`: SIMD-accelerated UTF-8 validation of string chunks.
//! - `dom`: a [`Reader`] over an already-parsed `serde_json::Value`.
//!
//! ## Safety
//!
//! This crate forbids `unsafe` code.
//!
//! ## `no_std`
//!
//! The crate is `no_std` compatible. Without `alloc`, paths are stored inline and models
//! deeper than [`INLINE_PATH_DEPTH`] (or self-referential ones) are rejected at compile time.

#![cfg_attr(not(feature = "std"), no_std)]
#![cfg_attr(docsrs, feature(doc_cfg))]
#![forbid(unsafe_code)]
#![deny(missing_docs)]
#![warn(clippy::all, clippy::pedantic, clippy::nursery)]

#[cfg(feature = "alloc")]
extern crate alloc;

// Lets `#[derive(Model)]` output name `::shapewire` inside this crate too.
extern crate self as shapewire;

#[cfg(feature = "alloc")]
mod alloc_util;
mod cbor_reader;
mod cbor_writer;
mod cursor;
mod decor;
#[cfg(feature = "dom")]
mod dom_reader;
mod error;
pub mod introspect;
mod json_reader;
mod json_writer;
mod limits;
mod matcher;
mod parse;
mod path;
mod reader;
mod report;
mod scalar;
mod schema;
mod serialize;
mod sink;
mod stream;
mod transform;
pub(crate) mod utf8;
mod validate;
mod wire;
mod writer;

pub use crate::cbor_reader::CborReader;
pub use crate::cbor_writer::CborWriter;
pub use crate::cursor::{
    ArraySink, ArraySource, EntryStatus, Halt, KeyMut, KeyRef, MapKey, MapSink, MapSource,
    SlotError, SourceError,
};
pub use crate::decor::{Decoration, DecorationKind, Decorations, MatcherKind};
pub use crate::error::{
    Error, ErrorCode, ErrorKind, ReadError, SchemaError, ValidationFailure, WriteError,
};
pub use crate::introspect::{
    field_at, field_count, FieldInfo, ObjectSchema, ObjectSlot, ObjectView, Shape, WireKey,
};
pub use crate::json_reader::JsonReader;
pub use crate::json_writer::JsonWriter;
pub use crate::limits::{ParseOptions, WriteOptions, DEFAULT_MAX_DEPTH, DEFAULT_MAX_SKIP_DEPTH};
pub use crate::parse::parse_with;
pub use crate::path::{InlineKey, Path, PathElement, INLINE_KEY_BYTES, INLINE_PATH_DEPTH};
pub use crate::reader::{Reader, StrChunk, TokenKind, WireFormat};
pub use crate::report::{ErrorReport, REPORT_WINDOW};
pub use crate::scalar::{NumberKind, NumberSlot, NumberValue, StringSlot};
pub use crate::schema::{
    classify, Category, Classification, Depth, Model, NodeMut, NodeRef, NullableSlot,
};
pub use crate::serialize::serialize_with;
pub use crate::sink::{RawSink, WireSink};
pub use crate::stream::{
    Consume, ConsumeEntries, ConsumeWith, Consumer, Counting, EntryConsumer, EntryProducer,
    FromIter, Produce, ProduceEntries, Producer, StreamError,
};
pub use crate::transform::{
    Reduced, Reducer, Transform, TransformError, TransformSlot, TransformView, Transformed,
};
pub use crate::validate::{Constant, Limit, Observed, UserCheck, Validator};
pub use crate::writer::{Output, SliceOutput, Writer};

#[cfg(feature = "alloc")]
pub use crate::sink::RawBuf;
#[cfg(feature = "alloc")]
pub use crate::transform::{Alternatives, Candidate, OneOf};
#[cfg(feature = "alloc")]
pub use crate::writer::VecOutput;

#[cfg(feature = "dom")]
pub use crate::dom_reader::DomReader;

pub use shapewire_derive::Model;

#[cfg(feature = "alloc")]
use alloc::{string::String, vec::Vec};

/// Parse JSON `input` into `target` with default options.
///
/// # Errors
///
/// Any syntax, structural, capacity or validation error, with its path.
pub fn parse_json<T: Model + ?Sized>(target: &mut T, input: &[u8]) -> Result<(), Error> {
    parse_json_with(target, input, &ParseOptions::new())
}

/// Parse JSON `input` into `target`.
///
/// # Errors
///
/// Any syntax, structural, capacity or validation error, with its path.
pub fn parse_json_with<T: Model + ?Sized>(
    target: &mut T,
    input: &[u8],
    options: &ParseOptions,
) -> Result<(), Error> {
    parse_with(JsonReader::with_options(input, options), target, options)
}

/// Parse CBOR `input` into `target` with default options.
///
/// # Errors
///
/// Any syntax, structural, capacity or validation error, with its path.
pub fn parse_cbor<T: Model + ?Sized>(target: &mut T, input: &[u8]) -> Result<(), Error> {
    parse_cbor_with(target, input, &ParseOptions::new())
}

/// Parse CBOR `input` into `target`.
///
/// # Errors
///
/// Any syntax, structural, capacity or validation error, with its path.
pub fn parse_cbor_with<T: Model + ?Sized>(
    target: &mut T,
    input: &[u8],
    options: &ParseOptions,
) -> Result<(), Error> {
    parse_with(CborReader::with_options(input, options), target, options)
}

/// Parse JSON into a default-initialized `T`.
///
/// # Errors
///
/// See [`parse_json`].
pub fn from_json<T: Model + Default>(input: &[u8]) -> Result<T, Error> {
    let mut value = T::default();
    parse_json(&mut value, input)?;
    Ok(value)
}

/// Parse CBOR into a default-initialized `T`.
///
/// # Errors
///
/// See [`parse_cbor`].
pub fn from_cbor<T: Model + Default>(input: &[u8]) -> Result<T, Error> {
    let mut value = T::default();
    parse_cbor(&mut value, input)?;
    Ok(value)
}

/// Parse an already-parsed JSON tree into `target`.
///
/// Error offsets count visited nodes rather than bytes.
///
/// # Errors
///
/// Any structural, capacity or validation error, with its path.
#[cfg(feature = "dom")]
#[cfg_attr(docsrs, doc(cfg(feature = "dom")))]
pub fn parse_dom<T: Model + ?Sized>(
    target: &mut T,
    value: &serde_json::Value,
    options: &ParseOptions,
) -> Result<(), Error> {
    parse_with(DomReader::new(value), target, options)
}

/// Serialize `value` as JSON into `buf`, returning the number of bytes written.
///
/// # Errors
///
/// `BufferFull` when `buf` is too small, non-finite floats, producer and transformer
/// failures, and wire-sink format mismatches.
pub fn serialize_json<T: Model + ?Sized>(value: &T, buf: &mut [u8]) -> Result<usize, Error> {
    serialize_json_with(value, buf, &WriteOptions::new())
}

/// Serialize `value` as JSON into `buf` with explicit options.
///
/// # Errors
///
/// See [`serialize_json`].
pub fn serialize_json_with<T: Model + ?Sized>(
    value: &T,
    buf: &mut [u8],
    options: &WriteOptions,
) -> Result<usize, Error> {
    let mut writer = JsonWriter::with_options(SliceOutput::new(buf), options);
    serialize_with(&mut writer, value, options)
}

/// Serialize `value` as CBOR into `buf`, returning the number of bytes written.
///
/// # Errors
///
/// `BufferFull` when `buf` is too small, producer and transformer failures, and wire-sink
/// format mismatches.
pub fn serialize_cbor<T: Model + ?Sized>(value: &T, buf: &mut [u8]) -> Result<usize, Error> {
    let mut writer = CborWriter::new(SliceOutput::new(buf));
    serialize_with(&mut writer, value, &WriteOptions::new())
}

/// Serialize `value` as JSON into a new vector.
///
/// # Errors
///
/// See [`serialize_json`]; allocation failures are reported as `AllocationFailed`.
#[cfg(feature = "alloc")]
#[cfg_attr(docsrs, doc(cfg(feature = "alloc")))]
pub fn to_json_vec<T: Model + ?Sized>(value: &T) -> Result<Vec<u8>, Error> {
    to_json_vec_with(value, &WriteOptions::new())
}

/// Serialize `value` as JSON into a new vector with explicit options.
///
/// # Errors
///
/// See [`to_json_vec`].
#[cfg(feature = "alloc")]
#[cfg_attr(docsrs, doc(cfg(feature = "alloc")))]
pub fn to_json_vec_with<T: Model + ?Sized>(
    value: &T,
    options: &WriteOptions,
) -> Result<Vec<u8>, Error> {
    let mut writer = JsonWriter::with_options(VecOutput::new(), options);
    serialize_with(&mut writer, value, options)?;
    Ok(writer.into_output().into_vec())
}

/// Serialize `value` as a JSON string.
///
/// # Errors
///
/// See [`to_json_vec`]. A wire sink holding bytes that are not UTF-8 fails with
/// `WireSinkFormatMismatch`.
#[cfg(feature = "alloc")]
#[cfg_attr(docsrs, doc(cfg(feature = "alloc")))]
pub fn to_json_string<T: Model + ?Sized>(value: &T) -> Result<String, Error> {
    let bytes = to_json_vec(value)?;
    String::from_utf8(bytes).map_err(|e| {
        Error::serialize(
            ErrorCode::WireSinkFormatMismatch,
            e.utf8_error().valid_up_to(),
        )
    })
}

/// Serialize `value` as CBOR into a new vector.
///
/// # Errors
///
/// See [`serialize_cbor`]; allocation failures are reported as `AllocationFailed`.
#[cfg(feature = "alloc")]
#[cfg_attr(docsrs, doc(cfg(feature = "alloc")))]
pub fn to_cbor_vec<T: Model + ?Sized>(value: &T) -> Result<Vec<u8>, Error> {
    let mut writer = CborWriter::new(VecOutput::new());
    serialize_with(&mut writer, value, &WriteOptions::new())?;
    Ok(writer.into_output().into_vec())
}
