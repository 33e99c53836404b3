//! Transformers: values stored in one type and carried on the wire as another.

use core::ops::{Deref, DerefMut};

use crate::cursor::{ArraySink, Halt, SlotError};
use crate::schema::{Category, Depth, Model, NodeMut, NodeRef};

#[cfg(feature = "alloc")]
use crate::{
    cbor_reader::CborReader, json_reader::JsonReader, limits::ParseOptions, parse::parse_with,
    reader::WireFormat, sink::RawBuf, sink::WireSink,
};

/// A conversion between a stored type and the model it is carried as.
pub trait Transform: Sized {
    /// The wire-facing model.
    type Wire: Model + Default;

    /// Convert a parsed wire value.
    ///
    /// # Errors
    ///
    /// [`TransformError`] if the wire value has no stored representation.
    fn from_wire(wire: Self::Wire) -> Result<Self, TransformError>;

    /// Convert for serialization.
    ///
    /// # Errors
    ///
    /// [`TransformError`] if the value has no wire representation.
    fn to_wire(&self) -> Result<Self::Wire, TransformError>;
}

/// A conversion was refused.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct TransformError;

/// Parse-side transformer hook.
pub trait TransformSlot {
    /// Hand wire-facing storage to `parse`, then convert and store the result.
    ///
    /// Returns `Ok(false)` if the conversion failed.
    ///
    /// # Errors
    ///
    /// Propagates [`Halt`] from `parse`.
    fn parse_wire(
        &mut self,
        parse: &mut dyn FnMut(NodeMut<'_>) -> Result<(), Halt>,
    ) -> Result<bool, Halt>;
}

/// Serialize-side transformer hook.
pub trait TransformView {
    /// Convert and hand the wire-facing value to `write`.
    ///
    /// Returns `Ok(false)` if the conversion failed.
    ///
    /// # Errors
    ///
    /// Propagates [`Halt`] from `write`.
    fn write_wire(
        &self,
        write: &mut dyn FnMut(NodeRef<'_>) -> Result<(), Halt>,
    ) -> Result<bool, Halt>;
}

/// A `T` carried on the wire as `T::Wire`.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct Transformed<T>(pub T);

impl<T> Transformed<T> {
    /// Unwrap the stored value.
    pub fn into_inner(self) -> T {
        self.0
    }
}

impl<T> Deref for Transformed<T> {
    type Target = T;

    fn deref(&self) -> &T {
        &self.0
    }
}

impl<T> DerefMut for Transformed<T> {
    fn deref_mut(&mut self) -> &mut T {
        &mut self.0
    }
}

impl<T: Transform> TransformSlot for Transformed<T> {
    fn parse_wire(
        &mut self,
        parse: &mut dyn FnMut(NodeMut<'_>) -> Result<(), Halt>,
    ) -> Result<bool, Halt> {
        let mut wire = T::Wire::default();
        parse(wire.node_mut())?;
        match T::from_wire(wire) {
            Ok(value) => {
                self.0 = value;
                Ok(true)
            }
            Err(TransformError) => Ok(false),
        }
    }
}

impl<T: Transform> TransformView for Transformed<T> {
    fn write_wire(
        &self,
        write: &mut dyn FnMut(NodeRef<'_>) -> Result<(), Halt>,
    ) -> Result<bool, Halt> {
        match self.0.to_wire() {
            Ok(wire) => write(wire.node()).map(|()| true),
            Err(TransformError) => Ok(false),
        }
    }
}

impl<T: Transform> Model for Transformed<T> {
    const CATEGORY: Category = Category::Transformer;
    const NULLABLE: bool = <T::Wire as Model>::NULLABLE;
    const DEPTH: Depth = <T::Wire as Model>::DEPTH;

    fn node_mut(&mut self) -> NodeMut<'_> {
        NodeMut::Transformer(self)
    }

    fn node(&self) -> NodeRef<'_> {
        NodeRef::Transformer(self)
    }
}

/// Folds the items of a wire array into one stored value.
pub trait Reducer {
    /// Element model.
    type Item: Model + Default;

    /// Forget any previous state.
    fn reset(&mut self);

    /// Fold one item. Returns `false` to reject it.
    fn reduce(&mut self, item: Self::Item) -> bool;
}

/// A [`Reducer`] parsed from an array of `R::Item`. Parse only.
#[derive(Debug, Clone, Default)]
pub struct Reduced<R: Reducer> {
    /// The accumulator.
    pub reducer: R,
    item: R::Item,
}

impl<R: Reducer> Reduced<R> {
    /// Wrap an accumulator.
    pub fn new(reducer: R) -> Self {
        Self {
            reducer,
            item: R::Item::default(),
        }
    }
}

struct ReduceSink<'a, R: Reducer> {
    reducer: &'a mut R,
    item: &'a mut R::Item,
}

impl<R: Reducer> ArraySink for ReduceSink<'_, R> {
    fn reset(&mut self) {}

    fn allocate_slot(&mut self, _index: usize) -> Result<NodeMut<'_>, SlotError> {
        *self.item = R::Item::default();
        Ok(self.item.node_mut())
    }

    fn finalize_item(&mut self, ok: bool) -> bool {
        !ok || self.reducer.reduce(core::mem::take(self.item))
    }
}

impl<R: Reducer> TransformSlot for Reduced<R> {
    fn parse_wire(
        &mut self,
        parse: &mut dyn FnMut(NodeMut<'_>) -> Result<(), Halt>,
    ) -> Result<bool, Halt> {
        self.reducer.reset();
        let mut sink = ReduceSink {
            reducer: &mut self.reducer,
            item: &mut self.item,
        };
        parse(NodeMut::Array(&mut sink))?;
        Ok(true)
    }
}

impl<R: Reducer> TransformView for Reduced<R> {
    fn write_wire(
        &self,
        _write: &mut dyn FnMut(NodeRef<'_>) -> Result<(), Halt>,
    ) -> Result<bool, Halt> {
        Ok(false)
    }
}

impl<R: Reducer> Model for Reduced<R> {
    const CATEGORY: Category = Category::Transformer;
    const DEPTH: Depth = <R::Item as Model>::DEPTH.nested();

    fn node_mut(&mut self) -> NodeMut<'_> {
        NodeMut::Transformer(self)
    }

    fn node(&self) -> NodeRef<'_> {
        NodeRef::Transformer(self)
    }
}

/// A closed set of alternative models carried by [`OneOf`].
///
/// ```
/// use shapewire::{Alternatives, Candidate, Model, NodeRef, OneOf};
///
/// #[derive(Debug, PartialEq)]
/// enum Timeout {
///     Seconds(u32),
///     Named(String),
/// }
///
/// impl Default for Timeout {
///     fn default() -> Self {
///         Self::Seconds(0)
///     }
/// }
///
/// impl Alternatives for Timeout {
///     const COUNT: usize = 2;
///
///     fn parse_alternative(index: usize, candidate: &Candidate<'_>) -> Option<Self> {
///         match index {
///             0 => candidate.parse().map(Self::Seconds),
///             1 => candidate.parse().map(Self::Named),
///             _ => None,
///         }
///     }
///
///     fn node(&self) -> NodeRef<'_> {
///         match self {
///             Self::Seconds(s) => s.node(),
///             Self::Named(n) => n.node(),
///         }
///     }
/// }
///
/// let t: OneOf<Timeout> = shapewire::from_json(br#""never""#).unwrap();
/// assert_eq!(t.0, Timeout::Named("never".into()));
/// ```
#[cfg(feature = "alloc")]
pub trait Alternatives: Sized {
    /// Number of alternatives.
    const COUNT: usize;

    /// Parse `candidate` as alternative `index`; `None` if it does not fit.
    fn parse_alternative(index: usize, candidate: &Candidate<'_>) -> Option<Self>;

    /// Wire view of the held alternative.
    fn node(&self) -> NodeRef<'_>;
}

/// A captured wire value offered to each alternative of a [`OneOf`].
#[cfg(feature = "alloc")]
#[derive(Debug, Clone, Copy)]
pub struct Candidate<'a> {
    format: WireFormat,
    bytes: &'a [u8],
}

#[cfg(feature = "alloc")]
impl<'a> Candidate<'a> {
    /// Format of the captured value.
    #[must_use]
    pub const fn format(&self) -> WireFormat {
        self.format
    }

    /// The captured bytes.
    #[must_use]
    pub const fn bytes(&self) -> &'a [u8] {
        self.bytes
    }

    /// Parse the value into a default-initialized `T` with default options.
    #[must_use]
    pub fn parse<T: Model + Default>(&self) -> Option<T> {
        let options = ParseOptions::new();
        let mut value = T::default();
        let outcome = match self.format {
            WireFormat::Json => {
                parse_with(JsonReader::with_options(self.bytes, &options), &mut value, &options)
            }
            WireFormat::Cbor => {
                parse_with(CborReader::with_options(self.bytes, &options), &mut value, &options)
            }
        };
        outcome.ok().map(|()| value)
    }
}

/// Exactly one of the alternatives in `V`.
///
/// The wire value is captured and parsed as every alternative in turn. It is accepted only
/// when exactly one alternative parses; no match or several matches is a transformer error.
/// Serializing writes the held alternative.
#[cfg(feature = "alloc")]
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct OneOf<V>(pub V);

#[cfg(feature = "alloc")]
impl<V: Alternatives> TransformSlot for OneOf<V> {
    fn parse_wire(
        &mut self,
        parse: &mut dyn FnMut(NodeMut<'_>) -> Result<(), Halt>,
    ) -> Result<bool, Halt> {
        let mut raw: RawBuf = RawBuf::new();
        parse(raw.node_mut())?;
        let Some(format) = raw.format() else {
            return Ok(false);
        };
        let candidate = Candidate {
            format,
            bytes: raw.as_bytes(),
        };
        let mut held = None;
        let mut matches = 0usize;
        for index in 0..V::COUNT {
            if let Some(value) = V::parse_alternative(index, &candidate) {
                matches += 1;
                held.get_or_insert(value);
            }
        }
        log::trace!("{matches} of {} alternatives matched", V::COUNT);
        match held {
            Some(value) if matches == 1 => {
                self.0 = value;
                Ok(true)
            }
            _ => Ok(false),
        }
    }
}

#[cfg(feature = "alloc")]
impl<V: Alternatives> TransformView for OneOf<V> {
    fn write_wire(
        &self,
        write: &mut dyn FnMut(NodeRef<'_>) -> Result<(), Halt>,
    ) -> Result<bool, Halt> {
        write(self.0.node()).map(|()| true)
    }
}

#[cfg(feature = "alloc")]
impl<V: Alternatives> Model for OneOf<V> {
    const CATEGORY: Category = Category::Transformer;
    // Alternatives are opaque to static analysis.
    const DEPTH: Depth = Depth::Unbounded;

    fn node_mut(&mut self) -> NodeMut<'_> {
        NodeMut::Transformer(self)
    }

    fn node(&self) -> NodeRef<'_> {
        NodeRef::Transformer(self)
    }
}
