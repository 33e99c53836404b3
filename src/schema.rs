//! Value classification.
//!
//! Every type the engine can read or write implements [`Model`]. The trait carries the
//! type's [`Category`], whether it is nullable, and its static nesting [`Depth`]; at runtime
//! it hands the engine a typed view of itself ([`NodeMut`] for parsing, [`NodeRef`] for
//! serializing) so that a single `match` per node dispatches to the right logic.

use core::marker::PhantomData;

use crate::cursor::{ArraySink, ArraySource, MapSink, MapSource};
use crate::introspect::{ObjectSlot, ObjectView};
use crate::scalar::{NumberSlot, NumberValue, StringSlot};
use crate::sink::WireSink;
use crate::transform::{TransformSlot, TransformView};

#[cfg(feature = "alloc")]
use alloc::boxed::Box;

/// The closed set of value categories.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Category {
    /// `true` / `false`.
    Bool,
    /// Integers and floating-point numbers.
    Number,
    /// Text.
    String,
    /// Ordered sequences.
    Array,
    /// Key/value collections with text or integer keys.
    Map,
    /// Declared structs with enumerable fields.
    Object,
    /// A stored type converted to and from a wire-facing model.
    Transformer,
    /// Raw captured wire bytes.
    WireSink,
    /// Producer/consumer adapters standing in for arrays or maps.
    Streamer,
}

/// Static nesting depth of a model.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Depth {
    /// At most this many container levels below the value.
    Bounded(usize),
    /// Self-referential; no static bound.
    Unbounded,
}

impl Depth {
    /// Depth of a scalar.
    pub const SCALAR: Self = Self::Bounded(0);

    /// Depth of a container whose children have depth `self`.
    #[must_use]
    pub const fn nested(self) -> Self {
        match self {
            Self::Bounded(d) => Self::Bounded(d + 1),
            Self::Unbounded => Self::Unbounded,
        }
    }

    /// The deeper of two depths.
    #[must_use]
    pub const fn max(self, other: Self) -> Self {
        match (self, other) {
            (Self::Bounded(a), Self::Bounded(b)) => Self::Bounded(if a > b { a } else { b }),
            _ => Self::Unbounded,
        }
    }

    /// Whether a path of `capacity` elements can hold every route into this value.
    #[must_use]
    pub const fn fits(self, capacity: usize) -> bool {
        match self {
            Self::Bounded(d) => d <= capacity,
            Self::Unbounded => false,
        }
    }
}

/// A type the engine can parse into and serialize from.
///
/// Implementations exist for `bool`, the primitive numbers, `String`, `ArrayString`, arrays,
/// `Vec`, `ArrayVec`, maps, `Option`, `Box`, and every `#[derive(Model)]` struct.
pub trait Model {
    /// Category after unwrapping optionality.
    const CATEGORY: Category;
    /// Whether `null` is a valid wire value for this type.
    const NULLABLE: bool = false;
    /// Static nesting depth.
    const DEPTH: Depth = Depth::SCALAR;

    /// Mutable view used while parsing.
    fn node_mut(&mut self) -> NodeMut<'_>;

    /// Shared view used while serializing.
    fn node(&self) -> NodeRef<'_>;
}

/// Parse-side view of a value.
pub enum NodeMut<'a> {
    /// Boolean storage.
    Bool(&'a mut bool),
    /// Numeric storage.
    Number(&'a mut dyn NumberSlot),
    /// Text storage.
    String(&'a mut dyn StringSlot),
    /// Array cursor (containers and consumers).
    Array(&'a mut dyn ArraySink),
    /// Map cursor (containers and consumers).
    Map(&'a mut dyn MapSink),
    /// Declared struct.
    Object(&'a mut dyn ObjectSlot),
    /// Optional value.
    Nullable(&'a mut dyn NullableSlot),
    /// Transformer wrapper.
    Transformer(&'a mut dyn TransformSlot),
    /// Raw byte capture.
    WireSink(&'a mut dyn WireSink),
}

/// Serialize-side view of a value.
pub enum NodeRef<'a> {
    /// An absent optional value.
    Null,
    /// A boolean.
    Bool(bool),
    /// A number.
    Number(NumberValue),
    /// A string.
    String(&'a str),
    /// Array cursor (containers and producers).
    Array(&'a dyn ArraySource),
    /// Map cursor (containers and producers).
    Map(&'a dyn MapSource),
    /// Declared struct.
    Object(&'a dyn ObjectView),
    /// Transformer wrapper.
    Transformer(&'a dyn TransformView),
    /// Previously captured wire bytes.
    WireSink(&'a dyn WireSink),
}

impl NodeRef<'_> {
    /// Returns true for [`NodeRef::Null`].
    #[inline]
    #[must_use]
    pub const fn is_null(&self) -> bool {
        matches!(self, Self::Null)
    }
}

/// Storage for an optional value.
pub trait NullableSlot {
    /// Store the absent value.
    fn set_null(&mut self);
    /// Materialize a present value (default-initialized if absent) and return its view.
    fn value_mut(&mut self) -> NodeMut<'_>;
}

impl<T: Model + Default> NullableSlot for Option<T> {
    fn set_null(&mut self) {
        *self = None;
    }

    fn value_mut(&mut self) -> NodeMut<'_> {
        self.get_or_insert_with(T::default).node_mut()
    }
}

impl<T: Model + Default> Model for Option<T> {
    const CATEGORY: Category = T::CATEGORY;
    const NULLABLE: bool = true;
    const DEPTH: Depth = T::DEPTH;

    fn node_mut(&mut self) -> NodeMut<'_> {
        NodeMut::Nullable(self)
    }

    fn node(&self) -> NodeRef<'_> {
        match self {
            Some(v) => v.node(),
            None => NodeRef::Null,
        }
    }
}

#[cfg(feature = "alloc")]
impl<T: Model + ?Sized> Model for Box<T> {
    const CATEGORY: Category = T::CATEGORY;
    const NULLABLE: bool = T::NULLABLE;
    const DEPTH: Depth = T::DEPTH;

    fn node_mut(&mut self) -> NodeMut<'_> {
        (**self).node_mut()
    }

    fn node(&self) -> NodeRef<'_> {
        (**self).node()
    }
}

impl Model for bool {
    const CATEGORY: Category = Category::Bool;

    fn node_mut(&mut self) -> NodeMut<'_> {
        NodeMut::Bool(self)
    }

    fn node(&self) -> NodeRef<'_> {
        NodeRef::Bool(*self)
    }
}

/// The static classification of a model type.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Classification {
    /// Category after unwrapping optionality.
    pub category: Category,
    /// Whether `null` is accepted.
    pub nullable: bool,
    /// Static nesting depth.
    pub depth: Depth,
}

/// Classify `T` without a value.
#[must_use]
pub const fn classify<T: Model + ?Sized>() -> Classification {
    Classification {
        category: T::CATEGORY,
        nullable: T::NULLABLE,
        depth: T::DEPTH,
    }
}

/// Post-monomorphization check that a model's path fits the available path storage.
pub(crate) struct DepthCheck<T: ?Sized>(PhantomData<T>);

#[cfg(feature = "alloc")]
impl<T: Model + ?Sized> DepthCheck<T> {
    pub(crate) const FITS: () = ();
}

#[cfg(not(feature = "alloc"))]
impl<T: Model + ?Sized> DepthCheck<T> {
    pub(crate) const FITS: () = assert!(
        T::DEPTH.fits(crate::path::INLINE_PATH_DEPTH),
        "model nesting exceeds the inline path capacity; enable the `alloc` feature"
    );
}

#[cfg(all(test, feature = "alloc"))]
mod tests {
    use super::*;
    use alloc::collections::BTreeMap;
    use alloc::{boxed::Box, string::String, vec::Vec};

    #[test]
    fn scalars_and_containers() {
        let c = classify::<u16>();
        assert_eq!((c.category, c.nullable, c.depth), (Category::Number, false, Depth::SCALAR));
        assert_eq!(classify::<bool>().category, Category::Bool);
        assert_eq!(classify::<String>().category, Category::String);
        assert_eq!(classify::<[u8; 4]>().category, Category::Array);

        let nested = classify::<Vec<BTreeMap<String, Vec<u8>>>>();
        assert_eq!(nested.category, Category::Array);
        assert_eq!(nested.depth, Depth::Bounded(3));
    }

    #[test]
    fn optional_wraps_without_changing_category() {
        let c = classify::<Option<Vec<u8>>>();
        assert_eq!(c.category, Category::Array);
        assert!(c.nullable);
        assert_eq!(c.depth, Depth::Bounded(1));
    }

    #[test]
    fn classification_is_idempotent() {
        assert_eq!(classify::<u32>(), classify::<u32>());
        assert_eq!(classify::<Box<Option<u8>>>(), classify::<Option<u8>>());
        assert_eq!(classify::<Option<Option<u8>>>(), classify::<Option<u8>>());
        assert_eq!(classify::<Box<Box<String>>>(), classify::<String>());
    }

    #[test]
    fn depth_arithmetic() {
        assert_eq!(Depth::SCALAR.nested(), Depth::Bounded(1));
        assert_eq!(Depth::Bounded(2).max(Depth::Bounded(5)), Depth::Bounded(5));
        assert_eq!(Depth::Bounded(2).max(Depth::Unbounded), Depth::Unbounded);
        assert_eq!(Depth::Unbounded.nested(), Depth::Unbounded);
        assert!(Depth::Bounded(4).fits(4));
        assert!(!Depth::Bounded(5).fits(4));
        assert!(!Depth::Unbounded.fits(usize::MAX));
    }

    #[test]
    fn null_views() {
        let absent: Option<u8> = None;
        assert!(absent.node().is_null());
        assert!(!Some(3u8).node().is_null());

        let mut slot: Option<u8> = None;
        match slot.node_mut() {
            NodeMut::Nullable(n) => {
                assert!(matches!(n.value_mut(), NodeMut::Number(_)));
            }
            _ => panic!("expected a nullable view"),
        }
        assert_eq!(slot, Some(0));
    }
}
