use arrayvec::ArrayString;

#[cfg(feature = "alloc")]
use alloc::string::String;

use crate::schema::{Category, Model, NodeMut, NodeRef};

/// A number as read from or written to the wire.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum NumberValue {
    /// A non-negative integer.
    Unsigned(u64),
    /// A negative (or signed-storage) integer.
    Signed(i64),
    /// Single-precision float.
    F32(f32),
    /// Double-precision float.
    F64(f64),
}

impl NumberValue {
    /// Widen to `f64` for comparisons.
    #[allow(clippy::cast_precision_loss)]
    #[must_use]
    pub fn as_f64(self) -> f64 {
        match self {
            Self::Unsigned(u) => u as f64,
            Self::Signed(i) => i as f64,
            Self::F32(f) => f64::from(f),
            Self::F64(f) => f,
        }
    }
}

/// How a numeric slot wants its token read.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum NumberKind {
    /// Unsigned integer storage.
    Unsigned,
    /// Signed integer storage.
    Signed,
    /// Floating-point storage.
    Float,
}

/// Numeric storage.
pub trait NumberSlot {
    /// Storage kind.
    fn kind(&self) -> NumberKind;
    /// Store `value`; returns `false` if it does not fit.
    fn store(&mut self, value: NumberValue) -> bool;
    /// Current value.
    fn load(&self) -> NumberValue;
}

macro_rules! integer_model {
    ($kind:ident, $wide:ident, $variant:ident: $($t:ty),*) => {$(
        impl NumberSlot for $t {
            fn kind(&self) -> NumberKind {
                NumberKind::$kind
            }

            fn store(&mut self, value: NumberValue) -> bool {
                let narrowed = match value {
                    NumberValue::Unsigned(u) => <$t>::try_from(u).ok(),
                    NumberValue::Signed(i) => <$t>::try_from(i).ok(),
                    NumberValue::F32(_) | NumberValue::F64(_) => None,
                };
                narrowed.map_or(false, |v| {
                    *self = v;
                    true
                })
            }

            fn load(&self) -> NumberValue {
                NumberValue::$variant($wide::try_from(*self).unwrap_or($wide::MAX))
            }
        }

        impl Model for $t {
            const CATEGORY: Category = Category::Number;

            fn node_mut(&mut self) -> NodeMut<'_> {
                NodeMut::Number(self)
            }

            fn node(&self) -> NodeRef<'_> {
                NodeRef::Number(self.load())
            }
        }
    )*};
}

integer_model!(Unsigned, u64, Unsigned: u8, u16, u32, u64, usize);
integer_model!(Signed, i64, Signed: i8, i16, i32, i64, isize);

impl NumberSlot for f64 {
    fn kind(&self) -> NumberKind {
        NumberKind::Float
    }

    fn store(&mut self, value: NumberValue) -> bool {
        *self = value.as_f64();
        true
    }

    fn load(&self) -> NumberValue {
        NumberValue::F64(*self)
    }
}

impl NumberSlot for f32 {
    fn kind(&self) -> NumberKind {
        NumberKind::Float
    }

    #[allow(clippy::cast_possible_truncation)]
    fn store(&mut self, value: NumberValue) -> bool {
        if let NumberValue::F32(f) = value {
            *self = f;
            return true;
        }
        let wide = value.as_f64();
        if wide.is_finite() && wide.abs() > f64::from(f32::MAX) {
            return false;
        }
        *self = wide as f32;
        true
    }

    fn load(&self) -> NumberValue {
        NumberValue::F32(*self)
    }
}

macro_rules! float_model {
    ($($t:ty),*) => {$(
        impl Model for $t {
            const CATEGORY: Category = Category::Number;

            fn node_mut(&mut self) -> NodeMut<'_> {
                NodeMut::Number(self)
            }

            fn node(&self) -> NodeRef<'_> {
                NodeRef::Number(self.load())
            }
        }
    )*};
}

float_model!(f32, f64);

/// Text storage.
pub trait StringSlot {
    /// Drop any previous content.
    fn clear(&mut self);
    /// Maximum byte length, or `None` for growable storage.
    fn capacity(&self) -> Option<usize>;
    /// Append a chunk; returns `false` if it does not fit.
    fn push_str(&mut self, chunk: &str) -> bool;
    /// Current content.
    fn as_str(&self) -> &str;
}

#[cfg(feature = "alloc")]
impl StringSlot for String {
    fn clear(&mut self) {
        Self::clear(self);
    }

    fn capacity(&self) -> Option<usize> {
        None
    }

    fn push_str(&mut self, chunk: &str) -> bool {
        if self.try_reserve(chunk.len()).is_err() {
            return false;
        }
        Self::push_str(self, chunk);
        true
    }

    fn as_str(&self) -> &str {
        Self::as_str(self)
    }
}

#[cfg(feature = "alloc")]
impl Model for String {
    const CATEGORY: Category = Category::String;

    fn node_mut(&mut self) -> NodeMut<'_> {
        NodeMut::String(self)
    }

    fn node(&self) -> NodeRef<'_> {
        NodeRef::String(self)
    }
}

impl<const N: usize> StringSlot for ArrayString<N> {
    fn clear(&mut self) {
        Self::clear(self);
    }

    fn capacity(&self) -> Option<usize> {
        Some(N)
    }

    fn push_str(&mut self, chunk: &str) -> bool {
        self.try_push_str(chunk).is_ok()
    }

    fn as_str(&self) -> &str {
        Self::as_str(self)
    }
}

impl<const N: usize> Model for ArrayString<N> {
    const CATEGORY: Category = Category::String;

    fn node_mut(&mut self) -> NodeMut<'_> {
        NodeMut::String(self)
    }

    fn node(&self) -> NodeRef<'_> {
        NodeRef::String(self)
    }
}
