//! Validator catalogue and event dispatch.
//!
//! Validators are plain data inside a field's [`Decorations`]. The parser raises an [`Event`]
//! at fixed hook points and [`run`] forwards it to every validator that listens for it. The
//! first rejection wins and is reported with its position in the decoration list.

use core::fmt;

use crate::decor::{contains_str, Decorations};
use crate::error::{SchemaError, ValidationFailure};
use crate::introspect::{FieldSet, ObjectSchema};
use crate::scalar::NumberValue;

/// A numeric bound for [`Validator::Range`].
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum Limit {
    /// Signed integer bound.
    Int(i64),
    /// Unsigned integer bound.
    Uint(u64),
    /// Floating-point bound.
    Float(f64),
}

/// A value for [`Validator::Constant`].
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum Constant {
    /// Boolean constant.
    Bool(bool),
    /// Signed integer constant.
    Int(i64),
    /// Unsigned integer constant.
    Uint(u64),
    /// Float constant, compared with a relative epsilon.
    Float(f64),
    /// String constant.
    Str(&'static str),
}

/// What a user check sees.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum Observed<'a> {
    /// A parsed boolean.
    Bool(bool),
    /// A parsed number.
    Number(NumberValue),
    /// A parsed string.
    String(&'a str),
    /// Element count of a finished array or map, or fields seen in an object.
    Count(usize),
}

/// A user-supplied predicate.
#[derive(Clone, Copy)]
pub struct UserCheck(pub for<'a> fn(Observed<'a>) -> bool);

impl fmt::Debug for UserCheck {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("UserCheck(..)")
    }
}

/// The validator catalogue.
#[derive(Debug, Clone, Copy)]
pub enum Validator {
    /// Inclusive numeric range.
    Range {
        /// Lower bound.
        min: Limit,
        /// Upper bound.
        max: Limit,
    },
    /// Minimum string length in bytes.
    MinLength(usize),
    /// Maximum string length in bytes.
    MaxLength(usize),
    /// Minimum array item count.
    MinItems(usize),
    /// Maximum array item count.
    MaxItems(usize),
    /// Minimum map entry count.
    MinProperties(usize),
    /// Maximum map entry count.
    MaxProperties(usize),
    /// Minimum map key length.
    MinKeyLength(usize),
    /// Maximum map key length.
    MaxKeyLength(usize),
    /// Map keys must be listed.
    AllowedKeys(&'static [&'static str]),
    /// Map keys must not be listed.
    ForbiddenKeys(&'static [&'static str]),
    /// Listed map keys must all be present.
    RequiredKeys(&'static [&'static str]),
    /// Value must equal the constant.
    Constant(Constant),
    /// String must be one of the listed values.
    EnumValues(&'static [&'static str]),
    /// Listed object fields (declared names) must be present.
    RequiredFields(&'static [&'static str]),
    /// Every object field except the listed ones must be present.
    NotRequiredFields(&'static [&'static str]),
    /// Listed excess keys are rejected even when excess fields are allowed.
    ForbiddenFields(&'static [&'static str]),
    /// User predicate.
    Custom {
        /// Name used in error messages.
        name: &'static str,
        /// The predicate.
        check: UserCheck,
    },
}

impl Validator {
    /// Short name used in error messages.
    #[must_use]
    pub const fn name(&self) -> &'static str {
        match self {
            Self::Range { .. } => "range",
            Self::MinLength(_) => "min_length",
            Self::MaxLength(_) => "max_length",
            Self::MinItems(_) => "min_items",
            Self::MaxItems(_) => "max_items",
            Self::MinProperties(_) => "min_properties",
            Self::MaxProperties(_) => "max_properties",
            Self::MinKeyLength(_) => "min_key_length",
            Self::MaxKeyLength(_) => "max_key_length",
            Self::AllowedKeys(_) => "allowed_keys",
            Self::ForbiddenKeys(_) => "forbidden_keys",
            Self::RequiredKeys(_) => "required_keys",
            Self::Constant(_) => "constant",
            Self::EnumValues(_) => "enum_values",
            Self::RequiredFields(_) => "required_fields",
            Self::NotRequiredFields(_) => "not_required_fields",
            Self::ForbiddenFields(_) => "forbidden_fields",
            Self::Custom { name, .. } => *name,
        }
    }

    fn check(&self, event: &Event<'_>) -> Result<(), SchemaError> {
        use Event as E;

        let pass = match (self, event) {
            (Self::Range { min, max }, E::Number(v)) => !below(*v, *min) && !above(*v, *max),
            (Self::MinLength(n), E::StringFinished { len, .. }) => len >= n,
            (Self::MaxLength(n), E::StringChunk { len }) => len <= n,
            (Self::MinItems(n), E::ArrayFinished { count }) => count >= n,
            (Self::MaxItems(n), E::ArrayItem { count }) => count <= n,
            (Self::MinProperties(n), E::MapFinished { count, .. }) => count >= n,
            (Self::MaxProperties(n), E::MapEntry { count }) => count <= n,
            (Self::MinKeyLength(n), E::MapKey(key)) => key.len() >= *n,
            (Self::MaxKeyLength(n), E::MapKey(key)) => key.len() <= *n,
            (Self::AllowedKeys(keys), E::MapKey(key)) => contains_str(keys, key),
            (Self::ForbiddenKeys(keys), E::MapKey(key)) => !contains_str(keys, key),
            (Self::RequiredKeys(keys), E::MapFinished { required_seen, .. }) => {
                let want = if keys.len() >= 64 {
                    u64::MAX
                } else {
                    (1u64 << keys.len()) - 1
                };
                required_seen & want == want
            }
            (Self::Constant(c), E::Bool(b)) => matches!(c, Constant::Bool(x) if x == b),
            (Self::Constant(c), E::Number(v)) => number_equals(*v, *c),
            (Self::Constant(c), E::StringFinished { text, .. }) => {
                matches!(c, Constant::Str(s) if s == text)
            }
            (Self::EnumValues(values), E::StringFinished { text, .. }) => {
                contains_str(values, text)
            }
            (Self::RequiredFields(names), E::ObjectFinished { seen, schema }) => names
                .iter()
                .all(|name| schema.position(name).map_or(true, |i| seen.contains(i))),
            (Self::NotRequiredFields(names), E::ObjectFinished { seen, schema }) => {
                schema.fields.iter().enumerate().all(|(i, f)| {
                    f.is_excluded() || contains_str(names, f.name) || seen.contains(i)
                })
            }
            (Self::ForbiddenFields(names), E::ExcessField(Some(key))) => !contains_str(names, key),
            (Self::Custom { check, .. }, event) => match event.observed() {
                Some(observed) => (check.0)(observed),
                None => true,
            },
            _ => true,
        };
        if pass {
            Ok(())
        } else {
            Err(self.error_kind())
        }
    }

    const fn error_kind(&self) -> SchemaError {
        match self {
            Self::Range { .. } => SchemaError::NumberOutOfRange,
            Self::MinLength(_) | Self::MaxLength(_) => SchemaError::StringLengthOutOfRange,
            Self::MinItems(_) | Self::MaxItems(_) => SchemaError::ArrayItemsCountOutOfRange,
            Self::MinProperties(_) | Self::MaxProperties(_) => {
                SchemaError::MapPropertiesCountOutOfRange
            }
            Self::MinKeyLength(_) | Self::MaxKeyLength(_) => SchemaError::MapKeyLengthOutOfRange,
            Self::AllowedKeys(_) => SchemaError::MapKeyNotAllowed,
            Self::ForbiddenKeys(_) => SchemaError::MapKeyForbidden,
            Self::RequiredKeys(_) => SchemaError::MapMissingRequiredKey,
            Self::Constant(_) | Self::EnumValues(_) => SchemaError::WrongConstantValue,
            Self::RequiredFields(_) | Self::NotRequiredFields(_) => {
                SchemaError::MissingRequiredFields
            }
            Self::ForbiddenFields(_) => SchemaError::ForbiddenField,
            Self::Custom { .. } => SchemaError::UserValidatorFailed,
        }
    }
}

/// A parsing hook point.
#[derive(Debug, Clone, Copy)]
pub enum Event<'a> {
    /// A boolean was parsed.
    Bool(bool),
    /// A number was parsed.
    Number(NumberValue),
    /// Part of a string was parsed; `len` is the running byte length.
    StringChunk {
        /// Bytes seen so far.
        len: usize,
    },
    /// A string was fully parsed.
    StringFinished {
        /// Stored text.
        text: &'a str,
        /// True length on the wire.
        len: usize,
    },
    /// An array item is about to be stored; `count` includes it.
    ArrayItem {
        /// Running item count.
        count: usize,
    },
    /// An array was fully parsed.
    ArrayFinished {
        /// Final item count.
        count: usize,
    },
    /// A textual map key was parsed.
    MapKey(&'a str),
    /// A map entry was stored; `count` includes it.
    MapEntry {
        /// Running entry count.
        count: usize,
    },
    /// A map was fully parsed.
    MapFinished {
        /// Final entry count.
        count: usize,
        /// Bitmask of `required_keys` entries seen (see [`mark_required_key`]).
        required_seen: u64,
    },
    /// An object was fully parsed.
    ObjectFinished {
        /// Fields present on the wire.
        seen: &'a FieldSet,
        /// The object's schema.
        schema: &'static ObjectSchema,
    },
    /// An unknown key was encountered; `None` for integer keys.
    ExcessField(Option<&'a str>),
}

impl<'a> Event<'a> {
    fn observed(&self) -> Option<Observed<'a>> {
        match *self {
            Self::Bool(b) => Some(Observed::Bool(b)),
            Self::Number(v) => Some(Observed::Number(v)),
            Self::StringFinished { text, .. } => Some(Observed::String(text)),
            Self::ArrayFinished { count } | Self::MapFinished { count, .. } => {
                Some(Observed::Count(count))
            }
            Self::ObjectFinished { seen, .. } => Some(Observed::Count(seen.len())),
            _ => None,
        }
    }
}

/// Dispatch `event` to every validator in `decorations`.
///
/// Validator positions are reported as `base` plus the index among the list's validators.
///
/// # Errors
///
/// Returns the first rejecting validator.
pub fn run(
    decorations: Decorations,
    base: usize,
    event: &Event<'_>,
) -> Result<(), ValidationFailure> {
    for (i, v) in decorations.validators().enumerate() {
        if let Err(kind) = v.check(event) {
            return Err(ValidationFailure::new(kind, base + i, v.name()));
        }
    }
    Ok(())
}

/// Record `key` in `mask` if it is listed by a `required_keys` validator.
pub fn mark_required_key(decorations: Decorations, key: &str, mask: &mut u64) {
    for v in decorations.validators() {
        if let Validator::RequiredKeys(keys) = v {
            if let Some(bit) = keys.iter().position(|k| *k == key) {
                *mask |= 1u64 << bit;
            }
        }
    }
}

/// Per-call accumulator; holds at most one failure.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ValidationContext {
    failure: Option<ValidationFailure>,
}

impl ValidationContext {
    /// Empty context.
    #[must_use]
    pub const fn new() -> Self {
        Self { failure: None }
    }

    /// Run field decorations then type decorations; record and report the first failure.
    pub fn check(&mut self, field: Decorations, own: Decorations, event: &Event<'_>) -> bool {
        let outcome = run(field, 0, event).and_then(|()| run(own, field.validator_count(), event));
        match outcome {
            Ok(()) => true,
            Err(failure) => {
                self.record(failure);
                false
            }
        }
    }

    /// Record a failure unless one is already held.
    pub fn record(&mut self, failure: ValidationFailure) {
        if self.failure.is_none() {
            self.failure = Some(failure);
        }
    }

    /// The recorded failure.
    #[must_use]
    pub const fn failure(&self) -> Option<ValidationFailure> {
        self.failure
    }
}

fn exact_cmp(value: NumberValue, limit: Limit) -> Option<core::cmp::Ordering> {
    let wide = match value {
        NumberValue::Unsigned(u) => i128::from(u),
        NumberValue::Signed(i) => i128::from(i),
        _ => return None,
    };
    let bound = match limit {
        Limit::Int(i) => i128::from(i),
        Limit::Uint(u) => i128::from(u),
        Limit::Float(_) => return None,
    };
    Some(wide.cmp(&bound))
}

#[allow(clippy::cast_precision_loss)]
fn limit_f64(limit: Limit) -> f64 {
    match limit {
        Limit::Int(i) => i as f64,
        Limit::Uint(u) => u as f64,
        Limit::Float(f) => f,
    }
}

fn below(value: NumberValue, limit: Limit) -> bool {
    exact_cmp(value, limit).map_or_else(
        || {
            let v = value.as_f64();
            v.is_nan() || v < limit_f64(limit)
        },
        core::cmp::Ordering::is_lt,
    )
}

fn above(value: NumberValue, limit: Limit) -> bool {
    exact_cmp(value, limit).map_or_else(
        || {
            let v = value.as_f64();
            v.is_nan() || v > limit_f64(limit)
        },
        core::cmp::Ordering::is_gt,
    )
}

fn number_equals(value: NumberValue, constant: Constant) -> bool {
    let limit = match constant {
        Constant::Int(i) => Limit::Int(i),
        Constant::Uint(u) => Limit::Uint(u),
        Constant::Float(f) => Limit::Float(f),
        Constant::Bool(_) | Constant::Str(_) => return false,
    };
    if let Some(ord) = exact_cmp(value, limit) {
        return ord.is_eq();
    }
    let (a, b) = (value.as_f64(), limit_f64(limit));
    let epsilon = match value {
        NumberValue::F32(_) => f64::from(f32::EPSILON),
        _ => f64::EPSILON,
    };
    let scale = a.abs().max(b.abs()).max(1.0);
    (a - b).abs() <= epsilon * 4.0 * scale
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::decor::Decoration;

    const RANGE: Decorations = Decorations::new(&[Decoration::Validate(Validator::Range {
        min: Limit::Int(1),
        max: Limit::Int(8),
    })]);

    #[test]
    fn range_is_inclusive() {
        for ok in [1u64, 8] {
            assert!(run(RANGE, 0, &Event::Number(NumberValue::Unsigned(ok))).is_ok());
        }
        for bad in [0u64, 9] {
            let err = run(RANGE, 0, &Event::Number(NumberValue::Unsigned(bad))).unwrap_err();
            assert_eq!(err.kind, SchemaError::NumberOutOfRange);
            assert_eq!(err.name, "range");
        }
        assert!(run(RANGE, 0, &Event::Number(NumberValue::Signed(-1))).is_err());
        assert!(run(RANGE, 0, &Event::Number(NumberValue::F64(f64::NAN))).is_err());
    }

    #[test]
    fn float_constants_use_relative_epsilon() {
        assert!(number_equals(NumberValue::F64(0.1 + 0.2), Constant::Float(0.3)));
        assert!(!number_equals(NumberValue::F64(0.31), Constant::Float(0.3)));
        assert!(number_equals(NumberValue::F32(0.3), Constant::Float(0.3)));
        assert!(number_equals(NumberValue::Unsigned(7), Constant::Int(7)));
    }

    #[test]
    fn context_keeps_first_failure() {
        let mut ctx = ValidationContext::new();
        ctx.record(ValidationFailure::new(SchemaError::NumberOutOfRange, 0, "range"));
        ctx.record(ValidationFailure::new(SchemaError::MapKeyForbidden, 3, "forbidden_keys"));
        assert_eq!(ctx.failure().map(|f| f.validator), Some(0));
    }
}
