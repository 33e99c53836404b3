//! Field and type decorations.
//!
//! A [`Decorations`] value is a `'static` list stored beside each field's metadata (and once
//! per object type). It is built in `const` context by `#[derive(Model)]` or `shape!`, and
//! [`Decorations::new`] rejects contradictory lists at compile time.

use crate::validate::{Constant, Limit, Validator};

/// Field-matching strategy for an object's textual keys.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MatcherKind {
    /// Narrow the candidate range byte by byte.
    Incremental,
    /// Buffer the whole key, then binary search.
    Buffered,
}

/// A single decoration.
#[derive(Debug, Clone, Copy)]
pub enum Decoration {
    /// Wire name differs from the declared name.
    Rename(&'static str),
    /// Integer wire key.
    Key(u64),
    /// The field must be present on parse.
    Required,
    /// The field may be absent; when null it is omitted on serialize.
    NotRequired,
    /// Parse and discard the wire value.
    Skip,
    /// Never read or written.
    Exclude,
    /// Object is carried positionally as an array.
    AsArray,
    /// Unknown keys are skipped instead of rejected.
    AllowExcessFields,
    /// Object fields are keyed by integer.
    IndexesAsKeys,
    /// Null fields and map values are omitted on serialize.
    SkipNulls,
    /// Key-matching strategy.
    Matcher(MatcherKind),
    /// Fixed number of fractional digits for floats.
    FloatDecimals(u8),
    /// Decorations applied to each array element.
    Items(Decorations),
    /// Decorations applied to each map value.
    Values(Decorations),
    /// A validator.
    Validate(Validator),
}

/// Discriminant of a [`Decoration`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[repr(u8)]
pub enum DecorationKind {
    /// [`Decoration::Rename`].
    Rename,
    /// [`Decoration::Key`].
    Key,
    /// [`Decoration::Required`].
    Required,
    /// [`Decoration::NotRequired`].
    NotRequired,
    /// [`Decoration::Skip`].
    Skip,
    /// [`Decoration::Exclude`].
    Exclude,
    /// [`Decoration::AsArray`].
    AsArray,
    /// [`Decoration::AllowExcessFields`].
    AllowExcessFields,
    /// [`Decoration::IndexesAsKeys`].
    IndexesAsKeys,
    /// [`Decoration::SkipNulls`].
    SkipNulls,
    /// [`Decoration::Matcher`].
    Matcher,
    /// [`Decoration::FloatDecimals`].
    FloatDecimals,
    /// [`Decoration::Items`].
    Items,
    /// [`Decoration::Values`].
    Values,
    /// [`Decoration::Validate`]; the only kind that may repeat.
    Validate,
}

impl Decoration {
    /// The decoration's kind.
    #[must_use]
    pub const fn kind(&self) -> DecorationKind {
        match self {
            Self::Rename(_) => DecorationKind::Rename,
            Self::Key(_) => DecorationKind::Key,
            Self::Required => DecorationKind::Required,
            Self::NotRequired => DecorationKind::NotRequired,
            Self::Skip => DecorationKind::Skip,
            Self::Exclude => DecorationKind::Exclude,
            Self::AsArray => DecorationKind::AsArray,
            Self::AllowExcessFields => DecorationKind::AllowExcessFields,
            Self::IndexesAsKeys => DecorationKind::IndexesAsKeys,
            Self::SkipNulls => DecorationKind::SkipNulls,
            Self::Matcher(_) => DecorationKind::Matcher,
            Self::FloatDecimals(_) => DecorationKind::FloatDecimals,
            Self::Items(_) => DecorationKind::Items,
            Self::Values(_) => DecorationKind::Values,
            Self::Validate(_) => DecorationKind::Validate,
        }
    }
}

/// An ordered, immutable decoration list.
#[derive(Debug, Clone, Copy)]
pub struct Decorations(&'static [Decoration]);

impl Default for Decorations {
    fn default() -> Self {
        Self::NONE
    }
}

impl Decorations {
    /// The empty list.
    pub const NONE: Self = Self(&[]);

    /// Wrap a list after checking it for contradictions.
    ///
    /// # Panics
    ///
    /// Panics (at compile time when used in a `const`) if a non-validator kind repeats, if
    /// `required` and `not_required` or `skip` and `exclude` are combined, if both
    /// `allowed_keys` and `forbidden_keys` are given, if `required_keys` are not a subset of
    /// `allowed_keys`, if a lower bound exceeds its upper bound, or if a float bound or float
    /// constant is NaN or infinite.
    #[must_use]
    pub const fn new(list: &'static [Decoration]) -> Self {
        verify(list);
        Self(list)
    }

    /// The raw list.
    #[must_use]
    pub const fn as_slice(self) -> &'static [Decoration] {
        self.0
    }

    /// Returns true if a decoration of `kind` is present.
    #[must_use]
    pub const fn has(self, kind: DecorationKind) -> bool {
        self.get(kind).is_some()
    }

    /// The first decoration of `kind`.
    #[must_use]
    pub const fn get(self, kind: DecorationKind) -> Option<&'static Decoration> {
        let mut i = 0;
        while i < self.0.len() {
            if self.0[i].kind() as u8 == kind as u8 {
                return Some(&self.0[i]);
            }
            i += 1;
        }
        None
    }

    /// Validators in declaration order.
    pub fn validators(self) -> impl Iterator<Item = &'static Validator> {
        self.0.iter().filter_map(|d| match d {
            Decoration::Validate(v) => Some(v),
            _ => None,
        })
    }

    /// Number of validators in the list.
    #[must_use]
    pub const fn validator_count(self) -> usize {
        let mut n = 0;
        let mut i = 0;
        while i < self.0.len() {
            if let Decoration::Validate(_) = self.0[i] {
                n += 1;
            }
            i += 1;
        }
        n
    }

    /// Wire name override.
    #[must_use]
    pub const fn rename(self) -> Option<&'static str> {
        match self.get(DecorationKind::Rename) {
            Some(Decoration::Rename(name)) => Some(*name),
            _ => None,
        }
    }

    /// Integer wire key.
    #[must_use]
    pub const fn key(self) -> Option<u64> {
        match self.get(DecorationKind::Key) {
            Some(Decoration::Key(k)) => Some(*k),
            _ => None,
        }
    }

    /// Element decorations for arrays.
    #[must_use]
    pub const fn items(self) -> Self {
        match self.get(DecorationKind::Items) {
            Some(Decoration::Items(d)) => *d,
            _ => Self::NONE,
        }
    }

    /// Value decorations for maps.
    #[must_use]
    pub const fn values(self) -> Self {
        match self.get(DecorationKind::Values) {
            Some(Decoration::Values(d)) => *d,
            _ => Self::NONE,
        }
    }

    /// Fixed fractional digits for floats.
    #[must_use]
    pub const fn float_decimals(self) -> Option<u8> {
        match self.get(DecorationKind::FloatDecimals) {
            Some(Decoration::FloatDecimals(n)) => Some(*n),
            _ => None,
        }
    }

    /// Requested matcher strategy.
    #[must_use]
    pub const fn matcher(self) -> Option<MatcherKind> {
        match self.get(DecorationKind::Matcher) {
            Some(Decoration::Matcher(m)) => Some(*m),
            _ => None,
        }
    }

    /// Tightest `max_length` bound.
    #[must_use]
    pub fn max_length(self) -> Option<usize> {
        self.tightest(|v| match v {
            Validator::MaxLength(n) => Some(*n),
            _ => None,
        })
    }

    /// Tightest `max_items` bound.
    #[must_use]
    pub fn max_items(self) -> Option<usize> {
        self.tightest(|v| match v {
            Validator::MaxItems(n) => Some(*n),
            _ => None,
        })
    }

    /// Tightest `max_properties` bound.
    #[must_use]
    pub fn max_properties(self) -> Option<usize> {
        self.tightest(|v| match v {
            Validator::MaxProperties(n) => Some(*n),
            _ => None,
        })
    }

    fn tightest(self, pick: impl Fn(&Validator) -> Option<usize>) -> Option<usize> {
        self.validators().filter_map(pick).min()
    }
}

const fn str_eq(a: &str, b: &str) -> bool {
    let (a, b) = (a.as_bytes(), b.as_bytes());
    if a.len() != b.len() {
        return false;
    }
    let mut i = 0;
    while i < a.len() {
        if a[i] != b[i] {
            return false;
        }
        i += 1;
    }
    true
}

pub(crate) const fn contains_str(list: &[&str], needle: &str) -> bool {
    let mut i = 0;
    while i < list.len() {
        if str_eq(list[i], needle) {
            return true;
        }
        i += 1;
    }
    false
}

const fn bounds_ok(min: Option<usize>, max: Option<usize>) -> bool {
    match (min, max) {
        (Some(lo), Some(hi)) => lo <= hi,
        _ => true,
    }
}

#[derive(Clone, Copy)]
struct Bounds {
    min_length: Option<usize>,
    max_length: Option<usize>,
    min_items: Option<usize>,
    max_items: Option<usize>,
    min_properties: Option<usize>,
    max_properties: Option<usize>,
    min_key_length: Option<usize>,
    max_key_length: Option<usize>,
    allowed: Option<&'static [&'static str]>,
    forbidden: bool,
    required: Option<&'static [&'static str]>,
}

const fn verify(list: &'static [Decoration]) {
    let mut b = Bounds {
        min_length: None,
        max_length: None,
        min_items: None,
        max_items: None,
        min_properties: None,
        max_properties: None,
        min_key_length: None,
        max_key_length: None,
        allowed: None,
        forbidden: false,
        required: None,
    };
    let mut i = 0;
    while i < list.len() {
        let kind = list[i].kind() as u8;
        if kind != DecorationKind::Validate as u8 {
            let mut j = i + 1;
            while j < list.len() {
                assert!(
                    list[j].kind() as u8 != kind,
                    "decoration applied twice to the same item"
                );
                j += 1;
            }
        }
        if let Decoration::Validate(v) = &list[i] {
            match v {
                Validator::MinLength(n) => b.min_length = Some(*n),
                Validator::MaxLength(n) => b.max_length = Some(*n),
                Validator::MinItems(n) => b.min_items = Some(*n),
                Validator::MaxItems(n) => b.max_items = Some(*n),
                Validator::MinProperties(n) => b.min_properties = Some(*n),
                Validator::MaxProperties(n) => b.max_properties = Some(*n),
                Validator::MinKeyLength(n) => b.min_key_length = Some(*n),
                Validator::MaxKeyLength(n) => b.max_key_length = Some(*n),
                Validator::AllowedKeys(keys) => b.allowed = Some(*keys),
                Validator::ForbiddenKeys(_) => b.forbidden = true,
                Validator::RequiredKeys(keys) => {
                    assert!(keys.len() <= 64, "at most 64 required keys are supported");
                    b.required = Some(*keys);
                }
                Validator::Range { min, max } => {
                    assert!(
                        limit_is_finite(*min) && limit_is_finite(*max),
                        "range bounds must be finite"
                    );
                    assert!(range_ordered(*min, *max), "range minimum exceeds maximum");
                }
                Validator::Constant(Constant::Float(v)) => {
                    assert!(v.is_finite(), "float constant must be finite");
                }
                _ => {}
            }
        }
        i += 1;
    }

    assert!(
        !(has_kind(list, DecorationKind::Required) && has_kind(list, DecorationKind::NotRequired)),
        "`required` and `not_required` are mutually exclusive"
    );
    assert!(
        !(has_kind(list, DecorationKind::Skip) && has_kind(list, DecorationKind::Exclude)),
        "`skip` and `exclude` are mutually exclusive"
    );
    assert!(bounds_ok(b.min_length, b.max_length), "min_length exceeds max_length");
    assert!(bounds_ok(b.min_items, b.max_items), "min_items exceeds max_items");
    assert!(
        bounds_ok(b.min_properties, b.max_properties),
        "min_properties exceeds max_properties"
    );
    assert!(
        bounds_ok(b.min_key_length, b.max_key_length),
        "min_key_length exceeds max_key_length"
    );
    assert!(
        !(b.allowed.is_some() && b.forbidden),
        "`allowed_keys` and `forbidden_keys` are mutually exclusive"
    );
    if let (Some(allowed), Some(required)) = (b.allowed, b.required) {
        let mut k = 0;
        while k < required.len() {
            assert!(
                contains_str(allowed, required[k]),
                "`required_keys` must be a subset of `allowed_keys`"
            );
            k += 1;
        }
    }
}

const fn limit_is_finite(limit: Limit) -> bool {
    match limit {
        Limit::Float(v) => v.is_finite(),
        Limit::Int(_) | Limit::Uint(_) => true,
    }
}

#[allow(clippy::cast_precision_loss, clippy::cast_sign_loss)]
const fn range_ordered(min: Limit, max: Limit) -> bool {
    match (min, max) {
        (Limit::Int(lo), Limit::Int(hi)) => lo <= hi,
        (Limit::Uint(lo), Limit::Uint(hi)) => lo <= hi,
        (Limit::Int(lo), Limit::Uint(hi)) => lo < 0 || (lo as u64) <= hi,
        (Limit::Uint(lo), Limit::Int(hi)) => hi >= 0 && lo <= hi as u64,
        (Limit::Float(lo), Limit::Float(hi)) => lo <= hi,
        (Limit::Float(lo), Limit::Int(hi)) => lo <= hi as f64,
        (Limit::Float(lo), Limit::Uint(hi)) => lo <= hi as f64,
        (Limit::Int(lo), Limit::Float(hi)) => lo as f64 <= hi,
        (Limit::Uint(lo), Limit::Float(hi)) => lo as f64 <= hi,
    }
}

const fn has_kind(list: &[Decoration], kind: DecorationKind) -> bool {
    let mut i = 0;
    while i < list.len() {
        if list[i].kind() as u8 == kind as u8 {
            return true;
        }
        i += 1;
    }
    false
}

#[cfg(test)]
mod tests {
    use super::*;

    const FIELD: Decorations = Decorations::new(&[
        Decoration::Rename("id"),
        Decoration::Validate(Validator::Range {
            min: Limit::Int(1),
            max: Limit::Int(8),
        }),
        Decoration::Validate(Validator::MaxLength(4)),
        Decoration::Validate(Validator::MaxLength(2)),
    ]);

    #[test]
    fn query_by_kind() {
        assert!(FIELD.has(DecorationKind::Rename));
        assert!(!FIELD.has(DecorationKind::Skip));
        assert_eq!(FIELD.rename(), Some("id"));
        assert_eq!(FIELD.validator_count(), 3);
        assert_eq!(FIELD.max_length(), Some(2));
        assert!(Decorations::NONE.items().as_slice().is_empty());
    }

    #[test]
    fn range_bounds_are_checked_across_kinds() {
        assert!(range_ordered(Limit::Int(-1), Limit::Uint(0)));
        assert!(!range_ordered(Limit::Uint(5), Limit::Int(4)));
        assert!(range_ordered(Limit::Float(-0.5), Limit::Int(0)));
        assert!(!range_ordered(Limit::Float(2.5), Limit::Float(2.0)));
        assert!(limit_is_finite(Limit::Float(1.0e300)));
        assert!(!limit_is_finite(Limit::Float(f64::NAN)));
        assert!(!limit_is_finite(Limit::Float(f64::NEG_INFINITY)));
    }

    #[test]
    #[should_panic(expected = "float constant must be finite")]
    fn nan_constant_is_rejected() {
        static LIST: [Decoration; 1] = [Decoration::Validate(Validator::Constant(Constant::Float(f64::NAN)))];
        let _ = Decorations::new(&LIST);
    }

    #[test]
    #[should_panic(expected = "range bounds must be finite")]
    fn infinite_range_bound_is_rejected() {
        static LIST: [Decoration; 1] = [Decoration::Validate(Validator::Range {
            min: Limit::Float(0.0),
            max: Limit::Float(f64::INFINITY),
        })];
        let _ = Decorations::new(&LIST);
    }

    #[test]
    #[should_panic(expected = "range minimum exceeds maximum")]
    fn inverted_float_range_is_rejected() {
        static LIST: [Decoration; 1] = [Decoration::Validate(Validator::Range {
            min: Limit::Float(1.5),
            max: Limit::Float(-1.5),
        })];
        let _ = Decorations::new(&LIST);
    }

    #[test]
    fn const_string_helpers() {
        assert!(contains_str(&["a", "bc"], "bc"));
        assert!(!contains_str(&["a", "bc"], "b"));
    }
}
