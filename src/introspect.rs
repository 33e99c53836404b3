//! Object introspection.
//!
//! Every object type exposes a `'static` [`ObjectSchema`]: its fields in declaration order
//! ([`FieldInfo`]), their wire keys, the key-sorted lookup order used by the matcher, and the
//! type-level decorations. The tables are built in `const` context, either by
//! `#[derive(Model)]` or by the [`shape!`](crate::shape) macro for hand-listed types.

use crate::decor::{DecorationKind, Decorations, MatcherKind};
use crate::schema::{Category, Model, NodeMut, NodeRef};
use crate::validate::Validator;

/// Maximum number of fields in one object.
pub const MAX_FIELDS: usize = 256;

/// Longest textual key the buffered matcher can hold.
pub const MATCH_BUFFER: usize = 64;

/// How a field is keyed on the wire.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum WireKey {
    /// Textual key.
    Name(&'static str),
    /// Integer key.
    Index(u64),
}

/// Static description of one field.
#[derive(Debug, Clone, Copy)]
pub struct FieldInfo {
    /// Declared (Rust) name.
    pub name: &'static str,
    /// Declared type, as written.
    pub type_name: &'static str,
    /// Category of the declared type.
    pub category: Category,
    /// Whether the declared type accepts `null`.
    pub nullable: bool,
    /// Wire key.
    pub key: WireKey,
    /// Field decorations.
    pub decorations: Decorations,
}

impl FieldInfo {
    /// Describe a field of type `T`.
    #[must_use]
    pub const fn of<T: Model + ?Sized>(
        name: &'static str,
        type_name: &'static str,
        key: WireKey,
        decorations: Decorations,
    ) -> Self {
        Self {
            name,
            type_name,
            category: T::CATEGORY,
            nullable: T::NULLABLE,
            key,
            decorations,
        }
    }

    /// Never on the wire.
    #[must_use]
    pub const fn is_excluded(&self) -> bool {
        self.decorations.has(DecorationKind::Exclude)
    }

    /// Parsed and discarded.
    #[must_use]
    pub const fn is_skipped(&self) -> bool {
        self.decorations.has(DecorationKind::Skip)
    }

    /// Name used in paths and messages: the wire name, or the declared name for integer keys.
    #[must_use]
    pub const fn wire_name(&self) -> &'static str {
        match self.key {
            WireKey::Name(n) => n,
            WireKey::Index(_) => self.name,
        }
    }
}

/// How an object's keys are carried.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Keying {
    /// Textual keys.
    Names,
    /// Integer keys.
    Indexes,
}

/// A fixed 256-bit set of field indexes.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct FieldSet([u64; 4]);

impl FieldSet {
    /// The empty set.
    #[must_use]
    pub const fn new() -> Self {
        Self([0; 4])
    }

    /// A copy with `index` added.
    #[must_use]
    pub const fn with(self, index: usize) -> Self {
        let mut words = self.0;
        words[index / 64] |= 1 << (index % 64);
        Self(words)
    }

    /// Add `index`.
    pub fn insert(&mut self, index: usize) {
        self.0[index / 64] |= 1 << (index % 64);
    }

    /// Membership test.
    #[must_use]
    pub const fn contains(&self, index: usize) -> bool {
        index < MAX_FIELDS && self.0[index / 64] & (1 << (index % 64)) != 0
    }

    /// Number of members.
    #[must_use]
    pub const fn len(&self) -> usize {
        (self.0[0].count_ones() + self.0[1].count_ones() + self.0[2].count_ones() + self.0[3].count_ones())
            as usize
    }

    /// Returns true if no index is present.
    #[must_use]
    pub const fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// First index of `other` that is not in `self`.
    #[must_use]
    pub fn first_missing(&self, other: &Self) -> Option<usize> {
        (0..MAX_FIELDS).find(|&i| other.contains(i) && !self.contains(i))
    }
}

/// Static description of an object type.
#[derive(Debug, Clone, Copy)]
pub struct ObjectSchema {
    /// Type name.
    pub name: &'static str,
    /// Fields in declaration order.
    pub fields: &'static [FieldInfo],
    /// Field indexes sorted by wire key; excluded fields last.
    pub order: &'static [u16],
    /// Type-level decorations.
    pub decorations: Decorations,
    /// Textual or integer keys.
    pub keying: Keying,
    /// Number of fields that appear on the wire.
    pub wire_fields: usize,
    /// Longest textual wire key.
    pub max_name_len: usize,
    /// Key-matching strategy.
    pub matcher: MatcherKind,
    /// Fields marked `required`.
    pub required: FieldSet,
}

impl ObjectSchema {
    /// Assemble and check a schema.
    ///
    /// # Panics
    ///
    /// Panics (at compile time in a `const`) on more than [`MAX_FIELDS`] fields, on mixed
    /// textual and integer keys, when a buffered matcher cannot hold the longest key, or when
    /// `required_fields`/`not_required_fields`/`forbidden_fields` name an unknown field.
    #[must_use]
    pub const fn new(
        name: &'static str,
        fields: &'static [FieldInfo],
        order: &'static [u16],
        decorations: Decorations,
    ) -> Self {
        assert!(fields.len() <= MAX_FIELDS, "too many fields in one object");
        assert!(order.len() == fields.len(), "field order does not cover every field");

        let mut keying = if decorations.has(DecorationKind::IndexesAsKeys) {
            Keying::Indexes
        } else {
            Keying::Names
        };
        let mut i = 0;
        while i < fields.len() {
            if let WireKey::Index(_) = fields[i].key {
                keying = Keying::Indexes;
            }
            i += 1;
        }

        let mut wire_fields = 0;
        let mut max_name_len = 0;
        let mut required = FieldSet::new();
        let mut i = 0;
        while i < fields.len() {
            let f = &fields[i];
            if !f.is_excluded() {
                wire_fields += 1;
                match (keying, f.key) {
                    (Keying::Names, WireKey::Name(n)) => {
                        if n.len() > max_name_len {
                            max_name_len = n.len();
                        }
                    }
                    (Keying::Indexes, WireKey::Index(_)) => {}
                    _ => panic!("fields of one object must all use names or all use integer keys"),
                }
            }
            if f.decorations.has(DecorationKind::Required) {
                required = required.with(i);
            }
            i += 1;
        }

        let matcher = match decorations.matcher() {
            Some(m) => m,
            None => MatcherKind::Incremental,
        };
        if let MatcherKind::Buffered = matcher {
            assert!(
                max_name_len <= MATCH_BUFFER,
                "field name too long for the buffered matcher"
            );
        }

        let list = decorations.as_slice();
        let mut i = 0;
        while i < list.len() {
            if let crate::decor::Decoration::Validate(v) = &list[i] {
                match v {
                    Validator::RequiredFields(names) | Validator::NotRequiredFields(names) => {
                        let mut k = 0;
                        while k < names.len() {
                            assert!(
                                declared_position(fields, names[k]).is_some(),
                                "required/not_required field list names an unknown field"
                            );
                            k += 1;
                        }
                    }
                    Validator::ForbiddenFields(names) => {
                        let mut k = 0;
                        while k < names.len() {
                            assert!(
                                !contains_wire_name(fields, names[k]),
                                "forbidden_fields names a declared field"
                            );
                            k += 1;
                        }
                    }
                    _ => {}
                }
            }
            i += 1;
        }

        Self {
            name,
            fields,
            order,
            decorations,
            keying,
            wire_fields,
            max_name_len,
            matcher,
            required,
        }
    }

    /// Declaration index of the field with declared name `name`.
    #[must_use]
    pub const fn position(&self, name: &str) -> Option<usize> {
        declared_position(self.fields, name)
    }

    /// Declaration index of the field keyed by integer `key`.
    #[must_use]
    pub fn index_position(&self, key: u64) -> Option<usize> {
        let slot = self.order[..self.wire_fields].binary_search_by(|&i| match self.fields[usize::from(i)].key {
            WireKey::Index(k) => k.cmp(&key),
            WireKey::Name(_) => core::cmp::Ordering::Less,
        });
        slot.ok().map(|s| usize::from(self.order[s]))
    }

    /// Whether the type-level decorations contain `kind`.
    #[must_use]
    pub const fn has(&self, kind: DecorationKind) -> bool {
        self.decorations.has(kind)
    }
}

const fn bytes_cmp(a: &[u8], b: &[u8]) -> i32 {
    let mut i = 0;
    while i < a.len() && i < b.len() {
        if a[i] != b[i] {
            return if a[i] < b[i] { -1 } else { 1 };
        }
        i += 1;
    }
    if a.len() < b.len() {
        -1
    } else if a.len() > b.len() {
        1
    } else {
        0
    }
}

const fn declared_position(fields: &[FieldInfo], name: &str) -> Option<usize> {
    let mut i = 0;
    while i < fields.len() {
        if bytes_cmp(fields[i].name.as_bytes(), name.as_bytes()) == 0 {
            return Some(i);
        }
        i += 1;
    }
    None
}

const fn contains_wire_name(fields: &[FieldInfo], name: &str) -> bool {
    let mut i = 0;
    while i < fields.len() {
        if let WireKey::Name(n) = fields[i].key {
            if !fields[i].is_excluded() && bytes_cmp(n.as_bytes(), name.as_bytes()) == 0 {
                return true;
            }
        }
        i += 1;
    }
    false
}

const fn key_cmp(a: &FieldInfo, b: &FieldInfo) -> i32 {
    match (a.is_excluded(), b.is_excluded()) {
        (false, true) => return -1,
        (true, false) => return 1,
        (true, true) => return 0,
        (false, false) => {}
    }
    match (a.key, b.key) {
        (WireKey::Name(x), WireKey::Name(y)) => bytes_cmp(x.as_bytes(), y.as_bytes()),
        (WireKey::Index(x), WireKey::Index(y)) => {
            if x < y {
                -1
            } else if x > y {
                1
            } else {
                0
            }
        }
        (WireKey::Index(_), WireKey::Name(_)) => -1,
        (WireKey::Name(_), WireKey::Index(_)) => 1,
    }
}

/// Field indexes sorted by wire key, excluded fields last.
///
/// # Panics
///
/// Panics (at compile time in a `const`) if `N != fields.len()` or two wire fields share a key.
#[must_use]
#[allow(clippy::cast_possible_truncation)]
pub const fn sorted_order<const N: usize>(fields: &[FieldInfo]) -> [u16; N] {
    assert!(N == fields.len(), "field order length mismatch");
    assert!(N <= MAX_FIELDS, "too many fields in one object");
    let mut order = [0u16; N];
    let mut i = 0;
    while i < N {
        order[i] = i as u16;
        i += 1;
    }
    // insertion sort; stable and const-friendly
    let mut i = 1;
    while i < N {
        let mut j = i;
        while j > 0 && key_cmp(&fields[order[j - 1] as usize], &fields[order[j] as usize]) > 0 {
            let t = order[j - 1];
            order[j - 1] = order[j];
            order[j] = t;
            j -= 1;
        }
        i += 1;
    }
    let mut i = 1;
    while i < N {
        let prev = &fields[order[i - 1] as usize];
        let cur = &fields[order[i] as usize];
        if !cur.is_excluded() {
            assert!(key_cmp(prev, cur) != 0, "two fields share one wire key");
        }
        i += 1;
    }
    order
}

/// Assign integer keys on an integer-keyed field list.
///
/// The list is integer-keyed when `decorations` has `indexes_as_keys` or any field carries an
/// explicit integer key. Fields without one take the previous key plus one, starting at zero;
/// excluded fields still take a key. Other lists are returned unchanged.
///
/// # Panics
///
/// Panics (at compile time in a `const`) if a field of an integer-keyed list was renamed.
#[must_use]
pub const fn number_fields<const N: usize>(
    mut fields: [FieldInfo; N],
    decorations: Decorations,
) -> [FieldInfo; N] {
    let mut indexed = decorations.has(DecorationKind::IndexesAsKeys);
    let mut i = 0;
    while i < N {
        if let WireKey::Index(_) = fields[i].key {
            indexed = true;
        }
        i += 1;
    }
    if !indexed {
        return fields;
    }
    let mut next = 0u64;
    let mut i = 0;
    while i < N {
        match fields[i].key {
            WireKey::Index(k) => next = k.saturating_add(1),
            WireKey::Name(n) => {
                assert!(
                    bytes_cmp(n.as_bytes(), fields[i].name.as_bytes()) == 0,
                    "a renamed field cannot be part of an integer-keyed object"
                );
                fields[i].key = WireKey::Index(next);
                next = next.saturating_add(1);
            }
        }
        i += 1;
    }
    fields
}

/// A statically described object type.
pub trait Shape: Model {
    /// Type name.
    const NAME: &'static str;
    /// Fields in declaration order.
    const FIELDS: &'static [FieldInfo];
    /// Field indexes sorted by wire key.
    const ORDER: &'static [u16];
    /// Type-level decorations.
    const DECORATIONS: Decorations = Decorations::NONE;
    /// The assembled schema.
    const SCHEMA: &'static ObjectSchema;
}

/// Parse-side object accessor.
pub trait ObjectSlot {
    /// The object's schema.
    fn schema(&self) -> &'static ObjectSchema;
    /// Storage of field `index` (declaration order), or `None` if it has no accessor.
    fn field_mut(&mut self, index: usize) -> Option<NodeMut<'_>>;
}

/// Serialize-side object accessor.
pub trait ObjectView {
    /// The object's schema.
    fn schema(&self) -> &'static ObjectSchema;
    /// Value of field `index` (declaration order), or `None` if it has no accessor.
    fn field(&self, index: usize) -> Option<NodeRef<'_>>;
}

/// Number of declared fields of `T`.
#[must_use]
pub const fn field_count<T: Shape + ?Sized>() -> usize {
    T::FIELDS.len()
}

/// Metadata of field `index` of `T`.
#[must_use]
pub const fn field_at<T: Shape + ?Sized>(index: usize) -> Option<&'static FieldInfo> {
    if index < T::FIELDS.len() {
        Some(&T::FIELDS[index])
    } else {
        None
    }
}

/// Implement [`Model`] and [`Shape`] for a struct from an explicit field list.
///
/// Each entry is `field: Type`, optionally followed by `as "wire_name"` or `= integer_key`,
/// and a bracketed decoration list. Type-level decorations follow the type name.
///
/// Integer keys follow [`number_fields`]: once the type has `Decoration::IndexesAsKeys` or
/// one field has `= integer_key`, unkeyed fields count up from the previous key.
///
/// ```
/// use shapewire::{shape, Decoration, Limit, Validator};
///
/// #[derive(Default)]
/// pub struct Motor {
///     pub id: u8,
///     pub label: String,
/// }
///
/// shape! {
///     Motor [Decoration::AllowExcessFields] {
///         id: u8 as "motor_id" [Decoration::Validate(Validator::Range {
///             min: Limit::Int(1),
///             max: Limit::Int(8),
///         })],
///         label: String,
///     }
/// }
///
/// assert_eq!(shapewire::field_count::<Motor>(), 2);
/// ```
///
/// Self-referential types are not supported here; use `#[derive(Model)]` with
/// `#[wire(recursive)]`.
#[macro_export]
macro_rules! shape {
    (
        $ty:ident $( [ $($tdeco:expr),* $(,)? ] )? {
            $( $field:ident : $fty:ty $( as $name:literal )? $( = $index:literal )?
                $( [ $($deco:expr),* $(,)? ] )? ),* $(,)?
        }
    ) => {
        impl $crate::Model for $ty {
            const CATEGORY: $crate::Category = $crate::Category::Object;
            const DEPTH: $crate::Depth = $crate::Depth::SCALAR
                $( .max(<$fty as $crate::Model>::DEPTH) )*
                .nested();

            fn node_mut(&mut self) -> $crate::NodeMut<'_> {
                $crate::NodeMut::Object(self)
            }

            fn node(&self) -> $crate::NodeRef<'_> {
                $crate::NodeRef::Object(self)
            }
        }

        impl $crate::Shape for $ty {
            const NAME: &'static str = stringify!($ty);
            const FIELDS: &'static [$crate::FieldInfo] = {
                $(
                    #[allow(non_upper_case_globals)]
                    const $field: &[$crate::Decoration] = &[ $( $($deco),* )? ];
                )*
                &$crate::introspect::number_fields::<
                    { <[()]>::len(&[ $( $crate::shape!(@unit $field) ),* ]) }
                >(
                    [ $(
                        $crate::FieldInfo::of::<$fty>(
                            stringify!($field),
                            stringify!($fty),
                            $crate::shape!(@key $field [$($name)?] [$($index)?]),
                            $crate::Decorations::new($field),
                        )
                    ),* ],
                    <$ty as $crate::Shape>::DECORATIONS,
                )
            };
            const ORDER: &'static [u16] = &$crate::introspect::sorted_order::<
                { <[()]>::len(&[ $( $crate::shape!(@unit $field) ),* ]) }
            >(<Self as $crate::Shape>::FIELDS);
            const DECORATIONS: $crate::Decorations = {
                const TYPE_DECORATIONS: &[$crate::Decoration] = &[ $( $($tdeco),* )? ];
                $crate::Decorations::new(TYPE_DECORATIONS)
            };
            const SCHEMA: &'static $crate::ObjectSchema = &$crate::ObjectSchema::new(
                <Self as $crate::Shape>::NAME,
                <Self as $crate::Shape>::FIELDS,
                <Self as $crate::Shape>::ORDER,
                <Self as $crate::Shape>::DECORATIONS,
            );
        }

        impl $crate::ObjectSlot for $ty {
            fn schema(&self) -> &'static $crate::ObjectSchema {
                <Self as $crate::Shape>::SCHEMA
            }

            #[allow(unused_assignments)]
            fn field_mut(&mut self, index: usize) -> Option<$crate::NodeMut<'_>> {
                let mut at = 0usize;
                $(
                    if at == index {
                        return Some($crate::Model::node_mut(&mut self.$field));
                    }
                    at += 1;
                )*
                None
            }
        }

        impl $crate::ObjectView for $ty {
            fn schema(&self) -> &'static $crate::ObjectSchema {
                <Self as $crate::Shape>::SCHEMA
            }

            #[allow(unused_assignments)]
            fn field(&self, index: usize) -> Option<$crate::NodeRef<'_>> {
                let mut at = 0usize;
                $(
                    if at == index {
                        return Some($crate::Model::node(&self.$field));
                    }
                    at += 1;
                )*
                None
            }
        }
    };
    (@key $field:ident [] []) => { $crate::WireKey::Name(stringify!($field)) };
    (@key $field:ident [$name:literal] []) => { $crate::WireKey::Name($name) };
    (@key $field:ident [] [$index:literal]) => { $crate::WireKey::Index($index) };
    (@unit $field:ident) => { () };
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::decor::Decoration;
    use crate::validate::Validator;

    const EXCLUDED: Decorations = Decorations::new(&[Decoration::Exclude]);

    fn named(name: &'static str, key: &'static str) -> FieldInfo {
        FieldInfo::of::<u8>(name, "u8", WireKey::Name(key), Decorations::NONE)
    }

    #[test]
    fn field_set_word_boundaries() {
        let set = FieldSet::new().with(0).with(63).with(64).with(255);
        assert_eq!(set.len(), 4);
        for i in [0, 63, 64, 255] {
            assert!(set.contains(i), "missing {i}");
        }
        for i in [1, 62, 65, 127, 128, 254] {
            assert!(!set.contains(i), "unexpected {i}");
        }
        assert!(!set.contains(MAX_FIELDS));

        let mut seen = FieldSet::new();
        seen.insert(0);
        seen.insert(64);
        assert_eq!(seen.first_missing(&set), Some(63));
        seen.insert(63);
        assert_eq!(seen.first_missing(&set), Some(255));
        seen.insert(255);
        assert_eq!(seen.first_missing(&set), None);
        assert!(FieldSet::new().is_empty());
    }

    #[test]
    fn order_sorts_by_key_with_excluded_last() {
        let fields = [
            named("c", "c"),
            FieldInfo::of::<u8>("hidden", "u8", WireKey::Name("hidden"), EXCLUDED),
            named("a", "zz"),
            named("b", "b"),
        ];
        assert_eq!(sorted_order::<4>(&fields), [3, 0, 2, 1]);
    }

    #[test]
    fn excluded_fields_may_share_a_key() {
        let fields = [
            named("a", "x"),
            FieldInfo::of::<u8>("b", "u8", WireKey::Name("x"), EXCLUDED),
        ];
        assert_eq!(sorted_order::<2>(&fields), [0, 1]);
    }

    #[test]
    #[should_panic(expected = "two fields share one wire key")]
    fn duplicate_wire_keys_are_rejected() {
        let fields = [named("a", "id"), named("b", "name"), named("c", "id")];
        let _ = sorted_order::<3>(&fields);
    }

    #[test]
    #[should_panic(expected = "two fields share one wire key")]
    fn duplicate_integer_keys_are_rejected() {
        let fields = [
            FieldInfo::of::<u8>("a", "u8", WireKey::Index(2), Decorations::NONE),
            FieldInfo::of::<u8>("b", "u8", WireKey::Index(2), Decorations::NONE),
        ];
        let _ = sorted_order::<2>(&fields);
    }

    #[test]
    fn numbering_counts_up_from_explicit_keys() {
        let fields = [
            named("a", "a"),
            FieldInfo::of::<u8>("b", "u8", WireKey::Index(5), Decorations::NONE),
            named("c", "c"),
            FieldInfo::of::<u8>("d", "u8", WireKey::Name("d"), EXCLUDED),
            named("e", "e"),
        ];
        let keys = number_fields::<5>(fields, Decorations::NONE).map(|f| f.key);
        assert_eq!(
            keys,
            [
                WireKey::Index(0),
                WireKey::Index(5),
                WireKey::Index(6),
                WireKey::Index(7),
                WireKey::Index(8),
            ]
        );
    }

    #[test]
    fn numbering_leaves_named_objects_alone() {
        let fields = [named("a", "x"), named("b", "b")];
        let keys = number_fields::<2>(fields, Decorations::NONE).map(|f| f.key);
        assert_eq!(keys, [WireKey::Name("x"), WireKey::Name("b")]);

        const INDEXED: Decorations = Decorations::new(&[Decoration::IndexesAsKeys]);
        let fields = [named("a", "a"), named("b", "b")];
        let keys = number_fields::<2>(fields, INDEXED).map(|f| f.key);
        assert_eq!(keys, [WireKey::Index(0), WireKey::Index(1)]);
    }

    #[test]
    #[should_panic(expected = "renamed field")]
    fn renames_are_rejected_on_integer_keys() {
        let fields = [
            FieldInfo::of::<u8>("a", "u8", WireKey::Index(1), Decorations::NONE),
            named("b", "other"),
        ];
        let _ = number_fields::<2>(fields, Decorations::NONE);
    }

    #[derive(Default)]
    struct Reading {
        sensor: u16,
        value: f32,
        note: Option<u8>,
    }

    crate::shape! {
        Reading {
            sensor: u16 = 1,
            value: f32,
            note: Option<u8> [Decoration::NotRequired],
        }
    }

    #[derive(Default)]
    struct Motor {
        id: u8,
        label: u8,
    }

    crate::shape! {
        Motor [Decoration::Validate(Validator::ForbiddenFields(&["secret"]))] {
            id: u8 as "motor_id",
            label: u8,
        }
    }

    #[test]
    fn shape_macro_builds_the_schema() {
        assert_eq!(field_count::<Motor>(), 2);
        let id = field_at::<Motor>(0).unwrap();
        assert_eq!((id.name, id.key), ("id", WireKey::Name("motor_id")));
        assert_eq!(id.wire_name(), "motor_id");
        assert!(field_at::<Motor>(2).is_none());

        let schema = <Motor as Shape>::SCHEMA;
        assert_eq!(schema.keying, Keying::Names);
        assert_eq!(schema.order, &[1, 0]);
        assert_eq!(schema.max_name_len, 8);
        assert_eq!(schema.position("label"), Some(1));
        assert_eq!(schema.position("motor_id"), None);
    }

    #[test]
    fn shape_macro_numbers_integer_keys() {
        let schema = <Reading as Shape>::SCHEMA;
        assert_eq!(schema.keying, Keying::Indexes);
        let keys: [WireKey; 3] = core::array::from_fn(|i| schema.fields[i].key);
        assert_eq!(keys, [WireKey::Index(1), WireKey::Index(2), WireKey::Index(3)]);
        assert_eq!(schema.index_position(2), Some(1));
        assert_eq!(schema.index_position(0), None);
        assert_eq!(schema.fields[2].wire_name(), "note");
        assert!(schema.fields[2].nullable);
    }
}
