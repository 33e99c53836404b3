//! Container cursors.
//!
//! The engine never touches a container directly. Parsing goes through [`ArraySink`] /
//! [`MapSink`] ("allocate the next slot"), serializing through [`ArraySource`] /
//! [`MapSource`] ("visit each element"), so fixed arrays, growable vectors, maps and
//! streaming adapters share one traversal.

use arrayvec::{ArrayString, ArrayVec};

#[cfg(feature = "alloc")]
use alloc::{collections::BTreeMap, string::String, vec::Vec};

use crate::scalar::{NumberSlot, StringSlot};
use crate::schema::{Category, Depth, Model, NodeMut, NodeRef};

/// Marker returned through callbacks once the engine has recorded an error.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Halt;

/// Why a container could not provide another slot.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SlotError {
    /// Capacity exhausted (fixed storage or failed growth).
    Overflow,
    /// A consumer refused to accept more items.
    Rejected,
}

/// Why iteration over a source stopped early.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SourceError {
    /// The engine's callback halted.
    Halted,
    /// The source itself failed (producer error).
    Failed,
}

impl From<Halt> for SourceError {
    fn from(_: Halt) -> Self {
        Self::Halted
    }
}

/// Parse-side array cursor.
pub trait ArraySink {
    /// Prepare for a new array.
    fn reset(&mut self);
    /// Provide storage for item `index`.
    ///
    /// # Errors
    ///
    /// Returns [`SlotError`] when no further item can be stored.
    fn allocate_slot(&mut self, index: usize) -> Result<NodeMut<'_>, SlotError>;
    /// Called after each item; `ok` is false if the item failed. Returns `false` to reject.
    fn finalize_item(&mut self, ok: bool) -> bool {
        let _ = ok;
        true
    }
    /// Called once at the end of the array. Returns `false` to reject.
    fn finalize(&mut self, success: bool) -> bool {
        let _ = success;
        true
    }
}

/// Serialize-side array cursor.
pub trait ArraySource {
    /// Number of items if known up front.
    fn len_hint(&self) -> Option<usize>;
    /// Visit each item in order.
    ///
    /// # Errors
    ///
    /// [`SourceError::Halted`] if `f` halted, [`SourceError::Failed`] if the source failed.
    fn for_each_item(
        &self,
        f: &mut dyn FnMut(NodeRef<'_>) -> Result<(), Halt>,
    ) -> Result<(), SourceError>;
}

/// Parse-side view of a map key.
pub enum KeyMut<'a> {
    /// Text keys.
    Text(&'a mut dyn StringSlot),
    /// Integer keys.
    Index(&'a mut dyn NumberSlot),
}

/// Serialize-side view of a map key.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum KeyRef<'a> {
    /// Text key.
    Text(&'a str),
    /// Integer key.
    Index(u64),
}

/// Types usable as map keys.
pub trait MapKey {
    /// Parse-side view.
    fn key_mut(&mut self) -> KeyMut<'_>;
    /// Serialize-side view.
    fn key_ref(&self) -> KeyRef<'_>;
}

#[cfg(feature = "alloc")]
impl MapKey for String {
    fn key_mut(&mut self) -> KeyMut<'_> {
        KeyMut::Text(self)
    }

    fn key_ref(&self) -> KeyRef<'_> {
        KeyRef::Text(self)
    }
}

impl<const N: usize> MapKey for ArrayString<N> {
    fn key_mut(&mut self) -> KeyMut<'_> {
        KeyMut::Text(self)
    }

    fn key_ref(&self) -> KeyRef<'_> {
        KeyRef::Text(self)
    }
}

macro_rules! index_key {
    ($($t:ty),*) => {$(
        impl MapKey for $t {
            fn key_mut(&mut self) -> KeyMut<'_> {
                KeyMut::Index(self)
            }

            fn key_ref(&self) -> KeyRef<'_> {
                KeyRef::Index(u64::try_from(*self).unwrap_or(u64::MAX))
            }
        }
    )*};
}

index_key!(u8, u16, u32, u64, usize);

/// Outcome of parsing one map entry.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EntryStatus {
    /// The entry was stored.
    Inserted,
    /// The key was already present.
    Duplicate,
    /// Capacity exhausted.
    Overflow,
    /// A consumer refused the entry.
    Rejected,
}

/// Parse-side map cursor.
pub trait MapSink {
    /// Prepare for a new map.
    fn reset(&mut self);
    /// Provide key and value storage to `f`, then commit the entry.
    ///
    /// # Errors
    ///
    /// Propagates [`Halt`] from `f`.
    fn parse_entry(
        &mut self,
        f: &mut dyn FnMut(KeyMut<'_>, NodeMut<'_>) -> Result<(), Halt>,
    ) -> Result<EntryStatus, Halt>;
    /// Called once at the end of the map. Returns `false` to reject.
    fn finalize(&mut self, success: bool) -> bool {
        let _ = success;
        true
    }
}

/// Serialize-side map cursor.
pub trait MapSource {
    /// Number of entries if known up front.
    fn len_hint(&self) -> Option<usize>;
    /// Visit each entry.
    ///
    /// # Errors
    ///
    /// [`SourceError::Halted`] if `f` halted, [`SourceError::Failed`] if the source failed.
    fn for_each_entry(
        &self,
        f: &mut dyn FnMut(KeyRef<'_>, NodeRef<'_>) -> Result<(), Halt>,
    ) -> Result<(), SourceError>;
}

fn visit_items<'a, T: Model + 'a>(
    items: impl Iterator<Item = &'a T>,
    f: &mut dyn FnMut(NodeRef<'_>) -> Result<(), Halt>,
) -> Result<(), SourceError> {
    for item in items {
        f(item.node())?;
    }
    Ok(())
}

impl<T: Model + Default, const N: usize> ArraySink for [T; N] {
    fn reset(&mut self) {}

    fn allocate_slot(&mut self, index: usize) -> Result<NodeMut<'_>, SlotError> {
        let slot = self.get_mut(index).ok_or(SlotError::Overflow)?;
        *slot = T::default();
        Ok(slot.node_mut())
    }
}

impl<T: Model, const N: usize> ArraySource for [T; N] {
    fn len_hint(&self) -> Option<usize> {
        Some(N)
    }

    fn for_each_item(
        &self,
        f: &mut dyn FnMut(NodeRef<'_>) -> Result<(), Halt>,
    ) -> Result<(), SourceError> {
        visit_items(self.iter(), f)
    }
}

impl<T: Model + Default, const N: usize> Model for [T; N] {
    const CATEGORY: Category = Category::Array;
    const DEPTH: Depth = T::DEPTH.nested();

    fn node_mut(&mut self) -> NodeMut<'_> {
        NodeMut::Array(self)
    }

    fn node(&self) -> NodeRef<'_> {
        NodeRef::Array(self)
    }
}

impl<T: Model + Default, const N: usize> ArraySink for ArrayVec<T, N> {
    fn reset(&mut self) {
        self.clear();
    }

    fn allocate_slot(&mut self, _index: usize) -> Result<NodeMut<'_>, SlotError> {
        self.try_push(T::default())
            .map_err(|_| SlotError::Overflow)?;
        let slot = self.last_mut().ok_or(SlotError::Overflow)?;
        Ok(slot.node_mut())
    }
}

impl<T: Model, const N: usize> ArraySource for ArrayVec<T, N> {
    fn len_hint(&self) -> Option<usize> {
        Some(self.len())
    }

    fn for_each_item(
        &self,
        f: &mut dyn FnMut(NodeRef<'_>) -> Result<(), Halt>,
    ) -> Result<(), SourceError> {
        visit_items(self.iter(), f)
    }
}

impl<T: Model + Default, const N: usize> Model for ArrayVec<T, N> {
    const CATEGORY: Category = Category::Array;
    const DEPTH: Depth = T::DEPTH.nested();

    fn node_mut(&mut self) -> NodeMut<'_> {
        NodeMut::Array(self)
    }

    fn node(&self) -> NodeRef<'_> {
        NodeRef::Array(self)
    }
}

#[cfg(feature = "alloc")]
impl<T: Model + Default> ArraySink for Vec<T> {
    fn reset(&mut self) {
        self.clear();
    }

    fn allocate_slot(&mut self, _index: usize) -> Result<NodeMut<'_>, SlotError> {
        self.try_reserve(1).map_err(|_| SlotError::Overflow)?;
        self.push(T::default());
        let slot = self.last_mut().ok_or(SlotError::Overflow)?;
        Ok(slot.node_mut())
    }
}

#[cfg(feature = "alloc")]
impl<T: Model> ArraySource for Vec<T> {
    fn len_hint(&self) -> Option<usize> {
        Some(self.len())
    }

    fn for_each_item(
        &self,
        f: &mut dyn FnMut(NodeRef<'_>) -> Result<(), Halt>,
    ) -> Result<(), SourceError> {
        visit_items(self.iter(), f)
    }
}

#[cfg(feature = "alloc")]
impl<T: Model + Default> Model for Vec<T> {
    const CATEGORY: Category = Category::Array;
    const DEPTH: Depth = T::DEPTH.nested();

    fn node_mut(&mut self) -> NodeMut<'_> {
        NodeMut::Array(self)
    }

    fn node(&self) -> NodeRef<'_> {
        NodeRef::Array(self)
    }
}

#[cfg(feature = "alloc")]
impl<K, V> MapSink for BTreeMap<K, V>
where
    K: MapKey + Ord + Default,
    V: Model + Default,
{
    fn reset(&mut self) {
        self.clear();
    }

    fn parse_entry(
        &mut self,
        f: &mut dyn FnMut(KeyMut<'_>, NodeMut<'_>) -> Result<(), Halt>,
    ) -> Result<EntryStatus, Halt> {
        let mut key = K::default();
        let mut value = V::default();
        f(key.key_mut(), value.node_mut())?;
        if self.contains_key(&key) {
            return Ok(EntryStatus::Duplicate);
        }
        self.insert(key, value);
        Ok(EntryStatus::Inserted)
    }
}

#[cfg(feature = "alloc")]
impl<K: MapKey, V: Model> MapSource for BTreeMap<K, V> {
    fn len_hint(&self) -> Option<usize> {
        Some(self.len())
    }

    fn for_each_entry(
        &self,
        f: &mut dyn FnMut(KeyRef<'_>, NodeRef<'_>) -> Result<(), Halt>,
    ) -> Result<(), SourceError> {
        for (k, v) in self {
            f(k.key_ref(), v.node())?;
        }
        Ok(())
    }
}

#[cfg(feature = "alloc")]
impl<K, V> Model for BTreeMap<K, V>
where
    K: MapKey + Ord + Default,
    V: Model + Default,
{
    const CATEGORY: Category = Category::Map;
    const DEPTH: Depth = V::DEPTH.nested();

    fn node_mut(&mut self) -> NodeMut<'_> {
        NodeMut::Map(self)
    }

    fn node(&self) -> NodeRef<'_> {
        NodeRef::Map(self)
    }
}

#[cfg(feature = "std")]
mod hash {
    use core::hash::{BuildHasher, Hash};
    use std::collections::HashMap;

    use super::{EntryStatus, Halt, KeyMut, KeyRef, MapKey, MapSink, MapSource, SourceError};
    use crate::schema::{Category, Depth, Model, NodeMut, NodeRef};

    impl<K, V, S> MapSink for HashMap<K, V, S>
    where
        K: MapKey + Eq + Hash + Default,
        V: Model + Default,
        S: BuildHasher,
    {
        fn reset(&mut self) {
            self.clear();
        }

        fn parse_entry(
            &mut self,
            f: &mut dyn FnMut(KeyMut<'_>, NodeMut<'_>) -> Result<(), Halt>,
        ) -> Result<EntryStatus, Halt> {
            let mut key = K::default();
            let mut value = V::default();
            f(key.key_mut(), value.node_mut())?;
            if self.contains_key(&key) {
                return Ok(EntryStatus::Duplicate);
            }
            if self.try_reserve(1).is_err() {
                return Ok(EntryStatus::Overflow);
            }
            self.insert(key, value);
            Ok(EntryStatus::Inserted)
        }
    }

    impl<K: MapKey, V: Model, S> MapSource for HashMap<K, V, S> {
        fn len_hint(&self) -> Option<usize> {
            Some(self.len())
        }

        fn for_each_entry(
            &self,
            f: &mut dyn FnMut(KeyRef<'_>, NodeRef<'_>) -> Result<(), Halt>,
        ) -> Result<(), SourceError> {
            for (k, v) in self {
                f(k.key_ref(), v.node())?;
            }
            Ok(())
        }
    }

    impl<K, V, S> Model for HashMap<K, V, S>
    where
        K: MapKey + Eq + Hash + Default,
        V: Model + Default,
        S: BuildHasher,
    {
        const CATEGORY: Category = Category::Map;
        const DEPTH: Depth = V::DEPTH.nested();

        fn node_mut(&mut self) -> NodeMut<'_> {
            NodeMut::Map(self)
        }

        fn node(&self) -> NodeRef<'_> {
            NodeRef::Map(self)
        }
    }
}
