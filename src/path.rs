//! Structural path tracking.
//!
//! The engine pushes one [`PathElement`] when it descends into a child and pops it on the way
//! out. On failure the path is left as it was at the failing node, so the error carries the
//! exact route from the document root.

use core::fmt;

use arrayvec::{ArrayString, ArrayVec};

#[cfg(feature = "alloc")]
use alloc::vec::Vec;

/// Number of path elements stored without allocating.
///
/// Without the `alloc` feature this is also the deepest shape the engine accepts; deeper or
/// self-referential shapes fail to compile.
pub const INLINE_PATH_DEPTH: usize = 16;

/// Bytes of a dynamic map key retained in a path element.
pub const INLINE_KEY_BYTES: usize = 32;

/// A dynamic map key copied into inline storage, truncated on a character boundary.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct InlineKey {
    text: ArrayString<INLINE_KEY_BYTES>,
    truncated: bool,
}

impl InlineKey {
    /// Copy `key`, keeping at most [`INLINE_KEY_BYTES`] bytes.
    #[must_use]
    pub fn new(key: &str) -> Self {
        let mut end = key.len().min(INLINE_KEY_BYTES);
        while !key.is_char_boundary(end) {
            end -= 1;
        }
        let mut text = ArrayString::new();
        // `end` never exceeds the capacity, so this cannot fail.
        let _ = text.try_push_str(&key[..end]);
        Self {
            text,
            truncated: end < key.len(),
        }
    }

    /// The retained key text.
    #[inline]
    #[must_use]
    pub fn as_str(&self) -> &str {
        self.text.as_str()
    }

    /// Whether the original key was longer than the retained text.
    #[inline]
    #[must_use]
    pub const fn is_truncated(&self) -> bool {
        self.truncated
    }
}

/// One step of a [`Path`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PathElement {
    /// Position inside an array.
    Index(usize),
    /// A declared object field (borrowed from static schema data).
    Field(&'static str),
    /// A textual map key.
    Key(InlineKey),
    /// An integer map key.
    IndexKey(u64),
}

/// Route from the document root to a node.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Path {
    inline: ArrayVec<PathElement, INLINE_PATH_DEPTH>,
    #[cfg(feature = "alloc")]
    overflow: Vec<PathElement>,
    depth: usize,
}

impl Default for Path {
    fn default() -> Self {
        Self::new()
    }
}

impl Path {
    /// The empty (root) path.
    #[must_use]
    pub const fn new() -> Self {
        Self {
            inline: ArrayVec::new_const(),
            #[cfg(feature = "alloc")]
            overflow: Vec::new(),
            depth: 0,
        }
    }

    /// Logical nesting depth, including elements that could not be stored.
    #[inline]
    #[must_use]
    pub const fn depth(&self) -> usize {
        self.depth
    }

    /// Returns true at the document root.
    #[inline]
    #[must_use]
    pub const fn is_empty(&self) -> bool {
        self.depth == 0
    }

    /// Enter an array element.
    pub fn push_index(&mut self, index: usize) {
        self.push(PathElement::Index(index));
    }

    /// Enter a declared object field.
    pub fn push_field(&mut self, name: &'static str) {
        self.push(PathElement::Field(name));
    }

    /// Enter a map value under a textual key.
    pub fn push_key(&mut self, key: &str) {
        self.push(PathElement::Key(InlineKey::new(key)));
    }

    /// Enter a map value under an integer key.
    pub fn push_index_key(&mut self, key: u64) {
        self.push(PathElement::IndexKey(key));
    }

    fn push(&mut self, element: PathElement) {
        self.depth += 1;
        #[cfg(feature = "alloc")]
        {
            if !self.overflow.is_empty() || self.inline.is_full() {
                if self.overflow.try_reserve(1).is_ok() {
                    self.overflow.push(element);
                }
                return;
            }
        }
        let _ = self.inline.try_push(element);
    }

    /// Leave the current element.
    pub fn pop(&mut self) {
        if self.depth == 0 {
            return;
        }
        let stored = self.stored_len();
        self.depth -= 1;
        if stored > self.depth {
            #[cfg(feature = "alloc")]
            {
                if self.overflow.pop().is_some() {
                    return;
                }
            }
            self.inline.pop();
        }
    }

    /// The innermost element, if it was stored.
    #[must_use]
    pub fn current(&self) -> Option<&PathElement> {
        if self.stored_len() < self.depth {
            return None;
        }
        #[cfg(feature = "alloc")]
        {
            if let Some(last) = self.overflow.last() {
                return Some(last);
            }
        }
        self.inline.last()
    }

    /// Stored elements from the root outwards.
    pub fn elements(&self) -> impl Iterator<Item = &PathElement> + '_ {
        let head = self.inline.iter();
        #[cfg(feature = "alloc")]
        {
            head.chain(self.overflow.iter())
        }
        #[cfg(not(feature = "alloc"))]
        {
            head
        }
    }

    fn stored_len(&self) -> usize {
        #[cfg(feature = "alloc")]
        {
            self.inline.len() + self.overflow.len()
        }
        #[cfg(not(feature = "alloc"))]
        {
            self.inline.len()
        }
    }
}

impl fmt::Display for Path {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("$")?;
        for element in self.elements() {
            match element {
                PathElement::Index(i) => write!(f, "[{i}]")?,
                PathElement::Field(name) => write!(f, ".{name}")?,
                PathElement::Key(key) => {
                    write!(f, ".{}", key.as_str())?;
                    if key.is_truncated() {
                        f.write_str("...")?;
                    }
                }
                PathElement::IndexKey(k) => write!(f, "[{k}]")?,
            }
        }
        if self.stored_len() < self.depth {
            f.write_str("...")?;
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn renders_root_and_nested_steps() {
        let mut path = Path::new();
        assert_eq!(path.to_string(), "$");
        path.push_field("a");
        path.push_index(0);
        path.push_field("b");
        assert_eq!(path.to_string(), "$.a[0].b");
        path.pop();
        path.pop();
        path.push_key("dyn");
        assert_eq!(path.to_string(), "$.a.dyn");
        assert_eq!(path.current(), Some(&PathElement::Key(InlineKey::new("dyn"))));
    }

    #[test]
    fn long_keys_truncate_on_char_boundary() {
        let key = "é".repeat(20);
        let inline = InlineKey::new(&key);
        assert!(inline.is_truncated());
        assert_eq!(inline.as_str().len(), INLINE_KEY_BYTES);
    }

    #[cfg(feature = "alloc")]
    #[test]
    fn grows_past_inline_capacity() {
        let mut path = Path::new();
        for i in 0..(INLINE_PATH_DEPTH + 4) {
            path.push_index(i);
        }
        assert_eq!(path.depth(), INLINE_PATH_DEPTH + 4);
        assert_eq!(path.current(), Some(&PathElement::Index(INLINE_PATH_DEPTH + 3)));
        for _ in 0..5 {
            path.pop();
        }
        assert_eq!(path.current(), Some(&PathElement::Index(INLINE_PATH_DEPTH - 2)));
    }
}
