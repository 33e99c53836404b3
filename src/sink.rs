//! Raw wire capture.
//!
//! A field typed as a wire sink is not decoded: the parser copies the bytes of the value
//! verbatim and records which format they are in. Serializing writes them back unchanged,
//! which is only possible into a writer of the same format.

use arrayvec::ArrayVec;

#[cfg(feature = "alloc")]
use crate::alloc_util::try_extend_bounded;
#[cfg(feature = "alloc")]
use alloc::vec::Vec;

use crate::reader::WireFormat;
use crate::schema::{Category, Model, NodeMut, NodeRef};

/// Storage for captured wire bytes.
pub trait WireSink {
    /// Drop previous content and start a capture in `format`.
    fn begin(&mut self, format: WireFormat);
    /// Append bytes; `false` if they do not fit.
    fn write(&mut self, bytes: &[u8]) -> bool;
    /// The captured bytes.
    fn data(&self) -> &[u8];
    /// Format of the captured bytes, `None` if nothing was captured.
    fn format(&self) -> Option<WireFormat>;
    /// Largest capture this sink accepts.
    fn max_size(&self) -> usize;
    /// Bytes held.
    fn current_size(&self) -> usize {
        self.data().len()
    }
    /// Drop content and format.
    fn clear(&mut self);
}

/// Fixed-capacity capture of at most `N` bytes.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RawSink<const N: usize> {
    buf: ArrayVec<u8, N>,
    format: Option<WireFormat>,
}

impl<const N: usize> RawSink<N> {
    /// Empty sink.
    #[must_use]
    pub const fn new() -> Self {
        Self {
            buf: ArrayVec::new_const(),
            format: None,
        }
    }

    /// Sink holding pre-encoded `bytes`, or `None` if they exceed `N`.
    #[must_use]
    pub fn from_wire(format: WireFormat, bytes: &[u8]) -> Option<Self> {
        let mut sink = Self::new();
        sink.begin(format);
        sink.write(bytes).then_some(sink)
    }

    /// The captured bytes.
    #[must_use]
    pub fn as_bytes(&self) -> &[u8] {
        &self.buf
    }
}

impl<const N: usize> WireSink for RawSink<N> {
    fn begin(&mut self, format: WireFormat) {
        self.buf.clear();
        self.format = Some(format);
    }

    fn write(&mut self, bytes: &[u8]) -> bool {
        self.buf.try_extend_from_slice(bytes).is_ok()
    }

    fn data(&self) -> &[u8] {
        &self.buf
    }

    fn format(&self) -> Option<WireFormat> {
        self.format
    }

    fn max_size(&self) -> usize {
        N
    }

    fn clear(&mut self) {
        self.buf.clear();
        self.format = None;
    }
}

impl<const N: usize> Model for RawSink<N> {
    const CATEGORY: Category = Category::WireSink;

    fn node_mut(&mut self) -> NodeMut<'_> {
        NodeMut::WireSink(self)
    }

    fn node(&self) -> NodeRef<'_> {
        NodeRef::WireSink(self)
    }
}

/// Growable capture bounded to `MAX` bytes.
#[cfg(feature = "alloc")]
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RawBuf<const MAX: usize = { usize::MAX }> {
    buf: Vec<u8>,
    format: Option<WireFormat>,
}

#[cfg(feature = "alloc")]
impl<const MAX: usize> RawBuf<MAX> {
    /// Empty buffer.
    #[must_use]
    pub const fn new() -> Self {
        Self {
            buf: Vec::new(),
            format: None,
        }
    }

    /// Buffer holding pre-encoded `bytes`, or `None` if they exceed `MAX`.
    #[must_use]
    pub fn from_wire(format: WireFormat, bytes: &[u8]) -> Option<Self> {
        let mut sink = Self::new();
        sink.begin(format);
        sink.write(bytes).then_some(sink)
    }

    /// The captured bytes.
    #[must_use]
    pub fn as_bytes(&self) -> &[u8] {
        &self.buf
    }

    /// Take the captured bytes.
    #[must_use]
    pub fn into_vec(self) -> Vec<u8> {
        self.buf
    }
}

#[cfg(feature = "alloc")]
impl<const MAX: usize> WireSink for RawBuf<MAX> {
    fn begin(&mut self, format: WireFormat) {
        self.buf.clear();
        self.format = Some(format);
    }

    fn write(&mut self, bytes: &[u8]) -> bool {
        try_extend_bounded(&mut self.buf, bytes, MAX)
    }

    fn data(&self) -> &[u8] {
        &self.buf
    }

    fn format(&self) -> Option<WireFormat> {
        self.format
    }

    fn max_size(&self) -> usize {
        MAX
    }

    fn clear(&mut self) {
        self.buf.clear();
        self.format = None;
    }
}

#[cfg(feature = "alloc")]
impl<const MAX: usize> Model for RawBuf<MAX> {
    const CATEGORY: Category = Category::WireSink;

    fn node_mut(&mut self) -> NodeMut<'_> {
        NodeMut::WireSink(self)
    }

    fn node(&self) -> NodeRef<'_> {
        NodeRef::WireSink(self)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn fixed_sink_refuses_oversized_captures() {
        let mut sink = RawSink::<4>::new();
        sink.begin(WireFormat::Json);
        assert!(sink.write(b"[1,"));
        assert!(!sink.write(b"2]"));
        assert_eq!(sink.current_size(), 3);
        assert_eq!(sink.format(), Some(WireFormat::Json));
        sink.clear();
        assert_eq!(sink.format(), None);
        assert!(RawSink::<2>::from_wire(WireFormat::Cbor, &[0x83, 1, 2, 3]).is_none());
    }

    #[test]
    fn growable_sink_respects_its_bound() {
        let mut sink = RawBuf::<5>::new();
        sink.begin(WireFormat::Cbor);
        assert!(sink.write(&[0x83, 1, 2, 3]));
        assert!(!sink.write(&[0, 0]));
        assert_eq!(sink.max_size(), 5);
        let unbounded = RawBuf::<{ usize::MAX }>::from_wire(WireFormat::Json, b"{}").unwrap();
        assert_eq!(unbounded.as_bytes(), b"{}");
    }
}
