//! Streaming adapters.
//!
//! A [`Consumer`] receives array elements one at a time while they are parsed, and a
//! [`Producer`] generates them while they are written, so arrays of any length pass through
//! a bounded amount of memory. [`EntryConsumer`] and [`EntryProducer`] do the same for maps.
//!
//! The adapters ([`Consume`], [`Produce`], [`ConsumeEntries`], [`ProduceEntries`]) are what a
//! model embeds; they classify as [`Category::Streamer`]. Consumers are parse-only and
//! producers are serialize-only: using one in the other direction fails with a data
//! consumer or producer error.

use core::cell::RefCell;
use core::fmt;
use core::marker::PhantomData;

use crate::cursor::{
    ArraySink, ArraySource, EntryStatus, Halt, KeyMut, KeyRef, MapKey, MapSink, MapSource,
    SlotError, SourceError,
};
use crate::schema::{Category, Depth, Model, NodeMut, NodeRef};

/// A producer failed to generate the next element.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct StreamError;

/// Receives parsed array elements.
pub trait Consumer {
    /// Element model.
    type Item: Model + Default;

    /// Take one element. Returns `false` to stop with a data consumer error.
    fn consume(&mut self, item: &Self::Item) -> bool;

    /// Called once after the last element, or after a failure with `success == false`.
    /// Returns `false` to fail the parse.
    fn finalize(&mut self, success: bool) -> bool {
        let _ = success;
        true
    }

    /// Called before the first element.
    fn reset(&mut self) {}
}

/// Generates array elements for serialization.
pub trait Producer {
    /// Element model.
    type Item: Model;

    /// The next element, `None` at the end.
    ///
    /// # Errors
    ///
    /// [`StreamError`] aborts serialization with a data producer error.
    fn read(&mut self) -> Result<Option<Self::Item>, StreamError>;

    /// Called before the first element.
    fn reset(&mut self) {}
}

/// Receives parsed map entries.
pub trait EntryConsumer {
    /// Key type.
    type Key: MapKey + Default;
    /// Value model.
    type Value: Model + Default;

    /// Take one entry. Returns `false` to stop with a data consumer error.
    fn consume(&mut self, key: &Self::Key, value: &Self::Value) -> bool;

    /// Called once at the end; see [`Consumer::finalize`].
    fn finalize(&mut self, success: bool) -> bool {
        let _ = success;
        true
    }

    /// Called before the first entry.
    fn reset(&mut self) {}
}

/// Generates map entries for serialization.
pub trait EntryProducer {
    /// Key type.
    type Key: MapKey;
    /// Value model.
    type Value: Model;

    /// The next entry, `None` at the end.
    ///
    /// # Errors
    ///
    /// [`StreamError`] aborts serialization with a data producer error.
    fn read(&mut self) -> Result<Option<(Self::Key, Self::Value)>, StreamError>;

    /// Called before the first entry.
    fn reset(&mut self) {}
}

/// Binds a [`Consumer`] to a wire array.
#[derive(Debug, Clone, Default)]
pub struct Consume<C: Consumer> {
    /// The consumer.
    pub consumer: C,
    item: C::Item,
}

impl<C: Consumer> Consume<C> {
    /// Wrap a consumer.
    pub fn new(consumer: C) -> Self {
        Self {
            consumer,
            item: C::Item::default(),
        }
    }

    /// Unwrap the consumer.
    pub fn into_inner(self) -> C {
        self.consumer
    }
}

impl<C: Consumer> ArraySink for Consume<C> {
    fn reset(&mut self) {
        self.consumer.reset();
    }

    fn allocate_slot(&mut self, _index: usize) -> Result<NodeMut<'_>, SlotError> {
        self.item = C::Item::default();
        Ok(self.item.node_mut())
    }

    fn finalize_item(&mut self, ok: bool) -> bool {
        !ok || self.consumer.consume(&self.item)
    }

    fn finalize(&mut self, success: bool) -> bool {
        self.consumer.finalize(success)
    }
}

impl<C: Consumer> ArraySource for Consume<C> {
    fn len_hint(&self) -> Option<usize> {
        None
    }

    fn for_each_item(
        &self,
        _f: &mut dyn FnMut(NodeRef<'_>) -> Result<(), Halt>,
    ) -> Result<(), SourceError> {
        Err(SourceError::Failed)
    }
}

impl<C: Consumer> Model for Consume<C> {
    const CATEGORY: Category = Category::Streamer;
    const DEPTH: Depth = <C::Item as Model>::DEPTH.nested();

    fn node_mut(&mut self) -> NodeMut<'_> {
        NodeMut::Array(self)
    }

    fn node(&self) -> NodeRef<'_> {
        NodeRef::Array(self)
    }
}

/// Binds a [`Producer`] to a wire array of unknown length.
#[derive(Default)]
pub struct Produce<P: Producer> {
    producer: RefCell<P>,
}

impl<P: Producer> Produce<P> {
    /// Wrap a producer.
    pub const fn new(producer: P) -> Self {
        Self {
            producer: RefCell::new(producer),
        }
    }

    /// Unwrap the producer.
    pub fn into_inner(self) -> P {
        self.producer.into_inner()
    }
}

impl<P: Producer + fmt::Debug> fmt::Debug for Produce<P> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Produce").field("producer", &self.producer).finish()
    }
}

impl<P: Producer> ArraySource for Produce<P> {
    fn len_hint(&self) -> Option<usize> {
        None
    }

    fn for_each_item(
        &self,
        f: &mut dyn FnMut(NodeRef<'_>) -> Result<(), Halt>,
    ) -> Result<(), SourceError> {
        let mut producer = self.producer.try_borrow_mut().map_err(|_| SourceError::Failed)?;
        producer.reset();
        loop {
            match producer.read() {
                Ok(Some(item)) => f(item.node())?,
                Ok(None) => return Ok(()),
                Err(StreamError) => return Err(SourceError::Failed),
            }
        }
    }
}

impl<P: Producer> ArraySink for Produce<P> {
    fn reset(&mut self) {}

    fn allocate_slot(&mut self, _index: usize) -> Result<NodeMut<'_>, SlotError> {
        Err(SlotError::Rejected)
    }
}

impl<P: Producer> Model for Produce<P> {
    const CATEGORY: Category = Category::Streamer;
    const DEPTH: Depth = <P::Item as Model>::DEPTH.nested();

    fn node_mut(&mut self) -> NodeMut<'_> {
        NodeMut::Array(self)
    }

    fn node(&self) -> NodeRef<'_> {
        NodeRef::Array(self)
    }
}

/// Binds an [`EntryConsumer`] to a wire map.
///
/// Entries are handed over as they arrive; duplicate keys are not detected.
#[derive(Debug, Clone, Default)]
pub struct ConsumeEntries<C: EntryConsumer> {
    /// The consumer.
    pub consumer: C,
}

impl<C: EntryConsumer> ConsumeEntries<C> {
    /// Wrap a consumer.
    pub const fn new(consumer: C) -> Self {
        Self { consumer }
    }
}

impl<C: EntryConsumer> MapSink for ConsumeEntries<C> {
    fn reset(&mut self) {
        self.consumer.reset();
    }

    fn parse_entry(
        &mut self,
        f: &mut dyn FnMut(KeyMut<'_>, NodeMut<'_>) -> Result<(), Halt>,
    ) -> Result<EntryStatus, Halt> {
        let mut key = C::Key::default();
        let mut value = C::Value::default();
        f(key.key_mut(), value.node_mut())?;
        Ok(if self.consumer.consume(&key, &value) {
            EntryStatus::Inserted
        } else {
            EntryStatus::Rejected
        })
    }

    fn finalize(&mut self, success: bool) -> bool {
        self.consumer.finalize(success)
    }
}

impl<C: EntryConsumer> MapSource for ConsumeEntries<C> {
    fn len_hint(&self) -> Option<usize> {
        None
    }

    fn for_each_entry(
        &self,
        _f: &mut dyn FnMut(KeyRef<'_>, NodeRef<'_>) -> Result<(), Halt>,
    ) -> Result<(), SourceError> {
        Err(SourceError::Failed)
    }
}

impl<C: EntryConsumer> Model for ConsumeEntries<C> {
    const CATEGORY: Category = Category::Streamer;
    const DEPTH: Depth = <C::Value as Model>::DEPTH.nested();

    fn node_mut(&mut self) -> NodeMut<'_> {
        NodeMut::Map(self)
    }

    fn node(&self) -> NodeRef<'_> {
        NodeRef::Map(self)
    }
}

/// Binds an [`EntryProducer`] to a wire map of unknown length.
#[derive(Default)]
pub struct ProduceEntries<P: EntryProducer> {
    producer: RefCell<P>,
}

impl<P: EntryProducer> ProduceEntries<P> {
    /// Wrap a producer.
    pub const fn new(producer: P) -> Self {
        Self {
            producer: RefCell::new(producer),
        }
    }
}

impl<P: EntryProducer + fmt::Debug> fmt::Debug for ProduceEntries<P> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ProduceEntries")
            .field("producer", &self.producer)
            .finish()
    }
}

impl<P: EntryProducer> MapSource for ProduceEntries<P> {
    fn len_hint(&self) -> Option<usize> {
        None
    }

    fn for_each_entry(
        &self,
        f: &mut dyn FnMut(KeyRef<'_>, NodeRef<'_>) -> Result<(), Halt>,
    ) -> Result<(), SourceError> {
        let mut producer = self.producer.try_borrow_mut().map_err(|_| SourceError::Failed)?;
        producer.reset();
        loop {
            match producer.read() {
                Ok(Some((key, value))) => f(key.key_ref(), value.node())?,
                Ok(None) => return Ok(()),
                Err(StreamError) => return Err(SourceError::Failed),
            }
        }
    }
}

impl<P: EntryProducer> MapSink for ProduceEntries<P> {
    fn reset(&mut self) {}

    fn parse_entry(
        &mut self,
        _f: &mut dyn FnMut(KeyMut<'_>, NodeMut<'_>) -> Result<(), Halt>,
    ) -> Result<EntryStatus, Halt> {
        Ok(EntryStatus::Rejected)
    }
}

impl<P: EntryProducer> Model for ProduceEntries<P> {
    const CATEGORY: Category = Category::Streamer;
    const DEPTH: Depth = <P::Value as Model>::DEPTH.nested();

    fn node_mut(&mut self) -> NodeMut<'_> {
        NodeMut::Map(self)
    }

    fn node(&self) -> NodeRef<'_> {
        NodeRef::Map(self)
    }
}

/// Counts elements and records how the stream ended.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Counting<T> {
    /// Elements consumed since the last reset.
    pub count: usize,
    /// The `success` flag of the final call, if it happened.
    pub finalized: Option<bool>,
    _item: PhantomData<fn() -> T>,
}

impl<T> Default for Counting<T> {
    fn default() -> Self {
        Self {
            count: 0,
            finalized: None,
            _item: PhantomData,
        }
    }
}

impl<T: Model + Default> Consumer for Counting<T> {
    type Item = T;

    fn consume(&mut self, _item: &T) -> bool {
        self.count += 1;
        true
    }

    fn finalize(&mut self, success: bool) -> bool {
        self.finalized = Some(success);
        true
    }

    fn reset(&mut self) {
        self.count = 0;
        self.finalized = None;
    }
}

/// A [`Consumer`] backed by a closure.
pub struct ConsumeWith<T, F> {
    f: F,
    _item: PhantomData<fn(&T)>,
}

impl<T, F: FnMut(&T) -> bool> ConsumeWith<T, F> {
    /// Consume with `f`; returning `false` from `f` stops the parse.
    pub const fn new(f: F) -> Self {
        Self {
            f,
            _item: PhantomData,
        }
    }
}

impl<T, F> fmt::Debug for ConsumeWith<T, F> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("ConsumeWith(..)")
    }
}

impl<T: Model + Default, F: FnMut(&T) -> bool> Consumer for ConsumeWith<T, F> {
    type Item = T;

    fn consume(&mut self, item: &T) -> bool {
        (self.f)(item)
    }
}

/// A [`Producer`] over an iterator. The iterator is not rewound by `reset`.
#[derive(Debug, Clone)]
pub struct FromIter<I>(pub I);

impl<I> Producer for FromIter<I>
where
    I: Iterator,
    I::Item: Model,
{
    type Item = I::Item;

    fn read(&mut self) -> Result<Option<I::Item>, StreamError> {
        Ok(self.0.next())
    }
}
