//! The parser engine.
//!
//! A single recursive pass drives a [`Reader`] over the wire document and writes into the
//! target through its [`NodeMut`] views. Validators run at fixed hook points while reading;
//! the first failure stops the pass and is reported together with the wire offset and the
//! path to the failing node.

use arrayvec::ArrayString;

use crate::cursor::{ArraySink, EntryStatus, Halt, KeyMut, MapSink, SlotError};
use crate::decor::{DecorationKind, Decorations};
use crate::error::{Error, ErrorCode, ReadError, SchemaError, ValidationFailure};
use crate::introspect::{FieldSet, Keying, ObjectSchema, ObjectSlot, MATCH_BUFFER};
use crate::limits::ParseOptions;
use crate::matcher::{match_index, FieldMatcher, MatchStatus};
use crate::path::Path;
use crate::reader::{Reader, TokenKind};
use crate::scalar::{NumberSlot, NumberValue, StringSlot};
use crate::schema::{DepthCheck, Model, NodeMut};
use crate::sink::WireSink;
use crate::transform::TransformSlot;
use crate::validate::{mark_required_key, Event, ValidationContext};

/// Scratch space for string chunks.
const CHUNK: usize = 64;

macro_rules! read {
    ($self:ident, $e:expr) => {
        match $e {
            Ok(v) => v,
            Err(e) => return Err($self.read_failed(e)),
        }
    };
}

/// Parse one document from `reader` into `target`.
///
/// # Errors
///
/// Returns the first syntax, structural, capacity or validation error.
pub fn parse_with<R, T>(reader: R, target: &mut T, options: &ParseOptions) -> Result<(), Error>
where
    R: Reader,
    T: Model + ?Sized,
{
    let () = DepthCheck::<T>::FITS;
    log::debug!(
        "parsing {:?} document ({} bytes) into {}",
        R::FORMAT,
        reader.input().len(),
        core::any::type_name::<T>()
    );
    let mut parser = Parser::new(reader, options);
    parser.run(target.node_mut()).map_err(|err| {
        log::debug!("parse failed: {err}");
        err
    })
}

struct Parser<'o, R: Reader> {
    reader: R,
    options: &'o ParseOptions,
    path: Path,
    depth: usize,
    ctx: ValidationContext,
    failure: Option<(ErrorCode, usize)>,
}

impl<'o, R: Reader> Parser<'o, R> {
    fn new(reader: R, options: &'o ParseOptions) -> Self {
        Self {
            reader,
            options,
            path: Path::new(),
            depth: 0,
            ctx: ValidationContext::new(),
            failure: None,
        }
    }

    fn run(&mut self, root: NodeMut<'_>) -> Result<(), Error> {
        let outcome = match self.parse_node(root, Decorations::NONE) {
            Ok(()) => match self.reader.finish() {
                Ok(()) => Ok(()),
                Err(e) => Err(self.read_failed(e)),
            },
            Err(halt) => Err(halt),
        };
        outcome.map_err(|Halt| self.error())
    }

    fn error(&mut self) -> Error {
        let (code, offset) = self
            .failure
            .unwrap_or((ErrorCode::Read(ReadError::UnexpectedSymbol), self.reader.position()));
        let mut err = Error::parse(code, offset);
        if code == ErrorCode::SchemaValidation {
            err.validation = self.ctx.failure();
        }
        err.path = core::mem::take(&mut self.path);
        err
    }

    fn fail(&mut self, code: ErrorCode) -> Halt {
        if self.failure.is_none() {
            self.failure = Some((code, self.reader.position()));
        }
        Halt
    }

    fn read_failed(&mut self, e: ReadError) -> Halt {
        let code = match e {
            ReadError::NumberOutOfRange => ErrorCode::NumberOutOfRange,
            ReadError::SinkOverflow => ErrorCode::FixedSizeContainerOverflow,
            e => ErrorCode::Read(e),
        };
        self.fail(code)
    }

    fn check(&mut self, field: Decorations, own: Decorations, event: &Event<'_>) -> Result<(), Halt> {
        if self.ctx.check(field, own, event) {
            Ok(())
        } else {
            Err(self.fail(ErrorCode::SchemaValidation))
        }
    }

    /// Pop the path unless a failure is being reported through it.
    fn leave(&mut self) {
        if self.failure.is_none() {
            self.path.pop();
        }
    }

    fn enter_container(&mut self) -> Result<(), Halt> {
        self.depth += 1;
        if self.depth > self.options.max_depth {
            return Err(self.fail(ErrorCode::DepthLimitExceeded));
        }
        Ok(())
    }

    fn expect(&mut self, want: TokenKind, mismatch: ErrorCode) -> Result<(), Halt> {
        let kind = read!(self, self.reader.peek_kind());
        if kind == want {
            Ok(())
        } else {
            Err(self.fail(mismatch))
        }
    }

    fn parse_node(&mut self, node: NodeMut<'_>, decos: Decorations) -> Result<(), Halt> {
        match node {
            NodeMut::WireSink(sink) => return self.capture(sink),
            NodeMut::Transformer(slot) => return self.parse_transformer(slot, decos),
            _ => {}
        }
        let is_null = read!(self, self.reader.start_value_and_try_read_null());
        match node {
            NodeMut::Nullable(slot) if is_null => {
                slot.set_null();
                Ok(())
            }
            _ if is_null => Err(self.fail(ErrorCode::NullInNonOptional)),
            node => self.parse_present(node, decos),
        }
    }

    /// Dispatch a value known not to be `null`.
    fn parse_present(&mut self, node: NodeMut<'_>, decos: Decorations) -> Result<(), Halt> {
        match node {
            NodeMut::Bool(slot) => {
                self.expect(TokenKind::Bool, ErrorCode::NonBoolInBool)?;
                let value = read!(self, self.reader.read_bool());
                *slot = value;
                self.check(decos, Decorations::NONE, &Event::Bool(value))
            }
            NodeMut::Number(slot) => self.parse_number(slot, decos),
            NodeMut::String(slot) => self.parse_string(slot, decos),
            NodeMut::Array(sink) => self.parse_array(sink, decos),
            NodeMut::Map(sink) => self.parse_map(sink, decos),
            NodeMut::Object(obj) => self.parse_object(obj, decos),
            NodeMut::Nullable(slot) => self.parse_present(slot.value_mut(), decos),
            NodeMut::Transformer(slot) => self.parse_transformer(slot, decos),
            NodeMut::WireSink(sink) => self.capture(sink),
        }
    }

    fn parse_number(&mut self, slot: &mut dyn NumberSlot, decos: Decorations) -> Result<(), Halt> {
        self.expect(TokenKind::Number, ErrorCode::NonNumericInNumeric)?;
        let value = read!(self, self.reader.read_number(slot.kind()));
        if !slot.store(value) {
            return Err(self.fail(ErrorCode::NumberOutOfRange));
        }
        self.check(decos, Decorations::NONE, &Event::Number(value))
    }

    fn parse_string(&mut self, slot: &mut dyn StringSlot, decos: Decorations) -> Result<(), Halt> {
        self.expect(TokenKind::String, ErrorCode::NonStringInString)?;
        read!(self, self.reader.read_string_begin());
        slot.clear();
        let limit = match (slot.capacity(), decos.max_length()) {
            (Some(cap), Some(max)) => cap.min(max.saturating_add(1)),
            (Some(cap), None) => cap,
            (None, Some(max)) => max.saturating_add(1),
            (None, None) => usize::MAX,
        };
        let mut buf = [0u8; CHUNK];
        let mut len = 0usize;
        let mut overflow = false;
        loop {
            let chunk = read!(self, self.reader.read_string_chunk(&mut buf));
            len += chunk.text.len();
            self.check(decos, Decorations::NONE, &Event::StringChunk { len })?;
            if !overflow && (len > limit || !slot.push_str(chunk.text)) {
                overflow = true;
                if !self.options.consume_overflowing_strings {
                    return Err(self.fail(ErrorCode::FixedSizeContainerOverflow));
                }
            }
            if chunk.done {
                break;
            }
        }
        if overflow {
            return Err(self.fail(ErrorCode::FixedSizeContainerOverflow));
        }
        let event = Event::StringFinished {
            text: slot.as_str(),
            len,
        };
        if self.ctx.check(decos, Decorations::NONE, &event) {
            Ok(())
        } else {
            Err(self.fail(ErrorCode::SchemaValidation))
        }
    }

    fn parse_array(&mut self, sink: &mut dyn ArraySink, decos: Decorations) -> Result<(), Halt> {
        self.expect(TokenKind::Array, ErrorCode::NonArrayInArrayLike)?;
        self.enter_container()?;
        let mut frame = read!(self, self.reader.read_array_begin());
        sink.reset();
        let mut count = 0;
        let mut outcome = self.parse_items(sink, &mut frame, decos, &mut count);
        if outcome.is_ok() {
            outcome = self.check(decos, Decorations::NONE, &Event::ArrayFinished { count });
        }
        let finalized = sink.finalize(outcome.is_ok());
        outcome?;
        if !finalized {
            return Err(self.fail(ErrorCode::DataConsumerError));
        }
        self.depth -= 1;
        Ok(())
    }

    fn parse_items(
        &mut self,
        sink: &mut dyn ArraySink,
        frame: &mut R::ArrayFrame,
        decos: Decorations,
        count: &mut usize,
    ) -> Result<(), Halt> {
        let items = decos.items();
        while read!(self, self.reader.advance_array(frame)) {
            let index = *count;
            *count += 1;
            self.check(decos, Decorations::NONE, &Event::ArrayItem { count: *count })?;
            self.path.push_index(index);
            let slot = match sink.allocate_slot(index) {
                Ok(slot) => slot,
                Err(SlotError::Overflow) => {
                    return Err(self.fail(ErrorCode::FixedSizeContainerOverflow))
                }
                Err(SlotError::Rejected) => return Err(self.fail(ErrorCode::DataConsumerError)),
            };
            let outcome = self.parse_node(slot, items);
            let accepted = sink.finalize_item(outcome.is_ok());
            outcome?;
            if !accepted {
                return Err(self.fail(ErrorCode::DataConsumerError));
            }
            self.leave();
        }
        Ok(())
    }

    fn parse_map(&mut self, sink: &mut dyn MapSink, decos: Decorations) -> Result<(), Halt> {
        self.expect(TokenKind::Map, ErrorCode::NonMapInMapLike)?;
        self.enter_container()?;
        let mut frame = read!(self, self.reader.read_map_begin());
        sink.reset();
        let mut count = 0;
        let mut required_seen = 0u64;
        let mut outcome =
            self.parse_entries(sink, &mut frame, decos, &mut count, &mut required_seen);
        if outcome.is_ok() {
            outcome = self.check(
                decos,
                Decorations::NONE,
                &Event::MapFinished {
                    count,
                    required_seen,
                },
            );
        }
        let finalized = sink.finalize(outcome.is_ok());
        outcome?;
        if !finalized {
            return Err(self.fail(ErrorCode::DataConsumerError));
        }
        self.depth -= 1;
        Ok(())
    }

    fn parse_entries(
        &mut self,
        sink: &mut dyn MapSink,
        frame: &mut R::MapFrame,
        decos: Decorations,
        count: &mut usize,
        required_seen: &mut u64,
    ) -> Result<(), Halt> {
        let values = decos.values();
        while read!(self, self.reader.advance_map(frame)) {
            let status = sink.parse_entry(&mut |key, value| {
                self.parse_entry(key, value, decos, values, required_seen)
            })?;
            match status {
                EntryStatus::Inserted => {}
                EntryStatus::Duplicate => return Err(self.fail(ErrorCode::DuplicateKey)),
                EntryStatus::Overflow => {
                    return Err(self.fail(ErrorCode::FixedSizeContainerOverflow))
                }
                EntryStatus::Rejected => return Err(self.fail(ErrorCode::DataConsumerError)),
            }
            *count += 1;
            self.check(decos, Decorations::NONE, &Event::MapEntry { count: *count })?;
            self.leave();
        }
        Ok(())
    }

    fn parse_entry(
        &mut self,
        key: KeyMut<'_>,
        value: NodeMut<'_>,
        decos: Decorations,
        values: Decorations,
        required_seen: &mut u64,
    ) -> Result<(), Halt> {
        match key {
            KeyMut::Text(slot) => {
                self.read_key_text(slot)?;
                let text = slot.as_str();
                self.path.push_key(text);
                if !self.ctx.check(decos, Decorations::NONE, &Event::MapKey(text)) {
                    return Err(self.fail(ErrorCode::SchemaValidation));
                }
                mark_required_key(decos, text, required_seen);
            }
            KeyMut::Index(slot) => {
                let Some(index) = read!(self, self.reader.read_key_as_index()) else {
                    return Err(self.fail(ErrorCode::NonNumericInNumeric));
                };
                self.path.push_index_key(index);
                if !slot.store(NumberValue::Unsigned(index)) {
                    return Err(self.fail(ErrorCode::NumberOutOfRange));
                }
            }
        }
        read!(self, self.reader.read_key_separator());
        self.parse_node(value, values)
    }

    fn read_key_text(&mut self, slot: &mut dyn StringSlot) -> Result<(), Halt> {
        read!(self, self.reader.read_string_begin());
        slot.clear();
        let mut buf = [0u8; CHUNK];
        loop {
            let chunk = read!(self, self.reader.read_string_chunk(&mut buf));
            if !slot.push_str(chunk.text) {
                return Err(self.fail(ErrorCode::FixedSizeContainerOverflow));
            }
            if chunk.done {
                return Ok(());
            }
        }
    }

    fn parse_object(&mut self, obj: &mut dyn ObjectSlot, decos: Decorations) -> Result<(), Halt> {
        let schema = obj.schema();
        if schema.has(DecorationKind::AsArray) {
            return self.parse_destructured(obj, schema, decos);
        }
        self.expect(TokenKind::Map, ErrorCode::NonMapInMapLike)?;
        self.enter_container()?;
        let mut frame = read!(self, self.reader.read_map_begin());
        let mut seen = FieldSet::new();
        while read!(self, self.reader.advance_map(&mut frame)) {
            let (index, key) = match schema.keying {
                Keying::Names => self.match_name_key(schema)?,
                Keying::Indexes => {
                    let index = read!(self, self.reader.read_key_as_index());
                    (index.and_then(|k| match_index(schema, k)), None)
                }
            };
            read!(self, self.reader.read_key_separator());
            match index {
                Some(i) => self.parse_field(obj, schema, i, &mut seen)?,
                None => self.excess_field(schema, decos, key.as_ref().map(ArrayString::as_str))?,
            }
        }
        if let Some(missing) = seen.first_missing(&schema.required) {
            self.path.push_field(schema.fields[missing].wire_name());
            self.ctx.record(ValidationFailure::new(
                SchemaError::MissingRequiredFields,
                missing,
                "required",
            ));
            return Err(self.fail(ErrorCode::SchemaValidation));
        }
        self.check(decos, schema.decorations, &Event::ObjectFinished { seen: &seen, schema })?;
        self.depth -= 1;
        Ok(())
    }

    /// Read a textual key, returning the matched field and, for unmatched keys that fit the
    /// match buffer, a copy of the key.
    fn match_name_key(
        &mut self,
        schema: &'static ObjectSchema,
    ) -> Result<(Option<usize>, Option<ArrayString<MATCH_BUFFER>>), Halt> {
        read!(self, self.reader.read_string_begin());
        let mut matcher = FieldMatcher::new(schema);
        let mut status = MatchStatus::Ambiguous;
        let mut copy = ArrayString::<MATCH_BUFFER>::new();
        let mut truncated = false;
        let mut buf = [0u8; CHUNK];
        loop {
            let chunk = read!(self, self.reader.read_string_chunk(&mut buf));
            if status != MatchStatus::NoMatch {
                status = matcher.feed(chunk.text.as_bytes());
            }
            if !truncated && copy.try_push_str(chunk.text).is_err() {
                truncated = true;
            }
            if chunk.done {
                break;
            }
        }
        let index = match status {
            MatchStatus::NoMatch => None,
            _ => matcher.finish(),
        };
        Ok((index, (!truncated).then_some(copy)))
    }

    fn parse_field(
        &mut self,
        obj: &mut dyn ObjectSlot,
        schema: &'static ObjectSchema,
        index: usize,
        seen: &mut FieldSet,
    ) -> Result<(), Halt> {
        let info = &schema.fields[index];
        self.path.push_field(info.wire_name());
        if seen.contains(index) {
            return Err(self.fail(ErrorCode::DuplicateKey));
        }
        seen.insert(index);
        match obj.field_mut(index) {
            Some(node) if !info.is_skipped() => self.parse_node(node, info.decorations)?,
            _ => read!(self, self.reader.skip_value()),
        }
        self.leave();
        Ok(())
    }

    fn excess_field(
        &mut self,
        schema: &'static ObjectSchema,
        decos: Decorations,
        key: Option<&str>,
    ) -> Result<(), Halt> {
        log::trace!("excess field {:?} in {}", key, schema.name);
        self.check(decos, schema.decorations, &Event::ExcessField(key))?;
        if !schema.has(DecorationKind::AllowExcessFields) {
            if let Some(key) = key {
                self.path.push_key(key);
            }
            return Err(self.fail(ErrorCode::ExcessField));
        }
        read!(self, self.reader.skip_value());
        Ok(())
    }

    fn parse_destructured(
        &mut self,
        obj: &mut dyn ObjectSlot,
        schema: &'static ObjectSchema,
        decos: Decorations,
    ) -> Result<(), Halt> {
        self.expect(TokenKind::Array, ErrorCode::NonArrayInDestructured)?;
        self.enter_container()?;
        let mut frame = read!(self, self.reader.read_array_begin());
        let mut seen = FieldSet::new();
        for (index, info) in schema.fields.iter().enumerate() {
            if info.is_excluded() {
                continue;
            }
            if !read!(self, self.reader.advance_array(&mut frame)) {
                return Err(self.fail(ErrorCode::ArrayDestructuringMismatch));
            }
            self.parse_field(obj, schema, index, &mut seen)?;
        }
        if read!(self, self.reader.advance_array(&mut frame)) {
            return Err(self.fail(ErrorCode::ArrayDestructuringMismatch));
        }
        self.check(decos, schema.decorations, &Event::ObjectFinished { seen: &seen, schema })?;
        self.depth -= 1;
        Ok(())
    }

    fn parse_transformer(&mut self, slot: &mut dyn TransformSlot, decos: Decorations) -> Result<(), Halt> {
        let converted = slot.parse_wire(&mut |node| self.parse_node(node, decos))?;
        if converted {
            Ok(())
        } else {
            Err(self.fail(ErrorCode::TransformerError))
        }
    }

    fn capture(&mut self, sink: &mut dyn WireSink) -> Result<(), Halt> {
        log::trace!(
            "capturing raw {:?} value at offset {}",
            R::FORMAT,
            self.reader.position()
        );
        read!(self, self.reader.capture_to_sink(sink));
        Ok(())
    }
}
