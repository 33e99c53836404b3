//! The serializer engine.
//!
//! Mirrors the parser: one recursive pass over [`NodeRef`] views pushes tokens into a
//! [`Writer`]. Nothing is validated on the way out. Excluded fields never reach the wire;
//! `null` fields are omitted when the field is `not_required` or the object or map is
//! decorated `skip_nulls`.

use crate::cursor::{ArraySource, Halt, KeyRef, MapSource, SourceError};
use crate::decor::{DecorationKind, Decorations};
use crate::error::{Error, ErrorCode, WriteError};
use crate::introspect::{FieldInfo, ObjectView, WireKey};
use crate::limits::WriteOptions;
use crate::path::Path;
use crate::schema::{DepthCheck, Model, NodeRef};
use crate::sink::WireSink;
use crate::transform::TransformView;
use crate::writer::Writer;

macro_rules! emit {
    ($self:ident, $e:expr) => {
        match $e {
            Ok(v) => v,
            Err(e) => return Err($self.write_failed(e)),
        }
    };
}

/// Serialize `value` through `writer`, returning the number of bytes written.
///
/// # Errors
///
/// Returns writer errors (full buffer, non-finite floats), producer and transformer
/// failures, and wire-sink format mismatches.
pub fn serialize_with<W, T>(writer: &mut W, value: &T, options: &WriteOptions) -> Result<usize, Error>
where
    W: Writer,
    T: Model + ?Sized,
{
    let () = DepthCheck::<T>::FITS;
    log::debug!(
        "serializing {} as {:?}",
        core::any::type_name::<T>(),
        W::FORMAT
    );
    let mut serializer = Serializer::new(writer, options);
    serializer.run(value.node()).map_err(|err| {
        log::debug!("serialize failed: {err}");
        err
    })
}

struct Serializer<'w, 'o, W: Writer> {
    writer: &'w mut W,
    options: &'o WriteOptions,
    path: Path,
    depth: usize,
    failure: Option<(ErrorCode, usize)>,
}

impl<'w, 'o, W: Writer> Serializer<'w, 'o, W> {
    fn new(writer: &'w mut W, options: &'o WriteOptions) -> Self {
        Self {
            writer,
            options,
            path: Path::new(),
            depth: 0,
            failure: None,
        }
    }

    fn run(&mut self, root: NodeRef<'_>) -> Result<usize, Error> {
        let outcome = match self.write_node(root, Decorations::NONE) {
            Ok(()) => match self.writer.finish() {
                Ok(n) => Ok(n),
                Err(e) => Err(self.write_failed(e)),
            },
            Err(halt) => Err(halt),
        };
        outcome.map_err(|Halt| {
            let (code, offset) = self
                .failure
                .unwrap_or((ErrorCode::DataProducerError, self.writer.position()));
            let mut err = Error::serialize(code, offset);
            err.path = core::mem::take(&mut self.path);
            err
        })
    }

    fn fail(&mut self, code: ErrorCode) -> Halt {
        if self.failure.is_none() {
            self.failure = Some((code, self.writer.position()));
        }
        Halt
    }

    fn write_failed(&mut self, e: WriteError) -> Halt {
        self.fail(ErrorCode::Write(e))
    }

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

    fn source_failed(&mut self, e: SourceError) -> Halt {
        match e {
            SourceError::Halted => Halt,
            SourceError::Failed => self.fail(ErrorCode::DataProducerError),
        }
    }

    fn write_node(&mut self, node: NodeRef<'_>, decos: Decorations) -> Result<(), Halt> {
        match node {
            NodeRef::Null => emit!(self, self.writer.write_null()),
            NodeRef::Bool(b) => emit!(self, self.writer.write_bool(b)),
            NodeRef::Number(v) => {
                let decimals = decos.float_decimals().or(self.options.float_decimals);
                emit!(self, self.writer.write_number(v, decimals));
            }
            NodeRef::String(s) => emit!(self, self.writer.write_string(s)),
            NodeRef::Array(src) => self.write_array(src, decos)?,
            NodeRef::Map(src) => self.write_map(src, decos)?,
            NodeRef::Object(view) => self.write_object(view, decos)?,
            NodeRef::Transformer(view) => self.write_transformer(view, decos)?,
            NodeRef::WireSink(sink) => self.write_sink(sink)?,
        }
        Ok(())
    }

    fn write_array(&mut self, src: &dyn ArraySource, decos: Decorations) -> Result<(), Halt> {
        self.enter_container()?;
        let mut frame = emit!(self, self.writer.write_array_begin(src.len_hint()));
        let items = decos.items();
        let mut index = 0;
        let outcome = src.for_each_item(&mut |item| {
            self.path.push_index(index);
            self.write_node(item, items)?;
            emit!(self, self.writer.advance_after_value(&mut frame));
            self.leave();
            index += 1;
            Ok(())
        });
        if let Err(e) = outcome {
            return Err(self.source_failed(e));
        }
        emit!(self, self.writer.write_array_end(frame));
        self.depth -= 1;
        Ok(())
    }

    fn write_map(&mut self, src: &dyn MapSource, decos: Decorations) -> Result<(), Halt> {
        self.enter_container()?;
        let skip_nulls = decos.has(DecorationKind::SkipNulls);
        let len = if skip_nulls { None } else { src.len_hint() };
        let mut frame = emit!(self, self.writer.write_map_begin(len));
        let values = decos.values();
        let outcome = src.for_each_entry(&mut |key, value| {
            if skip_nulls && value.is_null() {
                return Ok(());
            }
            match key {
                KeyRef::Text(k) => {
                    emit!(self, self.writer.write_string(k));
                    self.path.push_key(k);
                }
                KeyRef::Index(k) => {
                    emit!(self, self.writer.write_key_as_index(k));
                    self.path.push_index_key(k);
                }
            }
            emit!(self, self.writer.move_to_value());
            self.write_node(value, values)?;
            emit!(self, self.writer.advance_after_value(&mut frame));
            self.leave();
            Ok(())
        });
        if let Err(e) = outcome {
            return Err(self.source_failed(e));
        }
        emit!(self, self.writer.write_map_end(frame));
        self.depth -= 1;
        Ok(())
    }

    fn write_object(&mut self, view: &dyn ObjectView, decos: Decorations) -> Result<(), Halt> {
        let schema = view.schema();
        let as_array = schema.has(DecorationKind::AsArray);
        let skip_nulls = schema.has(DecorationKind::SkipNulls) || decos.has(DecorationKind::SkipNulls);
        let omitted = |info: &FieldInfo, value: &NodeRef<'_>| {
            !as_array
                && value.is_null()
                && (skip_nulls || info.decorations.has(DecorationKind::NotRequired))
        };
        let len = schema
            .fields
            .iter()
            .enumerate()
            .filter(|&(i, info)| {
                !info.is_excluded() && view.field(i).is_some_and(|v| !omitted(info, &v))
            })
            .count();

        self.enter_container()?;
        let mut frame = if as_array {
            emit!(self, self.writer.write_array_begin(Some(len)))
        } else {
            emit!(self, self.writer.write_map_begin(Some(len)))
        };
        for (i, info) in schema.fields.iter().enumerate() {
            if info.is_excluded() {
                continue;
            }
            let Some(value) = view.field(i) else { continue };
            if omitted(info, &value) {
                continue;
            }
            if !as_array {
                match info.key {
                    WireKey::Name(name) => emit!(self, self.writer.write_string(name)),
                    WireKey::Index(k) => emit!(self, self.writer.write_key_as_index(k)),
                }
                emit!(self, self.writer.move_to_value());
            }
            self.path.push_field(info.wire_name());
            self.write_node(value, info.decorations)?;
            emit!(self, self.writer.advance_after_value(&mut frame));
            self.leave();
        }
        if as_array {
            emit!(self, self.writer.write_array_end(frame));
        } else {
            emit!(self, self.writer.write_map_end(frame));
        }
        self.depth -= 1;
        Ok(())
    }

    fn write_transformer(&mut self, view: &dyn TransformView, decos: Decorations) -> Result<(), Halt> {
        let converted = view.write_wire(&mut |node| self.write_node(node, decos))?;
        if converted {
            Ok(())
        } else {
            Err(self.fail(ErrorCode::TransformerError))
        }
    }

    fn write_sink(&mut self, sink: &dyn WireSink) -> Result<(), Halt> {
        match sink.format() {
            None => emit!(self, self.writer.write_null()),
            Some(format) if format == W::FORMAT => {
                log::trace!("passing through {} raw bytes", sink.current_size());
                emit!(self, self.writer.write_raw(sink.data()));
            }
            Some(_) => return Err(self.fail(ErrorCode::WireSinkFormatMismatch)),
        }
        Ok(())
    }
}
