//! Object key matching.
//!
//! Keys arrive from the reader in chunks. The incremental strategy narrows a `[first, last)`
//! window over the key-sorted field order one byte at a time; the buffered strategy keeps the
//! whole key (up to [`MATCH_BUFFER`] bytes) and binary-searches at the end.

use core::cmp::Ordering;

use arrayvec::ArrayVec;

use crate::decor::MatcherKind;
use crate::introspect::{ObjectSchema, WireKey, MATCH_BUFFER};

/// Matcher state after consuming some key bytes.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MatchStatus {
    /// Exactly one field is still possible.
    Unique,
    /// Several fields are still possible.
    Ambiguous,
    /// No field can match.
    NoMatch,
}

#[derive(Debug)]
enum Strategy {
    Incremental {
        first: usize,
        last: usize,
        depth: usize,
    },
    Buffered {
        buf: ArrayVec<u8, MATCH_BUFFER>,
        overflow: bool,
    },
}

/// Incremental key matcher bound to one object schema.
#[derive(Debug)]
pub struct FieldMatcher {
    schema: &'static ObjectSchema,
    strategy: Strategy,
}

fn name_of(schema: &ObjectSchema, slot: usize) -> &'static [u8] {
    match schema.fields[usize::from(schema.order[slot])].key {
        WireKey::Name(n) => n.as_bytes(),
        WireKey::Index(_) => &[],
    }
}

impl FieldMatcher {
    /// Start matching a key against `schema`.
    #[must_use]
    pub fn new(schema: &'static ObjectSchema) -> Self {
        let strategy = match schema.matcher {
            MatcherKind::Incremental => Strategy::Incremental {
                first: 0,
                last: schema.wire_fields,
                depth: 0,
            },
            MatcherKind::Buffered => Strategy::Buffered {
                buf: ArrayVec::new(),
                overflow: false,
            },
        };
        Self { schema, strategy }
    }

    /// Consume the next chunk of key bytes.
    pub fn feed(&mut self, chunk: &[u8]) -> MatchStatus {
        let schema = self.schema;
        match &mut self.strategy {
            Strategy::Incremental { first, last, depth } => {
                for &b in chunk {
                    if *first >= *last {
                        break;
                    }
                    if *last - *first == 1 {
                        let name = name_of(schema, *first);
                        if name.get(*depth) != Some(&b) {
                            *last = *first;
                        }
                        *depth += 1;
                        continue;
                    }
                    let d = *depth;
                    // Names that end at `d` sort before any name continuing past it.
                    let rank = |slot: usize| name_of(schema, slot).get(d).map_or(-1, |&c| i32::from(c));
                    let target = i32::from(b);
                    let lo = partition(*first, *last, |s| rank(s) < target);
                    let hi = partition(lo, *last, |s| rank(s) <= target);
                    *first = lo;
                    *last = hi;
                    *depth += 1;
                }
                match *last - *first {
                    0 => MatchStatus::NoMatch,
                    1 => MatchStatus::Unique,
                    _ => MatchStatus::Ambiguous,
                }
            }
            Strategy::Buffered { buf, overflow } => {
                if buf.try_extend_from_slice(chunk).is_err() {
                    *overflow = true;
                }
                if *overflow {
                    MatchStatus::NoMatch
                } else {
                    MatchStatus::Ambiguous
                }
            }
        }
    }

    /// The matched field's declaration index once the key is complete.
    #[must_use]
    pub fn finish(&self) -> Option<usize> {
        let schema = self.schema;
        match &self.strategy {
            Strategy::Incremental { first, last, depth } => {
                if first < last && name_of(schema, *first).len() == *depth {
                    Some(usize::from(schema.order[*first]))
                } else {
                    None
                }
            }
            Strategy::Buffered { buf, overflow } => {
                if *overflow {
                    return None;
                }
                let slots = &schema.order[..schema.wire_fields];
                let found = slots.binary_search_by(|&i| match schema.fields[usize::from(i)].key {
                    WireKey::Name(n) => n.as_bytes().cmp(buf.as_slice()),
                    WireKey::Index(_) => Ordering::Less,
                });
                found.ok().map(|s| usize::from(slots[s]))
            }
        }
    }
}

/// First slot in `[lo, hi)` for which `pred` is false; `pred` must be monotone.
fn partition(mut lo: usize, mut hi: usize, pred: impl Fn(usize) -> bool) -> usize {
    while lo < hi {
        let mid = lo + (hi - lo) / 2;
        if pred(mid) {
            lo = mid + 1;
        } else {
            hi = mid;
        }
    }
    lo
}

/// Match an integer key against an index-keyed schema.
#[must_use]
pub fn match_index(schema: &ObjectSchema, key: u64) -> Option<usize> {
    schema.index_position(key)
}
