#![cfg(feature = "alloc")]
#![allow(clippy::unwrap_used, clippy::expect_used)]

use shapewire::{
    from_cbor, from_json, parse_cbor, parse_json, to_cbor_vec, to_json_string, to_json_vec,
    Alternatives, Candidate, Consume, ConsumeEntries, ConsumeWith, Counting, EntryConsumer,
    EntryProducer, ErrorCode, FromIter, Model, NodeRef, OneOf, Produce, ProduceEntries, RawBuf,
    RawSink, Reduced, Reducer, StreamError, Transform, TransformError, Transformed, WireFormat,
    WireSink,
};

#[derive(Model, Default, Debug, Clone, PartialEq)]
struct Sample {
    t: u32,
    v: i16,
}

#[test]
fn consumer_sees_every_item_then_success() {
    let mut target = Consume::new(Counting::<Sample>::default());
    parse_json(&mut target, br#"[{"t":1,"v":2},{"t":2,"v":-1},{"t":3,"v":0}]"#).unwrap();
    assert_eq!(target.consumer.count, 3);
    assert_eq!(target.consumer.finalized, Some(true));
}

#[test]
fn consumer_is_finalized_with_failure_on_a_bad_item() {
    let mut target = Consume::new(Counting::<Sample>::default());
    let err = parse_json(&mut target, br#"[{"t":1,"v":2},{"t":"x","v":0},{"t":3,"v":0}]"#)
        .unwrap_err();
    assert_eq!(err.code, ErrorCode::NonNumericInNumeric);
    assert_eq!(err.path.to_string(), "$[1].t");
    assert_eq!(target.consumer.count, 1);
    assert_eq!(target.consumer.finalized, Some(false));
}

#[test]
fn consumer_can_stop_the_parse() {
    let mut seen = Vec::new();
    let mut target = Consume::new(ConsumeWith::new(|s: &Sample| {
        seen.push(s.t);
        s.t < 2
    }));
    let err = parse_json(&mut target, br#"[{"t":1,"v":0},{"t":2,"v":0},{"t":3,"v":0}]"#)
        .unwrap_err();
    assert_eq!(err.code, ErrorCode::DataConsumerError);
    drop(target);
    assert_eq!(seen, vec![1, 2]);
}

#[test]
fn consumers_accept_cbor_indefinite_arrays() {
    let mut target = Consume::new(Counting::<u8>::default());
    parse_cbor(&mut target, &[0x9f, 0x01, 0x02, 0xff]).unwrap();
    assert_eq!(target.consumer.count, 2);
}

#[test]
fn producer_emits_unknown_length_arrays() {
    let source = Produce::new(FromIter(0u8..3));
    assert_eq!(to_json_string(&source).unwrap(), "[0,1,2]");

    let source = Produce::new(FromIter(0u8..3));
    assert_eq!(to_cbor_vec(&source).unwrap(), vec![0x9f, 0x00, 0x01, 0x02, 0xff]);
}

#[test]
fn stream_adapters_are_one_directional() {
    let consumer = Consume::new(Counting::<u8>::default());
    assert_eq!(to_json_vec(&consumer).unwrap_err().code, ErrorCode::DataProducerError);

    let mut producer = Produce::new(FromIter(0u8..3));
    assert_eq!(
        parse_json(&mut producer, b"[1]").unwrap_err().code,
        ErrorCode::DataConsumerError
    );
}

struct Failing(u8);

impl shapewire::Producer for Failing {
    type Item = u8;

    fn read(&mut self) -> Result<Option<u8>, StreamError> {
        if self.0 == 0 {
            return Err(StreamError);
        }
        self.0 -= 1;
        Ok(Some(self.0))
    }
}

#[test]
fn producer_failure_is_reported() {
    let err = to_json_vec(&Produce::new(Failing(2))).unwrap_err();
    assert_eq!(err.code, ErrorCode::DataProducerError);
}

#[derive(Default)]
struct Collect {
    entries: Vec<(String, u32)>,
    finished: bool,
}

impl EntryConsumer for Collect {
    type Key = String;
    type Value = u32;

    fn consume(&mut self, key: &String, value: &u32) -> bool {
        self.entries.push((key.clone(), *value));
        true
    }

    fn finalize(&mut self, success: bool) -> bool {
        self.finished = success;
        true
    }
}

#[test]
fn entry_consumer_receives_map_entries_in_wire_order() {
    let mut target = ConsumeEntries::new(Collect::default());
    parse_json(&mut target, br#"{"b":2,"a":1,"b":3}"#).unwrap();
    let collected = target.consumer;
    assert!(collected.finished);
    assert_eq!(
        collected.entries,
        vec![("b".into(), 2), ("a".into(), 1), ("b".into(), 3)]
    );
}

struct Pairs(Vec<(String, u32)>);

impl EntryProducer for Pairs {
    type Key = String;
    type Value = u32;

    fn read(&mut self) -> Result<Option<(String, u32)>, StreamError> {
        Ok(if self.0.is_empty() {
            None
        } else {
            Some(self.0.remove(0))
        })
    }
}

#[test]
fn entry_producer_writes_an_indefinite_map() {
    let pairs = || Pairs(vec![("x".into(), 1), ("y".into(), 2)]);
    assert_eq!(
        to_json_string(&ProduceEntries::new(pairs())).unwrap(),
        r#"{"x":1,"y":2}"#
    );
    assert_eq!(
        to_cbor_vec(&ProduceEntries::new(pairs())).unwrap(),
        vec![0xbf, 0x61, b'x', 0x01, 0x61, b'y', 0x02, 0xff]
    );
}

#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
struct Rgb(u32);

impl Transform for Rgb {
    type Wire = String;

    fn from_wire(wire: String) -> Result<Self, TransformError> {
        let hex = wire.strip_prefix('#').ok_or(TransformError)?;
        if hex.len() != 6 {
            return Err(TransformError);
        }
        u32::from_str_radix(hex, 16).map(Rgb).map_err(|_| TransformError)
    }

    fn to_wire(&self) -> Result<String, TransformError> {
        if self.0 > 0x00ff_ffff {
            return Err(TransformError);
        }
        Ok(format!("#{:06x}", self.0))
    }
}

#[derive(Model, Default, Debug, PartialEq)]
struct Theme {
    #[wire(max_length = 7)]
    accent: Transformed<Rgb>,
}

#[test]
fn transformer_converts_in_both_directions() {
    let theme: Theme = from_json(br##"{"accent":"#10ff20"}"##).unwrap();
    assert_eq!(*theme.accent, Rgb(0x0010_ff20));
    assert_eq!(to_json_string(&theme).unwrap(), r##"{"accent":"#10ff20"}"##);
}

#[test]
fn transformer_failures_and_wire_validation() {
    let err = from_json::<Theme>(br#"{"accent":"red"}"#).unwrap_err();
    assert_eq!(err.code, ErrorCode::TransformerError);
    assert_eq!(err.path.to_string(), "$.accent");

    // Decorations apply to the wire value before conversion.
    let err = from_json::<Theme>(br##"{"accent":"#10ff2000"}"##).unwrap_err();
    assert_eq!(err.code, ErrorCode::SchemaValidation);

    let bad = Theme {
        accent: Transformed(Rgb(0x0100_0000)),
    };
    let err = to_json_vec(&bad).unwrap_err();
    assert_eq!(err.code, ErrorCode::TransformerError);
    assert_eq!(err.path.to_string(), "$.accent");
}

#[derive(Debug, Default)]
struct Sum {
    total: u64,
    items: usize,
}

impl Reducer for Sum {
    type Item = u32;

    fn reset(&mut self) {
        *self = Self::default();
    }

    fn reduce(&mut self, item: u32) -> bool {
        self.total += u64::from(item);
        self.items += 1;
        true
    }
}

#[derive(Model, Default, Debug)]
struct Totals {
    #[wire(max_items = 4)]
    sum: Reduced<Sum>,
}

#[test]
fn reducer_folds_an_array_into_one_value() {
    let totals: Totals = from_json(br#"{"sum":[1,2,3,4]}"#).unwrap();
    assert_eq!((totals.sum.reducer.total, totals.sum.reducer.items), (10, 4));

    let err = from_json::<Totals>(br#"{"sum":[1,2,3,4,5]}"#).unwrap_err();
    assert_eq!(err.code, ErrorCode::SchemaValidation);

    let err = to_json_vec(&totals).unwrap_err();
    assert_eq!(err.code, ErrorCode::TransformerError);
}

#[derive(Model, Default, Debug)]
struct Envelope {
    kind: String,
    payload: RawBuf,
}

#[test]
fn raw_json_passes_through_untouched() {
    let input = br#"{"kind":"event","payload": {"a": [1, 2], "b": null}}"#;
    let env: Envelope = from_json(input).unwrap();
    assert_eq!(env.payload.format(), Some(WireFormat::Json));
    assert_eq!(env.payload.as_bytes(), br#"{"a": [1, 2], "b": null}"#);
    assert_eq!(
        to_json_string(&env).unwrap(),
        r#"{"kind":"event","payload":{"a": [1, 2], "b": null}}"#
    );
}

#[test]
fn raw_capture_is_tied_to_its_wire_format() {
    let env = Envelope {
        kind: "e".into(),
        payload: RawBuf::from_wire(WireFormat::Json, b"[1]").unwrap(),
    };
    let err = to_cbor_vec(&env).unwrap_err();
    assert_eq!(err.code, ErrorCode::WireSinkFormatMismatch);
    assert_eq!(err.path.to_string(), "$.payload");

    let empty = Envelope::default();
    assert_eq!(to_json_string(&empty).unwrap(), r#"{"kind":"","payload":null}"#);
}

#[test]
fn raw_cbor_round_trips() {
    let env = Envelope {
        kind: "e".into(),
        payload: RawBuf::from_wire(WireFormat::Cbor, &[0x82, 0x01, 0x02]).unwrap(),
    };
    let bytes = to_cbor_vec(&env).unwrap();
    let back: Envelope = from_cbor(&bytes).unwrap();
    assert_eq!(back.payload.as_bytes(), &[0x82, 0x01, 0x02]);
}

#[derive(Model, Default, Debug)]
struct Small {
    raw: RawSink<4>,
}

#[test]
fn fixed_sink_overflow() {
    let err = from_json::<Small>(br#"{"raw":[1,2,3]}"#).unwrap_err();
    assert_eq!(err.code, ErrorCode::FixedSizeContainerOverflow);
    assert_eq!(err.path.to_string(), "$.raw");

    let ok: Small = from_json(br#"{"raw":[1]}"#).unwrap();
    assert_eq!(ok.raw.as_bytes(), b"[1]");
}

#[derive(Model, Default, Debug)]
struct Log {
    #[wire(min_items = 3)]
    samples: Consume<Counting<u8>>,
}

#[test]
fn count_validators_fail_the_consumer() {
    let mut log = Log::default();
    let err = parse_json(&mut log, br#"{"samples":[1]}"#).unwrap_err();
    assert_eq!(err.code, ErrorCode::SchemaValidation);
    assert_eq!(err.path.to_string(), "$.samples");
    assert_eq!(log.samples.consumer.count, 1);
    assert_eq!(log.samples.consumer.finalized, Some(false));

    let mut log = Log::default();
    parse_json(&mut log, br#"{"samples":[1,2,3]}"#).unwrap();
    assert_eq!(log.samples.consumer.finalized, Some(true));
}

#[derive(Default)]
struct Keys {
    seen: usize,
    finalized: Option<bool>,
}

impl EntryConsumer for Keys {
    type Key = String;
    type Value = u32;

    fn consume(&mut self, _key: &String, _value: &u32) -> bool {
        self.seen += 1;
        true
    }

    fn finalize(&mut self, success: bool) -> bool {
        self.finalized = Some(success);
        true
    }
}

#[derive(Model, Default)]
struct Labels {
    #[wire(min_properties = 2)]
    m: ConsumeEntries<Keys>,
}

#[test]
fn property_count_failure_fails_the_entry_consumer() {
    let mut labels = Labels::default();
    let err = parse_json(&mut labels, br#"{"m":{"a":1}}"#).unwrap_err();
    assert_eq!(err.code, ErrorCode::SchemaValidation);
    assert_eq!(labels.m.consumer.seen, 1);
    assert_eq!(labels.m.consumer.finalized, Some(false));

    let mut labels = Labels::default();
    parse_json(&mut labels, br#"{"m":{"a":1,"b":2}}"#).unwrap();
    assert_eq!(labels.m.consumer.finalized, Some(true));
}

#[derive(Debug, Clone, PartialEq)]
enum Setting {
    Flag(bool),
    Level(u8),
    Name(String),
}

impl Default for Setting {
    fn default() -> Self {
        Self::Flag(false)
    }
}

impl Alternatives for Setting {
    const COUNT: usize = 3;

    fn parse_alternative(index: usize, candidate: &Candidate<'_>) -> Option<Self> {
        match index {
            0 => candidate.parse().map(Self::Flag),
            1 => candidate.parse().map(Self::Level),
            2 => candidate.parse().map(Self::Name),
            _ => None,
        }
    }

    fn node(&self) -> NodeRef<'_> {
        match self {
            Self::Flag(v) => v.node(),
            Self::Level(v) => v.node(),
            Self::Name(v) => v.node(),
        }
    }
}

#[derive(Model, Default, Debug, PartialEq)]
struct Knob {
    id: u8,
    value: OneOf<Setting>,
}

#[test]
fn one_of_picks_the_single_matching_alternative() {
    let knob: Knob = from_json(br#"{"id":1,"value":7}"#).unwrap();
    assert_eq!(knob.value.0, Setting::Level(7));

    let knob: Knob = from_json(br#"{"id":1,"value":"auto"}"#).unwrap();
    assert_eq!(knob.value.0, Setting::Name("auto".into()));
    assert_eq!(to_json_string(&knob).unwrap(), r#"{"id":1,"value":"auto"}"#);

    let knob = Knob {
        id: 2,
        value: OneOf(Setting::Flag(true)),
    };
    let back: Knob = from_cbor(&to_cbor_vec(&knob).unwrap()).unwrap();
    assert_eq!(back, knob);
}

#[test]
fn one_of_without_a_match_fails() {
    let err = from_json::<Knob>(br#"{"id":1,"value":[1]}"#).unwrap_err();
    assert_eq!(err.code, ErrorCode::TransformerError);
    assert_eq!(err.path.to_string(), "$.value");

    // 300 overflows the u8 alternative and is not a string or a boolean.
    let err = from_json::<Knob>(br#"{"id":1,"value":300}"#).unwrap_err();
    assert_eq!(err.code, ErrorCode::TransformerError);
}

#[derive(Debug, Clone, PartialEq)]
enum Width {
    Narrow(u8),
    Wide(u32),
}

impl Default for Width {
    fn default() -> Self {
        Self::Narrow(0)
    }
}

impl Alternatives for Width {
    const COUNT: usize = 2;

    fn parse_alternative(index: usize, candidate: &Candidate<'_>) -> Option<Self> {
        match index {
            0 => candidate.parse().map(Self::Narrow),
            1 => candidate.parse().map(Self::Wide),
            _ => None,
        }
    }

    fn node(&self) -> NodeRef<'_> {
        match self {
            Self::Narrow(v) => v.node(),
            Self::Wide(v) => v.node(),
        }
    }
}

#[test]
fn one_of_rejects_ambiguous_values() {
    let err = from_json::<OneOf<Width>>(b"7").unwrap_err();
    assert_eq!(err.code, ErrorCode::TransformerError);

    let wide: OneOf<Width> = from_json(b"300").unwrap();
    assert_eq!(wide.0, Width::Wide(300));
    let wide: OneOf<Width> = from_cbor(&[0x19, 0x01, 0x2c]).unwrap();
    assert_eq!(wide.0, Width::Wide(300));
}

#[derive(Model, Default, Debug, Clone, PartialEq)]
struct Circle {
    radius: f64,
}

#[derive(Model, Default, Debug, Clone, PartialEq)]
struct Square {
    side: f64,
}

#[derive(Debug, Clone, PartialEq)]
enum Figure {
    Circle(Circle),
    Square(Square),
}

impl Default for Figure {
    fn default() -> Self {
        Self::Circle(Circle::default())
    }
}

impl Alternatives for Figure {
    const COUNT: usize = 2;

    fn parse_alternative(index: usize, candidate: &Candidate<'_>) -> Option<Self> {
        match index {
            0 => candidate.parse().map(Self::Circle),
            1 => candidate.parse().map(Self::Square),
            _ => None,
        }
    }

    fn node(&self) -> NodeRef<'_> {
        match self {
            Self::Circle(c) => c.node(),
            Self::Square(s) => s.node(),
        }
    }
}

#[test]
fn one_of_tells_objects_apart_by_their_fields() {
    let fig: OneOf<Figure> = from_json(br#"{"side": 2.5}"#).unwrap();
    assert_eq!(fig.0, Figure::Square(Square { side: 2.5 }));
    assert_eq!(to_json_string(&fig).unwrap(), r#"{"side":2.5}"#);

    // Both shapes accept an empty object.
    let err = from_json::<OneOf<Figure>>(b"{}").unwrap_err();
    assert_eq!(err.code, ErrorCode::TransformerError);
}
