// Property-based tests for JSON/CBOR round trips and validator boundaries.
//
// Sizes are kept small so CI stays fast.
#![cfg(feature = "alloc")]
#![allow(clippy::unwrap_used, clippy::expect_used)]

use proptest::prelude::*;
use std::collections::BTreeMap;

use shapewire::{
    from_cbor, from_json, to_cbor_vec, to_json_vec, ErrorCode, Model, SchemaError,
};

#[derive(Model, Default, Debug, Clone, PartialEq)]
struct Inner {
    flag: bool,
    score: i64,
    tags: Vec<String>,
}

#[derive(Model, Default, Debug, Clone, PartialEq)]
struct Record {
    id: u64,
    name: String,
    ratio: f64,
    note: Option<String>,
    counts: BTreeMap<String, u32>,
    inner: Vec<Inner>,
}

fn arb_text() -> impl Strategy<Value = String> {
    // Quotes, backslashes, controls and non-ASCII exercise the JSON escaper.
    proptest::collection::vec(
        prop_oneof![
            proptest::char::range('a', 'z'),
            Just('"'),
            Just('\\'),
            Just('\n'),
            Just('\u{1}'),
            Just('é'),
            Just('😀'),
        ],
        0..16,
    )
    .prop_map(|chars| chars.into_iter().collect())
}

fn arb_inner() -> impl Strategy<Value = Inner> {
    (
        any::<bool>(),
        any::<i64>(),
        proptest::collection::vec(arb_text(), 0..4),
    )
        .prop_map(|(flag, score, tags)| Inner { flag, score, tags })
}

fn arb_record() -> impl Strategy<Value = Record> {
    (
        any::<u64>(),
        arb_text(),
        -1.0e12f64..1.0e12,
        proptest::option::of(arb_text()),
        proptest::collection::btree_map(arb_text(), any::<u32>(), 0..4),
        proptest::collection::vec(arb_inner(), 0..3),
    )
        .prop_map(|(id, name, ratio, note, counts, inner)| Record {
            id,
            name,
            ratio,
            note,
            counts,
            inner,
        })
}

proptest! {
    #![proptest_config(ProptestConfig { cases: 128, .. ProptestConfig::default() })]

    #[test]
    fn json_round_trip(record in arb_record()) {
        let bytes = to_json_vec(&record).unwrap();
        let back: Record = from_json(&bytes).unwrap();
        prop_assert_eq!(back, record);
    }

    #[test]
    fn cbor_round_trip(record in arb_record()) {
        let bytes = to_cbor_vec(&record).unwrap();
        let back: Record = from_cbor(&bytes).unwrap();
        prop_assert_eq!(back, record);
    }

    #[test]
    fn json_output_is_valid_json(record in arb_record()) {
        let bytes = to_json_vec(&record).unwrap();
        let parsed: serde_json::Value = serde_json::from_slice(&bytes).unwrap();
        prop_assert_eq!(parsed["id"].as_u64(), Some(record.id));
        prop_assert_eq!(parsed["name"].as_str(), Some(record.name.as_str()));
    }
}

#[derive(Model, Default, Debug, PartialEq)]
struct Bounded {
    #[wire(range(-50, 50))]
    n: i32,
}

proptest! {
    #[test]
    fn range_accepts_exactly_the_closed_interval(n in -200i32..200) {
        let input = format!(r#"{{"n":{n}}}"#);
        match from_json::<Bounded>(input.as_bytes()) {
            Ok(v) => {
                prop_assert!((-50..=50).contains(&n));
                prop_assert_eq!(v.n, n);
            }
            Err(err) => {
                prop_assert!(!(-50..=50).contains(&n));
                prop_assert_eq!(err.code, ErrorCode::SchemaValidation);
                prop_assert_eq!(err.schema_error(), Some(SchemaError::NumberOutOfRange));
            }
        }
    }

    #[test]
    fn narrow_storage_rejects_wide_values(n in any::<i64>()) {
        let input = format!(r#"{{"n":{n}}}"#);
        let fits = i32::try_from(n).is_ok();
        let outcome = from_json::<Bounded>(input.as_bytes());
        if !fits {
            prop_assert_eq!(outcome.unwrap_err().code, ErrorCode::NumberOutOfRange);
        }
    }

    #[test]
    fn truncated_documents_never_parse(record in arb_record(), cut in 0usize..64) {
        let bytes = to_cbor_vec(&record).unwrap();
        let cut = cut.min(bytes.len().saturating_sub(1));
        prop_assert!(from_cbor::<Record>(&bytes[..cut]).is_err());
    }
}
