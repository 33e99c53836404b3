#![cfg(feature = "alloc")]
#![allow(clippy::unwrap_used, clippy::expect_used)]

use std::collections::BTreeMap;

use shapewire::{from_json, ErrorCode, Model, NumberValue, Observed, SchemaError};

fn expect_schema<T: Model + Default + std::fmt::Debug>(
    input: &[u8],
    kind: SchemaError,
    path: &str,
) {
    let err = from_json::<T>(input).unwrap_err();
    assert_eq!(err.code, ErrorCode::SchemaValidation, "{err}");
    assert_eq!(err.schema_error(), Some(kind), "{err}");
    assert_eq!(err.path.to_string(), path, "{err}");
}

#[derive(Model, Default, Debug)]
struct Numbers {
    #[wire(range(-10, 10))]
    signed: i32,
    #[wire(range(0.5, 1.5))]
    ratio: f64,
    #[wire(constant = 3)]
    version: u8,
}

#[test]
fn numeric_ranges_are_inclusive() {
    let ok: Numbers = from_json(br#"{"signed":-10,"ratio":1.5,"version":3}"#).unwrap();
    assert_eq!(ok.signed, -10);
    expect_schema::<Numbers>(br#"{"signed":-11}"#, SchemaError::NumberOutOfRange, "$.signed");
    expect_schema::<Numbers>(br#"{"signed":11}"#, SchemaError::NumberOutOfRange, "$.signed");
    expect_schema::<Numbers>(br#"{"ratio":0.4}"#, SchemaError::NumberOutOfRange, "$.ratio");
}

#[test]
fn numeric_constant() {
    expect_schema::<Numbers>(br#"{"version":4}"#, SchemaError::WrongConstantValue, "$.version");
}

#[derive(Model, Default, Debug)]
struct Strings {
    #[wire(min_length = 2, max_length = 4)]
    code: String,
    #[wire(enum_values("red", "green"))]
    color: String,
    #[wire(constant = "v1")]
    schema: String,
    #[wire(constant = true)]
    enabled: bool,
}

#[test]
fn string_length_bounds() {
    let ok: Strings = from_json(br#"{"code":"ab"}"#).unwrap();
    assert_eq!(ok.code, "ab");
    expect_schema::<Strings>(br#"{"code":"a"}"#, SchemaError::StringLengthOutOfRange, "$.code");
    expect_schema::<Strings>(
        br#"{"code":"abcde"}"#,
        SchemaError::StringLengthOutOfRange,
        "$.code",
    );
}

#[test]
fn max_length_counts_bytes_not_chars() {
    // Two characters, four bytes.
    let ok: Strings = from_json("{\"code\":\"éé\"}".as_bytes()).unwrap();
    assert_eq!(ok.code, "éé");
    expect_schema::<Strings>(
        "{\"code\":\"ééé\"}".as_bytes(),
        SchemaError::StringLengthOutOfRange,
        "$.code",
    );
}

#[test]
fn enumerations_and_constants() {
    let ok: Strings = from_json(br#"{"color":"green","schema":"v1","enabled":true}"#).unwrap();
    assert_eq!(ok.color, "green");
    expect_schema::<Strings>(br#"{"color":"blue"}"#, SchemaError::WrongConstantValue, "$.color");
    expect_schema::<Strings>(br#"{"schema":"v2"}"#, SchemaError::WrongConstantValue, "$.schema");
    expect_schema::<Strings>(br#"{"enabled":false}"#, SchemaError::WrongConstantValue, "$.enabled");
}

#[derive(Model, Default, Debug)]
struct Lists {
    #[wire(min_items = 1, max_items = 3, items(range(0, 9)))]
    digits: Vec<u8>,
}

#[test]
fn item_counts_and_item_validators() {
    let ok: Lists = from_json(br#"{"digits":[0,9,5]}"#).unwrap();
    assert_eq!(ok.digits, vec![0, 9, 5]);
    expect_schema::<Lists>(br#"{"digits":[]}"#, SchemaError::ArrayItemsCountOutOfRange, "$.digits");
    expect_schema::<Lists>(
        br#"{"digits":[1,2,3,4]}"#,
        SchemaError::ArrayItemsCountOutOfRange,
        "$.digits",
    );
    expect_schema::<Lists>(br#"{"digits":[1,10]}"#, SchemaError::NumberOutOfRange, "$.digits[1]");
}

#[derive(Model, Default, Debug)]
struct Maps {
    #[wire(
        min_properties = 1,
        max_properties = 3,
        min_key_length = 2,
        max_key_length = 5,
        forbidden_keys("root"),
        values(max_length = 3)
    )]
    labels: BTreeMap<String, String>,
    #[wire(allowed_keys("cpu", "mem"), required_keys("cpu"))]
    limits: BTreeMap<String, u32>,
}

#[test]
fn map_property_counts() {
    let ok: Maps = from_json(br#"{"labels":{"ab":"x","cd":"y"}}"#).unwrap();
    assert_eq!(ok.labels.len(), 2);
    expect_schema::<Maps>(
        br#"{"labels":{}}"#,
        SchemaError::MapPropertiesCountOutOfRange,
        "$.labels",
    );
    expect_schema::<Maps>(
        br#"{"labels":{"aa":"","bb":"","cc":"","dd":""}}"#,
        SchemaError::MapPropertiesCountOutOfRange,
        "$.labels.dd",
    );
}

#[test]
fn map_key_rules() {
    expect_schema::<Maps>(
        br#"{"labels":{"a":"x"}}"#,
        SchemaError::MapKeyLengthOutOfRange,
        "$.labels.a",
    );
    expect_schema::<Maps>(
        br#"{"labels":{"abcdef":"x"}}"#,
        SchemaError::MapKeyLengthOutOfRange,
        "$.labels.abcdef",
    );
    expect_schema::<Maps>(
        br#"{"labels":{"root":"x"}}"#,
        SchemaError::MapKeyForbidden,
        "$.labels.root",
    );
    expect_schema::<Maps>(
        br#"{"limits":{"cpu":1,"disk":2}}"#,
        SchemaError::MapKeyNotAllowed,
        "$.limits.disk",
    );
    expect_schema::<Maps>(
        br#"{"limits":{"mem":1}}"#,
        SchemaError::MapMissingRequiredKey,
        "$.limits",
    );
    expect_schema::<Maps>(
        br#"{"labels":{"ab":"long"}}"#,
        SchemaError::StringLengthOutOfRange,
        "$.labels.ab",
    );
}

#[derive(Model, Default, Debug)]
#[wire(required_fields("host"))]
struct Endpoint {
    host: String,
    port: u16,
}

#[derive(Model, Default, Debug)]
#[wire(not_required_fields("port"))]
struct StrictEndpoint {
    host: String,
    port: u16,
}

#[test]
fn object_level_required_fields() {
    let ok: Endpoint = from_json(br#"{"host":"h"}"#).unwrap();
    assert_eq!(ok.port, 0);
    expect_schema::<Endpoint>(br#"{"port":1}"#, SchemaError::MissingRequiredFields, "$");

    let ok: StrictEndpoint = from_json(br#"{"host":"h"}"#).unwrap();
    assert_eq!(ok.host, "h");
    expect_schema::<StrictEndpoint>(br#"{"port":1}"#, SchemaError::MissingRequiredFields, "$");
}

fn even(value: Observed<'_>) -> bool {
    match value {
        Observed::Number(NumberValue::Unsigned(n)) => n % 2 == 0,
        Observed::Number(NumberValue::Signed(n)) => n % 2 == 0,
        _ => false,
    }
}

fn lowercase(value: Observed<'_>) -> bool {
    matches!(value, Observed::String(s) if !s.chars().any(char::is_uppercase))
}

#[derive(Model, Default, Debug)]
struct Custom {
    #[wire(range(0, 100), check = even)]
    count: u32,
    #[wire(check = lowercase)]
    slug: String,
}

#[test]
fn user_checks_run_after_builtin_validators() {
    let ok: Custom = from_json(br#"{"count":42,"slug":"abc"}"#).unwrap();
    assert_eq!(ok.count, 42);

    let err = from_json::<Custom>(br#"{"count":41}"#).unwrap_err();
    assert_eq!(err.schema_error(), Some(SchemaError::UserValidatorFailed));
    let failure = err.validation.unwrap();
    assert_eq!((failure.validator, failure.name), (1, "even"));

    let err = from_json::<Custom>(br#"{"count":200}"#).unwrap_err();
    assert_eq!(err.validation.unwrap().name, "range");

    expect_schema::<Custom>(br#"{"slug":"ABC"}"#, SchemaError::UserValidatorFailed, "$.slug");
}
