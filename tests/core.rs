#![cfg(feature = "alloc")]
#![allow(clippy::unwrap_used, clippy::expect_used)]

use std::collections::BTreeMap;

use arrayvec::ArrayString;
use shapewire::{
    from_cbor, from_json, parse_json, parse_json_with, serialize_json, to_cbor_vec,
    to_json_string, to_json_vec, ErrorCode, ErrorKind, Model, ParseOptions, ReadError,
    SchemaError, WriteError,
};

#[derive(Model, Default, Debug, Clone, PartialEq)]
struct Server {
    host: String,
    port: u16,
}

#[derive(Model, Default, Debug, Clone, PartialEq)]
struct Config {
    #[wire(rename = "app_name")]
    name: String,
    version: u32,
    #[wire(rename = "debug_mode")]
    debug: bool,
    server: Server,
}

fn sample_config() -> Config {
    Config {
        name: "MyApp".into(),
        version: 1,
        debug: true,
        server: Server {
            host: "localhost".into(),
            port: 8080,
        },
    }
}

#[derive(Model, Default, Debug, PartialEq)]
struct Motor {
    #[wire(rename = "id", range(1, 8))]
    motor_id: u8,
    label: String,
}

#[test]
fn nested_config_parses_with_renamed_keys() {
    let input = br#"{"app_name":"MyApp","version":1,"debug_mode":true,"server":{"host":"localhost","port":8080}}"#;
    let config: Config = from_json(input).unwrap();
    assert_eq!(config.name, "MyApp");
    assert_eq!(config.version, 1);
    assert!(config.debug);
    assert_eq!(config.server.host, "localhost");
    assert_eq!(config.server.port, 8080);
    assert_eq!(config, sample_config());

    let pretty = br#"{
        "app_name": "MyApp",
        "version": 1,
        "debug_mode": true,
        "server": { "host": "localhost", "port": 8080 }
    }"#;
    assert_eq!(from_json::<Config>(pretty).unwrap(), config);

    // Declared names are not wire names.
    let err = from_json::<Config>(br#"{"name":"MyApp"}"#).unwrap_err();
    assert_eq!(err.code, ErrorCode::ExcessField);
    assert_eq!(err.path.to_string(), "$.name");
}

#[test]
fn fields_may_arrive_in_any_order() {
    let input = br#"{"server":{"port":1,"host":"h"},"debug_mode":false,"version":7,"app_name":"x"}"#;
    let config: Config = from_json(input).unwrap();
    assert_eq!(config.version, 7);
    assert_eq!(config.server.host, "h");
}

#[test]
fn serializes_in_declaration_order_with_wire_names() {
    let json = to_json_string(&sample_config()).unwrap();
    assert_eq!(
        json,
        r#"{"app_name":"MyApp","version":1,"debug_mode":true,"server":{"host":"localhost","port":8080}}"#
    );
}

#[test]
fn json_and_cbor_differ_on_the_wire_but_agree_on_the_value() {
    let config = sample_config();
    let json = to_json_vec(&config).unwrap();
    let cbor = to_cbor_vec(&config).unwrap();
    assert_ne!(json, cbor);
    // Four-entry definite map, first key "app_name".
    assert_eq!(&cbor[..2], &[0xa4, 0x68]);
    assert_eq!(&cbor[2..10], b"app_name");
    assert!(cbor.len() < json.len());

    let from_j: Config = from_json(&json).unwrap();
    let from_c: Config = from_cbor(&cbor).unwrap();
    assert_eq!(from_j, config);
    assert_eq!(from_c, config);
}

#[test]
fn range_violation_reports_path_and_validator() {
    let err = from_json::<Motor>(br#"{"id":99,"label":"left"}"#).unwrap_err();
    assert_eq!(err.kind, ErrorKind::Parse);
    assert_eq!(err.code, ErrorCode::SchemaValidation);
    assert_eq!(err.path.to_string(), "$.id");
    assert_eq!(err.schema_error(), Some(SchemaError::NumberOutOfRange));
    let failure = err.validation.unwrap();
    assert_eq!(failure.validator, 0);
    assert_eq!(failure.name, "range");

    let motor: Motor = from_json(br#"{"id": 8}"#).unwrap();
    assert_eq!(motor.motor_id, 8);
    let motor: Motor = from_json(br#"{"id": 1}"#).unwrap();
    assert_eq!(motor.motor_id, 1);
    assert_eq!(to_json_string(&motor).unwrap(), r#"{"id":1,"label":""}"#);
    assert_eq!(
        from_json::<Motor>(br#"{"id": 9}"#).unwrap_err().schema_error(),
        Some(SchemaError::NumberOutOfRange)
    );
}

#[test]
fn error_message_names_the_validator() {
    let err = from_json::<Motor>(br#"{"id": 0}"#).unwrap_err();
    let text = err.to_string();
    assert!(text.starts_with("parse failed at "), "{text}");
    assert!(text.contains("($.id)"), "{text}");
    assert!(text.contains("validator #0 (range)"), "{text}");
}

#[test]
fn number_outside_storage_type() {
    let err = from_json::<Motor>(br#"{"id": 300}"#).unwrap_err();
    assert_eq!(err.code, ErrorCode::NumberOutOfRange);
    assert_eq!(err.path.to_string(), "$.id");

    let err = from_json::<Motor>(br#"{"id": 1.5}"#).unwrap_err();
    assert_eq!(err.code, ErrorCode::Read(ReadError::FloatInIntegerStorage));
}

#[test]
fn type_mismatches_have_dedicated_codes() {
    let err = from_json::<Config>(br#"{"debug_mode": 1}"#).unwrap_err();
    assert_eq!(err.code, ErrorCode::NonBoolInBool);
    assert_eq!(err.path.to_string(), "$.debug_mode");

    let err = from_json::<Config>(br#"{"version": "2"}"#).unwrap_err();
    assert_eq!(err.code, ErrorCode::NonNumericInNumeric);

    let err = from_json::<Config>(br#"{"app_name": 5}"#).unwrap_err();
    assert_eq!(err.code, ErrorCode::NonStringInString);

    let err = from_json::<Config>(br#"{"server": []}"#).unwrap_err();
    assert_eq!(err.code, ErrorCode::NonMapInMapLike);
    assert_eq!(err.path.to_string(), "$.server");

    let err = from_json::<Vec<u8>>(br#"{}"#).unwrap_err();
    assert_eq!(err.code, ErrorCode::NonArrayInArrayLike);
}

#[test]
fn unknown_keys_are_rejected_by_default() {
    let err = from_json::<Server>(br#"{"host":"h","extra":1,"port":2}"#).unwrap_err();
    assert_eq!(err.code, ErrorCode::ExcessField);
    assert_eq!(err.path.to_string(), "$.extra");
}

#[derive(Model, Default, Debug, PartialEq)]
#[wire(allow_excess_fields, forbidden_fields("password"))]
struct Lenient {
    user: String,
}

#[test]
fn allowed_excess_fields_are_skipped_unless_forbidden() {
    let input = br#"{"note":{"deep":[1,2,{"x":null}]},"user":"ann","tag":"t"}"#;
    let value: Lenient = from_json(input).unwrap();
    assert_eq!(value.user, "ann");

    let err = from_json::<Lenient>(br#"{"user":"ann","password":"hunter2"}"#).unwrap_err();
    assert_eq!(err.code, ErrorCode::SchemaValidation);
    assert_eq!(err.schema_error(), Some(SchemaError::ForbiddenField));
}

#[test]
fn repeated_field_is_a_duplicate_key() {
    let err = from_json::<Server>(br#"{"port":1,"port":2}"#).unwrap_err();
    assert_eq!(err.code, ErrorCode::DuplicateKey);
    assert_eq!(err.path.to_string(), "$.port");
}

#[test]
fn repeated_map_key_is_a_duplicate_key() {
    let err = from_json::<BTreeMap<String, u8>>(br#"{"a":1,"b":2,"a":3}"#).unwrap_err();
    assert_eq!(err.code, ErrorCode::DuplicateKey);
    assert_eq!(err.path.to_string(), "$.a");
}

#[derive(Model, Default, Debug)]
struct Tagged {
    name: ArrayString<4>,
    n: u8,
}

fn long_name_document() -> Vec<u8> {
    format!(r#"{{"name":"{}","n":1}}"#, "x".repeat(100)).into_bytes()
}

#[test]
fn overflowing_string_is_consumed_to_its_end_by_default() {
    let input = long_name_document();
    let err = from_json::<Tagged>(&input).unwrap_err();
    assert_eq!(err.code, ErrorCode::FixedSizeContainerOverflow);
    assert_eq!(err.path.to_string(), "$.name");
    // The reader stopped right after the closing quote.
    let comma = input.iter().position(|&b| b == b',').unwrap();
    assert_eq!(err.offset, comma);
}

#[test]
fn overflowing_string_can_fail_fast() {
    let input = long_name_document();
    let opts = ParseOptions::new().with_consume_overflowing_strings(false);
    let mut target = Tagged::default();
    let err = parse_json_with(&mut target, &input, &opts).unwrap_err();
    assert_eq!(err.code, ErrorCode::FixedSizeContainerOverflow);
    let comma = input.iter().position(|&b| b == b',').unwrap();
    assert!(err.offset < comma);
}

#[test]
fn fixed_array_overflow() {
    let mut target = [0u8; 2];
    let err = parse_json(&mut target, b"[1,2,3]").unwrap_err();
    assert_eq!(err.code, ErrorCode::FixedSizeContainerOverflow);
    assert_eq!(err.path.to_string(), "$[2]");
}

#[derive(Model, Default, Debug, PartialEq)]
struct Profile {
    nickname: Option<String>,
    #[wire(not_required)]
    email: Option<String>,
    age: u8,
}

#[test]
fn null_needs_optional_storage() {
    let err = from_json::<Profile>(br#"{"age": null}"#).unwrap_err();
    assert_eq!(err.code, ErrorCode::NullInNonOptional);
    assert_eq!(err.path.to_string(), "$.age");

    let p: Profile = from_json(br#"{"nickname": null, "email": "a@b", "age": 3}"#).unwrap();
    assert_eq!(p.nickname, None);
    assert_eq!(p.email.as_deref(), Some("a@b"));
}

#[test]
fn not_required_nulls_are_omitted_others_are_written() {
    let p = Profile {
        nickname: None,
        email: None,
        age: 30,
    };
    assert_eq!(to_json_string(&p).unwrap(), r#"{"nickname":null,"age":30}"#);
}

#[derive(Model, Default, Debug, PartialEq)]
#[wire(skip_nulls)]
struct Sparse {
    a: Option<u8>,
    b: Option<u8>,
    c: u8,
}

#[test]
fn skip_nulls_drops_every_null_field() {
    let s = Sparse {
        a: None,
        b: Some(2),
        c: 3,
    };
    assert_eq!(to_json_string(&s).unwrap(), r#"{"b":2,"c":3}"#);
    // Definite-length header counts only the written fields.
    assert_eq!(to_cbor_vec(&s).unwrap()[0], 0xa2);
}

#[derive(Model, Default, Debug, PartialEq)]
struct Session {
    user: String,
    #[wire(skip)]
    token: String,
    #[wire(exclude)]
    cache: u32,
}

#[test]
fn skip_ignores_input_and_exclude_hides_the_field() {
    let s: Session = from_json(br#"{"user":"u","token":"secret"}"#).unwrap();
    assert_eq!(s.user, "u");
    assert_eq!(s.token, "");

    let err = from_json::<Session>(br#"{"user":"u","cache":1}"#).unwrap_err();
    assert_eq!(err.code, ErrorCode::ExcessField);

    let s = Session {
        user: "u".into(),
        token: "t".into(),
        cache: 9,
    };
    assert_eq!(to_json_string(&s).unwrap(), r#"{"user":"u","token":"t"}"#);
}

#[derive(Model, Default, Debug, PartialEq)]
struct Account {
    #[wire(required)]
    id: u32,
    name: String,
}

#[test]
fn missing_required_field_points_at_the_field() {
    let err = from_json::<Account>(br#"{"name":"x"}"#).unwrap_err();
    assert_eq!(err.code, ErrorCode::SchemaValidation);
    assert_eq!(err.schema_error(), Some(SchemaError::MissingRequiredFields));
    assert_eq!(err.path.to_string(), "$.id");
    assert_eq!(err.validation.unwrap().name, "required");

    let a: Account = from_json(br#"{"id":4}"#).unwrap();
    assert_eq!(a.id, 4);
}

#[derive(Model, Default, Debug, PartialEq)]
#[wire(as_array)]
struct Point {
    x: i32,
    y: i32,
    #[wire(exclude)]
    label: u8,
}

#[test]
fn destructured_objects_use_arrays() {
    let p: Point = from_json(b"[3, -4]").unwrap();
    assert_eq!((p.x, p.y), (3, -4));
    assert_eq!(to_json_string(&p).unwrap(), "[3,-4]");
    assert_eq!(to_cbor_vec(&p).unwrap(), vec![0x82, 0x03, 0x23]);

    let err = from_json::<Point>(b"[1]").unwrap_err();
    assert_eq!(err.code, ErrorCode::ArrayDestructuringMismatch);
    let err = from_json::<Point>(b"[1,2,3]").unwrap_err();
    assert_eq!(err.code, ErrorCode::ArrayDestructuringMismatch);
    let err = from_json::<Point>(br#"{"x":1}"#).unwrap_err();
    assert_eq!(err.code, ErrorCode::NonArrayInDestructured);
}

#[derive(Model, Default, Debug, PartialEq)]
#[wire(indexes_as_keys)]
struct Reading {
    sensor: u8,
    #[wire(key = 5)]
    value: i16,
    unit: String,
}

#[test]
fn integer_keys_on_both_wires() {
    let r = Reading {
        sensor: 1,
        value: -2,
        unit: "C".into(),
    };
    assert_eq!(
        to_cbor_vec(&r).unwrap(),
        vec![0xa3, 0x00, 0x01, 0x05, 0x21, 0x06, 0x61, b'C']
    );
    assert_eq!(to_json_string(&r).unwrap(), r#"{"0":1,"5":-2,"6":"C"}"#);

    let back: Reading = from_cbor(&to_cbor_vec(&r).unwrap()).unwrap();
    assert_eq!(back, r);
    let back: Reading = from_json(br#"{"6":"K","0":9}"#).unwrap();
    assert_eq!((back.sensor, back.unit.as_str()), (9, "K"));
}

#[derive(Model, Default, Debug)]
struct Tree {
    value: u32,
    children: Vec<Tree>,
}

#[test]
fn recursive_models_obey_the_depth_limit() {
    let t: Tree = from_json(br#"{"value":1,"children":[{"value":2,"children":[]}]}"#).unwrap();
    assert_eq!(t.children[0].value, 2);

    let input = br#"{"value":1,"children":[{"value":2,"children":[{"value":3,"children":[]}]}]}"#;
    let opts = ParseOptions::new().with_max_depth(3);
    let mut target = Tree::default();
    let err = parse_json_with(&mut target, input, &opts).unwrap_err();
    assert_eq!(err.code, ErrorCode::DepthLimitExceeded);
}

#[test]
fn trailing_data_is_rejected() {
    let err = from_json::<u8>(b"1 2").unwrap_err();
    assert_eq!(err.code, ErrorCode::Read(ReadError::ExcessData));
}

#[test]
fn full_buffer_is_a_serialize_error() {
    let mut buf = [0u8; 8];
    let err = serialize_json(&sample_config(), &mut buf).unwrap_err();
    assert_eq!(err.kind, ErrorKind::Serialize);
    assert_eq!(err.code, ErrorCode::Write(WriteError::BufferFull));

    let mut buf = [0u8; 128];
    let n = serialize_json(&sample_config(), &mut buf).unwrap();
    assert_eq!(&buf[..n], to_json_vec(&sample_config()).unwrap().as_slice());
}

#[test]
fn report_shows_the_window_around_the_failure() {
    let input = br#"{"id": 99}"#;
    let err = from_json::<Motor>(input).unwrap_err();
    let report = err.report(input).to_string();
    let mut lines = report.lines();
    assert_eq!(lines.next(), Some(err.to_string().as_str()));
    let window = lines.next().unwrap();
    assert!(window.contains(r#"{"id": 99}"#), "{report}");
    assert!(lines.next().unwrap().trim_end().ends_with('^'), "{report}");
}
