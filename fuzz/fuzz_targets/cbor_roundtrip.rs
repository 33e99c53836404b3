#![no_main]

use libfuzzer_sys::fuzz_target;

use shapewire::{from_cbor, to_cbor_vec, Model};

#[derive(Model, Default, Debug, PartialEq)]
struct Target {
    id: u64,
    delta: i64,
    label: String,
    flags: Vec<bool>,
    extra: Option<String>,
}

fuzz_target!(|data: &[u8]| {
    if let Ok(value) = from_cbor::<Target>(data) {
        let bytes = to_cbor_vec(&value).expect("parsed value must serialize");
        let back: Target = from_cbor(&bytes).expect("serialized value must parse");
        assert_eq!(back, value);
    }
});
