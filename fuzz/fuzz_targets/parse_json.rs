#![no_main]

use std::collections::BTreeMap;

use libfuzzer_sys::fuzz_target;

use shapewire::{parse_json_with, Model, ParseOptions};

#[derive(Model, Default, Debug)]
#[wire(allow_excess_fields)]
struct Target {
    #[wire(max_length = 64)]
    name: String,
    #[wire(range(-1000, 1000))]
    level: i32,
    ratio: Option<f64>,
    #[wire(max_items = 32)]
    tags: Vec<String>,
    props: BTreeMap<String, u64>,
    child: Option<Box<Target>>,
}

fuzz_target!(|data: &[u8]| {
    let options = ParseOptions::new().with_max_depth(32);
    let mut target = Target::default();
    if let Err(err) = parse_json_with(&mut target, data, &options) {
        assert!(err.offset <= data.len());
        let _ = err.report(data).to_string();
    }
});
