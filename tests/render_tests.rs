use chrono::{DateTime, Utc};
use packed_json::{
    to_string, to_string_pretty, to_string_with_options, to_writer_with_options, CustomRender,
    JsonBuilder, JsonRenderer, Kind, Position, RenderOptions, TimeStruct, ValueRef,
};
use uuid::Uuid;

fn nested() -> JsonBuilder {
    let mut builder = JsonBuilder::new();
    let root = builder.root();
    let obj = builder.push_object(root, "obj").unwrap();
    builder.push_back(obj, "str", "strval").unwrap();
    builder.push_back(obj, "str2", "str2val").unwrap();
    let arr = builder.push_array(root, "arr").unwrap();
    builder.push_back(arr, "", 1u32).unwrap();
    builder.push_back(arr, "", 2u32).unwrap();
    builder
}

#[test]
fn test_compact_and_pretty() {
    let builder = nested();
    assert_eq!(
        to_string(&builder),
        r#"{"obj":{"str":"strval","str2":"str2val"},"arr":[1,2]}"#
    );
    assert_eq!(
        to_string_pretty(&builder),
        "{\n  \"obj\": {\n    \"str\": \"strval\",\n    \"str2\": \"str2val\"\n  },\n  \"arr\": [\n    1,\n    2\n  ]\n}"
    );
}

#[test]
fn test_custom_indent_and_newline() {
    let builder = nested();
    let options = RenderOptions::pretty().with_indent(1).with_newline("\r\n");
    assert_eq!(
        to_string_with_options(&builder, &options),
        "{\r\n \"obj\": {\r\n  \"str\": \"strval\",\r\n  \"str2\": \"str2val\"\r\n },\r\n \"arr\": [\r\n  1,\r\n  2\r\n ]\r\n}"
    );

    let mut out = Vec::new();
    to_writer_with_options(&mut out, &builder, &options).unwrap();
    assert_eq!(out, to_string_with_options(&builder, &options).into_bytes());
}

#[test]
fn test_pretty_output_is_valid_json() {
    let builder = nested();
    let pretty: serde_json::Value = serde_json::from_str(&to_string_pretty(&builder)).unwrap();
    let compact: serde_json::Value = serde_json::from_str(&to_string(&builder)).unwrap();
    assert_eq!(pretty, compact);
}

#[test]
fn test_empty_composites_stay_on_one_line() {
    let mut builder = JsonBuilder::new();
    let root = builder.root();
    builder.push_object(root, "o").unwrap();
    builder.push_array(root, "a").unwrap();
    assert_eq!(to_string_pretty(&builder), "{\n  \"o\": {},\n  \"a\": []\n}");
}

#[test]
fn test_renderer_reuses_buffer() {
    let builder = nested();
    let mut renderer = JsonRenderer::new(RenderOptions::new());
    renderer.reserve(1024);
    let first = renderer.render(&builder).to_string();
    let second = renderer.render(&builder).to_string();
    assert_eq!(first, second);

    let arr = builder.find(builder.root(), ["arr"]).unwrap();
    assert_eq!(renderer.render_node(&builder, arr), "[1,2]");
    assert_eq!(renderer.as_str(), "[1,2]");
}

#[test]
fn test_strings_are_escaped() {
    let mut builder = JsonBuilder::new();
    let root = builder.root();
    builder.push_back(root, "tab\tkey", "line\nbreak \"quoted\" \\ \u{7}").unwrap();
    let text = to_string(&builder);
    assert_eq!(text, r#"{"tab\tkey":"line\nbreak \"quoted\" \\ \u0007"}"#);

    let parsed: serde_json::Value = serde_json::from_str(&text).unwrap();
    assert_eq!(parsed["tab\tkey"], "line\nbreak \"quoted\" \\ \u{7}");
}

#[test]
fn test_numbers() {
    let mut builder = JsonBuilder::new();
    let root = builder.root();
    builder.push_back(root, "min", i64::MIN).unwrap();
    builder.push_back(root, "max", u64::MAX).unwrap();
    builder.push_back(root, "small", -7i8).unwrap();
    builder.push_back(root, "half", 0.5f32).unwrap();
    builder.push_back(root, "tiny", 1e-9).unwrap();
    builder.push_back(root, "huge", 6.02e23).unwrap();
    builder.push_back(root, "nan", f64::NAN).unwrap();
    assert_eq!(
        to_string(&builder),
        r#"{"min":-9223372036854775808,"max":18446744073709551615,"small":-7,"half":0.5,"tiny":1e-9,"huge":6.02e23,"nan":null}"#
    );
}

#[test]
fn test_time_and_uuid() {
    let mut builder = JsonBuilder::new();
    let root = builder.root();
    builder.push_back(root, "epoch", TimeStruct::UNIX_EPOCH).unwrap();
    let when = DateTime::<Utc>::from_timestamp(1_700_000_000, 123_456_700).unwrap();
    builder.push_back(root, "when", when).unwrap();
    let id = Uuid::parse_str("a1a2a3a4-b1b2-c1c2-d1d2-d3d4d5d6d7d8").unwrap();
    builder.push_back(root, "id", id).unwrap();

    assert_eq!(
        to_string(&builder),
        r#"{"epoch":"1970-01-01T00:00:00.0000000Z","when":"2023-11-14T22:13:20.1234567Z","id":"A1A2A3A4-B1B2-C1C2-D1D2-D3D4D5D6D7D8"}"#
    );
    let stored = builder.find(root, ["when"]).unwrap();
    assert_eq!(builder.value(stored).get::<DateTime<Utc>>(), when);
}

#[test]
fn test_hidden_and_erased_nodes_are_skipped() {
    let mut builder = nested();
    let root = builder.root();
    let obj = builder.find(root, ["obj"]).unwrap();
    let first = builder.begin_of(obj);
    builder.erase(first);
    let arr = builder.find(root, ["arr"]).unwrap();
    let last = builder.push_back(arr, "", 3u32).unwrap();
    builder.erase(last);
    assert_eq!(to_string(&builder), r#"{"obj":{"str2":"str2val"},"arr":[1,2]}"#);
}

struct KindName;

impl CustomRender for KindName {
    fn render_custom(&self, value: ValueRef<'_>, out: &mut String) {
        out.push_str(&format!("{{\"kind\":{},\"len\":{}}}", value.kind().raw(), value.data().len()));
    }
}

#[test]
fn test_custom_kinds() {
    let mut builder = JsonBuilder::new();
    let root = builder.root();
    let arr = builder.push_array(root, "items").unwrap();
    builder
        .insert_leaf(Position::Back, arr, "", Kind::custom(1).unwrap(), b"abc")
        .unwrap();
    builder
        .insert_leaf(Position::Back, arr, "", Kind::custom(200).unwrap(), &[])
        .unwrap();

    assert_eq!(to_string(&builder), r#"{"items":["Custom#1","Custom#200"]}"#);

    let mut renderer = JsonRenderer::new(RenderOptions::new()).with_custom(KindName);
    assert_eq!(
        renderer.render(&builder),
        r#"{"items":[{"kind":1,"len":3},{"kind":200,"len":0}]}"#
    );
}

#[test]
fn test_deep_nesting_renders() {
    let mut builder = JsonBuilder::new();
    let mut parent = builder.root();
    for _ in 0..10_000 {
        parent = builder.push_array(parent, "").unwrap();
    }
    let text = to_string(&builder);
    assert_eq!(text.len(), 2 + 10_000 * 2 + 3);
    assert!(text.starts_with(r#"{"":[[[["#));
    assert!(text.ends_with("]]]]}"));
}

#[test]
fn test_floats_parse_back_exactly() {
    let values = [-3.531_089_941_458_518_4e-183, 1e-300, 0.1, 123_456.789, -2.5e17];
    let mut builder = JsonBuilder::new();
    let arr = builder.push_array(builder.root(), "f").unwrap();
    for value in values {
        builder.push_back(arr, "", value).unwrap();
    }

    let mut renderer = JsonRenderer::new(RenderOptions::new());
    let text = renderer.render_node(&builder, arr).to_string();
    let by_std: Vec<f64> = text
        .trim_matches(|c| c == '[' || c == ']')
        .split(',')
        .map(|n| n.parse().unwrap())
        .collect();
    assert_eq!(by_std, values);

    let by_serde: Vec<f64> = serde_json::from_str(&text).unwrap();
    assert_eq!(by_serde, values);
}
