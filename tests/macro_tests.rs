use packed_json::{json_insert, to_string, JsonBuilder, Kind, TimeStruct};

#[test]
fn test_json_insert_null_and_booleans() {
    let mut builder = JsonBuilder::new();
    let root = builder.root();
    json_insert!(builder, root, { "n": null, "t": true, "f": false }).unwrap();
    assert_eq!(to_string(&builder), r#"{"n":null,"t":true,"f":false}"#);
}

#[test]
fn test_json_insert_numbers() {
    let mut builder = JsonBuilder::new();
    let root = builder.root();
    json_insert!(builder, root, {
        "int": 42,
        "float": 3.5,
        "negative": (-123),
        "unsigned": 7u64
    })
    .unwrap();

    let kinds: Vec<Kind> = builder.children(root).map(|v| v.kind()).collect();
    assert_eq!(kinds, [Kind::INT, Kind::FLOAT, Kind::INT, Kind::UINT]);
    assert_eq!(
        to_string(&builder),
        r#"{"int":42,"float":3.5,"negative":-123,"unsigned":7}"#
    );
}

#[test]
fn test_json_insert_variables_and_typed_values() {
    let name = String::from("Alice");
    let when = TimeStruct::UNIX_EPOCH;
    let mut builder = JsonBuilder::new();
    let root = builder.root();
    json_insert!(builder, root, { "name": (&name), "when": when }).unwrap();
    assert_eq!(
        to_string(&builder),
        r#"{"name":"Alice","when":"1970-01-01T00:00:00.0000000Z"}"#
    );
}

#[test]
fn test_json_insert_nested() {
    let mut builder = JsonBuilder::new();
    let root = builder.root();
    json_insert!(builder, root, {
        "user": {
            "name": "Alice",
            "roles": ["admin", "user"],
            "address": { "city": "Paris" }
        },
        "matrix": [[1, 2], [3, 4], []],
    })
    .unwrap();

    assert_eq!(
        to_string(&builder),
        r#"{"user":{"name":"Alice","roles":["admin","user"],"address":{"city":"Paris"}},"matrix":[[1,2],[3,4],[]]}"#
    );
    let city = builder.find(root, ["user", "address", "city"]).unwrap();
    assert_eq!(builder.value(city).get::<&str>(), "Paris");
}

#[test]
fn test_json_insert_appends_to_existing_children() {
    let mut builder = JsonBuilder::new();
    let root = builder.root();
    let list = builder.push_array(root, "list").unwrap();
    builder.push_back(list, "", 0u8).unwrap();
    json_insert!(builder, list, [1, null]).unwrap();
    json_insert!(builder, list, [{ "k": 2 }]).unwrap();
    assert_eq!(to_string(&builder), r#"{"list":[0,1,null,{"k":2}]}"#);
}
