use packed_json::{from_bytes, validate, JsonBuilder, Kind, Position};

fn put_u32(bytes: &mut [u8], pod: usize, value: u32) {
    bytes[pod * 4..pod * 4 + 4].copy_from_slice(&value.to_le_bytes());
}

fn get_u32(bytes: &[u8], pod: usize) -> u32 {
    u32::from_le_bytes(bytes[pod * 4..pod * 4 + 4].try_into().unwrap())
}

fn two_objects() -> (JsonBuilder, u32, u32) {
    let mut builder = JsonBuilder::new();
    let root = builder.root();
    let a = builder.push_object(root, "a").unwrap();
    builder.push_back(a, "x", 1u8).unwrap();
    let b = builder.push_object(root, "b").unwrap();
    builder.push_back(b, "y", 2u8).unwrap();
    (builder, a.index(), b.index())
}

#[test]
fn test_accepts_every_builder_output() {
    let (mut builder, _, _) = two_objects();
    validate(builder.as_bytes()).unwrap();

    let root = builder.root();
    let a = builder.find(root, ["a"]).unwrap();
    let b = builder.find(root, ["b"]).unwrap();
    builder.splice_front(b, a);
    validate(builder.as_bytes()).unwrap();

    builder.erase(b);
    builder.insert_node(Position::Front, a, "n", Kind::NULL).unwrap();
    validate(builder.as_bytes()).unwrap();

    builder.clear();
    validate(builder.as_bytes()).unwrap();
}

#[test]
fn test_accepts_deep_trees() {
    let mut builder = JsonBuilder::new();
    let mut parent = builder.root();
    for depth in 0..50_000u32 {
        parent = builder.push_object(parent, "d").unwrap();
        if depth % 1000 == 0 {
            builder.push_back(parent, "depth", depth).unwrap();
        }
    }
    let loaded = from_bytes(builder.as_bytes()).unwrap();
    assert_eq!(loaded.as_bytes(), builder.as_bytes());
}

#[test]
fn test_rejects_every_truncation() {
    let (builder, _, _) = two_objects();
    let bytes = builder.as_bytes();
    for cut in 1..bytes.len() {
        let err = from_bytes(&bytes[..cut]).unwrap_err();
        assert!(err.is_corrupt(), "prefix of {cut} bytes: {err}");
    }
}

#[test]
fn test_rejects_root_without_children_list() {
    let (builder, _, _) = two_objects();
    let mut bytes = builder.as_bytes().to_vec();
    // The root's next skips its own sentinel, leaving it unclaimed.
    put_u32(&mut bytes, 0, 0);
    assert!(from_bytes(&bytes).unwrap_err().is_corrupt());
}

#[test]
fn test_rejects_shared_children() {
    let (builder, a, b) = two_objects();
    let mut bytes = builder.as_bytes().to_vec();
    // Give `b` the same last child as `a`: the walk from b's sentinel
    // cannot reach it without revisiting nodes.
    let a_last = get_u32(&bytes, a as usize + 2);
    put_u32(&mut bytes, b as usize + 2, a_last);
    assert!(from_bytes(&bytes).unwrap_err().is_corrupt());
}

#[test]
fn test_rejects_composite_as_first_child() {
    let (builder, a, _) = two_objects();
    let mut bytes = builder.as_bytes().to_vec();
    // The sentinel of `a` sits right after its one-byte name.
    let sentinel = a as usize + 4;
    bytes[sentinel * 4 + 7] = Kind::OBJECT.raw();
    assert!(from_bytes(&bytes).is_err());
}

#[test]
fn test_rejects_unnamed_root_violation() {
    let (builder, _, _) = two_objects();
    let mut bytes = builder.as_bytes().to_vec();
    bytes[4] = 1;
    assert!(from_bytes(&bytes).unwrap_err().is_corrupt());
}

#[test]
fn test_unvalidated_load_keeps_bytes() {
    let bytes = [0u8; 8];
    let builder = JsonBuilder::from_bytes(&bytes, false).unwrap();
    assert_eq!(builder.as_bytes(), &bytes);
    assert!(builder.validate_data().unwrap_err().is_corrupt());
}
