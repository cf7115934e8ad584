//! Build a tree, edit it, ship its bytes, and render it.
//!
//! Run with: cargo run --example build_and_render

use packed_json::{json_insert, to_string, to_string_pretty, JsonBuilder, Kind, Position};
use std::error::Error;

fn main() -> Result<(), Box<dyn Error>> {
    let mut builder = JsonBuilder::new();
    let root = builder.root();

    json_insert!(builder, root, {
        "e": 2.718,
        "enabled": true,
        "user": "john",
        "resolution": { "x": 1024, "y": 768 },
        "colors": ["Red", "Green", "Blue"]
    })?;
    println!("Compact:\n{}\n", to_string(&builder));

    // Move the colors into a new array at the front, then drop the user.
    let palette = builder.insert_node(Position::Front, root, "palette", Kind::ARRAY)?;
    if let Some(colors) = builder.find(root, ["colors"]) {
        builder.splice_back_if(colors, palette, |v| v.get::<&str>() != "Green");
    }
    if let Some(user) = builder.find(root, ["user"]) {
        builder.erase(user);
    }
    println!("Edited:\n{}\n", to_string_pretty(&builder));

    // The arena bytes are the wire format.
    let bytes = builder.as_bytes().to_vec();
    let loaded = packed_json::from_bytes(&bytes)?;
    assert_eq!(to_string(&loaded), to_string(&builder));
    println!("✓ {} bytes validated and reloaded", bytes.len());

    Ok(())
}
