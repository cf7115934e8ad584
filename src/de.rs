//! `Deserialize` for trees.
//!
//! Any self-describing serde format can be loaded into a [`JsonBuilder`].
//! The top level must be a map; its entries become the root's children.
//! Values map to kinds as follows:
//!
//! | serde value      | Kind   |
//! |------------------|--------|
//! | map              | Object |
//! | seq              | Array  |
//! | `bool`           | Bool   |
//! | `i64`            | Int    |
//! | `u64`            | UInt   |
//! | `f64`            | Float  |
//! | `str`            | Utf8   |
//! | unit / `None`    | Null   |
//!
//! [`NodeSeed`] loads a single value under an existing parent, which lets
//! callers graft deserialized data into a tree they are already building.
//!
//! ## Examples
//!
//! ```rust
//! use packed_json::JsonBuilder;
//!
//! let builder: JsonBuilder = serde_json::from_str(r#"{"a":[1,-2,3.5],"b":null}"#).unwrap();
//! assert_eq!(packed_json::to_string(&builder), r#"{"a":[1,-2,3.5],"b":null}"#);
//! ```

use serde::de::{self, DeserializeSeed, Deserializer, MapAccess, SeqAccess, Visitor};
use serde::Deserialize;
use std::fmt;

use crate::builder::{JsonBuilder, NodeId, Position};
use crate::node::Kind;

/// Deserializes one value and appends it to `parent` under `name`.
pub struct NodeSeed<'b> {
    builder: &'b mut JsonBuilder,
    parent: NodeId,
    name: String,
}

impl<'b> NodeSeed<'b> {
    pub fn new(builder: &'b mut JsonBuilder, parent: NodeId, name: impl Into<String>) -> Self {
        NodeSeed {
            builder,
            parent,
            name: name.into(),
        }
    }
}

fn build_error<E: de::Error>(err: crate::Error) -> E {
    E::custom(err)
}

/// Fills `target` from the entries of `map`.
fn fill_object<'de, A>(builder: &mut JsonBuilder, target: NodeId, mut map: A) -> Result<(), A::Error>
where
    A: MapAccess<'de>,
{
    while let Some(key) = map.next_key::<String>()? {
        map.next_value_seed(NodeSeed::new(builder, target, key))?;
    }
    Ok(())
}

impl<'de> DeserializeSeed<'de> for NodeSeed<'_> {
    type Value = NodeId;

    fn deserialize<D>(self, deserializer: D) -> Result<Self::Value, D::Error>
    where
        D: Deserializer<'de>,
    {
        deserializer.deserialize_any(self)
    }
}

impl<'de> Visitor<'de> for NodeSeed<'_> {
    type Value = NodeId;

    fn expecting(&self, formatter: &mut fmt::Formatter) -> fmt::Result {
        formatter.write_str("a JSON value")
    }

    fn visit_bool<E: de::Error>(self, v: bool) -> Result<NodeId, E> {
        self.builder
            .push_back(self.parent, self.name.as_str(), v)
            .map_err(build_error)
    }

    fn visit_i64<E: de::Error>(self, v: i64) -> Result<NodeId, E> {
        self.builder
            .push_back(self.parent, self.name.as_str(), v)
            .map_err(build_error)
    }

    fn visit_u64<E: de::Error>(self, v: u64) -> Result<NodeId, E> {
        self.builder
            .push_back(self.parent, self.name.as_str(), v)
            .map_err(build_error)
    }

    fn visit_f64<E: de::Error>(self, v: f64) -> Result<NodeId, E> {
        self.builder
            .push_back(self.parent, self.name.as_str(), v)
            .map_err(build_error)
    }

    fn visit_str<E: de::Error>(self, v: &str) -> Result<NodeId, E> {
        self.builder
            .push_back(self.parent, self.name.as_str(), v)
            .map_err(build_error)
    }

    fn visit_unit<E: de::Error>(self) -> Result<NodeId, E> {
        self.builder
            .push_back(self.parent, self.name.as_str(), ())
            .map_err(build_error)
    }

    fn visit_none<E: de::Error>(self) -> Result<NodeId, E> {
        self.visit_unit()
    }

    fn visit_some<D>(self, deserializer: D) -> Result<NodeId, D::Error>
    where
        D: Deserializer<'de>,
    {
        deserializer.deserialize_any(self)
    }

    fn visit_seq<A>(self, mut seq: A) -> Result<NodeId, A::Error>
    where
        A: SeqAccess<'de>,
    {
        let array = self
            .builder
            .insert_node(Position::Back, self.parent, self.name.as_str(), Kind::ARRAY)
            .map_err(build_error)?;
        while seq
            .next_element_seed(NodeSeed::new(&mut *self.builder, array, String::new()))?
            .is_some()
        {}
        Ok(array)
    }

    fn visit_map<A>(self, map: A) -> Result<NodeId, A::Error>
    where
        A: MapAccess<'de>,
    {
        let object = self
            .builder
            .insert_node(Position::Back, self.parent, self.name.as_str(), Kind::OBJECT)
            .map_err(build_error)?;
        fill_object(self.builder, object, map)?;
        Ok(object)
    }
}

struct RootVisitor;

impl<'de> Visitor<'de> for RootVisitor {
    type Value = JsonBuilder;

    fn expecting(&self, formatter: &mut fmt::Formatter) -> fmt::Result {
        formatter.write_str("a JSON object")
    }

    fn visit_map<A>(self, map: A) -> Result<JsonBuilder, A::Error>
    where
        A: MapAccess<'de>,
    {
        let mut builder = JsonBuilder::new();
        let root = builder.root();
        fill_object(&mut builder, root, map)?;
        Ok(builder)
    }
}

impl<'de> Deserialize<'de> for JsonBuilder {
    fn deserialize<D>(deserializer: D) -> Result<Self, D::Error>
    where
        D: Deserializer<'de>,
    {
        deserializer.deserialize_map(RootVisitor)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_deserialize_kinds() {
        let builder: JsonBuilder =
            serde_json::from_str(r#"{"u":1,"i":-1,"f":0.5,"s":"x","b":true,"n":null}"#).unwrap();
        let kinds: Vec<Kind> = builder.children(builder.root()).map(|v| v.kind()).collect();
        assert_eq!(
            kinds,
            [Kind::UINT, Kind::INT, Kind::FLOAT, Kind::UTF8, Kind::BOOL, Kind::NULL]
        );
    }

    #[test]
    fn test_deserialize_nested() {
        let text = r#"{"obj":{"arr":[[],{},[1,[2]]]},"empty":{}}"#;
        let builder: JsonBuilder = serde_json::from_str(text).unwrap();
        assert_eq!(crate::to_string(&builder), text);
        builder.validate_data().unwrap();
    }

    #[test]
    fn test_top_level_must_be_object() {
        assert!(serde_json::from_str::<JsonBuilder>("[1,2]").is_err());
        assert!(serde_json::from_str::<JsonBuilder>("3").is_err());
    }

    #[test]
    fn test_seed_grafts_into_existing_tree() {
        let mut builder = JsonBuilder::new();
        let root = builder.root();
        builder.push_back(root, "first", 1u8).unwrap();

        let mut de = serde_json::Deserializer::from_str(r#"{"k":"v"}"#);
        NodeSeed::new(&mut builder, root, "graft")
            .deserialize(&mut de)
            .unwrap();
        assert_eq!(crate::to_string(&builder), r#"{"first":1,"graft":{"k":"v"}}"#);
    }
}
