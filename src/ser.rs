//! `Serialize` for trees.
//!
//! A [`JsonBuilder`] serializes as a map of the root's children, so any
//! serde format can consume it. Leaves map onto serde's data model:
//!
//! | Kind   | Serialized as                          |
//! |--------|----------------------------------------|
//! | Object | map, keyed by child name               |
//! | Array  | sequence (names dropped)               |
//! | UInt   | `u64`                                  |
//! | Int    | `i64`                                  |
//! | Float  | `f64`                                  |
//! | Bool   | `bool`                                 |
//! | Utf8   | `str`                                  |
//! | Null   | unit                                   |
//! | Time   | `str`, same text as the renderer       |
//! | Uuid   | `str`, hyphenated uppercase            |
//! | custom | `str`, `Custom#N`                      |
//!
//! ## Examples
//!
//! ```rust
//! use packed_json::JsonBuilder;
//!
//! let mut builder = JsonBuilder::new();
//! let root = builder.root();
//! builder.push_back(root, "id", 7u32).unwrap();
//! let tags = builder.push_array(root, "tags").unwrap();
//! builder.push_back(tags, "", "a").unwrap();
//!
//! let json = serde_json::to_string(&builder).unwrap();
//! assert_eq!(json, r#"{"id":7,"tags":["a"]}"#);
//! ```

use serde::ser::{SerializeMap, SerializeSeq};
use serde::{Serialize, Serializer};

use crate::builder::JsonBuilder;
use crate::node::Kind;
use crate::render;
use crate::value::{self, ValueRef};

impl Serialize for JsonBuilder {
    fn serialize<S>(&self, serializer: S) -> std::result::Result<S::Ok, S::Error>
    where
        S: Serializer,
    {
        self.value(self.root()).serialize(serializer)
    }
}

impl Serialize for ValueRef<'_> {
    fn serialize<S>(&self, serializer: S) -> std::result::Result<S::Ok, S::Error>
    where
        S: Serializer,
    {
        let data = || self.data();
        match self.kind() {
            Kind::OBJECT => {
                let mut map = serializer.serialize_map(None)?;
                for child in self.children() {
                    map.serialize_entry(&child.name(), &child)?;
                }
                map.end()
            }
            Kind::ARRAY => {
                let mut seq = serializer.serialize_seq(None)?;
                for child in self.children() {
                    seq.serialize_element(&child)?;
                }
                seq.end()
            }
            Kind::NULL => serializer.serialize_unit(),
            Kind::BOOL => serializer.serialize_bool(value::read_bool(data()).unwrap_or_default()),
            Kind::UINT => serializer.serialize_u64(value::read_uint(data()).unwrap_or_default()),
            Kind::INT => serializer.serialize_i64(value::read_int(data()).unwrap_or_default()),
            Kind::FLOAT => serializer.serialize_f64(value::read_float(data()).unwrap_or_default()),
            Kind::UTF8 => serializer.serialize_str(&String::from_utf8_lossy(data())),
            Kind::TIME => {
                let mut text = String::with_capacity(28);
                render::render_time(&mut text, value::read_time(data()).unwrap_or_default());
                serializer.serialize_str(&text)
            }
            Kind::UUID => {
                let mut text = String::with_capacity(36);
                render::render_uuid(&mut text, &value::read_uuid(data()).unwrap_or_default());
                serializer.serialize_str(&text)
            }
            kind => serializer.serialize_str(&format!("Custom#{}", kind.raw())),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{Position, TimeStruct};
    use uuid::Uuid;

    #[test]
    fn test_serialize_empty_builder() {
        let builder = JsonBuilder::new();
        assert_eq!(serde_json::to_string(&builder).unwrap(), "{}");
    }

    #[test]
    fn test_serialize_matches_renderer() {
        let mut builder = JsonBuilder::new();
        let root = builder.root();
        builder.push_back(root, "e", 2.718).unwrap();
        builder.push_back(root, "n", -4i8).unwrap();
        builder.push_back(root, "big", u64::MAX).unwrap();
        builder.push_back(root, "none", ()).unwrap();
        let obj = builder.push_object(root, "obj").unwrap();
        builder.push_back(obj, "quote", "say \"hi\"").unwrap();
        let arr = builder.push_array(obj, "arr").unwrap();
        builder.push_back(arr, "", false).unwrap();

        let via_serde = serde_json::to_value(&builder).unwrap();
        let via_render: serde_json::Value =
            serde_json::from_str(&crate::to_string(&builder)).unwrap();
        assert_eq!(via_serde, via_render);
    }

    #[test]
    fn test_serialize_extension_kinds() {
        let mut builder = JsonBuilder::new();
        let root = builder.root();
        builder.push_back(root, "t", TimeStruct::UNIX_EPOCH).unwrap();
        builder.push_back(root, "u", Uuid::nil()).unwrap();
        let kind = Kind::custom(3).unwrap();
        builder.insert_leaf(Position::Back, root, "c", kind, &[]).unwrap();

        let json = serde_json::to_string(&builder).unwrap();
        assert_eq!(
            json,
            r#"{"t":"1970-01-01T00:00:00.0000000Z","u":"00000000-0000-0000-0000-000000000000","c":"Custom#3"}"#
        );
    }

    #[test]
    fn test_serialize_single_value() {
        let mut builder = JsonBuilder::new();
        let arr = builder.push_array(builder.root(), "a").unwrap();
        builder.push_back(arr, "", 1u8).unwrap();
        builder.push_back(arr, "", "two").unwrap();
        let json = serde_json::to_string(&builder.value(arr)).unwrap();
        assert_eq!(json, r#"[1,"two"]"#);
    }
}
