//! # packed_json
//!
//! Build JSON documents in a single contiguous buffer and render them to
//! text.
//!
//! ## What is it?
//!
//! A [`JsonBuilder`] stores a whole tree of objects, arrays and typed
//! leaves in one little-endian byte buffer. There is no allocation per
//! value: every node is a few 32-bit words inside the buffer, and nodes
//! refer to each other by word index. The buffer can be handed to another
//! process as-is and loaded back with [`JsonBuilder::from_bytes`], which
//! validates it before any traversal trusts it.
//!
//! ## Key Features
//!
//! - **Packed storage**: one growable buffer per tree, doubling growth
//! - **Stable ids**: [`NodeId`]s survive growth, erasure and splicing
//! - **Cheap deletion**: erased nodes are hidden in place and skipped
//! - **Typed leaves**: integers, floats, bools, strings, timestamps, UUIDs,
//!   null, and up to 200 caller-defined kinds
//! - **Safe loading**: a linear-time validator rejects overlapping nodes,
//!   dangling indices and cycles
//! - **Serde Compatible**: `Serialize` and `Deserialize` for [`JsonBuilder`]
//!
//! ## Quick Start
//!
//! ```rust
//! use packed_json::JsonBuilder;
//!
//! let mut builder = JsonBuilder::new();
//! let root = builder.root();
//! builder.push_back(root, "e", 2.718).unwrap();
//! builder.push_back(root, "enabled", true).unwrap();
//! let resolution = builder.push_object(root, "resolution").unwrap();
//! builder.push_back(resolution, "x", 1024u32).unwrap();
//! builder.push_back(resolution, "y", 768u32).unwrap();
//!
//! assert_eq!(
//!     packed_json::to_string(&builder),
//!     r#"{"e":2.718,"enabled":true,"resolution":{"x":1024,"y":768}}"#
//! );
//! ```
//!
//! ### Moving trees between processes
//!
//! ```rust
//! use packed_json::JsonBuilder;
//!
//! let mut builder = JsonBuilder::new();
//! builder.push_back(builder.root(), "answer", 42u8).unwrap();
//!
//! let bytes = builder.as_bytes().to_vec();
//! let loaded = packed_json::from_bytes(&bytes).unwrap();
//! assert_eq!(packed_json::to_string(&loaded), r#"{"answer":42}"#);
//! ```
//!
//! ### Literal trees with json_insert!
//!
//! ```rust
//! use packed_json::{json_insert, JsonBuilder};
//!
//! let mut builder = JsonBuilder::new();
//! let root = builder.root();
//! json_insert!(builder, root, {
//!     "user": "john",
//!     "colors": ["Red", "Green"]
//! })
//! .unwrap();
//!
//! assert_eq!(
//!     packed_json::to_string(&builder),
//!     r#"{"user":"john","colors":["Red","Green"]}"#
//! );
//! ```
//!
//! ## Modules
//!
//! - [`arena`]: the growable word buffer
//! - [`node`]: node layout and kinds
//! - [`builder`]: tree construction, traversal and editing
//! - [`validate`]: structural checks for untrusted buffers
//! - [`value`]: typed payload access
//! - [`render`]: JSON text output
//!
//! ## Safety Guarantees
//!
//! - No `unsafe` code blocks
//! - Loaded buffers are validated before they are walked
//! - Allocation failure is reported as [`Error::OutOfMemory`], not an abort
//! - Misusing a [`NodeId`] panics instead of touching another tree

pub mod arena;
pub mod builder;
pub mod de;
pub mod error;
pub mod macros;
pub mod node;
pub mod options;
pub mod render;
pub mod ser;
pub mod text;
pub mod validate;
pub mod value;

pub use arena::Span;
pub use builder::{Children, JsonBuilder, Name, NodeId, PendingValue, Position};
pub use de::NodeSeed;
pub use error::{Error, Result};
pub use node::{Body, Kind};
pub use options::RenderOptions;
pub use render::{CustomRender, JsonRenderer, PlaceholderCustom};
pub use text::{Cp1252Str, Latin1Str, Text, Utf16Str};
pub use validate::validate;
pub use value::{FromLeaf, IntoLeaf, TimeStruct, ValueRef};

use std::io;

/// Renders a tree as compact JSON.
///
/// # Examples
///
/// ```rust
/// use packed_json::{to_string, JsonBuilder};
///
/// let mut builder = JsonBuilder::new();
/// builder.push_back(builder.root(), "x", 1u32).unwrap();
/// assert_eq!(to_string(&builder), r#"{"x":1}"#);
/// ```
#[must_use]
pub fn to_string(builder: &JsonBuilder) -> String {
    to_string_with_options(builder, &RenderOptions::default())
}

/// Renders a tree as pretty-printed JSON with 2-space indentation.
///
/// # Examples
///
/// ```rust
/// use packed_json::{to_string_pretty, JsonBuilder};
///
/// let mut builder = JsonBuilder::new();
/// builder.push_back(builder.root(), "x", 1u32).unwrap();
/// assert_eq!(to_string_pretty(&builder), "{\n  \"x\": 1\n}");
/// ```
#[must_use]
pub fn to_string_pretty(builder: &JsonBuilder) -> String {
    to_string_with_options(builder, &RenderOptions::pretty())
}

/// Renders a tree as JSON with custom options.
#[must_use]
pub fn to_string_with_options(builder: &JsonBuilder, options: &RenderOptions) -> String {
    let mut renderer = JsonRenderer::new(options.clone());
    renderer.render(builder);
    renderer.into_inner()
}

/// Renders a tree as compact JSON into a writer.
///
/// # Examples
///
/// ```rust
/// use packed_json::{to_writer, JsonBuilder};
///
/// let mut builder = JsonBuilder::new();
/// builder.push_back(builder.root(), "x", 1u32).unwrap();
///
/// let mut buffer = Vec::new();
/// to_writer(&mut buffer, &builder).unwrap();
/// assert_eq!(buffer, br#"{"x":1}"#);
/// ```
///
/// # Errors
///
/// Returns an error if writing to the writer fails.
#[must_use = "this returns the result of the operation, errors must be handled"]
pub fn to_writer<W>(writer: W, builder: &JsonBuilder) -> Result<()>
where
    W: io::Write,
{
    to_writer_with_options(writer, builder, &RenderOptions::default())
}

/// Renders a tree as JSON into a writer with custom options.
///
/// # Errors
///
/// Returns an error if writing to the writer fails.
#[must_use = "this returns the result of the operation, errors must be handled"]
pub fn to_writer_with_options<W>(
    mut writer: W,
    builder: &JsonBuilder,
    options: &RenderOptions,
) -> Result<()>
where
    W: io::Write,
{
    let mut renderer = JsonRenderer::new(options.clone());
    writer.write_all(renderer.render(builder).as_bytes())?;
    Ok(())
}

/// Loads a tree from its binary form, validating it first.
///
/// # Errors
///
/// [`Error::CorruptData`] if the buffer is not a well-formed tree,
/// [`Error::OutOfMemory`] if the copy cannot be allocated.
#[must_use = "this returns the result of the operation, errors must be handled"]
pub fn from_bytes(bytes: &[u8]) -> Result<JsonBuilder> {
    JsonBuilder::from_bytes(bytes, true)
}
