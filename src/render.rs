//! JSON text output.
//!
//! [`JsonRenderer`] walks a tree and writes JSON into an internal buffer
//! that is reused between calls. Besides the standard JSON types it
//! writes two extensions as quoted strings:
//!
//! - **Time** as `"YYYY-MM-DDTHH:MM:SS.fffffffZ"` (100ns precision)
//! - **Uuid** as `"XXXXXXXX-XXXX-XXXX-XXXX-XXXXXXXXXXXX"` (uppercase)
//!
//! Custom kinds go through a [`CustomRender`] hook. The default hook writes
//! the placeholder `"Custom#N"`.
//!
//! The walk keeps its own stack, so nesting depth is bounded by memory
//! rather than by the call stack.
//!
//! ## Examples
//!
//! ```rust
//! use packed_json::{JsonBuilder, JsonRenderer, RenderOptions};
//!
//! let mut builder = JsonBuilder::new();
//! let root = builder.root();
//! let arr = builder.push_array(root, "arr").unwrap();
//! builder.push_back(arr, "", 1u32).unwrap();
//! builder.push_back(arr, "", 2u32).unwrap();
//!
//! let mut renderer = JsonRenderer::new(RenderOptions::new());
//! assert_eq!(renderer.render(&builder), r#"{"arr":[1,2]}"#);
//! ```

use std::fmt;
use uuid::Uuid;

use crate::builder::{Children, JsonBuilder, NodeId};
use crate::node::Kind;
use crate::options::RenderOptions;
use crate::value::{self, TimeStruct, ValueRef};

/// Renders leaves whose kind is not built in.
pub trait CustomRender {
    /// Appends the JSON text for `value` to `out`. The output must be a
    /// complete JSON value.
    fn render_custom(&self, value: ValueRef<'_>, out: &mut String);
}

/// Writes `"Custom#N"`, where `N` is the raw kind.
#[derive(Clone, Copy, Debug, Default)]
pub struct PlaceholderCustom;

impl CustomRender for PlaceholderCustom {
    fn render_custom(&self, value: ValueRef<'_>, out: &mut String) {
        out.push_str("\"Custom#");
        out.push_str(&value.kind().raw().to_string());
        out.push('"');
    }
}

struct Frame<'a> {
    children: Children<'a>,
    show_names: bool,
    count: usize,
}

/// Renders trees to JSON text.
pub struct JsonRenderer {
    output: String,
    options: RenderOptions,
    custom: Box<dyn CustomRender>,
}

impl Default for JsonRenderer {
    fn default() -> Self {
        JsonRenderer::new(RenderOptions::default())
    }
}

impl fmt::Debug for JsonRenderer {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("JsonRenderer")
            .field("options", &self.options)
            .field("len", &self.output.len())
            .finish_non_exhaustive()
    }
}

impl JsonRenderer {
    pub fn new(options: RenderOptions) -> Self {
        JsonRenderer {
            output: String::with_capacity(256),
            options,
            custom: Box::new(PlaceholderCustom),
        }
    }

    /// Replaces the hook used for custom kinds.
    #[must_use]
    pub fn with_custom(mut self, custom: impl CustomRender + 'static) -> Self {
        self.custom = Box::new(custom);
        self
    }

    pub fn options(&self) -> &RenderOptions {
        &self.options
    }

    pub fn options_mut(&mut self) -> &mut RenderOptions {
        &mut self.options
    }

    pub fn reserve(&mut self, additional: usize) {
        self.output.reserve(additional);
    }

    /// Output of the last render.
    pub fn as_str(&self) -> &str {
        &self.output
    }

    pub fn into_inner(self) -> String {
        self.output
    }

    /// Renders the whole tree as an object. An empty builder renders `{}`.
    pub fn render(&mut self, builder: &JsonBuilder) -> &str {
        self.render_node(builder, builder.root())
    }

    /// Renders one node. The root renders as an object; any other node
    /// renders as its value without its name.
    pub fn render_node(&mut self, builder: &JsonBuilder, id: NodeId) -> &str {
        self.render_value(builder.value(id))
    }

    pub fn render_value(&mut self, value: ValueRef<'_>) -> &str {
        self.output.clear();
        self.write_value(value);
        &self.output
    }

    fn write_value<'a>(&mut self, value: ValueRef<'a>) {
        let mut stack: Vec<Frame<'a>> = Vec::new();
        self.open(value, &mut stack);

        while let Some(frame) = stack.last_mut() {
            let step = frame.children.next().map(|child| {
                frame.count += 1;
                (child, frame.count == 1, frame.show_names)
            });
            match step {
                Some((child, first, show_names)) => {
                    if !first {
                        self.output.push(',');
                    }
                    self.write_newline(stack.len());
                    if show_names {
                        write_string(&mut self.output, child.name_bytes());
                        self.output.push(':');
                        if self.options.pretty {
                            self.output.push(' ');
                        }
                    }
                    self.open(child, &mut stack);
                }
                None => {
                    let Some(done) = stack.pop() else { break };
                    if done.count != 0 {
                        self.write_newline(stack.len());
                    }
                    self.output.push(if done.show_names { '}' } else { ']' });
                }
            }
        }
    }

    /// Writes a leaf, or the opening bracket of a composite and pushes
    /// a frame for its children.
    fn open<'a>(&mut self, value: ValueRef<'a>, stack: &mut Vec<Frame<'a>>) {
        let kind = value.kind();
        if kind.is_composite() {
            let show_names = kind == Kind::OBJECT;
            self.output.push(if show_names { '{' } else { '[' });
            stack.push(Frame {
                children: value.children(),
                show_names,
                count: 0,
            });
            return;
        }

        let out = &mut self.output;
        match kind {
            Kind::NULL => render_null(out),
            Kind::BOOL => render_bool(out, value::read_bool(value.data()).unwrap_or_default()),
            Kind::UTF8 => write_string(out, value.data()),
            Kind::FLOAT => render_float(out, value::read_float(value.data()).unwrap_or_default()),
            Kind::INT => render_int(out, value::read_int(value.data()).unwrap_or_default()),
            Kind::UINT => render_uint(out, value::read_uint(value.data()).unwrap_or_default()),
            Kind::TIME => {
                out.push('"');
                render_time(out, value::read_time(value.data()).unwrap_or_default());
                out.push('"');
            }
            Kind::UUID => {
                out.push('"');
                render_uuid(out, &value::read_uuid(value.data()).unwrap_or_default());
                out.push('"');
            }
            _ => self.custom.render_custom(value, out),
        }
    }

    fn write_newline(&mut self, depth: usize) {
        if self.options.pretty {
            self.output.push_str(&self.options.newline);
            let width = depth * self.options.indent;
            self.output.extend(std::iter::repeat(' ').take(width));
        }
    }
}

const HEX_UPPER: &[u8; 16] = b"0123456789ABCDEF";

/// Writes `bytes` as a quoted JSON string. Invalid UTF-8 is replaced
/// with U+FFFD.
pub fn write_string(out: &mut String, bytes: &[u8]) {
    out.push('"');
    for ch in String::from_utf8_lossy(bytes).chars() {
        match ch {
            '"' => out.push_str("\\\""),
            '\\' => out.push_str("\\\\"),
            '\u{0008}' => out.push_str("\\b"),
            '\t' => out.push_str("\\t"),
            '\n' => out.push_str("\\n"),
            '\u{000C}' => out.push_str("\\f"),
            '\r' => out.push_str("\\r"),
            c if (c as u32) < 0x20 => {
                let byte = c as u8;
                out.push_str("\\u00");
                out.push(char::from(HEX_UPPER[usize::from(byte >> 4)]));
                out.push(char::from(HEX_UPPER[usize::from(byte & 0xF)]));
            }
            c => out.push(c),
        }
    }
    out.push('"');
}

pub fn render_null(out: &mut String) {
    out.push_str("null");
}

pub fn render_bool(out: &mut String, value: bool) {
    out.push_str(if value { "true" } else { "false" });
}

pub fn render_uint(out: &mut String, value: u64) {
    out.push_str(&value.to_string());
}

pub fn render_int(out: &mut String, value: i64) {
    out.push_str(&value.to_string());
}

/// Shortest round-trip form. Magnitudes at or above 1e17 or below 1e-5
/// use exponent notation; NaN and infinities render as `null`.
pub fn render_float(out: &mut String, value: f64) {
    if !value.is_finite() {
        render_null(out);
        return;
    }
    let magnitude = value.abs();
    if magnitude == 0.0 || (1e-5..1e17).contains(&magnitude) {
        out.push_str(&value.to_string());
    } else {
        out.push_str(&format!("{value:e}"));
    }
}

/// Writes `YYYY-MM-DDTHH:MM:SS.fffffffZ` without quotes. Times chrono
/// cannot represent are written as `null`.
pub fn render_time(out: &mut String, value: TimeStruct) {
    let (secs, sub_ticks) = value.unix_parts();
    match chrono::DateTime::from_timestamp(secs, 0) {
        Some(time) => {
            out.push_str(&time.format("%Y-%m-%dT%H:%M:%S").to_string());
            out.push_str(&format!(".{sub_ticks:07}Z"));
        }
        None => render_null(out),
    }
}

/// Writes the hyphenated uppercase form without quotes.
pub fn render_uuid(out: &mut String, value: &Uuid) {
    let mut buf = Uuid::encode_buffer();
    out.push_str(value.hyphenated().encode_upper(&mut buf));
}

/// Writes the uppercase form wrapped in braces, without quotes.
pub fn render_uuid_with_braces(out: &mut String, value: &Uuid) {
    let mut buf = Uuid::encode_buffer();
    out.push_str(value.braced().encode_upper(&mut buf));
}
