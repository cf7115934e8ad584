//! Configuration options for JSON rendering.
//!
//! [`RenderOptions`] selects between compact output (no insignificant
//! whitespace) and pretty output with a configurable indent width and
//! newline sequence.
//!
//! ## Examples
//!
//! ```rust
//! use packed_json::{to_string_with_options, JsonBuilder, RenderOptions};
//!
//! let mut builder = JsonBuilder::new();
//! builder.push_back(builder.root(), "x", 1u32).unwrap();
//!
//! let options = RenderOptions::pretty().with_indent(4).with_newline("\r\n");
//! let json = to_string_with_options(&builder, &options);
//! assert_eq!(json, "{\r\n    \"x\": 1\r\n}");
//! ```

use serde::{Deserialize, Serialize};

/// Configuration options for [`JsonRenderer`](crate::JsonRenderer).
///
/// # Examples
///
/// ```rust
/// use packed_json::RenderOptions;
///
/// // Default compact options
/// let options = RenderOptions::new();
/// assert!(!options.pretty);
///
/// // Pretty-printed with 2-space indentation
/// let options = RenderOptions::pretty();
/// assert_eq!(options.indent, 2);
/// ```
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct RenderOptions {
    pub pretty: bool,
    pub indent: usize,
    pub newline: String,
}

impl Default for RenderOptions {
    fn default() -> Self {
        RenderOptions {
            pretty: false,
            indent: 2,
            newline: "\n".to_string(),
        }
    }
}

impl RenderOptions {
    /// Creates default options (compact, 2-space indent, `\n` newlines).
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Creates options for pretty-printed output.
    ///
    /// # Examples
    ///
    /// ```rust
    /// use packed_json::RenderOptions;
    ///
    /// let options = RenderOptions::pretty();
    /// assert!(options.pretty);
    /// ```
    #[must_use]
    pub fn pretty() -> Self {
        RenderOptions {
            pretty: true,
            ..Default::default()
        }
    }

    #[must_use]
    pub fn with_pretty(mut self, pretty: bool) -> Self {
        self.pretty = pretty;
        self
    }

    /// Sets the number of spaces added per nesting level.
    ///
    /// Default is 2. Only affects pretty-printed output.
    #[must_use]
    pub fn with_indent(mut self, indent: usize) -> Self {
        self.indent = indent;
        self
    }

    /// Sets the line separator used in pretty output.
    #[must_use]
    pub fn with_newline(mut self, newline: impl Into<String>) -> Self {
        self.newline = newline.into();
        self
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults() {
        let options = RenderOptions::new();
        assert!(!options.pretty);
        assert_eq!(options.indent, 2);
        assert_eq!(options.newline, "\n");
    }

    #[test]
    fn test_loads_from_partial_config() {
        let options: RenderOptions = serde_json::from_str(r#"{"pretty":true}"#).unwrap();
        assert_eq!(options, RenderOptions::pretty());

        let text = serde_json::to_string(&RenderOptions::new().with_indent(4)).unwrap();
        let back: RenderOptions = serde_json::from_str(&text).unwrap();
        assert_eq!(back.indent, 4);
        assert!(!back.pretty);
    }

    #[test]
    fn test_builder_methods() {
        let options = RenderOptions::new()
            .with_pretty(true)
            .with_indent(0)
            .with_newline("\r\n");
        assert!(options.pretty);
        assert_eq!(options.indent, 0);
        assert_eq!(options.newline, "\r\n");
    }
}
