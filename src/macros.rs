/// Inserts a literal JSON tree under an existing node.
///
/// The body is an object (`{ "key": value, ... }`) when `parent` is an
/// object, or an array (`[value, ...]`) when `parent` is an array. Values
/// are `null`, nested `{...}` or `[...]`, or any single token tree that
/// implements [`IntoLeaf`](crate::IntoLeaf). Wrap longer expressions,
/// including negative numbers, in parentheses.
///
/// Everything is appended at the back, in source order. The macro
/// evaluates to [`Result<()>`](crate::Result); on error, nodes inserted
/// before the failure stay in the tree.
///
/// # Examples
///
/// ```rust
/// use packed_json::{json_insert, JsonBuilder};
///
/// let mut builder = JsonBuilder::new();
/// let root = builder.root();
/// let x = 1024u32;
/// json_insert!(builder, root, {
///     "resolution": { "x": x, "y": 768 },
///     "offset": (-3),
///     "tags": ["a", null, true]
/// })
/// .unwrap();
///
/// assert_eq!(
///     packed_json::to_string(&builder),
///     r#"{"resolution":{"x":1024,"y":768},"offset":-3,"tags":["a",null,true]}"#
/// );
/// ```
#[macro_export]
macro_rules! json_insert {
    // Single value under a parent
    (@value $builder:ident, $parent:ident, $name:expr, null) => {
        $builder.push_back($parent, $name, ())?;
    };

    (@value $builder:ident, $parent:ident, $name:expr, [ $($elem:tt),* $(,)? ]) => {{
        let array = $builder.push_array($parent, $name)?;
        $(
            $crate::json_insert!(@value $builder, array, "", $elem);
        )*
    }};

    (@value $builder:ident, $parent:ident, $name:expr, { $($key:literal : $value:tt),* $(,)? }) => {{
        let object = $builder.push_object($parent, $name)?;
        $(
            $crate::json_insert!(@value $builder, object, $key, $value);
        )*
    }};

    (@value $builder:ident, $parent:ident, $name:expr, $value:expr) => {
        $builder.push_back($parent, $name, $value)?;
    };

    // Entries of an object parent
    ($builder:expr, $parent:expr, { $($key:literal : $value:tt),* $(,)? }) => {{
        #[allow(unused_variables)]
        let parent: $crate::NodeId = $parent;
        #[allow(unused_variables)]
        let builder: &mut $crate::JsonBuilder = &mut $builder;
        (|| -> $crate::Result<()> {
            $(
                $crate::json_insert!(@value builder, parent, $key, $value);
            )*
            Ok(())
        })()
    }};

    // Elements of an array parent
    ($builder:expr, $parent:expr, [ $($elem:tt),* $(,)? ]) => {{
        #[allow(unused_variables)]
        let parent: $crate::NodeId = $parent;
        #[allow(unused_variables)]
        let builder: &mut $crate::JsonBuilder = &mut $builder;
        (|| -> $crate::Result<()> {
            $(
                $crate::json_insert!(@value builder, parent, "", $elem);
            )*
            Ok(())
        })()
    }};
}
