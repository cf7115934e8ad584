//! Physical layout of packed nodes.
//!
//! This module is the only place that knows where fields live inside the
//! arena. Everything else asks it for headers, names, payloads and child
//! offsets by node index.
//!
//! ## Layout
//!
//! All integers are little-endian; a pod is 4 bytes.
//!
//! ```text
//! pod 0   next_index: u32
//! pod 1   name_len: u24 | kind: u8
//! pod 2   data_size (leaf) or last_child (array/object)
//! pod 3.. name bytes, zero padded to a pod boundary
//!         leaf:      payload bytes, zero padded
//!         composite: the hidden sentinel (pods 0 and 1 only)
//! ```
//!
//! A hidden node only owns pods 0 and 1. Kinds below [`Kind::HIDDEN`] are
//! leaves and kinds at or above [`Kind::ARRAY`] are composites, so one
//! comparison classifies a node.

use std::fmt;
use zerocopy::little_endian::U32;
use zerocopy::{FromBytes, Immutable, IntoBytes, KnownLayout, Unaligned};

use crate::arena::{Span, POD_SIZE};

/// Longest node name in bytes.
pub const NAME_MAX: u32 = 0x00FF_FFFF;

/// Largest leaf payload in bytes.
pub const DATA_MAX: u32 = 0xF000_0000;

/// Bytes in the header shared by every node.
pub const NODE_HEADER_SIZE: usize = std::mem::size_of::<NodeHeader>();

/// Bytes in the header of a leaf or composite node.
pub const VALUE_HEADER_SIZE: usize = std::mem::size_of::<ValueHeader>();

pub const ROOT_INDEX: u32 = 0;

/// Index of the root's sentinel: a value header with an empty name.
pub const SENTINEL_INDEX: u32 = data_offset(0) as u32;

/// Pods taken by the root and its sentinel.
pub const ROOT_PODS: usize = (VALUE_HEADER_SIZE + NODE_HEADER_SIZE) / POD_SIZE;

/// Byte image of a tree that holds only the root.
///
/// Read paths use it for a builder whose arena has not been touched yet,
/// so an empty builder walks exactly like a materialized empty one.
pub const EMPTY_TREE: [u8; ROOT_PODS * POD_SIZE] = [
    3, 0, 0, 0, 0, 0, 0, 0xFF, 3, 0, 0, 0, // root
    0, 0, 0, 0, 0, 0, 0, 0xFD, // sentinel
];

/// Pods from the start of a node to its payload or first child.
#[inline]
#[must_use]
pub const fn data_offset(name_len: u32) -> usize {
    (name_len as usize + VALUE_HEADER_SIZE + POD_SIZE - 1) / POD_SIZE
}

/// Pods needed to hold `bytes` bytes.
#[inline]
#[must_use]
pub const fn pods_for(bytes: usize) -> usize {
    (bytes + POD_SIZE - 1) / POD_SIZE
}

/// The type tag stored in the top byte of pod 1.
///
/// Values 1 through 200 are free for application-defined leaf kinds.
#[derive(Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct Kind(u8);

impl Kind {
    pub const RESERVED: Kind = Kind(201);
    pub const BUILT_IN: Kind = Kind(244);
    /// UTF-8 text.
    pub const UTF8: Kind = Kind(245);
    /// Unsigned integer, 1, 2, 4 or 8 bytes.
    pub const UINT: Kind = Kind(246);
    /// Signed integer, 1, 2, 4 or 8 bytes.
    pub const INT: Kind = Kind(247);
    /// IEEE float, 4 or 8 bytes.
    pub const FLOAT: Kind = Kind(248);
    /// Boolean, 1 or 4 bytes.
    pub const BOOL: Kind = Kind(249);
    /// 100ns ticks since 1601-01-01T00:00:00Z, 8 bytes.
    pub const TIME: Kind = Kind(250);
    /// 16 bytes in network byte order.
    pub const UUID: Kind = Kind(251);
    /// No payload.
    pub const NULL: Kind = Kind(252);
    /// Erased node or composite sentinel.
    pub const HIDDEN: Kind = Kind(253);
    pub const ARRAY: Kind = Kind(254);
    pub const OBJECT: Kind = Kind(255);

    pub const CUSTOM_MAX: u8 = 200;

    #[inline]
    #[must_use]
    pub const fn from_raw(raw: u8) -> Self {
        Kind(raw)
    }

    /// Returns an application-defined kind, or `None` outside `1..=200`.
    #[inline]
    #[must_use]
    pub const fn custom(raw: u8) -> Option<Self> {
        if raw >= 1 && raw <= Self::CUSTOM_MAX {
            Some(Kind(raw))
        } else {
            None
        }
    }

    #[inline]
    #[must_use]
    pub const fn raw(self) -> u8 {
        self.0
    }

    #[inline]
    #[must_use]
    pub const fn is_leaf(self) -> bool {
        self.0 < Self::HIDDEN.0
    }

    #[inline]
    #[must_use]
    pub const fn is_hidden(self) -> bool {
        self.0 == Self::HIDDEN.0
    }

    #[inline]
    #[must_use]
    pub const fn is_composite(self) -> bool {
        self.0 >= Self::ARRAY.0
    }

    #[inline]
    #[must_use]
    pub const fn is_built_in(self) -> bool {
        self.0 > Self::BUILT_IN.0
    }

    /// Short name for built-in kinds.
    #[must_use]
    pub const fn name(self) -> Option<&'static str> {
        Some(match self.0 {
            245 => "utf8",
            246 => "uint",
            247 => "int",
            248 => "float",
            249 => "bool",
            250 => "time",
            251 => "uuid",
            252 => "null",
            253 => "hidden",
            254 => "array",
            255 => "object",
            _ => return None,
        })
    }
}

impl fmt::Debug for Kind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.name() {
            Some(name) => write!(f, "Kind({name})"),
            None => write!(f, "Kind(custom {})", self.0),
        }
    }
}

/// Pods 0 and 1, present on every node.
#[repr(C)]
#[derive(FromBytes, IntoBytes, Immutable, KnownLayout, Unaligned, Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct NodeHeader {
    next_index: U32,
    name_kind: U32,
}

impl NodeHeader {
    #[must_use]
    pub fn new(next_index: u32, name_len: u32, kind: Kind) -> Self {
        debug_assert!(name_len <= NAME_MAX);
        NodeHeader {
            next_index: U32::new(next_index),
            name_kind: U32::new(name_len | (u32::from(kind.0) << 24)),
        }
    }

    #[inline]
    #[must_use]
    pub fn next_index(&self) -> u32 {
        self.next_index.get()
    }

    #[inline]
    pub fn set_next_index(&mut self, next: u32) {
        self.next_index.set(next);
    }

    #[inline]
    #[must_use]
    pub fn name_len(&self) -> u32 {
        self.name_kind.get() & NAME_MAX
    }

    #[inline]
    #[must_use]
    pub fn kind(&self) -> Kind {
        Kind((self.name_kind.get() >> 24) as u8)
    }

    #[inline]
    pub fn set_kind(&mut self, kind: Kind) {
        self.name_kind.set(self.name_len() | (u32::from(kind.0) << 24));
    }
}

/// Pods 0 through 2, present on leaves and composites.
#[repr(C)]
#[derive(FromBytes, IntoBytes, Immutable, KnownLayout, Unaligned, Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct ValueHeader {
    pub node: NodeHeader,
    extent: U32,
}

impl ValueHeader {
    #[must_use]
    pub fn new(next_index: u32, name_len: u32, kind: Kind, extent: u32) -> Self {
        ValueHeader {
            node: NodeHeader::new(next_index, name_len, kind),
            extent: U32::new(extent),
        }
    }

    /// Raw third pod. Prefer [`body`] unless the kind is already known.
    #[inline]
    #[must_use]
    pub fn extent(&self) -> u32 {
        self.extent.get()
    }

    #[inline]
    pub fn set_extent(&mut self, extent: u32) {
        self.extent.set(extent);
    }
}

/// What pod 2 means for a given node.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Body {
    Leaf { data_size: u32 },
    Composite { last_child: u32 },
    Hidden,
}

impl Body {
    /// # Panics
    ///
    /// Panics unless this is a leaf.
    #[inline]
    #[must_use]
    pub fn data_size(self) -> u32 {
        match self {
            Body::Leaf { data_size } => data_size,
            other => panic!("payload access on a non-leaf node ({other:?})"),
        }
    }

    /// # Panics
    ///
    /// Panics unless this is an array or object.
    #[inline]
    #[must_use]
    pub fn last_child(self) -> u32 {
        match self {
            Body::Composite { last_child } => last_child,
            other => panic!("child access on a non-composite node ({other:?})"),
        }
    }
}

#[inline]
fn byte_at(index: u32) -> usize {
    index as usize * POD_SIZE
}

/// Header at `index`, or `None` if it would run past `bytes`.
#[inline]
#[must_use]
pub fn try_header(bytes: &[u8], index: u32) -> Option<&NodeHeader> {
    let tail = bytes.get(byte_at(index)..)?;
    NodeHeader::ref_from_prefix(tail).ok().map(|(h, _)| h)
}

/// Value header at `index`, or `None` if it would run past `bytes`.
#[inline]
#[must_use]
pub fn try_value_header(bytes: &[u8], index: u32) -> Option<&ValueHeader> {
    let tail = bytes.get(byte_at(index)..)?;
    ValueHeader::ref_from_prefix(tail).ok().map(|(h, _)| h)
}

/// # Panics
///
/// Panics if the header is out of range.
#[inline]
#[must_use]
pub fn header(bytes: &[u8], index: u32) -> &NodeHeader {
    try_header(bytes, index).unwrap_or_else(|| panic!("node {index} is out of range"))
}

/// # Panics
///
/// Panics if the header is out of range.
#[inline]
#[must_use]
pub fn value_header(bytes: &[u8], index: u32) -> &ValueHeader {
    try_value_header(bytes, index).unwrap_or_else(|| panic!("node {index} is out of range"))
}

/// # Panics
///
/// Panics if the header is out of range.
#[inline]
pub fn header_mut(bytes: &mut [u8], index: u32) -> &mut NodeHeader {
    bytes
        .get_mut(byte_at(index)..)
        .and_then(|tail| NodeHeader::mut_from_prefix(tail).ok())
        .map(|(h, _)| h)
        .unwrap_or_else(|| panic!("node {index} is out of range"))
}

/// # Panics
///
/// Panics if the header is out of range.
#[inline]
pub fn value_header_mut(bytes: &mut [u8], index: u32) -> &mut ValueHeader {
    bytes
        .get_mut(byte_at(index)..)
        .and_then(|tail| ValueHeader::mut_from_prefix(tail).ok())
        .map(|(h, _)| h)
        .unwrap_or_else(|| panic!("node {index} is out of range"))
}

#[inline]
#[must_use]
pub fn next_index(bytes: &[u8], index: u32) -> u32 {
    header(bytes, index).next_index()
}

#[inline]
pub fn set_next_index(bytes: &mut [u8], index: u32, next: u32) {
    header_mut(bytes, index).set_next_index(next);
}

#[inline]
#[must_use]
pub fn kind(bytes: &[u8], index: u32) -> Kind {
    header(bytes, index).kind()
}

/// Interprets pod 2 according to the node's kind.
#[must_use]
pub fn body(bytes: &[u8], index: u32) -> Body {
    let kind = kind(bytes, index);
    if kind.is_hidden() {
        Body::Hidden
    } else if kind.is_composite() {
        Body::Composite {
            last_child: value_header(bytes, index).extent(),
        }
    } else {
        Body::Leaf {
            data_size: value_header(bytes, index).extent(),
        }
    }
}

/// # Panics
///
/// Panics unless the node is an array or object.
#[inline]
pub fn set_last_child(bytes: &mut [u8], index: u32, last_child: u32) {
    assert!(kind(bytes, index).is_composite(), "node {index} has no children");
    value_header_mut(bytes, index).set_extent(last_child);
}

/// Index of the first linked child (always the sentinel) of a composite.
#[inline]
#[must_use]
pub fn first_child(bytes: &[u8], index: u32) -> u32 {
    index + data_offset(header(bytes, index).name_len()) as u32
}

/// Arena range of the node's name.
#[inline]
#[must_use]
pub fn name_span(bytes: &[u8], index: u32) -> Span {
    Span::new(byte_at(index) + VALUE_HEADER_SIZE, header(bytes, index).name_len() as usize)
}

/// Arena range of a leaf's payload.
///
/// # Panics
///
/// Panics unless the node is a leaf.
#[inline]
#[must_use]
pub fn data_span(bytes: &[u8], index: u32) -> Span {
    let data_size = body(bytes, index).data_size();
    Span::new(byte_at(first_child(bytes, index)), data_size as usize)
}

#[inline]
#[must_use]
pub fn name(bytes: &[u8], index: u32) -> &[u8] {
    &bytes[name_span(bytes, index).range()]
}

#[inline]
#[must_use]
pub fn data(bytes: &[u8], index: u32) -> &[u8] {
    &bytes[data_span(bytes, index).range()]
}

/// Writes a hidden sentinel at `index`.
#[inline]
pub fn write_sentinel(bytes: &mut [u8], index: u32, next: u32) {
    *header_mut(bytes, index) = NodeHeader::new(next, 0, Kind::HIDDEN);
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_header_sizes() {
        assert_eq!(NODE_HEADER_SIZE, 8);
        assert_eq!(VALUE_HEADER_SIZE, 12);
        assert_eq!(SENTINEL_INDEX, 3);
        assert_eq!(ROOT_PODS, 5);
    }

    #[test]
    fn test_data_offset() {
        assert_eq!(data_offset(0), 3);
        assert_eq!(data_offset(1), 4);
        assert_eq!(data_offset(4), 4);
        assert_eq!(data_offset(5), 5);
        assert_eq!(data_offset(NAME_MAX), (NAME_MAX as usize + 15) / 4);
    }

    #[test]
    fn test_kind_classes() {
        assert!(Kind::UTF8.is_leaf());
        assert!(Kind::NULL.is_leaf());
        assert!(!Kind::HIDDEN.is_leaf() && Kind::HIDDEN.is_hidden());
        assert!(Kind::ARRAY.is_composite() && Kind::OBJECT.is_composite());
        assert!(!Kind::HIDDEN.is_composite());
        assert_eq!(Kind::custom(7).map(Kind::raw), Some(7));
        assert!(Kind::custom(0).is_none() && Kind::custom(201).is_none());
        assert!(!Kind::custom(200).unwrap().is_built_in());
        assert!(Kind::UTF8.is_built_in());
    }

    #[test]
    fn test_empty_tree_image() {
        let root = value_header(&EMPTY_TREE, ROOT_INDEX);
        assert_eq!(root.node.kind(), Kind::OBJECT);
        assert_eq!(root.node.next_index(), SENTINEL_INDEX);
        assert_eq!(body(&EMPTY_TREE, ROOT_INDEX), Body::Composite { last_child: 3 });
        assert_eq!(kind(&EMPTY_TREE, SENTINEL_INDEX), Kind::HIDDEN);
        assert_eq!(next_index(&EMPTY_TREE, SENTINEL_INDEX), ROOT_INDEX);
    }

    #[test]
    fn test_name_kind_packing() {
        let mut bytes = [0u8; 16];
        *value_header_mut(&mut bytes, 0) = ValueHeader::new(9, 0x12_3456, Kind::UINT, 2);
        assert_eq!(&bytes[4..8], &[0x56, 0x34, 0x12, 246]);
        let h = header_mut(&mut bytes, 0);
        h.set_kind(Kind::HIDDEN);
        assert_eq!(h.name_len(), 0x12_3456);
        assert_eq!(body(&bytes, 0), Body::Hidden);
    }

    #[test]
    fn test_sentinel_needs_only_two_pods() {
        let bytes = [0u8, 0, 0, 0, 0, 0, 0, 0xFD];
        assert_eq!(body(&bytes, 0), Body::Hidden);
        assert!(try_value_header(&bytes, 0).is_none());
        assert!(try_header(&bytes, 2).is_none());
    }

    #[test]
    #[should_panic(expected = "non-leaf")]
    fn test_body_accessor_asserts_tag() {
        let _ = Body::Composite { last_child: 3 }.data_size();
    }
}
