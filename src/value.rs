//! Typed access to nodes.
//!
//! A [`ValueRef`] is a read-only view of one node. Leaves carry raw bytes
//! tagged with a [`Kind`]; this module maps Rust types to and from those
//! bytes.
//!
//! - [`ValueRef::get`] reads a payload whose kind must match the requested
//!   type exactly. A mismatch is a programming error and panics.
//! - [`ValueRef::convert`] tries a lossless conversion and returns `None`
//!   when the kinds are incompatible or the value is out of range.
//! - [`IntoLeaf`] picks the kind and payload used when inserting a value.
//!
//! ## Payload widths
//!
//! | Kind  | Accepted payload sizes |
//! |-------|------------------------|
//! | UInt  | 1, 2, 4, 8             |
//! | Int   | 1, 2, 4, 8             |
//! | Float | 4, 8                   |
//! | Bool  | 1, 4                   |
//! | Time  | 8                      |
//! | Uuid  | 16                     |
//!
//! ## Examples
//!
//! ```rust
//! use packed_json::JsonBuilder;
//!
//! let mut builder = JsonBuilder::new();
//! let id = builder.push_back(builder.root(), "n", -5i16).unwrap();
//!
//! let value = builder.value(id);
//! assert_eq!(value.get::<i64>(), -5);
//! assert_eq!(value.convert::<f64>(), Some(-5.0));
//! assert_eq!(value.convert::<u32>(), None);
//! ```

use chrono::{DateTime, Utc};
use std::borrow::Cow;
use std::fmt;
use uuid::Uuid;

use crate::builder::{Children, JsonBuilder, NodeId, PendingValue};
use crate::error::Result;
use crate::node::{self, Body, Kind};
use crate::text::{Cp1252Str, Latin1Str, Text, Utf16Str};

/// 100ns ticks per second.
pub const TICKS_PER_SECOND: u64 = 10_000_000;

/// Ticks from 1601-01-01 to 1970-01-01.
pub const FILETIME_1970: u64 = 116_444_736_000_000_000;

/// A timestamp as 100ns ticks since 1601-01-01T00:00:00Z.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct TimeStruct {
    ticks: u64,
}

impl TimeStruct {
    pub const UNIX_EPOCH: TimeStruct = TimeStruct {
        ticks: FILETIME_1970,
    };

    #[inline]
    #[must_use]
    pub const fn from_ticks(ticks: u64) -> Self {
        TimeStruct { ticks }
    }

    #[inline]
    #[must_use]
    pub const fn ticks(self) -> u64 {
        self.ticks
    }

    /// Seconds since the Unix epoch and the remaining sub-second ticks.
    #[inline]
    #[must_use]
    pub const fn unix_parts(self) -> (i64, u32) {
        let whole = (self.ticks / TICKS_PER_SECOND) as i64;
        let sub = (self.ticks % TICKS_PER_SECOND) as u32;
        (whole - (FILETIME_1970 / TICKS_PER_SECOND) as i64, sub)
    }

    #[must_use]
    pub fn to_datetime(self) -> Option<DateTime<Utc>> {
        let (secs, sub) = self.unix_parts();
        DateTime::from_timestamp(secs, sub * 100)
    }
}

impl From<DateTime<Utc>> for TimeStruct {
    /// Saturates at the ends of the representable range.
    fn from(time: DateTime<Utc>) -> Self {
        let ticks = i128::from(time.timestamp()) * i128::from(TICKS_PER_SECOND)
            + i128::from(time.timestamp_subsec_nanos() / 100)
            + i128::from(FILETIME_1970);
        TimeStruct {
            ticks: ticks.clamp(0, i128::from(u64::MAX)) as u64,
        }
    }
}

fn fixed<const N: usize>(data: &[u8]) -> Option<[u8; N]> {
    data.try_into().ok()
}

pub(crate) fn read_uint(data: &[u8]) -> Option<u64> {
    Some(match data.len() {
        1 => u64::from(data[0]),
        2 => u64::from(u16::from_le_bytes(fixed(data)?)),
        4 => u64::from(u32::from_le_bytes(fixed(data)?)),
        8 => u64::from_le_bytes(fixed(data)?),
        _ => return None,
    })
}

pub(crate) fn read_int(data: &[u8]) -> Option<i64> {
    Some(match data.len() {
        1 => i64::from(data[0] as i8),
        2 => i64::from(i16::from_le_bytes(fixed(data)?)),
        4 => i64::from(i32::from_le_bytes(fixed(data)?)),
        8 => i64::from_le_bytes(fixed(data)?),
        _ => return None,
    })
}

pub(crate) fn read_float(data: &[u8]) -> Option<f64> {
    Some(match data.len() {
        4 => f64::from(f32::from_le_bytes(fixed(data)?)),
        8 => f64::from_le_bytes(fixed(data)?),
        _ => return None,
    })
}

pub(crate) fn read_bool(data: &[u8]) -> Option<bool> {
    match data.len() {
        1 => Some(data[0] != 0),
        4 => Some(u32::from_le_bytes(fixed(data)?) != 0),
        _ => None,
    }
}

pub(crate) fn read_time(data: &[u8]) -> Option<TimeStruct> {
    fixed(data).map(|raw| TimeStruct::from_ticks(u64::from_le_bytes(raw)))
}

pub(crate) fn read_uuid(data: &[u8]) -> Option<Uuid> {
    fixed(data).map(Uuid::from_bytes)
}

const TWO_POW_63: f64 = 9_223_372_036_854_775_808.0;
const TWO_POW_64: f64 = 18_446_744_073_709_551_616.0;

fn convert_u64(kind: Kind, data: &[u8]) -> Option<u64> {
    match kind {
        Kind::UINT => read_uint(data),
        Kind::INT => read_int(data).and_then(|n| u64::try_from(n).ok()),
        Kind::FLOAT => read_float(data)
            .filter(|f| (0.0..TWO_POW_64).contains(f))
            .map(|f| f as u64),
        _ => None,
    }
}

fn convert_i64(kind: Kind, data: &[u8]) -> Option<i64> {
    match kind {
        Kind::INT => read_int(data),
        Kind::UINT => read_uint(data).and_then(|n| i64::try_from(n).ok()),
        Kind::FLOAT => read_float(data)
            .filter(|f| (-TWO_POW_63..TWO_POW_63).contains(f))
            .map(|f| f as i64),
        _ => None,
    }
}

fn convert_f64(kind: Kind, data: &[u8]) -> Option<f64> {
    match kind {
        Kind::FLOAT => read_float(data),
        Kind::UINT => read_uint(data).map(|n| n as f64),
        Kind::INT => read_int(data).map(|n| n as f64),
        _ => None,
    }
}

/// Types that can be read back from a leaf payload.
pub trait FromLeaf<'a>: Sized {
    /// The kind [`ValueRef::get`] requires.
    const KIND: Kind;

    /// Decodes a payload already known to be of [`FromLeaf::KIND`].
    /// Payloads of an unexpected width decode as the default value.
    fn get_unchecked(data: &'a [u8]) -> Self;

    /// Decodes a payload of any leaf kind, if compatible and in range.
    fn convert(kind: Kind, data: &'a [u8]) -> Option<Self>;
}

macro_rules! from_leaf_unsigned {
    ($($ty:ty),*) => {
        $(
            impl<'a> FromLeaf<'a> for $ty {
                const KIND: Kind = Kind::UINT;

                fn get_unchecked(data: &'a [u8]) -> Self {
                    read_uint(data)
                        .and_then(|n| <$ty>::try_from(n).ok())
                        .unwrap_or_default()
                }

                fn convert(kind: Kind, data: &'a [u8]) -> Option<Self> {
                    convert_u64(kind, data).and_then(|n| <$ty>::try_from(n).ok())
                }
            }
        )*
    };
}

macro_rules! from_leaf_signed {
    ($($ty:ty),*) => {
        $(
            impl<'a> FromLeaf<'a> for $ty {
                const KIND: Kind = Kind::INT;

                fn get_unchecked(data: &'a [u8]) -> Self {
                    read_int(data)
                        .and_then(|n| <$ty>::try_from(n).ok())
                        .unwrap_or_default()
                }

                fn convert(kind: Kind, data: &'a [u8]) -> Option<Self> {
                    convert_i64(kind, data).and_then(|n| <$ty>::try_from(n).ok())
                }
            }
        )*
    };
}

from_leaf_unsigned!(u8, u16, u32, u64);
from_leaf_signed!(i8, i16, i32, i64);

impl<'a> FromLeaf<'a> for f64 {
    const KIND: Kind = Kind::FLOAT;

    fn get_unchecked(data: &'a [u8]) -> Self {
        read_float(data).unwrap_or_default()
    }

    fn convert(kind: Kind, data: &'a [u8]) -> Option<Self> {
        convert_f64(kind, data)
    }
}

impl<'a> FromLeaf<'a> for f32 {
    const KIND: Kind = Kind::FLOAT;

    fn get_unchecked(data: &'a [u8]) -> Self {
        read_float(data).unwrap_or_default() as f32
    }

    fn convert(kind: Kind, data: &'a [u8]) -> Option<Self> {
        convert_f64(kind, data).map(|f| f as f32)
    }
}

impl<'a> FromLeaf<'a> for bool {
    const KIND: Kind = Kind::BOOL;

    fn get_unchecked(data: &'a [u8]) -> Self {
        read_bool(data).unwrap_or_default()
    }

    fn convert(kind: Kind, data: &'a [u8]) -> Option<Self> {
        (kind == Kind::BOOL).then(|| read_bool(data)).flatten()
    }
}

impl<'a> FromLeaf<'a> for &'a str {
    const KIND: Kind = Kind::UTF8;

    /// Invalid UTF-8 reads as the empty string.
    fn get_unchecked(data: &'a [u8]) -> Self {
        std::str::from_utf8(data).unwrap_or_default()
    }

    fn convert(kind: Kind, data: &'a [u8]) -> Option<Self> {
        (kind == Kind::UTF8)
            .then(|| std::str::from_utf8(data).ok())
            .flatten()
    }
}

impl<'a> FromLeaf<'a> for String {
    const KIND: Kind = Kind::UTF8;

    fn get_unchecked(data: &'a [u8]) -> Self {
        String::from_utf8_lossy(data).into_owned()
    }

    fn convert(kind: Kind, data: &'a [u8]) -> Option<Self> {
        <&str>::convert(kind, data).map(str::to_owned)
    }
}

impl<'a> FromLeaf<'a> for TimeStruct {
    const KIND: Kind = Kind::TIME;

    fn get_unchecked(data: &'a [u8]) -> Self {
        read_time(data).unwrap_or_default()
    }

    fn convert(kind: Kind, data: &'a [u8]) -> Option<Self> {
        (kind == Kind::TIME).then(|| read_time(data)).flatten()
    }
}

impl<'a> FromLeaf<'a> for DateTime<Utc> {
    const KIND: Kind = Kind::TIME;

    fn get_unchecked(data: &'a [u8]) -> Self {
        TimeStruct::get_unchecked(data)
            .to_datetime()
            .unwrap_or_default()
    }

    fn convert(kind: Kind, data: &'a [u8]) -> Option<Self> {
        TimeStruct::convert(kind, data).and_then(TimeStruct::to_datetime)
    }
}

impl<'a> FromLeaf<'a> for Uuid {
    const KIND: Kind = Kind::UUID;

    fn get_unchecked(data: &'a [u8]) -> Self {
        read_uuid(data).unwrap_or_default()
    }

    fn convert(kind: Kind, data: &'a [u8]) -> Option<Self> {
        (kind == Kind::UUID).then(|| read_uuid(data)).flatten()
    }
}

/// Types that can be inserted as a leaf.
///
/// Implement this for application types to use them with
/// [`JsonBuilder::push_back`]; custom kinds live in `1..=200`.
pub trait IntoLeaf {
    /// Expected payload size, used to pre-reserve arena space.
    fn size_hint(&self) -> u32 {
        0
    }

    /// Commits `self` through a staged node.
    ///
    /// # Errors
    ///
    /// Propagates the commit's length or allocation error.
    fn commit_into(self, pending: PendingValue<'_>) -> Result<NodeId>;
}

macro_rules! into_leaf_le {
    ($kind:expr => $($ty:ty),*) => {
        $(
            impl IntoLeaf for $ty {
                fn size_hint(&self) -> u32 {
                    std::mem::size_of::<$ty>() as u32
                }

                fn commit_into(self, pending: PendingValue<'_>) -> Result<NodeId> {
                    pending.commit($kind, &self.to_le_bytes())
                }
            }
        )*
    };
}

into_leaf_le!(Kind::UINT => u8, u16, u32, u64);
into_leaf_le!(Kind::INT => i8, i16, i32, i64);
into_leaf_le!(Kind::FLOAT => f32, f64);

impl IntoLeaf for bool {
    fn size_hint(&self) -> u32 {
        1
    }

    fn commit_into(self, pending: PendingValue<'_>) -> Result<NodeId> {
        pending.commit(Kind::BOOL, &[u8::from(self)])
    }
}

impl IntoLeaf for () {
    fn commit_into(self, pending: PendingValue<'_>) -> Result<NodeId> {
        pending.commit(Kind::NULL, &[])
    }
}

impl IntoLeaf for TimeStruct {
    fn size_hint(&self) -> u32 {
        8
    }

    fn commit_into(self, pending: PendingValue<'_>) -> Result<NodeId> {
        pending.commit(Kind::TIME, &self.ticks.to_le_bytes())
    }
}

impl IntoLeaf for DateTime<Utc> {
    fn size_hint(&self) -> u32 {
        8
    }

    fn commit_into(self, pending: PendingValue<'_>) -> Result<NodeId> {
        TimeStruct::from(self).commit_into(pending)
    }
}

impl IntoLeaf for Uuid {
    fn size_hint(&self) -> u32 {
        16
    }

    fn commit_into(self, pending: PendingValue<'_>) -> Result<NodeId> {
        pending.commit(Kind::UUID, self.as_bytes())
    }
}

impl IntoLeaf for Text<'_> {
    fn size_hint(&self) -> u32 {
        self.worst_case_len().min(u64::from(node::DATA_MAX)) as u32
    }

    fn commit_into(self, pending: PendingValue<'_>) -> Result<NodeId> {
        pending.commit_text(Kind::UTF8, self)
    }
}

macro_rules! into_leaf_text {
    ($($ty:ty),*) => {
        $(
            impl IntoLeaf for $ty {
                fn size_hint(&self) -> u32 {
                    Text::from(*self).size_hint()
                }

                fn commit_into(self, pending: PendingValue<'_>) -> Result<NodeId> {
                    Text::from(self).commit_into(pending)
                }
            }
        )*
    };
}

into_leaf_text!(&str, &String, &[u16], &[char], Latin1Str<'_>, Cp1252Str<'_>, Utf16Str<'_>);

impl IntoLeaf for String {
    fn size_hint(&self) -> u32 {
        self.as_str().size_hint()
    }

    fn commit_into(self, pending: PendingValue<'_>) -> Result<NodeId> {
        self.as_str().commit_into(pending)
    }
}

/// A read-only view of one node.
///
/// Borrowing the builder keeps the view valid: no insert can run while it
/// is alive.
#[derive(Clone, Copy)]
pub struct ValueRef<'a> {
    builder: &'a JsonBuilder,
    index: u32,
}

impl<'a> ValueRef<'a> {
    #[inline]
    pub(crate) fn new(builder: &'a JsonBuilder, index: u32) -> Self {
        ValueRef { builder, index }
    }

    #[inline]
    fn bytes(&self) -> &'a [u8] {
        self.builder.storage()
    }

    #[inline]
    #[must_use]
    pub fn id(&self) -> NodeId {
        self.builder.id(self.index)
    }

    #[inline]
    #[must_use]
    pub fn kind(&self) -> Kind {
        node::kind(self.bytes(), self.index)
    }

    /// Raw UTF-8 name bytes. Array elements may carry names too; they
    /// are just not rendered.
    #[inline]
    #[must_use]
    pub fn name_bytes(&self) -> &'a [u8] {
        node::name(self.bytes(), self.index)
    }

    #[must_use]
    pub fn name(&self) -> Cow<'a, str> {
        String::from_utf8_lossy(self.name_bytes())
    }

    /// Raw payload.
    ///
    /// # Panics
    ///
    /// Panics unless this is a leaf.
    #[inline]
    #[must_use]
    pub fn data(&self) -> &'a [u8] {
        node::data(self.bytes(), self.index)
    }

    #[inline]
    #[must_use]
    pub fn body(&self) -> Body {
        node::body(self.bytes(), self.index)
    }

    #[inline]
    #[must_use]
    pub fn is_root(&self) -> bool {
        self.index == node::ROOT_INDEX
    }

    #[inline]
    #[must_use]
    pub fn is_null(&self) -> bool {
        self.kind() == Kind::NULL
    }

    #[inline]
    #[must_use]
    pub fn is_object(&self) -> bool {
        self.kind() == Kind::OBJECT
    }

    #[inline]
    #[must_use]
    pub fn is_array(&self) -> bool {
        self.kind() == Kind::ARRAY
    }

    /// Reads the payload as `T`.
    ///
    /// # Panics
    ///
    /// Panics unless the node's kind is exactly `T::KIND`.
    #[must_use]
    pub fn get<T: FromLeaf<'a>>(&self) -> T {
        let kind = self.kind();
        assert!(
            kind == T::KIND,
            "value of {kind:?} read as {:?}",
            T::KIND
        );
        T::get_unchecked(self.data())
    }

    /// Converts the payload to `T` if the kinds are compatible and the
    /// value fits. Composite, hidden and null nodes convert to nothing.
    #[must_use]
    pub fn convert<T: FromLeaf<'a>>(&self) -> Option<T> {
        let kind = self.kind();
        if !kind.is_leaf() {
            return None;
        }
        T::convert(kind, self.data())
    }

    #[must_use]
    pub fn children(&self) -> Children<'a> {
        self.builder.children(self.id())
    }

    #[must_use]
    pub fn builder(&self) -> &'a JsonBuilder {
        self.builder
    }
}

impl fmt::Debug for ValueRef<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ValueRef")
            .field("index", &self.index)
            .field("kind", &self.kind())
            .field("name", &self.name())
            .finish()
    }
}
