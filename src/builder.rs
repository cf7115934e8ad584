//! The packed tree: insertion, iteration, lookup, erasure and splicing.
//!
//! A [`JsonBuilder`] stores an object tree inside one [`PodArena`]. Every
//! node is addressed by its pod index, and one singly-linked list threads
//! through all nodes of the arena. The children of a composite are the
//! run of that list that starts at the composite's hidden sentinel and
//! ends at its `last_child`.
//!
//! ## Handles
//!
//! [`NodeId`] is an index plus the identity of the builder that issued it.
//! Ids survive arena growth. Passing an id to a different builder, or an
//! index past the end of the arena, panics.
//!
//! ## Inserting
//!
//! Insertion happens in two steps. [`JsonBuilder::stage`] writes the name
//! and returns a [`PendingValue`]; one of its `commit*` methods writes the
//! payload and links the node into its parent. Nothing is linked until the
//! commit succeeds, and dropping an uncommitted value gives its space back.
//!
//! ```rust
//! use packed_json::{JsonBuilder, Kind, Position};
//!
//! let mut builder = JsonBuilder::new();
//! let root = builder.root();
//!
//! let pending = builder.stage(Position::Back, root, "answer", 8).unwrap();
//! pending.commit(Kind::UINT, &42u64.to_le_bytes()).unwrap();
//!
//! let colors = builder.insert_node(Position::Back, root, "colors", Kind::ARRAY).unwrap();
//! builder.push_back(colors, "", "red").unwrap();
//!
//! assert_eq!(packed_json::to_string(&builder), r#"{"answer":42,"colors":["red"]}"#);
//! ```
//!
//! ## Erasing
//!
//! Erased nodes become hidden. Their bytes stay in the arena and the list
//! links are untouched, so erasure is O(1) and never invalidates an id.
//!
//! ## Lookup cost
//!
//! There is no name index. [`JsonBuilder::find`] and
//! [`JsonBuilder::count`] scan the parent's children, including hidden ones.

use std::sync::atomic::{AtomicU64, Ordering};
use tracing::{debug, trace};

use crate::arena::{PodArena, Span, POD_SIZE};
use crate::error::{Error, Result};
use crate::node::{
    self, data_offset, pods_for, Kind, ValueHeader, DATA_MAX, EMPTY_TREE, NAME_MAX,
    NODE_HEADER_SIZE, ROOT_INDEX, ROOT_PODS, VALUE_HEADER_SIZE,
};
use crate::text::{Cp1252Str, Latin1Str, Text, Utf16Str};
use crate::validate;
use crate::value::{IntoLeaf, ValueRef};

static NEXT_OWNER: AtomicU64 = AtomicU64::new(1);

fn next_owner() -> u64 {
    NEXT_OWNER.fetch_add(1, Ordering::Relaxed)
}

/// A handle to one node of one [`JsonBuilder`].
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub struct NodeId {
    owner: u64,
    index: u32,
}

impl NodeId {
    /// Pod index of the node inside its arena.
    #[inline]
    #[must_use]
    pub const fn index(&self) -> u32 {
        self.index
    }

    /// True for the root, which doubles as the end marker.
    #[inline]
    #[must_use]
    pub const fn is_root(&self) -> bool {
        self.index == ROOT_INDEX
    }
}

/// Where a new node goes among its parent's children.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Default)]
pub enum Position {
    Front,
    #[default]
    Back,
}

/// A node name, given as text or as bytes already stored in the arena.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Name<'a> {
    Text(Text<'a>),
    /// Copied from the arena after any growth, so it may refer to the
    /// name or payload of an existing node of the same builder.
    Span(Span),
}

macro_rules! name_from_text {
    ($($ty:ty),* $(,)?) => {
        $(
            impl<'a> From<$ty> for Name<'a> {
                fn from(text: $ty) -> Self {
                    Name::Text(Text::from(text))
                }
            }
        )*
    };
}

name_from_text!(
    &'a str,
    &'a String,
    &'a [u8],
    &'a [u16],
    &'a [char],
    Latin1Str<'a>,
    Cp1252Str<'a>,
    Utf16Str<'a>,
);

impl<'a> From<Text<'a>> for Name<'a> {
    fn from(text: Text<'a>) -> Self {
        Name::Text(text)
    }
}

impl<'a, const N: usize> From<&'a [u8; N]> for Name<'a> {
    fn from(bytes: &'a [u8; N]) -> Self {
        Name::Text(Text::Utf8(bytes))
    }
}

impl From<Span> for Name<'_> {
    fn from(span: Span) -> Self {
        Name::Span(span)
    }
}

/// A packed JSON tree.
#[derive(Debug)]
pub struct JsonBuilder {
    arena: PodArena,
    owner: u64,
}

impl Default for JsonBuilder {
    fn default() -> Self {
        Self::new()
    }
}

impl Clone for JsonBuilder {
    /// Deep copy with a new identity: ids from `self` do not work on the copy.
    fn clone(&self) -> Self {
        JsonBuilder {
            arena: self.arena.clone(),
            owner: next_owner(),
        }
    }
}

impl JsonBuilder {
    #[must_use]
    pub fn new() -> Self {
        JsonBuilder {
            arena: PodArena::new(),
            owner: next_owner(),
        }
    }

    /// Creates a builder with room for at least `bytes` bytes.
    ///
    /// # Errors
    ///
    /// [`Error::LengthLimit`] above [`JsonBuilder::buffer_max_size`],
    /// [`Error::OutOfMemory`] if allocation fails.
    pub fn with_capacity(bytes: u64) -> Result<Self> {
        let mut builder = Self::new();
        builder.buffer_reserve(bytes)?;
        Ok(builder)
    }

    /// Loads a tree from bytes produced by [`JsonBuilder::as_bytes`].
    ///
    /// Pass `validate = false` only for buffers this process produced
    /// itself; reading an unvalidated corrupt buffer panics.
    ///
    /// # Errors
    ///
    /// [`Error::CorruptData`] if the buffer is malformed,
    /// [`Error::LengthLimit`] if it is longer than
    /// [`JsonBuilder::buffer_max_size`].
    ///
    /// # Examples
    ///
    /// ```rust
    /// use packed_json::JsonBuilder;
    ///
    /// let mut original = JsonBuilder::new();
    /// original.push_back(original.root(), "ok", true).unwrap();
    ///
    /// let copy = JsonBuilder::from_bytes(original.as_bytes(), true).unwrap();
    /// assert_eq!(packed_json::to_string(&copy), r#"{"ok":true}"#);
    /// ```
    pub fn from_bytes(bytes: &[u8], validate: bool) -> Result<Self> {
        let arena = PodArena::from_slice(bytes)?;
        let builder = JsonBuilder {
            arena,
            owner: next_owner(),
        };
        if validate {
            builder.validate_data()?;
        }
        Ok(builder)
    }

    /// Checks that the arena encodes a well-formed tree.
    ///
    /// # Errors
    ///
    /// [`Error::CorruptData`] describing the first problem found.
    pub fn validate_data(&self) -> Result<()> {
        validate::validate(self.arena.as_bytes())
    }

    /// Raw little-endian arena bytes; empty until the first insert.
    #[inline]
    #[must_use]
    pub fn as_bytes(&self) -> &[u8] {
        self.arena.as_bytes()
    }

    #[inline]
    #[must_use]
    pub fn buffer_size(&self) -> usize {
        self.arena.len_pods() * POD_SIZE
    }

    #[inline]
    #[must_use]
    pub fn buffer_capacity(&self) -> usize {
        self.arena.capacity_pods() * POD_SIZE
    }

    #[inline]
    #[must_use]
    pub const fn buffer_max_size() -> u64 {
        PodArena::max_bytes()
    }

    /// Ensures the arena can hold `bytes` bytes without reallocating.
    ///
    /// # Errors
    ///
    /// See [`JsonBuilder::with_capacity`].
    pub fn buffer_reserve(&mut self, bytes: u64) -> Result<()> {
        self.arena.reserve_bytes(bytes)
    }

    /// Removes every node but keeps the allocation. Invalidates all ids.
    pub fn clear(&mut self) {
        self.arena.clear();
        self.owner = next_owner();
    }

    /// Exchanges contents; ids follow the data they were issued for.
    pub fn swap(&mut self, other: &mut JsonBuilder) {
        std::mem::swap(self, other);
    }

    /// Bytes to read nodes from. An untouched builder reads as an empty root.
    #[inline]
    pub(crate) fn storage(&self) -> &[u8] {
        if self.arena.is_empty() {
            &EMPTY_TREE
        } else {
            self.arena.as_bytes()
        }
    }

    #[inline]
    pub(crate) fn id(&self, index: u32) -> NodeId {
        NodeId {
            owner: self.owner,
            index,
        }
    }

    /// Resolves an id to an index, aborting on a foreign or stale id.
    fn check(&self, id: NodeId) -> u32 {
        assert!(
            id.owner == self.owner,
            "node id was issued by a different builder"
        );
        assert!(
            id.index == ROOT_INDEX || (id.index as usize) < self.arena.len_pods(),
            "node id {} is out of range",
            id.index
        );
        id.index
    }

    fn check_parent(&self, id: NodeId) -> u32 {
        let index = self.check(id);
        assert!(
            node::kind(self.storage(), index).is_composite(),
            "destination must be an array or object"
        );
        index
    }

    // Raw accessors. Every offset comes from the node module.

    #[inline]
    fn next_of(&self, index: u32) -> u32 {
        node::next_index(self.storage(), index)
    }

    #[inline]
    fn set_next(&mut self, index: u32, next: u32) {
        node::set_next_index(self.arena.as_bytes_mut(), index, next);
    }

    #[inline]
    fn kind_of(&self, index: u32) -> Kind {
        node::kind(self.storage(), index)
    }

    #[inline]
    fn first_child(&self, index: u32) -> u32 {
        node::first_child(self.storage(), index)
    }

    #[inline]
    fn last_child(&self, index: u32) -> u32 {
        node::body(self.storage(), index).last_child()
    }

    #[inline]
    fn set_last_child(&mut self, index: u32, last: u32) {
        node::set_last_child(self.arena.as_bytes_mut(), index, last);
    }

    /// Follows `next` from `index` to the first node that is not hidden.
    fn next_visible(&self, index: u32) -> u32 {
        assert!(index != ROOT_INDEX, "cannot advance past the end");
        let mut cur = self.next_of(index);
        while self.kind_of(cur).is_hidden() {
            cur = self.next_of(cur);
        }
        cur
    }

    // Navigation

    /// The implicit root object. Valid before anything is inserted.
    #[inline]
    #[must_use]
    pub fn root(&self) -> NodeId {
        self.id(ROOT_INDEX)
    }

    /// The end marker. It shares index 0 with the root, which is never
    /// anyone's child.
    #[inline]
    #[must_use]
    pub fn end(&self) -> NodeId {
        self.id(ROOT_INDEX)
    }

    /// First visible child of the root.
    #[must_use]
    pub fn begin(&self) -> NodeId {
        self.begin_of(self.root())
    }

    /// First visible child of `parent`, or [`JsonBuilder::end_of`] if none.
    ///
    /// Leaves have no children: both bounds are [`JsonBuilder::end`].
    #[must_use]
    pub fn begin_of(&self, parent: NodeId) -> NodeId {
        let index = self.check(parent);
        if !self.kind_of(index).is_composite() {
            return self.end();
        }
        self.id(self.next_visible(self.first_child(index)))
    }

    /// The node following `parent`'s last child, skipping hidden nodes.
    #[must_use]
    pub fn end_of(&self, parent: NodeId) -> NodeId {
        let index = self.check(parent);
        if !self.kind_of(index).is_composite() {
            return self.end();
        }
        self.id(self.next_visible(self.last_child(index)))
    }

    /// Next visible sibling.
    ///
    /// # Panics
    ///
    /// Panics when called on [`JsonBuilder::end`].
    #[must_use]
    pub fn next(&self, id: NodeId) -> NodeId {
        let index = self.check(id);
        self.id(self.next_visible(index))
    }

    #[must_use]
    pub fn value(&self, id: NodeId) -> ValueRef<'_> {
        ValueRef::new(self, self.check(id))
    }

    /// Visible children of `parent`, in order.
    #[must_use]
    pub fn children(&self, parent: NodeId) -> Children<'_> {
        Children {
            builder: self,
            cur: self.begin_of(parent).index,
            end: self.end_of(parent).index,
        }
    }

    /// Iterates the linked children of a composite, hidden ones included,
    /// sentinel excluded.
    fn raw_children(&self, parent: u32) -> impl Iterator<Item = u32> + '_ {
        let (mut cur, last) = if self.kind_of(parent).is_composite() {
            (self.first_child(parent), self.last_child(parent))
        } else {
            (ROOT_INDEX, ROOT_INDEX)
        };
        std::iter::from_fn(move || {
            if cur == last {
                return None;
            }
            cur = self.next_of(cur);
            Some(cur)
        })
    }

    /// Number of visible children. O(children).
    #[must_use]
    pub fn count(&self, parent: NodeId) -> usize {
        let index = self.check(parent);
        self.raw_children(index)
            .filter(|&i| !self.kind_of(i).is_hidden())
            .count()
    }

    /// Walks `path` one name at a time, taking the first visible child
    /// with a matching name at each level.
    ///
    /// An empty path returns `parent`. Each step is a linear scan.
    ///
    /// # Examples
    ///
    /// ```rust
    /// use packed_json::{JsonBuilder, Kind, Position};
    ///
    /// let mut builder = JsonBuilder::new();
    /// let a = builder.insert_node(Position::Back, builder.root(), "a", Kind::OBJECT).unwrap();
    /// let b = builder.push_back(a, "b", 5i32).unwrap();
    ///
    /// assert_eq!(builder.find(builder.root(), ["a", "b"]), Some(b));
    /// assert_eq!(builder.find(builder.root(), ["a", "missing"]), None);
    /// ```
    #[must_use]
    pub fn find<I>(&self, parent: NodeId, path: I) -> Option<NodeId>
    where
        I: IntoIterator,
        I::Item: AsRef<[u8]>,
    {
        let mut at = self.check(parent);
        for segment in path {
            let wanted = segment.as_ref();
            at = self.raw_children(at).find(|&i| {
                !self.kind_of(i).is_hidden() && node::name(self.storage(), i) == wanted
            })?;
        }
        Some(self.id(at))
    }

    // Buffer views

    /// Arena range holding the node's name.
    #[must_use]
    pub fn name_span(&self, id: NodeId) -> Span {
        node::name_span(self.storage(), self.check(id))
    }

    /// Arena range holding a leaf's payload.
    ///
    /// # Panics
    ///
    /// Panics unless `id` is a leaf.
    #[must_use]
    pub fn data_span(&self, id: NodeId) -> Span {
        node::data_span(self.storage(), self.check(id))
    }

    /// Mutable payload of a leaf, for filling a value committed with
    /// [`PendingValue::commit_zeroed`].
    ///
    /// # Panics
    ///
    /// Panics unless `id` is a leaf.
    pub fn data_mut(&mut self, id: NodeId) -> &mut [u8] {
        let span = self.data_span(id);
        &mut self.arena.as_bytes_mut()[span.range()]
    }

    /// Shrinks a leaf's recorded payload size. The bytes stay allocated.
    ///
    /// # Panics
    ///
    /// Panics unless `id` is a leaf and `new_size` is at most its current size.
    pub fn reduce_data_size(&mut self, id: NodeId, new_size: u32) {
        let index = self.check(id);
        let current = node::body(self.storage(), index).data_size();
        assert!(
            new_size <= current,
            "data size can only shrink ({new_size} > {current})"
        );
        node::value_header_mut(self.arena.as_bytes_mut(), index).set_extent(new_size);
    }

    // Erasure

    /// Hides a node and returns the next visible sibling. Erasing an
    /// already-hidden node is a no-op.
    ///
    /// # Panics
    ///
    /// Panics when called on the root.
    pub fn erase(&mut self, id: NodeId) -> NodeId {
        let index = self.check(id);
        assert!(index != ROOT_INDEX, "cannot erase the root");
        node::header_mut(self.arena.as_bytes_mut(), index).set_kind(Kind::HIDDEN);
        self.id(self.next_visible(index))
    }

    /// Hides every node from `first` up to, not including, `last`.
    ///
    /// # Panics
    ///
    /// Panics if `last` cannot be reached from `first`.
    pub fn erase_range(&mut self, first: NodeId, last: NodeId) -> NodeId {
        let mut cur = self.check(first);
        let end = self.check(last);
        while cur != end {
            assert!(cur != ROOT_INDEX, "erase range end is not after its start");
            node::header_mut(self.arena.as_bytes_mut(), cur).set_kind(Kind::HIDDEN);
            cur = self.next_of(cur);
        }
        last
    }

    // Splicing

    /// Moves all children of `old_parent` to the front of `new_parent`.
    pub fn splice_front(&mut self, old_parent: NodeId, new_parent: NodeId) {
        self.splice(old_parent, new_parent, Position::Front, |_| true);
    }

    /// Moves all children of `old_parent` to the back of `new_parent`.
    pub fn splice_back(&mut self, old_parent: NodeId, new_parent: NodeId) {
        self.splice(old_parent, new_parent, Position::Back, |_| true);
    }

    /// Moves the children of `old_parent` that satisfy `pred` to the front
    /// of `new_parent`, keeping their relative order.
    ///
    /// A leaf or erased `old_parent` has nothing to move and is left alone.
    ///
    /// # Panics
    ///
    /// Panics if `new_parent` is not an array or object, or if it is one of
    /// the children being moved.
    pub fn splice_front_if<F>(&mut self, old_parent: NodeId, new_parent: NodeId, pred: F)
    where
        F: FnMut(ValueRef<'_>) -> bool,
    {
        self.splice(old_parent, new_parent, Position::Front, pred);
    }

    /// Like [`JsonBuilder::splice_front_if`], appending instead.
    pub fn splice_back_if<F>(&mut self, old_parent: NodeId, new_parent: NodeId, pred: F)
    where
        F: FnMut(ValueRef<'_>) -> bool,
    {
        self.splice(old_parent, new_parent, Position::Back, pred);
    }

    /// Detaches the matching children as one chain, then links that chain
    /// after the new parent's sentinel or last child.
    ///
    /// An `old_parent` that has no children to iterate (a leaf or an erased
    /// node) leaves the tree unchanged. `new_parent` must not be inside the
    /// moved subtrees; moving `new_parent` itself panics.
    fn splice<F>(&mut self, old_parent: NodeId, new_parent: NodeId, pos: Position, mut pred: F)
    where
        F: FnMut(ValueRef<'_>) -> bool,
    {
        let new = self.check_parent(new_parent);
        let old = self.check(old_parent);
        if !self.kind_of(old).is_composite() {
            return;
        }
        let mut prev = self.first_child(old);
        let last = self.last_child(old);
        if prev == last {
            return;
        }

        let mut head = ROOT_INDEX;
        let mut tail: Option<u32> = None;
        let mut moved = 0usize;
        loop {
            let cur = self.next_of(prev);
            assert!(cur != ROOT_INDEX, "child list of node {old} is not terminated");
            let take = !self.kind_of(cur).is_hidden() && pred(ValueRef::new(self, cur));
            if take {
                assert!(cur != new, "destination is among the moved children");
                let after = self.next_of(cur);
                self.set_next(prev, after);
                match tail {
                    None => head = cur,
                    Some(t) => self.set_next(t, cur),
                }
                tail = Some(cur);
                moved += 1;
                if cur == last {
                    self.set_last_child(old, prev);
                    break;
                }
            } else {
                if cur == last {
                    break;
                }
                prev = cur;
            }
        }

        if let Some(tail) = tail {
            let new_prev = match pos {
                Position::Front => {
                    let first = self.first_child(new);
                    if first == self.last_child(new) {
                        self.set_last_child(new, tail);
                    }
                    first
                }
                Position::Back => {
                    let last = self.last_child(new);
                    self.set_last_child(new, tail);
                    last
                }
            };
            let after = self.next_of(new_prev);
            self.set_next(tail, after);
            self.set_next(new_prev, head);
        }
        trace!(from = old, to = new, moved, "spliced children");
    }

    // Insertion

    /// Writes the root object and its sentinel into an empty arena.
    fn create_root(&mut self) -> Result<()> {
        debug_assert!(self.arena.is_empty());
        self.arena.append(&EMPTY_TREE)?;
        debug!(owner = self.owner, "root created");
        Ok(())
    }

    /// Links a freshly committed node after `parent`'s sentinel or last child.
    fn link(&mut self, parent: u32, index: u32, pos: Position) {
        let prev = match pos {
            Position::Front => {
                let first = self.first_child(parent);
                if first == self.last_child(parent) {
                    self.set_last_child(parent, index);
                }
                first
            }
            Position::Back => {
                let last = self.last_child(parent);
                self.set_last_child(parent, index);
                last
            }
        };
        let after = self.next_of(prev);
        self.set_next(index, after);
        self.set_next(prev, index);
    }

    /// First step of an insertion: validates the name, creates the root if
    /// needed, reserves room for the node and writes its name.
    ///
    /// `data_hint` pre-reserves payload space so the commit usually does
    /// not reallocate.
    ///
    /// # Errors
    ///
    /// [`Error::LengthLimit`] if the name or hint is too large or the arena
    /// would pass its ceiling, [`Error::OutOfMemory`] if allocation fails.
    ///
    /// # Panics
    ///
    /// Panics if `parent` is foreign, out of range, or not an array/object.
    pub fn stage<'n>(
        &mut self,
        pos: Position,
        parent: NodeId,
        name: impl Into<Name<'n>>,
        data_hint: u32,
    ) -> Result<PendingValue<'_>> {
        let name = name.into();
        let parent = self.check(parent);

        let reserve = match name {
            Name::Text(text) => {
                let limit = NAME_MAX / text.encoding().worst_case_multiplier();
                if text.units() as u64 > u64::from(limit) {
                    return Err(Error::length_limit("name", text.units() as u64, u64::from(limit)));
                }
                text.worst_case_len() as u32
            }
            Name::Span(span) => {
                assert!(
                    span.end() <= self.arena.len_pods() * POD_SIZE,
                    "name span is outside this builder's arena"
                );
                if span.len() as u64 > u64::from(NAME_MAX) {
                    return Err(Error::length_limit("name", span.len() as u64, u64::from(NAME_MAX)));
                }
                span.len() as u32
            }
        };
        if data_hint > DATA_MAX {
            return Err(Error::length_limit("data", u64::from(data_hint), u64::from(DATA_MAX)));
        }

        let node_pods = data_offset(reserve);
        let hint_pods = pods_for(data_hint.max(NODE_HEADER_SIZE as u32) as usize);
        if self.arena.is_empty() {
            assert!(parent == ROOT_INDEX, "destination must be an array or object");
            self.arena.reserve_pods(ROOT_PODS + node_pods + hint_pods)?;
            self.create_root()?;
        } else {
            assert!(
                self.kind_of(parent).is_composite(),
                "destination must be an array or object"
            );
        }

        let index = self.arena.len_pods();
        let needed = index
            .checked_add(node_pods + hint_pods)
            .ok_or_else(|| Error::length_limit("arena", u64::MAX, PodArena::max_bytes()))?;
        self.arena.reserve_pods(needed)?;

        let name_at = index * POD_SIZE + VALUE_HEADER_SIZE;
        let region = self.arena.append_region(node_pods)?;
        let name_len = match name {
            Name::Text(text) => text.write_utf8(&mut region[VALUE_HEADER_SIZE..]),
            Name::Span(span) => {
                self.arena.as_bytes_mut().copy_within(span.range(), name_at);
                span.len()
            }
        } as u32;
        self.arena.commit(index + data_offset(name_len));

        Ok(PendingValue {
            builder: self,
            index: index as u32,
            parent,
            pos,
            name_len,
            committed: false,
        })
    }

    /// Inserts an array, an object, or a leaf kind that has no payload.
    ///
    /// # Errors
    ///
    /// See [`JsonBuilder::stage`].
    pub fn insert_node<'n>(
        &mut self,
        pos: Position,
        parent: NodeId,
        name: impl Into<Name<'n>>,
        kind: Kind,
    ) -> Result<NodeId> {
        let pending = self.stage(pos, parent, name, 0)?;
        if kind.is_composite() {
            pending.commit_composite(kind)
        } else {
            pending.commit(kind, &[])
        }
    }

    /// Inserts a leaf with a raw payload.
    ///
    /// # Errors
    ///
    /// See [`JsonBuilder::stage`].
    pub fn insert_leaf<'n>(
        &mut self,
        pos: Position,
        parent: NodeId,
        name: impl Into<Name<'n>>,
        kind: Kind,
        data: &[u8],
    ) -> Result<NodeId> {
        let size = u32::try_from(data.len())
            .ok()
            .filter(|&n| n <= DATA_MAX)
            .ok_or_else(|| Error::length_limit("data", data.len() as u64, u64::from(DATA_MAX)))?;
        self.stage(pos, parent, name, size)?.commit(kind, data)
    }

    /// Inserts a typed value.
    ///
    /// # Errors
    ///
    /// See [`JsonBuilder::stage`].
    pub fn insert_value<'n, V: IntoLeaf>(
        &mut self,
        pos: Position,
        parent: NodeId,
        name: impl Into<Name<'n>>,
        value: V,
    ) -> Result<NodeId> {
        let hint = value.size_hint();
        let pending = self.stage(pos, parent, name, hint)?;
        value.commit_into(pending)
    }

    /// Appends a typed value to `parent`.
    ///
    /// # Errors
    ///
    /// See [`JsonBuilder::stage`].
    pub fn push_back<'n, V: IntoLeaf>(
        &mut self,
        parent: NodeId,
        name: impl Into<Name<'n>>,
        value: V,
    ) -> Result<NodeId> {
        self.insert_value(Position::Back, parent, name, value)
    }

    /// Prepends a typed value to `parent`.
    ///
    /// # Errors
    ///
    /// See [`JsonBuilder::stage`].
    pub fn push_front<'n, V: IntoLeaf>(
        &mut self,
        parent: NodeId,
        name: impl Into<Name<'n>>,
        value: V,
    ) -> Result<NodeId> {
        self.insert_value(Position::Front, parent, name, value)
    }

    /// Appends an empty object to `parent`.
    ///
    /// # Errors
    ///
    /// See [`JsonBuilder::stage`].
    pub fn push_object<'n>(&mut self, parent: NodeId, name: impl Into<Name<'n>>) -> Result<NodeId> {
        self.insert_node(Position::Back, parent, name, Kind::OBJECT)
    }

    /// Appends an empty array to `parent`.
    ///
    /// # Errors
    ///
    /// See [`JsonBuilder::stage`].
    pub fn push_array<'n>(&mut self, parent: NodeId, name: impl Into<Name<'n>>) -> Result<NodeId> {
        self.insert_node(Position::Back, parent, name, Kind::ARRAY)
    }
}

/// Visible children of one node.
#[derive(Clone)]
pub struct Children<'a> {
    builder: &'a JsonBuilder,
    cur: u32,
    end: u32,
}

impl<'a> Iterator for Children<'a> {
    type Item = ValueRef<'a>;

    fn next(&mut self) -> Option<Self::Item> {
        if self.cur == self.end {
            return None;
        }
        let item = ValueRef::new(self.builder, self.cur);
        self.cur = self.builder.next_visible(self.cur);
        Some(item)
    }
}

/// A staged node: name written, payload and links not yet.
///
/// Dropping it without committing truncates the arena back to where the
/// node started.
#[must_use = "a staged value is discarded unless committed"]
pub struct PendingValue<'b> {
    builder: &'b mut JsonBuilder,
    index: u32,
    parent: u32,
    pos: Position,
    name_len: u32,
    committed: bool,
}

impl PendingValue<'_> {
    /// Length of the UTF-8 name that was written.
    #[inline]
    #[must_use]
    pub fn name_len(&self) -> u32 {
        self.name_len
    }

    fn check_size(size: u64) -> Result<u32> {
        if size > u64::from(DATA_MAX) {
            return Err(Error::length_limit("data", size, u64::from(DATA_MAX)));
        }
        Ok(size as u32)
    }

    fn assert_leaf(kind: Kind) {
        assert!(kind.is_leaf(), "{kind:?} cannot carry a payload");
    }

    /// Pod where the payload or sentinel starts.
    #[inline]
    fn data_index(&self) -> usize {
        self.index as usize + data_offset(self.name_len)
    }

    /// Writes the header and links the node. Consumes the pending state.
    fn finish(mut self, kind: Kind, extent: u32) -> NodeId {
        let bytes = self.builder.arena.as_bytes_mut();
        *node::value_header_mut(bytes, self.index) =
            ValueHeader::new(ROOT_INDEX, self.name_len, kind, extent);
        self.builder.link(self.parent, self.index, self.pos);
        self.committed = true;
        self.builder.id(self.index)
    }

    /// Commits a leaf whose payload is `data`.
    ///
    /// # Errors
    ///
    /// [`Error::LengthLimit`] or [`Error::OutOfMemory`]; the arena is rolled
    /// back and nothing is linked.
    ///
    /// # Panics
    ///
    /// Panics if `kind` is hidden or composite.
    pub fn commit(self, kind: Kind, data: &[u8]) -> Result<NodeId> {
        Self::assert_leaf(kind);
        let size = Self::check_size(data.len() as u64)?;
        let region = self.builder.arena.append_region(pods_for(data.len()))?;
        region[..data.len()].copy_from_slice(data);
        Ok(self.finish(kind, size))
    }

    /// Commits a leaf with `size` zero bytes of payload, to be filled
    /// through [`JsonBuilder::data_mut`].
    ///
    /// # Errors
    ///
    /// See [`PendingValue::commit`].
    pub fn commit_zeroed(self, kind: Kind, size: u32) -> Result<NodeId> {
        Self::assert_leaf(kind);
        let size = Self::check_size(u64::from(size))?;
        self.builder.arena.append_region(pods_for(size as usize))?;
        Ok(self.finish(kind, size))
    }

    /// Commits a leaf whose payload is copied from elsewhere in the arena.
    ///
    /// The copy happens after any reallocation, so `span` may name the
    /// payload of an existing node.
    ///
    /// # Errors
    ///
    /// See [`PendingValue::commit`].
    ///
    /// # Panics
    ///
    /// Panics if `span` does not lie within committed nodes.
    pub fn commit_span(self, kind: Kind, span: Span) -> Result<NodeId> {
        Self::assert_leaf(kind);
        assert!(
            span.end() <= self.index as usize * POD_SIZE,
            "data span is outside this builder's arena"
        );
        let size = Self::check_size(span.len() as u64)?;
        let data_at = self.data_index() * POD_SIZE;
        self.builder.arena.append_region(pods_for(span.len()))?;
        self.builder
            .arena
            .as_bytes_mut()
            .copy_within(span.range(), data_at);
        Ok(self.finish(kind, size))
    }

    /// Commits a leaf whose payload is `text` converted to UTF-8.
    ///
    /// # Errors
    ///
    /// See [`PendingValue::commit`].
    pub fn commit_text(self, kind: Kind, text: Text<'_>) -> Result<NodeId> {
        Self::assert_leaf(kind);
        let limit = DATA_MAX / text.encoding().worst_case_multiplier();
        if text.units() as u64 > u64::from(limit) {
            return Err(Error::length_limit("data", text.units() as u64, u64::from(limit)));
        }
        let data_index = self.data_index();
        let region = self
            .builder
            .arena
            .append_region(pods_for(text.worst_case_len() as usize))?;
        let written = text.write_utf8(region);
        self.builder.arena.commit(data_index + pods_for(written));
        Ok(self.finish(kind, written as u32))
    }

    /// Commits an array or object together with its sentinel, and threads
    /// the sentinel into the list right after the root.
    ///
    /// # Errors
    ///
    /// See [`PendingValue::commit`].
    ///
    /// # Panics
    ///
    /// Panics unless `kind` is [`Kind::ARRAY`] or [`Kind::OBJECT`].
    pub fn commit_composite(self, kind: Kind) -> Result<NodeId> {
        assert!(kind.is_composite(), "{kind:?} is not an array or object");
        let sentinel = self.data_index() as u32;
        self.builder
            .arena
            .append_region(NODE_HEADER_SIZE / POD_SIZE)?;
        let root_next = self.builder.next_of(ROOT_INDEX);
        let bytes = self.builder.arena.as_bytes_mut();
        node::write_sentinel(bytes, sentinel, root_next);
        node::set_next_index(bytes, ROOT_INDEX, sentinel);
        Ok(self.finish(kind, sentinel))
    }
}

impl Drop for PendingValue<'_> {
    fn drop(&mut self) {
        if !self.committed {
            self.builder.arena.commit(self.index as usize);
        }
    }
}
