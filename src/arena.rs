//! Growable storage for packed trees.
//!
//! [`PodArena`] owns every byte of a tree. Storage is addressed in 4-byte
//! units ("pods") so a node index fits in a `u32` and the fixed header
//! fields stay naturally aligned. The arena is the only allocation point;
//! everything else in the crate refers to its contents by pod index.
//!
//! ## Growth policy
//!
//! Capacity never drops below [`MIN_CAPACITY_PODS`]. Above that floor it
//! grows to one less than the next power of two past the requested size,
//! capped at [`PodArena::max_pods`]. Growth may move the whole buffer, so
//! callers must never hold a slice across a mutation.
//!
//! ## Write-then-commit
//!
//! [`PodArena::append_region`] hands out a zero-filled region at the end of
//! the arena. The caller writes into it and then calls
//! [`PodArena::commit`] with the final end position, which drops whatever
//! part of the region went unused.

use crate::error::{Error, Result};
use tracing::debug;

/// Width of one storage unit in bytes.
pub const POD_SIZE: usize = 4;

/// Capacity floor, in pods.
pub const MIN_CAPACITY_PODS: usize = 15;

/// Returns the capacity to allocate for at least `min` pods.
///
/// # Errors
///
/// Returns [`Error::LengthLimit`] if `min` is above `max`.
pub fn grown_capacity(min: usize, max: usize) -> Result<usize> {
    let mut cap = if min <= MIN_CAPACITY_PODS {
        MIN_CAPACITY_PODS
    } else {
        let top_bit = usize::BITS - 1 - min.leading_zeros();
        2usize
            .checked_shl(top_bit)
            .map_or(usize::MAX, |pow| pow.wrapping_sub(1).max(min))
    };

    if max < cap {
        if max < min {
            return Err(Error::length_limit("arena", min as u64, max as u64));
        }
        cap = max;
    }

    debug_assert!(min <= cap && cap <= max);
    Ok(cap)
}

/// A byte range inside an arena.
///
/// Spans stay meaningful across reallocation because they are offsets, not
/// pointers. Use them to copy a name or payload that already lives in the
/// arena into a new node.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash)]
pub struct Span {
    start: usize,
    len: usize,
}

impl Span {
    #[inline]
    #[must_use]
    pub const fn new(start: usize, len: usize) -> Self {
        Span { start, len }
    }

    #[inline]
    #[must_use]
    pub const fn start(&self) -> usize {
        self.start
    }

    #[inline]
    #[must_use]
    pub const fn len(&self) -> usize {
        self.len
    }

    #[inline]
    #[must_use]
    pub const fn is_empty(&self) -> bool {
        self.len == 0
    }

    #[inline]
    #[must_use]
    pub const fn end(&self) -> usize {
        self.start + self.len
    }

    #[inline]
    #[must_use]
    pub fn range(&self) -> std::ops::Range<usize> {
        self.start..self.end()
    }
}

/// A contiguous, growable buffer of 4-byte pods.
///
/// The committed length is always a whole number of pods.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct PodArena {
    bytes: Vec<u8>,
}

impl PodArena {
    /// Creates an empty arena without allocating.
    #[must_use]
    pub const fn new() -> Self {
        PodArena { bytes: Vec::new() }
    }

    /// Largest number of pods an arena may hold.
    ///
    /// Bounded by the `u32` index field and by the address space.
    #[inline]
    #[must_use]
    pub const fn max_pods() -> usize {
        let by_address = usize::MAX / POD_SIZE;
        let by_index = 0xFFFF_FFFE_usize;
        if by_address < by_index {
            by_address
        } else {
            by_index
        }
    }

    #[inline]
    #[must_use]
    pub const fn max_bytes() -> u64 {
        Self::max_pods() as u64 * POD_SIZE as u64
    }

    /// Checks that a foreign buffer of `len` bytes can become an arena.
    ///
    /// # Errors
    ///
    /// [`Error::CorruptData`] if `len` is not a whole number of pods,
    /// [`Error::LengthLimit`] if it exceeds [`PodArena::max_bytes`].
    pub fn check_buffer_len(len: u64) -> Result<()> {
        if len % POD_SIZE as u64 != 0 {
            return Err(Error::corrupt(format!(
                "buffer length {len} is not a multiple of {POD_SIZE}"
            )));
        }
        if len > Self::max_bytes() {
            return Err(Error::length_limit("buffer", len, Self::max_bytes()));
        }
        Ok(())
    }

    /// Copies a raw buffer into a new arena.
    ///
    /// # Errors
    ///
    /// See [`PodArena::check_buffer_len`]; allocation failure is
    /// [`Error::OutOfMemory`].
    pub fn from_slice(bytes: &[u8]) -> Result<Self> {
        Self::check_buffer_len(bytes.len() as u64)?;
        let mut arena = PodArena::new();
        arena.reserve_pods(bytes.len() / POD_SIZE)?;
        arena.bytes.extend_from_slice(bytes);
        Ok(arena)
    }

    #[inline]
    #[must_use]
    pub fn len_pods(&self) -> usize {
        self.bytes.len() / POD_SIZE
    }

    #[inline]
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.bytes.is_empty()
    }

    #[inline]
    #[must_use]
    pub fn capacity_pods(&self) -> usize {
        self.bytes.capacity() / POD_SIZE
    }

    /// Ensures room for at least `min` pods without changing the length.
    ///
    /// # Errors
    ///
    /// [`Error::LengthLimit`] above the ceiling, [`Error::OutOfMemory`] if
    /// the allocator fails.
    pub fn reserve_pods(&mut self, min: usize) -> Result<()> {
        if min <= self.capacity_pods() {
            return Ok(());
        }
        let old = self.capacity_pods();
        let cap = grown_capacity(min, Self::max_pods())?;
        self.bytes
            .try_reserve_exact(cap * POD_SIZE - self.bytes.len())?;
        debug!(old_pods = old, new_pods = cap, "arena grown");
        Ok(())
    }

    /// Ensures room for at least `min_bytes` bytes, rounded up to whole pods.
    ///
    /// # Errors
    ///
    /// See [`PodArena::reserve_pods`].
    pub fn reserve_bytes(&mut self, min_bytes: u64) -> Result<()> {
        if min_bytes > Self::max_bytes() {
            return Err(Error::length_limit("arena", min_bytes, Self::max_bytes()));
        }
        self.reserve_pods(min_bytes.div_ceil(POD_SIZE as u64) as usize)
    }

    /// Sets the length to `pods`, zero-filling any new pods.
    ///
    /// # Errors
    ///
    /// See [`PodArena::reserve_pods`].
    pub fn resize_pods(&mut self, pods: usize) -> Result<()> {
        self.reserve_pods(pods)?;
        self.bytes.resize(pods * POD_SIZE, 0);
        Ok(())
    }

    /// Appends `src`, padded with zeros to a pod boundary, and returns the
    /// pod index it starts at.
    ///
    /// # Errors
    ///
    /// See [`PodArena::reserve_pods`].
    pub fn append(&mut self, src: &[u8]) -> Result<usize> {
        let start = self.len_pods();
        let pods = src.len().div_ceil(POD_SIZE);
        let region = self.append_region(pods)?;
        region[..src.len()].copy_from_slice(src);
        Ok(start)
    }

    /// Extends the arena by `pods` zeroed pods and returns the new region.
    ///
    /// Follow with [`PodArena::commit`] to give back the unused tail.
    ///
    /// # Errors
    ///
    /// See [`PodArena::reserve_pods`].
    pub fn append_region(&mut self, pods: usize) -> Result<&mut [u8]> {
        let start = self.bytes.len();
        let end = self
            .len_pods()
            .checked_add(pods)
            .ok_or_else(|| Error::length_limit("arena", u64::MAX, Self::max_bytes()))?;
        self.resize_pods(end)?;
        Ok(&mut self.bytes[start..])
    }

    /// Sets the committed end to `end_pod`.
    ///
    /// # Panics
    ///
    /// Panics if `end_pod` is past the current length.
    pub fn commit(&mut self, end_pod: usize) {
        assert!(
            end_pod <= self.len_pods(),
            "commit past end of arena: {end_pod} > {}",
            self.len_pods()
        );
        self.bytes.truncate(end_pod * POD_SIZE);
    }

    #[inline]
    pub fn clear(&mut self) {
        self.bytes.clear();
    }

    #[inline]
    pub fn swap(&mut self, other: &mut PodArena) {
        std::mem::swap(&mut self.bytes, &mut other.bytes);
    }

    #[inline]
    #[must_use]
    pub fn as_bytes(&self) -> &[u8] {
        &self.bytes
    }

    #[inline]
    #[must_use]
    pub fn as_bytes_mut(&mut self) -> &mut [u8] {
        &mut self.bytes
    }

    /// Reads the little-endian `u32` stored at `pod`.
    #[inline]
    #[must_use]
    pub fn read_u32(&self, pod: usize) -> u32 {
        let at = pod * POD_SIZE;
        let mut raw = [0u8; POD_SIZE];
        raw.copy_from_slice(&self.bytes[at..at + POD_SIZE]);
        u32::from_le_bytes(raw)
    }

    #[inline]
    pub fn write_u32(&mut self, pod: usize, value: u32) {
        let at = pod * POD_SIZE;
        self.bytes[at..at + POD_SIZE].copy_from_slice(&value.to_le_bytes());
    }
}
