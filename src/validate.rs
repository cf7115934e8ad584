//! Structural validation of untrusted buffers.
//!
//! A buffer is accepted only if it decodes to a tree that every other part
//! of the crate can walk without reading out of bounds or looping. Each pod
//! gets a 2-bit state:
//!
//! ```text
//! None -> Head -> Reached     node header
//! None -> Tail                header tail, name and payload pods
//! ```
//!
//! Any other transition means overlap, a loop, or a dangling index, and
//! rejects the buffer.
//!
//! 1. **Flat pass.** Walk the global `next` list from index 0 until it
//!    returns to 0, claiming each node's pods. Declared payload sizes are
//!    checked against [`DATA_MAX`].
//! 2. **Tree pass.** Starting at the root, check that each composite's
//!    first child sits right after its name and is hidden, then walk its
//!    children up to `last_child`, moving each head to `Reached`.
//!
//! Every index is bounds-checked through the state map before the bytes
//! it guards are read. Nodes on the flat list that the tree never reaches
//! are tolerated.

use tracing::debug;

use crate::arena::POD_SIZE;
use crate::error::{Error, Result};
use crate::node::{self, data_offset, pods_for, Kind, DATA_MAX, ROOT_INDEX};

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
#[repr(u8)]
enum PodState {
    None = 0,
    Tail = 1,
    Head = 2,
    Reached = 3,
}

impl PodState {
    const fn from_bits(bits: u8) -> Self {
        match bits & 0b11 {
            0 => PodState::None,
            1 => PodState::Tail,
            2 => PodState::Head,
            _ => PodState::Reached,
        }
    }
}

/// Two bits per pod, four pods per byte.
struct StateMap {
    bits: Vec<u8>,
    pods: usize,
}

impl StateMap {
    fn new(pods: usize) -> Result<Self> {
        let mut bits = Vec::new();
        bits.try_reserve_exact(pods.div_ceil(4))?;
        bits.resize(pods.div_ceil(4), 0);
        Ok(StateMap { bits, pods })
    }

    fn get(&self, pod: usize) -> PodState {
        PodState::from_bits(self.bits[pod / 4] >> ((pod % 4) * 2))
    }

    fn set(&mut self, pod: usize, state: PodState) {
        let shift = (pod % 4) * 2;
        let byte = &mut self.bits[pod / 4];
        *byte = (*byte & !(0b11 << shift)) | ((state as u8) << shift);
    }

    /// Moves `pod` from `expected` to `new`, or reports why it cannot.
    fn update(&mut self, pod: usize, expected: PodState, new: PodState) -> Result<()> {
        if pod >= self.pods {
            return Err(Error::corrupt(format!(
                "index {pod} is outside a buffer of {} pods",
                self.pods
            )));
        }
        let current = self.get(pod);
        if current != expected {
            return Err(Error::corrupt(format!(
                "pod {pod} is {current:?}, expected {expected:?}"
            )));
        }
        self.set(pod, new);
        Ok(())
    }

    fn claim_tail(&mut self, pods: std::ops::Range<usize>) -> Result<()> {
        for pod in pods {
            self.update(pod, PodState::None, PodState::Tail)?;
        }
        Ok(())
    }
}

/// Checks that `bytes` encodes a well-formed tree. An empty buffer is an
/// empty tree.
///
/// # Errors
///
/// [`Error::CorruptData`] for any structural problem,
/// [`Error::OutOfMemory`] if the state map cannot be allocated.
pub fn validate(bytes: &[u8]) -> Result<()> {
    let result = run(bytes);
    if let Err(err) = &result {
        debug!(len = bytes.len(), %err, "buffer rejected");
    }
    result
}

fn run(bytes: &[u8]) -> Result<()> {
    if bytes.is_empty() {
        return Ok(());
    }
    if bytes.len() % POD_SIZE != 0 {
        return Err(Error::corrupt(format!(
            "buffer length {} is not a multiple of {POD_SIZE}",
            bytes.len()
        )));
    }
    let mut map = StateMap::new(bytes.len() / POD_SIZE)?;
    flat_pass(bytes, &mut map)?;

    map.update(0, PodState::Head, PodState::Reached)?;
    let root = node::header(bytes, ROOT_INDEX);
    if root.name_len() != 0 || root.kind() != Kind::OBJECT {
        return Err(Error::corrupt("root must be an unnamed object"));
    }

    tree_pass(bytes, &mut map)
}

fn flat_pass(bytes: &[u8], map: &mut StateMap) -> Result<()> {
    let mut index = ROOT_INDEX;
    loop {
        let at = index as usize;
        map.update(at, PodState::None, PodState::Head)?;
        map.update(at + 1, PodState::None, PodState::Tail)?;
        let header = node::header(bytes, index);
        let kind = header.kind();

        if !kind.is_hidden() {
            let payload_at = at + data_offset(header.name_len());
            map.claim_tail(at + 2..payload_at)?;
            if kind.is_leaf() {
                let size = node::value_header(bytes, index).extent();
                if size > DATA_MAX {
                    return Err(Error::corrupt(format!(
                        "node {index} declares {size} payload bytes"
                    )));
                }
                map.claim_tail(payload_at..payload_at + pods_for(size as usize))?;
            }
        }

        index = header.next_index();
        if index == ROOT_INDEX {
            return Ok(());
        }
    }
}

fn tree_pass(bytes: &[u8], map: &mut StateMap) -> Result<()> {
    let mut pending = vec![ROOT_INDEX];
    while let Some(parent) = pending.pop() {
        let first = parent as usize + data_offset(node::header(bytes, parent).name_len());
        map.update(first, PodState::Head, PodState::Reached)?;
        // Reached from Head, so its header was claimed by the flat pass.
        let first = first as u32;
        if !node::kind(bytes, first).is_hidden() {
            return Err(Error::corrupt(format!(
                "first child of node {parent} is not hidden"
            )));
        }

        let last = node::value_header(bytes, parent).extent();
        let mut cur = first;
        while cur != last {
            cur = node::next_index(bytes, cur);
            map.update(cur as usize, PodState::Head, PodState::Reached)?;
            if node::kind(bytes, cur).is_composite() {
                pending.push(cur);
            }
        }
    }
    Ok(())
}
