//! Error types for building, loading and rendering packed JSON trees.
//!
//! Failures fall into two recoverable groups, kept distinct so callers can
//! react differently:
//!
//! - **Resource exhaustion**: [`Error::OutOfMemory`] ("try later") and
//!   [`Error::LengthLimit`] ("try smaller").
//! - **Data corruption**: [`Error::CorruptData`], produced only while
//!   loading or validating a buffer of unknown origin.
//!
//! Misuse of the API (a [`NodeId`](crate::NodeId) from another builder,
//! inserting under a leaf, reading the payload of a composite) is not an
//! error value. Those are documented preconditions and they panic.
//!
//! ## Examples
//!
//! ```rust
//! use packed_json::{Error, JsonBuilder};
//!
//! let err = JsonBuilder::from_bytes(&[1, 2, 3], true).unwrap_err();
//! assert!(err.is_corrupt());
//! ```

use std::collections::TryReserveError;
use std::fmt;
use thiserror::Error;

/// Represents all recoverable errors reported by this crate.
#[derive(Debug, Clone, Error)]
pub enum Error {
    /// The allocator refused to grow the arena.
    #[error("Out of memory: {0}")]
    OutOfMemory(String),

    /// A name, payload or buffer size is above its hard ceiling.
    #[error("Length limit exceeded: {what} ({requested} > {limit})")]
    LengthLimit {
        what: &'static str,
        requested: u64,
        limit: u64,
    },

    /// A loaded buffer does not encode a well-formed tree.
    #[error("Corrupt data: {0}")]
    CorruptData(String),

    /// IO error while writing rendered output
    #[error("IO error: {0}")]
    Io(String),

    /// Custom error
    #[error("Error: {0}")]
    Custom(String),
}

impl Error {
    /// Creates a size-ceiling error.
    ///
    /// # Examples
    ///
    /// ```rust
    /// use packed_json::Error;
    ///
    /// let err = Error::length_limit("name", 20_000_000, 0xFF_FFFF);
    /// assert!(err.is_length_limit());
    /// assert!(err.to_string().contains("name"));
    /// ```
    pub fn length_limit(what: &'static str, requested: u64, limit: u64) -> Self {
        Error::LengthLimit {
            what,
            requested,
            limit,
        }
    }

    /// Creates a corrupt-data error carrying the reason the buffer was rejected.
    pub fn corrupt<T: fmt::Display>(reason: T) -> Self {
        Error::CorruptData(reason.to_string())
    }

    /// Creates a custom error with a display message.
    ///
    /// # Examples
    ///
    /// ```rust
    /// use packed_json::Error;
    ///
    /// let err = Error::custom("something went wrong");
    /// assert!(err.to_string().contains("something went wrong"));
    /// ```
    pub fn custom<T: fmt::Display>(msg: T) -> Self {
        Error::Custom(msg.to_string())
    }

    #[inline]
    #[must_use]
    pub const fn is_out_of_memory(&self) -> bool {
        matches!(self, Error::OutOfMemory(_))
    }

    #[inline]
    #[must_use]
    pub const fn is_length_limit(&self) -> bool {
        matches!(self, Error::LengthLimit { .. })
    }

    #[inline]
    #[must_use]
    pub const fn is_corrupt(&self) -> bool {
        matches!(self, Error::CorruptData(_))
    }
}

impl From<TryReserveError> for Error {
    fn from(err: TryReserveError) -> Self {
        Error::OutOfMemory(err.to_string())
    }
}

impl From<std::io::Error> for Error {
    fn from(err: std::io::Error) -> Self {
        Error::Io(err.to_string())
    }
}

impl serde::ser::Error for Error {
    fn custom<T: fmt::Display>(msg: T) -> Self {
        Error::Custom(msg.to_string())
    }
}

impl serde::de::Error for Error {
    fn custom<T: fmt::Display>(msg: T) -> Self {
        Error::Custom(msg.to_string())
    }
}

pub type Result<T> = std::result::Result<T, Error>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_classes_are_disjoint() {
        let oom = Error::OutOfMemory("allocation failed".into());
        let len = Error::length_limit("buffer", 10, 5);
        let bad = Error::corrupt("loop in list");

        assert!(oom.is_out_of_memory() && !oom.is_length_limit() && !oom.is_corrupt());
        assert!(len.is_length_limit() && !len.is_out_of_memory());
        assert!(bad.is_corrupt() && !bad.is_length_limit());
    }

    #[test]
    fn test_writer_failure_maps_to_io() {
        let io = std::io::Error::new(std::io::ErrorKind::BrokenPipe, "pipe closed");
        let err = Error::from(io);
        assert!(matches!(err, Error::Io(_)));
        assert!(err.to_string().contains("pipe closed"));
    }

    #[test]
    fn test_try_reserve_maps_to_out_of_memory() {
        let mut v: Vec<u8> = Vec::new();
        let err = v.try_reserve_exact(usize::MAX).unwrap_err();
        assert!(Error::from(err).is_out_of_memory());
    }
}
