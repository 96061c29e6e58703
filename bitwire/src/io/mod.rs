//! Byte cursors the playbook reads from and writes into.
//!
//! Both cursors wrap caller-owned slices and only ever move forward. A failed read or write
//! never advances the cursor and never touches bytes past the current position, so a failed
//! serialization leaves everything written before the failing field in place and nothing
//! after it.
use thiserror::Error;

mod cursor;
pub use cursor::{Reader, Writer};

#[derive(Error, Debug, Clone, Copy, PartialEq, Eq)]
pub enum ReadError {
    #[error("Attempting to read {needed} bytes with {remaining} remaining")]
    BufferTooSmall { needed: usize, remaining: usize },
}

pub type ReadResult<T> = core::result::Result<T, ReadError>;

#[cold]
pub const fn read_buffer_too_small(needed: usize, remaining: usize) -> ReadError {
    ReadError::BufferTooSmall { needed, remaining }
}

#[derive(Error, Debug, Clone, Copy, PartialEq, Eq)]
pub enum WriteError {
    #[error("Attempting to write {needed} bytes with {remaining} remaining")]
    BufferTooSmall { needed: usize, remaining: usize },
}

pub type WriteResult<T> = core::result::Result<T, WriteError>;

#[cold]
pub const fn write_buffer_too_small(needed: usize, remaining: usize) -> WriteError {
    WriteError::BufferTooSmall { needed, remaining }
}
