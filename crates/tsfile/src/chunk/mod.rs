//! Chunk buffering and serialization.
//!
//! A [`ChunkBuffer`] collects the points of one series until a threshold is
//! reached; the [`ChunkWriter`] then turns the run into one immutable chunk on
//! the output stream.

mod buffer;
mod writer;

pub use buffer::{BufferState, ChunkBuffer};
pub use writer::{Chunk, ChunkHeader, ChunkWriter};
