//! Work queue backends for fileflows.
//!
//! - `MemoryQueue`: in-process sets, for tests and single-process runs
//! - `FileQueue`: one JSON file per key guarded by an advisory file lock,
//!   shared by every process on the host that opens the same directory

mod file;
mod memory;

pub use file::FileQueue;
pub use memory::MemoryQueue;
