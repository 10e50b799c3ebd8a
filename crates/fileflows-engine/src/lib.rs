//! Queue-backed folder sync engine.
//!
//! Enumerator → Work Queue → Reconciler → Worker Pool → Remote Storage.
//! The destination folder is resolved once up front by every flow.

pub mod enumerate;
pub mod pool;
pub mod reconcile;
pub mod resolve;
pub mod sync;

#[cfg(test)]
mod testing;

pub use enumerate::{populate, EnumerationReport, Filters};
pub use pool::{drain_queue, run_pool, ItemOutcome, PoolReport, UnitReport};
pub use reconcile::{prune_existing, title_of, TitleIndex};
pub use resolve::{resolve_or_create, DuplicatePolicy};
pub use sync::{delete, rename, upload, DeleteRequest, SyncContext, SyncReport, UploadRequest};
