//! CodeAtlas Write Queue
//!
//! The system's only true mutual-exclusion guarantee: one global worker
//! drains disk-mutating jobs in strict FIFO order, so two writes to the same
//! file are never interleaved at the byte level. Deliberately coarse: one
//! worker, not per-file locks.

pub mod job;
pub mod queue;

pub use job::{Job, JobPayload, JobState};
pub use queue::{CacheTarget, JobHandle, QueueError, WriteQueue};
