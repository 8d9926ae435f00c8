//! An embeddable in-memory document store with the delivery semantics the
//! rest of the system is written against: merge upserts, full-snapshot
//! at-least-once change notification (writers hear their own writes), and
//! append-order candidate queues that replay on resubscribe.

mod memory;

pub use memory::MemoryStore;
