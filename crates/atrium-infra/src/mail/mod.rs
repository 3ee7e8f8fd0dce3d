//! Mail queue implementations.

mod memory;

pub use memory::{InMemoryMailQueue, InMemoryMailQueueConfig};
