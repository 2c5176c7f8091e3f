//! Concrete queue adapters.
//!
//! Each adapter implements [`QueueAdapter`](crate::adapter::QueueAdapter)
//! plus whichever capability traits its backend can honour.

pub mod memory;
pub mod null;

pub use memory::{InMemoryAdapter, InMemoryConfig};
pub use null::NullAdapter;
