//! Background Tasks Module
//!
//! Long-running tasks owned by a cache instance.
//!
//! # Tasks
//! - Expiration sweeper: removes expired entries at a fixed interval
//! - Ingestion consumer: applies queued writes to the store one at a time

mod ingest;
mod sweeper;

pub use ingest::{spawn_ingestor, IngestHandle};
pub use sweeper::spawn_sweeper;
