//! Integration tests for cloudpull-sync
//!
//! Runs the engine end to end against the in-memory store, wrapped in a
//! fault-injecting adapter, and a temporary local directory.

mod common;

mod test_download;
mod test_resume;
mod test_retry;
mod test_transfer_ops;
