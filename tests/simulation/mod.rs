//! In-process server simulation for stress testing
//!
//! Provides an upload backend with random failures and latency, so the
//! engine's resume paths can be exercised without a real server.

pub mod flaky_backend;

pub use flaky_backend::{FlakyBackend, FlakyConfig};

#[allow(unused_imports)]
pub use flaky_backend::FlakyStats;
