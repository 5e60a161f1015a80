//! Integration test support
//!
//! A scriptable in-process gateway server plus in-memory REST fakes, so the
//! real client can be driven through whole connection lifecycles without
//! touching a network.

pub mod fixtures;
pub mod helpers;

pub use fixtures::{memory_repository, RecordingApi};
pub use helpers::{ServerConn, TestGateway};
