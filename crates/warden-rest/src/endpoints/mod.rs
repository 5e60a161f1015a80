//! API endpoint modules organized by category.
//!
//! Each module adds typed methods on [`crate::RestClient`] for one group of
//! platform endpoints.

pub mod commands;
pub mod gateway;
pub mod members;
pub mod messages;
pub mod users;
