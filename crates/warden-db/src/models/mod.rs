//! Database models - SQLx-compatible structs for the SQLite tables

mod silence;

pub use silence::SilenceModel;
