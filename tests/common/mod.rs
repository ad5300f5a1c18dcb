//! Common test utilities and helpers
//!
//! In-memory distributions, rule directories and release files shared by the
//! integration tests.

pub mod fixtures;
