//! Scanner Integration Test Modules

pub mod http;
pub mod pipeline;
