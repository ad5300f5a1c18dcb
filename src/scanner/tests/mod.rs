//! Test modules for the scanner pipeline

pub mod helpers;
