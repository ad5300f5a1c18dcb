pub mod app;
pub mod core;
pub mod rules;
pub mod scanner;
