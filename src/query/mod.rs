//! Translation of dashboard parameters into provider queries.

pub mod report;
pub mod window;
