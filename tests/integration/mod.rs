//! Integration tests with mock HTTP servers

pub mod concurrency;
pub mod end_to_end;
pub mod error_handling;
