//! Test helpers module
//!
//! Shared setup for the integration tests: settings, database access,
//! an in-process router and fake data builders.

#![allow(dead_code)]

pub mod database_helper;
pub mod test_context;
pub mod test_data;

pub use database_helper::*;
pub use test_context::*;
pub use test_data::*;
