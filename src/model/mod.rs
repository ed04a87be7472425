//! Persisted entities and the enums shared by request parsing.

pub mod common;
pub mod example;

pub use common::*;
pub use example::*;
