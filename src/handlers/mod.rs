//! HTTP handlers for the common endpoints and example CRUD.

pub mod common;
pub mod example;
