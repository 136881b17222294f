//! Shared wire and domain types for the Kindred backend.
//!
//! Everything that crosses a crate boundary (request/response bodies, token
//! claims, broker events, domain enums) lives here so the persistence layer
//! and the HTTP layer agree on one definition.

pub mod api;
pub mod events;
pub mod models;
pub mod validation;
