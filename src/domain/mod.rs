//! Domain layer containing business logic and domain types.
//!
//! # Module Organization
//!
//! - `foundation` - Shared domain primitives (value objects, IDs, enums, errors)
//! - `session` - Session aggregate, its change vocabulary and lifecycle rules

pub mod foundation;
pub mod session;
