//! Restrict-to conditions gating handler execution
//!
//! This module provides:
//! - `CachedPattern`, a regular expression compiled once per instance
//! - `RestrictTo`, a field + pattern predicate
//! - `RestrictToSet`, OR-composition of predicates (empty set always matches)

pub mod pattern;
pub mod restrict_to;

pub use pattern::CachedPattern;
pub use restrict_to::{field_values, matches, RestrictTo, RestrictToSet};
