//! Security Module
//!
//! Provides the privacy boundary between question text and storage:
//! - Input validation and sanitization
//! - Identity-bound access scoping for student data

pub mod scope_guard;
pub mod validation;

pub use scope_guard::{AccessScopeGuard, ExecutorProfileResolver, ProfileResolver};
pub use validation::{QueryValidator, ValidationError};
