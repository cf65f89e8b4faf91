//! Repository layer abstractions and persistence implementations.
//!
//! # Responsibility
//! - Define the store contract consumed by the student service.
//! - Isolate SQLite query details from business orchestration.
//!
//! # Invariants
//! - Write paths call `Student::validate()` before persisting.
//! - The email uniqueness invariant is enforced atomically by every store;
//!   violations surface as `RepoError::DuplicateEmail`.
//! - Repositories know nothing about partial-update rules.

pub mod memory_repo;
pub mod student_repo;
