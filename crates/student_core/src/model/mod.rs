//! Domain model for student records.
//!
//! # Responsibility
//! - Define the canonical record persisted by repositories.
//! - Define the read projection that carries derived attributes.
//!
//! # Invariants
//! - Every stored student is identified by a store-assigned `StudentId`.
//! - Derived attributes (`age`) are never part of the persisted shape.
//! - Deletion is a hard delete; there is no tombstone state.

pub mod student;
