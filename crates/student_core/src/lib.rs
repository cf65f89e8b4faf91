//! Core domain logic for student record management.
//! This crate is the single source of truth for student business invariants.

pub mod config;
pub mod db;
pub mod logging;
pub mod model;
pub mod repo;
pub mod seed;
pub mod service;

pub use config::{ConfigError, CoreConfig};
pub use logging::{default_log_level, init_from_config, init_logging, logging_status, LoggingError};
pub use model::student::{Student, StudentId, StudentValidationError, StudentView};
pub use repo::memory_repo::InMemoryStudentRepository;
pub use repo::student_repo::{RepoError, RepoResult, SqliteStudentRepository, StudentRepository};
pub use seed::seed_default_students;
pub use service::student_service::{ServiceResult, StudentService, StudentServiceError};

/// Returns the core crate version.
pub fn core_version() -> &'static str {
    env!("CARGO_PKG_VERSION")
}
