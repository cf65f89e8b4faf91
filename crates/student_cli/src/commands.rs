//! Command execution against a student service.

use crate::args::Command;
use serde::Serialize;
use std::fmt::{Display, Formatter};
use student_core::{
    seed_default_students, ConfigError, LoggingError, Student, StudentRepository, StudentService,
    StudentServiceError,
};

#[derive(Debug)]
pub enum CliError {
    Config(ConfigError),
    Logging(LoggingError),
    Db(student_core::db::DbError),
    Service(StudentServiceError),
    Output(serde_json::Error),
}

impl CliError {
    /// Process exit code; distinguishes the service error kinds.
    pub fn exit_code(&self) -> i32 {
        match self {
            Self::Service(StudentServiceError::NotFound(_)) => 2,
            Self::Service(StudentServiceError::DuplicateEmail(_)) => 3,
            Self::Service(StudentServiceError::Validation(_)) => 4,
            _ => 1,
        }
    }
}

impl Display for CliError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Config(err) => write!(f, "{err}"),
            Self::Logging(err) => write!(f, "{err}"),
            Self::Db(err) => write!(f, "{err}"),
            Self::Service(err) => write!(f, "{err}"),
            Self::Output(err) => write!(f, "failed to encode output: {err}"),
        }
    }
}

impl std::error::Error for CliError {}

impl From<ConfigError> for CliError {
    fn from(value: ConfigError) -> Self {
        Self::Config(value)
    }
}

impl From<LoggingError> for CliError {
    fn from(value: LoggingError) -> Self {
        Self::Logging(value)
    }
}

impl From<student_core::db::DbError> for CliError {
    fn from(value: student_core::db::DbError) -> Self {
        Self::Db(value)
    }
}

impl From<StudentServiceError> for CliError {
    fn from(value: StudentServiceError) -> Self {
        Self::Service(value)
    }
}

impl From<serde_json::Error> for CliError {
    fn from(value: serde_json::Error) -> Self {
        Self::Output(value)
    }
}

pub type CliResult<T> = Result<T, CliError>;

/// Runs one command and returns the text to print on success.
pub fn execute<R: StudentRepository>(
    service: &StudentService<R>,
    command: Command,
) -> CliResult<String> {
    match command {
        Command::List => to_json(&service.list_student_views()?),
        Command::Get { id } => to_json(&service.get_student_view(id)?),
        Command::Create { name, email, dob } => {
            let created = service.create_student(&Student::new(name, email, dob))?;
            to_json(&created.view())
        }
        Command::Update { id, name, email } => {
            let updated = service.update_student(id, name.as_deref(), email.as_deref())?;
            to_json(&updated.view())
        }
        Command::Delete { id } => {
            service.delete_student(id)?;
            Ok(format!("deleted {id}"))
        }
        Command::Seed => {
            let created = seed_default_students(service)?;
            Ok(format!("seeded {created}"))
        }
    }
}

fn to_json<T: Serialize>(value: &T) -> CliResult<String> {
    Ok(serde_json::to_string_pretty(value)?)
}
