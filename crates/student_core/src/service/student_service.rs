//! Student use-case service.
//!
//! # Responsibility
//! - Provide list/get/create/update/delete entry points for student records.
//! - Enforce email uniqueness and the partial-update field selection rules.
//!
//! # Invariants
//! - The service holds no state besides its repository handle.
//! - Every failure path leaves persisted state exactly as it was: all checks
//!   run before the single write of an operation.
//! - A field is updated only when the new value is present, non-blank and
//!   different from the current value; blanks are never written.

use crate::model::student::{
    is_blank, today, Student, StudentId, StudentValidationError, StudentView,
};
use crate::repo::student_repo::{RepoError, StudentRepository};
use log::{debug, info, warn};
use std::error::Error;
use std::fmt::{Display, Formatter};

pub type ServiceResult<T> = Result<T, StudentServiceError>;

/// Service error for student use-cases.
#[derive(Debug)]
pub enum StudentServiceError {
    /// No student has the given id.
    NotFound(StudentId),
    /// The email already belongs to a different student.
    DuplicateEmail(String),
    /// The creation candidate is malformed.
    Validation(StudentValidationError),
    /// Persistence-layer failure.
    Repo(RepoError),
}

impl Display for StudentServiceError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::NotFound(id) => write!(f, "student not found: {id}"),
            Self::DuplicateEmail(email) => write!(f, "email already taken: {email}"),
            Self::Validation(err) => write!(f, "{err}"),
            Self::Repo(err) => write!(f, "{err}"),
        }
    }
}

impl Error for StudentServiceError {
    fn source(&self) -> Option<&(dyn Error + 'static)> {
        match self {
            Self::Validation(err) => Some(err),
            Self::Repo(err) => Some(err),
            _ => None,
        }
    }
}

impl From<RepoError> for StudentServiceError {
    fn from(value: RepoError) -> Self {
        match value {
            RepoError::NotFound(id) => Self::NotFound(id),
            RepoError::DuplicateEmail(email) => Self::DuplicateEmail(email),
            RepoError::Validation(err) => Self::Validation(err),
            other => Self::Repo(other),
        }
    }
}

impl From<StudentValidationError> for StudentServiceError {
    fn from(value: StudentValidationError) -> Self {
        Self::Validation(value)
    }
}

/// Student service over an explicitly provided repository.
pub struct StudentService<R: StudentRepository> {
    repo: R,
}

impl<R: StudentRepository> StudentService<R> {
    /// Creates a service using the provided repository implementation.
    pub fn new(repo: R) -> Self {
        Self { repo }
    }

    /// Borrows the underlying repository.
    pub fn repository(&self) -> &R {
        &self.repo
    }

    /// Lists all students in store order.
    pub fn list_students(&self) -> ServiceResult<Vec<Student>> {
        let students = self.repo.find_all()?;
        debug!(
            "event=student_list module=service status=ok count={}",
            students.len()
        );
        Ok(students)
    }

    /// Lists all students as read views with `age` computed now.
    pub fn list_student_views(&self) -> ServiceResult<Vec<StudentView>> {
        let today = today();
        Ok(self
            .list_students()?
            .iter()
            .map(|student| student.to_view(today))
            .collect())
    }

    /// Gets one student by id.
    ///
    /// # Errors
    /// - `NotFound` when no student has `id`.
    pub fn get_student(&self, id: StudentId) -> ServiceResult<Student> {
        self.repo
            .find_by_id(id)?
            .ok_or(StudentServiceError::NotFound(id))
    }

    /// Gets one student as a read view with `age` computed now.
    pub fn get_student_view(&self, id: StudentId) -> ServiceResult<StudentView> {
        Ok(self.get_student(id)?.view())
    }

    /// Creates a student from an unsaved candidate.
    ///
    /// Returns the stored record with its store-assigned id.
    ///
    /// # Errors
    /// - `Validation` when the candidate has a blank field or already has an id.
    /// - `DuplicateEmail` when any stored student holds `candidate.email`.
    pub fn create_student(&self, candidate: &Student) -> ServiceResult<Student> {
        if let Some(id) = candidate.id {
            return Err(StudentValidationError::IdAlreadyAssigned(id).into());
        }
        candidate.validate()?;
        self.require_unique_email(&candidate.email)?;

        let stored = self.repo.save(candidate).map_err(|err| {
            warn!(
                "event=student_create module=service status=error error_code={}",
                err.code()
            );
            StudentServiceError::from(err)
        })?;
        info!(
            "event=student_create module=service status=ok id={}",
            display_id(stored.id)
        );
        Ok(stored)
    }

    /// Applies a partial update to name and/or email.
    ///
    /// Absent, blank or unchanged values leave the field untouched; when no
    /// field changes the call succeeds without writing. Returns the record
    /// as stored after the call.
    ///
    /// # Errors
    /// - `NotFound` when no student has `id`.
    /// - `DuplicateEmail` when another student holds `new_email`; in that
    ///   case no field is changed, including a valid new name.
    pub fn update_student(
        &self,
        id: StudentId,
        new_name: Option<&str>,
        new_email: Option<&str>,
    ) -> ServiceResult<Student> {
        let current = self.get_student(id)?;
        let mut updated = current.clone();

        if let Some(name) = accepted_change(new_name, &current.name) {
            updated.name = name.to_string();
        }
        if let Some(email) = accepted_change(new_email, &current.email) {
            self.require_unique_email(email)?;
            updated.email = email.to_string();
        }

        if updated == current {
            debug!("event=student_update module=service status=noop id={id}");
            return Ok(current);
        }

        let stored = self.repo.save(&updated).map_err(|err| {
            warn!(
                "event=student_update module=service status=error id={id} error_code={}",
                err.code()
            );
            StudentServiceError::from(err)
        })?;
        info!(
            "event=student_update module=service status=ok id={id} name_changed={} email_changed={}",
            stored.name != current.name,
            stored.email != current.email
        );
        Ok(stored)
    }

    /// Deletes a student by id.
    ///
    /// # Errors
    /// - `NotFound` when no student has `id`.
    pub fn delete_student(&self, id: StudentId) -> ServiceResult<()> {
        if !self.repo.exists_by_id(id)? {
            return Err(StudentServiceError::NotFound(id));
        }
        self.repo.delete_by_id(id)?;
        info!("event=student_delete module=service status=ok id={id}");
        Ok(())
    }

    fn require_unique_email(&self, email: &str) -> ServiceResult<()> {
        if self.repo.find_by_email(email)?.is_some() {
            debug!("event=email_check module=service status=duplicate");
            return Err(StudentServiceError::DuplicateEmail(email.to_string()));
        }
        Ok(())
    }
}

/// Returns the new value when it is present, non-blank and different from
/// `current`.
fn accepted_change<'a>(new_value: Option<&'a str>, current: &str) -> Option<&'a str> {
    new_value.filter(|value| !is_blank(value) && *value != current)
}

fn display_id(id: Option<StudentId>) -> String {
    id.map_or_else(|| "none".to_string(), |id| id.to_string())
}
