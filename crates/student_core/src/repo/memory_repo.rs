//! Process-local student repository.
//!
//! # Responsibility
//! - Provide a store with the same contract as the SQLite implementation
//!   without any file or connection setup.
//!
//! # Invariants
//! - Ids are taken from a monotonic counter and never reused.
//! - Uniqueness check and write happen under one lock, so email uniqueness
//!   holds even with concurrent writers.

use crate::model::student::{Student, StudentId};
use crate::repo::student_repo::{RepoError, RepoResult, StudentRepository};
use std::collections::BTreeMap;
use std::sync::{Mutex, MutexGuard};

#[derive(Debug, Default)]
struct MemoryState {
    last_id: StudentId,
    rows: BTreeMap<StudentId, Student>,
}

/// In-memory student repository backed by an ordered map.
#[derive(Debug, Default)]
pub struct InMemoryStudentRepository {
    state: Mutex<MemoryState>,
}

impl InMemoryStudentRepository {
    pub fn new() -> Self {
        Self::default()
    }

    fn lock(&self) -> RepoResult<MutexGuard<'_, MemoryState>> {
        self.state.lock().map_err(|_| RepoError::LockPoisoned)
    }
}

impl MemoryState {
    fn email_taken_by_other(&self, email: &str, own_id: Option<StudentId>) -> bool {
        self.rows
            .values()
            .any(|row| row.email == email && row.id != own_id)
    }
}

impl StudentRepository for InMemoryStudentRepository {
    fn find_all(&self) -> RepoResult<Vec<Student>> {
        Ok(self.lock()?.rows.values().cloned().collect())
    }

    fn find_by_id(&self, id: StudentId) -> RepoResult<Option<Student>> {
        Ok(self.lock()?.rows.get(&id).cloned())
    }

    fn find_by_email(&self, email: &str) -> RepoResult<Option<Student>> {
        Ok(self
            .lock()?
            .rows
            .values()
            .find(|row| row.email == email)
            .cloned())
    }

    fn exists_by_id(&self, id: StudentId) -> RepoResult<bool> {
        Ok(self.lock()?.rows.contains_key(&id))
    }

    fn save(&self, student: &Student) -> RepoResult<Student> {
        student.validate()?;

        let mut state = self.lock()?;
        if let Some(id) = student.id {
            if !state.rows.contains_key(&id) {
                return Err(RepoError::NotFound(id));
            }
        }
        if state.email_taken_by_other(&student.email, student.id) {
            return Err(RepoError::DuplicateEmail(student.email.clone()));
        }

        let id = match student.id {
            Some(id) => id,
            None => {
                state.last_id += 1;
                state.last_id
            }
        };
        let stored = Student {
            id: Some(id),
            ..student.clone()
        };
        state.rows.insert(id, stored.clone());
        Ok(stored)
    }

    fn delete_by_id(&self, id: StudentId) -> RepoResult<()> {
        self.lock()?.rows.remove(&id);
        Ok(())
    }

    fn count(&self) -> RepoResult<u64> {
        Ok(self.lock()?.rows.len() as u64)
    }
}
