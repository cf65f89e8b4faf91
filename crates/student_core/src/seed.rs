//! Default student fixtures for fresh stores.
//!
//! Seeding goes through `StudentService`, so every fixture passes the same
//! validation and uniqueness rules as caller-created records.

use crate::model::student::Student;
use crate::repo::student_repo::StudentRepository;
use crate::service::student_service::{ServiceResult, StudentService, StudentServiceError};
use chrono::NaiveDate;
use log::info;

const DEFAULT_STUDENTS: &[(&str, &str, (i32, u32, u32))] = &[
    ("Abc Xyz", "abc.xyz@school.com", (1997, 12, 10)),
    ("Wuv Hij", "wuv.hij@school.com", (1998, 8, 15)),
];

/// Returns the default fixture candidates in creation order.
pub fn default_students() -> Vec<Student> {
    DEFAULT_STUDENTS
        .iter()
        .filter_map(|(name, email, (year, month, day))| {
            NaiveDate::from_ymd_opt(*year, *month, *day)
                .map(|dob| Student::new(*name, *email, dob))
        })
        .collect()
}

/// Creates the default students, skipping any whose email is already stored.
///
/// Returns the number of students created. Running it twice is a no-op the
/// second time.
pub fn seed_default_students<R: StudentRepository>(
    service: &StudentService<R>,
) -> ServiceResult<usize> {
    let mut created = 0;
    for candidate in default_students() {
        match service.create_student(&candidate) {
            Ok(_) => created += 1,
            Err(StudentServiceError::DuplicateEmail(_)) => continue,
            Err(err) => return Err(err),
        }
    }
    info!("event=seed module=seed status=ok created={created}");
    Ok(created)
}

#[cfg(test)]
mod tests {
    use super::{default_students, seed_default_students};
    use crate::repo::memory_repo::InMemoryStudentRepository;
    use crate::service::student_service::StudentService;

    #[test]
    fn fixtures_are_all_valid() {
        let students = default_students();
        assert_eq!(students.len(), 2);
        assert!(students.iter().all(|s| s.validate().is_ok()));
    }

    #[test]
    fn seeding_is_idempotent() {
        let service = StudentService::new(InMemoryStudentRepository::new());
        assert_eq!(seed_default_students(&service).unwrap(), 2);
        assert_eq!(seed_default_students(&service).unwrap(), 0);
        assert_eq!(service.list_students().unwrap().len(), 2);
    }
}
