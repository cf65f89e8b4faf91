use chrono::{Datelike, Local, NaiveDate};
use log::{LevelFilter, Log, Metadata, Record};
use once_cell::sync::Lazy;
use std::sync::{Mutex, Once};
use student_core::db::open_db_in_memory;
use student_core::{
    InMemoryStudentRepository, RepoResult, SqliteStudentRepository, Student, StudentId,
    StudentRepository, StudentService, StudentServiceError, StudentValidationError,
};

static CAPTURED_LOGS: Lazy<Mutex<Vec<String>>> = Lazy::new(|| Mutex::new(Vec::new()));
static LOGGER_INIT: Once = Once::new();

struct CaptureLogger;

impl Log for CaptureLogger {
    fn enabled(&self, _metadata: &Metadata<'_>) -> bool {
        true
    }

    fn log(&self, record: &Record<'_>) {
        CAPTURED_LOGS
            .lock()
            .unwrap()
            .push(record.args().to_string());
    }

    fn flush(&self) {}
}

static CAPTURE_LOGGER: CaptureLogger = CaptureLogger;

fn capture_logs() {
    LOGGER_INIT.call_once(|| {
        log::set_logger(&CAPTURE_LOGGER).unwrap();
        log::set_max_level(LevelFilter::Trace);
    });
}

fn captured_lines_containing(needle: &str) -> Vec<String> {
    CAPTURED_LOGS
        .lock()
        .unwrap()
        .iter()
        .filter(|line| line.contains(needle))
        .cloned()
        .collect()
}

/// Store whose email lookup never sees existing rows, so the service
/// pre-check passes and the store's own uniqueness rule has to reject writes.
struct BlindEmailLookup(InMemoryStudentRepository);

impl StudentRepository for BlindEmailLookup {
    fn find_all(&self) -> RepoResult<Vec<Student>> {
        self.0.find_all()
    }
    fn find_by_id(&self, id: StudentId) -> RepoResult<Option<Student>> {
        self.0.find_by_id(id)
    }
    fn find_by_email(&self, _email: &str) -> RepoResult<Option<Student>> {
        Ok(None)
    }
    fn exists_by_id(&self, id: StudentId) -> RepoResult<bool> {
        self.0.exists_by_id(id)
    }
    fn save(&self, student: &Student) -> RepoResult<Student> {
        self.0.save(student)
    }
    fn delete_by_id(&self, id: StudentId) -> RepoResult<()> {
        self.0.delete_by_id(id)
    }
    fn count(&self) -> RepoResult<u64> {
        self.0.count()
    }
}

/// Store that keeps serving a record by id after it was removed underneath.
struct StaleReads {
    inner: InMemoryStudentRepository,
    stale: Student,
}

impl StudentRepository for StaleReads {
    fn find_all(&self) -> RepoResult<Vec<Student>> {
        self.inner.find_all()
    }
    fn find_by_id(&self, id: StudentId) -> RepoResult<Option<Student>> {
        Ok((self.stale.id == Some(id)).then(|| self.stale.clone()))
    }
    fn find_by_email(&self, email: &str) -> RepoResult<Option<Student>> {
        self.inner.find_by_email(email)
    }
    fn exists_by_id(&self, id: StudentId) -> RepoResult<bool> {
        self.inner.exists_by_id(id)
    }
    fn save(&self, student: &Student) -> RepoResult<Student> {
        self.inner.save(student)
    }
    fn delete_by_id(&self, id: StudentId) -> RepoResult<()> {
        self.inner.delete_by_id(id)
    }
    fn count(&self) -> RepoResult<u64> {
        self.inner.count()
    }
}

fn dob(y: i32, m: u32, d: u32) -> NaiveDate {
    NaiveDate::from_ymd_opt(y, m, d).unwrap()
}

fn expected_age(date_of_birth: NaiveDate) -> u32 {
    let today = Local::now().date_naive();
    let mut years = today.year() - date_of_birth.year();
    if (today.month(), today.day()) < (date_of_birth.month(), date_of_birth.day()) {
        years -= 1;
    }
    years as u32
}

fn memory_service() -> StudentService<InMemoryStudentRepository> {
    StudentService::new(InMemoryStudentRepository::new())
}

fn seeded_pair<R: StudentRepository>(service: &StudentService<R>) -> (Student, Student) {
    let abc = service
        .create_student(&Student::new("Abc", "abc@school.com", dob(1997, 7, 10)))
        .unwrap();
    let other = service
        .create_student(&Student::new("Other", "other@school.com", dob(1999, 1, 2)))
        .unwrap();
    (abc, other)
}

#[test]
fn list_students_on_empty_store_is_empty() {
    let service = memory_service();
    assert!(service.list_students().unwrap().is_empty());
    assert!(service.list_student_views().unwrap().is_empty());
}

#[test]
fn get_student_view_computes_age_at_call_time() {
    let service = memory_service();
    for (i, date) in [dob(1995, 10, 1), dob(2000, 2, 29), dob(2004, 1, 1)]
        .into_iter()
        .enumerate()
    {
        service
            .create_student(&Student::new("S", format!("s{i}@school.com"), date))
            .unwrap();
    }

    for student in service.list_students().unwrap() {
        let view = service.get_student_view(student.id.unwrap()).unwrap();
        assert_eq!(view.age, expected_age(student.date_of_birth));
        assert_eq!(student.age(), expected_age(student.date_of_birth));
    }
}

#[test]
fn get_student_missing_id_is_not_found() {
    let service = memory_service();
    let err = service.get_student(1).unwrap_err();
    assert!(matches!(err, StudentServiceError::NotFound(1)));
    assert_eq!(err.to_string(), "student not found: 1");
}

#[test]
fn create_student_with_unique_email_roundtrips() {
    let service = memory_service();
    let candidate = Student::new("Abc Xyz", "abc.xyz@school.com", dob(1997, 7, 10));

    let created = service.create_student(&candidate).unwrap();
    let loaded = service.get_student(created.id.unwrap()).unwrap();
    assert_eq!(loaded.name, candidate.name);
    assert_eq!(loaded.email, candidate.email);
    assert_eq!(loaded.date_of_birth, candidate.date_of_birth);
}

#[test]
fn create_student_with_taken_email_leaves_store_unchanged() {
    let service = memory_service();
    seeded_pair(&service);
    let before = service.repository().count().unwrap();

    let err = service
        .create_student(&Student::new("Copy", "abc@school.com", dob(2001, 1, 1)))
        .unwrap_err();
    assert!(matches!(err, StudentServiceError::DuplicateEmail(ref e) if e == "abc@school.com"));
    assert_eq!(service.repository().count().unwrap(), before);
}

#[test]
fn create_student_rejects_invalid_candidates() {
    let service = memory_service();

    let blank = service
        .create_student(&Student::new("", "x@school.com", dob(2001, 1, 1)))
        .unwrap_err();
    assert!(matches!(
        blank,
        StudentServiceError::Validation(StudentValidationError::BlankName)
    ));

    let with_id = Student::with_id(5, "X", "x@school.com", dob(2001, 1, 1));
    let err = service.create_student(&with_id).unwrap_err();
    assert!(matches!(
        err,
        StudentServiceError::Validation(StudentValidationError::IdAlreadyAssigned(5))
    ));
    assert_eq!(service.repository().count().unwrap(), 0);
}

#[test]
fn delete_missing_id_is_not_found_and_store_unchanged() {
    let service = memory_service();
    seeded_pair(&service);

    let err = service.delete_student(123).unwrap_err();
    assert!(matches!(err, StudentServiceError::NotFound(123)));
    assert_eq!(service.repository().count().unwrap(), 2);
}

#[test]
fn delete_existing_removes_exactly_that_record() {
    let service = memory_service();
    let (abc, other) = seeded_pair(&service);

    service.delete_student(abc.id.unwrap()).unwrap();
    assert!(!service.repository().exists_by_id(abc.id.unwrap()).unwrap());
    assert_eq!(service.list_students().unwrap(), vec![other]);
}

#[test]
fn update_with_absent_values_is_noop() {
    let service = memory_service();
    let (abc, _) = seeded_pair(&service);

    let returned = service.update_student(abc.id.unwrap(), None, None).unwrap();
    assert_eq!(returned, abc);
    assert_eq!(service.get_student(abc.id.unwrap()).unwrap(), abc);
}

#[test]
fn update_with_blank_values_is_noop() {
    let service = memory_service();
    let (abc, _) = seeded_pair(&service);

    service
        .update_student(abc.id.unwrap(), Some(""), Some(""))
        .unwrap();
    service
        .update_student(abc.id.unwrap(), Some("   "), Some("\t"))
        .unwrap();
    assert_eq!(service.get_student(abc.id.unwrap()).unwrap(), abc);
}

#[test]
fn update_with_same_values_is_noop() {
    let service = memory_service();
    let (abc, _) = seeded_pair(&service);

    service
        .update_student(abc.id.unwrap(), Some("Abc"), Some("abc@school.com"))
        .unwrap();
    assert_eq!(service.get_student(abc.id.unwrap()).unwrap(), abc);
}

#[test]
fn update_applies_both_fields_and_keeps_id_and_date_of_birth() {
    let service = memory_service();
    let (abc, _) = seeded_pair(&service);

    let updated = service
        .update_student(abc.id.unwrap(), Some("Abc Xyz"), Some("abc.xyz@school.com"))
        .unwrap();
    assert_eq!(updated.id, abc.id);
    assert_eq!(updated.name, "Abc Xyz");
    assert_eq!(updated.email, "abc.xyz@school.com");
    assert_eq!(updated.date_of_birth, abc.date_of_birth);
    assert_eq!(service.get_student(abc.id.unwrap()).unwrap(), updated);
}

#[test]
fn update_applies_only_supplied_field() {
    let service = memory_service();
    let (abc, _) = seeded_pair(&service);

    let renamed = service
        .update_student(abc.id.unwrap(), Some("Abc X"), None)
        .unwrap();
    assert_eq!(renamed.name, "Abc X");
    assert_eq!(renamed.email, abc.email);

    let moved = service
        .update_student(abc.id.unwrap(), Some(""), Some("abc.x@school.com"))
        .unwrap();
    assert_eq!(moved.name, "Abc X");
    assert_eq!(moved.email, "abc.x@school.com");
}

#[test]
fn update_missing_id_is_not_found() {
    let service = memory_service();
    let err = service
        .update_student(23, Some("Subhas"), Some("subhas.bhat@school.com"))
        .unwrap_err();
    assert!(matches!(err, StudentServiceError::NotFound(23)));
}

#[test]
fn update_to_other_students_email_fails_without_partial_write() {
    let service = memory_service();
    let (abc, other) = seeded_pair(&service);

    let err = service
        .update_student(abc.id.unwrap(), Some("New Name"), Some(other.email.as_str()))
        .unwrap_err();
    assert!(matches!(err, StudentServiceError::DuplicateEmail(_)));

    let after = service.get_student(abc.id.unwrap()).unwrap();
    assert_eq!(after.name, abc.name);
    assert_eq!(after.email, abc.email);
    assert_eq!(service.get_student(other.id.unwrap()).unwrap(), other);
}

#[test]
fn update_atomicity_holds_on_sqlite_store() {
    let conn = open_db_in_memory().unwrap();
    let service = StudentService::new(SqliteStudentRepository::new(&conn));
    let (abc, other) = seeded_pair(&service);

    let err = service
        .update_student(abc.id.unwrap(), Some("New Name"), Some(other.email.as_str()))
        .unwrap_err();
    assert!(matches!(err, StudentServiceError::DuplicateEmail(_)));

    let reader = SqliteStudentRepository::new(&conn);
    assert_eq!(reader.find_by_id(abc.id.unwrap()).unwrap().unwrap(), abc);
}

#[test]
fn independent_services_do_not_share_state() {
    let first = memory_service();
    let second = memory_service();
    first
        .create_student(&Student::new("A", "a@school.com", dob(2000, 1, 1)))
        .unwrap();

    assert!(second.list_students().unwrap().is_empty());
    second
        .create_student(&Student::new("A", "a@school.com", dob(2000, 1, 1)))
        .unwrap();
}

#[test]
fn end_to_end_scenario_on_sqlite_store() {
    let conn = open_db_in_memory().unwrap();
    let service = StudentService::new(SqliteStudentRepository::new(&conn));
    assert!(service.list_students().unwrap().is_empty());

    let abc = service
        .create_student(&Student::new("Abc Xyz", "abc.xyz@school.com", dob(1997, 12, 10)))
        .unwrap();
    assert_eq!(abc.id, Some(1));
    let wuv = service
        .create_student(&Student::new("Wuv Hij", "wuv.hij@school.com", dob(1998, 8, 15)))
        .unwrap();
    assert_eq!(wuv.id, Some(2));
    assert_eq!(service.list_students().unwrap().len(), 2);

    let renamed = service.update_student(1, Some("Abc X"), None).unwrap();
    assert_eq!(renamed.name, "Abc X");
    assert_eq!(renamed.email, "abc.xyz@school.com");

    let err = service
        .update_student(2, None, Some("abc.xyz@school.com"))
        .unwrap_err();
    assert!(matches!(err, StudentServiceError::DuplicateEmail(_)));
    assert_eq!(service.get_student(2).unwrap().email, "wuv.hij@school.com");

    service.delete_student(1).unwrap();
    assert!(matches!(
        service.get_student(1).unwrap_err(),
        StudentServiceError::NotFound(1)
    ));
}

#[test]
fn persisted_representation_excludes_age() {
    let service = memory_service();
    let (abc, _) = seeded_pair(&service);

    let stored = serde_json::to_value(&abc).unwrap();
    let object = stored.as_object().unwrap();
    let mut keys: Vec<&str> = object.keys().map(String::as_str).collect();
    keys.sort_unstable();
    assert_eq!(keys, vec!["date_of_birth", "email", "id", "name"]);
    assert_eq!(object["date_of_birth"], "1997-07-10");

    let view = serde_json::to_value(abc.view()).unwrap();
    assert_eq!(view["age"], expected_age(abc.date_of_birth));
}

#[test]
fn store_level_duplicate_on_create_surfaces_as_duplicate_email() {
    let service = StudentService::new(BlindEmailLookup(InMemoryStudentRepository::new()));
    service
        .create_student(&Student::new("A", "race@school.com", dob(2000, 1, 1)))
        .unwrap();

    let err = service
        .create_student(&Student::new("B", "race@school.com", dob(2001, 1, 1)))
        .unwrap_err();
    assert!(matches!(err, StudentServiceError::DuplicateEmail(ref e) if e == "race@school.com"));
    assert_eq!(service.repository().count().unwrap(), 1);
}

#[test]
fn store_level_duplicate_on_update_surfaces_as_duplicate_email() {
    let service = StudentService::new(BlindEmailLookup(InMemoryStudentRepository::new()));
    let (abc, other) = seeded_pair(&service);

    let err = service
        .update_student(abc.id.unwrap(), Some("New Name"), Some(other.email.as_str()))
        .unwrap_err();
    assert!(matches!(err, StudentServiceError::DuplicateEmail(_)));
    assert_eq!(service.repository().count().unwrap(), 2);
    assert_eq!(service.get_student(abc.id.unwrap()).unwrap(), abc);
}

#[test]
fn record_removed_before_write_surfaces_as_not_found() {
    let inner = InMemoryStudentRepository::new();
    let stale = inner
        .save(&Student::new("Gone", "gone@school.com", dob(2000, 1, 1)))
        .unwrap();
    inner.delete_by_id(stale.id.unwrap()).unwrap();
    let service = StudentService::new(StaleReads { inner, stale });

    let err = service.update_student(1, Some("Back"), None).unwrap_err();
    assert!(matches!(err, StudentServiceError::NotFound(1)));
    assert_eq!(service.repository().count().unwrap(), 0);
}

#[test]
fn failed_writes_log_error_code_without_email() {
    capture_logs();
    let service = StudentService::new(BlindEmailLookup(InMemoryStudentRepository::new()));
    let secret = "secret.person@school.com";
    service
        .create_student(&Student::new("A", secret, dob(2000, 1, 1)))
        .unwrap();
    service
        .create_student(&Student::new("B", secret, dob(2001, 1, 1)))
        .unwrap_err();

    assert!(captured_lines_containing(secret).is_empty());
    assert!(!captured_lines_containing(
        "event=student_create module=service status=error error_code=duplicate_email"
    )
    .is_empty());
}

#[test]
fn non_breaking_space_name_is_a_real_update() {
    let service = memory_service();
    let (abc, _) = seeded_pair(&service);

    let updated = service
        .update_student(abc.id.unwrap(), Some("\u{00A0}"), None)
        .unwrap();
    assert_eq!(updated.name, "\u{00A0}");
    assert_eq!(updated.email, abc.email);
}
