//! Student repository contract and SQLite implementation.
//!
//! # Responsibility
//! - Provide keyed lookup, listing, save and delete over `students` storage.
//! - Keep SQL details inside the persistence boundary.
//!
//! # Invariants
//! - Ids come from `AUTOINCREMENT`, so deleted ids are never handed out again.
//! - The unique index on `students.email` is mapped to `DuplicateEmail`.
//! - Read paths reject invalid persisted rows instead of masking them.

use crate::db::DbError;
use crate::model::student::{Student, StudentId, StudentValidationError};
use chrono::NaiveDate;
use rusqlite::{params, Connection, ErrorCode, OptionalExtension, Row};
use std::error::Error;
use std::fmt::{Display, Formatter};

const STUDENT_SELECT_SQL: &str = "SELECT
    id,
    name,
    email,
    date_of_birth
FROM students";

const DATE_FORMAT: &str = "%Y-%m-%d";

pub type RepoResult<T> = Result<T, RepoError>;

/// Repository error for student persistence and query operations.
#[derive(Debug)]
pub enum RepoError {
    Validation(StudentValidationError),
    Db(DbError),
    /// Overwrite targeted an id with no stored record.
    NotFound(StudentId),
    /// Another record already holds this email.
    DuplicateEmail(String),
    InvalidData(String),
    /// In-process store lock was poisoned by a panicking writer.
    LockPoisoned,
}

impl RepoError {
    /// Stable, metadata-only error code for log events.
    pub fn code(&self) -> &'static str {
        match self {
            Self::Validation(_) => "validation",
            Self::Db(_) => "db",
            Self::NotFound(_) => "not_found",
            Self::DuplicateEmail(_) => "duplicate_email",
            Self::InvalidData(_) => "invalid_data",
            Self::LockPoisoned => "lock_poisoned",
        }
    }
}

impl Display for RepoError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Validation(err) => write!(f, "{err}"),
            Self::Db(err) => write!(f, "{err}"),
            Self::NotFound(id) => write!(f, "student not found: {id}"),
            Self::DuplicateEmail(email) => write!(f, "email already taken: {email}"),
            Self::InvalidData(message) => write!(f, "invalid persisted student data: {message}"),
            Self::LockPoisoned => write!(f, "student store lock poisoned"),
        }
    }
}

impl Error for RepoError {
    fn source(&self) -> Option<&(dyn Error + 'static)> {
        match self {
            Self::Validation(err) => Some(err),
            Self::Db(err) => Some(err),
            _ => None,
        }
    }
}

impl From<StudentValidationError> for RepoError {
    fn from(value: StudentValidationError) -> Self {
        Self::Validation(value)
    }
}

impl From<DbError> for RepoError {
    fn from(value: DbError) -> Self {
        Self::Db(value)
    }
}

impl From<rusqlite::Error> for RepoError {
    fn from(value: rusqlite::Error) -> Self {
        Self::Db(DbError::Sqlite(value))
    }
}

/// Store contract consumed by `StudentService`.
///
/// Implementations own durability and atomic email uniqueness. They do not
/// apply business rules such as partial-update field selection.
pub trait StudentRepository {
    /// All stored students in ascending id (insertion) order.
    fn find_all(&self) -> RepoResult<Vec<Student>>;
    fn find_by_id(&self, id: StudentId) -> RepoResult<Option<Student>>;
    /// Exact, case-sensitive email match.
    fn find_by_email(&self, email: &str) -> RepoResult<Option<Student>>;
    fn exists_by_id(&self, id: StudentId) -> RepoResult<bool>;
    /// Inserts when `student.id` is `None` (assigning an id), otherwise
    /// overwrites the record stored under that id.
    fn save(&self, student: &Student) -> RepoResult<Student>;
    /// Removes the record; absent ids are a no-op.
    fn delete_by_id(&self, id: StudentId) -> RepoResult<()>;
    fn count(&self) -> RepoResult<u64>;
}

/// SQLite-backed student repository.
pub struct SqliteStudentRepository<'conn> {
    conn: &'conn Connection,
}

impl<'conn> SqliteStudentRepository<'conn> {
    pub fn new(conn: &'conn Connection) -> Self {
        Self { conn }
    }

    fn insert(&self, student: &Student) -> RepoResult<Student> {
        self.conn
            .execute(
                "INSERT INTO students (name, email, date_of_birth) VALUES (?1, ?2, ?3);",
                params![
                    student.name.as_str(),
                    student.email.as_str(),
                    date_to_db(student.date_of_birth),
                ],
            )
            .map_err(|err| map_write_error(err, &student.email))?;

        let id = self.conn.last_insert_rowid();
        Ok(Student::with_id(
            id,
            student.name.as_str(),
            student.email.as_str(),
            student.date_of_birth,
        ))
    }

    fn overwrite(&self, id: StudentId, student: &Student) -> RepoResult<Student> {
        let changed = self
            .conn
            .execute(
                "UPDATE students
                 SET
                    name = ?1,
                    email = ?2,
                    date_of_birth = ?3
                 WHERE id = ?4;",
                params![
                    student.name.as_str(),
                    student.email.as_str(),
                    date_to_db(student.date_of_birth),
                    id,
                ],
            )
            .map_err(|err| map_write_error(err, &student.email))?;

        if changed == 0 {
            return Err(RepoError::NotFound(id));
        }

        Ok(student.clone())
    }
}

impl StudentRepository for SqliteStudentRepository<'_> {
    fn find_all(&self) -> RepoResult<Vec<Student>> {
        let mut stmt = self
            .conn
            .prepare(&format!("{STUDENT_SELECT_SQL} ORDER BY id ASC;"))?;
        let mut rows = stmt.query([])?;
        let mut students = Vec::new();

        while let Some(row) = rows.next()? {
            students.push(parse_student_row(row)?);
        }

        Ok(students)
    }

    fn find_by_id(&self, id: StudentId) -> RepoResult<Option<Student>> {
        let mut stmt = self
            .conn
            .prepare(&format!("{STUDENT_SELECT_SQL} WHERE id = ?1;"))?;
        let mut rows = stmt.query([id])?;
        if let Some(row) = rows.next()? {
            return Ok(Some(parse_student_row(row)?));
        }

        Ok(None)
    }

    fn find_by_email(&self, email: &str) -> RepoResult<Option<Student>> {
        let mut stmt = self
            .conn
            .prepare(&format!("{STUDENT_SELECT_SQL} WHERE email = ?1;"))?;
        let mut rows = stmt.query([email])?;
        if let Some(row) = rows.next()? {
            return Ok(Some(parse_student_row(row)?));
        }

        Ok(None)
    }

    fn exists_by_id(&self, id: StudentId) -> RepoResult<bool> {
        let found = self
            .conn
            .query_row("SELECT 1 FROM students WHERE id = ?1;", [id], |row| {
                row.get::<_, i64>(0)
            })
            .optional()?;
        Ok(found.is_some())
    }

    fn save(&self, student: &Student) -> RepoResult<Student> {
        student.validate()?;

        match student.id {
            None => self.insert(student),
            Some(id) => self.overwrite(id, student),
        }
    }

    fn delete_by_id(&self, id: StudentId) -> RepoResult<()> {
        self.conn
            .execute("DELETE FROM students WHERE id = ?1;", [id])?;
        Ok(())
    }

    fn count(&self) -> RepoResult<u64> {
        let count: i64 = self
            .conn
            .query_row("SELECT COUNT(*) FROM students;", [], |row| row.get(0))?;
        u64::try_from(count)
            .map_err(|_| RepoError::InvalidData(format!("negative student count `{count}`")))
    }
}

fn parse_student_row(row: &Row<'_>) -> RepoResult<Student> {
    let dob_text: String = row.get("date_of_birth")?;
    let date_of_birth = parse_date(&dob_text).ok_or_else(|| {
        RepoError::InvalidData(format!(
            "invalid date `{dob_text}` in students.date_of_birth"
        ))
    })?;

    let student = Student::with_id(
        row.get("id")?,
        row.get::<_, String>("name")?,
        row.get::<_, String>("email")?,
        date_of_birth,
    );
    student.validate()?;
    Ok(student)
}

fn map_write_error(err: rusqlite::Error, email: &str) -> RepoError {
    if is_unique_violation(&err) {
        return RepoError::DuplicateEmail(email.to_string());
    }
    err.into()
}

fn is_unique_violation(err: &rusqlite::Error) -> bool {
    match err {
        rusqlite::Error::SqliteFailure(failure, _) => {
            failure.code == ErrorCode::ConstraintViolation
                && failure.extended_code == rusqlite::ffi::SQLITE_CONSTRAINT_UNIQUE
        }
        _ => false,
    }
}

fn date_to_db(date: NaiveDate) -> String {
    date.format(DATE_FORMAT).to_string()
}

fn parse_date(value: &str) -> Option<NaiveDate> {
    NaiveDate::parse_from_str(value, DATE_FORMAT).ok()
}
