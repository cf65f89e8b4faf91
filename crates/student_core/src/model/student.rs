//! Student domain model.
//!
//! # Responsibility
//! - Define the persisted student record and its creation-time validation.
//! - Compute the derived `age` attribute on demand.
//!
//! # Invariants
//! - `id` is `None` until the store assigns one and never changes afterwards.
//! - `date_of_birth` is immutable after creation.
//! - `age` is not a field; it is recomputed against a reference date on every
//!   read and therefore never goes stale.

use chrono::{Datelike, Local, NaiveDate};
use serde::{Deserialize, Serialize};
use std::error::Error;
use std::fmt::{Display, Formatter};

/// Store-assigned identifier of a student record.
///
/// Identifiers are monotonic and never reused after deletion.
pub type StudentId = i64;

/// Canonical persisted student record.
///
/// Serializes to exactly the persisted fields: `id`, `name`, `email` and
/// `date_of_birth`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Student {
    /// `None` for an unsaved candidate.
    pub id: Option<StudentId>,
    /// Display name, must not be blank.
    pub name: String,
    /// Alternate natural key, unique across stored students (case-sensitive).
    pub email: String,
    /// Calendar date of birth.
    pub date_of_birth: NaiveDate,
}

/// External read projection of a student with derived attributes filled in.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct StudentView {
    pub id: Option<StudentId>,
    pub name: String,
    pub email: String,
    pub date_of_birth: NaiveDate,
    /// Whole years between `date_of_birth` and the date the view was produced.
    pub age: u32,
}

/// Validation errors for student candidates and persisted rows.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StudentValidationError {
    /// `name` is empty or whitespace only.
    BlankName,
    /// `email` is empty or whitespace only.
    BlankEmail,
    /// A creation candidate already carries an id.
    IdAlreadyAssigned(StudentId),
}

impl Display for StudentValidationError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::BlankName => write!(f, "student name must not be blank"),
            Self::BlankEmail => write!(f, "student email must not be blank"),
            Self::IdAlreadyAssigned(id) => {
                write!(f, "student candidate already has id {id}; ids are assigned by the store")
            }
        }
    }
}

impl Error for StudentValidationError {}

impl Student {
    /// Creates an unsaved candidate without an id.
    pub fn new(name: impl Into<String>, email: impl Into<String>, date_of_birth: NaiveDate) -> Self {
        Self {
            id: None,
            name: name.into(),
            email: email.into(),
            date_of_birth,
        }
    }

    /// Creates a record with a known id.
    ///
    /// Used by repositories when materializing stored rows.
    pub fn with_id(
        id: StudentId,
        name: impl Into<String>,
        email: impl Into<String>,
        date_of_birth: NaiveDate,
    ) -> Self {
        Self {
            id: Some(id),
            ..Self::new(name, email, date_of_birth)
        }
    }

    /// Validates field-level invariants.
    ///
    /// # Errors
    /// - `BlankName` when `name` is blank.
    /// - `BlankEmail` when `email` is blank.
    pub fn validate(&self) -> Result<(), StudentValidationError> {
        if is_blank(&self.name) {
            return Err(StudentValidationError::BlankName);
        }
        if is_blank(&self.email) {
            return Err(StudentValidationError::BlankEmail);
        }
        Ok(())
    }

    /// Whole years elapsed between `date_of_birth` and `today`.
    ///
    /// A birthday counts once its month/day is reached, so a Feb 29 birthday
    /// counts on Mar 1 in non-leap years. Dates of birth after `today` yield 0.
    pub fn age_on(&self, today: NaiveDate) -> u32 {
        let dob = self.date_of_birth;
        if today <= dob {
            return 0;
        }
        let mut years = today.year() - dob.year();
        if (today.month(), today.day()) < (dob.month(), dob.day()) {
            years -= 1;
        }
        u32::try_from(years).unwrap_or(0)
    }

    /// Age against the local current date at call time.
    pub fn age(&self) -> u32 {
        self.age_on(today())
    }

    /// Projects this record into a read view evaluated at `today`.
    pub fn to_view(&self, today: NaiveDate) -> StudentView {
        StudentView {
            id: self.id,
            name: self.name.clone(),
            email: self.email.clone(),
            date_of_birth: self.date_of_birth,
            age: self.age_on(today),
        }
    }

    /// Projects this record into a read view evaluated now.
    pub fn view(&self) -> StudentView {
        self.to_view(today())
    }
}

/// Local calendar date used as the reference for derived attributes.
pub fn today() -> NaiveDate {
    Local::now().date_naive()
}

/// Returns `true` for empty values and values made only of blank characters.
///
/// Non-breaking spaces (U+00A0, U+2007, U+202F) are content, not blanks, so a
/// name made of them is a real value.
pub fn is_blank(value: &str) -> bool {
    value.chars().all(is_blank_char)
}

fn is_blank_char(c: char) -> bool {
    match c {
        '\u{00A0}' | '\u{2007}' | '\u{202F}' => false,
        '\t' | '\n' | '\u{000B}' | '\u{000C}' | '\r' | '\u{001C}'..='\u{001F}' => true,
        ' ' | '\u{1680}' | '\u{2000}'..='\u{200A}' | '\u{2028}' | '\u{2029}' | '\u{205F}'
        | '\u{3000}' => true,
        _ => false,
    }
}
