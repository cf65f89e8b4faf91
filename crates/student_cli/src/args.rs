//! Command-line argument definitions.

use chrono::NaiveDate;
use clap::{Parser, Subcommand};
use student_core::StudentId;
use std::path::PathBuf;

/// Manage student records.
#[derive(Parser, Debug)]
#[command(name = "student_cli")]
#[command(version, about, long_about = None)]
pub struct Cli {
    /// JSON config file; environment variables override its values.
    #[arg(long, global = true)]
    pub config: Option<PathBuf>,

    /// SQLite file, overriding config. Without one, records live in memory.
    #[arg(long, global = true)]
    pub db: Option<PathBuf>,

    #[command(subcommand)]
    pub command: Command,
}

#[derive(Subcommand, Debug)]
pub enum Command {
    /// Print all students as JSON
    List,

    /// Print one student as JSON
    Get { id: StudentId },

    /// Create a student
    Create {
        #[arg(long)]
        name: String,
        #[arg(long)]
        email: String,
        /// Date of birth as YYYY-MM-DD
        #[arg(long)]
        dob: NaiveDate,
    },

    /// Update name and/or email; omitted or blank values are left unchanged
    Update {
        id: StudentId,
        #[arg(long)]
        name: Option<String>,
        #[arg(long)]
        email: Option<String>,
    },

    /// Delete a student
    Delete { id: StudentId },

    /// Create the default students when missing
    Seed,
}
