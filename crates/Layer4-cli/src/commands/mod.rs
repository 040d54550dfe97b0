//! Subcommands
//!
//! Each command returns an `Outcome`; `main` maps it to the process exit code.

pub mod commit;
pub mod compose;
pub mod config;
pub mod deslop;

use std::process::ExitCode;

/// How a command ended when it did not fail
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Outcome {
    Done,
    /// No changes to work on
    NothingToDo,
    /// The user declined; the repository is untouched
    Cancelled,
    /// Ctrl-C
    Interrupted,
}

impl Outcome {
    pub fn exit_code(self) -> ExitCode {
        match self {
            Outcome::Done | Outcome::NothingToDo | Outcome::Cancelled => ExitCode::SUCCESS,
            Outcome::Interrupted => {
                eprintln!("Interrupted.");
                ExitCode::from(130)
            }
        }
    }
}
