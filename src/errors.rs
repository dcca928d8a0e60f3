// src/errors.rs
use thiserror::Error;

#[derive(Error, Debug)]
pub enum SetupError {
    #[error("Invalid option '{0}', nothing was changed")]
    InvalidSelection(String),

    #[error("`{program}` exited with {}", describe_exit(.code))]
    CommandFailed {
        program: String,
        code: Option<i32>, // None when killed by a signal
    },

    #[error("Failed to start `{program}`: {source}")]
    CommandSpawn {
        program: String,
        #[source]
        source: std::io::Error,
    },

    #[error("Standard input closed before all answers were given")]
    InputClosed,

    #[error("I/O error: {0}")]
    IoError(#[from] std::io::Error),
}

fn describe_exit(code: &Option<i32>) -> String {
    match code {
        Some(c) => format!("status {}", c),
        None => "no status (terminated by signal)".to_string(),
    }
}

pub type SetupResult<T> = std::result::Result<T, SetupError>;
