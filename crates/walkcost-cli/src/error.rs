use std::io;
use std::path::PathBuf;

use walkcost_core::GridError;
use walkcost_paths::{ConfigError, WalkError};

/// A malformed grid or point file.
#[derive(Debug, thiserror::Error)]
pub enum ParseError {
    #[error(transparent)]
    Io(#[from] io::Error),

    #[error("line {line}: {msg}")]
    Syntax { line: usize, msg: String },

    #[error("missing header field {0}")]
    MissingField(&'static str),

    #[error("expected {expected} cell values, found {found}")]
    ValueCount { expected: usize, found: usize },

    #[error(transparent)]
    Grid(#[from] GridError),
}

impl ParseError {
    pub(crate) fn syntax(line: usize, msg: impl Into<String>) -> Self {
        ParseError::Syntax {
            line,
            msg: msg.into(),
        }
    }
}

#[derive(Debug, thiserror::Error)]
pub enum CliError {
    #[error("cannot open {}", path.display())]
    Open {
        path: PathBuf,
        #[source]
        source: io::Error,
    },

    #[error("cannot parse {}", path.display())]
    Parse {
        path: PathBuf,
        #[source]
        source: ParseError,
    },

    #[error("cannot write {}", path.display())]
    Write {
        path: PathBuf,
        #[source]
        source: io::Error,
    },

    #[error("{layer} grid {} is not aligned with the elevation grid", path.display())]
    Misaligned { layer: &'static str, path: PathBuf },

    #[error("no output grid given")]
    MissingOutput,

    #[error(transparent)]
    Config(#[from] ConfigError),

    #[error(transparent)]
    Walk(#[from] WalkError),
}
