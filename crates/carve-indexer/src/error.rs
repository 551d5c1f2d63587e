//! Class file analysis errors

use std::path::PathBuf;
use thiserror::Error;

pub type Result<T, E = ClassFileError> = std::result::Result<T, E>;

/// Why a single class artifact could not be analyzed.
///
/// These never abort a unit: the builder logs them and skips the artifact.
#[derive(Error, Debug)]
pub enum ClassFileError {
    #[error("not a class file (magic {0:#010x})")]
    BadMagic(u32),

    #[error("malformed class file")]
    Malformed,

    #[error("class file parser panicked on malformed input")]
    ParserPanic,

    #[error("constant pool index {index} is not a valid {expected} entry")]
    BadConstantIndex { index: u16, expected: &'static str },

    #[error("malformed descriptor {0:?}")]
    BadDescriptor(String),

    #[error("malformed signature {0:?}")]
    BadSignature(String),

    #[error("nesting deeper than {limit} levels")]
    NestingTooDeep { limit: usize },

    #[error("failed to read {path}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
}
