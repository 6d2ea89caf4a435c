use std::path::PathBuf;

use thiserror::Error;
use zip::result::ZipError;

#[derive(Debug, Error)]
pub enum SortError {
    #[error("input file not found: {}", .0.display())]
    MissingInputFile(PathBuf),

    #[error("invalid column reference '{0}'")]
    InvalidColumn(String),

    #[error("column {column} is used for both {first} and {second}")]
    ColumnConflict {
        column: String,
        first: &'static str,
        second: &'static str,
    },

    #[error("invalid row range {first}..={last}")]
    InvalidRowRange { first: u32, last: u32 },

    /// A coordinate cell was empty or held something other than a number.
    #[error("row {row}, column {column}: expected a number for {field}, found '{found}'")]
    TypeMismatch {
        row: u32,
        column: String,
        field: &'static str,
        found: String,
    },

    #[error("sheet '{0}' not found")]
    SheetNotFound(String),

    #[error("sheet '{0}' already exists")]
    AlreadyExists(String),

    #[error("invalid job file: {0}")]
    Config(String),

    #[error(transparent)]
    Io(#[from] std::io::Error),

    #[error("zip error: {0}")]
    Zip(#[from] ZipError),

    #[error("xml error: {0}")]
    Xml(#[from] quick_xml::Error),
}

impl From<toml::de::Error> for SortError {
    fn from(e: toml::de::Error) -> SortError {
        SortError::Config(e.to_string())
    }
}
