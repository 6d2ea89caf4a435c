//! Sorts surveyed point data in an xlsx workbook by category.
//!
//! Each distinct category of the source sheet becomes its own sheet in
//! `sorted_<input name>`, with two comma-joined summary columns per point.
//!
//! ```no_run
//! use survey_sort::{SortConfig, Sorter};
//!
//! let config = SortConfig::from_toml("job.toml").unwrap();
//! let report = Sorter::new(config).unwrap().run().unwrap();
//! println!("{} rows sorted", report.total_rows());
//! ```

pub mod cli;
pub mod column;
pub mod config;
pub mod error;
pub mod reader;
pub mod sorter;
pub mod workbook;

pub use config::{Bounds, ConcatMode, SortConfig};
pub use error::SortError;
pub use sorter::{SortReport, Sorter, sorted_path};

pub type Result<T> = std::result::Result<T, error::SortError>;
