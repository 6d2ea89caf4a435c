//! Job configuration: where the survey columns live and how to order coordinates.

use std::path::{Path, PathBuf};

use serde::Deserialize;

use crate::{Result, column::Column, error::SortError};

/// Per-axis thresholds for the coordinate ordering rule.
#[derive(Debug, Clone, Copy, PartialEq, Deserialize)]
pub struct Bounds {
    pub x: f64,
    pub y: f64,
}

impl Bounds {
    /// True when a point keeps its natural `x,y` order.
    pub fn in_bounds(&self, x: f64, y: f64) -> bool {
        x > self.x && y > self.y
    }
}

/// How the two derived columns are materialised.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ConcatMode {
    /// Text computed from the cell values.
    #[default]
    Literal,
    /// `IF`/`CONCATENATE` formulas recomputed by the spreadsheet application.
    Formula,
}

/// Source columns of a survey record.
#[derive(Debug, Clone, Copy, PartialEq, Deserialize)]
pub struct SourceColumns {
    pub number: Column,
    pub x: Column,
    pub y: Column,
    pub elevation: Column,
    pub category: Column,
}

/// Destination columns of the derived values on each output sheet.
#[derive(Debug, Clone, Copy, PartialEq, Deserialize)]
pub struct OutputColumns {
    /// `x,y,elevation` (or swapped)
    pub xyz: Column,
    /// `number,x,y,elevation,category` (or swapped)
    pub full: Column,
}

#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct SortConfig {
    pub input: PathBuf,

    pub columns: SourceColumns,

    pub derived: OutputColumns,

    pub bounds: Bounds,

    /// First data row; defaults to the first occupied row.
    #[serde(default)]
    pub first_row: Option<u32>,

    /// Last data row; defaults to the last occupied row.
    #[serde(default)]
    pub last_row: Option<u32>,

    /// Sheet to read; defaults to the active sheet.
    #[serde(default)]
    pub sheet: Option<String>,

    #[serde(default)]
    pub mode: ConcatMode,
}

impl SortConfig {
    /// Load a job description from a TOML file.
    pub fn from_toml<P: AsRef<Path>>(path: P) -> Result<Self> {
        let content = std::fs::read_to_string(path)?;
        Ok(toml::from_str(&content)?)
    }

    /// Rejects layouts that would overwrite data or address no rows.
    pub fn validate(&self) -> Result<()> {
        let projected = [Column::A, Column::B, Column::C, Column::D, Column::E];
        for (name, col) in [("xyz column", self.derived.xyz), ("full column", self.derived.full)] {
            if projected.contains(&col) {
                return Err(SortError::ColumnConflict {
                    column: col.to_string(),
                    first: name,
                    second: "projected record (A..E)",
                });
            }
        }
        if self.derived.xyz == self.derived.full {
            return Err(SortError::ColumnConflict {
                column: self.derived.xyz.to_string(),
                first: "xyz column",
                second: "full column",
            });
        }

        match (self.first_row, self.last_row) {
            (Some(0), _) | (_, Some(0)) => Err(SortError::InvalidRowRange {
                first: self.first_row.unwrap_or(0),
                last: self.last_row.unwrap_or(0),
            }),
            (Some(first), Some(last)) if first > last => {
                Err(SortError::InvalidRowRange { first, last })
            }
            _ => Ok(()),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample() -> SortConfig {
        toml::from_str(
            r#"
            input = "data/survey.xlsx"
            columns = { number = "A", x = "B", y = "C", elevation = "D", category = "E" }
            derived = { xyz = "G", full = "H" }
            bounds = { x = 4.0, y = 2.0 }
            "#,
        )
        .unwrap()
    }

    #[test]
    fn test_toml_defaults() {
        let config = sample();
        assert_eq!(config.columns.category, Column::E);
        assert_eq!(config.derived.full.to_string(), "H");
        assert_eq!(config.mode, ConcatMode::Literal);
        assert_eq!(config.first_row, None);
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_toml_rejects_bad_column() {
        let parsed: std::result::Result<SortConfig, _> = toml::from_str(
            r#"
            input = "s.xlsx"
            columns = { number = "A", x = "B1", y = "C", elevation = "D", category = "E" }
            derived = { xyz = "G", full = "H" }
            bounds = { x = 0, y = 0 }
            "#,
        );
        assert!(parsed.is_err());
    }

    #[test]
    fn test_formula_mode() {
        let config: SortConfig = toml::from_str(
            r#"
            input = "s.xlsx"
            mode = "formula"
            first_row = 2
            columns = { number = "A", x = "B", y = "C", elevation = "D", category = "E" }
            derived = { xyz = "G", full = "H" }
            bounds = { x = 1.5, y = -3.0 }
            "#,
        )
        .unwrap();
        assert_eq!(config.mode, ConcatMode::Formula);
        assert_eq!(config.first_row, Some(2));
        assert_eq!(config.bounds, Bounds { x: 1.5, y: -3.0 });
    }

    #[test]
    fn test_validate_conflicts() {
        let mut config = sample();
        config.derived.xyz = Column::C;
        assert!(matches!(config.validate(), Err(SortError::ColumnConflict { .. })));

        let mut config = sample();
        config.derived.full = config.derived.xyz;
        assert!(matches!(config.validate(), Err(SortError::ColumnConflict { .. })));

        let mut config = sample();
        config.first_row = Some(9);
        config.last_row = Some(3);
        assert!(matches!(
            config.validate(),
            Err(SortError::InvalidRowRange { first: 9, last: 3 })
        ));
    }

    #[test]
    fn test_bounds_are_strict() {
        let bounds = Bounds { x: 4.0, y: 2.0 };
        assert!(bounds.in_bounds(5.0, 3.0));
        assert!(!bounds.in_bounds(4.0, 3.0));
        assert!(!bounds.in_bounds(5.0, 2.0));
        assert!(!bounds.in_bounds(2.0, 8.0));
    }
}
