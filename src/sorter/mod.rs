//! Splits a survey sheet into one sheet per category.
//!
//! `run` reads the source rows, discovers the categories in first-seen order,
//! partitions the records and writes `sorted_<name>` next to the input with the
//! projected record in columns A..E and the two derived columns where the job
//! asks for them.

pub mod category;
pub mod concat;
pub mod partition;
pub mod record;

use std::path::{Path, PathBuf};

use log::{debug, info, warn};

use crate::{
    Result,
    config::SortConfig,
    error::SortError,
    reader::XlsxReader,
    workbook::{builder::WorkbookBuilder, cell::CellValue},
};

use self::{
    category::CategorySet,
    concat::{
        CATEGORY_COLUMN, ELEVATION_COLUMN, NUMBER_COLUMN, X_COLUMN, Y_COLUMN, derived_columns,
    },
    partition::SortedSheet,
    record::Record,
};

/// Output path for a sorted copy of `input`: `sorted_<file name>` in the same directory.
pub fn sorted_path(input: &Path) -> PathBuf {
    let file_name = input
        .file_name()
        .map(|n| n.to_string_lossy().into_owned())
        .unwrap_or_default();
    let sorted = format!("sorted_{file_name}");
    match input.parent() {
        Some(dir) if !dir.as_os_str().is_empty() => dir.join(sorted),
        _ => PathBuf::from(sorted),
    }
}

/// What a run produced.
#[derive(Debug, Clone, PartialEq)]
pub struct SortReport {
    pub input: PathBuf,
    pub output: PathBuf,
    pub sheet: String,
    /// Sheet name and row count, in output order.
    pub categories: Vec<(String, usize)>,
}

impl SortReport {
    pub fn total_rows(&self) -> usize {
        self.categories.iter().map(|(_, n)| n).sum()
    }
}

pub struct Sorter {
    config: SortConfig,
    output: PathBuf,
}

impl Sorter {
    /// Checks the job and that its input exists. Nothing is written yet.
    pub fn new(config: SortConfig) -> Result<Self> {
        config.validate()?;
        if !config.input.exists() {
            return Err(SortError::MissingInputFile(config.input.clone()));
        }
        let output = sorted_path(&config.input);
        Ok(Sorter { config, output })
    }

    pub fn run(&self) -> Result<SortReport> {
        info!("Loading unsorted workbook {}", self.config.input.display());
        let (sheet, records) = self.load_records()?;

        let categories = category::discover(&records);
        info!(
            "Categories: {:?} ({} total)",
            categories.keys(),
            categories.len()
        );
        if categories.is_empty() {
            warn!("no categorised rows in sheet '{sheet}'");
        }

        let sheets = self.sort(&records, &categories);
        self.write(&sheets)?;

        info!(
            "Sorted {} rows from {} into {}",
            records.len(),
            self.config.input.display(),
            self.output.display()
        );
        Ok(SortReport {
            input: self.config.input.clone(),
            output: self.output.clone(),
            sheet,
            categories: sheets.iter().map(|s| (s.name.clone(), s.len())).collect(),
        })
    }

    fn load_records(&self) -> Result<(String, Vec<Record>)> {
        let reader = XlsxReader::open(&self.config.input)?;
        let sheet = match &self.config.sheet {
            Some(name) => name.clone(),
            None => reader
                .active_sheet()
                .map(str::to_string)
                .ok_or_else(|| SortError::SheetNotFound("<active>".to_string()))?,
        };
        let rows = reader.read_sheet(&sheet)?;

        let first = self
            .config
            .first_row
            .or_else(|| rows.first().map(|r| r.number))
            .unwrap_or(1);
        let last = self
            .config
            .last_row
            .or_else(|| rows.last().map(|r| r.number))
            .unwrap_or(first);
        debug!("sheet '{sheet}': {} occupied rows, range {first}..={last}", rows.len());

        let records = record::extract_range(&rows, &self.config.columns, first, last)?;
        Ok((sheet, records))
    }

    fn sort(&self, records: &[Record], categories: &CategorySet) -> Vec<SortedSheet> {
        info!("Sorting data");
        let sheets = partition::partition(records, categories.keys());
        for sheet in &sheets {
            debug!(
                "{} (first seen as '{}') -> sheet '{}' ({} rows)",
                sheet.category,
                categories.first_seen(&sheet.category).unwrap_or_default(),
                sheet.name,
                sheet.len()
            );
        }
        sheets
    }

    fn write(&self, sheets: &[SortedSheet]) -> Result<()> {
        info!("Concatenating sorted data ({:?} mode)", self.config.mode);
        let derived = derived_columns(self.config.mode, self.config.bounds);
        let xyz_col = self.config.derived.xyz;
        let full_col = self.config.derived.full;

        let mut wb = WorkbookBuilder::<String>::new(&self.output).build()?;
        for sorted in sheets {
            let sheet = wb.add_sheet(&sorted.name)?;
            for (i, record) in sorted.records.iter().enumerate() {
                let out_row = i as u32 + 1;
                let xyz = derived.xyz(record, out_row);
                let full = derived.full(record, out_row);
                sheet.write_cells(&[
                    (NUMBER_COLUMN, record.number.as_value()),
                    (X_COLUMN, CellValue::num(record.x)),
                    (Y_COLUMN, CellValue::num(record.y)),
                    (ELEVATION_COLUMN, CellValue::num(record.elevation)),
                    (CATEGORY_COLUMN, CellValue::text(&record.category)),
                    (xyz_col, xyz.as_value()),
                    (full_col, full.as_value()),
                ])?;
            }
        }

        if self.output.exists() {
            info!("Replacing previous sorted workbook {}", self.output.display());
        }
        wb.finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{
        column::Column,
        config::{Bounds, ConcatMode, OutputColumns, SourceColumns},
        workbook::cell::Cell,
    };
    use tempfile::tempdir;

    fn sorter_in(dir: &Path) -> Sorter {
        let input = dir.join("pts.xlsx");
        WorkbookBuilder::new(input.clone())
            .set_sheets(vec!["Points"])
            .build()
            .unwrap()
            .finish()
            .unwrap();
        Sorter::new(SortConfig {
            input,
            columns: SourceColumns {
                number: Column::A,
                x: Column::B,
                y: Column::C,
                elevation: Column::D,
                category: Column::E,
            },
            derived: OutputColumns {
                xyz: "G".parse().unwrap(),
                full: "H".parse().unwrap(),
            },
            bounds: Bounds { x: 4.0, y: 2.0 },
            first_row: None,
            last_row: None,
            sheet: None,
            mode: ConcatMode::Literal,
        })
        .unwrap()
    }

    #[test]
    fn test_category_without_rows_gets_empty_sheet() {
        let dir = tempdir().unwrap();
        let sorter = sorter_in(dir.path());
        let records = vec![Record {
            row: 2,
            number: Cell::Number(1.0),
            x: 5.0,
            y: 3.0,
            elevation: 10.0,
            category: "Road".into(),
        }];
        let categories: CategorySet = ["Road", "Kerb"].into_iter().collect();

        let sheets = sorter.sort(&records, &categories);
        sorter.write(&sheets).unwrap();

        let out = XlsxReader::open(dir.path().join("sorted_pts.xlsx")).unwrap();
        assert_eq!(out.sheet_names(), ["ROAD", "KERB"]);
        let road = out.read_sheet("ROAD").unwrap();
        assert_eq!(road.len(), 1);
        assert_eq!(road[0].get("G".parse().unwrap()), &Cell::Text("5,3,10".into()));
        assert!(out.read_sheet("KERB").unwrap().is_empty());
    }

    #[test]
    fn test_sorted_path_keeps_directory() {
        assert_eq!(
            sorted_path(Path::new("data/survey.xlsx")),
            PathBuf::from("data/sorted_survey.xlsx")
        );
        assert_eq!(
            sorted_path(Path::new("survey.xlsx")),
            PathBuf::from("sorted_survey.xlsx")
        );
        assert_eq!(
            sorted_path(Path::new("/tmp/a b/pts.xlsx")),
            PathBuf::from("/tmp/a b/sorted_pts.xlsx")
        );
    }

    #[test]
    fn test_report_total() {
        let report = SortReport {
            input: "a.xlsx".into(),
            output: "sorted_a.xlsx".into(),
            sheet: "Sheet1".into(),
            categories: vec![("ROAD".into(), 3), ("TREE".into(), 0)],
        };
        assert_eq!(report.total_rows(), 3);
    }
}
