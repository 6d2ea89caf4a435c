use crate::{
    Result,
    column::Column,
    config::SourceColumns,
    error::SortError,
    reader::Row,
    workbook::cell::Cell,
};

/// One surveyed point projected out of a source row.
#[derive(Debug, Clone, PartialEq)]
pub struct Record {
    /// Source row the point came from.
    pub row: u32,
    pub number: Cell,
    pub x: f64,
    pub y: f64,
    pub elevation: f64,
    /// Category as written in the source, before normalisation.
    pub category: String,
}

impl Record {
    pub fn category_key(&self) -> String {
        normalize_category(&self.category)
    }
}

/// Key a blank category normalises to. It never names a group.
pub const BLANK_CATEGORY: &str = "NONE";

/// Uppercased grouping key of a category value; blank values map to [`BLANK_CATEGORY`].
pub fn normalize_category(raw: &str) -> String {
    let trimmed = raw.trim();
    if trimmed.is_empty() {
        BLANK_CATEGORY.to_string()
    } else {
        trimmed.to_uppercase()
    }
}

pub fn is_blank_category(key: &str) -> bool {
    key == BLANK_CATEGORY
}

fn coordinate(row: &Row, column: Column, field: &'static str) -> Result<f64> {
    let cell = row.get(column);
    cell.as_f64().ok_or_else(|| SortError::TypeMismatch {
        row: row.number,
        column: column.to_string(),
        field,
        found: cell.to_string(),
    })
}

/// Projects the survey columns out of a row.
///
/// Rows with a blank category are returned as `None` without looking at their
/// coordinates; they belong to no sheet. Everything else must carry numeric
/// x, y and elevation values.
pub fn extract(row: &Row, columns: &SourceColumns) -> Result<Option<Record>> {
    let category = row.get(columns.category).to_string();
    if is_blank_category(&normalize_category(&category)) {
        return Ok(None);
    }

    Ok(Some(Record {
        row: row.number,
        number: row.get(columns.number).clone(),
        x: coordinate(row, columns.x, "x")?,
        y: coordinate(row, columns.y, "y")?,
        elevation: coordinate(row, columns.elevation, "elevation")?,
        category,
    }))
}

/// Extracts every record in `first..=last`.
pub fn extract_range(
    rows: &[Row],
    columns: &SourceColumns,
    first: u32,
    last: u32,
) -> Result<Vec<Record>> {
    let mut records = Vec::new();
    for row in rows.iter().filter(|r| (first..=last).contains(&r.number)) {
        if let Some(record) = extract(row, columns)? {
            records.push(record);
        }
    }
    Ok(records)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn columns() -> SourceColumns {
        SourceColumns {
            number: Column::A,
            x: Column::B,
            y: Column::C,
            elevation: Column::D,
            category: Column::E,
        }
    }

    fn row(number: u32, cells: Vec<Cell>) -> Row {
        Row { number, cells }
    }

    #[test]
    fn test_normalize_category() {
        assert_eq!(normalize_category("road"), "ROAD");
        assert_eq!(normalize_category("  Fence "), "FENCE");
        assert_eq!(normalize_category(""), BLANK_CATEGORY);
        assert_eq!(normalize_category("none"), BLANK_CATEGORY);
    }

    #[test]
    fn test_extract_accepts_numeric_text() {
        let r = row(
            3,
            vec![
                Cell::Text("P1".into()),
                Cell::Number(5.0),
                Cell::Text(" 3.25 ".into()),
                Cell::Number(101.5),
                Cell::Text("Road".into()),
            ],
        );
        let record = extract(&r, &columns()).unwrap().unwrap();
        assert_eq!(record.row, 3);
        assert_eq!(record.number, Cell::Text("P1".into()));
        assert_eq!((record.x, record.y, record.elevation), (5.0, 3.25, 101.5));
        assert_eq!(record.category, "Road");
        assert_eq!(record.category_key(), "ROAD");
    }

    #[test]
    fn test_extract_skips_blank_category() {
        let r = row(4, vec![Cell::Number(1.0), Cell::Text("oops".into())]);
        assert_eq!(extract(&r, &columns()).unwrap(), None);
    }

    #[test]
    fn test_extract_rejects_non_numeric() {
        let r = row(
            7,
            vec![
                Cell::Number(1.0),
                Cell::Number(2.0),
                Cell::Text("north".into()),
                Cell::Number(3.0),
                Cell::Text("Tree".into()),
            ],
        );
        match extract(&r, &columns()) {
            Err(SortError::TypeMismatch { row, column, field, found }) => {
                assert_eq!((row, column.as_str(), field, found.as_str()), (7, "C", "y", "north"));
            }
            other => panic!("expected TypeMismatch, got {other:?}"),
        }

        let r = row(
            8,
            vec![
                Cell::Number(1.0),
                Cell::Number(2.0),
                Cell::Number(3.0),
                Cell::Empty,
                Cell::Text("Tree".into()),
            ],
        );
        assert!(matches!(
            extract(&r, &columns()),
            Err(SortError::TypeMismatch { field: "elevation", .. })
        ));
    }

    #[test]
    fn test_extract_rejects_inf_and_nan_text() {
        let r = row(
            1,
            vec![
                Cell::Number(1.0),
                Cell::Text("inf".into()),
                Cell::Text("NaN".into()),
                Cell::Number(3.0),
                Cell::Text("Road".into()),
            ],
        );
        match extract(&r, &columns()) {
            Err(SortError::TypeMismatch { row, column, field, found }) => {
                assert_eq!((row, column.as_str(), field, found.as_str()), (1, "B", "x", "inf"));
            }
            other => panic!("expected TypeMismatch, got {other:?}"),
        }

        let r = row(
            2,
            vec![
                Cell::Number(1.0),
                Cell::Number(2.0),
                Cell::Text("nan".into()),
                Cell::Number(3.0),
                Cell::Text("Road".into()),
            ],
        );
        assert!(matches!(
            extract(&r, &columns()),
            Err(SortError::TypeMismatch { field: "y", .. })
        ));
    }

    #[test]
    fn test_extract_range_bounds() {
        let rows: Vec<Row> = (1..=4)
            .map(|n| {
                row(
                    n,
                    vec![
                        Cell::Number(n as f64),
                        Cell::Number(1.0),
                        Cell::Number(1.0),
                        Cell::Number(1.0),
                        Cell::Text("Kerb".into()),
                    ],
                )
            })
            .collect();
        let records = extract_range(&rows, &columns(), 2, 3).unwrap();
        assert_eq!(records.iter().map(|r| r.row).collect::<Vec<_>>(), vec![2, 3]);
    }
}
