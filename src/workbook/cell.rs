use std::fmt;

/// Value written into a cell.
#[derive(Debug, Clone, PartialEq)]
pub enum CellValue<'a> {
    /// Excel keeps every number as f64.
    Number(f64),
    /// Written as an inline string, no sharedStrings part.
    Text(&'a str),
    Bool(bool),
    /// Formula body without the leading `=`, e.g. `SUM(A1:A10)`.
    Formula(&'a str),
    Blank,
}

impl<'a> CellValue<'a> {
    pub fn num(v: f64) -> Self {
        CellValue::Number(v)
    }
    pub fn text(v: &'a str) -> Self {
        CellValue::Text(v)
    }
    pub fn bool(v: bool) -> Self {
        CellValue::Bool(v)
    }
    pub fn formula(v: &'a str) -> Self {
        CellValue::Formula(v)
    }
}

/// Value read back out of a sheet.
#[derive(Debug, Clone, PartialEq, Default)]
pub enum Cell {
    #[default]
    Empty,
    Number(f64),
    Text(String),
    Bool(bool),
    Error(String),
    /// A formula with no cached result.
    Formula(String),
}

impl Cell {
    /// Numeric value of the cell. Text is accepted when it parses after trimming.
    /// `inf` and `NaN` are not numbers a sheet can hold.
    pub fn as_f64(&self) -> Option<f64> {
        let n = match self {
            Cell::Number(n) => *n,
            Cell::Text(s) => s.trim().parse().ok()?,
            _ => return None,
        };
        n.is_finite().then_some(n)
    }

    pub fn as_value(&self) -> CellValue<'_> {
        match self {
            Cell::Empty => CellValue::Blank,
            Cell::Number(n) => CellValue::Number(*n),
            Cell::Text(s) | Cell::Error(s) => CellValue::Text(s),
            Cell::Bool(b) => CellValue::Bool(*b),
            Cell::Formula(f) => CellValue::Formula(f),
        }
    }
}

impl fmt::Display for Cell {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Cell::Empty => Ok(()),
            Cell::Number(n) => write!(f, "{n}"),
            Cell::Text(s) | Cell::Error(s) => f.write_str(s),
            Cell::Bool(true) => f.write_str("TRUE"),
            Cell::Bool(false) => f.write_str("FALSE"),
            Cell::Formula(body) => write!(f, "={body}"),
        }
    }
}
