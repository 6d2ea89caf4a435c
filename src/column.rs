//! Spreadsheet column letters (`A`, `Z`, `AA`, ... `XFD`).

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Deserializer};

use crate::error::SortError;

/// Highest column index an xlsx sheet can hold (`XFD`).
pub const MAX_COLUMN: u32 = 16_383;

/// A zero-based column index parsed from its letter form.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct Column(u32);

impl Column {
    pub const A: Column = Column(0);
    pub const B: Column = Column(1);
    pub const C: Column = Column(2);
    pub const D: Column = Column(3);
    pub const E: Column = Column(4);

    pub fn from_index(index: u32) -> Option<Column> {
        (index <= MAX_COLUMN).then_some(Column(index))
    }

    pub fn index(self) -> u32 {
        self.0
    }

    /// Cell reference for this column on a 1-based row, e.g. `C12`.
    pub fn cell(self, row: u32) -> String {
        format!("{}{}", col_to_letters(self.0), row)
    }
}

impl fmt::Display for Column {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&col_to_letters(self.0))
    }
}

impl FromStr for Column {
    type Err = SortError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let letters = s.trim();
        if letters.is_empty()
            || letters.len() > 3
            || !letters.bytes().all(|b| b.is_ascii_alphabetic())
        {
            return Err(SortError::InvalidColumn(s.to_string()));
        }
        let index = letters
            .bytes()
            .fold(0u32, |acc, b| acc * 26 + (b.to_ascii_uppercase() - b'A') as u32 + 1)
            - 1;
        Column::from_index(index).ok_or_else(|| SortError::InvalidColumn(s.to_string()))
    }
}

impl<'de> Deserialize<'de> for Column {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let s = String::deserialize(deserializer)?;
        s.parse().map_err(serde::de::Error::custom)
    }
}

pub(crate) fn col_to_letters(mut col: u32) -> String {
    let mut result = Vec::new();
    loop {
        result.push(b'A' + (col % 26) as u8);
        if col < 26 {
            break;
        }
        col = col / 26 - 1;
    }
    result.reverse();
    result.into_iter().map(char::from).collect()
}

/// Column index of a cell reference such as `AB12`.
pub(crate) fn col_ref_to_index(cell_ref: &str) -> Result<u32, SortError> {
    let letters = cell_ref.trim_end_matches(|c: char| c.is_ascii_digit());
    letters
        .parse::<Column>()
        .map(Column::index)
        .map_err(|_| SortError::InvalidColumn(cell_ref.to_string()))
}

/// Row number of a cell reference such as `AB12`.
pub(crate) fn row_ref_to_number(cell_ref: &str) -> Option<u32> {
    let digits = cell_ref.trim_start_matches(|c: char| c.is_ascii_alphabetic());
    digits.parse().ok()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_letters() {
        assert_eq!("A".parse::<Column>().unwrap().index(), 0);
        assert_eq!("z".parse::<Column>().unwrap().index(), 25);
        assert_eq!("AA".parse::<Column>().unwrap().index(), 26);
        assert_eq!(" ab ".parse::<Column>().unwrap().index(), 27);
        assert_eq!("XFD".parse::<Column>().unwrap().index(), MAX_COLUMN);
    }

    #[test]
    fn test_parse_rejects_garbage() {
        for bad in ["", "A1", "XFE", "ZZZZ", "-"] {
            assert!(
                matches!(bad.parse::<Column>(), Err(SortError::InvalidColumn(_))),
                "{bad:?} should not parse"
            );
        }
    }

    #[test]
    fn test_display_and_cell() {
        assert_eq!(Column::E.to_string(), "E");
        assert_eq!(Column::from_index(701).unwrap().to_string(), "ZZ");
        assert_eq!(Column::from_index(702).unwrap().to_string(), "AAA");
        assert_eq!(Column::C.cell(12), "C12");
    }

    #[test]
    fn test_cell_ref_parts() {
        assert_eq!(col_ref_to_index("AB12").unwrap(), 27);
        assert_eq!(col_ref_to_index("XFD1048576").unwrap(), MAX_COLUMN);
        for bad in ["7", "AAAAAAAA1", "ZZZZZ1", "XFE3", "A$1", "Ä1"] {
            assert!(
                matches!(col_ref_to_index(bad), Err(SortError::InvalidColumn(r)) if r == bad),
                "{bad:?} should be rejected"
            );
        }
        assert_eq!(row_ref_to_number("AB12"), Some(12));
        assert_eq!(row_ref_to_number("AB"), None);
    }
}
