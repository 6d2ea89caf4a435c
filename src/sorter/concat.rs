//! The two derived columns appended to every sorted row.
//!
//! A point whose x and y are both above their bounds keeps its natural
//! `x,y` order; every other point is reported with the axes swapped.

use crate::{
    column::Column,
    config::{Bounds, ConcatMode},
    workbook::cell::CellValue,
};

use super::record::Record;

/// Where the projected record sits on an output row.
pub const NUMBER_COLUMN: Column = Column::A;
pub const X_COLUMN: Column = Column::B;
pub const Y_COLUMN: Column = Column::C;
pub const ELEVATION_COLUMN: Column = Column::D;
pub const CATEGORY_COLUMN: Column = Column::E;

#[derive(Debug, Clone, PartialEq)]
pub enum Derived {
    Text(String),
    Formula(String),
}

impl Derived {
    pub fn as_value(&self) -> CellValue<'_> {
        match self {
            Derived::Text(s) => CellValue::Text(s),
            Derived::Formula(f) => CellValue::Formula(f),
        }
    }
}

/// Produces the derived cells for a record written at `out_row` of its sheet.
pub trait DerivedColumns {
    fn xyz(&self, record: &Record, out_row: u32) -> Derived;
    fn full(&self, record: &Record, out_row: u32) -> Derived;
}

pub fn derived_columns(mode: ConcatMode, bounds: Bounds) -> Box<dyn DerivedColumns> {
    match mode {
        ConcatMode::Literal => Box::new(Literal { bounds }),
        ConcatMode::Formula => Box::new(Formulas { bounds }),
    }
}

/// `x,y,elevation`, or `y,x,elevation` outside the bounds.
pub fn xyz_concat(record: &Record, bounds: &Bounds) -> String {
    let (first, second) = ordered_pair(record, bounds);
    format!("{first},{second},{}", record.elevation)
}

/// `number,x,y,elevation,category`, with the same swap as [`xyz_concat`].
pub fn full_concat(record: &Record, bounds: &Bounds) -> String {
    let (first, second) = ordered_pair(record, bounds);
    format!(
        "{},{first},{second},{},{}",
        record.number, record.elevation, record.category
    )
}

fn ordered_pair(record: &Record, bounds: &Bounds) -> (f64, f64) {
    if bounds.in_bounds(record.x, record.y) {
        (record.x, record.y)
    } else {
        (record.y, record.x)
    }
}

pub struct Literal {
    pub bounds: Bounds,
}

impl DerivedColumns for Literal {
    fn xyz(&self, record: &Record, _out_row: u32) -> Derived {
        Derived::Text(xyz_concat(record, &self.bounds))
    }

    fn full(&self, record: &Record, _out_row: u32) -> Derived {
        Derived::Text(full_concat(record, &self.bounds))
    }
}

/// Emits `IF(AND(..),CONCATENATE(..),CONCATENATE(..))` over the row's own cells.
pub struct Formulas {
    pub bounds: Bounds,
}

impl Formulas {
    fn condition(&self, row: u32) -> String {
        format!(
            "AND({}>{},{}>{})",
            X_COLUMN.cell(row),
            self.bounds.x,
            Y_COLUMN.cell(row),
            self.bounds.y
        )
    }

    fn swap_if(&self, row: u32, natural: &[Column], swapped: &[Column]) -> String {
        format!(
            "IF({},{},{})",
            self.condition(row),
            concatenate(natural, row),
            concatenate(swapped, row)
        )
    }
}

fn concatenate(columns: &[Column], row: u32) -> String {
    let parts: Vec<String> = columns.iter().map(|c| c.cell(row)).collect();
    format!("CONCATENATE({})", parts.join(",\",\","))
}

impl DerivedColumns for Formulas {
    fn xyz(&self, _record: &Record, out_row: u32) -> Derived {
        Derived::Formula(self.swap_if(
            out_row,
            &[X_COLUMN, Y_COLUMN, ELEVATION_COLUMN],
            &[Y_COLUMN, X_COLUMN, ELEVATION_COLUMN],
        ))
    }

    fn full(&self, _record: &Record, out_row: u32) -> Derived {
        Derived::Formula(self.swap_if(
            out_row,
            &[NUMBER_COLUMN, X_COLUMN, Y_COLUMN, ELEVATION_COLUMN, CATEGORY_COLUMN],
            &[NUMBER_COLUMN, Y_COLUMN, X_COLUMN, ELEVATION_COLUMN, CATEGORY_COLUMN],
        ))
    }
}
