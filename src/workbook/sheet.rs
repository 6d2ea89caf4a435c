use std::io::{BufWriter, Write};

use tempfile::NamedTempFile;

use crate::{
    Result,
    column::Column,
    workbook::{cell::CellValue, write_cell},
};

const SHEET_HEAD: &str = concat!(
    r#"<?xml version="1.0" encoding="UTF-8" standalone="yes"?>"#,
    r#"<worksheet xmlns="http://schemas.openxmlformats.org/spreadsheetml/2006/main">"#,
    r#"<sheetViews><sheetView workbookViewId="0"/></sheetViews>"#,
    r#"<sheetFormatPr defaultRowHeight="15"/>"#,
    r#"<sheetData>"#,
);

/// Streams one worksheet body into a temp file until the workbook is finished.
pub struct SheetWriter {
    pub(crate) temp: BufWriter<NamedTempFile>,
    current_row: u32,
}

impl SheetWriter {
    pub(crate) fn new() -> Result<Self> {
        let temp_file = NamedTempFile::new()?;
        let mut writer = BufWriter::new(temp_file);
        writer.write_all(SHEET_HEAD.as_bytes())?;

        Ok(SheetWriter {
            temp: writer,
            current_row: 0,
        })
    }

    /// Number of rows written so far, blank rows included.
    pub fn rows(&self) -> u32 {
        self.current_row
    }

    /// Writes the next row with cells starting at column A.
    pub fn write_row(&mut self, cells: &[CellValue]) -> Result<()> {
        let placed: Vec<(Column, CellValue)> = cells
            .iter()
            .enumerate()
            .filter_map(|(i, cell)| Column::from_index(i as u32).map(|c| (c, cell.clone())))
            .collect();
        self.write_cells(&placed)
    }

    /// Writes the next row with each cell at an explicit column.
    pub fn write_cells(&mut self, cells: &[(Column, CellValue)]) -> Result<()> {
        self.current_row += 1;
        let row = self.current_row;

        if cells.is_empty() {
            return Ok(());
        }

        let mut ordered: Vec<&(Column, CellValue)> = cells.iter().collect();
        ordered.sort_by_key(|(col, _)| *col);

        write!(self.temp, "<row r=\"{row}\">")?;
        for (col, cell) in ordered {
            write_cell(&mut self.temp, &col.cell(row), cell)?;
        }
        writeln!(self.temp, "</row>")?;

        Ok(())
    }

    pub(crate) fn finalize(&mut self) -> Result<()> {
        write!(
            self.temp,
            "</sheetData>\
             <pageMargins left=\"0.75\" right=\"0.75\" top=\"1\" bottom=\"1\" header=\"0.5\" footer=\"0.5\"/>\
             </worksheet>"
        )?;
        self.temp.flush()?;
        Ok(())
    }
}
