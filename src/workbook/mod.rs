use std::{
    collections::HashMap,
    io::{Seek, SeekFrom, Write},
    path::PathBuf,
};

use log::debug;
use tempfile::NamedTempFile;
use zip::{ZipWriter, write::SimpleFileOptions};

use crate::{
    Result,
    error::SortError,
    workbook::{cell::CellValue, sheet::SheetWriter},
};
pub mod builder;
pub mod cell;
pub mod sheet;

const RELS_DOT_RELS: &str = concat!(
    r#"<?xml version="1.0" encoding="UTF-8" standalone="yes"?>"#,
    r#"<Relationships xmlns="http://schemas.openxmlformats.org/package/2006/relationships">"#,
    r#"<Relationship Id="rId1" Type="http://schemas.openxmlformats.org/officeDocument/2006/relationships/officeDocument" Target="xl/workbook.xml"/>"#,
    r#"</Relationships>"#,
);

const STYLES_XML: &str = concat!(
    r#"<?xml version="1.0" encoding="UTF-8" standalone="yes"?>"#,
    r#"<styleSheet xmlns="http://schemas.openxmlformats.org/spreadsheetml/2006/main">"#,
    r#"<fonts count="1"><font><sz val="11"/><name val="Calibri"/></font></fonts>"#,
    r#"<fills count="2"><fill><patternFill patternType="none"/></fill><fill><patternFill patternType="gray125"/></fill></fills>"#,
    r#"<borders count="1"><border><left/><right/><top/><bottom/><diagonal/></border></borders>"#,
    r#"<cellStyleXfs count="1"><xf numFmtId="0" fontId="0" fillId="0" borderId="0"/></cellStyleXfs>"#,
    r#"<cellXfs count="1"><xf numFmtId="0" fontId="0" fillId="0" borderId="0" xfId="0"/></cellXfs>"#,
    r#"<cellStyles count="1"><cellStyle name="Normal" xfId="0" builtinId="0"/></cellStyles>"#,
    r#"</styleSheet>"#,
);

fn workbook_xml(order: &[String]) -> String {
    let mut sheets = String::new();
    for (i, name) in order.iter().enumerate() {
        let sheet_id = i + 1;
        let r_id = format!("rId{}", i + 1);
        let escaped_name = xml_escape(name);
        sheets.push_str(&format!(
            r#"<sheet name="{escaped_name}" sheetId="{sheet_id}" r:id="{r_id}"/>"#
        ));
    }

    format!(
        concat!(
            r#"<?xml version="1.0" encoding="UTF-8" standalone="yes"?>"#,
            r#"<workbook xmlns="http://schemas.openxmlformats.org/spreadsheetml/2006/main" "#,
            r#"xmlns:r="http://schemas.openxmlformats.org/officeDocument/2006/relationships">"#,
            r#"<bookViews><workbookView activeTab="0"/></bookViews>"#,
            r#"<sheets>{}</sheets>"#,
            r#"<calcPr fullCalcOnLoad="1"/>"#,
            r#"</workbook>"#,
        ),
        sheets
    )
}

fn workbook_rels_xml(sheet_count: usize) -> String {
    let mut rels = String::new();

    for i in 1..=sheet_count {
        rels.push_str(&format!(
            r#"<Relationship Id="rId{i}" Type="http://schemas.openxmlformats.org/officeDocument/2006/relationships/worksheet" Target="worksheets/sheet{i}.xml"/>"#
        ));
    }

    let styles_id = sheet_count + 1;
    rels.push_str(&format!(
        r#"<Relationship Id="rId{styles_id}" Type="http://schemas.openxmlformats.org/officeDocument/2006/relationships/styles" Target="styles.xml"/>"#
    ));

    format!(
        concat!(
            r#"<?xml version="1.0" encoding="UTF-8" standalone="yes"?>"#,
            r#"<Relationships xmlns="http://schemas.openxmlformats.org/package/2006/relationships">"#,
            r#"{}"#,
            r#"</Relationships>"#,
        ),
        rels
    )
}

fn content_types_xml(sheet_count: usize) -> String {
    let mut overrides = String::new();

    for i in 1..=sheet_count {
        overrides.push_str(&format!(
            r#"<Override PartName="/xl/worksheets/sheet{i}.xml" ContentType="application/vnd.openxmlformats-officedocument.spreadsheetml.worksheet+xml"/>"#
        ));
    }

    format!(
        concat!(
            r#"<?xml version="1.0" encoding="UTF-8" standalone="yes"?>"#,
            r#"<Types xmlns="http://schemas.openxmlformats.org/package/2006/content-types">"#,
            r#"<Default Extension="rels" ContentType="application/vnd.openxmlformats-package.relationships+xml"/>"#,
            r#"<Default Extension="xml" ContentType="application/xml"/>"#,
            r#"<Override PartName="/xl/workbook.xml" ContentType="application/vnd.openxmlformats-officedocument.spreadsheetml.sheet.main+xml"/>"#,
            r#"<Override PartName="/xl/styles.xml" ContentType="application/vnd.openxmlformats-officedocument.spreadsheetml.styles+xml"/>"#,
            r#"{}"#,
            r#"</Types>"#,
        ),
        overrides
    )
}

/// An xlsx workbook being written. Sheets keep the order they were added in.
///
/// Nothing appears at the output path until [`Workbook::finish`] succeeds: the
/// archive is assembled in a temp file next to the target and renamed over it.
pub struct Workbook {
    output_path: PathBuf,
    sheets: HashMap<String, SheetWriter>,
    insertion_order: Vec<String>,
}

impl Workbook {
    pub(crate) fn new_with_builder(path: PathBuf, sheets: Vec<String>) -> Result<Self> {
        let mut wb = Self {
            output_path: path,
            sheets: HashMap::new(),
            insertion_order: vec![],
        };
        sheets.iter().try_for_each(|name| wb.add_sheet(name).map(|_| ()))?;
        Ok(wb)
    }

    pub fn get_sheet(&mut self, name: &str) -> Option<&mut SheetWriter> {
        self.sheets.get_mut(name)
    }

    pub fn add_sheet(&mut self, name: &str) -> Result<&mut SheetWriter> {
        if self.sheets.contains_key(name) {
            return Err(SortError::AlreadyExists(name.to_string()));
        }
        let writer = SheetWriter::new()?;
        self.sheets.insert(name.to_string(), writer);
        self.insertion_order.push(name.to_string());
        self.sheets
            .get_mut(name)
            .ok_or_else(|| SortError::SheetNotFound(name.to_string()))
    }

    pub fn finish(mut self) -> Result<()> {
        // A package without any worksheet does not open.
        if self.insertion_order.is_empty() {
            self.add_sheet("Sheet1")?;
        }

        for name in &self.insertion_order {
            match self.sheets.get_mut(name) {
                Some(s) => s.finalize()?,
                None => return Err(SortError::SheetNotFound(name.clone())),
            }
        }

        let dir = match self.output_path.parent() {
            Some(p) if !p.as_os_str().is_empty() => p.to_path_buf(),
            _ => PathBuf::from("."),
        };
        let staging = NamedTempFile::new_in(&dir)?;
        let mut zip = ZipWriter::new(staging);
        let options =
            SimpleFileOptions::default().compression_method(zip::CompressionMethod::Deflated);

        zip_write_str(
            &mut zip,
            "[Content_Types].xml",
            &content_types_xml(self.insertion_order.len()),
            options,
        )?;
        zip_write_str(&mut zip, "_rels/.rels", RELS_DOT_RELS, options)?;
        zip_write_str(
            &mut zip,
            "xl/workbook.xml",
            &workbook_xml(&self.insertion_order),
            options,
        )?;
        zip_write_str(
            &mut zip,
            "xl/_rels/workbook.xml.rels",
            &workbook_rels_xml(self.insertion_order.len()),
            options,
        )?;
        zip_write_str(&mut zip, "xl/styles.xml", STYLES_XML, options)?;

        for (i, name) in self.insertion_order.iter().enumerate() {
            let sheet = self
                .sheets
                .get_mut(name)
                .ok_or_else(|| SortError::SheetNotFound(name.clone()))?;
            let zip_path = format!("xl/worksheets/sheet{}.xml", i + 1);

            zip.start_file(zip_path, options)?;

            let temp_file = sheet.temp.get_mut();
            temp_file.seek(SeekFrom::Start(0))?;
            std::io::copy(temp_file, &mut zip)?;
            debug!("packed sheet '{name}' ({} rows)", sheet.rows());
        }

        let staging = zip.finish()?;
        if self.output_path.exists() {
            debug!("replacing {}", self.output_path.display());
        }
        staging
            .persist(&self.output_path)
            .map_err(|e| SortError::Io(e.error))?;
        Ok(())
    }
}

pub(crate) fn xml_escape(s: &str) -> String {
    if !s.contains(['&', '<', '>', '"', '\'']) {
        return s.to_string();
    }
    let mut out = String::with_capacity(s.len() + 8);
    for ch in s.chars() {
        match ch {
            '&' => out.push_str("&amp;"),
            '<' => out.push_str("&lt;"),
            '>' => out.push_str("&gt;"),
            '"' => out.push_str("&quot;"),
            '\'' => out.push_str("&apos;"),
            _ => out.push(ch),
        }
    }
    out
}

pub(crate) fn write_cell<W: Write>(w: &mut W, cell_ref: &str, value: &CellValue) -> Result<()> {
    match value {
        CellValue::Blank => {
            write!(w, "<c r=\"{cell_ref}\"/>")?;
        }
        CellValue::Number(n) if n.is_finite() => {
            write!(w, "<c r=\"{cell_ref}\"><v>{n}</v></c>")?;
        }
        // SpreadsheetML has no literal for inf or NaN
        CellValue::Number(n) => {
            write!(
                w,
                "<c r=\"{cell_ref}\" t=\"inlineStr\"><is><t>{n}</t></is></c>"
            )?;
        }
        CellValue::Text(text) => {
            let escaped = xml_escape(text);
            write!(
                w,
                "<c r=\"{cell_ref}\" t=\"inlineStr\"><is><t xml:space=\"preserve\">{escaped}</t></is></c>"
            )?;
        }
        CellValue::Bool(b) => {
            let val = if *b { 1 } else { 0 };
            write!(w, "<c r=\"{cell_ref}\" t=\"b\"><v>{val}</v></c>")?;
        }
        CellValue::Formula(f) => {
            let escaped = xml_escape(f);
            write!(w, "<c r=\"{cell_ref}\"><f>{escaped}</f><v/></c>")?;
        }
    }
    Ok(())
}

pub(crate) fn zip_write_str<W: Write + Seek>(
    zip: &mut ZipWriter<W>,
    path: &str,
    content: &str,
    options: SimpleFileOptions,
) -> Result<()> {
    zip.start_file(path, options)?;
    zip.write_all(content.as_bytes())?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::workbook::builder::WorkbookBuilder;
    use tempfile::tempdir;

    #[test]
    fn test_xml_escape() {
        assert_eq!(xml_escape("plain"), "plain");
        assert_eq!(xml_escape("a<b & \"c\""), "a&lt;b &amp; &quot;c&quot;");
    }

    #[test]
    fn test_write_cell_forms() {
        let mut out = Vec::new();
        write_cell(&mut out, "B2", &CellValue::num(2.5)).unwrap();
        write_cell(&mut out, "C2", &CellValue::text("R&D")).unwrap();
        write_cell(&mut out, "D2", &CellValue::formula("IF(B2>1,\"y\",\"n\")")).unwrap();
        let xml = String::from_utf8(out).unwrap();

        assert!(xml.contains("<c r=\"B2\"><v>2.5</v></c>"));
        assert!(xml.contains("R&amp;D"));
        assert!(xml.contains("<f>IF(B2&gt;1,&quot;y&quot;,&quot;n&quot;)</f>"));
    }

    #[test]
    fn test_write_cell_non_finite_as_text() {
        let mut out = Vec::new();
        write_cell(&mut out, "B1", &CellValue::num(f64::NAN)).unwrap();
        write_cell(&mut out, "C1", &CellValue::num(f64::INFINITY)).unwrap();
        let xml = String::from_utf8(out).unwrap();

        assert!(!xml.contains("<v>"));
        assert!(xml.contains("<c r=\"B1\" t=\"inlineStr\"><is><t>NaN</t></is></c>"));
        assert!(xml.contains("<t>inf</t>"));
    }

    #[test]
    fn test_duplicate_sheet_rejected() {
        let dir = tempdir().unwrap();
        let mut wb = WorkbookBuilder::<&str>::new(dir.path().join("dup.xlsx")).build().unwrap();
        wb.add_sheet("ROAD").unwrap();
        assert!(matches!(wb.add_sheet("ROAD"), Err(SortError::AlreadyExists(_))));
    }

    #[test]
    fn test_finish_replaces_existing_file() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("out.xlsx");
        std::fs::write(&path, b"stale").unwrap();

        let mut wb = WorkbookBuilder::new(path.clone())
            .set_sheets(vec!["Points"])
            .build()
            .unwrap();
        wb.get_sheet("Points")
            .unwrap()
            .write_row(&[CellValue::num(1.0), CellValue::text("a")])
            .unwrap();
        wb.finish().unwrap();

        let bytes = std::fs::read(&path).unwrap();
        assert_eq!(&bytes[..2], b"PK");
        let leftovers = std::fs::read_dir(dir.path()).unwrap().count();
        assert_eq!(leftovers, 1);
    }
}
