//! Pull-parser over the worksheets of an xlsx package.
//!
//! Only what a tabular import needs is decoded: sheet names and order, the
//! active tab, shared strings and cell values. Styles, merged ranges and
//! anything else in the package are ignored.

use std::collections::HashMap;
use std::fs::File;
use std::io::{BufReader, Cursor, Read};
use std::path::{Path, PathBuf};
use std::sync::Arc;

use log::debug;
use quick_xml::Reader as XmlReader;
use quick_xml::events::Event;
use zip::ZipArchive;

use crate::{
    Result,
    column::{Column, col_ref_to_index, row_ref_to_number},
    error::SortError,
    workbook::cell::Cell,
};

/// One occupied row of a sheet.
#[derive(Debug, Clone, PartialEq)]
pub struct Row {
    /// 1-based row number as stored in the sheet.
    pub number: u32,
    /// Cells from column A onward; gaps are `Cell::Empty`.
    pub cells: Vec<Cell>,
}

impl Row {
    pub fn get(&self, column: Column) -> &Cell {
        static EMPTY: Cell = Cell::Empty;
        self.cells.get(column.index() as usize).unwrap_or(&EMPTY)
    }
}

#[inline]
fn attr_val(attr: &quick_xml::events::attributes::Attribute) -> String {
    let raw = std::str::from_utf8(attr.value.as_ref()).unwrap_or("");
    quick_xml::escape::unescape(raw)
        .unwrap_or_default()
        .into_owned()
}

#[inline]
fn text_val(e: &quick_xml::events::BytesText) -> String {
    let raw = std::str::from_utf8(e.as_ref()).unwrap_or("");
    quick_xml::escape::unescape(raw)
        .unwrap_or_default()
        .into_owned()
}

pub struct XlsxReader {
    path: PathBuf,
    sheet_paths: HashMap<String, String>,
    sheet_order: Vec<String>,
    active_tab: usize,
    shared_strings: Arc<Vec<String>>,
}

impl XlsxReader {
    pub fn open(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let file = File::open(path)?;
        let mut archive = ZipArchive::new(file)?;

        let book = parse_workbook(&mut archive)?;
        let rid_to_path = parse_workbook_rels(&mut archive)?;

        let sheet_paths: HashMap<String, String> = book
            .rid_to_name
            .into_iter()
            .filter_map(|(rid, name)| rid_to_path.get(&rid).map(|p| (name, p.clone())))
            .collect();

        let shared_strings = Arc::new(parse_shared_strings(&mut archive)?);
        debug!(
            "opened {}: sheets {:?}, {} shared strings",
            path.display(),
            book.order,
            shared_strings.len()
        );

        Ok(XlsxReader {
            path: path.to_path_buf(),
            sheet_paths,
            sheet_order: book.order,
            active_tab: book.active_tab,
            shared_strings,
        })
    }

    pub fn sheet_names(&self) -> &[String] {
        &self.sheet_order
    }

    /// The sheet selected when the file was last saved, falling back to the first.
    pub fn active_sheet(&self) -> Option<&str> {
        self.sheet_order
            .get(self.active_tab)
            .or_else(|| self.sheet_order.first())
            .map(String::as_str)
    }

    pub fn stream_rows(&self, sheet_name: &str) -> Result<RowIter> {
        let zip_path = self
            .sheet_paths
            .get(sheet_name)
            .ok_or_else(|| SortError::SheetNotFound(sheet_name.to_string()))?;

        let file = File::open(&self.path)?;
        let mut archive = ZipArchive::new(file)?;
        let xml = slurp_entry(&mut archive, zip_path)?;

        let mut reader = XmlReader::from_reader(Cursor::new(xml));
        reader.config_mut().trim_text(true);

        Ok(RowIter {
            xml: reader,
            shared_strings: Arc::clone(&self.shared_strings),
            state: ParseState::new(),
            buf: Vec::with_capacity(256),
            done: false,
        })
    }

    /// Collects every occupied row of a sheet.
    pub fn read_sheet(&self, sheet_name: &str) -> Result<Vec<Row>> {
        self.stream_rows(sheet_name)?.collect()
    }
}

pub struct RowIter {
    xml: XmlReader<Cursor<Vec<u8>>>,
    shared_strings: Arc<Vec<String>>,
    state: ParseState,
    buf: Vec<u8>,
    done: bool,
}

struct ParseState {
    row: Vec<Cell>,
    row_number: u32,
    col: u32,
    next_col: u32,
    cell_type: CellType,
    in_v: bool,
    in_t: bool,
    in_f: bool,
    value_buf: String,
    formula_buf: String,
    in_row: bool,
}

#[derive(Clone, Copy)]
enum CellType {
    Number,
    SharedStr,
    Inline,
    Bool,
    Str,
    Error,
}

impl ParseState {
    fn new() -> Self {
        ParseState {
            row: Vec::new(),
            row_number: 0,
            col: 0,
            next_col: 0,
            cell_type: CellType::Number,
            in_v: false,
            in_t: false,
            in_f: false,
            value_buf: String::new(),
            formula_buf: String::new(),
            in_row: false,
        }
    }

    fn take_cell(&mut self, shared_strings: &[String]) -> Cell {
        let raw = self.value_buf.trim();
        if raw.is_empty() {
            return if self.formula_buf.is_empty() {
                Cell::Empty
            } else {
                Cell::Formula(std::mem::take(&mut self.formula_buf))
            };
        }
        match self.cell_type {
            CellType::SharedStr => {
                let idx: usize = raw.parse().unwrap_or(usize::MAX);
                match shared_strings.get(idx) {
                    Some(s) if !s.is_empty() => Cell::Text(s.clone()),
                    _ => Cell::Empty,
                }
            }
            CellType::Bool => Cell::Bool(raw == "1"),
            CellType::Inline | CellType::Str => Cell::Text(raw.to_string()),
            CellType::Error => Cell::Error(raw.to_string()),
            CellType::Number => match raw.parse::<f64>() {
                Ok(n) if n.is_finite() => Cell::Number(n),
                _ => Cell::Text(raw.to_string()),
            },
        }
    }
}

impl Iterator for RowIter {
    type Item = Result<Row>;

    fn next(&mut self) -> Option<Self::Item> {
        if self.done {
            return None;
        }

        loop {
            self.buf.clear();

            match self.xml.read_event_into(&mut self.buf) {
                Ok(Event::Start(ref e)) if e.name().as_ref() == b"row" => {
                    let number = e
                        .attributes()
                        .flatten()
                        .find(|a| a.key.as_ref() == b"r")
                        .and_then(|a| attr_val(&a).parse().ok())
                        .unwrap_or(self.state.row_number + 1);
                    self.state.row.clear();
                    self.state.row_number = number;
                    self.state.next_col = 0;
                    self.state.in_row = true;
                }

                Ok(Event::Empty(ref e)) if e.name().as_ref() == b"row" => {
                    self.state.row_number = e
                        .attributes()
                        .flatten()
                        .find(|a| a.key.as_ref() == b"r")
                        .and_then(|a| attr_val(&a).parse().ok())
                        .unwrap_or(self.state.row_number + 1);
                }

                Ok(Event::Start(ref e)) if e.name().as_ref() == b"c" => {
                    let mut col_ref = String::new();
                    let mut cell_type = CellType::Number;

                    for attr in e.attributes().flatten() {
                        match attr.key.as_ref() {
                            b"r" => col_ref = attr_val(&attr),
                            b"t" => {
                                cell_type = match attr_val(&attr).as_str() {
                                    "s" => CellType::SharedStr,
                                    "inlineStr" => CellType::Inline,
                                    "b" => CellType::Bool,
                                    "str" => CellType::Str,
                                    "e" => CellType::Error,
                                    _ => CellType::Number,
                                }
                            }
                            _ => {}
                        }
                    }

                    let col = if col_ref.is_empty() {
                        self.state.next_col
                    } else {
                        if let Some(n) = row_ref_to_number(&col_ref) {
                            self.state.row_number = n;
                        }
                        match col_ref_to_index(&col_ref) {
                            Ok(col) => col,
                            Err(e) => {
                                self.done = true;
                                return Some(Err(e));
                            }
                        }
                    };

                    while self.state.next_col < col {
                        self.state.row.push(Cell::Empty);
                        self.state.next_col += 1;
                    }

                    self.state.col = col;
                    self.state.cell_type = cell_type;
                    self.state.value_buf.clear();
                    self.state.formula_buf.clear();
                    self.state.in_v = false;
                    self.state.in_t = false;
                    self.state.in_f = false;
                }

                Ok(Event::Start(ref e)) => match e.name().as_ref() {
                    b"v" => self.state.in_v = true,
                    b"t" => self.state.in_t = true,
                    b"f" => self.state.in_f = true,
                    _ => {}
                },

                Ok(Event::Text(ref e)) => {
                    if self.state.in_f {
                        self.state.formula_buf.push_str(&text_val(e));
                    } else if self.state.in_v || self.state.in_t {
                        self.state.value_buf.push_str(&text_val(e));
                    }
                }

                Ok(Event::End(ref e)) => match e.name().as_ref() {
                    b"v" => self.state.in_v = false,
                    b"t" => self.state.in_t = false,
                    b"f" => self.state.in_f = false,
                    b"c" => {
                        let cell = self.state.take_cell(&self.shared_strings);
                        self.state.row.push(cell);
                        self.state.next_col = self.state.col + 1;
                    }

                    b"row" => {
                        if self.state.in_row {
                            self.state.in_row = false;
                            while matches!(self.state.row.last(), Some(Cell::Empty)) {
                                self.state.row.pop();
                            }
                            if !self.state.row.is_empty() {
                                return Some(Ok(Row {
                                    number: self.state.row_number,
                                    cells: std::mem::take(&mut self.state.row),
                                }));
                            }
                        }
                    }

                    b"sheetData" => {
                        self.done = true;
                        return None;
                    }

                    _ => {}
                },

                Ok(Event::Eof) => {
                    self.done = true;
                    return None;
                }

                Err(e) => {
                    self.done = true;
                    return Some(Err(e.into()));
                }

                _ => {}
            }
        }
    }
}

struct BookInfo {
    order: Vec<String>,
    rid_to_name: HashMap<String, String>,
    active_tab: usize,
}

fn parse_workbook<R: Read + std::io::Seek>(archive: &mut ZipArchive<R>) -> Result<BookInfo> {
    let bytes = slurp_entry(archive, "xl/workbook.xml")?;
    let mut xml = XmlReader::from_reader(bytes.as_slice());
    xml.config_mut().trim_text(true);

    let mut book = BookInfo {
        order: Vec::new(),
        rid_to_name: HashMap::new(),
        active_tab: 0,
    };
    let mut buf = Vec::new();

    loop {
        match xml.read_event_into(&mut buf)? {
            Event::Empty(ref e) | Event::Start(ref e) if e.name().as_ref() == b"sheet" => {
                let (mut name, mut rid) = (String::new(), String::new());
                for attr in e.attributes().flatten() {
                    match attr.key.as_ref() {
                        b"name" => name = attr_val(&attr),
                        b"r:id" | b"id" => rid = attr_val(&attr),
                        _ => {}
                    }
                }
                if !name.is_empty() && !rid.is_empty() {
                    book.order.push(name.clone());
                    book.rid_to_name.insert(rid, name);
                }
            }
            Event::Empty(ref e) | Event::Start(ref e) if e.name().as_ref() == b"workbookView" => {
                if let Some(tab) = e
                    .attributes()
                    .flatten()
                    .find(|a| a.key.as_ref() == b"activeTab")
                    .and_then(|a| attr_val(&a).parse().ok())
                {
                    book.active_tab = tab;
                }
            }
            Event::Eof => break,
            _ => {}
        }
        buf.clear();
    }
    Ok(book)
}

fn parse_workbook_rels<R: Read + std::io::Seek>(
    archive: &mut ZipArchive<R>,
) -> Result<HashMap<String, String>> {
    let bytes = slurp_entry(archive, "xl/_rels/workbook.xml.rels")?;
    let mut xml = XmlReader::from_reader(bytes.as_slice());
    xml.config_mut().trim_text(true);

    let mut map = HashMap::new();
    let mut buf = Vec::new();

    loop {
        match xml.read_event_into(&mut buf)? {
            Event::Empty(ref e) | Event::Start(ref e) if e.name().as_ref() == b"Relationship" => {
                let (mut id, mut target, mut is_sheet) = (String::new(), String::new(), false);
                for attr in e.attributes().flatten() {
                    match attr.key.as_ref() {
                        b"Id" => id = attr_val(&attr),
                        b"Target" => target = attr_val(&attr),
                        b"Type" => is_sheet = attr_val(&attr).ends_with("/worksheet"),
                        _ => {}
                    }
                }
                if is_sheet && !id.is_empty() {
                    map.insert(id, normalize_path(&target));
                }
            }
            Event::Eof => break,
            _ => {}
        }
        buf.clear();
    }
    Ok(map)
}

fn parse_shared_strings<R: Read + std::io::Seek>(
    archive: &mut ZipArchive<R>,
) -> Result<Vec<String>> {
    let entry = match archive.by_name("xl/sharedStrings.xml") {
        Ok(entry) => entry,
        Err(zip::result::ZipError::FileNotFound) => return Ok(Vec::new()),
        Err(e) => return Err(e.into()),
    };
    let mut xml = XmlReader::from_reader(BufReader::with_capacity(64 * 1024, entry));
    xml.config_mut().trim_text(false);

    let mut strings = Vec::new();
    let mut current = String::new();
    let mut in_t = false;
    // phonetic runs repeat the text in another script
    let mut in_rph = false;
    let mut buf = Vec::new();

    loop {
        match xml.read_event_into(&mut buf)? {
            Event::Start(ref e) => match e.name().as_ref() {
                b"si" => current.clear(),
                b"t" => in_t = true,
                b"rPh" => in_rph = true,
                _ => {}
            },
            Event::End(ref e) => match e.name().as_ref() {
                b"si" => strings.push(std::mem::take(&mut current)),
                b"t" => in_t = false,
                b"rPh" => in_rph = false,
                _ => {}
            },
            Event::Empty(ref e) if e.name().as_ref() == b"si" => strings.push(String::new()),
            Event::Text(ref e) if in_t && !in_rph => current.push_str(&text_val(e)),
            Event::Eof => break,
            _ => {}
        }
        buf.clear();
    }
    Ok(strings)
}

fn slurp_entry<R: Read + std::io::Seek>(
    archive: &mut ZipArchive<R>,
    path: &str,
) -> Result<Vec<u8>> {
    let mut entry = archive.by_name(path)?;
    let mut buf = Vec::with_capacity(entry.size() as usize);
    std::io::copy(&mut entry, &mut buf)?;
    Ok(buf)
}

fn normalize_path(target: &str) -> String {
    let t = target.trim_start_matches('/');
    if t.starts_with("xl/") {
        t.to_string()
    } else {
        format!("xl/{t}")
    }
}
