use std::collections::{HashMap, HashSet};

use super::record::Record;

/// Longest sheet name a workbook accepts.
const MAX_SHEET_NAME: usize = 31;

/// The records of one category, in source order.
#[derive(Debug, Clone, PartialEq)]
pub struct SortedSheet {
    pub name: String,
    pub category: String,
    pub records: Vec<Record>,
}

impl SortedSheet {
    pub fn len(&self) -> usize {
        self.records.len()
    }

    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }
}

/// Builds one sheet per category key, empty ones included. Single pass over `records`.
pub fn partition(records: &[Record], categories: &[String]) -> Vec<SortedSheet> {
    let mut taken = HashSet::new();
    let mut sheets: Vec<SortedSheet> = categories
        .iter()
        .map(|category| SortedSheet {
            name: unique_sheet_name(category, &mut taken),
            category: category.clone(),
            records: Vec::new(),
        })
        .collect();

    let index: HashMap<&str, usize> = categories
        .iter()
        .enumerate()
        .map(|(i, c)| (c.as_str(), i))
        .collect();
    for record in records {
        if let Some(&i) = index.get(record.category_key().as_str()) {
            sheets[i].records.push(record.clone());
        }
    }
    sheets
}

fn unique_sheet_name(category: &str, taken: &mut HashSet<String>) -> String {
    let base = sheet_name(category);
    let mut name = base.clone();
    let mut n = 2;
    while !taken.insert(name.to_uppercase()) {
        let suffix = format!("~{n}");
        let keep = MAX_SHEET_NAME - suffix.len();
        name = format!("{}{suffix}", base.chars().take(keep).collect::<String>());
        n += 1;
    }
    name
}

/// Valid sheet name for a category: no `[]:*?/\`, at most 31 characters.
pub fn sheet_name(category: &str) -> String {
    let cleaned: String = category
        .chars()
        .map(|c| if "[]:*?/\\".contains(c) { '_' } else { c })
        .take(MAX_SHEET_NAME)
        .collect();
    let cleaned = cleaned.trim_matches('\'').to_string();
    if cleaned.is_empty() {
        "_".to_string()
    } else {
        cleaned
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::workbook::cell::Cell;

    fn record(row: u32, category: &str) -> Record {
        Record {
            row,
            number: Cell::Number(row as f64),
            x: 1.0,
            y: 2.0,
            elevation: 3.0,
            category: category.to_string(),
        }
    }

    #[test]
    fn test_partition_keeps_source_order() {
        let records = vec![
            record(1, "Road"),
            record(2, "tree"),
            record(3, "ROAD"),
            record(4, "Tree"),
            record(5, "road"),
        ];
        let sheets = partition(&records, &["ROAD".to_string(), "TREE".to_string()]);

        assert_eq!(sheets.len(), 2);
        assert_eq!(sheets[0].name, "ROAD");
        assert_eq!(sheets[0].records.iter().map(|r| r.row).collect::<Vec<_>>(), vec![1, 3, 5]);
        assert_eq!(sheets[1].records.iter().map(|r| r.row).collect::<Vec<_>>(), vec![2, 4]);
        assert_eq!(sheets[1].records[0].category, "tree");

        let total: usize = sheets.iter().map(SortedSheet::len).sum();
        assert_eq!(total, records.len());
    }

    #[test]
    fn test_partition_keeps_empty_category() {
        let records = vec![record(1, "Road")];
        let sheets = partition(&records, &["ROAD".to_string(), "WALL".to_string()]);
        assert_eq!(sheets.len(), 2);
        assert_eq!(sheets[1].name, "WALL");
        assert!(sheets[1].is_empty());
    }

    #[test]
    fn test_sheet_names_are_valid_and_unique() {
        assert_eq!(sheet_name("A/B:C"), "A_B_C");
        assert_eq!(sheet_name("'QUOTED'"), "QUOTED");
        assert_eq!(sheet_name(&"X".repeat(40)).len(), 31);

        let long_a = format!("{}A", "Z".repeat(31));
        let long_b = format!("{}B", "Z".repeat(31));
        let sheets = partition(&[], &[long_a, long_b, "A?".to_string(), "A*".to_string()]);
        let names: Vec<_> = sheets.iter().map(|s| s.name.as_str()).collect();
        assert_eq!(names[0], "Z".repeat(31));
        assert_eq!(names[1], format!("{}~2", "Z".repeat(29)));
        assert_eq!(names[2], "A_");
        assert_eq!(names[3], "A_~2");
    }
}
