//! Command-line interface for the survey sorter.

use clap::Parser;
use log::{error, info};
use std::path::PathBuf;
use std::time::Instant;

use crate::{
    Result,
    column::Column,
    config::{Bounds, ConcatMode, OutputColumns, SortConfig, SourceColumns},
    error::SortError,
    sorter::{SortReport, Sorter},
};

#[derive(Parser, Debug)]
#[command(name = "survey-sort")]
#[command(about = "Split surveyed points into one sheet per category", version)]
pub struct Cli {
    /// Workbook to sort (overrides `input` from the job file)
    input: Option<PathBuf>,

    /// TOML job file; flags given on the command line take precedence
    #[arg(short, long)]
    config: Option<PathBuf>,

    /// Column letter of the point number
    #[arg(long)]
    number: Option<Column>,

    /// Column letter of x
    #[arg(long)]
    x: Option<Column>,

    /// Column letter of y
    #[arg(long)]
    y: Option<Column>,

    /// Column letter of the elevation
    #[arg(long)]
    elevation: Option<Column>,

    /// Column letter of the category
    #[arg(long)]
    category: Option<Column>,

    /// Output column for `x,y,elevation`
    #[arg(long)]
    xyz_column: Option<Column>,

    /// Output column for `number,x,y,elevation,category`
    #[arg(long)]
    full_column: Option<Column>,

    /// x must be above this for natural axis order
    #[arg(long, allow_negative_numbers = true)]
    x_bound: Option<f64>,

    /// y must be above this for natural axis order
    #[arg(long, allow_negative_numbers = true)]
    y_bound: Option<f64>,

    /// First data row (skip headers)
    #[arg(long)]
    first_row: Option<u32>,

    /// Last data row
    #[arg(long)]
    last_row: Option<u32>,

    /// Sheet to read instead of the active one
    #[arg(long)]
    sheet: Option<String>,

    /// Write the derived columns as spreadsheet formulas
    #[arg(long)]
    formulas: bool,

    /// Increase verbosity
    #[arg(short, long, action = clap::ArgAction::Count)]
    verbose: u8,
}

fn required<T>(flag: Option<T>, from_file: Option<T>, name: &str) -> Result<T> {
    flag.or(from_file)
        .ok_or_else(|| SortError::Config(format!("missing --{name}")))
}

impl Cli {
    /// Merges the command line over the job file, if any.
    pub fn into_config(self) -> Result<SortConfig> {
        let base = match &self.config {
            Some(path) => {
                let cfg = SortConfig::from_toml(path)?;
                info!("Loaded job from: {}", path.display());
                Some(cfg)
            }
            None => None,
        };
        let columns = base.as_ref().map(|c| c.columns);
        let derived = base.as_ref().map(|c| c.derived);
        let bounds = base.as_ref().map(|c| c.bounds);

        let mode = if self.formulas {
            ConcatMode::Formula
        } else {
            base.as_ref().map(|c| c.mode).unwrap_or_default()
        };

        Ok(SortConfig {
            input: required(self.input, base.as_ref().map(|c| c.input.clone()), "input")?,
            columns: SourceColumns {
                number: required(self.number, columns.map(|c| c.number), "number")?,
                x: required(self.x, columns.map(|c| c.x), "x")?,
                y: required(self.y, columns.map(|c| c.y), "y")?,
                elevation: required(self.elevation, columns.map(|c| c.elevation), "elevation")?,
                category: required(self.category, columns.map(|c| c.category), "category")?,
            },
            derived: OutputColumns {
                xyz: required(self.xyz_column, derived.map(|d| d.xyz), "xyz-column")?,
                full: required(self.full_column, derived.map(|d| d.full), "full-column")?,
            },
            bounds: Bounds {
                x: required(self.x_bound, bounds.map(|b| b.x), "x-bound")?,
                y: required(self.y_bound, bounds.map(|b| b.y), "y-bound")?,
            },
            first_row: self.first_row.or(base.as_ref().and_then(|c| c.first_row)),
            last_row: self.last_row.or(base.as_ref().and_then(|c| c.last_row)),
            sheet: self.sheet.or(base.as_ref().and_then(|c| c.sheet.clone())),
            mode,
        })
    }
}

/// Print a summary box
fn print_summary(title: &str, items: &[(&str, String)]) {
    println!();
    println!("╔══════════════════════════════════════════════════════════════╗");
    println!("║ {:<62} ║", title);
    println!("╠══════════════════════════════════════════════════════════════╣");
    for (key, value) in items {
        let display_value = if value.chars().count() > 39 {
            format!("{}...", value.chars().take(36).collect::<String>())
        } else {
            value.clone()
        };
        println!("║ {:<20}: {:<39} ║", key, display_value);
    }
    println!("╚══════════════════════════════════════════════════════════════╝");
    println!();
}

fn report_items(report: &SortReport, elapsed: std::time::Duration) -> Vec<(&'static str, String)> {
    let mut items = vec![
        ("Input", report.input.display().to_string()),
        ("Output", report.output.display().to_string()),
        ("Source sheet", report.sheet.clone()),
        ("Categories", report.categories.len().to_string()),
        ("Rows sorted", report.total_rows().to_string()),
    ];
    for (name, rows) in &report.categories {
        items.push(("  sheet", format!("{name} ({rows} rows)")));
    }
    items.push(("Duration", format!("{:.2?}", elapsed)));
    items
}

pub fn run() {
    let cli = Cli::parse();

    env_logger::Builder::new()
        .filter_level(match cli.verbose {
            0 => log::LevelFilter::Warn,
            1 => log::LevelFilter::Info,
            _ => log::LevelFilter::Debug,
        })
        .format_timestamp_secs()
        .init();

    let start = Instant::now();

    let config = match cli.into_config() {
        Ok(cfg) => cfg,
        Err(e) => {
            error!("{}", e);
            eprintln!("{e}");
            std::process::exit(2);
        }
    };

    let sorter = match Sorter::new(config) {
        Ok(s) => s,
        Err(SortError::MissingInputFile(path)) => {
            println!("File not found!");
            error!("input file not found: {}", path.display());
            std::process::exit(1);
        }
        Err(e) => {
            error!("Invalid job: {}", e);
            eprintln!("{e}");
            std::process::exit(2);
        }
    };

    match sorter.run() {
        Ok(report) => {
            print_summary("Survey Sort Complete", &report_items(&report, start.elapsed()));
        }
        Err(e) => {
            error!("Sort failed: {}", e);
            eprintln!("{e}");
            std::process::exit(1);
        }
    }
}
