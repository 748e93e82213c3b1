// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2025 Daniel Negri
//
// This program is free software: you can redistribute it and/or modify
// it under the terms of the GNU Affero General Public License as published by
// the Free Software Foundation, either version 3 of the License, or
// (at your option) any later version.
//
// This program is distributed in the hope that it will be useful,
// but WITHOUT ANY WARRANTY; without even the implied warranty of
// MERCHANTABILITY or FITNESS FOR A PARTICULAR PURPOSE. See the
// GNU Affero General Public License for more details.
//
// You should have received a copy of the GNU Affero General Public License
// along with this program. If not, see <https://www.gnu.org/licenses/>.

use chrono::NaiveDate;
use clap::{Parser, ValueEnum};
use csv::{ReaderBuilder, Trim};
use lending_catalog::{
    Borrower, Catalog, CatalogError, Clock, Config, InMemoryRepository, Repository, Work,
    write_csv,
};
use serde::Deserialize;
use std::fs::File;
use std::io::{BufReader, Read, Write};
use std::path::PathBuf;
use std::process;
use thiserror::Error;
use tracing::{debug, warn};
use tracing_subscriber::layer::SubscriberExt;
use tracing_subscriber::util::SubscriberInitExt;
use tracing_subscriber::{EnvFilter, Layer};

/// Lending Catalog - Replay an activity journal and print a report
///
/// Reads catalog activity (acquisitions, registrations, checkouts, returns,
/// renewals) from a CSV file and writes the selected report to stdout.
#[derive(Parser, Debug)]
#[command(name = "lending-catalog")]
#[command(about = "Replays a lending journal CSV and prints catalog reports", long_about = None)]
struct Args {
    /// Path to CSV journal
    ///
    /// Expected format: op,date,title,author,year,category,copies,borrower,email,days
    /// Example: cargo run -- journal.csv --report overdue --as-of 2025-07-10
    #[arg(value_name = "FILE")]
    journal: PathBuf,

    /// TOML file with the fine rate and default loan term
    #[arg(long, value_name = "FILE")]
    config: Option<PathBuf>,

    /// Report to print after replaying the journal
    #[arg(long, value_enum, default_value_t = ReportKind::Inventory)]
    report: ReportKind,

    /// Borrower name for the history report
    #[arg(long, value_name = "NAME")]
    borrower: Option<String>,

    /// Reference date for the overdue report (defaults to today)
    #[arg(long, value_name = "YYYY-MM-DD")]
    as_of: Option<NaiveDate>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
enum ReportKind {
    Inventory,
    Overdue,
    History,
}

fn main() {
    init_tracing();

    let args = Args::parse();

    let config = match &args.config {
        Some(path) => match Config::load(path) {
            Ok(config) => config,
            Err(e) => {
                eprintln!("Error loading config: {}", e);
                process::exit(1);
            }
        },
        None => Config::default(),
    };

    let catalog = match Catalog::open(InMemoryRepository::new(), config) {
        Ok(catalog) => catalog,
        Err(e) => {
            eprintln!("Error opening catalog: {}", e);
            process::exit(1);
        }
    };

    let file = match File::open(&args.journal) {
        Ok(f) => f,
        Err(e) => {
            eprintln!("Error opening file '{}': {}", args.journal.display(), e);
            process::exit(1);
        }
    };

    if let Err(e) = process_journal(&catalog, BufReader::new(file)) {
        eprintln!("Error processing journal: {}", e);
        process::exit(1);
    }

    if let Err(e) = write_report(&catalog, &args, std::io::stdout()) {
        eprintln!("Error writing report: {}", e);
        process::exit(1);
    }
}

fn init_tracing() {
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new("lending_catalog=info"));
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::fmt::layer()
                .with_writer(std::io::stderr)
                .with_filter(filter),
        )
        .init();
}

/// Raw CSV record matching the journal format.
///
/// Fields: `op, date, title, author, year, category, copies, borrower, email, days`
///
/// Empty cells deserialize as `None`. A cell that is present but does not
/// parse fails the whole row.
#[derive(Debug, Default, Deserialize)]
struct JournalRecord {
    op: String,
    #[serde(default)]
    date: Option<NaiveDate>,
    #[serde(default)]
    title: Option<String>,
    #[serde(default)]
    author: Option<String>,
    #[serde(default)]
    year: Option<i32>,
    #[serde(default)]
    category: Option<String>,
    #[serde(default)]
    copies: Option<u32>,
    #[serde(default)]
    borrower: Option<String>,
    #[serde(default)]
    email: Option<String>,
    #[serde(default)]
    days: Option<i64>,
}

/// Why a journal row was skipped.
#[derive(Debug, Error)]
enum JournalError {
    #[error("missing field '{0}'")]
    Missing(&'static str),

    #[error("unknown operation '{0}'")]
    UnknownOp(String),

    #[error("no open loan of that work for this borrower")]
    NoOpenLoan,

    #[error(transparent)]
    Catalog(#[from] CatalogError),
}

fn required<T>(value: Option<T>, field: &'static str) -> Result<T, JournalError> {
    value.ok_or(JournalError::Missing(field))
}

impl JournalRecord {
    /// Applies this row to the catalog.
    fn apply<R: Repository, C: Clock>(self, catalog: &Catalog<R, C>) -> Result<(), JournalError> {
        let date = self.date.unwrap_or_else(|| catalog.clock().today());

        match self.op.to_lowercase().as_str() {
            "acquire" => {
                let work = Work::new(
                    required(self.title, "title")?,
                    self.author.unwrap_or_default(),
                    required(self.year, "year")?,
                    self.category.unwrap_or_default(),
                    self.copies.unwrap_or(1),
                )?;
                catalog.add_work(work)?;
            }
            "withdraw" => {
                let work = catalog.work_by_title(&required(self.title, "title")?)?;
                catalog.withdraw_unit(work.id())?;
            }
            "register" => {
                let borrower = Borrower::new(
                    required(self.borrower, "borrower")?,
                    required(self.email, "email")?,
                )?;
                catalog.register_borrower(borrower)?;
            }
            "checkout" => {
                let borrower = catalog.borrower_by_name(&required(self.borrower, "borrower")?)?;
                let work = catalog.work_by_title(&required(self.title, "title")?)?;
                let term = self.days.unwrap_or(catalog.config().default_term_days);
                catalog.checkout_on(work.id(), borrower.id(), date, term)?;
            }
            "return" | "renew" => {
                let borrower = catalog.borrower_by_name(&required(self.borrower, "borrower")?)?;
                let work = catalog.work_by_title(&required(self.title, "title")?)?;
                let loan = catalog
                    .open_loans_for(borrower.id())?
                    .into_iter()
                    .find(|loan| loan.work_id() == work.id())
                    .ok_or(JournalError::NoOpenLoan)?;
                if self.op.eq_ignore_ascii_case("return") {
                    catalog.return_loan(loan.id(), date)?;
                } else {
                    catalog.renew(loan.id(), required(self.days, "days")?)?;
                }
            }
            other => return Err(JournalError::UnknownOp(other.to_string())),
        }
        Ok(())
    }
}

/// Replays a journal from a CSV reader.
///
/// Rows are applied in file order. Malformed rows and rows the catalog
/// rejects are logged and skipped; processing continues with the next row.
///
/// # CSV Format
///
/// Expected columns: `op, date, title, author, year, category, copies, borrower, email, days`
/// - `op`: acquire, withdraw, register, checkout, return or renew
/// - `date`: `YYYY-MM-DD`, defaults to today
/// - `copies`: copies acquired, defaults to 1
/// - `days`: loan term for checkout (defaults to the configured term), extension for renew
///
/// # Example
///
/// ```csv
/// op,date,title,author,year,category,copies,borrower,email,days
/// acquire,,Dom Casmurro,Machado de Assis,1899,Novel,3,,,
/// register,,,,,,,Maria,maria@example.com,
/// checkout,2025-07-01,Dom Casmurro,,,,,Maria,,7
/// return,2025-07-10,Dom Casmurro,,,,,Maria,,
/// ```
///
/// # Errors
///
/// Returns a CSV error only if the reader itself fails. Returns the number
/// of rows applied.
fn process_journal<R, C, I>(catalog: &Catalog<R, C>, reader: I) -> Result<usize, csv::Error>
where
    R: Repository,
    C: Clock,
    I: Read,
{
    let mut rdr = ReaderBuilder::new()
        .trim(Trim::All)
        .flexible(true)
        .has_headers(true)
        .from_reader(reader);

    let mut applied = 0;
    for (line, result) in rdr.deserialize::<JournalRecord>().enumerate() {
        let row = line + 2;
        match result {
            Ok(record) => match record.apply(catalog) {
                Ok(()) => applied += 1,
                Err(e) => warn!(row, error = %e, "skipping journal row"),
            },
            Err(e) if e.is_io_error() => return Err(e),
            Err(e) => warn!(row, error = %e, "skipping malformed row"),
        }
    }

    debug!(applied, "journal replayed");
    Ok(applied)
}

#[derive(Debug, Error)]
enum ReportError {
    #[error("the history report needs --borrower")]
    MissingBorrower,

    #[error(transparent)]
    Catalog(#[from] CatalogError),

    #[error(transparent)]
    Csv(#[from] csv::Error),
}

/// Writes the selected report as CSV.
fn write_report<R, C, W>(catalog: &Catalog<R, C>, args: &Args, writer: W) -> Result<(), ReportError>
where
    R: Repository,
    C: Clock,
    W: Write,
{
    match args.report {
        ReportKind::Inventory => write_csv(&catalog.inventory_snapshot()?, writer)?,
        ReportKind::Overdue => {
            let reference = args.as_of.unwrap_or_else(|| catalog.clock().today());
            write_csv(&catalog.overdue_summary(reference)?, writer)?;
        }
        ReportKind::History => {
            let name = args.borrower.as_deref().ok_or(ReportError::MissingBorrower)?;
            let borrower = catalog.borrower_by_name(name)?;
            write_csv(&catalog.borrower_history(borrower.id())?, writer)?;
        }
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use lending_catalog::{FixedClock, StockLevel};
    use std::io::Cursor;

    const HEADER: &str = "op,date,title,author,year,category,copies,borrower,email,days\n";

    fn date(y: i32, m: u32, d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(y, m, d).unwrap()
    }

    fn catalog() -> Catalog<InMemoryRepository, FixedClock> {
        Catalog::with_clock(
            InMemoryRepository::new(),
            Config::default(),
            FixedClock::new(date(2025, 7, 1)),
        )
        .unwrap()
    }

    fn replay(catalog: &Catalog<InMemoryRepository, FixedClock>, body: &str) -> usize {
        let csv = format!("{HEADER}{body}");
        process_journal(catalog, Cursor::new(csv)).unwrap()
    }

    fn args(report: ReportKind) -> Args {
        Args {
            journal: PathBuf::from("journal.csv"),
            config: None,
            report,
            borrower: None,
            as_of: None,
        }
    }

    #[test]
    fn acquire_creates_work() {
        let catalog = catalog();
        let applied = replay(&catalog, "acquire,,Dom Casmurro,Machado de Assis,1899,Novel,3,,,\n");

        assert_eq!(applied, 1);
        let work = catalog.work_by_title("dom casmurro").unwrap();
        assert_eq!(
            catalog.stock_level(work.id()),
            Some(StockLevel { total: 3, available: 3 })
        );
    }

    #[test]
    fn acquire_known_title_adds_copies() {
        let catalog = catalog();
        replay(
            &catalog,
            "acquire,,Dom Casmurro,Machado de Assis,1899,Novel,3,,,\n\
             acquire,,DOM CASMURRO,Machado de Assis,1899,Novel,2,,,\n",
        );

        let work = catalog.work_by_title("Dom Casmurro").unwrap();
        assert_eq!(catalog.stock_level(work.id()).unwrap().total, 5);
        assert_eq!(catalog.inventory_snapshot().unwrap().len(), 1);
    }

    #[test]
    fn checkout_and_return_sequence() {
        let catalog = catalog();
        let applied = replay(
            &catalog,
            "acquire,,Dom Casmurro,Machado de Assis,1899,Novel,3,,,\n\
             register,,,,,,,Maria,maria@example.com,\n\
             checkout,2025-07-01,Dom Casmurro,,,,,Maria,,7\n\
             return,2025-07-10,Dom Casmurro,,,,,maria,,\n",
        );

        assert_eq!(applied, 4);
        let maria = catalog.borrower_by_name("Maria").unwrap();
        let history = catalog.borrower_history(maria.id()).unwrap();
        assert_eq!(history.len(), 1);
        assert_eq!(history[0].return_date, Some(date(2025, 7, 10)));
        let work = catalog.work_by_title("Dom Casmurro").unwrap();
        assert_eq!(catalog.stock_level(work.id()).unwrap().available, 3);
    }

    #[test]
    fn checkout_without_days_uses_default_term() {
        let catalog = catalog();
        replay(
            &catalog,
            "acquire,,Helena,Machado de Assis,1876,Novel,1,,,\n\
             register,,,,,,,Maria,maria@example.com,\n\
             checkout,2025-07-01,Helena,,,,,Maria,,\n",
        );

        let maria = catalog.borrower_by_name("Maria").unwrap();
        let loans = catalog.open_loans_for(maria.id()).unwrap();
        assert_eq!(loans[0].due_date(), date(2025, 7, 8));
    }

    #[test]
    fn renew_extends_open_loan() {
        let catalog = catalog();
        replay(
            &catalog,
            "acquire,,Helena,Machado de Assis,1876,Novel,1,,,\n\
             register,,,,,,,Maria,maria@example.com,\n\
             checkout,2025-07-01,Helena,,,,,Maria,,7\n\
             renew,,Helena,,,,,Maria,,3\n",
        );

        let maria = catalog.borrower_by_name("Maria").unwrap();
        let loans = catalog.open_loans_for(maria.id()).unwrap();
        assert_eq!(loans[0].due_date(), date(2025, 7, 11));
    }

    #[test]
    fn rejected_rows_are_skipped() {
        let catalog = catalog();
        let applied = replay(
            &catalog,
            "acquire,,Helena,Machado de Assis,1876,Novel,1,,,\n\
             register,,,,,,,Maria,maria@example.com,\n\
             register,,,,,,,Joao,not-an-email,\n\
             checkout,2025-07-01,Helena,,,,,Maria,,7\n\
             checkout,2025-07-01,Helena,,,,,Maria,,7\n\
             teleport,,Helena,,,,,,,\n\
             return,2025-07-02,Iracema,,,,,Maria,,\n",
        );

        assert_eq!(applied, 3);
    }

    #[test]
    fn empty_date_uses_clock() {
        let catalog = catalog();
        catalog.clock().set(date(2025, 7, 3));
        replay(
            &catalog,
            "acquire,,Helena,Machado de Assis,1876,Novel,1,,,\n\
             register,,,,,,,Maria,maria@example.com,\n\
             checkout,,Helena,,,,,Maria,,7\n",
        );

        let maria = catalog.borrower_by_name("Maria").unwrap();
        let loans = catalog.open_loans_for(maria.id()).unwrap();
        assert_eq!(loans[0].checkout_date(), date(2025, 7, 3));
    }

    #[test]
    fn unparseable_cells_skip_the_row() {
        let catalog = catalog();
        let applied = replay(
            &catalog,
            "acquire,,Helena,Machado de Assis,1876,Novel,1,,,\n\
             acquire,,Iracema,José de Alencar,1865,Novel,two,,,\n\
             register,,,,,,,Maria,maria@example.com,\n\
             checkout,01/07/2025,Helena,,,,,Maria,,7\n\
             checkout,2025-07-01,Helena,,,,,Maria,,seven\n",
        );

        assert_eq!(applied, 2);
        assert!(catalog.work_by_title("Iracema").is_err());
        let maria = catalog.borrower_by_name("Maria").unwrap();
        assert!(catalog.open_loans_for(maria.id()).unwrap().is_empty());
        let helena = catalog.work_by_title("Helena").unwrap();
        assert!(catalog.is_available(helena.id()));
    }

    #[test]
    fn unparseable_return_date_keeps_loan_open() {
        let catalog = catalog();
        let applied = replay(
            &catalog,
            "acquire,,Helena,Machado de Assis,1876,Novel,1,,,\n\
             register,,,,,,,Maria,maria@example.com,\n\
             checkout,2025-07-01,Helena,,,,,Maria,,7\n\
             return,2025-07-1O,Helena,,,,,Maria,,\n",
        );

        assert_eq!(applied, 3);
        let maria = catalog.borrower_by_name("Maria").unwrap();
        assert_eq!(catalog.open_loans_for(maria.id()).unwrap().len(), 1);
    }

    #[test]
    fn inventory_report_is_sorted_by_title() {
        let catalog = catalog();
        replay(
            &catalog,
            "acquire,,Iracema,José de Alencar,1865,Novel,1,,,\n\
             acquire,,Dom Casmurro,Machado de Assis,1899,Novel,2,,,\n",
        );

        let mut output = Vec::new();
        write_report(&catalog, &args(ReportKind::Inventory), &mut output).unwrap();

        let text = String::from_utf8(output).unwrap();
        let lines: Vec<&str> = text.lines().collect();
        assert_eq!(lines[0], "title,author,year,category,total,available");
        assert!(lines[1].starts_with("Dom Casmurro,"));
        assert!(lines[2].starts_with("Iracema,"));
    }

    #[test]
    fn overdue_report_uses_as_of_date() {
        let catalog = catalog();
        replay(
            &catalog,
            "acquire,,Helena,Machado de Assis,1876,Novel,1,,,\n\
             register,,,,,,,Maria,maria@example.com,\n\
             checkout,2025-07-01,Helena,,,,,Maria,,7\n",
        );

        let mut args = args(ReportKind::Overdue);
        args.as_of = Some(date(2025, 7, 10));
        let mut output = Vec::new();
        write_report(&catalog, &args, &mut output).unwrap();

        let text = String::from_utf8(output).unwrap();
        assert!(text.starts_with("borrower,name,overdue_loans,total_fine\n"));
        assert!(text.contains(",Maria,1,10.00"));
    }

    #[test]
    fn history_report_requires_borrower() {
        let catalog = catalog();
        let result = write_report(&catalog, &args(ReportKind::History), Vec::new());
        assert!(matches!(result, Err(ReportError::MissingBorrower)));
    }
}
