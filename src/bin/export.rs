#![cfg(not(tarpaulin_include))]

use chrono::Local;
use log::info;
use std::env;
use std::fs;
use std::process::ExitCode;
use survey::analysis::Dashboard;
use survey::downloader::{export_filename, to_csv, to_xlsx};
use survey::store::Database;
use survey::table::Table;

fn usage(program: &str) {
    eprintln!("Usage: {program} <database> [output.xlsx]");
    eprintln!("       {program} <database> --csv <sheet>");
}

fn find_table<'a>(tables: &'a [Table], name: &str) -> Option<&'a Table> {
    tables.iter().find(|t| t.title.eq_ignore_ascii_case(name))
}

/// Offline export of a survey database
///
/// Writes every table of the whole survey period to one workbook, or prints a
/// single table (by sheet name, e.g. "Saran Masukan") as CSV on stdout.
fn main() -> Result<ExitCode, Box<dyn std::error::Error>> {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("warn")).init();

    let args: Vec<String> = env::args().collect();
    let program = args.first().map(String::as_str).unwrap_or("survey-export");
    let Some(db_path) = args.get(1) else {
        usage(program);
        return Ok(ExitCode::FAILURE);
    };

    let db = Database::open(db_path)?;
    let data = db.load_all()?;
    let tables = Dashboard::build(&data, None, None)
        .map(|d| d.tables())
        .unwrap_or_default();

    match (args.get(2).map(String::as_str), args.get(3)) {
        (Some("--csv"), Some(sheet)) => {
            let Some(table) = find_table(&tables, sheet) else {
                eprintln!("Error: no sheet named {sheet:?}");
                return Ok(ExitCode::FAILURE);
            };
            print!("{}", to_csv(table));
        }
        (Some("--csv"), None) => {
            usage(program);
            return Ok(ExitCode::FAILURE);
        }
        (output, _) => {
            let output = output
                .map(str::to_string)
                .unwrap_or_else(|| export_filename(Local::now().naive_local()));
            fs::write(&output, to_xlsx(&tables)?)?;
            info!("Wrote {} respondents to {output}", data.respondents.len());
            println!("{output}");
        }
    }

    Ok(ExitCode::SUCCESS)
}
