use std::io::{self, Stdout, Write};

use anyhow::Result;
use serde::Serialize;
use tabwriter::TabWriter;

use crate::cli::OutputFormat;

/// Print `rows` to stdout. `table` renders the aligned form.
pub fn print_rows<T, F>(rows: &[T], format: OutputFormat, table: F) -> Result<()>
where
    T: Serialize,
    F: FnOnce(&mut TabWriter<Stdout>) -> io::Result<()>,
{
    match format {
        OutputFormat::Table => {
            let mut writer = TabWriter::new(io::stdout());
            table(&mut writer)?;
            writer.flush()?;
        }
        OutputFormat::Json => {
            serde_json::to_writer_pretty(io::stdout(), rows)?;
            println!();
        }
        OutputFormat::Csv => {
            let mut writer = csv::Writer::from_writer(io::stdout());
            for row in rows {
                writer.serialize(row)?;
            }
            writer.flush()?;
        }
    }
    Ok(())
}
