use std::io::Write;

use anyhow::{Context, Result};

use crate::models::TableDump;

/// Write a table dump as CSV with a header row.
pub fn write_csv<W: Write>(dump: &TableDump, writer: W) -> Result<()> {
    let mut wtr = csv::Writer::from_writer(writer);
    wtr.write_record(&dump.columns)
        .context("Failed to write CSV header")?;
    for (i, row) in dump.rows.iter().enumerate() {
        wtr.write_record(row)
            .with_context(|| format!("Failed to write CSV row {}", i + 1))?;
    }
    wtr.flush().context("Failed to flush CSV output")?;
    Ok(())
}
