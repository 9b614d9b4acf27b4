use anyhow::{Context, Result};
use std::fs::File;
use std::io::{self, BufWriter};
use std::path::Path;

use recipebox_core::models::ExportTable;
use recipebox_core::service::CatalogService;

/// Write a table as CSV to `output`, or to stdout when no path is given.
pub(crate) fn cmd_export(
    svc: &CatalogService,
    table: ExportTable,
    output: Option<&Path>,
) -> Result<()> {
    match output {
        Some(path) => {
            let file = File::create(path)
                .with_context(|| format!("Failed to create {}", path.display()))?;
            svc.export_csv(table, BufWriter::new(file))?;
            eprintln!("Exported {table} to {}", path.display());
        }
        None => {
            let stdout = io::stdout();
            svc.export_csv(table, stdout.lock())?;
        }
    }
    Ok(())
}
