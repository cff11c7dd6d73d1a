//! Subcommand implementations and the shared plumbing they use.

pub mod catalog;

use anyhow::Context as _;
use sysupdate_catalog::{CatalogStore, Record};
use sysupdate_model::{Observer, RowOp, UpdateModel};

use crate::config::SysupdateConfig;

/// Resolved settings for one invocation.
pub struct Context {
    pub config: SysupdateConfig,
    pub json: bool,
}

impl Context {
    pub fn open_store(&self) -> anyhow::Result<CatalogStore> {
        let catalog = &self.config.catalog;
        if catalog.in_memory {
            return Ok(CatalogStore::open_in_memory()?);
        }
        if let Some(parent) = catalog.path.parent() {
            std::fs::create_dir_all(parent)
                .with_context(|| format!("creating {}", parent.display()))?;
        }
        CatalogStore::open(&catalog.path)
            .with_context(|| format!("opening catalog {}", catalog.path.display()))
    }

    /// Open the configured view with a printing observer attached.
    pub fn open_model(&self) -> anyhow::Result<UpdateModel> {
        let store = self.open_store()?;
        let observer = PrintObserver { json: self.json };
        Ok(UpdateModel::new(store, self.config.view.filter, observer)?)
    }
}

/// Writes every row operation to stdout as it is applied.
pub struct PrintObserver {
    json: bool,
}

impl PrintObserver {
    fn emit(&self, op: RowOp) {
        if self.json {
            match serde_json::to_string(&op) {
                Ok(line) => println!("{line}"),
                Err(e) => eprintln!("failed to encode {op:?}: {e}"),
            }
            return;
        }
        match op {
            RowOp::Removed { start, count } => println!("- removed {count} row(s) at {start}"),
            RowOp::Inserted { start, count } => println!("+ inserted {count} row(s) at {start}"),
            RowOp::Moved {
                source_start,
                source_count,
                destination,
            } => println!("~ moved {source_count} row(s) {source_start} -> {destination}"),
            RowOp::Changed { start, count } => println!("* changed {count} row(s) at {start}"),
        }
    }
}

impl Observer for PrintObserver {
    fn rows_removed(&mut self, start: usize, count: usize) {
        self.emit(RowOp::Removed { start, count });
    }

    fn rows_inserted(&mut self, start: usize, count: usize) {
        self.emit(RowOp::Inserted { start, count });
    }

    fn rows_moved(&mut self, source_start: usize, source_count: usize, destination: usize) {
        self.emit(RowOp::Moved {
            source_start,
            source_count,
            destination,
        });
    }

    fn rows_changed(&mut self, start: usize, count: usize) {
        self.emit(RowOp::Changed { start, count });
    }
}

pub fn print_rows(rows: &[Record], json: bool) -> anyhow::Result<()> {
    if json {
        println!("{}", serde_json::to_string_pretty(rows)?);
        return Ok(());
    }
    if rows.is_empty() {
        println!("(no updates)");
        return Ok(());
    }
    for (i, r) in rows.iter().enumerate() {
        let required = if r.is_update_required() { " *" } else { "" };
        println!(
            "{i:>3}  {:<40} {:<12} {:<26} {}{required}",
            r.key().to_string(),
            r.kind,
            r.state,
            r.title
        );
    }
    Ok(())
}
