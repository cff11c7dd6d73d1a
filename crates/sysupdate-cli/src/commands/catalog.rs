use std::path::Path;

use anyhow::Context as _;
use serde::Deserialize;
use sysupdate_catalog::{Record, RecordKey, now_secs};
use tracing::info;

use super::{Context, print_rows};

/// Accepted shapes of an `add` input file.
#[derive(Deserialize)]
#[serde(untagged)]
enum RecordInput {
    Many(Vec<Record>),
    One(Record),
}

impl RecordInput {
    fn into_records(self) -> Vec<Record> {
        match self {
            RecordInput::Many(records) => records,
            RecordInput::One(record) => vec![record],
        }
    }
}

pub fn list(ctx: &Context) -> anyhow::Result<()> {
    let model = ctx.open_model()?;
    if !ctx.json {
        let last_check = model.store().last_check()?;
        match last_check {
            Some(at) => println!("view: {} (last check at {at})", model.filter()),
            None => println!("view: {}", model.filter()),
        }
    }
    print_rows(&model.rows(), ctx.json)
}

pub fn add(ctx: &Context, file: &Path) -> anyhow::Result<()> {
    let content =
        std::fs::read_to_string(file).with_context(|| format!("reading {}", file.display()))?;
    let input: RecordInput = serde_json::from_str(&content)
        .with_context(|| format!("parsing records from {}", file.display()))?;

    let model = ctx.open_model()?;
    let mut changed = 0;
    for record in input.into_records() {
        if model.add(&record)? {
            changed += 1;
        }
    }
    model.store().set_last_check(now_secs())?;
    info!(changed, "records added");
    print_rows(&model.rows(), ctx.json)
}

pub fn remove(ctx: &Context, identifier: &str, revision: u32) -> anyhow::Result<()> {
    let model = ctx.open_model()?;
    let key = RecordKey::new(identifier, revision);
    if !model.remove(&key)? {
        info!(%key, "no such record");
    }
    print_rows(&model.rows(), ctx.json)
}

pub fn image(
    ctx: &Context,
    channel: &str,
    version: &str,
    size: u64,
    automatic: bool,
) -> anyhow::Result<()> {
    let model = ctx.open_model()?;
    model.set_image_update(channel, version, size, i32::from(automatic))?;
    print_rows(&model.rows(), ctx.json)
}

pub fn installed(ctx: &Context, identifier: &str, revision: u32) -> anyhow::Result<()> {
    let model = ctx.open_model()?;
    let key = RecordKey::new(identifier, revision);
    if model.store().mark_installed(&key)? {
        model.refresh()?;
    } else {
        info!(%key, "nothing to mark installed");
    }
    print_rows(&model.rows(), ctx.json)
}

pub fn prune(ctx: &Context, older_than: u64) -> anyhow::Result<()> {
    let model = ctx.open_model()?;
    let before = now_secs().saturating_sub(older_than);
    let pruned = model.store().prune_installed(before)?;
    if pruned > 0 {
        model.refresh()?;
    }
    info!(pruned, before, "installed records pruned");
    print_rows(&model.rows(), ctx.json)
}
