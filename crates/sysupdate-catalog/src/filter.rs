//! Named views over the catalog.
//!
//! A [`Filter`] is configuration, not code: a scope (pending, installed or
//! everything), an optional kind restriction and a total ordering. The
//! secondary sort keys make the order fully deterministic so the diff
//! engine sees reproducible views.

use std::cmp::Ordering;
use std::collections::BTreeMap;
use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::error::CatalogError;
use crate::types::{Kind, Record};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Filter {
    /// Every row, history included.
    #[default]
    All,
    /// Highest revision of each not-installed identifier.
    Pending,
    PendingClicks,
    PendingImage,
    Installed,
    InstalledClicks,
}

/// Which rows a filter starts from.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Scope {
    All,
    Pending,
    Installed,
}

impl Filter {
    pub const ALL: [Filter; 6] = [
        Filter::All,
        Filter::Pending,
        Filter::PendingClicks,
        Filter::PendingImage,
        Filter::Installed,
        Filter::InstalledClicks,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            Filter::All => "all",
            Filter::Pending => "pending",
            Filter::PendingClicks => "pending_clicks",
            Filter::PendingImage => "pending_image",
            Filter::Installed => "installed",
            Filter::InstalledClicks => "installed_clicks",
        }
    }

    fn scope(&self) -> Scope {
        match self {
            Filter::All => Scope::All,
            Filter::Pending | Filter::PendingClicks | Filter::PendingImage => Scope::Pending,
            Filter::Installed | Filter::InstalledClicks => Scope::Installed,
        }
    }

    fn kind(&self) -> Option<Kind> {
        match self {
            Filter::PendingClicks | Filter::InstalledClicks => Some(Kind::AppPackage),
            Filter::PendingImage => Some(Kind::Image),
            _ => None,
        }
    }

    /// Evaluate this filter over a full set of rows: predicate, supersede
    /// rule, then sort.
    pub fn apply(&self, rows: impl IntoIterator<Item = Record>) -> Vec<Record> {
        let scoped: Vec<Record> = match self.scope() {
            Scope::All => rows.into_iter().collect(),
            Scope::Installed => rows.into_iter().filter(Record::is_installed).collect(),
            Scope::Pending => supersede(rows.into_iter().filter(|r| !r.is_installed())),
        };
        let mut view: Vec<Record> = match self.kind() {
            Some(kind) => scoped.into_iter().filter(|r| r.kind == kind).collect(),
            None => scoped,
        };
        view.sort_by(|a, b| self.compare(a, b));
        view
    }

    /// Total order of rows within this view.
    pub fn compare(&self, a: &Record, b: &Record) -> Ordering {
        match self.scope() {
            Scope::Installed => b
                .updated_at
                .cmp(&a.updated_at)
                .then_with(|| a.identifier.cmp(&b.identifier))
                .then_with(|| a.revision.cmp(&b.revision)),
            Scope::All | Scope::Pending => a
                .title
                .cmp(&b.title)
                .then_with(|| a.identifier.cmp(&b.identifier))
                .then_with(|| a.revision.cmp(&b.revision)),
        }
    }
}

/// Keep only the highest revision per identifier.
fn supersede(rows: impl Iterator<Item = Record>) -> Vec<Record> {
    let mut latest: BTreeMap<String, Record> = BTreeMap::new();
    for row in rows {
        match latest.get(&row.identifier) {
            Some(current) if current.revision >= row.revision => {}
            _ => {
                latest.insert(row.identifier.clone(), row);
            }
        }
    }
    latest.into_values().collect()
}

impl fmt::Display for Filter {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.pad(self.as_str())
    }
}

impl FromStr for Filter {
    type Err = CatalogError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Filter::ALL
            .into_iter()
            .find(|f| f.as_str() == s)
            .ok_or_else(|| CatalogError::InvalidFilter(s.to_string()))
    }
}
