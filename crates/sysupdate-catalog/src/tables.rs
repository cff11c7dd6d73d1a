//! redb table definitions for the update catalog.

use redb::TableDefinition;

/// Update records keyed by `(identifier, revision)`, JSON-serialized.
pub const UPDATES: TableDefinition<(&str, u32), &[u8]> = TableDefinition::new("updates");

/// Catalog bookkeeping values (timestamps) keyed by name.
pub const META: TableDefinition<&str, u64> = TableDefinition::new("catalog_meta");

/// Key in [`META`] holding the last successful metadata check.
pub const LAST_CHECK_KEY: &str = "last_check";
