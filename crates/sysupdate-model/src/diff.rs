//! Minimal edit scripts between two ordered views.
//!
//! Rows are matched by [`RecordKey`] only. The script is ordered as
//! removals, moves, insertions, then changes, and every index is valid
//! against the list as it stands once all earlier operations have been
//! applied.
//!
//! Moves are computed from a longest common subsequence of the surviving
//! keys. When several subsequences are equally long, the one keeping the
//! earliest original rows stationary wins, so the later row is the one
//! that moves.

use std::collections::{HashMap, HashSet};

use serde::Serialize;
use sysupdate_catalog::{Record, RecordKey};

/// A single structural change to an ordered list.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(tag = "op", rename_all = "snake_case")]
pub enum RowOp {
    Removed {
        start: usize,
        count: usize,
    },
    /// `destination` is the index of the first moved row after the move.
    Moved {
        source_start: usize,
        source_count: usize,
        destination: usize,
    },
    Inserted {
        start: usize,
        count: usize,
    },
    Changed {
        start: usize,
        count: usize,
    },
}

/// Ordered operations produced by one refresh.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
#[serde(transparent)]
pub struct EditScript {
    ops: Vec<RowOp>,
}

impl EditScript {
    pub fn ops(&self) -> &[RowOp] {
        &self.ops
    }

    pub fn len(&self) -> usize {
        self.ops.len()
    }

    pub fn is_empty(&self) -> bool {
        self.ops.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = &RowOp> {
        self.ops.iter()
    }

    /// Replay the script on `list`, taking inserted and changed values
    /// from `next` (the view the script was computed towards).
    ///
    /// # Panics
    ///
    /// Panics if an operation indexes past the end of `list` or `next`,
    /// which happens when `list` is not the view the script was computed
    /// from or `next` is not the view it was computed towards.
    pub fn apply<T: Clone>(&self, list: &mut Vec<T>, next: &[T]) {
        for op in &self.ops {
            match *op {
                RowOp::Removed { start, count } => {
                    list.drain(start..start + count);
                }
                RowOp::Moved {
                    source_start,
                    source_count,
                    destination,
                } => {
                    let moved: Vec<T> = list
                        .drain(source_start..source_start + source_count)
                        .collect();
                    list.splice(destination..destination, moved);
                }
                RowOp::Inserted { start, count } => {
                    list.splice(
                        start..start,
                        next[start..start + count].iter().cloned(),
                    );
                }
                RowOp::Changed { start, count } => {
                    list[start..start + count].clone_from_slice(&next[start..start + count]);
                }
            }
        }
    }
}

impl From<Vec<RowOp>> for EditScript {
    fn from(ops: Vec<RowOp>) -> Self {
        Self { ops }
    }
}

impl<'a> IntoIterator for &'a EditScript {
    type Item = &'a RowOp;
    type IntoIter = std::slice::Iter<'a, RowOp>;

    fn into_iter(self) -> Self::IntoIter {
        self.ops.iter()
    }
}

/// Compute the edit script turning `previous` into `next`.
///
/// Stationary rows whose values differ are reported as one `Changed`
/// operation each, at their index in `next`. Rows that move are not also
/// reported as changed.
pub fn diff(previous: &[Record], next: &[Record]) -> EditScript {
    let old_keys: Vec<RecordKey> = previous.iter().map(Record::key).collect();
    let new_keys: Vec<RecordKey> = next.iter().map(Record::key).collect();
    let old_index: HashMap<&RecordKey, usize> =
        old_keys.iter().enumerate().map(|(i, k)| (k, i)).collect();
    let new_index: HashMap<&RecordKey, usize> =
        new_keys.iter().enumerate().map(|(i, k)| (k, i)).collect();

    let mut ops = Vec::new();

    // Removals, front to back; each start accounts for earlier blocks.
    let mut removed = 0;
    for (start, count) in blocks(&old_keys, |k| !new_index.contains_key(k)) {
        ops.push(RowOp::Removed {
            start: start - removed,
            count,
        });
        removed += count;
    }

    // Survivors in their old order, and the order they must end up in.
    let mut current: Vec<&RecordKey> = old_keys
        .iter()
        .filter(|k| new_index.contains_key(k))
        .collect();
    let target: Vec<&RecordKey> = new_keys
        .iter()
        .filter(|k| old_index.contains_key(k))
        .collect();
    let target_pos: HashMap<&RecordKey, usize> =
        target.iter().enumerate().map(|(i, k)| (*k, i)).collect();
    let positions: Vec<usize> = current.iter().map(|k| target_pos[k]).collect();
    let stationary: HashSet<&RecordKey> = stationary_mask(&positions)
        .into_iter()
        .zip(&current)
        .filter_map(|(keep, k)| keep.then_some(*k))
        .collect();

    // Each moved row is placed right after its predecessor in the target
    // order. Processing in target order keeps earlier placements intact.
    for (t, key) in target.iter().copied().enumerate() {
        if stationary.contains(key) {
            continue;
        }
        let Some(source) = current.iter().position(|k| *k == key) else {
            continue;
        };
        current.remove(source);
        let destination = match t {
            0 => 0,
            _ => current
                .iter()
                .position(|k| *k == target[t - 1])
                .map_or(0, |anchor| anchor + 1),
        };
        current.insert(destination, key);
        if source != destination {
            ops.push(RowOp::Moved {
                source_start: source,
                source_count: 1,
                destination,
            });
        }
    }

    // Insertions, front to back; the prefix already matches `next`.
    for (start, count) in blocks(&new_keys, |k| !old_index.contains_key(k)) {
        ops.push(RowOp::Inserted { start, count });
    }

    for (i, key) in new_keys.iter().enumerate() {
        if !stationary.contains(key) {
            continue;
        }
        if let Some(&old) = old_index.get(key) {
            if previous[old] != next[i] {
                ops.push(RowOp::Changed { start: i, count: 1 });
            }
        }
    }

    EditScript { ops }
}

/// Maximal runs of consecutive items matching `pred`, as `(start, count)`.
fn blocks<T>(items: &[T], pred: impl Fn(&T) -> bool) -> Vec<(usize, usize)> {
    let mut runs = Vec::new();
    let mut i = 0;
    while i < items.len() {
        if !pred(&items[i]) {
            i += 1;
            continue;
        }
        let start = i;
        while i < items.len() && pred(&items[i]) {
            i += 1;
        }
        runs.push((start, i - start));
    }
    runs
}

/// Mark a longest increasing subsequence of `positions`, preferring the
/// lexicographically smallest set of indices.
fn stationary_mask(positions: &[usize]) -> Vec<bool> {
    let n = positions.len();
    // run[i]: longest increasing subsequence starting at i.
    let mut run = vec![1usize; n];
    for i in (0..n).rev() {
        for k in i + 1..n {
            if positions[k] > positions[i] {
                run[i] = run[i].max(run[k] + 1);
            }
        }
    }

    let mut mask = vec![false; n];
    let mut need = run.iter().copied().max().unwrap_or(0);
    let mut last: Option<usize> = None;
    for i in 0..n {
        if need == 0 {
            break;
        }
        if run[i] == need && last.is_none_or(|l| positions[i] > l) {
            mask[i] = true;
            need -= 1;
            last = Some(positions[i]);
        }
    }
    mask
}
