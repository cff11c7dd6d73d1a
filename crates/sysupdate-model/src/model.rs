//! UpdateModel keeps one filtered view of the catalog in sync.
//!
//! The model owns only a snapshot of the rows it last reported; the
//! catalog stays authoritative. A refresh queries one snapshot, diffs it
//! against the retained view, notifies the observer and swaps the view,
//! all while holding the view lock so two refreshes never interleave.

use std::sync::{Mutex, MutexGuard, PoisonError};

use sysupdate_catalog::{CatalogStore, Filter, Record, RecordKey};
use tracing::{debug, warn};

use crate::diff::{EditScript, diff};
use crate::error::{ModelError, ModelResult};
use crate::observer::Observer;

struct View {
    filter: Filter,
    rows: Vec<Record>,
    observer: Box<dyn Observer>,
}

/// Reconciling view over a [`CatalogStore`].
pub struct UpdateModel {
    store: CatalogStore,
    view: Mutex<View>,
}

impl UpdateModel {
    /// Create a model on `filter`. The initial view is loaded without
    /// notifying the observer.
    pub fn new(
        store: CatalogStore,
        filter: Filter,
        observer: impl Observer + 'static,
    ) -> ModelResult<Self> {
        let rows = store.query(filter)?;
        debug!(%filter, rows = rows.len(), "update model created");
        Ok(Self {
            store,
            view: Mutex::new(View {
                filter,
                rows,
                observer: Box::new(observer),
            }),
        })
    }

    pub fn store(&self) -> &CatalogStore {
        &self.store
    }

    pub fn filter(&self) -> Filter {
        self.lock().filter
    }

    /// Number of rows in the current view.
    pub fn count(&self) -> usize {
        self.lock().rows.len()
    }

    pub fn row(&self, index: usize) -> Option<Record> {
        self.lock().rows.get(index).cloned()
    }

    pub fn rows(&self) -> Vec<Record> {
        self.lock().rows.clone()
    }

    /// Re-query the catalog and report the difference to the observer.
    ///
    /// If the query fails nothing is emitted and the previous view stays.
    pub fn refresh(&self) -> ModelResult<EditScript> {
        let mut view = self.lock();
        let filter = view.filter;
        Self::reconcile(&self.store, &mut view, filter)
    }

    /// Switch to another filter, reporting the change as an edit script
    /// from the old view to the new one.
    pub fn set_filter(&self, filter: Filter) -> ModelResult<EditScript> {
        let mut view = self.lock();
        Self::reconcile(&self.store, &mut view, filter)
    }

    /// Upsert a record and refresh if the catalog changed.
    pub fn add(&self, record: &Record) -> ModelResult<bool> {
        let changed = self.store.add(record)?;
        if changed {
            self.refresh()?;
        }
        Ok(changed)
    }

    /// Delete a record and refresh if it existed.
    pub fn remove(&self, key: &RecordKey) -> ModelResult<bool> {
        let existed = self.store.remove(key)?;
        if existed {
            self.refresh()?;
        }
        Ok(existed)
    }

    /// Record a device image update for `channel`.
    ///
    /// `version` is the numeric image version and becomes the revision;
    /// any non-zero `automatic` flag marks the update as automatic.
    pub fn set_image_update(
        &self,
        channel: &str,
        version: &str,
        binary_filesize: u64,
        automatic: i32,
    ) -> ModelResult<bool> {
        let revision: u32 = version
            .trim()
            .parse()
            .map_err(|_| ModelError::InvalidVersion(version.to_string()))?;
        let record = Record::image_update(channel, revision, binary_filesize, automatic != 0);
        self.add(&record)
    }

    fn reconcile(
        store: &CatalogStore,
        view: &mut View,
        filter: Filter,
    ) -> ModelResult<EditScript> {
        let next = match store.query(filter) {
            Ok(rows) => rows,
            Err(e) => {
                warn!(%filter, error = %e, "refresh failed, view unchanged");
                return Err(e.into());
            }
        };
        let script = diff(&view.rows, &next);
        if !script.is_empty() {
            view.observer.apply(&script);
        }
        debug!(%filter, rows = next.len(), ops = script.len(), "view reconciled");
        view.filter = filter;
        view.rows = next;
        Ok(script)
    }

    fn lock(&self) -> MutexGuard<'_, View> {
        self.view.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::diff::RowOp;
    use crate::observer::NullObserver;
    use sysupdate_catalog::{Kind, State};

    fn model(filter: Filter) -> UpdateModel {
        let store = CatalogStore::open_in_memory().unwrap();
        UpdateModel::new(store, filter, NullObserver).unwrap()
    }

    fn titled(id: &str, title: &str) -> Record {
        Record {
            title: title.to_string(),
            kind: Kind::AppPackage,
            ..Record::new(id, 1)
        }
    }

    #[test]
    fn empty_model_has_no_rows() {
        let m = model(Filter::All);
        assert_eq!(m.count(), 0);
        assert!(m.row(0).is_none());
        assert!(m.refresh().unwrap().is_empty());
    }

    #[test]
    fn initial_view_is_loaded() {
        let store = CatalogStore::open_in_memory().unwrap();
        store.add(&titled("a.app", "A")).unwrap();
        let m = UpdateModel::new(store, Filter::Pending, NullObserver).unwrap();
        assert_eq!(m.count(), 1);
        assert_eq!(m.row(0).unwrap().identifier, "a.app");
    }

    #[test]
    fn add_refreshes_only_on_change() {
        let m = model(Filter::Pending);
        let record = titled("a.app", "A");
        assert!(m.add(&record).unwrap());
        assert!(!m.add(&record).unwrap());
        assert_eq!(m.count(), 1);
    }

    #[test]
    fn invalid_record_leaves_view_untouched() {
        let m = model(Filter::All);
        let err = m.add(&Record::new("", 1)).unwrap_err();
        assert!(matches!(
            err,
            ModelError::Catalog(sysupdate_catalog::CatalogError::InvalidRecord(_))
        ));
        assert_eq!(m.count(), 0);
    }

    #[test]
    fn set_filter_diffs_between_views() {
        let m = model(Filter::All);
        m.add(&titled("a.app", "A")).unwrap();
        m.set_image_update("ubuntu", "350", 1, 0).unwrap();
        assert_eq!(m.count(), 2);

        let script = m.set_filter(Filter::PendingImage).unwrap();
        assert_eq!(m.filter(), Filter::PendingImage);
        assert_eq!(m.count(), 1);
        // Untitled image sorts ahead of "A".
        assert_eq!(script.ops(), &[RowOp::Removed { start: 1, count: 1 }]);
    }

    #[test]
    fn installing_moves_row_between_views() {
        let m = model(Filter::Installed);
        m.add(&titled("a.app", "A")).unwrap();
        assert_eq!(m.count(), 0);

        m.store().mark_installed(&RecordKey::new("a.app", 1)).unwrap();
        let script = m.refresh().unwrap();
        assert_eq!(script.ops(), &[RowOp::Inserted { start: 0, count: 1 }]);
        assert_eq!(m.row(0).unwrap().state, State::Installed);
    }

    #[test]
    fn image_version_must_be_numeric() {
        let m = model(Filter::PendingImage);
        assert!(matches!(
            m.set_image_update("ubuntu", "r350", 1, 0),
            Err(ModelError::InvalidVersion(_))
        ));
        assert_eq!(m.count(), 0);
    }
}
