//! End-to-end catalog → model → observer behavior.

use sysupdate_catalog::{CatalogStore, Filter, Kind, Record, RecordKey};
use sysupdate_model::{ChannelObserver, EditScript, RowOp, UpdateModel};
use tokio::sync::mpsc::UnboundedReceiver;

fn setup(filter: Filter) -> (UpdateModel, UnboundedReceiver<EditScript>) {
    let store = CatalogStore::open_in_memory().unwrap();
    let (tx, rx) = tokio::sync::mpsc::unbounded_channel();
    let model = UpdateModel::new(store, filter, ChannelObserver::new(tx)).unwrap();
    (model, rx)
}

fn app(id: &str, revision: u32, title: &str) -> Record {
    Record {
        kind: Kind::AppPackage,
        title: title.to_string(),
        ..Record::new(id, revision)
    }
}

/// Every operation received since the last drain, flattened.
fn drain(rx: &mut UnboundedReceiver<EditScript>) -> Vec<RowOp> {
    let mut ops = Vec::new();
    while let Ok(script) = rx.try_recv() {
        assert!(!script.is_empty(), "empty scripts are never delivered");
        ops.extend(script.iter().copied());
    }
    ops
}

fn retitle(model: &UpdateModel, id: &str, title: &str) {
    let store = model.store();
    let mut record = store.get(&RecordKey::new(id, 1)).unwrap().unwrap();
    record.title = title.to_string();
    assert!(store.add(&record).unwrap());
}

#[test]
fn no_updates() {
    let (model, mut rx) = setup(Filter::All);
    assert_eq!(model.count(), 0);
    assert!(drain(&mut rx).is_empty());
}

#[test]
fn add_emits_one_insertion() {
    let (model, mut rx) = setup(Filter::All);
    let record = app("test.app", 1, "");
    model.add(&record).unwrap();

    assert_eq!(drain(&mut rx), vec![RowOp::Inserted { start: 0, count: 1 }]);
    assert_eq!(model.count(), 1);
    assert_eq!(model.store().query(Filter::All).unwrap(), model.rows());
}

#[test]
fn add_multiple_grows_pending() {
    let (model, _rx) = setup(Filter::Pending);
    for id in ["a.app", "b.app", "c.app"] {
        model.add(&app(id, 1, "")).unwrap();
    }
    assert_eq!(model.count(), 3);
}

#[test]
fn remove_emits_one_removal() {
    let (model, mut rx) = setup(Filter::All);
    let record = app("a.app", 1, "");
    model.add(&record).unwrap();
    drain(&mut rx);

    assert!(model.remove(&record.key()).unwrap());
    assert_eq!(drain(&mut rx), vec![RowOp::Removed { start: 0, count: 1 }]);
    assert_eq!(model.count(), 0);

    // Removing again is a silent no-op.
    assert!(!model.remove(&record.key()).unwrap());
    assert!(drain(&mut rx).is_empty());
}

#[test]
fn retitle_moves_rows() {
    let (model, mut rx) = setup(Filter::Pending);
    model.add(&app("first.app", 1, "ABC")).unwrap();
    model.add(&app("second.app", 1, "CED")).unwrap();
    assert_eq!(model.row(0).unwrap().identifier, "first.app");
    assert_eq!(model.row(1).unwrap().identifier, "second.app");
    drain(&mut rx);

    retitle(&model, "first.app", "XYZ");
    model.refresh().unwrap();

    assert_eq!(model.row(0).unwrap().identifier, "second.app");
    assert_eq!(model.row(1).unwrap().identifier, "first.app");

    let ops = drain(&mut rx);
    let moves: Vec<&RowOp> = ops
        .iter()
        .filter(|op| matches!(op, RowOp::Moved { .. }))
        .collect();
    assert_eq!(
        moves,
        vec![&RowOp::Moved {
            source_start: 1,
            source_count: 1,
            destination: 0
        }]
    );
}

#[test]
fn change_in_place() {
    let (model, mut rx) = setup(Filter::All);
    let mut record = app("test.app", 1, "old");
    model.add(&record).unwrap();
    drain(&mut rx);

    record.title = "updated".to_string();
    model.add(&record).unwrap();
    assert_eq!(drain(&mut rx), vec![RowOp::Changed { start: 0, count: 1 }]);
    assert_eq!(model.row(0).unwrap().title, "updated");
}

#[test]
fn multiple_changes() {
    let (model, mut rx) = setup(Filter::All);
    for id in ["a", "b", "c"] {
        model.add(&app(&format!("{id}.app"), 1, id)).unwrap();
    }
    drain(&mut rx);

    for id in ["a", "b", "c"] {
        retitle(&model, &format!("{id}.app"), &format!("{id}-new"));
    }
    model.refresh().unwrap();

    let ops = drain(&mut rx);
    assert_eq!(ops.len(), 3);
    assert!(ops.iter().all(|op| matches!(op, RowOp::Changed { count: 1, .. })));
}

#[test]
fn superseded_update_is_hidden() {
    let (model, _rx) = setup(Filter::All);
    model.add(&app("some.app", 1, "")).unwrap();
    model.add(&app("some.app", 2, "")).unwrap();

    model.set_filter(Filter::PendingClicks).unwrap();
    assert_eq!(model.count(), 1);
    let row = model.row(0).unwrap();
    assert_eq!(row.identifier, "some.app");
    assert_eq!(row.revision, 2);
}

#[test]
fn supersede_replaces_visible_row() {
    let (model, mut rx) = setup(Filter::Pending);
    model.add(&app("some.app", 1, "")).unwrap();
    drain(&mut rx);

    model.add(&app("some.app", 2, "")).unwrap();
    assert_eq!(
        drain(&mut rx),
        vec![
            RowOp::Removed { start: 0, count: 1 },
            RowOp::Inserted { start: 0, count: 1 },
        ]
    );
    assert_eq!(model.row(0).unwrap().revision, 2);
}

#[test]
fn manual_image_update() {
    let (model, _rx) = setup(Filter::All);
    model.set_image_update("ubuntu", "350", 400_000, 0).unwrap();
    model.set_filter(Filter::PendingImage).unwrap();

    assert_eq!(model.count(), 1);
    let row = model.row(0).unwrap();
    assert_eq!(row.identifier, "ubuntu");
    assert_eq!(row.revision, 350);
    assert_eq!(row.binary_filesize, 400_000);
    assert!(!row.automatic);
}

#[test]
fn automatic_image_update() {
    let (model, _rx) = setup(Filter::All);
    model.set_image_update("ubuntu", "350", 400_000, 1).unwrap();
    model.set_filter(Filter::PendingImage).unwrap();

    assert_eq!(model.count(), 1);
    let row = model.row(0).unwrap();
    assert_eq!(row.identifier, "ubuntu");
    assert_eq!(row.revision, 350);
    assert!(row.automatic);
}

#[test]
fn unchanged_readd_emits_nothing() {
    let (model, mut rx) = setup(Filter::Pending);
    let record = app("a.app", 1, "A");
    model.add(&record).unwrap();
    drain(&mut rx);

    assert!(!model.add(&record).unwrap());
    assert!(model.refresh().unwrap().is_empty());
    assert!(drain(&mut rx).is_empty());
}

#[test]
fn filters_switch_and_report() {
    let (model, _rx) = setup(Filter::All);
    for filter in Filter::ALL {
        model.set_filter(filter).unwrap();
        assert_eq!(model.filter(), filter);
    }
}

#[test]
fn scripts_replay_onto_mirror() {
    let (model, mut rx) = setup(Filter::Pending);
    let store = model.store().clone();
    let mut mirror: Vec<Record> = Vec::new();

    let steps: Vec<Box<dyn Fn(&CatalogStore)>> = vec![
        Box::new(|s| {
            for (id, title) in [
                ("a.app", "M"),
                ("b.app", "C"),
                ("c.app", "X"),
                ("d.app", "A"),
            ] {
                s.add(&app(id, 1, title)).unwrap();
            }
        }),
        Box::new(|s| {
            s.add(&app("c.app", 1, "B")).unwrap();
        }),
        Box::new(|s| {
            s.remove(&RecordKey::new("d.app", 1)).unwrap();
            s.add(&app("e.app", 1, "D")).unwrap();
        }),
        Box::new(|s| {
            s.add(&app("b.app", 2, "Z")).unwrap();
        }),
        Box::new(|s| {
            s.add(&app("a.app", 1, "0")).unwrap();
            s.add(&app("c.app", 1, "Y")).unwrap();
        }),
    ];

    for step in steps {
        step(&store);
        let script = model.refresh().unwrap();
        let next = model.rows();
        script.apply(&mut mirror, &next);
        assert_eq!(mirror, next);

        // The observer received the same script as one message.
        assert_eq!(rx.try_recv().unwrap(), script);
        assert!(rx.try_recv().is_err());
    }
}

#[test]
fn persistent_catalog_reloads_view() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("catalog.redb");
    {
        let store = CatalogStore::open(&path).unwrap();
        let (tx, _rx) = tokio::sync::mpsc::unbounded_channel();
        let model =
            UpdateModel::new(store, Filter::Pending, ChannelObserver::new(tx)).unwrap();
        model.add(&app("a.app", 1, "A")).unwrap();
        model.add(&app("b.app", 1, "B")).unwrap();
    }

    let store = CatalogStore::open(&path).unwrap();
    let (tx, _rx) = tokio::sync::mpsc::unbounded_channel();
    let model = UpdateModel::new(store, Filter::Pending, ChannelObserver::new(tx)).unwrap();
    assert_eq!(model.count(), 2);
    assert_eq!(model.row(1).unwrap().identifier, "b.app");
}
