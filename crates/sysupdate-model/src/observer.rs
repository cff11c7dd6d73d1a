//! Observer surface consumed by the presentation layer.

use tokio::sync::mpsc::UnboundedSender;
use tracing::warn;

use crate::diff::{EditScript, RowOp};

/// Receives structural change notifications for a view.
///
/// The model calls [`Observer::apply`] once per refresh with the whole
/// script; the default implementation dispatches each operation in order.
///
/// Notifications are delivered while the model holds its view lock. An
/// observer must not call back into the [`UpdateModel`](crate::UpdateModel)
/// that notifies it, or the call deadlocks; hand the script to another
/// thread instead (see [`ChannelObserver`]).
pub trait Observer: Send {
    fn rows_removed(&mut self, start: usize, count: usize);

    fn rows_inserted(&mut self, start: usize, count: usize);

    fn rows_moved(&mut self, source_start: usize, source_count: usize, destination: usize);

    fn rows_changed(&mut self, start: usize, count: usize);

    fn apply(&mut self, script: &EditScript) {
        for op in script {
            match *op {
                RowOp::Removed { start, count } => self.rows_removed(start, count),
                RowOp::Moved {
                    source_start,
                    source_count,
                    destination,
                } => self.rows_moved(source_start, source_count, destination),
                RowOp::Inserted { start, count } => self.rows_inserted(start, count),
                RowOp::Changed { start, count } => self.rows_changed(start, count),
            }
        }
    }
}

/// Discards every notification.
#[derive(Debug, Default, Clone, Copy)]
pub struct NullObserver;

impl Observer for NullObserver {
    fn rows_removed(&mut self, _start: usize, _count: usize) {}
    fn rows_inserted(&mut self, _start: usize, _count: usize) {}
    fn rows_moved(&mut self, _source_start: usize, _source_count: usize, _destination: usize) {}
    fn rows_changed(&mut self, _start: usize, _count: usize) {}
}

/// Hands each script to another thread or task over an unbounded channel.
///
/// A script is sent as one message, so a receiver never sees operations
/// of two refreshes interleaved.
#[derive(Debug, Clone)]
pub struct ChannelObserver {
    tx: UnboundedSender<EditScript>,
}

impl ChannelObserver {
    pub fn new(tx: UnboundedSender<EditScript>) -> Self {
        Self { tx }
    }

    fn send(&self, script: EditScript) {
        if self.tx.send(script).is_err() {
            warn!("edit script dropped: receiver closed");
        }
    }
}

impl Observer for ChannelObserver {
    fn rows_removed(&mut self, start: usize, count: usize) {
        self.send(EditScript::from(vec![RowOp::Removed { start, count }]));
    }

    fn rows_inserted(&mut self, start: usize, count: usize) {
        self.send(EditScript::from(vec![RowOp::Inserted { start, count }]));
    }

    fn rows_moved(&mut self, source_start: usize, source_count: usize, destination: usize) {
        self.send(EditScript::from(vec![RowOp::Moved {
            source_start,
            source_count,
            destination,
        }]));
    }

    fn rows_changed(&mut self, start: usize, count: usize) {
        self.send(EditScript::from(vec![RowOp::Changed { start, count }]));
    }

    fn apply(&mut self, script: &EditScript) {
        self.send(script.clone());
    }
}
