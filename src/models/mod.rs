// Domain models: counters, history rows and the command wire encoding

mod command;
mod history;
mod snapshot;

pub use command::CommandSignal;
pub use history::{HistoryRecord, HistorySeries, LABEL_FORMAT};
pub use snapshot::{Snapshot, SnapshotUpdate};
