pub mod watch;

pub use watch::{Location, NewWatch, OwnerId, WatchEntry, WatchFilters, WatchId};
