pub mod calculations;
pub mod config;
pub mod models;
pub mod parse;
pub mod projection;
pub mod snapshot;
pub mod storage;
pub mod store;

pub use models::*;
pub use storage::{FileStorage, MemoryStorage, SnapshotStorage};
pub use store::{Command, Dispatcher, Observer, Store};
