mod kv;
mod record;
mod store;

pub use kv::{FileStore, KeyValueStore, MemoryStore};
pub use record::{label_for, Category, IndexedRecord, ProcessingTime, ResultRecord};
pub use store::{ResetTarget, ResultStore};
