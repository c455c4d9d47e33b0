//! The three [`DataSource`](wharf_core::DataSource) implementations.

mod file;
mod managed;
mod object_store;

pub use file::FileSource;
pub use managed::{ManagedDatasetSource, OpenOptions, SyncContext};
pub use object_store::{ObjectLocation, ObjectStoreSource};
