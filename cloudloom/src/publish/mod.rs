//! Publication of selected node outputs to an external config store.

mod publisher;
mod store;

pub use publisher::{ConfigPublisher, PublishedEntry};
pub use store::{ConfigStore, InMemoryConfigStore, StoredEntry};
