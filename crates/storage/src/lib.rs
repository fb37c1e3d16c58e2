#![forbid(unsafe_code)]

pub mod document;
pub mod live;
pub mod mapping;
pub mod repository;
pub mod sqlite;

pub use document::{CollectionPath, DocPath, Document, Fields};
pub use live::{CollectionQuery, DocumentQuery, GroupQuery, LiveQuery, Subscription};
pub use repository::{
    ChangeNotice, DocumentStore, InMemoryStore, Storage, StorageError, WriteBatch,
};
