#![forbid(unsafe_code)]

pub mod http;
pub mod repository;
pub mod sqlite;

pub use http::{HttpDocumentStore, RemoteConfig};
pub use repository::{
    InMemoryDocumentStore, InMemoryKeyValueStore, KeyValueStore, NullDocumentStore,
    RemoteDocumentStore, Storage, StorageError,
};
