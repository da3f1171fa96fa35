mod mirror;
mod store;

pub use mirror::{RemoteMirror, RemoteTarget};
pub use store::CompletionStore;
