#![forbid(unsafe_code)]

pub mod app_services;
pub mod completion;
pub mod config;
pub mod error;
pub mod lessons;
pub mod overview;

pub use app_services::AppServices;
pub use completion::{CompletionStore, RemoteMirror, RemoteTarget};
pub use config::CompletionConfig;
pub use error::{AppServicesError, CompletionError};
pub use lessons::{LessonRuntime, LessonWalkProgress, PageOutcome, PageSignal};
pub use overview::{LessonWithCompletion, ModuleWithCompletion, ModulesOverview};
