mod catalog;
mod completion;
mod ids;
mod page;

pub use catalog::{Catalog, CatalogError, Lesson, LessonContent, LessonKind, Module, RawPage};
pub use completion::{CompletionState, LessonCompletion, LessonStatus, ModuleCompletion};
pub use ids::{LessonId, ModuleId, PageId, UserId};
pub use page::{ChecklistItem, Page, PageKind, QuizQuestion, normalize_pages};
