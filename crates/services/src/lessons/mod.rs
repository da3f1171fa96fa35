mod progress;
mod runtime;
mod signal;

// Public API of the lesson subsystem.
pub use progress::LessonWalkProgress;
pub use runtime::LessonRuntime;
pub use signal::{PageOutcome, PageSignal};
