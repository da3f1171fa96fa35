use std::sync::Arc;

use prepare_core::model::{LessonId, ModuleId, Page, normalize_pages};
use tracing::debug;

use super::progress::LessonWalkProgress;
use super::signal::{self, PageOutcome, PageSignal, Readiness};
use crate::completion::CompletionStore;
use crate::error::CompletionError;

/// Walks one lesson's normalized pages, recording progress as pages complete.
///
/// Opening a lesson that is already completed starts a review walk, which
/// never writes to the completion store.
pub struct LessonRuntime {
    store: Arc<CompletionStore>,
    module_id: ModuleId,
    lesson_id: LessonId,
    pages: Vec<Page>,
    current: usize,
    review: bool,
    finished: bool,
}

impl LessonRuntime {
    /// Open a lesson at its resume position.
    ///
    /// Returns `None` if the lesson is not in the catalog.
    pub async fn open(
        store: Arc<CompletionStore>,
        module_id: ModuleId,
        lesson_id: LessonId,
    ) -> Option<Self> {
        let pages = normalize_pages(store.catalog().find_lesson(&module_id, &lesson_id)?);

        let state = store.get_completion_state().await;
        let entry = state.lesson(&module_id, &lesson_id);
        let review = entry.is_some_and(|lesson| lesson.completed);
        let current = if review {
            0
        } else {
            entry
                .map_or(0, |lesson| lesson.current_page_index)
                .min(pages.len().saturating_sub(1))
        };
        debug!(%module_id, %lesson_id, current, review, "lesson opened");

        Some(Self {
            store,
            module_id,
            lesson_id,
            pages,
            current,
            review,
            finished: false,
        })
    }

    #[must_use]
    pub fn module_id(&self) -> &ModuleId {
        &self.module_id
    }

    #[must_use]
    pub fn lesson_id(&self) -> &LessonId {
        &self.lesson_id
    }

    #[must_use]
    pub fn pages(&self) -> &[Page] {
        &self.pages
    }

    /// The page being shown, or `None` for a lesson without pages.
    #[must_use]
    pub fn current_page(&self) -> Option<&Page> {
        self.pages.get(self.current)
    }

    #[must_use]
    pub fn page_index(&self) -> usize {
        self.current
    }

    #[must_use]
    pub fn is_review(&self) -> bool {
        self.review
    }

    #[must_use]
    pub fn is_finished(&self) -> bool {
        self.finished
    }

    #[must_use]
    pub fn progress(&self) -> LessonWalkProgress {
        LessonWalkProgress {
            page_index: self.current,
            page_count: self.pages.len(),
            is_review: self.review,
            is_finished: self.finished,
        }
    }

    /// Apply a page-completion signal to the current page.
    ///
    /// # Errors
    ///
    /// Returns `CompletionError` if persisting the new position fails; the
    /// walk then stays on the current page.
    pub async fn complete_page(&mut self, signal: PageSignal) -> Result<PageOutcome, CompletionError> {
        if self.finished {
            return Ok(self.finished_outcome());
        }

        if let Some(page) = self.pages.get(self.current) {
            match signal::check(page, &signal) {
                Readiness::Ready => {}
                Readiness::NotReady => return Ok(PageOutcome::NotReady),
                Readiness::Retry(score) => {
                    debug!(
                        lesson_id = %self.lesson_id,
                        correct = score.correct,
                        total = score.total,
                        "quiz below pass mark"
                    );
                    return Ok(PageOutcome::RetryQuiz { score });
                }
            }
        }

        let next = self.current + 1;
        if next < self.pages.len() {
            if !self.review {
                self.store
                    .set_lesson_current_page(&self.module_id, &self.lesson_id, next)
                    .await?;
            }
            self.current = next;
            return Ok(PageOutcome::Advanced { page_index: next });
        }

        if !self.review {
            self.store
                .mark_lesson_completed(&self.module_id, &self.lesson_id)
                .await?;
        }
        self.finished = true;
        Ok(self.finished_outcome())
    }

    fn finished_outcome(&self) -> PageOutcome {
        if self.review {
            PageOutcome::ReviewFinished
        } else {
            PageOutcome::LessonCompleted
        }
    }
}
