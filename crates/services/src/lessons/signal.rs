use std::collections::HashSet;

use prepare_core::model::{Page, PageKind};
use prepare_core::quiz::{self, QuizScore};

/// User action that may complete the current page.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PageSignal {
    /// Continue button.
    Continue,
    /// Video played to the end.
    VideoWatched,
    /// Ids of the checklist items currently ticked.
    ChecklistChecked(Vec<String>),
    /// Chosen option index per question, in question order.
    QuizSubmitted(Vec<usize>),
}

/// What happened after a [`PageSignal`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PageOutcome {
    /// Moved to the next page.
    Advanced { page_index: usize },
    /// Last page done; the lesson is now completed.
    LessonCompleted,
    /// Last page of a review walk done; nothing was persisted.
    ReviewFinished,
    /// Quiz scored below the pass mark; stay on the page.
    RetryQuiz { score: QuizScore },
    /// The signal does not complete this page.
    NotReady,
}

pub(super) enum Readiness {
    Ready,
    NotReady,
    Retry(QuizScore),
}

pub(super) fn check(page: &Page, signal: &PageSignal) -> Readiness {
    match (page.kind, signal) {
        (PageKind::Text, PageSignal::Continue)
        | (PageKind::Video, PageSignal::Continue | PageSignal::VideoWatched) => Readiness::Ready,
        (PageKind::Checklist, PageSignal::ChecklistChecked(checked)) => {
            let checked: HashSet<&str> = checked.iter().map(String::as_str).collect();
            if page
                .checklist_items()
                .iter()
                .all(|item| checked.contains(item.id.as_str()))
            {
                Readiness::Ready
            } else {
                Readiness::NotReady
            }
        }
        (PageKind::Checklist, PageSignal::Continue) if page.checklist_items().is_empty() => {
            Readiness::Ready
        }
        (PageKind::Quiz, PageSignal::QuizSubmitted(answers)) => {
            let score = quiz::grade(page.quiz_questions(), answers);
            if score.passed() {
                Readiness::Ready
            } else {
                Readiness::Retry(score)
            }
        }
        (PageKind::Quiz, PageSignal::Continue) if page.quiz_questions().is_empty() => {
            Readiness::Ready
        }
        _ => Readiness::NotReady,
    }
}
