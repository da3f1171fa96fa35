//! Read-side progress arithmetic over a [`CompletionState`] and its catalog.
//!
//! Every function here is total: empty modules and catalogs yield `0.0`
//! rather than dividing by zero.

use crate::model::{Catalog, CompletionState, LessonCompletion, Module, ModuleCompletion};

/// Progress through a single lesson in `[0, 1]`.
#[must_use]
pub fn lesson_progress(state: &LessonCompletion) -> f64 {
    if state.completed {
        return 1.0;
    }
    if state.page_count == 0 {
        return 0.0;
    }
    #[allow(clippy::cast_precision_loss)]
    let ratio = state.current_page_index as f64 / state.page_count as f64;
    ratio.clamp(0.0, 1.0)
}

/// Mean lesson progress over the catalog module's lessons.
///
/// Lessons missing from `state` count as NotStarted.
#[must_use]
pub fn module_progress(module: &Module, state: Option<&ModuleCompletion>) -> f64 {
    mean(module.lessons.iter().map(|lesson| {
        state
            .and_then(|m| m.lessons.get(&lesson.id))
            .map_or(0.0, lesson_progress)
    }))
}

/// Mean module progress over the whole catalog.
#[must_use]
pub fn overall_progress(catalog: &Catalog, state: &CompletionState) -> f64 {
    mean(
        catalog
            .modules()
            .iter()
            .map(|module| module_progress(module, state.module(&module.id))),
    )
}

/// Arithmetic mean, `0.0` for an empty sequence.
#[must_use]
pub fn mean(values: impl IntoIterator<Item = f64>) -> f64 {
    let (sum, count) = values
        .into_iter()
        .fold((0.0_f64, 0_u32), |(sum, count), v| (sum + v, count + 1));
    if count == 0 {
        0.0
    } else {
        sum / f64::from(count)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::{Lesson, LessonId, ModuleId, RawPage};

    fn pages(n: usize) -> Vec<RawPage> {
        (0..n).map(|i| RawPage::text(format!("P{i}"), "")).collect()
    }

    fn lesson_at(index: usize, page_count: usize) -> LessonCompletion {
        LessonCompletion {
            completed: false,
            current_page_index: index,
            page_count,
        }
    }

    #[test]
    fn progress_is_monotonic_in_page_index() {
        let page_count = 5;
        for k in 0..page_count - 1 {
            assert!(
                lesson_progress(&lesson_at(k, page_count))
                    <= lesson_progress(&lesson_at(k + 1, page_count))
            );
        }
    }

    #[test]
    fn completed_lesson_is_full_progress_regardless_of_index() {
        for index in [0, 1, 4] {
            let state = LessonCompletion {
                completed: true,
                current_page_index: index,
                page_count: 4,
            };
            assert!((lesson_progress(&state) - 1.0).abs() < f64::EPSILON);
        }
    }

    #[test]
    fn zero_page_lesson_has_zero_progress() {
        assert!(lesson_progress(&lesson_at(0, 0)).abs() < f64::EPSILON);
    }

    #[test]
    fn out_of_range_index_is_clamped() {
        assert!((lesson_progress(&lesson_at(9, 3)) - 1.0).abs() < f64::EPSILON);
    }

    #[test]
    fn empty_module_and_catalog_have_zero_progress() {
        let empty = Module::new("e", "Empty", vec![]);
        assert!(module_progress(&empty, None).abs() < f64::EPSILON);

        let catalog = Catalog::default();
        assert!(overall_progress(&catalog, &CompletionState::default()).abs() < f64::EPSILON);
    }

    #[test]
    fn module_progress_averages_lessons() {
        let catalog = Catalog::new(vec![Module::new(
            "2",
            "Prepare",
            vec![
                Lesson::new("2-1", "Kit", pages(2)),
                Lesson::new("2-2", "Plan", pages(2)),
            ],
        )]);
        let mut state = CompletionState::skeleton(&catalog);
        let module_id = ModuleId::new("2");
        state.set_current_page(&catalog, &module_id, &LessonId::new("2-1"), 1);

        let module = &catalog.modules()[0];
        let progress = module_progress(module, state.module(&module_id));
        assert!((progress - 0.25).abs() < 1e-9);
        assert!((overall_progress(&catalog, &state) - 0.25).abs() < 1e-9);
    }

    #[test]
    fn missing_module_state_counts_as_not_started() {
        let module = Module::new("x", "X", vec![Lesson::new("x-1", "L", pages(1))]);
        assert!(module_progress(&module, None).abs() < f64::EPSILON);
    }
}
