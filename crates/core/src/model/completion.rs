use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

use crate::model::catalog::{Catalog, Module};
use crate::model::ids::{LessonId, ModuleId};

/// Where a lesson sits in its NotStarted → InProgress → Completed walk.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LessonStatus {
    NotStarted,
    InProgress,
    Completed,
}

/// Persisted progress for a single lesson.
///
/// `page_count` is a snapshot taken when the entry was created and is not
/// refreshed from the catalog afterwards.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct LessonCompletion {
    pub completed: bool,
    pub current_page_index: usize,
    pub page_count: usize,
}

impl LessonCompletion {
    #[must_use]
    pub fn not_started(page_count: usize) -> Self {
        Self {
            completed: false,
            current_page_index: 0,
            page_count,
        }
    }

    #[must_use]
    pub fn status(&self) -> LessonStatus {
        if self.completed {
            LessonStatus::Completed
        } else if self.current_page_index == 0 {
            LessonStatus::NotStarted
        } else {
            LessonStatus::InProgress
        }
    }

    fn set_page(&mut self, page_index: usize) {
        self.current_page_index = page_index.min(self.page_count);
        if self.page_count > 0 && self.current_page_index >= self.page_count {
            self.completed = true;
        }
    }

    fn finish(&mut self) {
        self.completed = true;
        self.current_page_index = self.page_count;
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ModuleCompletion {
    pub completed: bool,
    pub lessons: BTreeMap<LessonId, LessonCompletion>,
}

impl ModuleCompletion {
    fn seeded_from(module: &Module) -> Self {
        let lessons = module
            .lessons
            .iter()
            .map(|lesson| {
                (
                    lesson.id.clone(),
                    LessonCompletion::not_started(lesson.page_count()),
                )
            })
            .collect();
        Self {
            completed: false,
            lessons,
        }
    }

    /// True when the module has lessons and every one of them is completed.
    #[must_use]
    pub fn all_lessons_completed(&self) -> bool {
        !self.lessons.is_empty() && self.lessons.values().all(|lesson| lesson.completed)
    }

    fn recompute_completed(&mut self) {
        self.completed = self.all_lessons_completed();
    }
}

/// Per-module, per-lesson completion bookkeeping.
///
/// Serializes to the same JSON document for the local store and the remote
/// mirror.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct CompletionState {
    pub modules: BTreeMap<ModuleId, ModuleCompletion>,
}

impl CompletionState {
    /// Build a fresh state with every catalog lesson NotStarted.
    #[must_use]
    pub fn skeleton(catalog: &Catalog) -> Self {
        let modules = catalog
            .modules()
            .iter()
            .map(|module| (module.id.clone(), ModuleCompletion::seeded_from(module)))
            .collect();
        Self { modules }
    }

    #[must_use]
    pub fn module(&self, module_id: &ModuleId) -> Option<&ModuleCompletion> {
        self.modules.get(module_id)
    }

    #[must_use]
    pub fn lesson(&self, module_id: &ModuleId, lesson_id: &LessonId) -> Option<&LessonCompletion> {
        self.module(module_id)
            .and_then(|module| module.lessons.get(lesson_id))
    }

    /// Find a lesson's entry in any module (first match in module order).
    #[must_use]
    pub fn find_lesson(&self, lesson_id: &LessonId) -> Option<&LessonCompletion> {
        self.modules
            .values()
            .find_map(|module| module.lessons.get(lesson_id))
    }

    /// Resume position for a lesson; `0` when the lesson is unknown.
    #[must_use]
    pub fn current_page_index(&self, lesson_id: &LessonId) -> usize {
        self.find_lesson(lesson_id)
            .map_or(0, |lesson| lesson.current_page_index)
    }

    /// Set a lesson's page position, completing it when walked past its end.
    pub fn set_current_page(
        &mut self,
        catalog: &Catalog,
        module_id: &ModuleId,
        lesson_id: &LessonId,
        page_index: usize,
    ) {
        let module = self.module_entry(catalog, module_id);
        let lesson = lesson_entry(module, catalog, module_id, lesson_id);
        let was_completed = lesson.completed;
        lesson.set_page(page_index);
        if lesson.completed != was_completed {
            module.recompute_completed();
        }
    }

    /// Force a lesson into Completed and refresh its module's flag.
    pub fn mark_lesson_completed(
        &mut self,
        catalog: &Catalog,
        module_id: &ModuleId,
        lesson_id: &LessonId,
    ) {
        let module = self.module_entry(catalog, module_id);
        lesson_entry(module, catalog, module_id, lesson_id).finish();
        module.recompute_completed();
    }

    /// Override a module's flag without touching its lessons.
    pub fn set_module_completed(&mut self, catalog: &Catalog, module_id: &ModuleId, completed: bool) {
        self.module_entry(catalog, module_id).completed = completed;
    }

    fn module_entry(&mut self, catalog: &Catalog, module_id: &ModuleId) -> &mut ModuleCompletion {
        self.modules.entry(module_id.clone()).or_insert_with(|| {
            catalog
                .module_by_id(module_id)
                .map(ModuleCompletion::seeded_from)
                .unwrap_or_default()
        })
    }
}

fn lesson_entry<'a>(
    module: &'a mut ModuleCompletion,
    catalog: &Catalog,
    module_id: &ModuleId,
    lesson_id: &LessonId,
) -> &'a mut LessonCompletion {
    module.lessons.entry(lesson_id.clone()).or_insert_with(|| {
        let page_count = catalog
            .find_lesson(module_id, lesson_id)
            .map_or(0, |lesson| lesson.page_count());
        LessonCompletion::not_started(page_count)
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::catalog::{Lesson, RawPage};

    fn pages(n: usize) -> Vec<RawPage> {
        (0..n).map(|i| RawPage::text(format!("Page {i}"), "...")).collect()
    }

    fn catalog() -> Catalog {
        Catalog::new(vec![
            Module::new(
                "1",
                "Understand",
                vec![Lesson::new("1-1", "Faults", pages(3))],
            ),
            Module::new(
                "2",
                "Prepare",
                vec![
                    Lesson::new("2-1", "Kit", pages(2)),
                    Lesson::new("2-2", "Plan", pages(2)),
                ],
            ),
        ])
    }

    fn m(id: &str) -> ModuleId {
        ModuleId::new(id)
    }

    fn l(id: &str) -> LessonId {
        LessonId::new(id)
    }

    #[test]
    fn skeleton_starts_every_lesson_not_started() {
        let state = CompletionState::skeleton(&catalog());
        assert_eq!(state.modules.len(), 2);
        let lesson = state.lesson(&m("1"), &l("1-1")).unwrap();
        assert_eq!(*lesson, LessonCompletion::not_started(3));
        assert_eq!(lesson.status(), LessonStatus::NotStarted);
        assert!(!state.module(&m("2")).unwrap().completed);
    }

    #[test]
    fn advancing_moves_through_in_progress_to_completed() {
        let catalog = catalog();
        let mut state = CompletionState::skeleton(&catalog);

        state.set_current_page(&catalog, &m("1"), &l("1-1"), 1);
        assert_eq!(
            state.lesson(&m("1"), &l("1-1")).unwrap().status(),
            LessonStatus::InProgress
        );

        state.set_current_page(&catalog, &m("1"), &l("1-1"), 3);
        let lesson = state.lesson(&m("1"), &l("1-1")).unwrap();
        assert!(lesson.completed);
        assert_eq!(lesson.current_page_index, 3);
        assert!(state.module(&m("1")).unwrap().completed);
    }

    #[test]
    fn page_index_is_clamped_to_page_count() {
        let catalog = catalog();
        let mut state = CompletionState::skeleton(&catalog);
        state.set_current_page(&catalog, &m("2"), &l("2-1"), 40);
        let lesson = state.lesson(&m("2"), &l("2-1")).unwrap();
        assert_eq!(lesson.current_page_index, 2);
        assert!(lesson.completed);
    }

    #[test]
    fn viewing_earlier_pages_keeps_completed_lesson_completed() {
        let catalog = catalog();
        let mut state = CompletionState::skeleton(&catalog);
        state.mark_lesson_completed(&catalog, &m("2"), &l("2-1"));
        state.set_current_page(&catalog, &m("2"), &l("2-1"), 0);
        assert!(state.lesson(&m("2"), &l("2-1")).unwrap().completed);
    }

    #[test]
    fn module_completes_only_when_all_lessons_complete() {
        let catalog = catalog();
        let mut state = CompletionState::skeleton(&catalog);

        state.mark_lesson_completed(&catalog, &m("2"), &l("2-1"));
        assert!(!state.module(&m("2")).unwrap().completed);

        state.mark_lesson_completed(&catalog, &m("2"), &l("2-2"));
        assert!(state.module(&m("2")).unwrap().completed);
        assert_eq!(state.lesson(&m("2"), &l("2-2")).unwrap().current_page_index, 2);
    }

    #[test]
    fn missing_entries_are_created_lazily() {
        let catalog = catalog();
        let mut state = CompletionState::default();

        state.set_current_page(&catalog, &m("2"), &l("2-2"), 1);
        let module = state.module(&m("2")).unwrap();
        assert_eq!(module.lessons.len(), 2, "module seeded with catalog lessons");
        assert_eq!(module.lessons[&l("2-2")].current_page_index, 1);

        state.mark_lesson_completed(&catalog, &m("gone"), &l("gone-1"));
        let orphan = state.lesson(&m("gone"), &l("gone-1")).unwrap();
        assert!(orphan.completed);
        assert_eq!(orphan.page_count, 0);
        assert!(state.module(&m("gone")).unwrap().completed);
    }

    #[test]
    fn module_override_leaves_lessons_untouched() {
        let catalog = catalog();
        let mut state = CompletionState::skeleton(&catalog);
        state.set_module_completed(&catalog, &m("2"), true);
        let module = state.module(&m("2")).unwrap();
        assert!(module.completed);
        assert!(module.lessons.values().all(|lesson| !lesson.completed));
    }

    #[test]
    fn decodes_partial_documents_with_defaults() {
        let state: CompletionState =
            serde_json::from_str(r#"{"modules":{"2":{"lessons":{"2-1":{"pageCount":2}}}}}"#)
                .unwrap();
        let lesson = state.lesson(&m("2"), &l("2-1")).unwrap();
        assert_eq!(*lesson, LessonCompletion::not_started(2));
    }

    #[test]
    fn serializes_with_camel_case_fields() {
        let state = CompletionState::skeleton(&catalog());
        let json = serde_json::to_value(&state).unwrap();
        assert_eq!(
            json["modules"]["1"]["lessons"]["1-1"],
            serde_json::json!({"completed": false, "currentPageIndex": 0, "pageCount": 3})
        );
    }
}
