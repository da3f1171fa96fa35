use prepare_core::model::{
    Catalog, CompletionState, LessonCompletion, LessonId, LessonKind, ModuleId,
};
use prepare_core::progress::{lesson_progress, module_progress, overall_progress};

/// A catalog lesson annotated with its completion.
#[derive(Debug, Clone, PartialEq)]
pub struct LessonWithCompletion {
    pub id: LessonId,
    pub title: String,
    pub duration: String,
    pub kind: LessonKind,
    pub completed: bool,
    pub current_page_index: usize,
    pub page_count: usize,
    pub progress: f64,
}

/// A catalog module annotated with its completion.
#[derive(Debug, Clone, PartialEq)]
pub struct ModuleWithCompletion {
    pub id: ModuleId,
    pub title: String,
    pub icon: String,
    pub description: String,
    pub completed: bool,
    pub progress: f64,
    pub lessons: Vec<LessonWithCompletion>,
}

/// Catalog joined with a [`CompletionState`], ready for dashboards.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct ModulesOverview {
    pub modules: Vec<ModuleWithCompletion>,
    overall: f64,
}

impl ModulesOverview {
    /// Join without failing: any lesson or module missing from `state`
    /// shows as NotStarted with the catalog's page count.
    #[must_use]
    pub fn build(catalog: &Catalog, state: &CompletionState) -> Self {
        let modules = catalog
            .modules()
            .iter()
            .map(|module| {
                let module_state = state.module(&module.id);
                let lessons: Vec<LessonWithCompletion> = module
                    .lessons
                    .iter()
                    .map(|lesson| {
                        let entry = module_state
                            .and_then(|m| m.lessons.get(&lesson.id))
                            .copied()
                            .unwrap_or_else(|| LessonCompletion::not_started(lesson.page_count()));
                        LessonWithCompletion {
                            id: lesson.id.clone(),
                            title: lesson.title.clone(),
                            duration: lesson.duration.clone(),
                            kind: lesson.kind,
                            completed: entry.completed,
                            current_page_index: entry.current_page_index,
                            page_count: entry.page_count,
                            progress: lesson_progress(&entry),
                        }
                    })
                    .collect();

                ModuleWithCompletion {
                    id: module.id.clone(),
                    title: module.title.clone(),
                    icon: module.icon.clone(),
                    description: module.description.clone(),
                    completed: module_state.is_some_and(|m| m.completed),
                    progress: module_progress(module, module_state),
                    lessons,
                }
            })
            .collect();
        Self {
            modules,
            overall: overall_progress(catalog, state),
        }
    }

    /// Mean module progress; `0.0` with no modules.
    #[must_use]
    pub fn overall_progress(&self) -> f64 {
        self.overall
    }

    #[must_use]
    pub fn module(&self, id: &ModuleId) -> Option<&ModuleWithCompletion> {
        self.modules.iter().find(|module| &module.id == id)
    }

    #[must_use]
    pub fn completed_modules(&self) -> usize {
        self.modules.iter().filter(|module| module.completed).count()
    }
}
