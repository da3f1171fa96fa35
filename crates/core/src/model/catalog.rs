use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::model::ids::{LessonId, ModuleId, PageId};
use crate::model::page::{ChecklistItem, QuizQuestion};

const BUILTIN_CATALOG: &str = include_str!("../../content/catalog.json");

//
// ─── ERRORS ────────────────────────────────────────────────────────────────────
//

#[derive(Debug, Error)]
#[non_exhaustive]
pub enum CatalogError {
    #[error("catalog is not valid JSON: {0}")]
    Malformed(#[from] serde_json::Error),

    #[error("duplicate module id: {0}")]
    DuplicateModule(ModuleId),

    #[error("duplicate lesson id {lesson} in module {module}")]
    DuplicateLesson { module: ModuleId, lesson: LessonId },
}

//
// ─── RAW CONTENT ───────────────────────────────────────────────────────────────
//

/// Page record as authored in content files.
///
/// Authoring tools disagree on field names, so both spellings are accepted
/// here and reconciled by [`crate::model::normalize_pages`].
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RawPage {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub id: Option<PageId>,
    #[serde(rename = "type", default, skip_serializing_if = "Option::is_none")]
    pub kind: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub title: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub body: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub text: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub video_url: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub url: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub items: Option<Vec<ChecklistItem>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub checklist_items: Option<Vec<ChecklistItem>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub questions: Option<Vec<QuizQuestion>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub quiz_questions: Option<Vec<QuizQuestion>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub completed: Option<bool>,
}

impl RawPage {
    #[must_use]
    pub fn text(title: impl Into<String>, body: impl Into<String>) -> Self {
        Self {
            kind: Some("text".into()),
            title: Some(title.into()),
            body: Some(body.into()),
            ..Self::default()
        }
    }

    #[must_use]
    pub fn video(title: impl Into<String>, url: impl Into<String>) -> Self {
        Self {
            kind: Some("video".into()),
            title: Some(title.into()),
            video_url: Some(url.into()),
            ..Self::default()
        }
    }

    #[must_use]
    pub fn checklist(title: impl Into<String>, items: Vec<ChecklistItem>) -> Self {
        Self {
            kind: Some("checklist".into()),
            title: Some(title.into()),
            items: Some(items),
            ..Self::default()
        }
    }

    #[must_use]
    pub fn quiz(title: impl Into<String>, questions: Vec<QuizQuestion>) -> Self {
        Self {
            kind: Some("quiz".into()),
            title: Some(title.into()),
            questions: Some(questions),
            ..Self::default()
        }
    }

    #[must_use]
    pub fn with_id(mut self, id: impl Into<PageId>) -> Self {
        self.id = Some(id.into());
        self
    }
}

//
// ─── LESSONS & MODULES ─────────────────────────────────────────────────────────
//

/// Declared lesson flavour. Informational only: pages carry the real type.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum LessonKind {
    #[default]
    Lesson,
    Checklist,
    Quiz,
    Practice,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct LessonContent {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub pages: Option<Vec<RawPage>>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Lesson {
    pub id: LessonId,
    pub title: String,
    #[serde(default)]
    pub duration: String,
    #[serde(rename = "type", default)]
    pub kind: LessonKind,
    #[serde(default)]
    pub content: LessonContent,
}

impl Lesson {
    #[must_use]
    pub fn new(id: impl Into<LessonId>, title: impl Into<String>, pages: Vec<RawPage>) -> Self {
        Self {
            id: id.into(),
            title: title.into(),
            duration: String::new(),
            kind: LessonKind::Lesson,
            content: LessonContent { pages: Some(pages) },
        }
    }

    #[must_use]
    pub fn raw_pages(&self) -> &[RawPage] {
        self.content.pages.as_deref().unwrap_or_default()
    }

    /// Number of pages the normalizer yields for this lesson.
    #[must_use]
    pub fn page_count(&self) -> usize {
        self.raw_pages().len()
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Module {
    pub id: ModuleId,
    pub title: String,
    #[serde(default)]
    pub icon: String,
    #[serde(default)]
    pub description: String,
    #[serde(default)]
    pub lessons: Vec<Lesson>,
}

impl Module {
    #[must_use]
    pub fn new(id: impl Into<ModuleId>, title: impl Into<String>, lessons: Vec<Lesson>) -> Self {
        Self {
            id: id.into(),
            title: title.into(),
            icon: String::new(),
            description: String::new(),
            lessons,
        }
    }

    #[must_use]
    pub fn lesson(&self, id: &LessonId) -> Option<&Lesson> {
        self.lessons.iter().find(|lesson| &lesson.id == id)
    }
}

//
// ─── CATALOG ───────────────────────────────────────────────────────────────────
//

/// Immutable list of modules, lessons and pages.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Catalog {
    modules: Vec<Module>,
}

impl Catalog {
    #[must_use]
    pub fn new(modules: Vec<Module>) -> Self {
        Self { modules }
    }

    /// The earthquake-preparedness content shipped with the app.
    ///
    /// # Errors
    ///
    /// Returns `CatalogError` if the bundled content fails to decode.
    pub fn builtin() -> Result<Self, CatalogError> {
        Self::from_json(BUILTIN_CATALOG)
    }

    /// Decode a catalog from its JSON authoring format.
    ///
    /// # Errors
    ///
    /// Returns `CatalogError::Malformed` for invalid JSON, or a duplicate error
    /// when module ids (or lesson ids within a module) repeat.
    pub fn from_json(raw: &str) -> Result<Self, CatalogError> {
        let catalog: Self = serde_json::from_str(raw)?;
        catalog.check_unique_ids()?;
        Ok(catalog)
    }

    fn check_unique_ids(&self) -> Result<(), CatalogError> {
        for (idx, module) in self.modules.iter().enumerate() {
            if self.modules[..idx].iter().any(|m| m.id == module.id) {
                return Err(CatalogError::DuplicateModule(module.id.clone()));
            }
            for (lesson_idx, lesson) in module.lessons.iter().enumerate() {
                if module.lessons[..lesson_idx].iter().any(|l| l.id == lesson.id) {
                    return Err(CatalogError::DuplicateLesson {
                        module: module.id.clone(),
                        lesson: lesson.id.clone(),
                    });
                }
            }
        }
        Ok(())
    }

    #[must_use]
    pub fn modules(&self) -> &[Module] {
        &self.modules
    }

    #[must_use]
    pub fn module_by_id(&self, id: &ModuleId) -> Option<&Module> {
        self.modules.iter().find(|module| &module.id == id)
    }

    /// Find a lesson by id across all modules (first match wins).
    #[must_use]
    pub fn lesson_by_id(&self, id: &LessonId) -> Option<&Lesson> {
        self.modules.iter().find_map(|module| module.lesson(id))
    }

    #[must_use]
    pub fn find_lesson(&self, module_id: &ModuleId, lesson_id: &LessonId) -> Option<&Lesson> {
        self.module_by_id(module_id)
            .and_then(|module| module.lesson(lesson_id))
    }
}
