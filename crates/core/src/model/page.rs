use serde::{Deserialize, Serialize};

use crate::model::catalog::{Lesson, RawPage};
use crate::model::ids::PageId;

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ChecklistItem {
    pub id: String,
    pub text: String,
    #[serde(default)]
    pub completed: bool,
}

impl ChecklistItem {
    #[must_use]
    pub fn new(id: impl Into<String>, text: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            text: text.into(),
            completed: false,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct QuizQuestion {
    pub id: String,
    pub question: String,
    pub options: Vec<String>,
    /// Index into `options`.
    pub correct_answer: usize,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum PageKind {
    Text,
    Video,
    Checklist,
    Quiz,
}

impl PageKind {
    /// Parse an authored type tag. Missing or unknown tags fall back to `Text`.
    #[must_use]
    pub fn from_tag(tag: Option<&str>) -> Self {
        match tag.map(str::trim) {
            Some("video") => Self::Video,
            Some("checklist") => Self::Checklist,
            Some("quiz") => Self::Quiz,
            _ => Self::Text,
        }
    }
}

/// Uniform page shape consumed by the lesson runtime.
///
/// Every page exposes all four payload fields; the ones that do not apply to
/// its kind are `None`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Page {
    pub id: PageId,
    #[serde(rename = "type")]
    pub kind: PageKind,
    pub title: String,
    pub body: Option<String>,
    pub video_url: Option<String>,
    pub items: Option<Vec<ChecklistItem>>,
    pub questions: Option<Vec<QuizQuestion>>,
    pub completed: bool,
}

impl Page {
    #[must_use]
    pub fn checklist_items(&self) -> &[ChecklistItem] {
        self.items.as_deref().unwrap_or_default()
    }

    #[must_use]
    pub fn quiz_questions(&self) -> &[QuizQuestion] {
        self.questions.as_deref().unwrap_or_default()
    }
}

/// Map a lesson's raw pages into the uniform [`Page`] shape.
///
/// Pure: the same lesson always yields the same pages.
#[must_use]
pub fn normalize_pages(lesson: &Lesson) -> Vec<Page> {
    lesson
        .raw_pages()
        .iter()
        .enumerate()
        .map(|(idx, raw)| normalize_page(lesson, idx, raw))
        .collect()
}

fn normalize_page(lesson: &Lesson, idx: usize, raw: &RawPage) -> Page {
    let id = raw
        .id
        .clone()
        .unwrap_or_else(|| PageId::new(format!("{}-p{}", lesson.id, idx + 1)));

    Page {
        id,
        kind: PageKind::from_tag(raw.kind.as_deref()),
        title: raw.title.clone().unwrap_or_default(),
        body: raw.body.clone().or_else(|| raw.text.clone()),
        video_url: raw.video_url.clone().or_else(|| raw.url.clone()),
        items: raw.items.clone().or_else(|| raw.checklist_items.clone()),
        questions: raw.questions.clone().or_else(|| raw.quiz_questions.clone()),
        completed: raw.completed == Some(true),
    }
}
