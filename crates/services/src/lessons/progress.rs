/// Position within a lesson walk, useful for UI page indicators.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct LessonWalkProgress {
    pub page_index: usize,
    pub page_count: usize,
    pub is_review: bool,
    pub is_finished: bool,
}
