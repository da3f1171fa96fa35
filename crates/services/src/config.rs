use prepare_core::model::UserId;

/// Local key holding the serialized completion state.
pub const DEFAULT_STORAGE_KEY: &str = "PREPARE_COMPLETION_V1";

/// Remote collection holding one completion document per user.
pub const DEFAULT_REMOTE_COLLECTION: &str = "completion";

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CompletionConfig {
    pub storage_key: String,
    pub remote_collection: String,
}

impl Default for CompletionConfig {
    fn default() -> Self {
        Self {
            storage_key: DEFAULT_STORAGE_KEY.to_owned(),
            remote_collection: DEFAULT_REMOTE_COLLECTION.to_owned(),
        }
    }
}

impl CompletionConfig {
    #[must_use]
    pub fn remote_path(&self, user: &UserId) -> String {
        format!("{}/{}", self.remote_collection.trim_end_matches('/'), user)
    }
}
