use std::path::PathBuf;

#[derive(Debug, thiserror::Error)]
pub enum TraybridgeError {
    #[error("unsafe identifier: {value:?}")]
    UnsafeId { value: String },

    #[error("malformed record at {path}: {reason}")]
    MalformedRecord { path: PathBuf, reason: String },

    #[error("state directory error: {reason}")]
    StateDir { reason: String },

    #[error("hook input error: {reason}")]
    HookInput { reason: String },

    #[error("config parse error in {path}: {reason}")]
    ConfigParse { path: PathBuf, reason: String },

    #[error("io error: {0}")]
    Io(#[from] std::io::Error),

    #[error("json error: {0}")]
    Json(#[from] serde_json::Error),
}

pub type Result<T> = std::result::Result<T, TraybridgeError>;
