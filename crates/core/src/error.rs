/// Result alias that carries the custom [`AvatarError`] type.
pub type Result<T> = std::result::Result<T, AvatarError>;

/// Common error type for the core crate.
#[derive(Debug, thiserror::Error)]
pub enum AvatarError {
    /// Free-form failure that does not warrant its own variant.
    #[error("{0}")]
    Message(String),
    /// Caller supplied data the engine cannot work with.
    #[error("invalid input: {0}")]
    InvalidInput(&'static str),
    /// The configured face mesh is not part of the loaded model.
    #[error("mesh `{0}` not found in avatar asset")]
    MissingMesh(String),
    /// The render loop was driven before its model was loaded.
    #[error("render loop has no model loaded")]
    NotLoaded,
    /// The render loop has already left the unloaded state.
    #[error("render loop is already running")]
    AlreadyRunning,
    /// Wrapper around standard IO errors.
    #[error("{0}")]
    Io(#[from] std::io::Error),
    /// Wrapper around JSON (de)serialisation errors.
    #[error("json: {0}")]
    Json(#[from] serde_json::Error),
}

impl AvatarError {
    /// Creates a new error that simply wraps the provided message.
    pub fn msg<T: Into<String>>(msg: T) -> Self {
        Self::Message(msg.into())
    }
}

impl From<&str> for AvatarError {
    fn from(value: &str) -> Self {
        Self::msg(value)
    }
}

impl From<String> for AvatarError {
    fn from(value: String) -> Self {
        Self::Message(value)
    }
}
