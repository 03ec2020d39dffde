use std::borrow::Cow;

/// Why an asynchronous load produced no resource.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum LoadError {
    /// The loader reported a failure.
    #[error("load failed: {0}")]
    Failed(Cow<'static, str>),

    /// The loader went away without reporting a result.
    #[error("loader dropped before completing")]
    Abandoned,

    /// `spawn_load` was called outside a tokio runtime.
    #[error("no tokio runtime available to run the load")]
    NoRuntime,
}

impl LoadError {
    /// Convenience constructor for [`LoadError::Failed`].
    pub fn failed(message: impl Into<Cow<'static, str>>) -> Self {
        Self::Failed(message.into())
    }
}
