/// Errors a service hook can report to the scheduler.
#[derive(Debug, thiserror::Error)]
pub enum ServiceError {
    #[error("required service `{0}` is not registered")]
    MissingService(&'static str),
    #[error("configuration error: {0}")]
    Config(#[from] crate::config::ConfigError),
    #[error(transparent)]
    Other(Box<dyn std::error::Error + Send + Sync>),
}

impl ServiceError {
    /// Wrap any error raised inside a service hook.
    pub fn other<E>(err: E) -> Self
    where
        E: std::error::Error + Send + Sync + 'static,
    {
        Self::Other(Box::new(err))
    }
}

/// Fatal scheduler errors. Disposal has already run when one is returned.
#[derive(Debug, thiserror::Error)]
pub enum AppError {
    #[error("service `{service}` failed to initialize: {source}")]
    Init {
        service: String,
        #[source]
        source: ServiceError,
    },
    #[error("service `{service}` failed while processing: {source}")]
    Process {
        service: String,
        #[source]
        source: ServiceError,
    },
}
