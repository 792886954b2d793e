use thiserror::Error;

#[derive(Error, Debug)]
pub enum RivalScopeError {
    #[error("Provider error: {0}")]
    Provider(String),

    #[error("Summarizer error: {0}")]
    Summarizer(String),

    #[error("Store error: {0}")]
    Store(String),

    #[error("Configuration error: {0}")]
    Config(String),

    #[error("Validation error: {0}")]
    Validation(String),

    #[error("No valid competitors after canonicalization")]
    EmptyCompetitorSet,

    #[error("Report not found: {0}")]
    ReportNotFound(uuid::Uuid),

    #[error(transparent)]
    Anyhow(#[from] anyhow::Error),
}
