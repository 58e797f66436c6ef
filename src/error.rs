use thiserror::Error;

#[derive(Error, Debug)]
pub enum TutorError {
    #[error("Backend error: {0}")]
    Backend(#[from] reqwest::Error),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

pub type Result<T> = std::result::Result<T, TutorError>;
