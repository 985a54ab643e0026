use thiserror::Error;
use tonic::{Code, Status};

#[derive(Debug, Error)]
pub enum ServiceError {
    #[error("'{0}' not found in ModelManager instance.")]
    ModelNotFound(String),
    #[error("{0}")]
    ModelImport(String),
    #[error("a model with qualified name '{0}' is already in the ModelManager instance")]
    DuplicateModel(String),
    #[error("schema error: {0}")]
    Schema(String),
    #[error("invalid request: {0}")]
    BadRequest(String),
    #[error("model execution failed: {0}")]
    Inference(String),
    #[error("configuration error: {0}")]
    Config(String),
    #[error("io error: {0}")]
    Io(#[from] std::io::Error),
    #[error("transport error: {0}")]
    Transport(#[from] tonic::transport::Error),
}

impl ServiceError {
    pub fn code(&self) -> Code {
        match self {
            ServiceError::ModelNotFound(_) => Code::NotFound,
            ServiceError::Schema(_) | ServiceError::BadRequest(_) => Code::InvalidArgument,
            ServiceError::ModelImport(_)
            | ServiceError::DuplicateModel(_)
            | ServiceError::Inference(_)
            | ServiceError::Config(_)
            | ServiceError::Io(_)
            | ServiceError::Transport(_) => Code::Internal,
        }
    }
}

impl From<ServiceError> for Status {
    fn from(err: ServiceError) -> Self {
        Status::new(err.code(), err.to_string())
    }
}
