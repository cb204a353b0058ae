use thiserror::Error;

/// Errors emitted by the registry, the dependency builder and the engine.
#[derive(Debug, Error)]
pub enum GenerationError {
    #[error("unknown model: {0}")]
    UnknownModel(String),
    #[error("unknown field: {model}.{field}")]
    UnknownField { model: String, field: String },
    #[error("unknown directive '{kind}' for {model}.{field}")]
    UnknownDirective {
        kind: String,
        model: String,
        field: String,
    },
    #[error("cyclic dependency between fields: {}", .0.join(", "))]
    CyclicDependency(Vec<String>),
    #[error("no data available for model {0}")]
    NoDataAvailable(String),
    #[error("no {model} row matches the conditions of {requested_by}")]
    NoMatchingRow { model: String, requested_by: String },
    #[error("invalid arguments: {0}")]
    InvalidArguments(String),
    #[error("field {model}.{field} read before it was set")]
    UnsetField { model: String, field: String },
    #[error("invalid catalog: {0}")]
    InvalidCatalog(String),
    #[error("io error: {0}")]
    Io(#[from] std::io::Error),
    #[error("json error: {0}")]
    Json(#[from] serde_json::Error),
    #[error("csv error: {0}")]
    Csv(#[from] csv::Error),
}

impl GenerationError {
    pub(crate) fn unknown_field(model: &str, field: &str) -> Self {
        GenerationError::UnknownField {
            model: model.to_string(),
            field: field.to_string(),
        }
    }

    pub(crate) fn unset_field(model: &str, field: &str) -> Self {
        GenerationError::UnsetField {
            model: model.to_string(),
            field: field.to_string(),
        }
    }
}

impl From<fakeschema_core::Error> for GenerationError {
    fn from(err: fakeschema_core::Error) -> Self {
        match err {
            fakeschema_core::Error::InvalidArguments(message) => {
                GenerationError::InvalidArguments(message)
            }
            fakeschema_core::Error::InvalidCatalog(message)
            | fakeschema_core::Error::Other(message) => GenerationError::InvalidCatalog(message),
        }
    }
}
