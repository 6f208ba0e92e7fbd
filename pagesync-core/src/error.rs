use thiserror::Error;

/// Errors raised while turning a page model into entities.
#[derive(Debug, Error)]
pub enum ModelError {
    #[error("Component type `{0}` is not registered")]
    UnknownComponentType(String),

    #[error("Meta type `{0}` is not registered")]
    UnknownMetaType(String),

    #[error("Button type `{0}` is not registered")]
    UnknownButtonType(String),

    #[error("Root reference `{0}` does not resolve to a component")]
    MissingRoot(String),

    #[error("Cyclic reference detected at `{0}`")]
    CyclicReference(String),

    #[error("Invalid model for `{id}`: {source}")]
    InvalidModel {
        id: String,
        #[source]
        source: serde_json::Error,
    },

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
}
