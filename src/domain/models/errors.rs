use thiserror::Error;

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ParseError {
    #[error("model response is not valid JSON: {0}")]
    MalformedJson(String),

    #[error("model response is missing field '{0}'")]
    MissingField(String),

    #[error("{owner} uses unknown service type '{value}'")]
    InvalidServiceType { owner: String, value: String },

    #[error("connection {from} -> {to} references undeclared node '{missing}'")]
    DanglingEdge {
        from: String,
        to: String,
        missing: String,
    },

    #[error("diagram declares node '{0}' more than once")]
    DuplicateNode(String),
}

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum StoreError {
    #[error("No session found for id {0}")]
    NotFound(String),

    #[error("No turn found for id {0}")]
    TurnNotFound(String),

    #[error("Turn {0} has already been resolved")]
    TurnAlreadyResolved(String),

    #[error("Failed to persist sessions: {0}")]
    Persistence(String),
}

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum PromptError {
    #[error("template '{template}' references unknown placeholder '{{{name}}}'")]
    UnknownPlaceholder { template: String, name: String },

    #[error("template '{template}' has an unbalanced brace at byte {position}")]
    UnbalancedBrace { template: String, position: usize },

    #[error("failed to read template '{template}': {message}")]
    Read { template: String, message: String },
}

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ArchitectError {
    #[error("The model request failed: {0}")]
    ModelCall(String),

    #[error("The model response could not be used: {error}")]
    Parse { error: ParseError, raw: String },

    #[error(transparent)]
    Store(#[from] StoreError),

    #[error(transparent)]
    Prompt(#[from] PromptError),
}

impl ArchitectError {
    /// Raw model text attached to the failure, when one was received.
    pub fn raw_response(&self) -> Option<String> {
        if let ArchitectError::Parse { raw, .. } = self {
            return Some(raw.to_string());
        }

        return None;
    }
}

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum RenderError {
    #[error("Graphviz 'dot' binary was not found on PATH")]
    MissingBinary,

    #[error("Graphviz failed to render the diagram: {0}")]
    Failed(String),

    #[error("Failed to write diagram: {0}")]
    Io(String),
}
