use thiserror::Error;

/// Prompt formatting errors
#[derive(Error, Debug, Clone, PartialEq)]
pub enum PromptError {
    /// No formatter is registered under this name
    #[error("Unknown prompt format: {0}\nSuggestion: use one of: canary, mistral")]
    UnknownFormatter(String),

    /// The formatter has no template for this role
    #[error("Prompt format '{formatter}' has no template for role '{role}'")]
    UnknownRole { formatter: String, role: String },

    /// Template slots without a value
    #[error("Missing slot values for role '{role}': {slots:?}")]
    MissingSlots { role: String, slots: Vec<String> },

    /// Values for slots the template does not declare
    #[error("Unexpected slot values for role '{role}': {slots:?}")]
    UnexpectedSlots { role: String, slots: Vec<String> },

    /// A dialog needs at least one turn
    #[error("Cannot encode an empty dialog")]
    EmptyDialog,

    /// Tokenizer failure
    #[error("Tokenizer error: {0}")]
    Tokenizer(String),
}

/// Result type for prompt formatting
pub type PromptResult<T> = Result<T, PromptError>;
