#[derive(thiserror::Error, Clone, Debug, PartialEq, Eq)]
pub enum Error {
    #[error("Malformed message '{message}': {reason}")]
    MalformedMessage { message: String, reason: String },
    #[error("Unknown resource '{0}'")]
    UnknownResource(String),
    #[error("Unknown persuasion '{0}'")]
    UnknownPersuasion(String),
    #[error("Persuasion {identifier} is missing parameter '{param}'")]
    IncompletePersuasion { identifier: String, param: String },
}

impl Error {
    pub fn malformed(message: &str, reason: impl ToString) -> Error {
        Error::MalformedMessage {
            message: message.to_string(),
            reason: reason.to_string(),
        }
    }
}
