use thiserror::Error;

#[derive(Debug, Error)]
pub enum CoordinatorError {
    #[error("message error: {0}")]
    Message(#[from] tumbler_messages::MessageError),

    #[error("config error: {0}")]
    Config(String),

    #[error("{0}")]
    Other(String),
}
