use thiserror::Error;

#[derive(Error, Debug)]
pub enum ProtocolError {
    /// An agency path had no segments.
    #[error("Agency path is empty")]
    EmptyPath,

    /// A path tried to descend through a leaf value.
    #[error("Agency path '{0}' passes through a leaf value")]
    NotADirectory(String),
}

pub type Result<T> = std::result::Result<T, ProtocolError>;
