use crate::CommentId;

#[derive(Clone, Debug, Eq, PartialEq, thiserror::Error)]
pub enum Error {
    #[error("Unknown error: {0}")]
    Unknown(String),

    #[error("Permission denied")]
    PermissionDenied,

    #[error("Network error: {0}")]
    Network(String),

    #[error("Comment text is empty")]
    EmptyText,

    #[error("Comment text is {len} bytes long, the maximum is {max}")]
    TextTooLong { len: usize, max: usize },

    #[error("Null byte in string is not allowed {0:?}")]
    NullByteInString(String),

    #[error("Id {0:?} uses the prefix reserved for temporary ids")]
    ReservedId(String),

    #[error("Comment id {0:?} appears more than once")]
    DuplicateId(CommentId),

    #[error("Comment {0:?} not found")]
    CommentNotFound(CommentId),

    #[error("Comment {0:?} is not confirmed by the server yet")]
    CommentPending(CommentId),
}

impl Error {
    /// Validation errors are detected locally, before anything is written
    /// to the cache or sent to the server
    pub fn is_validation(&self) -> bool {
        match self {
            Error::Unknown(_) | Error::PermissionDenied | Error::Network(_) => false,
            Error::EmptyText
            | Error::TextTooLong { .. }
            | Error::NullByteInString(_)
            | Error::ReservedId(_)
            | Error::DuplicateId(_)
            | Error::CommentNotFound(_)
            | Error::CommentPending(_) => true,
        }
    }
}
