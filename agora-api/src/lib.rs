use chrono::Utc;

mod action;
pub use action::Action;

mod comment;
pub use comment::{Comment, CommentId, Forest, TEMP_ID_PREFIX};

mod error;
pub use error::Error;

mod network;
pub use network::Network;

mod post;
pub use post::{Post, PostId};

mod user;
pub use user::{Author, UserId};

pub type Time = chrono::DateTime<Utc>;

/// Default upper bound on the length of a comment body, in bytes
pub const DEFAULT_MAX_TEXT_LEN: usize = 10_000;

// The below validate functions are the checks every piece of data crossing
// the client/server boundary goes through. The server is expected to run
// the same checks, so a payload that fails them is treated as garbage.

pub fn validate_string(s: &str) -> Result<(), Error> {
    if s.contains('\0') {
        return Err(Error::NullByteInString(String::from(s)));
    }
    Ok(())
}

pub fn validate_text(s: &str, max_len: usize) -> Result<(), Error> {
    validate_string(s)?;
    if s.trim().is_empty() {
        return Err(Error::EmptyText);
    }
    if s.len() > max_len {
        return Err(Error::TextTooLong {
            len: s.len(),
            max: max_len,
        });
    }
    Ok(())
}
