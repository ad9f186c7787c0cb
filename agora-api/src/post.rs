use crate::{Error, Forest};

#[derive(
    Clone, Debug, Eq, Hash, Ord, PartialEq, PartialOrd, serde::Deserialize, serde::Serialize,
)]
#[serde(transparent)]
pub struct PostId(pub String);

impl PostId {
    pub fn new(id: impl Into<String>) -> PostId {
        PostId(id.into())
    }
}

#[derive(Clone, Debug, Eq, PartialEq, serde::Deserialize, serde::Serialize)]
pub struct Post {
    pub id: PostId,

    /// Root-level comments, in posting order
    pub comments: Forest,
}

impl Post {
    pub fn validate(&self, max_text_len: usize) -> Result<(), Error> {
        crate::validate_string(&self.id.0)?;
        crate::comment::validate_forest(&self.comments, max_text_len)
    }
}
