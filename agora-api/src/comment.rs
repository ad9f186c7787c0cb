use std::collections::HashSet;

use crate::{Author, Error, Time, UserId};

/// Prefix reserved for identities allocated locally, before the server
/// confirmed the comment. The server never hands out ids starting with it.
pub const TEMP_ID_PREFIX: &str = "temp-";

#[derive(
    Clone, Debug, Eq, Hash, Ord, PartialEq, PartialOrd, serde::Deserialize, serde::Serialize,
)]
#[serde(transparent)]
pub struct CommentId(pub String);

impl CommentId {
    pub fn new(id: impl Into<String>) -> CommentId {
        CommentId(id.into())
    }

    pub fn is_temporary(&self) -> bool {
        self.0.starts_with(TEMP_ID_PREFIX)
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

/// Ordered list of sibling comments. Cloning is O(1), and rebuilding one
/// path shares every untouched subtree with the previous version.
pub type Forest = im::Vector<Comment>;

#[derive(Clone, Debug, Eq, PartialEq, serde::Deserialize, serde::Serialize)]
pub struct Comment {
    pub id: CommentId,

    pub author_id: UserId,
    pub author_name: String,
    pub author_avatar: Option<String>,

    pub text: String,
    pub created_at: Time,
    pub updated_at: Option<Time>,

    /// Users who liked this comment
    pub liked_by: im::OrdSet<UserId>,

    /// Replies, in the order they were posted
    pub children: Forest,
}

impl Comment {
    /// Builds a childless, unliked comment written by `author`
    pub fn new(id: CommentId, author: &Author, text: String, created_at: Time) -> Comment {
        Comment {
            id,
            author_id: author.id.clone(),
            author_name: author.name.clone(),
            author_avatar: author.avatar.clone(),
            text,
            created_at,
            updated_at: None,
            liked_by: im::OrdSet::new(),
            children: im::Vector::new(),
        }
    }

    pub fn is_liked_by(&self, user: &UserId) -> bool {
        self.liked_by.contains(user)
    }

    /// Validates a comment received from the server, including its replies
    pub fn validate(&self, max_text_len: usize) -> Result<(), Error> {
        validate_forest(&im::vector![self.clone()], max_text_len)
    }

    fn validate_fields(&self, max_text_len: usize) -> Result<(), Error> {
        crate::validate_string(&self.id.0)?;
        if self.id.is_temporary() {
            return Err(Error::ReservedId(self.id.0.clone()));
        }
        crate::validate_string(&self.author_id.0)?;
        crate::validate_string(&self.author_name)?;
        if let Some(avatar) = &self.author_avatar {
            crate::validate_string(avatar)?;
        }
        crate::validate_text(&self.text, max_text_len)?;
        for u in self.liked_by.iter() {
            crate::validate_string(&u.0)?;
        }
        Ok(())
    }
}

/// Checks every comment of a server-provided forest, and that no id
/// appears twice across the whole forest
pub(crate) fn validate_forest(forest: &Forest, max_text_len: usize) -> Result<(), Error> {
    let mut seen = HashSet::new();
    let mut stack = forest.iter().collect::<Vec<_>>();
    while let Some(c) = stack.pop() {
        c.validate_fields(max_text_len)?;
        if !seen.insert(&c.id) {
            return Err(Error::DuplicateId(c.id.clone()));
        }
        stack.extend(c.children.iter());
    }
    Ok(())
}
