use crate::{CommentId, Error};

/// A user action on the comments of a post
#[derive(Clone, Debug, Eq, PartialEq, serde::Deserialize, serde::Serialize)]
pub enum Action {
    /// Post a new comment, either at the root of the post (`parent_id` is
    /// `None`) or as a reply to an existing comment
    Comment {
        parent_id: Option<CommentId>,
        text: String,
    },
    Edit {
        comment_id: CommentId,
        text: String,
    },
    /// Removes the comment along with all its replies
    Delete { comment_id: CommentId },
    ToggleLike { comment_id: CommentId },
}

impl Action {
    pub fn reply(parent_id: CommentId, text: impl Into<String>) -> Action {
        Action::Comment {
            parent_id: Some(parent_id),
            text: text.into(),
        }
    }

    pub fn root(text: impl Into<String>) -> Action {
        Action::Comment {
            parent_id: None,
            text: text.into(),
        }
    }

    /// The already-existing comment this action is about, if any
    pub fn target(&self) -> Option<&CommentId> {
        match self {
            Action::Comment { parent_id, .. } => parent_id.as_ref(),
            Action::Edit { comment_id, .. }
            | Action::Delete { comment_id }
            | Action::ToggleLike { comment_id } => Some(comment_id),
        }
    }

    // Only checks the action's own contents, see the coordinator for the
    // checks against the current state of the comment tree
    pub fn validate(&self, max_text_len: usize) -> Result<(), Error> {
        if let Some(target) = self.target() {
            crate::validate_string(target.as_str())?;
            if target.is_temporary() {
                return Err(Error::CommentPending(target.clone()));
            }
        }
        match self {
            Action::Comment { parent_id: _, text } => crate::validate_text(text, max_text_len),
            Action::Edit {
                comment_id: _,
                text,
            } => crate::validate_text(text, max_text_len),
            Action::Delete { comment_id: _ } => Ok(()),
            Action::ToggleLike { comment_id: _ } => Ok(()),
        }
    }
}
