use async_trait::async_trait;

use crate::{Comment, CommentId, Error, PostId};

/// The calls the synchronization core makes to the server. Transport,
/// retries and timeouts are the implementor's business.
#[async_trait]
pub trait Network {
    async fn create_reply(
        &self,
        post: &PostId,
        parent: Option<&CommentId>,
        text: &str,
    ) -> Result<Comment, Error>;
    async fn edit_comment(&self, comment: &CommentId, text: &str) -> Result<(), Error>;
    async fn delete_comment(&self, comment: &CommentId) -> Result<(), Error>;
    async fn toggle_like(&self, comment: &CommentId) -> Result<(), Error>;
    async fn fetch_comments(&self, post: &PostId) -> Result<Vec<Comment>, Error>;
}
