use std::{
    collections::{HashMap, VecDeque},
    sync::Arc,
    time::Duration,
};

use agora_client::{
    api::{self, Author, Comment, CommentId, Error, Forest, Network, PostId},
    tree, ForestExt,
};
use async_trait::async_trait;
use chrono::Utc;
use parking_lot::Mutex;

/// Something going wrong with the next call made to the server
#[derive(Clone, Debug)]
pub enum Fault {
    /// The call is rejected without any effect
    Reject(Error),

    /// The call takes effect, but the answer never makes it to the client
    LoseResponse,
}

/// In-memory stand-in for the comments backend. Cloning it gives another
/// handle on the same server.
#[derive(Clone, Default)]
pub struct MockServer(Arc<Mutex<State>>);

#[derive(Debug, Default)]
struct State {
    posts: HashMap<PostId, Forest>,
    next_id: u64,
    offline: bool,
    latency: Duration,
    faults: VecDeque<Fault>,
}

impl State {
    fn post_of(&self, comment: &CommentId) -> Result<PostId, Error> {
        self.posts
            .iter()
            .find(|(_, f)| f.contains_id(comment))
            .map(|(p, _)| p.clone())
            .ok_or_else(|| Error::CommentNotFound(comment.clone()))
    }

    fn comment(&self, comment: &CommentId) -> Result<(PostId, &Comment), Error> {
        let post = self.post_of(comment)?;
        let c = self.posts[&post]
            .find(comment)
            .ok_or_else(|| Error::CommentNotFound(comment.clone()))?;
        Ok((post, c))
    }

    fn update(&mut self, post: &PostId, f: impl FnOnce(&Forest) -> Forest) {
        if let Some(forest) = self.posts.get_mut(post) {
            *forest = f(forest);
        }
    }
}

impl MockServer {
    pub fn new() -> MockServer {
        MockServer::default()
    }

    pub fn create_post(&self, post: PostId) {
        self.0.lock().posts.entry(post).or_default();
    }

    /// Current comments of the post, as stored server-side
    pub fn comments(&self, post: &PostId) -> Option<Forest> {
        self.0.lock().posts.get(post).cloned()
    }

    pub fn set_offline(&self, offline: bool) {
        self.0.lock().offline = offline;
    }

    /// Delay before each call is handled
    pub fn set_latency(&self, latency: Duration) {
        self.0.lock().latency = latency;
    }

    /// Queues a fault for the next call that reaches the server
    pub fn inject(&self, fault: Fault) {
        self.0.lock().faults.push_back(fault);
    }

    /// Connects as `user`
    pub fn session(&self, user: Author) -> MockSession {
        MockSession {
            server: self.clone(),
            user,
        }
    }

    async fn handle<T, F>(&self, call: &str, f: F) -> Result<T, Error>
    where
        F: FnOnce(&mut State) -> Result<T, Error>,
    {
        let latency = self.0.lock().latency;
        if !latency.is_zero() {
            tokio::time::sleep(latency).await;
        }
        let mut state = self.0.lock();
        if state.offline {
            return Err(Error::Network(String::from("server unreachable")));
        }
        match state.faults.pop_front() {
            None => f(&mut *state),
            Some(Fault::Reject(err)) => {
                tracing::debug!(call, %err, "rejecting call as requested");
                Err(err)
            }
            Some(Fault::LoseResponse) => {
                let res = f(&mut *state);
                tracing::debug!(call, ok = res.is_ok(), "losing response as requested");
                Err(Error::Network(String::from("connection reset")))
            }
        }
    }
}

pub struct MockSession {
    server: MockServer,
    user: Author,
}

impl MockSession {
    pub fn user(&self) -> &Author {
        &self.user
    }

    fn check_owner(&self, c: &Comment) -> Result<(), Error> {
        match c.author_id == self.user.id {
            true => Ok(()),
            false => Err(Error::PermissionDenied),
        }
    }
}

#[async_trait]
impl Network for MockSession {
    async fn create_reply(
        &self,
        post: &PostId,
        parent: Option<&CommentId>,
        text: &str,
    ) -> Result<Comment, Error> {
        self.server
            .handle("create_reply", |state| {
                api::validate_text(text, api::DEFAULT_MAX_TEXT_LEN)?;
                let forest = state
                    .posts
                    .get(post)
                    .ok_or_else(|| Error::Unknown(format!("no post {post:?}")))?;
                if let Some(p) = parent {
                    if !forest.contains_id(p) {
                        return Err(Error::CommentNotFound(p.clone()));
                    }
                }
                state.next_id += 1;
                let id = CommentId(format!("c{}", state.next_id));
                let comment = Comment::new(id, &self.user, String::from(text), Utc::now());
                let new = comment.clone();
                state.update(post, move |f| match parent {
                    None => tree::add_root(f, new),
                    Some(p) => tree::add_reply(f, p, new),
                });
                Ok(comment)
            })
            .await
    }

    async fn edit_comment(&self, comment: &CommentId, text: &str) -> Result<(), Error> {
        self.server
            .handle("edit_comment", |state| {
                api::validate_text(text, api::DEFAULT_MAX_TEXT_LEN)?;
                let (post, c) = state.comment(comment)?;
                self.check_owner(c)?;
                state.update(&post, |f| tree::edit_text(f, comment, text, Utc::now()));
                Ok(())
            })
            .await
    }

    async fn delete_comment(&self, comment: &CommentId) -> Result<(), Error> {
        self.server
            .handle("delete_comment", |state| {
                let (post, c) = state.comment(comment)?;
                self.check_owner(c)?;
                state.update(&post, |f| tree::remove_node(f, comment));
                Ok(())
            })
            .await
    }

    async fn toggle_like(&self, comment: &CommentId) -> Result<(), Error> {
        self.server
            .handle("toggle_like", |state| {
                let post = state.post_of(comment)?;
                state.update(&post, |f| tree::toggle_like(f, comment, &self.user.id));
                Ok(())
            })
            .await
    }

    async fn fetch_comments(&self, post: &PostId) -> Result<Vec<Comment>, Error> {
        self.server
            .handle("fetch_comments", |state| {
                state
                    .posts
                    .get(post)
                    .map(|f| f.iter().cloned().collect())
                    .ok_or_else(|| Error::Unknown(format!("no post {post:?}")))
            })
            .await
    }
}
