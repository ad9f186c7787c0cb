use std::collections::HashSet;

use chrono::Utc;
use futures::channel::mpsc;
use parking_lot::Mutex;

use crate::{
    api::{Action, Author, Comment, CommentId, Error, Forest, Network, Post, PostId, Time, UserId},
    cache::{Cache, WriteOptions},
    resolve,
    tree::{self, ForestExt, Location, Rewrite},
    Config, TempIdAllocator,
};

/// Sent whenever an optimistic update had to be rolled back, so the UI can
/// tell the user their action did not go through
#[derive(Clone, Debug, Eq, PartialEq)]
pub struct Notification {
    pub post_id: PostId,
    pub action: Action,
    pub error: Error,
}

/// Where an action ended up. Before `Coordinator::apply` the action is
/// idle, and while its `PendingAction` is alive it is applied.
#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub enum ActionState {
    Confirmed,
    RolledBack,
}

/// What the server answered to an action
#[derive(Clone, Debug, Eq, PartialEq)]
pub enum Confirmation {
    Created(Comment),
    Done,
}

#[derive(Clone, Debug, Eq, PartialEq)]
pub enum Outcome {
    /// Holds the comment as the server stored it, for newly posted comments
    Confirmed(Option<Comment>),
    RolledBack(Error),
}

impl Outcome {
    pub fn state(&self) -> ActionState {
        match self {
            Outcome::Confirmed(_) => ActionState::Confirmed,
            Outcome::RolledBack(_) => ActionState::RolledBack,
        }
    }
}

/// How to take back one optimistic change, touching nothing else
#[derive(Clone, Debug)]
enum Undo {
    RemoveTemporary {
        parent: Option<CommentId>,
        temp_id: CommentId,
    },
    RestoreText {
        comment_id: CommentId,
        text: String,
        updated_at: Option<Time>,
        written_text: String,
        written_at: Time,
    },
    ToggleLike {
        comment_id: CommentId,
        user: UserId,
    },
    Reinsert {
        location: Location,
        node: Comment,
    },
}

impl Undo {
    fn invert(&self, forest: &Forest) -> Forest {
        match self {
            Undo::RemoveTemporary { parent: _, temp_id } => tree::remove_node(forest, temp_id),
            Undo::RestoreText {
                comment_id,
                text,
                updated_at,
                written_text,
                written_at,
            } => tree::update_node(forest, comment_id, |c| {
                if c.text != *written_text || c.updated_at != Some(*written_at) {
                    // a later edit replaced ours, it stays
                    return Rewrite::Replace(c.clone());
                }
                Rewrite::Replace(Comment {
                    text: text.clone(),
                    updated_at: *updated_at,
                    ..c.clone()
                })
            }),
            Undo::ToggleLike { comment_id, user } => tree::toggle_like(forest, comment_id, user),
            Undo::Reinsert { location, node } => tree::insert_child(
                forest,
                location.parent.as_ref(),
                location.index,
                node.clone(),
            ),
        }
    }
}

/// An action whose effect is already in the cache, waiting for the server
#[derive(Debug)]
pub struct PendingAction {
    post_id: PostId,
    action: Action,
    undo: Undo,
    snapshot: Forest,
    optimistic: Forest,
}

impl PendingAction {
    pub fn post_id(&self) -> &PostId {
        &self.post_id
    }

    pub fn action(&self) -> &Action {
        &self.action
    }

    /// Id of the placeholder comment, for newly posted comments
    pub fn temp_id(&self) -> Option<&CommentId> {
        match &self.undo {
            Undo::RemoveTemporary { temp_id, .. } => Some(temp_id),
            _ => None,
        }
    }

    /// The forest as it was right before this action was applied
    pub fn snapshot(&self) -> &Forest {
        &self.snapshot
    }

    /// The forest as this action wrote it into the cache
    pub fn optimistic(&self) -> &Forest {
        &self.optimistic
    }
}

/// Runs user actions on the comments of posts: shows their effect at once,
/// then either settles on what the server says or takes the effect back.
///
/// All tree changes happen synchronously inside `apply` and `settle`. Only
/// the network calls in `confirm` and `refetch` suspend, so several actions
/// may be in flight at once, and their confirmations may come back in any
/// order.
pub struct Coordinator<C, N> {
    cache: C,
    network: N,
    viewer: Author,
    config: Config,
    temp_ids: TempIdAllocator,

    /// Placeholders of the replies applied but not settled yet
    in_flight: Mutex<HashSet<CommentId>>,

    notifications: mpsc::UnboundedSender<Notification>,
}

impl<C: Cache, N: Network> Coordinator<C, N> {
    pub fn new(
        cache: C,
        network: N,
        viewer: Author,
        config: Config,
    ) -> (Coordinator<C, N>, mpsc::UnboundedReceiver<Notification>) {
        let (sender, receiver) = mpsc::unbounded();
        let coordinator = Coordinator {
            cache,
            network,
            viewer,
            config,
            temp_ids: TempIdAllocator::new(),
            in_flight: Mutex::new(HashSet::new()),
            notifications: sender,
        };
        (coordinator, receiver)
    }

    pub fn cache(&self) -> &C {
        &self.cache
    }

    pub fn network(&self) -> &N {
        &self.network
    }

    pub fn viewer(&self) -> &Author {
        &self.viewer
    }

    pub fn comments(&self, post_id: &PostId) -> Forest {
        self.cache.read(post_id).unwrap_or_default()
    }

    /// Validates and stores comments read from the server
    pub fn hydrate(&self, post_id: &PostId, comments: Vec<Comment>) -> Result<(), Error> {
        let post = Post {
            id: post_id.clone(),
            comments: comments.into(),
        };
        post.validate(self.config.max_text_len)?;
        tracing::debug!(post = ?post.id, num_comments = post.comments.count(), "storing server comments");
        self.cache.write(&post.id, post.comments);
        Ok(())
    }

    /// Replaces the cached comments of the post with the server's. Any
    /// optimistic change still in flight is overwritten.
    pub async fn refetch(&self, post_id: &PostId) -> Result<(), Error> {
        let comments = self.network.fetch_comments(post_id).await?;
        self.hydrate(post_id, comments)
    }

    /// Checks `action` and writes its expected effect into the cache.
    ///
    /// Fails without touching the cache if the action is invalid or targets
    /// a comment that is not (or not anymore) in the cache.
    pub fn apply(&self, post_id: &PostId, action: Action) -> Result<PendingAction, Error> {
        action.validate(self.config.max_text_len)?;
        let snapshot = self.comments(post_id);
        let now = Utc::now();
        let find = |id: &CommentId| {
            snapshot
                .find(id)
                .ok_or_else(|| Error::CommentNotFound(id.clone()))
        };

        let (undo, mutator): (Undo, Box<dyn Fn(&Forest) -> Forest>) = match &action {
            Action::Comment { parent_id, text } => {
                if let Some(p) = parent_id {
                    find(p)?;
                }
                let temp_id = self.temp_ids.allocate();
                self.in_flight.lock().insert(temp_id.clone());
                let node = Comment::new(temp_id.clone(), &self.viewer, text.clone(), now);
                let parent = parent_id.clone();
                (
                    Undo::RemoveTemporary {
                        parent: parent_id.clone(),
                        temp_id,
                    },
                    Box::new(move |f: &Forest| match &parent {
                        None => tree::add_root(f, node.clone()),
                        Some(p) => tree::add_reply(f, p, node.clone()),
                    }),
                )
            }
            Action::Edit { comment_id, text } => {
                let old = find(comment_id)?;
                let (id, text) = (comment_id.clone(), text.clone());
                (
                    Undo::RestoreText {
                        comment_id: comment_id.clone(),
                        text: old.text.clone(),
                        updated_at: old.updated_at,
                        written_text: text.clone(),
                        written_at: now,
                    },
                    Box::new(move |f: &Forest| tree::edit_text(f, &id, &text, now)),
                )
            }
            Action::Delete { comment_id } => {
                let node = find(comment_id)?.clone();
                let location = snapshot
                    .locate(comment_id)
                    .ok_or_else(|| Error::CommentNotFound(comment_id.clone()))?;
                let id = comment_id.clone();
                (
                    Undo::Reinsert { location, node },
                    Box::new(move |f: &Forest| tree::remove_node(f, &id)),
                )
            }
            Action::ToggleLike { comment_id } => {
                find(comment_id)?;
                let (id, user) = (comment_id.clone(), self.viewer.id.clone());
                (
                    Undo::ToggleLike {
                        comment_id: comment_id.clone(),
                        user: user.clone(),
                    },
                    Box::new(move |f: &Forest| tree::toggle_like(f, &id, &user)),
                )
            }
        };

        let optimistic =
            self.cache
                .write_optimistic(post_id, &*mutator, WriteOptions { revalidate: false });
        tracing::debug!(post = ?post_id, ?action, "applied optimistic update");
        Ok(PendingAction {
            post_id: post_id.clone(),
            action,
            undo,
            snapshot,
            optimistic,
        })
    }

    /// Sends the action to the server, then settles it with the answer
    pub async fn confirm(&self, pending: PendingAction) -> Outcome {
        let result = match &pending.action {
            Action::Comment { parent_id, text } => self
                .network
                .create_reply(&pending.post_id, parent_id.as_ref(), text)
                .await
                .map(Confirmation::Created),
            Action::Edit { comment_id, text } => self
                .network
                .edit_comment(comment_id, text)
                .await
                .map(|()| Confirmation::Done),
            Action::Delete { comment_id } => self
                .network
                .delete_comment(comment_id)
                .await
                .map(|()| Confirmation::Done),
            Action::ToggleLike { comment_id } => self
                .network
                .toggle_like(comment_id)
                .await
                .map(|()| Confirmation::Done),
        };
        self.settle(pending, result)
    }

    /// `apply` then `confirm`
    pub async fn submit(&self, post_id: &PostId, action: Action) -> Result<Outcome, Error> {
        let pending = self.apply(post_id, action)?;
        Ok(self.confirm(pending).await)
    }

    /// Moves a pending action to its terminal state given the server's answer
    pub fn settle(&self, pending: PendingAction, result: Result<Confirmation, Error>) -> Outcome {
        if let Some(temp_id) = pending.temp_id() {
            self.in_flight.lock().remove(temp_id);
        }
        match result {
            Ok(confirmation) => self.commit(pending, confirmation),
            Err(error) => self.rollback(pending, error),
        }
    }

    fn commit(&self, pending: PendingAction, confirmation: Confirmation) -> Outcome {
        let (parent, temp_id) = match &pending.undo {
            Undo::RemoveTemporary { parent, temp_id } => (parent.clone(), temp_id.clone()),
            _ => {
                // the optimistic value is the final one, nothing to swap
                if let Confirmation::Created(c) = confirmation {
                    tracing::warn!(action = ?pending.action, comment = ?c, "server unexpectedly returned a comment, ignoring it");
                }
                tracing::trace!(post = ?pending.post_id, action = ?pending.action, "action confirmed");
                return Outcome::Confirmed(None);
            }
        };
        let comment = match confirmation {
            Confirmation::Created(c) => c,
            Confirmation::Done => {
                let err = Error::Unknown(String::from("server did not return the new comment"));
                return self.rollback(pending, err);
            }
        };
        if let Err(err) = comment.validate(self.config.max_text_len) {
            tracing::warn!(?comment, %err, "server returned an invalid comment");
            return self.rollback(pending, err);
        }

        let current = self.comments(&pending.post_id);
        let forest = resolve::reconcile(&current, parent.as_ref(), &temp_id, comment.clone());
        self.cache.write(&pending.post_id, forest);
        tracing::trace!(post = ?pending.post_id, ?temp_id, id = ?comment.id, "new comment confirmed");
        Outcome::Confirmed(Some(comment))
    }

    fn rollback(&self, pending: PendingAction, error: Error) -> Outcome {
        tracing::warn!(post = ?pending.post_id, action = ?pending.action, %error, "rolling back optimistic update");
        let current = self.comments(&pending.post_id);
        let restored = if current == pending.optimistic {
            pending.snapshot
        } else {
            // other actions wrote since ours, only take back our own change
            pending.undo.invert(&current)
        };
        let restored = self.drop_settled_placeholders(restored);
        self.cache.write(&pending.post_id, restored);

        let notif = Notification {
            post_id: pending.post_id,
            action: pending.action,
            error: error.clone(),
        };
        if self.notifications.unbounded_send(notif).is_err() {
            tracing::trace!("notification receiver is gone, not notifying rollback");
        }
        Outcome::RolledBack(error)
    }

    /// Removes the placeholders of replies that already settled. A rollback
    /// restores forests captured while such replies were still in flight.
    fn drop_settled_placeholders(&self, forest: Forest) -> Forest {
        let in_flight = self.in_flight.lock();
        let stale = forest
            .ids()
            .into_iter()
            .filter(|id| id.is_temporary() && !in_flight.contains(id))
            .collect::<Vec<_>>();
        stale.iter().fold(forest, |f, id| {
            tracing::debug!(temp_id = ?id, "dropping placeholder of a settled reply");
            tree::remove_node(&f, id)
        })
    }
}
