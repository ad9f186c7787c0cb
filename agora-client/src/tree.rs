//! Pure functions rewriting a comment forest.
//!
//! None of these mutate their input: each returns a new forest, sharing
//! with the input every subtree not on the path from a root to the
//! target. A target that cannot be found is not an error, the input is
//! returned unchanged.

use crate::api::{Comment, CommentId, Forest, Time, UserId};

/// What to do with the node a rewrite found
pub enum Rewrite {
    Replace(Comment),
    Remove,
}

/// Position of a comment in the forest
#[derive(Clone, Debug, Eq, PartialEq)]
pub struct Location {
    /// `None` for a root-level comment
    pub parent: Option<CommentId>,
    pub index: usize,
}

fn rewrite<F>(forest: &Forest, target: &CommentId, f: &mut F) -> Option<Forest>
where
    F: FnMut(&Comment) -> Rewrite,
{
    for (i, c) in forest.iter().enumerate() {
        if c.id == *target {
            let mut res = forest.clone();
            match f(c) {
                Rewrite::Replace(new) => {
                    res.set(i, new);
                }
                Rewrite::Remove => {
                    res.remove(i);
                }
            }
            return Some(res);
        }
        if let Some(children) = rewrite(&c.children, target, f) {
            let mut res = forest.clone();
            res.set(
                i,
                Comment {
                    children,
                    ..c.clone()
                },
            );
            return Some(res);
        }
    }
    None
}

/// Finds `target` depth-first (a node, then its replies in order, then its
/// next sibling), applies `f` to it and rebuilds the path up to the root.
///
/// Every other mutator of this module goes through here, so they all agree
/// on which node a given id designates.
pub fn update_node<F>(forest: &Forest, target: &CommentId, mut f: F) -> Forest
where
    F: FnMut(&Comment) -> Rewrite,
{
    match rewrite(forest, target, &mut f) {
        Some(res) => res,
        None => {
            tracing::trace!(?target, "comment not found in forest, leaving it untouched");
            forest.clone()
        }
    }
}

pub fn add_root(forest: &Forest, node: Comment) -> Forest {
    let mut res = forest.clone();
    res.push_back(node);
    res
}

/// Appends `node` to the replies of `parent_id`
pub fn add_reply(forest: &Forest, parent_id: &CommentId, node: Comment) -> Forest {
    let mut node = Some(node);
    update_node(forest, parent_id, |parent| {
        let mut parent = parent.clone();
        if let Some(node) = node.take() {
            parent.children.push_back(node);
        }
        Rewrite::Replace(parent)
    })
}

/// Inserts `node` at `index` among the children of `parent` (or among the
/// roots). The index is clamped to the number of siblings. Nothing happens
/// if a comment with the same id is already present.
pub fn insert_child(
    forest: &Forest,
    parent: Option<&CommentId>,
    index: usize,
    node: Comment,
) -> Forest {
    if forest.find(&node.id).is_some() {
        tracing::debug!(id = ?node.id, "refusing to insert a comment that is already there");
        return forest.clone();
    }
    match parent {
        None => {
            let mut res = forest.clone();
            res.insert(index.min(res.len()), node);
            res
        }
        Some(parent) => {
            let mut node = Some(node);
            update_node(forest, parent, |p| {
                let mut p = p.clone();
                if let Some(node) = node.take() {
                    p.children.insert(index.min(p.children.len()), node);
                }
                Rewrite::Replace(p)
            })
        }
    }
}

/// Removes `target` along with all its replies
pub fn remove_node(forest: &Forest, target: &CommentId) -> Forest {
    update_node(forest, target, |_| Rewrite::Remove)
}

pub fn edit_text(forest: &Forest, target: &CommentId, text: &str, at: Time) -> Forest {
    update_node(forest, target, |c| {
        Rewrite::Replace(Comment {
            text: String::from(text),
            updated_at: Some(at),
            ..c.clone()
        })
    })
}

/// Flips whether `user` likes `target`. Calling this twice is a no-op.
pub fn toggle_like(forest: &Forest, target: &CommentId, user: &UserId) -> Forest {
    update_node(forest, target, |c| {
        let mut c = c.clone();
        if c.liked_by.remove(user).is_none() {
            c.liked_by.insert(user.clone());
        }
        Rewrite::Replace(c)
    })
}

pub fn replace_node(forest: &Forest, target: &CommentId, replacement: Comment) -> Forest {
    let mut replacement = Some(replacement);
    update_node(forest, target, |c| match replacement.take() {
        Some(r) => Rewrite::Replace(r),
        None => Rewrite::Replace(c.clone()),
    })
}

/// Read-only queries on a forest
pub trait ForestExt {
    fn find(&self, id: &CommentId) -> Option<&Comment>;
    fn locate(&self, id: &CommentId) -> Option<Location>;
    fn contains_id(&self, id: &CommentId) -> bool;

    /// Number of comments, replies included
    fn count(&self) -> usize;

    /// All ids, in depth-first order
    fn ids(&self) -> Vec<CommentId>;
}

impl ForestExt for Forest {
    fn find(&self, id: &CommentId) -> Option<&Comment> {
        for c in self.iter() {
            if c.id == *id {
                return Some(c);
            }
            if let Some(res) = c.children.find(id) {
                return Some(res);
            }
        }
        None
    }

    fn locate(&self, id: &CommentId) -> Option<Location> {
        fn locate_in(forest: &Forest, parent: Option<&CommentId>, id: &CommentId) -> Option<Location> {
            for (index, c) in forest.iter().enumerate() {
                if c.id == *id {
                    return Some(Location {
                        parent: parent.cloned(),
                        index,
                    });
                }
                if let Some(res) = locate_in(&c.children, Some(&c.id), id) {
                    return Some(res);
                }
            }
            None
        }
        locate_in(self, None, id)
    }

    fn contains_id(&self, id: &CommentId) -> bool {
        self.find(id).is_some()
    }

    fn count(&self) -> usize {
        self.iter().map(|c| 1 + c.children.count()).sum()
    }

    fn ids(&self) -> Vec<CommentId> {
        let mut res = Vec::with_capacity(self.len());
        for c in self.iter() {
            res.push(c.id.clone());
            res.extend(c.children.ids());
        }
        res
    }
}
