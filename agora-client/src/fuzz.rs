#![cfg(test)]

use std::collections::HashMap;

use async_trait::async_trait;
use futures::executor::block_on;

use crate::{
    api::{Action, Comment, CommentId, Error, Forest, Network, PostId, UserId},
    tree::{
        self,
        tests::{author, id, node},
        ForestExt,
    },
    Config, Coordinator, MemoryCache, TempIdAllocator,
};

const MAX_NODES: usize = 40;

/// Turns a fuzzer-provided shape into a forest. Node `i` is called `c{i}`,
/// and is either a root or a reply to an earlier node.
fn build_forest(shape: &[(u8, bool)]) -> Forest {
    let mut forest = Forest::new();
    for (i, &(pick, is_reply)) in shape.iter().take(MAX_NODES).enumerate() {
        let mut new = node(&format!("c{i}"), vec![]);
        if pick % 3 == 0 {
            new.liked_by.insert(UserId::new(format!("u{}", pick % 5)));
        }
        forest = match is_reply && i > 0 {
            true => tree::add_reply(&forest, &id(&format!("c{}", pick as usize % i)), new),
            false => tree::add_root(&forest, new),
        };
    }
    forest
}

/// Picks an existing comment, if any
fn pick_target(forest: &Forest, pick: u8) -> Option<CommentId> {
    let ids = forest.ids();
    match ids.is_empty() {
        true => None,
        false => Some(ids[pick as usize % ids.len()].clone()),
    }
}

fn contents(forest: &Forest) -> HashMap<CommentId, Comment> {
    let mut res = HashMap::new();
    let mut stack = forest.iter().collect::<Vec<_>>();
    while let Some(c) = stack.pop() {
        res.insert(c.id.clone(), c.clone());
        stack.extend(c.children.iter());
    }
    res
}

fn init_logs() {
    if std::env::var("RUST_LOG").is_ok() {
        let _ = tracing_subscriber::fmt::try_init();
    }
}

struct Offline;

#[async_trait]
impl Network for Offline {
    async fn create_reply(
        &self,
        _post: &PostId,
        _parent: Option<&CommentId>,
        _text: &str,
    ) -> Result<Comment, Error> {
        Err(Error::Network(String::from("offline")))
    }

    async fn edit_comment(&self, _comment: &CommentId, _text: &str) -> Result<(), Error> {
        Err(Error::Network(String::from("offline")))
    }

    async fn delete_comment(&self, _comment: &CommentId) -> Result<(), Error> {
        Err(Error::Network(String::from("offline")))
    }

    async fn toggle_like(&self, _comment: &CommentId) -> Result<(), Error> {
        Err(Error::Network(String::from("offline")))
    }

    async fn fetch_comments(&self, _post: &PostId) -> Result<Vec<Comment>, Error> {
        Err(Error::Network(String::from("offline")))
    }
}

#[test]
fn missing_targets_leave_forest_unchanged() {
    init_logs();
    bolero::check!()
        .with_type::<Vec<(u8, bool)>>()
        .cloned()
        .for_each(|shape| {
            let forest = build_forest(&shape);
            let missing = id("missing");
            let at = chrono::Utc::now();
            assert_eq!(tree::add_reply(&forest, &missing, node("new", vec![])), forest);
            assert_eq!(tree::remove_node(&forest, &missing), forest);
            assert_eq!(tree::edit_text(&forest, &missing, "x", at), forest);
            assert_eq!(tree::toggle_like(&forest, &missing, &UserId::new("u1")), forest);
            assert_eq!(tree::replace_node(&forest, &missing, node("new", vec![])), forest);
        });
}

#[test]
fn mutators_only_touch_their_target() {
    init_logs();
    bolero::check!()
        .with_type::<(Vec<(u8, bool)>, u8)>()
        .cloned()
        .for_each(|(shape, pick)| {
            let forest = build_forest(&shape);
            let target = match pick_target(&forest, pick) {
                Some(t) => t,
                None => return,
            };
            let before = contents(&forest);
            let user = UserId::new("u1");

            let edited = tree::edit_text(&forest, &target, "edited", chrono::Utc::now());
            let liked = tree::toggle_like(&forest, &target, &user);
            let replied = tree::add_reply(&forest, &target, node("new", vec![]));
            for res in [&edited, &liked, &replied] {
                let after = contents(res);
                for (cid, c) in before.iter().filter(|(cid, _)| **cid != target) {
                    let a = &after[cid];
                    assert_eq!(a.text, c.text);
                    assert_eq!(a.liked_by, c.liked_by);
                }
            }
            assert_eq!(edited.ids(), forest.ids());
            assert_eq!(liked.ids(), forest.ids());
            assert_eq!(contents(&edited)[&target].liked_by, before[&target].liked_by);
            assert_eq!(contents(&liked)[&target].text, before[&target].text);

            // removal takes the whole subtree, and nothing else
            let removed = tree::remove_node(&forest, &target);
            let subtree = contents(&im::vector![before[&target].clone()]);
            let after = contents(&removed);
            assert_eq!(after.len(), before.len() - subtree.len());
            for (cid, c) in after.iter() {
                assert!(!subtree.contains_key(cid));
                assert_eq!(c.text, before[cid].text);
                assert_eq!(c.liked_by, before[cid].liked_by);
            }
        });
}

#[test]
fn reconciling_is_like_appending_directly() {
    init_logs();
    bolero::check!()
        .with_type::<(Vec<(u8, bool)>, u8)>()
        .cloned()
        .for_each(|(shape, pick)| {
            let forest = build_forest(&shape);
            let parent = pick_target(&forest, pick);
            let temp_id = TempIdAllocator::new().allocate();
            let temp = Comment::new(temp_id.clone(), &author("u1"), String::from("hi"), chrono::Utc::now());
            let confirmed = node("confirmed", vec![]);
            let (with_temp, direct) = match &parent {
                None => (
                    tree::add_root(&forest, temp),
                    tree::add_root(&forest, confirmed.clone()),
                ),
                Some(p) => (
                    tree::add_reply(&forest, p, temp),
                    tree::add_reply(&forest, p, confirmed.clone()),
                ),
            };
            let res = crate::reconcile(&with_temp, parent.as_ref(), &temp_id, confirmed);
            assert_eq!(res, direct);
        });
}

#[test]
fn failed_actions_roll_back_exactly() {
    init_logs();
    bolero::check!()
        .with_type::<(Vec<(u8, bool)>, u8, u8)>()
        .cloned()
        .for_each(|(shape, pick, kind)| {
            let forest = build_forest(&shape);
            let target = match pick_target(&forest, pick) {
                Some(t) => t,
                None => return,
            };
            let action = match kind % 4 {
                0 => Action::Edit {
                    comment_id: target,
                    text: String::from("edited"),
                },
                1 => Action::ToggleLike { comment_id: target },
                2 => Action::Delete { comment_id: target },
                _ => Action::reply(target, "hi"),
            };

            let post = PostId::new("p1");
            let cache = MemoryCache::new();
            crate::Cache::write(&cache, &post, forest.clone());
            let (coord, _notifs) = Coordinator::new(cache, Offline, author("u1"), Config::default());
            let outcome = block_on(coord.submit(&post, action)).expect("action should be valid");
            assert_eq!(outcome.state(), crate::ActionState::RolledBack);
            assert_eq!(coord.comments(&post), forest);
        });
}

#[test]
fn fixture_ids_are_never_temporary() {
    bolero::check!()
        .with_type::<Vec<(u8, bool)>>()
        .cloned()
        .for_each(|shape| {
            let forest = build_forest(&shape);
            assert!(forest.ids().iter().all(|i| !crate::is_temporary(i)));
        });
}
