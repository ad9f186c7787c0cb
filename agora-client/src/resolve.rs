use crate::{
    api::{Comment, CommentId, Forest},
    tree::{self, ForestExt},
};

/// Swaps the temporary comment `temp_id`, a child of `parent` (or a root if
/// `parent` is `None`), for the comment the server confirmed.
///
/// If the parent is gone (deleted while the reply was in flight), the
/// confirmed comment is dropped: it will come back with the next refetch.
/// If the temporary comment is gone (rolled back in the meantime), nothing
/// happens.
pub fn reconcile(
    forest: &Forest,
    parent: Option<&CommentId>,
    temp_id: &CommentId,
    confirmed: Comment,
) -> Forest {
    let siblings = match parent {
        None => forest,
        Some(p) => match forest.find(p) {
            Some(p) => &p.children,
            None => {
                tracing::debug!(parent = ?p, confirmed = ?confirmed.id, "parent vanished, dropping confirmed comment");
                return forest.clone();
            }
        },
    };
    if !siblings.iter().any(|c| c.id == *temp_id) {
        tracing::debug!(?temp_id, "temporary comment vanished, nothing to reconcile");
        return forest.clone();
    }
    if forest.contains_id(&confirmed.id) {
        // the confirmed comment already reached us by another path, eg. a
        // refetch racing with the confirmation
        tracing::debug!(confirmed = ?confirmed.id, "confirmed comment already present, dropping temporary one");
        return tree::remove_node(forest, temp_id);
    }
    tree::replace_node(forest, temp_id, confirmed)
}
