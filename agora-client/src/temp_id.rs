use std::sync::atomic::{AtomicU64, Ordering};

use uuid::Uuid;

use crate::api::{CommentId, TEMP_ID_PREFIX};

/// Hands out the ids of comments that were not confirmed by the server yet.
///
/// Ids look like `temp-<session>-<counter>`: the session is random for each
/// allocator and the counter never repeats within it, so two allocated ids
/// never collide. The server never issues ids with this prefix.
#[derive(Debug)]
pub struct TempIdAllocator {
    session: Uuid,
    next: AtomicU64,
}

impl TempIdAllocator {
    pub fn new() -> TempIdAllocator {
        TempIdAllocator {
            session: Uuid::new_v4(),
            next: AtomicU64::new(0),
        }
    }

    pub fn allocate(&self) -> CommentId {
        let n = self.next.fetch_add(1, Ordering::Relaxed);
        let mut buf = Uuid::encode_buffer();
        let session = self.session.as_simple().encode_lower(&mut buf);
        CommentId(format!("{TEMP_ID_PREFIX}{session}-{n}"))
    }
}

impl Default for TempIdAllocator {
    fn default() -> TempIdAllocator {
        TempIdAllocator::new()
    }
}

pub fn is_temporary(id: &CommentId) -> bool {
    id.is_temporary()
}
