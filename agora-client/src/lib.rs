mod cache;
pub use cache::{Cache, MemoryCache, WriteOptions};

mod config;
pub use config::Config;

mod coordinator;
pub use coordinator::{ActionState, Confirmation, Coordinator, Notification, Outcome, PendingAction};

mod fuzz;

mod resolve;
pub use resolve::reconcile;

mod temp_id;
pub use temp_id::{is_temporary, TempIdAllocator};

pub mod tree;
pub use tree::{ForestExt, Location};

pub mod api {
    pub use agora_api::*;
}
