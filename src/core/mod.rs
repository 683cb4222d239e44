// ============================================================================
// spark-observe - Core Module
// Dependencies, the subscriber contract, and the observation context
// ============================================================================

pub mod context;
pub mod dep;
pub mod types;

// Re-export commonly used items
pub use context::{
    active_subscriber, has_active_subscriber, is_observing, is_server_rendering, pop_subscriber,
    push_subscriber, set_server_rendering, toggle_observing, untracked, with_context,
    with_subscriber, without_observing, ObserveContext,
};
pub use dep::Dep;
pub use types::Subscriber;
