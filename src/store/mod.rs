//! Store operations over topics, posts and subscriptions.
//!
//! Functions here take the pool and perform each operation in a single
//! transaction, so the denormalized topic counters can never be observed
//! half-updated. Counter maintenance itself lives in [`counters`].

pub mod counters;

mod posts;
mod search;
mod subscriptions;
mod topics;

pub use posts::*;
pub use search::*;
pub use subscriptions::*;
pub use topics::*;
