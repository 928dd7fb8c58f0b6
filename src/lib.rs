//! # optimistic
//!
//! Optimistic local state with eventual reconciliation against an asynchronous authority.
//!
//! An [`Optimistic<T>`] holds the last value confirmed by a remote source of truth (the
//! [`Authority`]) and an ordered list of speculative mutations that have been issued but not yet
//! resolved (the [`PendingTracker`]). The value shown to the user is recomputed on every read by
//! folding the pending mutations over the confirmed value, in the order they were issued.
//!
//! - On success, the server's canonical value replaces the confirmed value and the mutation is retired.
//! - On failure, the mutation is discarded and the view falls back to the confirmed value.
//!
//! ```
//! use optimistic::Optimistic;
//!
//! #[derive(Clone, Debug, PartialEq)]
//! struct Post {
//!     likes: u32,
//!     liked: bool,
//! }
//!
//! let post = Optimistic::new(Post { likes: 5, liked: false });
//! let token = post.begin(|p: &Post| Post { likes: p.likes + 1, liked: true });
//! assert_eq!(post.view(), Post { likes: 6, liked: true });
//!
//! // the server rejected the request
//! post.end(token);
//! assert_eq!(post.view(), Post { likes: 5, liked: false });
//! ```
//!
//! All types are single-threaded (`!Send`). Asynchronous operations are awaited through
//! [`Optimistic::run`], which never holds a borrow of the state across an `.await`.

mod authority;
mod config;
mod delta;
mod error;
mod notice;
mod optimistic;
mod overlay;
pub mod reconciler;
mod tracker;

#[cfg(test)]
mod utils;

pub use authority::Authority;
pub use config::{Config, LateConfirmation};
pub use delta::{reduce, Delta, Reduce};
pub use error::{CapacityError, ConfigError, RunError};
pub use notice::{Notice, NoticeKind, Notices};
pub use optimistic::{Optimistic, Snapshot, Subscription};
pub use overlay::{fold, Overlay};
pub use reconciler::{Phase, Settled};
pub use tracker::{PendingMutation, PendingTracker, Token};
