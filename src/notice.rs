use std::{
    pin::Pin,
    task::{Context, Poll},
};

use futures::{channel::mpsc::UnboundedReceiver, Stream, StreamExt};
use parse_display::Display;
use serde::{Deserialize, Serialize};

use crate::{Subscription, Token};

/// What happened to a pending mutation.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Display, Serialize, Deserialize)]
#[display(style = "snake_case")]
#[serde(rename_all = "snake_case")]
pub enum NoticeKind {
    Begun,
    Confirmed,
    Reverted,
    /// Reverted because it was pending longer than the configured timeout.
    Expired,
}

/// Change notification sent to observers of an [`Optimistic`](crate::Optimistic).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Display, Serialize, Deserialize)]
#[display("{token} {kind}")]
pub struct Notice {
    pub token: Token,
    pub kind: NoticeKind,
}

/// Stream of [`Notice`]s returned by [`Optimistic::notices`](crate::Optimistic::notices).
///
/// Ends when the `Optimistic` is dropped.
pub struct Notices {
    receiver: UnboundedReceiver<Notice>,
    _subscription: Subscription,
}

impl Notices {
    pub(crate) fn new(receiver: UnboundedReceiver<Notice>, subscription: Subscription) -> Self {
        Self {
            receiver,
            _subscription: subscription,
        }
    }
}

impl std::fmt::Debug for Notices {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Notices").finish_non_exhaustive()
    }
}

impl Stream for Notices {
    type Item = Notice;
    fn poll_next(mut self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<Option<Self::Item>> {
        self.receiver.poll_next_unpin(cx)
    }
}
