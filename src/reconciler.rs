use parse_display::Display;
use serde::{Deserialize, Serialize};

use crate::{Authority, LateConfirmation, PendingTracker, Token};


/// Lifecycle of a pending mutation.
///
/// `Issued` moves to exactly one of `Confirmed` or `Reverted`. There is no retry;
/// retrying is a new mutation issued by the caller.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Display, Serialize, Deserialize)]
#[display(style = "snake_case")]
#[serde(rename_all = "snake_case")]
pub enum Phase {
    Issued,
    Confirmed,
    Reverted,
}

/// Result of resolving a pending mutation.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Display)]
#[display("{token} {phase}")]
pub struct Settled {
    pub token: Token,
    pub phase: Phase,
    /// `true` if the mutation was no longer pending when its response arrived.
    pub late: bool,
}

/// Applies the server-confirmed `canonical` value and retires the pending entry.
///
/// A token that was already reverted is confirmed late if `late` allows it. A token that was
/// already confirmed, or that `pending` never issued, is left alone and `None` is returned.
pub fn confirm<T: 'static>(
    authority: &mut Authority<T>,
    pending: &mut PendingTracker<T>,
    token: Token,
    canonical: T,
    late: LateConfirmation,
) -> Option<Settled> {
    let is_late = match pending.phase(token) {
        Some(Phase::Issued) => false,
        Some(Phase::Reverted) => true,
        Some(Phase::Confirmed) => {
            tracing::trace!(%token, "duplicate confirmation ignored");
            return None;
        }
        None => {
            tracing::trace!(%token, "confirmation of unknown token ignored");
            return None;
        }
    };
    if is_late {
        if late == LateConfirmation::Ignore {
            tracing::trace!(%token, "late confirmation ignored");
            return None;
        }
        pending.confirm_retired(token);
        authority.replace(canonical);
        tracing::trace!(%token, revision = authority.revision(), "late confirmation applied");
    } else {
        pending.retire(token, Phase::Confirmed);
        authority.replace(canonical);
        tracing::debug!(%token, revision = authority.revision(), "confirmed");
    }
    Some(Settled {
        token,
        phase: Phase::Confirmed,
        late: is_late,
    })
}

/// Discards the speculative delta of `token`.
///
/// The authority is left untouched. Returns `None` if `token` is no longer pending.
pub fn revert<T: 'static>(pending: &mut PendingTracker<T>, token: Token) -> Option<Settled> {
    if pending.end(token).is_none() {
        tracing::trace!(%token, "revert of settled mutation ignored");
        return None;
    }
    tracing::debug!(%token, "reverted");
    Some(Settled {
        token,
        phase: Phase::Reverted,
        late: false,
    })
}

/// Resolves `token` with the outcome of its operation.
///
/// `Ok` confirms, `Err` reverts. The error itself is not inspected.
pub fn settle<T: 'static, E>(
    authority: &mut Authority<T>,
    pending: &mut PendingTracker<T>,
    token: Token,
    result: Result<T, E>,
    late: LateConfirmation,
) -> Option<Settled> {
    match result {
        Ok(canonical) => confirm(authority, pending, token, canonical, late),
        Err(_) => revert(pending, token),
    }
}
